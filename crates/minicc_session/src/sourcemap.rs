#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(u32);

#[derive(Default, Debug, Clone)]
pub struct SourceMap {
    sources: Vec<Source>,
}

#[derive(Debug, Clone)]
pub struct Source {
    pub name: String,
    pub source: String,
}

impl Source {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

impl SourceMap {
    pub fn insert(&mut self, source: Source) -> SourceId {
        let id = SourceId(self.sources.len() as u32);
        self.sources.push(source);
        id
    }

    pub fn get(&self, id: SourceId) -> Option<&Source> {
        self.sources.get(id.0 as usize)
    }

    /// 1-based line and column of a byte offset.
    pub fn line_col(&self, id: SourceId, offset: usize) -> Option<(usize, usize)> {
        let source = &self.get(id)?.source;
        let offset = offset.min(source.len());

        let mut line = 1;
        let mut line_start = 0;
        for (pos, ch) in source.char_indices() {
            if pos >= offset {
                break;
            }
            if ch == '\n' {
                line += 1;
                line_start = pos + 1;
            }
        }

        Some((line, offset - line_start + 1))
    }
}
