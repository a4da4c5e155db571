use std::io::Write as _;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor as _};

use crate::sourcemap::{SourceId, SourceMap};
use crate::span::Span;
use crate::Interner;

pub mod prelude {
    pub use super::{Diagnostic, IntoDiagnostic, Severity};
    pub use crate::sourcemap::SourceId;
    pub use crate::span::Span;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// A single user-facing message. Rendered as one line on the terminal,
/// with a `name:line:col` suffix when the source location is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Option<(SourceId, Span)>,
}

impl Diagnostic {
    pub fn new(severity: Severity) -> Self {
        Self {
            severity,
            message: String::new(),
            location: None,
        }
    }

    pub fn error() -> Self {
        Self::new(Severity::Error)
    }

    pub fn warning() -> Self {
        Self::new(Severity::Warning)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn at(mut self, source_id: SourceId, span: Span) -> Self {
        self.location = Some((source_id, span));
        self
    }
}

/// Conversion from a phase error into a reportable diagnostic.
///
/// The interner is passed in so error types can store interned names
/// instead of owned strings.
pub trait IntoDiagnostic {
    fn into_diagnostic(self, source_id: SourceId, interner: &Interner) -> Diagnostic;
}

impl IntoDiagnostic for Diagnostic {
    fn into_diagnostic(self, _source_id: SourceId, _interner: &Interner) -> Diagnostic {
        self
    }
}

pub trait DiagnosticEmitter {
    fn emit_diagnostic(&mut self, diagnostic: Diagnostic, sources: &SourceMap);
}

/// Collecting emitter, used by tests.
impl DiagnosticEmitter for Vec<Diagnostic> {
    fn emit_diagnostic(&mut self, diagnostic: Diagnostic, _sources: &SourceMap) {
        self.push(diagnostic);
    }
}

pub struct PrettyDiagnosticEmitter {
    pub stream: StandardStream,
}

impl Default for PrettyDiagnosticEmitter {
    fn default() -> Self {
        Self {
            stream: StandardStream::stderr(ColorChoice::Auto),
        }
    }
}

impl DiagnosticEmitter for PrettyDiagnosticEmitter {
    fn emit_diagnostic(&mut self, diagnostic: Diagnostic, sources: &SourceMap) {
        self.write_diagnostic(&diagnostic, sources)
            .expect("failed to emit diagnostic");
    }
}

impl PrettyDiagnosticEmitter {
    fn write_diagnostic(
        &mut self,
        diagnostic: &Diagnostic,
        sources: &SourceMap,
    ) -> std::io::Result<()> {
        let (header, color) = match diagnostic.severity {
            Severity::Warning => ("warning", Color::Yellow),
            Severity::Error => ("error", Color::Red),
        };

        let mut spec = ColorSpec::new();
        spec.set_fg(Some(color)).set_bold(true);

        self.stream.set_color(&spec)?;
        write!(self.stream, "{header}: ")?;
        self.stream.reset()?;
        write!(self.stream, "{}", diagnostic.message)?;

        if let Some((source_id, span)) = diagnostic.location {
            if let (Some(source), Some((line, col))) = (
                sources.get(source_id),
                sources.line_col(source_id, span.start),
            ) {
                write!(self.stream, " [{}:{line}:{col}]", source.name)?;
            }
        }

        writeln!(self.stream)
    }
}
