pub mod diagnostics;
pub mod sourcemap;
pub mod span;

use diagnostics::{DiagnosticEmitter, IntoDiagnostic, Severity};
pub use lasso;
use sourcemap::{SourceId, SourceMap};
use target_lexicon::Triple;

pub type InternedStr = lasso::Spur;
pub type Interner = lasso::Rodeo;

#[derive(thiserror::Error, Debug)]
#[error("had errors")]
pub struct HadErrors;

/// State shared by every stage of a compilation: the target triple, the
/// sources being compiled, the string interner and the diagnostics sink.
pub struct Session<D: DiagnosticEmitter> {
    pub target: Triple,

    pub sources: SourceMap,
    pub interner: Interner,

    pub diagnostics: D,
}

impl<D: DiagnosticEmitter> Session<D> {
    pub fn new(target: Triple, diagnostics: D) -> Self {
        Self {
            target,

            sources: SourceMap::default(),
            interner: Interner::new(),

            diagnostics,
        }
    }

    pub fn report(
        &mut self,
        diagnostic: impl IntoDiagnostic,
        source_id: SourceId,
    ) -> Result<(), HadErrors> {
        let diagnostic = diagnostic.into_diagnostic(source_id, &self.interner);
        let severity = diagnostic.severity;

        self.diagnostics.emit_diagnostic(diagnostic, &self.sources);

        if severity < Severity::Error {
            Ok(())
        } else {
            Err(HadErrors)
        }
    }

    pub fn report_all<I>(&mut self, diagnostics: I, source_id: SourceId) -> Result<(), HadErrors>
    where
        I: IntoIterator,
        I::Item: IntoDiagnostic,
    {
        let mut had_error = false;

        for diagnostic in diagnostics {
            let diagnostic = diagnostic.into_diagnostic(source_id, &self.interner);
            had_error |= diagnostic.severity >= Severity::Error;
            self.diagnostics.emit_diagnostic(diagnostic, &self.sources);
        }

        if !had_error {
            Ok(())
        } else {
            Err(HadErrors)
        }
    }
}
