mod diag;
mod source;

pub use diag::{
    DiagKind, Diagnostic, DiagnosticEngine, DiagnosticManager, Severity,
};
pub use source::{Location, Pos, SourceFile, SourceManager};
