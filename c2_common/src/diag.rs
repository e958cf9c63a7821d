use crate::source::{Pos, SourceManager};
use indexmap::IndexSet;
use std::cell::RefCell;
use std::fmt::Display;

const COLOR_ERROR: &str = "\x1b[31m";
const COLOR_WARNING: &str = "\x1b[33m";
const COLOR_NOTE: &str = "\x1b[36m";
const COLOR_RESET: &str = "\x1b[0m";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Note => write!(f, "note"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// The closed set of diagnostic categories the driver understands.
/// `Unused` covers the suppressible warnings; `Semantics` covers statement
/// misuse that is neither a name nor a type problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagKind {
    Syntax,
    UnresolvedImport,
    UnresolvedName,
    TypeMismatch,
    VisibilityViolation,
    Redefinition,
    CycleInComponents,
    CycleInTypes,
    ConstExprRequired,
    Semantics,
    Unused,
    IoError,
    Internal,
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub kind: DiagKind,
    pub severity: Severity,
    pub pos: Option<Pos>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(kind: DiagKind, pos: Pos, message: String) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            pos: Some(pos),
            message,
        }
    }

    pub fn warning(kind: DiagKind, pos: Pos, message: String) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            pos: Some(pos),
            message,
        }
    }

    pub fn standalone(kind: DiagKind, message: String) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            pos: None,
            message,
        }
    }

    pub fn display(&self, sources: &SourceManager, colors: bool) -> String {
        let severity = if colors {
            let color = match self.severity {
                Severity::Error => COLOR_ERROR,
                Severity::Warning => COLOR_WARNING,
                Severity::Note => COLOR_NOTE,
            };
            format!("{color}{}{COLOR_RESET}", self.severity)
        } else {
            self.severity.to_string()
        };

        match self.pos {
            Some(pos) => {
                let loc = sources.location(pos);
                format!("{loc}: {severity}: {}", self.message)
            }
            None => format!("{severity}: {}", self.message),
        }
    }
}

pub trait DiagnosticEngine {
    fn report(&self, diag: Diagnostic);

    fn error_count(&self) -> usize;

    fn warning_count(&self) -> usize;

    fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}

/// Accumulates diagnostics for one build. Duplicates (same kind, position and
/// message) collapse to one entry; `take` hands them back sorted by source
/// position for rendering.
#[derive(Default)]
pub struct DiagnosticManager {
    panic_on_report: bool,
    diags: RefCell<IndexSet<Diagnostic>>,
}

impl DiagnosticEngine for DiagnosticManager {
    fn report(&self, diag: Diagnostic) {
        if self.panic_on_report {
            panic!("kind={:?} message={}", diag.kind, diag.message);
        }
        self.diags.borrow_mut().insert(diag);
    }

    fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }
}

impl DiagnosticManager {
    pub fn new_for_debug() -> Self {
        Self {
            panic_on_report: true,
            diags: RefCell::default(),
        }
    }

    fn count(&self, severity: Severity) -> usize {
        self.diags
            .borrow()
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.diags.borrow().is_empty()
    }

    /// Drop every accumulated warning whose message mentions one of the
    /// silenced warning names.
    pub fn silence_warnings(&self, silenced: &[String]) {
        if silenced.is_empty() {
            return;
        }
        self.diags.borrow_mut().retain(|d| {
            d.severity != Severity::Warning || !silenced.iter().any(|s| d.message.contains(s.as_str()))
        });
    }

    pub fn take(&mut self) -> Vec<Diagnostic> {
        let mut diags = self.diags.borrow_mut();
        let mut diags: Vec<Diagnostic> = diags.drain(..).collect();
        diags.sort_by(|a, b| a.pos.cmp(&b.pos));
        diags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_dedup() {
        let mut diags = DiagnosticManager::default();
        diags.report(Diagnostic::error(
            DiagKind::UnresolvedName,
            Pos::from(10),
            String::from("Symbol foo is not declared"),
        ));
        diags.report(Diagnostic::error(
            DiagKind::UnresolvedName,
            Pos::from(10),
            String::from("Symbol foo is not declared"),
        ));
        diags.report(Diagnostic::warning(
            DiagKind::Unused,
            Pos::from(3),
            String::from("unused-import: bar"),
        ));

        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.warning_count(), 1);
        assert!(diags.has_errors());

        // sorted by position on take
        let taken = diags.take();
        assert_eq!(taken.len(), 2);
        assert_eq!(taken[0].pos, Some(Pos::from(3)));
        assert_eq!(taken[1].pos, Some(Pos::from(10)));
    }

    #[test]
    fn silencing_drops_only_matching_warnings() {
        let mut diags = DiagnosticManager::default();
        diags.report(Diagnostic::warning(
            DiagKind::Unused,
            Pos::from(1),
            String::from("unused-import: module bar is never used"),
        ));
        diags.report(Diagnostic::error(
            DiagKind::Syntax,
            Pos::from(2),
            String::from("unused-import mentioned in an error stays"),
        ));

        diags.silence_warnings(&[String::from("unused-import")]);
        assert_eq!(diags.warning_count(), 0);
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.take().len(), 1);
    }
}
