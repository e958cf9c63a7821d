use c2_ast::CycleEdge;
use c2_common::{DiagKind, Diagnostic, Pos};
use std::path::{Path, PathBuf};

pub(crate) fn unresolved_import(pos: Pos, module: impl std::fmt::Display) -> Diagnostic {
    Diagnostic::error(
        DiagKind::UnresolvedImport,
        pos,
        format!("import of unknown module '{module}'"),
    )
}

pub(crate) fn duplicate_import(pos: Pos, alias: impl std::fmt::Display) -> Diagnostic {
    Diagnostic::error(
        DiagKind::Redefinition,
        pos,
        format!("duplicate import '{alias}'"),
    )
}

pub(crate) fn component_cycle(closing: &CycleEdge, entering: &CycleEdge) -> Diagnostic {
    Diagnostic::standalone(
        DiagKind::CycleInComponents,
        format!(
            "circular dependency between components: '{}' uses '{}' and '{}' uses '{}'",
            closing.from, closing.to, entering.from, entering.to
        ),
    )
}

pub(crate) fn library_not_found(name: &str, dirs: &[PathBuf]) -> Diagnostic {
    let searched: Vec<String> = dirs.iter().map(|d| d.display().to_string()).collect();
    Diagnostic::standalone(
        DiagKind::IoError,
        format!(
            "library '{name}' not found on the search path [{}]",
            searched.join(", ")
        ),
    )
}

pub(crate) fn manifest_unreadable(path: &Path, err: std::io::Error) -> Diagnostic {
    Diagnostic::standalone(
        DiagKind::IoError,
        format!("cannot read manifest {}: {err}", path.display()),
    )
}

pub(crate) fn manifest_invalid(path: &Path, message: &str) -> Diagnostic {
    Diagnostic::standalone(
        DiagKind::Syntax,
        format!("invalid manifest {}: {message}", path.display()),
    )
}

pub(crate) fn duplicate_external_module(module: &str, component: &str) -> Diagnostic {
    Diagnostic::standalone(
        DiagKind::Redefinition,
        format!("module '{module}' of library '{component}' is already provided by another library"),
    )
}

pub(crate) fn recipe_invalid(message: &str) -> Diagnostic {
    Diagnostic::standalone(DiagKind::Syntax, format!("invalid recipe: {message}"))
}

pub(crate) fn cannot_open_file(path: &Path, err: std::io::Error) -> Diagnostic {
    Diagnostic::standalone(
        DiagKind::IoError,
        format!("cannot open {}: {err}", path.display()),
    )
}

pub(crate) fn cannot_write_file(path: &Path, err: std::io::Error) -> Diagnostic {
    Diagnostic::standalone(
        DiagKind::IoError,
        format!("cannot write {}: {err}", path.display()),
    )
}

pub(crate) fn exported_module_missing(name: &str) -> Diagnostic {
    Diagnostic::standalone(
        DiagKind::UnresolvedName,
        format!("exported module '{name}' does not exist"),
    )
}

pub(crate) fn exported_type_leak(
    pos: Pos,
    decl: impl std::fmt::Display,
    ty: impl std::fmt::Display,
) -> Diagnostic {
    Diagnostic::error(
        DiagKind::VisibilityViolation,
        pos,
        format!("public declaration '{decl}' exposes type '{ty}' that importers cannot reach"),
    )
}
