use c2_common::{DiagKind, Diagnostic, Pos};
use std::fmt::Display;

pub(crate) fn redefinition(pos: Pos, name: impl Display, kind: &str) -> Diagnostic {
    Diagnostic::error(
        DiagKind::Redefinition,
        pos,
        format!("redefinition of {kind} '{name}'"),
    )
}

pub(crate) fn import_shadows_decl(pos: Pos, name: impl Display) -> Diagnostic {
    Diagnostic::error(
        DiagKind::Redefinition,
        pos,
        format!("import alias '{name}' collides with a declaration of the same name"),
    )
}

pub(crate) fn unresolved_name(pos: Pos, name: impl Display) -> Diagnostic {
    Diagnostic::error(
        DiagKind::UnresolvedName,
        pos,
        format!("unknown identifier '{name}'"),
    )
}

pub(crate) fn unknown_module_alias(pos: Pos, alias: impl Display) -> Diagnostic {
    Diagnostic::error(
        DiagKind::UnresolvedName,
        pos,
        format!("module '{alias}' is not imported here"),
    )
}

pub(crate) fn unknown_member(pos: Pos, name: impl Display, of: impl Display) -> Diagnostic {
    Diagnostic::error(
        DiagKind::UnresolvedName,
        pos,
        format!("'{of}' has no member '{name}'"),
    )
}

pub(crate) fn not_a_type(pos: Pos, name: impl Display) -> Diagnostic {
    Diagnostic::error(
        DiagKind::TypeMismatch,
        pos,
        format!("'{name}' does not name a type"),
    )
}

pub(crate) fn type_mismatch(pos: Pos, expected: impl Display, found: impl Display) -> Diagnostic {
    Diagnostic::error(
        DiagKind::TypeMismatch,
        pos,
        format!("cannot use value of type '{found}' where '{expected}' is required"),
    )
}

pub(crate) fn binop_mismatch(
    pos: Pos,
    op: impl Display,
    lhs: impl Display,
    rhs: impl Display,
) -> Diagnostic {
    Diagnostic::error(
        DiagKind::TypeMismatch,
        pos,
        format!("invalid operands '{lhs}' and '{rhs}' for binary '{op}'"),
    )
}

pub(crate) fn unop_mismatch(pos: Pos, op: impl Display, ty: impl Display) -> Diagnostic {
    Diagnostic::error(
        DiagKind::TypeMismatch,
        pos,
        format!("invalid operand '{ty}' for unary '{op}'"),
    )
}

pub(crate) fn condition_not_bool(pos: Pos, found: impl Display) -> Diagnostic {
    Diagnostic::error(
        DiagKind::TypeMismatch,
        pos,
        format!("condition must be 'bool', found '{found}'"),
    )
}

pub(crate) fn not_a_function(pos: Pos, ty: impl Display) -> Diagnostic {
    Diagnostic::error(
        DiagKind::TypeMismatch,
        pos,
        format!("called value of type '{ty}' is not a function"),
    )
}

pub(crate) fn wrong_arg_count(pos: Pos, expected: usize, found: usize) -> Diagnostic {
    Diagnostic::error(
        DiagKind::TypeMismatch,
        pos,
        format!("function expects {expected} arguments, found {found}"),
    )
}

pub(crate) fn not_indexable(pos: Pos, ty: impl Display) -> Diagnostic {
    Diagnostic::error(
        DiagKind::TypeMismatch,
        pos,
        format!("value of type '{ty}' cannot be indexed"),
    )
}

pub(crate) fn missing_return_value(pos: Pos, expected: impl Display) -> Diagnostic {
    Diagnostic::error(
        DiagKind::TypeMismatch,
        pos,
        format!("missing return value of type '{expected}'"),
    )
}

pub(crate) fn void_function_returns_value(pos: Pos) -> Diagnostic {
    Diagnostic::error(
        DiagKind::TypeMismatch,
        pos,
        String::from("function has no return type and cannot return a value"),
    )
}

pub(crate) fn visibility_violation(pos: Pos, name: impl Display, module: impl Display) -> Diagnostic {
    Diagnostic::error(
        DiagKind::VisibilityViolation,
        pos,
        format!("'{name}' is private to module '{module}'"),
    )
}

pub(crate) fn const_expr_required(pos: Pos, what: &str) -> Diagnostic {
    Diagnostic::error(
        DiagKind::ConstExprRequired,
        pos,
        format!("{what} must be a compile-time constant"),
    )
}

pub(crate) fn type_cycle(pos: Pos, name: impl Display) -> Diagnostic {
    Diagnostic::error(
        DiagKind::CycleInTypes,
        pos,
        format!("type '{name}' depends on itself"),
    )
}

pub(crate) fn value_out_of_range(pos: Pos, value: impl Display, ty: impl Display) -> Diagnostic {
    Diagnostic::error(
        DiagKind::TypeMismatch,
        pos,
        format!("constant value {value} is out of range for type '{ty}'"),
    )
}

pub(crate) fn not_assignable(pos: Pos) -> Diagnostic {
    Diagnostic::error(
        DiagKind::Semantics,
        pos,
        String::from("expression is not assignable"),
    )
}

pub(crate) fn break_outside_loop(pos: Pos) -> Diagnostic {
    Diagnostic::error(
        DiagKind::Semantics,
        pos,
        String::from("'break' can only be used inside a loop or switch"),
    )
}

pub(crate) fn continue_outside_loop(pos: Pos) -> Diagnostic {
    Diagnostic::error(
        DiagKind::Semantics,
        pos,
        String::from("'continue' can only be used inside a loop"),
    )
}

pub(crate) fn init_list_outside_init(pos: Pos) -> Diagnostic {
    Diagnostic::error(
        DiagKind::Semantics,
        pos,
        String::from("initializer list is only valid in an initialization"),
    )
}

pub(crate) fn arrow_on_non_pointer(pos: Pos, ty: impl Display) -> Diagnostic {
    Diagnostic::error(
        DiagKind::TypeMismatch,
        pos,
        format!("'->' applied to non-pointer value of type '{ty}'"),
    )
}

pub(crate) fn member_on_value(pos: Pos, ty: impl Display) -> Diagnostic {
    Diagnostic::error(
        DiagKind::TypeMismatch,
        pos,
        format!("member access on non-struct value of type '{ty}'"),
    )
}

pub(crate) fn undefined_label(pos: Pos, name: impl Display) -> Diagnostic {
    Diagnostic::error(
        DiagKind::UnresolvedName,
        pos,
        format!("label '{name}' is not defined in this function"),
    )
}

pub(crate) fn bit_offset_base(pos: Pos, ty: impl Display) -> Diagnostic {
    Diagnostic::error(
        DiagKind::TypeMismatch,
        pos,
        format!("bit slices need an unsigned integer base, found '{ty}'"),
    )
}

pub(crate) fn incremental_on_non_array(pos: Pos, name: impl Display) -> Diagnostic {
    Diagnostic::error(
        DiagKind::TypeMismatch,
        pos,
        format!("'{name} +=' needs an array variable"),
    )
}

pub(crate) fn incremental_with_init(pos: Pos, name: impl Display) -> Diagnostic {
    Diagnostic::error(
        DiagKind::Semantics,
        pos,
        format!("array '{name}' has both an initializer and incremental entries"),
    )
}

pub(crate) fn unused_import(pos: Pos, name: impl Display) -> Diagnostic {
    Diagnostic::warning(
        DiagKind::Unused,
        pos,
        format!("unused-import: module '{name}' is imported but never used"),
    )
}

pub(crate) fn unused_label(pos: Pos, name: impl Display) -> Diagnostic {
    Diagnostic::warning(
        DiagKind::Unused,
        pos,
        format!("unused-label: label '{name}' is never the target of a goto"),
    )
}

pub(crate) fn case_outside_switch(pos: Pos) -> Diagnostic {
    Diagnostic::error(
        DiagKind::Semantics,
        pos,
        String::from("'case' and 'default' can only appear inside a switch"),
    )
}

pub(crate) fn elemsof_non_array(pos: Pos, ty: impl Display) -> Diagnostic {
    Diagnostic::error(
        DiagKind::TypeMismatch,
        pos,
        format!("'elemsof' needs an array value, found '{ty}'"),
    )
}

pub(crate) fn invalid_bit_range(pos: Pos, high: i64, low: i64) -> Diagnostic {
    Diagnostic::error(
        DiagKind::Semantics,
        pos,
        format!("invalid bit range [{high}:{low}], the high bit lies below the low bit"),
    )
}
