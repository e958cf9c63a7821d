use c2_ast::{DeclKind, Module};
use std::fmt::Write;

/// Renders the public surface of one exported module in source syntax; the
/// result is written out as `<module>.c2i`.
pub(crate) fn generate_interface(module: &Module) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "module {};", module.name);
    out.push('\n');

    for decl in module.decls() {
        if !decl.public {
            continue;
        }
        match &decl.kind {
            DeclKind::Var(var) => {
                let _ = writeln!(out, "public {} {};", var.var_ty, decl.name);
            }
            DeclKind::Func(func) => {
                let mut params = String::new();
                for (i, param) in func.params.iter().enumerate() {
                    if i > 0 {
                        params.push_str(", ");
                    }
                    match param.as_var() {
                        Some(var) => {
                            let _ = write!(params, "{} {}", var.var_ty, param.name);
                        }
                        None => params.push('?'),
                    }
                }
                if func.variadic {
                    if !func.params.is_empty() {
                        params.push_str(", ");
                    }
                    params.push_str("...");
                }
                let _ = writeln!(
                    out,
                    "public func {} {}({});",
                    func.return_ty, decl.name, params
                );
            }
            DeclKind::AliasType { target } => {
                let _ = writeln!(out, "public type {} {};", decl.name, target);
            }
            DeclKind::StructType(s) => {
                let keyword = if s.is_union { "union" } else { "struct" };
                let _ = writeln!(out, "public type {} {keyword} {{", decl.name);
                for member in s.members {
                    if let Some(var) = member.as_var() {
                        let _ = writeln!(out, "    {} {};", var.var_ty, member.name);
                    }
                }
                out.push_str("}\n");
            }
            DeclKind::EnumType(e) => {
                let _ = writeln!(out, "public type {} enum {{", decl.name);
                for constant in e.constants {
                    match constant.as_enum_value().and_then(|v| v.value.get()) {
                        Some(value) => {
                            let _ = writeln!(out, "    {} = {value},", constant.name);
                        }
                        None => {
                            let _ = writeln!(out, "    {},", constant.name);
                        }
                    }
                }
                out.push_str("}\n");
            }
            DeclKind::FunctionType { signature } => {
                if let Some(func) = signature.as_func() {
                    let mut params = String::new();
                    for (i, param) in func.params.iter().enumerate() {
                        if i > 0 {
                            params.push_str(", ");
                        }
                        match param.as_var() {
                            Some(var) => {
                                let _ = write!(params, "{} {}", var.var_ty, param.name);
                            }
                            None => params.push('?'),
                        }
                    }
                    let _ = writeln!(
                        out,
                        "public type {} func {}({});",
                        decl.name, func.return_ty, params
                    );
                }
            }
            _ => {}
        }
    }
    out
}
