use crate::decl::{Decl, DeclKind};
use crate::expr::{BuiltinExpr, DesignatedInit, Expr, ExprKind};
use crate::module::Module;
use crate::stmt::{Stmt, StmtKind};

/// Debug dump of a module: every declaration as an indented tree.
pub fn print_module(module: &Module) -> String {
    let mut out = String::new();
    out.push_str(&format!("module {}\n", module.name));
    for decl in module.decls() {
        print_decl_into(decl, &mut out, 1);
    }
    out
}

pub fn print_decl(decl: &Decl) -> String {
    let mut out = String::new();
    print_decl_into(decl, &mut out, 0);
    out
}

fn pad(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push_str("  ");
    }
}

fn print_decl_into(decl: &Decl, out: &mut String, indent: usize) {
    pad(out, indent);
    let visibility = if decl.public { "public " } else { "" };
    out.push_str(&format!("{}{} {}", visibility, decl.kind_name(), decl.name));
    if let Some(ty) = decl.ty() {
        out.push_str(&format!(" : {ty}"));
    }
    out.push('\n');

    match &decl.kind {
        DeclKind::Func(func) => {
            for param in func.params {
                print_decl_into(param, out, indent + 1);
            }
            if let Some(body) = func.body {
                print_stmt_into(body, out, indent + 1);
            }
        }
        DeclKind::Var(var) => {
            if let Some(init) = var.init {
                pad(out, indent + 1);
                out.push_str(&format!("init {}\n", render_expr(init)));
            }
            for entry in var.incr_values.borrow().iter() {
                print_decl_into(entry, out, indent + 1);
            }
        }
        DeclKind::EnumValue(value) => {
            if let Some(init) = value.init {
                pad(out, indent + 1);
                out.push_str(&format!("init {}\n", render_expr(init)));
            }
        }
        DeclKind::StructType(s) => {
            for member in s.members {
                print_decl_into(member, out, indent + 1);
            }
        }
        DeclKind::EnumType(e) => {
            for constant in e.constants {
                print_decl_into(constant, out, indent + 1);
            }
        }
        DeclKind::FunctionType { signature } => print_decl_into(signature, out, indent + 1),
        DeclKind::Import(import) => {
            pad(out, indent + 1);
            out.push_str(&format!("-> module {}\n", import.module));
        }
        DeclKind::ArrayValue { entry } => {
            pad(out, indent + 1);
            out.push_str(&format!("entry {}\n", render_expr(entry)));
        }
        DeclKind::AliasType { .. } | DeclKind::Label(..) => {}
    }
}

fn print_stmt_into(stmt: &Stmt, out: &mut String, indent: usize) {
    pad(out, indent);
    match &stmt.kind {
        StmtKind::Return(expr) => {
            out.push_str("return");
            if let Some(expr) = expr {
                out.push_str(&format!(" {}", render_expr(expr)));
            }
            out.push('\n');
        }
        StmtKind::Expr(expr) => out.push_str(&format!("expr {}\n", render_expr(expr))),
        StmtKind::If {
            cond,
            then_stmt,
            else_stmt,
        } => {
            out.push_str(&format!("if {}\n", render_expr(cond)));
            print_stmt_into(then_stmt, out, indent + 1);
            if let Some(else_stmt) = else_stmt {
                pad(out, indent);
                out.push_str("else\n");
                print_stmt_into(else_stmt, out, indent + 1);
            }
        }
        StmtKind::While { cond, body } => {
            out.push_str(&format!("while {}\n", render_expr(cond)));
            print_stmt_into(body, out, indent + 1);
        }
        StmtKind::Do { body, cond } => {
            out.push_str("do\n");
            print_stmt_into(body, out, indent + 1);
            pad(out, indent);
            out.push_str(&format!("while {}\n", render_expr(cond)));
        }
        StmtKind::For {
            init,
            cond,
            incr,
            body,
        } => {
            out.push_str("for\n");
            if let Some(init) = init {
                print_stmt_into(init, out, indent + 1);
            }
            if let Some(cond) = cond {
                pad(out, indent + 1);
                out.push_str(&format!("cond {}\n", render_expr(cond)));
            }
            if let Some(incr) = incr {
                pad(out, indent + 1);
                out.push_str(&format!("incr {}\n", render_expr(incr)));
            }
            print_stmt_into(body, out, indent + 1);
        }
        StmtKind::Switch { cond, cases } => {
            out.push_str(&format!("switch {}\n", render_expr(cond)));
            for case in *cases {
                print_stmt_into(case, out, indent + 1);
            }
        }
        StmtKind::Case { cond, stmts } => {
            out.push_str(&format!("case {}\n", render_expr(cond)));
            for stmt in *stmts {
                print_stmt_into(stmt, out, indent + 1);
            }
        }
        StmtKind::Default { stmts } => {
            out.push_str("default\n");
            for stmt in *stmts {
                print_stmt_into(stmt, out, indent + 1);
            }
        }
        StmtKind::Break => out.push_str("break\n"),
        StmtKind::Continue => out.push_str("continue\n"),
        StmtKind::Label { name, stmt } => {
            out.push_str(&format!("label {name}\n"));
            print_stmt_into(stmt, out, indent + 1);
        }
        StmtKind::Goto { name } => out.push_str(&format!("goto {name}\n")),
        StmtKind::Compound { stmts } => {
            out.push_str("compound\n");
            for stmt in *stmts {
                print_stmt_into(stmt, out, indent + 1);
            }
        }
        StmtKind::Decl(decl) => {
            out.push_str("decl\n");
            print_decl_into(decl, out, indent + 1);
        }
        StmtKind::Asm(asm) => out.push_str(&format!("asm \"{}\"\n", asm.template)),
    }
}

/// Renders an expression in source syntax. Shared by the debug printer and
/// the interface emitter.
pub fn render_expr(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::IntegerLit { text, .. } => text.to_string(),
        ExprKind::FloatLit { text } => text.to_string(),
        ExprKind::BoolLit(value) => if *value { "true" } else { "false" }.to_string(),
        ExprKind::CharLit { value } => format!("'{}'", value.escape_default()),
        ExprKind::StringLit { text } => format!("\"{text}\""),
        ExprKind::Nil => "nil".to_string(),
        ExprKind::Identifier(ident) => ident.name.to_string(),
        ExprKind::TypeExpr(ty) => ty.to_string(),
        ExprKind::Call { callee, args } => {
            let args: Vec<String> = args.iter().map(|a| render_expr(a)).collect();
            format!("{}({})", render_expr(callee), args.join(", "))
        }
        ExprKind::InitList { values } => {
            let values: Vec<String> = values.iter().map(|v| render_expr(v)).collect();
            format!("{{ {} }}", values.join(", "))
        }
        ExprKind::DesignatedInit(init) => match init {
            DesignatedInit::Field { field, value } => {
                format!(".{field} = {}", render_expr(value))
            }
            DesignatedInit::Index { index, value } => {
                format!("[{}] = {}", render_expr(index), render_expr(value))
            }
        },
        ExprKind::Binop { op, lhs, rhs } => {
            format!("{} {op} {}", render_expr(lhs), render_expr(rhs))
        }
        ExprKind::CondOp {
            cond,
            then_expr,
            else_expr,
        } => format!(
            "{} ? {} : {}",
            render_expr(cond),
            render_expr(then_expr),
            render_expr(else_expr)
        ),
        ExprKind::Unary { op, expr } if op.is_postfix() => {
            format!("{}{op}", render_expr(expr))
        }
        ExprKind::Unary { op, expr } => format!("{op}{}", render_expr(expr)),
        ExprKind::Builtin(builtin) => match builtin {
            BuiltinExpr::Sizeof(inner) => format!("sizeof({})", render_expr(inner)),
            BuiltinExpr::Elemsof(inner) => format!("elemsof({})", render_expr(inner)),
            BuiltinExpr::Offsetof { record, member } => format!(
                "offsetof({}, {})",
                render_expr(record),
                render_expr(member)
            ),
        },
        ExprKind::ArraySubscript { base, index } => {
            format!("{}[{}]", render_expr(base), render_expr(index))
        }
        ExprKind::Member(member) => {
            let sep = if member.arrow { "->" } else { "." };
            format!("{}{sep}{}", render_expr(member.base), member.member)
        }
        ExprKind::Paren(inner) => format!("({})", render_expr(inner)),
        ExprKind::BitOffset { base, high, low } => format!(
            "{}[{}:{}]",
            render_expr(base),
            render_expr(high),
            render_expr(low)
        ),
        ExprKind::Cast { dest, inner } => {
            format!("cast<{dest}>({})", render_expr(inner))
        }
    }
}
