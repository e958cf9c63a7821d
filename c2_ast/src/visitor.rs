use crate::decl::{Decl, DeclKind};
use crate::expr::{BuiltinExpr, DesignatedInit, Expr, ExprKind};
use crate::stmt::{Stmt, StmtKind};
use crate::ty::{InternType, QualType, Type};
use crate::Symbol;
use c2_common::Pos;

/// Structural walk over one declaration subtree. Traversal order is fixed:
///
/// - function: return type, receiver identifier, parameter decls in order,
///   body
/// - variable: declared type, initializer
/// - alias: target type; struct: members in order; enum: constant
///   initializers in order; function type: the inner signature
/// - statements and expressions: children in source order, with `case` and
///   `default` entries visited as direct children of their `switch`
///
/// Every reachable node is visited exactly once per walk; leaves (literals,
/// `break`, `continue`, builtin types) short-circuit. Meeting a
/// `Module`-kind type mid-walk is an invariant violation and panics.
pub trait Visitor<'ctx> {
    fn visit_decl(&mut self, _decl: &'ctx Decl<'ctx>) {}

    fn visit_stmt(&mut self, _stmt: &'ctx Stmt<'ctx>) {}

    fn visit_expr(&mut self, _expr: &'ctx Expr<'ctx>) {}

    fn visit_type(&mut self, _ty: InternType<'ctx>) {}

    fn visit_identifier(
        &mut self,
        name: Symbol<'ctx>,
        pos: Option<Pos>,
        target: Option<&'ctx Decl<'ctx>>,
    );
}

pub fn walk_decl<'ctx, V: Visitor<'ctx>>(visitor: &mut V, decl: &'ctx Decl<'ctx>) {
    visitor.visit_decl(decl);
    match &decl.kind {
        DeclKind::Func(func) => {
            walk_qual_type(visitor, func.return_ty);
            if let Some(receiver) = func.receiver {
                visitor.visit_identifier(receiver, Some(decl.pos), None);
            }
            for param in func.params {
                walk_decl(visitor, param);
            }
            if let Some(body) = func.body {
                walk_stmt(visitor, body);
            }
        }
        DeclKind::Var(var) => {
            walk_qual_type(visitor, var.var_ty);
            if let Some(init) = var.init {
                walk_expr(visitor, init);
            }
        }
        DeclKind::EnumValue(value) => {
            if let Some(init) = value.init {
                walk_expr(visitor, init);
            }
        }
        DeclKind::AliasType { target } => walk_qual_type(visitor, *target),
        DeclKind::StructType(s) => {
            for member in s.members {
                walk_decl(visitor, member);
            }
        }
        DeclKind::EnumType(e) => {
            for constant in e.constants {
                if let Some(init) = constant.as_enum_value().and_then(|v| v.init) {
                    walk_expr(visitor, init);
                }
            }
        }
        DeclKind::FunctionType { signature } => walk_decl(visitor, signature),
        DeclKind::ArrayValue { entry } => walk_expr(visitor, entry),
        DeclKind::Import(..) | DeclKind::Label(..) => {}
    }
}

fn walk_qual_type<'ctx, V: Visitor<'ctx>>(visitor: &mut V, ty: QualType<'ctx>) {
    walk_type(visitor, ty.ty);
}

fn walk_type<'ctx, V: Visitor<'ctx>>(visitor: &mut V, ty: InternType<'ctx>) {
    visitor.visit_type(ty);
    match &*ty {
        Type::Builtin(..) => {}
        Type::Pointer(pointee) => walk_qual_type(visitor, *pointee),
        Type::Array(array) => {
            walk_qual_type(visitor, array.elem);
            if let Some(size) = array.size {
                walk_expr(visitor, size);
            }
        }
        Type::Ref(r) => {
            if let Some(qualifier) = r.qualifier {
                visitor.visit_identifier(qualifier, None, None);
            }
            visitor.visit_identifier(r.name, None, r.target.get().copied());
        }
        // these only occur as the type of a decl whose children the decl
        // walk already covers
        Type::Alias(..) | Type::Struct(..) | Type::Enum(..) | Type::Func(..) => {}
        Type::Module(..) => panic!("module sentinel type reached by AST walk"),
    }
}

fn walk_stmt<'ctx, V: Visitor<'ctx>>(visitor: &mut V, stmt: &'ctx Stmt<'ctx>) {
    visitor.visit_stmt(stmt);
    match &stmt.kind {
        StmtKind::Return(expr) => {
            if let Some(expr) = expr {
                walk_expr(visitor, expr);
            }
        }
        StmtKind::Expr(expr) => walk_expr(visitor, expr),
        StmtKind::If {
            cond,
            then_stmt,
            else_stmt,
        } => {
            walk_expr(visitor, cond);
            walk_stmt(visitor, then_stmt);
            if let Some(else_stmt) = else_stmt {
                walk_stmt(visitor, else_stmt);
            }
        }
        StmtKind::While { cond, body } => {
            walk_expr(visitor, cond);
            walk_stmt(visitor, body);
        }
        StmtKind::Do { body, cond } => {
            walk_stmt(visitor, body);
            walk_expr(visitor, cond);
        }
        StmtKind::For {
            init,
            cond,
            incr,
            body,
        } => {
            if let Some(init) = init {
                walk_stmt(visitor, init);
            }
            if let Some(cond) = cond {
                walk_expr(visitor, cond);
            }
            if let Some(incr) = incr {
                walk_expr(visitor, incr);
            }
            walk_stmt(visitor, body);
        }
        StmtKind::Switch { cond, cases } => {
            walk_expr(visitor, cond);
            for case in *cases {
                walk_stmt(visitor, case);
            }
        }
        StmtKind::Case { cond, stmts } => {
            walk_expr(visitor, cond);
            for stmt in *stmts {
                walk_stmt(visitor, stmt);
            }
        }
        StmtKind::Default { stmts } => {
            for stmt in *stmts {
                walk_stmt(visitor, stmt);
            }
        }
        StmtKind::Break | StmtKind::Continue | StmtKind::Goto { .. } => {}
        StmtKind::Label { stmt, .. } => walk_stmt(visitor, stmt),
        StmtKind::Compound { stmts } => {
            for stmt in *stmts {
                walk_stmt(visitor, stmt);
            }
        }
        StmtKind::Decl(decl) => walk_decl(visitor, decl),
        StmtKind::Asm(asm) => {
            for (_, expr) in asm.outputs {
                walk_expr(visitor, expr);
            }
            for (_, expr) in asm.inputs {
                walk_expr(visitor, expr);
            }
        }
    }
}

fn walk_expr<'ctx, V: Visitor<'ctx>>(visitor: &mut V, expr: &'ctx Expr<'ctx>) {
    visitor.visit_expr(expr);
    match &expr.kind {
        ExprKind::IntegerLit { .. }
        | ExprKind::FloatLit { .. }
        | ExprKind::BoolLit(..)
        | ExprKind::CharLit { .. }
        | ExprKind::StringLit { .. }
        | ExprKind::Nil => {}
        ExprKind::Identifier(ident) => {
            visitor.visit_identifier(ident.name, Some(expr.pos), ident.target.get().copied());
        }
        ExprKind::TypeExpr(ty) => walk_qual_type(visitor, *ty),
        ExprKind::Call { callee, args } => {
            walk_expr(visitor, callee);
            for arg in *args {
                walk_expr(visitor, arg);
            }
        }
        ExprKind::InitList { values } => {
            for value in *values {
                walk_expr(visitor, value);
            }
        }
        ExprKind::DesignatedInit(init) => match init {
            DesignatedInit::Field { value, .. } => walk_expr(visitor, value),
            DesignatedInit::Index { index, value } => {
                walk_expr(visitor, index);
                walk_expr(visitor, value);
            }
        },
        ExprKind::Binop { lhs, rhs, .. } => {
            walk_expr(visitor, lhs);
            walk_expr(visitor, rhs);
        }
        ExprKind::CondOp {
            cond,
            then_expr,
            else_expr,
        } => {
            walk_expr(visitor, cond);
            walk_expr(visitor, then_expr);
            walk_expr(visitor, else_expr);
        }
        ExprKind::Unary { expr: inner, .. } => walk_expr(visitor, inner),
        ExprKind::Builtin(builtin) => match builtin {
            BuiltinExpr::Sizeof(inner) | BuiltinExpr::Elemsof(inner) => walk_expr(visitor, inner),
            BuiltinExpr::Offsetof { record, member } => {
                walk_expr(visitor, record);
                walk_expr(visitor, member);
            }
        },
        ExprKind::ArraySubscript { base, index } => {
            walk_expr(visitor, base);
            walk_expr(visitor, index);
        }
        ExprKind::Member(member) => {
            walk_expr(visitor, member.base);
            visitor.visit_identifier(member.member, Some(expr.pos), member.target.get().copied());
        }
        ExprKind::Paren(inner) => walk_expr(visitor, inner),
        ExprKind::BitOffset { base, high, low } => {
            walk_expr(visitor, base);
            walk_expr(visitor, high);
            walk_expr(visitor, low);
        }
        ExprKind::Cast { dest, inner } => {
            walk_expr(visitor, inner);
            walk_qual_type(visitor, *dest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ASTContext;
    use crate::expr::IdentifierExpr;
    use crate::ty::BuiltinKind;
    use bumpalo::Bump;
    use std::cell::OnceCell;

    struct Collector<'ctx> {
        seen: Vec<Symbol<'ctx>>,
    }

    impl<'ctx> Visitor<'ctx> for Collector<'ctx> {
        fn visit_identifier(
            &mut self,
            name: Symbol<'ctx>,
            _pos: Option<Pos>,
            _target: Option<&'ctx Decl<'ctx>>,
        ) {
            self.seen.push(name);
        }
    }

    fn ident<'ctx>(ctx: &ASTContext<'ctx>, name: &str, pos: usize) -> &'ctx Expr<'ctx> {
        ctx.alloc_expr(
            ExprKind::Identifier(IdentifierExpr {
                name: ctx.symbol(name),
                target: OnceCell::new(),
            }),
            Pos::from(pos),
        )
    }

    #[test]
    fn function_walk_covers_each_identifier_once_and_reruns_identically() {
        let bump = Bump::new();
        let ctx = ASTContext::new(&bump);
        let i32_ty = ctx.builtin_type(BuiltinKind::I32);

        let param = ctx.alloc_decl(
            ctx.symbol("a"),
            Pos::from(1),
            false,
            DeclKind::Var(crate::decl::VarDecl {
                var_kind: crate::decl::VarKind::Param,
                var_ty: QualType::new(ctx.intern_ref(
                    ctx.symbol("main"),
                    Some(ctx.symbol("util")),
                    ctx.symbol("Num"),
                )),
                init: None,
                incr_values: Default::default(),
            }),
        );

        let body_expr = ctx.alloc_expr(
            ExprKind::Binop {
                op: crate::expr::BinOp::Add,
                lhs: ident(&ctx, "a", 5),
                rhs: ident(&ctx, "b", 7),
            },
            Pos::from(5),
        );
        let ret = ctx.alloc_stmt(StmtKind::Return(Some(body_expr)), Pos::from(4));
        let body = ctx.alloc_stmt(
            StmtKind::Compound {
                stmts: ctx.alloc_stmts(vec![ret]),
            },
            Pos::from(3),
        );

        let func = ctx.alloc_decl(
            ctx.symbol("add"),
            Pos::from(0),
            true,
            DeclKind::Func(crate::decl::FuncDecl {
                return_ty: i32_ty,
                receiver: None,
                params: ctx.alloc_decls(vec![param]),
                variadic: false,
                body: Some(body),
            }),
        );

        let mut collector = Collector { seen: Vec::new() };
        walk_decl(&mut collector, func);
        let first: Vec<String> = collector.seen.iter().map(|s| s.to_string()).collect();
        assert_eq!(first, vec!["util", "Num", "a", "b"]);

        // the walk has no side effects: running it again gives the same view
        let mut collector = Collector { seen: Vec::new() };
        walk_decl(&mut collector, func);
        let second: Vec<String> = collector.seen.iter().map(|s| s.to_string()).collect();
        assert_eq!(first, second);
    }

    #[test]
    #[should_panic(expected = "module sentinel")]
    fn module_type_in_walk_is_fatal() {
        let bump = Bump::new();
        let ctx = ASTContext::new(&bump);
        let decl = ctx.alloc_decl(
            ctx.symbol("bad"),
            Pos::from(0),
            false,
            DeclKind::Var(crate::decl::VarDecl {
                var_kind: crate::decl::VarKind::Global,
                var_ty: QualType::new(ctx.module_type(ctx.symbol("util"))),
                init: None,
                incr_values: Default::default(),
            }),
        );
        let mut collector = Collector { seen: Vec::new() };
        walk_decl(&mut collector, decl);
    }
}
