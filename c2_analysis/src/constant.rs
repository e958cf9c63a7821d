use crate::errors;
use c2_ast::{
    BinOp, BuiltinExpr, BuiltinKind, Decl, DeclKind, Expr, ExprKind, Type, UnaryOp,
};
use c2_common::DiagnosticEngine;
use std::cell::RefCell;
use std::collections::HashSet;

/// Best-effort compile-time evaluation over resolved expressions. Follows
/// enum constants and const-qualified variables through their initializers;
/// anything that needs target layout (`sizeof`, `offsetof`) stays
/// non-constant.
pub(crate) struct ConstEvaluator<'a, E> {
    diags: &'a E,
    in_progress: RefCell<HashSet<*const ()>>,
}

impl<'a, E: DiagnosticEngine> ConstEvaluator<'a, E> {
    pub(crate) fn new(diags: &'a E) -> Self {
        Self {
            diags,
            in_progress: RefCell::new(HashSet::default()),
        }
    }

    pub(crate) fn eval<'ctx>(&self, expr: &Expr<'ctx>) -> Option<i64> {
        match &expr.kind {
            ExprKind::IntegerLit { value, .. } => i64::try_from(*value).ok(),
            ExprKind::CharLit { value } => Some(*value as i64),
            ExprKind::BoolLit(value) => Some(i64::from(*value)),
            ExprKind::Paren(inner) => self.eval(inner),
            ExprKind::Cast { inner, .. } => self.eval(inner),
            ExprKind::Unary { op, expr } => {
                let value = self.eval(expr)?;
                match op {
                    UnaryOp::Plus => Some(value),
                    UnaryOp::Minus => value.checked_neg(),
                    UnaryOp::BitNot => Some(!value),
                    UnaryOp::LNot => Some(i64::from(value == 0)),
                    _ => None,
                }
            }
            ExprKind::Binop { op, lhs, rhs } => {
                let a = self.eval(lhs)?;
                let b = self.eval(rhs)?;
                match op {
                    BinOp::Add => a.checked_add(b),
                    BinOp::Sub => a.checked_sub(b),
                    BinOp::Mul => a.checked_mul(b),
                    BinOp::Div => a.checked_div(b),
                    BinOp::Rem => a.checked_rem(b),
                    BinOp::Shl => u32::try_from(b).ok().and_then(|s| a.checked_shl(s)),
                    BinOp::Shr => u32::try_from(b).ok().and_then(|s| a.checked_shr(s)),
                    BinOp::BitAnd => Some(a & b),
                    BinOp::BitXor => Some(a ^ b),
                    BinOp::BitOr => Some(a | b),
                    BinOp::Lt => Some(i64::from(a < b)),
                    BinOp::Gt => Some(i64::from(a > b)),
                    BinOp::Le => Some(i64::from(a <= b)),
                    BinOp::Ge => Some(i64::from(a >= b)),
                    BinOp::Eq => Some(i64::from(a == b)),
                    BinOp::Ne => Some(i64::from(a != b)),
                    BinOp::LAnd => Some(i64::from(a != 0 && b != 0)),
                    BinOp::LOr => Some(i64::from(a != 0 || b != 0)),
                    _ => None,
                }
            }
            ExprKind::CondOp {
                cond,
                then_expr,
                else_expr,
            } => {
                if self.eval(cond)? != 0 {
                    self.eval(then_expr)
                } else {
                    self.eval(else_expr)
                }
            }
            ExprKind::Identifier(ident) => {
                let target = ident.target.get()?;
                self.eval_decl(target)
            }
            ExprKind::Member(member) => {
                let target = member.target.get()?;
                self.eval_decl(target)
            }
            ExprKind::Builtin(BuiltinExpr::Elemsof(inner)) => {
                let ty = inner.ty()?.canonical();
                let array = ty.ty.as_array()?;
                array.len.get().and_then(|len| i64::try_from(*len).ok())
            }
            _ => None,
        }
    }

    fn eval_decl<'ctx>(&self, decl: &Decl<'ctx>) -> Option<i64> {
        let key = decl as *const Decl as *const ();
        if !self.in_progress.borrow_mut().insert(key) {
            self.diags
                .report(errors::type_cycle(decl.pos, decl.name));
            return None;
        }

        let result = match &decl.kind {
            DeclKind::EnumValue(value) => match value.value.get() {
                Some(v) => Some(*v),
                None => value.init.and_then(|init| self.eval(init)),
            },
            DeclKind::Var(var) => {
                let is_const = decl.ty().map(|t| t.is_const()).unwrap_or(false);
                if is_const {
                    var.init.and_then(|init| self.eval(init))
                } else {
                    None
                }
            }
            _ => None,
        };

        self.in_progress.borrow_mut().remove(&key);
        result
    }

    /// Checks a folded value against the width of the declared builtin type.
    pub(crate) fn check_range<'ctx>(
        &self,
        value: i64,
        ty: &Type<'ctx>,
        pos: c2_common::Pos,
    ) {
        let Some(kind) = ty.as_builtin() else {
            return;
        };
        let fits = match kind {
            BuiltinKind::Bool => value == 0 || value == 1,
            _ => match (kind.width(), kind.is_signed()) {
                (Some(8), true) => i8::try_from(value).is_ok(),
                (Some(16), true) => i16::try_from(value).is_ok(),
                (Some(32), true) => i32::try_from(value).is_ok(),
                (Some(8), false) => u8::try_from(value).is_ok(),
                (Some(16), false) => u16::try_from(value).is_ok(),
                (Some(32), false) => u32::try_from(value).is_ok(),
                (Some(64), false) => value >= 0,
                _ => true,
            },
        };
        if !fits {
            self.diags
                .report(errors::value_out_of_range(pos, value, kind));
        }
    }
}
