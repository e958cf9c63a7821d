use crate::decl::Decl;
use crate::ty::QualType;
use crate::Symbol;
use c2_common::Pos;
use std::cell::OnceCell;
use std::fmt::Display;

/// An expression node. The type cell is filled during analysis; every
/// expression has one by the time analysis succeeds.
#[derive(Debug)]
pub struct Expr<'ctx> {
    pub kind: ExprKind<'ctx>,
    pub pos: Pos,
    ty: OnceCell<QualType<'ctx>>,
}

#[derive(Debug)]
pub enum ExprKind<'ctx> {
    IntegerLit { value: u64, text: Symbol<'ctx> },
    FloatLit { text: Symbol<'ctx> },
    BoolLit(bool),
    CharLit { value: char },
    /// Content without the surrounding quotes, escapes kept as written.
    StringLit { text: Symbol<'ctx> },
    Nil,
    Identifier(IdentifierExpr<'ctx>),
    /// A type in expression position, as in `sizeof(i32*)`.
    TypeExpr(QualType<'ctx>),
    Call {
        callee: &'ctx Expr<'ctx>,
        args: &'ctx [&'ctx Expr<'ctx>],
    },
    InitList {
        values: &'ctx [&'ctx Expr<'ctx>],
    },
    DesignatedInit(DesignatedInit<'ctx>),
    Binop {
        op: BinOp,
        lhs: &'ctx Expr<'ctx>,
        rhs: &'ctx Expr<'ctx>,
    },
    CondOp {
        cond: &'ctx Expr<'ctx>,
        then_expr: &'ctx Expr<'ctx>,
        else_expr: &'ctx Expr<'ctx>,
    },
    Unary {
        op: UnaryOp,
        expr: &'ctx Expr<'ctx>,
    },
    Builtin(BuiltinExpr<'ctx>),
    ArraySubscript {
        base: &'ctx Expr<'ctx>,
        index: &'ctx Expr<'ctx>,
    },
    Member(MemberExpr<'ctx>),
    Paren(&'ctx Expr<'ctx>),
    /// Bit slice `base[high:low]`.
    BitOffset {
        base: &'ctx Expr<'ctx>,
        high: &'ctx Expr<'ctx>,
        low: &'ctx Expr<'ctx>,
    },
    Cast {
        dest: QualType<'ctx>,
        inner: &'ctx Expr<'ctx>,
    },
}

#[derive(Debug)]
pub struct IdentifierExpr<'ctx> {
    pub name: Symbol<'ctx>,
    pub target: OnceCell<&'ctx Decl<'ctx>>,
}

#[derive(Debug)]
pub struct MemberExpr<'ctx> {
    pub base: &'ctx Expr<'ctx>,
    pub member: Symbol<'ctx>,
    pub arrow: bool,
    pub target: OnceCell<&'ctx Decl<'ctx>>,
}

#[derive(Debug)]
pub enum DesignatedInit<'ctx> {
    Field {
        field: Symbol<'ctx>,
        value: &'ctx Expr<'ctx>,
    },
    Index {
        index: &'ctx Expr<'ctx>,
        value: &'ctx Expr<'ctx>,
    },
}

#[derive(Debug)]
pub enum BuiltinExpr<'ctx> {
    Sizeof(&'ctx Expr<'ctx>),
    Elemsof(&'ctx Expr<'ctx>),
    Offsetof {
        record: &'ctx Expr<'ctx>,
        member: &'ctx Expr<'ctx>,
    },
}

impl<'ctx> Expr<'ctx> {
    pub(crate) fn new(kind: ExprKind<'ctx>, pos: Pos) -> Self {
        Self {
            kind,
            pos,
            ty: OnceCell::new(),
        }
    }

    pub fn ty(&self) -> Option<QualType<'ctx>> {
        self.ty.get().copied()
    }

    pub fn set_ty(&self, ty: QualType<'ctx>) {
        let _ = self.ty.set(ty);
    }

    pub fn as_identifier(&self) -> Option<&IdentifierExpr<'ctx>> {
        if let ExprKind::Identifier(ident) = &self.kind {
            Some(ident)
        } else {
            None
        }
    }

    /// Strips grouping parens.
    pub fn unparenthesized(&self) -> &Expr<'ctx> {
        let mut expr = self;
        while let ExprKind::Paren(inner) = expr.kind {
            expr = inner;
        }
        expr
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    LAnd,
    LOr,
    Assign,
    MulAssign,
    DivAssign,
    RemAssign,
    AddAssign,
    SubAssign,
    ShlAssign,
    ShrAssign,
    AndAssign,
    XorAssign,
    OrAssign,
}

impl BinOp {
    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            Self::Assign
                | Self::MulAssign
                | Self::DivAssign
                | Self::RemAssign
                | Self::AddAssign
                | Self::SubAssign
                | Self::ShlAssign
                | Self::ShrAssign
                | Self::AndAssign
                | Self::XorAssign
                | Self::OrAssign
        )
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Lt | Self::Gt | Self::Le | Self::Ge | Self::Eq | Self::Ne
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Self::LAnd | Self::LOr)
    }
}

impl Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::BitAnd => "&",
            Self::BitXor => "^",
            Self::BitOr => "|",
            Self::LAnd => "&&",
            Self::LOr => "||",
            Self::Assign => "=",
            Self::MulAssign => "*=",
            Self::DivAssign => "/=",
            Self::RemAssign => "%=",
            Self::AddAssign => "+=",
            Self::SubAssign => "-=",
            Self::ShlAssign => "<<=",
            Self::ShrAssign => ">>=",
            Self::AndAssign => "&=",
            Self::XorAssign => "^=",
            Self::OrAssign => "|=",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    PostInc,
    PostDec,
    PreInc,
    PreDec,
    AddrOf,
    Deref,
    Plus,
    Minus,
    BitNot,
    LNot,
}

impl UnaryOp {
    pub fn is_postfix(&self) -> bool {
        matches!(self, Self::PostInc | Self::PostDec)
    }
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PostInc | Self::PreInc => "++",
            Self::PostDec | Self::PreDec => "--",
            Self::AddrOf => "&",
            Self::Deref => "*",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::BitNot => "~",
            Self::LNot => "!",
        };
        f.write_str(s)
    }
}
