use crate::decl::Decl;
use crate::expr::Expr;
use crate::Symbol;
use c2_common::Pos;

#[derive(Debug)]
pub struct Stmt<'ctx> {
    pub kind: StmtKind<'ctx>,
    pub pos: Pos,
}

#[derive(Debug)]
pub enum StmtKind<'ctx> {
    Return(Option<&'ctx Expr<'ctx>>),
    Expr(&'ctx Expr<'ctx>),
    If {
        cond: &'ctx Expr<'ctx>,
        then_stmt: &'ctx Stmt<'ctx>,
        else_stmt: Option<&'ctx Stmt<'ctx>>,
    },
    While {
        cond: &'ctx Expr<'ctx>,
        body: &'ctx Stmt<'ctx>,
    },
    Do {
        body: &'ctx Stmt<'ctx>,
        cond: &'ctx Expr<'ctx>,
    },
    For {
        init: Option<&'ctx Stmt<'ctx>>,
        cond: Option<&'ctx Expr<'ctx>>,
        incr: Option<&'ctx Expr<'ctx>>,
        body: &'ctx Stmt<'ctx>,
    },
    /// Cases and defaults are direct children of the switch body list, not
    /// nested statements.
    Switch {
        cond: &'ctx Expr<'ctx>,
        cases: &'ctx [&'ctx Stmt<'ctx>],
    },
    Case {
        cond: &'ctx Expr<'ctx>,
        stmts: &'ctx [&'ctx Stmt<'ctx>],
    },
    Default {
        stmts: &'ctx [&'ctx Stmt<'ctx>],
    },
    Break,
    Continue,
    Label {
        name: Symbol<'ctx>,
        stmt: &'ctx Stmt<'ctx>,
    },
    Goto {
        name: Symbol<'ctx>,
    },
    Compound {
        stmts: &'ctx [&'ctx Stmt<'ctx>],
    },
    Decl(&'ctx Decl<'ctx>),
    Asm(AsmStmt<'ctx>),
}

#[derive(Debug)]
pub struct AsmStmt<'ctx> {
    pub template: Symbol<'ctx>,
    pub is_volatile: bool,
    pub outputs: &'ctx [(Symbol<'ctx>, &'ctx Expr<'ctx>)],
    pub inputs: &'ctx [(Symbol<'ctx>, &'ctx Expr<'ctx>)],
    pub clobbers: &'ctx [Symbol<'ctx>],
}

impl<'ctx> Stmt<'ctx> {
    pub(crate) fn new(kind: StmtKind<'ctx>, pos: Pos) -> Self {
        Self { kind, pos }
    }

    pub fn as_compound(&self) -> Option<&'ctx [&'ctx Stmt<'ctx>]> {
        if let StmtKind::Compound { stmts } = self.kind {
            Some(stmts)
        } else {
            None
        }
    }
}
