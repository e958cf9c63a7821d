mod component;
mod context;
mod decl;
mod expr;
mod intern;
mod module;
mod printer;
mod stmt;
mod ty;
mod visitor;

pub use component::{Component, ComponentId, ComponentKind, Components, CycleEdge};
pub use context::ASTContext;
pub use decl::{
    Decl, DeclKind, EnumTypeDecl, EnumValueDecl, FuncDecl, ImportDecl, LabelDecl, StructTypeDecl,
    VarDecl, VarKind,
};
pub use expr::{
    BinOp, BuiltinExpr, DesignatedInit, Expr, ExprKind, IdentifierExpr, MemberExpr, UnaryOp,
};
pub use intern::{Interned, Interner};
pub use module::{Module, ModuleMap};
pub use printer::{print_decl, print_module, render_expr};
pub use stmt::{AsmStmt, Stmt, StmtKind};
pub use ty::{ArrayType, BuiltinKind, EnumType, FuncType, InternType, QualType, Qualifiers, RefType, StructType, Type};
pub use visitor::{walk_decl, Visitor};

/// An interned identifier. Two symbols spelled the same way are the same
/// pointer, so comparisons and hashing are pointer-cheap.
pub type Symbol<'ctx> = Interned<'ctx, str>;
