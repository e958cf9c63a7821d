use crate::expr::Expr;
use crate::stmt::Stmt;
use crate::ty::QualType;
use crate::Symbol;
use c2_common::Pos;
use std::cell::{Cell, OnceCell, RefCell};

/// A top-level or nested declaration. The declaring module and the resolved
/// type are filled in once during analysis; everything else is set when the
/// node is built.
#[derive(Debug)]
pub struct Decl<'ctx> {
    pub name: Symbol<'ctx>,
    pub pos: Pos,
    pub public: bool,
    module: OnceCell<Symbol<'ctx>>,
    ty: OnceCell<QualType<'ctx>>,
    pub kind: DeclKind<'ctx>,
}

#[derive(Debug)]
pub enum DeclKind<'ctx> {
    Func(FuncDecl<'ctx>),
    Var(VarDecl<'ctx>),
    EnumValue(EnumValueDecl<'ctx>),
    AliasType { target: QualType<'ctx> },
    StructType(StructTypeDecl<'ctx>),
    EnumType(EnumTypeDecl<'ctx>),
    FunctionType { signature: &'ctx Decl<'ctx> },
    Import(ImportDecl<'ctx>),
    Label(LabelDecl),
    ArrayValue { entry: &'ctx Expr<'ctx> },
}

#[derive(Debug)]
pub struct FuncDecl<'ctx> {
    pub return_ty: QualType<'ctx>,
    /// Struct-function receiver, visited between return type and parameters.
    pub receiver: Option<Symbol<'ctx>>,
    pub params: &'ctx [&'ctx Decl<'ctx>],
    pub variadic: bool,
    pub body: Option<&'ctx Stmt<'ctx>>,
}

/// Where a variable declaration lives; globals mangle with their module
/// name on emission, the other kinds keep their plain name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarKind {
    Global,
    Local,
    Param,
    Member,
}

#[derive(Debug)]
pub struct VarDecl<'ctx> {
    pub var_kind: VarKind,
    pub var_ty: QualType<'ctx>,
    pub init: Option<&'ctx Expr<'ctx>>,
    /// Incremental `ArrayValue` entries attached during analysis, in source
    /// order.
    pub incr_values: RefCell<Vec<&'ctx Decl<'ctx>>>,
}

#[derive(Debug)]
pub struct EnumValueDecl<'ctx> {
    pub init: Option<&'ctx Expr<'ctx>>,
    pub value: OnceCell<i64>,
}

#[derive(Debug)]
pub struct StructTypeDecl<'ctx> {
    pub is_union: bool,
    pub members: &'ctx [&'ctx Decl<'ctx>],
}

#[derive(Debug)]
pub struct EnumTypeDecl<'ctx> {
    pub constants: &'ctx [&'ctx Decl<'ctx>],
}

#[derive(Debug)]
pub struct ImportDecl<'ctx> {
    /// The module this import brings in; the decl name is the local alias.
    pub module: Symbol<'ctx>,
    pub used: Cell<bool>,
}

#[derive(Debug, Default)]
pub struct LabelDecl {
    pub defined: Cell<bool>,
    pub used: Cell<bool>,
}

impl<'ctx> Decl<'ctx> {
    pub(crate) fn new(name: Symbol<'ctx>, pos: Pos, public: bool, kind: DeclKind<'ctx>) -> Self {
        Self {
            name,
            pos,
            public,
            module: OnceCell::new(),
            ty: OnceCell::new(),
            kind,
        }
    }

    pub fn module(&self) -> Option<Symbol<'ctx>> {
        self.module.get().copied()
    }

    pub fn set_module(&self, module: Symbol<'ctx>) {
        let _ = self.module.set(module);
    }

    pub fn ty(&self) -> Option<QualType<'ctx>> {
        self.ty.get().copied()
    }

    pub fn set_ty(&self, ty: QualType<'ctx>) {
        let _ = self.ty.set(ty);
    }

    pub fn is_type_decl(&self) -> bool {
        matches!(
            self.kind,
            DeclKind::AliasType { .. }
                | DeclKind::StructType(..)
                | DeclKind::EnumType(..)
                | DeclKind::FunctionType { .. }
        )
    }

    pub fn as_func(&self) -> Option<&FuncDecl<'ctx>> {
        if let DeclKind::Func(f) = &self.kind {
            Some(f)
        } else {
            None
        }
    }

    pub fn as_var(&self) -> Option<&VarDecl<'ctx>> {
        if let DeclKind::Var(v) = &self.kind {
            Some(v)
        } else {
            None
        }
    }

    pub fn as_enum_value(&self) -> Option<&EnumValueDecl<'ctx>> {
        if let DeclKind::EnumValue(e) = &self.kind {
            Some(e)
        } else {
            None
        }
    }

    pub fn as_import(&self) -> Option<&ImportDecl<'ctx>> {
        if let DeclKind::Import(i) = &self.kind {
            Some(i)
        } else {
            None
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            DeclKind::Func(..) => "function",
            DeclKind::Var(..) => "variable",
            DeclKind::EnumValue(..) => "enum constant",
            DeclKind::AliasType { .. } => "type alias",
            DeclKind::StructType(..) => "struct type",
            DeclKind::EnumType(..) => "enum type",
            DeclKind::FunctionType { .. } => "function type",
            DeclKind::Import(..) => "import",
            DeclKind::Label(..) => "label",
            DeclKind::ArrayValue { .. } => "array value",
        }
    }
}
