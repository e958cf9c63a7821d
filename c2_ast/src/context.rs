use crate::decl::{Decl, DeclKind};
use crate::expr::{Expr, ExprKind};
use crate::intern::Interner;
use crate::stmt::{Stmt, StmtKind};
use crate::ty::{
    ArrayType, BuiltinKind, InternType, QualType, RefType, Type,
};
use crate::Symbol;
use bumpalo::Bump;
use c2_common::Pos;
use std::cell::OnceCell;

/// Owns every AST node and every interned type of one build. Nodes are bump
/// allocated and never freed individually; dropping the `Bump` the context
/// borrows releases the whole tree at once.
///
/// Construction is idempotent for types: structurally equal inputs to the
/// `intern_*` methods always return the same pointer.
pub struct ASTContext<'ctx> {
    arena: &'ctx Bump,
    symbols: Interner<'ctx, str>,
    types: Interner<'ctx, Type<'ctx>>,
}

impl<'ctx> ASTContext<'ctx> {
    pub fn new(arena: &'ctx Bump) -> Self {
        Self {
            arena,
            symbols: Interner::new(arena),
            types: Interner::new(arena),
        }
    }

    pub fn symbol(&self, name: &str) -> Symbol<'ctx> {
        self.symbols.define_str(name)
    }

    pub fn intern_builtin(&self, kind: BuiltinKind) -> InternType<'ctx> {
        self.types.define(Type::Builtin(kind))
    }

    pub fn intern_pointer(&self, pointee: QualType<'ctx>) -> InternType<'ctx> {
        self.types.define(Type::Pointer(pointee))
    }

    pub fn intern_array(
        &self,
        elem: QualType<'ctx>,
        size: Option<&'ctx Expr<'ctx>>,
    ) -> InternType<'ctx> {
        self.types.define(Type::Array(ArrayType {
            elem,
            size,
            len: OnceCell::new(),
        }))
    }

    /// `home` is the module the reference appears in; it is part of the
    /// structural identity so unqualified names from different modules stay
    /// distinct.
    pub fn intern_ref(
        &self,
        home: Symbol<'ctx>,
        qualifier: Option<Symbol<'ctx>>,
        name: Symbol<'ctx>,
    ) -> InternType<'ctx> {
        self.types.define(Type::Ref(RefType {
            home,
            qualifier,
            name,
            target: OnceCell::new(),
        }))
    }

    pub fn intern_type(&self, ty: Type<'ctx>) -> InternType<'ctx> {
        self.types.define(ty)
    }

    pub fn module_type(&self, module: Symbol<'ctx>) -> InternType<'ctx> {
        self.types.define(Type::Module(module))
    }

    pub fn builtin_type(&self, kind: BuiltinKind) -> QualType<'ctx> {
        QualType::new(self.intern_builtin(kind))
    }

    pub fn alloc_decl(
        &self,
        name: Symbol<'ctx>,
        pos: Pos,
        public: bool,
        kind: DeclKind<'ctx>,
    ) -> &'ctx Decl<'ctx> {
        self.arena.alloc(Decl::new(name, pos, public, kind))
    }

    pub fn alloc_expr(&self, kind: ExprKind<'ctx>, pos: Pos) -> &'ctx Expr<'ctx> {
        self.arena.alloc(Expr::new(kind, pos))
    }

    pub fn alloc_stmt(&self, kind: StmtKind<'ctx>, pos: Pos) -> &'ctx Stmt<'ctx> {
        self.arena.alloc(Stmt::new(kind, pos))
    }

    pub fn alloc_decls(&self, decls: Vec<&'ctx Decl<'ctx>>) -> &'ctx [&'ctx Decl<'ctx>] {
        self.arena.alloc_slice_copy(&decls)
    }

    pub fn alloc_exprs(&self, exprs: Vec<&'ctx Expr<'ctx>>) -> &'ctx [&'ctx Expr<'ctx>] {
        self.arena.alloc_slice_copy(&exprs)
    }

    pub fn alloc_stmts(&self, stmts: Vec<&'ctx Stmt<'ctx>>) -> &'ctx [&'ctx Stmt<'ctx>] {
        self.arena.alloc_slice_copy(&stmts)
    }

    pub fn alloc_symbols(&self, symbols: Vec<Symbol<'ctx>>) -> &'ctx [Symbol<'ctx>] {
        self.arena.alloc_slice_copy(&symbols)
    }

    pub fn alloc_operands(
        &self,
        operands: Vec<(Symbol<'ctx>, &'ctx Expr<'ctx>)>,
    ) -> &'ctx [(Symbol<'ctx>, &'ctx Expr<'ctx>)] {
        self.arena.alloc_slice_copy(&operands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::Qualifiers;

    #[test]
    fn builtin_types_are_interned() {
        let bump = Bump::new();
        let ctx = ASTContext::new(&bump);

        let a = ctx.intern_builtin(BuiltinKind::I32);
        let b = ctx.intern_builtin(BuiltinKind::I32);
        let c = ctx.intern_builtin(BuiltinKind::U32);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn qual_types_compare_structurally() {
        let bump = Bump::new();
        let ctx = ASTContext::new(&bump);

        let i32_ty = ctx.builtin_type(BuiltinKind::I32);
        let const_i32 = QualType::with_quals(i32_ty.ty, Qualifiers::CONST);
        assert_eq!(i32_ty, QualType::new(ctx.intern_builtin(BuiltinKind::I32)));
        assert_ne!(i32_ty, const_i32);
    }

    #[test]
    fn pointer_and_array_interning() {
        let bump = Bump::new();
        let ctx = ASTContext::new(&bump);

        let i32_ty = ctx.builtin_type(BuiltinKind::I32);
        let p1 = ctx.intern_pointer(i32_ty);
        let p2 = ctx.intern_pointer(i32_ty);
        assert_eq!(p1, p2);

        let size = ctx.alloc_expr(
            ExprKind::IntegerLit {
                value: 4,
                text: ctx.symbol("4"),
            },
            Pos::from(0),
        );
        let a1 = ctx.intern_array(i32_ty, Some(size));
        let a2 = ctx.intern_array(i32_ty, Some(size));
        assert_eq!(a1, a2);

        // a structurally different size expression is a different type
        let other = ctx.alloc_expr(
            ExprKind::IntegerLit {
                value: 4,
                text: ctx.symbol("4"),
            },
            Pos::from(1),
        );
        let a3 = ctx.intern_array(i32_ty, Some(other));
        assert_ne!(a1, a3);
    }

    #[test]
    fn refs_from_different_modules_stay_distinct() {
        let bump = Bump::new();
        let ctx = ASTContext::new(&bump);

        let util = ctx.symbol("util");
        let main = ctx.symbol("main");
        let point = ctx.symbol("Point");

        let from_util = ctx.intern_ref(util, None, point);
        let from_util_again = ctx.intern_ref(util, None, point);
        let from_main = ctx.intern_ref(main, None, point);

        assert_eq!(from_util, from_util_again);
        assert_ne!(from_util, from_main);
    }
}
