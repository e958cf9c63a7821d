mod constant;
mod errors;
mod func;
mod resolver;
mod scope;

use c2_ast::{ASTContext, ModuleMap, Symbol};
use c2_common::DiagnosticEngine;
use func::FunctionAnalyser;
use resolver::Resolver;

/// Runs the analysis passes over one component: redefinition checks, name
/// resolution of references and declared types, type cycle detection,
/// constant evaluation, and body/initializer checking.
///
/// Components must be analysed in dependency order; references into already
/// analysed components resolve through the shared module map.
///
/// Most problems are reported and analysis continues; a type cycle is the
/// one condition that makes further passes meaningless, so `false` comes
/// back and the caller aborts the build.
pub fn analyze_component<'ctx, E: DiagnosticEngine>(
    ast: &ASTContext<'ctx>,
    modules: &ModuleMap<'ctx>,
    component_modules: &[Symbol<'ctx>],
    diags: &E,
) -> bool {
    let resolver = Resolver { ast, modules, diags };

    let mods: Vec<_> = component_modules
        .iter()
        .filter_map(|name| modules.get(*name))
        .collect();

    for module in &mods {
        resolver.check_redefinitions(module);
    }
    for module in &mods {
        resolver.resolve_module(module);
    }

    let mut acyclic = true;
    for module in &mods {
        if !resolver.check_type_cycles(module) {
            acyclic = false;
        }
    }
    if !acyclic {
        return false;
    }

    for module in &mods {
        resolver.assign_enum_values(module);
        resolver.fold_array_sizes(module);
    }

    for module in &mods {
        let mut analyser = FunctionAnalyser::new(&resolver, module);
        analyser.analyse_module();
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;
    use c2_ast::{
        BinOp, BuiltinKind, DeclKind, EnumValueDecl, ExprKind, FuncDecl, IdentifierExpr, QualType,
        Qualifiers, StmtKind, StructTypeDecl, VarDecl,
    };
    use c2_common::{DiagKind, DiagnosticManager, Pos, Severity};
    use std::cell::OnceCell;

    struct Builder<'a, 'ctx> {
        ast: &'a ASTContext<'ctx>,
        next_pos: std::cell::Cell<usize>,
    }

    impl<'a, 'ctx> Builder<'a, 'ctx> {
        fn new(ast: &'a ASTContext<'ctx>) -> Self {
            Self {
                ast,
                next_pos: std::cell::Cell::new(0),
            }
        }

        fn pos(&self) -> Pos {
            let pos = self.next_pos.get();
            self.next_pos.set(pos + 1);
            Pos::from(pos)
        }

        fn int(&self, value: u64) -> &'ctx c2_ast::Expr<'ctx> {
            self.ast.alloc_expr(
                ExprKind::IntegerLit {
                    value,
                    text: self.ast.symbol(&value.to_string()),
                },
                self.pos(),
            )
        }

        fn ident(&self, name: &str) -> &'ctx c2_ast::Expr<'ctx> {
            self.ast.alloc_expr(
                ExprKind::Identifier(IdentifierExpr {
                    name: self.ast.symbol(name),
                    target: OnceCell::new(),
                }),
                self.pos(),
            )
        }

        fn var(
            &self,
            name: &str,
            public: bool,
            ty: QualType<'ctx>,
            init: Option<&'ctx c2_ast::Expr<'ctx>>,
        ) -> &'ctx c2_ast::Decl<'ctx> {
            self.ast.alloc_decl(
                self.ast.symbol(name),
                self.pos(),
                public,
                DeclKind::Var(VarDecl {
                    var_kind: c2_ast::VarKind::Global,
                    var_ty: ty,
                    init,
                    incr_values: Default::default(),
                }),
            )
        }

        fn func(
            &self,
            name: &str,
            public: bool,
            ret: QualType<'ctx>,
            params: Vec<&'ctx c2_ast::Decl<'ctx>>,
            body: Vec<&'ctx c2_ast::Stmt<'ctx>>,
        ) -> &'ctx c2_ast::Decl<'ctx> {
            let body = self.ast.alloc_stmt(
                StmtKind::Compound {
                    stmts: self.ast.alloc_stmts(body),
                },
                self.pos(),
            );
            self.ast.alloc_decl(
                self.ast.symbol(name),
                self.pos(),
                public,
                DeclKind::Func(FuncDecl {
                    return_ty: ret,
                    receiver: None,
                    params: self.ast.alloc_decls(params),
                    variadic: false,
                    body: Some(body),
                }),
            )
        }
    }

    fn kinds(diags: &mut DiagnosticManager) -> Vec<DiagKind> {
        diags
            .take()
            .into_iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| d.kind)
            .collect()
    }

    #[test]
    fn clean_module_analyses_without_diagnostics() {
        let bump = Bump::new();
        let ast = ASTContext::new(&bump);
        let b = Builder::new(&ast);
        let mut modules = ModuleMap::default();
        let mut diags = DiagnosticManager::default();

        let i32_ty = ast.builtin_type(BuiltinKind::I32);
        let main = ast.symbol("main");
        let module = modules.get_or_create(main);

        let ret = ast.alloc_stmt(StmtKind::Return(Some(b.int(0))), b.pos());
        let func = b.func("main", true, i32_ty, vec![], vec![ret]);
        module.add_decl(func);

        assert!(analyze_component(&ast, &modules, &[main], &diags));
        assert!(!diags.has_errors());
        assert!(func.ty().is_some());
        let _ = diags.take();
    }

    #[test]
    fn duplicate_declaration_is_reported_once() {
        let bump = Bump::new();
        let ast = ASTContext::new(&bump);
        let b = Builder::new(&ast);
        let mut modules = ModuleMap::default();
        let mut diags = DiagnosticManager::default();

        let i32_ty = ast.builtin_type(BuiltinKind::I32);
        let util = ast.symbol("util");
        let module = modules.get_or_create(util);
        module.add_decl(b.var("x", false, i32_ty, Some(b.int(1))));
        module.add_decl(b.var("x", false, i32_ty, Some(b.int(2))));

        analyze_component(&ast, &modules, &[util], &diags);
        assert_eq!(kinds(&mut diags), vec![DiagKind::Redefinition]);
    }

    #[test]
    fn private_decl_of_other_module_is_rejected() {
        let bump = Bump::new();
        let ast = ASTContext::new(&bump);
        let b = Builder::new(&ast);
        let mut modules = ModuleMap::default();
        let mut diags = DiagnosticManager::default();

        let util = ast.symbol("util");
        let main = ast.symbol("main");
        let i32_ty = ast.builtin_type(BuiltinKind::I32);

        modules
            .get_or_create(util)
            .add_decl(b.var("secret", false, i32_ty, Some(b.int(1))));

        {
            let module = modules.get_or_create(main);
            let import = ast.alloc_decl(
                util,
                b.pos(),
                false,
                DeclKind::Import(c2_ast::ImportDecl {
                    module: util,
                    used: Default::default(),
                }),
            );
            module.add_import(import);

            let member = ast.alloc_expr(
                ExprKind::Member(c2_ast::MemberExpr {
                    base: b.ident("util"),
                    member: ast.symbol("secret"),
                    arrow: false,
                    target: OnceCell::new(),
                }),
                b.pos(),
            );
            module.add_decl(b.var("copy", false, i32_ty, Some(member)));
        }

        analyze_component(&ast, &modules, &[util, main], &diags);
        assert_eq!(kinds(&mut diags), vec![DiagKind::VisibilityViolation]);
    }

    #[test]
    fn array_size_is_constant_folded() {
        let bump = Bump::new();
        let ast = ASTContext::new(&bump);
        let b = Builder::new(&ast);
        let mut modules = ModuleMap::default();
        let mut diags = DiagnosticManager::default();

        let util = ast.symbol("util");
        let i32_ty = ast.builtin_type(BuiltinKind::I32);
        let module = modules.get_or_create(util);

        let n = b.var(
            "N",
            false,
            QualType::with_quals(i32_ty.ty, Qualifiers::CONST),
            Some(b.int(4)),
        );
        module.add_decl(n);

        let size = ast.alloc_expr(
            ExprKind::Binop {
                op: BinOp::Add,
                lhs: b.ident("N"),
                rhs: b.int(1),
            },
            b.pos(),
        );
        let buf_ty = QualType::new(ast.intern_array(i32_ty, Some(size)));
        let buf = b.var("buf", false, buf_ty, None);
        module.add_decl(buf);

        assert!(analyze_component(&ast, &modules, &[util], &diags));
        assert!(!diags.has_errors());
        let array = buf_ty.ty.as_array().expect("array type");
        assert_eq!(array.len.get(), Some(&5));
        let _ = diags.take();
    }

    #[test]
    fn non_constant_array_size_is_rejected() {
        let bump = Bump::new();
        let ast = ASTContext::new(&bump);
        let b = Builder::new(&ast);
        let mut modules = ModuleMap::default();
        let mut diags = DiagnosticManager::default();

        let util = ast.symbol("util");
        let i32_ty = ast.builtin_type(BuiltinKind::I32);
        let module = modules.get_or_create(util);

        // not const-qualified, so not a compile-time constant
        module.add_decl(b.var("n", false, i32_ty, Some(b.int(4))));
        let size = b.ident("n");
        let buf_ty = QualType::new(ast.intern_array(i32_ty, Some(size)));
        module.add_decl(b.var("buf", false, buf_ty, None));

        analyze_component(&ast, &modules, &[util], &diags);
        assert_eq!(kinds(&mut diags), vec![DiagKind::ConstExprRequired]);
    }

    #[test]
    fn enum_values_count_up_from_initializers() {
        let bump = Bump::new();
        let ast = ASTContext::new(&bump);
        let b = Builder::new(&ast);
        let mut modules = ModuleMap::default();
        let mut diags = DiagnosticManager::default();

        let util = ast.symbol("util");
        let module = modules.get_or_create(util);

        let red = ast.alloc_decl(
            ast.symbol("Red"),
            b.pos(),
            true,
            DeclKind::EnumValue(EnumValueDecl {
                init: Some(b.int(3)),
                value: OnceCell::new(),
            }),
        );
        let green = ast.alloc_decl(
            ast.symbol("Green"),
            b.pos(),
            true,
            DeclKind::EnumValue(EnumValueDecl {
                init: None,
                value: OnceCell::new(),
            }),
        );
        let color = ast.alloc_decl(
            ast.symbol("Color"),
            b.pos(),
            true,
            DeclKind::EnumType(c2_ast::EnumTypeDecl {
                constants: ast.alloc_decls(vec![red, green]),
            }),
        );
        module.add_decl(color);

        assert!(analyze_component(&ast, &modules, &[util], &diags));
        assert!(!diags.has_errors());
        assert_eq!(red.as_enum_value().unwrap().value.get(), Some(&3));
        assert_eq!(green.as_enum_value().unwrap().value.get(), Some(&4));
        let _ = diags.take();
    }

    #[test]
    fn struct_containing_itself_by_value_aborts() {
        let bump = Bump::new();
        let ast = ASTContext::new(&bump);
        let b = Builder::new(&ast);
        let mut modules = ModuleMap::default();
        let mut diags = DiagnosticManager::default();

        let util = ast.symbol("util");
        let module = modules.get_or_create(util);

        let self_ref = QualType::new(ast.intern_ref(util, None, ast.symbol("Node")));
        let member = b.var("next", false, self_ref, None);
        let node = ast.alloc_decl(
            ast.symbol("Node"),
            b.pos(),
            false,
            DeclKind::StructType(StructTypeDecl {
                is_union: false,
                members: ast.alloc_decls(vec![member]),
            }),
        );
        module.add_decl(node);

        assert!(!analyze_component(&ast, &modules, &[util], &diags));
        assert!(kinds(&mut diags).contains(&DiagKind::CycleInTypes));
    }

    #[test]
    fn type_mismatch_in_return_is_reported() {
        let bump = Bump::new();
        let ast = ASTContext::new(&bump);
        let b = Builder::new(&ast);
        let mut modules = ModuleMap::default();
        let mut diags = DiagnosticManager::default();

        let main = ast.symbol("main");
        let module = modules.get_or_create(main);
        let i32_ty = ast.builtin_type(BuiltinKind::I32);

        let lit = ast.alloc_expr(
            ExprKind::StringLit {
                text: ast.symbol("hello"),
            },
            b.pos(),
        );
        let ret = ast.alloc_stmt(StmtKind::Return(Some(lit)), b.pos());
        module.add_decl(b.func("main", true, i32_ty, vec![], vec![ret]));

        analyze_component(&ast, &modules, &[main], &diags);
        assert_eq!(kinds(&mut diags), vec![DiagKind::TypeMismatch]);
    }

    #[test]
    fn break_outside_loop_is_reported() {
        let bump = Bump::new();
        let ast = ASTContext::new(&bump);
        let b = Builder::new(&ast);
        let mut modules = ModuleMap::default();
        let mut diags = DiagnosticManager::default();

        let main = ast.symbol("main");
        let module = modules.get_or_create(main);
        let void_ty = ast.builtin_type(BuiltinKind::Void);

        let brk = ast.alloc_stmt(StmtKind::Break, b.pos());
        module.add_decl(b.func("run", false, void_ty, vec![], vec![brk]));

        analyze_component(&ast, &modules, &[main], &diags);
        assert_eq!(kinds(&mut diags), vec![DiagKind::Semantics]);
    }

    #[test]
    fn unused_import_warns_and_literal_overflow_errors() {
        let bump = Bump::new();
        let ast = ASTContext::new(&bump);
        let b = Builder::new(&ast);
        let mut modules = ModuleMap::default();
        let mut diags = DiagnosticManager::default();

        let util = ast.symbol("util");
        let other = ast.symbol("other");
        modules.get_or_create(other);
        let module = modules.get_or_create(util);

        let import = ast.alloc_decl(
            other,
            b.pos(),
            false,
            DeclKind::Import(c2_ast::ImportDecl {
                module: other,
                used: Default::default(),
            }),
        );
        module.add_import(import);

        let i8_ty = ast.builtin_type(BuiltinKind::I8);
        module.add_decl(b.var("tiny", false, i8_ty, Some(b.int(300))));

        analyze_component(&ast, &modules, &[other, util], &diags);
        assert_eq!(diags.warning_count(), 1);
        assert_eq!(kinds(&mut diags), vec![DiagKind::TypeMismatch]);
    }
}
