use crate::constant::ConstEvaluator;
use crate::errors;
use c2_ast::{
    ASTContext, Decl, DeclKind, Expr, ExprKind, FuncType, InternType, Module, ModuleMap, QualType,
    Symbol, Type,
};
use c2_common::{DiagnosticEngine, Pos};
use std::collections::HashSet;

/// Declaration-level resolution for one module: duplicate checks, `Ref`
/// targets, declared types, enum constant values and array lengths.
pub(crate) struct Resolver<'a, 'ctx, E> {
    pub ast: &'a ASTContext<'ctx>,
    pub modules: &'a ModuleMap<'ctx>,
    pub diags: &'a E,
}

impl<'a, 'ctx, E: DiagnosticEngine> Resolver<'a, 'ctx, E> {
    pub(crate) fn check_redefinitions(&self, module: &Module<'ctx>) {
        let mut seen = HashSet::new();
        for decl in module.decls() {
            if decl.as_import().is_some() {
                continue;
            }
            if !seen.insert(decl.name) {
                self.diags
                    .report(errors::redefinition(decl.pos, decl.name, decl.kind_name()));
            }
        }
        // duplicate imports are the driver's import check; here only the
        // alias-vs-declaration collisions remain
        for import in module.imports() {
            if seen.contains(&import.name) {
                self.diags
                    .report(errors::import_shadows_decl(import.pos, import.name));
            }
        }
    }

    /// Resolves the declared type of every decl in the module and fills the
    /// decl type cells. Bodies and initializer values wait for the function
    /// analyser.
    pub(crate) fn resolve_module(&self, module: &Module<'ctx>) {
        for decl in module.decls() {
            self.resolve_decl(module, decl);
        }
    }

    fn resolve_decl(&self, module: &Module<'ctx>, decl: &Decl<'ctx>) {
        match &decl.kind {
            DeclKind::Func(..) => self.resolve_signature(module, decl),
            DeclKind::Var(var) => {
                self.resolve_qual_type(module, var.var_ty, decl.pos);
                decl.set_ty(var.var_ty);
            }
            DeclKind::AliasType { target } => {
                self.resolve_qual_type(module, *target, decl.pos);
                decl.set_ty(QualType::new(self.ast.intern_type(Type::Alias(*target))));
            }
            DeclKind::StructType(s) => {
                for member in s.members {
                    self.resolve_decl(module, member);
                }
                decl.set_ty(QualType::new(self.ast.intern_type(Type::Struct(
                    c2_ast::StructType {
                        is_union: s.is_union,
                        members: s.members,
                    },
                ))));
            }
            DeclKind::EnumType(e) => {
                let enum_ty = QualType::new(
                    self.ast
                        .intern_type(Type::Enum(c2_ast::EnumType { constants: e.constants })),
                );
                decl.set_ty(enum_ty);
                for constant in e.constants {
                    constant.set_module(module.name);
                    constant.set_ty(enum_ty);
                }
            }
            DeclKind::FunctionType { signature } => {
                self.resolve_signature(module, signature);
                if let Some(ty) = signature.ty() {
                    decl.set_ty(ty);
                }
            }
            DeclKind::Import(import) => {
                decl.set_ty(QualType::new(self.ast.module_type(import.module)));
            }
            DeclKind::EnumValue(..) => {
                // only reached for stray constants outside an enum type;
                // the enclosing-enum path sets the type
            }
            DeclKind::ArrayValue { .. } | DeclKind::Label(..) => {}
        }
    }

    fn resolve_signature(&self, module: &Module<'ctx>, decl: &Decl<'ctx>) {
        let Some(func) = decl.as_func() else {
            return;
        };
        self.resolve_qual_type(module, func.return_ty, decl.pos);
        for param in func.params {
            if let Some(var) = param.as_var() {
                self.resolve_qual_type(module, var.var_ty, param.pos);
                param.set_ty(var.var_ty);
                param.set_module(module.name);
            }
        }
        decl.set_ty(QualType::new(self.ast.intern_type(Type::Func(FuncType {
            params: func.params,
            ret: func.return_ty,
            variadic: func.variadic,
        }))));
    }

    /// Walks a written type, resolving every `Ref` in it. `pos` is the
    /// position of the declaration or expression carrying the type.
    pub(crate) fn resolve_qual_type(&self, module: &Module<'ctx>, ty: QualType<'ctx>, pos: Pos) {
        self.resolve_type(module, ty.ty, pos);
    }

    fn resolve_type(&self, module: &Module<'ctx>, ty: InternType<'ctx>, pos: Pos) {
        match &*ty {
            Type::Builtin(..) | Type::Module(..) => {}
            Type::Pointer(pointee) => self.resolve_type(module, pointee.ty, pos),
            Type::Array(array) => {
                self.resolve_type(module, array.elem.ty, pos);
                if let Some(size) = array.size {
                    self.resolve_module_expr(module, size);
                }
            }
            Type::Alias(target) => self.resolve_type(module, target.ty, pos),
            Type::Ref(r) => {
                if r.target.get().is_some() {
                    return;
                }
                let Some(target) = self.resolve_ref_target(module, r.qualifier, r.name, pos) else {
                    return;
                };
                if !target.is_type_decl() {
                    self.diags.report(errors::not_a_type(pos, r.name));
                    return;
                }
                let _ = r.target.set(target);
            }
            Type::Struct(s) => {
                for member in s.members {
                    if let Some(var) = member.as_var() {
                        self.resolve_type(module, var.var_ty.ty, member.pos);
                    }
                }
            }
            Type::Enum(..) | Type::Func(..) => {}
        }
    }

    /// Shared name lookup for references and module-level identifiers:
    /// own declarations first, then a qualified import. Reports and returns
    /// `None` on failure.
    pub(crate) fn resolve_ref_target(
        &self,
        module: &Module<'ctx>,
        qualifier: Option<Symbol<'ctx>>,
        name: Symbol<'ctx>,
        pos: Pos,
    ) -> Option<&'ctx Decl<'ctx>> {
        let provider = match qualifier {
            None => module.name,
            Some(alias) if alias == module.name => module.name,
            Some(alias) => match module.find_import(alias) {
                Some(import_decl) => {
                    let import = import_decl.as_import().expect("import table holds imports");
                    import.used.set(true);
                    import.module
                }
                None => {
                    self.diags.report(errors::unknown_module_alias(pos, alias));
                    return None;
                }
            },
        };

        let Some(provider_module) = self.modules.get(provider) else {
            self.diags.report(errors::unknown_module_alias(pos, provider));
            return None;
        };
        let Some(target) = provider_module.find_decl(name) else {
            self.diags.report(errors::unresolved_name(pos, name));
            return None;
        };
        if provider != module.name && !target.public {
            self.diags
                .report(errors::visibility_violation(pos, name, provider));
            return None;
        }
        Some(target)
    }

    /// Resolves identifiers of an expression appearing at module level, such
    /// as an array size. Only module declarations and qualified imports are
    /// in scope here.
    pub(crate) fn resolve_module_expr(&self, module: &Module<'ctx>, expr: &Expr<'ctx>) {
        match &expr.kind {
            ExprKind::Identifier(ident) => {
                if ident.target.get().is_some() {
                    return;
                }
                if let Some(target) = self.resolve_ref_target(module, None, ident.name, expr.pos) {
                    let _ = ident.target.set(target);
                }
            }
            ExprKind::Member(member) => {
                if let ExprKind::Identifier(base) = &member.base.unparenthesized().kind {
                    if module.find_import(base.name).is_some() || base.name == module.name {
                        if let Some(target) =
                            self.resolve_ref_target(module, Some(base.name), member.member, expr.pos)
                        {
                            let _ = member.target.set(target);
                        }
                        return;
                    }
                }
                self.resolve_module_expr(module, member.base);
            }
            ExprKind::Paren(inner) | ExprKind::Cast { inner, .. } => {
                self.resolve_module_expr(module, inner)
            }
            ExprKind::Unary { expr: inner, .. } => self.resolve_module_expr(module, inner),
            ExprKind::Binop { lhs, rhs, .. } => {
                self.resolve_module_expr(module, lhs);
                self.resolve_module_expr(module, rhs);
            }
            ExprKind::CondOp {
                cond,
                then_expr,
                else_expr,
            } => {
                self.resolve_module_expr(module, cond);
                self.resolve_module_expr(module, then_expr);
                self.resolve_module_expr(module, else_expr);
            }
            ExprKind::Builtin(builtin) => match builtin {
                c2_ast::BuiltinExpr::Sizeof(inner) | c2_ast::BuiltinExpr::Elemsof(inner) => {
                    self.resolve_module_expr(module, inner)
                }
                c2_ast::BuiltinExpr::Offsetof { record, member } => {
                    self.resolve_module_expr(module, record);
                    self.resolve_module_expr(module, member);
                }
            },
            _ => {}
        }
    }

    /// Assigns enum constant values: explicit initializers fold, implicit
    /// constants continue from the previous value.
    pub(crate) fn assign_enum_values(&self, module: &Module<'ctx>) {
        let folder = ConstEvaluator::new(self.diags);
        for decl in module.decls() {
            let DeclKind::EnumType(e) = &decl.kind else {
                continue;
            };
            let mut next = 0i64;
            for constant in e.constants {
                let value_decl = constant
                    .as_enum_value()
                    .expect("enum types hold enum constants");
                let value = match value_decl.init {
                    Some(init) => {
                        self.resolve_module_expr(module, init);
                        match folder.eval(init) {
                            Some(v) => v,
                            None => {
                                self.diags.report(errors::const_expr_required(
                                    constant.pos,
                                    "enum initializer",
                                ));
                                next
                            }
                        }
                    }
                    None => next,
                };
                let _ = value_decl.value.set(value);
                next = value + 1;
            }
        }
    }

    /// Folds every array size expression reachable from the module's
    /// declared types, filling the length cells.
    pub(crate) fn fold_array_sizes(&self, module: &Module<'ctx>) {
        let folder = ConstEvaluator::new(self.diags);
        for decl in module.decls() {
            if let Some(var) = decl.as_var() {
                self.fold_array_size(&folder, var.var_ty.ty, decl.pos);
            }
            if let DeclKind::StructType(s) = &decl.kind {
                for member in s.members {
                    if let Some(var) = member.as_var() {
                        self.fold_array_size(&folder, var.var_ty.ty, member.pos);
                    }
                }
            }
        }
    }

    fn fold_array_size(&self, folder: &ConstEvaluator<'a, E>, ty: InternType<'ctx>, pos: Pos) {
        match &*ty {
            Type::Array(array) => {
                self.fold_array_size(folder, array.elem.ty, pos);
                let Some(size) = array.size else {
                    return;
                };
                if array.len.get().is_some() {
                    return;
                }
                match folder.eval(size) {
                    Some(len) if len >= 0 => {
                        let _ = array.len.set(len as u64);
                    }
                    _ => {
                        self.diags
                            .report(errors::const_expr_required(pos, "array size"));
                    }
                }
            }
            Type::Pointer(pointee) => self.fold_array_size(folder, pointee.ty, pos),
            _ => {}
        }
    }

    /// Alias and by-value struct cycles make layout impossible; these abort
    /// the build.
    pub(crate) fn check_type_cycles(&self, module: &Module<'ctx>) -> bool {
        let mut ok = true;
        for decl in module.decls() {
            if !decl.is_type_decl() {
                continue;
            }
            let Some(ty) = decl.ty() else {
                continue;
            };
            let mut stack = Vec::new();
            if self.cycles_through(ty.ty, &mut stack) {
                self.diags.report(errors::type_cycle(decl.pos, decl.name));
                ok = false;
            }
        }
        ok
    }

    fn cycles_through(&self, ty: InternType<'ctx>, stack: &mut Vec<*const Type<'ctx>>) -> bool {
        let key = &*ty as *const Type;
        if stack.contains(&key) {
            return true;
        }
        match &*ty {
            Type::Alias(target) => {
                stack.push(key);
                let found = self.cycles_through(target.ty, stack);
                stack.pop();
                found
            }
            Type::Ref(r) => match r.target.get() {
                Some(target) => match target.ty() {
                    Some(target_ty) => {
                        stack.push(key);
                        let found = self.cycles_through(target_ty.ty, stack);
                        stack.pop();
                        found
                    }
                    None => false,
                },
                None => false,
            },
            Type::Struct(s) => {
                stack.push(key);
                let mut found = false;
                for member in s.members {
                    if let Some(var) = member.as_var() {
                        if self.cycles_through(var.var_ty.ty, stack) {
                            found = true;
                            break;
                        }
                    }
                }
                stack.pop();
                found
            }
            Type::Array(array) => self.cycles_through(array.elem.ty, stack),
            // indirection breaks the cycle
            _ => false,
        }
    }
}
