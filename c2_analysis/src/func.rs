use crate::constant::ConstEvaluator;
use crate::errors;
use crate::resolver::Resolver;
use crate::scope::Scope;
use c2_ast::{
    ASTContext, BinOp, BuiltinExpr, BuiltinKind, Decl, DeclKind, DesignatedInit, Expr, ExprKind,
    LabelDecl, Module, QualType, Stmt, StmtKind, Symbol, Type, UnaryOp,
};
use c2_common::{DiagnosticEngine, Pos};
use indexmap::IndexMap;

/// Checks function bodies and module-level initializers of one module. Runs
/// after declaration resolution, so every declared type and enum constant is
/// already in place.
pub(crate) struct FunctionAnalyser<'a, 'ctx, E> {
    resolver: &'a Resolver<'a, 'ctx, E>,
    module: &'a Module<'ctx>,
    folder: ConstEvaluator<'a, E>,
    scope: Scope<'ctx>,
    current_func: Option<&'ctx Decl<'ctx>>,
    loop_depth: usize,
    switch_depth: usize,
    labels: IndexMap<Symbol<'ctx>, &'ctx Decl<'ctx>>,
}

impl<'a, 'ctx, E: DiagnosticEngine> FunctionAnalyser<'a, 'ctx, E> {
    pub(crate) fn new(resolver: &'a Resolver<'a, 'ctx, E>, module: &'a Module<'ctx>) -> Self {
        Self {
            resolver,
            module,
            folder: ConstEvaluator::new(resolver.diags),
            scope: Scope::new(),
            current_func: None,
            loop_depth: 0,
            switch_depth: 0,
            labels: IndexMap::default(),
        }
    }

    fn ast(&self) -> &'a ASTContext<'ctx> {
        self.resolver.ast
    }

    fn diags(&self) -> &'a E {
        self.resolver.diags
    }

    pub(crate) fn analyse_module(&mut self) {
        self.attach_incremental_values();

        for &decl in self.module.decls() {
            match &decl.kind {
                DeclKind::Var(var) => {
                    if let Some(init) = var.init {
                        self.resolver.resolve_module_expr(self.module, init);
                        self.analyse_init(var.var_ty, init);
                    }
                }
                DeclKind::Func(..) => self.analyse_function(decl),
                _ => {}
            }
        }

        for import in self.module.imports() {
            let used = import
                .as_import()
                .map(|i| i.used.get())
                .unwrap_or(true);
            if !used {
                self.diags()
                    .report(errors::unused_import(import.pos, import.name));
            }
        }
    }

    /// Collects `ArrayValue` decls onto their owning variables and finishes
    /// the lengths of implicitly sized arrays.
    fn attach_incremental_values(&mut self) {
        for &decl in self.module.decls() {
            let DeclKind::ArrayValue { entry } = &decl.kind else {
                continue;
            };
            let Some(owner) = self.module.find_decl(decl.name) else {
                self.diags()
                    .report(errors::unresolved_name(decl.pos, decl.name));
                continue;
            };
            let Some(var) = owner.as_var() else {
                self.diags()
                    .report(errors::incremental_on_non_array(decl.pos, decl.name));
                continue;
            };
            let elem = match var.var_ty.canonical().ty.as_array() {
                Some(array) => array.elem,
                None => {
                    self.diags()
                        .report(errors::incremental_on_non_array(decl.pos, decl.name));
                    continue;
                }
            };
            self.resolver.resolve_module_expr(self.module, entry);
            self.analyse_init(elem, entry);
            decl.set_ty(elem);
            var.incr_values.borrow_mut().push(decl);
        }

        for &decl in self.module.decls() {
            let Some(var) = decl.as_var() else {
                continue;
            };
            let count = var.incr_values.borrow().len();
            if count == 0 {
                continue;
            }
            if var.init.is_some() {
                self.diags()
                    .report(errors::incremental_with_init(decl.pos, decl.name));
                continue;
            }
            if let Some(array) = var.var_ty.canonical().ty.as_array() {
                if array.size.is_none() && array.len.get().is_none() {
                    let _ = array.len.set(count as u64);
                }
            }
        }
    }

    fn analyse_function(&mut self, decl: &'ctx Decl<'ctx>) {
        let func = decl.as_func().expect("function decl");
        self.scope = Scope::new();
        self.labels.clear();
        self.current_func = Some(decl);

        for &param in func.params {
            if self.scope.declare(param.name, param).is_some() {
                self.diags()
                    .report(errors::redefinition(param.pos, param.name, "parameter"));
            }
        }

        if let Some(body) = func.body {
            self.analyse_stmt(body);
        }

        for (name, label) in &self.labels {
            let info = match &label.kind {
                DeclKind::Label(info) => info,
                _ => continue,
            };
            if info.used.get() && !info.defined.get() {
                self.diags().report(errors::undefined_label(label.pos, name));
            } else if info.defined.get() && !info.used.get() {
                self.diags().report(errors::unused_label(label.pos, name));
            }
        }

        self.current_func = None;
    }

    fn lookup_or_create_label(&mut self, name: Symbol<'ctx>, pos: Pos) -> &'ctx Decl<'ctx> {
        if let Some(label) = self.labels.get(&name).copied() {
            return label;
        }
        let label = self.ast().alloc_decl(
            name,
            pos,
            false,
            DeclKind::Label(LabelDecl::default()),
        );
        label.set_module(self.module.name);
        label.set_ty(self.ast().builtin_type(BuiltinKind::Void));
        self.labels.insert(name, label);
        label
    }

    fn analyse_stmt(&mut self, stmt: &Stmt<'ctx>) {
        match &stmt.kind {
            StmtKind::Return(expr) => self.analyse_return(stmt.pos, *expr),
            StmtKind::Expr(expr) => {
                self.analyse_expr(expr);
            }
            StmtKind::If {
                cond,
                then_stmt,
                else_stmt,
            } => {
                self.analyse_condition(cond);
                self.analyse_stmt(then_stmt);
                if let Some(else_stmt) = else_stmt {
                    self.analyse_stmt(else_stmt);
                }
            }
            StmtKind::While { cond, body } => {
                self.analyse_condition(cond);
                self.loop_depth += 1;
                self.analyse_stmt(body);
                self.loop_depth -= 1;
            }
            StmtKind::Do { body, cond } => {
                self.loop_depth += 1;
                self.analyse_stmt(body);
                self.loop_depth -= 1;
                self.analyse_condition(cond);
            }
            StmtKind::For {
                init,
                cond,
                incr,
                body,
            } => {
                self.scope.enter();
                if let Some(init) = init {
                    self.analyse_stmt(init);
                }
                if let Some(cond) = cond {
                    self.analyse_condition(cond);
                }
                if let Some(incr) = incr {
                    self.analyse_expr(incr);
                }
                self.loop_depth += 1;
                self.analyse_stmt(body);
                self.loop_depth -= 1;
                self.scope.exit();
            }
            StmtKind::Switch { cond, cases } => self.analyse_switch(cond, cases),
            StmtKind::Case { .. } | StmtKind::Default { .. } => {
                // only meaningful as direct children of a switch
                self.diags().report(errors::case_outside_switch(stmt.pos));
            }
            StmtKind::Break => {
                if self.loop_depth == 0 && self.switch_depth == 0 {
                    self.diags().report(errors::break_outside_loop(stmt.pos));
                }
            }
            StmtKind::Continue => {
                if self.loop_depth == 0 {
                    self.diags().report(errors::continue_outside_loop(stmt.pos));
                }
            }
            StmtKind::Label { name, stmt: inner } => {
                let label = self.lookup_or_create_label(*name, stmt.pos);
                if let DeclKind::Label(info) = &label.kind {
                    if info.defined.get() {
                        self.diags()
                            .report(errors::redefinition(stmt.pos, name, "label"));
                    }
                    info.defined.set(true);
                }
                self.analyse_stmt(inner);
            }
            StmtKind::Goto { name } => {
                let label = self.lookup_or_create_label(*name, stmt.pos);
                if let DeclKind::Label(info) = &label.kind {
                    info.used.set(true);
                }
            }
            StmtKind::Compound { stmts } => {
                self.scope.enter();
                for stmt in *stmts {
                    self.analyse_stmt(stmt);
                }
                self.scope.exit();
            }
            StmtKind::Decl(decl) => self.analyse_local_decl(*decl),
            StmtKind::Asm(asm) => {
                for (_, expr) in asm.outputs {
                    self.analyse_expr(expr);
                }
                for (_, expr) in asm.inputs {
                    self.analyse_expr(expr);
                }
            }
        }
    }

    fn analyse_return(&mut self, pos: Pos, expr: Option<&'ctx Expr<'ctx>>) {
        let Some(func_decl) = self.current_func else {
            return;
        };
        let func = func_decl.as_func().expect("function decl");
        let returns_void = func.return_ty.ty.is_void();
        match expr {
            Some(expr) => {
                if returns_void {
                    self.diags().report(errors::void_function_returns_value(pos));
                    self.analyse_expr(expr);
                } else {
                    self.analyse_init(func.return_ty, expr);
                }
            }
            None => {
                if !returns_void {
                    self.diags()
                        .report(errors::missing_return_value(pos, func.return_ty));
                }
            }
        }
    }

    fn analyse_condition(&mut self, cond: &Expr<'ctx>) {
        let Some(ty) = self.analyse_expr(cond) else {
            return;
        };
        let canonical = ty.canonical();
        if !matches!(&*canonical.ty, Type::Builtin(BuiltinKind::Bool)) {
            self.diags()
                .report(errors::condition_not_bool(cond.pos, ty));
        }
    }

    fn analyse_switch(&mut self, cond: &Expr<'ctx>, cases: &[&'ctx Stmt<'ctx>]) {
        if let Some(ty) = self.analyse_expr(cond) {
            let canonical = ty.canonical();
            let is_switchable = match &*canonical.ty {
                Type::Builtin(kind) => kind.is_integer(),
                Type::Enum(..) => true,
                _ => false,
            };
            if !is_switchable {
                self.diags().report(errors::type_mismatch(
                    cond.pos,
                    "an integer or enum value",
                    ty,
                ));
            }
        }

        let mut seen_values = Vec::new();
        let mut have_default = false;
        self.switch_depth += 1;
        for case in cases {
            match &case.kind {
                StmtKind::Case { cond, stmts } => {
                    self.resolver.resolve_module_expr(self.module, cond);
                    self.analyse_expr(cond);
                    match self.folder.eval(cond) {
                        Some(value) => {
                            if seen_values.contains(&value) {
                                self.diags().report(errors::redefinition(
                                    case.pos,
                                    value,
                                    "case value",
                                ));
                            }
                            seen_values.push(value);
                        }
                        None => self
                            .diags()
                            .report(errors::const_expr_required(cond.pos, "case label")),
                    }
                    self.scope.enter();
                    for stmt in *stmts {
                        self.analyse_stmt(stmt);
                    }
                    self.scope.exit();
                }
                StmtKind::Default { stmts } => {
                    if have_default {
                        self.diags()
                            .report(errors::redefinition(case.pos, "default", "case"));
                    }
                    have_default = true;
                    self.scope.enter();
                    for stmt in *stmts {
                        self.analyse_stmt(stmt);
                    }
                    self.scope.exit();
                }
                _ => self.analyse_stmt(case),
            }
        }
        self.switch_depth -= 1;
    }

    fn analyse_local_decl(&mut self, decl: &'ctx Decl<'ctx>) {
        let Some(var) = decl.as_var() else {
            return;
        };
        self.resolver
            .resolve_qual_type(self.module, var.var_ty, decl.pos);
        self.fold_local_array(var.var_ty, decl.pos);
        decl.set_ty(var.var_ty);
        decl.set_module(self.module.name);

        if let Some(init) = var.init {
            self.analyse_init(var.var_ty, init);
        }
        if self.scope.declare(decl.name, decl).is_some() {
            self.diags()
                .report(errors::redefinition(decl.pos, decl.name, "variable"));
        }
    }

    fn fold_local_array(&mut self, ty: QualType<'ctx>, pos: Pos) {
        if let Type::Array(array) = &*ty.ty {
            self.fold_local_array(array.elem, pos);
            if array.len.get().is_some() {
                return;
            }
            if let Some(size) = array.size {
                match self.folder.eval(size) {
                    Some(len) if len >= 0 => {
                        let _ = array.len.set(len as u64);
                    }
                    _ => self
                        .diags()
                        .report(errors::const_expr_required(pos, "array size")),
                }
            }
        }
    }

    /// Initialization-context analysis: handles brace initializers against
    /// the expected type, everything else falls through to a normal
    /// expression check plus assignability.
    fn analyse_init(&mut self, expected: QualType<'ctx>, expr: &Expr<'ctx>) {
        let canonical = expected.canonical();
        match &expr.kind {
            ExprKind::InitList { values } => match &*canonical.ty {
                Type::Array(array) => {
                    for value in *values {
                        match &value.kind {
                            ExprKind::DesignatedInit(DesignatedInit::Index { index, value }) => {
                                self.analyse_expr(index);
                                if self.folder.eval(index).is_none() {
                                    self.diags().report(errors::const_expr_required(
                                        expr.pos,
                                        "array designator",
                                    ));
                                }
                                self.analyse_init(array.elem, value);
                            }
                            _ => self.analyse_init(array.elem, value),
                        }
                    }
                    if let Some(len) = array.len.get() {
                        if values.len() as u64 > *len {
                            self.diags().report(errors::type_mismatch(
                                expr.pos,
                                format!("at most {len} initializers"),
                                values.len(),
                            ));
                        }
                    } else if array.size.is_none() {
                        let _ = array.len.set(values.len() as u64);
                    }
                    expr.set_ty(expected);
                }
                Type::Struct(s) => {
                    let mut next_member = 0usize;
                    for value in *values {
                        match &value.kind {
                            ExprKind::DesignatedInit(DesignatedInit::Field { field, value }) => {
                                match s.members.iter().find(|m| m.name == *field) {
                                    Some(member) => {
                                        let member_ty = member
                                            .as_var()
                                            .map(|v| v.var_ty)
                                            .unwrap_or(canonical);
                                        self.analyse_init(member_ty, value);
                                    }
                                    None => self.diags().report(errors::unknown_member(
                                        value.pos,
                                        field,
                                        expected,
                                    )),
                                }
                            }
                            _ => {
                                match s.members.get(next_member) {
                                    Some(member) => {
                                        let member_ty = member
                                            .as_var()
                                            .map(|v| v.var_ty)
                                            .unwrap_or(canonical);
                                        self.analyse_init(member_ty, value);
                                    }
                                    None => self.diags().report(errors::type_mismatch(
                                        value.pos,
                                        format!("at most {} initializers", s.members.len()),
                                        values.len(),
                                    )),
                                }
                                next_member += 1;
                            }
                        }
                    }
                    expr.set_ty(expected);
                }
                _ => {
                    self.diags().report(errors::init_list_outside_init(expr.pos));
                }
            },
            ExprKind::DesignatedInit(..) => {
                self.diags().report(errors::init_list_outside_init(expr.pos));
            }
            _ => {
                if self.analyse_expr(expr).is_some() {
                    self.check_assign(expected, expr);
                }
            }
        }
    }

    fn check_assign(&self, expected: QualType<'ctx>, expr: &Expr<'ctx>) {
        let Some(found) = expr.ty() else {
            return;
        };
        if let Some(value) = self.literal_value(expr) {
            let canonical = expected.canonical();
            if let Some(kind) = canonical.ty.as_builtin() {
                if kind.is_integer() || kind == BuiltinKind::Bool {
                    self.folder.check_range(value, &canonical.ty, expr.pos);
                    return;
                }
                if kind.is_float() {
                    return;
                }
            }
        }
        if !self.types_compatible(expected, found) {
            self.diags()
                .report(errors::type_mismatch(expr.pos, expected, found));
        }
    }

    /// Integer literal, possibly negated or parenthesized.
    fn literal_value(&self, expr: &Expr<'ctx>) -> Option<i64> {
        match &expr.unparenthesized().kind {
            ExprKind::IntegerLit { .. } => self.folder.eval(expr),
            ExprKind::Unary {
                op: UnaryOp::Minus,
                expr: inner,
            } if matches!(inner.unparenthesized().kind, ExprKind::IntegerLit { .. }) => {
                self.folder.eval(expr)
            }
            _ => None,
        }
    }

    fn types_compatible(&self, expected: QualType<'ctx>, found: QualType<'ctx>) -> bool {
        let a = expected.canonical();
        let b = found.canonical();
        if a.ty == b.ty {
            return true;
        }
        match (&*a.ty, &*b.ty) {
            (Type::Builtin(x), Type::Builtin(y)) => {
                if x.is_integer() && y.is_integer() {
                    true
                } else {
                    x.is_float() && (y.is_float() || y.is_integer())
                }
            }
            (Type::Builtin(x), Type::Enum(..)) => x.is_integer(),
            (Type::Pointer(p), Type::Builtin(BuiltinKind::StringLit)) => {
                matches!(
                    p.canonical().ty.as_builtin(),
                    Some(BuiltinKind::Char | BuiltinKind::I8 | BuiltinKind::U8)
                )
            }
            (Type::Pointer(p), Type::Pointer(q)) => {
                p.ty == q.ty || p.ty.is_void() || q.ty.is_void()
            }
            _ => false,
        }
    }

    fn finish(&self, expr: &Expr<'ctx>, ty: QualType<'ctx>) -> Option<QualType<'ctx>> {
        expr.set_ty(ty);
        Some(ty)
    }

    fn analyse_expr(&mut self, expr: &Expr<'ctx>) -> Option<QualType<'ctx>> {
        if let Some(ty) = expr.ty() {
            return Some(ty);
        }
        match &expr.kind {
            ExprKind::IntegerLit { value, .. } => {
                let kind = if *value <= i32::MAX as u64 {
                    BuiltinKind::I32
                } else if *value <= i64::MAX as u64 {
                    BuiltinKind::I64
                } else {
                    BuiltinKind::U64
                };
                self.finish(expr, self.ast().builtin_type(kind))
            }
            ExprKind::FloatLit { .. } => self.finish(expr, self.ast().builtin_type(BuiltinKind::F64)),
            ExprKind::BoolLit(..) => self.finish(expr, self.ast().builtin_type(BuiltinKind::Bool)),
            ExprKind::CharLit { .. } => self.finish(expr, self.ast().builtin_type(BuiltinKind::Char)),
            ExprKind::StringLit { .. } => {
                self.finish(expr, self.ast().builtin_type(BuiltinKind::StringLit))
            }
            ExprKind::Nil => {
                let void = self.ast().builtin_type(BuiltinKind::Void);
                self.finish(expr, QualType::new(self.ast().intern_pointer(void)))
            }
            ExprKind::Identifier(ident) => {
                let target = match ident.target.get().copied() {
                    Some(target) => target,
                    None => {
                        let target = self.lookup_value(ident.name, expr.pos)?;
                        let _ = ident.target.set(target);
                        target
                    }
                };
                let ty = target.ty()?;
                self.finish(expr, ty)
            }
            ExprKind::TypeExpr(ty) => {
                self.resolver.resolve_qual_type(self.module, *ty, expr.pos);
                self.finish(expr, *ty)
            }
            ExprKind::Member(..) => self.analyse_member(expr),
            ExprKind::Call { callee, args } => self.analyse_call(expr, callee, args),
            ExprKind::Paren(inner) => {
                let ty = self.analyse_expr(inner)?;
                self.finish(expr, ty)
            }
            ExprKind::Unary { op, expr: inner } => self.analyse_unary(expr, *op, inner),
            ExprKind::Binop { op, lhs, rhs } => self.analyse_binop(expr, *op, lhs, rhs),
            ExprKind::CondOp {
                cond,
                then_expr,
                else_expr,
            } => {
                self.analyse_condition(cond);
                let then_ty = self.analyse_expr(then_expr)?;
                let else_ty = self.analyse_expr(else_expr)?;
                let result = self.unify_numeric(then_ty, else_ty).unwrap_or(then_ty);
                if !self.types_compatible(then_ty, else_ty) && self.unify_numeric(then_ty, else_ty).is_none() {
                    self.diags().report(errors::binop_mismatch(
                        expr.pos, "?:", then_ty, else_ty,
                    ));
                }
                self.finish(expr, result)
            }
            ExprKind::ArraySubscript { base, index } => {
                let base_ty = self.analyse_expr(base)?;
                if let Some(index_ty) = self.analyse_expr(index) {
                    let canonical = index_ty.canonical();
                    let ok = canonical
                        .ty
                        .as_builtin()
                        .map(|k| k.is_integer())
                        .unwrap_or(false);
                    if !ok {
                        self.diags().report(errors::type_mismatch(
                            index.pos,
                            "an integer index",
                            index_ty,
                        ));
                    }
                }
                let canonical = base_ty.canonical();
                let elem = match &*canonical.ty {
                    Type::Array(array) => array.elem,
                    Type::Pointer(pointee) => *pointee,
                    Type::Builtin(BuiltinKind::StringLit) => {
                        self.ast().builtin_type(BuiltinKind::Char)
                    }
                    _ => {
                        self.diags().report(errors::not_indexable(expr.pos, base_ty));
                        return None;
                    }
                };
                self.finish(expr, elem)
            }
            ExprKind::BitOffset { base, high, low } => self.analyse_bit_offset(expr, base, high, low),
            ExprKind::Cast { dest, inner } => {
                self.resolver.resolve_qual_type(self.module, *dest, expr.pos);
                if let Some(from) = self.analyse_expr(inner) {
                    let ok = self.cast_allowed(*dest, from);
                    if !ok {
                        self.diags()
                            .report(errors::type_mismatch(expr.pos, *dest, from));
                    }
                }
                self.finish(expr, *dest)
            }
            ExprKind::Builtin(builtin) => self.analyse_builtin(expr, builtin),
            ExprKind::InitList { .. } | ExprKind::DesignatedInit(..) => {
                self.diags().report(errors::init_list_outside_init(expr.pos));
                None
            }
        }
    }

    fn lookup_value(&mut self, name: Symbol<'ctx>, pos: Pos) -> Option<&'ctx Decl<'ctx>> {
        if let Some(decl) = self.scope.lookup(name) {
            return Some(decl);
        }
        if let Some(decl) = self.module.find_decl(name) {
            return Some(decl);
        }
        if let Some(import_decl) = self.module.find_import(name) {
            if let Some(import) = import_decl.as_import() {
                import.used.set(true);
            }
            return Some(import_decl);
        }
        self.diags().report(errors::unresolved_name(pos, name));
        None
    }

    fn analyse_member(&mut self, expr: &Expr<'ctx>) -> Option<QualType<'ctx>> {
        let ExprKind::Member(member) = &expr.kind else {
            return None;
        };

        // static access through a type name, as in Color.Red
        if let ExprKind::Identifier(base_ident) = &member.base.unparenthesized().kind {
            let base_target = match base_ident.target.get().copied() {
                Some(t) => Some(t),
                None => {
                    let t = self.lookup_value(base_ident.name, member.base.pos)?;
                    let _ = base_ident.target.set(t);
                    Some(t)
                }
            };
            if let Some(base_target) = base_target {
                if let Some(ty) = base_target.ty() {
                    member.base.set_ty(ty);
                }
                if let DeclKind::EnumType(e) = &base_target.kind {
                    let Some(constant) =
                        e.constants.iter().copied().find(|c| c.name == member.member)
                    else {
                        self.diags().report(errors::unknown_member(
                            expr.pos,
                            member.member,
                            base_target.name,
                        ));
                        return None;
                    };
                    let _ = member.target.set(constant);
                    let ty = constant.ty()?;
                    return self.finish(expr, ty);
                }
            }
        }

        let base_ty = self.analyse_expr(member.base)?;

        // module-qualified access
        if let Type::Module(provider) = &*base_ty.ty {
            if member.arrow {
                self.diags()
                    .report(errors::arrow_on_non_pointer(expr.pos, base_ty));
            }
            let target =
                self.resolver
                    .resolve_ref_target(self.module, Some(*provider), member.member, expr.pos)?;
            let _ = member.target.set(target);
            let ty = target.ty()?;
            return self.finish(expr, ty);
        }

        let canonical = base_ty.canonical();
        let record = if member.arrow {
            match &*canonical.ty {
                Type::Pointer(pointee) => pointee.canonical(),
                _ => {
                    self.diags()
                        .report(errors::arrow_on_non_pointer(expr.pos, base_ty));
                    return None;
                }
            }
        } else {
            canonical
        };

        let Type::Struct(s) = &*record.ty else {
            self.diags().report(errors::member_on_value(expr.pos, base_ty));
            return None;
        };
        let Some(field) = s.members.iter().copied().find(|m| m.name == member.member) else {
            self.diags()
                .report(errors::unknown_member(expr.pos, member.member, base_ty));
            return None;
        };
        let _ = member.target.set(field);
        let ty = field.as_var().map(|v| v.var_ty)?;
        self.finish(expr, ty)
    }

    fn analyse_call(
        &mut self,
        expr: &Expr<'ctx>,
        callee: &Expr<'ctx>,
        args: &[&'ctx Expr<'ctx>],
    ) -> Option<QualType<'ctx>> {
        let callee_ty = self.analyse_expr(callee)?;
        let canonical = callee_ty.canonical();
        let Some(func) = canonical.ty.as_func() else {
            self.diags()
                .report(errors::not_a_function(expr.pos, callee_ty));
            return None;
        };

        let ok_arity = if func.variadic {
            args.len() >= func.params.len()
        } else {
            args.len() == func.params.len()
        };
        if !ok_arity {
            self.diags()
                .report(errors::wrong_arg_count(expr.pos, func.params.len(), args.len()));
        }

        for (i, arg) in args.iter().enumerate() {
            match func.params.get(i).and_then(|p| p.as_var()) {
                Some(param) => self.analyse_init(param.var_ty, arg),
                None => {
                    self.analyse_expr(arg);
                }
            }
        }
        self.finish(expr, func.ret)
    }

    fn analyse_unary(
        &mut self,
        expr: &Expr<'ctx>,
        op: UnaryOp,
        inner: &Expr<'ctx>,
    ) -> Option<QualType<'ctx>> {
        let inner_ty = self.analyse_expr(inner)?;
        let canonical = inner_ty.canonical();
        match op {
            UnaryOp::PostInc | UnaryOp::PostDec | UnaryOp::PreInc | UnaryOp::PreDec => {
                if !self.is_lvalue(inner) {
                    self.diags().report(errors::not_assignable(inner.pos));
                }
                let numeric = canonical
                    .ty
                    .as_builtin()
                    .map(|k| k.is_integer())
                    .unwrap_or(canonical.ty.is_pointer());
                if !numeric {
                    self.diags().report(errors::unop_mismatch(expr.pos, op, inner_ty));
                }
                self.finish(expr, inner_ty)
            }
            UnaryOp::AddrOf => {
                if !self.is_lvalue(inner) {
                    self.diags().report(errors::not_assignable(inner.pos));
                }
                self.finish(expr, QualType::new(self.ast().intern_pointer(inner_ty)))
            }
            UnaryOp::Deref => match &*canonical.ty {
                Type::Pointer(pointee) => self.finish(expr, *pointee),
                _ => {
                    self.diags().report(errors::unop_mismatch(expr.pos, op, inner_ty));
                    None
                }
            },
            UnaryOp::Plus | UnaryOp::Minus => {
                let numeric = canonical
                    .ty
                    .as_builtin()
                    .map(|k| k.is_integer() || k.is_float())
                    .unwrap_or(false);
                if !numeric {
                    self.diags().report(errors::unop_mismatch(expr.pos, op, inner_ty));
                }
                self.finish(expr, inner_ty)
            }
            UnaryOp::BitNot => {
                let integer = canonical
                    .ty
                    .as_builtin()
                    .map(|k| k.is_integer())
                    .unwrap_or(false);
                if !integer {
                    self.diags().report(errors::unop_mismatch(expr.pos, op, inner_ty));
                }
                self.finish(expr, inner_ty)
            }
            UnaryOp::LNot => {
                let canonical_is_bool =
                    matches!(&*canonical.ty, Type::Builtin(BuiltinKind::Bool));
                if !canonical_is_bool {
                    self.diags().report(errors::unop_mismatch(expr.pos, op, inner_ty));
                }
                self.finish(expr, self.ast().builtin_type(BuiltinKind::Bool))
            }
        }
    }

    fn analyse_binop(
        &mut self,
        expr: &Expr<'ctx>,
        op: BinOp,
        lhs: &Expr<'ctx>,
        rhs: &Expr<'ctx>,
    ) -> Option<QualType<'ctx>> {
        if op.is_assignment() {
            let lhs_ty = self.analyse_expr(lhs)?;
            if !self.is_lvalue(lhs) || lhs_ty.is_const() {
                self.diags().report(errors::not_assignable(lhs.pos));
            }
            if op == BinOp::Assign {
                self.analyse_init(lhs_ty, rhs);
            } else if let Some(rhs_ty) = self.analyse_expr(rhs) {
                if self.unify_numeric(lhs_ty, rhs_ty).is_none()
                    && !self.types_compatible(lhs_ty, rhs_ty)
                {
                    self.diags()
                        .report(errors::binop_mismatch(expr.pos, op, lhs_ty, rhs_ty));
                }
            }
            return self.finish(expr, lhs_ty);
        }

        let lhs_ty = self.analyse_expr(lhs)?;
        let rhs_ty = self.analyse_expr(rhs)?;
        let lhs_canon = lhs_ty.canonical();
        let rhs_canon = rhs_ty.canonical();

        if op.is_logical() {
            for (operand, ty) in [(lhs, lhs_ty), (rhs, rhs_ty)] {
                if !matches!(&*ty.canonical().ty, Type::Builtin(BuiltinKind::Bool)) {
                    self.diags().report(errors::condition_not_bool(operand.pos, ty));
                }
            }
            return self.finish(expr, self.ast().builtin_type(BuiltinKind::Bool));
        }

        if op.is_comparison() {
            let comparable = self.unify_numeric(lhs_ty, rhs_ty).is_some()
                || self.types_compatible(lhs_ty, rhs_ty)
                || self.types_compatible(rhs_ty, lhs_ty);
            if !comparable {
                self.diags()
                    .report(errors::binop_mismatch(expr.pos, op, lhs_ty, rhs_ty));
            }
            return self.finish(expr, self.ast().builtin_type(BuiltinKind::Bool));
        }

        // pointer arithmetic
        if matches!(op, BinOp::Add | BinOp::Sub) {
            let lhs_ptr = lhs_canon.ty.is_pointer();
            let rhs_ptr = rhs_canon.ty.is_pointer();
            let rhs_int = rhs_canon
                .ty
                .as_builtin()
                .map(|k| k.is_integer())
                .unwrap_or(false);
            let lhs_int = lhs_canon
                .ty
                .as_builtin()
                .map(|k| k.is_integer())
                .unwrap_or(false);
            if lhs_ptr && rhs_int {
                return self.finish(expr, lhs_ty);
            }
            if op == BinOp::Add && lhs_int && rhs_ptr {
                return self.finish(expr, rhs_ty);
            }
            if op == BinOp::Sub && lhs_ptr && rhs_ptr {
                return self.finish(expr, self.ast().builtin_type(BuiltinKind::ISize));
            }
        }

        if matches!(op, BinOp::Shl | BinOp::Shr) {
            let both_int = [lhs_canon, rhs_canon].iter().all(|t| {
                t.ty.as_builtin().map(|k| k.is_integer()).unwrap_or(false)
            });
            if !both_int {
                self.diags()
                    .report(errors::binop_mismatch(expr.pos, op, lhs_ty, rhs_ty));
            }
            return self.finish(expr, lhs_ty);
        }

        match self.unify_numeric(lhs_ty, rhs_ty) {
            Some(result) => {
                let bit_op = matches!(op, BinOp::BitAnd | BinOp::BitXor | BinOp::BitOr | BinOp::Rem);
                if bit_op {
                    let int = result
                        .canonical()
                        .ty
                        .as_builtin()
                        .map(|k| k.is_integer())
                        .unwrap_or(false);
                    if !int {
                        self.diags()
                            .report(errors::binop_mismatch(expr.pos, op, lhs_ty, rhs_ty));
                    }
                }
                self.finish(expr, result)
            }
            None => {
                self.diags()
                    .report(errors::binop_mismatch(expr.pos, op, lhs_ty, rhs_ty));
                None
            }
        }
    }

    fn analyse_bit_offset(
        &mut self,
        expr: &Expr<'ctx>,
        base: &Expr<'ctx>,
        high: &Expr<'ctx>,
        low: &Expr<'ctx>,
    ) -> Option<QualType<'ctx>> {
        let base_ty = self.analyse_expr(base)?;
        let canonical = base_ty.canonical();
        let unsigned = canonical
            .ty
            .as_builtin()
            .map(|k| k.is_integer() && !k.is_signed())
            .unwrap_or(false);
        if !unsigned {
            self.diags().report(errors::bit_offset_base(expr.pos, base_ty));
        }
        self.analyse_expr(high);
        self.analyse_expr(low);
        match (self.folder.eval(high), self.folder.eval(low)) {
            (Some(h), Some(l)) => {
                if h < l {
                    self.diags().report(errors::invalid_bit_range(expr.pos, h, l));
                }
            }
            _ => self
                .diags()
                .report(errors::const_expr_required(expr.pos, "bit offset")),
        }
        self.finish(expr, base_ty)
    }

    fn analyse_builtin(
        &mut self,
        expr: &Expr<'ctx>,
        builtin: &BuiltinExpr<'ctx>,
    ) -> Option<QualType<'ctx>> {
        let usize_ty = self.ast().builtin_type(BuiltinKind::USize);
        match builtin {
            BuiltinExpr::Sizeof(inner) => {
                self.analyse_expr(inner);
                self.finish(expr, usize_ty)
            }
            BuiltinExpr::Elemsof(inner) => {
                if let Some(ty) = self.analyse_expr(inner) {
                    if ty.canonical().ty.as_array().is_none() {
                        self.diags().report(errors::elemsof_non_array(expr.pos, ty));
                    }
                }
                self.finish(expr, usize_ty)
            }
            BuiltinExpr::Offsetof { record, member } => {
                let record_ty = self.analyse_expr(record);
                if let Some(record_ty) = record_ty {
                    let canonical = record_ty.canonical();
                    match &*canonical.ty {
                        Type::Struct(s) => {
                            if let ExprKind::Identifier(field) = &member.unparenthesized().kind {
                                match s.members.iter().copied().find(|m| m.name == field.name) {
                                    Some(target) => {
                                        let _ = field.target.set(target);
                                        member.set_ty(
                                            target.ty().unwrap_or(usize_ty),
                                        );
                                    }
                                    None => self.diags().report(errors::unknown_member(
                                        member.pos,
                                        field.name,
                                        record_ty,
                                    )),
                                }
                            }
                        }
                        _ => self
                            .diags()
                            .report(errors::member_on_value(record.pos, record_ty)),
                    }
                }
                self.finish(expr, usize_ty)
            }
        }
    }

    fn unify_numeric(&self, a: QualType<'ctx>, b: QualType<'ctx>) -> Option<QualType<'ctx>> {
        let x = a.canonical().ty.as_builtin()?;
        let y = b.canonical().ty.as_builtin()?;
        if x == BuiltinKind::F64 || y == BuiltinKind::F64 {
            if (x.is_float() || x.is_integer()) && (y.is_float() || y.is_integer()) {
                return Some(self.ast().builtin_type(BuiltinKind::F64));
            }
            return None;
        }
        if x == BuiltinKind::F32 || y == BuiltinKind::F32 {
            if (x.is_float() || x.is_integer()) && (y.is_float() || y.is_integer()) {
                return Some(self.ast().builtin_type(BuiltinKind::F32));
            }
            return None;
        }
        if !x.is_integer() || !y.is_integer() {
            return None;
        }
        let rank = |k: BuiltinKind| match k {
            BuiltinKind::I8 | BuiltinKind::U8 | BuiltinKind::Char => 1u8,
            BuiltinKind::I16 | BuiltinKind::U16 => 2,
            BuiltinKind::I32 | BuiltinKind::U32 => 3,
            BuiltinKind::ISize | BuiltinKind::USize => 4,
            _ => 5,
        };
        let winner = match rank(x).cmp(&rank(y)) {
            std::cmp::Ordering::Greater => x,
            std::cmp::Ordering::Less => y,
            std::cmp::Ordering::Equal => {
                if x.is_signed() {
                    y
                } else {
                    x
                }
            }
        };
        Some(self.ast().builtin_type(winner))
    }

    fn cast_allowed(&self, dest: QualType<'ctx>, from: QualType<'ctx>) -> bool {
        let d = dest.canonical();
        let f = from.canonical();
        if d.ty == f.ty {
            return true;
        }
        let d_num = d
            .ty
            .as_builtin()
            .map(|k| k.is_integer() || k.is_float() || k == BuiltinKind::Bool)
            .unwrap_or(false);
        let f_num = f
            .ty
            .as_builtin()
            .map(|k| k.is_integer() || k.is_float() || k == BuiltinKind::Bool)
            .unwrap_or(false);
        let f_enum = matches!(&*f.ty, Type::Enum(..));
        if d_num && (f_num || f_enum) {
            return true;
        }
        let d_ptr = d.ty.is_pointer();
        let f_ptr = f.ty.is_pointer() || matches!(&*f.ty, Type::Builtin(BuiltinKind::StringLit));
        if d_ptr && f_ptr {
            return true;
        }
        // pointer/usize round trips
        if d_ptr && matches!(f.ty.as_builtin(), Some(BuiltinKind::USize)) {
            return true;
        }
        if f_ptr && matches!(d.ty.as_builtin(), Some(BuiltinKind::USize)) {
            return true;
        }
        false
    }

    fn is_lvalue(&self, expr: &Expr<'ctx>) -> bool {
        match &expr.unparenthesized().kind {
            ExprKind::Identifier(ident) => ident
                .target
                .get()
                .map(|d| matches!(d.kind, DeclKind::Var(..)))
                .unwrap_or(false),
            ExprKind::Member(member) => {
                // module-qualified globals are assignable; struct fields
                // follow their base
                member
                    .target
                    .get()
                    .map(|d| matches!(d.kind, DeclKind::Var(..)))
                    .unwrap_or(false)
            }
            ExprKind::ArraySubscript { .. } => true,
            ExprKind::Unary {
                op: UnaryOp::Deref, ..
            } => true,
            ExprKind::BitOffset { .. } => false,
            _ => false,
        }
    }
}
