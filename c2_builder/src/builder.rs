use crate::deps::generate_deps;
use crate::errors;
use crate::interface::generate_interface;
use crate::library::LibraryLoader;
use crate::options::BuildOptions;
use crate::recipe::Target;
use crate::refs::generate_refs;
use bumpalo::Bump;
use c2_ast::{
    ASTContext, BuiltinKind, ComponentId, ComponentKind, Components, DeclKind, ExprKind, Module,
    ModuleMap, QualType, Qualifiers, Symbol, Type, VarDecl, VarKind,
};
use c2_cgen::{CGenerator, Mode};
use c2_common::{
    DiagnosticEngine, DiagnosticManager, Pos, SourceManager,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const COLOR_LOG: &str = "\x1b[2m";
const COLOR_RESET: &str = "\x1b[0m";

/// The parser seam. An implementation reads one source or interface file,
/// registers it with the source manager, allocates declarations through the
/// context, adds them to the module the file declares, and returns that
/// module's name. Problems go through the diagnostics engine; `None` means
/// the file contributed nothing.
pub trait SourceParser {
    fn parse_file<'ctx>(
        &mut self,
        path: &Path,
        sources: &mut SourceManager,
        diags: &DiagnosticManager,
        ctx: &ASTContext<'ctx>,
        modules: &mut ModuleMap<'ctx>,
    ) -> Option<Symbol<'ctx>>;
}

/// Outcome of one target build.
pub struct Report {
    pub errors: usize,
    pub warnings: usize,
    pub duration: Duration,
    pub outputs: Vec<PathBuf>,
}

impl Report {
    pub fn success(&self) -> bool {
        self.errors == 0
    }
}

/// Drives one target through the build pipeline: parse, built-in module,
/// library loading, import checking, component cycle check, analysis in
/// dependency order, the exported-package check, emission, report.
///
/// Phases run strictly in order; after each major phase the error counter
/// decides whether the next phase runs at all. No artifact is written unless
/// every phase before emission came through clean.
pub struct Builder<'a> {
    target: &'a Target,
    options: BuildOptions,
}

impl<'a> Builder<'a> {
    pub fn new(target: &'a Target, options: BuildOptions) -> Self {
        Self { target, options }
    }

    fn log(&self, message: &str) {
        if !self.options.verbose {
            return;
        }
        if self.options.use_colors {
            eprintln!("{COLOR_LOG}{message}{COLOR_RESET}");
        } else {
            eprintln!("{message}");
        }
    }

    pub fn build(&self, parser: &mut dyn SourceParser) -> Report {
        let start = Instant::now();
        let mut sources = SourceManager::default();
        let mut diags = DiagnosticManager::default();
        let bump = Bump::new();
        let ctx = ASTContext::new(&bump);
        let mut modules = ModuleMap::default();
        let mut components = Components::default();

        self.log(&format!("building target '{}'", self.target.name));

        // phase 1: parse the main component's sources
        let mut main_modules: Vec<Symbol> = Vec::new();
        for file in &self.target.files {
            if let Some(name) = parser.parse_file(file, &mut sources, &diags, &ctx, &mut modules) {
                if !main_modules.contains(&name) {
                    main_modules.push(name);
                }
            }
        }
        if diags.has_errors() {
            return self.finish(start, &sources, diags, Vec::new());
        }

        // phase 2: the built-in module with the intrinsic constants
        create_c2_module(&ctx, &mut modules);

        let main_id = components.add(
            ctx.symbol(&self.target.name),
            self.target.kind,
            None,
            true,
        );
        for name in &main_modules {
            components.get_mut(main_id).add_module(*name);
        }

        // phase 3: external components
        let mut loader = LibraryLoader::new();
        for dir in &self.options.libdirs {
            loader.add_search_dir(dir.clone());
        }
        loader.create_components(&ctx, &mut modules, &mut components, &self.target.deps, &diags);
        if diags.has_errors() {
            return self.finish(start, &sources, diags, Vec::new());
        }

        // phase 4: import check
        self.check_imports(
            parser,
            &ctx,
            &mut sources,
            &diags,
            &mut modules,
            &mut components,
            main_id,
            &loader,
            &main_modules,
        );
        if diags.has_errors() {
            return self.finish(start, &sources, diags, Vec::new());
        }

        if let Some((closing, entering)) = components.find_cycle() {
            diags.report(errors::component_cycle(&closing, &entering));
            return self.finish(start, &sources, diags, Vec::new());
        }

        // phase 5: analysis in dependency order
        for id in components.topological_order() {
            let component = components.get(id);
            self.log(&format!("analysing component '{}'", component.name));
            if !c2_analysis::analyze_component(&ctx, &modules, component.modules(), &diags) {
                return self.finish(start, &sources, diags, Vec::new());
            }
        }
        if diags.has_errors() {
            return self.finish(start, &sources, diags, Vec::new());
        }

        // phase 6: exported packages
        for name in &self.target.exports {
            match modules.get(ctx.symbol(name)) {
                Some(module) if !module.is_external => module.exported.set(true),
                _ => diags.report(errors::exported_module_missing(name)),
            }
        }
        if !self.options.fast_build {
            check_exported(&modules, &main_modules, &diags);
        }
        if diags.has_errors() {
            return self.finish(start, &sources, diags, Vec::new());
        }

        self.print_debug(&modules, &components, &main_modules);

        // phase 7: emission
        let outputs = self.emit(&ctx, &sources, &diags, &modules, &components, &loader, &main_modules);

        self.finish(start, &sources, diags, outputs)
    }

    #[allow(clippy::too_many_arguments)]
    fn check_imports<'ctx>(
        &self,
        parser: &mut dyn SourceParser,
        ctx: &ASTContext<'ctx>,
        sources: &mut SourceManager,
        diags: &DiagnosticManager,
        modules: &mut ModuleMap<'ctx>,
        components: &mut Components<'ctx>,
        main_id: ComponentId,
        loader: &LibraryLoader<'ctx>,
        main_modules: &[Symbol<'ctx>],
    ) {
        // collect first; interface parsing below needs the map mutable
        let mut imported: Vec<(Symbol<'ctx>, Pos)> = Vec::new();
        for name in main_modules {
            let Some(module) = modules.get(*name) else {
                continue;
            };
            let mut seen = HashSet::new();
            for decl in module.decls() {
                let Some(import) = decl.as_import() else {
                    continue;
                };
                if !seen.insert(decl.name) {
                    diags.report(errors::duplicate_import(decl.pos, decl.name));
                    continue;
                }
                imported.push((import.module, decl.pos));
            }
        }

        let mut parsed_interfaces: HashSet<PathBuf> = HashSet::new();
        for (module_name, pos) in imported {
            if &*module_name == "c2" || main_modules.contains(&module_name) {
                continue;
            }
            match loader.find_module_lib(&module_name) {
                Some(info) => {
                    let edge_kind = self
                        .target
                        .deps
                        .iter()
                        .find(|(name, _)| {
                            components.get(info.component).name.as_ref() == name.as_str()
                        })
                        .map(|(_, kind)| *kind)
                        .unwrap_or(components.get(info.component).kind);
                    components.get_mut(main_id).add_dep(info.component, edge_kind);

                    // the interface file supplies the external module's
                    // declarations, through the same parser seam
                    if parsed_interfaces.insert(info.source.clone()) {
                        parser.parse_file(&info.source, sources, diags, ctx, modules);
                    }
                }
                None => diags.report(errors::unresolved_import(pos, module_name)),
            }
        }
    }

    fn print_debug<'b>(&self, modules: &ModuleMap<'b>, components: &Components<'b>, main_modules: &[Symbol<'b>]) {
        if self.options.print_modules {
            for (_, component) in components.iter() {
                println!(
                    "component {} ({}){}",
                    component.name,
                    component.kind,
                    if component.is_main { " [main]" } else { "" }
                );
                for module in component.modules() {
                    println!("  module {module}");
                }
                for (dep, kind) in component.deps() {
                    println!("  uses {} ({kind})", components.get(*dep).name);
                }
            }
        }
        if self.options.print_symbols {
            for name in main_modules {
                let Some(module) = modules.get(*name) else {
                    continue;
                };
                println!("symbols of module {name}:");
                for decl in module.decls() {
                    let visibility = if decl.public { "public" } else { "private" };
                    match decl.ty() {
                        Some(ty) => {
                            println!("  {visibility} {} {} : {ty}", decl.kind_name(), decl.name)
                        }
                        None => println!("  {visibility} {} {}", decl.kind_name(), decl.name),
                    }
                }
            }
        }
        if self.options.print_ast {
            for name in main_modules {
                if let Some(module) = modules.get(*name) {
                    print!("{}", c2_ast::print_module(module));
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn emit<'ctx>(
        &self,
        _ctx: &ASTContext<'ctx>,
        sources: &SourceManager,
        diags: &DiagnosticManager,
        modules: &ModuleMap<'ctx>,
        components: &Components<'ctx>,
        loader: &LibraryLoader<'ctx>,
        main_modules: &[Symbol<'ctx>],
    ) -> Vec<PathBuf> {
        let mut outputs = Vec::new();
        let out_dir = self
            .target
            .output_dir
            .clone()
            .unwrap_or_else(|| self.options.output_dir.clone())
            .join(&self.target.name);

        let module_list: Vec<&Module> = main_modules
            .iter()
            .filter_map(|name| modules.get(*name))
            .collect();

        if self.options.generate_c || self.target.generate_c.is_some() {
            let mode = self.target.generate_c.unwrap_or(Mode::SingleFile);
            self.log("generating C");
            let mut generator = CGenerator::new(
                &self.target.name,
                mode,
                self.target.kind == ComponentKind::Executable,
                module_list.clone(),
                loader,
            );
            generator.generate();
            match generator.write(&out_dir) {
                Ok((c_path, h_path)) => {
                    outputs.push(c_path);
                    outputs.push(h_path);
                }
                Err(err) => diags.report(errors::cannot_write_file(&out_dir, err)),
            }
        }

        if self.options.generate_interface || self.target.generate_interface {
            self.log("generating interfaces");
            for module in &module_list {
                if !module.exported.get() {
                    continue;
                }
                let text = generate_interface(module);
                let path = out_dir.join(format!("{}.c2i", module.name));
                if let Err(err) = write_output(&path, &text) {
                    diags.report(errors::cannot_write_file(&path, err));
                } else {
                    outputs.push(path);
                }
            }
        }

        if self.options.generate_deps || self.target.generate_deps {
            self.log("generating dependency graph");
            let text = generate_deps(components, modules, true);
            let path = out_dir.join("deps.dot");
            if let Err(err) = write_output(&path, &text) {
                diags.report(errors::cannot_write_file(&path, err));
            } else {
                outputs.push(path);
            }
        }

        if self.options.generate_refs || self.target.generate_refs {
            self.log("generating refs");
            let text = generate_refs(&module_list, sources);
            let path = out_dir.join("refs");
            if let Err(err) = write_output(&path, &text) {
                diags.report(errors::cannot_write_file(&path, err));
            } else {
                outputs.push(path);
            }
        }

        if self.options.generate_ir || self.target.generate_ir {
            self.log("ir generation is not part of this build, skipping");
        }

        outputs
    }

    fn finish(
        &self,
        start: Instant,
        sources: &SourceManager,
        mut diags: DiagnosticManager,
        outputs: Vec<PathBuf>,
    ) -> Report {
        diags.silence_warnings(&self.target.silent_warnings);
        let errors = diags.error_count();
        let warnings = diags.warning_count();
        for diag in diags.take() {
            eprintln!("{}", diag.display(sources, self.options.use_colors));
        }
        eprintln!("{errors} errors, {warnings} warnings generated");

        let duration = start.elapsed();
        if !self.options.test_mode {
            eprintln!(
                "build of '{}' took {} ms",
                self.target.name,
                duration.as_millis()
            );
        }
        Report {
            errors,
            warnings,
            duration,
            outputs,
        }
    }
}

fn write_output(path: &Path, text: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)
}

/// The built-in `c2` module: integer range constants usable in any constant
/// expression. The declarations are typed here directly; no component
/// analyses this module.
fn create_c2_module<'ctx>(ctx: &ASTContext<'ctx>, modules: &mut ModuleMap<'ctx>) {
    let name = ctx.symbol("c2");
    let module = modules.get_or_create(name);
    if !module.decls().is_empty() {
        return;
    }

    let consts: [(&str, BuiltinKind, i64); 11] = [
        ("min_i8", BuiltinKind::I8, -128),
        ("max_i8", BuiltinKind::I8, 127),
        ("min_i16", BuiltinKind::I16, -32768),
        ("max_i16", BuiltinKind::I16, 32767),
        ("min_i32", BuiltinKind::I32, -2147483648),
        ("max_i32", BuiltinKind::I32, 2147483647),
        ("max_i64", BuiltinKind::I64, i64::MAX),
        ("max_u8", BuiltinKind::U8, 255),
        ("max_u16", BuiltinKind::U16, 65535),
        ("max_u32", BuiltinKind::U32, 4294967295),
        ("max_usize", BuiltinKind::USize, 4294967295),
    ];

    for (const_name, kind, value) in consts {
        let magnitude = value.unsigned_abs();
        let literal = ctx.alloc_expr(
            ExprKind::IntegerLit {
                value: magnitude,
                text: ctx.symbol(&magnitude.to_string()),
            },
            Pos::from(0),
        );
        let init = if value < 0 {
            ctx.alloc_expr(
                ExprKind::Unary {
                    op: c2_ast::UnaryOp::Minus,
                    expr: literal,
                },
                Pos::from(0),
            )
        } else {
            literal
        };
        let ty = QualType::with_quals(ctx.intern_builtin(kind), Qualifiers::CONST);
        let decl = ctx.alloc_decl(
            ctx.symbol(const_name),
            Pos::from(0),
            true,
            DeclKind::Var(VarDecl {
                var_kind: VarKind::Global,
                var_ty: ty,
                init: Some(init),
                incr_values: Default::default(),
            }),
        );
        decl.set_ty(ty);
        init.set_ty(ty);
        module.add_decl(decl);
    }
}

/// Every public declaration of an exported module may only reference types
/// an importer can reach: public types of exported or external modules.
fn check_exported<'ctx, E: DiagnosticEngine>(
    modules: &ModuleMap<'ctx>,
    main_modules: &[Symbol<'ctx>],
    diags: &E,
) {
    for name in main_modules {
        let Some(module) = modules.get(*name) else {
            continue;
        };
        if !module.exported.get() {
            continue;
        }
        for decl in module.decls() {
            if !decl.public {
                continue;
            }
            let Some(ty) = decl.ty() else {
                continue;
            };
            let mut visited = Vec::new();
            check_reachable(decl, ty, modules, diags, &mut visited);
        }
    }
}

fn check_reachable<'ctx, E: DiagnosticEngine>(
    decl: &c2_ast::Decl<'ctx>,
    ty: QualType<'ctx>,
    modules: &ModuleMap<'ctx>,
    diags: &E,
    visited: &mut Vec<*const Type<'ctx>>,
) {
    let key = &*ty.ty as *const Type;
    if visited.contains(&key) {
        return;
    }
    visited.push(key);

    match &*ty.ty {
        Type::Pointer(pointee) => check_reachable(decl, *pointee, modules, diags, visited),
        Type::Array(array) => check_reachable(decl, array.elem, modules, diags, visited),
        Type::Alias(target) => check_reachable(decl, *target, modules, diags, visited),
        Type::Func(func) => {
            check_reachable(decl, func.ret, modules, diags, visited);
            for param in func.params {
                if let Some(var) = param.as_var() {
                    check_reachable(decl, var.var_ty, modules, diags, visited);
                }
            }
        }
        Type::Struct(s) => {
            for member in s.members {
                if let Some(var) = member.as_var() {
                    check_reachable(decl, var.var_ty, modules, diags, visited);
                }
            }
        }
        Type::Ref(r) => {
            let Some(target) = r.target.get() else {
                return;
            };
            let reachable = target.public
                && target
                    .module()
                    .and_then(|m| modules.get(m))
                    .map(|m| m.exported.get() || m.is_external)
                    .unwrap_or(false);
            if !reachable {
                diags.report(errors::exported_type_leak(decl.pos, decl.name, r.name));
            }
        }
        Type::Builtin(..) | Type::Enum(..) | Type::Module(..) => {}
    }
}
