use c2_ast::{
    ASTContext, BinOp, BuiltinKind, DeclKind, ExprKind, FuncDecl, IdentifierExpr, ImportDecl,
    ModuleMap, QualType, Qualifiers, StmtKind, Symbol, VarDecl, VarKind,
};
use c2_builder::{parse_recipe, BuildOptions, Builder, SourceParser};
use c2_common::{DiagnosticManager, Pos, SourceManager};
use std::cell::OnceCell;
use std::path::{Path, PathBuf};

fn scratch_dir(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("c2_build_{test}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("scratch dir");
    dir
}

fn options_for(dir: &Path) -> BuildOptions {
    BuildOptions {
        test_mode: true,
        output_dir: dir.to_path_buf(),
        ..BuildOptions::default()
    }
}

fn int_expr<'ctx>(ctx: &ASTContext<'ctx>, pos: Pos, value: u64) -> &'ctx c2_ast::Expr<'ctx> {
    ctx.alloc_expr(
        ExprKind::IntegerLit {
            value,
            text: ctx.symbol(&value.to_string()),
        },
        pos,
    )
}

fn ident_expr<'ctx>(ctx: &ASTContext<'ctx>, pos: Pos, name: &str) -> &'ctx c2_ast::Expr<'ctx> {
    ctx.alloc_expr(
        ExprKind::Identifier(IdentifierExpr {
            name: ctx.symbol(name),
            target: OnceCell::new(),
        }),
        pos,
    )
}

fn param<'ctx>(ctx: &ASTContext<'ctx>, pos: Pos, name: &str) -> &'ctx c2_ast::Decl<'ctx> {
    ctx.alloc_decl(
        ctx.symbol(name),
        pos,
        false,
        DeclKind::Var(VarDecl {
            var_kind: VarKind::Param,
            var_ty: ctx.builtin_type(BuiltinKind::I32),
            init: None,
            incr_values: Default::default(),
        }),
    )
}

/// `module main` with `public func i32 main() { return 0; }`.
fn build_main_module<'ctx>(
    ctx: &ASTContext<'ctx>,
    modules: &mut ModuleMap<'ctx>,
    base: Pos,
) -> Symbol<'ctx> {
    let i32_ty = ctx.builtin_type(BuiltinKind::I32);
    let ret = ctx.alloc_stmt(StmtKind::Return(Some(int_expr(ctx, base, 0))), base);
    let body = ctx.alloc_stmt(
        StmtKind::Compound {
            stmts: ctx.alloc_stmts(vec![ret]),
        },
        base,
    );
    let func = ctx.alloc_decl(
        ctx.symbol("main"),
        base,
        true,
        DeclKind::Func(FuncDecl {
            return_ty: i32_ty,
            receiver: None,
            params: ctx.alloc_decls(vec![]),
            variadic: false,
            body: Some(body),
        }),
    );
    let name = ctx.symbol("main");
    modules.get_or_create(name).add_decl(func);
    name
}

/// `module util` with a public `add` and a private `helper`.
fn build_util_module<'ctx>(
    ctx: &ASTContext<'ctx>,
    modules: &mut ModuleMap<'ctx>,
    base: Pos,
) -> Symbol<'ctx> {
    let i32_ty = ctx.builtin_type(BuiltinKind::I32);

    let a = param(ctx, base, "a");
    let b = param(ctx, base, "b");
    let sum = ctx.alloc_expr(
        ExprKind::Binop {
            op: BinOp::Add,
            lhs: ident_expr(ctx, base.with_offset(1), "a"),
            rhs: ident_expr(ctx, base.with_offset(2), "b"),
        },
        base.with_offset(1),
    );
    let ret = ctx.alloc_stmt(StmtKind::Return(Some(sum)), base);
    let body = ctx.alloc_stmt(
        StmtKind::Compound {
            stmts: ctx.alloc_stmts(vec![ret]),
        },
        base,
    );
    let add = ctx.alloc_decl(
        ctx.symbol("add"),
        base,
        true,
        DeclKind::Func(FuncDecl {
            return_ty: i32_ty,
            receiver: None,
            params: ctx.alloc_decls(vec![a, b]),
            variadic: false,
            body: Some(body),
        }),
    );

    let helper_ret = ctx.alloc_stmt(StmtKind::Return(Some(int_expr(ctx, base, 1))), base);
    let helper_body = ctx.alloc_stmt(
        StmtKind::Compound {
            stmts: ctx.alloc_stmts(vec![helper_ret]),
        },
        base,
    );
    let helper = ctx.alloc_decl(
        ctx.symbol("helper"),
        base,
        false,
        DeclKind::Func(FuncDecl {
            return_ty: i32_ty,
            receiver: None,
            params: ctx.alloc_decls(vec![]),
            variadic: false,
            body: Some(helper_body),
        }),
    );

    let name = ctx.symbol("util");
    let module = modules.get_or_create(name);
    module.add_decl(add);
    module.add_decl(helper);
    name
}

/// Builds scenario modules keyed by source file name; stands in for the
/// external language parser.
struct ScenarioParser;

impl SourceParser for ScenarioParser {
    fn parse_file<'ctx>(
        &mut self,
        path: &Path,
        sources: &mut SourceManager,
        _diags: &DiagnosticManager,
        ctx: &ASTContext<'ctx>,
        modules: &mut ModuleMap<'ctx>,
    ) -> Option<Symbol<'ctx>> {
        let file_name = path.file_name()?.to_str()?;
        match file_name {
            "main.c2" => {
                let file = sources.add_file(path.to_path_buf(), String::from("module main;\n"));
                Some(build_main_module(ctx, modules, file.offset))
            }
            "util.c2" => {
                let file = sources.add_file(path.to_path_buf(), String::from("module util;\n"));
                Some(build_util_module(ctx, modules, file.offset))
            }
            "buffers.c2" => {
                let file =
                    sources.add_file(path.to_path_buf(), String::from("module buffers;\n"));
                let base = file.offset;
                let i32_ty = ctx.builtin_type(BuiltinKind::I32);
                let name = ctx.symbol("buffers");
                let module = modules.get_or_create(name);

                let n = ctx.alloc_decl(
                    ctx.symbol("N"),
                    base,
                    false,
                    DeclKind::Var(VarDecl {
                        var_kind: VarKind::Global,
                        var_ty: QualType::with_quals(
                            ctx.intern_builtin(BuiltinKind::I32),
                            Qualifiers::CONST,
                        ),
                        init: Some(int_expr(ctx, base, 4)),
                        incr_values: Default::default(),
                    }),
                );
                module.add_decl(n);

                let size = ctx.alloc_expr(
                    ExprKind::Binop {
                        op: BinOp::Add,
                        lhs: ident_expr(ctx, base.with_offset(3), "N"),
                        rhs: int_expr(ctx, base.with_offset(4), 1),
                    },
                    base.with_offset(3),
                );
                let buf = ctx.alloc_decl(
                    ctx.symbol("buf"),
                    base,
                    false,
                    DeclKind::Var(VarDecl {
                        var_kind: VarKind::Global,
                        var_ty: QualType::new(ctx.intern_array(i32_ty, Some(size))),
                        init: None,
                        incr_values: Default::default(),
                    }),
                );
                module.add_decl(buf);
                Some(name)
            }
            "lonely.c2" => {
                let file = sources.add_file(
                    path.to_path_buf(),
                    String::from("module main;\nimport foo;\n"),
                );
                let base = file.offset;
                let name = build_main_module(ctx, modules, base);
                let import = ctx.alloc_decl(
                    ctx.symbol("foo"),
                    base.with_offset(13),
                    false,
                    DeclKind::Import(ImportDecl {
                        module: ctx.symbol("foo"),
                        used: Default::default(),
                    }),
                );
                modules.get_or_create(name).add_import(import);
                Some(name)
            }
            "twolibs.c2" => {
                let file = sources.add_file(
                    path.to_path_buf(),
                    String::from("module main;\nimport mod_a;\nimport mod_b;\n"),
                );
                let base = file.offset;
                let name = build_main_module(ctx, modules, base);
                for (alias, offset) in [("mod_a", 13), ("mod_b", 27)] {
                    let import = ctx.alloc_decl(
                        ctx.symbol(alias),
                        base.with_offset(offset),
                        false,
                        DeclKind::Import(ImportDecl {
                            module: ctx.symbol(alias),
                            used: Default::default(),
                        }),
                    );
                    modules.get_or_create(name).add_import(import);
                }
                Some(name)
            }
            // library interface files contribute no declarations here
            "liba.c2i" => Some(ctx.symbol("mod_a")),
            "libb.c2i" => Some(ctx.symbol("mod_b")),
            _ => None,
        }
    }
}

fn target(recipe_text: &str, name: &str) -> c2_builder::Recipe {
    let recipe = parse_recipe(recipe_text).expect("recipe parses");
    assert!(recipe.find_target(name).is_some());
    recipe
}

#[test]
fn hello_world_single_file() {
    let dir = scratch_dir("hello_single");
    let recipe = target("target hello\n  main.c2\n  $generate-c single\nend\n", "hello");
    let builder = Builder::new(recipe.find_target("hello").unwrap(), options_for(&dir));

    let report = builder.build(&mut ScenarioParser);
    assert!(report.success());
    assert_eq!(report.errors, 0);

    let source = std::fs::read_to_string(dir.join("hello").join("hello.c")).expect("hello.c");
    assert!(source.contains("int main(void) {"));
    assert!(source.contains("    return 0;"));
    assert!(!source.contains("main_main"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn hello_world_multi_file_has_entry_shim() {
    let dir = scratch_dir("hello_multi");
    let recipe = target("target hello\n  main.c2\n  $generate-c multi\nend\n", "hello");
    let builder = Builder::new(recipe.find_target("hello").unwrap(), options_for(&dir));

    let report = builder.build(&mut ScenarioParser);
    assert!(report.success());

    let source = std::fs::read_to_string(dir.join("hello").join("hello.c")).expect("hello.c");
    assert!(source.contains("int main_main(void) {"));
    assert!(source.contains("int main(void) {\n    return main_main();\n}\n"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn public_private_split_through_the_driver() {
    let dir = scratch_dir("split");
    let recipe = target(
        "target util\n  $kind static-lib\n  util.c2\n  $export util\n  $generate-c multi\nend\n",
        "util",
    );
    let builder = Builder::new(recipe.find_target("util").unwrap(), options_for(&dir));

    let report = builder.build(&mut ScenarioParser);
    assert!(report.success());

    let header = std::fs::read_to_string(dir.join("util").join("util.h")).expect("util.h");
    let source = std::fs::read_to_string(dir.join("util").join("util.c")).expect("util.c");
    assert!(header.contains("int util_add(int a, int b);"));
    assert!(!header.contains("helper"));
    assert!(source.contains("static int util_helper(void) {"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn array_sizes_fold_through_the_whole_pipeline() {
    let dir = scratch_dir("fold");
    let recipe = target(
        "target buffers\n  $kind static-lib\n  buffers.c2\n  $generate-c multi\nend\n",
        "buffers",
    );
    let builder = Builder::new(recipe.find_target("buffers").unwrap(), options_for(&dir));

    let report = builder.build(&mut ScenarioParser);
    assert!(report.success());

    let source =
        std::fs::read_to_string(dir.join("buffers").join("buffers.c")).expect("buffers.c");
    assert!(source.contains("static int buffers_buf[5];"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn unresolved_import_fails_and_writes_nothing() {
    let dir = scratch_dir("unresolved");
    let recipe = target(
        "target hello\n  lonely.c2\n  $generate-c single\nend\n",
        "hello",
    );
    let builder = Builder::new(recipe.find_target("hello").unwrap(), options_for(&dir));

    let report = builder.build(&mut ScenarioParser);
    assert!(!report.success());
    assert_eq!(report.errors, 1);
    assert!(report.outputs.is_empty());
    assert!(!dir.join("hello").join("hello.c").exists());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn component_cycle_is_rejected() {
    let dir = scratch_dir("cycle");
    let libdir = dir.join("libs");
    std::fs::create_dir_all(libdir.join("liba")).expect("liba dir");
    std::fs::create_dir_all(libdir.join("libb")).expect("libb dir");
    std::fs::write(
        libdir.join("liba").join("manifest"),
        "component liba\n  kind static-lib\n  use libb\n  module mod_a liba.h liba.c2i\nend\n",
    )
    .expect("liba manifest");
    std::fs::write(
        libdir.join("libb").join("manifest"),
        "component libb\n  kind static-lib\n  use liba\n  module mod_b libb.h libb.c2i\nend\n",
    )
    .expect("libb manifest");

    let recipe = target(
        "target hello\n  twolibs.c2\n  $use liba static\n  $use libb static\nend\n",
        "hello",
    );
    let mut options = options_for(&dir);
    options.libdirs.push(libdir);
    let builder = Builder::new(recipe.find_target("hello").unwrap(), options);

    let report = builder.build(&mut ScenarioParser);
    assert!(!report.success());
    assert_eq!(report.errors, 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn exported_module_interface_is_written() {
    let dir = scratch_dir("interface");
    let recipe = target(
        "target util\n  $kind static-lib\n  util.c2\n  $export util\n  $generate-interface\nend\n",
        "util",
    );
    let builder = Builder::new(recipe.find_target("util").unwrap(), options_for(&dir));

    let report = builder.build(&mut ScenarioParser);
    assert!(report.success());

    let interface =
        std::fs::read_to_string(dir.join("util").join("util.c2i")).expect("util.c2i");
    assert!(interface.starts_with("module util;\n"));
    assert!(interface.contains("public func i32 add(i32 a, i32 b);"));
    assert!(!interface.contains("helper"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_exported_module_is_an_error() {
    let dir = scratch_dir("missing_export");
    let recipe = target(
        "target hello\n  main.c2\n  $export nonexistent\nend\n",
        "hello",
    );
    let builder = Builder::new(recipe.find_target("hello").unwrap(), options_for(&dir));

    let report = builder.build(&mut ScenarioParser);
    assert!(!report.success());
    assert_eq!(report.errors, 1);

    let _ = std::fs::remove_dir_all(&dir);
}
