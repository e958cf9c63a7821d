use crate::buffer::{CodeBuf, INDENT};
use crate::mangle::Mangle;
use c2_ast::{
    BuiltinExpr, BuiltinKind, Decl, DeclKind, DesignatedInit, Expr, ExprKind, Module, QualType,
    Stmt, StmtKind, Type,
};
use indexmap::IndexSet;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// One `.c` with a `.h` of forward declarations; everything but `main`
    /// gets internal linkage.
    SingleFile,
    /// Public declarations go to the `.h`, private ones stay `static` in
    /// the `.c`.
    MultiFile,
}

/// Maps an imported module to the header the generated C should include.
/// The library loader implements this; plain-C libraries keep their own
/// header name and are included with angle brackets.
pub trait HeaderNamer {
    fn include_name(&self, module: &str) -> String;

    fn is_clib(&self, module: &str) -> bool;
}

/// Lowers the fully analysed modules of one target to a C source/header
/// pair. Output is deterministic: modules, declarations, members and
/// statements are emitted in insertion order only.
pub struct CGenerator<'a, 'ctx> {
    basename: String,
    mode: Mode,
    is_executable: bool,
    modules: Vec<&'a Module<'ctx>>,
    namer: &'a dyn HeaderNamer,
    header: String,
    source: String,
}

fn builtin_c_name(kind: BuiltinKind) -> &'static str {
    match kind {
        BuiltinKind::I8 => "char",
        BuiltinKind::U8 => "unsigned char",
        BuiltinKind::I16 => "short",
        BuiltinKind::U16 => "unsigned short",
        BuiltinKind::I32 => "int",
        BuiltinKind::U32 => "unsigned int",
        BuiltinKind::I64 => "long long",
        BuiltinKind::U64 => "unsigned long long",
        BuiltinKind::F32 => "float",
        BuiltinKind::F64 => "double",
        BuiltinKind::Char => "char",
        BuiltinKind::Bool => "int",
        BuiltinKind::Void => "void",
        BuiltinKind::ISize => "ptrdiff_t",
        BuiltinKind::USize => "size_t",
        BuiltinKind::StringLit => "const char*",
    }
}

impl<'a, 'ctx> CGenerator<'a, 'ctx> {
    pub fn new(
        basename: &str,
        mode: Mode,
        is_executable: bool,
        modules: Vec<&'a Module<'ctx>>,
        namer: &'a dyn HeaderNamer,
    ) -> Self {
        Self {
            basename: basename.to_string(),
            mode,
            is_executable,
            modules,
            namer,
            header: String::new(),
            source: String::new(),
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn generate(&mut self) {
        let mut hbuf = CodeBuf::new();
        let mut cbuf = CodeBuf::new();

        let guard: String = self
            .basename
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        hbuf.add(&format!("#ifndef {guard}_H\n"));
        hbuf.add(&format!("#define {guard}_H\n"));
        hbuf.add("\n");
        hbuf.add("#include <stddef.h>\n");
        hbuf.add("\n");

        let mut seen_includes = IndexSet::new();
        for module in &self.modules {
            for decl in module.decls() {
                if decl.as_import().is_some() {
                    self.emit_use(decl, &mut hbuf, &mut cbuf, &mut seen_includes);
                }
            }
        }

        cbuf.add(&format!("#include \"{}.h\"\n", self.basename));
        cbuf.add("\n");

        let mut main_func = None;
        for module in &self.modules {
            for decl in module.decls() {
                match &decl.kind {
                    DeclKind::Func(..) => {
                        if self.is_executable && &*decl.name == "main" {
                            main_func = Some(*decl);
                        }
                        self.emit_function(decl, &mut hbuf, &mut cbuf);
                    }
                    DeclKind::Var(..) => self.emit_variable(decl, &mut hbuf, &mut cbuf),
                    DeclKind::AliasType { .. }
                    | DeclKind::StructType(..)
                    | DeclKind::EnumType(..)
                    | DeclKind::FunctionType { .. } => {
                        self.emit_type_decl(decl, &mut hbuf, &mut cbuf)
                    }
                    // handled in the include pass
                    DeclKind::Import(..) => {}
                    // emitted by their enum type
                    DeclKind::EnumValue(..) => {}
                    // merged into their owning variable
                    DeclKind::ArrayValue { .. } => {}
                    DeclKind::Label(..) => {}
                }
            }
        }

        if self.mode == Mode::MultiFile {
            if let Some(main_decl) = main_func {
                self.emit_entry_shim(main_decl, &mut cbuf);
            }
        }

        hbuf.add("#endif\n");

        self.header = hbuf.into_string();
        self.source = cbuf.into_string();
    }

    /// Writes the generated pair under `dir`. Only call after `generate`
    /// succeeded; nothing is written on a failed build.
    pub fn write(&self, dir: &Path) -> std::io::Result<(PathBuf, PathBuf)> {
        std::fs::create_dir_all(dir)?;
        let h_path = dir.join(format!("{}.h", self.basename));
        let c_path = dir.join(format!("{}.c", self.basename));
        std::fs::write(&h_path, &self.header)?;
        std::fs::write(&c_path, &self.source)?;
        Ok((c_path, h_path))
    }

    fn emit_use(
        &self,
        decl: &Decl<'ctx>,
        hbuf: &mut CodeBuf,
        cbuf: &mut CodeBuf,
        seen: &mut IndexSet<String>,
    ) {
        let import = decl.as_import().expect("import decl");
        let target = import.module;
        if &*target == "c2" {
            return;
        }
        // modules of the same target live in this very translation unit
        if self.modules.iter().any(|m| m.name == target) {
            return;
        }

        let is_clib = self.namer.is_clib(&target);
        let name = self.namer.include_name(&target);
        let line = if is_clib {
            format!("#include <{name}>\n")
        } else {
            format!("#include \"{name}\"\n")
        };
        if !seen.insert(line.clone()) {
            return;
        }
        match self.mode {
            Mode::MultiFile => hbuf.add(&line),
            Mode::SingleFile => {
                if is_clib {
                    cbuf.add(&line);
                }
            }
        }
    }

    fn is_plain_main(&self, decl: &Decl<'ctx>) -> bool {
        self.mode == Mode::SingleFile && self.is_executable && &*decl.name == "main"
    }

    fn emit_function(&self, decl: &Decl<'ctx>, hbuf: &mut CodeBuf, cbuf: &mut CodeBuf) {
        let func = decl.as_func().expect("function decl");

        if self.mode == Mode::SingleFile {
            // forward declarations for everything
            self.emit_function_proto(decl, hbuf);
            hbuf.add(";\n\n");
        } else if decl.public {
            self.emit_function_proto(decl, hbuf);
            hbuf.add(";\n\n");
        } else {
            cbuf.add("static ");
        }

        self.emit_function_proto(decl, cbuf);
        cbuf.ch(' ');
        match func.body {
            Some(body) => {
                let stmts = body.as_compound().unwrap_or(&[]);
                self.emit_compound(stmts, cbuf, 0, false);
            }
            None => cbuf.add(";\n"),
        }
        cbuf.ch('\n');
    }

    fn emit_function_proto(&self, decl: &Decl<'ctx>, buf: &mut CodeBuf) {
        let func = decl.as_func().expect("function decl");
        if self.mode == Mode::SingleFile && !self.is_plain_main(decl) {
            buf.add("static ");
        }
        self.emit_type_pre(func.return_ty, buf);
        self.emit_type_post(func.return_ty, buf);
        buf.ch(' ');
        if self.is_plain_main(decl) {
            buf.add("main");
        } else {
            buf.add(&decl.mangled_name());
        }
        buf.ch('(');
        if func.params.is_empty() && !func.variadic {
            buf.add("void");
        }
        for (i, param) in func.params.iter().enumerate() {
            if i > 0 {
                buf.add(", ");
            }
            self.emit_decl_expr(param, buf, 0);
        }
        if func.variadic {
            if !func.params.is_empty() {
                buf.add(", ");
            }
            buf.add("...");
        }
        buf.ch(')');
    }

    fn emit_entry_shim(&self, main_decl: &Decl<'ctx>, cbuf: &mut CodeBuf) {
        let func = main_decl.as_func().expect("function decl");
        let mangled = main_decl.mangled_name();
        if func.params.len() >= 2 {
            cbuf.add("int main(int argc, char* argv[]) {\n");
            cbuf.indent(INDENT);
            cbuf.add(&format!("return {mangled}(argc, argv);\n"));
        } else {
            cbuf.add("int main(void) {\n");
            cbuf.indent(INDENT);
            cbuf.add(&format!("return {mangled}();\n"));
        }
        cbuf.add("}\n");
    }

    fn emit_variable(&self, decl: &Decl<'ctx>, hbuf: &mut CodeBuf, cbuf: &mut CodeBuf) {
        let var = decl.as_var().expect("variable decl");
        if decl.public && self.mode == Mode::MultiFile {
            hbuf.add("extern ");
            self.emit_type_pre(var.var_ty, hbuf);
            hbuf.ch(' ');
            hbuf.add(&decl.mangled_name());
            self.emit_type_post(var.var_ty, hbuf);
            hbuf.add(";\n\n");
        } else {
            cbuf.add("static ");
        }
        self.emit_type_pre(var.var_ty, cbuf);
        cbuf.ch(' ');
        cbuf.add(&decl.mangled_name());
        self.emit_type_post(var.var_ty, cbuf);
        if let Some(init) = var.init {
            cbuf.add(" = ");
            self.emit_expr(init, cbuf);
        }
        let incr = var.incr_values.borrow();
        if !incr.is_empty() {
            cbuf.add(" = {\n");
            for entry in incr.iter() {
                if let DeclKind::ArrayValue { entry } = &entry.kind {
                    cbuf.indent(INDENT);
                    self.emit_expr(entry, cbuf);
                    cbuf.add(",\n");
                }
            }
            cbuf.ch('}');
        }
        cbuf.add(";\n\n");
    }

    fn emit_type_decl(&self, decl: &Decl<'ctx>, hbuf: &mut CodeBuf, cbuf: &mut CodeBuf) {
        let out = if decl.public { hbuf } else { cbuf };
        out.add("typedef ");
        match &decl.kind {
            DeclKind::FunctionType { signature } => {
                let func = signature.as_func().expect("function type signature");
                self.emit_type_pre(func.return_ty, out);
                self.emit_type_post(func.return_ty, out);
                out.add(" (*");
                out.add(&decl.mangled_name());
                out.add(")(");
                if func.params.is_empty() && !func.variadic {
                    out.add("void");
                }
                for (i, param) in func.params.iter().enumerate() {
                    if i > 0 {
                        out.add(", ");
                    }
                    self.emit_decl_expr(param, out, 0);
                }
                if func.variadic {
                    if !func.params.is_empty() {
                        out.add(", ");
                    }
                    out.add("...");
                }
                out.ch(')');
            }
            _ => {
                let ty = match &decl.kind {
                    DeclKind::AliasType { target } => *target,
                    _ => decl.ty().expect("type decl resolved before emission"),
                };
                self.emit_type_pre(ty, out);
                self.emit_type_post(ty, out);
                out.ch(' ');
                out.add(&decl.mangled_name());
            }
        }
        out.add(";\n\n");
    }

    fn emit_decl_expr(&self, decl: &Decl<'ctx>, buf: &mut CodeBuf, indent: usize) {
        let var = decl.as_var().expect("variable decl");
        buf.indent(indent);
        if var.var_ty.is_local() {
            buf.add("static ");
        }
        self.emit_type_pre(var.var_ty, buf);
        buf.ch(' ');
        buf.add(&decl.name);
        self.emit_type_post(var.var_ty, buf);
        if let Some(init) = var.init {
            buf.add(" = ");
            self.emit_expr(init, buf);
        }
    }

    fn emit_type_pre(&self, ty: QualType<'ctx>, buf: &mut CodeBuf) {
        if ty.is_const() {
            buf.add("const ");
        }
        if ty.is_volatile() {
            buf.add("volatile ");
        }
        match &*ty.ty {
            Type::Builtin(kind) => buf.add(builtin_c_name(*kind)),
            Type::Pointer(pointee) => {
                self.emit_type_pre(*pointee, buf);
                buf.ch('*');
            }
            Type::Array(array) => self.emit_type_pre(array.elem, buf),
            Type::Ref(r) => match r.target.get() {
                Some(target) => buf.add(&target.mangled_name()),
                None => buf.add(&r.name),
            },
            Type::Alias(target) => self.emit_type_pre(*target, buf),
            Type::Struct(s) => {
                buf.add(if s.is_union { "union {\n" } else { "struct {\n" });
                for member in s.members {
                    self.emit_decl_expr(member, buf, INDENT);
                    buf.add(";\n");
                }
                buf.ch('}');
            }
            Type::Enum(e) => {
                buf.add("enum {\n");
                for constant in e.constants {
                    buf.indent(INDENT);
                    buf.add(&constant.mangled_name());
                    if let Some(init) = constant.as_enum_value().and_then(|v| v.init) {
                        buf.add(" = ");
                        self.emit_expr(init, buf);
                    }
                    buf.add(",\n");
                }
                buf.ch('}');
            }
            Type::Func(func) => {
                self.emit_type_pre(func.ret, buf);
                buf.add(" (*");
            }
            Type::Module(..) => unreachable!("module sentinel survived analysis"),
        }
    }

    fn emit_type_post(&self, ty: QualType<'ctx>, buf: &mut CodeBuf) {
        match &*ty.ty {
            Type::Array(array) => {
                // outermost bracket first so nested arrays read correctly
                buf.ch('[');
                if let Some(len) = array.len.get() {
                    buf.add(&len.to_string());
                } else if let Some(size) = array.size {
                    self.emit_expr(size, buf);
                }
                buf.ch(']');
                self.emit_type_post(array.elem, buf);
            }
            Type::Alias(target) => self.emit_type_post(*target, buf),
            Type::Func(func) => {
                buf.add(")(");
                if func.params.is_empty() && !func.variadic {
                    buf.add("void");
                }
                for (i, param) in func.params.iter().enumerate() {
                    if i > 0 {
                        buf.add(", ");
                    }
                    self.emit_decl_expr(param, buf, 0);
                }
                if func.variadic {
                    if !func.params.is_empty() {
                        buf.add(", ");
                    }
                    buf.add("...");
                }
                buf.ch(')');
            }
            _ => {}
        }
    }

    fn emit_compound(
        &self,
        stmts: &[&'ctx Stmt<'ctx>],
        buf: &mut CodeBuf,
        indent: usize,
        start_on_new_line: bool,
    ) {
        if start_on_new_line {
            buf.indent(indent);
        }
        buf.add("{\n");
        for stmt in stmts {
            self.emit_stmt(stmt, buf, indent + INDENT);
        }
        buf.indent(indent);
        buf.add("}\n");
    }

    fn emit_body(&self, body: &Stmt<'ctx>, buf: &mut CodeBuf, indent: usize) {
        match body.as_compound() {
            Some(stmts) => self.emit_compound(stmts, buf, indent, false),
            None => {
                buf.ch('\n');
                self.emit_stmt(body, buf, indent + INDENT);
            }
        }
    }

    fn emit_stmt(&self, stmt: &Stmt<'ctx>, buf: &mut CodeBuf, indent: usize) {
        match &stmt.kind {
            StmtKind::Return(expr) => {
                buf.indent(indent);
                buf.add("return");
                if let Some(expr) = expr {
                    buf.ch(' ');
                    self.emit_expr(expr, buf);
                }
                buf.add(";\n");
            }
            StmtKind::Expr(expr) => {
                buf.indent(indent);
                self.emit_expr(expr, buf);
                buf.add(";\n");
            }
            StmtKind::If {
                cond,
                then_stmt,
                else_stmt,
            } => {
                buf.indent(indent);
                buf.add("if (");
                self.emit_expr(cond, buf);
                buf.add(")\n");
                self.emit_stmt_indented(then_stmt, buf, indent);
                if let Some(else_stmt) = else_stmt {
                    buf.indent(indent);
                    buf.add("else\n");
                    self.emit_stmt_indented(else_stmt, buf, indent);
                }
            }
            StmtKind::While { cond, body } => {
                buf.indent(indent);
                buf.add("while (");
                self.emit_expr(cond, buf);
                buf.add(") ");
                self.emit_body(body, buf, indent);
            }
            StmtKind::Do { body, cond } => {
                buf.indent(indent);
                buf.add("do ");
                self.emit_body(body, buf, indent);
                buf.indent(indent);
                buf.add("while (");
                self.emit_expr(cond, buf);
                buf.add(");\n");
            }
            StmtKind::For {
                init,
                cond,
                incr,
                body,
            } => {
                buf.indent(indent);
                buf.add("for (");
                if let Some(init) = init {
                    match &init.kind {
                        StmtKind::Expr(expr) => self.emit_expr(expr, buf),
                        StmtKind::Decl(decl) => self.emit_decl_expr(decl, buf, 0),
                        _ => {}
                    }
                }
                buf.ch(';');
                if let Some(cond) = cond {
                    buf.ch(' ');
                    self.emit_expr(cond, buf);
                }
                buf.ch(';');
                if let Some(incr) = incr {
                    buf.ch(' ');
                    self.emit_expr(incr, buf);
                }
                buf.add(") ");
                self.emit_body(body, buf, indent);
            }
            StmtKind::Switch { cond, cases } => {
                buf.indent(indent);
                buf.add("switch (");
                self.emit_expr(cond, buf);
                buf.add(") {\n");
                for case in *cases {
                    match &case.kind {
                        StmtKind::Case { cond, stmts } => {
                            buf.indent(indent + INDENT);
                            buf.add("case ");
                            self.emit_expr(cond, buf);
                            buf.add(":\n");
                            for stmt in *stmts {
                                self.emit_stmt(stmt, buf, indent + INDENT + INDENT);
                            }
                        }
                        StmtKind::Default { stmts } => {
                            buf.indent(indent + INDENT);
                            buf.add("default:\n");
                            for stmt in *stmts {
                                self.emit_stmt(stmt, buf, indent + INDENT + INDENT);
                            }
                        }
                        _ => unreachable!("switch bodies hold only case and default entries"),
                    }
                }
                buf.indent(indent);
                buf.add("}\n");
            }
            StmtKind::Case { .. } | StmtKind::Default { .. } => {
                unreachable!("case emitted by its switch")
            }
            StmtKind::Break => {
                buf.indent(indent);
                buf.add("break;\n");
            }
            StmtKind::Continue => {
                buf.indent(indent);
                buf.add("continue;\n");
            }
            StmtKind::Label { name, stmt } => {
                buf.add(name);
                buf.add(":\n");
                self.emit_stmt(stmt, buf, indent);
            }
            StmtKind::Goto { name } => {
                buf.indent(indent);
                buf.add(&format!("goto {name};\n"));
            }
            StmtKind::Compound { stmts } => self.emit_compound(stmts, buf, indent, true),
            StmtKind::Decl(decl) => {
                self.emit_decl_expr(decl, buf, indent);
                buf.add(";\n");
            }
            StmtKind::Asm(asm) => {
                buf.indent(indent);
                buf.add("__asm__ ");
                if asm.is_volatile {
                    buf.add("volatile ");
                }
                buf.add(&format!("(\"{}\"", asm.template));
                let have_tail =
                    !asm.outputs.is_empty() || !asm.inputs.is_empty() || !asm.clobbers.is_empty();
                if have_tail {
                    buf.add(" : ");
                    for (i, (constraint, expr)) in asm.outputs.iter().enumerate() {
                        if i > 0 {
                            buf.add(", ");
                        }
                        buf.add(&format!("\"{constraint}\" ("));
                        self.emit_expr(expr, buf);
                        buf.ch(')');
                    }
                    buf.add(" : ");
                    for (i, (constraint, expr)) in asm.inputs.iter().enumerate() {
                        if i > 0 {
                            buf.add(", ");
                        }
                        buf.add(&format!("\"{constraint}\" ("));
                        self.emit_expr(expr, buf);
                        buf.ch(')');
                    }
                    if !asm.clobbers.is_empty() {
                        buf.add(" : ");
                        for (i, clobber) in asm.clobbers.iter().enumerate() {
                            if i > 0 {
                                buf.add(", ");
                            }
                            buf.add(&format!("\"{clobber}\""));
                        }
                    }
                }
                buf.add(");\n");
            }
        }
    }

    fn emit_stmt_indented(&self, stmt: &Stmt<'ctx>, buf: &mut CodeBuf, indent: usize) {
        match &stmt.kind {
            StmtKind::Compound { stmts } => self.emit_compound(stmts, buf, indent, true),
            _ => self.emit_stmt(stmt, buf, indent + INDENT),
        }
    }

    fn emit_expr(&self, expr: &Expr<'ctx>, buf: &mut CodeBuf) {
        match &expr.kind {
            ExprKind::IntegerLit { text, .. } => buf.add(text),
            ExprKind::FloatLit { text } => buf.add(text),
            ExprKind::BoolLit(value) => buf.add(if *value { "1" } else { "0" }),
            ExprKind::CharLit { value } => {
                buf.ch('\'');
                match value {
                    '\n' => buf.add("\\n"),
                    '\t' => buf.add("\\t"),
                    '\r' => buf.add("\\r"),
                    '\0' => buf.add("\\0"),
                    '\'' => buf.add("\\'"),
                    '\\' => buf.add("\\\\"),
                    c => buf.ch(*c),
                }
                buf.ch('\'');
            }
            ExprKind::StringLit { text } => {
                buf.ch('"');
                buf.add(text);
                buf.ch('"');
            }
            ExprKind::Nil => buf.add("NULL"),
            ExprKind::Identifier(ident) => match ident.target.get() {
                Some(target) if is_global(target) => match builtin_const_init(target) {
                    Some(init) => self.emit_expr(init, buf),
                    None => buf.add(&target.mangled_name()),
                },
                _ => buf.add(&ident.name),
            },
            ExprKind::TypeExpr(ty) => {
                self.emit_type_pre(*ty, buf);
                self.emit_type_post(*ty, buf);
            }
            ExprKind::Call { callee, args } => {
                self.emit_expr(callee, buf);
                buf.ch('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        buf.add(", ");
                    }
                    self.emit_expr(arg, buf);
                }
                buf.ch(')');
            }
            ExprKind::InitList { values } => {
                buf.add("{ ");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        buf.add(", ");
                    }
                    self.emit_expr(value, buf);
                }
                buf.add(" }");
            }
            ExprKind::DesignatedInit(init) => match init {
                DesignatedInit::Field { field, value } => {
                    buf.add(&format!(".{field} = "));
                    self.emit_expr(value, buf);
                }
                DesignatedInit::Index { index, value } => {
                    buf.ch('[');
                    self.emit_expr(index, buf);
                    buf.add("] = ");
                    self.emit_expr(value, buf);
                }
            },
            ExprKind::Binop { op, lhs, rhs } => {
                self.emit_expr(lhs, buf);
                buf.add(&format!(" {op} "));
                self.emit_expr(rhs, buf);
            }
            ExprKind::CondOp {
                cond,
                then_expr,
                else_expr,
            } => {
                self.emit_expr(cond, buf);
                buf.add(" ? ");
                self.emit_expr(then_expr, buf);
                buf.add(" : ");
                self.emit_expr(else_expr, buf);
            }
            ExprKind::Unary { op, expr: inner } => {
                if op.is_postfix() {
                    self.emit_expr(inner, buf);
                    buf.add(&op.to_string());
                } else {
                    buf.add(&op.to_string());
                    self.emit_expr(inner, buf);
                }
            }
            ExprKind::Builtin(builtin) => self.emit_builtin(builtin, buf),
            ExprKind::ArraySubscript { base, index } => {
                self.emit_expr(base, buf);
                buf.ch('[');
                self.emit_expr(index, buf);
                buf.ch(']');
            }
            ExprKind::Member(member) => {
                let base_is_module = member
                    .base
                    .unparenthesized()
                    .as_identifier()
                    .and_then(|i| i.target.get())
                    .map(|t| t.as_import().is_some())
                    .unwrap_or(false);
                if base_is_module {
                    match member.target.get() {
                        Some(target) => match builtin_const_init(target) {
                            Some(init) => self.emit_expr(init, buf),
                            None => buf.add(&target.mangled_name()),
                        },
                        None => buf.add(&member.member),
                    }
                } else {
                    self.emit_expr(member.base, buf);
                    buf.add(if member.arrow { "->" } else { "." });
                    buf.add(&member.member);
                }
            }
            ExprKind::Paren(inner) => {
                buf.ch('(');
                self.emit_expr(inner, buf);
                buf.ch(')');
            }
            ExprKind::BitOffset { base, high, low } => {
                buf.add("((");
                self.emit_expr(base, buf);
                buf.add(" >> ");
                self.emit_expr(low, buf);
                buf.add(") & ((1 << (");
                self.emit_expr(high, buf);
                buf.add(" - ");
                self.emit_expr(low, buf);
                buf.add(" + 1)) - 1))");
            }
            ExprKind::Cast { dest, inner } => {
                buf.ch('(');
                self.emit_type_pre(*dest, buf);
                self.emit_type_post(*dest, buf);
                buf.ch(')');
                self.emit_expr(inner, buf);
            }
        }
    }

    fn emit_builtin(&self, builtin: &BuiltinExpr<'ctx>, buf: &mut CodeBuf) {
        match builtin {
            BuiltinExpr::Sizeof(inner) => {
                buf.add("sizeof(");
                self.emit_expr(inner, buf);
                buf.ch(')');
            }
            BuiltinExpr::Elemsof(inner) => {
                let len = inner
                    .ty()
                    .map(|t| t.canonical())
                    .and_then(|t| t.ty.as_array().and_then(|a| a.len.get().copied()));
                match len {
                    Some(len) => buf.add(&len.to_string()),
                    None => {
                        // length not folded; let the C compiler compute it
                        buf.add("(sizeof(");
                        self.emit_expr(inner, buf);
                        buf.add(") / sizeof(");
                        self.emit_expr(inner, buf);
                        buf.add("[0]))");
                    }
                }
            }
            BuiltinExpr::Offsetof { record, member } => {
                buf.add("offsetof(");
                self.emit_expr(record, buf);
                buf.add(", ");
                self.emit_expr(member, buf);
                buf.ch(')');
            }
        }
    }
}

fn is_global(decl: &Decl) -> bool {
    match &decl.kind {
        DeclKind::Var(var) => var.var_kind == c2_ast::VarKind::Global,
        DeclKind::Func(..) | DeclKind::EnumValue(..) => true,
        _ => false,
    }
}

/// Constants of the built-in `c2` module have no translation unit behind
/// them; their initializer value is emitted in place.
fn builtin_const_init<'ctx>(decl: &Decl<'ctx>) -> Option<&'ctx Expr<'ctx>> {
    let from_builtin = decl.module().map(|m| &*m == "c2").unwrap_or(false);
    if !from_builtin {
        return None;
    }
    decl.as_var().and_then(|var| var.init)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;
    use c2_ast::{
        ASTContext, ExprKind, FuncDecl, ModuleMap, StmtKind, StructTypeDecl, VarDecl, VarKind,
    };
    use c2_common::Pos;

    struct NoLibs;

    impl HeaderNamer for NoLibs {
        fn include_name(&self, module: &str) -> String {
            format!("{module}.h")
        }

        fn is_clib(&self, _module: &str) -> bool {
            false
        }
    }

    fn int_lit<'ctx>(ast: &ASTContext<'ctx>, value: u64) -> &'ctx Expr<'ctx> {
        ast.alloc_expr(
            ExprKind::IntegerLit {
                value,
                text: ast.symbol(&value.to_string()),
            },
            Pos::from(0),
        )
    }

    fn main_module<'ctx>(ast: &ASTContext<'ctx>, modules: &mut ModuleMap<'ctx>) {
        let i32_ty = ast.builtin_type(c2_ast::BuiltinKind::I32);
        let ret = ast.alloc_stmt(StmtKind::Return(Some(int_lit(ast, 0))), Pos::from(1));
        let body = ast.alloc_stmt(
            StmtKind::Compound {
                stmts: ast.alloc_stmts(vec![ret]),
            },
            Pos::from(1),
        );
        let func = ast.alloc_decl(
            ast.symbol("main"),
            Pos::from(0),
            true,
            c2_ast::DeclKind::Func(FuncDecl {
                return_ty: i32_ty,
                receiver: None,
                params: ast.alloc_decls(vec![]),
                variadic: false,
                body: Some(body),
            }),
        );
        modules.get_or_create(ast.symbol("main")).add_decl(func);
    }

    #[test]
    fn hello_world_single_file_keeps_main_unmangled() {
        let bump = Bump::new();
        let ast = ASTContext::new(&bump);
        let mut modules = ModuleMap::default();
        main_module(&ast, &mut modules);

        let module = modules.get(ast.symbol("main")).unwrap();
        let mut generator =
            CGenerator::new("hello", Mode::SingleFile, true, vec![module], &NoLibs);
        generator.generate();

        assert!(generator.source().contains("int main(void) {"));
        assert!(generator.source().contains("    return 0;"));
        assert!(!generator.source().contains("main_main"));
        assert!(generator.header().starts_with("#ifndef HELLO_H\n#define HELLO_H\n"));
        assert!(generator.header().ends_with("#endif\n"));
    }

    #[test]
    fn hello_world_multi_file_mangles_and_adds_entry_shim() {
        let bump = Bump::new();
        let ast = ASTContext::new(&bump);
        let mut modules = ModuleMap::default();
        main_module(&ast, &mut modules);

        let module = modules.get(ast.symbol("main")).unwrap();
        let mut generator = CGenerator::new("hello", Mode::MultiFile, true, vec![module], &NoLibs);
        generator.generate();

        assert!(generator.source().contains("int main_main(void) {"));
        assert!(generator.source().contains("int main(void) {\n    return main_main();\n}\n"));
        assert!(generator.header().contains("int main_main(void);"));
    }

    #[test]
    fn public_private_split_in_multi_file_mode() {
        let bump = Bump::new();
        let ast = ASTContext::new(&bump);
        let mut modules = ModuleMap::default();
        let i32_ty = ast.builtin_type(c2_ast::BuiltinKind::I32);

        let param = |name: &str| {
            ast.alloc_decl(
                ast.symbol(name),
                Pos::from(0),
                false,
                c2_ast::DeclKind::Var(VarDecl {
                    var_kind: VarKind::Param,
                    var_ty: i32_ty,
                    init: None,
                    incr_values: Default::default(),
                }),
            )
        };
        let body = ast.alloc_stmt(
            StmtKind::Compound {
                stmts: ast.alloc_stmts(vec![]),
            },
            Pos::from(0),
        );
        let add = ast.alloc_decl(
            ast.symbol("add"),
            Pos::from(0),
            true,
            c2_ast::DeclKind::Func(FuncDecl {
                return_ty: i32_ty,
                receiver: None,
                params: ast.alloc_decls(vec![param("a"), param("b")]),
                variadic: false,
                body: Some(body),
            }),
        );
        let helper = ast.alloc_decl(
            ast.symbol("helper"),
            Pos::from(0),
            false,
            c2_ast::DeclKind::Func(FuncDecl {
                return_ty: i32_ty,
                receiver: None,
                params: ast.alloc_decls(vec![]),
                variadic: false,
                body: Some(body),
            }),
        );
        {
            let module = modules.get_or_create(ast.symbol("util"));
            module.add_decl(add);
            module.add_decl(helper);
        }

        let module = modules.get(ast.symbol("util")).unwrap();
        let mut generator = CGenerator::new("util", Mode::MultiFile, false, vec![module], &NoLibs);
        generator.generate();

        assert!(generator.header().contains("int util_add(int a, int b);"));
        assert!(!generator.header().contains("helper"));
        assert!(generator.source().contains("static int util_helper(void) {"));
        assert!(generator.source().contains("int util_add(int a, int b) {"));
    }

    #[test]
    fn struct_type_becomes_inline_typedef() {
        let bump = Bump::new();
        let ast = ASTContext::new(&bump);
        let mut modules = ModuleMap::default();
        let i32_ty = ast.builtin_type(c2_ast::BuiltinKind::I32);

        let member = |name: &str| {
            ast.alloc_decl(
                ast.symbol(name),
                Pos::from(0),
                false,
                c2_ast::DeclKind::Var(VarDecl {
                    var_kind: VarKind::Member,
                    var_ty: i32_ty,
                    init: None,
                    incr_values: Default::default(),
                }),
            )
        };
        let members = ast.alloc_decls(vec![member("x"), member("y")]);
        let point = ast.alloc_decl(
            ast.symbol("Point"),
            Pos::from(0),
            true,
            c2_ast::DeclKind::StructType(StructTypeDecl {
                is_union: false,
                members,
            }),
        );
        point.set_ty(QualType::new(ast.intern_type(Type::Struct(
            c2_ast::StructType {
                is_union: false,
                members,
            },
        ))));
        modules.get_or_create(ast.symbol("util")).add_decl(point);

        let module = modules.get(ast.symbol("util")).unwrap();
        let mut generator = CGenerator::new("util", Mode::MultiFile, false, vec![module], &NoLibs);
        generator.generate();

        assert!(generator
            .header()
            .contains("typedef struct {\n    int x;\n    int y;\n} util_Point;\n"));
    }

    #[test]
    fn folded_array_length_is_emitted() {
        let bump = Bump::new();
        let ast = ASTContext::new(&bump);
        let mut modules = ModuleMap::default();
        let i32_ty = ast.builtin_type(c2_ast::BuiltinKind::I32);

        let size = int_lit(&ast, 4);
        let array = ast.intern_array(i32_ty, Some(size));
        array.as_array().unwrap().len.set(5).unwrap();

        let buf = ast.alloc_decl(
            ast.symbol("buf"),
            Pos::from(0),
            false,
            c2_ast::DeclKind::Var(VarDecl {
                var_kind: VarKind::Global,
                var_ty: QualType::new(array),
                init: None,
                incr_values: Default::default(),
            }),
        );
        modules.get_or_create(ast.symbol("util")).add_decl(buf);

        let module = modules.get(ast.symbol("util")).unwrap();
        let mut generator = CGenerator::new("util", Mode::MultiFile, false, vec![module], &NoLibs);
        generator.generate();

        assert!(generator.source().contains("static int util_buf[5];"));
    }

    #[test]
    fn emission_is_deterministic() {
        let bump = Bump::new();
        let ast = ASTContext::new(&bump);
        let mut modules = ModuleMap::default();
        main_module(&ast, &mut modules);
        let module = modules.get(ast.symbol("main")).unwrap();

        let mut first = CGenerator::new("hello", Mode::MultiFile, true, vec![module], &NoLibs);
        first.generate();
        let mut second = CGenerator::new("hello", Mode::MultiFile, true, vec![module], &NoLibs);
        second.generate();

        assert_eq!(first.header(), second.header());
        assert_eq!(first.source(), second.source());
    }
}
