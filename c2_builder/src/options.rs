use std::path::PathBuf;

/// Driver configuration. Recipe stanzas can switch the per-target emission
/// flags on as well; the options given here apply to every target.
#[derive(Clone, Debug)]
pub struct BuildOptions {
    /// Dump every module's declarations after analysis. Default `false`.
    pub print_ast: bool,
    /// Print the per-module symbol tables. Default `false`.
    pub print_symbols: bool,
    /// Print components, their modules and dependency edges. Default
    /// `false`.
    pub print_modules: bool,
    /// Emit the C translation unit and header. Default `false`.
    pub generate_c: bool,
    /// Recorded for recipe compatibility; the native path is not part of
    /// this build and the driver skips it with a note. Default `false`.
    pub generate_ir: bool,
    /// Emit a `.c2i` interface per exported module. Default `false`.
    pub generate_interface: bool,
    /// Emit the dependency graph as GraphViz DOT. Default `false`.
    pub generate_deps: bool,
    /// Emit the identifier cross-reference file. Default `false`.
    pub generate_refs: bool,
    /// Progress logging on stderr. Default `false`.
    pub verbose: bool,
    /// Skip the exported-package check. Default `false`.
    pub fast_build: bool,
    /// Stable output for test harnesses: no timing line. Default `false`.
    pub test_mode: bool,
    /// Colourised diagnostics and logs. Default `false`.
    pub use_colors: bool,
    /// Library search path, first directory wins. Default empty.
    pub libdirs: Vec<PathBuf>,
    /// Where generated artifacts land, one subdirectory per target.
    /// Default `output`.
    pub output_dir: PathBuf,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            print_ast: false,
            print_symbols: false,
            print_modules: false,
            generate_c: false,
            generate_ir: false,
            generate_interface: false,
            generate_deps: false,
            generate_refs: false,
            verbose: false,
            fast_build: false,
            test_mode: false,
            use_colors: false,
            libdirs: Vec::default(),
            output_dir: PathBuf::from("output"),
        }
    }
}
