use crate::decl::Decl;
use crate::Symbol;
use indexmap::IndexMap;
use std::cell::Cell;

/// A named namespace. Declarations keep their insertion order; the first
/// declaration under a name wins lookups, and later duplicates are reported
/// during analysis.
pub struct Module<'ctx> {
    pub name: Symbol<'ctx>,
    decls: Vec<&'ctx Decl<'ctx>>,
    symbols: IndexMap<Symbol<'ctx>, &'ctx Decl<'ctx>>,
    imports: IndexMap<Symbol<'ctx>, &'ctx Decl<'ctx>>,
    pub exported: Cell<bool>,
    pub is_external: bool,
}

impl<'ctx> Module<'ctx> {
    fn new(name: Symbol<'ctx>, is_external: bool) -> Self {
        Self {
            name,
            decls: Vec::default(),
            symbols: IndexMap::default(),
            imports: IndexMap::default(),
            exported: Cell::new(false),
            is_external,
        }
    }

    pub fn add_decl(&mut self, decl: &'ctx Decl<'ctx>) {
        decl.set_module(self.name);
        self.decls.push(decl);
        self.symbols.entry(decl.name).or_insert(decl);
    }

    /// Registers an `Import` decl under its local alias. The decl also joins
    /// the ordinary declaration list so emission sees it in source order.
    pub fn add_import(&mut self, decl: &'ctx Decl<'ctx>) {
        decl.set_module(self.name);
        self.decls.push(decl);
        self.imports.entry(decl.name).or_insert(decl);
    }

    pub fn find_decl(&self, name: Symbol<'ctx>) -> Option<&'ctx Decl<'ctx>> {
        self.symbols.get(&name).copied()
    }

    pub fn find_import(&self, alias: Symbol<'ctx>) -> Option<&'ctx Decl<'ctx>> {
        self.imports.get(&alias).copied()
    }

    pub fn decls(&self) -> &[&'ctx Decl<'ctx>] {
        &self.decls
    }

    pub fn imports(&self) -> impl Iterator<Item = &'ctx Decl<'ctx>> + '_ {
        self.imports.values().copied()
    }
}

/// All modules of a build, keyed by name. Modules come to life the first
/// time something names them.
#[derive(Default)]
pub struct ModuleMap<'ctx> {
    modules: IndexMap<Symbol<'ctx>, Module<'ctx>>,
}

impl<'ctx> ModuleMap<'ctx> {
    pub fn get_or_create(&mut self, name: Symbol<'ctx>) -> &mut Module<'ctx> {
        self.modules
            .entry(name)
            .or_insert_with(|| Module::new(name, false))
    }

    pub fn create_external(&mut self, name: Symbol<'ctx>) -> &mut Module<'ctx> {
        self.modules
            .entry(name)
            .or_insert_with(|| Module::new(name, true))
    }

    pub fn get(&self, name: Symbol<'ctx>) -> Option<&Module<'ctx>> {
        self.modules.get(&name)
    }

    pub fn contains(&self, name: Symbol<'ctx>) -> bool {
        self.modules.contains_key(&name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Module<'ctx>> {
        self.modules.values()
    }
}
