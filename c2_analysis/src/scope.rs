use c2_ast::{Decl, Symbol};
use indexmap::IndexMap;

/// Lexical scope stack for one function body. The outermost frame holds the
/// parameters; every compound statement pushes a frame.
pub(crate) struct Scope<'ctx> {
    frames: Vec<IndexMap<Symbol<'ctx>, &'ctx Decl<'ctx>>>,
}

impl<'ctx> Scope<'ctx> {
    pub(crate) fn new() -> Self {
        Self {
            frames: vec![IndexMap::default()],
        }
    }

    pub(crate) fn enter(&mut self) {
        self.frames.push(IndexMap::default());
    }

    pub(crate) fn exit(&mut self) {
        self.frames.pop().expect("scope underflow");
    }

    /// Adds a declaration to the innermost frame. Returns the declaration
    /// that already owns the name in that frame, if any.
    pub(crate) fn declare(
        &mut self,
        name: Symbol<'ctx>,
        decl: &'ctx Decl<'ctx>,
    ) -> Option<&'ctx Decl<'ctx>> {
        let frame = self.frames.last_mut().expect("no active scope");
        match frame.get(&name) {
            Some(prev) => Some(prev),
            None => {
                frame.insert(name, decl);
                None
            }
        }
    }

    pub(crate) fn lookup(&self, name: Symbol<'ctx>) -> Option<&'ctx Decl<'ctx>> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(&name))
            .copied()
    }
}
