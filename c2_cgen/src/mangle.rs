use c2_ast::{Decl, DeclKind};

/// External names in the generated C: `module_name + "_" + identifier`.
/// Struct functions keep their receiver between the two.
pub trait Mangle {
    fn mangled_name(&self) -> String;
}

impl<'ctx> Mangle for Decl<'ctx> {
    fn mangled_name(&self) -> String {
        let module = self
            .module()
            .map(|m| m.to_string())
            .unwrap_or_default();
        if let DeclKind::Func(func) = &self.kind {
            if let Some(receiver) = func.receiver {
                return format!("{module}_{receiver}_{}", self.name);
            }
        }
        format!("{module}_{}", self.name)
    }
}
