use c2_ast::{walk_decl, Decl, Module, Symbol, Visitor};
use c2_common::{Pos, SourceManager};
use std::fmt::Write;

struct RefCollector<'a> {
    sources: &'a SourceManager,
    out: String,
}

impl<'a, 'ctx> Visitor<'ctx> for RefCollector<'a> {
    fn visit_identifier(
        &mut self,
        name: Symbol<'ctx>,
        pos: Option<Pos>,
        target: Option<&'ctx Decl<'ctx>>,
    ) {
        // type-reference names carry no position of their own; only
        // identifier occurrences with a source location are indexed
        let Some(pos) = pos else {
            return;
        };
        let use_loc = self.sources.location(pos);
        match target {
            Some(target) => {
                let def_loc = self.sources.location(target.pos);
                let _ = writeln!(self.out, "{name}\t{use_loc}\t{def_loc}");
            }
            None => {
                let _ = writeln!(self.out, "{name}\t{use_loc}\t-");
            }
        }
    }
}

/// Identifier cross-reference for the main component, one line per
/// occurrence: name, use location, definition location.
pub(crate) fn generate_refs<'ctx>(modules: &[&Module<'ctx>], sources: &SourceManager) -> String {
    let mut collector = RefCollector {
        sources,
        out: String::new(),
    };
    for module in modules {
        for &decl in module.decls() {
            walk_decl(&mut collector, decl);
        }
    }
    collector.out
}
