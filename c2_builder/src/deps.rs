use c2_ast::{Components, ModuleMap};
use std::fmt::Write;

/// Renders the component/module dependency graph as GraphViz DOT:
/// components become clusters, import relations become module edges, and
/// component dependencies become dashed edges.
pub(crate) fn generate_deps(
    components: &Components,
    modules: &ModuleMap,
    show_externals: bool,
) -> String {
    let mut out = String::from("digraph deps {\n");

    for (id, component) in components.iter() {
        if !show_externals && !component.is_main {
            continue;
        }
        let _ = writeln!(out, "    subgraph cluster_{} {{", id.0);
        let _ = writeln!(out, "        label=\"{} ({})\";", component.name, component.kind);
        for module in component.modules() {
            let _ = writeln!(out, "        \"{module}\";");
        }
        out.push_str("    }\n");
    }

    for module in modules.iter() {
        if module.is_external {
            continue;
        }
        for import_decl in module.imports() {
            let Some(import) = import_decl.as_import() else {
                continue;
            };
            if &*import.module == "c2" {
                continue;
            }
            let target_external = modules
                .get(import.module)
                .map(|m| m.is_external)
                .unwrap_or(false);
            if !show_externals && target_external {
                continue;
            }
            let _ = writeln!(out, "    \"{}\" -> \"{}\";", module.name, import.module);
        }
    }

    if show_externals {
        for (_, component) in components.iter() {
            for (dep, kind) in component.deps() {
                let _ = writeln!(
                    out,
                    "    \"{}\" -> \"{}\" [label=\"{kind}\", style=dashed];",
                    component.name,
                    components.get(*dep).name
                );
            }
        }
    }

    out.push_str("}\n");
    out
}
