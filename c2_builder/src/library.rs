use crate::errors;
use c2_ast::{
    ASTContext, ComponentId, ComponentKind, Components, ModuleMap, Symbol,
};
use c2_cgen::HeaderNamer;
use c2_common::DiagnosticEngine;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Resolver record: this module name is provided by that component, backed
/// by this public header and interface file.
pub struct LibInfo<'ctx> {
    pub header: String,
    pub source: PathBuf,
    pub component: ComponentId,
    pub module: Symbol<'ctx>,
    pub is_clib: bool,
}

struct Manifest {
    name: String,
    kind: ComponentKind,
    modules: Vec<(String, String, String)>,
    uses: Vec<String>,
}

/// Discovers external components on the library search path. A library
/// directory holds one subdirectory per component; each subdirectory has a
/// `manifest` naming the component and the modules it advertises.
pub struct LibraryLoader<'ctx> {
    dirs: Vec<PathBuf>,
    libs: IndexMap<String, LibInfo<'ctx>>,
}

impl<'ctx> LibraryLoader<'ctx> {
    pub fn new() -> Self {
        Self {
            dirs: Vec::default(),
            libs: IndexMap::default(),
        }
    }

    /// Earlier directories win when two provide the same component.
    pub fn add_search_dir(&mut self, dir: PathBuf) {
        if !self.dirs.contains(&dir) {
            self.dirs.push(dir);
        }
    }

    fn find_component_dir(&self, name: &str) -> Option<PathBuf> {
        self.dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.join("manifest").is_file())
    }

    /// Materializes one component per dependency named in the recipe, an
    /// empty module plus a [`LibInfo`] per advertised module. Two external
    /// libraries advertising the same module name is an error.
    pub fn create_components<E: DiagnosticEngine>(
        &mut self,
        ctx: &ASTContext<'ctx>,
        modules: &mut ModuleMap<'ctx>,
        components: &mut Components<'ctx>,
        deps: &[(String, ComponentKind)],
        diags: &E,
    ) -> bool {
        let mut ok = true;
        let mut pending_edges: Vec<(ComponentId, String)> = Vec::new();
        for (dep_name, _) in deps {
            let Some(dir) = self.find_component_dir(dep_name) else {
                diags.report(errors::library_not_found(dep_name, &self.dirs));
                ok = false;
                continue;
            };
            let manifest_path = dir.join("manifest");
            let text = match std::fs::read_to_string(&manifest_path) {
                Ok(text) => text,
                Err(err) => {
                    diags.report(errors::manifest_unreadable(&manifest_path, err));
                    ok = false;
                    continue;
                }
            };
            let manifest = match parse_manifest(&text) {
                Ok(manifest) => manifest,
                Err(message) => {
                    diags.report(errors::manifest_invalid(&manifest_path, &message));
                    ok = false;
                    continue;
                }
            };
            if manifest.name != *dep_name {
                diags.report(errors::manifest_invalid(
                    &manifest_path,
                    &format!(
                        "component '{}' does not match directory '{dep_name}'",
                        manifest.name
                    ),
                ));
                ok = false;
                continue;
            }

            let component_id = components.add(
                ctx.symbol(&manifest.name),
                manifest.kind,
                Some(dir.clone()),
                false,
            );
            let is_clib = manifest.kind == ComponentKind::CLib;
            for used in &manifest.uses {
                pending_edges.push((component_id, used.clone()));
            }

            for (module_name, header, source) in &manifest.modules {
                if self.libs.contains_key(module_name) {
                    diags.report(errors::duplicate_external_module(module_name, dep_name));
                    ok = false;
                    continue;
                }
                let module_sym = ctx.symbol(module_name);
                modules.create_external(module_sym);
                components.get_mut(component_id).add_module(module_sym);
                self.libs.insert(
                    module_name.clone(),
                    LibInfo {
                        header: header.clone(),
                        source: dir.join(source),
                        component: component_id,
                        module: module_sym,
                        is_clib,
                    },
                );
            }
        }

        // second pass: dependency edges between external components; only
        // components materialized for this build participate
        for (from, used) in pending_edges {
            if let Some(to) = components.find(ctx.symbol(&used)) {
                let kind = components.get(to).kind;
                components.get_mut(from).add_dep(to, kind);
            }
        }
        ok
    }

    pub fn find_module_lib(&self, module_name: &str) -> Option<&LibInfo<'ctx>> {
        self.libs.get(module_name)
    }

    pub fn libs(&self) -> impl Iterator<Item = (&str, &LibInfo<'ctx>)> {
        self.libs.iter().map(|(name, info)| (name.as_str(), info))
    }
}

impl<'ctx> Default for LibraryLoader<'ctx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'ctx> HeaderNamer for LibraryLoader<'ctx> {
    /// Plain-C libraries keep the header named in their manifest; C2
    /// modules map to `<module>.h`.
    fn include_name(&self, module: &str) -> String {
        match self.libs.get(module) {
            Some(info) => info.header.clone(),
            None => format!("{module}.h"),
        }
    }

    fn is_clib(&self, module: &str) -> bool {
        self.libs.get(module).map(|info| info.is_clib).unwrap_or(false)
    }
}

fn parse_manifest(text: &str) -> Result<Manifest, String> {
    let mut name: Option<String> = None;
    let mut kind = ComponentKind::StaticLib;
    let mut modules = Vec::new();
    let mut uses = Vec::new();
    let mut closed = false;

    for (lineno, raw) in text.lines().enumerate() {
        let lineno = lineno + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut words = line.split_whitespace();
        match words.next().expect("non-empty line") {
            "component" => {
                name = Some(
                    words
                        .next()
                        .ok_or_else(|| format!("line {lineno}: component needs a name"))?
                        .to_string(),
                );
            }
            "kind" => {
                kind = match words.next() {
                    Some("static-lib") => ComponentKind::StaticLib,
                    Some("shared-lib") => ComponentKind::SharedLib,
                    Some("c-lib") => ComponentKind::CLib,
                    Some(word) => {
                        return Err(format!("line {lineno}: unknown component kind '{word}'"))
                    }
                    None => return Err(format!("line {lineno}: kind needs a value")),
                };
            }
            "module" => {
                let module = words
                    .next()
                    .ok_or_else(|| format!("line {lineno}: module needs a name"))?;
                let header = words
                    .next()
                    .ok_or_else(|| format!("line {lineno}: module needs a header"))?;
                let source = words
                    .next()
                    .ok_or_else(|| format!("line {lineno}: module needs a source file"))?;
                modules.push((module.to_string(), header.to_string(), source.to_string()));
            }
            "use" => {
                let used = words
                    .next()
                    .ok_or_else(|| format!("line {lineno}: use needs a component"))?;
                uses.push(used.to_string());
            }
            "end" => closed = true,
            other => return Err(format!("line {lineno}: unknown entry '{other}'")),
        }
    }

    if !closed {
        return Err(String::from("missing 'end'"));
    }
    let name = name.ok_or_else(|| String::from("missing 'component' entry"))?;
    Ok(Manifest {
        name,
        kind,
        modules,
        uses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_parses_modules_and_kind() {
        let text = "\
component math
  kind static-lib
  module math math.h math.c2i
  module trig trig.h trig.c2i
end
";
        let manifest = parse_manifest(text).expect("manifest parses");
        assert_eq!(manifest.name, "math");
        assert_eq!(manifest.kind, ComponentKind::StaticLib);
        assert_eq!(manifest.modules.len(), 2);
        assert_eq!(
            manifest.modules[0],
            (
                String::from("math"),
                String::from("math.h"),
                String::from("math.c2i")
            )
        );
    }

    #[test]
    fn truncated_manifest_is_rejected() {
        assert!(parse_manifest("component math\n").is_err());
        assert!(parse_manifest("kind static-lib\nend\n").is_err());
        assert!(parse_manifest("component math\nbogus\nend\n").is_err());
    }
}
