use crate::errors;
use c2_ast::ComponentKind;
use c2_cgen::Mode;
use c2_common::Diagnostic;
use std::path::{Path, PathBuf};

/// One build target from the recipe: the sources it compiles, the modules
/// it exports, the external components it links against, and its emission
/// switches.
#[derive(Debug)]
pub struct Target {
    pub name: String,
    pub kind: ComponentKind,
    pub files: Vec<PathBuf>,
    pub exports: Vec<String>,
    pub deps: Vec<(String, ComponentKind)>,
    pub generate_c: Option<Mode>,
    pub generate_ir: bool,
    pub generate_deps: bool,
    pub generate_refs: bool,
    pub generate_interface: bool,
    pub silent_warnings: Vec<String>,
    pub target_triple: Option<String>,
    pub output_dir: Option<PathBuf>,
}

impl Target {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ComponentKind::Executable,
            files: Vec::default(),
            exports: Vec::default(),
            deps: Vec::default(),
            generate_c: None,
            generate_ir: false,
            generate_deps: false,
            generate_refs: false,
            generate_interface: false,
            silent_warnings: Vec::default(),
            target_triple: None,
            output_dir: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Recipe {
    pub targets: Vec<Target>,
}

impl Recipe {
    pub fn find_target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == name)
    }
}

fn parse_component_kind(word: &str) -> Option<ComponentKind> {
    match word {
        "executable" => Some(ComponentKind::Executable),
        "static-lib" | "static" => Some(ComponentKind::StaticLib),
        "shared-lib" | "dynamic" => Some(ComponentKind::SharedLib),
        "c-lib" | "clib" => Some(ComponentKind::CLib),
        _ => None,
    }
}

/// Parses the flat stanza format:
///
/// ```text
/// target hello
///   main.c2
///   $export util
///   $use math static
///   $generate-c multi
/// end
/// ```
pub fn parse_recipe(text: &str) -> Result<Recipe, String> {
    let mut recipe = Recipe::default();
    let mut current: Option<Target> = None;

    for (lineno, raw) in text.lines().enumerate() {
        let lineno = lineno + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut words = line.split_whitespace();
        let first = words.next().expect("non-empty line");

        if first == "target" {
            if current.is_some() {
                return Err(format!("line {lineno}: missing 'end' before new target"));
            }
            let name = words
                .next()
                .ok_or_else(|| format!("line {lineno}: target needs a name"))?;
            current = Some(Target::new(name));
            continue;
        }
        if first == "end" {
            match current.take() {
                Some(target) => recipe.targets.push(target),
                None => return Err(format!("line {lineno}: 'end' outside a target")),
            }
            continue;
        }

        let Some(target) = current.as_mut() else {
            return Err(format!("line {lineno}: '{line}' outside a target stanza"));
        };

        if let Some(option) = first.strip_prefix('$') {
            match option {
                "kind" => {
                    let word = words
                        .next()
                        .ok_or_else(|| format!("line {lineno}: $kind needs a value"))?;
                    target.kind = parse_component_kind(word)
                        .ok_or_else(|| format!("line {lineno}: unknown target kind '{word}'"))?;
                }
                "export" => target.exports.extend(words.map(str::to_string)),
                "use" => {
                    let name = words
                        .next()
                        .ok_or_else(|| format!("line {lineno}: $use needs a component"))?;
                    let kind = match words.next() {
                        Some(word) => parse_component_kind(word).ok_or_else(|| {
                            format!("line {lineno}: unknown dependency kind '{word}'")
                        })?,
                        None => ComponentKind::StaticLib,
                    };
                    target.deps.push((name.to_string(), kind));
                }
                "generate-c" => {
                    target.generate_c = Some(match words.next() {
                        Some("multi") => Mode::MultiFile,
                        Some("single") | None => Mode::SingleFile,
                        Some(word) => {
                            return Err(format!(
                                "line {lineno}: unknown generate-c mode '{word}'"
                            ))
                        }
                    });
                }
                "generate-ir" => target.generate_ir = true,
                "generate-deps" => target.generate_deps = true,
                "generate-refs" => target.generate_refs = true,
                "generate-interface" => target.generate_interface = true,
                "warnings" => target.silent_warnings.extend(words.map(str::to_string)),
                "target" => target.target_triple = words.next().map(str::to_string),
                "output" => target.output_dir = words.next().map(PathBuf::from),
                _ => return Err(format!("line {lineno}: unknown option '${option}'")),
            }
            continue;
        }

        target.files.push(PathBuf::from(first));
    }

    if current.is_some() {
        return Err(String::from("missing 'end' at end of recipe"));
    }
    Ok(recipe)
}

/// Reads and parses a recipe file, mapping failures onto the driver's
/// diagnostic shapes.
pub fn load_recipe(path: &Path) -> Result<Recipe, Diagnostic> {
    let text =
        std::fs::read_to_string(path).map_err(|err| errors::cannot_open_file(path, err))?;
    parse_recipe(&text).map_err(|message| errors::recipe_invalid(&message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_stanza_round_trip() {
        let text = "\
# build file
target hello
  main.c2
  util.c2
  $export util
  $use math static
  $use curses clib
  $generate-c multi
  $generate-deps
  $warnings no-unused-import
  $output out
end

target mathlib
  $kind static-lib
  math.c2
  $generate-interface
end
";
        let recipe = parse_recipe(text).expect("recipe parses");
        assert_eq!(recipe.targets.len(), 2);

        let hello = recipe.find_target("hello").unwrap();
        assert_eq!(hello.kind, ComponentKind::Executable);
        assert_eq!(hello.files, vec![PathBuf::from("main.c2"), PathBuf::from("util.c2")]);
        assert_eq!(hello.exports, vec!["util"]);
        assert_eq!(
            hello.deps,
            vec![
                (String::from("math"), ComponentKind::StaticLib),
                (String::from("curses"), ComponentKind::CLib),
            ]
        );
        assert_eq!(hello.generate_c, Some(Mode::MultiFile));
        assert!(hello.generate_deps);
        assert_eq!(hello.silent_warnings, vec!["no-unused-import"]);
        assert_eq!(hello.output_dir, Some(PathBuf::from("out")));

        let lib = recipe.find_target("mathlib").unwrap();
        assert_eq!(lib.kind, ComponentKind::StaticLib);
        assert!(lib.generate_interface);
    }

    #[test]
    fn stray_lines_are_rejected() {
        assert!(parse_recipe("main.c2\n").is_err());
        assert!(parse_recipe("target a\n").is_err());
        assert!(parse_recipe("target a\n$kind bogus\nend\n").is_err());
        assert!(parse_recipe("end\n").is_err());
    }
}
