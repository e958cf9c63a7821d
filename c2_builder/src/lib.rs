mod builder;
mod deps;
mod errors;
mod interface;
mod library;
mod options;
mod recipe;
mod refs;

pub use builder::{Builder, Report, SourceParser};
pub use c2_cgen::Mode;
pub use library::{LibInfo, LibraryLoader};
pub use options::BuildOptions;
pub use recipe::{load_recipe, parse_recipe, Recipe, Target};
