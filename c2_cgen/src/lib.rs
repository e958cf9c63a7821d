mod buffer;
mod generator;
mod mangle;

pub use buffer::{CodeBuf, INDENT};
pub use generator::{CGenerator, HeaderNamer, Mode};
pub use mangle::Mangle;
