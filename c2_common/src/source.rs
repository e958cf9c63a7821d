use std::fmt::Display;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

/// Offset into the global source space. All files opened through one
/// [`SourceManager`] share a single offset range, so a `Pos` alone is enough
/// to recover file, line and column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pos(usize);

impl From<usize> for Pos {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

impl Pos {
    pub fn with_offset(&self, offset: usize) -> Self {
        Self(self.0 + offset)
    }
}

impl std::cmp::Ord for Pos {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl std::cmp::PartialOrd for Pos {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.0.cmp(&other.0))
    }
}

pub struct Location<'a> {
    path: &'a Path,
    line: usize,
    col: usize,
}

impl<'a> Location<'a> {
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn col(&self) -> usize {
        self.col
    }
}

impl<'a> Display for Location<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = std::env::current_dir()
            .ok()
            .and_then(|cwd| self.path.strip_prefix(&cwd).ok())
            .unwrap_or(self.path)
            .to_string_lossy();

        write!(f, "{path}:{}:{}", self.line, self.col)
    }
}

pub struct SourceFile {
    pub offset: Pos,
    pub text: String,
}

#[derive(Default)]
pub struct SourceManager {
    file_offset: Vec<usize>,
    file_path: Vec<PathBuf>,
    lines: Vec<Vec<usize>>,
    last_offset: usize,
}

impl SourceManager {
    pub fn open(&mut self, path: PathBuf) -> Result<SourceFile, std::io::Error> {
        let text = read_to_string(&path)?;
        Ok(self.add_file(path, text))
    }

    pub fn add_file(&mut self, path: PathBuf, source: String) -> SourceFile {
        let file_offset = self.last_offset;

        let mut lines = Vec::default();
        for (i, c) in source.char_indices() {
            if c == '\n' {
                lines.push(i);
            }
            self.last_offset += 1;
        }
        // a trailing slot so positions one past the file end stay valid
        self.last_offset += 1;

        self.file_offset.push(file_offset);
        self.file_path.push(path);
        self.lines.push(lines);

        SourceFile {
            offset: Pos(file_offset),
            text: source,
        }
    }

    pub fn location(&self, pos: Pos) -> Location {
        let i = self.file_offset.partition_point(|x| *x <= pos.0) - 1;

        let file_offset = self.file_offset[i];
        let path: &Path = &self.file_path[i];
        let lines = &self.lines[i];

        let offset = pos.0 - file_offset;
        let line = lines.partition_point(|x| *x < offset) + 1;

        let col = if line == 1 {
            offset + 1
        } else {
            offset - lines[line - 2]
        };

        Location { path, line, col }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locations_across_files() {
        let mut sm = SourceManager::default();
        let file1 = sm.add_file(PathBuf::from("first"), String::from("aa\nbb\n"));
        let file2 = sm.add_file(PathBuf::from("second"), String::from("x\nyz"));

        let expect1 = [(1, 1), (1, 2), (1, 3), (2, 1), (2, 2), (2, 3)];
        for (off, (line, col)) in expect1.into_iter().enumerate() {
            let loc = sm.location(file1.offset.with_offset(off));
            assert_eq!((loc.line(), loc.col()), (line, col));
        }

        let expect2 = [(1, 1), (1, 2), (2, 1), (2, 2)];
        for (off, (line, col)) in expect2.into_iter().enumerate() {
            let loc = sm.location(file2.offset.with_offset(off));
            assert_eq!((loc.line(), loc.col()), (line, col));
        }

        // earlier files stay addressable after later ones are added
        let loc = sm.location(file1.offset.with_offset(4));
        assert_eq!((loc.line(), loc.col()), (2, 2));
    }
}
