use crate::error::{ScanError, SourceError};
use crate::ports::{PathSourcePort, PathStream};
use ignore::{Walk, WalkBuilder};
use std::fs;
use std::path::{Path, PathBuf};

/// Recursively enumerates the regular files below a root folder.
pub struct FileSystemAdapter {
    root: PathBuf,
    include_hidden: bool,
}

impl FileSystemAdapter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include_hidden: false,
        }
    }

    pub fn with_include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    fn validate_root(&self) -> Result<PathBuf, ScanError> {
        let invalid = |reason| ScanError::InvalidRoot {
            path: self.root.clone(),
            reason,
        };

        let metadata = match fs::metadata(&self.root) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(invalid("no such folder exists"));
            }
            Err(_) => return Err(invalid("the starting folder can't be accessed")),
        };
        if !metadata.is_dir() {
            return Err(invalid("the starting path must be a folder"));
        }

        let root = fs::canonicalize(&self.root)
            .map_err(|_| invalid("the starting folder can't be accessed"))?;
        fs::read_dir(&root).map_err(|_| invalid("the starting folder can't be read"))?;
        Ok(root)
    }
}

impl PathSourcePort for FileSystemAdapter {
    type Paths = TreeWalk;

    fn open(self) -> Result<TreeWalk, ScanError> {
        let root = self.validate_root()?;
        log::debug!("walking {}", root.display());

        let mut builder = WalkBuilder::new(&root);
        builder.standard_filters(false);
        builder.hidden(!self.include_hidden);
        builder.follow_links(false);
        builder.sort_by_file_name(|a, b| a.cmp(b));

        Ok(TreeWalk {
            walker: builder.build(),
            root,
        })
    }
}

/// Depth-first walk, sorted by file name within each folder.
pub struct TreeWalk {
    walker: Walk,
    root: PathBuf,
}

impl PathStream for TreeWalk {
    fn root(&self) -> Option<&Path> {
        Some(self.root.as_path())
    }
}

impl Iterator for TreeWalk {
    type Item = Result<PathBuf, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(SourceError::Walk(e))),
            };
            let Some(file_type) = entry.file_type() else {
                continue;
            };

            if file_type.is_file() {
                return Some(Ok(entry.into_path()));
            }

            // Links to folders are never descended into. Links to files, and
            // dangling links, are handed on so the hasher can decide.
            if file_type.is_symlink() {
                match fs::metadata(entry.path()) {
                    Ok(target) if target.is_dir() => continue,
                    _ => return Some(Ok(entry.into_path())),
                }
            }
        }
    }
}
