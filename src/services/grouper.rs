use crate::domain::{Digest, DuplicateSet, FileEntry};
use std::collections::HashMap;

/// Digest to paths, remembering the order in which digests first appeared.
#[derive(Debug, Default)]
pub struct DuplicateGrouper {
    index: HashMap<Digest, usize>,
    groups: Vec<DuplicateSet>,
}

impl DuplicateGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: FileEntry) {
        match self.index.get(&entry.digest) {
            Some(&slot) => {
                // A path listed twice on stdin is still one file.
                let members = &mut self.groups[slot].members;
                if !members.contains(&entry.path) {
                    members.push(entry.path);
                }
            }
            None => {
                self.index.insert(entry.digest, self.groups.len());
                self.groups.push(DuplicateSet::new(entry.digest, entry.path));
            }
        }
    }

    pub fn distinct_digests(&self) -> usize {
        self.groups.len()
    }

    /// Sets with two or more members, first-seen digest first.
    pub fn into_duplicates(self) -> Vec<DuplicateSet> {
        self.groups
            .into_iter()
            .filter(DuplicateSet::is_duplicate)
            .collect()
    }
}
