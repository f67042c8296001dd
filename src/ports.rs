use crate::domain::{Digest, ScanReport};
use crate::error::{HashError, OutputError, ScanError, SourceError};
use std::path::{Path, PathBuf};

/// Produces the candidate paths for one run.
///
/// `open` consumes the source: the returned iterator is lazy, finite and
/// single-pass. Failing to open (bad root, unreadable archive) is fatal.
pub trait PathSourcePort {
    type Paths: PathStream;

    fn open(self) -> Result<Self::Paths, ScanError>;
}

pub trait PathStream: Iterator<Item = Result<PathBuf, SourceError>> {
    /// The folder every path lies under, if the source has one. Losing it
    /// mid-run means the remaining paths can't be reached either.
    fn root(&self) -> Option<&Path> {
        None
    }
}

pub trait HashingPort {
    fn hash_file(&self, path: &Path) -> Result<Digest, HashError>;
}

pub trait OutputPort {
    fn write_results(&mut self, results: &ScanReport) -> Result<(), OutputError>;
}

pub trait ProgressPort {
    fn start(&self, total: Option<u64>);
    fn update(&self, processed: u64);
    fn finish(&self, processed: u64);

    /// Run `f` with the display cleared, so log lines don't land inside it.
    fn suspend(&self, f: &mut dyn FnMut()) {
        f()
    }
}
