use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

/// Fixed-length checksum of a file's full content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; 8]);

impl Digest {
    pub fn from_u64(value: u64) -> Self {
        Self(value.to_be_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub digest: Digest,
}

impl FileEntry {
    pub fn new(path: PathBuf, digest: Digest) -> Self {
        Self { path, digest }
    }
}

/// Paths sharing one digest, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateSet {
    #[serde(rename = "checksum")]
    pub digest: Digest,
    #[serde(rename = "paths", serialize_with = "lossy_paths")]
    pub members: Vec<PathBuf>,
}

/// Reports are text, so names that aren't valid UTF-8 are written with
/// replacement characters, as the CSV report does.
fn lossy_paths<S: Serializer>(paths: &[PathBuf], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(paths.iter().map(|p| p.to_string_lossy()))
}

impl DuplicateSet {
    pub fn new(digest: Digest, first: PathBuf) -> Self {
        Self {
            digest,
            members: vec![first],
        }
    }

    pub fn is_duplicate(&self) -> bool {
        self.members.len() >= 2
    }

    pub fn duplicate_count(&self) -> usize {
        self.members.len().saturating_sub(1)
    }
}

/// A candidate that could not be hashed, kept for the warning log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStage {
    Idle,
    Collecting,
    Hashing,
    Grouping,
    Reporting,
    Done,
    Failed,
}

impl ScanStage {
    /// The only stage a run may move to next, ignoring failure.
    pub fn successor(self) -> Option<ScanStage> {
        match self {
            ScanStage::Idle => Some(ScanStage::Collecting),
            ScanStage::Collecting => Some(ScanStage::Hashing),
            ScanStage::Hashing => Some(ScanStage::Grouping),
            ScanStage::Grouping => Some(ScanStage::Reporting),
            ScanStage::Reporting => Some(ScanStage::Done),
            ScanStage::Done | ScanStage::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ScanStage::Done | ScanStage::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Csv,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMode {
    /// Walk a directory tree.
    Tree(PathBuf),
    /// Read newline-delimited paths from stdin.
    Filter,
    /// Replay the paths recorded in a folder archive.
    Archive(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub mode: SourceMode,
    pub include_hidden: bool,
    pub show_progress: bool,
    pub format: ReportFormat,
    pub output_file: Option<PathBuf>,
    pub unread_log: Option<PathBuf>,
    /// When set, the walk is saved here and no hashing takes place.
    pub archive_out: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::Tree(PathBuf::from(".")),
            include_hidden: false,
            show_progress: false,
            format: ReportFormat::Csv,
            output_file: None,
            unread_log: None,
            archive_out: None,
        }
    }
}

impl ScanConfig {
    pub fn new(mode: SourceMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output_file(mut self, path: PathBuf) -> Self {
        self.output_file = Some(path);
        self
    }

    pub fn with_unread_log(mut self, path: PathBuf) -> Self {
        self.unread_log = Some(path);
        self
    }

    pub fn with_archive_out(mut self, path: PathBuf) -> Self {
        self.archive_out = Some(path);
        self
    }

    pub fn is_filter(&self) -> bool {
        self.mode == SourceMode::Filter
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub duplicates: Vec<DuplicateSet>,
    pub files_processed: u64,
    pub unreadable: Vec<UnreadFile>,
}

impl ScanReport {
    pub fn new(
        duplicates: Vec<DuplicateSet>,
        files_processed: u64,
        unreadable: Vec<UnreadFile>,
    ) -> Self {
        Self {
            duplicates,
            files_processed,
            unreadable,
        }
    }

    pub fn duplicate_groups(&self) -> usize {
        self.duplicates.len()
    }

    pub fn total_duplicate_files(&self) -> usize {
        self.duplicates.iter().map(|d| d.duplicate_count()).sum()
    }

    /// One-line, human-readable outcome for stderr.
    pub fn describe(&self) -> String {
        let total = self.total_duplicate_files();
        let errors = self.unreadable.len();
        let found = if total == 1 {
            "1 duplicate was".to_string()
        } else {
            format!("{} duplicates were", total)
        };

        match (total, errors) {
            (0, 0) => "No duplicates were found.".to_string(),
            (0, errors) => format!(
                "No duplicates were found, however {} or more files couldn't be read.",
                errors
            ),
            (_, 0) => format!("{} found.", found),
            (_, errors) => format!(
                "{} found, however {} or more files couldn't be read.",
                found, errors
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_renders_as_fixed_width_hex() {
        assert_eq!(Digest::from_u64(0xff).to_hex(), "00000000000000ff");
        assert_eq!(Digest::from_u64(0xff).as_bytes()[7], 0xff);
    }

    #[test]
    fn stages_advance_linearly_to_done() {
        let mut stage = ScanStage::Idle;
        let mut visited = vec![stage];
        while let Some(next) = stage.successor() {
            stage = next;
            visited.push(stage);
        }
        assert_eq!(
            visited,
            vec![
                ScanStage::Idle,
                ScanStage::Collecting,
                ScanStage::Hashing,
                ScanStage::Grouping,
                ScanStage::Reporting,
                ScanStage::Done,
            ]
        );
        assert!(ScanStage::Failed.is_terminal());
        assert_eq!(ScanStage::Failed.successor(), None);
    }

    #[test]
    fn describe_counts_extra_copies_and_read_errors() {
        let mut set = DuplicateSet::new(Digest::from_u64(1), PathBuf::from("/a"));
        set.members.push(PathBuf::from("/b"));
        set.members.push(PathBuf::from("/c"));
        let report = ScanReport::new(vec![set], 3, vec![]);
        assert_eq!(report.describe(), "2 duplicates were found.");

        let unread = UnreadFile {
            path: PathBuf::from("/d"),
            reason: "permission denied".into(),
        };
        let report = ScanReport::new(vec![], 1, vec![unread]);
        assert_eq!(
            report.describe(),
            "No duplicates were found, however 1 or more files couldn't be read."
        );
        assert_eq!(ScanReport::default().describe(), "No duplicates were found.");
    }

    #[cfg(unix)]
    #[test]
    fn sets_serialize_names_that_are_not_utf8() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let odd = PathBuf::from(OsStr::from_bytes(b"/data/caf\xe9"));
        let mut set = DuplicateSet::new(Digest::from_u64(2), PathBuf::from("/data/cafe"));
        set.members.push(odd);

        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["checksum"], "0000000000000002");
        assert_eq!(json["paths"][1], "/data/caf\u{fffd}");
    }
}
