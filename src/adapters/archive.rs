use crate::adapters::raw_path::{path_from_bytes, path_to_bytes};
use crate::error::{ArchiveError, ScanError, SourceError};
use crate::ports::{PathSourcePort, PathStream};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use std::vec;

const DAY: u64 = 24 * 60 * 60;

/// A snapshot of the files found under a starting folder, saved so a slow
/// walk does not need to be repeated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderArchive {
    #[serde(serialize_with = "stored::path", deserialize_with = "stored::to_path")]
    pub starting_path: PathBuf,
    pub creation_time: SystemTime,
    #[serde(serialize_with = "stored::paths", deserialize_with = "stored::to_paths")]
    pub sub_paths: Vec<PathBuf>,
}

impl FolderArchive {
    pub fn new(starting_path: PathBuf, sub_paths: Vec<PathBuf>) -> Self {
        Self {
            starting_path,
            creation_time: SystemTime::now(),
            sub_paths,
        }
    }

    /// A warning for archives old enough that the folder has likely changed.
    pub fn staleness(&self) -> Option<String> {
        let age = SystemTime::now().duration_since(self.creation_time).ok()?;
        let over = |days: u64| age > Duration::from_secs(days * DAY);

        let description = if over(52 * 7) {
            "a year"
        } else if over(183) {
            "half a year"
        } else if over(31) {
            "a month"
        } else if over(7) {
            "a week"
        } else {
            return None;
        };
        Some(format!("This archive was made over {} ago.", description))
    }
}

/// Archived paths are stored as text when they can be, and as raw bytes when
/// they can't, so every file name comes back exactly as it was walked.
mod stored {
    use super::*;

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum StoredPath {
        Text(String),
        Bytes(Vec<u8>),
    }

    impl From<&Path> for StoredPath {
        fn from(path: &Path) -> Self {
            match path.to_str() {
                Some(text) => StoredPath::Text(text.to_string()),
                None => StoredPath::Bytes(path_to_bytes(path)),
            }
        }
    }

    impl From<StoredPath> for PathBuf {
        fn from(stored: StoredPath) -> Self {
            match stored {
                StoredPath::Text(text) => PathBuf::from(text),
                StoredPath::Bytes(bytes) => path_from_bytes(&bytes),
            }
        }
    }

    pub fn path<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
        StoredPath::from(path).serialize(serializer)
    }

    pub fn paths<S: Serializer>(paths: &[PathBuf], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(paths.iter().map(|p| StoredPath::from(p.as_path())))
    }

    pub fn to_path<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PathBuf, D::Error> {
        StoredPath::deserialize(deserializer).map(PathBuf::from)
    }

    pub fn to_paths<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<PathBuf>, D::Error> {
        let stored = Vec::<StoredPath>::deserialize(deserializer)?;
        Ok(stored.into_iter().map(PathBuf::from).collect())
    }
}

pub struct ArchiveAdapter {
    archive_path: PathBuf,
}

impl ArchiveAdapter {
    pub fn new(archive_path: impl Into<PathBuf>) -> Self {
        Self {
            archive_path: archive_path.into(),
        }
    }

    pub fn load_archive(&self) -> Result<FolderArchive, ArchiveError> {
        let path = &self.archive_path;
        if !path.exists() {
            return Err(ArchiveError::Missing(path.clone()));
        }

        let contents = fs::read(path).map_err(|source| ArchiveError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_slice(&contents).map_err(|source| ArchiveError::Malformed {
            path: path.clone(),
            source,
        })
    }

    /// Catch an archive that would replace an existing file before walking.
    pub fn check_destination(&self) -> Result<(), ArchiveError> {
        if self.archive_path.exists() {
            return Err(ArchiveError::Exists(self.archive_path.clone()));
        }
        Ok(())
    }

    pub fn save_archive(&self, archive: &FolderArchive) -> Result<(), ArchiveError> {
        let io_err = |source| ArchiveError::Io {
            path: self.archive_path.clone(),
            source,
        };

        self.check_destination()?;
        if let Some(parent) = self.archive_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let contents = serde_json::to_vec_pretty(archive).map_err(|source| ArchiveError::Encode {
            path: self.archive_path.clone(),
            source,
        })?;
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.archive_path)
            .map_err(|source| match source.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    ArchiveError::Exists(self.archive_path.clone())
                }
                _ => io_err(source),
            })?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&contents).map_err(io_err)?;
        writer.flush().map_err(io_err)?;
        Ok(())
    }
}

impl PathSourcePort for ArchiveAdapter {
    type Paths = ArchivedPaths;

    fn open(self) -> Result<ArchivedPaths, ScanError> {
        let archive = self.load_archive()?;
        log::info!("using an archive of {}", archive.starting_path.display());
        if let Some(notice) = archive.staleness() {
            log::warn!("{}", notice);
        }
        Ok(ArchivedPaths {
            root: archive.starting_path,
            paths: archive.sub_paths.into_iter(),
        })
    }
}

/// The paths of an archive, replayed in the order they were walked.
pub struct ArchivedPaths {
    root: PathBuf,
    paths: vec::IntoIter<PathBuf>,
}

impl Iterator for ArchivedPaths {
    type Item = Result<PathBuf, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.paths.next().map(Ok)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.paths.size_hint()
    }
}

impl PathStream for ArchivedPaths {
    fn root(&self) -> Option<&Path> {
        Some(self.root.as_path())
    }
}
