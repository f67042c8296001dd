use crate::domain::{FileEntry, ScanReport, ScanStage, UnreadFile};
use crate::error::{HashError, ScanError, SourceError};
use crate::ports::{HashingPort, OutputPort, PathSourcePort, PathStream, ProgressPort};
use crate::services::{DuplicateGrouper, ProgressTracker};
use crate::signal::ShutdownHandler;
use std::mem;
use std::path::Path;

/// Everything one run owns. Lives for a single invocation and is never
/// shared, so it needs no locking.
#[derive(Debug)]
pub struct ScanState {
    stage: ScanStage,
    grouper: DuplicateGrouper,
    tracker: ProgressTracker,
    unreadable: Vec<UnreadFile>,
}

impl ScanState {
    pub fn new() -> Self {
        Self::with_tracker(ProgressTracker::new())
    }

    pub fn with_tracker(tracker: ProgressTracker) -> Self {
        Self {
            stage: ScanStage::Idle,
            grouper: DuplicateGrouper::new(),
            tracker,
            unreadable: Vec::new(),
        }
    }

    pub fn stage(&self) -> ScanStage {
        self.stage
    }

    pub fn files_processed(&self) -> u64 {
        self.tracker.processed()
    }

    fn advance(&mut self, next: ScanStage) {
        debug_assert_eq!(self.stage.successor(), Some(next), "scan stages run in order");
        log::debug!("scan stage {:?} -> {:?}", self.stage, next);
        self.stage = next;
    }

    fn settle<T>(&mut self, result: Result<T, ScanError>) -> Result<T, ScanError> {
        if let Err(e) = &result {
            log::debug!("scan failed during {:?}: {}", self.stage, e);
            self.stage = ScanStage::Failed;
            self.grouper = DuplicateGrouper::new();
            self.unreadable.clear();
        }
        result
    }
}

impl Default for ScanState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct DuplicateFinderService<H, P> {
    hasher: H,
    progress: P,
    shutdown: ShutdownHandler,
}

impl<H, P> DuplicateFinderService<H, P>
where
    H: HashingPort,
    P: ProgressPort,
{
    pub fn new(hasher: H, progress: P) -> Self {
        Self {
            hasher,
            progress,
            shutdown: ShutdownHandler::new(),
        }
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownHandler) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Idle through Done: find the duplicates, then hand them to `output`.
    pub fn run<S, O>(
        &self,
        state: &mut ScanState,
        source: S,
        output: &mut O,
    ) -> Result<ScanReport, ScanError>
    where
        S: PathSourcePort,
        O: OutputPort + ?Sized,
    {
        let report = self.find_duplicates(state, source)?;
        self.report(state, report, output)
    }

    /// Idle through Grouping. The state is left ready for [`Self::report`].
    pub fn find_duplicates<S>(
        &self,
        state: &mut ScanState,
        source: S,
    ) -> Result<ScanReport, ScanError>
    where
        S: PathSourcePort,
    {
        let result = self.scan(state, source);
        state.settle(result)
    }

    pub fn report<O>(
        &self,
        state: &mut ScanState,
        report: ScanReport,
        output: &mut O,
    ) -> Result<ScanReport, ScanError>
    where
        O: OutputPort + ?Sized,
    {
        let result = self.write(state, &report, output);
        state.settle(result).map(|()| report)
    }

    fn scan<S>(&self, state: &mut ScanState, source: S) -> Result<ScanReport, ScanError>
    where
        S: PathSourcePort,
    {
        state.advance(ScanStage::Collecting);
        let paths = source.open()?;
        let total = match paths.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(lower as u64),
            _ => None,
        };

        state.advance(ScanStage::Hashing);
        self.progress.start(total);
        let hashed = self.hash_all(state, paths);
        state.tracker.finish(&self.progress);
        hashed?;

        state.advance(ScanStage::Grouping);
        let grouper = mem::take(&mut state.grouper);
        log::debug!("{} distinct checksums", grouper.distinct_digests());
        let duplicates = grouper.into_duplicates();
        log::info!(
            "{} files checked, {} duplicate sets, {} unreadable",
            state.tracker.processed(),
            duplicates.len(),
            state.unreadable.len()
        );

        Ok(ScanReport::new(
            duplicates,
            state.tracker.processed(),
            mem::take(&mut state.unreadable),
        ))
    }

    fn hash_all<I>(&self, state: &mut ScanState, mut paths: I) -> Result<(), ScanError>
    where
        I: PathStream,
    {
        while let Some(item) = paths.next() {
            if self.shutdown.is_shutdown_requested() {
                return Err(ScanError::Interrupted);
            }

            let path = match item {
                Ok(path) => path,
                Err(e) if e.is_fatal() => return Err(ScanError::Source(e)),
                Err(e) => {
                    self.warn(&e.to_string());
                    state.unreadable.extend(e.unread_folder());
                    continue;
                }
            };

            state.tracker.record(&self.progress);
            match self.hasher.hash_file(&path) {
                Ok(digest) => state.grouper.insert(FileEntry::new(path, digest)),
                Err(HashError::Interrupted) => return Err(ScanError::Interrupted),
                Err(e) => {
                    if matches!(e, HashError::NotFound(_)) {
                        check_root(paths.root())?;
                    }
                    self.warn(&format!("'{}' raised '{}' and was not read", path.display(), e));
                    state.unreadable.push(UnreadFile {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if self.shutdown.is_shutdown_requested() {
            return Err(ScanError::Interrupted);
        }
        Ok(())
    }

    fn warn(&self, message: &str) {
        self.progress.suspend(&mut || log::warn!("{}", message));
    }

    fn write<O>(
        &self,
        state: &mut ScanState,
        report: &ScanReport,
        output: &mut O,
    ) -> Result<(), ScanError>
    where
        O: OutputPort + ?Sized,
    {
        state.advance(ScanStage::Reporting);
        output.write_results(report)?;
        state.advance(ScanStage::Done);
        Ok(())
    }
}

/// A missing file under a root that has itself gone means the drive or share
/// was disconnected, and every remaining path would fail the same way.
fn check_root(root: Option<&Path>) -> Result<(), ScanError> {
    match root {
        Some(root) if !root.exists() => {
            let last_found = root.ancestors().skip(1).find(|p| p.exists());
            if let Some(last_found) = last_found {
                log::error!("nothing beyond {} could be found", last_found.display());
            }
            Err(ScanError::Disconnected {
                root: root.to_path_buf(),
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{ChunkedHasher, FileSystemAdapter, LineFilterAdapter, ProgressBarAdapter};
    use crate::domain::Digest;
    use crate::error::OutputError;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::cell::Cell;
    use std::fs;
    use std::io::{self, Cursor};
    use std::path::PathBuf;

    /// Hashes the path name instead of reading anything.
    struct FakeHasher {
        digests: HashMap<PathBuf, u64>,
    }

    impl FakeHasher {
        fn new(entries: &[(&str, u64)]) -> Self {
            Self {
                digests: entries.iter().map(|(p, d)| (PathBuf::from(p), *d)).collect(),
            }
        }
    }

    impl HashingPort for FakeHasher {
        fn hash_file(&self, path: &Path) -> Result<Digest, HashError> {
            self.digests
                .get(path)
                .map(|d| Digest::from_u64(*d))
                .ok_or_else(|| HashError::NotFound(path.to_path_buf()))
        }
    }

    #[derive(Default)]
    struct CountingProgress {
        finished: RefCell<Option<u64>>,
        suspended: Cell<usize>,
    }

    impl ProgressPort for CountingProgress {
        fn start(&self, _total: Option<u64>) {}
        fn update(&self, _processed: u64) {}
        fn finish(&self, processed: u64) {
            *self.finished.borrow_mut() = Some(processed);
        }
        fn suspend(&self, f: &mut dyn FnMut()) {
            self.suspended.set(self.suspended.get() + 1);
            f();
        }
    }

    #[derive(Default)]
    struct RecordingOutput {
        written: Vec<usize>,
        fail: bool,
    }

    impl OutputPort for RecordingOutput {
        fn write_results(&mut self, results: &ScanReport) -> Result<(), OutputError> {
            if self.fail {
                return Err(OutputError::Io(io::Error::other("disk full")));
            }
            self.written.push(results.duplicate_groups());
            Ok(())
        }
    }

    impl PathStream for std::vec::IntoIter<Result<PathBuf, SourceError>> {}

    /// Replays a fixed list of items, as a source that broke partway would.
    struct ScriptedSource(Vec<Result<PathBuf, SourceError>>);

    impl PathSourcePort for ScriptedSource {
        type Paths = std::vec::IntoIter<Result<PathBuf, SourceError>>;

        fn open(self) -> Result<Self::Paths, ScanError> {
            Ok(self.0.into_iter())
        }
    }

    /// Hashes for real, but pulls the whole folder away on the first file.
    struct UnpluggingHasher {
        folder: PathBuf,
        inner: ChunkedHasher,
    }

    impl HashingPort for UnpluggingHasher {
        fn hash_file(&self, path: &Path) -> Result<Digest, HashError> {
            let _ = fs::remove_dir_all(&self.folder);
            self.inner.hash_file(path)
        }
    }

    fn lines(input: &str) -> LineFilterAdapter<Cursor<String>> {
        LineFilterAdapter::new(Cursor::new(input.to_string()))
    }

    #[test]
    fn run_groups_and_reports() {
        let hasher = FakeHasher::new(&[("/x/a", 1), ("/x/b", 1), ("/x/c", 2)]);
        let service = DuplicateFinderService::new(hasher, ProgressBarAdapter::new_quiet());
        let mut state = ScanState::new();
        let mut output = RecordingOutput::default();

        let report = service
            .run(&mut state, lines("/x/a\n/x/b\n/x/c\n"), &mut output)
            .unwrap();

        assert_eq!(state.stage(), ScanStage::Done);
        assert_eq!(output.written, vec![1]);
        assert_eq!(
            report.duplicates[0].members,
            vec![PathBuf::from("/x/a"), PathBuf::from("/x/b")]
        );
        assert_eq!(report.files_processed, 3);
    }

    #[test]
    fn unreadable_files_are_counted_and_skipped() {
        let hasher = FakeHasher::new(&[("/x/a", 1), ("/x/b", 1)]);
        let progress = CountingProgress::default();
        let service = DuplicateFinderService::new(hasher, progress);
        let mut state = ScanState::new();

        let report = service
            .find_duplicates(&mut state, lines("/x/a\n/x/missing\n/x/b\n"))
            .unwrap();

        assert_eq!(state.stage(), ScanStage::Grouping);
        assert_eq!(report.duplicates.len(), 1);
        assert_eq!(report.unreadable.len(), 1);
        assert_eq!(report.unreadable[0].path, PathBuf::from("/x/missing"));
        assert_eq!(report.files_processed, 3);
        assert_eq!(*service.progress.finished.borrow(), Some(3));
        assert_eq!(service.progress.suspended.get(), 1);
    }

    #[test]
    fn skipped_folders_are_listed_as_unreadable() {
        let hasher = FakeHasher::new(&[("/x/a", 1)]);
        let service = DuplicateFinderService::new(hasher, CountingProgress::default());
        let mut state = ScanState::new();
        let locked = ignore::Error::WithPath {
            path: PathBuf::from("/x/locked"),
            err: Box::new(ignore::Error::Io(io::Error::from(io::ErrorKind::PermissionDenied))),
        };
        let source = ScriptedSource(vec![
            Err(SourceError::Walk(locked)),
            Ok(PathBuf::from("/x/a")),
        ]);

        let report = service.find_duplicates(&mut state, source).unwrap();

        assert_eq!(report.files_processed, 1);
        assert_eq!(report.unreadable.len(), 1);
        assert_eq!(report.unreadable[0].path, PathBuf::from("/x/locked"));
        assert!(report.describe().contains("1 or more files couldn't be read"));
    }

    #[test]
    fn losing_the_root_mid_walk_fails_the_run() {
        let parent = tempfile::TempDir::new().unwrap();
        let folder = parent.path().join("share");
        fs::create_dir(&folder).unwrap();
        for name in ["a", "b", "c"] {
            fs::write(folder.join(name), b"same").unwrap();
        }
        let hasher = UnpluggingHasher {
            folder: folder.clone(),
            inner: ChunkedHasher::new(),
        };
        let service = DuplicateFinderService::new(hasher, ProgressBarAdapter::new_quiet());
        let mut state = ScanState::new();

        let err = service
            .find_duplicates(&mut state, FileSystemAdapter::new(&folder))
            .unwrap_err();

        assert!(matches!(err, ScanError::Disconnected { .. }));
        assert_eq!(err.exit_code(), crate::error::ExitCode::GeneralError);
        assert_eq!(state.stage(), ScanStage::Failed);
    }

    #[test]
    fn missing_files_under_a_present_root_are_not_fatal() {
        let folder = tempfile::TempDir::new().unwrap();
        let gone = folder.path().join("gone");
        let source = ScriptedSource(vec![Ok(gone.clone())]);
        let service =
            DuplicateFinderService::new(ChunkedHasher::new(), CountingProgress::default());
        let mut state = ScanState::new();

        let report = service.find_duplicates(&mut state, source).unwrap();

        assert_eq!(report.unreadable[0].path, gone);
        assert!(check_root(Some(folder.path())).is_ok());
        assert!(check_root(Some(&folder.path().join("absent"))).is_err());
    }

    #[test]
    fn interruption_fails_the_run_without_reporting() {
        let hasher = FakeHasher::new(&[("/x/a", 1), ("/x/b", 1)]);
        let shutdown = ShutdownHandler::new();
        shutdown.request_shutdown();
        let service = DuplicateFinderService::new(hasher, ProgressBarAdapter::new_quiet())
            .with_shutdown(shutdown);
        let mut state = ScanState::new();
        let mut output = RecordingOutput::default();

        let err = service
            .run(&mut state, lines("/x/a\n/x/b\n"), &mut output)
            .unwrap_err();

        assert!(matches!(err, ScanError::Interrupted));
        assert_eq!(state.stage(), ScanStage::Failed);
        assert!(output.written.is_empty());
    }

    #[test]
    fn fatal_source_error_fails_the_run() {
        let service =
            DuplicateFinderService::new(FakeHasher::new(&[]), ProgressBarAdapter::new_quiet());
        let mut state = ScanState::new();

        let source = ScriptedSource(vec![
            Ok(PathBuf::from("/x/1")),
            Err(SourceError::Input(io::Error::other("pipe closed"))),
        ]);

        let err = service.find_duplicates(&mut state, source).unwrap_err();

        assert!(matches!(err, ScanError::Source(SourceError::Input(_))));
        assert_eq!(state.stage(), ScanStage::Failed);
    }

    #[test]
    fn write_failure_fails_the_run() {
        let service =
            DuplicateFinderService::new(FakeHasher::new(&[]), ProgressBarAdapter::new_quiet());
        let mut state = ScanState::new();
        let mut output = RecordingOutput {
            fail: true,
            ..Default::default()
        };

        let err = service.run(&mut state, lines(""), &mut output).unwrap_err();

        assert!(matches!(err, ScanError::Output(_)));
        assert_eq!(state.stage(), ScanStage::Failed);
    }

    #[test]
    fn real_hasher_interrupts_on_raised_flag() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("a.bin");
        std::fs::write(&file, b"data").unwrap();
        let shutdown = ShutdownHandler::new();
        let hasher = ChunkedHasher::new().with_shutdown_flag(shutdown.get_flag());
        let service = DuplicateFinderService::new(hasher, ProgressBarAdapter::new_quiet());
        let mut state = ScanState::new();

        shutdown.request_shutdown();
        let input = format!("{}\n", file.display());
        let err = service.find_duplicates(&mut state, lines(&input)).unwrap_err();
        assert!(matches!(err, ScanError::Interrupted));
    }
}
