//! Wires a [`ScanConfig`] to concrete adapters and runs it.

use crate::adapters::{
    ArchiveAdapter, ChunkedHasher, CsvOutputAdapter, Destination, FileSystemAdapter, FolderArchive,
    JsonOutputAdapter, LineFilterAdapter, ProgressBarAdapter,
};
use crate::domain::{ReportFormat, ScanConfig, ScanReport, SourceMode, UnreadFile};
use crate::error::{ExitCode, ScanError};
use crate::ports::{OutputPort, PathSourcePort};
use crate::services::{DuplicateFinderService, ScanState};
use crate::signal::ShutdownHandler;
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum Outcome {
    /// The walk was saved for a later `--read-archive` run.
    Archived { path: PathBuf, files: usize },
    Scanned {
        report: ScanReport,
        saved_to: Option<PathBuf>,
        filter: bool,
    },
}

impl Outcome {
    /// What to tell the user on stderr once the run is over.
    pub fn message(&self) -> Option<String> {
        match self {
            Outcome::Archived { path, files } => Some(format!(
                "The paths of {} files have been saved to {}.",
                files,
                path.display()
            )),
            Outcome::Scanned { filter: true, .. } => None,
            Outcome::Scanned { report, saved_to, .. } => {
                let mut message = report.describe();
                if let Some(path) = saved_to {
                    message.push_str(&format!(
                        "\nThe list of duplicates has been saved to {}.",
                        path.display()
                    ));
                }
                Some(message)
            }
        }
    }
}

/// Map a failed run to its exit status.
pub fn exit_code(err: &anyhow::Error) -> ExitCode {
    err.downcast_ref::<ScanError>()
        .map_or(ExitCode::GeneralError, ScanError::exit_code)
}

/// Run one invocation. `stdin` is only read in filter mode; `stdout` only
/// receives the report when no output file is configured.
pub fn run<R, W>(
    config: &ScanConfig,
    shutdown: &ShutdownHandler,
    stdin: R,
    stdout: W,
) -> Result<Outcome>
where
    R: BufRead,
    W: Write,
{
    if let Some(archive_path) = &config.archive_out {
        return archive_folder(config, shutdown, archive_path);
    }

    let destination = match &config.output_file {
        Some(path) if !config.is_filter() => Destination::File(path.clone()),
        _ => Destination::Stream(stdout),
    };
    destination.check().map_err(ScanError::from)?;
    let saved_to = destination.file_path().map(Path::to_path_buf);

    let report = match config.format {
        ReportFormat::Csv => {
            scan_into(config, shutdown, stdin, &mut CsvOutputAdapter::new(destination))
        }
        ReportFormat::Json => {
            scan_into(config, shutdown, stdin, &mut JsonOutputAdapter::new(destination))
        }
    }?;

    if let Some(log_path) = &config.unread_log {
        if let Err(e) = append_unread_log(log_path, &report.unreadable) {
            log::error!("a log of the unread files couldn't be written: {:#}", e);
        }
    }

    Ok(Outcome::Scanned {
        report,
        saved_to,
        filter: config.is_filter(),
    })
}

fn scan_into<R, O>(
    config: &ScanConfig,
    shutdown: &ShutdownHandler,
    stdin: R,
    output: &mut O,
) -> Result<ScanReport, ScanError>
where
    R: BufRead,
    O: OutputPort,
{
    let hasher = ChunkedHasher::new().with_shutdown_flag(shutdown.get_flag());
    let progress = ProgressBarAdapter::new().with_quiet(!config.show_progress);
    let service = DuplicateFinderService::new(hasher, progress).with_shutdown(shutdown.clone());
    let mut state = ScanState::new();

    match &config.mode {
        SourceMode::Tree(root) => {
            let source = FileSystemAdapter::new(root.clone())
                .with_include_hidden(config.include_hidden);
            service.run(&mut state, source, output)
        }
        SourceMode::Filter => service.run(&mut state, LineFilterAdapter::new(stdin), output),
        SourceMode::Archive(path) => {
            service.run(&mut state, ArchiveAdapter::new(path.clone()), output)
        }
    }
}

fn archive_folder(
    config: &ScanConfig,
    shutdown: &ShutdownHandler,
    archive_path: &Path,
) -> Result<Outcome> {
    let SourceMode::Tree(root) = &config.mode else {
        anyhow::bail!("--archive-folder needs a starting folder to walk");
    };
    let archive = ArchiveAdapter::new(archive_path);
    archive.check_destination().map_err(ScanError::from)?;

    let mut sub_paths = Vec::new();
    let walk = FileSystemAdapter::new(root.clone())
        .with_include_hidden(config.include_hidden)
        .open()?;
    for item in walk {
        if shutdown.is_shutdown_requested() {
            return Err(ScanError::Interrupted.into());
        }
        match item {
            Ok(path) => sub_paths.push(path),
            Err(e) => log::warn!("{}", e),
        }
    }

    let starting_path = fs::canonicalize(root).unwrap_or_else(|_| root.clone());
    let files = sub_paths.len();
    archive
        .save_archive(&FolderArchive::new(starting_path, sub_paths))
        .map_err(ScanError::from)?;

    Ok(Outcome::Archived {
        path: archive_path.to_path_buf(),
        files,
    })
}

fn append_unread_log(path: &Path, unreadable: &[UnreadFile]) -> Result<()> {
    if unreadable.is_empty() {
        return Ok(());
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    for unread in unreadable {
        writeln!(
            file,
            "'{}' raised '{}' and was not read.",
            unread.path.display(),
            unread.reason
        )?;
    }
    Ok(())
}
