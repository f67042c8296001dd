use crate::domain::{ReportFormat, ScanConfig, SourceMode};
use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    #[value(help = "One row per duplicate file, with a header row")]
    Csv,
    #[value(help = "An array of checksums with their paths")]
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Csv => ReportFormat::Csv,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

#[derive(Parser)]
#[command(name = "listdupes")]
#[command(about = "Check a folder and its subfolders for duplicate files")]
#[command(
    after_help = "Files are compared by checksum, so two different files may very rarely be reported as duplicates."
)]
#[command(version)]
pub struct Cli {
    #[arg(help = "Folder to search, or '-' to read file paths from stdin")]
    pub starting_folder: Option<PathBuf>,

    #[arg(
        short = 'f',
        long = "filter",
        help = "Read file paths from stdin and write the report to stdout"
    )]
    pub filter: bool,

    #[arg(
        short = 'o',
        long = "output",
        help = "Report file to create (stdout if not specified)",
        conflicts_with = "filter"
    )]
    pub output_file: Option<PathBuf>,

    #[arg(
        long = "format",
        help = "Report format",
        value_enum,
        default_value = "csv"
    )]
    pub output_format: OutputFormat,

    #[arg(
        short = 'p',
        long = "progress",
        help = "Show a progress counter on stderr"
    )]
    pub progress: bool,

    #[arg(
        short = 'a',
        long = "archive-folder",
        help = "Save the paths found in the starting folder to this file and quit",
        conflicts_with_all = ["filter", "read_archive"]
    )]
    pub archive_folder: Option<PathBuf>,

    #[arg(
        short = 'r',
        long = "read-archive",
        help = "Check the paths saved in this archive instead of walking a folder",
        conflicts_with = "filter"
    )]
    pub read_archive: Option<PathBuf>,

    #[arg(
        long = "unread-log",
        help = "Append the files that couldn't be read to this file"
    )]
    pub unread_log: Option<PathBuf>,

    #[arg(
        long = "include-hidden",
        help = "Also check files and folders whose names start with a period"
    )]
    pub include_hidden: bool,

    #[arg(
        short = 'v',
        long = "verbose",
        help = "Log more detail (repeat for more)",
        action = clap::ArgAction::Count
    )]
    pub verbose: u8,

    #[arg(
        short = 'q',
        long = "quiet",
        help = "Only log errors"
    )]
    pub quiet: bool,
}

impl Cli {
    pub fn is_filter(&self) -> bool {
        self.filter || self.starting_folder.as_deref() == Some(Path::new("-"))
    }

    pub fn to_scan_config(&self) -> Result<ScanConfig> {
        let mode = if self.is_filter() {
            if self.output_file.is_some() {
                bail!("in filter mode the report is always written to stdout");
            }
            SourceMode::Filter
        } else if let Some(archive) = &self.read_archive {
            SourceMode::Archive(archive.clone())
        } else if let Some(folder) = &self.starting_folder {
            SourceMode::Tree(folder.clone())
        } else {
            bail!("a starting folder is required");
        };

        if self.archive_folder.is_some() && !matches!(mode, SourceMode::Tree(_)) {
            bail!("--archive-folder needs a starting folder to walk");
        }

        let mut config = ScanConfig::new(mode)
            .with_include_hidden(self.include_hidden)
            .with_progress(self.progress)
            .with_format(self.output_format.into());

        if let Some(path) = &self.output_file {
            config = config.with_output_file(path.clone());
        }
        if let Some(path) = &self.unread_log {
            config = config.with_unread_log(path.clone());
        }
        if let Some(path) = &self.archive_folder {
            config = config.with_archive_out(path.clone());
        }

        Ok(config)
    }
}
