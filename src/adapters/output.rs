use crate::domain::ScanReport;
use crate::error::OutputError;
use crate::ports::OutputPort;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Where a report ends up.
///
/// A file is only created when the report is written, and never replaces an
/// existing one, so a failed or interrupted run leaves nothing behind.
pub enum Destination<W> {
    Stream(W),
    File(PathBuf),
}

impl<W: Write> Destination<W> {
    /// Catch an unusable file destination before any scanning starts.
    pub fn check(&self) -> Result<(), OutputError> {
        let Destination::File(path) = self else {
            return Ok(());
        };
        if path.exists() {
            return Err(OutputError::Exists(path.clone()));
        }
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
                Err(OutputError::MissingParent(path.clone()))
            }
            _ => Ok(()),
        }
    }

    fn open(&mut self) -> Result<Box<dyn Write + '_>, OutputError> {
        match self {
            Destination::Stream(writer) => Ok(Box::new(writer)),
            Destination::File(path) => {
                let file = OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&*path)
                    .map_err(|source| OutputError::Create {
                        path: path.clone(),
                        source,
                    })?;
                Ok(Box::new(BufWriter::new(file)))
            }
        }
    }

    pub fn file_path(&self) -> Option<&Path> {
        match self {
            Destination::Stream(_) => None,
            Destination::File(path) => Some(path),
        }
    }
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    group_id: usize,
    checksum: String,
    path: &'a str,
}

/// Spreadsheet-friendly rows: one per file, duplicates kept together.
pub struct CsvOutputAdapter<W> {
    destination: Destination<W>,
}

impl<W: Write> CsvOutputAdapter<W> {
    pub fn new(destination: Destination<W>) -> Self {
        Self { destination }
    }

    pub fn with_stream(writer: W) -> Self {
        Self::new(Destination::Stream(writer))
    }

    pub fn with_file(path: &Path) -> Self {
        Self::new(Destination::File(path.to_path_buf()))
    }

    pub fn write_to<T: Write>(results: &ScanReport, writer: T) -> Result<(), OutputError> {
        let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
        // Written by hand so an empty report still carries the header.
        csv_writer.write_record(["group_id", "checksum", "path"])?;

        for (idx, group) in results.duplicates.iter().enumerate() {
            let checksum = group.digest.to_hex();
            for path in &group.members {
                let path = path.to_string_lossy();
                csv_writer.serialize(CsvRow {
                    group_id: idx + 1,
                    checksum: checksum.clone(),
                    path: &path,
                })?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }
}

impl<W: Write> OutputPort for CsvOutputAdapter<W> {
    fn write_results(&mut self, results: &ScanReport) -> Result<(), OutputError> {
        let writer = self.destination.open()?;
        Self::write_to(results, writer)
    }
}

pub struct JsonOutputAdapter<W> {
    destination: Destination<W>,
}

impl<W: Write> JsonOutputAdapter<W> {
    pub fn new(destination: Destination<W>) -> Self {
        Self { destination }
    }

    pub fn with_stream(writer: W) -> Self {
        Self::new(Destination::Stream(writer))
    }

    pub fn with_file(path: &Path) -> Self {
        Self::new(Destination::File(path.to_path_buf()))
    }

    pub fn write_to<T: Write>(results: &ScanReport, mut writer: T) -> Result<(), OutputError> {
        serde_json::to_writer_pretty(&mut writer, &results.duplicates)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}

impl<W: Write> OutputPort for JsonOutputAdapter<W> {
    fn write_results(&mut self, results: &ScanReport) -> Result<(), OutputError> {
        let writer = self.destination.open()?;
        Self::write_to(results, writer)
    }
}
