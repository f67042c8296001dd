pub mod archive;
pub mod filesystem;
pub mod filter;
pub mod hasher;
pub mod output;
pub mod progress;
pub mod raw_path;

pub use archive::{ArchiveAdapter, FolderArchive};
pub use filesystem::FileSystemAdapter;
pub use filter::LineFilterAdapter;
pub use hasher::ChunkedHasher;
pub use output::{CsvOutputAdapter, Destination, JsonOutputAdapter};
pub use progress::ProgressBarAdapter;
