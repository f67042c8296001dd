pub mod duplicate_finder;
pub mod grouper;
pub mod progress_tracker;

pub use duplicate_finder::{DuplicateFinderService, ScanState};
pub use grouper::DuplicateGrouper;
pub use progress_tracker::ProgressTracker;
