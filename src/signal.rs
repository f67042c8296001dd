//! Ctrl+C handling.
//!
//! The first interrupt raises a shared flag that the pipeline polls between
//! files and the hasher polls between chunks. A second interrupt exits at
//! once, for when the run is blocked waiting on its input stream.

use crate::error::ExitCode;
use std::io::Write;
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("failed to install the Ctrl+C handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install the process-wide Ctrl+C handler. Later calls reuse the first one.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    let flag = handler.get_flag();
    ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            std::process::exit(ExitCode::Interrupted.as_i32());
        }
        let _ = writeln!(std::io::stderr(), "\nInterrupted. Stopping the scan...");
        log::info!("shutdown signal received");
    })?;

    Ok(GLOBAL_HANDLER.get_or_init(|| handler).clone())
}
