use crate::domain::Digest;
use crate::error::HashError;
use crate::ports::HashingPort;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use xxhash_rust::xxh64::Xxh64;

const CHUNK_SIZE: usize = 512 * 1024;

/// Streams a file through XXH64 one fixed-size chunk at a time.
pub struct ChunkedHasher {
    chunk_size: usize,
    shutdown: Option<Arc<AtomicBool>>,
}

impl ChunkedHasher {
    pub fn new() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            shutdown: None,
        }
    }

    /// Stop between chunks once `flag` is raised.
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    fn interrupted(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn process_buffered_data<R, F>(
        &self,
        reader: &mut R,
        buffer: &mut [u8],
        mut update_fn: F,
    ) -> Result<(), std::io::Error>
    where
        R: Read,
        F: FnMut(&[u8]),
    {
        loop {
            if self.interrupted() {
                return Err(std::io::ErrorKind::Interrupted.into());
            }
            let bytes_read = match reader.read(buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            update_fn(&buffer[..bytes_read]);
        }
        Ok(())
    }
}

impl Default for ChunkedHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl HashingPort for ChunkedHasher {
    fn hash_file(&self, path: &Path) -> Result<Digest, HashError> {
        let metadata = fs::metadata(path).map_err(|e| HashError::from_io(path.to_path_buf(), e))?;
        if !metadata.is_file() {
            return Err(HashError::NotAFile(path.to_path_buf()));
        }

        let file = File::open(path).map_err(|e| HashError::from_io(path.to_path_buf(), e))?;
        let mut reader = BufReader::with_capacity(self.chunk_size, file);
        let mut buffer = vec![0; self.chunk_size];
        let mut hasher = Xxh64::new(0);

        match self.process_buffered_data(&mut reader, &mut buffer, |data| hasher.update(data)) {
            Ok(()) => Ok(Digest::from_u64(hasher.digest())),
            Err(_) if self.interrupted() => Err(HashError::Interrupted),
            Err(e) => Err(HashError::from_io(path.to_path_buf(), e)),
        }
    }
}
