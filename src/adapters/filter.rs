use crate::adapters::raw_path::path_from_bytes;
use crate::error::{ScanError, SourceError};
use crate::ports::{PathSourcePort, PathStream};
use std::io::BufRead;
use std::path::{self, PathBuf};

/// Reads one candidate path per line, for use at the end of a pipe.
///
/// Lines are taken as raw bytes, so names that aren't valid UTF-8 still
/// reach the hasher.
pub struct LineFilterAdapter<R> {
    input: R,
}

impl<R: BufRead> LineFilterAdapter<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> PathSourcePort for LineFilterAdapter<R> {
    type Paths = LinePaths<R>;

    fn open(self) -> Result<LinePaths<R>, ScanError> {
        Ok(LinePaths {
            input: self.input,
            line: Vec::new(),
            done: false,
        })
    }
}

pub struct LinePaths<R> {
    input: R,
    line: Vec<u8>,
    done: bool,
}

impl<R: BufRead> Iterator for LinePaths<R> {
    type Item = Result<PathBuf, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            self.line.clear();
            match self.input.read_until(b'\n', &mut self.line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(SourceError::Input(e)));
                }
            }

            let line = strip_line_ending(&self.line);
            if line.is_empty() {
                continue;
            }
            let path = path_from_bytes(line);
            return Some(Ok(path::absolute(&path).unwrap_or(path)));
        }
    }
}

impl<R: BufRead> PathStream for LinePaths<R> {}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, BufReader, Cursor, Read};

    fn paths(input: &str) -> Vec<PathBuf> {
        LineFilterAdapter::new(Cursor::new(input.to_string()))
            .open()
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn passes_lines_through_in_order() {
        assert_eq!(
            paths("/x/1.bin\n/x/2.bin\n"),
            vec![PathBuf::from("/x/1.bin"), PathBuf::from("/x/2.bin")]
        );
    }

    #[test]
    fn skips_blank_lines_and_carriage_returns() {
        assert_eq!(
            paths("\n/x/a\r\n\n/x/b"),
            vec![PathBuf::from("/x/a"), PathBuf::from("/x/b")]
        );
    }

    #[test]
    fn keeps_spaces_inside_paths() {
        assert_eq!(paths("/x/my file \n"), vec![PathBuf::from("/x/my file ")]);
    }

    #[test]
    fn relative_lines_become_absolute() {
        let got = paths("rel/file.txt\n");
        assert!(got[0].is_absolute());
        assert!(got[0].ends_with("rel/file.txt"));
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(paths("").is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn lines_that_are_not_utf8_are_still_paths() {
        use std::os::unix::ffi::OsStrExt;

        let got = LineFilterAdapter::new(Cursor::new(b"/x/good\n/x/caf\xe9\r\n".to_vec()))
            .open()
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(got[0], PathBuf::from("/x/good"));
        assert_eq!(got[1].as_os_str().as_bytes(), b"/x/caf\xe9");
    }

    struct BrokenPipe;

    impl Read for BrokenPipe {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn read_failure_is_a_fatal_input_error() {
        let mut source = LineFilterAdapter::new(BufReader::new(BrokenPipe)).open().unwrap();
        let err = source.next().unwrap().unwrap_err();
        assert!(err.is_fatal());
        assert!(source.next().is_none());
    }
}
