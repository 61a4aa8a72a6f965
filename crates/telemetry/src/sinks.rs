//! Log sinks: a tee over stdout, stderr and append-mode files.

use std::fs::{self, File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing_subscriber::fmt::MakeWriter;

use crate::config::Output;

const FILE_BUFFER: usize = 64 * 1024;

enum Sink {
    Stdout,
    Stderr,
    File(Mutex<LineWriter<File>>),
}

impl Sink {
    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        match self {
            Self::Stdout => io::stdout().lock().write_all(buf),
            Self::Stderr => io::stderr().lock().write_all(buf),
            Self::File(file) => file
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .write_all(buf),
        }
    }

    fn flush(&self) -> io::Result<()> {
        match self {
            Self::Stdout => io::stdout().flush(),
            Self::Stderr => io::stderr().flush(),
            Self::File(file) => {
                let mut file = file.lock().unwrap_or_else(PoisonError::into_inner);
                file.flush()?;
                file.get_ref().sync_data()
            }
        }
    }
}

/// The set of sinks one logger generation writes to. Clones share the
/// same open files.
#[derive(Clone)]
pub struct SinkSet {
    sinks: Arc<Vec<Sink>>,
}

/// Result of [`SinkSet::open`].
pub struct OpenedSinks {
    pub sinks: SinkSet,
    /// Outputs actually in use, in configured order.
    pub outputs: Vec<Output>,
    /// Files that could not be opened and were replaced by stdout.
    pub failures: Vec<(PathBuf, io::Error)>,
}

impl SinkSet {
    /// Open every output. A file that cannot be opened is replaced by
    /// stdout and reported in [`OpenedSinks::failures`].
    pub fn open(outputs: &[Output]) -> OpenedSinks {
        let mut sinks = Vec::with_capacity(outputs.len());
        let mut effective = Vec::with_capacity(outputs.len());
        let mut failures = Vec::new();

        for output in outputs {
            match output {
                Output::Stdout => sinks.push(Sink::Stdout),
                Output::Stderr => sinks.push(Sink::Stderr),
                Output::File(path) => match open_file(path) {
                    Ok(file) => sinks.push(Sink::File(Mutex::new(LineWriter::with_capacity(
                        FILE_BUFFER,
                        file,
                    )))),
                    Err(e) => {
                        failures.push((path.clone(), e));
                        sinks.push(Sink::Stdout);
                        effective.push(Output::Stdout);
                        continue;
                    }
                },
            }
            effective.push(output.clone());
        }

        OpenedSinks {
            sinks: Self {
                sinks: Arc::new(sinks),
            },
            outputs: effective,
            failures,
        }
    }

    /// Flush every sink. All sinks are attempted; the first error is returned.
    pub fn flush(&self) -> io::Result<()> {
        let mut first_error = None;
        for sink in self.sinks.iter() {
            if let Err(e) = sink.flush() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

fn open_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Per-event writer handed out by [`SinkSet`].
pub struct TeeWriter {
    sinks: Arc<Vec<Sink>>,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_all(buf)?;
        Ok(buf.len())
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        for sink in self.sinks.iter() {
            sink.write_all(buf)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        for sink in self.sinks.iter() {
            sink.flush()?;
        }
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for SinkSet {
    type Writer = TeeWriter;

    fn make_writer(&'a self) -> Self::Writer {
        TeeWriter {
            sinks: Arc::clone(&self.sinks),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_output_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/app.log");

        let opened = SinkSet::open(&[Output::File(path.clone())]);
        assert_eq!(opened.outputs, vec![Output::File(path.clone())]);
        assert!(opened.failures.is_empty());

        let sinks = opened.sinks;
        sinks.make_writer().write_all(b"hello\n").unwrap();
        sinks.flush().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn unopenable_file_falls_back_to_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();
        let bad = blocker.join("app.log");

        let opened = SinkSet::open(&[Output::Stderr, Output::File(bad.clone())]);
        assert_eq!(opened.outputs, vec![Output::Stderr, Output::Stdout]);
        assert_eq!(opened.failures.len(), 1);
        assert_eq!(opened.failures[0].0, bad);
    }

    #[test]
    fn tee_writes_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let a: PathBuf = dir.path().join("a.log");
        let b: PathBuf = dir.path().join("b.log");

        let sinks = SinkSet::open(&[Output::File(a.clone()), Output::File(b.clone())]).sinks;
        sinks.make_writer().write_all(b"line\n").unwrap();
        sinks.flush().unwrap();

        assert_eq!(fs::read_to_string(a).unwrap(), "line\n");
        assert_eq!(fs::read_to_string(b).unwrap(), "line\n");
    }
}
