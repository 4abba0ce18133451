use engine_core::{connectors::sink::LineSink, error::SinkError};
use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::info;

/// Writes report lines to a text file, one line per record.
pub struct FileLineSink {
    path: PathBuf,
    writer: BufWriter<File>,
    lines_written: u64,
}

impl FileLineSink {
    /// Creates (or truncates) the report file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        info!(path = %path.display(), "Writing report to new file");
        Ok(Self::from_file(path, file))
    }

    /// Opens the report file for appending, creating it if needed. Used
    /// when a run resumes from a checkpoint.
    pub fn append(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!(path = %path.display(), "Appending report to existing file");
        Ok(Self::from_file(path, file))
    }

    fn from_file(path: PathBuf, file: File) -> Self {
        Self {
            path,
            writer: BufWriter::new(file),
            lines_written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }
}

impl LineSink for FileLineSink {
    fn write_line(&mut self, line: &str) -> Result<(), SinkError> {
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .map_err(|e| SinkError::Write(format!("{}: {e}", self.path.display())))?;
        self.lines_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer
            .flush()
            .and_then(|_| self.writer.get_ref().sync_data())
            .map_err(|e| SinkError::Flush(format!("{}: {e}", self.path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_truncates_and_append_extends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("P09305.txt");

        let mut sink = FileLineSink::create(&path).unwrap();
        sink.write_line("PAGE 1").unwrap();
        sink.flush().unwrap();
        drop(sink);

        let mut sink = FileLineSink::append(&path).unwrap();
        sink.write_line("PAGE 2").unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.lines_written(), 1);
        drop(sink);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "PAGE 1\nPAGE 2\n");

        let mut sink = FileLineSink::create(&path).unwrap();
        sink.write_line("FRESH").unwrap();
        sink.flush().unwrap();
        drop(sink);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "FRESH\n");
    }
}
