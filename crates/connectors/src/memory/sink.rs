use engine_core::{connectors::sink::LineSink, error::SinkError};

/// Collects report lines in memory. `flushed` marks how many of them a
/// real sink would have made durable.
#[derive(Debug, Default, Clone)]
pub struct MemoryLineSink {
    lines: Vec<String>,
    flushed: usize,
}

impl MemoryLineSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn flushed_lines(&self) -> &[String] {
        &self.lines[..self.flushed]
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl LineSink for MemoryLineSink {
    fn write_line(&mut self, line: &str) -> Result<(), SinkError> {
        self.lines.push(line.to_string());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.flushed = self.lines.len();
        Ok(())
    }
}
