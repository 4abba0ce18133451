use crate::error::SinkError;

/// Destination for rendered report lines. The engine never manages file
/// handles itself.
pub trait LineSink {
    fn write_line(&mut self, line: &str) -> Result<(), SinkError>;

    /// Makes every line written so far durable.
    fn flush(&mut self) -> Result<(), SinkError>;
}

impl<S: LineSink + ?Sized> LineSink for Box<S> {
    fn write_line(&mut self, line: &str) -> Result<(), SinkError> {
        (**self).write_line(line)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        (**self).flush()
    }
}
