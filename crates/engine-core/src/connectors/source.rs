use crate::error::SourceError;
use model::records::key::BreakKey;

/// An ordered row source. Rows come back in ascending composite-key order
/// and `after` is an exclusive lower bound on that key. Callers page
/// through the stream by calling `fetch` repeatedly with the key of the
/// last row they received.
pub trait RowSource {
    type Row;

    fn fetch(
        &mut self,
        after: Option<&BreakKey>,
        limit: usize,
    ) -> Result<Vec<Self::Row>, SourceError>;
}

impl<S: RowSource + ?Sized> RowSource for Box<S> {
    type Row = S::Row;

    fn fetch(
        &mut self,
        after: Option<&BreakKey>,
        limit: usize,
    ) -> Result<Vec<Self::Row>, SourceError> {
        (**self).fetch(after, limit)
    }
}
