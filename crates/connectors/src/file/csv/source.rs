use crate::file::csv::error::FileError;
use engine_core::{connectors::source::RowSource, error::SourceError};
use model::{
    core::data_type::ColumnDef,
    records::{
        key::BreakKey,
        record::ReportRecord,
        row::{FieldValue, RowData},
    },
};
use std::{
    cmp::Ordering,
    fs::File,
    io,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Reads a CSV extract that is already sorted by the report's composite
/// key. Rows at or before the requested key are skipped, so resuming from
/// a checkpoint replays nothing.
pub struct CsvRowSource {
    path: PathBuf,
    entity: String,
    reader: csv::Reader<File>,
    columns: Vec<(usize, ColumnDef)>,
    position_fields: Vec<String>,
    /// Records consumed from the file, skipped ones included.
    rows_read: u64,
    last_key: Option<BreakKey>,
}

impl CsvRowSource {
    pub fn open(
        path: impl AsRef<Path>,
        columns: &[ColumnDef],
        position_fields: Vec<String>,
    ) -> Result<Self, FileError> {
        let path = path.as_ref().to_path_buf();
        let (reader, columns) = Self::open_reader(&path, columns)?;
        let entity = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        info!(path = %path.display(), columns = columns.len(), "Opened CSV row source");
        Ok(Self {
            path,
            entity,
            reader,
            columns,
            position_fields,
            rows_read: 0,
            last_key: None,
        })
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    fn open_reader(
        path: &Path,
        columns: &[ColumnDef],
    ) -> Result<(csv::Reader<File>, Vec<(usize, ColumnDef)>), FileError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => FileError::NotFound(path.display().to_string()),
            _ => FileError::IoError(e),
        })?;
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(file);

        let headers = reader.headers()?.clone();
        let mut mapped = Vec::with_capacity(columns.len());
        for column in columns {
            let ordinal = headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(&column.name))
                .ok_or_else(|| FileError::MissingColumn(column.name.clone()))?;
            mapped.push((ordinal, column.clone()));
        }
        Ok((reader, mapped))
    }

    fn rewind(&mut self) -> Result<(), FileError> {
        let declared: Vec<ColumnDef> = self.columns.iter().map(|(_, c)| c.clone()).collect();
        let (reader, columns) = Self::open_reader(&self.path, &declared)?;
        self.reader = reader;
        self.columns = columns;
        self.rows_read = 0;
        self.last_key = None;
        debug!(path = %self.path.display(), "Rewound CSV row source");
        Ok(())
    }

    fn decode(&self, record: &csv::StringRecord) -> Result<RowData, FileError> {
        let mut fields = Vec::with_capacity(self.columns.len());
        for (ordinal, column) in &self.columns {
            let cell = record.get(*ordinal).unwrap_or("");
            let value = column
                .data_type
                .parse(cell)
                .map_err(|message| FileError::InvalidValue {
                    row: self.rows_read,
                    column: column.name.clone(),
                    message,
                })?;
            fields.push(FieldValue::new(column.name.clone(), value));
        }
        Ok(RowData::new(&self.entity, fields))
    }

    fn is_after(&self, key: &BreakKey, after: &BreakKey) -> Result<bool, FileError> {
        let ordering = key.compare(after).map_err(|e| FileError::InvalidValue {
            row: self.rows_read,
            column: self.position_fields.join(","),
            message: e.to_string(),
        })?;
        Ok(ordering == Ordering::Greater)
    }
}

impl RowSource for CsvRowSource {
    type Row = RowData;

    fn fetch(
        &mut self,
        after: Option<&BreakKey>,
        limit: usize,
    ) -> Result<Vec<RowData>, SourceError> {
        // A lower bound behind what was already delivered means the caller
        // restarted; read the file again from the top.
        if let Some(last) = &self.last_key {
            let behind = match after {
                None => true,
                Some(after) => self.is_after(last, after)?,
            };
            if behind {
                self.rewind()?;
            }
        }

        let mut rows = Vec::with_capacity(limit);
        let mut record = csv::StringRecord::new();
        while rows.len() < limit {
            if !self
                .reader
                .read_record(&mut record)
                .map_err(FileError::from)?
            {
                break;
            }
            self.rows_read += 1;

            let row = self.decode(&record)?;
            let key = row.key_of(&self.position_fields);
            if let Some(after) = after
                && !self.is_after(&key, after)?
            {
                continue;
            }
            self.last_key = Some(key);
            rows.push(row);
        }

        debug!(
            path = %self.path.display(),
            fetched = rows.len(),
            rows_read = self.rows_read,
            "Fetched CSV batch"
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use model::core::{data_type::DataType, value::Value};
    use std::{io::Write, str::FromStr};
    use tempfile::NamedTempFile;

    const REFUNDS: &str = "\
refund_type,control_nbr,amount,note
PER,1,100.00,first
PER,1,50.00,
PER,2,30.00,
RET,1,20.00,last
";

    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("refund_type", DataType::String),
            ColumnDef::new("control_nbr", DataType::Int),
            ColumnDef::new("amount", DataType::Decimal),
        ]
    }

    fn write_csv(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    fn position() -> Vec<String> {
        vec!["refund_type".into(), "control_nbr".into(), "amount".into()]
    }

    #[test]
    fn pages_through_the_file() {
        let file = write_csv(REFUNDS);
        let mut source = CsvRowSource::open(file.path(), &columns(), position()).unwrap();

        let first = source.fetch(None, 3).unwrap();
        assert_eq!(first.len(), 3);
        let last_key = first[2].key_of(&position());

        let second = source.fetch(Some(&last_key), 3).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].get_value("refund_type"), Value::from("RET"));
        assert_eq!(
            second[0].get_value("amount"),
            Value::Decimal(BigDecimal::from_str("20.00").unwrap())
        );

        let end = second[0].key_of(&position());
        assert!(source.fetch(Some(&end), 3).unwrap().is_empty());
        assert_eq!(source.rows_read(), 4);
    }

    #[test]
    fn skips_rows_up_to_resume_key() {
        let file = write_csv(REFUNDS);
        let mut source = CsvRowSource::open(file.path(), &columns(), position()).unwrap();
        let resume = BreakKey::new(vec![
            Value::from("PER"),
            Value::Int(1),
            Value::Decimal(BigDecimal::from_str("100.00").unwrap()),
        ]);

        let rows = source.fetch(Some(&resume), 10).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get_value("control_nbr"), Value::Int(2));
    }

    #[test]
    fn rewinds_when_restarted_from_beginning() {
        let file = write_csv(REFUNDS);
        let mut source = CsvRowSource::open(file.path(), &columns(), position()).unwrap();

        assert_eq!(source.fetch(None, 10).unwrap().len(), 4);
        assert_eq!(source.fetch(None, 10).unwrap().len(), 4);
    }

    #[test]
    fn missing_header_column_is_reported() {
        let file = write_csv("refund_type,amount\nPER,1.00\n");
        let err = CsvRowSource::open(file.path(), &columns(), position())
            .err()
            .unwrap();
        assert!(matches!(err, FileError::MissingColumn(ref c) if c == "control_nbr"));
    }

    #[test]
    fn bad_cell_becomes_decode_error() {
        let file = write_csv("refund_type,control_nbr,amount\nPER,x1,1.00\n");
        let mut source = CsvRowSource::open(file.path(), &columns(), position()).unwrap();
        let err = source.fetch(None, 10).unwrap_err();
        assert!(matches!(err, SourceError::Decode { row: 1, .. }));
    }
}
