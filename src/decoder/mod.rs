//! Turns one raw queue message into a [`Record`].

use crate::db_types::Record;
use crate::error::DecodeError;
use encoding_rs::Encoding;

#[derive(Debug, Clone, Copy)]
pub struct RecordDecoder {
    delimiter: u8,
    charset: &'static Encoding,
}

impl RecordDecoder {
    pub fn new(delimiter: u8, charset: &'static Encoding) -> Self {
        Self { delimiter, charset }
    }

    /// Decodes `payload` into one record.
    ///
    /// Returns `Ok(None)` for an end-of-burst marker: an empty payload or a
    /// line holding a single empty field. Only the first line of a payload
    /// is read.
    pub fn decode(&self, payload: &[u8]) -> Result<Option<Record>, DecodeError> {
        let (text, had_errors) = self.charset.decode_without_bom_handling(payload);
        if had_errors {
            return Err(DecodeError::Charset {
                charset: self.charset.name().to_string(),
            });
        }

        let line = text.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Ok(None);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(line.as_bytes());

        let mut row = csv::StringRecord::new();
        let found = reader
            .read_record(&mut row)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
        if !found {
            return Ok(None);
        }

        let record = Record::new(row.iter().map(str::to_string).collect());
        if record.is_end_of_burst() {
            return Ok(None);
        }
        Ok(Some(record))
    }
}
