//! Storage-agnostic source records: named string fields, as handed to the mapper.

use std::collections::HashMap;

use crate::error::ReconError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRecord {
    fields: HashMap<String, String>,
}

impl SourceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Trimmed field value. Missing and blank fields are both `None`.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SourceRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Parse CSV text with a header row into one record per data row.
/// Header names are trimmed; fully blank rows are skipped.
pub fn read_csv_records(csv_data: &str) -> Result<Vec<SourceRecord>, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::Io(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|e| ReconError::Io(e.to_string()))?;
        if record.iter().all(|v| v.trim().is_empty()) {
            continue;
        }

        let source: SourceRecord = headers
            .iter()
            .enumerate()
            .filter_map(|(i, h)| record.get(i).map(|v| (h.clone(), v.to_string())))
            .collect();
        records.push(source);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_read_as_absent() {
        let rec = SourceRecord::new()
            .with("invoice_number", "  INV-1 ")
            .with("invoice_date", "   ");
        assert_eq!(rec.field("invoice_number"), Some("INV-1"));
        assert_eq!(rec.field("invoice_date"), None);
        assert_eq!(rec.field("currency"), None);
        assert_eq!(rec.len(), 2);
    }

    #[test]
    fn read_csv_basic() {
        let csv = "\
invoice_number, total_amount ,currency,invoice_date
INV-100,500.00,USD,2025-01-10
INV-101,\"1,250.00\",EUR,
";
        let records = read_csv_records(csv).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].field("total_amount"), Some("500.00"));
        assert_eq!(records[1].field("total_amount"), Some("1,250.00"));
        assert_eq!(records[1].field("invoice_date"), None);
    }

    #[test]
    fn read_csv_skips_blank_rows_and_short_rows_are_tolerated() {
        let csv = "\
reference_text,amount,currency,line_date
INV-1,10.00,USD,2025-02-01
,,,
INV-2,20.00,USD
";
        let records = read_csv_records(csv).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].field("reference_text"), Some("INV-2"));
        assert_eq!(records[1].field("line_date"), None);
    }

    #[test]
    fn header_only_csv_is_empty() {
        let records = read_csv_records("reference_text,amount,currency\n").unwrap();
        assert!(records.is_empty());
    }
}
