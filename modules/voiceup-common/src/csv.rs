//! CSV serialization for the ministry data export.
//!
//! The header row comes from the record type's column names; each record
//! becomes one comma-joined row in the same order. Fields containing a
//! comma, quote, or line break are quoted with inner quotes doubled.

use crate::types::Correlation;

pub trait CsvRecord {
    /// Column names, in output order.
    fn headers() -> &'static [&'static str];
    /// Field values for one row, matching `headers()` order.
    fn fields(&self) -> Vec<String>;
}

/// Serialize records to CSV. Empty input yields an empty string.
pub fn write_csv<R: CsvRecord>(records: &[R]) -> String {
    if records.is_empty() {
        return String::new();
    }

    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(
        R::headers()
            .iter()
            .map(|h| escape_field(h))
            .collect::<Vec<_>>()
            .join(","),
    );
    for record in records {
        lines.push(
            record
                .fields()
                .iter()
                .map(|f| escape_field(f))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    lines.join("\n")
}

fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

impl CsvRecord for Correlation {
    fn headers() -> &'static [&'static str] {
        &["category_a", "category_b", "city", "correlation_score"]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.category_a.clone(),
            self.category_b.clone(),
            self.city.clone(),
            self.correlation_score.to_string(),
        ]
    }
}
