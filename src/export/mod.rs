//! File formats the journal can be written to. Writers return the file contents, where the
//! bytes end up is up to the caller.

pub mod csv;
pub mod ics;
pub mod report;
pub mod xlsx;

use anyhow::{bail, Result};
use serde::Serialize;
use serde_json::{Map, Value};

pub const NO_DATA: &str = "No data to export.";

pub type Row = Map<String, Value>;

/// Flattens records into json objects, keeping field order.
pub fn to_rows<T: Serialize>(records: &[T]) -> Result<Vec<Row>> {
    if records.is_empty() {
        bail!(NO_DATA);
    }
    records
        .iter()
        .map(|record| match serde_json::to_value(record)? {
            Value::Object(row) => Ok(row),
            other => bail!("Expected a record, got {other}"),
        })
        .collect()
}

/// Union of all keys in the order they are first seen.
pub fn header(rows: &[Row]) -> Vec<&str> {
    let mut keys: Vec<&str> = vec![];
    for key in rows.iter().flat_map(|row| row.keys()) {
        if !keys.contains(&key.as_str()) {
            keys.push(key);
        }
    }
    keys
}

/// Plain text of a cell. Missing values and nulls are empty, integral numbers have no fraction.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) => format_number(f),
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

/// `2000.0` is written as `2000`, everything else as is.
pub fn format_number(value: f64) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{cell_text, header, to_rows, NO_DATA};

    #[test]
    fn test_header_is_union_in_first_seen_order() {
        let rows = to_rows(&[json!({"b": 1, "a": 2}), json!({"a": 3, "c": 4})]).unwrap();
        assert_eq!(header(&rows), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_empty_input() {
        let err = to_rows::<serde_json::Value>(&[]).unwrap_err();
        assert_eq!(err.to_string(), NO_DATA);
        assert!(to_rows(&[json!(1)]).is_err());
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(None), "");
        assert_eq!(cell_text(Some(&json!(null))), "");
        assert_eq!(cell_text(Some(&json!(2000.0))), "2000");
        assert_eq!(cell_text(Some(&json!(2.5))), "2.5");
        assert_eq!(cell_text(Some(&json!(true))), "true");
        assert_eq!(cell_text(Some(&json!("a \"b\""))), "a \"b\"");
    }
}
