use anyhow::Result;
use rust_xlsxwriter::{Workbook, Worksheet};
use serde::Serialize;
use serde_json::Value;

use super::{cell_text, header, to_rows};

pub const SHEET_NAME: &str = "Entries";

/// Workbook with a single sheet: header row, then one row per record. Numbers and booleans keep
/// their type, everything else is written as text.
pub fn to_xlsx<T: Serialize>(records: &[T]) -> Result<Vec<u8>> {
    let rows = to_rows(records)?;
    let keys = header(&rows);

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name(SHEET_NAME)?;

    for (col, key) in keys.iter().enumerate() {
        worksheet.write_string(0, col as u16, *key)?;
    }
    for (r, row) in rows.iter().enumerate() {
        let line = r as u32 + 1;
        for (col, key) in keys.iter().enumerate() {
            let col = col as u16;
            match row.get(*key) {
                None | Some(Value::Null) => {}
                Some(Value::Number(n)) => match n.as_f64() {
                    Some(number) => {
                        worksheet.write_number(line, col, number)?;
                    }
                    None => {
                        worksheet.write_string(line, col, n.to_string())?;
                    }
                },
                Some(Value::Bool(b)) => {
                    worksheet.write_boolean(line, col, *b)?;
                }
                value => {
                    worksheet.write_string(line, col, cell_text(value))?;
                }
            }
        }
    }

    workbook.push_worksheet(worksheet);
    Ok(workbook.save_to_buffer()?)
}
