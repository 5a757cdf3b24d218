use anyhow::Result;
use serde::Serialize;

use super::{cell_text, header, to_rows};

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

/// Header line from the union of record keys, then one line per record. Every value is quoted.
pub fn to_csv<T: Serialize>(records: &[T]) -> Result<String> {
    let rows = to_rows(records)?;
    let keys = header(&rows);

    let mut lines = vec![keys.join(",")];
    for row in &rows {
        lines.push(
            keys.iter()
                .map(|key| quote(&cell_text(row.get(*key))))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::{
        journal::test_utils::{day, entry, habit},
        storage::entities::Habit,
    };

    use super::to_csv;

    #[test]
    fn test_entries_csv() {
        let entries = [
            entry("local_e_1_1", "h1", 2000., day(2025, 11, 12)),
            entry("7", "h1", 2.5, day(2025, 11, 11)),
        ];
        assert_eq!(
            to_csv(&entries).unwrap(),
            "id,habit_id,value,entry_date,created_at,local\n\
             \"local_e_1_1\",\"h1\",\"2000\",\"2025-11-12\",\"\",\"true\"\n\
             \"7\",\"h1\",\"2.5\",\"2025-11-11\",\"\",\"false\""
        );
    }

    #[test]
    fn test_missing_keys_and_quotes() {
        let habits = [
            habit("1", "Say \"hi\", often"),
            Habit {
                updated_at: Some(Utc.with_ymd_and_hms(2025, 11, 12, 8, 0, 0).unwrap()),
                ..habit("2", "Walk")
            },
        ];
        let csv = to_csv(&habits).unwrap();
        let lines = csv.lines().collect::<Vec<_>>();
        assert_eq!(
            lines[0],
            "id,name,unit,daily_goal,color,created_at,local,updated_at"
        );
        assert_eq!(
            lines[1],
            "\"1\",\"Say \"\"hi\"\", often\",\"units\",\"\",\"\",\"\",\"false\",\"\""
        );
        assert!(lines[2].ends_with(",\"2025-11-12T08:00:00Z\""));
    }

    #[test]
    fn test_nothing_to_export() {
        assert_eq!(
            to_csv::<serde_json::Value>(&[]).unwrap_err().to_string(),
            "No data to export."
        );
    }
}
