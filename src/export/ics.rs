use chrono::{DateTime, Utc};

use crate::storage::entities::{find_habit, Entry, Habit};

use super::format_number;

const PLACEHOLDER_HABIT: &str = "Habit";

/// Escapes an iCalendar TEXT value.
fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace("\r\n", "\\n")
        .replace(['\r', '\n'], "\\n")
}

/// One all-day event per entry. Lines are CRLF separated.
pub fn entries_to_ics(entries: &[Entry], habits: &[Habit], stamp: DateTime<Utc>) -> String {
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".into(),
        "PRODID:-//HabitJournal//EN".into(),
    ];
    let stamp = stamp.format("%Y%m%dT%H%M%SZ").to_string();

    for entry in entries {
        let habit = find_habit(habits, &entry.habit_id);
        let name = habit.map_or(PLACEHOLDER_HABIT, |h| h.name.as_str());
        let unit = habit
            .and_then(|h| h.unit.as_deref())
            .filter(|u| !u.is_empty())
            .map(|u| format!(" {u}"))
            .unwrap_or_default();

        lines.push("BEGIN:VEVENT".into());
        lines.push(format!("UID:hj-{}@habit-journal", entry.id));
        lines.push(format!("DTSTAMP:{stamp}"));
        lines.push(format!(
            "DTSTART;VALUE=DATE:{}",
            entry.entry_date.format("%Y%m%d")
        ));
        lines.push(format!(
            "SUMMARY:{}",
            escape_text(&format!("{name} — {}{unit}", format_number(entry.value)))
        ));
        lines.push("DESCRIPTION:Recorded by Habit Journal".into());
        lines.push("END:VEVENT".into());
    }

    lines.push("END:VCALENDAR".into());
    lines.join("\r\n")
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::journal::test_utils::{day, entry, habit};

    use super::entries_to_ics;

    #[test]
    fn test_one_event_per_entry() {
        let stamp = Utc.with_ymd_and_hms(2025, 11, 12, 9, 30, 5).unwrap();
        let habits = [habit("w", "Water, cold")];
        let entries = [
            entry("e1", "w", 2000., day(2025, 11, 12)),
            entry("e2", "gone", 1.5, day(2025, 1, 3)),
            entry("e3", "w", 3., day(2024, 12, 31)),
        ];

        let ics = entries_to_ics(&entries, &habits, stamp);
        assert!(ics.starts_with("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//HabitJournal//EN\r\n"));
        assert!(ics.ends_with("END:VEVENT\r\nEND:VCALENDAR"));
        assert!(!ics.replace("\r\n", "").contains('\n'));
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 3);

        let starts = ics
            .lines()
            .filter_map(|l| l.strip_prefix("DTSTART;VALUE=DATE:"))
            .collect::<Vec<_>>();
        assert_eq!(starts, vec!["20251112", "20250103", "20241231"]);

        assert!(ics.contains("UID:hj-e1@habit-journal\r\nDTSTAMP:20251112T093005Z\r\n"));
        assert!(ics.contains("SUMMARY:Water\\, cold — 2000 units\r\n"));
        assert!(ics.contains("SUMMARY:Habit — 1.5\r\n"));
    }

    #[test]
    fn test_line_breaks_in_names() {
        let stamp = Utc.with_ymd_and_hms(2025, 11, 12, 0, 0, 0).unwrap();
        let habits = [habit("w", "Water\r\nDTSTART:1\rcold\nice")];
        let ics = entries_to_ics(&[entry("e1", "w", 1., day(2025, 11, 12))], &habits, stamp);

        assert!(!ics.replace("\r\n", "").contains(['\r', '\n']));
        assert!(ics.contains("SUMMARY:Water\\nDTSTART:1\\ncold\\nice — 1 units\r\n"));
        assert_eq!(ics.lines().filter(|l| l.starts_with("DTSTART")).count(), 1);
    }

    #[test]
    fn test_empty_calendar() {
        let stamp = Utc.with_ymd_and_hms(2025, 11, 12, 0, 0, 0).unwrap();
        assert_eq!(
            entries_to_ics(&[], &[], stamp),
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//HabitJournal//EN\r\nEND:VCALENDAR"
        );
    }
}
