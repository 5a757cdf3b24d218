use std::fmt::Write;

use chrono::{Duration, NaiveDate};

use crate::{
    storage::entities::{find_habit, Entry, Habit},
    utils::time::date_to_key,
};

use super::format_number;

const PLACEHOLDER_HABIT: &str = "Habit";
const PLACEHOLDER_COLOR: &str = "#bbb";

const STYLE: &str = "body{font-family:Inter,system-ui,Segoe UI,Roboto,Arial;margin:20px;color:#111;background:#fff}
    .h{font-size:22px;margin-bottom:10px}
    .day{margin-bottom:14px;padding:10px;border:1px solid #eee;border-radius:6px}
    .pill{display:inline-block;padding:6px 8px;border-radius:999px;margin-right:8px;margin-bottom:6px}";

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Printable summary of the seven days starting at `week_start`. The page prints itself once
/// loaded, printing to a file gives the PDF.
pub fn weekly_report(habits: &[Habit], entries: &[Entry], week_start: NaiveDate) -> String {
    let dates = (0..7)
        .map(|i| week_start + Duration::days(i))
        .collect::<Vec<_>>();

    let mut html = format!(
        "<html><head><meta charset=\"utf-8\"><title>Weekly Habit Report</title><style>\n    {STYLE}\n  </style></head><body>"
    );
    let _ = write!(
        html,
        "<div class=\"h\">Weekly Habit Summary: {} → {}</div>",
        date_to_key(dates[0]),
        date_to_key(dates[6])
    );

    for date in &dates {
        let _ = write!(
            html,
            "<div class=\"day\"><strong>{}</strong><div style=\"margin-top:6px\">",
            date_to_key(*date)
        );
        let mut any = false;
        for entry in entries.iter().filter(|e| e.entry_date == *date) {
            any = true;
            let habit = find_habit(habits, &entry.habit_id);
            let name = habit.map_or(PLACEHOLDER_HABIT, |h| h.name.as_str());
            let color = habit
                .and_then(|h| h.color.as_deref())
                .unwrap_or(PLACEHOLDER_COLOR);
            let unit = habit
                .and_then(|h| h.unit.as_deref())
                .filter(|u| !u.is_empty())
                .map(|u| format!(" {u}"))
                .unwrap_or_default();
            let _ = write!(
                html,
                "<div class=\"pill\" style=\"background:{};padding:6px;border-radius:6px;color:#000\">{}: {}{}</div>",
                escape_html(color),
                escape_html(name),
                format_number(entry.value),
                escape_html(&unit)
            );
        }
        if !any {
            html.push_str("<div style=\"color:#666\">No entries</div>");
        }
        html.push_str("</div></div>");
    }

    html.push_str(
        "<script>window.onload = ()=> { setTimeout(()=>{ window.print(); }, 120); }</script></body></html>",
    );
    html
}

#[cfg(test)]
mod tests {
    use crate::{
        journal::test_utils::{day, entry, habit},
        storage::entities::Habit,
    };

    use super::weekly_report;

    #[test]
    fn test_week_layout() {
        let habits = [Habit {
            color: Some("#00B0FF".into()),
            unit: Some("ml".into()),
            ..habit("w", "<Water>")
        }];
        let entries = [
            entry("1", "w", 2000., day(2025, 11, 10)),
            entry("2", "gone", 1., day(2025, 11, 10)),
            entry("3", "w", 1., day(2025, 11, 16)),
        ];

        let html = weekly_report(&habits, &entries, day(2025, 11, 9));
        assert!(html.contains("Weekly Habit Summary: 2025-11-09 → 2025-11-15"));
        assert_eq!(html.matches("class=\"day\"").count(), 7);
        assert_eq!(html.matches("No entries").count(), 6);
        assert!(html.contains(
            "style=\"background:#00B0FF;padding:6px;border-radius:6px;color:#000\">&lt;Water&gt;: 2000 ml</div>"
        ));
        assert!(html.contains("background:#bbb;padding:6px;border-radius:6px;color:#000\">Habit: 1</div>"));
        assert!(!html.contains("2025-11-16"));
        assert!(html.contains("window.print()"));
    }
}
