use std::collections::HashMap;

/// A parsed file: header names plus one name-to-value map per line.
#[derive(Debug, Default, PartialEq)]
pub struct CsvTable {
    pub header: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

/// Small CSV reader. The first non-empty line is the header, `"` toggles quoting and `""` inside
/// quotes is a literal quote. Quoted line breaks are not supported. Fields are trimmed and missing
/// trailing fields read as empty.
pub fn parse_csv(text: &str) -> CsvTable {
    let mut lines = text
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .filter(|l| !l.is_empty());

    let Some(header) = lines.next().map(split_line) else {
        return CsvTable::default();
    };
    let rows = lines
        .map(|line| {
            let mut cols = split_line(line).into_iter();
            header
                .iter()
                .map(|name| (name.clone(), cols.next().unwrap_or_default()))
                .collect()
        })
        .collect();

    CsvTable { header, rows }
}

fn split_line(line: &str) -> Vec<String> {
    let mut out = vec![];
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => out.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    out.push(current);

    out.into_iter().map(|s| s.trim().to_string()).collect()
}
