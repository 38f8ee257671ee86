//! Delimited text input and output.

use std::{
    io::{self, Write},
    mem::take,
    path::Path,
};

use crate::error::{AppError, AppResult};

pub const SEP: char = ',';

/// Quote-aware CSV parser. Tolerates CRLF and skips blank lines.
pub fn parse_rows(text: &str, sep: char) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut field = String::new();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && matches!(chars.peek(), Some('"')) => {
                chars.next();
                field.push('"');
            },
            '"' => in_quotes = !in_quotes,
            c if c == sep && !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(take(&mut field));
                if row.len() == 1 && row[0].is_empty() {
                    row.clear();
                } else {
                    rows.push(take(&mut row));
                }
            },
            _ => field.push(ch),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows
}

/// Reads a whole delimited file. A missing file is reported as
/// [`AppError::NotFound`] so the caller can ask for another path.
pub async fn read_rows(path: &Path) -> AppResult<Vec<Vec<String>>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(parse_rows(text.trim_start_matches('\u{feff}'), SEP)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            Err(AppError::NotFound(path.to_path_buf()))
        },
        Err(err) => Err(err.into()),
    }
}

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

pub fn write_row<W: Write, S: AsRef<str>>(mut w: W, row: &[S], sep: char) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, "{sep}")?;
        }
        let cell = cell.as_ref();
        if needs_quotes(cell, sep) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{cell}")?;
        }
    }
    writeln!(w)
}

/// Column value at `index`, trimmed; missing columns read as empty.
pub fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|c| c.trim()).unwrap_or("")
}

/// Reads a list column written as `['Drama', 'Crime']`. Bare comma separated
/// text is accepted too.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|item| item.trim().trim_matches(|c| c == '\'' || c == '"').trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Writes a list column the same way [`parse_list`] reads it.
pub fn format_list<S: AsRef<str>>(items: &[S]) -> String {
    let quoted: Vec<String> = items.iter().map(|i| format!("'{}'", i.as_ref())).collect();
    format!("[{}]", quoted.join(", "))
}
