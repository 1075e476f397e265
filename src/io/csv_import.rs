use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

use crate::error::{GanttError, Result};
use crate::model::event::{DetailItem, EventId, EventStyle};
use crate::model::Event;
use crate::ui::theme;

/// Columns the importer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Id,
    Title,
    Start,
    End,
    Tags,
    Color,
    Details,
}

/// Try parsing a timestamp with several common formats. Naive formats are
/// read as local time.
fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
        "%d.%m.%Y %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|t| t.with_timezone(&Utc));
        }
    }
    None
}

/// Detect delimiter by checking the first line for common separators.
fn detect_delimiter(first_line: &str) -> u8 {
    let semicolons = first_line.matches(';').count();
    let commas = first_line.matches(',').count();
    let tabs = first_line.matches('\t').count();

    if semicolons >= commas && semicolons >= tabs {
        b';'
    } else if tabs >= commas {
        b'\t'
    } else {
        b','
    }
}

/// Normalize a header string to a canonical column key.
fn normalize_header(h: &str) -> String {
    h.trim().to_lowercase().replace([' ', '-', '_'], "")
}

fn header_to_col(normalized: &str) -> Option<Column> {
    match normalized {
        "id" | "eventid" | "key" => Some(Column::Id),

        "title" | "name" | "event" | "eventname" | "label" | "task" => Some(Column::Title),

        "start" | "starttime" | "startdate" | "from" | "begin" => Some(Column::Start),

        "end" | "endtime" | "enddate" | "to" | "finish" | "due" => Some(Column::End),

        "tags" | "lookuptags" | "searchtags" | "lanes" => Some(Column::Tags),

        "color" | "colour" | "bg" | "background" => Some(Column::Color),

        "details" | "detail" | "detailcontent" | "notes" => Some(Column::Details),

        _ => None,
    }
}

fn split_list(field: &str) -> impl Iterator<Item = &str> {
    field.split('|').map(str::trim).filter(|s| !s.is_empty())
}

/// `label=value|label=value`; entries without `=` become value-only lines.
fn parse_details(field: &str) -> Vec<DetailItem> {
    split_list(field)
        .map(|entry| match entry.split_once('=') {
            Some((label, value)) => DetailItem::new(label.trim(), value.trim()),
            None => DetailItem::new("", entry),
        })
        .collect()
}

/// Import events from a CSV file.
///
/// Auto-detects delimiter (comma, semicolon, tab) and matches column headers
/// flexibly. Rows with unreadable times or `end <= start` are skipped.
/// Returns `(events, skipped_count)` on success.
pub fn import_csv(path: &Path) -> Result<(Vec<Event>, usize)> {
    let content = std::fs::read_to_string(path).map_err(|e| GanttError::io(path, e))?;
    import_csv_str(&content)
}

pub fn import_csv_str(content: &str) -> Result<(Vec<Event>, usize)> {
    let first_line = content.lines().next().unwrap_or("");
    let delimiter = detect_delimiter(first_line);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let col_map: Vec<Option<Column>> = headers
        .iter()
        .map(|h| header_to_col(&normalize_header(h)))
        .collect();

    let has = |col: Column| col_map.contains(&Some(col));
    if !has(Column::Title) || !has(Column::Start) || !has(Column::End) {
        return Err(GanttError::MissingColumns {
            found: headers.iter().map(str::to_string).collect(),
        });
    }

    let colors = theme::TASK_COLORS;
    let mut events: Vec<Event> = Vec::new();
    let mut seen_ids: HashSet<EventId> = HashSet::new();
    let mut skipped = 0usize;

    for (i, result) in reader.records().enumerate() {
        let row = i + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Skipping CSV row {}: {}", row, e);
                skipped += 1;
                continue;
            }
        };

        let field = |col: Column| {
            col_map
                .iter()
                .position(|c| *c == Some(col))
                .and_then(|idx| record.get(idx))
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };

        let Some(title) = field(Column::Title) else {
            skipped += 1;
            continue;
        };

        let (start, end) = match (
            field(Column::Start).and_then(parse_time),
            field(Column::End).and_then(parse_time),
        ) {
            (Some(start), Some(end)) if start < end => (start, end),
            _ => {
                tracing::warn!(
                    "Skipping row {}: invalid time range '{}' → '{}'",
                    row,
                    field(Column::Start).unwrap_or(""),
                    field(Column::End).unwrap_or("")
                );
                skipped += 1;
                continue;
            }
        };

        let id = field(Column::Id)
            .map(EventId::new)
            .filter(|id| !seen_ids.contains(id))
            .unwrap_or_else(EventId::generate);
        seen_ids.insert(id.clone());

        let bg = field(Column::Color)
            .filter(|c| theme::parse_hex_color(c).is_some())
            .map(str::to_string)
            .unwrap_or_else(|| theme::to_hex(colors[events.len() % colors.len()]));

        events.push(Event {
            id,
            title: title.to_string(),
            start_time: start,
            end_time: end,
            style: EventStyle { bg },
            detail_content: field(Column::Details).map(parse_details).unwrap_or_default(),
            lookup_tags: field(Column::Tags)
                .map(|tags| split_list(tags).map(str::to_string).collect())
                .unwrap_or_default(),
        });
    }

    if events.is_empty() && skipped > 0 {
        return Err(GanttError::NoValidRows { skipped });
    }
    if events.is_empty() {
        return Err(GanttError::EmptyCsv);
    }

    Ok((events, skipped))
}
