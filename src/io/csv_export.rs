use crate::error::{GanttError, Result};
use crate::model::Event;
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::Path;

/// RFC 3339 in UTC, keeping sub-second digits left by drags.
fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn join_details(event: &Event) -> String {
    event
        .detail_content
        .iter()
        .map(|item| format!("{}={}", item.label, item.value))
        .collect::<Vec<_>>()
        .join("|")
}

/// Export events to a semicolon-delimited CSV file matching the import format.
///
/// Columns: Id ; Title ; Start ; End ; Tags ; Color ; Details
/// Times are written in UTC. Returns the number of events written.
pub fn export_csv(events: &[Event], path: &Path) -> Result<usize> {
    let file = std::fs::File::create(path).map_err(|e| GanttError::io(path, e))?;
    write_csv(events, file)
}

pub fn write_csv<W: std::io::Write>(events: &[Event], writer: W) -> Result<usize> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_writer(writer);

    wtr.write_record(["Id", "Title", "Start", "End", "Tags", "Color", "Details"])?;

    for event in events {
        let start = format_time(event.start_time);
        let end = format_time(event.end_time);
        let tags = event.lookup_tags.join("|");
        let details = join_details(event);
        wtr.write_record([
            event.id.as_str(),
            event.title.as_str(),
            start.as_str(),
            end.as_str(),
            tags.as_str(),
            event.style.bg.as_str(),
            details.as_str(),
        ])?;
    }

    wtr.flush().map_err(|e| GanttError::Csv(e.into()))?;
    Ok(events.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::csv_import::import_csv_str;
    use crate::model::Schedule;
    use chrono::{Duration, TimeZone};

    #[test]
    fn exported_file_reads_back() {
        let now = Utc.with_ymd_and_hms(2020, 3, 14, 19, 56, 24).unwrap();
        let events = Schedule::sample(now).events;

        let mut buffer = Vec::new();
        assert_eq!(write_csv(&events, &mut buffer).unwrap(), 3);

        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("Id;Title;Start;End;Tags;Color;Details"));
        let (imported, skipped) = import_csv_str(&text).unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(imported, events);
    }

    #[test]
    fn sub_second_times_survive_export() {
        let now = Utc.with_ymd_and_hms(2020, 3, 14, 19, 56, 24).unwrap();
        let mut events = Schedule::sample(now).events;
        events[0].start_time += Duration::nanoseconds(142_857_178);
        events[0].end_time += Duration::milliseconds(250);

        let mut buffer = Vec::new();
        write_csv(&events, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains(".142857178Z"));

        let (imported, _) = import_csv_str(&text).unwrap();
        assert_eq!(imported, events);
    }
}
