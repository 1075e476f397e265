use chrono::{DateTime, Datelike, Duration, NaiveDateTime, TimeZone, Timelike, Utc};

use super::timeline::TimeScale;

/// Distance between two ticks of the time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickSpacing {
    Hours(u32),
    Minutes(u32),
}

impl TickSpacing {
    fn minutes(self) -> u32 {
        match self {
            TickSpacing::Hours(h) => h * 60,
            TickSpacing::Minutes(m) => m,
        }
    }
}

/// Gauge (pixels per hour) upper bounds and the spacing used below them.
const GAUGE_TO_SPACING: &[(f64, TickSpacing)] = &[
    (4.0, TickSpacing::Hours(12)),
    (20.0, TickSpacing::Hours(6)),
    (30.0, TickSpacing::Hours(2)),
    (60.0, TickSpacing::Hours(1)),
    (120.0, TickSpacing::Minutes(30)),
    (420.0, TickSpacing::Minutes(15)),
];

pub fn tick_spacing(scale: &TimeScale) -> TickSpacing {
    let gauge = scale.pixels_per_hour();
    GAUGE_TO_SPACING
        .iter()
        .find(|(max_gauge, _)| gauge < *max_gauge)
        .map(|(_, spacing)| *spacing)
        .unwrap_or(TickSpacing::Minutes(5))
}

/// Tick instants in `[lo, hi]`, aligned on `spacing` in the wall clock of `tz`.
pub fn ticks<Tz: TimeZone>(
    lo: DateTime<Utc>,
    hi: DateTime<Utc>,
    spacing: TickSpacing,
    tz: &Tz,
) -> Vec<DateTime<Utc>> {
    let step = spacing.minutes().max(1);
    let local = lo.with_timezone(tz).naive_local();
    let minute_of_day = local.hour() * 60 + local.minute();
    let aligned = minute_of_day - minute_of_day % step;
    let Some(mut cursor) = local
        .date()
        .and_hms_opt(aligned / 60, aligned % 60, 0)
    else {
        return Vec::new();
    };

    let mut out = Vec::new();
    // Bounded so a degenerate scale can't spin forever.
    for _ in 0..2_000 {
        if let Some(instant) = tz.from_local_datetime(&cursor).earliest() {
            let instant = instant.with_timezone(&Utc);
            if instant > hi {
                break;
            }
            if instant >= lo {
                out.push(instant);
            }
        }
        cursor += Duration::minutes(step as i64);
    }
    out
}

/// Label drawn under a tick, possibly empty, for the current zoom level.
pub fn tick_label(gauge: f64, x: NaiveDateTime) -> String {
    let at_noon = x.hour() == 12;
    let every_hours = |n: u32| x.hour() % n == 0;
    let hour_minute = || x.format("%H:%M").to_string();
    let date = || x.format("%d %b %y").to_string();

    let label = if gauge < 2.5 {
        (x.day() % 2 == 0 && at_noon).then(date)
    } else if gauge < 5.0 {
        at_noon.then(date)
    } else if gauge < 30.0 {
        if at_noon {
            Some(date())
        } else {
            every_hours(6).then(hour_minute)
        }
    } else if gauge < 60.0 {
        every_hours(2).then(hour_minute)
    } else if gauge < 120.0 {
        every_hours(1).then(hour_minute)
    } else if gauge < 420.0 {
        (x.minute() % 30 == 0).then(hour_minute)
    } else {
        Some(hour_minute())
    };
    label.unwrap_or_default()
}

/// `Sat March 14th 2020 at 06:00`
pub fn full_date_time(x: NaiveDateTime) -> String {
    format!(
        "{}{} {}",
        x.format("%a %B %d"),
        ordinal_suffix(x.day()),
        x.format("%Y at %H:%M")
    )
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 14, h, m, 0).unwrap()
    }

    fn naive(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 3, day)
            .and_then(|d| d.and_hms_opt(h, m, 0))
            .unwrap()
    }

    #[test]
    fn spacing_follows_the_gauge() {
        let hours = |h: i64, width: f64| {
            tick_spacing(&TimeScale::new((at(0, 0), at(0, 0) + Duration::hours(h)), (0.0, width)))
        };
        assert_eq!(hours(48, 96.0), TickSpacing::Hours(12));
        assert_eq!(hours(2, 200.0), TickSpacing::Minutes(30));
        assert_eq!(hours(1, 300.0), TickSpacing::Minutes(15));
        assert_eq!(hours(1, 1_000.0), TickSpacing::Minutes(5));
    }

    #[test]
    fn ticks_are_aligned_and_bounded() {
        let ticks = ticks(at(6, 7), at(7, 0), TickSpacing::Minutes(15), &Utc);
        assert_eq!(ticks, vec![at(6, 15), at(6, 30), at(6, 45), at(7, 0)]);
    }

    #[test]
    fn hour_ticks_skip_partial_first_slot() {
        let ticks = ticks(at(5, 30), at(12, 0), TickSpacing::Hours(6), &Utc);
        assert_eq!(ticks, vec![at(6, 0), at(12, 0)]);
    }

    #[test]
    fn labels_depend_on_zoom_level() {
        assert_eq!(tick_label(1_000.0, naive(14, 6, 5)), "06:05");
        assert_eq!(tick_label(200.0, naive(14, 6, 15)), "");
        assert_eq!(tick_label(200.0, naive(14, 6, 30)), "06:30");
        assert_eq!(tick_label(10.0, naive(14, 12, 0)), "14 Mar 20");
        assert_eq!(tick_label(10.0, naive(14, 18, 0)), "18:00");
        assert_eq!(tick_label(2.0, naive(13, 12, 0)), "");
    }

    #[test]
    fn full_date_uses_english_ordinals() {
        assert_eq!(full_date_time(naive(14, 6, 0)), "Sat March 14th 2020 at 06:00");
        assert_eq!(full_date_time(naive(1, 9, 5)), "Sun March 01st 2020 at 09:05");
        assert_eq!(full_date_time(naive(22, 23, 59)), "Sun March 22nd 2020 at 23:59");
        assert_eq!(full_date_time(naive(12, 0, 0)), "Thu March 12th 2020 at 00:00");
    }
}
