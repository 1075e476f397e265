use chrono::{DateTime, Duration, Local, Utc};

use super::timeline::{TimeScale, ZoomTransform};

/// Single authority for time ↔ pixel conversion of one chart.
///
/// Holds a base [`TimeScale`] and the zoom transform of the gesture in
/// flight (or the offset it left behind). Resizing folds the transform into
/// the base so later queries with an identity transform stay correct.
#[derive(Debug, Clone)]
pub struct ScaleManager {
    scale: TimeScale,
    transform: Option<ZoomTransform>,
}

impl Default for ScaleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ScaleManager {
    /// A manager whose domain covers the current local day.
    pub fn new() -> Self {
        Self::with_domain(today(), (0.0, 1.0))
    }

    pub fn with_domain(domain: (DateTime<Utc>, DateTime<Utc>), range: (f64, f64)) -> Self {
        Self {
            scale: TimeScale::new(domain, range),
            transform: None,
        }
    }

    /// Effective scale: the base scale viewed through the active transform.
    pub fn get(&self) -> TimeScale {
        match &self.transform {
            Some(transform) => transform.rescale(&self.scale),
            None => self.scale,
        }
    }

    /// Active transform, identity when no zoom is in effect.
    pub fn transform(&self) -> ZoomTransform {
        self.transform.unwrap_or_default()
    }

    /// Replace the active transform. Every frame of a gesture passes the
    /// full transform relative to the base scale, so intermediate calls
    /// never compound.
    pub fn zoom(&mut self, transform: ZoomTransform) {
        self.transform = Some(transform);
    }

    /// Update the pixel range, baking any active transform into the base
    /// scale first.
    pub fn resize(&mut self, range: (f64, f64)) {
        if let Some(transform) = self.transform.take() {
            self.scale = transform.rescale(&self.scale);
        }
        self.scale.set_range(range);
    }

    /// Replace the time domain. Drops any active transform.
    pub fn set_domain(&mut self, domain: (DateTime<Utc>, DateTime<Utc>)) {
        self.transform = None;
        self.scale.set_domain(domain);
    }

    /// Time window visible across the current pixel range.
    pub fn get_time_boundaries(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let scale = self.get();
        let (r0, r1) = scale.range();
        (scale.invert(r0), scale.invert(r1))
    }
}

/// Start and end of the current local day.
fn today() -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Local::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .map(|midnight| midnight.with_timezone(&Utc))
        .unwrap_or_else(|| Utc::now() - Duration::hours(12));
    (start, start + Duration::days(1) - Duration::milliseconds(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 14, h, m, 0).unwrap()
    }

    fn manager() -> ScaleManager {
        ScaleManager::with_domain((at(6, 0), at(8, 0)), (0.0, 200.0))
    }

    fn close(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        (a - b).num_microseconds().map_or(false, |us| us.abs() < 1_000)
    }

    #[test]
    fn maps_the_midpoint_of_the_domain() {
        assert_eq!(manager().get().apply(at(7, 0)), 100.0);
    }

    #[test]
    fn zoom_around_center_reports_a_one_hour_window() {
        let mut scale = manager();
        scale.zoom(ZoomTransform::identity().scaled_around(2.0, 100.0));
        let (start, end) = scale.get_time_boundaries();
        assert_eq!(end - start, Duration::hours(1));
        assert_eq!(start, at(6, 30));
        assert_eq!(end, at(7, 30));
    }

    #[test]
    fn resize_without_zoom_maps_domain_onto_new_range() {
        let mut scale = manager();
        scale.resize((0.0, 640.0));
        let effective = scale.get();
        assert_eq!(effective.apply(at(6, 0)), 0.0);
        assert_eq!(effective.apply(at(8, 0)), 640.0);
    }

    #[test]
    fn resize_bakes_the_active_transform() {
        let mut scale = manager();
        scale.zoom(ZoomTransform::new(2.0, -100.0));
        let zoomed = scale.get();

        scale.resize((0.0, 200.0));
        assert_eq!(scale.transform(), ZoomTransform::identity());
        let baked = scale.get();
        for minute in [30, 45, 60, 75, 90] {
            let t = at(6, 0) + Duration::minutes(minute);
            assert!((baked.apply(t) - zoomed.apply(t)).abs() < 1e-6);
        }
    }

    #[test]
    fn each_zoom_call_replaces_the_previous_one() {
        let t1 = ZoomTransform::new(3.0, -40.0);
        let t2 = ZoomTransform::new(1.5, 25.0);

        let mut twice = manager();
        twice.zoom(t1);
        twice.zoom(t2);

        let mut once = manager();
        once.zoom(t2);

        assert_eq!(twice.get(), once.get());
    }

    #[test]
    fn set_domain_clears_the_transform() {
        let mut scale = manager();
        scale.zoom(ZoomTransform::new(2.0, 0.0));
        scale.set_domain((at(9, 0), at(10, 0)));
        assert_eq!(scale.transform(), ZoomTransform::identity());
        assert_eq!(scale.get().apply(at(9, 30)), 100.0);
    }

    #[test]
    fn default_domain_covers_a_day() {
        let scale = ScaleManager::new();
        let (start, end) = scale.get().domain();
        assert_eq!(end - start + Duration::milliseconds(1), Duration::days(1));
    }

    proptest! {
        #[test]
        fn round_trip_stays_within_a_millisecond(
            offset_ms in 0i64..7_200_000,
            k in 0.06f64..6.0,
            x in -500.0f64..500.0,
            zoomed in any::<bool>(),
        ) {
            let mut scale = manager();
            if zoomed {
                scale.zoom(ZoomTransform::new(k, x));
            }
            let t = at(6, 0) + Duration::milliseconds(offset_ms);
            let effective = scale.get();
            prop_assert!(close(effective.invert(effective.apply(t)), t));
        }
    }
}
