use chrono::{DateTime, TimeZone, Utc};

/// Narrowest time domain (in milliseconds) a scale accepts. Narrower domains
/// are widened around their midpoint.
pub const MIN_DOMAIN_SPAN_MS: f64 = 60_000.0;

/// Milliseconds since the epoch as a continuous value.
pub fn to_millis(time: DateTime<Utc>) -> f64 {
    let sub_millis = time.timestamp_subsec_nanos() % 1_000_000;
    time.timestamp_millis() as f64 + sub_millis as f64 / 1_000_000.0
}

/// Inverse of [`to_millis`], rounded to the nearest nanosecond.
pub fn from_millis(millis: f64) -> DateTime<Utc> {
    let whole = millis.floor();
    let nanos = ((millis - whole) * 1_000_000.0).round() as i64;
    Utc.timestamp_nanos((whole as i64).saturating_mul(1_000_000).saturating_add(nanos))
}

/// Continuous, invertible, strictly increasing map from time to pixel x.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl TimeScale {
    pub fn new(domain: (DateTime<Utc>, DateTime<Utc>), range: (f64, f64)) -> Self {
        let mut scale = Self {
            domain: (0.0, 1.0),
            range,
        };
        scale.set_domain(domain);
        scale
    }

    pub fn domain(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (from_millis(self.domain.0), from_millis(self.domain.1))
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub fn set_domain(&mut self, (start, end): (DateTime<Utc>, DateTime<Utc>)) {
        let (mut lo, mut hi) = (to_millis(start.min(end)), to_millis(start.max(end)));
        if hi - lo < MIN_DOMAIN_SPAN_MS {
            let mid = (lo + hi) / 2.0;
            lo = mid - MIN_DOMAIN_SPAN_MS / 2.0;
            hi = mid + MIN_DOMAIN_SPAN_MS / 2.0;
        }
        self.domain = (lo, hi);
    }

    pub fn set_range(&mut self, range: (f64, f64)) {
        self.range = range;
    }

    /// Pixel x of a continuous time value.
    pub fn apply_millis(&self, millis: f64) -> f64 {
        let t = (millis - self.domain.0) / (self.domain.1 - self.domain.0);
        self.range.0 + t * (self.range.1 - self.range.0)
    }

    /// Continuous time value under pixel x.
    pub fn invert_millis(&self, x: f64) -> f64 {
        let width = self.range.1 - self.range.0;
        if width == 0.0 {
            return self.domain.0;
        }
        let t = (x - self.range.0) / width;
        self.domain.0 + t * (self.domain.1 - self.domain.0)
    }

    pub fn apply(&self, time: DateTime<Utc>) -> f64 {
        self.apply_millis(to_millis(time))
    }

    pub fn invert(&self, x: f64) -> DateTime<Utc> {
        from_millis(self.invert_millis(x))
    }

    /// Pixel width of one hour at this scale.
    pub fn pixels_per_hour(&self) -> f64 {
        (self.range.1 - self.range.0) * 3_600_000.0 / (self.domain.1 - self.domain.0)
    }
}

/// Translate+scale pair applied on top of a base scale: `p * k + x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomTransform {
    pub k: f64,
    pub x: f64,
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl ZoomTransform {
    pub const fn identity() -> Self {
        Self { k: 1.0, x: 0.0 }
    }

    pub fn new(k: f64, x: f64) -> Self {
        Self { k, x }
    }

    pub fn apply(&self, p: f64) -> f64 {
        p * self.k + self.x
    }

    pub fn invert(&self, p: f64) -> f64 {
        (p - self.x) / self.k
    }

    /// Multiply the zoom by `factor` keeping the pixel under `pivot` fixed.
    pub fn scaled_around(&self, factor: f64, pivot: f64) -> Self {
        let k = self.k * factor;
        let origin = self.invert(pivot);
        Self { k, x: pivot - origin * k }
    }

    pub fn translated(&self, dx: f64) -> Self {
        Self {
            k: self.k,
            x: self.x + dx,
        }
    }

    /// Clamp `k` into `[min, max]` keeping the pixel under `pivot` fixed.
    pub fn clamp_k(&self, min: f64, max: f64, pivot: f64) -> Self {
        let k = self.k.clamp(min, max);
        if k == self.k {
            return *self;
        }
        self.scaled_around(k / self.k, pivot)
    }

    /// The scale obtained by viewing `scale` through this transform.
    pub fn rescale(&self, scale: &TimeScale) -> TimeScale {
        let (r0, r1) = scale.range;
        TimeScale {
            domain: (
                scale.invert_millis(self.invert(r0)),
                scale.invert_millis(self.invert(r1)),
            ),
            range: scale.range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 14, h, m, 0).unwrap()
    }

    fn two_hours() -> TimeScale {
        TimeScale::new((at(6, 0), at(8, 0)), (0.0, 200.0))
    }

    #[test]
    fn maps_domain_bounds_onto_range_bounds() {
        let scale = two_hours();
        assert_eq!(scale.apply(at(6, 0)), 0.0);
        assert_eq!(scale.apply(at(8, 0)), 200.0);
        assert_eq!(scale.apply(at(7, 0)), 100.0);
        assert_eq!(scale.invert(50.0), at(6, 30));
    }

    #[test]
    fn degenerate_domain_is_widened() {
        let scale = TimeScale::new((at(7, 0), at(7, 0)), (0.0, 100.0));
        let (lo, hi) = scale.domain();
        assert_eq!(hi - lo, Duration::minutes(1));
        assert_eq!(scale.apply(at(7, 0)), 50.0);
    }

    #[test]
    fn rescale_by_identity_is_a_no_op() {
        let scale = two_hours();
        assert_eq!(ZoomTransform::identity().rescale(&scale), scale);
    }

    #[test]
    fn scaled_around_keeps_pivot() {
        let t = ZoomTransform::identity().scaled_around(2.0, 100.0);
        assert_eq!(t, ZoomTransform::new(2.0, -100.0));
        assert_eq!(t.apply(100.0), 100.0);

        let rescaled = t.rescale(&two_hours());
        assert_eq!(rescaled.apply(at(7, 0)), 100.0);
        assert_eq!(rescaled.domain(), (at(6, 30), at(7, 30)));
    }

    #[test]
    fn clamp_k_respects_extent() {
        let t = ZoomTransform::new(10.0, 0.0).clamp_k(0.5, 6.0, 40.0);
        assert_eq!(t.k, 6.0);
        let before = ZoomTransform::new(10.0, 0.0).invert(40.0);
        assert!((t.invert(40.0) - before).abs() < 1e-9);
    }

    #[test]
    fn pixels_per_hour_matches_range() {
        assert_eq!(two_hours().pixels_per_hour(), 100.0);
    }
}
