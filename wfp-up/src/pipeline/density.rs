//! Output density planning

/// Durations below this are treated as unknown (half the parser's resolution)
pub const MIN_DURATION_SECS: f64 = 0.0005;

/// Samples-per-second for the data pass
///
/// `max(1, round(target / duration))`. A duration that is not finite or
/// below [`MIN_DURATION_SECS`] yields exactly 1, so planning never divides by
/// zero and never fails.
pub fn planned_density(duration_secs: f64, target_peak_count: u32) -> u32 {
    if !duration_secs.is_finite() || duration_secs < MIN_DURATION_SECS {
        return 1;
    }
    let raw = (f64::from(target_peak_count) / duration_secs).round();
    raw.clamp(1.0, f64::from(u32::MAX)) as u32
}
