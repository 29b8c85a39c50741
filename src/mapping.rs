//! Linear range mapping from meter readings to scene-space values.

/// Map `value` from `[in_min, in_max]` onto `[out_min, out_max]`.
///
/// No clamping: inputs outside the source range extrapolate past the target
/// range, so loud peaks above `in_max` overshoot `out_max`.
///
/// A degenerate input range (`in_min == in_max`) yields a non-finite result,
/// exactly like the underlying formula.
pub fn map_linear(value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    out_min + (value - in_min) * (out_max - out_min) / (in_max - in_min)
}
