/// Playback position split into whole loops and progress within the current loop.
///
/// Normalized time from the host is `loops_completed + fraction`. The split is
/// done once with an explicit `floor` so loop count and fraction always agree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopPosition {
    /// Integer part of normalized time.
    pub loop_count: u32,
    /// Fractional part of normalized time, in [0, 1).
    pub fraction: f32,
}

impl LoopPosition {
    pub fn from_normalized(normalized_time: f32) -> Self {
        let t = sanitize_normalized(normalized_time);
        let whole = t.floor();
        let fraction = (t - whole).clamp(0.0, 1.0 - f32::EPSILON);
        Self {
            loop_count: whole as u32,
            fraction,
        }
    }

    /// Position inside the current loop in the units of the requested offset:
    /// normalized fraction, or seconds for a state of `length` seconds.
    pub fn position(&self, use_normalized_time: bool, length: f32) -> f32 {
        if use_normalized_time {
            self.fraction
        } else if length > 0.0 && length.is_finite() {
            self.fraction * length
        } else {
            0.0
        }
    }
}

/// Negative and non-finite normalized times are treated as the start of playback.
pub fn sanitize_normalized(normalized_time: f32) -> f32 {
    if normalized_time.is_finite() && normalized_time > 0.0 {
        normalized_time
    } else {
        0.0
    }
}

/// Reduce a trigger offset into a single loop: modulo 1.0 for normalized
/// offsets, modulo the state length for offsets in seconds.
pub fn wrap_offset(offset: f32, use_normalized_time: bool, length: f32) -> f32 {
    let period = if use_normalized_time { 1.0 } else { length };
    if period > 0.0 && period.is_finite() {
        offset.rem_euclid(period)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_just_below_integer_boundary() {
        let pos = LoopPosition::from_normalized(0.999_999);
        assert_eq!(pos.loop_count, 0);
        assert!(pos.fraction > 0.99);
    }

    #[test]
    fn floor_just_above_integer_boundary() {
        let pos = LoopPosition::from_normalized(1.000_001);
        assert_eq!(pos.loop_count, 1);
        assert!(pos.fraction < 0.01);
    }

    #[test]
    fn exact_integer_starts_new_loop() {
        let pos = LoopPosition::from_normalized(2.0);
        assert_eq!(pos.loop_count, 2);
        assert_eq!(pos.fraction, 0.0);
    }

    #[test]
    fn negative_and_nan_clamp_to_start() {
        assert_eq!(LoopPosition::from_normalized(-0.5).loop_count, 0);
        assert_eq!(LoopPosition::from_normalized(f32::NAN).fraction, 0.0);
        assert_eq!(LoopPosition::from_normalized(f32::INFINITY).loop_count, 0);
    }

    #[test]
    fn absolute_position_scales_by_length() {
        let pos = LoopPosition::from_normalized(1.25);
        assert!((pos.position(false, 2.0) - 0.5).abs() < 1e-6);
        assert!((pos.position(true, 2.0) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn zero_length_has_no_absolute_position() {
        let pos = LoopPosition::from_normalized(0.5);
        assert_eq!(pos.position(false, 0.0), 0.0);
    }

    #[test]
    fn offsets_wrap_into_one_loop() {
        assert!((wrap_offset(1.25, true, 3.0) - 0.25).abs() < 1e-6);
        assert!((wrap_offset(2.5, false, 2.0) - 0.5).abs() < 1e-6);
        assert_eq!(wrap_offset(0.4, true, 0.0), 0.4);
        assert_eq!(wrap_offset(0.4, false, 0.0), 0.0);
    }
}
