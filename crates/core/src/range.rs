//! Increment-with-wraparound for the user-adjustable settings.

/// Add `delta` to `value`, wrapping once into the inclusive range `[low, high]`.
///
/// This is a single wraparound correction, not a modulo: it is only valid
/// while `|delta| <= high - low + 1`. The sum is taken in a wider type, so a
/// decrement below a `low` of zero wraps to `high` instead of through `u8::MAX`.
pub fn wrap_increment(value: u8, delta: i8, low: u8, high: u8) -> u8 {
    debug_assert!(low <= high);
    let range = i16::from(high) - i16::from(low) + 1;
    debug_assert!(i16::from(delta).abs() <= range, "delta {} exceeds range {}", delta, range);

    let mut changed = i16::from(value) + i16::from(delta);
    if changed < i16::from(low) {
        changed += range;
    } else if changed > i16::from(high) {
        changed -= range;
    }
    changed.clamp(i16::from(low), i16::from(high)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_delta_is_idempotent() {
        for v in 30..=254u8 {
            let once = wrap_increment(v, 0, 30, 254);
            assert_eq!(once, v);
            assert_eq!(wrap_increment(once, 0, 30, 254), v);
        }
    }

    #[test]
    fn test_up_then_down_interior() {
        for v in 1..16u8 {
            assert_eq!(wrap_increment(wrap_increment(v, 1, 0, 16), -1, 0, 16), v);
        }
    }

    #[test]
    fn test_wraps_at_boundaries() {
        assert_eq!(wrap_increment(254, 1, 30, 254), 30);
        assert_eq!(wrap_increment(30, -1, 30, 254), 254);
        assert_eq!(wrap_increment(6, 1, 1, 6), 1);
        assert_eq!(wrap_increment(1, -1, 1, 6), 6);
    }

    #[test]
    fn test_decrement_from_zero_low() {
        // 0 - 1 would be 255 in 8-bit wrapping arithmetic
        assert_eq!(wrap_increment(0, -1, 0, 16), 16);
        assert_eq!(wrap_increment(16, 1, 0, 16), 0);
    }

    #[test]
    fn test_result_always_in_range() {
        for v in 0..=16u8 {
            for d in -17..=17i8 {
                let r = wrap_increment(v, d, 0, 16);
                assert!(r <= 16, "{} + {} -> {}", v, d, r);
            }
        }
    }
}
