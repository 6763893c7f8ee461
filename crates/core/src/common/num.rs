//! 数值类型之间的显式转换。
//!
//! 工作区禁止裸 `as` 强转，需要跨越整数与浮点的地方统一走这里。

/// 2^63，`i64` 可表示范围的上界 (不含)
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// 2^64，`u64` 可表示范围的上界 (不含)
const U64_BOUND: f64 = 18_446_744_073_709_551_616.0;

/// # Summary
/// 行数、窗口长度等计数转为浮点数。
///
/// # Invariants
/// - 计数远小于 2^53，转换是精确的。
#[allow(clippy::cast_precision_loss)]
pub fn count_to_f64(n: usize) -> f64 {
    n as f64
}

/// 四舍五入到最近的 `i64`，非有限值或越界时返回 None。
#[allow(clippy::cast_possible_truncation)]
pub fn round_to_i64(v: f64) -> Option<i64> {
    let r = v.round();
    (r.is_finite() && (-I64_BOUND..I64_BOUND).contains(&r)).then_some(r as i64)
}

/// 向下取整到 `u64`，负数截为 0，非有限值或越界时返回 None。
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn floor_to_u64(v: f64) -> Option<u64> {
    if !v.is_finite() {
        return None;
    }
    let f = v.floor().max(0.0);
    (f < U64_BOUND).then_some(f as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_to_f64() {
        assert_eq!(count_to_f64(0), 0.0);
        assert_eq!(count_to_f64(1_000_000), 1_000_000.0);
    }

    #[test]
    fn test_round_to_i64() {
        assert_eq!(round_to_i64(1_700_000_000_000.4), Some(1_700_000_000_000));
        assert_eq!(round_to_i64(-2.5), Some(-3));
        assert_eq!(round_to_i64(f64::NAN), None);
        assert_eq!(round_to_i64(f64::INFINITY), None);
        assert_eq!(round_to_i64(1e19), None);
    }

    #[test]
    fn test_floor_to_u64() {
        assert_eq!(floor_to_u64(79.9), Some(79));
        assert_eq!(floor_to_u64(-3.0), Some(0));
        assert_eq!(floor_to_u64(f64::NAN), None);
        assert_eq!(floor_to_u64(2e19), None);
    }
}
