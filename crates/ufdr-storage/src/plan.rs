//! Part planning for multipart uploads.

use ufdr_core::AppError;

/// The effective split for one upload: every part is `part_size` bytes
/// except possibly the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartPlan {
    pub part_size: i64,
    pub total_parts: i32,
}

fn ceil_div(a: i64, b: i64) -> i64 {
    (a + b - 1) / b
}

/// Choose a part size so the upload fits under the part-count cap.
///
/// A client-requested part size (or the configured default) is honored
/// unless it would need more than `max_parts` parts, in which case the
/// part size grows to the smallest value that fits. Rejection happens
/// here, before any store call is made.
pub fn plan_parts(
    size: i64,
    requested_part_size: Option<i64>,
    default_part_size: i64,
    max_parts: i64,
) -> Result<PartPlan, AppError> {
    if size <= 0 {
        // Zero-byte (or undeclared-size) uploads still need one part.
        return Ok(PartPlan {
            part_size: default_part_size,
            total_parts: 1,
        });
    }

    let mut part_size = match requested_part_size {
        Some(requested) if requested > 0 => requested,
        _ => default_part_size,
    };

    if ceil_div(size, part_size) > max_parts {
        part_size = ceil_div(size, max_parts);
    }

    let total_parts = ceil_div(size, part_size);
    if total_parts > max_parts {
        return Err(AppError::Capacity(format!(
            "file of {size} bytes requires {total_parts} parts (limit {max_parts})"
        )));
    }
    if total_parts > i32::MAX as i64 {
        return Err(AppError::Capacity(format!(
            "part count {total_parts} does not fit the protocol"
        )));
    }

    Ok(PartPlan {
        part_size,
        total_parts: total_parts as i32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: i64 = 1024 * 1024;
    const DEFAULT: i64 = 64 * MIB;
    const MAX: i64 = 10_000;

    #[test]
    fn total_parts_is_ceiling_of_size_over_part_size() {
        let plan = plan_parts(200 * MIB, None, DEFAULT, MAX).unwrap();
        assert_eq!(plan.part_size, DEFAULT);
        assert_eq!(plan.total_parts, 4); // ceil(200/64)

        let plan = plan_parts(128 * MIB, None, DEFAULT, MAX).unwrap();
        assert_eq!(plan.total_parts, 2);
    }

    #[test]
    fn requested_part_size_is_honored() {
        let plan = plan_parts(100 * MIB, Some(10 * MIB), DEFAULT, MAX).unwrap();
        assert_eq!(plan.part_size, 10 * MIB);
        assert_eq!(plan.total_parts, 10);
    }

    #[test]
    fn non_positive_requested_size_falls_back_to_default() {
        let plan = plan_parts(64 * MIB, Some(0), DEFAULT, MAX).unwrap();
        assert_eq!(plan.part_size, DEFAULT);
        assert_eq!(plan.total_parts, 1);
    }

    #[test]
    fn part_size_grows_when_default_would_exceed_cap() {
        // 10 GiB at 1 MiB parts would need 10240 parts; cap is 10000.
        let size = 10 * 1024 * MIB;
        let plan = plan_parts(size, Some(MIB), DEFAULT, MAX).unwrap();
        assert!(plan.part_size > MIB);
        assert_eq!(plan.part_size, ceil_div(size, MAX));
        assert!((plan.total_parts as i64) <= MAX);
        // The grown plan still covers the whole object.
        assert!(plan.part_size * plan.total_parts as i64 >= size);
    }

    #[test]
    fn zero_size_plans_one_part() {
        let plan = plan_parts(0, None, DEFAULT, MAX).unwrap();
        assert_eq!(plan.total_parts, 1);
    }

    #[test]
    fn exact_multiple_has_no_trailing_part() {
        let plan = plan_parts(640 * MIB, None, DEFAULT, MAX).unwrap();
        assert_eq!(plan.total_parts, 10);
    }
}
