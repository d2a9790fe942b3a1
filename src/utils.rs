use chrono::{NaiveDate, Utc};

/// Converts a dollar amount to whole cents, `None` when it does not fit an `i32`.
pub fn dollars_to_cents(dollars: f64) -> Option<i32> {
    let cents = (dollars * 100.0).round();
    if cents.is_finite() && cents >= i32::MIN as f64 && cents <= i32::MAX as f64 {
        Some(cents as i32)
    } else {
        None
    }
}

pub fn cents_to_dollars(cents: i32) -> f64 {
    cents as f64 / 100.0
}

/// Current UTC calendar date.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_are_rounded_not_truncated() {
        assert_eq!(dollars_to_cents(12.34), Some(1234));
        assert_eq!(dollars_to_cents(0.29), Some(29));
        assert_eq!(dollars_to_cents(50.0), Some(5000));
        assert_eq!(dollars_to_cents(1.005), Some(100));
    }

    #[test]
    fn cents_out_of_range() {
        assert_eq!(dollars_to_cents(1e12), None);
        assert_eq!(dollars_to_cents(f64::INFINITY), None);
    }

    #[test]
    fn cents_back_to_dollars() {
        assert_eq!(cents_to_dollars(1234), 12.34);
    }
}
