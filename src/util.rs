// Utility helpers for parsing cell text and formatting numbers.
//
// Spreadsheet exports are inconsistent about how they store numbers (plain
// floats, text with thousands separators, zero-padded hours). Everything
// that turns a loose cell value into a typed one lives here.
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in exports (commas, spaces).
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Normalize an hour-of-day written as text ("08", " 8", "8.0") to its
/// integer value. Anything outside 0..=23 or with a fractional part is
/// rejected.
pub fn normalize_hour(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(h) = s.parse::<u32>() {
        return (h <= 23).then_some(h);
    }
    // Text exports of float columns come through as "8.0".
    let f = s.parse::<f64>().ok()?;
    hour_from_f64(f)
}

pub fn hour_from_f64(f: f64) -> Option<u32> {
    if !f.is_finite() || f.fract() != 0.0 || !(0.0..=23.0).contains(&f) {
        return None;
    }
    Some(f as u32)
}

/// Render a numeric cell for use as an identifier: whole numbers lose
/// their `.0` so `1.0` and `"1"` name the same order.
pub fn canonical_number(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimal places plus locale thousands separators, `1,234,567.89`.
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_with_separators() {
        assert_eq!(parse_f64_safe(Some(" 1,234.50 ")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("-12")), Some(-12.0));
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(Some("12 THB")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn hours_normalize_to_the_same_value() {
        assert_eq!(normalize_hour("08"), Some(8));
        assert_eq!(normalize_hour(" 8 "), Some(8));
        assert_eq!(normalize_hour("8.0"), Some(8));
        assert_eq!(normalize_hour("0"), Some(0));
        assert_eq!(hour_from_f64(8.0), Some(8));
    }

    #[test]
    fn malformed_hours_are_rejected() {
        assert_eq!(normalize_hour("8:30"), None);
        assert_eq!(normalize_hour("24"), None);
        assert_eq!(normalize_hour("8.5"), None);
        assert_eq!(normalize_hour("-1"), None);
        assert_eq!(normalize_hour("eight"), None);
        assert_eq!(hour_from_f64(f64::NAN), None);
    }

    #[test]
    fn canonical_number_drops_trailing_zero() {
        assert_eq!(canonical_number(1.0), "1");
        assert_eq!(canonical_number(1042.0), "1042");
        assert_eq!(canonical_number(2.5), "2.5");
    }

    #[test]
    fn formats_with_thousands_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-1500.0, 0), "-1,500");
        assert_eq!(format_number(0.0, 2), "0.00");
        assert_eq!(format_int(9855), "9,855");
    }
}
