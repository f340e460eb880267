//! Number formatting helpers.

use std::fmt::Display;

const FILE_SIZE_UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Left-pads the string form of `value` with `0` up to `width` characters.
pub fn pad_start_zero(value: impl Display, width: usize) -> String {
    format!("{:0>width$}", value.to_string())
}

fn plain(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let inf = if value > 0.0 { "Infinity" } else { "-Infinity" };
        inf.to_string()
    } else {
        format!("{value}")
    }
}

/// Formats `value` with exactly `decimals` fraction digits, rounding half up.
///
/// Rounding is done on the shortest decimal representation of `value`, so
/// `1.005` rounds to `1.01` even though the nearest double is slightly below
/// it. Negative values round away from zero. `decimals` outside `0..=20`
/// returns the plain string form of `value`.
pub fn to_fixed(value: f64, decimals: i32) -> String {
    if !(0..=20).contains(&decimals) || !value.is_finite() {
        if value.is_finite() {
            log::debug!("to_fixed: {decimals} decimals out of range, returning value as-is");
        }
        return plain(value);
    }

    let places = decimals as usize;
    let repr = format!("{}", value.abs());
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().chain(std::iter::repeat(b'0')).take(places))
        .map(|b| b - b'0')
        .collect();

    let round_up = frac_part.as_bytes().get(places).is_some_and(|&b| b >= b'5');
    if round_up {
        let mut carry = true;
        for d in digits.iter_mut().rev() {
            if *d == 9 {
                *d = 0;
            } else {
                *d += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, 1);
        }
    }

    let split = digits.len() - places;
    let mut out = String::with_capacity(digits.len() + 2);
    if value < 0.0 {
        out.push('-');
    }
    out.extend(digits[..split].iter().map(|d| char::from(b'0' + d)));
    if places > 0 {
        out.push('.');
        out.extend(digits[split..].iter().map(|d| char::from(b'0' + d)));
    }
    out
}

/// Human readable size, e.g. `1536` → `1.50KB`. `decimals` defaults to 2.
pub fn format_file_size(bytes: f64, decimals: Option<i32>) -> String {
    let mut size = bytes;
    let mut unit = 0;
    while size >= 1024.0 && unit < FILE_SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{}{}", to_fixed(size, decimals.unwrap_or(2)), FILE_SIZE_UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_to_width() {
        assert_eq!(pad_start_zero(7, 2), "07");
        assert_eq!(pad_start_zero(7, 4), "0007");
        assert_eq!(pad_start_zero(123, 2), "123");
        assert_eq!(pad_start_zero("ab", 3), "0ab");
    }

    #[test]
    fn to_fixed_rounds_half_up() {
        assert_eq!(to_fixed(1.005, 2), "1.01");
        assert_eq!(to_fixed(1.45, 1), "1.5");
        assert_eq!(to_fixed(2.5, 0), "3");
        assert_eq!(to_fixed(1.004, 2), "1.00");
        assert_eq!(to_fixed(9.995, 2), "10.00");
        assert_eq!(to_fixed(99.5, 0), "100");
    }

    #[test]
    fn to_fixed_pads_and_signs() {
        assert_eq!(to_fixed(3.0, 2), "3.00");
        assert_eq!(to_fixed(0.1, 3), "0.100");
        assert_eq!(to_fixed(-1.005, 2), "-1.01");
        assert_eq!(to_fixed(-0.0, 1), "0.0");
        assert_eq!(to_fixed(0.000001, 2), "0.00");
    }

    #[test]
    fn to_fixed_out_of_range_returns_value() {
        assert_eq!(to_fixed(1.25, 21), "1.25");
        assert_eq!(to_fixed(1.25, -1), "1.25");
        assert_eq!(to_fixed(f64::NAN, 2), "NaN");
        assert_eq!(to_fixed(f64::NEG_INFINITY, 2), "-Infinity");
    }

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(0.0, None), "0.00B");
        assert_eq!(format_file_size(1023.0, None), "1023.00B");
        assert_eq!(format_file_size(1024.0, None), "1.00KB");
        assert_eq!(format_file_size(1536.0, Some(1)), "1.5KB");
        assert_eq!(format_file_size(5.0 * 1024.0 * 1024.0 * 1024.0, Some(0)), "5GB");
    }
}
