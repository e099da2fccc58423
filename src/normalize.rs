//! pt-BR number parsing: `.` groups thousands, `,` marks decimals.

use crate::error::NumberParseError;

/// Placeholder the ranking page prints for unavailable metrics.
pub const NOT_AVAILABLE: &str = "N/A";

/// `"1.234,56"` → `1234.56`, `"N/A"` → `0.0`.
pub fn parse_locale_number(s: &str) -> Result<f64, NumberParseError> {
    let trimmed = s.trim();
    if trimmed == NOT_AVAILABLE {
        return Ok(0.0);
    }
    parse_float(&to_decimal_point(trimmed), s)
}

/// `"12,34%"` → `0.1234`, `"N/A"` → `0.0`.
pub fn parse_locale_percent(s: &str) -> Result<f64, NumberParseError> {
    let trimmed = s.trim();
    if trimmed == NOT_AVAILABLE {
        return Ok(0.0);
    }
    let cleaned: String = to_decimal_point(trimmed)
        .chars()
        .filter(|&c| c != '%' && c != ' ')
        .collect();
    Ok(parse_float(&cleaned, s)? / 100.0)
}

fn to_decimal_point(s: &str) -> String {
    s.chars()
        .filter(|&c| c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect()
}

// str::parse accepts "inf" and "NaN"; neither is a value the page can mean.
fn parse_float(cleaned: &str, original: &str) -> Result<f64, NumberParseError> {
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(NumberParseError {
            input: original.to_string(),
        }),
    }
}
