//! Decimal-comma number parsing for product page text.

use super::ExtractionError;

/// Parse a price like `Kr 299,90` into øre.
///
/// Everything before the first digit is ignored. The decimal separator is
/// `,`, or a final `.` followed by one or two digits. Spaces, no-break
/// spaces and any other `.` in the whole part are thousands separators. A
/// missing decimal part means whole kroner.
pub fn parse_price(text: &str) -> Result<i64, ExtractionError> {
    let invalid = || ExtractionError::InvalidNumber {
        field: "price",
        text: text.to_string(),
    };

    let start = text.find(|c: char| c.is_ascii_digit()).ok_or_else(invalid)?;
    let number = text[start..].trim_end_matches(|c: char| !c.is_ascii_digit());

    let (whole, fraction) = match number.split_once(',') {
        Some((whole, fraction)) => (whole, fraction),
        None => match number.rsplit_once('.') {
            Some((whole, fraction)) if (1..=2).contains(&fraction.len()) => (whole, fraction),
            _ => (number, ""),
        },
    };

    let whole: String = whole
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}' | '.'))
        .collect();
    if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let kroner: i64 = whole.parse().map_err(|_| invalid())?;
    let ore: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
        _ => fraction[..2].parse().map_err(|_| invalid())?,
    };

    kroner
        .checked_mul(100)
        .and_then(|v| v.checked_add(ore))
        .ok_or_else(invalid)
}

/// Parse a decimal-comma quantity into a fixed-point integer scaled by 10.
///
/// Takes the first whitespace-separated token, drops a trailing `%`, and
/// truncates digits past the first decimal: `13,5 %` is 135, `750 ml` is
/// 7500, `0,75 l` is 7.
pub fn parse_tenths(field: &'static str, text: &str) -> Result<i32, ExtractionError> {
    let invalid = || ExtractionError::InvalidNumber {
        field,
        text: text.to_string(),
    };

    let token = text.split_whitespace().next().ok_or_else(invalid)?;
    let token = token.trim_end_matches('%');

    let (whole, fraction) = match token.split_once([',', '.']) {
        Some((whole, fraction)) => (whole, fraction),
        None => (token, ""),
    };
    if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole: i32 = whole.parse().map_err(|_| invalid())?;
    let tenth = fraction
        .chars()
        .next()
        .and_then(|c| c.to_digit(10))
        .unwrap_or(0) as i32;

    whole
        .checked_mul(10)
        .and_then(|v| v.checked_add(tenth))
        .ok_or_else(invalid)
}
