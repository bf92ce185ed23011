//! National id (RUT) helpers
//!
//! Ids are stored as entered; lookups compare the cleaned form so that
//! `12.345.678-5`, `12345678-5` and `123456785` all match.

/// Longest cleaned id accepted by the check-in keypad
pub const MAX_INPUT_LEN: usize = 9;

/// Keep only digits and the `K` check digit, upper-cased
pub fn clean(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == 'k' || *c == 'K')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Compute the mod-11 check digit for the numeric body of an id
pub fn check_digit(body: &str) -> Option<char> {
    if body.is_empty() || !body.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let mut sum = 0u32;
    let mut multiplier = 2u32;
    for digit in body.chars().rev().filter_map(|c| c.to_digit(10)) {
        sum += digit * multiplier;
        multiplier = if multiplier == 7 { 2 } else { multiplier + 1 };
    }

    match 11 - (sum % 11) {
        11 => Some('0'),
        10 => Some('K'),
        n => char::from_digit(n, 10),
    }
}

/// Check that an id has a well-formed body and a matching check digit
pub fn is_valid(raw: &str) -> bool {
    let cleaned = clean(raw);
    if cleaned.len() < 7 || cleaned.len() > MAX_INPUT_LEN {
        return false;
    }

    let (body, dv) = cleaned.split_at(cleaned.len() - 1);
    check_digit(body).map(|c| c.to_string()) == Some(dv.to_string())
}

/// Format keypad input as `12.345.678-5`, truncating to the maximum length
pub fn format_input(raw: &str) -> String {
    let mut cleaned = clean(raw);
    cleaned.truncate(MAX_INPUT_LEN);
    if cleaned.len() < 2 {
        return cleaned;
    }

    let (body, dv) = cleaned.split_at(cleaned.len() - 1);
    let mut grouped = String::with_capacity(body.len() + body.len() / 3);
    for (i, c) in body.chars().enumerate() {
        if i > 0 && (body.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    format!("{}-{}", grouped, dv)
}
