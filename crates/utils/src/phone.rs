//! Phone number checks shared by guest queue entries and barbershop contact lists.

use std::sync::LazyLock;

use regex::Regex;

static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[\d\s\-\(\)]+$").expect("phone pattern is a valid regex")
});

/// Returns true when `raw` looks like a phone number: digits, spaces, dashes
/// and parentheses, with an optional leading `+`.
pub fn is_valid_phone(raw: &str) -> bool {
    let trimmed = raw.trim();
    !trimmed.is_empty()
        && trimmed.chars().any(|c| c.is_ascii_digit())
        && PHONE_PATTERN.is_match(trimmed)
}

/// Trims surrounding whitespace and drops empty values.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Cleans a list of phone numbers: blank entries are removed, the rest must be valid.
/// Returns the first offending value on failure.
pub fn clean_phone_list(phones: &[String]) -> Result<Vec<String>, String> {
    let mut cleaned = Vec::with_capacity(phones.len());
    for phone in phones {
        let Some(phone) = normalize_phone(phone) else {
            continue;
        };
        if !is_valid_phone(&phone) {
            return Err(phone);
        }
        cleaned.push(phone);
    }
    Ok(cleaned)
}
