//! Phone number utilities

use once_cell::sync::Lazy;
use regex::Regex;

/// Length of a national subscriber number
pub const SUBSCRIBER_NUMBER_LENGTH: usize = 10;

// Indian mobile numbering plan: ten ASCII digits, leading digit 6-9
static SUBSCRIBER_NUMBER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[6-9][0-9]{9}$").unwrap()
});

/// Remove the punctuation people type into phone fields (spaces, dashes, dots, parentheses)
///
/// Anything else, letters included, is kept so that validation can reject it.
pub fn strip_formatting(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')' | '\t'))
        .collect()
}

/// Normalize raw operator input into a national subscriber number
///
/// A leading country code (`+91`, or `91` followed by ten more digits) is dropped.
/// Returns `None` when the remainder does not satisfy the numbering plan.
pub fn normalize_subscriber_number(raw: &str, country_code: &str) -> Option<String> {
    let stripped = strip_formatting(raw.trim());
    let without_plus = country_code.trim_start_matches('+');

    let national = if let Some(rest) = stripped.strip_prefix(country_code) {
        rest
    } else if stripped.len() == without_plus.len() + SUBSCRIBER_NUMBER_LENGTH {
        stripped.strip_prefix(without_plus).unwrap_or(&stripped)
    } else {
        &stripped
    };

    if is_valid_subscriber_number(national) {
        Some(national.to_string())
    } else {
        None
    }
}

/// Check a national subscriber number against the numbering plan
pub fn is_valid_subscriber_number(phone: &str) -> bool {
    SUBSCRIBER_NUMBER_REGEX.is_match(phone)
}

/// Prefix a subscriber number with the country code
pub fn to_international(subscriber: &str, country_code: &str) -> String {
    format!("{}{}", country_code, subscriber)
}

/// Mask a phone number for logs (e.g., +91****3210)
pub fn mask_phone_number(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() >= 7 {
        let head: String = chars[..3].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}****{}", head, tail)
    } else {
        "****".to_string()
    }
}

/// Operator-facing hint of where the code went (e.g., `+91 98*****210`)
pub fn display_hint(subscriber: &str, country_code: &str) -> String {
    let chars: Vec<char> = subscriber.chars().collect();
    if chars.len() < 5 {
        return format!("{} {}", country_code, "X".repeat(SUBSCRIBER_NUMBER_LENGTH));
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 3..].iter().collect();
    format!("{} {}*****{}", country_code, head, tail)
}
