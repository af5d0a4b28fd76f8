//! Contact handle normalization for the WhatsApp gateway.

/// Strip everything but digits and prefix `country_code` when missing.
/// Returns `None` when the handle has no digits at all.
pub fn normalize_contact(raw: &str, country_code: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    if digits.starts_with(country_code) {
        Some(digits)
    } else {
        Some(format!("{country_code}{digits}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_formatting_and_prefixes() {
        assert_eq!(
            normalize_contact("(11) 99999-0000", "55").as_deref(),
            Some("5511999990000")
        );
    }

    #[test]
    fn test_keeps_existing_country_code() {
        assert_eq!(
            normalize_contact("+55 11 99999-0000", "55").as_deref(),
            Some("5511999990000")
        );
    }

    #[test]
    fn test_no_digits() {
        assert_eq!(normalize_contact("n/a", "55"), None);
        assert_eq!(normalize_contact("", "55"), None);
    }
}
