//! Philippine phone number normalization.
//!
//! Booking submissions arrive with phone numbers in whatever shape the
//! customer typed: `09171234567`, `+63 917 123 4567`, `0917-123-4567`, or a
//! landline like `(088) 856-1234`. Mobile numbers are normalized to the
//! canonical leading-zero 11-digit form and grouped as `XXXX-XXX-XXXX`;
//! landlines are only stripped of junk characters, never restructured.
//!
//! While a number is still being typed the formatter returns the best
//! partial normalization instead of failing, so it is safe to call on every
//! keystroke-sized fragment.

/// Characters a landline number may contain besides digits.
const TELEPHONE_CHARS: [char; 5] = ['(', ')', '+', ' ', '-'];

/// Returns true when the input looks like a PH mobile number rather than a
/// generic telephone: `09…`, `+639…`, `639…`, or a bare `9…` subscriber part.
pub fn is_mobile_number(value: &str) -> bool {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.starts_with("09") || digits.starts_with("639") || digits.starts_with('9')
}

/// Collapses a mobile input to its canonical leading-zero digit form,
/// truncated to 11 digits. `+63`/`63` country prefixes become `0`, and a
/// bare `9…` subscriber number gains the leading zero.
fn canonical_mobile_digits(value: &str) -> String {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();

    let mut digits = match digits.strip_prefix("63") {
        Some(rest) if rest.starts_with('9') => format!("0{rest}"),
        _ => digits,
    };

    if digits.starts_with('9') {
        digits.insert(0, '0');
    }

    digits.truncate(11);
    digits
}

/// Formats a phone number for display and storage.
///
/// Mobile numbers normalize to `0917-123-4567`; anything shorter than the
/// full 11 digits is returned as the partial digit string. Telephone numbers
/// keep their own grouping and only lose disallowed characters.
pub fn format_phone_number(value: &str) -> String {
    if value.trim().is_empty() {
        return String::new();
    }

    if is_mobile_number(value) {
        let digits = canonical_mobile_digits(value);
        if digits.len() == 11 {
            return format!("{}-{}-{}", &digits[..4], &digits[4..7], &digits[7..]);
        }
        return digits;
    }

    format_telephone(value)
}

/// Strips a telephone number down to digits, parentheses, plus, space, and
/// hyphen. No restructuring.
pub fn format_telephone(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_digit() || TELEPHONE_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Validates a phone number field.
///
/// Blank input is valid (the field is optional). Mobile numbers must
/// normalize to exactly 11 digits starting `09`; telephone numbers need at
/// least 7 digits and may only contain digits plus `()+ -`.
pub fn is_valid_phone_number(value: &str) -> bool {
    if value.trim().is_empty() {
        return true;
    }

    if is_mobile_number(value) {
        let digits = canonical_mobile_digits(value);
        return digits.len() == 11 && digits.starts_with("09");
    }

    let digit_count = value.chars().filter(|c| c.is_ascii_digit()).count();
    digit_count >= 7
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || TELEPHONE_CHARS.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("09171234567", "0917-123-4567" ; "plain eleven digits")]
    #[test_case("+639171234567", "0917-123-4567" ; "international prefix")]
    #[test_case("639171234567", "0917-123-4567" ; "country code without plus")]
    #[test_case("0917-123-4567", "0917-123-4567" ; "already formatted")]
    #[test_case("+63 917 123 4567", "0917-123-4567" ; "spaced international")]
    #[test_case("9171234567", "0917-123-4567" ; "missing leading zero")]
    fn mobile_numbers_normalize_to_grouped_form(input: &str, expected: &str) {
        assert_eq!(format_phone_number(input), expected);
    }

    #[test]
    fn partial_mobile_input_returns_partial_digits() {
        assert_eq!(format_phone_number("0917"), "0917");
        assert_eq!(format_phone_number("0917123"), "0917123");
        assert_eq!(format_phone_number("+63917"), "0917");
    }

    #[test]
    fn extra_digits_are_truncated_to_eleven() {
        assert_eq!(format_phone_number("091712345678999"), "0917-123-4567");
    }

    #[test]
    fn telephone_numbers_keep_their_grouping() {
        assert_eq!(format_phone_number("(088) 856-1234"), "(088) 856-1234");
        assert_eq!(format_phone_number("(088) 856-1234 ext.5"), "(088) 856-1234 5");
    }

    #[test]
    fn blank_input_is_valid_and_formats_to_empty() {
        assert!(is_valid_phone_number(""));
        assert!(is_valid_phone_number("   "));
        assert_eq!(format_phone_number(""), "");
        assert_eq!(format_phone_number("  "), "");
    }

    #[test]
    fn short_inputs_are_invalid() {
        assert!(!is_valid_phone_number("123"));
        assert!(!is_valid_phone_number("0917"));
    }

    #[test]
    fn valid_numbers_pass_validation() {
        assert!(is_valid_phone_number("09171234567"));
        assert!(is_valid_phone_number("+639171234567"));
        assert!(is_valid_phone_number("0917-123-4567"));
        assert!(is_valid_phone_number("(088) 856-1234"));
    }

    #[test]
    fn telephone_with_letters_is_invalid() {
        assert!(!is_valid_phone_number("call me 8561234"));
    }

    proptest! {
        // Formatting is idempotent: a formatted number formats to itself.
        #[test]
        fn formatting_is_idempotent(subscriber in "9[0-9]{9}") {
            let first = format_phone_number(&subscriber);
            prop_assert_eq!(format_phone_number(&first), first.clone());
        }

        // Every full mobile subscriber number validates after formatting.
        #[test]
        fn formatted_mobile_numbers_validate(subscriber in "9[0-9]{9}") {
            let formatted = format_phone_number(&format!("+63{subscriber}"));
            prop_assert!(is_valid_phone_number(&formatted));
            prop_assert_eq!(formatted.len(), 13);
        }
    }
}
