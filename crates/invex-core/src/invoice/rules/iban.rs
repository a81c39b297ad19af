//! Bank identifier checks: IBAN, ABA routing numbers, SWIFT/BIC codes.

/// Strip spaces from an IBAN and uppercase it.
pub fn compact_iban(iban: &str) -> String {
    iban.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Validate an IBAN with the ISO 13616 mod-97 check.
///
/// The first four characters move to the end, letters become 10..=35, and
/// the resulting number must leave remainder 1 when divided by 97.
pub fn validate_iban(iban: &str) -> bool {
    let iban = compact_iban(iban);

    if !(15..=34).contains(&iban.len()) || !iban.is_ascii() {
        return false;
    }

    let (head, bban) = iban.split_at(4);
    let mut head_chars = head.chars();
    let country_ok = head_chars.by_ref().take(2).all(|c| c.is_ascii_alphabetic());
    let check_ok = head_chars.all(|c| c.is_ascii_digit());
    if !country_ok || !check_ok {
        return false;
    }

    let mut remainder: u32 = 0;
    for c in bban.chars().chain(head.chars()) {
        let value = match c {
            '0'..='9' => c as u32 - '0' as u32,
            'A'..='Z' => c as u32 - 'A' as u32 + 10,
            _ => return false,
        };
        // Letters expand to two digits
        remainder = if value >= 10 {
            (remainder * 100 + value) % 97
        } else {
            (remainder * 10 + value) % 97
        };
    }

    remainder == 1
}

/// Validate a nine-digit ABA routing number checksum
/// (weights 3, 7, 1 repeating; sum divisible by 10).
pub fn validate_routing_number(routing: &str) -> bool {
    let digits: Vec<u32> = routing.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 9 || routing.chars().any(|c| c.is_ascii_alphabetic()) {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .zip([3, 7, 1].iter().cycle())
        .map(|(d, w)| d * w)
        .sum();

    sum % 10 == 0
}

/// Whether `code` has the shape of a SWIFT/BIC code (8 or 11 characters).
pub fn is_swift_code(code: &str) -> bool {
    let code = code.trim();
    matches!(code.len(), 8 | 11)
        && code.chars().take(6).all(|c| c.is_ascii_alphabetic())
        && code.chars().skip(6).all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_iban_valid() {
        assert!(validate_iban("GB82WEST12345698765432"));
        assert!(validate_iban("DE89 3704 0044 0532 0130 00"));
        assert!(validate_iban("gb82 west 1234 5698 7654 32"));
    }

    #[test]
    fn test_validate_iban_invalid() {
        assert!(!validate_iban("GB00WEST12345698765432"));
        assert!(!validate_iban("GB82"));
        assert!(!validate_iban("1282WEST12345698765432"));
        assert!(!validate_iban("GB82WEST1234569876543Ä"));
    }

    #[test]
    fn test_validate_routing_number() {
        assert!(validate_routing_number("021000021"));
        assert!(validate_routing_number("011000015"));
        assert!(!validate_routing_number("021000022"));
        assert!(!validate_routing_number("12345"));
    }

    #[test]
    fn test_is_swift_code() {
        assert!(is_swift_code("DEUTDEFF"));
        assert!(is_swift_code("DEUTDEFF500"));
        assert!(!is_swift_code("DEUT1EFF"));
        assert!(!is_swift_code("DEUTDEF"));
    }
}
