use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("invalid EMAIL_PATTERN regex"));

static TIN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{2}-?[0-9]{7}$").expect("invalid TIN_PATTERN regex"));

pub const PASSWORD_SYMBOLS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?`~";

const PASSWORD_MIN_LENGTH: usize = 8;
const PASSWORD_MIN_SCORE: u8 = 4;
const BANK_ACCOUNT_DIGITS: std::ops::RangeInclusive<usize> = 8..=17;
const ROUTING_DIGITS: usize = 9;
const TIN_DIGITS: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub message: String,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: String::new(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
        }
    }

    fn check(ok: bool, message: &str) -> Self {
        if ok {
            Self::valid()
        } else {
            Self::invalid(message)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordStrength {
    pub is_valid: bool,
    pub score: u8,
    pub feedback: Vec<String>,
}

pub fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

pub fn validate_required(value: &str) -> ValidationResult {
    ValidationResult::check(!value.trim().is_empty(), "This field is required")
}

/// Accepts `local@domain.tld` shapes only; this is not a full RFC 5322 check.
pub fn validate_email(value: &str) -> ValidationResult {
    ValidationResult::check(EMAIL_PATTERN.is_match(value), "Please enter a valid email address")
}

pub fn validate_password(value: &str) -> PasswordStrength {
    let rules: [(bool, &str); 5] = [
        (
            value.chars().count() >= PASSWORD_MIN_LENGTH,
            "Password must be at least 8 characters long",
        ),
        (
            value.chars().any(|c| c.is_ascii_lowercase()),
            "Include at least one lowercase letter",
        ),
        (
            value.chars().any(|c| c.is_ascii_uppercase()),
            "Include at least one uppercase letter",
        ),
        (
            value.chars().any(|c| c.is_ascii_digit()),
            "Include at least one number",
        ),
        (
            value.chars().any(|c| PASSWORD_SYMBOLS.contains(c)),
            "Include at least one special character",
        ),
    ];

    let score = rules.iter().filter(|(passed, _)| *passed).count() as u8;
    let feedback = rules
        .iter()
        .filter(|(passed, _)| !*passed)
        .map(|(_, reason)| reason.to_string())
        .collect();

    PasswordStrength {
        is_valid: score >= PASSWORD_MIN_SCORE,
        score,
        feedback,
    }
}

/// Checks character counts. An absent bound places no constraint on that side.
pub fn validate_length(value: &str, min: Option<usize>, max: Option<usize>) -> ValidationResult {
    let len = value.chars().count();
    if let Some(min) = min {
        if len < min {
            return ValidationResult::invalid(format!("Must be at least {} characters", min));
        }
    }
    if let Some(max) = max {
        if len > max {
            return ValidationResult::invalid(format!("Must be no more than {} characters", max));
        }
    }
    ValidationResult::valid()
}

/// Nine digits written as `DDDDDDDDD` or `DD-DDDDDDD`. No checksum.
pub fn validate_tin(value: &str) -> ValidationResult {
    let ok = digits_only(value).len() == TIN_DIGITS && TIN_PATTERN.is_match(value);
    ValidationResult::check(ok, "TIN must be 9 digits (format: XX-XXXXXXX)")
}

pub fn validate_bank_account(value: &str) -> ValidationResult {
    ValidationResult::check(
        BANK_ACCOUNT_DIGITS.contains(&digits_only(value).len()),
        "Bank account number must be between 8 and 17 digits",
    )
}

/// Digit count only. Any nine digits pass; see
/// [`validate_routing_number_checksum`] for the ABA check digit.
pub fn validate_routing_number(value: &str) -> ValidationResult {
    ValidationResult::check(
        digits_only(value).len() == ROUTING_DIGITS,
        "Routing number must be exactly 9 digits",
    )
}

/// ABA check: digits weighted 3, 7, 1 repeating must sum to a multiple of 10.
pub fn validate_routing_number_checksum(value: &str) -> ValidationResult {
    let basic = validate_routing_number(value);
    if !basic.is_valid {
        return basic;
    }

    let sum: u32 = digits_only(value)
        .chars()
        .filter_map(|c| c.to_digit(10))
        .zip([3u32, 7, 1].iter().cycle())
        .map(|(digit, weight)| digit * weight)
        .sum();

    ValidationResult::check(sum % 10 == 0, "Routing number checksum is invalid")
}
