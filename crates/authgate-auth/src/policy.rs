//! Password composition policy

use std::fmt;

/// Minimum password length, in characters
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Characters that satisfy the special-character rule
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

/// The first rule a candidate password breaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyViolation {
    TooShort,
    MissingUppercase,
    MissingLowercase,
    MissingDigit,
    MissingSpecial,
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyViolation::TooShort => write!(
                f,
                "Password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            ),
            PolicyViolation::MissingUppercase => {
                write!(f, "Password must contain at least one uppercase letter")
            }
            PolicyViolation::MissingLowercase => {
                write!(f, "Password must contain at least one lowercase letter")
            }
            PolicyViolation::MissingDigit => write!(f, "Password must contain at least one number"),
            PolicyViolation::MissingSpecial => {
                write!(f, "Password must contain at least one special character")
            }
        }
    }
}

/// Decimal and other numeric digits in any script; letter-like numerals such as
/// Roman numerals do not count
fn is_digit(c: char) -> bool {
    c.is_numeric() && !c.is_alphabetic()
}

/// Check a plaintext password against the composition rules
///
/// Rules are checked in a fixed order and the first failure is returned.
pub fn validate_password(password: &str) -> Option<PolicyViolation> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Some(PolicyViolation::TooShort);
    }
    if !password.chars().any(char::is_uppercase) {
        return Some(PolicyViolation::MissingUppercase);
    }
    if !password.chars().any(char::is_lowercase) {
        return Some(PolicyViolation::MissingLowercase);
    }
    if !password.chars().any(is_digit) {
        return Some(PolicyViolation::MissingDigit);
    }
    if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
        return Some(PolicyViolation::MissingSpecial);
    }
    None
}
