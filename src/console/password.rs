use std::fmt;

use crate::error::{ConsoleError, PasswordRule};

pub const MIN_PASSWORD_LEN: usize = 8;
const LONG_PASSWORD_LEN: usize = 12;
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthLevel {
    Weak,
    Medium,
    Strong,
}

impl fmt::Display for StrengthLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrengthLevel::Weak => f.write_str("Weak"),
            StrengthLevel::Medium => f.write_str("Medium"),
            StrengthLevel::Strong => f.write_str("Strong"),
        }
    }
}

/// Advisory password analysis. One point each for length >= 8, length >= 12,
/// and each character class present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordStrength {
    pub length: usize,
    pub has_upper: bool,
    pub has_lower: bool,
    pub has_digit: bool,
    pub has_special: bool,
    pub score: u8,
}

impl PasswordStrength {
    pub fn assess(password: &str) -> Self {
        let length = password.chars().count();
        let has_upper = password.chars().any(char::is_uppercase);
        let has_lower = password.chars().any(char::is_lowercase);
        let has_digit = password.chars().any(|c| c.is_ascii_digit());
        let has_special = password.chars().any(|c| SPECIAL_CHARACTERS.contains(c));

        let score = [
            length >= MIN_PASSWORD_LEN,
            length >= LONG_PASSWORD_LEN,
            has_upper,
            has_lower,
            has_digit,
            has_special,
        ]
        .iter()
        .filter(|met| **met)
        .count() as u8;

        Self {
            length,
            has_upper,
            has_lower,
            has_digit,
            has_special,
            score,
        }
    }

    pub fn level(&self) -> StrengthLevel {
        match self.score / 2 {
            0 => StrengthLevel::Weak,
            1 => StrengthLevel::Medium,
            _ => StrengthLevel::Strong,
        }
    }

    /// Filled segments of the three-segment strength bar.
    pub fn bar_segments(&self) -> usize {
        usize::from(self.score / 2).min(3)
    }
}

/// Confirmation must match, then the length floor applies.
pub fn validate_new_password(password: &str, confirmation: &str) -> Result<(), ConsoleError> {
    if password != confirmation {
        return Err(ConsoleError::ValidationFailed(PasswordRule::Mismatch));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ConsoleError::ValidationFailed(PasswordRule::TooShort {
            min: MIN_PASSWORD_LEN,
        }));
    }
    Ok(())
}
