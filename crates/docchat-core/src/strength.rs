//! Live password strength hint shown while registering

/// Passwords shorter than this are refused before any request is made
pub const MIN_PASSWORD_LEN: usize = 6;

const GOOD_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StrengthTier {
    TooShort,
    Weak,
    Medium,
    Strong,
}

impl StrengthTier {
    pub fn message(&self) -> &'static str {
        match self {
            StrengthTier::TooShort => "Password too short (minimum 6 characters)",
            StrengthTier::Weak => "Weak password - try adding uppercase, numbers, or symbols",
            StrengthTier::Medium => "Medium strength - good but could be stronger",
            StrengthTier::Strong => "Strong password!",
        }
    }

    /// Style tag used by front ends to pick a color
    pub fn style(&self) -> &'static str {
        match self {
            StrengthTier::TooShort | StrengthTier::Weak => "weak",
            StrengthTier::Medium => "medium",
            StrengthTier::Strong => "strong",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordStrength {
    pub score: u8,
    pub tier: StrengthTier,
}

impl PasswordStrength {
    /// Score a password; `None` means the indicator should be hidden
    pub fn evaluate(password: &str) -> Option<Self> {
        if password.is_empty() {
            return None;
        }

        let len = password.chars().count();
        let rules = [
            len >= GOOD_PASSWORD_LEN,
            password.chars().any(|c| c.is_ascii_lowercase()),
            password.chars().any(|c| c.is_ascii_uppercase()),
            password.chars().any(|c| c.is_ascii_digit()),
            password.chars().any(|c| !c.is_ascii_alphanumeric()),
        ];
        let score = rules.iter().filter(|passed| **passed).count() as u8;

        let tier = if len < MIN_PASSWORD_LEN {
            StrengthTier::TooShort
        } else if score <= 2 {
            StrengthTier::Weak
        } else if score <= 3 {
            StrengthTier::Medium
        } else {
            StrengthTier::Strong
        };

        Some(Self { score, tier })
    }

    pub fn message(&self) -> &'static str {
        self.tier.message()
    }

    pub fn style(&self) -> &'static str {
        self.tier.style()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(password: &str) -> PasswordStrength {
        PasswordStrength::evaluate(password).unwrap()
    }

    #[test]
    fn test_empty_password_hides_indicator() {
        assert_eq!(PasswordStrength::evaluate(""), None);
    }

    #[test]
    fn test_short_password_is_too_short() {
        let s = eval("abc");
        assert_eq!(s.tier, StrengthTier::TooShort);
        assert_eq!(s.style(), "weak");
        assert_eq!(s.message(), "Password too short (minimum 6 characters)");
    }

    #[test]
    fn test_short_password_wins_over_score() {
        // Four rules pass but the length gate comes first
        let s = eval("aB1!");
        assert_eq!(s.score, 4);
        assert_eq!(s.tier, StrengthTier::TooShort);
    }

    #[test]
    fn test_lowercase_only_is_weak() {
        let s = eval("abcdefgh");
        assert_eq!(s.score, 2);
        assert_eq!(s.tier, StrengthTier::Weak);
        assert_eq!(s.style(), "weak");
    }

    #[test]
    fn test_six_lowercase_scores_one() {
        let s = eval("abcdef");
        assert_eq!(s.score, 1);
        assert_eq!(s.tier, StrengthTier::Weak);
    }

    #[test]
    fn test_medium_tier() {
        let s = eval("abcdefG");
        assert_eq!(s.score, 2);
        let s = eval("abcdeF1");
        assert_eq!(s.score, 3);
        assert_eq!(s.tier, StrengthTier::Medium);
        assert_eq!(s.style(), "medium");
    }

    #[test]
    fn test_strong_tiers() {
        let s = eval("Abcdef12");
        assert_eq!(s.score, 4);
        assert_eq!(s.tier, StrengthTier::Strong);

        let s = eval("Abcdef1!");
        assert_eq!(s.score, 5);
        assert_eq!(s.tier, StrengthTier::Strong);
        assert_eq!(s.message(), "Strong password!");
    }

    #[test]
    fn test_non_ascii_letter_counts_as_symbol() {
        let s = eval("ñandúes");
        assert_eq!(s.score, 2);
    }
}
