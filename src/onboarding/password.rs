//! Password policy checked before any provider call.
//!
//! Length 8-20 characters, one uppercase letter, one digit, one character
//! outside `[A-Za-z0-9]`. Each requirement can be evaluated on its own so the
//! form can show live pass/fail state while the user types.

use serde::Serialize;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordRequirement {
    Length,
    Uppercase,
    Number,
    Special,
}

impl PasswordRequirement {
    /// All requirements, in the order they are checked.
    pub const ALL: [PasswordRequirement; 4] = [
        Self::Length,
        Self::Uppercase,
        Self::Number,
        Self::Special,
    ];

    pub fn is_met(&self, password: &str) -> bool {
        match self {
            Self::Length => {
                (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&password.chars().count())
            }
            Self::Uppercase => password.chars().any(|c| c.is_ascii_uppercase()),
            Self::Number => password.chars().any(|c| c.is_ascii_digit()),
            Self::Special => password.chars().any(|c| !c.is_ascii_alphanumeric()),
        }
    }

    /// Short label shown next to the live check mark.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Length => "8-20 characters",
            Self::Uppercase => "One uppercase letter",
            Self::Number => "One number",
            Self::Special => "One special character",
        }
    }

    /// Message shown when a submission fails this requirement.
    pub fn violation_message(&self) -> &'static str {
        match self {
            Self::Length => "Password must be between 8 and 20 characters.",
            Self::Uppercase => "Password must contain at least one uppercase character.",
            Self::Number => "Password must contain at least one number.",
            Self::Special => {
                "Password must contain at least one special character (e.g., !@#$)."
            }
        }
    }
}

/// Live state of one requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequirementStatus {
    pub requirement: PasswordRequirement,
    pub label: &'static str,
    pub met: bool,
}

/// Evaluate every requirement against `password`.
pub fn evaluate(password: &str) -> Vec<RequirementStatus> {
    PasswordRequirement::ALL
        .iter()
        .map(|req| RequirementStatus {
            requirement: *req,
            label: req.label(),
            met: req.is_met(password),
        })
        .collect()
}

/// Check `password`, returning the first unmet requirement.
pub fn validate(password: &str) -> Result<(), PasswordRequirement> {
    match PasswordRequirement::ALL
        .into_iter()
        .find(|req| !req.is_met(password))
    {
        Some(failed) => Err(failed),
        None => Ok(()),
    }
}
