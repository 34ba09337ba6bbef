//! In-memory profile form state.

use secrecy::{ExposeSecret, SecretString};

use super::password::{self, RequirementStatus};

/// The values typed into the profile form. Never persisted; the password is
/// kept as a secret and only exposed to validation and the provider call.
#[derive(Debug)]
pub struct PendingSession {
    pub full_name: String,
    pub email: String,
    password: SecretString,
    password_visible: bool,
}

impl Default for PendingSession {
    fn default() -> Self {
        Self {
            full_name: String::new(),
            email: String::new(),
            password: SecretString::from(""),
            password_visible: false,
        }
    }
}

impl PendingSession {
    pub fn set_full_name(&mut self, full_name: impl Into<String>) {
        self.full_name = full_name.into();
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = SecretString::from(password.into());
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    /// Press-and-hold reveal.
    pub fn set_password_visible(&mut self, visible: bool) {
        self.password_visible = visible;
    }

    pub fn toggle_password_visibility(&mut self) {
        self.password_visible = !self.password_visible;
    }

    pub fn password_visible(&self) -> bool {
        self.password_visible
    }

    /// Password as the field renders it: plain text while revealed, masked
    /// otherwise.
    pub fn rendered_password(&self) -> String {
        let raw = self.password.expose_secret();
        if self.password_visible {
            raw.to_string()
        } else {
            "*".repeat(raw.chars().count())
        }
    }

    /// Live requirement checks for the current password.
    pub fn requirements(&self) -> Vec<RequirementStatus> {
        password::evaluate(self.password.expose_secret())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
