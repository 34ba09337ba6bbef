//! Configuration types.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Onboarding flow configuration.
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    /// Where to send the visitor when no verified identity is present.
    pub signup_route: String,
    /// Next onboarding step after the profile is created.
    pub security_setup_route: String,
    /// Phone number recorded on profiles created in bypass mode.
    pub bypass_phone_marker: String,
    /// Phone number recorded on profiles created by the developer shortcut.
    pub shortcut_phone_marker: String,
    /// Developer shortcut settings. `None` disables the shortcut entirely.
    pub dev_shortcut: Option<DevShortcutConfig>,
}

/// Throwaway-account settings for the developer shortcut.
#[derive(Debug, Clone)]
pub struct DevShortcutConfig {
    /// Email domain for generated `dev-bypass-<millis>@<domain>` addresses.
    pub email_domain: String,
    pub display_name: String,
    pub password: SecretString,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            signup_route: "/signup".to_string(),
            security_setup_route: "/setup-security".to_string(),
            bypass_phone_marker: "dev-bypass".to_string(),
            shortcut_phone_marker: "dev-bypass-profile".to_string(),
            dev_shortcut: None,
        }
    }
}

impl Default for DevShortcutConfig {
    fn default() -> Self {
        Self {
            email_domain: "clarity.app".to_string(),
            display_name: "Dev User".to_string(),
            password: SecretString::from("PasswordForDev123!"),
        }
    }
}

impl OnboardingConfig {
    /// Build config from `CLARITY_*` environment variables, falling back to
    /// defaults. The developer shortcut stays off unless
    /// `CLARITY_DEV_SHORTCUT` is explicitly truthy.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let dev_shortcut = if env_flag("CLARITY_DEV_SHORTCUT")? {
            let base = DevShortcutConfig::default();
            Some(DevShortcutConfig {
                email_domain: std::env::var("CLARITY_DEV_EMAIL_DOMAIN")
                    .unwrap_or(base.email_domain),
                display_name: std::env::var("CLARITY_DEV_DISPLAY_NAME")
                    .unwrap_or(base.display_name),
                password: std::env::var("CLARITY_DEV_PASSWORD")
                    .map(SecretString::from)
                    .unwrap_or(base.password),
            })
        } else {
            None
        };

        Ok(Self {
            signup_route: std::env::var("CLARITY_SIGNUP_ROUTE").unwrap_or(defaults.signup_route),
            security_setup_route: std::env::var("CLARITY_SECURITY_SETUP_ROUTE")
                .unwrap_or(defaults.security_setup_route),
            bypass_phone_marker: std::env::var("CLARITY_BYPASS_PHONE_MARKER")
                .unwrap_or(defaults.bypass_phone_marker),
            shortcut_phone_marker: std::env::var("CLARITY_SHORTCUT_PHONE_MARKER")
                .unwrap_or(defaults.shortcut_phone_marker),
            dev_shortcut,
        })
    }
}

/// Service (binary) configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub db_path: PathBuf,
    /// Start in bypass mode (no phone verification), as if the session
    /// carried the bypass flag.
    pub bypass: bool,
    /// Run the developer shortcut as soon as the flow is ready. Needs
    /// `CLARITY_DEV_SHORTCUT` as well.
    pub dev_shortcut_autorun: bool,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("CLARITY_PORT") {
            Ok(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
                key: "CLARITY_PORT".to_string(),
                message: format!("{e}"),
            })?,
            Err(_) => 8080,
        };

        let db_path = std::env::var("CLARITY_DB_PATH")
            .unwrap_or_else(|_| "./data/clarity-profiles.db".to_string())
            .into();

        Ok(Self {
            port,
            db_path,
            bypass: env_flag("CLARITY_BYPASS")?,
            dev_shortcut_autorun: env_flag("CLARITY_DEV_SHORTCUT_AUTORUN")?,
        })
    }
}

/// Read a boolean-ish environment variable. Unset means `false`.
fn env_flag(key: &str) -> Result<bool, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => parse_flag(key, &raw),
        Err(_) => Ok(false),
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got {other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_disable_shortcut() {
        let config = OnboardingConfig::default();
        assert!(config.dev_shortcut.is_none());
        assert_eq!(config.security_setup_route, "/setup-security");
        assert_eq!(config.bypass_phone_marker, "dev-bypass");
    }

    #[test]
    fn parse_flag_accepts_common_spellings() {
        assert!(parse_flag("K", "true").unwrap());
        assert!(parse_flag("K", " YES ").unwrap());
        assert!(parse_flag("K", "1").unwrap());
        assert!(!parse_flag("K", "off").unwrap());
        assert!(!parse_flag("K", "").unwrap());
    }

    #[test]
    fn parse_flag_rejects_garbage() {
        let err = parse_flag("CLARITY_DEV_SHORTCUT", "maybe").unwrap_err();
        assert!(err.to_string().contains("CLARITY_DEV_SHORTCUT"));
    }
}
