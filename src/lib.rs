//! Clarity onboarding: profile completion flow for new accounts.

pub mod config;
pub mod error;
pub mod identity;
pub mod onboarding;
pub mod session;
pub mod store;
