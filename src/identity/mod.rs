//! Identity provider seam.
//!
//! The hosted identity service is consumed only through the
//! `IdentityProvider` trait. `InMemoryIdentityProvider` backs the local
//! service harness and the tests.

pub mod memory;
pub mod model;
pub mod provider;

pub use memory::InMemoryIdentityProvider;
pub use model::{CredentialKind, FederatedProvider, Identity};
pub use provider::{IdentityProvider, SessionStream};
