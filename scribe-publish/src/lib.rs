//! The publish domain: linked credentials, at-rest secret encryption, and
//! the end-to-end workflow that posts to the blog editor.
//!
//! - [`credentials`]: credential model + SQLite-backed store
//! - [`crypto`]: AES-256-GCM cipher for stored secrets
//! - [`selectors`]: catalogue of URLs, selectors and page scripts for the
//!   target editor UI
//! - [`workflow`]: the publish state machine and its caller boundary,
//!   [`workflow::PublishWorkflow::publish`]
pub mod credentials;
pub mod crypto;
pub mod selectors;
pub mod workflow;

pub use credentials::{Credential, CredentialStore, SqliteCredentialStore};
pub use crypto::{AesGcmCipher, SecretCipher};
pub use workflow::{DriverProvider, PublishState, PublishWorkflow, WebDriverProvider};
