//! shellcred - discover, validate and provision credentials for command-line tools
//!
//! A credential type (a GitHub token, a database login) is declared as data: a
//! [`CredentialSchema`] listing its fields, an importer describing where
//! existing values may be found, and a provisioner describing how a chosen value
//! reaches the tool that needs it.
//!
//! # Features
//!
//! - **Composition checks**: validate a value's length, prefix and character classes
//! - **Discovery**: probe environment variables, `.env` files and INI option files,
//!   collecting every candidate with [`import::TryAll`]
//! - **Provisioning**: hand a credential to one child process through its
//!   environment or a private temporary file that is removed when the process exits
//!
//! # Example
//!
//! ```ignore
//! use shellcred::import::ImportInput;
//! use shellcred::plugins::mysql;
//! use shellcred::provision::ProvisionInput;
//!
//! let credential = mysql::database_credentials();
//!
//! // Find existing option files
//! let attempt = credential.import(&ImportInput::from_process());
//! let candidate = attempt.trusted_candidates().next().ok_or("nothing found")?;
//!
//! // Run `mysql` with the chosen login; the option file is gone afterwards
//! let input = ProvisionInput::from_candidate(candidate);
//! let status = credential.launch(&input, &["mysql".into(), "-e".into(), "select 1".into()])?;
//! ```

// Internal modules
mod credential;
mod error;

pub mod import;
pub mod plugins;
pub mod provision;

// Public API exports
pub use credential::CredentialType;
pub use error::{Result, ShellCredError};
pub use shellcred_core::{
    Charset, CredentialField, CredentialSchema, ParseError, ValueComposition, validate,
};
