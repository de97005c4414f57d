//! Built-in credential types

use url::Url;

pub mod github;
pub mod mysql;

use crate::CredentialType;

/// All built-in credential types.
pub fn all() -> Vec<CredentialType> {
    vec![
        github::personal_access_token(),
        mysql::database_credentials(),
    ]
}

// Only used with literals that are known to parse; a typo shows up as a missing
// URL in the plugin tests.
fn url(s: &str) -> Option<Url> {
    Url::parse(s).ok()
}
