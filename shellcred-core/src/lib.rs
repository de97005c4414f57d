//! # shellcred Core
//!
//! This crate provides the declarative type definitions for shellcred credential
//! types, together with the composition rules used to check the shape of a value.
//!
//! A credential type is plain data: an ordered list of fields, each of which may be
//! secret, optional, and constrained by a [`ValueComposition`]. New credential types
//! are added by constructing a new [`CredentialSchema`], either in code or by loading
//! it from TOML.
//!
//! ## Schema Structure
//!
//! ```toml
//! name = "Personal Access Token"
//! docs_url = "https://docs.github.com/en/authentication"
//! management_url = "https://github.com/settings/tokens"
//!
//! [[fields]]
//! name = "token"
//! description = "Token used to authenticate to GitHub."
//! secret = true
//! composition = { length = 93, prefix = "github_pat_", charset = { uppercase = true, lowercase = true, digits = true, symbols = true } }
//!
//! [[fields]]
//! name = "host"
//! optional = true
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;
use url::Url;

/// The character classes a value is allowed to draw from.
///
/// Only ASCII classes exist. A character outside of ASCII never belongs to any
/// class, so a value containing one never satisfies a composition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Charset {
    /// `A-Z`
    pub uppercase: bool,
    /// `a-z`
    pub lowercase: bool,
    /// `0-9`
    pub digits: bool,
    /// ASCII punctuation, e.g. `_`, `-`, `!`
    pub symbols: bool,
}

impl Charset {
    /// Uppercase letters, lowercase letters and digits.
    pub const ALPHANUMERIC: Charset = Charset {
        uppercase: true,
        lowercase: true,
        digits: true,
        symbols: false,
    };

    /// Returns whether `c` belongs to one of the enabled classes.
    pub fn contains(&self, c: char) -> bool {
        (self.uppercase && c.is_ascii_uppercase())
            || (self.lowercase && c.is_ascii_lowercase())
            || (self.digits && c.is_ascii_digit())
            || (self.symbols && c.is_ascii_punctuation())
    }
}

/// The expected shape of a credential value.
///
/// A value satisfies the composition iff its length equals `length` (when set),
/// it starts with `prefix` (when set), and every character belongs to an enabled
/// class of `charset`. The prefix counts towards the length and its characters
/// are subject to the charset like any other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueComposition {
    /// Exact number of characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    /// Fixed leading text, e.g. `github_pat_`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Allowed character classes
    #[serde(default)]
    pub charset: Charset,
}

impl ValueComposition {
    /// Checks `value` against this composition.
    pub fn matches(&self, value: &str) -> bool {
        if let Some(length) = self.length {
            if value.chars().count() != length {
                return false;
            }
        }

        if let Some(prefix) = &self.prefix {
            if !value.starts_with(prefix.as_str()) {
                return false;
            }
        }

        value.chars().all(|c| self.charset.contains(c))
    }
}

/// Checks `value` against `rule`.
///
/// Pure function: the same inputs always give the same answer.
pub fn validate(value: &str, rule: &ValueComposition) -> bool {
    rule.matches(value)
}

/// One named value within a credential type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialField {
    /// Field name, unique within its schema (e.g. `token`, `password`)
    pub name: String,
    /// Markdown description shown to users
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the value must never be logged or echoed
    #[serde(default)]
    pub secret: bool,
    /// Whether absence of the value is acceptable
    #[serde(default)]
    pub optional: bool,
    /// The shape the value must have, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition: Option<ValueComposition>,
}

impl CredentialField {
    /// Create a required, non-secret field without composition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            secret: false,
            optional: false,
            composition: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn composition(mut self, composition: ValueComposition) -> Self {
        self.composition = Some(composition);
        self
    }

    /// Returns whether `value` is acceptable for this field.
    ///
    /// Fields without a composition accept any value.
    pub fn accepts(&self, value: &str) -> bool {
        self.composition
            .as_ref()
            .map_or(true, |composition| composition.matches(value))
    }
}

/// A credential type: an ordered set of fields plus documentation links.
///
/// Schemas are immutable once built and are meant to be defined once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSchema {
    /// Display name of the credential type, e.g. "Database Credentials"
    pub name: String,
    /// Where to learn about this credential type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<Url>,
    /// Where users create or revoke credentials of this type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_url: Option<Url>,
    /// Fields in declaration order
    pub fields: Vec<CredentialField>,
}

impl CredentialSchema {
    /// Validate the schema.
    ///
    /// Ensures that:
    /// - The name is not empty
    /// - At least one field is defined
    /// - Field names are non-empty and unique
    ///
    /// # Errors
    ///
    /// Returns a `ParseError::Validation` if validation fails.
    pub fn validate(&self) -> Result<(), ParseError> {
        if self.name.is_empty() {
            return Err(ParseError::Validation(
                "Credential type name cannot be empty".into(),
            ));
        }

        if self.fields.is_empty() {
            return Err(ParseError::Validation(format!(
                "Credential type '{}' must define at least one field",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(ParseError::Validation(format!(
                    "Credential type '{}' has a field with an empty name",
                    self.name
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(ParseError::Validation(format!(
                    "Credential type '{}' declares field '{}' more than once",
                    self.name, field.name
                )));
            }
        }

        Ok(())
    }

    /// Get a field by name.
    pub fn field(&self, name: &str) -> Option<&CredentialField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Iterate over the fields that must be present.
    pub fn required_fields(&self) -> impl Iterator<Item = &CredentialField> {
        self.fields.iter().filter(|field| !field.optional)
    }

    /// Returns the names of the given fields whose values fail their composition.
    ///
    /// Fields unknown to this schema, or without a composition, never mismatch.
    pub fn mismatches<'a, I>(&self, values: I) -> Vec<String>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        values
            .into_iter()
            .filter(|(name, value)| {
                self.field(name)
                    .map_or(false, |field| !field.accepts(value))
            })
            .map(|(name, _)| name.to_string())
            .collect()
    }
}

impl FromStr for CredentialSchema {
    type Err = ParseError;

    /// Parse and validate a schema from a TOML string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let schema: CredentialSchema = toml::from_str(s)?;
        schema.validate()?;
        Ok(schema)
    }
}

impl TryFrom<&Path> for CredentialSchema {
    type Error = ParseError;

    /// Load and validate a schema from a TOML file.
    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        let content = fs::read_to_string(path).map_err(|e| {
            ParseError::Io(io::Error::new(
                e.kind(),
                format!("Failed to read {}: {}", path.display(), e),
            ))
        })?;
        content.parse()
    }
}

/// Why a credential schema could not be loaded.
///
/// Returned by [`CredentialSchema::from_str`], `CredentialSchema::try_from(&Path)`
/// and [`CredentialSchema::validate`].
#[derive(Debug)]
pub enum ParseError {
    /// The schema file could not be read; the message names the path
    Io(io::Error),
    /// The schema is not valid TOML or does not have the schema's shape
    Toml(toml::de::Error),
    /// The schema parsed but is unusable: empty name, no fields, or a
    /// missing or repeated field name
    Validation(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Io(e) => write!(f, "cannot read schema: {}", e),
            ParseError::Toml(e) => write!(f, "schema is not valid TOML: {}", e),
            ParseError::Validation(msg) => write!(f, "invalid schema: {}", msg),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Io(e) => Some(e),
            ParseError::Toml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ParseError {
    fn from(e: io::Error) -> Self {
        ParseError::Io(e)
    }
}

impl From<toml::de::Error> for ParseError {
    fn from(e: toml::de::Error) -> Self {
        ParseError::Toml(e)
    }
}
