//! # Discovery
//!
//! Importers probe one external source each (a group of environment variables,
//! a configuration file) and report the credential values they find as
//! [`ImportCandidate`]s. They are composed with [`TryAll`], which runs every
//! importer in order and collects the union of their results.
//!
//! ## Outcomes
//!
//! - A missing source (unset variable, absent file) is not an error: the importer
//!   simply contributes no candidate.
//! - A source that exists but cannot be parsed adds an error to the
//!   [`ImportAttempt`]. Sibling importers still run.
//! - A value that fails its field's composition is flagged on the candidate
//!   (see [`ImportCandidate::is_trusted`]), never raised.
//!
//! ## Example
//!
//! ```rust,ignore
//! use shellcred::import::{AllEnvVars, EnvVarPair, ImportInput, TryAll};
//!
//! let importer = TryAll::new(vec![
//!     Box::new(EnvVarPair::new([("token", "GITHUB_TOKEN")])),
//!     Box::new(AllEnvVars::new("token", ["GH_TOKEN", "GITHUB_PAT"])),
//! ]);
//!
//! let attempt = importer.run(&schema, &ImportInput::from_process());
//! for candidate in attempt.trusted_candidates() {
//!     println!("found {:?}", candidate.field_names().collect::<Vec<_>>());
//! }
//! ```

use crate::ShellCredError;
use shellcred_core::CredentialSchema;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

pub mod dotenv;
pub mod env_vars;
pub mod file;


pub use dotenv::DotEnvFile;
pub use env_vars::{AllEnvVars, EnvVarPair};
pub use file::{FileContents, TryFile, expand_home, ini_candidates, try_ini_file};

/// The read-only view of the outside world importers probe.
///
/// Importers read environment variables from this snapshot only, never from the
/// process environment.
#[derive(Debug, Clone, Default)]
pub struct ImportInput {
    /// Environment variables visible to discovery
    pub env: HashMap<String, String>,
    /// Directory `~` expands to; `None` disables home-relative paths
    pub home_dir: Option<PathBuf>,
}

impl ImportInput {
    /// Create an empty input: no environment variables, no home directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment and the user's home directory.
    pub fn from_process() -> Self {
        Self {
            env: env::vars().collect(),
            home_dir: directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf()),
        }
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    pub fn with_home_dir(mut self, home_dir: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(home_dir.into());
        self
    }

    /// Returns the value of `name` if it is set and non-empty.
    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// A single `(field, value)` pair found by an importer.
///
/// The `Debug` output never includes the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ImportCandidateField {
    pub field: String,
    pub value: String,
}

impl ImportCandidateField {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl fmt::Debug for ImportCandidateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportCandidateField")
            .field("field", &self.field)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// One coherent set of values found together in a single source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportCandidate {
    /// Fields in the order the source produced them
    pub fields: Vec<ImportCandidateField>,
    /// Fields whose value failed composition against the schema
    pub mismatched: Vec<String>,
}

impl ImportCandidate {
    pub fn new(fields: Vec<ImportCandidateField>) -> Self {
        Self {
            fields,
            mismatched: Vec::new(),
        }
    }

    /// Returns the value found for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.field == field)
            .map(|f| f.value.as_str())
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.field.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns whether every value satisfied its field's composition.
    pub fn is_trusted(&self) -> bool {
        self.mismatched.is_empty()
    }

    /// The composition mismatches recorded on this candidate, as errors.
    pub fn mismatches(&self) -> impl Iterator<Item = ShellCredError> + '_ {
        self.mismatched
            .iter()
            .map(|field| ShellCredError::CompositionMismatch(field.clone()))
    }
}

impl FromIterator<ImportCandidateField> for ImportCandidate {
    fn from_iter<I: IntoIterator<Item = ImportCandidateField>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Everything one discovery run found: candidates and non-fatal errors.
#[derive(Debug, Default)]
pub struct ImportAttempt {
    candidates: Vec<ImportCandidate>,
    errors: Vec<ShellCredError>,
}

impl ImportAttempt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a candidate. Empty candidates are ignored.
    pub fn add_candidate(&mut self, candidate: ImportCandidate) {
        if candidate.is_empty() {
            return;
        }
        self.candidates.push(candidate);
    }

    pub fn add_error(&mut self, error: ShellCredError) {
        self.errors.push(error);
    }

    /// Candidates in discovery order. Order says nothing about quality.
    pub fn candidates(&self) -> &[ImportCandidate] {
        &self.candidates
    }

    /// Candidates whose values all satisfied their compositions.
    pub fn trusted_candidates(&self) -> impl Iterator<Item = &ImportCandidate> {
        self.candidates.iter().filter(|c| c.is_trusted())
    }

    pub fn errors(&self) -> &[ShellCredError] {
        &self.errors
    }

    pub fn into_parts(self) -> (Vec<ImportCandidate>, Vec<ShellCredError>) {
        (self.candidates, self.errors)
    }

    /// Flag the values of every candidate that fail their field's composition.
    pub fn check_against(&mut self, schema: &CredentialSchema) {
        for candidate in &mut self.candidates {
            candidate.mismatched = schema.mismatches(
                candidate
                    .fields
                    .iter()
                    .map(|f| (f.field.as_str(), f.value.as_str())),
            );
            if !candidate.mismatched.is_empty() {
                debug!(
                    credential = %schema.name,
                    fields = ?candidate.mismatched,
                    "candidate has values that do not match their composition"
                );
            }
        }
    }
}

/// A probe of one external source.
///
/// Implementations must only read their own declared sources and must not keep
/// mutable state between calls.
pub trait Importer: Send + Sync {
    /// Probe the source, recording candidates and errors on `out`.
    ///
    /// Missing sources are not errors: simply record nothing.
    fn import(&self, input: &ImportInput, out: &mut ImportAttempt);

    /// A short human-readable description of the probed source, for diagnostics.
    fn describe(&self) -> String;
}

/// Runs every importer in order and collects the union of their results.
///
/// No importer short-circuits the others: several legitimate sources may
/// coexist, and picking between their candidates is left to the caller.
pub struct TryAll {
    importers: Vec<Box<dyn Importer>>,
}

impl TryAll {
    pub fn new(importers: Vec<Box<dyn Importer>>) -> Self {
        Self { importers }
    }

    pub fn len(&self) -> usize {
        self.importers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.importers.is_empty()
    }

    /// Run all importers and check every candidate against `schema`.
    ///
    /// Never fails: errors are collected on the returned attempt.
    pub fn run(&self, schema: &CredentialSchema, input: &ImportInput) -> ImportAttempt {
        let mut attempt = ImportAttempt::new();
        self.import(input, &mut attempt);
        attempt.check_against(schema);
        debug!(
            credential = %schema.name,
            candidates = attempt.candidates().len(),
            errors = attempt.errors().len(),
            "discovery finished"
        );
        attempt
    }
}

impl Importer for TryAll {
    fn import(&self, input: &ImportInput, out: &mut ImportAttempt) {
        for importer in &self.importers {
            let candidates_before = out.candidates().len();
            let errors_before = out.errors().len();

            importer.import(input, out);

            for error in &out.errors()[errors_before..] {
                warn!(source = %importer.describe(), %error, "import source could not be read");
            }
            debug!(
                source = %importer.describe(),
                candidates = out.candidates().len() - candidates_before,
                "probed import source"
            );
        }
    }

    fn describe(&self) -> String {
        let sources: Vec<String> = self.importers.iter().map(|i| i.describe()).collect();
        format!("any of [{}]", sources.join(", "))
    }
}
