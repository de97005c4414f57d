//! # Provisioning
//!
//! Provisioners expose a resolved credential to a child process, either through
//! environment variables set on the child only or through a transient file whose
//! path is passed on the command line.
//!
//! Everything a provisioner produces is collected on a [`ProvisionOutput`], which
//! owns any temporary files for the lifetime of exactly one launch. Dropping the
//! output removes them, so cleanup happens on every exit path: normal exit,
//! failing child, failed provisioning, or a panic unwinding through the caller.
//!
//! ```rust,ignore
//! use shellcred::provision::{self, EnvVars, ProvisionInput};
//!
//! let provisioner = EnvVars::new([("token", "GITHUB_TOKEN")]);
//! let input = ProvisionInput::new([("token", "github_pat_...")]);
//! let status = provision::launch(&provisioner, &input, &["gh".into(), "repo".into(), "list".into()])?;
//! ```

use crate::import::ImportCandidate;
use crate::{Result, ShellCredError};
use std::collections::BTreeMap;
use std::fmt;
use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use tempfile::TempDir;
use tracing::{debug, instrument, warn};

pub mod env_vars;
pub mod temp_file;

#[cfg(test)]
mod tests;

pub use env_vars::EnvVars;
pub use temp_file::TempFile;

/// The resolved field values handed to a provisioner.
///
/// Produced by the host once the user has picked or confirmed a candidate. The
/// `Debug` output lists field names only.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProvisionInput {
    fields: BTreeMap<String, String>,
}

impl ProvisionInput {
    pub fn new<I, F, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<String>,
        V: Into<String>,
    {
        fields
            .into_iter()
            .map(|(field, value)| (field.into(), value.into()))
            .collect()
    }

    /// Take over the values of a discovered candidate.
    ///
    /// When a field appears more than once, the first value wins.
    pub fn from_candidate(candidate: &ImportCandidate) -> Self {
        let mut fields = BTreeMap::new();
        for f in &candidate.fields {
            fields
                .entry(f.field.clone())
                .or_insert_with(|| f.value.clone());
        }
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<F: Into<String>, V: Into<String>> FromIterator<(F, V)> for ProvisionInput {
    fn from_iter<I: IntoIterator<Item = (F, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(field, value)| (field.into(), value.into()))
                .collect(),
        }
    }
}

impl fmt::Debug for ProvisionInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionInput")
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Where a launch is in its lifecycle.
///
/// `Cleaned` is reachable from every other state, and is always reached once the
/// [`ProvisionOutput`] is cleaned up or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionState {
    Unprovisioned,
    FileWritten,
    Launched,
    Cleaned,
}

/// The launch configuration provisioners add to.
///
/// Environment variables and arguments apply to the child process only; the
/// parent's environment is never touched.
pub struct ProvisionOutput {
    env: BTreeMap<String, String>,
    args: Vec<String>,
    temp_dirs: Vec<TempDir>,
    state: ProvisionState,
}

impl ProvisionOutput {
    pub fn new() -> Self {
        Self {
            env: BTreeMap::new(),
            args: Vec::new(),
            temp_dirs: Vec::new(),
            state: ProvisionState::Unprovisioned,
        }
    }

    pub fn state(&self) -> ProvisionState {
        self.state
    }

    /// Set an environment variable on the child process.
    pub fn add_env_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.env.insert(name.into(), value.into());
    }

    /// Add arguments to pass to the child process.
    pub fn add_args<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Write `contents` to `filename` inside a fresh private temporary directory.
    ///
    /// The directory is owned by this output and removed with it. On unix the
    /// directory is only accessible by its owner and the file is created with
    /// mode `0600`.
    ///
    /// # Errors
    ///
    /// Returns [`ShellCredError::ProvisionFailed`] if the directory or file cannot
    /// be created or written. Anything already created is still removed when
    /// this output is dropped.
    pub fn add_temp_file(&mut self, filename: &str, contents: &[u8]) -> Result<PathBuf> {
        if Path::new(filename).file_name() != Some(OsStr::new(filename)) {
            return Err(ShellCredError::ProvisionFailed(format!(
                "invalid temporary file name '{}'",
                filename
            )));
        }

        let dir = tempfile::Builder::new()
            .prefix("shellcred-")
            .tempdir()
            .map_err(|e| ShellCredError::provision_failed(&std::env::temp_dir(), e))?;
        let path = dir.path().join(filename);
        self.temp_dirs.push(dir);

        write_private(&path, contents).map_err(|e| ShellCredError::provision_failed(&path, e))?;
        debug!(path = %path.display(), "wrote temporary credential file");

        self.state = ProvisionState::FileWritten;
        Ok(path)
    }

    /// Apply the environment and arguments to `cmd`.
    ///
    /// Arguments are appended to whatever `cmd` already has.
    pub fn apply(&self, cmd: &mut Command) {
        cmd.envs(&self.env);
        cmd.args(&self.args);
    }

    pub(crate) fn mark_launched(&mut self) {
        self.state = ProvisionState::Launched;
    }

    /// Remove every temporary file created for this launch.
    ///
    /// Dropping the output has the same effect but cannot report errors.
    pub fn cleanup(&mut self) -> Result<()> {
        let mut result = Ok(());
        for dir in self.temp_dirs.drain(..) {
            let path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => debug!(path = %path.display(), "removed temporary credential files"),
                Err(e) => {
                    if result.is_ok() {
                        result = Err(ShellCredError::Io(e));
                    }
                }
            }
        }
        self.state = ProvisionState::Cleaned;
        result
    }
}

impl Default for ProvisionOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProvisionOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionOutput")
            .field("env", &self.env.keys().collect::<Vec<_>>())
            .field("args", &self.args.len())
            .field("temp_dirs", &self.temp_dirs)
            .field("state", &self.state)
            .finish()
    }
}

impl Drop for ProvisionOutput {
    fn drop(&mut self) {
        if self.state != ProvisionState::Cleaned {
            if let Err(e) = self.cleanup() {
                warn!(error = %e, "failed to remove temporary credential files");
            }
        }
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create_new(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

/// Exposes a resolved credential to a child process.
///
/// [`ProvisionOutput::apply`] appends the provisioned arguments to a command,
/// while [`launch`] places them directly after the program, ahead of the
/// caller's arguments.
pub trait Provisioner: Send + Sync {
    /// Add the environment, arguments and files the child needs to `out`.
    ///
    /// # Errors
    ///
    /// Any error aborts the launch; the child process must not be started.
    fn provision(&self, input: &ProvisionInput, out: &mut ProvisionOutput) -> Result<()>;

    /// A short human-readable description, for diagnostics.
    fn description(&self) -> String;
}

/// Provision `input` and run `command` with it, then clean up.
///
/// `command[0]` is the program. Provisioned arguments are placed directly after
/// the program, ahead of the caller's own arguments: `mysql` only reads
/// `--defaults-file` as its first option.
///
/// # Errors
///
/// - [`ShellCredError::EmptyCommand`] if `command` is empty
/// - any provisioning error, in which case the command is never started
/// - [`ShellCredError::Io`] if the command cannot be spawned
#[instrument(skip_all, fields(provisioner = %provisioner.description()))]
pub fn launch(
    provisioner: &dyn Provisioner,
    input: &ProvisionInput,
    command: &[String],
) -> Result<ExitStatus> {
    let (program, args) = command.split_first().ok_or(ShellCredError::EmptyCommand)?;

    let mut out = ProvisionOutput::new();
    provisioner.provision(input, &mut out)?;

    let mut cmd = Command::new(program);
    out.apply(&mut cmd);
    cmd.args(args);

    out.mark_launched();
    debug!(%program, "launching with provisioned credential");
    let status = cmd.status();

    if let Err(e) = out.cleanup() {
        warn!(error = %e, "failed to remove temporary credential files");
    }
    Ok(status?)
}
