use super::{ImportAttempt, ImportCandidateField, ImportInput, Importer};
use crate::{Result, ShellCredError};
use ini::Ini;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Expands a leading `~` in `path` to `home`.
///
/// Only `~` and `~/...` are expanded; `~user` forms are taken literally.
/// Returns `None` when the path needs a home directory and none is known.
pub fn expand_home(path: &str, home: Option<&Path>) -> Option<PathBuf> {
    if path == "~" {
        return home.map(Path::to_path_buf);
    }
    match path.strip_prefix("~/") {
        Some(rest) => home.map(|home| home.join(rest)),
        None => Some(PathBuf::from(path)),
    }
}

/// The contents of a file found by [`TryFile`].
#[derive(Debug, Clone)]
pub struct FileContents {
    path: PathBuf,
    content: String,
}

impl FileContents {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    /// Parse the contents as an INI file.
    ///
    /// The MySQL option-file dialect is accepted: `!include` and `!includedir`
    /// directives are skipped (included files are not followed), a bare option
    /// such as `skip-ssl` reads as an empty value, and a `#` comment after a
    /// value is removed unless it is quoted.
    ///
    /// # Errors
    ///
    /// Returns [`ShellCredError::MalformedSource`] naming this file if the syntax
    /// is invalid.
    pub fn to_ini(&self) -> Result<Ini> {
        Ini::load_from_str(&option_file_to_ini(&self.content))
            .map_err(|e| ShellCredError::malformed(&self.path, e))
    }
}

fn option_file_to_ini(content: &str) -> String {
    let mut ini = String::with_capacity(content.len());
    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('!') {
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with(['#', ';']) {
            ini.push_str(line);
        } else {
            let line = strip_trailing_comment(line).trim_end();
            ini.push_str(line);
            if !trimmed.starts_with('[') && !line.contains('=') {
                ini.push('=');
            }
        }
        ini.push('\n');
    }
    ini
}

fn strip_trailing_comment(line: &str) -> &str {
    let mut quote = None;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match (quote, c) {
            _ if escaped => escaped = false,
            (_, '\\') => escaped = true,
            (None, '\'' | '"') => quote = Some(c),
            (Some(open), c) if c == open => quote = None,
            (None, '#') => return &line[..i],
            _ => {}
        }
    }
    line
}

type FileCallback = dyn Fn(&FileContents, &ImportInput, &mut ImportAttempt) + Send + Sync;

/// Imports from a file at a known path.
///
/// The file is read if present and its contents handed to the callback, which
/// turns them into candidates. An absent or unreadable-by-permission file is a
/// normal "nothing found" outcome; any other read failure is recorded as a
/// [`ShellCredError::MalformedSource`].
pub struct TryFile {
    path: String,
    callback: Box<FileCallback>,
}

impl TryFile {
    /// `path` may start with `~`, which expands to [`ImportInput::home_dir`].
    pub fn new<F>(path: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&FileContents, &ImportInput, &mut ImportAttempt) + Send + Sync + 'static,
    {
        Self {
            path: path.into(),
            callback: Box::new(callback),
        }
    }
}

/// Read the file at `path` (after `~` expansion) for an importer.
///
/// Returns `Ok(None)` when there is nothing to read: no home directory to expand
/// against, no such file, or no permission to read it.
pub(crate) fn read_file(path: &str, input: &ImportInput) -> Result<Option<FileContents>> {
    let Some(expanded) = expand_home(path, input.home_dir.as_deref()) else {
        debug!(path, "no home directory to expand path against");
        return Ok(None);
    };

    let bytes = match fs::read(&expanded) {
        Ok(bytes) => bytes,
        Err(e)
            if matches!(
                e.kind(),
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
            ) =>
        {
            debug!(path = %expanded.display(), reason = %e, "import file not available");
            return Ok(None);
        }
        Err(e) => return Err(ShellCredError::malformed(expanded, e)),
    };

    let content = String::from_utf8(bytes)
        .map_err(|_| ShellCredError::malformed(&expanded, "file is not valid UTF-8"))?;
    Ok(Some(FileContents::new(expanded, content)))
}

impl Importer for TryFile {
    fn import(&self, input: &ImportInput, out: &mut ImportAttempt) {
        match read_file(&self.path, input) {
            Ok(Some(contents)) => (self.callback)(&contents, input, out),
            Ok(None) => {}
            Err(e) => out.add_error(e),
        }
    }

    fn describe(&self) -> String {
        format!("file {}", self.path)
    }
}

/// Adds one candidate per INI section holding the non-empty values of `keys`.
///
/// Field names are the INI keys themselves. Sections without any of the keys
/// (including the implicit section before the first header, when empty)
/// contribute nothing.
pub fn ini_candidates(ini: &Ini, keys: &[&str], out: &mut ImportAttempt) {
    for (_section, properties) in ini.iter() {
        out.add_candidate(
            keys.iter()
                .filter_map(|key| {
                    properties
                        .get(key)
                        .filter(|value| !value.is_empty())
                        .map(|value| ImportCandidateField::new(*key, value))
                })
                .collect(),
        );
    }
}

/// A [`TryFile`] that parses the file as INI and extracts `keys` from every section.
pub fn try_ini_file(path: impl Into<String>, keys: &'static [&'static str]) -> TryFile {
    TryFile::new(path, move |contents, _input, out| match contents.to_ini() {
        Ok(ini) => ini_candidates(&ini, keys, out),
        Err(e) => out.add_error(e),
    })
}
