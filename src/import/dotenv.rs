use super::file::{FileContents, read_file};
use super::{ImportAttempt, ImportCandidateField, ImportInput, Importer};
use crate::{Result, ShellCredError};
use std::collections::HashMap;

/// Stands in for a `$` that must stay literal while the file is parsed.
const LITERAL_DOLLAR: char = '\u{E000}';

/// Imports from a `.env` file.
///
/// The file's entries are matched against a `(field, variable)` mapping the same
/// way [`EnvVarPair`](super::EnvVarPair) matches the process environment: one
/// candidate with every mapped, non-empty entry, or nothing when the primary
/// (first) variable is missing. An absent or unreadable file contributes
/// nothing; a file that cannot be parsed is recorded as
/// [`ShellCredError::MalformedSource`].
///
/// References such as `${NAME}` or `$NAME` resolve against
/// [`ImportInput::env`] first, then against entries earlier in the same file,
/// and otherwise expand to nothing. The process environment is never read.
/// `\$` and single-quoted values stay literal.
#[derive(Debug, Clone)]
pub struct DotEnvFile {
    path: String,
    mapping: Vec<(String, String)>,
}

impl DotEnvFile {
    pub fn new<I, F, V>(path: impl Into<String>, mapping: I) -> Self
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<String>,
        V: Into<String>,
    {
        Self {
            path: path.into(),
            mapping: mapping
                .into_iter()
                .map(|(field, var)| (field.into(), var.into()))
                .collect(),
        }
    }

    fn load_env_vars(
        &self,
        contents: &FileContents,
        input: &ImportInput,
    ) -> Result<HashMap<String, String>> {
        let escaped = escape_references(contents.as_str());
        let mut vars = HashMap::new();
        for item in dotenvy::from_read_iter(escaped.as_bytes()) {
            // dotenvy's message quotes the offending line, which may hold a secret.
            let (key, value) = item.map_err(|e| match e {
                dotenvy::Error::LineParse(..) => {
                    ShellCredError::malformed(contents.path(), "invalid dotenv syntax")
                }
                other => ShellCredError::malformed(contents.path(), other),
            })?;
            let value = resolve_references(&value, |name| {
                input.env.get(name).or_else(|| vars.get(name)).cloned()
            });
            vars.insert(key, value);
        }
        Ok(vars)
    }
}

impl Importer for DotEnvFile {
    fn import(&self, input: &ImportInput, out: &mut ImportAttempt) {
        let contents = match read_file(&self.path, input) {
            Ok(Some(contents)) => contents,
            Ok(None) => return,
            Err(e) => {
                out.add_error(e);
                return;
            }
        };

        let vars = match self.load_env_vars(&contents, input) {
            Ok(vars) => vars,
            Err(e) => {
                out.add_error(e);
                return;
            }
        };

        let present = |var: &str| vars.get(var).filter(|value| !value.is_empty());
        let Some((_, primary)) = self.mapping.first() else {
            return;
        };
        if present(primary.as_str()).is_none() {
            return;
        }

        out.add_candidate(
            self.mapping
                .iter()
                .filter_map(|(field, var)| {
                    present(var.as_str())
                        .map(|value| ImportCandidateField::new(field.as_str(), value.as_str()))
                })
                .collect(),
        );
    }

    fn describe(&self) -> String {
        format!("dotenv file {}", self.path)
    }
}

/// Rewrite `content` so that dotenvy performs no substitution of its own.
///
/// Every `$` that would start a reference is escaped as `\$`, leaving the
/// reference in the parsed value for [`resolve_references`]. A `$` that is
/// already literal (`\$`, or inside single quotes) becomes [`LITERAL_DOLLAR`].
fn escape_references(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut quote: Option<char> = None;
    let mut prev = '\n';
    let mut chars = content.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some('\''), '\'') => {
                quote = None;
                out.push(c);
            }
            (Some('\''), '$') => out.push(LITERAL_DOLLAR),
            (Some('\''), _) => out.push(c),
            (_, '\\') => match chars.next() {
                Some('$') => out.push(LITERAL_DOLLAR),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            },
            (_, '$') => out.push_str("\\$"),
            (Some('"'), '"') => {
                quote = None;
                out.push(c);
            }
            (None, '\'' | '"') => {
                quote = Some(c);
                out.push(c);
            }
            (None, '#') if prev.is_whitespace() => {
                out.push(c);
                for rest in chars.by_ref() {
                    out.push(rest);
                    if rest == '\n' {
                        break;
                    }
                }
                prev = '\n';
                continue;
            }
            _ => out.push(c),
        }
        prev = c;
    }
    out
}

/// Expand `$NAME` and `${NAME}` in `value` using `lookup`.
///
/// Unknown names expand to nothing. A `$` not followed by a name is kept.
fn resolve_references<F>(value: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let is_name_char = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find('$') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let (name, consumed) = match after.strip_prefix('{') {
            Some(braced) => match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            },
            None => {
                let end = after.find(|c| !is_name_char(c)).unwrap_or(after.len());
                (&after[..end], end)
            }
        };

        if name.is_empty() || !name.chars().all(is_name_char) {
            out.push('$');
            rest = after;
            continue;
        }
        if let Some(resolved) = lookup(name) {
            out.push_str(&resolved);
        }
        rest = &after[consumed..];
    }
    out.push_str(rest);
    out.replace(LITERAL_DOLLAR, "$")
}
