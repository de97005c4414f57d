use super::{ImportAttempt, ImportCandidate, ImportCandidateField, ImportInput, Importer};

/// Imports a group of environment variables that belong together.
///
/// Produces one candidate holding every mapped variable that is set and
/// non-empty, or nothing at all when the primary variable is missing. The
/// primary field is the first one in the mapping unless set with
/// [`primary`](EnvVarPair::primary).
///
/// # Example
///
/// ```ignore
/// # use shellcred::import::EnvVarPair;
/// let importer = EnvVarPair::new([("token", "GH_ENTERPRISE_TOKEN"), ("host", "GH_HOST")]);
/// ```
#[derive(Debug, Clone)]
pub struct EnvVarPair {
    mapping: Vec<(String, String)>,
    primary: Option<String>,
}

impl EnvVarPair {
    /// Create an importer from `(field, variable)` pairs, in order.
    pub fn new<I, F, V>(mapping: I) -> Self
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<String>,
        V: Into<String>,
    {
        Self {
            mapping: mapping
                .into_iter()
                .map(|(field, var)| (field.into(), var.into()))
                .collect(),
            primary: None,
        }
    }

    /// Set the field whose variable must be present for a candidate to exist.
    pub fn primary(mut self, field: impl Into<String>) -> Self {
        self.primary = Some(field.into());
        self
    }

    pub fn mapping(&self) -> &[(String, String)] {
        &self.mapping
    }

    fn primary_var(&self) -> Option<&str> {
        match &self.primary {
            Some(primary) => self
                .mapping
                .iter()
                .find(|(field, _)| field == primary)
                .map(|(_, var)| var.as_str()),
            None => self.mapping.first().map(|(_, var)| var.as_str()),
        }
    }
}

impl Importer for EnvVarPair {
    fn import(&self, input: &ImportInput, out: &mut ImportAttempt) {
        let Some(primary_var) = self.primary_var() else {
            return;
        };
        if input.env_var(primary_var).is_none() {
            return;
        }

        out.add_candidate(
            self.mapping
                .iter()
                .filter_map(|(field, var)| {
                    input
                        .env_var(var)
                        .map(|value| ImportCandidateField::new(field.as_str(), value))
                })
                .collect(),
        );
    }

    fn describe(&self) -> String {
        let vars: Vec<&str> = self.mapping.iter().map(|(_, var)| var.as_str()).collect();
        format!("environment variables {}", vars.join(" + "))
    }
}

/// Imports a single field from the first of several alternative variables.
///
/// Variables are tried in order and the first non-empty one wins; the rest are
/// not consulted.
#[derive(Debug, Clone)]
pub struct AllEnvVars {
    field: String,
    vars: Vec<String>,
}

impl AllEnvVars {
    pub fn new<I, V>(field: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            field: field.into(),
            vars: vars.into_iter().map(Into::into).collect(),
        }
    }
}

impl Importer for AllEnvVars {
    fn import(&self, input: &ImportInput, out: &mut ImportAttempt) {
        if let Some(value) = self.vars.iter().find_map(|var| input.env_var(var)) {
            out.add_candidate(ImportCandidate::new(vec![ImportCandidateField::new(
                self.field.as_str(),
                value,
            )]));
        }
    }

    fn describe(&self) -> String {
        format!("first of environment variables {}", self.vars.join(", "))
    }
}
