use super::{ProvisionInput, ProvisionOutput, Provisioner};
use crate::Result;

/// Provisions fields as environment variables of the child process.
///
/// Fields missing from the input are skipped.
#[derive(Debug, Clone)]
pub struct EnvVars {
    mapping: Vec<(String, String)>,
}

impl EnvVars {
    /// Create a provisioner from `(field, variable)` pairs.
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
        }
    }
}

impl Provisioner for EnvVars {
    fn provision(&self, input: &ProvisionInput, out: &mut ProvisionOutput) -> Result<()> {
        for (field, var) in &self.mapping {
            if let Some(value) = input.get(field) {
                out.add_env_var(var.as_str(), value);
            }
        }
        Ok(())
    }

    fn description(&self) -> String {
        let vars: Vec<&str> = self.mapping.iter().map(|(_, var)| var.as_str()).collect();
        format!("environment variables {}", vars.join(", "))
    }
}
