//! Credential types: a schema bundled with how to discover and provision it

use crate::import::{ImportAttempt, ImportInput, TryAll};
use crate::provision::{self, ProvisionInput, Provisioner};
use crate::{Result, ShellCredError};
use shellcred_core::CredentialSchema;
use std::process::ExitStatus;
use tracing::warn;

/// One kind of credential and the machinery around it.
///
/// The schema is plain data; the importer and provisioner are strategy values
/// chosen per credential type.
pub struct CredentialType {
    pub schema: CredentialSchema,
    pub importer: TryAll,
    pub provisioner: Box<dyn Provisioner>,
}

impl CredentialType {
    pub fn new(
        schema: CredentialSchema,
        importer: TryAll,
        provisioner: impl Provisioner + 'static,
    ) -> Self {
        Self {
            schema,
            importer,
            provisioner: Box::new(provisioner),
        }
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    /// Discover candidates for this credential type.
    pub fn import(&self, input: &ImportInput) -> ImportAttempt {
        self.importer.run(&self.schema, input)
    }

    /// Check that `input` can be provisioned.
    ///
    /// Every non-optional field must be present. Values that do not match their
    /// composition are reported but do not prevent provisioning.
    ///
    /// # Errors
    ///
    /// Returns [`ShellCredError::MissingField`] for the first required field that
    /// is not set.
    pub fn check(&self, input: &ProvisionInput) -> Result<()> {
        if let Some(field) = self.schema.required_fields().find(|f| !input.contains(&f.name)) {
            return Err(ShellCredError::MissingField(field.name.clone()));
        }

        for field in self.schema.mismatches(input.iter()) {
            warn!(
                credential = %self.schema.name,
                %field,
                "value does not match the expected composition"
            );
        }
        Ok(())
    }

    /// Check `input`, then run `command` with it provisioned.
    pub fn launch(&self, input: &ProvisionInput, command: &[String]) -> Result<ExitStatus> {
        self.check(input)?;
        provision::launch(self.provisioner.as_ref(), input, command)
    }
}

impl std::fmt::Debug for CredentialType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialType")
            .field("schema", &self.schema)
            .field("importers", &self.importer.len())
            .field("provisioner", &self.provisioner.description())
            .finish()
    }
}
