use super::{ProvisionInput, ProvisionOutput, Provisioner};
use crate::Result;

type Generator = dyn Fn(&ProvisionInput) -> Result<Vec<u8>> + Send + Sync;

/// Provisions fields through a transient file.
///
/// The generator renders the file from the input. The file is written to a
/// private temporary directory that lives exactly as long as the launch, and its
/// path is handed to the child through [`path_as_arg`](TempFile::path_as_arg)
/// and/or [`path_as_env_var`](TempFile::path_as_env_var).
///
/// # Example
///
/// ```ignore
/// # use shellcred::provision::TempFile;
/// let provisioner = TempFile::new(mysql::option_file, "my.cnf").path_as_arg("--defaults-file");
/// ```
pub struct TempFile {
    generator: Box<Generator>,
    filename: String,
    arg_flag: Option<String>,
    env_var: Option<String>,
}

impl TempFile {
    pub fn new<G>(generator: G, filename: impl Into<String>) -> Self
    where
        G: Fn(&ProvisionInput) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        Self {
            generator: Box::new(generator),
            filename: filename.into(),
            arg_flag: None,
            env_var: None,
        }
    }

    /// Append `<flag> <path>` to the child's arguments.
    pub fn path_as_arg(mut self, flag: impl Into<String>) -> Self {
        self.arg_flag = Some(flag.into());
        self
    }

    /// Export the file's path to the child as `name`.
    pub fn path_as_env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var = Some(name.into());
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }
}

impl Provisioner for TempFile {
    fn provision(&self, input: &ProvisionInput, out: &mut ProvisionOutput) -> Result<()> {
        let contents = (self.generator)(input)?;
        let path = out.add_temp_file(&self.filename, &contents)?;
        let path = path.to_string_lossy().into_owned();

        if let Some(flag) = &self.arg_flag {
            out.add_args([flag.clone(), path.clone()]);
        }
        if let Some(name) = &self.env_var {
            out.add_env_var(name.as_str(), path);
        }
        Ok(())
    }

    fn description(&self) -> String {
        match &self.arg_flag {
            Some(flag) => format!("temporary file {} passed as {}", self.filename, flag),
            None => format!("temporary file {}", self.filename),
        }
    }
}

impl std::fmt::Debug for TempFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TempFile")
            .field("filename", &self.filename)
            .field("arg_flag", &self.arg_flag)
            .field("env_var", &self.env_var)
            .finish_non_exhaustive()
    }
}
