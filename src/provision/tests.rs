use super::*;
use crate::import::{ImportCandidate, ImportCandidateField};
use std::panic::{self, AssertUnwindSafe};

fn key_value_file(input: &ProvisionInput) -> Result<Vec<u8>> {
    let mut content = String::new();
    for (field, value) in input.iter() {
        content.push_str(&format!("{}={}\n", field, value));
    }
    Ok(content.into_bytes())
}

fn failing_generator(_input: &ProvisionInput) -> Result<Vec<u8>> {
    Err(ShellCredError::ProvisionFailed("generator refused".into()))
}

#[test]
fn test_provision_input_from_candidate() {
    let candidate = ImportCandidate::new(vec![
        ImportCandidateField::new("user", "a"),
        ImportCandidateField::new("password", "b"),
        ImportCandidateField::new("user", "ignored"),
    ]);

    let input = ProvisionInput::from_candidate(&candidate);
    assert_eq!(input.len(), 2);
    assert_eq!(input.get("user"), Some("a"));
    assert_eq!(input.get("password"), Some("b"));
    assert!(!input.contains("host"));
}

#[test]
fn test_provision_input_debug_hides_values() {
    let input = ProvisionInput::new([("password", "hunter2")]);
    let debug = format!("{:?}", input);
    assert!(debug.contains("password"));
    assert!(!debug.contains("hunter2"));
}

#[test]
fn test_env_vars_only_touch_the_child() {
    let provisioner = EnvVars::new([
        ("token", "SHELLCRED_TEST_PROVISIONED_TOKEN"),
        ("host", "SHELLCRED_TEST_PROVISIONED_HOST"),
    ]);
    let input = ProvisionInput::new([("token", "abc")]);

    let mut out = ProvisionOutput::new();
    provisioner.provision(&input, &mut out).unwrap();

    assert_eq!(
        out.env().get("SHELLCRED_TEST_PROVISIONED_TOKEN").map(String::as_str),
        Some("abc")
    );
    assert!(!out.env().contains_key("SHELLCRED_TEST_PROVISIONED_HOST"));
    assert!(std::env::var("SHELLCRED_TEST_PROVISIONED_TOKEN").is_err());
    assert_eq!(out.state(), ProvisionState::Unprovisioned);
}

#[test]
fn test_temp_file_lifecycle() {
    let provisioner = TempFile::new(key_value_file, "credentials.ini").path_as_arg("--config");
    let input = ProvisionInput::new([("user", "u"), ("password", "p")]);

    let mut out = ProvisionOutput::new();
    assert_eq!(out.state(), ProvisionState::Unprovisioned);

    provisioner.provision(&input, &mut out).unwrap();
    assert_eq!(out.state(), ProvisionState::FileWritten);

    let args = out.args().to_vec();
    assert_eq!(args[0], "--config");
    let path = PathBuf::from(&args[1]);
    assert_eq!(fs::read_to_string(&path).unwrap(), "password=p\nuser=u\n");

    out.mark_launched();
    assert_eq!(out.state(), ProvisionState::Launched);

    out.cleanup().unwrap();
    assert_eq!(out.state(), ProvisionState::Cleaned);
    assert!(!path.exists());
    assert!(!path.parent().unwrap().exists());
}

#[test]
fn test_temp_file_path_as_env_var() {
    let provisioner = TempFile::new(key_value_file, "token").path_as_env_var("TOKEN_FILE");
    let input = ProvisionInput::new([("token", "abc")]);

    let mut out = ProvisionOutput::new();
    provisioner.provision(&input, &mut out).unwrap();

    assert!(out.args().is_empty());
    let path = PathBuf::from(out.env().get("TOKEN_FILE").unwrap());
    assert!(path.exists());
    drop(out);
    assert!(!path.exists());
}

#[test]
fn test_each_launch_gets_its_own_file() {
    let provisioner = TempFile::new(key_value_file, "my.cnf").path_as_arg("--defaults-file");
    let first_input = ProvisionInput::new([("user", "first")]);
    let second_input = ProvisionInput::new([("user", "second")]);

    let mut first = ProvisionOutput::new();
    let mut second = ProvisionOutput::new();
    provisioner.provision(&first_input, &mut first).unwrap();
    provisioner.provision(&second_input, &mut second).unwrap();

    let first_path = PathBuf::from(&first.args()[1]);
    let second_path = PathBuf::from(&second.args()[1]);
    assert_ne!(first_path, second_path);
    assert_eq!(fs::read_to_string(&first_path).unwrap(), "user=first\n");
    assert_eq!(fs::read_to_string(&second_path).unwrap(), "user=second\n");

    drop(first);
    assert!(!first_path.exists());
    assert!(second_path.exists());
}

#[test]
fn test_generator_failure_creates_nothing() {
    let provisioner = TempFile::new(failing_generator, "my.cnf").path_as_arg("--defaults-file");

    let mut out = ProvisionOutput::new();
    let result = provisioner.provision(&ProvisionInput::default(), &mut out);

    assert!(matches!(result, Err(ShellCredError::ProvisionFailed(_))));
    assert_eq!(out.state(), ProvisionState::Unprovisioned);
    assert!(out.args().is_empty());
}

#[test]
fn test_invalid_filename_is_rejected() {
    let mut out = ProvisionOutput::new();
    for filename in ["", "../escape", "nested/file", ".."] {
        assert!(
            matches!(
                out.add_temp_file(filename, b"x"),
                Err(ShellCredError::ProvisionFailed(_))
            ),
            "{} should be rejected",
            filename
        );
    }
}

#[test]
fn test_cleanup_on_panic() {
    let mut written = None;

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut out = ProvisionOutput::new();
        written = Some(out.add_temp_file("my.cnf", b"[client]\n").unwrap());
        panic!("host crashed between provisioning and launch");
    }));

    assert!(result.is_err());
    let path = written.unwrap();
    assert!(!path.exists());
}

#[test]
fn test_launch_empty_command() {
    let provisioner = EnvVars::new([("token", "TOKEN")]);
    assert!(matches!(
        launch(&provisioner, &ProvisionInput::default(), &[]),
        Err(ShellCredError::EmptyCommand)
    ));
}

#[test]
fn test_launch_missing_program_is_io_error() {
    let provisioner = TempFile::new(key_value_file, "my.cnf").path_as_arg("--defaults-file");
    let command = vec!["shellcred-test-no-such-program".to_string()];

    let result = launch(&provisioner, &ProvisionInput::new([("user", "u")]), &command);
    assert!(matches!(result, Err(ShellCredError::Io(_))));
}

#[cfg(unix)]
mod unix {
    use super::*;
    use tempfile::TempDir;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[test]
    fn test_launch_exposes_env_to_child() {
        let scratch = TempDir::new().unwrap();
        let out_file = scratch.path().join("out");
        let provisioner = EnvVars::new([("token", "SHELLCRED_TEST_CHILD_TOKEN")]);

        let status = launch(
            &provisioner,
            &ProvisionInput::new([("token", "abc")]),
            &sh(&format!(
                "printf %s \"$SHELLCRED_TEST_CHILD_TOKEN\" > '{}'",
                out_file.display()
            )),
        )
        .unwrap();

        assert!(status.success());
        assert_eq!(fs::read_to_string(&out_file).unwrap(), "abc");
        assert!(std::env::var("SHELLCRED_TEST_CHILD_TOKEN").is_err());
    }

    #[test]
    fn test_launch_removes_file_after_failing_child() {
        let scratch = TempDir::new().unwrap();
        let seen = scratch.path().join("seen");
        let provisioner = TempFile::new(key_value_file, "my.cnf").path_as_env_var("CRED_FILE");

        let status = launch(
            &provisioner,
            &ProvisionInput::new([("user", "u")]),
            &sh(&format!(
                "cat \"$CRED_FILE\" > '{seen}'; printf %s \"$CRED_FILE\" > '{seen}.path'; exit 3",
                seen = seen.display()
            )),
        )
        .unwrap();

        assert_eq!(status.code(), Some(3));
        assert_eq!(fs::read_to_string(&seen).unwrap(), "user=u\n");
        let provisioned = fs::read_to_string(scratch.path().join("seen.path")).unwrap();
        assert!(!Path::new(&provisioned).exists());
    }

    #[test]
    fn test_launch_does_not_start_child_when_provisioning_fails() {
        let scratch = TempDir::new().unwrap();
        let marker = scratch.path().join("started");
        let provisioner = TempFile::new(failing_generator, "my.cnf");

        let result = launch(
            &provisioner,
            &ProvisionInput::default(),
            &sh(&format!("touch '{}'", marker.display())),
        );

        assert!(matches!(result, Err(ShellCredError::ProvisionFailed(_))));
        assert!(!marker.exists());
    }
}
