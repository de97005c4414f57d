use super::url;
use crate::CredentialType;
use crate::import::{TryAll, TryFile, try_ini_file};
use crate::provision::{ProvisionInput, TempFile};
use crate::{Result, ShellCredError};
use shellcred_core::{CredentialField, CredentialSchema};

/// Host written to the option file when none is provided.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port written to the option file when none is provided.
pub const DEFAULT_PORT: &str = "3306";

/// Keys read from option files, in the order they are reported.
const OPTION_KEYS: &[&str] = &["user", "password", "database", "host", "port"];

/// MySQL login: password plus optional host, port, user and database.
///
/// Provisioned as a `my.cnf` option file passed via `--defaults-file`.
/// Discovered from the system and per-user option files.
pub fn database_credentials() -> CredentialType {
    let schema = CredentialSchema {
        name: "Database Credentials".to_string(),
        docs_url: url("https://dev.mysql.com/doc/refman/en/connecting.html"),
        management_url: None,
        fields: vec![
            CredentialField::new("host")
                .description("MySQL host to connect to.")
                .optional(),
            CredentialField::new("port")
                .description("Port used to connect to MySQL.")
                .optional(),
            CredentialField::new("user")
                .description("MySQL user to authenticate as.")
                .optional(),
            CredentialField::new("password")
                .description("Password used to authenticate to MySQL.")
                .secret(),
            CredentialField::new("database")
                .description("Database name to connect to.")
                .optional(),
        ],
    };

    let importer = TryAll::new(vec![
        Box::new(try_option_file("/etc/my.cnf")),
        Box::new(try_option_file("/etc/mysql/my.cnf")),
        Box::new(try_option_file("~/.my.cnf")),
        Box::new(try_option_file("~/.mylogin.cnf")),
    ]);

    let provisioner = TempFile::new(option_file, "my.cnf").path_as_arg("--defaults-file");

    CredentialType::new(schema, importer, provisioner)
}

/// Import one candidate per section of the option file at `path`.
pub fn try_option_file(path: &str) -> TryFile {
    try_ini_file(path, OPTION_KEYS)
}

/// Render a `[client]` option file.
///
/// Lines come in a fixed order: `host`, `port`, `user`, `password`, `database`.
/// `host` and `port` fall back to [`DEFAULT_HOST`] and [`DEFAULT_PORT`]; the
/// other keys are written only when present.
///
/// # Errors
///
/// Returns [`ShellCredError::ProvisionFailed`] if a value contains a line break,
/// which would let it inject further options.
pub fn option_file(input: &ProvisionInput) -> Result<Vec<u8>> {
    let host = input.get("host").unwrap_or(DEFAULT_HOST);
    let port = input.get("port").unwrap_or(DEFAULT_PORT);

    let lines = [
        ("host", Some(host)),
        ("port", Some(port)),
        ("user", input.get("user")),
        ("password", input.get("password")),
        ("database", input.get("database")),
    ];

    let mut content = String::from("[client]\n");
    for (key, value) in lines {
        let Some(value) = value else {
            continue;
        };
        if value.contains(['\n', '\r']) {
            return Err(ShellCredError::ProvisionFailed(format!(
                "value for '{}' contains a line break",
                key
            )));
        }
        content.push_str(&format!("{}={}\n", key, value));
    }

    Ok(content.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::ImportInput;
    use crate::provision::{ProvisionOutput, ProvisionState, Provisioner};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_option_file_with_defaults() {
        let input = ProvisionInput::new([("user", "u"), ("password", "p")]);
        let content = String::from_utf8(option_file(&input).unwrap()).unwrap();

        assert_eq!(
            content,
            "[client]\nhost=127.0.0.1\nport=3306\nuser=u\npassword=p\n"
        );

        let mut lines: Vec<&str> = content.lines().skip(1).collect();
        lines.sort();
        assert_eq!(
            lines,
            vec!["host=127.0.0.1", "password=p", "port=3306", "user=u"]
        );
    }

    #[test]
    fn test_option_file_with_all_fields() {
        let input = ProvisionInput::new([
            ("host", "db.internal"),
            ("port", "3307"),
            ("user", "app"),
            ("password", "p"),
            ("database", "orders"),
        ]);
        let content = String::from_utf8(option_file(&input).unwrap()).unwrap();

        assert_eq!(
            content,
            "[client]\nhost=db.internal\nport=3307\nuser=app\npassword=p\ndatabase=orders\n"
        );
    }

    #[test]
    fn test_option_file_rejects_line_breaks() {
        let input = ProvisionInput::new([("password", "p\nhost=evil")]);
        match option_file(&input) {
            Err(ShellCredError::ProvisionFailed(msg)) => {
                assert!(msg.contains("password"));
                assert!(!msg.contains("evil"));
            }
            other => panic!("Expected ProvisionFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_schema() {
        let credential = database_credentials();
        credential.schema.validate().unwrap();
        assert!(credential.schema.docs_url.is_some());

        let required: Vec<_> = credential
            .schema
            .required_fields()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(required, vec!["password"]);
    }

    #[test]
    fn test_import_from_home_option_file() {
        let home = TempDir::new().unwrap();
        fs::write(
            home.path().join(".my.cnf"),
            "[client]\nuser=root\npassword=secret\nport=3307\n",
        )
        .unwrap();

        let credential = database_credentials();
        let attempt = credential.import(&ImportInput::new().with_home_dir(home.path()));

        let found: Vec<_> = attempt
            .candidates()
            .iter()
            .filter(|c| c.get("user") == Some("root"))
            .collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("password"), Some("secret"));
        assert_eq!(found[0].get("port"), Some("3307"));
    }

    #[test]
    fn test_import_from_option_file_with_mysql_syntax() {
        let home = TempDir::new().unwrap();
        fs::write(
            home.path().join(".my.cnf"),
            "!includedir /etc/mysql/conf.d/\n\n[mysql]\nquick\nauto-rehash\n\n[client]\nuser=app # deploy user\npassword=secret\n",
        )
        .unwrap();

        let credential = database_credentials();
        let attempt = credential.import(&ImportInput::new().with_home_dir(home.path()));

        let found: Vec<_> = attempt
            .candidates()
            .iter()
            .filter(|c| c.get("user") == Some("app"))
            .collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("password"), Some("secret"));
        assert!(
            attempt
                .candidates()
                .iter()
                .all(|c| c.field_names().all(|name| OPTION_KEYS.contains(&name)))
        );
    }

    #[test]
    fn test_provision_writes_private_file_and_flag() {
        let credential = database_credentials();
        let input = ProvisionInput::new([("user", "u"), ("password", "p")]);

        let mut out = ProvisionOutput::new();
        credential.provisioner.provision(&input, &mut out).unwrap();
        assert_eq!(out.state(), ProvisionState::FileWritten);

        let args = out.args().to_vec();
        assert_eq!(args.len(), 2);
        assert_eq!(args[0], "--defaults-file");
        let path = std::path::PathBuf::from(&args[1]);
        assert_eq!(path.file_name().unwrap(), "my.cnf");
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[client]\nhost=127.0.0.1\nport=3306\nuser=u\npassword=p\n"
        );

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        drop(out);
        assert!(!path.exists());
    }
}
