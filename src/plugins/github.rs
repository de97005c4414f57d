use super::url;
use crate::CredentialType;
use crate::import::{AllEnvVars, EnvVarPair, TryAll};
use crate::provision::EnvVars;
use shellcred_core::{Charset, CredentialField, CredentialSchema, ValueComposition};

/// Fine-grained GitHub personal access token.
///
/// Provisioned as `GITHUB_TOKEN`. Discovered from `GITHUB_TOKEN`, then `GH_TOKEN`
/// or `GITHUB_PAT`, then the enterprise variables paired with `GH_HOST`.
pub fn personal_access_token() -> CredentialType {
    let schema = CredentialSchema {
        name: "Personal Access Token".to_string(),
        docs_url: url(
            "https://docs.github.com/en/authentication/keeping-your-account-and-data-secure/creating-a-personal-access-token",
        ),
        management_url: url("https://github.com/settings/tokens"),
        fields: vec![
            CredentialField::new("token")
                .description("Token used to authenticate to GitHub.")
                .secret()
                .composition(ValueComposition {
                    length: Some(93),
                    prefix: Some("github_pat_".to_string()),
                    // Tokens separate their parts with `_`.
                    charset: Charset {
                        symbols: true,
                        ..Charset::ALPHANUMERIC
                    },
                }),
            CredentialField::new("host")
                .description("The GitHub host to authenticate to. Defaults to 'github.com'.")
                .optional(),
        ],
    };

    let importer = TryAll::new(vec![
        Box::new(EnvVarPair::new([("token", "GITHUB_TOKEN")])),
        Box::new(AllEnvVars::new("token", ["GH_TOKEN", "GITHUB_PAT"])),
        Box::new(EnvVarPair::new([
            ("token", "GH_ENTERPRISE_TOKEN"),
            ("host", "GH_HOST"),
        ])),
        Box::new(EnvVarPair::new([
            ("token", "GITHUB_ENTERPRISE_TOKEN"),
            ("host", "GH_HOST"),
        ])),
        Box::new(EnvVarPair::new([("token", "GH_TOKEN"), ("host", "GH_HOST")])),
        Box::new(EnvVarPair::new([("token", "GITHUB_TOKEN"), ("host", "GH_HOST")])),
    ]);

    CredentialType::new(schema, importer, EnvVars::new([("token", "GITHUB_TOKEN")]))
}
