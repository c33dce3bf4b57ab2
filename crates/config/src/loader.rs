use std::path::Path;

use tracing::debug;

use crate::{
    error::ConfigError,
    schema::{Config, ConfigFile},
};

/// Template shipped with the tool. Required — its absence is an error,
/// not a silent fallback to built-in values.
pub const TEMPLATE_FILENAME: &str = "config.template.toml";

/// Optional user override, merged over the template field-by-field.
pub const USER_FILENAME: &str = "config.toml";

/// Load configuration from `dir`.
///
/// Reads `config.template.toml` (required) and, if present, `config.toml`
/// merged on top of it. Read-only: calling twice with unchanged files
/// yields equal configurations.
pub fn load(dir: &Path) -> Result<Config, ConfigError> {
    let template_path = dir.join(TEMPLATE_FILENAME);
    if !template_path.exists() {
        return Err(ConfigError::TemplateMissing(template_path));
    }
    let template = read_file(&template_path)?;

    let user_path = dir.join(USER_FILENAME);
    let merged = if user_path.exists() {
        debug!(path = %user_path.display(), "merging user config over template");
        read_file(&user_path)?.merged_over(template)
    } else {
        template
    };

    Ok(merged.resolve(dir))
}

fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace `${ENV_VAR}` placeholders with values from the environment.
///
/// Unset variables are left as the literal placeholder so a missing
/// secret surfaces in validation instead of becoming an empty string.
fn substitute_env(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let Some(end) = rest[start..].find('}') else {
            // No closing brace — emit the remainder verbatim.
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &rest[start + 2..start + end];
        match std::env::var(name) {
            Ok(value) => out.push_str(&value),
            Err(_) => {
                out.push_str("${");
                out.push_str(name);
                out.push('}');
            },
        }
        rest = &rest[start + end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
#[allow(unsafe_code)] // std::env::set_var is unsafe in edition 2024
mod tests {
    use {secrecy::ExposeSecret, tempfile::TempDir};

    use super::*;

    const TEMPLATE: &str = r#"
client_id = "template-client"
client_secret = ""
redirect_uri = "http://localhost:8765/callback"
base_url = "https://example.atlassian.net"
"#;

    fn write_config(dir: &TempDir, name: &str, contents: &str) {
        std::fs::write(dir.path().join(name), contents).unwrap();
    }

    #[test]
    fn missing_template_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::TemplateMissing(_)));
    }

    #[test]
    fn malformed_template_is_an_error() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, TEMPLATE_FILENAME, "client_id = [not toml");
        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn template_alone_loads() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, TEMPLATE_FILENAME, TEMPLATE);

        let config = load(dir.path()).unwrap();
        assert_eq!(config.client_id, "template-client");
        assert_eq!(config.base_url, "https://example.atlassian.net");
        // Defaults kick in for fields the template leaves out.
        assert_eq!(config.scopes.len(), 3);
    }

    #[test]
    fn user_file_overrides_per_field() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, TEMPLATE_FILENAME, TEMPLATE);
        write_config(
            &dir,
            USER_FILENAME,
            "client_secret = \"s3cret\"\nbase_url = \"https://other.atlassian.net\"\n",
        );

        let config = load(dir.path()).unwrap();
        assert_eq!(config.client_id, "template-client");
        assert_eq!(config.client_secret.expose_secret(), "s3cret");
        assert_eq!(config.base_url, "https://other.atlassian.net");
    }

    #[test]
    fn load_is_idempotent() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, TEMPLATE_FILENAME, TEMPLATE);
        write_config(&dir, USER_FILENAME, "client_secret = \"s3cret\"\n");

        let first = load(dir.path()).unwrap();
        let second = load(dir.path()).unwrap();
        assert_eq!(first.client_id, second.client_id);
        assert_eq!(
            first.client_secret.expose_secret(),
            second.client_secret.expose_secret()
        );
        assert_eq!(first.redirect_uri, second.redirect_uri);
        assert_eq!(first.scopes, second.scopes);
        assert_eq!(first.base_url, second.base_url);
        assert_eq!(first.token_store_dir, second.token_store_dir);
    }

    #[test]
    fn env_placeholders_are_substituted() {
        unsafe { std::env::set_var("JIRO_TEST_SECRET", "from-env") };
        let dir = TempDir::new().unwrap();
        write_config(&dir, TEMPLATE_FILENAME, TEMPLATE);
        write_config(&dir, USER_FILENAME, "client_secret = \"${JIRO_TEST_SECRET}\"\n");

        let config = load(dir.path()).unwrap();
        assert_eq!(config.client_secret.expose_secret(), "from-env");
        unsafe { std::env::remove_var("JIRO_TEST_SECRET") };
    }

    #[test]
    fn unknown_env_placeholder_is_left_alone() {
        assert_eq!(
            substitute_env("key = \"${JIRO_NONEXISTENT_XYZ}\""),
            "key = \"${JIRO_NONEXISTENT_XYZ}\""
        );
        assert_eq!(substitute_env("no placeholders"), "no placeholders");
        assert_eq!(substitute_env("dangling ${brace"), "dangling ${brace");
    }
}
