use std::path::{Path, PathBuf};

use {
    secrecy::{ExposeSecret, SecretString},
    serde::Deserialize,
};

use crate::error::ConfigError;

/// Scopes requested when the template does not name any.
const DEFAULT_SCOPES: &[&str] = &["offline_access", "read:jira-work", "write:jira-work"];

/// Directory for the token record when the template does not name one,
/// resolved relative to the config directory.
const DEFAULT_TOKEN_STORE_DIR: &str = ".jiro";

/// Resolved CLI configuration.
///
/// Immutable after [`crate::load`] returns it; components receive it by
/// value or reference through their constructors.
#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub base_url: String,
    pub token_store_dir: PathBuf,
    pub default_project_key: Option<String>,
}

impl Config {
    /// Check the fields the authorization flow cannot start without.
    pub fn require_flow_fields(&self) -> Result<(), ConfigError> {
        if self.client_id.is_empty() {
            return Err(ConfigError::MissingField("client_id"));
        }
        if self.client_secret.expose_secret().is_empty() {
            return Err(ConfigError::MissingField("client_secret"));
        }
        if self.redirect_uri.is_empty() {
            return Err(ConfigError::MissingField("redirect_uri"));
        }
        Ok(())
    }

    /// Space-joined scope string for the authorization request.
    pub fn scope(&self) -> String {
        self.scopes.join(" ")
    }
}

/// One config file on disk. Every field is optional so the user file can
/// override the template field-by-field.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ConfigFile {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub redirect_uri: Option<String>,
    pub scopes: Option<Vec<String>>,
    pub base_url: Option<String>,
    pub token_store_dir: Option<PathBuf>,
    pub default_project_key: Option<String>,
}

impl ConfigFile {
    /// Merge `self` over `template`. Fields present here win; absent
    /// fields fall back to the template value.
    pub(crate) fn merged_over(self, template: ConfigFile) -> ConfigFile {
        ConfigFile {
            client_id: self.client_id.or(template.client_id),
            client_secret: self.client_secret.or(template.client_secret),
            redirect_uri: self.redirect_uri.or(template.redirect_uri),
            scopes: self.scopes.or(template.scopes),
            base_url: self.base_url.or(template.base_url),
            token_store_dir: self.token_store_dir.or(template.token_store_dir),
            default_project_key: self.default_project_key.or(template.default_project_key),
        }
    }

    /// Fill defaults and resolve paths against the config directory.
    pub(crate) fn resolve(self, dir: &Path) -> Config {
        let token_store_dir = self
            .token_store_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_STORE_DIR));
        let token_store_dir = if token_store_dir.is_absolute() {
            token_store_dir
        } else {
            dir.join(token_store_dir)
        };

        Config {
            client_id: self.client_id.unwrap_or_default(),
            client_secret: self
                .client_secret
                .unwrap_or_else(|| SecretString::new(String::new())),
            redirect_uri: self.redirect_uri.unwrap_or_default(),
            scopes: self
                .scopes
                .unwrap_or_else(|| DEFAULT_SCOPES.iter().map(|s| (*s).to_string()).collect()),
            base_url: self.base_url.unwrap_or_default(),
            token_store_dir,
            default_project_key: self.default_project_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(client_id: Option<&str>, base_url: Option<&str>) -> ConfigFile {
        ConfigFile {
            client_id: client_id.map(String::from),
            base_url: base_url.map(String::from),
            ..ConfigFile::default()
        }
    }

    #[test]
    fn override_wins_field_by_field() {
        let template = file(Some("template-id"), Some("https://a.atlassian.net"));
        let user = file(None, Some("https://b.atlassian.net"));

        let merged = user.merged_over(template);
        assert_eq!(merged.client_id.as_deref(), Some("template-id"));
        assert_eq!(merged.base_url.as_deref(), Some("https://b.atlassian.net"));
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let config = ConfigFile::default().resolve(Path::new("/etc/jiro"));
        assert_eq!(config.scopes, DEFAULT_SCOPES);
        assert_eq!(config.token_store_dir, Path::new("/etc/jiro/.jiro"));
        assert!(config.default_project_key.is_none());
    }

    #[test]
    fn absolute_token_store_dir_is_kept() {
        let config = ConfigFile {
            token_store_dir: Some(PathBuf::from("/var/lib/jiro")),
            ..ConfigFile::default()
        }
        .resolve(Path::new("/etc/jiro"));
        assert_eq!(config.token_store_dir, Path::new("/var/lib/jiro"));
    }

    #[test]
    fn flow_fields_validated() {
        let mut config = ConfigFile {
            client_id: Some("id".into()),
            client_secret: Some(SecretString::new("secret".into())),
            redirect_uri: Some("http://localhost:8765/callback".into()),
            ..ConfigFile::default()
        }
        .resolve(Path::new("/etc/jiro"));
        assert!(config.require_flow_fields().is_ok());

        config.redirect_uri.clear();
        let err = config.require_flow_fields().unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("redirect_uri")));
    }

    #[test]
    fn scope_is_space_joined() {
        let config = ConfigFile::default().resolve(Path::new("/etc/jiro"));
        assert_eq!(config.scope(), "offline_access read:jira-work write:jira-work");
    }
}
