use std::path::PathBuf;

/// Configuration failures. All fatal — nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "config template {} not found; copy it next to your config.toml and fill in your OAuth app credentials",
        .0.display()
    )]
    TemplateMissing(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("configuration field `{0}` must be set before authorization can start")]
    MissingField(&'static str),
}
