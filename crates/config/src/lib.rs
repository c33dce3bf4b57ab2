//! Configuration loading for the jiro CLI.
//!
//! Configuration is read once per process from a template file plus an
//! optional user override and threaded explicitly through component
//! constructors — there is no process-wide config singleton.

mod error;
mod loader;
mod schema;

pub use {
    error::ConfigError,
    loader::{TEMPLATE_FILENAME, USER_FILENAME, load},
    schema::Config,
};
