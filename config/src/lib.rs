//! Load configuration from XDG `config.toml` and project `.env`.
//!
//! - [`load_and_apply`] sets process environment variables with priority
//!   **existing env > .env > XDG `[env]`** (API keys such as `OPENAI_API_KEY`).
//! - [`load_pipeline_section`] reads the XDG `[pipeline]` table and applies
//!   `<APP>_*` environment overrides.

mod dotenv;
mod pipeline;
mod xdg_toml;

use std::path::Path;
use thiserror::Error;

pub use pipeline::{env_prefix, load_pipeline_section, PipelineSection};
pub use xdg_toml::config_path;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("xdg config path: {0}")]
    XdgPath(String),
    #[error("read xdg config: {0}")]
    XdgRead(std::io::Error),
    #[error("parse xdg toml: {0}")]
    XdgParse(#[from] toml::de::Error),
    #[error("read .env: {0}")]
    DotenvRead(std::io::Error),
    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: String, value: String },
}

/// Loads `.env` and the XDG `[env]` table, then sets every key that is **not**
/// already present in the process environment.
///
/// * `app_name`: e.g. `"deepflow"`; the XDG file is `<config home>/<app_name>/config.toml`.
/// * `override_dir`: look for `.env` here instead of the current directory.
pub fn load_and_apply(app_name: &str, override_dir: Option<&Path>) -> Result<(), LoadError> {
    let xdg_map = xdg_toml::load_file(app_name)?.env;
    let dotenv_map = dotenv::load_env_map(override_dir).map_err(LoadError::DotenvRead)?;

    let keys: std::collections::BTreeSet<&String> =
        xdg_map.keys().chain(dotenv_map.keys()).collect();
    for key in keys {
        if std::env::var_os(key).is_some() {
            continue;
        }
        if let Some(v) = dotenv_map.get(key).or_else(|| xdg_map.get(key)) {
            std::env::set_var(key, v);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xdg_toml::test_support::{with_xdg, write_config};
    use std::env;

    #[test]
    fn existing_env_wins() {
        let xdg = tempfile::tempdir().unwrap();
        write_config(xdg.path(), "cfgtest-existing", "[env]\nCONFIG_TEST_EXISTING = \"xdg\"\n");
        env::set_var("CONFIG_TEST_EXISTING", "from_env");
        let empty = tempfile::tempdir().unwrap();
        let r = with_xdg(xdg.path(), || {
            load_and_apply("cfgtest-existing", Some(empty.path()))
        });
        assert!(r.is_ok());
        assert_eq!(env::var("CONFIG_TEST_EXISTING").as_deref(), Ok("from_env"));
        env::remove_var("CONFIG_TEST_EXISTING");
    }

    #[test]
    fn dotenv_overrides_xdg() {
        let xdg = tempfile::tempdir().unwrap();
        write_config(xdg.path(), "cfgtest-prio", "[env]\nCONFIG_TEST_PRIORITY = \"from_xdg\"\nCONFIG_TEST_XDG_ONLY = \"xdg\"\n");
        let dotenv_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dotenv_dir.path().join(".env"),
            "CONFIG_TEST_PRIORITY=from_dotenv\n",
        )
        .unwrap();
        env::remove_var("CONFIG_TEST_PRIORITY");
        env::remove_var("CONFIG_TEST_XDG_ONLY");

        let r = with_xdg(xdg.path(), || load_and_apply("cfgtest-prio", Some(dotenv_dir.path())));
        let prio = env::var("CONFIG_TEST_PRIORITY");
        let xdg_only = env::var("CONFIG_TEST_XDG_ONLY");
        env::remove_var("CONFIG_TEST_PRIORITY");
        env::remove_var("CONFIG_TEST_XDG_ONLY");

        assert!(r.is_ok());
        assert_eq!(prio.as_deref(), Ok("from_dotenv"));
        assert_eq!(xdg_only.as_deref(), Ok("xdg"));
    }

    #[test]
    fn invalid_xdg_toml_fails_with_xdg_parse_error() {
        let xdg = tempfile::tempdir().unwrap();
        write_config(xdg.path(), "cfgtest-invalid", "invalid [[[\n");
        let result = with_xdg(xdg.path(), || load_and_apply("cfgtest-invalid", None));
        assert!(matches!(result, Err(LoadError::XdgParse(_))));
    }
}
