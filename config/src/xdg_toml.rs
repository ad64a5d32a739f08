//! Read `$XDG_CONFIG_HOME/<app>/config.toml` (falling back to `~/.config`).
//!
//! Two tables are recognised: `[env]` (string variables applied to the process
//! environment) and `[pipeline]` (run settings, see [`PipelineSection`]).

use std::collections::HashMap;
use std::path::PathBuf;

use crate::{LoadError, PipelineSection};

#[derive(serde::Deserialize, Default)]
pub(crate) struct ConfigFile {
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub pipeline: PipelineSection,
}

fn config_home() -> Result<PathBuf, LoadError> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME").filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".config"))
        .ok_or_else(|| LoadError::XdgPath("cannot determine home directory".to_string()))
}

/// Path of the app's config file; `None` when it does not exist.
pub fn config_path(app_name: &str) -> Result<Option<PathBuf>, LoadError> {
    let path = config_home()?.join(app_name).join("config.toml");
    Ok(path.is_file().then_some(path))
}

/// Parses the whole file. Missing file yields empty tables.
pub(crate) fn load_file(app_name: &str) -> Result<ConfigFile, LoadError> {
    let Some(path) = config_path(app_name)? else {
        return Ok(ConfigFile::default());
    };
    let content = std::fs::read_to_string(&path).map_err(LoadError::XdgRead)?;
    Ok(toml::from_str(&content)?)
}


#[cfg(test)]
mod tests {
    use super::test_support::{with_xdg, write_config};
    use super::*;

    #[test]
    fn missing_config_returns_empty_tables() {
        let dir = tempfile::tempdir().unwrap();
        let file = with_xdg(dir.path(), || load_file("nothing-here")).unwrap();
        assert!(file.env.is_empty());
        assert_eq!(file.pipeline, PipelineSection::default());
    }

    #[test]
    fn reads_env_and_pipeline_tables() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            "testapp",
            r#"
[env]
FOO = "from_toml"

[pipeline]
num_subtasks = 5
max_retries = 1
on_exhausted = "accept"
"#,
        );
        let file = with_xdg(dir.path(), || load_file("testapp")).unwrap();
        assert_eq!(file.env.get("FOO"), Some(&"from_toml".to_string()));
        assert_eq!(file.pipeline.num_subtasks, Some(5));
        assert_eq!(file.pipeline.max_retries, Some(1));
        assert_eq!(file.pipeline.on_exhausted.as_deref(), Some("accept"));
        assert_eq!(file.pipeline.concurrency, None);
    }

    #[test]
    fn invalid_toml_returns_xdg_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "badapp", "not valid toml [[[\n");
        let result = with_xdg(dir.path(), || load_file("badapp"));
        assert!(matches!(result, Err(LoadError::XdgParse(_))));
    }
}
