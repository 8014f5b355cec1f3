use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Port the HTTP server binds when neither flag nor config sets one
pub const DEFAULT_PORT: u16 = 4000;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RollbookConfig {
    pub database: Option<String>,
    pub port: Option<u16>,
    /// Seed sample students into an empty database on `serve`
    pub seed: Option<bool>,
}

impl RollbookConfig {
    pub fn database_path(&self) -> PathBuf {
        self.database
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| default_database_path_in(Path::new(".")))
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn seed(&self) -> bool {
        self.seed.unwrap_or(false)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("rollbook.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".rollbook").join("rollbook.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<RollbookConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: RollbookConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &RollbookConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
