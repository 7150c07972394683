use std::path::{Path, PathBuf};

use anyhow::Context;

use super::types::AppConfig;

/// Get the default conductor data directory: ~/.conductor
pub fn get_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".conductor"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.conductor/config.toml
    let data_dir = get_data_dir()?;
    let user_config = data_dir.join("config.toml");

    // Priority 2: ./conductor.toml (current directory)
    let local_config = Path::new("conductor.toml");

    let mut cfg = if user_config.exists() {
        read_config(&user_config)?
    } else if local_config.exists() {
        read_config(local_config)?
    } else {
        AppConfig::default()
    };

    if cfg.executor.checkpoint.directory.is_none() {
        cfg.executor.checkpoint.directory = Some(
            data_dir
                .join("checkpoints")
                .to_string_lossy()
                .to_string(),
        );
    }

    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load an explicit config file; environment overrides still apply.
pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<AppConfig> {
    let mut cfg = read_config(path.as_ref())?;
    if cfg.executor.checkpoint.directory.is_none() {
        cfg.executor.checkpoint.directory = Some(
            get_data_dir()?
                .join("checkpoints")
                .to_string_lossy()
                .to_string(),
        );
    }
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

fn read_config(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str::<AppConfig>(&s)
        .with_context(|| format!("failed to parse config {}", path.display()))
}

/// Environment variable overrides (highest priority)
pub fn apply_env_overrides(cfg: &mut AppConfig) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

fn apply_overrides<F>(cfg: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("CONDUCTOR_MAX_PARALLEL") {
        match v.trim().parse::<usize>() {
            Ok(n) => cfg.executor.concurrency.max_parallel = Some(n),
            Err(_) => tracing::warn!(value = %v, "ignoring invalid CONDUCTOR_MAX_PARALLEL"),
        }
    }
    if let Some(v) = get("CONDUCTOR_CHECKPOINT_DIR") {
        cfg.executor.checkpoint.directory = Some(v);
    }
    if let Some(v) = get("CONDUCTOR_LOG_LEVEL") {
        cfg.logging.level = v;
    }
    if let Some(v) = get("CONDUCTOR_CODECLI_BIN") {
        cfg.codecli.bin = v;
    }
}
