use bossrush_game::{ConfigError, DataLoader, EngineConfig, GameData};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Loads content and tuning from optional JSON files, falling back to the
/// bundled catalog and default tuning.
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    pub data_path: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl DataLoader for FileLoader {
    type Error = LoadError;

    fn load_game_data(&self) -> Result<GameData, Self::Error> {
        let Some(path) = &self.data_path else {
            return Ok(GameData::load_from_static());
        };
        log::info!("loading game data from {}", path.display());
        GameData::from_json(&read(path)?).map_err(|source| LoadError::Parse {
            path: path.clone(),
            source,
        })
    }

    fn load_config(&self) -> Result<EngineConfig, Self::Error> {
        let Some(path) = &self.config_path else {
            return Ok(EngineConfig::default());
        };
        log::info!("loading engine config from {}", path.display());
        Ok(EngineConfig::from_json(&read(path)?)?)
    }
}
