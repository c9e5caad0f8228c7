//! Persist the best score to disk (XDG config or ~/.config/tetrikaruga).

use std::fs;
use std::io;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use thiserror::Error;

const FILENAME: &str = "best_score";

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt best score file: {0}")]
    Parse(#[from] ParseIntError),
}

/// Returns the default config directory for the game.
fn config_dir() -> PathBuf {
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from(".")),
    };
    base.join("tetrikaruga")
}

/// A single integer file holding the best score ever reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestScore {
    path: PathBuf,
}

impl BestScore {
    pub fn at_default_location() -> Self {
        Self::at(config_dir().join(FILENAME))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored best score; 0 when the file does not exist yet.
    pub fn load(&self) -> Result<u32, ScoreError> {
        match fs::read_to_string(&self.path) {
            Ok(s) => Ok(s.trim().parse()?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Store `max(previous, score)` and return it. A corrupt file counts as 0.
    pub fn record(&self, score: u32) -> Result<u32, ScoreError> {
        let previous = match self.load() {
            Ok(best) => best,
            Err(ScoreError::Parse(e)) => {
                log::warn!("ignoring corrupt best score at {}: {e}", self.path.display());
                0
            }
            Err(e) => return Err(e),
        };
        let best = previous.max(score);
        if best != previous || !self.path.exists() {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&self.path, format!("{best}\n"))?;
            log::info!("best score {best} saved to {}", self.path.display());
        }
        Ok(best)
    }
}
