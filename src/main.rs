//! Tetrikaruga: Tetris meets Ikaruga in the terminal.

mod app;
mod audio;
mod board;
mod game;
mod highscores;
mod input;
mod layer;
mod logging;
mod orchestrator;
mod particles;
mod piece;
mod shapes;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

/// Options derived from CLI that affect how a session runs.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub seed: Option<u64>,
    pub no_menu: bool,
    pub frame_rate: f64,
    pub mute: bool,
    pub bell: bool,
}

impl From<&Args> for GameConfig {
    fn from(args: &Args) -> Self {
        Self {
            seed: args.seed,
            no_menu: args.no_menu,
            frame_rate: args.frame_rate,
            mute: args.mute,
            bell: args.bell,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        logging::init(path, args.log_level)?;
    }
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        log::warn!("theme not loaded, using defaults: {e}");
        let mut theme = theme::Theme::default();
        theme.apply_palette(args.palette);
        theme
    });
    let mut app = App::new(GameConfig::from(&args), theme);
    app.run()?;
    Ok(())
}

/// Tetris meets Ikaruga in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "tetrikaruga",
    version,
    about = "Tetris meets Ikaruga: stack pieces while absorbing particles of your colour.",
    long_about = "Tetrikaruga is a terminal arcade game mixing Tetris and Ikaruga.\n\n\
        Even rotations of the falling piece are pink, odd ones blue. Particles of the \
        piece's colour are absorbed; touching one of the other colour ends the round. \
        Clear rows to score and to make the particle waves harder.\n\n\
        CONTROLS:\n  Arrows/WASD/ZQSD  Move (up lifts the piece)\n  Space / 0         Rotate CW\n  \
        1                 Rotate CCW\n  Enter             Hard drop\n  P                 Pause\n  \
        M                 Toggle sound\n  Esc               Quit\n\n\
        Use --theme to load a btop-style theme (keys: pink, blue, main_bg, div_line, main_fg, title)."
)]
pub struct Args {
    /// Seed for every random draw (pieces, spawners). Random if not set.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Skip main menu and start game immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Target frames per second; the simulation is frame-rate independent.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses the neon defaults if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Start with sound turned down.
    #[arg(long)]
    pub mute: bool,

    /// Ring the terminal bell on row clears and explosions.
    #[arg(long)]
    pub bell: bool,

    /// Write logs to this file. Logging is off otherwise.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level for --log-file (off, error, warn, info, debug, trace).
    #[arg(long, default_value = "info", value_name = "LEVEL")]
    pub log_level: LevelFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["tetrikaruga"]);
        let config = GameConfig::from(&args);
        assert_eq!(config.seed, None);
        assert!(!config.no_menu);
        assert_eq!(config.frame_rate, 60.0);
        assert_eq!(args.log_level, LevelFilter::Info);
        assert_eq!(args.palette, Palette::Normal);
    }

    #[test]
    fn test_flags() {
        let args = Args::parse_from([
            "tetrikaruga",
            "--seed",
            "7",
            "--no-menu",
            "--palette",
            "colourblind",
            "--bell",
            "--log-level",
            "debug",
        ]);
        let config = GameConfig::from(&args);
        assert_eq!(config.seed, Some(7));
        assert!(config.no_menu && config.bell && !config.mute);
        assert_eq!(args.palette, Palette::Colorblind);
        assert_eq!(args.log_level, LevelFilter::Debug);
    }
}
