//! Puyotui: Puyo-style falling-pair puzzle in the terminal. Connect four of a colour, chain the cascades.

mod app;
mod board;
mod color_source;
mod game;
mod input;
mod pair;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use log::{info, warn};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Smallest and largest playfield side accepted from the command line.
const MIN_SIDE: usize = 2;
const MAX_SIDE: usize = 64;

/// Validated options that affect game behaviour and pacing.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub width: usize,
    pub height: usize,
    /// Gravity interval for the falling pair.
    pub fall: Duration,
    /// Gravity interval while soft drop is held.
    pub soft_drop: Duration,
    /// How long each chain pass stays on screen.
    pub chain_delay: Duration,
    pub animate: bool,
    pub seed: Option<u64>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be between 2 and 64, got {value}")]
    BoardSize { name: &'static str, value: usize },
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
}

impl GameConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        for (name, value) in [("width", args.width), ("height", args.height)] {
            if !(MIN_SIDE..=MAX_SIDE).contains(&value) {
                return Err(ConfigError::BoardSize { name, value });
            }
        }
        if args.fall_ms == 0 {
            return Err(ConfigError::ZeroInterval("fall-ms"));
        }
        if args.soft_drop_ms == 0 {
            return Err(ConfigError::ZeroInterval("soft-drop-ms"));
        }
        Ok(Self {
            width: args.width,
            height: args.height,
            fall: Duration::from_millis(args.fall_ms),
            soft_drop: Duration::from_millis(args.soft_drop_ms),
            chain_delay: Duration::from_millis(args.chain_delay_ms),
            animate: !args.no_animation && args.chain_delay_ms > 0,
            seed: args.seed,
        })
    }
}

fn init_logging(path: Option<&std::path::Path>) -> Result<()> {
    // stderr belongs to the alternate screen, so logs only go to a file
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    let config = GameConfig::from_args(&args)?;
    info!("starting with {config:?}");

    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        warn!("theme not loaded, using built-in colours: {e}");
        theme::Theme::for_palette(args.palette)
    });

    let mut app = App::new(config, theme);
    app.run()?;
    Ok(())
}

/// Puyo-style puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "puyotui",
    version,
    about = "Puyo-style falling-pair puzzle in the terminal. Connect four of a colour to clear them; cascades chain for bigger scores.",
    long_about = "Puyotui is a terminal puzzle game in the style of Puyo Puyo.\n\n\
        Pairs of coloured puyos fall into the well. Connect four or more of the same colour \
        (up, down, left, right) to clear them. Puyos above fall into the gaps and may form new \
        groups: each extra pass is a chain and scores more. The game ends when a new pair cannot enter.\n\n\
        CONTROLS (normal):\n  Left/Right  Move      Down       Soft drop   Up/Enter/Space  Hard drop\n  Z / X       Rotate CW  C         Rotate CCW  R  Restart  P  Pause  Q / Esc  Quit\n\n\
        CONTROLS (vim):\n  h/l         Move      j          Soft drop   k       Hard drop\n  i           Rotate CW  u          Rotate CCW\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Playfield width in columns.
    #[arg(long, default_value_t = board::DEFAULT_WIDTH, value_name = "COLS")]
    pub width: usize,

    /// Playfield height in rows.
    #[arg(long, default_value_t = board::DEFAULT_HEIGHT, value_name = "ROWS")]
    pub height: usize,

    /// Time between gravity steps of the falling pair, in ms.
    #[arg(long, default_value = "500", value_name = "MS")]
    pub fall_ms: u64,

    /// Gravity interval while soft drop is held, in ms.
    #[arg(long, default_value = "50", value_name = "MS")]
    pub soft_drop_ms: u64,

    /// How long each chain pass is shown before the next one, in ms.
    #[arg(long, default_value = "200", value_name = "MS")]
    pub chain_delay_ms: u64,

    /// Disable chain animation (clears resolve instantly).
    #[arg(long)]
    pub no_animation: bool,

    /// Seed for the colour sequence. Random if not set; the seed used is logged.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Write logs to this file. Level comes from RUST_LOG (default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
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

    fn parse(extra: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("puyotui").chain(extra.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let config = GameConfig::from_args(&parse(&[])).unwrap();
        assert_eq!((config.width, config.height), (6, 12));
        assert_eq!(config.fall, Duration::from_millis(500));
        assert_eq!(config.soft_drop, Duration::from_millis(50));
        assert_eq!(config.chain_delay, Duration::from_millis(200));
        assert!(config.animate);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn flags() {
        let args = parse(&["--width", "8", "--seed", "42", "--no-animation", "--palette", "colourblind"]);
        assert_eq!(args.palette, Palette::Colorblind);
        let config = GameConfig::from_args(&args).unwrap();
        assert_eq!(config.width, 8);
        assert_eq!(config.seed, Some(42));
        assert!(!config.animate);
    }

    #[test]
    fn rejects_bad_sizes_and_intervals() {
        assert_eq!(
            GameConfig::from_args(&parse(&["--width", "1"])).unwrap_err(),
            ConfigError::BoardSize { name: "width", value: 1 }
        );
        assert_eq!(
            GameConfig::from_args(&parse(&["--height", "65"])).unwrap_err(),
            ConfigError::BoardSize { name: "height", value: 65 }
        );
        assert_eq!(
            GameConfig::from_args(&parse(&["--fall-ms", "0"])).unwrap_err(),
            ConfigError::ZeroInterval("fall-ms")
        );
    }

    #[test]
    fn zero_chain_delay_disables_animation() {
        let config = GameConfig::from_args(&parse(&["--chain-delay-ms", "0"])).unwrap();
        assert!(!config.animate);
    }
}
