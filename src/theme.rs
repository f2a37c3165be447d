//! Colours: built-in palettes and btop-style `theme[key]="#RRGGBB"` files.

use crate::Palette;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Puyo colours (by `PuyoColor::index`) and UI colours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// red, blue, green, yellow, purple.
    pub puyo: [Color; 5],
    /// Playfield background.
    pub bg: Color,
    /// Grid dots and borders.
    pub div_line: Color,
    /// Score and help text.
    pub main_fg: Color,
    pub title: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark()
    }
}

/// Theme keys per puyo slot: own key first, then the btop key it borrows from.
const PUYO_KEYS: [(&str, &str); 5] = [
    ("puyo_red", "cpu_end"),
    ("puyo_blue", "cpu_box"),
    ("puyo_green", "mem_box"),
    ("puyo_yellow", "cpu_mid"),
    ("puyo_purple", "net_box"),
];

impl Theme {
    /// One Dark.
    pub fn onedark() -> Self {
        Self {
            puyo: [
                Color::Rgb(0xE0, 0x6C, 0x75),
                Color::Rgb(0x61, 0xAF, 0xEF),
                Color::Rgb(0x98, 0xC3, 0x79),
                Color::Rgb(0xE5, 0xC0, 0x7B),
                Color::Rgb(0xC6, 0x78, 0xDD),
            ],
            bg: Color::Rgb(0x28, 0x2C, 0x34),
            div_line: Color::Rgb(0x3F, 0x44, 0x4F),
            main_fg: Color::Rgb(0xAB, 0xB2, 0xBF),
            title: Color::Rgb(0xE5, 0xC0, 0x7B),
        }
    }

    /// Built-in theme for a palette.
    pub fn for_palette(palette: Palette) -> Self {
        let mut theme = Self::onedark();
        theme.apply_palette(palette);
        theme
    }

    /// Load a theme file; no path means the built-in palette.
    pub fn load(path: Option<&Path>, palette: Palette) -> Result<Self, ThemeError> {
        let Some(path) = path else {
            return Ok(Self::for_palette(palette));
        };
        let text = std::fs::read_to_string(path)?;
        let mut theme = Self::from_map(&parse_theme_file(&text))?;
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Swap puyo colours for the accessible palettes; UI colours stay.
    pub fn apply_palette(&mut self, palette: Palette) {
        self.puyo = match palette {
            Palette::Normal => return,
            Palette::HighContrast => [
                Color::Rgb(0xFF, 0x00, 0x00),
                Color::Rgb(0x00, 0x88, 0xFF),
                Color::Rgb(0x00, 0xFF, 0x00),
                Color::Rgb(0xFF, 0xFF, 0x00),
                Color::Rgb(0xFF, 0x00, 0xFF),
            ],
            // Okabe-Ito style: no red/green pair.
            Palette::Colorblind => [
                Color::Rgb(0xD5, 0x5E, 0x00),
                Color::Rgb(0x00, 0x72, 0xB2),
                Color::Rgb(0x00, 0x9E, 0x73),
                Color::Rgb(0xF0, 0xE4, 0x42),
                Color::Rgb(0xCC, 0x79, 0xA7),
            ],
        };
    }

    /// Missing keys keep the One Dark value; present but malformed keys are an error.
    fn from_map(map: &HashMap<String, String>) -> Result<Self, ThemeError> {
        let lookup = |keys: &[&str], fallback: Color| -> Result<Color, ThemeError> {
            keys.iter()
                .find_map(|k| map.get(*k))
                .map_or(Ok(fallback), |v| parse_hex(v))
        };
        let base = Self::onedark();
        let mut puyo = base.puyo;
        for (slot, (own, borrowed)) in puyo.iter_mut().zip(PUYO_KEYS) {
            *slot = lookup(&[own, borrowed], *slot)?;
        }
        Ok(Self {
            puyo,
            bg: lookup(&["main_bg", "meter_bg"], base.bg)?,
            div_line: lookup(&["div_line"], base.div_line)?,
            main_fg: lookup(&["main_fg"], base.main_fg)?,
            title: lookup(&["title"], base.title)?,
        })
    }

    #[inline]
    pub fn puyo_color(&self, index: u8) -> Color {
        self.puyo[usize::from(index) % self.puyo.len()]
    }
}

/// Parse `theme[key]="value"` lines into key -> value. Comments and junk are skipped.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    s.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| {
            let rest = line.strip_prefix("theme[")?;
            let (key, rest) = rest.split_once(']')?;
            let (_, value) = rest.split_once('=')?;
            let value = value.trim().trim_matches(['"', '\'']).trim();
            (!value.is_empty()).then(|| (key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// "#RRGGBB" or "#RGB".
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let hex = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.trim().to_string());
    let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
    if !hex.is_ascii() {
        return Err(invalid());
    }
    match hex.len() {
        6 => Ok(Color::Rgb(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        3 => Ok(Color::Rgb(
            channel(&hex[0..1])? * 17,
            channel(&hex[1..2])? * 17,
            channel(&hex[2..3])? * 17,
        )),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_six_and_three_digits() {
        assert_eq!(parse_hex("#98C379").unwrap(), Color::Rgb(0x98, 0xC3, 0x79));
        assert_eq!(parse_hex("fff").unwrap(), Color::Rgb(255, 255, 255));
        assert!(matches!(parse_hex("#12345"), Err(ThemeError::InvalidHex(_))));
        assert!(matches!(parse_hex("#GG0000"), Err(ThemeError::InvalidHex(_))));
    }

    #[test]
    fn theme_lines() {
        let map = parse_theme_file(
            "# comment\ntheme[main_bg]=\"#31353F\"\n  theme[title] = '#fff'\ntheme[empty]=\"\"\nnonsense",
        );
        assert_eq!(map.get("main_bg").map(String::as_str), Some("#31353F"));
        assert_eq!(map.get("title").map(String::as_str), Some("#fff"));
        assert!(!map.contains_key("empty"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn own_key_beats_btop_key() {
        let map = parse_theme_file("theme[cpu_end]=\"#111111\"\ntheme[puyo_red]=\"#222222\"\ntheme[cpu_box]=\"#333333\"");
        let theme = Theme::from_map(&map).unwrap();
        assert_eq!(theme.puyo[0], Color::Rgb(0x22, 0x22, 0x22));
        assert_eq!(theme.puyo[1], Color::Rgb(0x33, 0x33, 0x33));
        assert_eq!(theme.puyo[2], Theme::onedark().puyo[2]);
    }

    #[test]
    fn malformed_value_is_an_error() {
        let map = parse_theme_file("theme[puyo_blue]=\"#nothex\"");
        assert!(Theme::from_map(&map).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Theme::load(Some(Path::new("/nonexistent/puyo.theme")), Palette::Normal);
        assert!(matches!(err, Err(ThemeError::Io(_))));
        assert_eq!(Theme::load(None, Palette::Normal).unwrap(), Theme::onedark());
    }

    #[test]
    fn palettes_only_touch_puyo() {
        let hc = Theme::for_palette(Palette::HighContrast);
        assert_ne!(hc.puyo, Theme::onedark().puyo);
        assert_eq!(hc.bg, Theme::onedark().bg);
        assert_eq!(hc.puyo_color(5), hc.puyo[0]);
    }
}
