//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::piece::Polarity;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Polarity colours and UI colours, optionally loaded from a theme file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub pink: Color,
    pub blue: Color,
    /// Completed rows flash this colour before fading out.
    pub flash: Color,
    /// World background.
    pub bg: Color,
    /// Board grid / border.
    pub div_line: Color,
    /// Text (score, counters).
    pub main_fg: Color,
    /// Titles.
    pub title: Color,
    /// Secondary text and dimmed particles.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

impl Default for Theme {
    fn default() -> Self {
        Self::neon_default()
    }
}

impl Theme {
    /// Pink #FF0099 and blue #0099FF on black.
    pub const fn neon_default() -> Self {
        Self {
            pink: rgb(0xFF0099),
            blue: rgb(0x0099FF),
            flash: rgb(0xFFFFFF),
            bg: rgb(0x000000),
            div_line: rgb(0x2A2A35),
            main_fg: rgb(0xD0D0D0),
            title: rgb(0xFF0099),
            inactive_fg: rgb(0x5C6370),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to the defaults if path is None or the file is missing.
    /// `palette` then overrides the polarity colours.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s))?
            }
            _ => Self::default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Override the polarity colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.pink = rgb(0xFF00FF);
                self.blue = rgb(0x00FFFF);
            }
            crate::Palette::Colorblind => {
                // Orange/blue stays distinct under the common deficiencies.
                self.pink = rgb(0xEE7733);
                self.blue = rgb(0x0077BB);
            }
        }
    }

    /// Keys absent from the file keep their default; malformed values are errors.
    fn from_map(map: &HashMap<String, String>) -> Result<Self, ThemeError> {
        let mut theme = Self::default();
        for (key, slot) in [
            ("pink", &mut theme.pink),
            ("blue", &mut theme.blue),
            ("flash", &mut theme.flash),
            ("main_bg", &mut theme.bg),
            ("div_line", &mut theme.div_line),
            ("main_fg", &mut theme.main_fg),
            ("title", &mut theme.title),
            ("inactive_fg", &mut theme.inactive_fg),
        ] {
            if let Some(v) = map.get(key) {
                *slot = parse_hex(v)?;
            }
        }
        Ok(theme)
    }

    #[inline]
    pub fn polarity_color(&self, polarity: Polarity) -> Color {
        match polarity {
            Polarity::Pink => self.pink,
            Polarity::Blue => self.blue,
        }
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    if !s.is_ascii() {
        return Err(invalid());
    }
    let digit = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&s[range], 16).map_err(|_| invalid())
    };
    let (r, g, b) = match s.len() {
        6 => (digit(0..2)?, digit(2..4)?, digit(4..6)?),
        3 => (digit(0..1)? * 17, digit(1..2)? * 17, digit(2..3)? * 17),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Palette;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#FF0099").unwrap();
        assert!(matches!(c, Color::Rgb(0xFF, 0x00, 0x99)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GG0000").is_err());
        assert!(parse_hex("#ééé").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[main_bg]="#31353F""##);
        assert_eq!(map.get("main_bg"), Some(&"#31353F".to_string()));
        let map = parse_theme_file("# comment\ntheme[pink] = '#F0F'\nnot a theme line");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("pink"), Some(&"#F0F".to_string()));
    }

    #[test]
    fn test_theme_from_map_overrides_only_given_keys() {
        let map = parse_theme_file("theme[pink]=\"#112233\"\ntheme[main_bg]=\"#010203\"");
        let theme = Theme::from_map(&map).unwrap();
        assert_eq!(theme.pink, Color::Rgb(0x11, 0x22, 0x33));
        assert_eq!(theme.bg, Color::Rgb(1, 2, 3));
        assert_eq!(theme.blue, Theme::default().blue);
        let bad = parse_theme_file("theme[blue]=\"nope\"");
        assert!(Theme::from_map(&bad).is_err());
    }

    #[test]
    fn test_palettes_swap_polarity_colours() {
        let theme = Theme::load(None, Palette::Normal).unwrap();
        assert_eq!(theme.polarity_color(Polarity::Pink), Color::Rgb(0xFF, 0x00, 0x99));
        assert_eq!(theme.polarity_color(Polarity::Blue), Color::Rgb(0x00, 0x99, 0xFF));
        let theme = Theme::load(None, Palette::Colorblind).unwrap();
        assert_ne!(theme.pink, Theme::default().pink);
        assert_ne!(theme.polarity_color(Polarity::Pink), theme.polarity_color(Polarity::Blue));
    }
}
