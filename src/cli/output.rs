use ansi_term::{Colour, Style};

use crate::storage::entities::Theme;

const SWATCH: &str = "●";
const BAR: char = '█';

/// Parses `#RRGGBB`.
pub fn hex_colour(hex: &str) -> Option<Colour> {
    let hex = hex.trim().strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(Colour::RGB(channel(0)?, channel(2)?, channel(4)?))
}

/// A dot painted in the habit colour. Unreadable colours give a plain dot.
pub fn swatch(color: Option<&str>) -> String {
    match color.and_then(hex_colour) {
        Some(colour) => colour.paint(SWATCH).to_string(),
        None => SWATCH.into(),
    }
}

/// Style for headings, picked by the stored theme.
pub fn accent(theme: Theme) -> Style {
    match theme {
        Theme::Dark => Colour::RGB(0x14, 0xC3, 0x8E).bold(),
        Theme::Light => Colour::RGB(0x6C, 0x5C, 0xE7).bold(),
    }
}

pub fn heading(theme: Theme, text: &str) -> String {
    accent(theme).paint(text).to_string()
}

/// Horizontal bar scaled so that `max` fills `width` cells. Non-zero values get at least one cell.
pub fn bar(value: f64, max: f64, width: usize) -> String {
    if value <= 0. || max <= 0. {
        return String::new();
    }
    let cells = ((value / max) * width as f64).round().max(1.) as usize;
    std::iter::repeat(BAR).take(cells.min(width)).collect()
}

#[cfg(test)]
mod tests {
    use ansi_term::Colour;

    use super::{bar, hex_colour, swatch};

    #[test]
    fn test_hex_colour() {
        assert_eq!(hex_colour("#14C38E"), Some(Colour::RGB(0x14, 0xC3, 0x8E)));
        assert_eq!(hex_colour(" #ffffff "), Some(Colour::RGB(255, 255, 255)));
        assert_eq!(hex_colour("14C38E"), None);
        assert_eq!(hex_colour("#bbb"), None);
        assert_eq!(hex_colour("#zzzzzz"), None);
        assert_eq!(hex_colour("#ééé"), None);
    }

    #[test]
    fn test_plain_swatch() {
        assert_eq!(swatch(None), "●");
        assert_eq!(swatch(Some("blue")), "●");
        assert!(swatch(Some("#00B0FF")).contains("●"));
    }

    #[test]
    fn test_bar() {
        assert_eq!(bar(0., 10., 20), "");
        assert_eq!(bar(10., 10., 20).chars().count(), 20);
        assert_eq!(bar(5., 10., 20).chars().count(), 10);
        assert_eq!(bar(0.01, 10., 20).chars().count(), 1);
    }
}
