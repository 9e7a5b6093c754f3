//! Color resolution: indexed palette, theme + tint, alpha flattening.
//!
//! Every color in the object model resolves to an opaque "RRGGBB" hex string
//! before it is written into the stylesheet part; the reverse direction keeps
//! the original encoding so theme references survive a round-trip of the
//! palette itself.

use crate::error::{Result, SheetpackError};
use serde::{Deserialize, Serialize};

/// The legacy 64-entry indexed palette (stylesheet `indexed` attribute).
pub const INDEXED_PALETTE: [u32; 64] = [
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF,
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF,
    0x800000, 0x008000, 0x000080, 0x808000, 0x800080, 0x008080, 0xC0C0C0, 0x808080,
    0x9999FF, 0x993366, 0xFFFFCC, 0xCCFFFF, 0x660066, 0xFF8080, 0x0066CC, 0xCCCCFF,
    0x000080, 0xFF00FF, 0xFFFF00, 0x00FFFF, 0x800080, 0x800000, 0x008080, 0x0000FF,
    0x00CCFF, 0xCCFFFF, 0xCCFFCC, 0xFFFF99, 0x99CCFF, 0xFF99CC, 0xCC99FF, 0xFFCC99,
    0x3366FF, 0x33CCCC, 0x99CC00, 0xFFCC00, 0xFF9900, 0xFF6600, 0x666699, 0x969696,
    0x003366, 0x339966, 0x003300, 0x333300, 0x993300, 0x993366, 0x333399, 0x333333,
];

/// A color as carried by fonts, fills and borders in the object model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Color {
    /// Explicit color. Six hex digits (RGB) or eight (ARGB).
    Rgb(String),
    /// Entry in the legacy indexed palette.
    Indexed(u8),
    /// Theme palette entry with an optional lightness tint in `-1.0..=1.0`.
    Theme { index: u8, tint: Option<f64> },
}

impl Color {
    /// Convenience constructor for an explicit hex color.
    pub fn rgb<S: Into<String>>(hex: S) -> Self {
        Color::Rgb(hex.into())
    }
}

/// Theme color table, populated once per document from `xl/theme/theme1.xml`.
///
/// Index order follows the stylesheet `theme` attribute: background 1,
/// text 1, background 2, text 2, accents 1-6.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemePalette(pub [u32; 10]);

impl Default for ThemePalette {
    fn default() -> Self {
        // The stock "Office" scheme; writers that omit the theme part rely
        // on these values.
        ThemePalette([
            0xFFFFFF, // lt1
            0x000000, // dk1
            0xEEECE1, // lt2
            0x1F497D, // dk2
            0x4F81BD, // accent1
            0xC0504D, // accent2
            0x9BBB59, // accent3
            0x8064A2, // accent4
            0x4BACC6, // accent5
            0xF79646, // accent6
        ])
    }
}

impl ThemePalette {
    pub fn get(&self, index: u8) -> Option<u32> {
        self.0.get(index as usize).copied()
    }
}

/// Resolve a color against the theme table to an opaque "RRGGBB" hex string.
///
/// ARGB input is flattened onto white; an out-of-range indexed or theme
/// reference is an error.
pub fn resolve(color: &Color, theme: &ThemePalette) -> Result<String> {
    match color {
        Color::Rgb(hex) => {
            let hex = hex.trim_start_matches('#');
            match hex.len() {
                6 => Ok(hex.to_ascii_uppercase()),
                8 => {
                    let argb = u32::from_str_radix(hex, 16).map_err(|_| {
                        SheetpackError::InvalidContent(format!("bad hex color: {}", hex))
                    })?;
                    Ok(rgb_to_hex(flatten_alpha(argb)))
                }
                _ => Err(SheetpackError::InvalidContent(format!(
                    "bad hex color: {}",
                    hex
                ))),
            }
        }
        Color::Indexed(idx) => {
            // 64/65 are the system foreground/background slots.
            match *idx {
                64 => Ok("000000".to_string()),
                65 => Ok("FFFFFF".to_string()),
                i => INDEXED_PALETTE
                    .get(i as usize)
                    .map(|rgb| rgb_to_hex(*rgb))
                    .ok_or_else(|| {
                        SheetpackError::InvalidContent(format!("indexed color {} out of range", i))
                    }),
            }
        }
        Color::Theme { index, tint } => {
            let base = theme.get(*index).ok_or_else(|| {
                SheetpackError::InvalidContent(format!("theme color {} out of range", index))
            })?;
            Ok(rgb_to_hex(match tint {
                Some(t) => apply_tint(base, *t),
                None => base,
            }))
        }
    }
}

/// Composite an ARGB color onto a white background, dropping alpha.
pub fn flatten_alpha(argb: u32) -> u32 {
    let a = ((argb >> 24) & 0xFF) as f64 / 255.0;
    if a >= 1.0 {
        return argb & 0x00FF_FFFF;
    }
    let blend = |c: u32| -> u32 {
        let c = ((c & 0xFF) as f64 * a + 255.0 * (1.0 - a)).round();
        (c as u32).min(255)
    };
    (blend(argb >> 16) << 16) | (blend(argb >> 8) << 8) | blend(argb)
}

/// Apply a lightness tint to an RGB color.
///
/// The color goes through HSL; negative tint scales lightness down,
/// positive tint scales the remaining headroom up.
pub fn apply_tint(rgb: u32, tint: f64) -> u32 {
    let tint = tint.clamp(-1.0, 1.0);
    if tint == 0.0 {
        return rgb;
    }
    let (h, s, l) = rgb_to_hsl(rgb);
    let l = if tint < 0.0 {
        l * (1.0 + tint)
    } else {
        l * (1.0 - tint) + tint
    };
    hsl_to_rgb(h, s, l)
}

fn rgb_to_hsl(rgb: u32) -> (f64, f64, f64) {
    let r = ((rgb >> 16) & 0xFF) as f64 / 255.0;
    let g = ((rgb >> 8) & 0xFF) as f64 / 255.0;
    let b = (rgb & 0xFF) as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    } / 6.0;

    (h, s, l)
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> u32 {
    if s == 0.0 {
        let v = (l * 255.0).round() as u32;
        return (v << 16) | (v << 8) | v;
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let r = hue_to_channel(p, q, h + 1.0 / 3.0);
    let g = hue_to_channel(p, q, h);
    let b = hue_to_channel(p, q, h - 1.0 / 3.0);
    ((r * 255.0).round() as u32) << 16 | ((g * 255.0).round() as u32) << 8 | (b * 255.0).round() as u32
}

fn hue_to_channel(p: f64, q: f64, t: f64) -> f64 {
    let t = if t < 0.0 {
        t + 1.0
    } else if t > 1.0 {
        t - 1.0
    } else {
        t
    };
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// Format an RGB value as six uppercase hex digits.
pub fn rgb_to_hex(rgb: u32) -> String {
    format!("{:06X}", rgb & 0x00FF_FFFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_rgb() {
        let theme = ThemePalette::default();
        assert_eq!(resolve(&Color::rgb("#ff8800"), &theme).unwrap(), "FF8800");
        assert_eq!(resolve(&Color::rgb("FF8800"), &theme).unwrap(), "FF8800");
    }

    #[test]
    fn test_resolve_argb_flattens_onto_white() {
        let theme = ThemePalette::default();
        // 50% black on white is mid gray (alpha 0x80 is 128/255).
        assert_eq!(resolve(&Color::rgb("80000000"), &theme).unwrap(), "7F7F7F");
        // Fully transparent is white.
        assert_eq!(resolve(&Color::rgb("00FF0000"), &theme).unwrap(), "FFFFFF");
        // Fully opaque keeps the channels.
        assert_eq!(resolve(&Color::rgb("FF123456"), &theme).unwrap(), "123456");
    }

    #[test]
    fn test_resolve_indexed() {
        let theme = ThemePalette::default();
        assert_eq!(resolve(&Color::Indexed(2), &theme).unwrap(), "FF0000");
        assert_eq!(resolve(&Color::Indexed(22), &theme).unwrap(), "C0C0C0");
        assert_eq!(resolve(&Color::Indexed(64), &theme).unwrap(), "000000");
        assert!(resolve(&Color::Indexed(66), &theme).is_err());
    }

    #[test]
    fn test_theme_without_tint_is_base_color() {
        let theme = ThemePalette::default();
        let resolved = resolve(&Color::Theme { index: 4, tint: None }, &theme).unwrap();
        assert_eq!(resolved, "4F81BD");
    }

    #[test]
    fn test_theme_with_negative_tint() {
        // accent1 #4F81BD darkened by 25% through HSL lightness scaling.
        let theme = ThemePalette::default();
        let resolved = resolve(
            &Color::Theme {
                index: 4,
                tint: Some(-0.25),
            },
            &theme,
        )
        .unwrap();
        assert_eq!(resolved, "376092");
    }

    #[test]
    fn test_positive_tint_lightens() {
        let lightened = apply_tint(0x4F81BD, 0.5);
        let (_, _, l0) = rgb_to_hsl(0x4F81BD);
        let (_, _, l1) = rgb_to_hsl(lightened);
        assert!(l1 > l0);
    }

    #[test]
    fn test_tint_extremes() {
        assert_eq!(apply_tint(0x4F81BD, -1.0), 0x000000);
        assert_eq!(apply_tint(0x4F81BD, 1.0), 0xFFFFFF);
    }

    #[test]
    fn test_gray_has_no_hue() {
        let (h, s, _) = rgb_to_hsl(0x808080);
        assert_eq!((h, s), (0.0, 0.0));
    }
}
