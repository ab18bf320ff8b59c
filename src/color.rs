use std::collections::BTreeMap;
use std::rc::Rc;
use std::str::FromStr;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chart::line_chart::ColorFn;

#[derive(Debug, Error, PartialEq)]
pub enum ColorScaleError {
    #[error("`{0}` is not in the color scale's domain")]
    NotInDomain(String),
}

/// Colorblind-friendly default palette, as hex strings.
pub const STANDARD_PALETTE: [&str; 7] = [
    "#ff7043", "#0077bb", "#cc3311", "#33bbee", "#ee3377", "#009988", "#bbbbbb",
];

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

/// Parse `#rrggbb` hex strings; invalid entries are skipped with a warning.
pub fn parse_palette(hex: &[&str]) -> Vec<Color32> {
    hex.iter()
        .filter_map(|s| match Srgb::<u8>::from_str(s) {
            Ok(rgb) => Some(Color32::from_rgb(rgb.red, rgb.green, rgb.blue)),
            Err(e) => {
                log::warn!("ignoring palette entry {s:?}: {e}");
                None
            }
        })
        .collect()
}

/// Which palette a [`ColorScale`] draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteKind {
    /// [`STANDARD_PALETTE`], repeating once exhausted.
    #[default]
    Standard,
    /// One evenly spaced hue per domain entry; never repeats.
    Spread,
}

// ---------------------------------------------------------------------------
// Color scale: run name → Color32
// ---------------------------------------------------------------------------

/// Assigns palette colors to a domain of names, in domain order.
#[derive(Debug, Clone)]
pub struct ColorScale {
    kind: PaletteKind,
    palette: Vec<Color32>,
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorScale {
    pub fn new(kind: PaletteKind) -> Self {
        let palette = match kind {
            PaletteKind::Standard => parse_palette(&STANDARD_PALETTE),
            PaletteKind::Spread => Vec::new(),
        };
        Self {
            kind,
            palette,
            mapping: BTreeMap::new(),
            default_color: Color32::GRAY,
        }
    }

    /// A scale over a custom palette.
    pub fn with_palette(palette: Vec<Color32>) -> Self {
        Self {
            kind: PaletteKind::Standard,
            palette,
            mapping: BTreeMap::new(),
            default_color: Color32::GRAY,
        }
    }

    pub fn kind(&self) -> PaletteKind {
        self.kind
    }

    /// Replace the domain; the i-th name gets `palette[i % len]`.
    pub fn set_domain<S: AsRef<str>>(&mut self, names: &[S]) -> &mut Self {
        if self.kind == PaletteKind::Spread {
            self.palette = generate_palette(names.len());
        }
        self.mapping.clear();
        if self.palette.is_empty() {
            return self;
        }
        for (i, name) in names.iter().enumerate() {
            self.mapping
                .insert(name.as_ref().to_string(), self.palette[i % self.palette.len()]);
        }
        self
    }

    /// Look up the colour for a name in the domain.
    pub fn color_for(&self, name: &str) -> Result<Color32, ColorScaleError> {
        self.mapping
            .get(name)
            .copied()
            .ok_or_else(|| ColorScaleError::NotInDomain(name.to_string()))
    }

    /// Like [`ColorScale::color_for`], with gray for unknown names.
    pub fn color_or_default(&self, name: &str) -> Color32 {
        self.color_for(name).unwrap_or(self.default_color)
    }

    /// Snapshot of the current mapping as a chart color function.
    pub fn color_fn(&self) -> ColorFn {
        let scale = self.clone();
        Rc::new(move |name: &str| scale.color_or_default(name))
    }

    /// Return the legend entries (name → colour) for the UI.
    pub fn legend_entries(&self) -> Vec<(String, Color32)> {
        self.mapping
            .iter()
            .map(|(name, c)| (name.clone(), *c))
            .collect()
    }
}

impl Default for ColorScale {
    fn default() -> Self {
        Self::new(PaletteKind::Standard)
    }
}
