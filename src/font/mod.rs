//! # Font Management
//!
//! The metrics oracle used by text wrapping: string widths, ascender,
//! descender and leading for a font at a size.
//!
//! The standard PDF fonts (Helvetica, Times, Courier, ZapfDingbats) are always
//! available and need no embedding. TrueType fonts can be registered from
//! bytes and are measured with ttf-parser. Unknown families resolve to
//! Helvetica with the same bold/italic flags.

pub mod metrics;

pub use metrics::StandardFontMetrics;
use std::collections::HashMap;

use crate::error::FolioError;

/// Family used for SYMBOL elements.
pub const SYMBOL_FAMILY: &str = "ZapfDingbats";

/// Identifies one face: family plus bold and italic flags.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct FontKey {
    pub family: String,
    pub bold: bool,
    pub italic: bool,
}

impl FontKey {
    pub fn new(family: &str, bold: bool, italic: bool) -> Self {
        Self {
            family: family.to_string(),
            bold,
            italic,
        }
    }

    pub fn symbol() -> Self {
        Self::new(SYMBOL_FAMILY, false, false)
    }
}

#[derive(Debug, Clone)]
pub enum FontData {
    /// One of the standard PDF fonts. No embedding needed.
    Standard(StandardFont),
    /// A TrueType/OpenType font that needs to be embedded.
    Custom {
        data: Vec<u8>,
        metrics: CustomFontMetrics,
    },
}

/// Parsed metrics from a TrueType/OpenType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct CustomFontMetrics {
    pub units_per_em: u16,
    pub advance_widths: HashMap<char, u16>,
    pub default_advance: u16,
    pub ascender: i16,
    pub descender: i16,
    /// Maps characters to their glyph IDs in the font.
    pub glyph_ids: HashMap<char, u16>,
}

impl CustomFontMetrics {
    /// Get the advance width of a character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let w = self
            .advance_widths
            .get(&ch)
            .copied()
            .unwrap_or(self.default_advance);
        (w as f64 / self.units_per_em as f64) * font_size
    }

    /// Parse metrics from font data using ttf-parser.
    pub fn from_font_data(data: &[u8]) -> Result<Self, FolioError> {
        let face = ttf_parser::Face::parse(data, 0)
            .map_err(|e| FolioError::FontError(format!("failed to parse font data: {e}")))?;
        let units_per_em = face.units_per_em();

        let mut advance_widths = HashMap::new();
        let mut glyph_ids = HashMap::new();
        let mut default_advance = 0u16;

        for code in 32u32..=0xFFFF {
            let Some(ch) = char::from_u32(code) else {
                continue;
            };
            if let Some(glyph_id) = face.glyph_index(ch) {
                let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                advance_widths.insert(ch, advance);
                glyph_ids.insert(ch, glyph_id.0);
                if ch == ' ' {
                    default_advance = advance;
                }
            }
        }

        if default_advance == 0 {
            default_advance = units_per_em / 2;
        }

        Ok(CustomFontMetrics {
            units_per_em,
            advance_widths,
            default_advance,
            ascender: face.ascender(),
            descender: face.descender(),
            glyph_ids,
        })
    }
}

/// The standard PDF fonts the engine knows metrics for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
    ZapfDingbats,
}

impl StandardFont {
    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::TimesItalic => "Times-Italic",
            Self::TimesBoldItalic => "Times-BoldItalic",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
            Self::ZapfDingbats => "ZapfDingbats",
        }
    }

    pub fn metrics(&self) -> StandardFontMetrics {
        StandardFontMetrics::for_font(*self)
    }

    pub fn is_symbolic(&self) -> bool {
        matches!(self, Self::ZapfDingbats)
    }
}

/// A font registry that maps font family + bold + italic to font data.
pub struct FontRegistry {
    fonts: HashMap<FontKey, FontData>,
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRegistry {
    pub fn new() -> Self {
        let mut fonts = HashMap::new();

        let standard_mappings = [
            (("Helvetica", false, false), StandardFont::Helvetica),
            (("Helvetica", true, false), StandardFont::HelveticaBold),
            (("Helvetica", false, true), StandardFont::HelveticaOblique),
            (("Helvetica", true, true), StandardFont::HelveticaBoldOblique),
            (("Times", false, false), StandardFont::TimesRoman),
            (("Times", true, false), StandardFont::TimesBold),
            (("Times", false, true), StandardFont::TimesItalic),
            (("Times", true, true), StandardFont::TimesBoldItalic),
            (("Courier", false, false), StandardFont::Courier),
            (("Courier", true, false), StandardFont::CourierBold),
            (("Courier", false, true), StandardFont::CourierOblique),
            (("Courier", true, true), StandardFont::CourierBoldOblique),
        ];

        for ((family, bold, italic), font) in standard_mappings {
            fonts.insert(FontKey::new(family, bold, italic), FontData::Standard(font));
        }
        for bold in [false, true] {
            for italic in [false, true] {
                fonts.insert(
                    FontKey::new(SYMBOL_FAMILY, bold, italic),
                    FontData::Standard(StandardFont::ZapfDingbats),
                );
            }
        }

        Self { fonts }
    }

    /// Look up a font, falling back to Helvetica if not found.
    pub fn resolve(&self, key: &FontKey) -> &FontData {
        if let Some(font) = self.fonts.get(key) {
            return font;
        }
        let aliased = match key.family.as_str() {
            "Times-Roman" | "Times New Roman" | "serif" => Some("Times"),
            "Courier New" | "monospace" => Some("Courier"),
            _ => None,
        };
        if let Some(font) = aliased.and_then(|family| {
            self.fonts
                .get(&FontKey::new(family, key.bold, key.italic))
        }) {
            return font;
        }
        match self
            .fonts
            .get(&FontKey::new("Helvetica", key.bold, key.italic))
        {
            Some(font) => font,
            None => &HELVETICA_FALLBACK,
        }
    }

    /// The key a lookup for `key` actually lands on.
    pub fn resolved_key(&self, key: &FontKey) -> FontKey {
        if self.fonts.contains_key(key) {
            return key.clone();
        }
        match self.resolve(key) {
            FontData::Standard(StandardFont::TimesRoman)
            | FontData::Standard(StandardFont::TimesBold)
            | FontData::Standard(StandardFont::TimesItalic)
            | FontData::Standard(StandardFont::TimesBoldItalic) => {
                FontKey::new("Times", key.bold, key.italic)
            }
            FontData::Standard(StandardFont::Courier)
            | FontData::Standard(StandardFont::CourierBold)
            | FontData::Standard(StandardFont::CourierOblique)
            | FontData::Standard(StandardFont::CourierBoldOblique) => {
                FontKey::new("Courier", key.bold, key.italic)
            }
            _ => FontKey::new("Helvetica", key.bold, key.italic),
        }
    }

    /// Register a custom font.
    pub fn register(
        &mut self,
        family: &str,
        bold: bool,
        italic: bool,
        data: Vec<u8>,
    ) -> Result<(), FolioError> {
        let metrics = CustomFontMetrics::from_font_data(&data)?;
        self.fonts.insert(
            FontKey::new(family, bold, italic),
            FontData::Custom { data, metrics },
        );
        Ok(())
    }

    /// Iterate over all registered fonts.
    pub fn iter(&self) -> impl Iterator<Item = (&FontKey, &FontData)> {
        self.fonts.iter()
    }
}

static HELVETICA_FALLBACK: FontData = FontData::Standard(StandardFont::Helvetica);

/// Shared font context used by layout and PDF serialization.
/// Provides text measurement with real glyph metrics.
pub struct FontContext {
    registry: FontRegistry,
}

impl Default for FontContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FontContext {
    pub fn new() -> Self {
        Self {
            registry: FontRegistry::new(),
        }
    }

    /// Get the advance width of a single character in points.
    pub fn char_width(&self, ch: char, key: &FontKey, font_size: f64) -> f64 {
        match self.registry.resolve(key) {
            FontData::Standard(std_font) => std_font.metrics().char_width(ch, font_size),
            FontData::Custom { metrics, .. } => metrics.char_width(ch, font_size),
        }
    }

    /// Measure the width of a string in points.
    pub fn measure(&self, text: &str, key: &FontKey, font_size: f64) -> f64 {
        match self.registry.resolve(key) {
            FontData::Standard(std_font) => std_font.metrics().measure_string(text, font_size, 0.0),
            FontData::Custom { metrics, .. } => {
                text.chars().map(|ch| metrics.char_width(ch, font_size)).sum()
            }
        }
    }

    /// Distance from the baseline to the top of the tallest glyphs (positive).
    pub fn ascent(&self, key: &FontKey, font_size: f64) -> f64 {
        let (units, upem) = self.vertical_units(key, true);
        units as f64 / upem as f64 * font_size
    }

    /// Distance from the baseline to the bottom of descenders (negative).
    pub fn descent(&self, key: &FontKey, font_size: f64) -> f64 {
        let (units, upem) = self.vertical_units(key, false);
        units as f64 / upem as f64 * font_size
    }

    /// Baseline-to-baseline distance for single-spaced text.
    pub fn leading(&self, font_size: f64) -> f64 {
        font_size * 1.2
    }

    fn vertical_units(&self, key: &FontKey, ascender: bool) -> (i16, u16) {
        match self.registry.resolve(key) {
            FontData::Standard(f) => {
                let m = f.metrics();
                (if ascender { m.ascender } else { m.descender }, 1000)
            }
            FontData::Custom { metrics, .. } => (
                if ascender {
                    metrics.ascender
                } else {
                    metrics.descender
                },
                metrics.units_per_em.max(1),
            ),
        }
    }

    /// Whether the font can render `ch` directly.
    pub fn has_glyph(&self, key: &FontKey, ch: char) -> bool {
        match self.registry.resolve(key) {
            FontData::Standard(f) if f.is_symbolic() => metrics::dingbat_code(ch).is_some(),
            FontData::Standard(_) => metrics::winansi_code(ch).is_some(),
            FontData::Custom { metrics, .. } => metrics.glyph_ids.contains_key(&ch),
        }
    }

    /// Resolve a font key to its font data.
    pub fn resolve(&self, key: &FontKey) -> &FontData {
        self.registry.resolve(key)
    }

    /// Access the underlying font registry.
    pub fn registry(&self) -> &FontRegistry {
        &self.registry
    }

    /// Access the underlying font registry mutably.
    pub fn registry_mut(&mut self) -> &mut FontRegistry {
        &mut self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn helvetica(bold: bool) -> FontKey {
        FontKey::new("Helvetica", bold, false)
    }

    #[test]
    fn test_font_context_helvetica() {
        let ctx = FontContext::new();
        let w = ctx.char_width(' ', &helvetica(false), 12.0);
        assert!((w - 3.336).abs() < 0.001);
    }

    #[test]
    fn test_font_context_bold_wider() {
        let ctx = FontContext::new();
        let regular = ctx.measure("abc", &helvetica(false), 12.0);
        let bold = ctx.measure("abc", &helvetica(true), 12.0);
        assert!(bold > regular, "Bold should be wider than regular");
    }

    #[test]
    fn test_font_context_fallback() {
        let ctx = FontContext::new();
        let w1 = ctx.char_width('A', &helvetica(false), 12.0);
        let w2 = ctx.char_width('A', &FontKey::new("Gotham", false, false), 12.0);
        assert!((w1 - w2).abs() < 0.001);
        assert_eq!(
            ctx.registry().resolved_key(&FontKey::new("Gotham", true, false)),
            helvetica(true)
        );
    }

    #[test]
    fn test_vertical_metrics() {
        let ctx = FontContext::new();
        let key = helvetica(false);
        assert!((ctx.ascent(&key, 10.0) - 7.18).abs() < 1e-9);
        assert!((ctx.descent(&key, 10.0) + 2.07).abs() < 1e-9);
        assert!((ctx.leading(10.0) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_glyph_coverage() {
        let ctx = FontContext::new();
        assert!(ctx.has_glyph(&helvetica(false), 'é'));
        assert!(!ctx.has_glyph(&helvetica(false), '✓'));
        assert!(ctx.has_glyph(&FontKey::symbol(), '✓'));
    }

    #[test]
    fn test_register_rejects_garbage() {
        let mut ctx = FontContext::new();
        let err = ctx
            .registry_mut()
            .register("Broken", false, false, vec![0, 1, 2, 3]);
        assert!(err.is_err());
    }
}
