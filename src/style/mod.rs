//! # Style System
//!
//! Named styles with single inheritance. A document supplies a map of
//! [`Style`] records whose fields are all optional; the [`Stylesheet`] walks
//! each `inherit` chain once, at load time, and freezes the result into a
//! dense [`ResolvedStyle`] shared behind an `Arc`. The layout engine only ever
//! sees resolved styles and never walks a chain itself.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::font::FontKey;
use crate::warning::{WarningKind, Warnings};

/// Name of the style every chain ends in.
pub const DEFAULT_STYLE: &str = "default";

/// A style as written in the document: every field optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    /// Parent style name. Absent means "default".
    pub inherit: Option<String>,

    // ── Typography ─────────────────────────────────────────────
    pub font_family: Option<String>,
    /// Font size in points.
    pub font_size: Option<f64>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub align: Option<Align>,

    // ── Color ──────────────────────────────────────────────────
    pub color: Option<Color>,
    /// Opacity (0.0 - 1.0).
    pub opacity: Option<f64>,
    pub background: Option<Color>,

    // ── Border ─────────────────────────────────────────────────
    pub border_color: Option<Color>,
    pub border_width: Option<f64>,
    pub border_radius: Option<f64>,

    // ── Decoration ─────────────────────────────────────────────
    /// Amplitude of the hand-drawn wobble applied to outlines.
    pub roughness: Option<f64>,
    /// Depth of the saw-tooth edge applied to outlines.
    pub teeth: Option<f64>,

    /// Style used for emphasized elements.
    pub emphasis: Option<String>,
    /// Style used for strong elements.
    pub strong: Option<String>,
}

impl Style {
    /// Overlay `over` on top of `self`: every field set in `over` wins,
    /// every field left unset keeps the value from `self`.
    pub fn merged(&self, over: &Style) -> Style {
        Style {
            inherit: over.inherit.clone().or_else(|| self.inherit.clone()),
            font_family: over.font_family.clone().or_else(|| self.font_family.clone()),
            font_size: over.font_size.or(self.font_size),
            bold: over.bold.or(self.bold),
            italic: over.italic.or(self.italic),
            align: over.align.or(self.align),
            color: over.color.or(self.color),
            opacity: over.opacity.or(self.opacity),
            background: over.background.or(self.background),
            border_color: over.border_color.or(self.border_color),
            border_width: over.border_width.or(self.border_width),
            border_radius: over.border_radius.or(self.border_radius),
            roughness: over.roughness.or(self.roughness),
            teeth: over.teeth.or(self.teeth),
            emphasis: over.emphasis.clone().or_else(|| self.emphasis.clone()),
            strong: over.strong.clone().or_else(|| self.strong.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
    /// Justified: every line but the last is stretched to the full width.
    #[serde(alias = "justify")]
    Fill,
}

/// An RGBA color, components in 0.0 - 1.0.
///
/// Deserializes from `"#rrggbb"`, `"#rgb"` or `{ "r": .., "g": .., "b": .., "a": .. }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ColorSource")]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const LIGHT_GREY: Color = Color::rgb(0.9, 0.9, 0.9);

    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parse `#rrggbb` or `#rgb`.
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        let channel = |h: &str| u8::from_str_radix(h, 16).ok().map(|v| v as f64 / 255.0);
        match hex.len() {
            6 => Some(Color::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let expand = |i: usize| {
                    let c = &hex[i..i + 1];
                    channel(&format!("{c}{c}"))
                };
                Some(Color::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            _ => None,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorSource {
    Hex(String),
    Components {
        r: f64,
        g: f64,
        b: f64,
        #[serde(default = "opaque")]
        a: f64,
    },
}

fn opaque() -> f64 {
    1.0
}

impl TryFrom<ColorSource> for Color {
    type Error = String;

    fn try_from(src: ColorSource) -> Result<Self, Self::Error> {
        match src {
            ColorSource::Hex(s) => Color::from_hex(&s).ok_or_else(|| format!("invalid color '{s}'")),
            ColorSource::Components { r, g, b, a } => Ok(Color { r, g, b, a }),
        }
    }
}

/// A fully resolved, immutable style.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStyle {
    pub name: String,
    pub font_family: String,
    pub font_size: f64,
    pub bold: bool,
    pub italic: bool,
    pub align: Align,
    pub color: Color,
    pub opacity: f64,
    pub background: Option<Color>,
    pub border_color: Option<Color>,
    pub border_width: f64,
    pub border_radius: Option<f64>,
    pub roughness: Option<f64>,
    pub teeth: Option<f64>,
    pub emphasis: Option<Arc<ResolvedStyle>>,
    pub strong: Option<Arc<ResolvedStyle>>,
}

impl Default for ResolvedStyle {
    fn default() -> Self {
        Self {
            name: DEFAULT_STYLE.to_string(),
            font_family: "Helvetica".to_string(),
            font_size: 9.0,
            bold: false,
            italic: false,
            align: Align::Left,
            color: Color::BLACK,
            opacity: 1.0,
            background: None,
            border_color: None,
            border_width: 0.0,
            border_radius: None,
            roughness: None,
            teeth: None,
            emphasis: None,
            strong: None,
        }
    }
}

impl ResolvedStyle {
    fn from_flat(name: &str, s: &Style) -> Self {
        let d = ResolvedStyle::default();
        Self {
            name: name.to_string(),
            font_family: s.font_family.clone().unwrap_or(d.font_family),
            font_size: s.font_size.filter(|v| *v > 0.0).unwrap_or(d.font_size),
            bold: s.bold.unwrap_or(false),
            italic: s.italic.unwrap_or(false),
            align: s.align.unwrap_or_default(),
            color: s.color.unwrap_or(Color::BLACK),
            opacity: s.opacity.unwrap_or(1.0).clamp(0.0, 1.0),
            background: s.background,
            border_color: s.border_color,
            border_width: s.border_width.unwrap_or(0.0).max(0.0),
            border_radius: s.border_radius,
            roughness: s.roughness,
            teeth: s.teeth,
            emphasis: None,
            strong: None,
        }
    }

    /// Distance between baselines.
    pub fn leading(&self) -> f64 {
        self.font_size * 1.2
    }

    pub fn font_key(&self) -> FontKey {
        FontKey::new(&self.font_family, self.bold, self.italic)
    }

    /// Whether the style paints anything behind or around its box.
    pub fn has_decoration(&self) -> bool {
        self.background.is_some() || self.has_border()
    }

    pub fn has_border(&self) -> bool {
        self.border_color.is_some() && self.border_width > 0.0
    }

    /// The style for emphasized text: the named sub-style, or an italic copy.
    pub fn emphasized(&self) -> ResolvedStyle {
        match &self.emphasis {
            Some(s) => (**s).clone(),
            None => ResolvedStyle {
                italic: true,
                ..self.clone()
            },
        }
    }

    /// The style for strong text: the named sub-style, or a bold copy.
    pub fn strengthened(&self) -> ResolvedStyle {
        match &self.strong {
            Some(s) => (**s).clone(),
            None => ResolvedStyle {
                bold: true,
                ..self.clone()
            },
        }
    }

    pub fn with_size(&self, font_size: f64) -> ResolvedStyle {
        ResolvedStyle {
            font_size,
            ..self.clone()
        }
    }

    pub fn with_align(&self, align: Align) -> ResolvedStyle {
        ResolvedStyle {
            align,
            ..self.clone()
        }
    }
}

/// All named styles of a document, resolved.
#[derive(Debug, Clone)]
pub struct Stylesheet {
    styles: HashMap<String, Arc<ResolvedStyle>>,
}

impl Default for Stylesheet {
    fn default() -> Self {
        let mut styles = HashMap::new();
        styles.insert(DEFAULT_STYLE.to_string(), Arc::new(ResolvedStyle::default()));
        Self { styles }
    }
}

impl Stylesheet {
    /// Resolve every style in `sources`. Unknown parents and inheritance
    /// cycles are reported to `warnings`; the offending link is dropped.
    pub fn resolve(sources: &BTreeMap<String, Style>, warnings: &mut Warnings) -> Self {
        let mut flat: HashMap<String, Style> = HashMap::new();
        for name in sources.keys() {
            let mut visiting = HashSet::new();
            flatten(name, sources, &mut flat, &mut visiting, warnings);
        }
        if !flat.contains_key(DEFAULT_STYLE) {
            flat.insert(DEFAULT_STYLE.to_string(), Style::default());
        }

        let base: HashMap<String, Arc<ResolvedStyle>> = flat
            .iter()
            .map(|(name, s)| (name.clone(), Arc::new(ResolvedStyle::from_flat(name, s))))
            .collect();

        // Second pass: attach emphasis/strong sub-styles from the base set.
        let mut styles = HashMap::with_capacity(base.len());
        for (name, resolved) in &base {
            let s = &flat[name];
            let mut style = (**resolved).clone();
            style.emphasis = sub_style(name, s.emphasis.as_deref(), &base, warnings);
            style.strong = sub_style(name, s.strong.as_deref(), &base, warnings);
            styles.insert(name.clone(), Arc::new(style));
        }
        Self { styles }
    }

    pub fn get(&self, name: &str) -> Option<Arc<ResolvedStyle>> {
        self.styles.get(name).cloned()
    }

    /// Look up a style by name, falling back to the default style with a warning.
    pub fn lookup(&self, name: &str, warnings: &mut Warnings) -> Arc<ResolvedStyle> {
        match self.styles.get(name) {
            Some(s) => s.clone(),
            None => {
                warnings.push(
                    WarningKind::UndefinedStyle,
                    format!("undefined style '{name}', using '{DEFAULT_STYLE}'"),
                );
                self.default_style()
            }
        }
    }

    /// Look up an optional style name, using `fallback` when absent.
    pub fn lookup_or(
        &self,
        name: Option<&str>,
        fallback: &str,
        warnings: &mut Warnings,
    ) -> Arc<ResolvedStyle> {
        match name {
            Some(n) => self.lookup(n, warnings),
            None => self.get(fallback).unwrap_or_else(|| self.default_style()),
        }
    }

    pub fn default_style(&self) -> Arc<ResolvedStyle> {
        self.styles
            .get(DEFAULT_STYLE)
            .cloned()
            .unwrap_or_else(|| Arc::new(ResolvedStyle::default()))
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

fn flatten(
    name: &str,
    sources: &BTreeMap<String, Style>,
    flat: &mut HashMap<String, Style>,
    visiting: &mut HashSet<String>,
    warnings: &mut Warnings,
) -> Style {
    if let Some(done) = flat.get(name) {
        return done.clone();
    }
    let own = match sources.get(name) {
        Some(s) => s.clone(),
        None => {
            warnings.push(
                WarningKind::UndefinedStyle,
                format!("undefined style '{name}' referenced by inherit"),
            );
            return Style::default();
        }
    };
    if !visiting.insert(name.to_string()) {
        warnings.push(
            WarningKind::StyleCycle,
            format!("style '{name}' inherits from itself"),
        );
        return Style::default();
    }

    let parent_name = match own.inherit.as_deref() {
        Some(p) => Some(p),
        None if name != DEFAULT_STYLE && sources.contains_key(DEFAULT_STYLE) => Some(DEFAULT_STYLE),
        None => None,
    };
    let parent = match parent_name {
        Some(p) if visiting.contains(p) => {
            warnings.push(
                WarningKind::StyleCycle,
                format!("style '{name}' inherits from '{p}', which is a cycle"),
            );
            Style::default()
        }
        Some(p) => flatten(p, sources, flat, visiting, warnings),
        None => Style::default(),
    };

    let mut merged = parent.merged(&own);
    merged.inherit = None;
    visiting.remove(name);
    flat.insert(name.to_string(), merged.clone());
    merged
}

fn sub_style(
    owner: &str,
    name: Option<&str>,
    base: &HashMap<String, Arc<ResolvedStyle>>,
    warnings: &mut Warnings,
) -> Option<Arc<ResolvedStyle>> {
    let name = name?;
    match base.get(name) {
        Some(s) => Some(s.clone()),
        None => {
            warnings.push(
                WarningKind::UndefinedStyle,
                format!("style '{owner}' names undefined sub-style '{name}'"),
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(entries: &[(&str, Style)]) -> (Stylesheet, Warnings) {
        let sources: BTreeMap<String, Style> = entries
            .iter()
            .map(|(n, s)| (n.to_string(), s.clone()))
            .collect();
        let mut warnings = Warnings::default();
        let sheet = Stylesheet::resolve(&sources, &mut warnings);
        (sheet, warnings)
    }

    #[test]
    fn merge_keeps_unset_fields() {
        let base = Style {
            font_size: Some(10.0),
            color: Some(Color::RED),
            ..Default::default()
        };
        let over = Style {
            font_size: Some(12.0),
            ..Default::default()
        };
        let m = base.merged(&over);
        assert_eq!(m.font_size, Some(12.0));
        assert_eq!(m.color, Some(Color::RED));
    }

    #[test]
    fn inheritance_chain_resolves() {
        let (sheet, warnings) = sheet(&[
            (
                "default",
                Style {
                    font_family: Some("Times".into()),
                    font_size: Some(8.0),
                    ..Default::default()
                },
            ),
            (
                "title",
                Style {
                    bold: Some(true),
                    font_size: Some(14.0),
                    ..Default::default()
                },
            ),
            (
                "subtitle",
                Style {
                    inherit: Some("title".into()),
                    font_size: Some(11.0),
                    ..Default::default()
                },
            ),
        ]);
        assert!(warnings.is_empty());
        let sub = sheet.get("subtitle").unwrap();
        assert_eq!(sub.font_family, "Times");
        assert!(sub.bold);
        assert_eq!(sub.font_size, 11.0);
    }

    #[test]
    fn cycle_is_reported_not_followed() {
        let (sheet, warnings) = sheet(&[
            (
                "a",
                Style {
                    inherit: Some("b".into()),
                    ..Default::default()
                },
            ),
            (
                "b",
                Style {
                    inherit: Some("a".into()),
                    bold: Some(true),
                    ..Default::default()
                },
            ),
        ]);
        assert!(sheet.get("a").is_some());
        assert!(warnings.iter().any(|w| w.kind == WarningKind::StyleCycle));
    }

    #[test]
    fn undefined_lookup_falls_back_with_warning() {
        let (sheet, mut warnings) = sheet(&[]);
        let s = sheet.lookup("nope", &mut warnings);
        assert_eq!(s.name, DEFAULT_STYLE);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings.iter().next().unwrap().kind, WarningKind::UndefinedStyle);
    }

    #[test]
    fn sub_styles_attach() {
        let (sheet, _) = sheet(&[
            (
                "body",
                Style {
                    strong: Some("loud".into()),
                    ..Default::default()
                },
            ),
            (
                "loud",
                Style {
                    color: Some(Color::RED),
                    ..Default::default()
                },
            ),
        ]);
        let body = sheet.get("body").unwrap();
        assert_eq!(body.strengthened().color, Color::RED);
        assert!(body.emphasized().italic);
    }

    #[test]
    fn color_parsing() {
        let c: Color = serde_json::from_str("\"#ff0000\"").unwrap();
        assert_eq!(c, Color::RED);
        let c: Color = serde_json::from_str("\"#fff\"").unwrap();
        assert_eq!(c, Color::WHITE);
        let c: Color = serde_json::from_str("{\"r\": 0.5, \"g\": 0, \"b\": 0}").unwrap();
        assert_eq!(c.a, 1.0);
        assert!(serde_json::from_str::<Color>("\"blue\"").is_err());
    }
}
