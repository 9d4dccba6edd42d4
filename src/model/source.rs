//! The document as it arrives on the wire.
//!
//! These types mirror the JSON input one to one. Nothing here is validated;
//! [`super::Sheet::from_source`] turns them into the layout tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geom::Margins;
use crate::layout::LayoutSettings;
use crate::style::Style;

/// Option maps are kept loosely typed until fix-up checks their keys.
pub type Options = Map<String, Value>;

/// A complete sheet document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetSource {
    #[serde(default)]
    pub page: PageSize,

    /// Page margins in points (1/72 inch).
    #[serde(default = "default_page_margin")]
    pub margin: Margins,

    /// Vertical gap between consecutive sections.
    #[serde(default = "default_section_gap")]
    pub padding: f64,

    /// Image drawn full-page beneath every page.
    #[serde(default)]
    pub watermark: Option<String>,

    #[serde(default)]
    pub styles: BTreeMap<String, Style>,

    /// Custom fonts to register before layout.
    #[serde(default)]
    pub fonts: Vec<FontEntry>,

    #[serde(default)]
    pub settings: LayoutSettings,

    #[serde(default)]
    pub sections: Vec<SectionSource>,
}

impl Default for SheetSource {
    fn default() -> Self {
        Self {
            page: PageSize::default(),
            margin: default_page_margin(),
            padding: default_section_gap(),
            watermark: None,
            styles: BTreeMap::new(),
            fonts: Vec::new(),
            settings: LayoutSettings::default(),
            sections: Vec::new(),
        }
    }
}

fn default_page_margin() -> Margins {
    Margins::uniform(36.0)
}

fn default_section_gap() -> f64 {
    8.0
}

/// A custom font to register with the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontEntry {
    /// Font family name (e.g. "Inter", "Roboto").
    pub family: String,
    /// Base64-encoded font data, a data URI, or a file path.
    pub src: String,
    /// Font weight (100-900). 600 and above counts as bold.
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default)]
    pub italic: bool,
}

fn default_weight() -> u32 {
    400
}

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A3 => (841.89, 1190.55),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Tabloid => (792.0, 1224.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSource {
    /// Layout method; `columns` when absent.
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub options: Options,
    /// Inset around the whole section.
    #[serde(default)]
    pub margin: Option<f64>,
    /// Gap between columns and between blocks in a column.
    #[serde(default)]
    pub padding: Option<f64>,
    #[serde(default)]
    pub page_break_after: bool,
    #[serde(default)]
    pub blocks: Vec<BlockSource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSource {
    #[serde(default)]
    pub title: Option<RunSource>,
    /// `banner` (default), `hidden` or `none`.
    #[serde(default)]
    pub title_method: Option<String>,
    #[serde(default)]
    pub title_options: Options,
    /// `default`, `table`, `thermometer` or `badge`.
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub options: Options,
    #[serde(default)]
    pub content: Vec<RunSource>,
    #[serde(default)]
    pub image: Option<ImageSource>,
    /// Inset between the block's border and its content.
    #[serde(default)]
    pub margin: Option<f64>,
    /// Gap between the parts of a block.
    #[serde(default)]
    pub padding: Option<f64>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub title_style: Option<String>,
}

/// A run: either a plain string or a list of elements.
///
/// In a plain string `|` separates cells with a divider and a tab separates
/// cells with a spacer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunSource {
    Plain(String),
    Elements(Vec<ElementSource>),
    Styled {
        #[serde(default)]
        style: Option<String>,
        elements: Vec<ElementSource>,
    },
}

impl From<&str> for RunSource {
    fn from(s: &str) -> Self {
        RunSource::Plain(s.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSource {
    #[serde(default)]
    pub kind: ElementKindSource,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub emphasis: Option<Emphasis>,
}

impl ElementSource {
    pub fn text(value: &str) -> Self {
        Self {
            kind: ElementKindSource::Text,
            value: value.to_string(),
            style: None,
            emphasis: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKindSource {
    #[default]
    Text,
    Symbol,
    Checkbox,
    Divider,
    Spacer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emphasis {
    #[serde(alias = "em")]
    Emphasis,
    Strong,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSource {
    pub uri: String,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub align: ImageAlign,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageAlign {
    #[default]
    Left,
    Right,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_sheet_parses() {
        let s: SheetSource = serde_json::from_str(r#"{"sections": []}"#).unwrap();
        assert_eq!(s.page, PageSize::A4);
        assert_eq!(s.margin, Margins::uniform(36.0));
        assert!(s.sections.is_empty());
    }

    #[test]
    fn run_shapes() {
        let runs: Vec<RunSource> = serde_json::from_str(
            r#"["plain", [{"value": "a"}, {"kind": "divider"}], {"style": "x", "elements": []}]"#,
        )
        .unwrap();
        assert!(matches!(runs[0], RunSource::Plain(_)));
        match &runs[1] {
            RunSource::Elements(els) => {
                assert_eq!(els[0].kind, ElementKindSource::Text);
                assert_eq!(els[1].kind, ElementKindSource::Divider);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(runs[2], RunSource::Styled { .. }));
    }

    #[test]
    fn custom_page_size() {
        let s: SheetSource =
            serde_json::from_str(r#"{"page": {"Custom": {"width": 200, "height": 100}}}"#).unwrap();
        assert_eq!(s.page.dimensions(), (200.0, 100.0));
    }
}
