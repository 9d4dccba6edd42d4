//! # Document Model
//!
//! The tree the layout engine works on: a [`Sheet`] of [`Section`]s of
//! [`Block`]s, whose content is [`Run`]s of inline [`Element`]s.
//!
//! Documents arrive as [`source::SheetSource`] (plain serde types). Fix-up in
//! [`Sheet::from_source`] resolves style names, checks option maps, splits
//! out symbol glyphs, loads images and numbers the blocks. Everything the
//! layout engine sees afterwards is typed and immutable.

pub mod source;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::FolioError;
use crate::font::{FontContext, FontKey};
use crate::geom::{Extent, Margins};
use crate::image_loader::{ImageRef, ImageStore};
use crate::layout::LayoutSettings;
use crate::style::{ResolvedStyle, Stylesheet};
use crate::warning::{WarningKind, Warnings};

pub use source::{ImageAlign, SheetSource};
use source::{
    BlockSource, ElementKindSource, ElementSource, Emphasis, Options, RunSource, SectionSource,
};

/// Style used for block titles when the block does not name one.
pub const TITLE_STYLE: &str = "title";

/// Stable identity of a block, assigned in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The whole document, ready for layout.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub page: Extent,
    pub margin: Margins,
    /// Vertical gap between sections.
    pub padding: f64,
    pub watermark: Option<ImageRef>,
    pub sections: Vec<Section>,
    pub settings: LayoutSettings,
}

/// Outer inset plus inner gap, shared by sections and blocks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Spacing {
    pub margin: f64,
    pub padding: f64,
}

#[derive(Debug, Clone)]
pub struct Section {
    pub method: SectionMethod,
    pub spacing: Spacing,
    pub blocks: Vec<Block>,
    pub page_break_after: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SectionMethod {
    /// Blocks flow into up to `columns` columns. With `equal`, columns
    /// share the width evenly instead of having their widths optimized.
    Columns { columns: usize, equal: bool },
}

#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    pub title: Option<Run>,
    pub title_method: TitleMethod,
    pub method: BlockMethod,
    pub content: Vec<Run>,
    pub image: Option<BlockImage>,
    pub spacing: Spacing,
    pub style: Arc<ResolvedStyle>,
    pub title_style: Arc<ResolvedStyle>,
}

impl Block {
    /// The title to draw, if the title method shows one.
    pub fn visible_title(&self) -> Option<&Run> {
        match self.title_method {
            TitleMethod::Banner => self.title.as_ref(),
            TitleMethod::Hidden => None,
        }
    }

    /// Whether any run has cell separators.
    pub fn needs_table(&self) -> bool {
        self.content.iter().any(Run::has_separators)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleMethod {
    Banner,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMethod {
    /// One paragraph per run, stacked.
    Paragraphs,
    /// Runs are rows, separators split them into cells.
    Table { equal: bool },
    /// Rows of label and value pills.
    Thermometer,
    /// A row of equal shapes, one per run.
    Badge { shape: BadgeShape },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BadgeShape {
    Oval,
    Hexagon,
    Round,
    Rect,
}

impl BadgeShape {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "oval" | "circle" => Some(Self::Oval),
            "hexagon" | "hex" => Some(Self::Hexagon),
            "round" | "rounded" => Some(Self::Round),
            "rect" | "square" => Some(Self::Rect),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BlockImage {
    pub image: ImageRef,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub align: ImageAlign,
}

impl BlockImage {
    pub fn has_fixed_size(&self) -> bool {
        self.width.is_some() || self.height.is_some()
    }
}

/// A sequence of inline elements wrapped together.
#[derive(Debug, Clone)]
pub struct Run {
    pub elements: Vec<Element>,
    pub style: Arc<ResolvedStyle>,
}

impl Run {
    pub fn new(elements: Vec<Element>, style: Arc<ResolvedStyle>) -> Self {
        Self { elements, style }
    }

    /// A run of one text element in `style`.
    pub fn text(value: &str, style: Arc<ResolvedStyle>) -> Self {
        Self {
            elements: vec![Element::new(ElementKind::Text, value, style.clone())],
            style,
        }
    }

    pub fn has_separators(&self) -> bool {
        self.elements.iter().any(|e| e.kind.is_separator())
    }

    /// Split at separators. Each cell keeps the separator that ended the
    /// previous cell so dividers can be drawn.
    pub fn cells(&self) -> Vec<Cell> {
        let mut cells = Vec::new();
        let mut current = Vec::new();
        let mut before = None;
        for e in &self.elements {
            if e.kind.is_separator() {
                cells.push(Cell {
                    run: Run::new(std::mem::take(&mut current), self.style.clone()),
                    separator_before: before.take(),
                });
                before = Some(e.clone());
            } else {
                current.push(e.clone());
            }
        }
        cells.push(Cell {
            run: Run::new(current, self.style.clone()),
            separator_before: before,
        });
        cells
    }

    /// Plain text of the run, separators as spaces.
    pub fn plain_text(&self) -> String {
        self.elements
            .iter()
            .map(|e| match e.kind {
                ElementKind::Divider | ElementKind::Spacer => " ",
                _ => e.value.as_str(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Largest font size used by any element.
    pub fn max_font_size(&self) -> f64 {
        self.elements
            .iter()
            .map(|e| e.style.font_size)
            .fold(self.style.font_size, f64::max)
    }
}

/// One table cell cut out of a run.
#[derive(Debug, Clone)]
pub struct Cell {
    pub run: Run,
    pub separator_before: Option<Element>,
}

#[derive(Debug, Clone)]
pub struct Element {
    pub kind: ElementKind,
    pub value: String,
    pub style: Arc<ResolvedStyle>,
}

impl Element {
    pub fn new(kind: ElementKind, value: &str, style: Arc<ResolvedStyle>) -> Self {
        Self {
            kind,
            value: value.to_string(),
            style,
        }
    }

    /// The font this element is drawn with.
    pub fn font_key(&self) -> FontKey {
        match self.kind {
            ElementKind::Symbol | ElementKind::Checkbox => FontKey::symbol(),
            _ => self.style.font_key(),
        }
    }

    /// The characters actually drawn for this element.
    pub fn display_text(&self) -> String {
        match self.kind {
            ElementKind::Checkbox => {
                let checked = matches!(
                    self.value.trim().to_ascii_lowercase().as_str(),
                    "x" | "checked" | "true" | "yes" | "1"
                );
                let glyph = if checked { "\u{2714}" } else { "\u{274F}" };
                glyph.to_string()
            }
            ElementKind::Divider | ElementKind::Spacer => " ".to_string(),
            _ => self.value.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ElementKind {
    Text,
    Symbol,
    Checkbox,
    Divider,
    Spacer,
}

impl ElementKind {
    pub fn is_separator(&self) -> bool {
        matches!(self, ElementKind::Divider | ElementKind::Spacer)
    }
}

impl Sheet {
    /// Turn a parsed document into the layout tree.
    ///
    /// Fonts must already be registered: symbol splitting asks `fonts` which
    /// characters the text fonts can draw. Images are loaded into `images`.
    pub fn from_source(
        source: SheetSource,
        fonts: &FontContext,
        images: &mut ImageStore,
        warnings: &mut Warnings,
    ) -> Result<Sheet, FolioError> {
        let (width, height) = source.page.dimensions();
        let page = Extent::new(width, height);
        if !page.is_positive() {
            return Err(FolioError::InvalidDocument(format!(
                "page size must be positive, got {width} x {height}"
            )));
        }
        let content_width = width - source.margin.horizontal();
        let content_height = height - source.margin.vertical();
        if content_width <= 0.0 || content_height <= 0.0 {
            return Err(FolioError::InvalidDocument(format!(
                "margins leave no room on a {width} x {height} page"
            )));
        }

        let styles = Stylesheet::resolve(&source.styles, warnings);
        let watermark = source.watermark.as_deref().and_then(|uri| {
            match images.try_load(uri) {
                Ok(r) => Some(r),
                Err(e) => {
                    warnings.push(
                        WarningKind::MissingWatermark,
                        format!("watermark could not be loaded, drawing none: {e}"),
                    );
                    None
                }
            }
        });

        let mut fixer = FixUp {
            styles: &styles,
            fonts,
            images,
            warnings,
            next_id: 0,
        };
        let sections = source
            .sections
            .into_iter()
            .enumerate()
            .filter_map(|(i, s)| fixer.section(i, s))
            .collect();

        Ok(Sheet {
            page,
            margin: source.margin,
            padding: source.padding.max(0.0),
            watermark,
            sections,
            settings: source.settings,
        })
    }

    pub fn block_count(&self) -> usize {
        self.sections.iter().map(|s| s.blocks.len()).sum()
    }
}

struct FixUp<'a> {
    styles: &'a Stylesheet,
    fonts: &'a FontContext,
    images: &'a mut ImageStore,
    warnings: &'a mut Warnings,
    next_id: u32,
}

impl FixUp<'_> {
    fn section(&mut self, index: usize, src: SectionSource) -> Option<Section> {
        let context = format!("section {}", index + 1);
        let method = match src.method.as_deref() {
            None | Some("columns") => {
                check_options(&src.options, &["columns", "equal"], &context, self.warnings);
                SectionMethod::Columns {
                    columns: opt_usize(&src.options, "columns").unwrap_or(1).max(1),
                    equal: opt_bool(&src.options, "equal").unwrap_or(false),
                }
            }
            Some("stack") => {
                check_options(&src.options, &[], &context, self.warnings);
                SectionMethod::Columns {
                    columns: 1,
                    equal: true,
                }
            }
            Some(other) => {
                self.warnings.push(
                    WarningKind::UnknownSectionMethod,
                    format!("{context}: unknown layout method '{other}', using columns"),
                );
                SectionMethod::Columns {
                    columns: opt_usize(&src.options, "columns").unwrap_or(1).max(1),
                    equal: false,
                }
            }
        };

        let blocks: Vec<Block> = src
            .blocks
            .into_iter()
            .enumerate()
            .filter_map(|(j, b)| self.block(&context, j, b))
            .collect();
        if blocks.is_empty() {
            self.warnings.push(
                WarningKind::EmptySection,
                format!("{context} has no blocks and was dropped"),
            );
            return None;
        }

        Some(Section {
            method,
            spacing: Spacing {
                margin: src.margin.unwrap_or(0.0).max(0.0),
                padding: src.padding.unwrap_or(6.0).max(0.0),
            },
            blocks,
            page_break_after: src.page_break_after,
        })
    }

    fn block(&mut self, section: &str, index: usize, src: BlockSource) -> Option<Block> {
        let context = format!("{section}, block {}", index + 1);
        let style = self
            .styles
            .lookup_or(src.style.as_deref(), crate::style::DEFAULT_STYLE, self.warnings);
        let title_style = self
            .styles
            .lookup_or(src.title_style.as_deref(), TITLE_STYLE, self.warnings);

        let title = src
            .title
            .as_ref()
            .map(|r| self.run(r, &title_style))
            .filter(|r| !r.is_empty());
        let content: Vec<Run> = src
            .content
            .iter()
            .map(|r| self.run(r, &style))
            .filter(|r| !r.is_empty())
            .collect();
        let image = src.image.map(|img| BlockImage {
            image: self.images.load(&img.uri, self.warnings),
            width: img.width.filter(|w| *w > 0.0),
            height: img.height.filter(|h| *h > 0.0),
            align: img.align,
        });

        if title.is_none() && content.is_empty() && image.is_none() {
            self.warnings.push(
                WarningKind::EmptyBlock,
                format!("{context} has no title, content or image and was dropped"),
            );
            return None;
        }

        let title_method = match src.title_method.as_deref() {
            None | Some("banner") => TitleMethod::Banner,
            Some("hidden") | Some("none") => TitleMethod::Hidden,
            Some(other) => {
                self.warnings.push(
                    WarningKind::UnknownTitleMethod,
                    format!("{context}: unknown title method '{other}', using banner"),
                );
                TitleMethod::Banner
            }
        };
        check_options(&src.title_options, &[], &format!("{context} title"), self.warnings);

        let has_separators = content.iter().any(Run::has_separators);
        let promoted = if has_separators {
            BlockMethod::Table { equal: false }
        } else {
            BlockMethod::Paragraphs
        };
        let method = match src.method.as_deref() {
            None | Some("default") => {
                check_options(&src.options, &[], &context, self.warnings);
                promoted
            }
            Some("table") => {
                check_options(&src.options, &["equal"], &context, self.warnings);
                BlockMethod::Table {
                    equal: opt_bool(&src.options, "equal").unwrap_or(false),
                }
            }
            Some("thermometer") => {
                check_options(&src.options, &[], &context, self.warnings);
                BlockMethod::Thermometer
            }
            Some("badge") => {
                check_options(&src.options, &["shape"], &context, self.warnings);
                let shape = match opt_str(&src.options, "shape") {
                    None => BadgeShape::Oval,
                    Some(name) => BadgeShape::from_name(name).unwrap_or_else(|| {
                        self.warnings.push(
                            WarningKind::UnknownShape,
                            format!("{context}: unknown shape '{name}', using rect"),
                        );
                        BadgeShape::Rect
                    }),
                };
                BlockMethod::Badge { shape }
            }
            Some(other) => {
                self.warnings.push(
                    WarningKind::UnknownBlockMethod,
                    format!("{context}: unknown block method '{other}', using default"),
                );
                promoted
            }
        };

        let id = BlockId(self.next_id);
        self.next_id += 1;
        Some(Block {
            id,
            title,
            title_method,
            method,
            content,
            image,
            spacing: Spacing {
                margin: src.margin.unwrap_or(4.0).max(0.0),
                padding: src.padding.unwrap_or(4.0).max(0.0),
            },
            style,
            title_style,
        })
    }

    fn run(&mut self, src: &RunSource, base: &Arc<ResolvedStyle>) -> Run {
        let (style, elements): (Arc<ResolvedStyle>, Vec<ElementSource>) = match src {
            RunSource::Plain(s) => (base.clone(), split_plain(s)),
            RunSource::Elements(els) => (base.clone(), els.clone()),
            RunSource::Styled { style, elements } => (
                match style {
                    Some(name) => self.styles.lookup(name, self.warnings),
                    None => base.clone(),
                },
                elements.clone(),
            ),
        };

        let mut out = Vec::with_capacity(elements.len());
        for e in elements {
            let mut el_style = match &e.style {
                Some(name) => self.styles.lookup(name, self.warnings),
                None => style.clone(),
            };
            match e.emphasis {
                Some(Emphasis::Emphasis) => el_style = Arc::new(el_style.emphasized()),
                Some(Emphasis::Strong) => el_style = Arc::new(el_style.strengthened()),
                None => {}
            }
            match e.kind {
                ElementKindSource::Text => {
                    split_symbols(&e.value, &el_style, self.fonts, &mut out);
                }
                ElementKindSource::Symbol => {
                    if !e.value.is_empty() {
                        out.push(Element::new(ElementKind::Symbol, &e.value, el_style));
                    }
                }
                ElementKindSource::Checkbox => {
                    out.push(Element::new(ElementKind::Checkbox, &e.value, el_style));
                }
                ElementKindSource::Divider => {
                    out.push(Element::new(ElementKind::Divider, "|", el_style));
                }
                ElementKindSource::Spacer => {
                    out.push(Element::new(ElementKind::Spacer, "", el_style));
                }
            }
        }
        Run::new(out, style)
    }
}

/// Split a plain string at `|` (divider) and tab (spacer).
fn split_plain(s: &str) -> Vec<ElementSource> {
    let mut out = Vec::new();
    let mut text = String::new();
    let flush = |text: &mut String, out: &mut Vec<ElementSource>| {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            out.push(ElementSource::text(trimmed));
        }
        text.clear();
    };
    for ch in s.chars() {
        let kind = match ch {
            '|' => ElementKindSource::Divider,
            '\t' => ElementKindSource::Spacer,
            _ => {
                text.push(ch);
                continue;
            }
        };
        flush(&mut text, &mut out);
        out.push(ElementSource {
            kind,
            ..ElementSource::text("")
        });
    }
    flush(&mut text, &mut out);
    out
}

/// Push `value` as TEXT elements, cutting out SYMBOL elements for
/// characters the text font cannot draw but the symbol font can.
fn split_symbols(value: &str, style: &Arc<ResolvedStyle>, fonts: &FontContext, out: &mut Vec<Element>) {
    let text_font = style.font_key();
    let symbol_font = FontKey::symbol();
    let mut current = String::new();
    let mut current_is_symbol = false;
    for ch in value.chars() {
        let is_symbol = !ch.is_whitespace()
            && !fonts.has_glyph(&text_font, ch)
            && fonts.has_glyph(&symbol_font, ch);
        if is_symbol != current_is_symbol && !current.is_empty() {
            let kind = if current_is_symbol {
                ElementKind::Symbol
            } else {
                ElementKind::Text
            };
            out.push(Element::new(kind, &current, style.clone()));
            current.clear();
        }
        current_is_symbol = is_symbol;
        current.push(ch);
    }
    if !current.is_empty() {
        let kind = if current_is_symbol {
            ElementKind::Symbol
        } else {
            ElementKind::Text
        };
        out.push(Element::new(kind, &current, style.clone()));
    }
}

fn check_options(options: &Options, allowed: &[&str], context: &str, warnings: &mut Warnings) {
    for key in options.keys() {
        if !allowed.contains(&key.as_str()) {
            warnings.push(
                WarningKind::UnknownOption,
                format!("{context}: unknown option '{key}' ignored"),
            );
        }
    }
}

fn opt_usize(options: &Options, key: &str) -> Option<usize> {
    options.get(key).and_then(Value::as_u64).map(|v| v as usize)
}

fn opt_bool(options: &Options, key: &str) -> Option<bool> {
    options.get(key).and_then(Value::as_bool)
}

fn opt_str<'a>(options: &'a Options, key: &str) -> Option<&'a str> {
    options.get(key).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(json: &str) -> (Sheet, Warnings) {
        let source: SheetSource = serde_json::from_str(json).unwrap();
        let fonts = FontContext::new();
        let mut images = ImageStore::new(None);
        let mut warnings = Warnings::default();
        let sheet = Sheet::from_source(source, &fonts, &mut images, &mut warnings).unwrap();
        (sheet, warnings)
    }

    #[test]
    fn plain_run_splits_cells() {
        let els = split_plain("Label | Value\tMore");
        let kinds: Vec<_> = els.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ElementKindSource::Text,
                ElementKindSource::Divider,
                ElementKindSource::Text,
                ElementKindSource::Spacer,
                ElementKindSource::Text
            ]
        );
        assert_eq!(els[0].value, "Label");
        assert_eq!(els[2].value, "Value");
    }

    #[test]
    fn separators_promote_to_table() {
        let (sheet, warnings) = fix(
            r#"{"sections": [{"blocks": [
                {"content": ["a | b"]},
                {"content": ["plain"]}
            ]}]}"#,
        );
        assert!(warnings.is_empty());
        let blocks = &sheet.sections[0].blocks;
        assert_eq!(blocks[0].method, BlockMethod::Table { equal: false });
        assert_eq!(blocks[1].method, BlockMethod::Paragraphs);
        assert_eq!(blocks[0].id, BlockId(0));
        assert_eq!(blocks[1].id, BlockId(1));
    }

    #[test]
    fn symbols_are_split_out() {
        let (sheet, _) = fix(r#"{"sections": [{"blocks": [{"content": ["ok ✓ done"]}]}]}"#);
        let run = &sheet.sections[0].blocks[0].content[0];
        let kinds: Vec<_> = run.elements.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![ElementKind::Text, ElementKind::Symbol, ElementKind::Text]
        );
        assert_eq!(run.elements[1].value, "✓");
        assert_eq!(run.elements[1].font_key(), FontKey::symbol());
    }

    #[test]
    fn unknown_names_warn_and_fall_back() {
        let (sheet, warnings) = fix(
            r#"{"sections": [
                {"method": "spiral", "options": {"columns": 2, "bogus": 1}, "blocks": [
                    {"method": "wobble", "style": "missing", "content": ["x"]},
                    {"method": "badge", "options": {"shape": "star"}, "content": ["y"]},
                    {"titleMethod": "marquee", "title": "T"}
                ]}
            ]}"#,
        );
        assert_eq!(warnings.count(WarningKind::UnknownSectionMethod), 1);
        assert_eq!(warnings.count(WarningKind::UnknownBlockMethod), 1);
        assert_eq!(warnings.count(WarningKind::UnknownShape), 1);
        assert_eq!(warnings.count(WarningKind::UndefinedStyle), 1);
        assert_eq!(warnings.count(WarningKind::UnknownTitleMethod), 1);
        let section = &sheet.sections[0];
        assert_eq!(
            section.method,
            SectionMethod::Columns {
                columns: 2,
                equal: false
            }
        );
        assert_eq!(section.blocks[0].method, BlockMethod::Paragraphs);
        assert_eq!(
            section.blocks[1].method,
            BlockMethod::Badge {
                shape: BadgeShape::Rect
            }
        );
    }

    #[test]
    fn unknown_option_warns() {
        let (_, warnings) = fix(
            r#"{"sections": [{"options": {"colums": 2}, "blocks": [{"content": ["x"]}]}]}"#,
        );
        assert_eq!(warnings.count(WarningKind::UnknownOption), 1);
    }

    #[test]
    fn empty_sections_and_blocks_are_dropped() {
        let (sheet, warnings) = fix(r#"{"sections": [{"blocks": [{}]}, {"blocks": [{"content": ["x"]}]}]}"#);
        assert_eq!(sheet.sections.len(), 1);
        assert_eq!(warnings.count(WarningKind::EmptyBlock), 1);
        assert_eq!(warnings.count(WarningKind::EmptySection), 1);
    }

    #[test]
    fn missing_watermark_is_a_warning() {
        let (sheet, warnings) =
            fix(r#"{"watermark": "./definitely-not-here.png", "sections": []}"#);
        assert!(sheet.watermark.is_none());
        assert_eq!(warnings.count(WarningKind::MissingWatermark), 1);
        assert_eq!(warnings.count(WarningKind::MissingImage), 0);
    }

    #[test]
    fn bad_page_is_rejected() {
        let source: SheetSource = serde_json::from_str(
            r#"{"page": {"Custom": {"width": 0, "height": 100}}}"#,
        )
        .unwrap();
        let mut warnings = Warnings::default();
        let result = Sheet::from_source(
            source,
            &FontContext::new(),
            &mut ImageStore::new(None),
            &mut warnings,
        );
        assert!(matches!(result, Err(FolioError::InvalidDocument(_))));
    }

    #[test]
    fn emphasis_applies_sub_style() {
        let (sheet, _) = fix(
            r#"{"sections": [{"blocks": [{"content": [
                [{"value": "a"}, {"value": "b", "emphasis": "strong"}]
            ]}]}]}"#,
        );
        let run = &sheet.sections[0].blocks[0].content[0];
        assert!(!run.elements[0].style.bold);
        assert!(run.elements[1].style.bold);
    }

    #[test]
    fn cells_remember_separators() {
        let style = Arc::new(ResolvedStyle::default());
        let run = Run::new(
            vec![
                Element::new(ElementKind::Text, "a", style.clone()),
                Element::new(ElementKind::Divider, "|", style.clone()),
                Element::new(ElementKind::Text, "b", style.clone()),
                Element::new(ElementKind::Spacer, "", style.clone()),
            ],
            style,
        );
        let cells = run.cells();
        assert_eq!(cells.len(), 3);
        assert!(cells[0].separator_before.is_none());
        assert_eq!(
            cells[1].separator_before.as_ref().map(|e| e.kind),
            Some(ElementKind::Divider)
        );
        assert!(cells[2].run.is_empty());
    }
}
