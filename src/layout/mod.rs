//! # Sheet Layout Engine
//!
//! Turns a [`Sheet`] into pages of placed content.
//!
//! Layout is top-down. Sections stack down the page. Each section spreads its
//! blocks over columns, and the column widths and the split of blocks between
//! columns are both chosen by searching: a candidate is laid out for real,
//! scored on height, balance and how badly its text had to break, and the
//! search keeps the cheapest. Wrapping text is the only way to know how tall
//! a block is at a given width, so blocks are cached per width for the
//! duration of a section.
//!
//! When a section does not fit below what is already on the page, the engine
//! looks for the longest prefix of its blocks that does and moves the rest to
//! a new page. Blocks themselves never split.

pub mod badge;
pub mod block;
pub mod columns;
pub mod optimize;
pub mod path;
pub mod placed;
pub mod section;
pub mod settings;
pub mod table;
pub mod thermometer;

use std::num::NonZeroUsize;

use lru::LruCache;
use serde::Serialize;

use crate::font::FontContext;
use crate::geom::{Extent, Margins, Point, Rect};
use crate::model::{BlockId, Sheet};

pub use crate::warning::{Warning, WarningKind, Warnings};
pub use placed::{Content, DrawMethod, Placed, Quality};
pub use settings::{LayoutSettings, OptimizerSettings, ScoreWeights};

/// Something that can be laid out into a rectangle: a block, or any other
/// content a column can hold.
pub type Placeable<'p> = Box<dyn Fn(&mut LayoutContext<'_>, Rect) -> Placed + 'p>;

/// Box a closure as a [`Placeable`].
pub fn placeable<'p, F>(f: F) -> Placeable<'p>
where
    F: Fn(&mut LayoutContext<'_>, Rect) -> Placed + 'p,
{
    Box::new(f)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutStats {
    pub cache_hits: usize,
    pub cache_misses: usize,
}

/// Everything a layout pass reads and the state it keeps while running.
pub struct LayoutContext<'a> {
    pub fonts: &'a FontContext,
    pub settings: &'a LayoutSettings,
    pub warnings: Warnings,
    pub stats: LayoutStats,
    block_cache: LruCache<(BlockId, i64), Placed>,
}

impl<'a> LayoutContext<'a> {
    pub fn new(fonts: &'a FontContext, settings: &'a LayoutSettings) -> Self {
        let size = NonZeroUsize::new(settings.block_cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            fonts,
            settings,
            warnings: Warnings::default(),
            stats: LayoutStats::default(),
            block_cache: LruCache::new(size),
        }
    }

    /// Cache key for a block laid out at `width`; widths closer than a
    /// hundredth of a point share an entry.
    fn cache_key(id: BlockId, width: f64) -> (BlockId, i64) {
        (id, (width * 100.0).round() as i64)
    }

    pub(crate) fn cached_block(&mut self, id: BlockId, width: f64) -> Option<Placed> {
        let hit = self.block_cache.get(&Self::cache_key(id, width)).cloned();
        if hit.is_some() {
            self.stats.cache_hits += 1;
        } else {
            self.stats.cache_misses += 1;
        }
        hit
    }

    pub(crate) fn store_block(&mut self, id: BlockId, width: f64, placed: &Placed) {
        self.block_cache
            .put(Self::cache_key(id, width), placed.clone());
    }

    pub fn clear_block_cache(&mut self) {
        tracing::debug!(
            entries = self.block_cache.len(),
            hits = self.stats.cache_hits,
            misses = self.stats.cache_misses,
            "clearing block cache"
        );
        self.block_cache.clear();
    }
}

/// One output page: top-level groups in drawing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub groups: Vec<Placed>,
}

/// The laid-out sheet.
#[derive(Debug, Clone)]
pub struct SheetLayout {
    pub page_size: Extent,
    pub margin: Margins,
    pub pages: Vec<Page>,
}

/// Lay out every section of `sheet`.
pub fn layout_sheet(ctx: &mut LayoutContext<'_>, sheet: &Sheet) -> SheetLayout {
    let page = Rect::from_extent(sheet.page) - sheet.margin;
    let mut pages: Vec<Page> = vec![Page::default()];
    let mut top = page.top;
    let mut force_new_page = false;

    for (i, section) in sheet.sections.iter().enumerate() {
        let bounds = if force_new_page {
            page
        } else {
            Rect::from_edges(page.left, top, page.right, page.bottom.max(top))
        };
        let mut groups = section::place_section(ctx, section, bounds, page);
        ctx.clear_block_cache();

        if force_new_page {
            if let Some(first) = groups.first_mut() {
                first.page_break_before = true;
            }
        }
        for group in groups.drain(..) {
            let starts_page = group.page_break_before
                && pages.last().is_some_and(|p| !p.groups.is_empty());
            if starts_page {
                pages.push(Page::default());
            }
            top = group.actual.bottom + section.spacing.margin + sheet.padding;
            if let Some(current) = pages.last_mut() {
                current.groups.push(group);
            }
        }
        force_new_page = section.page_break_after;
        tracing::debug!(section = i, pages = pages.len(), "placed section");
    }

    if pages.last().is_some_and(|p| p.groups.is_empty()) && pages.len() > 1 {
        pages.pop();
    }
    SheetLayout {
        page_size: sheet.page,
        margin: sheet.margin,
        pages,
    }
}

// ── Serializable layout dump (for debugging and tooling) ───

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub page_width: f64,
    pub page_height: f64,
    pub pages: Vec<PageDump>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDump {
    pub nodes: Vec<NodeDump>,
}

/// One placed node in page coordinates.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub kind: &'static str,
    pub requested: Rect,
    pub actual: Rect,
    pub quality: Quality,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub page_break_before: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<table::TableSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeDump>,
}

impl LayoutDump {
    pub fn from_layout(layout: &SheetLayout) -> Self {
        LayoutDump {
            page_width: layout.page_size.width,
            page_height: layout.page_size.height,
            pages: layout
                .pages
                .iter()
                .map(|p| PageDump {
                    nodes: p
                        .groups
                        .iter()
                        .map(|g| Self::node(g, Point::default()))
                        .collect(),
                })
                .collect(),
        }
    }

    fn node(placed: &Placed, origin: Point) -> NodeDump {
        let offset = placed.offset();
        let inner = Point::new(origin.x + offset.x, origin.y + offset.y);
        let text = match &placed.content {
            Content::Paragraph(p) => Some(
                p.lines
                    .iter()
                    .map(|l| l.fragments.iter().map(|f| f.text.as_str()).collect::<String>())
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            Content::Error(e) => Some(e.to_string()),
            _ => None,
        };
        let table = match &placed.content {
            Content::Table(t) => Some(t.summary()),
            _ => None,
        };
        NodeDump {
            kind: placed.content.kind(),
            requested: placed.requested.move_by(origin.x, origin.y),
            actual: placed.actual.move_by(origin.x, origin.y),
            quality: placed.quality,
            page_break_before: placed.page_break_before,
            text,
            table,
            children: placed
                .children()
                .iter()
                .map(|c| Self::node(c, inner))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_loader::ImageStore;
    use crate::model::SheetSource;

    fn layout(json: &str) -> (SheetLayout, Warnings) {
        let source: SheetSource = serde_json::from_str(json).unwrap();
        let fonts = FontContext::new();
        let mut warnings = Warnings::default();
        let sheet =
            Sheet::from_source(source, &fonts, &mut ImageStore::new(None), &mut warnings).unwrap();
        let mut ctx = LayoutContext::new(&fonts, &sheet.settings);
        let result = layout_sheet(&mut ctx, &sheet);
        warnings.extend(ctx.warnings);
        (result, warnings)
    }

    #[test]
    fn sections_stack_down_the_page() {
        let (result, warnings) = layout(
            r#"{"page": {"Custom": {"width": 300, "height": 400}}, "margin": {"top": 20, "right": 20, "bottom": 20, "left": 20},
                "sections": [
                    {"blocks": [{"content": ["first"]}]},
                    {"blocks": [{"content": ["second"]}]}
                ]}"#,
        );
        assert!(warnings.is_empty());
        assert_eq!(result.pages.len(), 1);
        let groups = &result.pages[0].groups;
        assert_eq!(groups.len(), 2);
        assert!(groups[1].actual.top >= groups[0].actual.bottom + 8.0 - 1e-9);
        assert!(groups[0].actual.top >= 20.0);
    }

    #[test]
    fn page_break_after_starts_a_new_page() {
        let (result, _) = layout(
            r#"{"sections": [
                    {"pageBreakAfter": true, "blocks": [{"content": ["first"]}]},
                    {"blocks": [{"content": ["second"]}]}
                ]}"#,
        );
        assert_eq!(result.pages.len(), 2);
        assert!(result.pages[1].groups[0].page_break_before);
    }

    #[test]
    fn empty_sheet_has_one_blank_page() {
        let (result, _) = layout(r#"{"sections": []}"#);
        assert_eq!(result.pages.len(), 1);
        assert!(result.pages[0].groups.is_empty());
    }

    #[test]
    fn dump_uses_page_coordinates() {
        let (result, _) = layout(r#"{"sections": [{"blocks": [{"content": ["hello"]}]}]}"#);
        let dump = LayoutDump::from_layout(&result);
        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["pages"].as_array().unwrap().len(), 1);
        let mut texts = Vec::new();
        fn collect(n: &NodeDump, out: &mut Vec<(String, Rect)>) {
            if let Some(t) = &n.text {
                out.push((t.clone(), n.actual));
            }
            for c in &n.children {
                collect(c, out);
            }
        }
        for n in &dump.pages[0].nodes {
            collect(n, &mut texts);
        }
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].0, "hello");
        assert!(texts[0].1.left >= 36.0 && texts[0].1.top >= 36.0);
    }

    #[test]
    fn same_sheet_lays_out_identically() {
        let json = r#"{"sections": [{"options": {"columns": 2}, "blocks": [
            {"title": "One", "content": ["alpha beta gamma delta epsilon"]},
            {"content": ["Label | Value", "Other | Thing"]},
            {"content": ["zeta eta theta iota kappa lambda mu"]}
        ]}]}"#;
        let (a, _) = layout(json);
        let (b, _) = layout(json);
        assert_eq!(a.pages, b.pages);
    }
}
