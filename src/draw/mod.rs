//! # Drawing
//!
//! The layout engine produces a tree of [`Placed`] nodes; this module walks
//! that tree and issues drawing calls against a [`Canvas`]. The canvas is the
//! only thing that knows about an output format: [`crate::pdf::PdfCanvas`]
//! writes PDF, [`CommandLog`] records the calls for tests and debugging.
//!
//! Canvas coordinates are layout coordinates: points, origin at the top-left
//! of the page, y growing downward. `translate` applies to everything drawn
//! until the matching `restore_state`.

use serde::Serialize;

use crate::error::FolioError;
use crate::geom::{Point, Rect};
use crate::image_loader::ImageRef;
use crate::layout::path::Path;
use crate::layout::placed::{error_style, Content, DrawMethod, Placed};
use crate::layout::table::Table;
use crate::layout::SheetLayout;
use crate::style::ResolvedStyle;
use crate::text::Paragraph;

/// Wrapped text ready to draw.
#[derive(Debug, Clone, Copy)]
pub enum Flowable<'a> {
    Paragraph(&'a Paragraph),
    Table(&'a Table),
}

/// An output surface.
pub trait Canvas {
    fn draw_rect(&mut self, rect: Rect, style: &ResolvedStyle, method: DrawMethod, radius: Option<f64>);

    /// Draw `path` with its origin at `(x, y)`.
    fn draw_path(&mut self, path: &Path, x: f64, y: f64, style: &ResolvedStyle, method: DrawMethod);

    fn draw_image(&mut self, image: &ImageRef, rect: Rect, style: &ResolvedStyle);

    /// Draw wrapped text with its top-left corner at `(left, top)`.
    fn draw_flowable(&mut self, flowable: Flowable<'_>, left: f64, top: f64);

    /// Intersect the clip region with `path` placed at `(x, y)`.
    fn clip_path(&mut self, path: &Path, x: f64, y: f64);

    fn save_state(&mut self);
    fn restore_state(&mut self);
    fn translate(&mut self, dx: f64, dy: f64);

    fn page_break(&mut self);

    /// Called once after the last page.
    fn finish(&mut self) -> Result<(), FolioError>;
}

/// Draw one placed node and everything below it.
pub fn draw_placed(canvas: &mut dyn Canvas, placed: &Placed) {
    let r = placed.actual;
    match &placed.content {
        Content::Group { children, offset } => {
            canvas.save_state();
            if *offset != Point::default() {
                canvas.translate(offset.x, offset.y);
            }
            for child in children {
                draw_placed(canvas, child);
            }
            canvas.restore_state();
        }
        Content::Paragraph(p) => canvas.draw_flowable(Flowable::Paragraph(p), r.left, r.top),
        Content::Table(t) => canvas.draw_flowable(Flowable::Table(t), r.left, r.top),
        Content::Image { image, style } => canvas.draw_image(image, r, style),
        Content::Rect {
            style,
            method,
            radius,
        } => canvas.draw_rect(r, style, *method, *radius),
        Content::Path {
            path,
            style,
            method,
        } => canvas.draw_path(path, r.left, r.top, style, *method),
        Content::Clip(path) => canvas.clip_path(path, r.left, r.top),
        Content::Error(_) => canvas.draw_rect(r, &error_style(), DrawMethod::Fill, None),
    }
}

/// Draw every page of `layout`, the watermark first on each, then finish.
pub fn draw_pages(
    canvas: &mut dyn Canvas,
    layout: &SheetLayout,
    watermark: Option<&ImageRef>,
) -> Result<(), FolioError> {
    let full_page = Rect::from_extent(layout.page_size);
    let plain = ResolvedStyle::default();
    for (i, page) in layout.pages.iter().enumerate() {
        if i > 0 {
            canvas.page_break();
        }
        if let Some(image) = watermark {
            canvas.draw_image(image, full_page, &plain);
        }
        for group in &page.groups {
            draw_placed(canvas, group);
        }
    }
    tracing::debug!(pages = layout.pages.len(), "drew sheet");
    canvas.finish()
}

// ── Recording canvas ───────────────────────────────────────────

/// One recorded call, in page coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Command {
    Rect {
        rect: Rect,
        method: DrawMethod,
        radius: Option<f64>,
    },
    Path {
        bounds: Option<Rect>,
        method: DrawMethod,
    },
    Image {
        rect: Rect,
        uri: Option<String>,
    },
    Text {
        left: f64,
        top: f64,
        lines: Vec<String>,
    },
    Table {
        left: f64,
        top: f64,
        rows: usize,
        columns: usize,
    },
    Clip {
        bounds: Option<Rect>,
    },
    Save,
    Restore,
    PageBreak,
    Finish,
}

/// A canvas that records what it is asked to draw.
///
/// Translations are applied as they are recorded, so every rectangle in the
/// log is in page coordinates.
#[derive(Debug, Default)]
pub struct CommandLog {
    pub commands: Vec<Command>,
    offset: Point,
    saved: Vec<Point>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn shift(&self, r: Rect) -> Rect {
        r.move_by(self.offset.x, self.offset.y)
    }

    /// Commands split at page breaks.
    pub fn pages(&self) -> Vec<&[Command]> {
        self.commands
            .split(|c| *c == Command::PageBreak)
            .collect()
    }

    /// Every text line drawn, with the top-left of its paragraph.
    pub fn texts(&self) -> Vec<(String, Point)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::Text { left, top, lines } => {
                    Some((lines.join("\n"), Point::new(*left, *top)))
                }
                _ => None,
            })
            .collect()
    }
}

fn line_texts(p: &Paragraph) -> Vec<String> {
    p.lines
        .iter()
        .map(|l| l.fragments.iter().map(|f| f.text.as_str()).collect())
        .collect()
}

impl Canvas for CommandLog {
    fn draw_rect(&mut self, rect: Rect, _style: &ResolvedStyle, method: DrawMethod, radius: Option<f64>) {
        self.commands.push(Command::Rect {
            rect: self.shift(rect),
            method,
            radius,
        });
    }

    fn draw_path(&mut self, path: &Path, x: f64, y: f64, _style: &ResolvedStyle, method: DrawMethod) {
        let bounds = path
            .bounds()
            .map(|b| b.move_by(x + self.offset.x, y + self.offset.y));
        self.commands.push(Command::Path { bounds, method });
    }

    fn draw_image(&mut self, image: &ImageRef, rect: Rect, _style: &ResolvedStyle) {
        self.commands.push(Command::Image {
            rect: self.shift(rect),
            uri: image.uri().map(str::to_string),
        });
    }

    fn draw_flowable(&mut self, flowable: Flowable<'_>, left: f64, top: f64) {
        let (left, top) = (left + self.offset.x, top + self.offset.y);
        match flowable {
            Flowable::Paragraph(p) => self.commands.push(Command::Text {
                left,
                top,
                lines: line_texts(p),
            }),
            Flowable::Table(t) => {
                self.commands.push(Command::Table {
                    left,
                    top,
                    rows: t.rows.len(),
                    columns: t.column_count(),
                });
                for row in &t.rows {
                    for cell in &row.cells {
                        if let Some(p) = &cell.paragraph {
                            self.commands.push(Command::Text {
                                left: left + cell.left,
                                top: top + row.top,
                                lines: line_texts(p),
                            });
                        }
                    }
                }
            }
        }
    }

    fn clip_path(&mut self, path: &Path, x: f64, y: f64) {
        let bounds = path
            .bounds()
            .map(|b| b.move_by(x + self.offset.x, y + self.offset.y));
        self.commands.push(Command::Clip { bounds });
    }

    fn save_state(&mut self) {
        self.saved.push(self.offset);
        self.commands.push(Command::Save);
    }

    fn restore_state(&mut self) {
        if let Some(offset) = self.saved.pop() {
            self.offset = offset;
        }
        self.commands.push(Command::Restore);
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.offset.x += dx;
        self.offset.y += dy;
    }

    fn page_break(&mut self) {
        self.offset = Point::default();
        self.saved.clear();
        self.commands.push(Command::PageBreak);
    }

    fn finish(&mut self) -> Result<(), FolioError> {
        self.commands.push(Command::Finish);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::LayoutError;
    use crate::font::FontContext;
    use crate::geom::{Extent, Margins};
    use crate::layout::Page;
    use crate::model::Run;
    use crate::style::Align;
    use crate::text::wrap;

    fn style() -> Arc<ResolvedStyle> {
        Arc::new(ResolvedStyle::default())
    }

    #[test]
    fn groups_translate_their_children() {
        let fonts = FontContext::new();
        let p = wrap(&fonts, &Run::text("moved", style()), 100.0, Align::Left);
        let group = Placed::group(
            Rect::new(0.0, 0.0, 100.0, 100.0),
            vec![Placed::paragraph(p, Rect::new(10.0, 10.0, 100.0, 20.0))],
        )
        .moved(5.0, 50.0);

        let mut log = CommandLog::new();
        draw_placed(&mut log, &group);
        assert_eq!(log.texts(), vec![("moved".to_string(), Point::new(15.0, 60.0))]);
        assert_eq!(log.commands.first(), Some(&Command::Save));
        assert_eq!(log.commands.last(), Some(&Command::Restore));
    }

    #[test]
    fn errors_draw_as_filled_rects() {
        let err = Placed::error(
            Rect::new(0.0, 0.0, 50.0, 100.0),
            LayoutError::TooSmall {
                needed: 60.0,
                available: 50.0,
            },
            1e9,
        );
        let mut log = CommandLog::new();
        draw_placed(&mut log, &err);
        assert_eq!(
            log.commands,
            vec![Command::Rect {
                rect: Rect::new(0.0, 0.0, 50.0, 24.0),
                method: DrawMethod::Fill,
                radius: None,
            }]
        );
    }

    #[test]
    fn watermark_comes_first_on_every_page() {
        let rect = Placed::rect(Rect::new(0.0, 0.0, 10.0, 10.0), style(), DrawMethod::Fill, None);
        let layout = SheetLayout {
            page_size: Extent::new(200.0, 300.0),
            margin: Margins::uniform(10.0),
            pages: vec![
                Page {
                    groups: vec![rect.clone()],
                },
                Page { groups: vec![rect] },
            ],
        };
        let mark = ImageRef::Missing {
            uri: "mark.png".into(),
        };
        let mut log = CommandLog::new();
        draw_pages(&mut log, &layout, Some(&mark)).unwrap();

        let pages = log.pages();
        assert_eq!(pages.len(), 2);
        for page in pages {
            assert!(matches!(
                &page[0],
                Command::Image { rect, .. } if *rect == Rect::new(0.0, 0.0, 200.0, 300.0)
            ));
        }
        assert_eq!(log.commands.last(), Some(&Command::Finish));
    }
}
