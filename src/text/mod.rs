//! # Text Layout
//!
//! Wraps a [`Run`] into a [`Paragraph`] at a given width and reports how good
//! the wrap was: how many lines ended at whitespace or a newline (ok breaks),
//! how many had to split a word (bad breaks), and how much width the tightest
//! line left unused. The layout search reads those numbers to score
//! candidate column widths.
//!
//! Line breaking is greedy over UAX#14 break opportunities. When a word is
//! longer than the line it is hyphenated with `hypher`, or split at the
//! overflowing character as a last resort.

use std::sync::Arc;

use serde::Serialize;
use unicode_linebreak::{linebreaks, BreakOpportunity};

use crate::font::{FontContext, FontKey};
use crate::model::{ElementKind, Run};
use crate::style::{Align, ResolvedStyle};

/// Inserted between inline elements of different kinds so lines may break
/// around symbol and checkbox glyphs.
pub const THIN_SPACE: char = '\u{2009}';

/// A style and the font it resolves to, shared by the fragments that use it.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub style: Arc<ResolvedStyle>,
    pub font: FontKey,
}

/// A same-styled piece of a line, positioned relative to the line start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fragment {
    pub text: String,
    /// Index into [`Paragraph::segments`].
    pub segment: usize,
    pub x: f64,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub fragments: Vec<Fragment>,
    /// Width of the text, without trailing whitespace.
    pub width: f64,
    /// Offset of the line box from the paragraph top.
    pub top: f64,
    pub height: f64,
    /// Offset of the baseline from the paragraph top.
    pub baseline: f64,
}

/// A wrapped run.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub segments: Vec<Segment>,
    pub lines: Vec<Line>,
    /// The width the run was wrapped to.
    pub width: f64,
    pub height: f64,
    pub ok_breaks: usize,
    pub bad_breaks: usize,
    pub unused_width: f64,
    pub align: Align,
}

impl Paragraph {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Width of the widest line.
    pub fn max_line_width(&self) -> f64 {
        self.lines.iter().map(|l| l.width).fold(0.0, f64::max)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.fragments.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BreakKind {
    Ok,
    Bad,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LineEnd {
    Wrapped(BreakKind),
    Forced,
    Last,
}

#[derive(Debug, Clone, Copy)]
struct Ch {
    ch: char,
    seg: usize,
    width: f64,
}

struct RawLine {
    start: usize,
    end: usize,
    hyphen: bool,
    end_kind: LineEnd,
}

/// Compute UAX#14 break opportunities indexed by char position.
///
/// Each entry is the break opportunity *before* that character. Index 0 is
/// always `None`.
fn compute_break_opportunities(text: &str) -> Vec<Option<BreakOpportunity>> {
    let char_count = text.chars().count();
    let mut result = vec![None; char_count];

    let mut byte_to_char = vec![0usize; text.len() + 1];
    for (char_idx, (byte_idx, _)) in text.char_indices().enumerate() {
        byte_to_char[byte_idx] = char_idx;
    }
    byte_to_char[text.len()] = char_count;

    for (byte_offset, opp) in linebreaks(text) {
        let char_idx = byte_to_char[byte_offset];
        if char_idx < char_count {
            result[char_idx] = Some(opp);
        }
    }
    result
}

fn is_newline(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn starts_with_punctuation(text: &str) -> bool {
    text.chars()
        .next()
        .is_some_and(|c| c.is_ascii_punctuation() || matches!(c, '\u{2019}' | '\u{201D}' | '\u{2026}'))
}

/// Flatten a run into measured characters, one segment per element style.
fn collect_chars(fonts: &FontContext, run: &Run) -> (Vec<Segment>, Vec<Ch>) {
    let mut segments: Vec<Segment> = Vec::new();
    let mut chars: Vec<Ch> = Vec::new();
    let mut prev_kind: Option<ElementKind> = None;

    for el in &run.elements {
        let text = el.display_text();
        let font = el.font_key();
        let size = el.style.font_size;
        let seg = match segments.last() {
            Some(s) if s.font == font && *s.style == *el.style => segments.len() - 1,
            _ => {
                segments.push(Segment {
                    style: el.style.clone(),
                    font: font.clone(),
                });
                segments.len() - 1
            }
        };

        if let (Some(prev), Some(last)) = (prev_kind, chars.last().copied()) {
            let mixed = el.kind != ElementKind::Text || prev != ElementKind::Text;
            let separated = el.kind.is_separator()
                || prev.is_separator()
                || last.ch.is_whitespace()
                || text.starts_with(char::is_whitespace);
            if mixed && !separated && !starts_with_punctuation(&text) {
                let gap_seg = &segments[last.seg];
                let size = gap_seg.style.font_size;
                chars.push(Ch {
                    ch: THIN_SPACE,
                    seg: last.seg,
                    width: fonts.char_width(THIN_SPACE, &gap_seg.font, size),
                });
            }
        }

        for ch in text.chars().filter(|c| *c != '\u{00AD}') {
            chars.push(Ch {
                ch,
                seg,
                width: fonts.char_width(ch, &font, size),
            });
        }
        prev_kind = Some(el.kind);
    }
    (segments, chars)
}

/// Width of a run set on a single line.
pub fn natural_width(fonts: &FontContext, run: &Run) -> f64 {
    let (_, chars) = collect_chars(fonts, run);
    let mut end = chars.len();
    while end > 0 && chars[end - 1].ch.is_whitespace() {
        end -= 1;
    }
    chars[..end]
        .iter()
        .filter(|c| !is_newline(c.ch))
        .map(|c| c.width)
        .sum()
}

fn classify(chars: &[Ch], bp: usize) -> BreakKind {
    let c = chars[bp].ch;
    if c.is_whitespace() {
        return BreakKind::Ok;
    }
    let next_alnum = chars.get(bp + 1).is_some_and(|n| n.ch.is_alphanumeric());
    if c == '-' || (c.is_alphanumeric() && next_alnum) {
        BreakKind::Bad
    } else {
        BreakKind::Ok
    }
}

/// Try to hyphenate the word that overflows at `overflow_at`. Returns the
/// index the next line starts at.
fn try_hyphenate(
    chars: &[Ch],
    line_start: usize,
    overflow_at: usize,
    max_width: f64,
    hyphen_width: f64,
) -> Option<usize> {
    let mut word_start = overflow_at;
    while word_start > line_start && chars[word_start - 1].ch.is_alphabetic() {
        word_start -= 1;
    }
    let mut word_end = overflow_at;
    while word_end < chars.len() && chars[word_end].ch.is_alphabetic() {
        word_end += 1;
    }
    if word_end - word_start < 4 {
        return None;
    }

    let word: String = chars[word_start..word_end]
        .iter()
        .map(|c| c.ch)
        .collect::<String>()
        .to_lowercase();
    if word.chars().count() != word_end - word_start {
        return None;
    }
    let syllables: Vec<&str> = hypher::hyphenate(&word, hypher::Lang::English).collect();
    if syllables.len() < 2 {
        return None;
    }

    let prefix_width: f64 = chars[line_start..word_start].iter().map(|c| c.width).sum();
    let mut best = None;
    let mut offset = word_start;
    let mut part_width = 0.0;
    for syllable in &syllables[..syllables.len() - 1] {
        for _ in syllable.chars() {
            part_width += chars[offset].width;
            offset += 1;
        }
        if offset > overflow_at {
            break;
        }
        if prefix_width + part_width + hyphen_width <= max_width {
            best = Some(offset);
        }
    }
    best.filter(|b| *b > line_start)
}

fn break_lines(fonts: &FontContext, segments: &[Segment], chars: &[Ch], max_width: f64) -> Vec<RawLine> {
    let plain: String = chars.iter().map(|c| c.ch).collect();
    let opps = compute_break_opportunities(&plain);

    let mut lines = Vec::new();
    let mut line_start = 0;
    let mut line_width = 0.0;
    let mut last_break: Option<usize> = None;
    let width_between = |from: usize, to: usize| -> f64 {
        chars[from..to]
            .iter()
            .filter(|c| !is_newline(c.ch))
            .map(|c| c.width)
            .sum()
    };

    for i in 0..chars.len() {
        let c = chars[i];
        if i > 0 {
            match opps[i] {
                Some(BreakOpportunity::Mandatory) => {
                    let end = if is_newline(chars[i - 1].ch) { i - 1 } else { i };
                    lines.push(RawLine {
                        start: line_start,
                        end,
                        hyphen: false,
                        end_kind: LineEnd::Forced,
                    });
                    line_start = i;
                    line_width = 0.0;
                    last_break = None;
                }
                Some(BreakOpportunity::Allowed) => last_break = Some(i - 1),
                None => {}
            }
        }

        if is_newline(c.ch) {
            continue;
        }

        // Each pass moves line_start forward, so this ends once char i fits
        // or starts the line on its own.
        while line_width + c.width > max_width && line_start < i {
            if let Some(bp) = last_break.take().filter(|bp| *bp >= line_start) {
                lines.push(RawLine {
                    start: line_start,
                    end: bp + 1,
                    hyphen: false,
                    end_kind: LineEnd::Wrapped(classify(chars, bp)),
                });
                line_start = bp + 1;
            } else {
                let hyphen_seg = &segments[chars[i - 1].seg];
                let hyphen_width =
                    fonts.char_width('-', &hyphen_seg.font, hyphen_seg.style.font_size);
                match try_hyphenate(chars, line_start, i, max_width, hyphen_width) {
                    Some(at) => {
                        lines.push(RawLine {
                            start: line_start,
                            end: at,
                            hyphen: true,
                            end_kind: LineEnd::Wrapped(BreakKind::Bad),
                        });
                        line_start = at;
                    }
                    None => {
                        lines.push(RawLine {
                            start: line_start,
                            end: i,
                            hyphen: false,
                            end_kind: LineEnd::Wrapped(BreakKind::Bad),
                        });
                        line_start = i;
                    }
                }
            }
            line_width = width_between(line_start, i);
        }

        line_width += c.width;
    }

    if line_start < chars.len() || lines.is_empty() {
        lines.push(RawLine {
            start: line_start,
            end: chars.len(),
            hyphen: false,
            end_kind: LineEnd::Last,
        });
    } else if let Some(last) = lines.last_mut() {
        last.end_kind = LineEnd::Last;
    }
    lines
}

/// Wrap `run` to `width`.
pub fn wrap(fonts: &FontContext, run: &Run, width: f64, align: Align) -> Paragraph {
    let (segments, chars) = collect_chars(fonts, run);
    if chars.is_empty() {
        return Paragraph {
            segments,
            lines: Vec::new(),
            width,
            height: 0.0,
            ok_breaks: 0,
            bad_breaks: 0,
            unused_width: width,
            align,
        };
    }

    let raw = break_lines(fonts, &segments, &chars, width);
    let mut ok_breaks = 0;
    let mut bad_breaks = 0;
    let mut lines = Vec::with_capacity(raw.len());
    let mut top = 0.0;

    for r in &raw {
        match r.end_kind {
            LineEnd::Wrapped(BreakKind::Ok) | LineEnd::Forced => ok_breaks += 1,
            LineEnd::Wrapped(BreakKind::Bad) => bad_breaks += 1,
            LineEnd::Last => {}
        }

        let mut end = r.end;
        while end > r.start && (chars[end - 1].ch.is_whitespace() || is_newline(chars[end - 1].ch)) {
            end -= 1;
        }
        let mut line_chars: Vec<Ch> = chars[r.start..end]
            .iter()
            .filter(|c| !is_newline(c.ch))
            .copied()
            .collect();
        if r.hyphen {
            if let Some(last) = line_chars.last().copied() {
                let seg = &segments[last.seg];
                line_chars.push(Ch {
                    ch: '-',
                    seg: last.seg,
                    width: fonts.char_width('-', &seg.font, seg.style.font_size),
                });
            }
        }

        let line_width: f64 = line_chars.iter().map(|c| c.width).sum();
        let justify = align == Align::Fill && matches!(r.end_kind, LineEnd::Wrapped(_));
        let (x_offset, word_gap) = match align {
            Align::Left => (0.0, 0.0),
            Align::Center => ((width - line_width) / 2.0, 0.0),
            Align::Right => (width - line_width, 0.0),
            Align::Fill if justify => {
                let spaces = line_chars.iter().filter(|c| c.ch == ' ').count();
                if spaces > 0 {
                    (0.0, (width - line_width).max(0.0) / spaces as f64)
                } else {
                    (0.0, 0.0)
                }
            }
            Align::Fill => (0.0, 0.0),
        };

        let size = line_chars
            .iter()
            .map(|c| segments[c.seg].style.font_size)
            .fold(0.0, f64::max);
        let size = if size > 0.0 { size } else { run.max_font_size() };
        let height = size * 1.2;
        let descent_font = line_chars
            .iter()
            .max_by(|a, b| {
                segments[a.seg]
                    .style
                    .font_size
                    .total_cmp(&segments[b.seg].style.font_size)
            })
            .map(|c| segments[c.seg].font.clone())
            .unwrap_or_else(|| run.style.font_key());
        let descent = fonts.descent(&descent_font, size);

        lines.push(Line {
            fragments: build_fragments(&line_chars, x_offset, word_gap),
            width: line_width,
            top,
            height,
            baseline: top + height + descent / 2.0,
        });
        top += height;
    }

    let unused_width = if align == Align::Fill {
        let widest = lines.iter().map(|l| l.width).fold(0.0, f64::max);
        width - widest.ceil()
    } else {
        lines
            .iter()
            .map(|l| width - l.width)
            .fold(f64::INFINITY, f64::min)
    };

    Paragraph {
        segments,
        lines,
        width,
        height: top,
        ok_breaks,
        bad_breaks,
        unused_width,
        align,
    }
}

fn build_fragments(chars: &[Ch], x_offset: f64, word_gap: f64) -> Vec<Fragment> {
    let mut fragments: Vec<Fragment> = Vec::new();
    let mut x = x_offset;
    let mut split_next = false;
    for c in chars {
        let extend = !split_next && fragments.last().is_some_and(|f| f.segment == c.seg);
        match fragments.last_mut() {
            Some(f) if extend => {
                f.text.push(c.ch);
                f.width += c.width;
            }
            _ => fragments.push(Fragment {
                text: c.ch.to_string(),
                segment: c.seg,
                x,
                width: c.width,
            }),
        }
        x += c.width;
        split_next = false;
        if c.ch == ' ' && word_gap > 0.0 {
            x += word_gap;
            split_next = true;
        }
    }
    fragments
}
