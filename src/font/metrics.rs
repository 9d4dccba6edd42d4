//! Glyph metrics for the standard PDF fonts.
//!
//! Widths come from the Adobe AFM files, in 1/1000 em, for the printable
//! ASCII range. Characters outside that range that WinAnsi can still encode
//! use the font's average width.

use super::StandardFont;

/// AFM widths for U+0020..=U+007E.
type AsciiWidths = [u16; 95];

#[rustfmt::skip]
const HELVETICA: AsciiWidths = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: AsciiWidths = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[rustfmt::skip]
const TIMES_ROMAN: AsciiWidths = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

#[rustfmt::skip]
const TIMES_BOLD: AsciiWidths = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

/// Widths and vertical metrics for one standard font.
#[derive(Debug, Clone, Copy)]
pub struct StandardFontMetrics {
    widths: Option<&'static AsciiWidths>,
    /// Width used for every glyph when `widths` is `None` (Courier, dingbats)
    /// and for glyphs outside the table otherwise.
    default_width: u16,
    pub ascender: i16,
    pub descender: i16,
}

impl StandardFontMetrics {
    pub fn for_font(font: StandardFont) -> Self {
        use StandardFont::*;
        match font {
            Helvetica | HelveticaOblique => Self::table(&HELVETICA, 556, 718, -207),
            HelveticaBold | HelveticaBoldOblique => Self::table(&HELVETICA_BOLD, 556, 718, -207),
            TimesRoman | TimesItalic => Self::table(&TIMES_ROMAN, 500, 683, -217),
            TimesBold | TimesBoldItalic => Self::table(&TIMES_BOLD, 500, 683, -217),
            Courier | CourierBold | CourierOblique | CourierBoldOblique => Self {
                widths: None,
                default_width: 600,
                ascender: 629,
                descender: -157,
            },
            ZapfDingbats => Self {
                widths: None,
                default_width: 788,
                ascender: 820,
                descender: -143,
            },
        }
    }

    fn table(widths: &'static AsciiWidths, default_width: u16, ascender: i16, descender: i16) -> Self {
        Self {
            widths: Some(widths),
            default_width,
            ascender,
            descender,
        }
    }

    /// Advance width of `ch` in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let units = match (self.widths, ch as u32) {
            (Some(table), code @ 0x20..=0x7E) => table[(code - 0x20) as usize],
            // Thin and hair spaces, zero-width marks.
            (_, 0x2009) => 167,
            (_, 0x200A) => 100,
            (_, 0x200B) | (_, 0x00AD) => 0,
            (Some(table), 0x00A0) => table[0],
            _ => self.default_width,
        };
        units as f64 / 1000.0 * font_size
    }

    pub fn measure_string(&self, text: &str, font_size: f64, letter_spacing: f64) -> f64 {
        text.chars()
            .map(|ch| self.char_width(ch, font_size) + letter_spacing)
            .sum()
    }
}

/// Map a Unicode character to its WinAnsiEncoding byte, if it has one.
pub fn winansi_code(ch: char) -> Option<u8> {
    let code = ch as u32;
    match code {
        0x20..=0x7E => Some(code as u8),
        0xA0..=0xFF => Some(code as u8),
        0x20AC => Some(0x80),
        0x201A => Some(0x82),
        0x0192 => Some(0x83),
        0x201E => Some(0x84),
        0x2026 => Some(0x85),
        0x2020 => Some(0x86),
        0x2021 => Some(0x87),
        0x02C6 => Some(0x88),
        0x2030 => Some(0x89),
        0x0160 => Some(0x8A),
        0x2039 => Some(0x8B),
        0x0152 => Some(0x8C),
        0x017D => Some(0x8E),
        0x2018 => Some(0x91),
        0x2019 => Some(0x92),
        0x201C => Some(0x93),
        0x201D => Some(0x94),
        0x2022 => Some(0x95),
        0x2013 => Some(0x96),
        0x2014 => Some(0x97),
        0x02DC => Some(0x98),
        0x2122 => Some(0x99),
        0x0161 => Some(0x9A),
        0x203A => Some(0x9B),
        0x0153 => Some(0x9C),
        0x017E => Some(0x9E),
        0x0178 => Some(0x9F),
        // Spaces the layout inserts; written as a plain space.
        0x2009 | 0x200A => Some(0x20),
        _ => None,
    }
}

/// Map a Unicode character to its ZapfDingbats code, if the font has it.
pub fn dingbat_code(ch: char) -> Option<u8> {
    let code = ch as u32;
    let mapped = match code {
        0x2605 => 0x48,
        0x25CF => 0x6C,
        0x274D => 0x6D,
        0x25A0 => 0x6E,
        0x25B2 => 0x73,
        0x25BC => 0x74,
        0x25C6 => 0x75,
        0x25D7 => 0x77,
        0x2701..=0x275E => code - 0x2700 + 0x20,
        0x2761..=0x2767 => code - 0x2761 + 0xA1,
        0x2776..=0x2794 => code - 0x2776 + 0xB6,
        0x2798..=0x27BE => code - 0x2798 + 0xD8,
        _ => return None,
    };
    u8::try_from(mapped).ok()
}
