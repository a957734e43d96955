//! Positioned glyphs and the assembly of region text.
//!
//! Coordinates are in PDF points with the origin at the top-left corner of
//! the page's visible box (CropBox within MediaBox), `top` growing downwards.

use std::cmp::Ordering;

/// Glyphs whose tops differ by at most this much share a line.
pub const Y_TOLERANCE: f32 = 3.0;
/// A horizontal gap wider than this between glyphs becomes a space.
pub const X_TOLERANCE: f32 = 3.0;

/// One decoded character (or ligature) with its bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub text: String,
    pub x0: f32,
    pub x1: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Glyph {
    pub fn new(text: impl Into<String>, x0: f32, x1: f32, top: f32, bottom: f32) -> Self {
        Self {
            text: text.into(),
            x0: x0.min(x1),
            x1: x0.max(x1),
            top: top.min(bottom),
            bottom: top.max(bottom),
        }
    }

    fn is_blank(&self) -> bool {
        self.text.chars().all(char::is_whitespace)
    }
}

/// Axis-aligned rectangle in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x0: f32,
    pub top: f32,
    pub x1: f32,
    pub bottom: f32,
}

impl Region {
    /// True when the glyph's box lies entirely inside the region.
    pub fn contains(&self, glyph: &Glyph) -> bool {
        glyph.x0 >= self.x0 && glyph.x1 <= self.x1 && glyph.top >= self.top && glyph.bottom <= self.bottom
    }
}

/// Every glyph found on one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub glyphs: Vec<Glyph>,
}

impl PageLayout {
    pub fn new(width: f32, height: f32, glyphs: Vec<Glyph>) -> Self {
        Self {
            width,
            height,
            glyphs,
        }
    }

    pub fn bounds(&self) -> Region {
        Region {
            x0: 0.0,
            top: 0.0,
            x1: self.width,
            bottom: self.height,
        }
    }

    /// Left and right halves, split at the horizontal midpoint.
    pub fn halves(&self) -> (Region, Region) {
        let mid = self.width / 2.0;
        (
            Region {
                x0: 0.0,
                top: 0.0,
                x1: mid,
                bottom: self.height,
            },
            Region {
                x0: mid,
                top: 0.0,
                x1: self.width,
                bottom: self.height,
            },
        )
    }

    /// Text of the whole page.
    pub fn text(&self) -> String {
        assemble_text(self.glyphs.iter())
    }

    /// Text of the glyphs that fall wholly inside `region`.
    pub fn text_within(&self, region: &Region) -> String {
        assemble_text(self.glyphs.iter().filter(|g| region.contains(g)))
    }
}

/// Group glyphs into lines top to bottom, order each line left to right and
/// join lines with `\n`.
pub fn assemble_text<'a>(glyphs: impl Iterator<Item = &'a Glyph>) -> String {
    let mut sorted: Vec<&Glyph> = glyphs.collect();
    sorted.sort_by(|a, b| a.top.total_cmp(&b.top));

    let mut lines: Vec<Vec<&Glyph>> = Vec::new();
    let mut last_top: Option<f32> = None;
    for glyph in sorted {
        match last_top {
            Some(top) if glyph.top - top <= Y_TOLERANCE => {
                if let Some(line) = lines.last_mut() {
                    line.push(glyph);
                }
            }
            _ => lines.push(vec![glyph]),
        }
        last_top = Some(glyph.top);
    }

    lines
        .into_iter()
        .map(line_text)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn line_text(mut line: Vec<&Glyph>) -> String {
    line.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal));

    let mut out = String::new();
    let mut prev_x1: Option<f32> = None;
    for glyph in line {
        if glyph.is_blank() {
            if !out.is_empty() && !out.ends_with(' ') {
                out.push(' ');
            }
        } else {
            if let Some(px) = prev_x1 {
                if glyph.x0 - px > X_TOLERANCE && !out.ends_with(' ') {
                    out.push(' ');
                }
            }
            out.push_str(&glyph.text);
        }
        prev_x1 = Some(glyph.x1);
    }
    out.trim_end().to_string()
}
