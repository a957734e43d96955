//! Content-stream interpreter producing positioned glyphs.
//!
//! Implements the subset of the PDF text-rendering model needed to place
//! characters on the page:
//!
//! | Operator | Action |
//! |----------|--------|
//! | `q` `Q` `cm` | Save / restore the graphics state, concatenate the CTM |
//! | `BT` | Reset text and line matrices |
//! | `Tf` | Select font and size |
//! | `Tm` `Td` `TD` `T*` | Position |
//! | `TL` `Tc` `Tw` `Tz` `Ts` | Leading, spacing, scaling, rise |
//! | `Tj` `TJ` `'` `"` | Show text |
//! | `Do` | Run a Form XObject under its `/Matrix` |
//!
//! Inline images (`BI … ID … EI`) are cut out of the raw stream before it is
//! tokenized, since their binary payload is not valid content syntax.

use std::borrow::Cow;
use std::collections::HashMap;
use std::rc::Rc;

use lopdf::content::{Content, Operation};
use lopdf::Object;

use crate::fonts::FontInfo;
use crate::layout::Glyph;
use crate::pdf::number;

pub type Matrix = [f32; 6];

pub const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Glyph box height above the baseline, as a fraction of the font size.
const ASCENT: f32 = 0.8;
/// Glyph box depth below the baseline, as a fraction of the font size.
const DESCENT: f32 = 0.2;
/// Forms nested deeper than this are skipped; also stops self-referencing forms.
pub const MAX_FORM_DEPTH: usize = 8;

fn multiply(m1: &Matrix, m2: &Matrix) -> Matrix {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

pub(crate) fn matrix_from(operands: &[Object]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let mut m = IDENTITY;
    for (slot, op) in m.iter_mut().zip(operands) {
        *slot = number(op)?;
    }
    Some(m)
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0c' | b'\0')
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

/// True when `data[at..]` starts with the operator `token` standing alone.
fn is_token_at(data: &[u8], at: usize, token: &[u8]) -> bool {
    if !data[at..].starts_with(token) {
        return false;
    }
    let before = at == 0 || is_whitespace(data[at - 1]) || matches!(data[at - 1], b')' | b'>' | b']');
    let after = data
        .get(at + token.len())
        .map_or(true, |&b| is_whitespace(b) || is_delimiter(b));
    before && after
}

/// Replace every inline image, `BI` through `EI`, with a single space.
///
/// String literals and comments are copied untouched so a `BI` inside them
/// is not mistaken for an operator. An image with no closing `EI` drops the
/// rest of the stream.
pub fn strip_inline_images(data: &[u8]) -> Cow<'_, [u8]> {
    if !data.windows(2).any(|w| w == b"BI") {
        return Cow::Borrowed(data);
    }
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        match data[i] {
            b'(' => {
                let start = i;
                let mut depth = 0usize;
                while i < data.len() {
                    match data[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                i += 1;
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                out.extend_from_slice(&data[start..i.min(data.len())]);
            }
            b'%' => {
                let start = i;
                while i < data.len() && !matches!(data[i], b'\n' | b'\r') {
                    i += 1;
                }
                out.extend_from_slice(&data[start..i]);
            }
            b'B' if is_token_at(data, i, b"BI") => {
                let Some(id) = (i + 2..data.len()).find(|&j| is_token_at(data, j, b"ID")) else {
                    break;
                };
                // One whitespace byte separates `ID` from the image data.
                let payload = id + 3;
                let end = (payload..data.len().saturating_sub(1)).find(|&j| {
                    is_whitespace(data[j - 1])
                        && data[j..].starts_with(b"EI")
                        && data.get(j + 2).map_or(true, |&b| is_whitespace(b) || is_delimiter(b))
                });
                let Some(end) = end else {
                    break;
                };
                out.push(b' ');
                i = end + 2;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    Cow::Owned(out)
}

/// Tokenize a raw content stream into operations.
pub fn decode_operations(data: &[u8]) -> lopdf::Result<Vec<Operation>> {
    Ok(Content::decode(&strip_inline_images(data))?.operations)
}

/// Placement of the page in user space: the visible box's left and top edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    pub left: f32,
    pub top: f32,
}

/// A Form XObject ready to be run.
pub struct Form<'s> {
    pub matrix: Matrix,
    pub operations: Vec<Operation>,
    /// The form's own resources; `None` uses the invoking stream's.
    pub resources: Option<Box<dyn ResourceScope + 's>>,
}

/// Named resources visible to a content stream.
pub trait ResourceScope {
    fn font(&self, name: &[u8]) -> Option<Rc<FontInfo>>;

    /// The named XObject, if it is a form. Images and unknown names give `None`.
    fn form(&self, _name: &[u8]) -> Option<Form<'_>> {
        None
    }
}

impl ResourceScope for HashMap<Vec<u8>, Rc<FontInfo>> {
    fn font(&self, name: &[u8]) -> Option<Rc<FontInfo>> {
        self.get(name).cloned()
    }
}

/// The part of the graphics state saved by `q` and restored by `Q`.
#[derive(Clone)]
struct GraphicsState {
    ctm: Matrix,
    font: Option<Rc<FontInfo>>,
    font_size: f32,
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    rise: f32,
    leading: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY,
            font: None,
            font_size: 0.0,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            rise: 0.0,
            leading: 0.0,
        }
    }
}

/// Walks one page's operations and records a glyph for every shown character.
pub struct Interpreter {
    fallback: FontInfo,
    frame: PageFrame,
    gs: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    glyphs: Vec<Glyph>,
}

impl Interpreter {
    pub fn new(frame: PageFrame) -> Self {
        Self {
            fallback: FontInfo::default(),
            frame,
            gs: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            glyphs: Vec::new(),
        }
    }

    pub fn run(mut self, resources: &dyn ResourceScope, operations: &[Operation]) -> Vec<Glyph> {
        self.run_stream(resources, operations, 0);
        self.glyphs
    }

    fn run_stream(&mut self, resources: &dyn ResourceScope, operations: &[Operation], depth: usize) {
        for op in operations {
            self.apply(resources, op, depth);
        }
    }

    fn translate_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn advance(&mut self, tx: f32) {
        self.text_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, tx, 0.0], &self.text_matrix);
    }

    fn apply(&mut self, resources: &dyn ResourceScope, op: &Operation, depth: usize) {
        let operands = op.operands.as_slice();
        let num = |i: usize| operands.get(i).and_then(number);
        match op.operator.as_str() {
            "q" => self.stack.push(self.gs.clone()),
            "Q" => {
                if let Some(gs) = self.stack.pop() {
                    self.gs = gs;
                }
            }
            "cm" => {
                if let Some(m) = matrix_from(operands) {
                    self.gs.ctm = multiply(&m, &self.gs.ctm);
                }
            }
            "Do" => {
                if let Some(Object::Name(name)) = operands.first() {
                    self.run_form(resources, name, depth);
                }
            }
            "BT" => {
                self.text_matrix = IDENTITY;
                self.line_matrix = IDENTITY;
            }
            "Tf" => {
                if let Some(Object::Name(key)) = operands.first() {
                    self.gs.font = resources.font(key);
                }
                if let Some(size) = num(1) {
                    self.gs.font_size = size;
                }
            }
            "Tm" => {
                if let Some(m) = matrix_from(operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    self.translate_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    self.gs.leading = -ty;
                    self.translate_line(tx, ty);
                }
            }
            "T*" => self.translate_line(0.0, -self.gs.leading),
            "TL" => {
                if let Some(v) = num(0) {
                    self.gs.leading = v;
                }
            }
            "Tc" => {
                if let Some(v) = num(0) {
                    self.gs.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = num(0) {
                    self.gs.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = num(0) {
                    self.gs.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = num(0) {
                    self.gs.rise = v;
                }
            }
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "'" => {
                self.translate_line(0.0, -self.gs.leading);
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "\"" => {
                if let (Some(aw), Some(ac)) = (num(0), num(1)) {
                    self.gs.word_spacing = aw;
                    self.gs.char_spacing = ac;
                }
                self.translate_line(0.0, -self.gs.leading);
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    self.show(bytes);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => self.show(bytes),
                            other => {
                                if let Some(adj) = number(other) {
                                    let tx = -adj / 1000.0 * self.gs.font_size * self.gs.horiz_scale;
                                    self.advance(tx);
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// `Do` on a form: run its operations inside an implicit `q … Q`, with
    /// the form matrix prepended to the CTM.
    fn run_form(&mut self, resources: &dyn ResourceScope, name: &[u8], depth: usize) {
        if depth >= MAX_FORM_DEPTH {
            return;
        }
        let Some(form) = resources.form(name) else {
            return;
        };
        let saved = self.gs.clone();
        let stack_len = self.stack.len();
        let (text_matrix, line_matrix) = (self.text_matrix, self.line_matrix);

        self.gs.ctm = multiply(&form.matrix, &self.gs.ctm);
        let scope: &dyn ResourceScope = match &form.resources {
            Some(own) => own.as_ref(),
            None => resources,
        };
        self.run_stream(scope, &form.operations, depth + 1);

        self.stack.truncate(stack_len);
        self.gs = saved;
        self.text_matrix = text_matrix;
        self.line_matrix = line_matrix;
    }

    fn show(&mut self, bytes: &[u8]) {
        let font = self.gs.font.clone();
        let font = font.as_deref().unwrap_or(&self.fallback);
        for ch in font.decode(bytes) {
            let w0 = font.width(ch.code) / 1000.0;
            let render = multiply(
                &[
                    self.gs.font_size * self.gs.horiz_scale,
                    0.0,
                    0.0,
                    self.gs.font_size,
                    0.0,
                    self.gs.rise,
                ],
                &multiply(&self.text_matrix, &self.gs.ctm),
            );
            let size = (render[2].powi(2) + render[3].powi(2)).sqrt();
            let x_start = render[4];
            let x_end = render[4] + w0 * render[0];
            let baseline = render[5];

            if !ch.text.is_empty() {
                self.glyphs.push(Glyph::new(
                    ch.text.clone(),
                    x_start - self.frame.left,
                    x_end - self.frame.left,
                    self.frame.top - (baseline + size * ASCENT),
                    self.frame.top - (baseline - size * DESCENT),
                ));
            }

            let mut tx = w0 * self.gs.font_size + self.gs.char_spacing;
            if font.is_word_space(&ch) {
                tx += self.gs.word_spacing;
            }
            let tx = tx * self.gs.horiz_scale;
            self.text_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, tx, 0.0], &self.text_matrix);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Document, StringFormat};

    type Fonts = HashMap<Vec<u8>, Rc<FontInfo>>;

    /// Fonts plus named forms, each form optionally carrying its own fonts.
    #[derive(Default)]
    struct Scope {
        fonts: Fonts,
        forms: HashMap<Vec<u8>, (Matrix, Vec<Operation>, Option<Fonts>)>,
    }

    impl ResourceScope for Scope {
        fn font(&self, name: &[u8]) -> Option<Rc<FontInfo>> {
            self.fonts.font(name)
        }

        fn form(&self, name: &[u8]) -> Option<Form<'_>> {
            let (matrix, operations, own) = self.forms.get(name)?;
            Some(Form {
                matrix: *matrix,
                operations: operations.clone(),
                resources: own
                    .clone()
                    .map(|fonts| Box::new(fonts) as Box<dyn ResourceScope>),
            })
        }
    }

    /// A simple font whose capital letters are all one em wide.
    fn wide_font() -> Rc<FontInfo> {
        let doc = Document::with_version("1.5");
        let dict = dictionary! {
            "Subtype" => "Type1",
            "FirstChar" => 65,
            "Widths" => vec![Object::Integer(1000); 26],
        };
        Rc::new(FontInfo::from_dict(&doc, &dict))
    }

    fn name(s: &str) -> Object {
        Object::Name(s.as_bytes().to_vec())
    }

    fn op(name: &str, operands: Vec<Object>) -> Operation {
        Operation::new(name, operands)
    }

    fn text(s: &str) -> Object {
        Object::String(s.as_bytes().to_vec(), StringFormat::Literal)
    }

    const FRAME: PageFrame = PageFrame { left: 0.0, top: 800.0 };

    #[test]
    fn test_td_positions_glyphs() {
        let fonts = Fonts::new();
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), 10.into()]),
            op("Td", vec![100.into(), 700.into()]),
            op("Tj", vec![text("AB")]),
            op("ET", vec![]),
        ];
        let glyphs = Interpreter::new(FRAME).run(&fonts, &ops);
        assert_eq!(glyphs.len(), 2);
        assert_eq!(glyphs[0].text, "A");
        assert!((glyphs[0].x0 - 100.0).abs() < 1e-3);
        assert!((glyphs[0].x1 - 105.0).abs() < 1e-3);
        assert!((glyphs[1].x0 - 105.0).abs() < 1e-3);
        assert!((glyphs[0].top - 92.0).abs() < 1e-3);
        assert!((glyphs[0].bottom - 102.0).abs() < 1e-3);
    }

    #[test]
    fn test_ctm_scales_and_translates() {
        let fonts = Fonts::new();
        let ops = vec![
            op("q", vec![]),
            op("cm", vec![2.into(), 0.into(), 0.into(), 2.into(), 50.into(), 0.into()]),
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), 10.into()]),
            op("Tm", vec![1.into(), 0.into(), 0.into(), 1.into(), 10.into(), 100.into()]),
            op("Tj", vec![text("A")]),
            op("ET", vec![]),
            op("Q", vec![]),
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), 10.into()]),
            op("Td", vec![10.into(), 100.into()]),
            op("Tj", vec![text("B")]),
            op("ET", vec![]),
        ];
        let glyphs = Interpreter::new(FRAME).run(&fonts, &ops);
        assert!((glyphs[0].x0 - 70.0).abs() < 1e-3);
        assert!((glyphs[0].x1 - 80.0).abs() < 1e-3);
        assert!((glyphs[1].x0 - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_tj_kerning_and_next_line() {
        let fonts = Fonts::new();
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), 10.into()]),
            op("TL", vec![12.into()]),
            op("Td", vec![0.into(), 700.into()]),
            op(
                "TJ",
                vec![Object::Array(vec![text("A"), (-1000).into(), text("B")])],
            ),
            op("'", vec![text("C")]),
            op("ET", vec![]),
        ];
        let glyphs = Interpreter::new(FRAME).run(&fonts, &ops);
        assert_eq!(glyphs.len(), 3);
        // A at 0..5, kerning moves 10pt right
        assert!((glyphs[1].x0 - 15.0).abs() < 1e-3);
        assert!((glyphs[2].x0 - 0.0).abs() < 1e-3);
        assert!((glyphs[2].top - glyphs[0].top - 12.0).abs() < 1e-3);
    }

    #[test]
    fn test_restore_brings_back_text_state() {
        let mut fonts = Fonts::new();
        fonts.insert(b"F2".to_vec(), wide_font());
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![name("F1"), 10.into()]),
            op("Td", vec![0.into(), 700.into()]),
            op("q", vec![]),
            op("Tf", vec![name("F2"), 20.into()]),
            op("Tc", vec![5.into()]),
            op("Q", vec![]),
            op("Tj", vec![text("AB")]),
            op("ET", vec![]),
        ];
        let glyphs = Interpreter::new(FRAME).run(&fonts, &ops);
        assert_eq!(glyphs.len(), 2);
        assert!((glyphs[0].x1 - 5.0).abs() < 1e-3);
        assert!((glyphs[1].x0 - 5.0).abs() < 1e-3);
        assert!((glyphs[0].bottom - glyphs[0].top - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_form_xobject_runs_with_own_fonts_and_matrix() {
        let mut own = Fonts::new();
        own.insert(b"F9".to_vec(), wide_font());
        let form_ops = vec![
            op("BT", vec![]),
            op("Tf", vec![name("F9"), 10.into()]),
            op("Td", vec![0.into(), 650.into()]),
            op("Tj", vec![text("PIB")]),
            op("ET", vec![]),
        ];
        let mut scope = Scope::default();
        scope
            .forms
            .insert(b"Fm1".to_vec(), ([1.0, 0.0, 0.0, 1.0, 0.0, 50.0], form_ops, Some(own)));

        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![name("F1"), 10.into()]),
            op("ET", vec![]),
            op("q", vec![]),
            op("cm", vec![1.into(), 0.into(), 0.into(), 1.into(), 100.into(), 0.into()]),
            op("Do", vec![name("Fm1")]),
            op("Q", vec![]),
            op("BT", vec![]),
            op("Td", vec![0.into(), 600.into()]),
            op("Tj", vec![text("C")]),
            op("ET", vec![]),
        ];
        let glyphs = Interpreter::new(FRAME).run(&scope, &ops);
        let text: String = glyphs.iter().map(|g| g.text.as_str()).collect();
        assert_eq!(text, "PIBC");
        assert!((glyphs[0].x0 - 100.0).abs() < 1e-3);
        assert!((glyphs[1].x0 - 110.0).abs() < 1e-3);
        assert!((glyphs[0].top - 92.0).abs() < 1e-3);
        // The form's font and size do not leak out of `Do`.
        assert!((glyphs[3].x0 - 0.0).abs() < 1e-3);
        assert!((glyphs[3].x1 - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_unknown_xobject_and_recursive_form() {
        let fonts = Fonts::new();
        let ops = vec![op("Do", vec![name("Im0")])];
        assert!(Interpreter::new(FRAME).run(&fonts, &ops).is_empty());

        let looping = vec![
            op("BT", vec![]),
            op("Td", vec![0.into(), 700.into()]),
            op("Tj", vec![text("x")]),
            op("ET", vec![]),
            op("Do", vec![name("Fm1")]),
        ];
        let mut scope = Scope::default();
        scope.forms.insert(b"Fm1".to_vec(), (IDENTITY, looping, None));
        let glyphs = Interpreter::new(FRAME).run(&scope, &[op("Do", vec![name("Fm1")])]);
        assert_eq!(glyphs.len(), MAX_FORM_DEPTH);
    }

    const WITH_IMAGE: &[u8] = b"BT /F1 10 Tf 72 700 Td (Hola) Tj ET q 1 0 0 1 0 0 cm \
        BI /W 1 /H 1 /BPC 8 /CS /G ID \x00 EI Q BT /F1 10 Tf 72 680 Td (Adios) Tj ET";

    #[test]
    fn test_text_after_inline_image_is_kept() {
        let operations = decode_operations(WITH_IMAGE).unwrap();
        let names: Vec<&str> = operations.iter().map(|o| o.operator.as_str()).collect();
        assert_eq!(
            names,
            ["BT", "Tf", "Td", "Tj", "ET", "q", "cm", "Q", "BT", "Tf", "Td", "Tj", "ET"]
        );
        let glyphs = Interpreter::new(FRAME).run(&Fonts::new(), &operations);
        let text: String = glyphs.iter().map(|g| g.text.as_str()).collect();
        assert_eq!(text, "HolaAdios");
    }

    #[test]
    fn test_strip_inline_images() {
        assert_eq!(&*strip_inline_images(b"q BI /W 2 ID aEIb EI Q"), b"q   Q");
        assert_eq!(&*strip_inline_images(b"BT ET BI /W 1 ID abc"), b"BT ET ");
        let quoted: &[u8] = b"BT (BI ID \\) EI) Tj ET % BI\nQ";
        assert_eq!(&*strip_inline_images(quoted), quoted);
        assert!(matches!(strip_inline_images(b"BT ET"), Cow::Borrowed(_)));
    }
}
