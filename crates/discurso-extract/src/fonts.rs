//! Font decoding: character codes to text, and glyph advance widths.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object};

use crate::cmap::{parse_to_unicode, ToUnicode};
use crate::pdf::{number, resolve};

/// Advance (in 1/1000 em) assumed when a font carries no metrics.
pub const DEFAULT_GLYPH_WIDTH: f32 = 500.0;
/// Default advance for composite fonts without `DW`.
pub const DEFAULT_CID_WIDTH: f32 = 1000.0;

/// A decoded character code.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedChar {
    pub code: u32,
    /// Empty when the code has no known Unicode mapping.
    pub text: String,
    /// Number of bytes the code occupied in the string.
    pub byte_len: usize,
}

/// Everything needed to turn a shown string into positioned characters.
#[derive(Debug, Clone)]
pub struct FontInfo {
    pub base_font: String,
    composite: bool,
    /// Code width fixed by a composite font's `/Encoding` CMap.
    encoding_bytes: Option<usize>,
    to_unicode: Option<ToUnicode>,
    differences: HashMap<u32, char>,
    first_char: u32,
    widths: Vec<f32>,
    missing_width: f32,
    cid_widths: HashMap<u32, f32>,
}

impl Default for FontInfo {
    /// A single-byte WinAnsi font with no metrics.
    fn default() -> Self {
        Self {
            base_font: String::new(),
            composite: false,
            encoding_bytes: None,
            to_unicode: None,
            differences: HashMap::new(),
            first_char: 0,
            widths: Vec::new(),
            missing_width: DEFAULT_GLYPH_WIDTH,
            cid_widths: HashMap::new(),
        }
    }
}

impl FontInfo {
    /// Read a font dictionary. Missing or malformed entries fall back to defaults.
    pub fn from_dict(doc: &Document, dict: &Dictionary) -> Self {
        let mut font = Self::default();
        font.base_font = dict
            .get(b"BaseFont")
            .ok()
            .and_then(|o| resolve(doc, o).as_name().ok())
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .unwrap_or_default();
        font.composite = matches!(
            dict.get(b"Subtype").ok().and_then(|o| o.as_name().ok()),
            Some(b"Type0")
        );

        if let Ok(obj) = dict.get(b"ToUnicode") {
            if let Ok(stream) = resolve(doc, obj).as_stream() {
                let data = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                let cmap = parse_to_unicode(&data);
                if !cmap.is_empty() {
                    font.to_unicode = Some(cmap);
                }
            }
        }

        if font.composite {
            font.encoding_bytes = cmap_encoding_bytes(doc, dict);
            font.read_cid_metrics(doc, dict);
        } else {
            font.read_simple_metrics(doc, dict);
            font.read_differences(doc, dict);
        }
        font
    }

    fn read_simple_metrics(&mut self, doc: &Document, dict: &Dictionary) {
        let widths: Vec<f32> = dict
            .get(b"Widths")
            .ok()
            .and_then(|o| resolve(doc, o).as_array().ok())
            .map(|arr| arr.iter().map(|w| number(resolve(doc, w)).unwrap_or(0.0)).collect())
            .unwrap_or_default();
        if widths.is_empty() {
            return;
        }
        self.first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| number(resolve(doc, o)))
            .map(|v| v as u32)
            .unwrap_or(0);
        self.widths = widths;
        self.missing_width = dict
            .get(b"FontDescriptor")
            .ok()
            .and_then(|o| resolve(doc, o).as_dict().ok())
            .and_then(|d| d.get(b"MissingWidth").ok())
            .and_then(|o| number(resolve(doc, o)))
            .unwrap_or(0.0);
    }

    fn read_differences(&mut self, doc: &Document, dict: &Dictionary) {
        let Some(encoding) = dict
            .get(b"Encoding")
            .ok()
            .and_then(|o| resolve(doc, o).as_dict().ok())
        else {
            return;
        };
        let Some(diffs) = encoding
            .get(b"Differences")
            .ok()
            .and_then(|o| resolve(doc, o).as_array().ok())
        else {
            return;
        };
        let mut code = 0u32;
        for item in diffs {
            match item {
                Object::Name(name) => {
                    if let Some(c) = glyph_name_to_char(&String::from_utf8_lossy(name)) {
                        self.differences.insert(code, c);
                    }
                    code += 1;
                }
                other => {
                    if let Some(n) = number(other) {
                        code = n as u32;
                    }
                }
            }
        }
    }

    fn read_cid_metrics(&mut self, doc: &Document, dict: &Dictionary) {
        let Some(descendant) = dict
            .get(b"DescendantFonts")
            .ok()
            .and_then(|o| resolve(doc, o).as_array().ok())
            .and_then(|arr| arr.first())
            .and_then(|o| resolve(doc, o).as_dict().ok())
        else {
            self.missing_width = DEFAULT_CID_WIDTH;
            return;
        };
        self.missing_width = descendant
            .get(b"DW")
            .ok()
            .and_then(|o| number(resolve(doc, o)))
            .unwrap_or(DEFAULT_CID_WIDTH);
        if let Some(w) = descendant
            .get(b"W")
            .ok()
            .and_then(|o| resolve(doc, o).as_array().ok())
        {
            let items: Vec<&Object> = w.iter().map(|o| resolve(doc, o)).collect();
            self.cid_widths = parse_cid_widths(doc, &items);
        }
    }

    fn code_bytes(&self) -> usize {
        if self.composite {
            self.encoding_bytes
                .or_else(|| self.to_unicode.as_ref().and_then(ToUnicode::code_bytes))
                .unwrap_or(2)
        } else {
            1
        }
    }

    /// Split a shown string into character codes and map them to text.
    pub fn decode(&self, bytes: &[u8]) -> Vec<DecodedChar> {
        let width = self.code_bytes().max(1);
        bytes
            .chunks(width)
            .map(|chunk| {
                let code = chunk.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
                DecodedChar {
                    code,
                    text: self.code_text(code),
                    byte_len: chunk.len(),
                }
            })
            .collect()
    }

    fn code_text(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.as_ref().and_then(|m| m.get(code)) {
            return text.to_string();
        }
        if self.composite {
            return String::new();
        }
        if let Some(c) = self.differences.get(&code) {
            return c.to_string();
        }
        u8::try_from(code)
            .ok()
            .and_then(winansi_char)
            .map(String::from)
            .unwrap_or_default()
    }

    /// Advance width of a code in 1/1000 em.
    pub fn width(&self, code: u32) -> f32 {
        if self.composite {
            return self.cid_widths.get(&code).copied().unwrap_or(self.missing_width);
        }
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .unwrap_or(self.missing_width)
    }

    /// Word spacing only applies to the single-byte space code.
    pub fn is_word_space(&self, ch: &DecodedChar) -> bool {
        ch.byte_len == 1 && ch.code == 32
    }
}

/// Code width of a Type0 font's `/Encoding`: 2 for the predefined Identity
/// and UCS-2/UTF-16 CMaps, or the codespace width of an embedded CMap.
fn cmap_encoding_bytes(doc: &Document, dict: &Dictionary) -> Option<usize> {
    match resolve(doc, dict.get(b"Encoding").ok()?) {
        Object::Name(name) => {
            let name = String::from_utf8_lossy(name);
            let two_byte = name.starts_with("Identity-")
                || name.contains("UCS2")
                || name.contains("UTF16");
            two_byte.then_some(2)
        }
        Object::Stream(stream) => {
            let data = stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone());
            parse_to_unicode(&data).code_bytes()
        }
        _ => None,
    }
}

/// Parse a composite font `W` array: `c [w1 w2 ...]` or `c_first c_last w`.
fn parse_cid_widths(doc: &Document, items: &[&Object]) -> HashMap<u32, f32> {
    let mut widths = HashMap::new();
    let mut i = 0;
    while i < items.len() {
        let Some(first) = number(items[i]) else {
            i += 1;
            continue;
        };
        // Float-to-int `as` saturates, so absurd values clamp to u32::MAX.
        let first = first as u32;
        match items.get(i + 1) {
            Some(Object::Array(list)) => {
                for (offset, w) in list.iter().enumerate() {
                    if let Some(w) = number(resolve(doc, w)) {
                        if let Some(code) = u32::try_from(offset).ok().and_then(|o| first.checked_add(o)) {
                            widths.insert(code, w);
                        }
                    }
                }
                i += 2;
            }
            Some(last) => {
                if let (Some(last), Some(w)) = (number(last), items.get(i + 2).and_then(|o| number(o))) {
                    for code in first..=(last as u32).min(first.saturating_add(0xFFFF)) {
                        widths.insert(code, w);
                    }
                }
                i += 3;
            }
            None => break,
        }
    }
    widths
}

/// WinAnsiEncoding; printable Latin-1 plus the cp1252 block at 0x80–0x9F.
pub fn winansi_char(byte: u8) -> Option<char> {
    let c = match byte {
        0x20..=0x7E | 0xA0..=0xFF => byte as char,
        0x09 | 0x0A | 0x0D => ' ',
        0x80 => '€',
        0x82 => '‚',
        0x83 => 'ƒ',
        0x84 => '„',
        0x85 => '…',
        0x86 => '†',
        0x87 => '‡',
        0x88 => 'ˆ',
        0x89 => '‰',
        0x8A => 'Š',
        0x8B => '‹',
        0x8C => 'Œ',
        0x8E => 'Ž',
        0x91 => '‘',
        0x92 => '’',
        0x93 => '“',
        0x94 => '”',
        0x95 => '•',
        0x96 => '–',
        0x97 => '—',
        0x98 => '˜',
        0x99 => '™',
        0x9A => 'š',
        0x9B => '›',
        0x9C => 'œ',
        0x9E => 'ž',
        0x9F => 'Ÿ',
        _ => return None,
    };
    Some(c)
}

/// Map an Adobe glyph name to its character. Covers `uniXXXX`, `uXXXX`,
/// single-letter names and the punctuation and accented letters found in
/// Spanish-language reports.
pub fn glyph_name_to_char(name: &str) -> Option<char> {
    if let Some(hex) = name.strip_prefix("uni") {
        if let Some(code) = hex.get(..4).filter(|h| h.chars().all(|c| c.is_ascii_hexdigit())) {
            return u32::from_str_radix(code, 16).ok().and_then(char::from_u32);
        }
    }
    if let Some(hex) = name.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
        }
    }
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphabetic() {
            return Some(c);
        }
    }
    let c = match name {
        "space" | "nbspace" => ' ',
        "period" => '.',
        "comma" => ',',
        "colon" => ':',
        "semicolon" => ';',
        "exclam" => '!',
        "exclamdown" => '¡',
        "question" => '?',
        "questiondown" => '¿',
        "hyphen" | "minus" => '-',
        "endash" => '–',
        "emdash" => '—',
        "parenleft" => '(',
        "parenright" => ')',
        "bracketleft" => '[',
        "bracketright" => ']',
        "slash" => '/',
        "percent" => '%',
        "dollar" => '$',
        "ampersand" => '&',
        "quotesingle" => '\'',
        "quotedbl" => '"',
        "quoteleft" => '‘',
        "quoteright" => '’',
        "quotedblleft" => '“',
        "quotedblright" => '”',
        "guillemotleft" => '«',
        "guillemotright" => '»',
        "bullet" => '•',
        "degree" => '°',
        "ordfeminine" => 'ª',
        "ordmasculine" => 'º',
        "zero" => '0',
        "one" => '1',
        "two" => '2',
        "three" => '3',
        "four" => '4',
        "five" => '5',
        "six" => '6',
        "seven" => '7',
        "eight" => '8',
        "nine" => '9',
        "aacute" => 'á',
        "eacute" => 'é',
        "iacute" => 'í',
        "oacute" => 'ó',
        "uacute" => 'ú',
        "ntilde" => 'ñ',
        "udieresis" => 'ü',
        "Aacute" => 'Á',
        "Eacute" => 'É',
        "Iacute" => 'Í',
        "Oacute" => 'Ó',
        "Uacute" => 'Ú',
        "Ntilde" => 'Ñ',
        "Udieresis" => 'Ü',
        _ => return None,
    };
    Some(c)
}
