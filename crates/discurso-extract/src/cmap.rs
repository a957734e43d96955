//! ToUnicode CMap parsing (`bfchar` and `bfrange` sections).

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Ranges wider than this are ignored as malformed.
const MAX_RANGE: u32 = 0xFFFF;

static HEX_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]*)>").unwrap());
/// `<lo> <hi> [<dst> ...]` or `<lo> <hi> <dst>`.
static HEX_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>\s*(?:\[([^\]]*)\]|<([0-9A-Fa-f]*)>)").unwrap()
});
static HEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<([0-9A-Fa-f]*)>").unwrap());
static CODESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<([0-9A-Fa-f]+)>\s*<[0-9A-Fa-f]+>").unwrap());

/// Character code → Unicode text, plus the code width in bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToUnicode {
    map: HashMap<u32, String>,
    code_bytes: Option<usize>,
}

impl ToUnicode {
    pub fn get(&self, code: u32) -> Option<&str> {
        self.map.get(&code).map(String::as_str)
    }

    /// Byte width declared by `begincodespacerange`, if any.
    pub fn code_bytes(&self) -> Option<usize> {
        self.code_bytes
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Parse a decompressed ToUnicode stream. Unparsable lines are skipped.
pub fn parse_to_unicode(data: &[u8]) -> ToUnicode {
    let content = String::from_utf8_lossy(data);
    let mut cmap = ToUnicode::default();

    for section in sections(&content, "begincodespacerange", "endcodespacerange") {
        if let Some(caps) = CODESPACE.captures(section) {
            cmap.code_bytes = Some(caps[1].len().div_ceil(2).max(1));
        }
    }

    for section in sections(&content, "beginbfchar", "endbfchar") {
        for caps in HEX_PAIR.captures_iter(section) {
            if let Ok(src) = u32::from_str_radix(&caps[1], 16) {
                cmap.map.insert(src, utf16_hex(&caps[2]));
            }
        }
    }

    for section in sections(&content, "beginbfrange", "endbfrange") {
        for caps in HEX_RANGE.captures_iter(section) {
            parse_range(&caps, &mut cmap.map);
        }
    }

    cmap
}

fn parse_range(caps: &Captures<'_>, map: &mut HashMap<u32, String>) {
    let (Some(start), Some(end)) = (hex_u32(&caps[1]), hex_u32(&caps[2])) else {
        return;
    };
    if end < start || end - start > MAX_RANGE {
        return;
    }
    if let Some(array) = caps.get(3) {
        for (offset, dst) in HEX.captures_iter(array.as_str()).enumerate() {
            let code = start + offset as u32;
            if code > end {
                break;
            }
            map.insert(code, utf16_hex(&dst[1]));
        }
    } else if let Some(dst) = caps.get(4) {
        let mut units = utf16_units(dst.as_str());
        if units.is_empty() {
            return;
        }
        let last = units.len() - 1;
        let base = units[last];
        for code in start..=end {
            units[last] = base.wrapping_add((code - start) as u16);
            map.insert(code, String::from_utf16_lossy(&units));
        }
    }
}

fn sections<'a>(content: &'a str, begin: &str, end: &str) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut rest = content;
    while let Some(b) = rest.find(begin) {
        let after = &rest[b + begin.len()..];
        match after.find(end) {
            Some(e) => {
                out.push(&after[..e]);
                rest = &after[e + end.len()..];
            }
            None => break,
        }
    }
    out
}

fn hex_u32(hex: &str) -> Option<u32> {
    u32::from_str_radix(hex, 16).ok()
}

fn utf16_units(hex: &str) -> Vec<u16> {
    // Two-digit destinations are single bytes; widen them to one code unit.
    if hex.len() <= 2 {
        return u16::from_str_radix(hex, 16).map(|u| vec![u]).unwrap_or_default();
    }
    hex.as_bytes()
        .chunks(4)
        .filter_map(|chunk| std::str::from_utf8(chunk).ok())
        .filter_map(|s| u16::from_str_radix(s, 16).ok())
        .collect()
}

/// Destination strings are UTF-16BE, which covers surrogate pairs and ligatures.
fn utf16_hex(hex: &str) -> String {
    String::from_utf16_lossy(&utf16_units(hex))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bfchar() {
        let cmap = parse_to_unicode(b"beginbfchar\n<0041> <0041>\n<00E9> <00E9>\nendbfchar");
        assert_eq!(cmap.get(0x41), Some("A"));
        assert_eq!(cmap.get(0xE9), Some("é"));
        assert_eq!(cmap.len(), 2);
    }

    #[test]
    fn test_bfrange_sequential() {
        let cmap = parse_to_unicode(b"beginbfrange\n<0003> <0005> <0061>\nendbfrange");
        assert_eq!(cmap.get(3), Some("a"));
        assert_eq!(cmap.get(5), Some("c"));
        assert_eq!(cmap.get(6), None);
    }

    #[test]
    fn test_bfrange_array_with_ligature() {
        let cmap = parse_to_unicode(
            b"beginbfrange\n<005F> <0061> [<00660066> <00660069> <00F3>]\nendbfrange",
        );
        assert_eq!(cmap.get(0x5F), Some("ff"));
        assert_eq!(cmap.get(0x60), Some("fi"));
        assert_eq!(cmap.get(0x61), Some("ó"));
    }

    #[test]
    fn test_bfrange_several_ranges_per_line() {
        let cmap = parse_to_unicode(
            b"beginbfrange\n<0001> <0002> <0041> <0003> <0004> <0061>\nendbfrange",
        );
        assert_eq!(cmap.get(2), Some("B"));
        assert_eq!(cmap.get(3), Some("a"));
        assert_eq!(cmap.get(4), Some("b"));

        let mixed = parse_to_unicode(
            b"beginbfrange <0010> <0011> [<00F1> <00E1>] <0020> <0020> <0020> endbfrange",
        );
        assert_eq!(mixed.get(0x11), Some("á"));
        assert_eq!(mixed.get(0x20), Some(" "));
    }

    #[test]
    fn test_surrogate_pair() {
        let cmap = parse_to_unicode(b"beginbfchar\n<0001> <D835DC00>\nendbfchar");
        assert_eq!(cmap.get(1), Some("\u{1D400}"));
    }

    #[test]
    fn test_codespace_width() {
        let two = parse_to_unicode(b"1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange");
        assert_eq!(two.code_bytes(), Some(2));
        let one = parse_to_unicode(b"1 begincodespacerange\n<00> <FF>\nendcodespacerange");
        assert_eq!(one.code_bytes(), Some(1));
        assert_eq!(parse_to_unicode(b"").code_bytes(), None);
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let cmap = parse_to_unicode(b"beginbfrange\n<0010> <0001> <0041>\ngarbage\nendbfrange");
        assert!(cmap.is_empty());
    }
}
