//! Font metrics and ToUnicode maps needed to place and decode glyphs.

use std::collections::HashMap;

use lazy_static::lazy_static;
use lopdf::{Dictionary, Document, Object};
use regex::Regex;
use tracing::trace;

use super::{number, resolve};

lazy_static! {
    static ref SECTION: Regex =
        Regex::new(r"(?s)begin(bfchar|bfrange)(.*?)endbf(?:char|range)").unwrap();
    static ref BFCHAR: Regex =
        Regex::new(r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>").unwrap();
    static ref BFRANGE: Regex = Regex::new(
        r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>\s*(?:<([0-9A-Fa-f]+)>|\[([^\]]*)\])"
    ).unwrap();
    static ref HEX: Regex = Regex::new(r"<([0-9A-Fa-f]+)>").unwrap();
}

/// Glyph widths in thousandths of text space, plus a code to text map.
#[derive(Debug, Clone)]
pub struct FontInfo {
    /// Composite fonts use two-byte codes.
    pub two_byte: bool,
    pub widths: HashMap<u32, f64>,
    pub default_width: f64,
    pub to_unicode: HashMap<u32, String>,
}

/// One decoded glyph.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGlyph {
    pub text: String,
    /// Advance in thousandths of text space.
    pub width: f64,
    /// Single-byte code 32, which also takes word spacing.
    pub is_space_code: bool,
}

impl Default for FontInfo {
    fn default() -> Self {
        Self {
            two_byte: false,
            widths: HashMap::new(),
            default_width: 500.0,
            to_unicode: HashMap::new(),
        }
    }
}

impl FontInfo {
    /// Read metrics and the ToUnicode map from a font dictionary.
    pub fn load(doc: &Document, font: &Dictionary) -> Self {
        let mut info = FontInfo::default();

        let subtype = font.get(b"Subtype").ok().and_then(|o| o.as_name().ok());
        if subtype == Some(b"Type0".as_slice()) {
            info.two_byte = true;
            info.default_width = 1000.0;

            let descendant = font
                .get(b"DescendantFonts")
                .ok()
                .map(|o| resolve(doc, o))
                .and_then(|o| o.as_array().ok())
                .and_then(|a| a.first())
                .map(|o| resolve(doc, o))
                .and_then(|o| o.as_dict().ok());

            if let Some(cid_font) = descendant {
                if let Some(dw) = cid_font.get(b"DW").ok().and_then(|o| number(resolve(doc, o))) {
                    info.default_width = dw;
                }
                if let Some(w) = cid_font.get(b"W").ok().map(|o| resolve(doc, o)) {
                    info.widths = parse_cid_widths(doc, w);
                }
            }
        } else {
            let first_char = font
                .get(b"FirstChar")
                .ok()
                .and_then(|o| number(resolve(doc, o)))
                .unwrap_or(0.0) as u32;
            if let Some(widths) = font
                .get(b"Widths")
                .ok()
                .map(|o| resolve(doc, o))
                .and_then(|o| o.as_array().ok())
            {
                for (i, w) in widths.iter().enumerate() {
                    if let Some(w) = number(resolve(doc, w)) {
                        info.widths.insert(first_char + i as u32, w);
                    }
                }
            }
            if let Some(missing) = font
                .get(b"FontDescriptor")
                .ok()
                .map(|o| resolve(doc, o))
                .and_then(|o| o.as_dict().ok())
                .and_then(|d| d.get(b"MissingWidth").ok())
                .and_then(|o| number(resolve(doc, o)))
            {
                info.default_width = missing;
            }
        }

        if let Some(Object::Stream(stream)) = font.get(b"ToUnicode").ok().map(|o| resolve(doc, o)) {
            let data = stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone());
            info.to_unicode = parse_to_unicode(&data);
            trace!("ToUnicode map with {} entries", info.to_unicode.len());
        }

        info
    }

    /// Split a shown string into glyphs.
    pub fn decode(&self, bytes: &[u8]) -> Vec<DecodedGlyph> {
        let codes: Vec<u32> = if self.two_byte {
            bytes
                .chunks(2)
                .map(|c| c.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32))
                .collect()
        } else {
            bytes.iter().map(|b| *b as u32).collect()
        };

        codes
            .into_iter()
            .map(|code| {
                let text = match self.to_unicode.get(&code) {
                    Some(text) => text.clone(),
                    None if self.two_byte => char::from_u32(code)
                        .unwrap_or(char::REPLACEMENT_CHARACTER)
                        .to_string(),
                    // Latin-1 for simple fonts without a map
                    None => ((code as u8) as char).to_string(),
                };
                DecodedGlyph {
                    text,
                    width: self.widths.get(&code).copied().unwrap_or(self.default_width),
                    is_space_code: !self.two_byte && code == 32,
                }
            })
            .collect()
    }
}

/// `W` array of a CID font: `c [w1 w2 ...]` or `c_first c_last w`.
fn parse_cid_widths(doc: &Document, w: &Object) -> HashMap<u32, f64> {
    let mut widths = HashMap::new();
    let Ok(items) = w.as_array() else {
        return widths;
    };

    let mut i = 0;
    while i < items.len() {
        let Some(first) = number(resolve(doc, &items[i])) else {
            break;
        };
        match items.get(i + 1).map(|o| resolve(doc, o)) {
            Some(Object::Array(run)) => {
                for (k, w) in run.iter().enumerate() {
                    if let Some(w) = number(resolve(doc, w)) {
                        widths.insert(first as u32 + k as u32, w);
                    }
                }
                i += 2;
            }
            Some(last) => {
                let (Some(last), Some(w)) = (
                    number(last),
                    items.get(i + 2).and_then(|o| number(resolve(doc, o))),
                ) else {
                    break;
                };
                for code in first as u32..=last as u32 {
                    widths.insert(code, w);
                }
                i += 3;
            }
            None => break,
        }
    }

    widths
}

/// Parse the `bfchar` and `bfrange` sections of a ToUnicode CMap.
pub fn parse_to_unicode(data: &[u8]) -> HashMap<u32, String> {
    let content = String::from_utf8_lossy(data);
    let mut map = HashMap::new();

    for section in SECTION.captures_iter(&content) {
        let body = &section[2];
        if &section[1] == "bfchar" {
            for caps in BFCHAR.captures_iter(body) {
                if let (Some(src), Some(dst)) = (parse_code(&caps[1]), utf16_hex(&caps[2])) {
                    map.insert(src, dst);
                }
            }
            continue;
        }

        for caps in BFRANGE.captures_iter(body) {
            let (Some(lo), Some(hi)) = (parse_code(&caps[1]), parse_code(&caps[2])) else {
                continue;
            };
            if let Some(start) = caps.get(3) {
                let Some(base) = parse_code(start.as_str()) else {
                    continue;
                };
                for (offset, code) in (lo..=hi).enumerate() {
                    if let Some(c) = char::from_u32(base + offset as u32) {
                        map.insert(code, c.to_string());
                    }
                }
            } else if let Some(list) = caps.get(4) {
                for (code, dst) in (lo..=hi).zip(HEX.captures_iter(list.as_str())) {
                    if let Some(text) = utf16_hex(&dst[1]) {
                        map.insert(code, text);
                    }
                }
            }
        }
    }

    map
}

fn parse_code(hex: &str) -> Option<u32> {
    u32::from_str_radix(hex, 16).ok()
}

/// Destination strings are UTF-16BE.
fn utf16_hex(hex: &str) -> Option<String> {
    let units: Vec<u16> = hex
        .as_bytes()
        .chunks(4)
        .map(|c| std::str::from_utf8(c).ok().and_then(|s| u16::from_str_radix(s, 16).ok()))
        .collect::<Option<_>>()?;
    let text: String = char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    (!text.is_empty()).then_some(text)
}
