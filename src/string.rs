//! String escaping, templating and conversion helpers.
//!
//! Every function is total: malformed input is passed through instead of
//! producing an error. [`format_rgb_to_hex`] is the one place where the
//! caller has to look at the result, see [`RgbToHex`].

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value as JsonValue;

/// Offset between a full-width form and its ASCII counterpart.
const FULLWIDTH_OFFSET: u32 = 65248;
const IDEOGRAPHIC_SPACE: char = '\u{3000}';

lazy_static! {
    static ref HTML_ENTITY: Regex = Regex::new(r"&(amp|lt|gt|quot|#39);").unwrap();
    static ref PLACEHOLDER: Regex = Regex::new(r"\{\{\s*([^{}\s]+)\s*\}\}").unwrap();
    static ref SEPARATOR: Regex = Regex::new(r"[-_](.)").unwrap();
    static ref RGB: Regex = Regex::new(
        r"(?i)^rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*(?:,\s*(\d*\.?\d+)\s*)?\)$"
    ).unwrap();
    static ref HEX: Regex = Regex::new(r"^#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap();
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape_html`]. Single pass, so `&amp;lt;` becomes `&lt;`.
pub fn unescape_html(s: &str) -> String {
    HTML_ENTITY
        .replace_all(s, |caps: &Captures| match &caps[1] {
            "amp" => "&",
            "lt" => "<",
            "gt" => ">",
            "quot" => "\"",
            _ => "'",
        })
        .into_owned()
}

/// Backslash-escapes regex metacharacters so `s` matches literally.
pub fn escape_regexp(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(
            c,
            '-' | '[' | ']' | '/' | '{' | '}' | '(' | ')'
                | '*' | '+' | '?' | '.' | '\\' | '^' | '$' | '|'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape notation used by [`escape_js`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JsEscape {
    /// `\xHH`
    #[default]
    Hex,
    /// `\OOO`
    Octal,
}

/// Escapes every code point up to 255 for embedding inside a JS string
/// literal. Wider characters pass through.
pub fn escape_js(s: &str, base: JsEscape) -> String {
    let mut out = String::with_capacity(s.len() * 4);
    for c in s.chars() {
        let code = c as u32;
        if code > 255 {
            out.push(c);
            continue;
        }
        match base {
            JsEscape::Hex => out.push_str(&format!("\\x{code:02x}")),
            JsEscape::Octal => out.push_str(&format!("\\{code:03o}")),
        }
    }
    out
}

/// Numeric character reference form used by [`escape_string`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EntityBase {
    /// `&#N;`
    #[default]
    Decimal,
    /// `&#xH;`
    Hex,
}

/// Replaces ``< > " ' & / \ ` `` with numeric character references.
pub fn escape_string(s: &str, base: EntityBase) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '<' | '>' | '"' | '\'' | '&' | '/' | '\\' | '`') {
            match base {
                EntityBase::Decimal => out.push_str(&format!("&#{};", c as u32)),
                EntityBase::Hex => out.push_str(&format!("&#x{:x};", c as u32)),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Substitutes `{{ name }}` placeholders with fields of `data`.
///
/// Missing and falsy fields (`null`, `false`, `0`, `""`) render as the empty
/// string. Substituted text is not expanded again.
pub fn simple_template(template: &str, data: &JsonValue) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match data.get(&caps[1]) {
            None | Some(JsonValue::Null) | Some(JsonValue::Bool(false)) => String::new(),
            Some(JsonValue::String(s)) => s.clone(),
            Some(JsonValue::Number(n)) if n.as_f64() == Some(0.0) => String::new(),
            Some(other) => other.to_string(),
        })
        .into_owned()
}

/// A parsed colour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorDescriptor {
    /// `#RRGGBB`, upper case.
    pub color: String,
    /// Alpha channel as written in the source, empty for `rgb(...)`.
    pub alpha: String,
}

/// Result of [`format_rgb_to_hex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RgbToHex {
    Color(ColorDescriptor),
    /// The input did not validate and is returned verbatim.
    Unparsed(String),
}

impl RgbToHex {
    pub fn color(&self) -> Option<&ColorDescriptor> {
        match self {
            RgbToHex::Color(c) => Some(c),
            RgbToHex::Unparsed(_) => None,
        }
    }
}

/// Converts `rgb(r,g,b)` or `rgba(r,g,b,a)` to a hex descriptor.
pub fn format_rgb_to_hex(rgb: &str) -> RgbToHex {
    let unparsed = || RgbToHex::Unparsed(rgb.to_string());

    let Some(caps) = RGB.captures(rgb.trim()) else {
        return unparsed();
    };

    let mut channels = [0u8; 3];
    for (i, channel) in channels.iter_mut().enumerate() {
        match caps[i + 1].parse::<u8>() {
            Ok(v) => *channel = v,
            Err(_) => return unparsed(),
        }
    }

    let alpha = match caps.get(4) {
        Some(m) => match m.as_str().parse::<f64>() {
            Ok(a) if (0.0..=1.0).contains(&a) => m.as_str().to_string(),
            _ => return unparsed(),
        },
        None => String::new(),
    };

    let [r, g, b] = channels;
    RgbToHex::Color(ColorDescriptor {
        color: format!("#{r:02X}{g:02X}{b:02X}"),
        alpha,
    })
}

/// Converts `#RGB` / `#RRGGBB` to `rgb(...)`, or `rgba(...)` when `alpha`
/// is given. An alpha that is NaN or outside `0..=1` becomes 1. Invalid hex
/// is returned unchanged.
pub fn format_hex_to_rgb(hex: &str, alpha: Option<f64>) -> String {
    let Some(caps) = HEX.captures(hex.trim()) else {
        return hex.to_string();
    };

    let digits = &caps[1];
    let full: String = if digits.len() == 3 {
        digits.chars().flat_map(|c| [c, c]).collect()
    } else {
        digits.to_string()
    };

    let channel = |i: usize| u8::from_str_radix(&full[i..i + 2], 16).unwrap_or(0);
    let (r, g, b) = (channel(0), channel(2), channel(4));

    match alpha {
        None => format!("rgb({r},{g},{b})"),
        Some(a) => {
            let a = if (0.0..=1.0).contains(&a) { a } else { 1.0 };
            format!("rgba({r},{g},{b},{a})")
        }
    }
}

fn char_weight(c: char) -> usize {
    if (c as u32) <= 0xFF { 1 } else { 2 * c.len_utf16() }
}

/// Approximate byte length: Latin-1 characters count 1, everything else 2
/// per UTF-16 unit.
pub fn get_byte_length(s: &str) -> usize {
    s.chars().map(char_weight).sum()
}

/// Cuts `s` so that its [`get_byte_length`] is at most `max_bytes`, and
/// appends `suffix` when something was cut. Wide characters are never split.
pub fn sub_bytes(s: &str, max_bytes: usize, suffix: &str) -> String {
    if get_byte_length(s) <= max_bytes {
        return s.to_string();
    }

    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = char_weight(c);
        if used + w > max_bytes {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }

    format!("{}{}", &s[..end], suffix)
}

/// `font-size` / `font_size` → `fontSize`.
pub fn to_camel_case(s: &str) -> String {
    SEPARATOR
        .replace_all(s, |caps: &Captures| caps[1].to_uppercase())
        .into_owned()
}

/// Full-width → half-width.
pub fn to_dbc(s: &str) -> String {
    s.chars()
        .map(|c| match c as u32 {
            0x3000 => ' ',
            code @ 0xFF01..=0xFF5E => char::from_u32(code - FULLWIDTH_OFFSET).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// Half-width → full-width.
pub fn to_sbc(s: &str) -> String {
    s.chars()
        .map(|c| match c as u32 {
            0x20 => IDEOGRAPHIC_SPACE,
            code @ 0x21..=0x7E => char::from_u32(code + FULLWIDTH_OFFSET).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// Strips ASCII whitespace plus U+3000, U+00A0 and U+FEFF from both ends.
pub fn trim(s: &str) -> &str {
    s.trim_matches(|c: char| {
        matches!(
            c,
            ' ' | '\t' | '\n' | '\r' | '\x0B' | '\x0C' | '\u{3000}' | '\u{A0}' | '\u{FEFF}'
        )
    })
}

/// A random `xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx` identifier.
pub fn guid() -> String {
    uuid::Uuid::new_v4().to_string()
}
