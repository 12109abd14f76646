use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Strip a font subset tag such as `ABCDEF+` from a base font name.
pub fn strip_subset_prefix(name: &str) -> &str {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^[A-Z]{6}\+").unwrap());
    match re.find(name) {
        Some(m) => &name[m.end()..],
        None => name,
    }
}

/// Normalise decoded span text: NFC, ligatures expanded, NUL and
/// replacement characters removed.
///
/// Private-use glyphs such as the Symbol-font bullet are kept as they are.
pub fn normalize_span_text(text: &str) -> String {
    let ligatures = [
        ('\u{FB00}', "ff"),
        ('\u{FB01}', "fi"),
        ('\u{FB02}', "fl"),
        ('\u{FB03}', "ffi"),
        ('\u{FB04}', "ffl"),
    ];

    let mut result = String::with_capacity(text.len());
    for ch in text.nfc() {
        match ligatures.iter().find(|(lig, _)| *lig == ch) {
            Some((_, expanded)) => result.push_str(expanded),
            None if ch == '\u{FFFD}' || ch == '\0' => {}
            None => result.push(ch),
        }
    }
    result
}
