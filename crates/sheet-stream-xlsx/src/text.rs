//! Text decoding for cell values and string items

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::scan::{OPEN_ATTRS, PREFIX};

static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9A-Fa-f]+|[A-Za-z]+);").expect("entity pattern is valid")
});

static EXCEL_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_x([0-9A-Fa-f]{4})_").expect("escape pattern is valid"));

static PHONETIC_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?s)<{PREFIX}rPh(?:\s[^>]*)?/>|<{PREFIX}rPh{OPEN_ATTRS}>.*?</{PREFIX}rPh\s*>"
    ))
    .expect("phonetic run pattern is valid")
});

static TEXT_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?s)<{PREFIX}t(?:\s[^>]*)?/>|<{PREFIX}t{OPEN_ATTRS}>(.*?)</{PREFIX}t\s*>"
    ))
    .expect("text run pattern is valid")
});

/// Resolve XML character references in one pass.
///
/// The five predefined entities and numeric references are replaced; anything
/// else (unknown names, invalid code points) is left exactly as written.
/// Output is never re-scanned, so `&amp;lt;` becomes `&lt;`.
pub fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }
    ENTITY.replace_all(s, |caps: &Captures<'_>| {
        let body = &caps[1];
        let decoded = match body {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => numeric_reference(body),
        };
        match decoded {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        }
    })
}

fn numeric_reference(body: &str) -> Option<char> {
    let digits = body.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}

/// Decode Excel's `_xHHHH_` escapes for characters XML cannot carry.
///
/// `_x005F_` stands for a literal underscore, so `_x005F_x0041_` decodes to
/// the text `_x0041_`.
pub fn decode_excel_escapes(s: &str) -> Cow<'_, str> {
    if !s.contains("_x") {
        return Cow::Borrowed(s);
    }
    EXCEL_ESCAPE.replace_all(s, |caps: &Captures<'_>| {
        u32::from_str_radix(&caps[1], 16)
            .ok()
            .and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_else(|| caps[0].to_string())
    })
}

/// Visible text of a string item (`<si>` or `<is>` content).
///
/// All `<t>` runs are concatenated in document order, whether they sit
/// directly in the item or inside rich text `<r>` runs. Phonetic runs are
/// skipped.
pub fn item_text(markup: &str) -> String {
    let markup = PHONETIC_RUN.replace_all(markup, "");
    let mut raw = String::new();
    for caps in TEXT_RUN.captures_iter(&markup) {
        if let Some(run) = caps.get(1) {
            raw.push_str(run.as_str());
        }
    }
    let text = decode_entities(&raw);
    decode_excel_escapes(&text).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_entities() {
        assert_eq!(
            decode_entities("a &lt;b&gt; &amp; &quot;c&quot; &apos;d&apos;"),
            "a <b> & \"c\" 'd'"
        );
    }

    #[test]
    fn test_entities_decoded_once() {
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_numeric_entities() {
        assert_eq!(decode_entities("&#65;&#x42;&#X43;"), "ABC");
        assert_eq!(decode_entities("&#x1F600;"), "\u{1F600}");
    }

    #[test]
    fn test_unknown_entities_kept() {
        assert_eq!(decode_entities("&nbsp; &#xD800; & x"), "&nbsp; &#xD800; & x");
    }

    #[test]
    fn test_excel_escapes() {
        assert_eq!(decode_excel_escapes("a_x000D_b"), "a\rb");
        assert_eq!(decode_excel_escapes("_x005F_x0041_"), "_x0041_");
        assert_eq!(decode_excel_escapes("_x12_ plain"), "_x12_ plain");
    }

    #[test]
    fn test_item_text_plain() {
        assert_eq!(item_text("<si><t>Hello</t></si>"), "Hello");
        assert_eq!(item_text(r#"<si><t xml:space="preserve"> spaced </t></si>"#), " spaced ");
    }

    #[test]
    fn test_item_text_rich_runs() {
        let markup = r#"<si><r><rPr><b/></rPr><t>Bold</t></r><r><t xml:space="preserve"> and plain</t></r></si>"#;
        assert_eq!(item_text(markup), "Bold and plain");
    }

    #[test]
    fn test_item_text_skips_phonetic_runs() {
        let markup = r#"<si><t>東京</t><rPh sb="0" eb="2"><t>トウキョウ</t></rPh><phoneticPr fontId="1"/></si>"#;
        assert_eq!(item_text(markup), "東京");
    }

    #[test]
    fn test_item_text_empty_forms() {
        assert_eq!(item_text("<si/>"), "");
        assert_eq!(item_text("<si><t/></si>"), "");
        assert_eq!(item_text(r#"<si><t xml:space="preserve"/><t>x</t></si>"#), "x");
        assert_eq!(item_text(r#"<si><t /><r><t>a</t></r><t xml:space="preserve" /><t>b</t></si>"#), "ab");
    }

    #[test]
    fn test_item_text_self_closing_phonetic_run() {
        let markup = r#"<si><rPh sb="0" eb="1"/><t>kept</t><rPh sb="1" eb="2"><t>gone</t></rPh></si>"#;
        assert_eq!(item_text(markup), "kept");
    }

    #[test]
    fn test_item_text_decodes() {
        assert_eq!(item_text("<si><t>R&amp;D_x0009_ok</t></si>"), "R&D\tok");
        assert_eq!(item_text("<x:si><x:t>pre&#x41;</x:t></x:si>"), "preA");
    }
}
