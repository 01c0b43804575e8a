use unicode_normalization::UnicodeNormalization;

const LIGATURES: [(char, &str); 7] = [
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{FB05}', "st"),
    ('\u{FB06}', "st"),
];

/// Clean up extracted page text.
///
/// NFC-normalizes, expands typographic ligatures, drops replacement and NUL
/// characters, strips trailing whitespace from every line, and trims blank
/// lines at both ends of the page.
pub fn cleanup_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.nfc() {
        match LIGATURES.iter().find(|(lig, _)| *lig == ch) {
            Some((_, expanded)) => out.push_str(expanded),
            None if ch == '\u{FFFD}' || ch == '\0' => {}
            None => out.push(ch),
        }
    }

    let lines: Vec<&str> = out.lines().map(str::trim_end).collect();
    let first = lines.iter().position(|l| !l.is_empty());
    let last = lines.iter().rposition(|l| !l.is_empty());
    match (first, last) {
        (Some(first), Some(last)) => lines[first..=last].join("\n"),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough() {
        assert_eq!(cleanup_text("Hello world."), "Hello world.");
    }

    #[test]
    fn test_ligatures() {
        assert_eq!(cleanup_text("\u{FB01}nd a\u{FB04}e"), "find affle");
    }

    #[test]
    fn test_replacement_and_nul_removed() {
        assert_eq!(cleanup_text("Hel\u{FFFD}lo\0"), "Hello");
    }

    #[test]
    fn test_nfc_normalization() {
        assert_eq!(cleanup_text("cafe\u{0301}"), "caf\u{00E9}");
    }

    #[test]
    fn test_trailing_whitespace_and_blank_edges() {
        assert_eq!(
            cleanup_text("\n\n  indented   \nnext\t\n\n\nlast  \n\n"),
            "  indented\nnext\n\n\nlast"
        );
    }

    #[test]
    fn test_blank_input() {
        assert_eq!(cleanup_text(""), "");
        assert_eq!(cleanup_text(" \n \n"), "");
    }
}
