//! File names for exported grams

use regex::Regex;
use std::sync::OnceLock;

/// Used when the header has no characters at all.
pub const FALLBACK_STEM: &str = "typogram";

pub const EXTENSION: &str = "png";

fn unsafe_chars() -> &'static Regex {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_]").expect("constant pattern is valid"))
}

/// File name for a gram with the given header.
///
/// Every character outside `[A-Za-z0-9_]` becomes `-`, one dash per
/// character, and `.png` is appended.
pub fn png_filename(header: &str) -> String {
    if header.is_empty() {
        return format!("{}.{}", FALLBACK_STEM, EXTENSION);
    }

    let stem = unsafe_chars().replace_all(header, "-");
    format!("{}.{}", stem, EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_punctuation_and_spaces() {
        assert_eq!(png_filename("Hello, World!"), "Hello--World-.png");
    }

    #[test]
    fn test_safe_characters_kept() {
        assert_eq!(png_filename("my_gram_2024"), "my_gram_2024.png");
    }

    #[test]
    fn test_one_dash_per_character() {
        assert_eq!(png_filename("café"), "caf-.png");
        assert_eq!(png_filename("日本"), "--.png");
        assert_eq!(png_filename("a/b\\c"), "a-b-c.png");
    }

    #[test]
    fn test_empty_header_falls_back() {
        assert_eq!(png_filename(""), "typogram.png");
        assert_eq!(png_filename("   "), "---.png");
    }
}
