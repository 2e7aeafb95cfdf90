use std::sync::LazyLock;

use regex::Regex;

static SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Trims and collapses runs of whitespace, keeping case and punctuation.
pub fn tidy(input: &str) -> String {
    SPACES.replace_all(input.trim(), " ").into_owned()
}

pub fn tidy_field(value: &mut Option<String>) {
    if let Some(text) = value {
        *text = tidy(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic() {
        assert_eq!(tidy("Banh Mi"), "Banh Mi");
        assert_eq!(tidy("Mac & Cheese"), "Mac & Cheese");
    }

    #[test]
    fn test_leading_trailing_spaces() {
        assert_eq!(tidy("   Pho   "), "Pho");
        assert_eq!(tidy("  Chicken   Tikka \t Masala  "), "Chicken Tikka Masala");
    }

    #[test]
    fn test_newlines() {
        assert_eq!(tidy("Late\nNight\r\nMenu"), "Late Night Menu");
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(tidy(""), "");
        assert_eq!(tidy("     "), "");
    }

    #[test]
    fn test_tidy_field() {
        let mut value = Some("  Brunch  Specials ".to_string());
        tidy_field(&mut value);
        assert_eq!(value.as_deref(), Some("Brunch Specials"));

        let mut missing: Option<String> = None;
        tidy_field(&mut missing);
        assert_eq!(missing, None);
    }
}
