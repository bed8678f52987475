//! Generic wikitext cleanup applied before any type-specific cleaning.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    pub(crate) static ref COMMENT_RE: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    pub(crate) static ref BR_RE: Regex = Regex::new(r"(?i)<br\s*/?>").unwrap();
    pub(crate) static ref REF_RE: Regex = Regex::new(r"(?i)<ref[\s>/]").unwrap();
    static ref TRAILING_PAREN_RE: Regex = Regex::new(r"\s+\([^()]*\)$").unwrap();
}

/// Normalize one raw infobox value to plain text.
///
/// Drops HTML comments, everything from the first `<br>` on, link brackets and a
/// trailing ` (...)` annotation.
pub fn clean_wikitext(value: &str) -> String {
    let text = COMMENT_RE.replace_all(value.trim(), "");
    let text = truncate_at_break(&text);
    let text: String = text.chars().filter(|c| *c != '[' && *c != ']').collect();
    strip_trailing_parenthetical(text.trim()).trim().to_string()
}

/// Everything before the first HTML line break.
pub fn truncate_at_break(value: &str) -> &str {
    match BR_RE.find(value) {
        Some(m) => &value[..m.start()],
        None => value,
    }
}

/// Everything before the first `<ref>` tag.
pub fn truncate_at_ref(value: &str) -> &str {
    match REF_RE.find(value) {
        Some(m) => &value[..m.start()],
        None => value,
    }
}

pub fn strip_comments(value: &str) -> String {
    COMMENT_RE.replace_all(value, "").into_owned()
}

pub fn strip_trailing_parenthetical(value: &str) -> &str {
    match TRAILING_PAREN_RE.find(value) {
        Some(m) => &value[..m.start()],
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_link_brackets_and_annotation() {
        assert_eq!(clean_wikitext("[[Iron dagger]] (p)"), "Iron dagger");
    }

    #[test]
    fn test_strips_comments_and_breaks() {
        assert_eq!(clean_wikitext("  Yes<!-- checked in game --> "), "Yes");
        assert_eq!(clean_wikitext("1.5<br/>'''Equipped:''' 1"), "1.5");
        assert_eq!(clean_wikitext("12<BR>13"), "12");
    }

    #[test]
    fn test_only_the_last_parenthetical_is_annotation() {
        assert_eq!(clean_wikitext("Dragon dagger (p++) (unf)"), "Dragon dagger (p++)");
        assert_eq!(clean_wikitext("(5)"), "(5)");
    }

    #[test]
    fn test_truncates_at_reference_tag() {
        assert_eq!(truncate_at_ref("100<ref name=a>source</ref>"), "100");
        assert_eq!(truncate_at_ref("100<references/>"), "100<references/>");
    }
}
