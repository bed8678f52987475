//! Field cleaners for monster infoboxes and drops lines.

use crate::casters::{to_float, to_int};
use crate::error::{CleanError, CleanResult};
use crate::lookups::{ATTRIBUTES, CATEGORY_SINGULARS, DROP_REQUIREMENT_MARKERS};
use crate::models::DropRequirement;
use crate::wikitext::{clean_wikitext, strip_comments, truncate_at_break, truncate_at_ref};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref STAT_RE: Regex = Regex::new(r"^[+-]?\d+$").unwrap();
    static ref FIRST_PAREN_RE: Regex = Regex::new(r"\(([^()]*)\)").unwrap();
    static ref ANY_PAREN_RE: Regex = Regex::new(r"\s*\([^()]*\)").unwrap();
    static ref LEADING_INT_RE: Regex = Regex::new(r"^[+-]?\d+").unwrap();
    static ref NOTED_RE: Regex = Regex::new(r"(?i)\(\s*noted\s*\)").unwrap();
    static ref SEPARATOR_SPACING_RE: Regex = Regex::new(r"\s*([,;\-–])\s*").unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref QUANTITY_RE: Regex = Regex::new(r"^\d+(?:-\d+)?(?:,\d+(?:-\d+)?)*$").unwrap();
    static ref SINGULAR_RES: Vec<(Regex, &'static str)> = CATEGORY_SINGULARS
        .iter()
        .map(|(plural, singular)| {
            (Regex::new(&format!(r"\b{}\b", regex::escape(plural))).unwrap(), *singular)
        })
        .collect();
}

fn is_not_available(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v.eq_ignore_ascii_case("n/a")
}

/// Combat level, or the first one of a variant listing.
pub fn combat_level(value: Option<&str>) -> CleanResult<Option<i64>> {
    let Some(value) = value else {
        return Ok(None);
    };
    if is_not_available(value) {
        return Ok(None);
    }
    let text = truncate_at_ref(truncate_at_break(value));
    let first = text.split(',').next().unwrap_or("");
    let first = ANY_PAREN_RE.replace_all(first, "");
    let first = first.trim();
    if is_not_available(first) {
        return Ok(None);
    }
    to_int(Some(first))
}

/// Max hit: the leading number of the first listed attack.
pub fn max_hit(value: Option<&str>) -> CleanResult<Option<i64>> {
    let Some(value) = value else {
        return Ok(None);
    };
    if is_not_available(value) {
        return Ok(None);
    }
    let text = truncate_at_ref(truncate_at_break(value));
    let first = text.split(',').next().unwrap_or("").trim();
    match LEADING_INT_RE.find(first) {
        Some(m) => to_int(Some(m.as_str())),
        None => Err(CleanError::Unrecognized {
            field: "max hit",
            value: value.to_string(),
        }),
    }
}

/// Hitpoints, taking the first alternative of "Varies" listings.
pub fn hitpoints(value: Option<&str>) -> CleanResult<Option<i64>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let text = strip_comments(value);
    let text = truncate_at_ref(truncate_at_break(&text)).trim().replace(['[', ']'], "");
    if is_not_available(&text) {
        return Ok(None);
    }

    let candidate = if text.to_lowercase().contains("varies") {
        let inner = FIRST_PAREN_RE
            .captures(&text)
            .map(|c| c[1].to_string())
            .unwrap_or_default();
        LEADING_INT_RE
            .find(inner.trim())
            .map(|m| m.as_str().to_string())
            .unwrap_or(inner)
    } else {
        match text.find(" (") {
            Some(idx) => text[..idx].to_string(),
            None => text.clone(),
        }
    };
    to_int(Some(candidate.trim()))
}

/// Signed equipment or combat bonus. Anything but a signed integer is an error.
pub fn stats_value(value: Option<&str>) -> CleanResult<Option<i64>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let text = value.replace('=', "");
    let text = text.trim();
    if text.is_empty() {
        return Ok(Some(0));
    }
    if !STAT_RE.is_match(text) {
        return Err(CleanError::InvalidNumber(value.to_string()));
    }
    to_int(Some(text))
}

/// Monster combat stat: `N/A` and `?` soft-default to 0, otherwise `stats_value`.
pub fn monster_stat(value: Option<&str>) -> CleanResult<Option<i64>> {
    match value.map(str::trim) {
        Some(v) if v.eq_ignore_ascii_case("n/a") || v == "?" => Ok(Some(0)),
        other => stats_value(other),
    }
}

/// Magic damage bonus, written with a percent sign.
pub fn percent_value(value: Option<&str>) -> CleanResult<Option<i64>> {
    stats_value(value.map(|v| v.trim().trim_end_matches('%')))
}

/// Integer that is absent when empty or `N/A` (slayer level, attack speed).
pub fn optional_int(value: Option<&str>) -> CleanResult<Option<i64>> {
    match value {
        Some(v) if !is_not_available(v) && !v.trim().eq_ignore_ascii_case("none") => {
            to_int(Some(v))
        }
        _ => Ok(None),
    }
}

/// Drop quantity as `N`, `N-M` or a comma list, plus whether it is noted.
pub fn drop_quantity(value: Option<&str>) -> CleanResult<(Option<String>, bool)> {
    let Some(value) = value else {
        return Ok((None, false));
    };
    let text = strip_comments(value);
    let noted = NOTED_RE.is_match(&text);
    let text = NOTED_RE.replace_all(&text, "");
    let text = text.trim();
    if text.is_empty() {
        return Ok((None, noted));
    }

    let text = SEPARATOR_SPACING_RE.replace_all(text, "$1");
    let text = text.replace(';', ",").replace('–', "-");
    let text = WHITESPACE_RE.replace_all(&text, ",");

    if !QUANTITY_RE.is_match(&text) {
        return Err(CleanError::InvalidQuantity(value.to_string()));
    }
    Ok((Some(text.into_owned()), noted))
}

/// First drop restriction marker found in the note text.
pub fn drop_requirements(value: Option<&str>) -> Option<DropRequirement> {
    let lower = value?.to_lowercase();
    DROP_REQUIREMENT_MARKERS
        .iter()
        .find(|(marker, _)| lower.contains(marker))
        .map(|(_, requirement)| *requirement)
}

/// Attack styles in detection order; `melee` only when no specific style matched.
pub fn attack_type(value: &str) -> Vec<String> {
    let lower = value.to_lowercase();
    let mut styles: Vec<String> = ["slash", "crush", "stab"]
        .iter()
        .filter(|style| lower.contains(*style))
        .map(|style| style.to_string())
        .collect();

    if styles.is_empty() && lower.contains("melee") {
        styles.push("melee".to_string());
    }
    if lower.contains("typeless") {
        styles.push("typeless".to_string());
    }
    let dragonfire = lower.contains("dragonfire");
    if dragonfire {
        styles.push("dragonfire".to_string());
    }
    if lower.contains("ranged") {
        styles.push("ranged".to_string());
    }
    if lower.contains("magic") && !dragonfire {
        styles.push("magic".to_string());
    }
    if lower.contains("curse") {
        styles.push("curse".to_string());
    }
    styles
}

pub fn attributes(value: &str) -> Option<Vec<String>> {
    let lower = value.to_lowercase();
    let found: Vec<String> = ATTRIBUTES
        .iter()
        .filter(|attribute| lower.contains(*attribute))
        .map(|attribute| attribute.to_string())
        .collect();
    if found.is_empty() { None } else { Some(found) }
}

/// Slayer categories, singular and lower-case.
pub fn category(value: &str) -> Vec<String> {
    let lower = value.trim().to_lowercase();
    if lower.is_empty() || lower == "no" {
        return Vec::new();
    }
    let mut text = lower;
    for (re, singular) in SINGULAR_RES.iter() {
        text = re.replace_all(&text, *singular).into_owned();
    }
    text.split(',')
        .map(|segment| segment.split('|').nth(1).unwrap_or(segment).trim())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Comma-separated plain-text list (slayer masters).
pub fn text_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| clean_wikitext(s).to_lowercase())
        .filter(|s| !s.is_empty() && s != "no" && s != "none")
        .collect()
}

/// Slayer experience. "Not assigned"-style values are absent, ranges keep the lower bound.
pub fn slayer_xp(value: Option<&str>) -> CleanResult<Option<f64>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let text = value.trim();
    let lower = text.to_lowercase();
    if text.is_empty() || ["not", "no", "n/a", "yes"].iter().any(|m| lower.contains(m)) {
        return Ok(None);
    }
    let first = match text.split_once('-') {
        Some((head, _)) if !head.trim().is_empty() => head.trim(),
        _ => text,
    };
    to_float(Some(first))
}
