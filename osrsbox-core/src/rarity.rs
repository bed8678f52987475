//! Drop rarity evaluation.
//!
//! Rarity text is rewritten into a plain `numerator/denominator` fraction and
//! then evaluated. Named tiers map to fixed fractions, and a small set of
//! template formulas gets the monster's base value substituted in. A fraction
//! that still does not parse after every rewrite evaluates to `0.0` instead of
//! failing.

use crate::error::{CleanError, CleanResult};
use crate::expr::{evaluate, round_to};
use crate::lookups::RARITY_KEYWORDS;
use crate::wikitext::{strip_comments, truncate_at_ref};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref FRACTION_RE: Regex = Regex::new(r"^\d+(\.\d+)?/\d+(\.\d+)?$").unwrap();
    static ref EXPR_FORMULA_RE: Regex =
        Regex::new(r"(?i)^(?:(?P<num>\d+(?:\.\d+)?)/)?#expr:(?P<expr>.+?)(?:round\d+)?$").unwrap();
    static ref SMALL_TAG_RE: Regex = Regex::new(r"(?i)</?small>").unwrap();
}

/// Rarity of a `0/0` entry: a guaranteed drop the wiki has miscoded.
const ZERO_OVER_ZERO: f64 = 1.0 / 128.0;

/// Brimstone key chance never gets better than this denominator.
const BRIMSTONE_MIN_DENOMINATOR: f64 = 50.0;

/// Template formulas whose denominator is `1/(k * base)`, keyed by the base parameter name.
const BASE_FORMULA_SIGNATURES: &[&str] = &["herbbase", "seedbase", "uhtbase", "bolttipbase"];

const BRIMSTONE_SIGNATURE: &str = "brimstonerarity";

/// Evaluate raw rarity text to a probability.
///
/// `None` for absent or empty text. Unparseable text evaluates to `Some(0.0)`.
pub fn drop_rarity(value: Option<&str>, base_value: Option<f64>) -> Option<f64> {
    let raw = value?.trim();
    if raw.is_empty() {
        return None;
    }
    if raw == "0/0" {
        return Some(ZERO_OVER_ZERO);
    }

    let fraction = match rewrite_fraction(raw, base_value) {
        Ok(fraction) => fraction,
        Err(e) => {
            tracing::warn!("Rarity {:?} could not be rewritten ({}), treating as 0", raw, e);
            return Some(0.0);
        }
    };

    if !FRACTION_RE.is_match(&fraction) {
        tracing::warn!("Rarity {:?} is not a fraction after rewriting ({:?}), treating as 0", raw, fraction);
        return Some(0.0);
    }

    match evaluate(&fraction) {
        Ok(rarity) => Some(rarity),
        Err(e) => {
            tracing::warn!("Rarity fraction {:?} did not evaluate ({}), treating as 0", fraction, e);
            Some(0.0)
        }
    }
}

/// Rewrite rarity text into `numerator/denominator` form.
fn rewrite_fraction(raw: &str, base_value: Option<f64>) -> CleanResult<String> {
    let text = strip_comments(truncate_at_ref(raw));
    let text = strip_decoration(&text);
    let lower = text.to_lowercase();

    if let Some(fraction) = RARITY_KEYWORDS.get(lower.as_str()) {
        return Ok(fraction.to_string());
    }

    if lower.contains(BRIMSTONE_SIGNATURE) {
        return brimstone_fraction(&lower, base_value);
    }

    if let Some(signature) = BASE_FORMULA_SIGNATURES.iter().find(|s| lower.contains(*s)) {
        let base = base_value.ok_or_else(|| {
            CleanError::Arithmetic(format!("{} formula needs a base value", signature))
        })?;
        let substituted = lower.replace(signature, &format_number(base));
        return expr_fraction(&substituted);
    }

    if lower.contains("#expr:") {
        return expr_fraction(&lower);
    }

    if let Some((head, _)) = text.split_once(':') {
        return Ok(head.to_string());
    }

    Ok(text)
}

fn strip_decoration(text: &str) -> String {
    if text.contains("#expr") {
        let stripped: String = text
            .chars()
            .filter(|c| !matches!(c, '{' | '}' | ' '))
            .collect();
        SMALL_TAG_RE.replace_all(&stripped, "").into_owned()
    } else {
        text.chars()
            .filter(|c| !matches!(c, '(' | ')' | '{' | '}' | ' ' | '~' | '+'))
            .collect()
    }
}

/// `[numerator/]#expr:<expression>[round n]` with the expression as the denominator.
fn expr_fraction(text: &str) -> CleanResult<String> {
    let caps = EXPR_FORMULA_RE
        .captures(text)
        .ok_or_else(|| CleanError::Arithmetic(format!("unrecognized expression {:?}", text)))?;
    let value = evaluate(&caps["expr"])?;

    match caps.name("num") {
        Some(numerator) => Ok(format!("{}/{}", numerator.as_str(), format_number(round_to(value, 1)))),
        // A bare expression already is the probability
        None => Ok(format!("{}/1", format_number(value))),
    }
}

/// `brimstonerarity|<level>[|<multiplier>]`, level falling back to the base value.
fn brimstone_fraction(text: &str, base_value: Option<f64>) -> CleanResult<String> {
    let mut params = text.split('|').skip(1).filter(|p| !p.is_empty());
    let level = match params.next() {
        Some(level) => level
            .parse::<f64>()
            .map_err(|_| CleanError::InvalidNumber(level.to_string()))?,
        None => base_value.ok_or_else(|| {
            CleanError::Arithmetic("brimstone formula needs a monster level".to_string())
        })?,
    };
    let multiplier = match params.next() {
        Some(m) => m.parse::<f64>().map_err(|_| CleanError::InvalidNumber(m.to_string()))?,
        None => 1.0,
    };

    let denominator = if level < 100.0 {
        0.2 * (level - 100.0).powi(2) + 100.0
    } else {
        (-0.2 * level + 120.0).max(BRIMSTONE_MIN_DENOMINATOR)
    };
    Ok(format!("{}/{}", format_number(multiplier), format_number(round_to(denominator, 1))))
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_named_tiers() {
        assert_eq!(drop_rarity(Some("common"), None), Some(0.125));
        assert_eq!(drop_rarity(Some("Always"), None), Some(1.0));
        assert_eq!(drop_rarity(Some("Uncommon"), None), Some(1.0 / 32.0));
        assert_eq!(drop_rarity(Some("Rare"), None), Some(1.0 / 128.0));
        assert_eq!(drop_rarity(Some("Very rare"), None), Some(1.0 / 512.0));
    }

    #[test]
    fn test_zero_over_zero_is_one_in_128() {
        assert_eq!(drop_rarity(Some("0/0"), None), Some(0.0078125));
    }

    #[test]
    fn test_plain_and_decorated_fractions() {
        assert_eq!(drop_rarity(Some("1/128"), None), Some(1.0 / 128.0));
        assert_eq!(drop_rarity(Some("~1/64"), None), Some(1.0 / 64.0));
        assert_eq!(drop_rarity(Some("{{1/5,000}}"), None), Some(0.0));
        assert_eq!(drop_rarity(Some("3/128 (x2)"), None), Some(0.0));
        assert_eq!(drop_rarity(Some("1/2.5"), None), Some(0.4));
    }

    #[test]
    fn test_colon_form_keeps_head() {
        assert_eq!(drop_rarity(Some("1/16: on task"), None), Some(1.0 / 16.0));
    }

    #[test]
    fn test_absent_and_empty_are_null() {
        assert_eq!(drop_rarity(None, None), None);
        assert_eq!(drop_rarity(Some("  "), None), None);
    }

    #[test]
    fn test_unparseable_rarity_falls_back_to_zero() {
        // The one tolerant cleaner: garbage degrades to 0 rather than failing.
        assert_eq!(drop_rarity(Some("Varies"), None), Some(0.0));
        assert_eq!(drop_rarity(Some("1/0"), None), Some(0.0));
    }

    #[test]
    fn test_herb_base_formula_substitutes_base() {
        let rarity = drop_rarity(
            Some("1/{{#expr:1/(4*{{{herbbase}}}) round 1}}"),
            Some(1.0 / 16.0),
        )
        .unwrap();
        assert!(approx(rarity, 0.25), "{rarity}");
    }

    #[test]
    fn test_seed_base_formula_rounds_denominator() {
        let rarity = drop_rarity(
            Some("<small>2/{{#expr:1/(3*{{{seedbase}}})}}</small>"),
            Some(1.0 / 100.0),
        )
        .unwrap();
        // 1/(0.03) = 33.33.. -> 33.3
        assert!(approx(rarity, 2.0 / 33.3), "{rarity}");
    }

    #[test]
    fn test_base_formula_without_base_falls_back_to_zero() {
        assert_eq!(drop_rarity(Some("1/{{#expr:1/(2*{{{bolttipbase}}})}}"), None), Some(0.0));
    }

    #[test]
    fn test_generic_expr_without_parameter() {
        let rarity = drop_rarity(Some("1/{{#expr:128*2}}"), None).unwrap();
        assert!(approx(rarity, 1.0 / 256.0));
        let bare = drop_rarity(Some("{{#expr:1/64}}"), None).unwrap();
        assert!(approx(bare, 1.0 / 64.0));
    }

    #[test]
    fn test_brimstone_formula() {
        // level 96: 0.2 * 16 + 100 = 103.2
        let below = drop_rarity(Some("{{Brimstone rarity|96}}"), None).unwrap();
        assert!(approx(below, 1.0 / 103.2), "{below}");
        // level 400 hits the 1/50 cap, doubled by the bonus multiplier
        let capped = drop_rarity(Some("{{Brimstone rarity|400|2}}"), None).unwrap();
        assert!(approx(capped, 2.0 / 50.0), "{capped}");
        let from_base = drop_rarity(Some("{{Brimstone rarity}}"), Some(100.0)).unwrap();
        assert!(approx(from_base, 1.0 / 100.0), "{from_base}");
    }
}
