//! Field cleaners for item infoboxes.

use crate::casters::{to_date, to_float};
use crate::error::{CleanError, CleanResult};
use crate::lookups::{EXAMINE_OVERRIDES, QUEST_ITEM_OVERRIDES, SINGULAR_QUEST_NAME, WEIGHT_OVERRIDES};
use crate::models::{Skill, SkillRequirement};
use crate::wikitext::{BR_RE, clean_wikitext, strip_comments, strip_trailing_parenthetical};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WEIGHT_LABEL_RE: Regex =
        Regex::new(r"(?i)^(inventory|equipped|without falcon|with falcon|without|with)[^:]*:").unwrap();
    static ref SCP_RE: Regex = Regex::new(r"(?i)\{\{\s*scp\s*\|\s*([a-z]+)\s*\|\s*(\d+)").unwrap();
    static ref PLAIN_REQUIREMENT_RE: Regex = Regex::new(r"(\d+)\s+([A-Za-z]+)").unwrap();
    static ref COINS_RE: Regex = Regex::new(r"(?i)\s*coins?$").unwrap();
}

/// Item weight in kg.
///
/// Known weight-reducing equipment returns its fixed equipped weight whatever
/// the text says. Split inventory/equipped or with/without-accessory values
/// keep the inventory or without-accessory side.
pub fn weight(value: &str, item_id: i64) -> CleanResult<f64> {
    if let Some(w) = WEIGHT_OVERRIDES.get(&item_id) {
        return Ok(*w);
    }

    let text = strip_comments(value).trim().to_string();
    if text.is_empty() {
        return Ok(0.0);
    }
    if let Ok(Some(w)) = to_float(Some(&text)) {
        return Ok(w);
    }

    let segments: Vec<&str> = BR_RE.split(&text).map(str::trim).filter(|s| !s.is_empty()).collect();
    let segment = segments
        .iter()
        .find(|s| {
            let lower = s.to_lowercase();
            lower.contains("inventory") || lower.contains("without")
        })
        .or_else(|| segments.first())
        .copied()
        .unwrap_or("");

    let cleaned = segment.replace("'''", "").replace("''", "");
    let cleaned = WEIGHT_LABEL_RE.replace(cleaned.trim(), "");
    let cleaned: String = cleaned.chars().filter(|c| *c != '[' && *c != ']').collect();
    let cleaned = cleaned.trim();
    let number = cleaned
        .strip_suffix("kg")
        .or_else(|| cleaned.strip_suffix("KG"))
        .unwrap_or(cleaned)
        .trim();

    match to_float(Some(number)) {
        Ok(Some(w)) => Ok(w),
        _ => Err(CleanError::Unrecognized {
            field: "weight",
            value: value.to_string(),
        }),
    }
}

/// Whether the item is a quest item.
pub fn quest_item(value: &str, item_id: i64) -> CleanResult<bool> {
    if let Some(flag) = QUEST_ITEM_OVERRIDES.get(&item_id) {
        return Ok(*flag);
    }
    let value = strip_comments(value);
    if value.contains("[[") {
        return Ok(true);
    }
    let cleaned = clean_wikitext(&value).to_lowercase();
    match cleaned.as_str() {
        "" | "no" | "none" => Ok(false),
        "yes" | SINGULAR_QUEST_NAME => Ok(true),
        _ => Err(CleanError::Unrecognized {
            field: "quest",
            value: value.to_string(),
        }),
    }
}

pub fn tradeable(value: &str) -> CleanResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "" | "no" | "none" => Ok(false),
        "yes" => Ok(true),
        _ => Err(CleanError::Unrecognized {
            field: "tradeable",
            value: value.to_string(),
        }),
    }
}

/// Release date; empty text is no date, unparseable text is an error.
pub fn release_date(value: &str) -> CleanResult<Option<NaiveDate>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    to_date(Some(value))
        .map(Some)
        .ok_or_else(|| CleanError::InvalidDate(value.to_string()))
}

/// Examine text, with shared texts for item families like clue scrolls.
pub fn examine(value: &str, item_name: &str) -> Option<String> {
    let name = item_name.to_lowercase();
    if let Some((_, text)) = EXAMINE_OVERRIDES.iter().find(|(family, _)| name.contains(family)) {
        return Some(text.to_string());
    }
    let text = value.replace("{{sic}}", "");
    let text = strip_trailing_parenthetical(text.trim()).trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Coin value, tolerating thousands separators and a `coins` suffix.
pub fn coins(value: &str) -> CleanResult<Option<i64>> {
    let text = COINS_RE.replace(value.trim(), "").replace(',', "");
    if text.is_empty() {
        return Ok(None);
    }
    crate::casters::to_int(Some(&text))
}

/// Skill requirements, from `{{SCP|Skill|Level}}` templates or plain `60 Attack` text.
pub fn skill_requirements(value: &str) -> CleanResult<Vec<SkillRequirement>> {
    let text = strip_comments(value);
    let pairs: Vec<(String, String)> = if SCP_RE.is_match(&text) {
        SCP_RE
            .captures_iter(&text)
            .map(|c| (c[1].to_string(), c[2].to_string()))
            .collect()
    } else {
        PLAIN_REQUIREMENT_RE
            .captures_iter(&text)
            .map(|c| (c[2].to_string(), c[1].to_string()))
            .collect()
    };

    if pairs.is_empty() && !clean_wikitext(&text).is_empty() && !is_none_marker(&text) {
        return Err(CleanError::Unrecognized {
            field: "requirements",
            value: value.to_string(),
        });
    }

    let mut requirements = Vec::with_capacity(pairs.len());
    for (skill, level) in pairs {
        let skill = Skill::from_name(&skill).ok_or(CleanError::UnknownSkill(skill))?;
        let level: i64 = level.parse().map_err(|_| CleanError::InvalidNumber(level.clone()))?;
        if !(1..=99).contains(&level) {
            return Err(CleanError::LevelOutOfRange(level));
        }
        requirements.push(SkillRequirement {
            skill,
            level: level as u8,
        });
    }
    Ok(requirements)
}

fn is_none_marker(value: &str) -> bool {
    matches!(clean_wikitext(value).to_lowercase().as_str(), "none" | "no" | "n/a")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_override_beats_text() {
        assert_eq!(weight("whatever", 89), Ok(-4.5));
        assert_eq!(weight("", 88), Ok(-4.5));
    }

    #[test]
    fn test_weight_plain_and_suffixed() {
        assert_eq!(weight("0.5kg", 12345), Ok(0.5));
        assert_eq!(weight("2.267", 1), Ok(2.267));
        assert_eq!(weight("", 1), Ok(0.0));
        assert_eq!(weight(" 3 kg ", 1), Ok(3.0));
    }

    #[test]
    fn test_weight_keeps_inventory_segment() {
        assert_eq!(weight("'''Inventory:''' 1 kg<br>'''Equipped:''' -4.5 kg", 1), Ok(1.0));
        assert_eq!(weight("'''Equipped:''' -4.5 kg<br>'''Inventory:''' 1 kg", 1), Ok(1.0));
    }

    #[test]
    fn test_weight_keeps_without_accessory_segment() {
        assert_eq!(weight("0.907 kg<br/> '''With falcon:''' 1.814 kg", 10023), Ok(0.907));
        assert_eq!(
            weight("'''With falcon:''' 1.814 kg<br/>'''Without falcon:''' 0.907 kg", 10023),
            Ok(0.907)
        );
    }

    #[test]
    fn test_weight_unknown_shape_is_a_hard_failure() {
        assert!(weight("about two stone", 1).is_err());
        assert!(weight("5 lbs", 1).is_err());
    }

    #[test]
    fn test_quest_item_rules() {
        assert_eq!(quest_item("No", 1), Ok(false));
        assert_eq!(quest_item("", 1), Ok(false));
        assert_eq!(quest_item("Yes", 1), Ok(true));
        assert_eq!(quest_item("[[Dragon Slayer I]]", 1), Ok(true));
        assert_eq!(quest_item("Tears of Guthix", 1), Ok(true));
        assert_eq!(quest_item("No<!-- see [[Dragon Slayer I]] -->", 1), Ok(false));
        assert_eq!(quest_item("Yes", 4155), Ok(false));
        assert!(quest_item("Maybe", 1).is_err());
    }

    #[test]
    fn test_tradeable_rules() {
        assert_eq!(tradeable("Yes"), Ok(true));
        assert_eq!(tradeable("none"), Ok(false));
        assert!(tradeable("Yes, but only once").is_err());
    }

    #[test]
    fn test_release_date_rules() {
        assert_eq!(release_date("25 June 2017"), Ok(NaiveDate::from_ymd_opt(2017, 6, 25)));
        assert_eq!(release_date(""), Ok(None));
        assert!(release_date("a long time ago").is_err());
    }

    #[test]
    fn test_examine_family_overrides() {
        assert_eq!(examine("A set of instructions.", "Clue scroll (elite)"), Some("A clue!".into()));
        assert_eq!(examine("It's a bad{{sic}} idea (Ironman)", "Rock"), Some("It's a bad idea".into()));
        assert_eq!(examine("", "Rock"), None);
    }

    #[test]
    fn test_coins_tolerate_separators() {
        assert_eq!(coins("1,250"), Ok(Some(1250)));
        assert_eq!(coins("40 coins"), Ok(Some(40)));
        assert_eq!(coins(""), Ok(None));
        assert!(coins("priceless").is_err());
    }

    #[test]
    fn test_requirements_from_templates_and_text() {
        let reqs = skill_requirements("{{SCP|Attack|60}} {{SCP|Defence|40}}").unwrap();
        assert_eq!(
            reqs,
            vec![
                SkillRequirement { skill: Skill::Attack, level: 60 },
                SkillRequirement { skill: Skill::Defence, level: 40 },
            ]
        );
        let plain = skill_requirements("70 Ranged").unwrap();
        assert_eq!(plain, vec![SkillRequirement { skill: Skill::Ranged, level: 70 }]);
        assert_eq!(skill_requirements("None"), Ok(vec![]));
        assert_eq!(skill_requirements(""), Ok(vec![]));
    }

    #[test]
    fn test_requirements_reject_bad_skills_and_levels() {
        assert_eq!(
            skill_requirements("{{SCP|Sailing|10}}"),
            Err(CleanError::UnknownSkill("Sailing".into()))
        );
        assert_eq!(skill_requirements("120 Attack"), Err(CleanError::LevelOutOfRange(120)));
        assert!(skill_requirements("Completion of a quest").is_err());
    }
}
