//! Entity record builders.
//!
//! A builder walks a [`Schema`] in order, runs the declared cleaner over each
//! raw value, fills derived fields, and validates the result. Per-field hard
//! failures are collected, never raised: the failed field is left null and
//! reported in [`BuildOutcome::failures`].

use crate::casters::to_bool;
use crate::error::{CleanError, CleanResult, NormalizationError, Result};
use crate::item_cleaners::{coins, examine, quest_item, release_date, skill_requirements, tradeable, weight};
use crate::lookups::WIKI_URL_PREFIX;
use crate::models::{DropEntry, EntityContext, FieldValue, RawFieldMap, RawValue, TypedRecord};
use crate::monster_cleaners::{
    attack_type, attributes, category, combat_level, drop_quantity, drop_requirements, hitpoints,
    max_hit, monster_stat, optional_int, percent_value, slayer_xp, stats_value, text_list,
};
use crate::rarity::drop_rarity;
use crate::schema::{
    Cleaner, Derivation, EQUIPMENT_BONUS_SCHEMA, EQUIPMENT_SLOT_SCHEMA, ITEM_SCHEMA, MONSTER_SCHEMA,
    Schema, Source, validate,
};
use crate::wikitext::clean_wikitext;

/// A built record and the fields that hard-failed while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutcome {
    pub record: TypedRecord,
    pub failures: Vec<NormalizationError>,
}

impl BuildOutcome {
    /// True when every field cleaned without a hard failure.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_fields(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.field_name.clone()).collect()
    }
}

/// Run one cleaner over one raw value.
pub fn apply_cleaner(cleaner: Cleaner, raw: &RawValue, ctx: &EntityContext) -> CleanResult<FieldValue> {
    let source = if cleaner.reads_list() {
        raw.joined(",")
    } else {
        raw.as_text()
    };
    let text = if cleaner.pre_clean() {
        clean_wikitext(&source)
    } else {
        source.into_owned()
    };

    let value: FieldValue = match cleaner {
        Cleaner::Slot => non_empty(text.to_lowercase()).into(),
        Cleaner::Bool => {
            if text.is_empty() {
                FieldValue::Null
            } else {
                to_bool(Some(&text)).into()
            }
        }
        Cleaner::Coins => coins(&text)?.into(),
        Cleaner::Weight => FieldValue::Float(weight(&text, ctx.entity_id)?),
        Cleaner::QuestItem => FieldValue::Bool(quest_item(&text, ctx.entity_id)?),
        Cleaner::Tradeable => FieldValue::Bool(tradeable(&text)?),
        Cleaner::ReleaseDate => release_date(&text)?.into(),
        Cleaner::Examine => examine(&text, &ctx.entity_name).into(),
        Cleaner::CombatLevel => combat_level(Some(&text))?.into(),
        Cleaner::MaxHit => max_hit(Some(&text))?.into(),
        Cleaner::Hitpoints => hitpoints(Some(&text))?.into(),
        Cleaner::StatsValue => stats_value(Some(&text))?.into(),
        Cleaner::MonsterStat => monster_stat(Some(&text))?.into(),
        Cleaner::PercentValue => percent_value(Some(&text))?.into(),
        Cleaner::OptionalInt => optional_int(Some(&text))?.into(),
        Cleaner::AttackType => FieldValue::List(attack_type(&text)),
        Cleaner::Attributes => attributes(&text).into(),
        Cleaner::Category => FieldValue::List(category(&text)),
        Cleaner::TextList => FieldValue::List(text_list(&text)),
        Cleaner::SlayerXp => slayer_xp(Some(&text))?.into(),
        Cleaner::Requirements => FieldValue::Requirements(skill_requirements(&text)?),
    };
    Ok(value)
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}

/// Fills the raw-sourced fields of a schema, leaving derived ones as null placeholders.
struct RecordBuilder<'a> {
    ctx: &'a EntityContext,
    record: TypedRecord,
    failures: Vec<NormalizationError>,
}

impl<'a> RecordBuilder<'a> {
    fn new(ctx: &'a EntityContext) -> Self {
        Self {
            ctx,
            record: TypedRecord::new(),
            failures: Vec::new(),
        }
    }

    fn fill_raw(&mut self, schema: &Schema, raw: &RawFieldMap) {
        for spec in schema.fields {
            let value = match spec.source {
                Source::Derived(_) => FieldValue::Null,
                Source::Raw { key, cleaner, fallback } => {
                    match raw.get_versioned(key, self.ctx.version()) {
                        None => fallback.value(spec.kind),
                        Some(raw_value) => match apply_cleaner(cleaner, raw_value, self.ctx) {
                            Ok(FieldValue::Null) if !spec.nullable => fallback.value(spec.kind),
                            Ok(value) => value,
                            Err(reason) => {
                                self.failures.push(NormalizationError::new(
                                    self.ctx.entity_id,
                                    spec.name,
                                    &raw_value.as_text(),
                                    reason,
                                ));
                                FieldValue::Null
                            }
                        },
                    }
                }
            };
            self.record.set(spec.name, value);
        }
    }

    /// Merge a nested outcome, qualifying its failed field names.
    fn nest(&mut self, field: &str, outcome: BuildOutcome) -> FieldValue {
        self.failures.extend(outcome.failures.into_iter().map(|mut f| {
            f.field_name = format!("{}.{}", field, f.field_name);
            f
        }));
        FieldValue::Record(outcome.record)
    }

    fn finish(self, schema: &Schema) -> Result<BuildOutcome> {
        let outcome = BuildOutcome {
            record: self.record,
            failures: self.failures,
        };
        validate(&outcome.record, schema, &outcome.failed_fields())?;
        tracing::debug!(
            "Built {} {} ({}) with {} failed fields",
            schema.entity,
            self.ctx.entity_id,
            self.ctx.entity_name,
            outcome.failures.len()
        );
        Ok(outcome)
    }
}

fn derivations(schema: &Schema) -> impl Iterator<Item = (&'static str, Derivation)> + '_ {
    schema.fields.iter().filter_map(|spec| match spec.source {
        Source::Derived(derivation) => Some((spec.name, derivation)),
        Source::Raw { .. } => None,
    })
}

/// Label of the current infobox version, e.g. `"Lv 96"` for `version1 = Lv 96`.
fn version_label(raw: &RawFieldMap, ctx: &EntityContext) -> Option<String> {
    let version = ctx.version()?;
    let label = clean_wikitext(&raw.get(&format!("version{}", version))?.as_text());
    non_empty(label)
}

fn wiki_name(raw: &RawFieldMap, ctx: &EntityContext) -> String {
    match version_label(raw, ctx) {
        Some(label) => format!("{} ({})", ctx.entity_name, label),
        None => ctx.entity_name.clone(),
    }
}

fn wiki_url(raw: &RawFieldMap, ctx: &EntityContext) -> String {
    let page = ctx.entity_name.replace(' ', "_");
    match version_label(raw, ctx) {
        Some(label) => format!("{}{}#{}", WIKI_URL_PREFIX, page, label.replace(' ', "_")),
        None => format!("{}{}", WIKI_URL_PREFIX, page),
    }
}

/// Shared derivations; anything entity-specific returns `None`.
fn derive_common(derivation: Derivation, raw: &RawFieldMap, ctx: &EntityContext) -> Option<FieldValue> {
    let value = match derivation {
        Derivation::EntityId => FieldValue::Int(ctx.entity_id),
        Derivation::EntityName => FieldValue::Text(ctx.entity_name.clone()),
        Derivation::WikiName => FieldValue::Text(wiki_name(raw, ctx)),
        Derivation::WikiUrl => FieldValue::Text(wiki_url(raw, ctx)),
        _ => return None,
    };
    Some(value)
}

/// Build an item record. `bonuses` is the Infobox Bonuses map of equipable items.
pub fn build_item(raw: &RawFieldMap, bonuses: Option<&RawFieldMap>, ctx: &EntityContext) -> Result<BuildOutcome> {
    let mut builder = RecordBuilder::new(ctx);
    builder.fill_raw(&ITEM_SCHEMA, raw);

    let cost = builder.record.get("cost").and_then(FieldValue::as_int);
    let alchable = raw
        .get_versioned("alchable", ctx.version())
        .map(|v| clean_wikitext(&v.as_text()).to_lowercase())
        .is_none_or(|v| v != "no");
    let equipable = builder
        .record
        .get("equipable")
        .and_then(FieldValue::as_bool)
        .unwrap_or(false);

    for (name, derivation) in derivations(&ITEM_SCHEMA) {
        let value = match derive_common(derivation, raw, ctx) {
            Some(value) => value,
            None => match derivation {
                Derivation::LowAlch => alch_value(cost, alchable, 2),
                Derivation::HighAlch => alch_value(cost, alchable, 3),
                Derivation::EquipmentBonuses => match bonuses.filter(|_| equipable) {
                    Some(bonuses) => {
                        let outcome = build_equipment_bonuses(bonuses, ctx)?;
                        builder.nest(name, outcome)
                    }
                    None => FieldValue::Null,
                },
                Derivation::EquipmentSlot => match bonuses.filter(|_| equipable) {
                    Some(bonuses) => {
                        let outcome = build_equipment_slot(bonuses, ctx)?;
                        builder.nest(name, outcome)
                    }
                    None => FieldValue::Null,
                },
                other => {
                    tracing::warn!("Derivation {:?} has no meaning for items", other);
                    FieldValue::Null
                }
            },
        };
        builder.record.set(name, value);
    }

    builder.finish(&ITEM_SCHEMA)
}

/// Alchemy value as `fifths / 5` of the item cost, rounded down. Null if the product overflows.
fn alch_value(cost: Option<i64>, alchable: bool, fifths: i64) -> FieldValue {
    match cost.filter(|_| alchable).and_then(|cost| cost.checked_mul(fifths)) {
        Some(scaled) => FieldValue::Int(scaled.div_euclid(5)),
        None => FieldValue::Null,
    }
}

pub fn build_equipment_bonuses(raw: &RawFieldMap, ctx: &EntityContext) -> Result<BuildOutcome> {
    let mut builder = RecordBuilder::new(ctx);
    builder.fill_raw(&EQUIPMENT_BONUS_SCHEMA, raw);
    builder.finish(&EQUIPMENT_BONUS_SCHEMA)
}

pub fn build_equipment_slot(raw: &RawFieldMap, ctx: &EntityContext) -> Result<BuildOutcome> {
    let mut builder = RecordBuilder::new(ctx);
    builder.fill_raw(&EQUIPMENT_SLOT_SCHEMA, raw);
    builder.finish(&EQUIPMENT_SLOT_SCHEMA)
}

/// Build a monster record from its infobox and drops lines.
pub fn build_monster(raw: &RawFieldMap, drops: &[RawFieldMap], ctx: &EntityContext) -> Result<BuildOutcome> {
    let mut builder = RecordBuilder::new(ctx);
    builder.fill_raw(&MONSTER_SCHEMA, raw);

    let on_slayer_list = ["slayer_level", "slayer_xp"]
        .iter()
        .any(|f| builder.record.get(f).is_some_and(|v| !v.is_null()));

    for (name, derivation) in derivations(&MONSTER_SCHEMA) {
        let value = match derive_common(derivation, raw, ctx) {
            Some(value) => value,
            None => match derivation {
                Derivation::SlayerMonster => FieldValue::Bool(on_slayer_list),
                Derivation::Drops => {
                    let (entries, failures) = build_drops(drops, ctx);
                    builder.failures.extend(failures);
                    FieldValue::Drops(entries)
                }
                other => {
                    tracing::warn!("Derivation {:?} has no meaning for monsters", other);
                    FieldValue::Null
                }
            },
        };
        builder.record.set(name, value);
    }

    builder.finish(&MONSTER_SCHEMA)
}

/// Build drop entries. Failures are named `drops[<index>].<field>`.
pub fn build_drops(drops: &[RawFieldMap], ctx: &EntityContext) -> (Vec<DropEntry>, Vec<NormalizationError>) {
    let mut entries = Vec::with_capacity(drops.len());
    let mut failures = Vec::new();

    for (i, drop) in drops.iter().enumerate() {
        let text = |key: &str| drop.get_versioned(key, ctx.version()).map(|v| v.as_text().into_owned());

        let item_name = text("name").map(|n| clean_wikitext(&n)).unwrap_or_default();
        if item_name.is_empty() {
            failures.push(NormalizationError::new(
                ctx.entity_id,
                format!("drops[{}].name", i),
                &text("name").unwrap_or_default(),
                CleanError::Unrecognized {
                    field: "drop name",
                    value: String::new(),
                },
            ));
            continue;
        }

        let raw_quantity = text("quantity");
        let (quantity, noted) = match drop_quantity(raw_quantity.as_deref()) {
            Ok(parsed) => parsed,
            Err(reason) => {
                failures.push(NormalizationError::new(
                    ctx.entity_id,
                    format!("drops[{}].quantity", i),
                    raw_quantity.as_deref().unwrap_or_default(),
                    reason,
                ));
                (None, false)
            }
        };

        let raw_rarity = text("rarity");
        let rarity = match drop_rarity(raw_rarity.as_deref(), ctx.base_value) {
            Some(r) if r > 0.0 && r <= 1.0 => Some(r),
            Some(r) => {
                tracing::warn!(
                    "Drop {:?} of {} has rarity {} outside (0, 1], recording null",
                    item_name,
                    ctx.entity_name,
                    r
                );
                None
            }
            None => None,
        };

        let notes = ["namenotes", "raritynotes"]
            .iter()
            .filter_map(|key| text(*key))
            .collect::<Vec<_>>()
            .join(" ");
        let requirements = drop_requirements(Some(&notes));

        entries.push(DropEntry {
            item_name,
            quantity,
            noted,
            rarity,
            requirements,
        });
    }

    (entries, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DropRequirement, Skill};

    fn map(pairs: &[(&str, &str)]) -> RawFieldMap {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_cleaner_runs_generic_pass_first() {
        let ctx = EntityContext::new(1, "Iron dagger");
        let value = apply_cleaner(Cleaner::Bool, &RawValue::from("[[Yes]] <!-- note -->"), &ctx).unwrap();
        assert_eq!(value, FieldValue::Bool(true));
    }

    #[test]
    fn test_weight_cleaner_sees_line_breaks() {
        let ctx = EntityContext::new(10023, "Falconer's glove");
        let raw = RawValue::from("'''With falcon:''' 1.814 kg<br/>'''Without falcon:''' 0.907 kg");
        assert_eq!(apply_cleaner(Cleaner::Weight, &raw, &ctx), Ok(FieldValue::Float(0.907)));
    }

    #[test]
    fn test_item_defaults_and_alchemy() {
        let ctx = EntityContext::new(1203, "Iron dagger");
        let raw = map(&[
            ("members", "No"),
            ("tradeable", "Yes"),
            ("value", "35"),
            ("weight", "0.453"),
            ("release", "[[27 February]] [[2001]]"),
            ("examine", "Short but pointy."),
        ]);
        let outcome = build_item(&raw, None, &ctx).unwrap();
        assert!(outcome.is_complete());
        let r = &outcome.record;
        assert_eq!(r.get("lowalch"), Some(&FieldValue::Int(14)));
        assert_eq!(r.get("highalch"), Some(&FieldValue::Int(21)));
        assert_eq!(r.get("buy_limit"), Some(&FieldValue::Int(-1)));
        assert_eq!(r.get("quest_item"), Some(&FieldValue::Bool(false)));
        assert_eq!(r.get("equipment"), Some(&FieldValue::Null));
        assert_eq!(
            r.get("wiki_url"),
            Some(&FieldValue::Text("https://oldschool.runescape.wiki/w/Iron_dagger".into()))
        );
    }

    #[test]
    fn test_oversized_cost_has_no_alch_values() {
        let ctx = EntityContext::new(3, "Overpriced hat");
        let raw = map(&[("value", "4000000000000000000")]);
        let outcome = build_item(&raw, None, &ctx).unwrap();
        assert_eq!(outcome.record.get("cost"), Some(&FieldValue::Int(4_000_000_000_000_000_000)));
        assert_eq!(outcome.record.get("lowalch"), Some(&FieldValue::Int(1_600_000_000_000_000_000)));
        assert_eq!(outcome.record.get("highalch"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_exempt_cleaners_ignore_commented_markup() {
        let ctx = EntityContext::new(1, "Plain rock");
        let raw = map(&[
            ("weight", "2<!-- was [[3]] kg<br/>before the update -->"),
            ("quest", "No<!-- see [[Dragon Slayer I]] -->"),
        ]);
        let outcome = build_item(&raw, None, &ctx).unwrap();
        assert!(outcome.is_complete(), "{:?}", outcome.failures);
        assert_eq!(outcome.record.get("weight"), Some(&FieldValue::Float(2.0)));
        assert_eq!(outcome.record.get("quest_item"), Some(&FieldValue::Bool(false)));

        let ctx = EntityContext::new(2, "Plain goblin");
        let raw = map(&[("hitpoints", "5<!-- [[Varies]] (10) -->")]);
        let outcome = build_monster(&raw, &[], &ctx).unwrap();
        assert!(outcome.is_complete(), "{:?}", outcome.failures);
        assert_eq!(outcome.record.get("hitpoints"), Some(&FieldValue::Int(5)));
    }

    #[test]
    fn test_not_alchable_item_has_no_alch_values() {
        let ctx = EntityContext::new(995, "Coins");
        let raw = map(&[("value", "1"), ("alchable", "No")]);
        let outcome = build_item(&raw, None, &ctx).unwrap();
        assert_eq!(outcome.record.get("lowalch"), Some(&FieldValue::Null));
        assert_eq!(outcome.record.get("highalch"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_hard_failures_are_collected_not_raised() {
        let ctx = EntityContext::new(7, "Mystery box");
        let raw = map(&[("weight", "heavy"), ("tradeable", "Sometimes"), ("examine", "Hmm.")]);
        let outcome = build_item(&raw, None, &ctx).unwrap();
        let failed = outcome.failed_fields();
        assert_eq!(failed, vec!["tradeable", "weight"]);
        assert_eq!(outcome.record.get("weight"), Some(&FieldValue::Null));
        assert_eq!(outcome.record.get("examine"), Some(&FieldValue::Text("Hmm.".into())));
        assert_eq!(outcome.failures[1].raw_value, "heavy");
        assert_eq!(outcome.failures[1].entity_id, 7);
    }

    #[test]
    fn test_equipable_item_gets_nested_records() {
        let ctx = EntityContext::new(4151, "Abyssal whip");
        let raw = map(&[("equipable", "Yes"), ("value", "120001")]);
        let bonuses = map(&[
            ("aslash", "+82"),
            ("str", "+82"),
            ("mdmg", "0%"),
            ("slot", "Weapon"),
            ("speed", "4"),
            ("requirements", "{{SCP|Attack|70}}"),
        ]);
        let outcome = build_item(&raw, Some(&bonuses), &ctx).unwrap();
        assert!(outcome.is_complete(), "{:?}", outcome.failures);

        let equipment = outcome.record.get("equipment").and_then(FieldValue::as_record).unwrap();
        assert_eq!(equipment.get("attack_slash"), Some(&FieldValue::Int(82)));
        assert_eq!(equipment.get("attack_stab"), Some(&FieldValue::Int(0)));
        assert_eq!(equipment.get("melee_strength"), Some(&FieldValue::Int(82)));

        let slot = outcome.record.get("equipment_slot").and_then(FieldValue::as_record).unwrap();
        assert_eq!(slot.get("slot"), Some(&FieldValue::Text("weapon".into())));
        assert_eq!(slot.get("attack_speed"), Some(&FieldValue::Int(4)));
        match slot.get("requirements") {
            Some(FieldValue::Requirements(reqs)) => {
                assert_eq!(reqs.len(), 1);
                assert_eq!(reqs[0].skill, Skill::Attack);
                assert_eq!(reqs[0].level, 70);
            }
            other => panic!("unexpected requirements {:?}", other),
        }
    }

    #[test]
    fn test_nested_failures_are_qualified() {
        let ctx = EntityContext::new(1, "Odd helm");
        let raw = map(&[("equipable", "Yes")]);
        let bonuses = map(&[("dstab", "lots")]);
        let outcome = build_item(&raw, Some(&bonuses), &ctx).unwrap();
        assert_eq!(outcome.failed_fields(), vec!["equipment.defence_stab"]);
    }

    #[test]
    fn test_versioned_monster_uses_suffixed_keys() {
        let raw = map(&[
            ("version1", "Lv 96"),
            ("version2", "Lv 98"),
            ("combat1", "96"),
            ("combat2", "98"),
            ("att1", "80"),
            ("att2", "90"),
            ("hitpoints", "120"),
        ]);
        let ctx = EntityContext::new(100, "Ogre chieftain").with_version("2");
        let outcome = build_monster(&raw, &[], &ctx).unwrap();
        let r = &outcome.record;
        assert_eq!(r.get("combat_level"), Some(&FieldValue::Int(98)));
        assert_eq!(r.get("attack_level"), Some(&FieldValue::Int(90)));
        assert_eq!(r.get("hitpoints"), Some(&FieldValue::Int(120)));
        assert_eq!(r.get("wiki_name"), Some(&FieldValue::Text("Ogre chieftain (Lv 98)".into())));
        assert_eq!(
            r.get("wiki_url"),
            Some(&FieldValue::Text("https://oldschool.runescape.wiki/w/Ogre_chieftain#Lv_98".into()))
        );
    }

    #[test]
    fn test_monster_slayer_flag_is_derived() {
        let ctx = EntityContext::new(415, "Abyssal demon");
        let raw = map(&[("slaylvl", "85"), ("slayxp", "150"), ("cat", "Abyssal demons")]);
        let outcome = build_monster(&raw, &[], &ctx).unwrap();
        let r = &outcome.record;
        assert_eq!(r.get("slayer_monster"), Some(&FieldValue::Bool(true)));
        assert_eq!(r.get("slayer_xp"), Some(&FieldValue::Float(150.0)));
        assert_eq!(r.get("category"), Some(&FieldValue::List(vec!["abyssal demon".into()])));
        assert_eq!(r.get("size"), Some(&FieldValue::Int(1)));
    }

    #[test]
    fn test_drops_are_cleaned_and_rarity_kept_in_range() {
        let ctx = EntityContext::new(2, "Green dragon").with_base_value(1.0 / 64.0);
        let drops = vec![
            map(&[("name", "[[Dragon bones]]"), ("quantity", "1"), ("rarity", "Always")]),
            map(&[("name", "Grimy ranarr weed"), ("quantity", "1"), ("rarity", "1/{{#expr:1/(2*{{{herbbase}}})}}")]),
            map(&[("name", "Coins"), ("quantity", "44 (noted)"), ("rarity", "not a fraction")]),
            map(&[("name", "Ensouled dragon head"), ("quantity", "1"), ("rarity", "1/20"), ("raritynotes", "Wilderness only")]),
            map(&[("name", "Bad"), ("quantity", "a few"), ("rarity", "1/8")]),
        ];
        let (entries, failures) = build_drops(&drops, &ctx);
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].item_name, "Dragon bones");
        assert_eq!(entries[0].rarity, Some(1.0));
        assert_eq!(entries[1].rarity, Some(1.0 / 32.0));
        assert_eq!(entries[2].quantity.as_deref(), Some("44"));
        assert!(entries[2].noted);
        assert_eq!(entries[2].rarity, None);
        assert_eq!(entries[3].requirements, Some(DropRequirement::WildernessOnly));
        assert_eq!(entries[4].quantity, None);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].field_name, "drops[4].quantity");
        assert_eq!(failures[0].reason, CleanError::InvalidQuantity("a few".into()));
        for entry in &entries {
            if let Some(r) = entry.rarity {
                assert!(r > 0.0 && r <= 1.0);
            }
        }
    }
}
