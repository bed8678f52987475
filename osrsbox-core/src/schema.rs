//! Declarative record schemas and the validation boundary.
//!
//! Each entity type is an ordered list of fields. A field is either read from a
//! raw infobox key through a [`Cleaner`], or derived by the builder from the
//! entity context and the other fields.

use crate::error::{OsrsboxError, Result};
use crate::models::{FieldValue, TypedRecord};
use std::fmt;

/// Expected type of a record field.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Int,
    Float,
    Bool,
    Text,
    Date,
    List,
    Record(&'static Schema),
    Drops,
    Requirements,
}

/// Field cleaner applied to a raw infobox value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleaner {
    Bool,
    Coins,
    Weight,
    QuestItem,
    Tradeable,
    ReleaseDate,
    Examine,
    CombatLevel,
    MaxHit,
    Hitpoints,
    StatsValue,
    MonsterStat,
    PercentValue,
    OptionalInt,
    AttackType,
    Attributes,
    Category,
    TextList,
    SlayerXp,
    Slot,
    Requirements,
}

impl Cleaner {
    /// Whether the generic wikitext pass runs before this cleaner.
    ///
    /// Cleaners that read line breaks, comments or link markers get the raw text.
    pub fn pre_clean(self) -> bool {
        !matches!(self, Cleaner::Weight | Cleaner::QuestItem | Cleaner::Hitpoints)
    }

    /// Whether a list value should be joined rather than reduced to its first entry.
    pub fn reads_list(self) -> bool {
        matches!(
            self,
            Cleaner::Attributes | Cleaner::Category | Cleaner::TextList | Cleaner::AttackType
        )
    }
}

/// Fields computed by the builder instead of read from a raw key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    EntityId,
    EntityName,
    WikiName,
    WikiUrl,
    LowAlch,
    HighAlch,
    SlayerMonster,
    EquipmentBonuses,
    EquipmentSlot,
    Drops,
}

/// Value used when a raw key is absent, or a non-nullable field cleans to nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fallback {
    Null,
    Int(i64),
    Bool(bool),
    Empty,
}

impl Fallback {
    pub fn value(self, kind: FieldKind) -> FieldValue {
        match self {
            Fallback::Null => FieldValue::Null,
            Fallback::Int(v) => FieldValue::Int(v),
            Fallback::Bool(v) => FieldValue::Bool(v),
            Fallback::Empty => match kind {
                FieldKind::List => FieldValue::List(Vec::new()),
                FieldKind::Requirements => FieldValue::Requirements(Vec::new()),
                FieldKind::Drops => FieldValue::Drops(Vec::new()),
                _ => FieldValue::Null,
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Source {
    Raw {
        key: &'static str,
        cleaner: Cleaner,
        fallback: Fallback,
    },
    Derived(Derivation),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
    pub source: Source,
}

#[derive(Debug)]
pub struct Schema {
    pub entity: &'static str,
    pub fields: &'static [FieldSpec],
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }
}

const fn raw(name: &'static str, kind: FieldKind, nullable: bool, key: &'static str, cleaner: Cleaner, fallback: Fallback) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        nullable,
        source: Source::Raw { key, cleaner, fallback },
    }
}

const fn derived(name: &'static str, kind: FieldKind, nullable: bool, derivation: Derivation) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        nullable,
        source: Source::Derived(derivation),
    }
}

const fn flag(name: &'static str, key: &'static str, cleaner: Cleaner) -> FieldSpec {
    raw(name, FieldKind::Bool, false, key, cleaner, Fallback::Bool(false))
}

const fn bonus(name: &'static str, key: &'static str, cleaner: Cleaner) -> FieldSpec {
    raw(name, FieldKind::Int, false, key, cleaner, Fallback::Int(0))
}

pub static EQUIPMENT_BONUS_SCHEMA: Schema = Schema {
    entity: "equipment",
    fields: &[
        bonus("attack_stab", "astab", Cleaner::StatsValue),
        bonus("attack_slash", "aslash", Cleaner::StatsValue),
        bonus("attack_crush", "acrush", Cleaner::StatsValue),
        bonus("attack_magic", "amagic", Cleaner::StatsValue),
        bonus("attack_ranged", "arange", Cleaner::StatsValue),
        bonus("defence_stab", "dstab", Cleaner::StatsValue),
        bonus("defence_slash", "dslash", Cleaner::StatsValue),
        bonus("defence_crush", "dcrush", Cleaner::StatsValue),
        bonus("defence_magic", "dmagic", Cleaner::StatsValue),
        bonus("defence_ranged", "drange", Cleaner::StatsValue),
        bonus("melee_strength", "str", Cleaner::StatsValue),
        bonus("ranged_strength", "rstr", Cleaner::StatsValue),
        bonus("magic_damage", "mdmg", Cleaner::PercentValue),
        bonus("prayer", "prayer", Cleaner::StatsValue),
    ],
};

pub static EQUIPMENT_SLOT_SCHEMA: Schema = Schema {
    entity: "equipment_slot",
    fields: &[
        raw("slot", FieldKind::Text, true, "slot", Cleaner::Slot, Fallback::Null),
        raw("attack_speed", FieldKind::Int, true, "speed", Cleaner::OptionalInt, Fallback::Null),
        raw("requirements", FieldKind::Requirements, false, "requirements", Cleaner::Requirements, Fallback::Empty),
    ],
};

pub static ITEM_SCHEMA: Schema = Schema {
    entity: "item",
    fields: &[
        derived("id", FieldKind::Int, false, Derivation::EntityId),
        derived("name", FieldKind::Text, false, Derivation::EntityName),
        flag("members", "members", Cleaner::Bool),
        flag("tradeable", "tradeable", Cleaner::Tradeable),
        flag("tradeable_on_ge", "exchange", Cleaner::Bool),
        flag("stackable", "stackable", Cleaner::Bool),
        flag("noteable", "noteable", Cleaner::Bool),
        flag("equipable", "equipable", Cleaner::Bool),
        raw("cost", FieldKind::Int, true, "value", Cleaner::Coins, Fallback::Null),
        derived("lowalch", FieldKind::Int, true, Derivation::LowAlch),
        derived("highalch", FieldKind::Int, true, Derivation::HighAlch),
        raw("weight", FieldKind::Float, true, "weight", Cleaner::Weight, Fallback::Null),
        raw("buy_limit", FieldKind::Int, false, "buylimit", Cleaner::OptionalInt, Fallback::Int(-1)),
        flag("quest_item", "quest", Cleaner::QuestItem),
        raw("release_date", FieldKind::Date, true, "release", Cleaner::ReleaseDate, Fallback::Null),
        raw("examine", FieldKind::Text, true, "examine", Cleaner::Examine, Fallback::Null),
        derived("wiki_name", FieldKind::Text, false, Derivation::WikiName),
        derived("wiki_url", FieldKind::Text, false, Derivation::WikiUrl),
        derived("equipment", FieldKind::Record(&EQUIPMENT_BONUS_SCHEMA), true, Derivation::EquipmentBonuses),
        derived("equipment_slot", FieldKind::Record(&EQUIPMENT_SLOT_SCHEMA), true, Derivation::EquipmentSlot),
    ],
};

pub static MONSTER_SCHEMA: Schema = Schema {
    entity: "monster",
    fields: &[
        derived("id", FieldKind::Int, false, Derivation::EntityId),
        derived("name", FieldKind::Text, false, Derivation::EntityName),
        flag("members", "members", Cleaner::Bool),
        raw("release_date", FieldKind::Date, true, "release", Cleaner::ReleaseDate, Fallback::Null),
        raw("combat_level", FieldKind::Int, true, "combat", Cleaner::CombatLevel, Fallback::Null),
        raw("size", FieldKind::Int, false, "size", Cleaner::OptionalInt, Fallback::Int(1)),
        raw("hitpoints", FieldKind::Int, true, "hitpoints", Cleaner::Hitpoints, Fallback::Null),
        raw("max_hit", FieldKind::Int, true, "max hit", Cleaner::MaxHit, Fallback::Null),
        raw("attack_type", FieldKind::List, false, "attack style", Cleaner::AttackType, Fallback::Empty),
        raw("attack_speed", FieldKind::Int, true, "attack speed", Cleaner::OptionalInt, Fallback::Null),
        flag("aggressive", "aggressive", Cleaner::Bool),
        flag("poisonous", "poisonous", Cleaner::Bool),
        flag("venomous", "venomous", Cleaner::Bool),
        flag("immune_poison", "immunepoison", Cleaner::Bool),
        flag("immune_venom", "immunevenom", Cleaner::Bool),
        raw("attributes", FieldKind::List, true, "attributes", Cleaner::Attributes, Fallback::Null),
        raw("category", FieldKind::List, false, "cat", Cleaner::Category, Fallback::Empty),
        derived("slayer_monster", FieldKind::Bool, false, Derivation::SlayerMonster),
        raw("slayer_level", FieldKind::Int, true, "slaylvl", Cleaner::OptionalInt, Fallback::Null),
        raw("slayer_xp", FieldKind::Float, true, "slayxp", Cleaner::SlayerXp, Fallback::Null),
        raw("slayer_masters", FieldKind::List, false, "assignedby", Cleaner::TextList, Fallback::Empty),
        raw("examine", FieldKind::Text, true, "examine", Cleaner::Examine, Fallback::Null),
        derived("wiki_name", FieldKind::Text, false, Derivation::WikiName),
        derived("wiki_url", FieldKind::Text, false, Derivation::WikiUrl),
        bonus("attack_level", "att", Cleaner::MonsterStat),
        bonus("strength_level", "str", Cleaner::MonsterStat),
        bonus("defence_level", "def", Cleaner::MonsterStat),
        bonus("magic_level", "mage", Cleaner::MonsterStat),
        bonus("ranged_level", "range", Cleaner::MonsterStat),
        bonus("attack_bonus", "attbns", Cleaner::MonsterStat),
        bonus("strength_bonus", "strbns", Cleaner::MonsterStat),
        bonus("attack_magic", "amagic", Cleaner::MonsterStat),
        bonus("magic_bonus", "mbns", Cleaner::MonsterStat),
        bonus("attack_ranged", "arange", Cleaner::MonsterStat),
        bonus("ranged_bonus", "rngbns", Cleaner::MonsterStat),
        bonus("defence_stab", "dstab", Cleaner::MonsterStat),
        bonus("defence_slash", "dslash", Cleaner::MonsterStat),
        bonus("defence_crush", "dcrush", Cleaner::MonsterStat),
        bonus("defence_magic", "dmagic", Cleaner::MonsterStat),
        bonus("defence_ranged", "drange", Cleaner::MonsterStat),
        derived("drops", FieldKind::Drops, false, Derivation::Drops),
    ],
};

/// One way a record does not conform to its schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a record against its schema.
///
/// Fields listed in `failed` hard-failed during cleaning; they may be null
/// even when the schema says otherwise.
pub fn check_record(record: &TypedRecord, schema: &Schema, failed: &[String]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    check_into(record, schema, failed, "", &mut issues);
    issues
}

fn check_into(record: &TypedRecord, schema: &Schema, failed: &[String], prefix: &str, issues: &mut Vec<ValidationIssue>) {
    let mut issue = |field: &str, message: String| {
        issues.push(ValidationIssue {
            field: format!("{}{}", prefix, field),
            message,
        })
    };

    let expected: Vec<&str> = schema.names().collect();
    let actual: Vec<&str> = record.keys().collect();
    if expected != actual {
        for name in &expected {
            if !actual.contains(name) {
                issue(name, "missing from record".to_string());
            }
        }
        for name in &actual {
            if !expected.contains(name) {
                issue(name, format!("not declared by the {} schema", schema.entity));
            }
        }
        if issues_is_order_only(&expected, &actual) {
            issue("*", "fields out of schema order".to_string());
        }
    }

    let mut nested = Vec::new();
    for spec in schema.fields {
        let Some(value) = record.get(spec.name) else {
            continue;
        };
        let qualified = format!("{}{}", prefix, spec.name);
        if value.is_null() {
            if !spec.nullable && !failed.contains(&qualified) {
                issue(spec.name, "null in a non-nullable field".to_string());
            }
            continue;
        }
        match (spec.kind, value) {
            (FieldKind::Int, FieldValue::Int(_))
            | (FieldKind::Float, FieldValue::Float(_))
            | (FieldKind::Bool, FieldValue::Bool(_))
            | (FieldKind::Text, FieldValue::Text(_))
            | (FieldKind::Date, FieldValue::Date(_))
            | (FieldKind::List, FieldValue::List(_)) => {}
            (FieldKind::Record(inner), FieldValue::Record(r)) => {
                nested.push((inner, r, format!("{}.", qualified)));
            }
            (FieldKind::Drops, FieldValue::Drops(drops)) => {
                for (i, drop) in drops.iter().enumerate() {
                    if let Some(rarity) = drop.rarity {
                        if !(rarity > 0.0 && rarity <= 1.0) {
                            issue(spec.name, format!("drop {} rarity {} outside (0, 1]", i, rarity));
                        }
                    }
                }
            }
            (FieldKind::Requirements, FieldValue::Requirements(reqs)) => {
                for req in reqs {
                    if !(1..=99).contains(&req.level) {
                        issue(spec.name, format!("requirement level {} outside 1..=99", req.level));
                    }
                }
            }
            (kind, other) => {
                issue(spec.name, format!("expected {:?}, found {:?}", kind_name(kind), other));
            }
        }
    }

    for (inner, r, nested_prefix) in nested {
        check_into(r, inner, failed, &nested_prefix, issues);
    }
}

fn issues_is_order_only(expected: &[&str], actual: &[&str]) -> bool {
    expected.len() == actual.len() && expected.iter().all(|name| actual.contains(name))
}

fn kind_name(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Int => "int",
        FieldKind::Float => "float",
        FieldKind::Bool => "bool",
        FieldKind::Text => "text",
        FieldKind::Date => "date",
        FieldKind::List => "list",
        FieldKind::Record(_) => "record",
        FieldKind::Drops => "drops",
        FieldKind::Requirements => "requirements",
    }
}

/// Validate a record, failing with every issue found.
pub fn validate(record: &TypedRecord, schema: &Schema, failed: &[String]) -> Result<()> {
    let issues = check_record(record, schema, failed);
    if issues.is_empty() {
        return Ok(());
    }
    let joined = issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
    Err(OsrsboxError::Validation(format!("{} record: {}", schema.entity, joined)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DropEntry;

    fn complete_slot_record() -> TypedRecord {
        let mut record = TypedRecord::new();
        record.set("slot", FieldValue::Text("head".into()));
        record.set("attack_speed", FieldValue::Null);
        record.set("requirements", FieldValue::Requirements(vec![]));
        record
    }

    #[test]
    fn test_schemas_have_unique_field_names() {
        for schema in [&ITEM_SCHEMA, &MONSTER_SCHEMA, &EQUIPMENT_BONUS_SCHEMA, &EQUIPMENT_SLOT_SCHEMA] {
            let mut names: Vec<&str> = schema.names().collect();
            let total = names.len();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), total, "{}", schema.entity);
        }
    }

    #[test]
    fn test_complete_record_validates() {
        assert!(validate(&complete_slot_record(), &EQUIPMENT_SLOT_SCHEMA, &[]).is_ok());
    }

    #[test]
    fn test_missing_and_extra_fields_are_reported() {
        let mut record = TypedRecord::new();
        record.set("slot", FieldValue::Text("head".into()));
        record.set("colour", FieldValue::Text("red".into()));
        let issues = check_record(&record, &EQUIPMENT_SLOT_SCHEMA, &[]);
        let fields: Vec<&str> = issues.iter().map(|i| i.field.as_str()).collect();
        assert!(fields.contains(&"attack_speed"));
        assert!(fields.contains(&"requirements"));
        assert!(fields.contains(&"colour"));
    }

    #[test]
    fn test_wrong_type_is_reported() {
        let mut record = complete_slot_record();
        record.set("attack_speed", FieldValue::Text("4".into()));
        let issues = check_record(&record, &EQUIPMENT_SLOT_SCHEMA, &[]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "attack_speed");
    }

    #[test]
    fn test_null_allowed_only_for_failed_non_nullable_fields() {
        let mut record = complete_slot_record();
        record.set("requirements", FieldValue::Null);
        assert_eq!(check_record(&record, &EQUIPMENT_SLOT_SCHEMA, &[]).len(), 1);
        assert!(check_record(&record, &EQUIPMENT_SLOT_SCHEMA, &["requirements".to_string()]).is_empty());
    }

    #[test]
    fn test_out_of_range_rarity_is_reported() {
        let drop = DropEntry {
            item_name: "Bones".into(),
            quantity: Some("1".into()),
            noted: false,
            rarity: Some(0.0),
            requirements: None,
        };
        let spec = MONSTER_SCHEMA.field("drops").unwrap();
        assert!(matches!(spec.kind, FieldKind::Drops));
        let mut record = TypedRecord::new();
        for field in MONSTER_SCHEMA.fields {
            record.set(field.name, FieldValue::Null);
        }
        record.set("drops", FieldValue::Drops(vec![drop]));
        let failed: Vec<String> = MONSTER_SCHEMA.names().map(str::to_string).collect();
        let issues = check_record(&record, &MONSTER_SCHEMA, &failed);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("outside (0, 1]"));
    }
}
