//! Data models for raw infobox input and typed record output.

use chrono::NaiveDate;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;

/// One raw infobox value. Duplicate or multi-line keys arrive as a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Text(String),
    List(Vec<String>),
}

impl RawValue {
    /// Text form used by scalar cleaners: a list yields its first non-empty entry.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            RawValue::Text(s) => Cow::Borrowed(s.as_str()),
            RawValue::List(items) => Cow::Owned(
                items
                    .iter()
                    .find(|s| !s.trim().is_empty())
                    .cloned()
                    .unwrap_or_default(),
            ),
        }
    }

    /// Text form used by list cleaners: every entry, joined.
    pub fn joined(&self, sep: &str) -> Cow<'_, str> {
        match self {
            RawValue::Text(s) => Cow::Borrowed(s.as_str()),
            RawValue::List(items) => Cow::Owned(items.join(sep)),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

/// Field name -> raw wiki text for one infobox, as delivered by the tokenizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawFieldMap {
    fields: HashMap<String, RawValue>,
}

impl RawFieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.fields.get(key)
    }

    /// Look up `{key}{version}` first, then the bare `key`.
    pub fn get_versioned(&self, key: &str, version: Option<&str>) -> Option<&RawValue> {
        if let Some(version) = version.filter(|v| !v.is_empty()) {
            if let Some(value) = self.fields.get(&format!("{}{}", key, version)) {
                return Some(value);
            }
        }
        self.fields.get(key)
    }

    /// Version suffixes declared through `version1`, `version2`, ... keys, in numeric order.
    pub fn versions(&self) -> Vec<String> {
        let mut numbers: Vec<u32> = self
            .fields
            .keys()
            .filter_map(|k| k.strip_prefix("version"))
            .filter_map(|suffix| suffix.parse().ok())
            .collect();
        numbers.sort_unstable();
        numbers.dedup();
        numbers.into_iter().map(|n| n.to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for RawFieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Identifiers needed by context-sensitive cleaners.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityContext {
    pub entity_id: i64,
    pub entity_name: String,
    /// Base probability for skill-dependent drop table formulas.
    pub base_value: Option<f64>,
    /// Suffix of the infobox version being built (`"1"`, `"2"`, ...).
    pub current_version: Option<String>,
}

impl EntityContext {
    pub fn new(entity_id: i64, entity_name: impl Into<String>) -> Self {
        Self {
            entity_id,
            entity_name: entity_name.into(),
            base_value: None,
            current_version: None,
        }
    }

    pub fn with_base_value(mut self, base_value: f64) -> Self {
        self.base_value = Some(base_value);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = Some(version.into());
        self
    }

    pub fn version(&self) -> Option<&str> {
        self.current_version.as_deref()
    }
}

/// One raw entity as read from the extraction collaborator's JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEntity {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub base_value: Option<f64>,
    pub infobox: RawFieldMap,
    /// Infobox Bonuses block, present for equipable items.
    #[serde(default)]
    pub bonuses: Option<RawFieldMap>,
    /// One map per drops line, monsters only.
    #[serde(default)]
    pub drops: Vec<RawFieldMap>,
}

impl RawEntity {
    /// One context per declared infobox version, or a single unversioned one.
    pub fn contexts(&self) -> Vec<EntityContext> {
        let base = EntityContext {
            entity_id: self.id,
            entity_name: self.name.clone(),
            base_value: self.base_value,
            current_version: None,
        };
        let versions = self.infobox.versions();
        if versions.is_empty() {
            return vec![base];
        }
        versions
            .into_iter()
            .map(|v| base.clone().with_version(v))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skill {
    Attack,
    Strength,
    Defence,
    Ranged,
    Prayer,
    Magic,
    Runecraft,
    Hitpoints,
    Crafting,
    Mining,
    Smithing,
    Fishing,
    Cooking,
    Firemaking,
    Woodcutting,
    Agility,
    Herblore,
    Thieving,
    Fletching,
    Slayer,
    Farming,
    Construction,
    Hunter,
}

impl Skill {
    pub fn from_name(name: &str) -> Option<Self> {
        let skill = match name.trim().to_lowercase().as_str() {
            "attack" => Skill::Attack,
            "strength" => Skill::Strength,
            "defence" | "defense" => Skill::Defence,
            "ranged" | "range" => Skill::Ranged,
            "prayer" => Skill::Prayer,
            "magic" => Skill::Magic,
            "runecraft" | "runecrafting" => Skill::Runecraft,
            "hitpoints" => Skill::Hitpoints,
            "crafting" => Skill::Crafting,
            "mining" => Skill::Mining,
            "smithing" => Skill::Smithing,
            "fishing" => Skill::Fishing,
            "cooking" => Skill::Cooking,
            "firemaking" => Skill::Firemaking,
            "woodcutting" => Skill::Woodcutting,
            "agility" => Skill::Agility,
            "herblore" => Skill::Herblore,
            "thieving" => Skill::Thieving,
            "fletching" => Skill::Fletching,
            "slayer" => Skill::Slayer,
            "farming" => Skill::Farming,
            "construction" => Skill::Construction,
            "hunter" => Skill::Hunter,
            _ => return None,
        };
        Some(skill)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRequirement {
    pub skill: Skill,
    pub level: u8,
}

/// Location or mechanic restriction on a monster drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DropRequirement {
    WildernessOnly,
    KonarTaskOnly,
    CatacombsOnly,
    WildernessSlayer,
    TreasureTrailsOnly,
    IorwerthDungeonOnly,
    ForthosDungeonOnly,
    RevenantsOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropEntry {
    pub item_name: String,
    pub quantity: Option<String>,
    pub noted: bool,
    pub rarity: Option<f64>,
    pub requirements: Option<DropRequirement>,
}

/// A typed value held by one record field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Date(NaiveDate),
    List(Vec<String>),
    Record(TypedRecord),
    Drops(Vec<DropEntry>),
    Requirements(Vec<SkillRequirement>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&TypedRecord> {
        match self {
            FieldValue::Record(v) => Some(v),
            _ => None,
        }
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_none(),
            FieldValue::Int(v) => serializer.serialize_i64(*v),
            FieldValue::Float(v) => serializer.serialize_f64(*v),
            FieldValue::Bool(v) => serializer.serialize_bool(*v),
            FieldValue::Text(v) => serializer.serialize_str(v),
            FieldValue::Date(v) => serializer.serialize_str(&v.format("%Y-%m-%d").to_string()),
            FieldValue::List(v) => v.serialize(serializer),
            FieldValue::Record(v) => v.serialize(serializer),
            FieldValue::Drops(v) => v.serialize(serializer),
            FieldValue::Requirements(v) => v.serialize(serializer),
        }
    }
}

/// Canonical field name -> typed value, kept in schema order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypedRecord {
    fields: Vec<(&'static str, FieldValue)>,
}

impl TypedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing an existing value in place.
    pub fn set(&mut self, name: &'static str, value: FieldValue) {
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| *k == name).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(k, _)| *k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for TypedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
