//! Core library for normalizing OSRS wiki infobox data into typed records.

pub mod builders;
pub mod casters;
pub mod config;
pub mod error;
pub mod expr;
pub mod file_utils;
pub mod item_cleaners;
pub mod lookups;
pub mod models;
pub mod monster_cleaners;
pub mod rarity;
pub mod schema;
pub mod wikitext;

pub use builders::{BuildOutcome, build_item, build_monster};
pub use error::{CleanError, NormalizationError, OsrsboxError, Result};
pub use models::{EntityContext, RawEntity, RawFieldMap, TypedRecord};
