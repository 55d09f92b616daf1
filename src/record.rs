//! The persisted interaction record
//!
//! One record exists per browser profile. It is stored as a JSON object whose
//! keys are exactly the camelCase field names below. Loading never trusts the
//! stored shape: [`InteractionRecord::merge_from_value`] takes each known
//! field it can understand, falls back to the default for anything missing or
//! mistyped, and keeps keys it does not know so they survive the next save.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{Result, TelemetryError};

pub const SECTION_VISIT_COUNTS: &str = "sectionVisitCounts";
pub const SKILL_HOVER_COUNTS: &str = "skillHoverCounts";
pub const IS_SOUND_ENABLED: &str = "isSoundEnabled";
pub const IS_GHOSTLINE_MODE_ENABLED: &str = "isGhostlineModeEnabled";
pub const IS_GHOSTLINE_FULL_MODE_UNLOCKED: &str = "isGhostlineFullModeUnlocked";
pub const FAST_SCROLL_COUNT: &str = "fastScrollCount";
pub const LAST_VISIT_TIMESTAMP: &str = "lastVisitTimestamp";

/// Hover tally for one skill
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillHover {
    pub count: u64,
    /// Epoch ms of the most recent hover
    pub last_timestamp: u64,
}

/// Aggregate of all interaction counters and feature flags
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    pub section_visit_counts: BTreeMap<String, u64>,
    pub skill_hover_counts: BTreeMap<String, SkillHover>,
    pub is_sound_enabled: bool,
    pub is_ghostline_mode_enabled: bool,
    /// One-way: never goes back to false
    pub is_ghostline_full_mode_unlocked: bool,
    pub fast_scroll_count: u64,
    pub last_visit_timestamp: u64,

    // Keys written by other builds; carried through untouched
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl InteractionRecord {
    /// Default record stamped with the given visit time
    pub fn fresh(now_ms: u64) -> Self {
        Self {
            last_visit_timestamp: now_ms,
            ..Self::default()
        }
    }

    /// Parse a stored blob and merge it over the defaults
    pub fn merge_from_json(raw: &str, now_ms: u64) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        Self::merge_from_value(value, now_ms)
    }

    /// Field-by-field merge of a stored value over the defaults.
    ///
    /// Only a non-object value is an error; every problem below the top level
    /// degrades to the default for that field or skips the bad map entry.
    pub fn merge_from_value(value: Value, now_ms: u64) -> Result<Self> {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(TelemetryError::MalformedRecord(format!(
                    "expected a JSON object, got {}",
                    json_type_name(&other)
                )))
            }
        };

        let section_visit_counts = match fields.remove(SECTION_VISIT_COUNTS) {
            Some(v) => section_counts_from(v),
            None => BTreeMap::new(),
        };
        let skill_hover_counts = match fields.remove(SKILL_HOVER_COUNTS) {
            Some(v) => skill_hovers_from(v),
            None => BTreeMap::new(),
        };
        let is_sound_enabled = take_bool(&mut fields, IS_SOUND_ENABLED);
        let is_ghostline_mode_enabled = take_bool(&mut fields, IS_GHOSTLINE_MODE_ENABLED);
        let is_ghostline_full_mode_unlocked =
            take_bool(&mut fields, IS_GHOSTLINE_FULL_MODE_UNLOCKED);
        let fast_scroll_count = take_count(&mut fields, FAST_SCROLL_COUNT);
        // Overwritten on every load
        fields.remove(LAST_VISIT_TIMESTAMP);

        Ok(Self {
            section_visit_counts,
            skill_hover_counts,
            is_sound_enabled,
            is_ghostline_mode_enabled,
            is_ghostline_full_mode_unlocked,
            fast_scroll_count,
            last_visit_timestamp: now_ms,
            extra: fields,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Sum of all skill hover counts
    pub fn total_skill_hovers(&self) -> u64 {
        self.skill_hover_counts
            .values()
            .fold(0u64, |acc, h| acc.saturating_add(h.count))
    }

    pub fn section_visits(&self, section_id: &str) -> u64 {
        self.section_visit_counts.get(section_id).copied().unwrap_or(0)
    }

    pub fn skill_hover(&self, skill_id: &str) -> Option<&SkillHover> {
        self.skill_hover_counts.get(skill_id)
    }

    /// Keys from the stored blob this build does not know about
    pub fn unknown_fields(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Fold counters from `other` into this record without losing any.
    ///
    /// Counts take the per-key maximum, hover timestamps the latest, and the
    /// unlock flag is OR-ed. Sound and ghostline toggles stay as they are here.
    pub fn absorb_counts(&mut self, other: &InteractionRecord) {
        for (section, &visits) in &other.section_visit_counts {
            let count = self.section_visit_counts.entry(section.clone()).or_insert(0);
            *count = (*count).max(visits);
        }
        for (skill, theirs) in &other.skill_hover_counts {
            let ours = self.skill_hover_counts.entry(skill.clone()).or_default();
            ours.count = ours.count.max(theirs.count);
            ours.last_timestamp = ours.last_timestamp.max(theirs.last_timestamp);
        }
        self.fast_scroll_count = self.fast_scroll_count.max(other.fast_scroll_count);
        self.is_ghostline_full_mode_unlocked |= other.is_ghostline_full_mode_unlocked;
    }
}

/// Accept integral JSON numbers, including whole floats like `3.0`
fn non_negative_integer(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    match value.as_f64() {
        Some(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => {
            Some(f as u64)
        }
        _ => None,
    }
}

fn take_bool(fields: &mut Map<String, Value>, key: &str) -> bool {
    match fields.remove(key) {
        None => false,
        Some(Value::Bool(b)) => b,
        Some(other) => {
            warn!(field = key, found = json_type_name(&other), "Ignoring mistyped flag");
            false
        }
    }
}

fn take_count(fields: &mut Map<String, Value>, key: &str) -> u64 {
    match fields.remove(key) {
        None => 0,
        Some(v) => non_negative_integer(&v).unwrap_or_else(|| {
            warn!(field = key, found = json_type_name(&v), "Ignoring invalid counter");
            0
        }),
    }
}

fn section_counts_from(value: Value) -> BTreeMap<String, u64> {
    let entries = match value {
        Value::Object(entries) => entries,
        other => {
            warn!(field = SECTION_VISIT_COUNTS, found = json_type_name(&other), "Expected an object");
            return BTreeMap::new();
        }
    };

    entries
        .into_iter()
        .filter_map(|(section, count)| match non_negative_integer(&count) {
            Some(n) => Some((section, n)),
            None => {
                warn!(section = %section, "Skipping invalid section visit count");
                None
            }
        })
        .collect()
}

fn skill_hovers_from(value: Value) -> BTreeMap<String, SkillHover> {
    let entries = match value {
        Value::Object(entries) => entries,
        other => {
            warn!(field = SKILL_HOVER_COUNTS, found = json_type_name(&other), "Expected an object");
            return BTreeMap::new();
        }
    };

    entries
        .into_iter()
        .filter_map(|(skill, entry)| {
            let count = entry.get("count").and_then(non_negative_integer);
            let last = entry.get("lastTimestamp").and_then(non_negative_integer);
            match count {
                Some(count) => Some((
                    skill,
                    SkillHover {
                        count,
                        last_timestamp: last.unwrap_or(0),
                    },
                )),
                None => {
                    warn!(skill = %skill, "Skipping invalid skill hover entry");
                    None
                }
            }
        })
        .collect()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_record_keys() {
        let value = serde_json::to_value(InteractionRecord::default()).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        for key in [
            SECTION_VISIT_COUNTS,
            SKILL_HOVER_COUNTS,
            IS_SOUND_ENABLED,
            IS_GHOSTLINE_MODE_ENABLED,
            IS_GHOSTLINE_FULL_MODE_UNLOCKED,
            FAST_SCROLL_COUNT,
            LAST_VISIT_TIMESTAMP,
        ] {
            assert!(keys.contains(&key), "missing {key}");
        }
        assert_eq!(keys.len(), 7);
    }

    #[test]
    fn test_merge_backfills_missing_fields() {
        let stored = json!({
            "skillHoverCounts": { "python": { "count": 3, "lastTimestamp": 1000 } }
        });
        let record = InteractionRecord::merge_from_value(stored, 42).unwrap();

        assert_eq!(record.skill_hover("python"), Some(&SkillHover { count: 3, last_timestamp: 1000 }));
        assert!(record.section_visit_counts.is_empty());
        assert!(!record.is_sound_enabled);
        assert!(!record.is_ghostline_full_mode_unlocked);
        assert_eq!(record.fast_scroll_count, 0);
        assert_eq!(record.last_visit_timestamp, 42);
    }

    #[test]
    fn test_merge_overwrites_visit_timestamp() {
        let stored = json!({ "lastVisitTimestamp": 5, "fastScrollCount": 4 });
        let record = InteractionRecord::merge_from_value(stored, 900).unwrap();
        assert_eq!(record.last_visit_timestamp, 900);
        assert_eq!(record.fast_scroll_count, 4);
        assert!(record.unknown_fields().is_empty());
    }

    #[test]
    fn test_mistyped_fields_fall_back_individually() {
        let stored = json!({
            "sectionVisitCounts": { "about": 2, "skills": "many", "home": -1 },
            "skillHoverCounts": { "rust": { "count": 1.0, "lastTimestamp": 7 }, "go": { "last": 1 } },
            "isSoundEnabled": "yes",
            "isGhostlineModeEnabled": true,
            "fastScrollCount": 2.5
        });
        let record = InteractionRecord::merge_from_value(stored, 1).unwrap();

        assert_eq!(record.section_visits("about"), 2);
        assert_eq!(record.section_visit_counts.len(), 1);
        assert_eq!(record.skill_hover("rust").unwrap().count, 1);
        assert!(record.skill_hover("go").is_none());
        assert!(!record.is_sound_enabled);
        assert!(record.is_ghostline_mode_enabled);
        assert_eq!(record.fast_scroll_count, 0);
    }

    #[test]
    fn test_unknown_keys_survive_serialization() {
        let stored = json!({ "themeVariant": "m4-csl", "fastScrollCount": 1 });
        let record = InteractionRecord::merge_from_value(stored, 3).unwrap();
        assert_eq!(record.unknown_fields().get("themeVariant"), Some(&json!("m4-csl")));

        let written: Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(written["themeVariant"], json!("m4-csl"));
        assert_eq!(written["fastScrollCount"], json!(1));
    }

    #[test]
    fn test_non_object_is_malformed() {
        let err = InteractionRecord::merge_from_value(json!([1, 2]), 0).unwrap_err();
        assert!(matches!(err, TelemetryError::MalformedRecord(_)));
        assert!(InteractionRecord::merge_from_json("{not json", 0).is_err());
    }

    #[test]
    fn test_absorb_counts_never_decreases() {
        let mut stored = InteractionRecord::fresh(10);
        stored.section_visit_counts.insert("about".into(), 1);
        stored.skill_hover_counts.insert("rust".into(), SkillHover { count: 4, last_timestamp: 50 });
        stored.is_sound_enabled = true;

        let mut local = InteractionRecord::fresh(10);
        local.section_visit_counts.insert("about".into(), 3);
        local.section_visit_counts.insert("home".into(), 2);
        local.skill_hover_counts.insert("rust".into(), SkillHover { count: 2, last_timestamp: 80 });
        local.fast_scroll_count = 6;
        local.is_ghostline_full_mode_unlocked = true;

        stored.absorb_counts(&local);
        assert_eq!(stored.section_visits("about"), 3);
        assert_eq!(stored.section_visits("home"), 2);
        assert_eq!(stored.skill_hover("rust"), Some(&SkillHover { count: 4, last_timestamp: 80 }));
        assert_eq!(stored.fast_scroll_count, 6);
        assert!(stored.is_ghostline_full_mode_unlocked);
        assert!(stored.is_sound_enabled);
    }

    #[test]
    fn test_total_skill_hovers_saturates() {
        let mut record = InteractionRecord::default();
        record.skill_hover_counts.insert("a".into(), SkillHover { count: u64::MAX, last_timestamp: 0 });
        record.skill_hover_counts.insert("b".into(), SkillHover { count: 5, last_timestamp: 0 });
        assert_eq!(record.total_skill_hovers(), u64::MAX);
    }
}
