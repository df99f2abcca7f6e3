//! Player attributes and choice effects.
//!
//! The attribute set is fixed at construction: effects may overwrite a known
//! attribute but never introduce a new one.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single attribute value as authored in story content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Flag(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Attribute changes carried by a choice, keyed by attribute name.
pub type Effects = BTreeMap<String, AttributeValue>;

pub const HEALTH: &str = "health";
pub const COURAGE: &str = "courage";
pub const LOCATION: &str = "location";
pub const HAS_BUBBLE_POWERS: &str = "hasBubblePowers";
pub const HAS_ALLY: &str = "hasAlly";

/// The player's attribute sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerAttributes(BTreeMap<String, AttributeValue>);

impl Default for PlayerAttributes {
    fn default() -> Self {
        let mut values = BTreeMap::new();
        values.insert(HEALTH.to_string(), AttributeValue::Integer(100));
        values.insert(COURAGE.to_string(), AttributeValue::from("Normal"));
        values.insert(LOCATION.to_string(), AttributeValue::from("Home"));
        values.insert(HAS_BUBBLE_POWERS.to_string(), AttributeValue::Flag(false));
        values.insert(HAS_ALLY.to_string(), AttributeValue::Flag(false));
        Self(values)
    }
}

impl PlayerAttributes {
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns a copy with every recognized key in `effects` overwritten.
    pub fn apply_effects(&self, effects: &Effects) -> Self {
        let mut next = self.0.clone();
        for (key, value) in effects {
            if let Some(slot) = next.get_mut(key) {
                *slot = value.clone();
            }
        }
        Self(next)
    }

    /// Effect keys that `apply_effects` would ignore.
    pub fn unrecognized<'a>(&self, effects: &'a Effects) -> Vec<&'a str> {
        effects
            .keys()
            .filter(|key| !self.0.contains_key(key.as_str()))
            .map(String::as_str)
            .collect()
    }
}
