//! Device attributes mirrored from the remote store
//!
//! The store holds three keys, each conventionally "on" or "off". Values
//! arriving from the store are kept as plain strings since voice commands
//! write whatever the classifier extracted.

use serde::{Deserialize, Serialize};

/// Value written when a switch is on
pub const ON: &str = "on";
/// Value written when a switch is off
pub const OFF: &str = "off";

/// One of the three switchable settings in the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceAttribute {
    /// Home alarm
    Alarm,
    /// Manual override of automations
    Override,
    /// Movie night scene
    MovieNight,
}

impl DeviceAttribute {
    /// Every attribute, in display order
    pub const ALL: [DeviceAttribute; 3] = [
        DeviceAttribute::Alarm,
        DeviceAttribute::Override,
        DeviceAttribute::MovieNight,
    ];

    /// Key of this attribute in the remote store
    pub fn key(self) -> &'static str {
        match self {
            DeviceAttribute::Alarm => "alarm",
            DeviceAttribute::Override => "override",
            DeviceAttribute::MovieNight => "movie_night",
        }
    }

    /// Human readable label
    pub fn label(self) -> &'static str {
        match self {
            DeviceAttribute::Alarm => "Alarm",
            DeviceAttribute::Override => "Override",
            DeviceAttribute::MovieNight => "Movie Night",
        }
    }
}

impl std::fmt::Display for DeviceAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Value a toggle writes given the locally cached value.
///
/// Only an exact "on" flips to "off"; anything else, including values a
/// voice command wrote verbatim, flips to "on".
pub fn toggled(cached: &str) -> &'static str {
    if cached == ON {
        OFF
    } else {
        ON
    }
}

/// Cached copy of the three attribute values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValues {
    pub alarm: String,
    #[serde(rename = "override")]
    pub override_mode: String,
    pub movie_night: String,
}

impl Default for AttributeValues {
    fn default() -> Self {
        Self {
            alarm: OFF.to_string(),
            override_mode: OFF.to_string(),
            movie_night: OFF.to_string(),
        }
    }
}

impl AttributeValues {
    pub fn get(&self, attribute: DeviceAttribute) -> &str {
        match attribute {
            DeviceAttribute::Alarm => &self.alarm,
            DeviceAttribute::Override => &self.override_mode,
            DeviceAttribute::MovieNight => &self.movie_night,
        }
    }

    fn slot_mut(&mut self, attribute: DeviceAttribute) -> &mut String {
        match attribute {
            DeviceAttribute::Alarm => &mut self.alarm,
            DeviceAttribute::Override => &mut self.override_mode,
            DeviceAttribute::MovieNight => &mut self.movie_night,
        }
    }

    pub(crate) fn set(&mut self, attribute: DeviceAttribute, value: String) {
        *self.slot_mut(attribute) = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_flips_on_and_off() {
        for attribute in DeviceAttribute::ALL {
            let mut values = AttributeValues::default();
            assert_eq!(toggled(values.get(attribute)), ON);

            values.set(attribute, ON.to_string());
            assert_eq!(toggled(values.get(attribute)), OFF);
        }
    }

    #[test]
    fn test_toggle_unknown_value_goes_on() {
        assert_eq!(toggled("enabled"), ON);
        assert_eq!(toggled(""), ON);
        assert_eq!(toggled("ON"), ON);
    }

    #[test]
    fn test_store_keys() {
        let keys: Vec<_> = DeviceAttribute::ALL.into_iter().map(DeviceAttribute::key).collect();
        assert_eq!(keys, vec!["alarm", "override", "movie_night"]);
    }

    #[test]
    fn test_values_serialize_with_store_keys() {
        let json = serde_json::to_string(&AttributeValues::default()).unwrap();
        assert!(json.contains("\"override\":\"off\""));
        assert!(json.contains("\"movie_night\":\"off\""));
    }
}
