//! Recognized voice intents and how a classification resolves to a write

use crate::classifier::ClassificationResult;
use crate::state::DeviceAttribute;

use super::DispatchOutcome;

/// Parameter carrying the value to write
pub const STATE_PARAMETER: &str = "state";

/// Intents the dashboard acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    AlarmToggle,
    OverrideToggle,
    MovieNightToggle,
}

impl Intent {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "alarm_toggle" => Some(Intent::AlarmToggle),
            "override_toggle" => Some(Intent::OverrideToggle),
            "movie_night_toggle" => Some(Intent::MovieNightToggle),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Intent::AlarmToggle => "alarm_toggle",
            Intent::OverrideToggle => "override_toggle",
            Intent::MovieNightToggle => "movie_night_toggle",
        }
    }

    /// Attribute this intent writes
    pub fn target(self) -> DeviceAttribute {
        match self {
            Intent::AlarmToggle => DeviceAttribute::Alarm,
            Intent::OverrideToggle => DeviceAttribute::Override,
            Intent::MovieNightToggle => DeviceAttribute::MovieNight,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What a classification asks the dispatcher to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Write `value` verbatim to `attribute`
    Write {
        intent: Intent,
        attribute: DeviceAttribute,
        value: String,
    },
    /// Nothing to write; the outcome explains why
    Refuse(DispatchOutcome),
}

/// Decide the store write for a classification.
///
/// The `state` value is passed through unvalidated.
pub fn resolve(result: &ClassificationResult) -> Resolution {
    let Some(name) = result.intent.as_deref() else {
        return Resolution::Refuse(DispatchOutcome::NoIntent);
    };

    let Some(intent) = Intent::from_name(name) else {
        return Resolution::Refuse(DispatchOutcome::UnknownCommand(name.to_string()));
    };

    match result.parameter(STATE_PARAMETER) {
        Some(value) => Resolution::Write {
            intent,
            attribute: intent.target(),
            value: value.to_string(),
        },
        None => Resolution::Refuse(DispatchOutcome::MissingState(intent)),
    }
}
