use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::cache::{LocalCache, SETTINGS_KEY};
use crate::DatabaseError;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Theme::Dark => write!(f, "dark"),
            Theme::Light => write!(f, "light"),
        }
    }
}

impl FromStr for Theme {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(DatabaseError::Config(format!("unknown theme {other}"))),
        }
    }
}

/// Device preferences. These live only in the local cache.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub theme: Theme,
}

impl Settings {
    pub fn load(cache: &dyn LocalCache) -> Self {
        match cache.get(SETTINGS_KEY) {
            Ok(Some(stored)) => serde_json::from_str(&stored).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable settings: {e}");
                Settings::default()
            }),
            Ok(None) => Settings::default(),
            Err(e) => {
                tracing::warn!("Could not read settings: {e}");
                Settings::default()
            }
        }
    }

    pub fn save(&self, cache: &dyn LocalCache) -> Result<(), DatabaseError> {
        cache.set(SETTINGS_KEY, &serde_json::to_string(self)?)
    }
}
