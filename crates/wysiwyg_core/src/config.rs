// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::EditorError;

/// Options a host page can pass when creating an editor. Every key is
/// optional; missing keys take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum number of snapshots kept for undo/redo.
    pub history_limit: usize,
    /// Milliseconds of inactivity before content is persisted. `0` turns
    /// auto-save off.
    pub auto_save_delay: u64,
    /// Milliseconds after construction before the one-off integrity check.
    pub integrity_check_delay: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            auto_save_delay: 1000,
            integrity_check_delay: 100,
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        serde_json::from_str(json)
            .map_err(|e| EditorError::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), EditorError> {
        if self.history_limit == 0 {
            return Err(EditorError::InvalidConfig(String::from(
                "historyLimit must be at least 1",
            )));
        }
        Ok(())
    }

    pub fn auto_save_delay(&self) -> Option<Duration> {
        (self.auto_save_delay > 0)
            .then(|| Duration::from_millis(self.auto_save_delay))
    }

    pub fn integrity_check_delay(&self) -> Duration {
        Duration::from_millis(self.integrity_check_delay)
    }
}

#[cfg(test)]
mod test {
    use indoc::indoc;

    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let config = EditorConfig::from_json(r#"{ "historyLimit": 3 }"#)
            .expect("valid json");
        assert_eq!(config.history_limit, 3);
        assert_eq!(config.auto_save_delay, 1000);
        assert_eq!(config.integrity_check_delay, 100);
    }

    #[test]
    fn keys_are_camel_case() {
        let config = EditorConfig::from_json(indoc! {r#"
            {
                "historyLimit": 10,
                "autoSaveDelay": 0,
                "integrityCheckDelay": 5
            }
        "#})
        .expect("valid json");
        assert_eq!(
            config,
            EditorConfig {
                history_limit: 10,
                auto_save_delay: 0,
                integrity_check_delay: 5,
            }
        );
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"autoSaveDelay\":0"));
    }

    #[test]
    fn zero_auto_save_delay_disables_auto_save() {
        let config = EditorConfig {
            auto_save_delay: 0,
            ..EditorConfig::default()
        };
        assert_eq!(config.auto_save_delay(), None);
        assert_eq!(
            EditorConfig::default().auto_save_delay(),
            Some(Duration::from_millis(1000))
        );
    }

    #[test]
    fn zero_history_limit_is_rejected() {
        let config = EditorConfig {
            history_limit: 0,
            ..EditorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EditorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            EditorConfig::from_json("{ historyLimit: }"),
            Err(EditorError::InvalidConfig(_))
        ));
        assert!(matches!(
            EditorConfig::from_json(r#"{ "historyLimit": -1 }"#),
            Err(EditorError::InvalidConfig(_))
        ));
    }
}
