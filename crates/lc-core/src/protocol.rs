//! Command protocol and persisted settings.
//!
//! Wire shapes exchanged with the extension's popup/background side. Field
//! and tag names are camelCase to match the JS conventions there, and every
//! type derives `TS` so `lc-cli bindings` can emit the TypeScript
//! definitions the other side compiles against.
//!
//! The transport itself lives outside this crate; delivery failures are the
//! caller's concern and the engine never retries them.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::preset::OptimizationLevel;

/// Floor for the reported reduction percentage while there is nothing to
/// trim ("still optimizing"). Presentation smoothing, not a metric.
pub const REDUCTION_FLOOR_PERCENT: u8 = 5;

// =============================================================================
// Commands
// =============================================================================

/// Commands delivered over the extension message channel, tagged by
/// `action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "action", rename_all = "camelCase")]
#[ts(export)]
pub enum Command {
    GetStatus,
    Toggle,
    #[serde(rename_all = "camelCase")]
    UpdateSettings {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retention_limit: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        preset_name: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    SetOptimizationLevel { preset_name: String },
}

// =============================================================================
// Responses
// =============================================================================

/// Point-in-time projection of the engine, computed on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StatusSnapshot {
    pub active: bool,
    /// Matching conversation turns currently in the document.
    pub element_count: usize,
    pub retention_limit: u32,
    pub preset_name: String,
    /// `round((count - limit) / count * 100)` when over the limit, floored
    /// at [`REDUCTION_FLOOR_PERCENT`]. The floor also applies at or under
    /// the limit, so this never reads zero while the engine is active.
    pub estimated_reduction_percent: u8,
    /// Turns removed since activation.
    pub trimmed_total: u64,
}

/// Responses emitted on the control channel. Serialized untagged: each
/// command documents the shape it answers with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum Response {
    Status(StatusSnapshot),
    Toggled { active: bool },
    Ack { ok: bool },
    Error { ok: bool, reason: String },
}

impl Response {
    pub fn ack() -> Self {
        Self::Ack { ok: true }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self::Error {
            ok: false,
            reason: reason.into(),
        }
    }
}

/// Reduction estimate for the status snapshot.
pub fn estimate_reduction_percent(element_count: usize, retention_limit: u32) -> u8 {
    let limit = retention_limit as usize;
    if element_count > limit {
        let removed = element_count - limit;
        let gain = (removed * 100 + element_count / 2) / element_count;
        (gain as u8).max(REDUCTION_FLOOR_PERCENT)
    } else {
        REDUCTION_FLOOR_PERCENT
    }
}

// =============================================================================
// Settings
// =============================================================================

/// User-facing configuration persisted by the extension's settings store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StoredSettings {
    pub enabled: bool,
    pub retention_limit: u32,
    pub preset_name: String,
}

impl Default for StoredSettings {
    fn default() -> Self {
        let level = OptimizationLevel::DEFAULT;
        Self {
            enabled: true,
            retention_limit: crate::preset::Preset::of(level).default_retention_limit,
            preset_name: level.as_str().to_string(),
        }
    }
}

/// The persistence boundary. The engine loads once at construction and
/// saves on every user-driven change; it never consults the store
/// mid-pass.
pub trait SettingsStore {
    fn load(&self) -> StoredSettings;
    fn save(&mut self, settings: &StoredSettings);
}

/// In-memory [`SettingsStore`] for tests and the CLI simulator.
#[derive(Debug, Default)]
pub struct MemorySettings {
    current: StoredSettings,
    save_count: usize,
}

impl MemorySettings {
    pub fn new(settings: StoredSettings) -> Self {
        Self {
            current: settings,
            save_count: 0,
        }
    }

    pub fn current(&self) -> &StoredSettings {
        &self.current
    }

    pub fn save_count(&self) -> usize {
        self.save_count
    }
}

impl SettingsStore for MemorySettings {
    fn load(&self) -> StoredSettings {
        self.current.clone()
    }

    fn save(&mut self, settings: &StoredSettings) {
        self.current = settings.clone();
        self.save_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_from_wire_json() {
        let cmd: Command = serde_json::from_str(r#"{"action":"getStatus"}"#).unwrap();
        assert_eq!(cmd, Command::GetStatus);

        let cmd: Command =
            serde_json::from_str(r#"{"action":"updateSettings","retentionLimit":8}"#).unwrap();
        assert_eq!(
            cmd,
            Command::UpdateSettings {
                retention_limit: Some(8),
                preset_name: None,
            }
        );

        let cmd: Command =
            serde_json::from_str(r#"{"action":"setOptimizationLevel","presetName":"ultra"}"#)
                .unwrap();
        assert_eq!(
            cmd,
            Command::SetOptimizationLevel {
                preset_name: "ultra".to_string(),
            }
        );
    }

    #[test]
    fn unknown_action_is_a_parse_error() {
        assert!(serde_json::from_str::<Command>(r#"{"action":"selfDestruct"}"#).is_err());
    }

    #[test]
    fn responses_serialize_flat() {
        let json = serde_json::to_value(Response::Toggled { active: true }).unwrap();
        assert_eq!(json, serde_json::json!({"active": true}));

        let json = serde_json::to_value(Response::error("no tab")).unwrap();
        assert_eq!(json, serde_json::json!({"ok": false, "reason": "no tab"}));
    }

    #[test]
    fn status_uses_camel_case_field_names() {
        let snapshot = StatusSnapshot {
            active: true,
            element_count: 12,
            retention_limit: 5,
            preset_name: "medium".to_string(),
            estimated_reduction_percent: 58,
            trimmed_total: 7,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["elementCount"], 12);
        assert_eq!(json["estimatedReductionPercent"], 58);
        assert_eq!(json["trimmedTotal"], 7);
    }

    #[test]
    fn reduction_estimate_over_limit() {
        // 12 turns, limit 5: round(7/12 * 100) = 58.
        assert_eq!(estimate_reduction_percent(12, 5), 58);
    }

    #[test]
    fn reduction_estimate_floors_under_limit() {
        let pct = estimate_reduction_percent(3, 5);
        assert!(pct > 0 && pct <= 10);
        assert_eq!(pct, REDUCTION_FLOOR_PERCENT);
    }

    #[test]
    fn reduction_estimate_handles_empty_page() {
        assert_eq!(estimate_reduction_percent(0, 5), REDUCTION_FLOOR_PERCENT);
    }

    #[test]
    fn default_settings_match_the_default_preset() {
        let settings = StoredSettings::default();
        assert!(settings.enabled);
        assert_eq!(settings.preset_name, "medium");
        assert_eq!(settings.retention_limit, 10);
    }
}
