//! Control surface.
//!
//! One [`Controller`] owns the engine state for one hosted page: the
//! active/inactive axis, the selected preset, the retention limit, the
//! change watcher, and the warm-up timer. Controllers are plain values;
//! tests run as many independent instances as they like.

use crate::optimizer;
use crate::page::HostPage;
use crate::preset::{OptimizationLevel, Preset};
use crate::protocol::{
    estimate_reduction_percent, Command, Response, SettingsStore, StatusSnapshot, StoredSettings,
};
use crate::retention;
use crate::time::{earliest, Millis, OneShot};
use crate::watcher::{ChangeWatcher, WatcherFire};

/// Delay between activation and the first trim pass, giving the host page
/// time to finish its own initial render.
pub const WARMUP_DELAY_MS: Millis = 2000;

/// Control-level failures. Both degrade to a safe default and are logged;
/// neither aborts the operation that raised it.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("invalid retention limit {given}, clamping to 1")]
    InvalidRetentionLimit { given: u32 },
    #[error("unknown optimization level {name:?}, using {fallback}")]
    UnknownPreset { name: String, fallback: &'static str },
}

/// Engine state plus collaborators for one hosted page.
pub struct Controller<P: HostPage, S: SettingsStore> {
    page: P,
    store: S,
    active: bool,
    level: OptimizationLevel,
    retention_limit: u32,
    /// True once the user pinned a limit; preset changes then stop
    /// reseeding it from the preset default.
    explicit_limit: bool,
    last_known_count: usize,
    trimmed_total: u64,
    watcher: ChangeWatcher,
    warmup: OneShot,
}

impl<P: HostPage, S: SettingsStore> Controller<P, S> {
    /// Build a controller from the persisted settings. Does not activate.
    pub fn new(page: P, store: S) -> Self {
        let settings = store.load();

        let level = match OptimizationLevel::parse(&settings.preset_name) {
            Some(level) => level,
            None => {
                log::warn!(
                    "{}",
                    ControlError::UnknownPreset {
                        name: settings.preset_name.clone(),
                        fallback: OptimizationLevel::DEFAULT.as_str(),
                    }
                );
                OptimizationLevel::DEFAULT
            }
        };

        let retention_limit = if settings.retention_limit < 1 {
            log::warn!(
                "{}",
                ControlError::InvalidRetentionLimit {
                    given: settings.retention_limit,
                }
            );
            1
        } else {
            settings.retention_limit
        };

        let preset = Preset::of(level);
        Self {
            page,
            store,
            active: false,
            level,
            retention_limit,
            explicit_limit: retention_limit != preset.default_retention_limit,
            last_known_count: 0,
            trimmed_total: 0,
            watcher: ChangeWatcher::new(preset.debounce_window_ms()),
            warmup: OneShot::default(),
        }
    }

    /// Start optimizing: begin observing, apply the preset's cosmetics, and
    /// arm the warm-up trim. No-op when already active.
    pub fn activate(&mut self, now: Millis) {
        if self.active {
            return;
        }
        let preset = Preset::of(self.level);
        self.watcher.set_debounce_window(preset.debounce_window_ms());
        self.watcher.start(&mut self.page, now);
        optimizer::apply(&mut self.page, preset);
        self.warmup.arm(now, WARMUP_DELAY_MS);
        self.active = true;
        self.last_known_count = self.page.conversation_turns().len();
        log::debug!(
            "activated at level {} with {} turns present",
            self.level.as_str(),
            self.last_known_count
        );
    }

    /// Stop observing and cancel pending timers. Cosmetic optimizations are
    /// one-way and stay applied. No-op when already inactive.
    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }
        self.watcher.stop(&mut self.page);
        self.warmup.cancel();
        self.active = false;
        log::debug!("deactivated");
    }

    /// Flip the active axis and persist the new enabled flag. Returns the
    /// resulting state.
    pub fn toggle(&mut self, now: Millis) -> bool {
        if self.active {
            self.deactivate();
        } else {
            self.activate(now);
        }
        self.persist();
        self.active
    }

    /// Select a preset by name, falling back on unknown names. Reseeds the
    /// retention limit from the preset default unless the user pinned one,
    /// re-applies cosmetics, and trims immediately when active.
    pub fn set_level(&mut self, name: &str, _now: Millis) {
        let preset = Preset::lookup(name);
        self.level = preset.level;
        if !self.explicit_limit {
            self.retention_limit = preset.default_retention_limit;
        }
        self.watcher.set_debounce_window(preset.debounce_window_ms());
        optimizer::apply(&mut self.page, preset);
        if self.active {
            self.trim_now();
        }
        self.persist();
    }

    /// Pin the retention limit. Values below 1 clamp to 1 with a warning.
    /// Trims immediately when active.
    pub fn set_retention_limit(&mut self, limit: u32, _now: Millis) {
        let clamped = if limit < 1 {
            log::warn!("{}", ControlError::InvalidRetentionLimit { given: limit });
            1
        } else {
            limit
        };
        self.retention_limit = clamped;
        self.explicit_limit = true;
        if self.active {
            self.trim_now();
        }
        self.persist();
    }

    /// Forward a structural-insertion notification to the watcher.
    pub fn on_insertions(&mut self, matched: bool, now: Millis) {
        self.watcher.on_insertions(matched, now);
    }

    /// Fire due timers. Each due fire runs one synchronous trim pass.
    pub fn tick(&mut self, now: Millis) {
        if !self.active {
            return;
        }
        if self.warmup.fire(now) {
            self.trim_now();
        }
        if self.watcher.tick(&mut self.page, now) == WatcherFire::TrimDue {
            self.trim_now();
        }
    }

    /// Point-in-time status projection.
    pub fn status(&self) -> StatusSnapshot {
        let element_count = self.page.conversation_turns().len();
        StatusSnapshot {
            active: self.active,
            element_count,
            retention_limit: self.retention_limit,
            preset_name: self.level.as_str().to_string(),
            estimated_reduction_percent: estimate_reduction_percent(
                element_count,
                self.retention_limit,
            ),
            trimmed_total: self.trimmed_total,
        }
    }

    /// Dispatch one control-channel command.
    pub fn handle_command(&mut self, command: Command, now: Millis) -> Response {
        match command {
            Command::GetStatus => Response::Status(self.status()),
            Command::Toggle => {
                let active = self.toggle(now);
                Response::Toggled { active }
            }
            Command::UpdateSettings {
                retention_limit,
                preset_name,
            } => {
                if retention_limit.is_none() && preset_name.is_none() {
                    return Response::error("updateSettings carried no settings");
                }
                if let Some(name) = preset_name {
                    self.set_level(&name, now);
                }
                if let Some(limit) = retention_limit {
                    self.set_retention_limit(limit, now);
                }
                Response::ack()
            }
            Command::SetOptimizationLevel { preset_name } => {
                self.set_level(&preset_name, now);
                Response::ack()
            }
        }
    }

    /// Earliest armed deadline, for hosts that schedule instead of polling.
    pub fn next_deadline(&self) -> Option<Millis> {
        if !self.active {
            return None;
        }
        earliest(&[self.warmup.deadline(), self.watcher.next_deadline()])
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn level(&self) -> OptimizationLevel {
        self.level
    }

    pub fn retention_limit(&self) -> u32 {
        self.retention_limit
    }

    pub fn last_known_count(&self) -> usize {
        self.last_known_count
    }

    pub fn trimmed_total(&self) -> u64 {
        self.trimmed_total
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn trim_now(&mut self) {
        let preset = Preset::of(self.level);
        let report =
            retention::run_trim_pass(&mut self.page, self.retention_limit, preset.aggressive());
        self.trimmed_total += report.removed as u64;
        self.last_known_count = report.remaining;
    }

    fn persist(&mut self) {
        self.store.save(&StoredSettings {
            enabled: self.active,
            retention_limit: self.retention_limit,
            preset_name: self.level.as_str().to_string(),
        });
    }
}
