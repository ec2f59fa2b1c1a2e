//! WebAssembly bindings for LeanChat
//!
//! The content script loads this module and wires it up as follows:
//!
//! - `init(settingsJson, persist)` once, with the stored settings and a
//!   callback that writes updated settings back to the extension store
//! - `handle_message(message)` for every command arriving on the
//!   extension's message channel (the transport itself stays in JS)
//! - `tick()` on a coarse interval, or precisely at the returned deadline;
//!   insertion batches are observed from Rust via `MutationObserver`
//! - `suspend()` on page unload
//!
//! Timestamps come from `Date.now()`; the core engine never owns a clock.

mod page;

use std::cell::RefCell;

use wasm_bindgen::prelude::*;
use web_sys::console;

use lc_core::{Command, Controller, Response, SettingsStore, StoredSettings};

pub use page::{DomPage, CONTAINER_SELECTOR, TURN_SELECTOR};

type EngineController = Controller<DomPage, HookSettings>;

thread_local! {
    static CONTROLLER: RefCell<Option<EngineController>> = const { RefCell::new(None) };
}

fn with_controller<R>(f: impl FnOnce(&mut EngineController) -> R) -> Option<R> {
    CONTROLLER.with(|cell| {
        // A mutation callback can land while the controller is borrowed for
        // a pass that itself mutates the DOM; drop that batch, the next
        // tick re-counts anyway.
        let mut slot = cell.try_borrow_mut().ok()?;
        slot.as_mut().map(f)
    })
}

fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

fn on_insertion_batch(matched: bool) {
    with_controller(|controller| controller.on_insertions(matched, now_ms()));
}

// =============================================================================
// Settings bridge
// =============================================================================

/// Settings store backed by a JS persistence callback; the extension side
/// owns the actual storage.
pub struct HookSettings {
    current: StoredSettings,
    persist: Option<js_sys::Function>,
}

impl SettingsStore for HookSettings {
    fn load(&self) -> StoredSettings {
        self.current.clone()
    }

    fn save(&mut self, settings: &StoredSettings) {
        self.current = settings.clone();
        let Some(hook) = &self.persist else { return };
        if let Ok(json) = serde_json::to_string(settings) {
            let _ = hook.call1(&JsValue::NULL, &JsValue::from_str(&json));
        }
    }
}

// =============================================================================
// Console logging
// =============================================================================

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Debug
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[leanchat {}] {}", record.level(), record.args());
        match record.level() {
            log::Level::Error => console::error_1(&line.into()),
            log::Level::Warn => console::warn_1(&line.into()),
            _ => console::log_1(&line.into()),
        }
    }

    fn flush(&self) {}
}

fn init_logging() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Debug);
    }
}

// =============================================================================
// Exported entry points
// =============================================================================

/// Build the engine from the persisted settings JSON and activate it when
/// the stored `enabled` flag says so. `persist` receives updated settings
/// JSON on every user-driven change.
#[wasm_bindgen]
pub fn init(settings_json: &str, persist: Option<js_sys::Function>) -> Result<(), JsValue> {
    init_logging();

    if CONTROLLER.with(|cell| cell.borrow().is_some()) {
        return Err(JsValue::from_str(
            "Already initialized. Reload the page to reinitialize.",
        ));
    }

    let settings: StoredSettings = serde_json::from_str(settings_json)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse settings: {e}")))?;
    let enabled = settings.enabled;

    let page = DomPage::new(on_insertion_batch)?;
    let store = HookSettings {
        current: settings,
        persist,
    };

    let mut controller = Controller::new(page, store);
    if enabled {
        controller.activate(now_ms());
    }

    CONTROLLER.with(|cell| {
        *cell.borrow_mut() = Some(controller);
    });
    Ok(())
}

#[wasm_bindgen]
pub fn is_initialized() -> bool {
    CONTROLLER.with(|cell| cell.borrow().is_some())
}

#[wasm_bindgen]
pub fn is_active() -> bool {
    with_controller(|controller| controller.is_active()).unwrap_or(false)
}

/// Dispatch one command from the extension message channel. Always returns
/// a response object; failures come back as `{ok: false, reason}` rather
/// than exceptions.
#[wasm_bindgen]
pub fn handle_message(message: JsValue) -> JsValue {
    let json = match js_sys::JSON::stringify(&message) {
        Ok(json) => String::from(json),
        Err(_) => return response_to_js(&Response::error("message is not serializable")),
    };
    let command: Command = match serde_json::from_str(&json) {
        Ok(command) => command,
        Err(e) => return response_to_js(&Response::error(format!("unrecognized command: {e}"))),
    };

    let response = with_controller(|controller| controller.handle_command(command, now_ms()));
    match response {
        Some(response) => response_to_js(&response),
        None => response_to_js(&Response::error("engine not initialized")),
    }
}

/// Fire due timers. Returns the next armed deadline in ms since the epoch,
/// or -1 when nothing is scheduled.
#[wasm_bindgen]
pub fn tick() -> f64 {
    with_controller(|controller| {
        controller.tick(now_ms());
        controller.next_deadline().map(|d| d as f64).unwrap_or(-1.0)
    })
    .unwrap_or(-1.0)
}

/// Stop observing and cancel timers without touching the stored settings.
/// For page unload.
#[wasm_bindgen]
pub fn suspend() {
    with_controller(|controller| controller.deactivate());
}

fn response_to_js(response: &Response) -> JsValue {
    let object = js_sys::Object::new();
    match response {
        Response::Status(status) => {
            let _ = js_sys::Reflect::set(&object, &"active".into(), &JsValue::from(status.active));
            let _ = js_sys::Reflect::set(
                &object,
                &"elementCount".into(),
                &JsValue::from(status.element_count as u32),
            );
            let _ = js_sys::Reflect::set(
                &object,
                &"retentionLimit".into(),
                &JsValue::from(status.retention_limit),
            );
            let _ = js_sys::Reflect::set(
                &object,
                &"presetName".into(),
                &JsValue::from_str(&status.preset_name),
            );
            let _ = js_sys::Reflect::set(
                &object,
                &"estimatedReductionPercent".into(),
                &JsValue::from(status.estimated_reduction_percent),
            );
            let _ = js_sys::Reflect::set(
                &object,
                &"trimmedTotal".into(),
                &JsValue::from(status.trimmed_total as u32),
            );
        }
        Response::Toggled { active } => {
            let _ = js_sys::Reflect::set(&object, &"active".into(), &JsValue::from(*active));
        }
        Response::Ack { ok } => {
            let _ = js_sys::Reflect::set(&object, &"ok".into(), &JsValue::from(*ok));
        }
        Response::Error { ok, reason } => {
            let _ = js_sys::Reflect::set(&object, &"ok".into(), &JsValue::from(*ok));
            let _ = js_sys::Reflect::set(&object, &"reason".into(), &JsValue::from_str(reason));
        }
    }
    object.into()
}
