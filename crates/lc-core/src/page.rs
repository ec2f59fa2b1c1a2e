//! Host page seam.
//!
//! The engine only ever touches the hosted document through [`HostPage`].
//! The wasm crate implements it over the real DOM; [`MemoryPage`] is the
//! in-memory implementation used by tests and the CLI simulator.

use std::collections::HashSet;

// =============================================================================
// Turn handles
// =============================================================================

/// Who authored a conversation turn, read from the turn element's role tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
    Unknown,
}

impl TurnRole {
    /// Parse the `data-turn` attribute value.
    pub fn from_attr(value: &str) -> Self {
        match value {
            "user" => Self::User,
            "assistant" => Self::Assistant,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Unknown => "unknown",
        }
    }
}

/// Opaque reference to one conversation turn in the hosted document.
///
/// Handles are produced in document order (oldest first); `ordinal` is the
/// position within the snapshot they were queried from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnHandle {
    pub ordinal: u32,
    pub role: TurnRole,
}

/// What structural observation is currently bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserveTarget {
    /// The designated chat container.
    Container,
    /// Fallback while the container is absent.
    WholeDocument,
}

// =============================================================================
// Errors
// =============================================================================

/// Per-element page failures. None of these abort a trim batch.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// The host page removed the element first. Benign race.
    #[error("conversation turn {ordinal} already detached")]
    Detached { ordinal: u32 },
    #[error("refused to remove conversation turn {ordinal}: {reason}")]
    RemovalRefused { ordinal: u32, reason: String },
}

// =============================================================================
// HostPage
// =============================================================================

/// The engine's only window onto the hosted document.
///
/// All calls are synchronous; the document is mutated solely through
/// `remove_turn` and the cosmetic hooks, and only from the single control
/// thread.
pub trait HostPage {
    /// All matching conversation turns in document order, oldest first.
    fn conversation_turns(&self) -> Vec<TurnHandle>;

    /// Detach one turn. Calling this on an already-detached handle is a
    /// no-op `Ok`, so concurrent page updates never turn into batch aborts.
    fn remove_turn(&mut self, handle: &TurnHandle) -> Result<(), PageError>;

    /// Try to (re)bind structural observation to the chat container,
    /// falling back to the whole document while it is absent.
    fn acquire_container(&mut self) -> ObserveTarget;

    /// Stop structural observation. Idempotent.
    fn release_container(&mut self);

    /// Insert a global style rule once per id. Returns false (and does
    /// nothing) when a rule with this id is already present.
    fn inject_style(&mut self, id: &str, css: &str) -> bool;

    /// Make the scroll container scroll immediately (non-smooth) and hint
    /// the renderer for scroll-position changes.
    fn set_instant_scroll(&mut self);

    /// Clear color overrides and highlighting markers on code-block-like
    /// elements. Returns how many elements were touched.
    fn strip_code_highlighting(&mut self) -> usize;

    /// Aggressive extra: normalize image rendering hints and force layer
    /// promotion on canvas-like elements. Returns how many were touched.
    fn tune_media_rendering(&mut self) -> usize;
}

// =============================================================================
// MemoryPage
// =============================================================================

/// In-memory [`HostPage`] used by unit tests and the CLI simulator.
#[derive(Debug, Default)]
pub struct MemoryPage {
    turns: Vec<(u32, TurnRole)>,
    next_ordinal: u32,
    container_available: bool,
    observed: Option<ObserveTarget>,
    injected_styles: Vec<String>,
    instant_scroll: bool,
    code_blocks: usize,
    media_nodes: usize,
    strip_calls: usize,
    tune_calls: usize,
    fail_ordinals: HashSet<u32>,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self {
            container_available: true,
            ..Self::default()
        }
    }

    /// Append one turn at the newest end, returning its ordinal.
    pub fn push_turn(&mut self, role: TurnRole) -> u32 {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        self.turns.push((ordinal, role));
        ordinal
    }

    /// Simulate the host page removing a turn on its own.
    pub fn detach_turn(&mut self, ordinal: u32) {
        self.turns.retain(|(o, _)| *o != ordinal);
    }

    /// Make `remove_turn` fail for this ordinal, for batch-tolerance tests.
    pub fn refuse_removal(&mut self, ordinal: u32) {
        self.fail_ordinals.insert(ordinal);
    }

    pub fn set_container_available(&mut self, available: bool) {
        self.container_available = available;
    }

    pub fn set_code_blocks(&mut self, count: usize) {
        self.code_blocks = count;
    }

    pub fn set_media_nodes(&mut self, count: usize) {
        self.media_nodes = count;
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    pub fn observed(&self) -> Option<ObserveTarget> {
        self.observed
    }

    pub fn injected_styles(&self) -> &[String] {
        &self.injected_styles
    }

    pub fn instant_scroll(&self) -> bool {
        self.instant_scroll
    }

    pub fn strip_calls(&self) -> usize {
        self.strip_calls
    }

    pub fn tune_calls(&self) -> usize {
        self.tune_calls
    }
}

impl HostPage for MemoryPage {
    fn conversation_turns(&self) -> Vec<TurnHandle> {
        self.turns
            .iter()
            .map(|&(ordinal, role)| TurnHandle { ordinal, role })
            .collect()
    }

    fn remove_turn(&mut self, handle: &TurnHandle) -> Result<(), PageError> {
        if self.fail_ordinals.contains(&handle.ordinal) {
            return Err(PageError::RemovalRefused {
                ordinal: handle.ordinal,
                reason: "injected failure".to_string(),
            });
        }
        // Already gone: benign, per the remove_turn contract.
        self.turns.retain(|(o, _)| *o != handle.ordinal);
        Ok(())
    }

    fn acquire_container(&mut self) -> ObserveTarget {
        let target = if self.container_available {
            ObserveTarget::Container
        } else {
            ObserveTarget::WholeDocument
        };
        self.observed = Some(target);
        target
    }

    fn release_container(&mut self) {
        self.observed = None;
    }

    fn inject_style(&mut self, id: &str, _css: &str) -> bool {
        if self.injected_styles.iter().any(|s| s == id) {
            return false;
        }
        self.injected_styles.push(id.to_string());
        true
    }

    fn set_instant_scroll(&mut self) {
        self.instant_scroll = true;
    }

    fn strip_code_highlighting(&mut self) -> usize {
        self.strip_calls += 1;
        self.code_blocks
    }

    fn tune_media_rendering(&mut self) -> usize {
        self.tune_calls += 1;
        self.media_nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turns_come_back_in_insertion_order() {
        let mut page = MemoryPage::new();
        page.push_turn(TurnRole::User);
        page.push_turn(TurnRole::Assistant);
        let turns = page.conversation_turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, TurnRole::User);
        assert_eq!(turns[1].role, TurnRole::Assistant);
        assert!(turns[0].ordinal < turns[1].ordinal);
    }

    #[test]
    fn removing_detached_turn_is_a_noop() {
        let mut page = MemoryPage::new();
        let ordinal = page.push_turn(TurnRole::User);
        let handle = page.conversation_turns()[0];
        page.detach_turn(ordinal);
        assert!(page.remove_turn(&handle).is_ok());
        assert_eq!(page.turn_count(), 0);
    }

    #[test]
    fn style_injection_dedupes_by_id() {
        let mut page = MemoryPage::new();
        assert!(page.inject_style("x", "body{}"));
        assert!(!page.inject_style("x", "body{}"));
        assert_eq!(page.injected_styles().len(), 1);
    }

    #[test]
    fn container_fallback_when_absent() {
        let mut page = MemoryPage::new();
        page.set_container_available(false);
        assert_eq!(page.acquire_container(), ObserveTarget::WholeDocument);
        page.set_container_available(true);
        assert_eq!(page.acquire_container(), ObserveTarget::Container);
    }

    #[test]
    fn role_parsing_defaults_to_unknown() {
        assert_eq!(TurnRole::from_attr("user"), TurnRole::User);
        assert_eq!(TurnRole::from_attr("assistant"), TurnRole::Assistant);
        assert_eq!(TurnRole::from_attr("system"), TurnRole::Unknown);
    }
}
