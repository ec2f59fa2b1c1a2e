//! Optimization applier.
//!
//! Applies a preset's cosmetic optimizations to the host page. Application
//! is idempotent; effects are one-way and persist until page reload (no
//! preset clears a previously applied cosmetic).

use crate::page::HostPage;
use crate::preset::{CosmeticFlags, Preset};

/// Id of the injected animation-suppression style rule. The page-side
/// dedup on this id is what makes reapplication a no-op.
pub const ANIMATION_STYLE_ID: &str = "leanchat-no-animations";

/// Forces near-zero animation and transition durations everywhere.
pub const ANIMATION_STYLE_CSS: &str = "\
*, *::before, *::after {\
 animation-duration: 0.01ms !important;\
 animation-iteration-count: 1 !important;\
 transition-duration: 0.01ms !important;\
}";

/// Apply `preset`'s cosmetic optimizations to `page`.
///
/// Safe to call repeatedly with the same preset: the style injection
/// dedupes by id and the remaining hooks overwrite in place. Switching to a
/// preset with fewer flags does not undo earlier effects; they last until
/// the page reloads.
pub fn apply<P: HostPage>(page: &mut P, preset: &Preset) {
    if preset.flags.contains(CosmeticFlags::SUPPRESS_ANIMATIONS)
        && page.inject_style(ANIMATION_STYLE_ID, ANIMATION_STYLE_CSS)
    {
        log::debug!("animation suppression injected");
    }

    if preset.flags.contains(CosmeticFlags::OPTIMIZE_SCROLL) {
        page.set_instant_scroll();
    }

    if preset.flags.contains(CosmeticFlags::STRIP_HIGHLIGHTING) {
        let stripped = page.strip_code_highlighting();
        log::debug!("stripped highlighting from {stripped} code blocks");
    }

    if preset.flags.contains(CosmeticFlags::AGGRESSIVE) {
        let tuned = page.tune_media_rendering();
        log::debug!("tuned rendering on {tuned} media elements");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::MemoryPage;
    use crate::preset::OptimizationLevel;

    #[test]
    fn reapplying_does_not_stack_styles() {
        let mut page = MemoryPage::new();
        let preset = Preset::of(OptimizationLevel::Medium);
        apply(&mut page, preset);
        apply(&mut page, preset);
        assert_eq!(page.injected_styles(), [ANIMATION_STYLE_ID]);
    }

    #[test]
    fn light_skips_animation_suppression() {
        let mut page = MemoryPage::new();
        apply(&mut page, Preset::of(OptimizationLevel::Light));
        assert!(page.injected_styles().is_empty());
        assert!(page.instant_scroll());
    }

    #[test]
    fn ultra_runs_every_hook() {
        let mut page = MemoryPage::new();
        page.set_code_blocks(3);
        page.set_media_nodes(2);
        apply(&mut page, Preset::of(OptimizationLevel::Ultra));
        assert_eq!(page.injected_styles(), [ANIMATION_STYLE_ID]);
        assert!(page.instant_scroll());
        assert_eq!(page.strip_calls(), 1);
        assert_eq!(page.tune_calls(), 1);
    }

    #[test]
    fn switching_presets_leaves_prior_effects_in_place() {
        let mut page = MemoryPage::new();
        apply(&mut page, Preset::of(OptimizationLevel::Medium));
        apply(&mut page, Preset::of(OptimizationLevel::Light));
        // One-way cosmetics: the injected rule stays.
        assert_eq!(page.injected_styles(), [ANIMATION_STYLE_ID]);
    }
}
