//! Retention engine.
//!
//! Decides which conversation turns are stale and detaches them. The
//! planning step is pure; the pass itself is a bounded synchronous scan
//! that tolerates per-element failures.

use crate::page::{HostPage, TurnHandle};

/// Outcome of one trim pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimReport {
    /// Turns detached by this pass.
    pub removed: usize,
    /// Turns that failed to detach and were skipped.
    pub failed: usize,
    /// Matching turns left in the document after the pass.
    pub remaining: usize,
}

/// Oldest-first slice of `turns` to remove.
///
/// At or under the limit the plan is empty. Over the limit the non-aggressive
/// plan removes exactly `count - limit` turns; the aggressive plan overshoots
/// to `target_keep = ceil(limit * 0.8)` to create headroom before the next
/// pass. Order is document order, so ties are stable by construction.
pub fn plan_removals(turns: &[TurnHandle], retention_limit: u32, aggressive: bool) -> &[TurnHandle] {
    let count = turns.len();
    let limit = retention_limit.max(1) as usize;
    if count <= limit {
        return &turns[..0];
    }

    let remove = if aggressive {
        let target_keep = (limit * 4).div_ceil(5);
        (count - target_keep).max(1)
    } else {
        count - limit
    };

    &turns[..remove.min(count)]
}

/// Execute one synchronous trim pass against the page.
///
/// Removals happen oldest-first and complete before this returns. A failed
/// removal is logged and skipped; it never aborts the rest of the batch.
pub fn run_trim_pass<P: HostPage>(page: &mut P, retention_limit: u32, aggressive: bool) -> TrimReport {
    let turns = page.conversation_turns();
    let plan = plan_removals(&turns, retention_limit, aggressive);

    let mut removed = 0;
    let mut failed = 0;
    for handle in plan {
        match page.remove_turn(handle) {
            Ok(()) => {
                removed += 1;
                log::debug!("removed {} turn #{}", handle.role.as_str(), handle.ordinal);
            }
            Err(err) => {
                failed += 1;
                log::warn!("skipping turn #{}: {err}", handle.ordinal);
            }
        }
    }

    let remaining = page.conversation_turns().len();
    if removed > 0 || failed > 0 {
        log::debug!("trim pass: removed {removed}, failed {failed}, remaining {remaining}");
    }

    TrimReport {
        removed,
        failed,
        remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{MemoryPage, TurnRole};

    fn handles(count: usize) -> Vec<TurnHandle> {
        (0..count as u32)
            .map(|ordinal| TurnHandle {
                ordinal,
                role: if ordinal % 2 == 0 {
                    TurnRole::User
                } else {
                    TurnRole::Assistant
                },
            })
            .collect()
    }

    fn page_with_turns(count: usize) -> MemoryPage {
        let mut page = MemoryPage::new();
        for i in 0..count {
            page.push_turn(if i % 2 == 0 {
                TurnRole::User
            } else {
                TurnRole::Assistant
            });
        }
        page
    }

    #[test]
    fn at_or_under_limit_plans_nothing() {
        for count in 0..=5 {
            let turns = handles(count);
            assert!(plan_removals(&turns, 5, false).is_empty());
            assert!(plan_removals(&turns, 5, true).is_empty());
        }
    }

    #[test]
    fn non_aggressive_removes_exactly_the_overflow() {
        let turns = handles(12);
        let plan = plan_removals(&turns, 5, false);
        assert_eq!(plan.len(), 7);
        // Oldest first, document order preserved.
        let ordinals: Vec<u32> = plan.iter().map(|h| h.ordinal).collect();
        assert_eq!(ordinals, (0..7).collect::<Vec<u32>>());
    }

    #[test]
    fn aggressive_overshoots_to_eighty_percent_keep() {
        // target_keep = ceil(5 * 0.8) = 4, so 12 - 4 = 8 removed.
        let turns = handles(12);
        let plan = plan_removals(&turns, 5, true);
        assert_eq!(plan.len(), 8);
    }

    #[test]
    fn aggressive_removes_at_least_one_over_limit() {
        // count 11, limit 10, target_keep 8 -> removes 3; count 9 stays put.
        let turns = handles(11);
        assert_eq!(plan_removals(&turns, 10, true).len(), 3);
        let turns = handles(9);
        assert!(plan_removals(&turns, 10, true).is_empty());
    }

    #[test]
    fn zero_limit_is_treated_as_one() {
        let turns = handles(4);
        assert_eq!(plan_removals(&turns, 0, false).len(), 3);
    }

    #[test]
    fn pass_converges_in_one_round() {
        let mut page = page_with_turns(12);
        let report = run_trim_pass(&mut page, 5, false);
        assert_eq!(report.removed, 7);
        assert_eq!(report.remaining, 5);
        // Second pass is a no-op: idempotent at/under capacity.
        let report = run_trim_pass(&mut page, 5, false);
        assert_eq!(report.removed, 0);
        assert_eq!(report.remaining, 5);
    }

    #[test]
    fn aggressive_pass_lands_at_target_keep() {
        let mut page = page_with_turns(12);
        let report = run_trim_pass(&mut page, 5, true);
        assert_eq!(report.removed, 8);
        assert_eq!(report.remaining, 4);
    }

    #[test]
    fn pass_keeps_the_newest_turns() {
        let mut page = page_with_turns(12);
        run_trim_pass(&mut page, 5, false);
        let ordinals: Vec<u32> = page.conversation_turns().iter().map(|h| h.ordinal).collect();
        assert_eq!(ordinals, vec![7, 8, 9, 10, 11]);
    }

    #[test]
    fn failed_removal_does_not_abort_the_batch() {
        let mut page = page_with_turns(12);
        page.refuse_removal(2);
        let report = run_trim_pass(&mut page, 5, false);
        assert_eq!(report.removed, 6);
        assert_eq!(report.failed, 1);
        assert_eq!(report.remaining, 6);
    }

    #[test]
    fn removing_a_stale_handle_is_tolerated() {
        let mut page = page_with_turns(12);
        let stale = page.conversation_turns();
        // The host page yanks a turn between planning and removal.
        page.detach_turn(3);
        for handle in plan_removals(&stale, 5, false) {
            assert!(page.remove_turn(handle).is_ok());
        }
        assert_eq!(page.turn_count(), 5);
    }
}
