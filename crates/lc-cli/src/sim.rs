//! Transcript simulator.
//!
//! Replays a growing conversation against a fresh engine instance on the
//! in-memory page, with a fake clock stepping through insertion
//! notifications and timer deadlines exactly as a live page would.

use lc_core::{
    Controller, MemoryPage, MemorySettings, OptimizationLevel, Preset, StoredSettings, TurnRole,
};

pub struct SimOptions {
    pub turns: u32,
    pub interval_ms: u64,
    pub level: String,
    pub limit: Option<u32>,
    pub json: bool,
}

pub fn run(options: &SimOptions) -> Result<(), String> {
    let level = OptimizationLevel::parse(&options.level).ok_or_else(|| {
        format!(
            "unknown level {:?} (expected light, medium, aggressive or ultra)",
            options.level
        )
    })?;
    let preset = Preset::of(level);
    let retention_limit = options.limit.unwrap_or(preset.default_retention_limit);
    if retention_limit < 1 {
        return Err("retention limit must be at least 1".to_string());
    }

    let store = MemorySettings::new(StoredSettings {
        enabled: true,
        retention_limit,
        preset_name: level.as_str().to_string(),
    });
    let mut controller = Controller::new(MemoryPage::new(), store);

    let mut now: u64 = 0;
    let mut passes = 0usize;
    controller.activate(now);

    let mut role = TurnRole::User;
    for _ in 0..options.turns {
        now += options.interval_ms;
        controller.page_mut().push_turn(role);
        role = match role {
            TurnRole::User => TurnRole::Assistant,
            _ => TurnRole::User,
        };
        controller.on_insertions(true, now);
        passes += step(&mut controller, now, options.json);
    }

    // Conversation stops; drain whatever is still scheduled.
    while let Some(deadline) = controller.next_deadline() {
        now = deadline;
        passes += step(&mut controller, now, options.json);
    }

    let status = controller.status();
    if options.json {
        let text = serde_json::to_string_pretty(&status).map_err(|e| e.to_string())?;
        println!("{text}");
    } else {
        println!(
            "appended {} turns over {}ms at level {}",
            options.turns,
            options.turns as u64 * options.interval_ms,
            level.as_str()
        );
        println!(
            "trim passes: {passes}, removed {} turns, {} remaining (limit {})",
            status.trimmed_total, status.element_count, status.retention_limit
        );
        println!(
            "estimated reduction: {}%",
            status.estimated_reduction_percent
        );
    }
    Ok(())
}

/// Advance the engine to `now`; returns 1 when a trim pass removed turns.
fn step(
    controller: &mut Controller<MemoryPage, MemorySettings>,
    now: u64,
    quiet: bool,
) -> usize {
    let before = controller.page().turn_count();
    controller.tick(now);
    let after = controller.page().turn_count();
    if after < before {
        if !quiet {
            println!("t={now:>7}ms  trimmed {} turns, {} remain", before - after, after);
        }
        1
    } else {
        0
    }
}
