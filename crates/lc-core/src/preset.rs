//! Optimization presets.
//!
//! Four fixed levels ordered by increasing aggressiveness. Each level's
//! cosmetic flag set is a superset of the previous one and its default
//! retention limit never decreases; the aggressive tiers carry larger
//! nominal limits because their trim passes overshoot below the limit.

use crate::time::Millis;

bitflags::bitflags! {
    /// Cosmetic optimization toggles bundled by a preset.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CosmeticFlags: u8 {
        /// Immediate (non-smooth) scrolling on the chat container.
        const OPTIMIZE_SCROLL = 1 << 0;
        /// Global near-zero animation/transition durations.
        const SUPPRESS_ANIMATIONS = 1 << 1;
        /// Trim passes overshoot below the retention limit.
        const AGGRESSIVE = 1 << 2;
        /// Strip syntax-highlighting colors from code blocks.
        const STRIP_HIGHLIGHTING = 1 << 3;
    }
}

/// Named optimization level, selected from the popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationLevel {
    Light,
    Medium,
    Aggressive,
    Ultra,
}

impl OptimizationLevel {
    pub const DEFAULT: Self = Self::Medium;

    /// All levels, ordered by increasing aggressiveness.
    pub const ALL: [Self; 4] = [Self::Light, Self::Medium, Self::Aggressive, Self::Ultra];

    /// Parse a level name. Matching is ASCII case-insensitive.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "medium" => Some(Self::Medium),
            "aggressive" => Some(Self::Aggressive),
            "ultra" => Some(Self::Ultra),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Medium => "medium",
            Self::Aggressive => "aggressive",
            Self::Ultra => "ultra",
        }
    }
}

/// Immutable bundle of cosmetic toggles and a retention default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub level: OptimizationLevel,
    pub flags: CosmeticFlags,
    pub default_retention_limit: u32,
}

const PRESETS: [Preset; 4] = [
    Preset {
        level: OptimizationLevel::Light,
        flags: CosmeticFlags::OPTIMIZE_SCROLL,
        default_retention_limit: 10,
    },
    Preset {
        level: OptimizationLevel::Medium,
        flags: CosmeticFlags::OPTIMIZE_SCROLL.union(CosmeticFlags::SUPPRESS_ANIMATIONS),
        default_retention_limit: 10,
    },
    Preset {
        level: OptimizationLevel::Aggressive,
        flags: CosmeticFlags::OPTIMIZE_SCROLL
            .union(CosmeticFlags::SUPPRESS_ANIMATIONS)
            .union(CosmeticFlags::AGGRESSIVE),
        default_retention_limit: 12,
    },
    Preset {
        level: OptimizationLevel::Ultra,
        flags: CosmeticFlags::all(),
        default_retention_limit: 15,
    },
];

impl Preset {
    /// Total lookup by level.
    pub fn of(level: OptimizationLevel) -> &'static Preset {
        match level {
            OptimizationLevel::Light => &PRESETS[0],
            OptimizationLevel::Medium => &PRESETS[1],
            OptimizationLevel::Aggressive => &PRESETS[2],
            OptimizationLevel::Ultra => &PRESETS[3],
        }
    }

    /// Lookup by name; unrecognized names fall back to the default level.
    pub fn lookup(name: &str) -> &'static Preset {
        match OptimizationLevel::parse(name) {
            Some(level) => Self::of(level),
            None => {
                log::warn!(
                    "unknown optimization level {name:?}, falling back to {}",
                    OptimizationLevel::DEFAULT.as_str()
                );
                Self::of(OptimizationLevel::DEFAULT)
            }
        }
    }

    pub fn aggressive(&self) -> bool {
        self.flags.contains(CosmeticFlags::AGGRESSIVE)
    }

    /// Debounce window for the change watcher: the aggressive tiers react
    /// faster to insertions.
    pub fn debounce_window_ms(&self) -> Millis {
        if self.aggressive() {
            500
        } else {
            1000
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retention_limits_never_decrease_with_aggressiveness() {
        let limits: Vec<u32> = OptimizationLevel::ALL
            .iter()
            .map(|&l| Preset::of(l).default_retention_limit)
            .collect();
        for pair in limits.windows(2) {
            assert!(pair[0] <= pair[1], "limits must be non-decreasing: {limits:?}");
        }
    }

    #[test]
    fn flags_grow_monotonically() {
        let mut prev = CosmeticFlags::empty();
        for &level in &OptimizationLevel::ALL {
            let flags = Preset::of(level).flags;
            assert!(
                flags.contains(prev),
                "{} must keep every flag of the previous tier",
                level.as_str()
            );
            prev = flags;
        }
    }

    #[test]
    fn aggressive_implies_animation_suppression() {
        for &level in &OptimizationLevel::ALL {
            let preset = Preset::of(level);
            if preset.aggressive() {
                assert!(preset.flags.contains(CosmeticFlags::SUPPRESS_ANIMATIONS));
            }
        }
    }

    #[test]
    fn unknown_name_falls_back_to_medium() {
        let preset = Preset::lookup("turbo");
        assert_eq!(preset.level, OptimizationLevel::Medium);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(OptimizationLevel::parse("ULTRA"), Some(OptimizationLevel::Ultra));
        assert_eq!(OptimizationLevel::parse("Light"), Some(OptimizationLevel::Light));
        assert_eq!(OptimizationLevel::parse("extreme"), None);
    }

    #[test]
    fn aggressive_tiers_use_the_faster_debounce_window() {
        assert_eq!(Preset::of(OptimizationLevel::Medium).debounce_window_ms(), 1000);
        assert_eq!(Preset::of(OptimizationLevel::Aggressive).debounce_window_ms(), 500);
        assert_eq!(Preset::of(OptimizationLevel::Ultra).debounce_window_ms(), 500);
    }
}
