//! Player level derived from experience.
//!
//! Levels 1 to 20 use a fixed breakpoint table; beyond that every level
//! costs a constant amount of experience.

/// Experience at which levels 1..=20 begin.
const THRESHOLDS: [i64; 20] = [
    0, 80, 200, 400, 700, 1_100, 1_650, 2_400, 3_400, 4_700, 6_300, 8_300, 10_800, 13_800,
    17_400, 21_600, 26_500, 32_100, 38_500, 45_700,
];

/// Experience per level beyond the table.
pub const XP_PER_LEVEL_BEYOND_TABLE: i64 = 8_000;

fn table_levels() -> u32 {
    u32::try_from(THRESHOLDS.len()).unwrap_or(u32::MAX)
}

fn last_threshold() -> i64 {
    THRESHOLDS.last().copied().unwrap_or(0)
}

/// Level reached with `xp` experience.
pub fn level_for_xp(xp: i64) -> u32 {
    let last = last_threshold();
    if xp >= last {
        let beyond = xp.saturating_sub(last) / XP_PER_LEVEL_BEYOND_TABLE;
        let beyond = u32::try_from(beyond).unwrap_or(u32::MAX);
        return table_levels().saturating_add(beyond);
    }
    let passed = THRESHOLDS.iter().take_while(|t| **t <= xp).count();
    u32::try_from(passed).unwrap_or(1).max(1)
}

/// Experience at which `level` begins.
pub fn xp_for_level(level: u32) -> i64 {
    let level = level.max(1);
    if level <= table_levels() {
        let index = usize::try_from(level.saturating_sub(1)).unwrap_or(0);
        return THRESHOLDS.get(index).copied().unwrap_or(0);
    }
    let beyond = i64::from(level.saturating_sub(table_levels()));
    last_threshold().saturating_add(beyond.saturating_mul(XP_PER_LEVEL_BEYOND_TABLE))
}

/// Level plus distance to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct LevelProgress {
    /// Current level.
    pub level: u32,
    /// Current experience.
    pub xp: i64,
    /// Experience at which the next level begins.
    pub next_level_xp: i64,
}

/// Derive level progress from experience.
pub fn progress(xp: i64) -> LevelProgress {
    let level = level_for_xp(xp);
    LevelProgress {
        level,
        xp,
        next_level_xp: xp_for_level(level.saturating_add(1)),
    }
}
