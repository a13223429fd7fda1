//! Best-effort role labels from incomplete signals.
//!
//! The thresholds below are tunable guesses that worked on real raid logs;
//! they are not derived from game mechanics and misclassify off-tanks,
//! hybrid healers, and players whose casts were out of logging range.

use std::collections::HashMap;

use crate::models::{Role, RoleSignals};

pub const TANK_MIN_TAUNTS: u32 = 2;
pub const TANK_MIN_PRIMARY_RATIO: f64 = 0.55;
pub const TANK_MIN_ABILITY_CASTS: u32 = 8;
pub const TANK_MIN_TOP_PCT: f64 = 60.0;
pub const HEALER_MIN_HEALS: u32 = 10;
/// Heals must outnumber tank-ish casts by this factor
pub const HEALER_TANK_SIGNAL_FACTOR: u32 = 2;

/// Classify one unit; the first matching rule wins.
pub fn classify_role(avg_top_pct: f64, primary_target_ratio: f64, signals: &RoleSignals) -> Role {
    let tank_by_abilities =
        signals.tank_abilities >= TANK_MIN_ABILITY_CASTS && avg_top_pct >= TANK_MIN_TOP_PCT;
    if signals.taunts >= TANK_MIN_TAUNTS
        || primary_target_ratio >= TANK_MIN_PRIMARY_RATIO
        || tank_by_abilities
    {
        return Role::Tank;
    }

    let tank_signals = signals.tank_abilities.saturating_add(signals.taunts);
    let heal_floor = HEALER_MIN_HEALS.max(tank_signals.saturating_mul(HEALER_TANK_SIGNAL_FACTOR));
    if signals.heals >= heal_floor {
        return Role::Healer;
    }

    Role::Dps
}

/// Classify a named unit, treating a missing signal entry as all zeros
pub fn classify_unit(
    unit: &str,
    avg_top_pct: f64,
    primary_target_ratio: f64,
    signals: &HashMap<String, RoleSignals>,
) -> Role {
    let sig = signals.get(unit).copied().unwrap_or_default();
    classify_role(avg_top_pct, primary_target_ratio, &sig)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(heals: u32, taunts: u32, tank_abilities: u32) -> RoleSignals {
        RoleSignals {
            heals,
            taunts,
            tank_abilities,
        }
    }

    #[test]
    fn taunts_make_a_tank_regardless_of_threat() {
        assert_eq!(classify_role(0.0, 0.0, &signals(0, 3, 0)), Role::Tank);
        assert_eq!(classify_role(100.0, 0.0, &signals(0, 3, 0)), Role::Tank);
    }

    #[test]
    fn holding_aggro_makes_a_tank() {
        assert_eq!(classify_role(0.0, 0.55, &RoleSignals::default()), Role::Tank);
        assert_eq!(classify_role(0.0, 0.54, &RoleSignals::default()), Role::Dps);
    }

    #[test]
    fn tank_abilities_need_high_threat() {
        assert_eq!(classify_role(60.0, 0.0, &signals(0, 0, 8)), Role::Tank);
        assert_eq!(classify_role(59.9, 0.0, &signals(0, 0, 8)), Role::Dps);
    }

    #[test]
    fn healer_floor_scales_with_tank_signals() {
        assert_eq!(classify_role(10.0, 0.0, &signals(10, 0, 0)), Role::Healer);
        assert_eq!(classify_role(10.0, 0.0, &signals(9, 0, 0)), Role::Dps);
        // 7 tank abilities + 1 taunt -> needs 16 heals
        assert_eq!(classify_role(10.0, 0.0, &signals(15, 1, 7)), Role::Dps);
        assert_eq!(classify_role(10.0, 0.0, &signals(16, 1, 7)), Role::Healer);
    }

    #[test]
    fn tank_rule_takes_priority_over_healer_rule() {
        assert_eq!(classify_role(0.0, 0.9, &signals(500, 0, 0)), Role::Tank);
    }

    #[test]
    fn classification_is_order_independent() {
        let inputs = [
            (10.0, 0.1, signals(20, 0, 0)),
            (80.0, 0.7, signals(0, 0, 0)),
            (30.0, 0.0, signals(0, 0, 2)),
        ];
        let forward: Vec<Role> = inputs.iter().map(|(p, r, s)| classify_role(*p, *r, s)).collect();
        let backward: Vec<Role> = inputs
            .iter()
            .rev()
            .map(|(p, r, s)| classify_role(*p, *r, s))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        assert_eq!(forward, backward);
        assert_eq!(forward, vec![Role::Healer, Role::Tank, Role::Dps]);
    }

    #[test]
    fn missing_signals_count_as_zero() {
        let map = HashMap::new();
        assert_eq!(classify_unit("Nobody", 20.0, 0.1, &map), Role::Dps);
    }
}
