use std::collections::BTreeMap;

use itertools::Itertools;

use super::types::UnitProperties;
use super::types::Weapon;
use super::types::WeaponDef;

/// Combat figures derived from a unit's weapon mounts and definitions.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatMetrics {
    pub dps: f64,
    pub energy_per_second: f64,
    pub metal_per_second: f64,
    /// Total stun seconds over all paralyzer mounts.
    pub paralyze_time: f64,
    /// Longest range over every weapon definition, mounted or not.
    pub max_range: f64,
    /// e.g. `"2x Cannon, LaserCannon"`.
    pub weapon_summary: String,
}

/// What a single mount adds to its unit's totals.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MountContribution {
    pub dps: f64,
    pub energy_per_second: f64,
    pub metal_per_second: f64,
    pub paralyze_time: f64,
}

/// Damage a mount deals per hit: its target category's entry when it has one, otherwise
/// the default entry.
pub fn mount_damage(def: &WeaponDef, mount: &Weapon) -> Option<f64> {
    let category = mount.only_target_category.as_str();
    if !category.is_empty() {
        if let Some(damage) = def.damage.get(category) {
            return Some(damage);
        }
    }
    def.damage.default_damage()
}

pub fn mount_contribution(def: &WeaponDef, mount: &Weapon) -> MountContribution {
    let mut contribution = MountContribution::default();
    let reload = def.reload_time;

    if reload > 0.0 {
        contribution.energy_per_second = def.energy_per_shot / reload;
        contribution.metal_per_second = def.metal_per_shot / reload;
    }

    let damage = match mount_damage(def, mount) {
        Some(damage) if damage != 0.0 => damage,
        _ => return contribution,
    };

    if def.paralyze_time != 0.0 {
        // Stun damage does not count towards DPS.
        contribution.paralyze_time = def.paralyze_time;
        return contribution;
    }

    let sweep_fire = def.sweep_fire_multiplier();
    if sweep_fire != 0.0 {
        contribution.dps = damage * sweep_fire;
    } else if reload > 0.0 {
        let mut dps = damage / reload;
        if def.burst != 0 {
            dps *= def.burst as f64;
        }
        if def.projectiles != 0 {
            dps *= def.projectiles as f64;
        }
        contribution.dps = dps;
    }

    contribution
}

pub fn max_weapon_range(defs: &BTreeMap<String, WeaponDef>) -> f64 {
    defs.values().map(|def| def.range).fold(0.0, f64::max)
}

/// Counts weapon definitions per type, ordered by type name. Definitions without a type
/// are not listed.
pub fn weapon_summary(defs: &BTreeMap<String, WeaponDef>) -> String {
    defs.values()
        .map(|def| def.weapon_type.as_str())
        .filter(|weapon_type| !weapon_type.is_empty())
        .counts()
        .into_iter()
        .sorted()
        .map(|(weapon_type, count)| {
            if count > 1 {
                format!("{count}x {weapon_type}")
            } else {
                weapon_type.to_string()
            }
        })
        .join(", ")
}

pub fn calculate(unit: &UnitProperties) -> CombatMetrics {
    let mut metrics = CombatMetrics {
        max_range: max_weapon_range(unit.weapon_defs()),
        weapon_summary: weapon_summary(unit.weapon_defs()),
        ..Default::default()
    };

    for mount in unit.weapons() {
        let Some(def) = unit.weapon_def(&mount.def) else {
            continue;
        };
        let contribution = mount_contribution(def, mount);
        metrics.dps += contribution.dps;
        metrics.energy_per_second += contribution.energy_per_second;
        metrics.metal_per_second += contribution.metal_per_second;
        metrics.paralyze_time += contribution.paralyze_time;
    }

    metrics
}
