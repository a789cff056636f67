use crate::unit_defs::combat::CombatMetrics;
use crate::unit_defs::types::UnitProperties;

/// Values that count as 100% when scaling a unit's stats for display.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BaseValues {
    pub metal_cost: f64,
    pub energy_cost: f64,
    pub buildtime: f64,
    pub health: f64,
    pub speed: f64,
    pub sight_distance: f64,
    pub radar_distance: f64,
    pub jammer_distance: f64,
    pub sonar_distance: f64,
    pub buildpower: f64,
    pub dps: f64,
    pub weapon_range: f64,
    pub energy_per_second: f64,
    pub metal_per_second: f64,
    pub paralyze_time: f64,
}

/// Scales for a single unit shown on its own.
impl Default for BaseValues {
    fn default() -> Self {
        Self {
            metal_cost: 250.0,
            energy_cost: 900.0,
            buildtime: 1000.0,
            health: 150.0,
            speed: 1.5,
            sight_distance: 35.0,
            radar_distance: 35.0,
            jammer_distance: 10.0,
            sonar_distance: 35.0,
            buildpower: 3.0,
            dps: 0.0,
            weapon_range: 0.0,
            energy_per_second: 250.0,
            metal_per_second: 250.0,
            paralyze_time: 35.0,
        }
    }
}

impl BaseValues {
    /// Scales where the largest value among `units` is 100%.
    pub fn from_units<'a, I: IntoIterator<Item = &'a UnitProperties>>(units: I) -> Self {
        let zero = Self {
            metal_cost: 0.0,
            energy_cost: 0.0,
            buildtime: 0.0,
            health: 0.0,
            speed: 0.0,
            sight_distance: 0.0,
            radar_distance: 0.0,
            jammer_distance: 0.0,
            sonar_distance: 0.0,
            buildpower: 0.0,
            dps: 0.0,
            weapon_range: 0.0,
            energy_per_second: 0.0,
            metal_per_second: 0.0,
            paralyze_time: 0.0,
        };

        units.into_iter().fold(zero, |base, unit| {
            let metrics = unit.combat_metrics();
            let scaled = |value: f64| value / 100.0;
            Self {
                metal_cost: base.metal_cost.max(scaled(unit.metal_cost() as f64)),
                energy_cost: base.energy_cost.max(scaled(unit.energy_cost() as f64)),
                buildtime: base.buildtime.max(scaled(unit.buildtime() as f64)),
                health: base.health.max(scaled(unit.health() as f64)),
                speed: base.speed.max(scaled(unit.speed())),
                sight_distance: base.sight_distance.max(scaled(unit.sight_distance() as f64)),
                radar_distance: base.radar_distance.max(scaled(unit.radar_distance() as f64)),
                jammer_distance: base.jammer_distance.max(scaled(unit.jammer_distance() as f64)),
                sonar_distance: base.sonar_distance.max(scaled(unit.sonar_distance() as f64)),
                buildpower: base
                    .buildpower
                    .max(scaled(unit.buildpower().unwrap_or_default() as f64)),
                dps: base.dps.max(scaled(metrics.dps)),
                weapon_range: base.weapon_range.max(scaled(metrics.max_range)),
                energy_per_second: base.energy_per_second.max(scaled(metrics.energy_per_second)),
                metal_per_second: base.metal_per_second.max(scaled(metrics.metal_per_second)),
                paralyze_time: base.paralyze_time.max(scaled(metrics.paralyze_time)),
            }
        })
    }
}

/// `value` as a fraction of `base` percent, capped at 1. A non-positive base yields 0.
pub fn percentage(value: f64, base: f64) -> f64 {
    if base <= 0.0 {
        return 0.0;
    }
    (value / base).min(100.0) / 100.0
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stat {
    MetalCost,
    EnergyCost,
    Buildtime,
    Health,
    Speed,
    SightDistance,
    RadarDistance,
    JammerDistance,
    SonarDistance,
    Buildpower,
    Dps,
    WeaponRange,
    MetalPerSecond,
    EnergyPerSecond,
    ParalyzeTime,
}

impl Stat {
    pub fn label(self) -> &'static str {
        match self {
            Stat::MetalCost => "Metal cost",
            Stat::EnergyCost => "Energy cost",
            Stat::Buildtime => "Buildtime",
            Stat::Health => "Health",
            Stat::Speed => "Speed",
            Stat::SightDistance => "Sight range",
            Stat::RadarDistance => "Radar range",
            Stat::JammerDistance => "Jammer range",
            Stat::SonarDistance => "Sonar range",
            Stat::Buildpower => "Buildpower",
            Stat::Dps => "DPS",
            Stat::WeaponRange => "Weapon range",
            Stat::MetalPerSecond => "Metal/s",
            Stat::EnergyPerSecond => "Energy/s",
            Stat::ParalyzeTime => "Paralyze time",
        }
    }
}

impl std::fmt::Display for Stat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatLine {
    pub stat: Stat,
    pub value: f64,
    /// Share of the base value, in `0.0..=1.0`.
    pub fraction: f64,
}

/// The stats shown for a unit. Sensor, build power and secondary weapon figures are only
/// listed when the unit has them.
pub fn stat_lines(unit: &UnitProperties, metrics: &CombatMetrics, base: &BaseValues) -> Vec<StatLine> {
    let line = |stat, value: f64, base: f64| StatLine {
        stat,
        value,
        fraction: percentage(value, base),
    };

    let mut lines = vec![
        line(Stat::MetalCost, unit.metal_cost() as f64, base.metal_cost),
        line(Stat::EnergyCost, unit.energy_cost() as f64, base.energy_cost),
        line(Stat::Buildtime, unit.buildtime() as f64, base.buildtime),
        line(Stat::Health, unit.health() as f64, base.health),
        line(Stat::Speed, unit.speed(), base.speed),
        line(Stat::SightDistance, unit.sight_distance() as f64, base.sight_distance),
    ];

    let optional = [
        (Stat::RadarDistance, unit.radar_distance() as f64, base.radar_distance),
        (Stat::JammerDistance, unit.jammer_distance() as f64, base.jammer_distance),
        (Stat::SonarDistance, unit.sonar_distance() as f64, base.sonar_distance),
        (
            Stat::Buildpower,
            unit.buildpower().unwrap_or_default() as f64,
            base.buildpower,
        ),
    ];
    lines.extend(
        optional
            .into_iter()
            .filter(|(_, value, _)| *value != 0.0)
            .map(|(stat, value, base)| line(stat, value, base)),
    );

    if !unit.weapons().is_empty() {
        lines.push(line(Stat::Dps, metrics.dps.round(), base.dps));
        lines.push(line(Stat::WeaponRange, metrics.max_range.trunc(), base.weapon_range));

        let secondary = [
            (Stat::MetalPerSecond, metrics.metal_per_second.round(), base.metal_per_second),
            (Stat::EnergyPerSecond, metrics.energy_per_second.round(), base.energy_per_second),
            (Stat::ParalyzeTime, metrics.paralyze_time, base.paralyze_time),
        ];
        lines.extend(
            secondary
                .into_iter()
                .filter(|(_, value, _)| *value != 0.0)
                .map(|(stat, value, base)| line(stat, value, base)),
        );
    }

    lines
}
