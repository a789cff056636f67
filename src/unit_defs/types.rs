use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use bon::Builder;

use super::combat;
use super::combat::CombatMetrics;
use super::keys;

/// Unit identifier, the file stem of the unit's definition document (e.g. `armpw`).
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct UnitRef(String);

impl UnitRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Faction prefix of the ref: `arm`, `cor` or `leg`.
    pub fn faction_code(&self) -> &str {
        self.0.get(..3).unwrap_or(&self.0)
    }
}

impl fmt::Display for UnitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for UnitRef {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for UnitRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UnitRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UnitRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl PartialEq<str> for UnitRef {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for UnitRef {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[derive(Clone, Builder, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CustomParams {
    /// 0 when the document does not say; filled in by the tech level resolver.
    #[builder(default)]
    tech_level: i32,
    #[builder(default, into)]
    unit_group: String,
}

impl CustomParams {
    pub fn tech_level(&self) -> i32 {
        self.tech_level
    }

    pub fn unit_group(&self) -> &str {
        &self.unit_group
    }

    pub fn is_builder(&self, marker: &str) -> bool {
        self.unit_group.contains(marker)
    }
}

/// Damage per armor category, keyed by lower-cased category name plus `default`.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Damage(BTreeMap<String, f64>);

impl Damage {
    pub fn insert(&mut self, category: &str, amount: f64) {
        self.0.insert(category.to_lowercase(), amount);
    }

    pub fn get(&self, category: &str) -> Option<f64> {
        self.0.get(&category.to_lowercase()).copied()
    }

    pub fn default_damage(&self) -> Option<f64> {
        self.0.get(keys::DEFAULT_DAMAGE).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(category, amount)| (category.as_str(), *amount))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<(S, f64)> for Damage {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut damage = Damage::default();
        for (category, amount) in iter {
            damage.insert(category.as_ref(), amount);
        }
        damage
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Shield {
    pub repulser: bool,
    pub smart: bool,
    pub exterior: bool,
    pub max_speed: f64,
    pub force: f64,
    pub radius: f64,
    pub power: f64,
    pub starting_power: f64,
    pub power_regen: f64,
    pub power_regen_energy: f64,
    pub energy_use: f64,
}

/// One entry of a unit's `weapons` array: which weapon definition is mounted and how it
/// picks targets.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Weapon {
    /// Name of the mounted weapon definition, matched case-insensitively.
    pub def: String,
    pub only_target_category: String,
    pub bad_target_category: Vec<String>,
    pub fast_auto_retargeting: bool,
    pub max_angle_dif: f64,
    pub main_dir: String,
}

/// A weapon definition from a unit's `weapondefs` table.
///
/// Every scalar field is read from the key equal to the field name with underscores
/// removed (`damage_area_of_effect` comes from `damageareaofeffect`). Fields absent from
/// the document hold their zero value.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeaponDef {
    pub name: String,
    /// Engine weapon class, e.g. `Cannon`, `BeamLaser`, `MissileLauncher`.
    pub weapon_type: String,
    pub id: i64,
    /// `customparams` with every value rendered as a string.
    pub custom_params: BTreeMap<String, String>,

    // Targeting avoidance and collision
    pub avoid_friendly: bool,
    pub avoid_feature: bool,
    pub avoid_neutral: bool,
    pub avoid_ground: bool,
    pub avoid_cloaked: bool,
    pub collide_enemy: bool,
    pub collide_friendly: bool,
    pub collide_feature: bool,
    pub collide_neutral: bool,
    pub collide_fire_base: bool,
    pub collide_non_target: bool,
    pub collide_ground: bool,
    pub collide_cloaked: bool,

    // Damage and explosion
    pub damage: Damage,
    pub explosion_speed: f64,
    pub impact_only: bool,
    pub no_self_damage: bool,
    pub no_explode: bool,
    pub burnblow: bool,
    pub damage_area_of_effect: f64,
    pub edge_effectiveness: f64,
    pub collision_size: f64,

    // Projectile and firing cycle
    pub weapon_velocity: f64,
    pub start_velocity: f64,
    pub weaponacceleration: f64,
    /// Seconds between salvos.
    pub reload_time: f64,
    pub burst_rate: f64,
    /// Shots per salvo, 0 when unset.
    pub burst: i64,
    /// Projectiles per shot, 0 when unset.
    pub projectiles: i64,
    pub water_bounce: bool,
    pub ground_bounce: bool,
    pub bounce_slip: f64,
    pub bounce_rebound: f64,
    pub num_bounce: i64,
    pub impulse_factor: f64,
    pub impulse_boost: f64,
    pub crater_mult: f64,
    pub crater_boost: f64,
    pub crater_area_of_effect: f64,
    pub waterweapon: bool,
    pub submissile: bool,
    pub fire_submersed: bool,
    pub commandfire: bool,

    // Range and aiming
    pub range: f64,
    pub heightmod: f64,
    pub target_border: f64,
    pub cylinder_targeting: f64,
    pub turret: bool,
    pub fixed_launcher: bool,
    pub tolerance: f64,
    pub firetolerance: f64,
    pub high_trajectory: i64,
    pub trajectory_height: f64,
    pub tracks: bool,
    pub wobble: f64,
    pub dance: f64,
    pub gravity_affected: bool,
    pub my_gravity: f64,
    pub can_attack_ground: bool,
    pub weapon_timer: f64,
    pub flighttime: f64,
    pub turnrate: f64,
    pub height_boost_factor: f64,
    pub proximity_priority: f64,
    pub allow_non_blocking_aim: bool,
    pub accuracy: f64,
    pub spray_angle: f64,
    pub moving_accuracy: f64,
    pub target_move_error: f64,
    pub lead_limit: f64,
    pub lead_bonus: f64,
    pub predict_boost: f64,
    pub owner_exp_acc_weight: f64,

    // Beams and flames
    pub min_intensity: f64,
    pub duration: f64,
    pub beamtime: f64,
    pub beamburst: bool,
    pub beam_ttl: i64,
    pub sweep_fire: bool,
    pub large_beam_laser: bool,
    pub size_growth: f64,
    pub flame_gfx_time: f64,

    // Resources and special effects
    pub metal_per_shot: f64,
    pub energy_per_shot: f64,
    pub fire_starter: f64,
    pub paralyzer: bool,
    /// Seconds a hit keeps the target stunned. Non-zero marks a paralyzer weapon.
    pub paralyze_time: f64,
    pub stockpile: bool,
    pub stockpile_time: f64,
    pub targetable: i64,
    pub interceptor: i64,
    pub intercepted_by_shield_type: i64,
    pub coverage: f64,
    pub intercept_solo: bool,
    pub dyn_damage_inverted: bool,
    pub dyn_damage_exp: f64,
    pub dyn_damage_min: f64,
    pub dyn_damage_range: f64,
    pub shield: Shield,
    pub recharge_delay: f64,

    // Visuals
    pub model: String,
    pub size: f64,
    pub scar_glow_color_map: String,
    pub explosion_scar: bool,
    pub scar_diameter: f64,
    pub scar_alpha: f64,
    pub scar_glow: f64,
    pub scar_ttl: f64,
    pub scar_glow_ttl: f64,
    pub scar_dot_elimination: f64,
    pub scar_proj_vector: [f64; 4],
    pub scar_color_tint: [f64; 4],
    pub always_visible: bool,
    pub camera_shake: f64,
    pub smoke_trail: bool,
    pub smoke_trail_cast_shadow: bool,
    pub smoke_period: i64,
    pub smoke_time: i64,
    pub smoke_size: f64,
    pub smoke_color: f64,
    pub cast_shadow: bool,
    pub size_decay: f64,
    pub alpha_decay: f64,
    pub separation: f64,
    pub no_gap: bool,
    pub stages: i64,
    pub lod_distance: i64,
    pub thickness: f64,
    pub core_thickness: f64,
    pub laser_flare_size: f64,
    pub tile_length: f64,
    pub scroll_speed: f64,
    pub pulse_speed: f64,
    pub beam_decay: f64,
    pub falloff_rate: f64,
    pub hardstop: bool,
    pub rgb_color: [f64; 3],
    pub rgb_color2: [f64; 3],
    pub intensity: f64,
    pub colormap: String,
    pub ceg_tag: String,
    pub explosion_generator: String,
    pub bounce_explosion_generator: String,

    // Sounds
    pub sound_trigger: bool,
    pub sound_start: String,
    pub sound_hit_dry: String,
    pub sound_hit_wet: String,
    pub sound_start_volume: f64,
    pub sound_hit_dry_volume: f64,
    pub sound_hit_wet_volume: f64,
}

impl WeaponDef {
    /// Sweep-fire damage multiplier from `customparams.sweepfire`, 0 when absent or not a number.
    pub fn sweep_fire_multiplier(&self) -> f64 {
        self.custom_params
            .get(keys::SWEEP_FIRE)
            .and_then(|value| value.trim().parse::<f64>().ok())
            .unwrap_or_default()
    }
}

/// Everything the catalog knows about one unit.
#[derive(Clone, Builder, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitProperties {
    #[builder(into)]
    unit_ref: UnitRef,
    #[builder(default)]
    metal_cost: i64,
    #[builder(default)]
    energy_cost: i64,
    /// Build effort in engine work units; a builder with 100 build power needs
    /// `buildtime / 100` seconds.
    #[builder(default)]
    buildtime: i64,
    /// `None` when the unit has no build menu at all, which is different from an empty one.
    build_options: Option<Vec<UnitRef>>,
    #[builder(default)]
    health: i64,
    #[builder(default)]
    sight_distance: i64,
    /// Zero for structures.
    #[builder(default)]
    speed: f64,
    /// Build power (`workertime`), present only on units that construct.
    buildpower: Option<i64>,
    #[builder(default)]
    sonar_distance: i64,
    #[builder(default)]
    radar_distance: i64,
    #[builder(default)]
    jammer_distance: i64,
    /// Keyed by lower-cased weapon definition name.
    #[builder(default)]
    weapon_defs: BTreeMap<String, WeaponDef>,
    #[builder(default)]
    weapons: Vec<Weapon>,
    #[builder(default)]
    custom_params: CustomParams,
}

impl UnitProperties {
    pub fn unit_ref(&self) -> &UnitRef {
        &self.unit_ref
    }

    pub fn metal_cost(&self) -> i64 {
        self.metal_cost
    }

    pub fn energy_cost(&self) -> i64 {
        self.energy_cost
    }

    pub fn buildtime(&self) -> i64 {
        self.buildtime
    }

    pub fn build_options(&self) -> Option<&[UnitRef]> {
        self.build_options.as_deref()
    }

    pub fn health(&self) -> i64 {
        self.health
    }

    pub fn sight_distance(&self) -> i64 {
        self.sight_distance
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn buildpower(&self) -> Option<i64> {
        self.buildpower
    }

    pub fn sonar_distance(&self) -> i64 {
        self.sonar_distance
    }

    pub fn radar_distance(&self) -> i64 {
        self.radar_distance
    }

    pub fn jammer_distance(&self) -> i64 {
        self.jammer_distance
    }

    pub fn weapon_defs(&self) -> &BTreeMap<String, WeaponDef> {
        &self.weapon_defs
    }

    pub fn weapons(&self) -> &[Weapon] {
        &self.weapons
    }

    pub fn custom_params(&self) -> &CustomParams {
        &self.custom_params
    }

    pub fn tech_level(&self) -> i32 {
        self.custom_params.tech_level
    }

    pub(crate) fn set_tech_level(&mut self, tech_level: i32) {
        self.custom_params.tech_level = tech_level;
    }

    /// Weapon definition by name, ignoring case.
    pub fn weapon_def(&self, name: &str) -> Option<&WeaponDef> {
        self.weapon_defs.get(&name.to_lowercase())
    }

    pub fn can_build(&self, unit: &str) -> bool {
        self.build_options
            .as_ref()
            .is_some_and(|options| options.iter().any(|option| option == unit))
    }

    pub fn is_builder(&self, marker: &str) -> bool {
        self.custom_params.is_builder(marker)
    }

    pub fn is_mobile(&self) -> bool {
        self.speed > 0.0
    }

    /// Wall-clock build time for a builder with 100 build power.
    pub fn build_duration(&self) -> Duration {
        Duration::from_secs(u64::try_from(self.buildtime / 100).unwrap_or_default())
    }

    pub fn faction_code(&self) -> &str {
        self.unit_ref.faction_code()
    }

    pub fn combat_metrics(&self) -> CombatMetrics {
        combat::calculate(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unit_ref_behaves_like_a_string() {
        let unit = UnitRef::from("armpw");
        assert_eq!(unit, "armpw");
        assert_eq!(unit.faction_code(), "arm");
        assert_eq!(UnitRef::from("ab").faction_code(), "ab");
        assert_eq!(unit.to_string(), "armpw");

        let mut map = BTreeMap::new();
        map.insert(unit.clone(), 1);
        assert_eq!(map.get("armpw"), Some(&1));
    }

    #[test]
    fn damage_lookup_ignores_case() {
        let damage: Damage = [("default", 40.0), ("VTOL", 10.0)].into_iter().collect();
        assert_eq!(damage.get("vtol"), Some(10.0));
        assert_eq!(damage.get("Vtol"), Some(10.0));
        assert_eq!(damage.default_damage(), Some(40.0));
        assert_eq!(damage.get("subs"), None);
    }

    #[test]
    fn build_menu_helpers() {
        let lab = UnitProperties::builder()
            .unit_ref("armlab")
            .buildtime(6500)
            .build_options(vec![UnitRef::from("armck"), UnitRef::from("armpw")])
            .build();

        assert!(lab.can_build("armpw"));
        assert!(!lab.can_build("armham"));
        assert_eq!(lab.build_duration(), Duration::from_secs(65));
        assert!(!lab.is_mobile());

        let structure = UnitProperties::builder().unit_ref("armsolar").build();
        assert!(structure.build_options().is_none());
        assert!(!structure.can_build("armpw"));
    }

    #[test]
    fn sweep_fire_multiplier_parses_custom_param() {
        let mut def = WeaponDef::default();
        assert_eq!(def.sweep_fire_multiplier(), 0.0);
        def.custom_params.insert("sweepfire".to_string(), "0.5".to_string());
        assert_eq!(def.sweep_fire_multiplier(), 0.5);
    }
}
