//! Constants for unit definition table keys.
//!
//! Weapon definition fields are not listed here; their key is always the lower-cased
//! field name and [`super::parser`] derives it from the field directly.

// Unit top-level keys
pub const METAL_COST: &str = "metalcost";
pub const BUILD_COST_METAL: &str = "buildcostmetal";
pub const ENERGY_COST: &str = "energycost";
pub const BUILD_COST_ENERGY: &str = "buildcostenergy";
pub const BUILD_TIME: &str = "buildtime";
pub const HEALTH: &str = "health";
pub const SIGHT_DISTANCE: &str = "sightdistance";
pub const SPEED: &str = "speed";
pub const WORKER_TIME: &str = "workertime";
pub const RADAR_DISTANCE: &str = "radardistance";
pub const RADAR_DISTANCE_JAM: &str = "radardistancejam";
pub const SONAR_DISTANCE: &str = "sonardistance";
pub const BUILD_OPTIONS: &str = "buildoptions";
pub const CUSTOM_PARAMS: &str = "customparams";
pub const WEAPON_DEFS: &str = "weapondefs";
pub const WEAPONS: &str = "weapons";

// customparams keys
pub const TECH_LEVEL: &str = "techlevel";
pub const UNIT_GROUP: &str = "unitgroup";

// Weapon mount keys (entries of "weapons")
pub const MOUNT_DEF: &str = "def";
pub const MOUNT_ONLY_TARGET_CATEGORY: &str = "onlytargetcategory";
pub const MOUNT_BAD_TARGET_CATEGORY: &str = "badtargetcategory";
pub const MOUNT_FAST_AUTO_RETARGETING: &str = "fastautoretargeting";
pub const MOUNT_MAX_ANGLE_DIF: &str = "maxangledif";
pub const MOUNT_MAIN_DIR: &str = "maindir";

// Weapon definition sub-tables
pub const DAMAGE: &str = "damage";
pub const SHIELD: &str = "shield";
pub const DEFAULT_DAMAGE: &str = "default";
/// Key inside a weapon's customparams holding the sweep-fire damage multiplier.
pub const SWEEP_FIRE: &str = "sweepfire";

/// `unitgroup` substring that marks a mobile constructor.
pub const BUILDER_MARKER: &str = "builder";
