use std::collections::BTreeMap;

use tracing::debug;
use tracing::trace;

use crate::error::ErrorKind;
use crate::error::Result;
use crate::lua::eval;
use crate::lua::eval::ConvertOptions;
use crate::lua::extract::OrZero;
use crate::lua::extract::TableParser;
use crate::lua::value::LuaTable;
use crate::lua::value::LuaValue;
use crate::lua::value::TableKey;

use super::keys;
use super::types::*;

/// Reads every listed field from the key matching its name without underscores. The
/// target type comes from the field itself.
macro_rules! scalar_fields {
    ($parser:expr, $target:ident { $($field:ident),* $(,)? }) => {
        $(
            $target.$field = $parser.try_extract(&stringify!($field).replace('_', "")).or_zero();
        )*
    };
}

/// Evaluates a unit document and builds the record for `unit_ref` from it.
pub fn parse_unit_document(source: &[u8], unit_ref: &UnitRef, options: &ConvertOptions) -> Result<UnitProperties> {
    let root = eval::evaluate(source, unit_ref.as_str(), options)
        .map_err(|err| ErrorKind::malformed(unit_ref, format!("evaluation failed: {err}")))?;

    unit_properties_from_value(&root, unit_ref)
}

/// Builds a record from an already evaluated unit document.
///
/// The document must return a table holding a table under the unit's own ref. Anything
/// else about the unit is optional and falls back to zero values.
pub fn unit_properties_from_value(root: &LuaValue, unit_ref: &UnitRef) -> Result<UnitProperties> {
    let Some(root) = root.table_ref() else {
        return Err(ErrorKind::malformed(
            unit_ref,
            format!("document returned a {} instead of a table", root.type_name()),
        ));
    };

    let entry = root
        .get(unit_ref.as_str())
        .or_else(|| root.get(&unit_ref.as_str().to_lowercase()))
        .ok_or_else(|| ErrorKind::malformed(unit_ref, "no entry keyed by the unit's own ref"))?;
    let Some(unit) = entry.table_ref() else {
        return Err(ErrorKind::malformed(
            unit_ref,
            format!("entry for the unit is a {}, not a table", entry.type_name()),
        ));
    };

    Ok(unit_properties_from_table(unit, unit_ref))
}

fn unit_properties_from_table(unit: &LuaTable, unit_ref: &UnitRef) -> UnitProperties {
    debug!(unit = %unit_ref, "parsing unit properties");
    let p = TableParser::new(unit);

    let mut metal_cost = p.try_extract::<i64>(keys::METAL_COST).or_zero();
    if metal_cost == 0 {
        metal_cost = p.try_extract::<i64>(keys::BUILD_COST_METAL).or_zero();
    }
    let mut energy_cost = p.try_extract::<i64>(keys::ENERGY_COST).or_zero();
    if energy_cost == 0 {
        energy_cost = p.try_extract::<i64>(keys::BUILD_COST_ENERGY).or_zero();
    }

    let build_options = p.sub_table(keys::BUILD_OPTIONS).map(|options| {
        options
            .table()
            .sequence()
            .filter_map(|value| value.string_ref())
            .map(|unit| UnitRef::from(unit.as_str()))
            .collect::<Vec<_>>()
    });

    let buildpower = p.try_extract::<f64>(keys::WORKER_TIME).ok().map(|power| power as i64);

    let custom_params = p
        .sub_table(keys::CUSTOM_PARAMS)
        .map(|custom| {
            CustomParams::builder()
                .tech_level(custom.try_extract::<i32>(keys::TECH_LEVEL).or_zero())
                .unit_group(custom.try_extract::<String>(keys::UNIT_GROUP).or_zero())
                .build()
        })
        .unwrap_or_default();

    let weapon_defs = p
        .sub_table(keys::WEAPON_DEFS)
        .map(|defs| weapon_defs_from_table(defs.table()))
        .unwrap_or_default();

    let weapons = p
        .sub_table(keys::WEAPONS)
        .map(|mounts| {
            mounts
                .table()
                .sequence()
                .filter_map(LuaValue::table_ref)
                .map(|mount| weapon_from_table(TableParser::new(mount)))
                .collect()
        })
        .unwrap_or_default();

    UnitProperties::builder()
        .unit_ref(unit_ref.clone())
        .metal_cost(metal_cost.max(0))
        .energy_cost(energy_cost.max(0))
        .buildtime(p.try_extract::<i64>(keys::BUILD_TIME).or_zero().max(0))
        .maybe_build_options(build_options)
        .health(p.try_extract::<i64>(keys::HEALTH).or_zero())
        .sight_distance(p.try_extract::<f64>(keys::SIGHT_DISTANCE).or_zero() as i64)
        .speed(p.try_extract::<f64>(keys::SPEED).or_zero())
        .maybe_buildpower(buildpower)
        .sonar_distance(p.try_extract::<f64>(keys::SONAR_DISTANCE).or_zero() as i64)
        .radar_distance(p.try_extract::<f64>(keys::RADAR_DISTANCE).or_zero() as i64)
        .jammer_distance(p.try_extract::<f64>(keys::RADAR_DISTANCE_JAM).or_zero() as i64)
        .weapon_defs(weapon_defs)
        .weapons(weapons)
        .custom_params(custom_params)
        .build()
}

fn weapon_defs_from_table(defs: &LuaTable) -> BTreeMap<String, WeaponDef> {
    defs.iter()
        .filter_map(|(key, value)| {
            let Some(name) = key.name() else {
                trace!(%key, "skipping weapon definition without a name key");
                return None;
            };
            let def = value.table_ref()?;
            Some((name.to_lowercase(), weapon_def_from_table(TableParser::new(def))))
        })
        .collect()
}

fn weapon_def_from_table(p: TableParser<'_>) -> WeaponDef {
    let mut def = WeaponDef::default();

    scalar_fields!(p, def {
        name, weapon_type, id,
        avoid_friendly, avoid_feature, avoid_neutral, avoid_ground, avoid_cloaked,
        collide_enemy, collide_friendly, collide_feature, collide_neutral, collide_fire_base,
        collide_non_target, collide_ground, collide_cloaked,
        explosion_speed, impact_only, no_self_damage, no_explode, burnblow,
        damage_area_of_effect, edge_effectiveness, collision_size,
        weapon_velocity, start_velocity, weaponacceleration, reload_time, burst_rate, burst,
        projectiles, water_bounce, ground_bounce, bounce_slip, bounce_rebound, num_bounce,
        impulse_factor, impulse_boost, crater_mult, crater_boost, crater_area_of_effect,
        waterweapon, submissile, fire_submersed, commandfire,
        range, heightmod, target_border, cylinder_targeting, turret, fixed_launcher,
        tolerance, firetolerance, high_trajectory, trajectory_height, tracks, wobble, dance,
        gravity_affected, my_gravity, can_attack_ground, weapon_timer, flighttime, turnrate,
        height_boost_factor, proximity_priority, allow_non_blocking_aim, accuracy,
        spray_angle, moving_accuracy, target_move_error, lead_limit, lead_bonus,
        predict_boost, owner_exp_acc_weight,
        min_intensity, duration, beamtime, beamburst, beam_ttl, sweep_fire,
        large_beam_laser, size_growth, flame_gfx_time,
        metal_per_shot, energy_per_shot, fire_starter, paralyzer, paralyze_time, stockpile,
        stockpile_time, targetable, interceptor, intercepted_by_shield_type, coverage,
        intercept_solo, dyn_damage_inverted, dyn_damage_exp, dyn_damage_min,
        dyn_damage_range, recharge_delay,
        model, size, scar_glow_color_map, explosion_scar, scar_diameter, scar_alpha,
        scar_glow, scar_ttl, scar_glow_ttl, scar_dot_elimination, scar_proj_vector,
        scar_color_tint, always_visible, camera_shake, smoke_trail, smoke_trail_cast_shadow,
        smoke_period, smoke_time, smoke_size, smoke_color, cast_shadow, size_decay,
        alpha_decay, separation, no_gap, stages, lod_distance, thickness, core_thickness,
        laser_flare_size, tile_length, scroll_speed, pulse_speed, beam_decay, falloff_rate,
        hardstop, rgb_color, rgb_color2, intensity, colormap, ceg_tag, explosion_generator,
        bounce_explosion_generator,
        sound_trigger, sound_start, sound_hit_dry, sound_hit_wet, sound_start_volume,
        sound_hit_dry_volume, sound_hit_wet_volume,
    });

    if let Some(custom) = p.sub_table(keys::CUSTOM_PARAMS) {
        def.custom_params = custom
            .table()
            .iter()
            .filter_map(|(key, value)| Some((key.name()?.to_string(), value.to_lua_string()?)))
            .collect();
    }

    if let Some(damage) = p.sub_table(keys::DAMAGE) {
        def.damage = damage
            .table()
            .iter()
            .filter_map(|(key, _)| {
                let category = key.name()?;
                let amount = damage.try_extract::<f64>(category).ok()?;
                Some((category, amount))
            })
            .collect();
    }

    if let Some(shield_table) = p.sub_table(keys::SHIELD) {
        let shield = &mut def.shield;
        scalar_fields!(shield_table, shield {
            repulser, smart, exterior, max_speed, force, radius, power, starting_power,
            power_regen, power_regen_energy, energy_use,
        });
    }

    def
}

fn weapon_from_table(p: TableParser<'_>) -> Weapon {
    Weapon {
        def: p.try_extract(keys::MOUNT_DEF).or_zero(),
        only_target_category: p.try_extract(keys::MOUNT_ONLY_TARGET_CATEGORY).or_zero(),
        bad_target_category: p.try_extract(keys::MOUNT_BAD_TARGET_CATEGORY).or_zero(),
        fast_auto_retargeting: p.try_extract(keys::MOUNT_FAST_AUTO_RETARGETING).or_zero(),
        max_angle_dif: p.try_extract(keys::MOUNT_MAX_ANGLE_DIF).or_zero(),
        main_dir: p.try_extract(keys::MOUNT_MAIN_DIR).or_zero(),
    }
}
