use std::collections::BTreeMap;

use tracing::debug;
use tracing::warn;

use crate::layout::LabGrid;

use super::types::UnitProperties;
use super::types::UnitRef;

/// Tech level assigned when nothing else determines one.
pub const DEFAULT_TECH_LEVEL: i32 = 1;

/// Where a unit's tech level came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TechLevelSource {
    /// The unit document set it.
    Declared,
    /// Copied from a lab whose build menu contains the unit.
    Lab(UnitRef),
    /// Copied from some other unit whose build menu contains the unit.
    Producer(UnitRef),
    Default,
}

/// Determines the tech level for one unit. Every lookup reads `units` as given, so a unit
/// only ever inherits a level that was declared before resolution started.
pub fn infer_tech_level(
    unit: &UnitProperties,
    units: &BTreeMap<UnitRef, UnitProperties>,
    labs: &[&UnitProperties],
    builder_marker: &str,
) -> (i32, TechLevelSource) {
    let declared = unit.tech_level();
    if declared != 0 {
        return (declared, TechLevelSource::Declared);
    }

    let unit_ref = unit.unit_ref().as_str();

    if !unit.is_builder(builder_marker) {
        if let Some(lab) = labs.iter().find(|lab| lab.can_build(unit_ref)) {
            if lab.tech_level() != 0 {
                return (lab.tech_level(), TechLevelSource::Lab(lab.unit_ref().clone()));
            }
        }
    }

    if let Some(producer) = units.values().find(|candidate| candidate.can_build(unit_ref)) {
        if producer.tech_level() != 0 {
            return (producer.tech_level(), TechLevelSource::Producer(producer.unit_ref().clone()));
        }
    }

    (DEFAULT_TECH_LEVEL, TechLevelSource::Default)
}

/// Fills in the tech level of every unit whose document leaves it at 0.
///
/// Non-builders first look for the first lab (by ref) that can build them, then any unit
/// that can build them; whatever is still unresolved gets [`DEFAULT_TECH_LEVEL`]. Inherited
/// levels are taken from the catalog as it was before this pass, so running it again
/// changes nothing.
pub fn resolve_tech_levels(units: &mut BTreeMap<UnitRef, UnitProperties>, lab_grid: &LabGrid, builder_marker: &str) {
    let resolved: Vec<(UnitRef, i32, TechLevelSource)> = {
        let labs: Vec<&UnitProperties> = lab_grid
            .labs()
            .filter_map(|lab| {
                let found = units.get(lab);
                if found.is_none() {
                    warn!(%lab, "lab from the layout has no unit definition");
                }
                found
            })
            .collect();

        units
            .values()
            .filter(|unit| unit.tech_level() == 0)
            .map(|unit| {
                let (level, source) = infer_tech_level(unit, units, &labs, builder_marker);
                (unit.unit_ref().clone(), level, source)
            })
            .collect()
    };

    for (unit_ref, level, source) in resolved {
        debug!(unit = %unit_ref, level, ?source, "resolved tech level");
        if let Some(unit) = units.get_mut(&unit_ref) {
            unit.set_tech_level(level);
        }
    }
}
