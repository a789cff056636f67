use std::collections::BTreeMap;
use std::collections::BTreeSet;

use bon::Builder;
use tracing::debug;
use tracing::info;
use tracing::warn;
use vfs::VfsPath;

use crate::error::ErrorKind;
use crate::game_data;
use crate::game_data::UnitDocument;
use crate::layout;
use crate::layout::GridLayouts;
use crate::layout::LabGrid;
use crate::layout::UnitGrid;
use crate::lua::eval::ConvertOptions;
use crate::lua::eval::DEFAULT_MAX_TABLE_DEPTH;
use crate::unit_defs::combat::CombatMetrics;
use crate::unit_defs::keys;
use crate::unit_defs::parser;
use crate::unit_defs::tech_level;
use crate::unit_defs::types::UnitProperties;
use crate::unit_defs::types::UnitRef;

/// Substring marking the level-variant duplicates of constructors that are hidden from
/// constructor listings.
const LEVEL_VARIANT_MARKER: &str = "lvl";

/// Where to find documents and how to interpret them.
#[derive(Builder, Clone, Debug)]
pub struct LoadOptions {
    #[builder(default = String::from(game_data::UNITS_DIR), into)]
    pub units_dir: String,
    #[builder(default = String::from(game_data::LAYOUT_PATH), into)]
    pub layout_path: String,
    /// `unitgroup` substring identifying mobile constructors.
    #[builder(default = String::from(keys::BUILDER_MARKER), into)]
    pub builder_marker: String,
    #[builder(default = DEFAULT_MAX_TABLE_DEPTH)]
    pub max_table_depth: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions::builder().build()
    }
}

impl LoadOptions {
    /// Unit documents are read with lower-cased keys, as the engine does.
    fn unit_convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            max_depth: self.max_table_depth,
            lowercase_keys: true,
        }
    }

    /// The layout document keeps its `UnitGrids` / `LabGrids` spelling.
    fn layout_convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            max_depth: self.max_table_depth,
            lowercase_keys: false,
        }
    }
}

/// Read access to units and build menus.
pub trait UnitProvider {
    fn unit_by_ref(&self, unit: &str) -> Option<&UnitProperties>;

    /// All units in ref order.
    fn units(&self) -> Box<dyn Iterator<Item = &UnitProperties> + '_>;

    fn unit_grid(&self) -> &UnitGrid;

    fn lab_grid(&self) -> &LabGrid;

    fn require_unit(&self, unit: &str) -> Result<&UnitProperties, ErrorKind> {
        self.unit_by_ref(unit)
            .ok_or_else(|| ErrorKind::UnknownUnit(UnitRef::from(unit)))
    }
}

/// Whether a constructor's build menu comes from `UnitGrids` or `LabGrids`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstructorKind {
    Unit,
    Lab,
}

impl std::fmt::Display for ConstructorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstructorKind::Unit => f.write_str("Unit"),
            ConstructorKind::Lab => f.write_str("Lab"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Constructor {
    pub unit_ref: UnitRef,
    pub kind: ConstructorKind,
}

/// The assembled data set: every parsed unit with tech levels resolved, plus both grids.
///
/// Built once and never mutated, so it can be shared freely between readers.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitCatalog {
    units: BTreeMap<UnitRef, UnitProperties>,
    layouts: GridLayouts,
    /// Documents that could not be turned into records, with the reason.
    #[cfg_attr(feature = "serde", serde(skip))]
    rejected: Vec<(UnitRef, String)>,
}

impl UnitProvider for UnitCatalog {
    fn unit_by_ref(&self, unit: &str) -> Option<&UnitProperties> {
        self.units.get(unit)
    }

    fn units(&self) -> Box<dyn Iterator<Item = &UnitProperties> + '_> {
        Box::new(self.units.values())
    }

    fn unit_grid(&self) -> &UnitGrid {
        &self.layouts.unit_grid
    }

    fn lab_grid(&self) -> &LabGrid {
        &self.layouts.lab_grid
    }
}

impl UnitCatalog {
    /// Loads the catalog from a game checkout.
    pub fn from_vfs(root: &VfsPath, options: &LoadOptions) -> Result<UnitCatalog, ErrorKind> {
        debug!("loading grid layouts");
        let layout_source = game_data::load_layout_document(root, &options.layout_path)?;
        let layouts = layout::parse_layout_document(&layout_source, &options.layout_convert_options())?;

        debug!("loading unit documents");
        let documents = game_data::load_unit_documents(root, &options.units_dir)?;

        Ok(Self::from_documents(documents, layouts, options))
    }

    /// Parses unit documents and assembles them with already built layouts. Documents that
    /// fail to parse are logged and left out.
    pub fn from_documents(documents: Vec<UnitDocument>, layouts: GridLayouts, options: &LoadOptions) -> UnitCatalog {
        let convert_options = options.unit_convert_options();
        let parse = |document: UnitDocument| {
            parser::parse_unit_document(&document.source, &document.unit_ref, &convert_options)
                .map_err(|err| (document.unit_ref, err.to_string()))
        };

        #[cfg(feature = "rayon")]
        let results: Vec<_> = {
            use rayon::prelude::*;
            documents.into_par_iter().map(parse).collect()
        };
        #[cfg(not(feature = "rayon"))]
        let results: Vec<_> = documents.into_iter().map(parse).collect();

        let mut units = Vec::with_capacity(results.len());
        let mut rejected = Vec::new();
        for result in results {
            match result {
                Ok(unit) => units.push(unit),
                Err((unit_ref, err)) => {
                    warn!(unit = %unit_ref, %err, "excluding unit document");
                    rejected.push((unit_ref, err));
                }
            }
        }

        let mut catalog = Self::from_parts(units, layouts, options);
        catalog.rejected = rejected;
        catalog
    }

    /// Assembles parsed records and layouts, resolving tech levels.
    pub fn from_parts<I: IntoIterator<Item = UnitProperties>>(
        units: I,
        layouts: GridLayouts,
        options: &LoadOptions,
    ) -> UnitCatalog {
        let mut units: BTreeMap<UnitRef, UnitProperties> = units
            .into_iter()
            .map(|unit| (unit.unit_ref().clone(), unit))
            .collect();

        tech_level::resolve_tech_levels(&mut units, &layouts.lab_grid, &options.builder_marker);

        info!(
            units = units.len(),
            constructors = layouts.unit_grid.len(),
            labs = layouts.lab_grid.len(),
            "assembled unit catalog"
        );

        UnitCatalog {
            units,
            layouts,
            rejected: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn rejected(&self) -> &[(UnitRef, String)] {
        &self.rejected
    }

    pub fn layouts(&self) -> &GridLayouts {
        &self.layouts
    }

    pub fn combat_metrics(&self, unit: &str) -> Option<CombatMetrics> {
        self.unit_by_ref(unit).map(UnitProperties::combat_metrics)
    }

    /// Units whose build menu contains `unit`.
    pub fn producers_of(&self, unit: &str) -> Vec<&UnitRef> {
        self.units
            .values()
            .filter(|candidate| candidate.can_build(unit))
            .map(UnitProperties::unit_ref)
            .collect()
    }

    /// Units reachable from the labs: what each lab builds, and what those build in turn.
    /// Only units present in the catalog are returned, sorted and without duplicates.
    pub fn buildable_units(&self) -> Vec<&UnitRef> {
        let mut buildable = BTreeSet::new();

        let labs = self.layouts.lab_grid.labs().filter_map(|lab| self.units.get(lab));
        for lab in labs {
            for option in lab.build_options().unwrap_or_default() {
                let Some((unit_ref, unit)) = self.units.get_key_value(option) else {
                    continue;
                };
                buildable.insert(unit_ref);

                for second in unit.build_options().unwrap_or_default() {
                    if let Some((unit_ref, _)) = self.units.get_key_value(second) {
                        buildable.insert(unit_ref);
                    }
                }
            }
        }

        buildable.into_iter().collect()
    }

    /// Constructors and labs with a build menu, excluding level variants, sorted by ref.
    pub fn constructors(&self) -> Vec<Constructor> {
        let units = self
            .layouts
            .unit_grid
            .constructors()
            .map(|unit_ref| (unit_ref, ConstructorKind::Unit));
        let labs = self
            .layouts
            .lab_grid
            .labs()
            .map(|unit_ref| (unit_ref, ConstructorKind::Lab));

        let mut constructors: Vec<Constructor> = units
            .chain(labs)
            .filter(|(unit_ref, _)| !unit_ref.as_str().contains(LEVEL_VARIANT_MARKER))
            .filter(|(unit_ref, _)| {
                self.units
                    .get(*unit_ref)
                    .is_some_and(|unit| unit.build_options().is_some())
            })
            .map(|(unit_ref, kind)| Constructor {
                unit_ref: unit_ref.clone(),
                kind,
            })
            .collect();
        constructors.sort_by(|a, b| a.unit_ref.cmp(&b.unit_ref).then(a.kind.cmp(&b.kind)));
        constructors
    }
}

#[cfg(test)]
mod test {
    use vfs::MemoryFS;

    use super::*;
    use crate::game_data::test::write_file;

    const LAYOUT: &str = r#"
        return {
            UnitGrids = {
                armck = { { { "armsolar", "armllt" } } },
                armcklvl2 = { { { "armsolar" } } },
                ghost = { { { "armsolar" } } },
            },
            LabGrids = {
                armlab = { "armck", "armpw" },
                armmissing = { "armpw" },
            },
        }
    "#;

    fn game_tree() -> VfsPath {
        let root = VfsPath::new(MemoryFS::new());
        write_file(&root, game_data::LAYOUT_PATH, LAYOUT);
        write_file(
            &root,
            "units/ArmBuildings/LandFactories/armlab.lua",
            r#"return { armlab = {
                metalcost = 600,
                buildoptions = { "armck", "armpw" },
                customparams = { techlevel = 1, unitgroup = "buildert1" },
            } }"#,
        );
        write_file(
            &root,
            "units/ArmBots/armck.lua",
            r#"return { armck = {
                metalcost = 110,
                workertime = 80,
                buildoptions = { "armsolar", "armllt", "armnotreal" },
                customparams = { unitgroup = "builder" },
            } }"#,
        );
        write_file(
            &root,
            "units/ArmBots/armcklvl2.lua",
            r#"return { armcklvl2 = { buildoptions = { "armsolar" } } }"#,
        );
        write_file(
            &root,
            "units/ArmBots/armpw.lua",
            r#"return { armpw = {
                metalcost = 54,
                weapondefs = { emg = { reloadtime = 0.5, damage = { default = 10 } } },
                weapons = { { def = "EMG" } },
            } }"#,
        );
        write_file(&root, "units/ArmBuildings/armsolar.lua", "return { armsolar = { metalcost = 155 } }");
        write_file(&root, "units/ArmBuildings/armllt.lua", "return { armllt = { metalcost = 85 } }");
        write_file(&root, "units/Broken/armbroken.lua", "return { somethingelse = {} }");
        root
    }

    fn load() -> UnitCatalog {
        UnitCatalog::from_vfs(&game_tree(), &LoadOptions::default()).expect("failed to load catalog")
    }

    #[test]
    fn loads_and_excludes_malformed_documents() {
        let catalog = load();

        assert_eq!(catalog.len(), 6);
        assert!(catalog.unit_by_ref("armbroken").is_none());
        assert_eq!(catalog.rejected().len(), 1);
        assert_eq!(catalog.rejected()[0].0, UnitRef::from("armbroken"));

        assert!(matches!(
            catalog.require_unit("armbroken"),
            Err(ErrorKind::UnknownUnit(_))
        ));
        assert_eq!(catalog.require_unit("armpw").map(UnitProperties::metal_cost).ok(), Some(54));
    }

    #[test]
    fn every_unit_has_a_tech_level() {
        let catalog = load();

        assert!(catalog.units().all(|unit| unit.tech_level() != 0));
        // From the lab.
        assert_eq!(catalog.unit_by_ref("armpw").map(UnitProperties::tech_level), Some(1));
    }

    #[test]
    fn buildable_units_follow_two_levels_from_labs() {
        let catalog = load();

        let buildable: Vec<&str> = catalog.buildable_units().into_iter().map(UnitRef::as_str).collect();
        assert_eq!(buildable, vec!["armck", "armllt", "armpw", "armsolar"]);
    }

    #[test]
    fn constructors_skip_level_variants_and_unknown_units() {
        let catalog = load();

        let constructors = catalog.constructors();
        assert_eq!(
            constructors,
            vec![
                Constructor {
                    unit_ref: UnitRef::from("armck"),
                    kind: ConstructorKind::Unit,
                },
                Constructor {
                    unit_ref: UnitRef::from("armlab"),
                    kind: ConstructorKind::Lab,
                },
            ]
        );
    }

    #[test]
    fn producers_and_metrics() {
        let catalog = load();

        let producers: Vec<&str> = catalog.producers_of("armsolar").into_iter().map(UnitRef::as_str).collect();
        assert_eq!(producers, vec!["armck", "armcklvl2"]);
        assert_eq!(catalog.combat_metrics("armpw").map(|metrics| metrics.dps), Some(20.0));
        assert!(catalog.combat_metrics("armghost").is_none());
    }

    #[test]
    fn missing_layout_fails_the_load() {
        let root = VfsPath::new(MemoryFS::new());
        write_file(&root, "units/armpw.lua", "return { armpw = {} }");
        assert!(UnitCatalog::from_vfs(&root, &LoadOptions::default()).is_err());
    }

    #[test]
    fn options_have_game_defaults() {
        let options = LoadOptions::default();
        assert_eq!(options.units_dir, "units");
        assert_eq!(options.layout_path, "luaui/configs/gridmenu_layouts.lua");
        assert_eq!(options.builder_marker, "builder");

        let custom = LoadOptions::builder().units_dir("defs").max_table_depth(4).build();
        assert_eq!(custom.units_dir, "defs");
        assert_eq!(custom.max_table_depth, 4);
    }
}
