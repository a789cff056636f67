use std::collections::BTreeMap;

use tracing::debug;
use tracing::trace;

use crate::error::ErrorKind;
use crate::error::Result;
use crate::lua::eval;
use crate::lua::eval::ConvertOptions;
use crate::lua::value::LuaTable;
use crate::lua::value::LuaValue;
use crate::unit_defs::types::UnitRef;

pub const UNIT_GRIDS: &str = "UnitGrids";
pub const LAB_GRIDS: &str = "LabGrids";

/// Category tabs in a constructor's build menu.
pub const GROUP_COUNT: usize = 4;
pub const ROW_COUNT: usize = 3;
pub const COLUMN_COUNT: usize = 4;

/// One 3×4 page of a build menu. Empty cells hold an empty [`UnitRef`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuildGrid([[UnitRef; COLUMN_COUNT]; ROW_COUNT]);

impl BuildGrid {
    /// Lays out a flat menu row by row. Entries past the last cell are dropped.
    pub fn from_flat<I: IntoIterator<Item = (usize, UnitRef)>>(cells: I) -> Self {
        let mut grid = BuildGrid::default();
        for (index, unit) in cells {
            if !grid.set(index / COLUMN_COUNT, index % COLUMN_COUNT, unit) {
                trace!(index, "dropping lab grid entry past the last cell");
            }
        }
        grid
    }

    /// Non-empty cell contents.
    pub fn get(&self, row: usize, column: usize) -> Option<&UnitRef> {
        self.0
            .get(row)
            .and_then(|cells| cells.get(column))
            .filter(|unit| !unit.is_empty())
    }

    /// Returns false, leaving the grid untouched, when the cell is out of bounds.
    pub fn set(&mut self, row: usize, column: usize, unit: UnitRef) -> bool {
        match self.0.get_mut(row).and_then(|cells| cells.get_mut(column)) {
            Some(cell) => {
                *cell = unit;
                true
            }
            None => false,
        }
    }

    pub fn rows(&self) -> &[[UnitRef; COLUMN_COUNT]; ROW_COUNT] {
        &self.0
    }

    /// Occupied cells in row-major order.
    pub fn units(&self) -> impl Iterator<Item = &UnitRef> {
        self.0.iter().flatten().filter(|unit| !unit.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.units().next().is_none()
    }
}

pub type BuildGroups = [BuildGrid; GROUP_COUNT];

/// Constructor build menus: four category pages per constructor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitGrid(BTreeMap<UnitRef, BuildGroups>);

impl UnitGrid {
    pub fn get(&self, constructor: &str) -> Option<&BuildGroups> {
        self.0.get(constructor)
    }

    /// Constructors in ref order.
    pub fn constructors(&self) -> impl Iterator<Item = &UnitRef> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UnitRef, &BuildGroups)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(UnitRef, BuildGroups)> for UnitGrid {
    fn from_iter<I: IntoIterator<Item = (UnitRef, BuildGroups)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Lab build menus: a single page per lab.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LabGrid(BTreeMap<UnitRef, BuildGrid>);

impl LabGrid {
    pub fn get(&self, lab: &str) -> Option<&BuildGrid> {
        self.0.get(lab)
    }

    /// Labs in ref order.
    pub fn labs(&self) -> impl Iterator<Item = &UnitRef> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UnitRef, &BuildGrid)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(UnitRef, BuildGrid)> for LabGrid {
    fn from_iter<I: IntoIterator<Item = (UnitRef, BuildGrid)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridLayouts {
    pub unit_grid: UnitGrid,
    pub lab_grid: LabGrid,
}

/// Evaluates the layout document and builds both grids from it.
pub fn parse_layout_document(source: &[u8], options: &ConvertOptions) -> Result<GridLayouts> {
    let root = eval::evaluate(source, "gridmenu_layouts", options)
        .map_err(|err| ErrorKind::LayoutMalformed(format!("evaluation failed: {err}")))?;

    layouts_from_value(&root)
}

pub fn layouts_from_value(root: &LuaValue) -> Result<GridLayouts> {
    let root = root.table_ref().ok_or_else(|| {
        ErrorKind::LayoutMalformed(format!("document returned a {} instead of a table", root.type_name()))
    })?;

    let section = |key: &str| {
        root.get(key)
            .and_then(LuaValue::table_ref)
            .ok_or_else(|| ErrorKind::LayoutMalformed(format!("missing `{key}` table")))
    };

    let layouts = GridLayouts {
        unit_grid: unit_grid_from_table(section(UNIT_GRIDS)?),
        lab_grid: lab_grid_from_table(section(LAB_GRIDS)?),
    };
    debug!(
        constructors = layouts.unit_grid.len(),
        labs = layouts.lab_grid.len(),
        "built grid layouts"
    );

    Ok(layouts)
}

/// Entries of `table` that sit at a valid zero-based position below `bound`.
fn positioned<'a>(table: &'a LuaTable, bound: usize) -> impl Iterator<Item = (usize, &'a LuaValue)> {
    table.iter().filter_map(move |(key, value)| match key.position() {
        Some(position) if position < bound => Some((position, value)),
        _ => {
            trace!(%key, bound, "dropping grid entry outside the fixed shape");
            None
        }
    })
}

/// Owners are keyed by string refs; anything else is not a menu.
fn owned_tables(table: &LuaTable) -> impl Iterator<Item = (UnitRef, &LuaTable)> {
    table.iter().filter_map(|(key, value)| {
        let owner = key.name()?;
        let menu = value.table_ref()?;
        Some((UnitRef::from(owner), menu))
    })
}

fn unit_ref_from_cell(value: &LuaValue) -> Option<UnitRef> {
    value.string_ref().map(|unit| UnitRef::from(unit.as_str()))
}

fn unit_grid_from_table(table: &LuaTable) -> UnitGrid {
    owned_tables(table)
        .map(|(constructor, groups_table)| {
            let mut groups = BuildGroups::default();
            for (group, rows) in positioned(groups_table, GROUP_COUNT) {
                let Some(rows) = rows.table_ref() else { continue };
                for (row, columns) in positioned(rows, ROW_COUNT) {
                    let Some(columns) = columns.table_ref() else { continue };
                    for (column, cell) in positioned(columns, COLUMN_COUNT) {
                        if let Some(unit) = unit_ref_from_cell(cell) {
                            groups[group].set(row, column, unit);
                        }
                    }
                }
            }
            (constructor, groups)
        })
        .collect()
}

fn lab_grid_from_table(table: &LuaTable) -> LabGrid {
    owned_tables(table)
        .map(|(lab, menu)| {
            let cells = positioned(menu, usize::MAX)
                .filter_map(|(index, cell)| Some((index, unit_ref_from_cell(cell)?)));
            (lab, BuildGrid::from_flat(cells))
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(source: &str) -> Result<GridLayouts> {
        parse_layout_document(source.as_bytes(), &ConvertOptions::default())
    }

    const LAYOUT: &str = r#"
        local labGrids = {
            armlab = {
                "armck", "armrectr", "armpw", "armflea",
                "armrock", "armham", "armwar", "",
                "", "", "armjeth", "",
                "overflow",
            },
        }

        local unitGrids = {
            armck = {
                {
                    { "armmex", "armsolar", "armwin" },
                    { "armmakr" },
                },
                {
                    { "armllt", "armrl" },
                },
            },
        }

        if Spring.Utilities.Gametype.IsScavengers() then
            unitGrids = {}
        end

        return {
            LabGrids = labGrids,
            UnitGrids = unitGrids,
        }
    "#;

    #[test]
    fn builds_both_grids() {
        let layouts = parse(LAYOUT).expect("failed to parse layout");

        let armck = layouts.unit_grid.get("armck").expect("missing constructor");
        assert_eq!(armck[0].get(0, 0), Some(&UnitRef::from("armmex")));
        assert_eq!(armck[0].get(0, 2), Some(&UnitRef::from("armwin")));
        assert_eq!(armck[0].get(0, 3), None);
        assert_eq!(armck[0].get(1, 0), Some(&UnitRef::from("armmakr")));
        assert_eq!(armck[1].get(0, 1), Some(&UnitRef::from("armrl")));
        assert!(armck[2].is_empty());
        assert!(armck[3].is_empty());

        let armlab = layouts.lab_grid.get("armlab").expect("missing lab");
        assert_eq!(armlab.get(0, 3), Some(&UnitRef::from("armflea")));
        assert_eq!(armlab.get(1, 0), Some(&UnitRef::from("armrock")));
        assert_eq!(armlab.get(1, 3), None);
        assert_eq!(armlab.get(2, 2), Some(&UnitRef::from("armjeth")));
        assert_eq!(armlab.units().count(), 8);
        assert!(!armlab.units().any(|unit| unit == "overflow"));
    }

    #[test]
    fn oversized_input_is_truncated() {
        let layouts = parse(
            r#"
            local row = { "a", "b", "c", "d", "e", "f" }
            local group = { row, row, row, row, row }
            return {
                UnitGrids = { big = { group, group, group, group, group, [-1] = group } },
                LabGrids = {},
            }
            "#,
        )
        .expect("failed to parse layout");

        let big = layouts.unit_grid.get("big").expect("missing constructor");
        for group in big {
            assert_eq!(group.units().count(), ROW_COUNT * COLUMN_COUNT);
            assert_eq!(group.get(2, 3), Some(&UnitRef::from("d")));
        }
        assert_eq!(big[0].get(3, 0), None);
        assert_eq!(big[0].get(0, 4), None);
    }

    #[test]
    fn flat_lab_menu_reshapes_by_key_index() {
        let grid = BuildGrid::from_flat([
            (0, UnitRef::from("first")),
            (5, UnitRef::from("sixth")),
            (11, UnitRef::from("last")),
            (12, UnitRef::from("dropped")),
        ]);
        assert_eq!(grid.get(0, 0), Some(&UnitRef::from("first")));
        assert_eq!(grid.get(1, 1), Some(&UnitRef::from("sixth")));
        assert_eq!(grid.get(2, 3), Some(&UnitRef::from("last")));
        assert_eq!(grid.units().count(), 3);
    }

    #[test]
    fn missing_sections_are_fatal() {
        assert!(matches!(parse("return { UnitGrids = {} }"), Err(ErrorKind::LayoutMalformed(_))));
        assert!(matches!(parse("return 1"), Err(ErrorKind::LayoutMalformed(_))));
        assert!(matches!(parse("return {"), Err(ErrorKind::LayoutMalformed(_))));
    }
}
