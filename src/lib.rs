/// Assembled, read-only unit catalog and the lookups presentation code uses
pub mod catalog;
/// Base values and percentage scaling for side-by-side unit comparison
pub mod comparison;
/// Error definitions
pub mod error;
/// Utilities for locating definition documents inside a game checkout
pub mod game_data;
/// Build menu layouts (`luaui/configs/gridmenu_layouts.lua`)
pub mod layout;
/// Lua document evaluation and the weakly typed tree it produces
pub mod lua;
/// Column selection, filtering and sorting over catalog records
pub mod query;
/// Unit definitions (`units/**/*.lua`): records, parsing and derived metrics
pub mod unit_defs;

pub use vfs;
