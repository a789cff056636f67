/// Per-weapon DPS, resource drain, range and weapon-type summary
pub mod combat;
/// Keys used inside unit definition tables
pub mod keys;
/// Unit document to [`types::UnitProperties`] conversion
pub mod parser;
/// Filling in tech levels that a unit document leaves unset
pub mod tech_level;
/// Typed unit and weapon records
pub mod types;
