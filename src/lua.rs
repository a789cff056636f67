//! Everything the crate knows about Lua lives here: evaluating a definition document,
//! the owned tree it is converted into, and typed extraction from that tree.
//!
//! Definition documents are plain Lua chunks that `return` a table. They are evaluated
//! in a fresh state per document and immediately converted into a [`value::LuaValue`]
//! tree, so nothing downstream holds on to a Lua state.

/// Document evaluation and conversion into the owned tree
pub mod eval;
/// Typed field extraction with explicit zero-value fallback
pub mod extract;
/// The owned, weakly typed tree
pub mod value;
