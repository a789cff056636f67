use std::collections::BTreeMap;

use variantly::Variantly;

/// Key of a Lua table entry after conversion.
///
/// Integer-valued keys (the array part, or `[3] = ...`) become `Index`, string keys become
/// `Name`. Ordering puts every `Index` before any `Name`, so iterating a converted table
/// visits the array part in Lua order first.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TableKey {
    Index(i64),
    Name(String),
}

impl TableKey {
    /// Zero-based position for 1-based Lua indices. Numeric string keys (`["2"]`) are
    /// accepted as well since some layout files quote their indices.
    pub fn position(&self) -> Option<usize> {
        let index = match self {
            TableKey::Index(index) => *index,
            TableKey::Name(name) => name.trim().parse::<i64>().ok()?,
        };
        usize::try_from(index).ok()?.checked_sub(1)
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            TableKey::Name(name) => Some(name.as_str()),
            TableKey::Index(_) => None,
        }
    }
}

impl std::fmt::Display for TableKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableKey::Index(index) => write!(f, "[{index}]"),
            TableKey::Name(name) => f.write_str(name),
        }
    }
}

/// A converted Lua table. Entries whose values could not be represented (functions,
/// userdata, tables nested too deeply) are simply not present.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LuaTable(BTreeMap<TableKey, LuaValue>);

impl LuaTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: TableKey, value: LuaValue) -> Option<LuaValue> {
        self.0.insert(key, value)
    }

    pub fn get(&self, key: &str) -> Option<&LuaValue> {
        self.0.get(&TableKey::Name(key.to_string()))
    }

    pub fn get_index(&self, index: i64) -> Option<&LuaValue> {
        self.0.get(&TableKey::Index(index))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TableKey, &LuaValue)> {
        self.0.iter()
    }

    /// Values stored under integer keys, in ascending key order.
    pub fn sequence(&self) -> impl Iterator<Item = &LuaValue> {
        self.0
            .iter()
            .take_while(|(key, _)| matches!(key, TableKey::Index(_)))
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(TableKey, LuaValue)> for LuaTable {
    fn from_iter<I: IntoIterator<Item = (TableKey, LuaValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Clone, Debug, PartialEq, Variantly)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LuaValue {
    Nil,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(String),
    Table(LuaTable),
}

impl LuaValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            LuaValue::Nil => "nil",
            LuaValue::Boolean(_) => "boolean",
            LuaValue::Integer(_) => "integer",
            LuaValue::Number(_) => "number",
            LuaValue::String(_) => "string",
            LuaValue::Table(_) => "table",
        }
    }

    /// Renders scalars the way Lua's `tostring` would. Tables have no textual form here.
    pub fn to_lua_string(&self) -> Option<String> {
        match self {
            LuaValue::Nil | LuaValue::Table(_) => None,
            LuaValue::Boolean(b) => Some(b.to_string()),
            LuaValue::Integer(i) => Some(i.to_string()),
            LuaValue::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{n:.1}")),
            LuaValue::Number(n) => Some(n.to_string()),
            LuaValue::String(s) => Some(s.clone()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn array_part_iterates_before_named_keys() {
        let table: LuaTable = [
            (TableKey::Name("a".to_string()), LuaValue::Integer(0)),
            (TableKey::Index(2), LuaValue::String("second".to_string())),
            (TableKey::Index(1), LuaValue::String("first".to_string())),
        ]
        .into_iter()
        .collect();

        let sequence: Vec<_> = table
            .sequence()
            .filter_map(|value| value.string_ref().cloned())
            .collect();
        assert_eq!(sequence, vec!["first", "second"]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn scalars_render_like_tostring() {
        assert_eq!(LuaValue::Number(1.0).to_lua_string().as_deref(), Some("1.0"));
        assert_eq!(LuaValue::Number(-3.0).to_lua_string().as_deref(), Some("-3.0"));
        assert_eq!(LuaValue::Number(0.25).to_lua_string().as_deref(), Some("0.25"));
        assert_eq!(LuaValue::Integer(1).to_lua_string().as_deref(), Some("1"));
        assert_eq!(LuaValue::Boolean(true).to_lua_string().as_deref(), Some("true"));
        assert_eq!(LuaValue::String("x".to_string()).to_lua_string().as_deref(), Some("x"));
        assert_eq!(LuaValue::Nil.to_lua_string(), None);
    }

    #[test]
    fn positions_are_zero_based() {
        assert_eq!(TableKey::Index(1).position(), Some(0));
        assert_eq!(TableKey::Name("4".to_string()).position(), Some(3));
        assert_eq!(TableKey::Index(0).position(), None);
        assert_eq!(TableKey::Index(-3).position(), None);
        assert_eq!(TableKey::Name("armck".to_string()).position(), None);
    }
}
