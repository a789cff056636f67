use thiserror::Error;
use tracing::debug;
use tracing::trace;

use super::value::LuaTable;
use super::value::LuaValue;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("field `{key}` is absent")]
    FieldAbsent { key: String },
    #[error("field `{key}` is a {found}, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl ExtractError {
    pub fn key(&self) -> &str {
        match self {
            ExtractError::FieldAbsent { key } | ExtractError::TypeMismatch { key, .. } => key,
        }
    }
}

/// Conversion from a tree value into a concrete Rust type.
///
/// Numbers are accepted from either Lua number representation, and from strings holding a
/// number since definition files are inconsistent about quoting. Strings and booleans are
/// only accepted from their own kind.
pub trait FromLuaValue<'a>: Sized {
    const EXPECTED: &'static str;

    fn from_lua_value(value: &'a LuaValue) -> Option<Self>;
}

impl<'a> FromLuaValue<'a> for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_lua_value(value: &'a LuaValue) -> Option<Self> {
        match value {
            LuaValue::Integer(i) => Some(*i),
            LuaValue::Number(n) if n.is_finite() && n.fract() == 0.0 => Some(*n as i64),
            LuaValue::String(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    let n = s.parse::<f64>().ok()?;
                    (n.is_finite() && n.fract() == 0.0).then_some(n as i64)
                })
            }
            _ => None,
        }
    }
}

impl<'a> FromLuaValue<'a> for i32 {
    const EXPECTED: &'static str = "integer";

    fn from_lua_value(value: &'a LuaValue) -> Option<Self> {
        i64::from_lua_value(value).and_then(|i| i32::try_from(i).ok())
    }
}

impl<'a> FromLuaValue<'a> for f64 {
    const EXPECTED: &'static str = "number";

    fn from_lua_value(value: &'a LuaValue) -> Option<Self> {
        match value {
            LuaValue::Integer(i) => Some(*i as f64),
            LuaValue::Number(n) => Some(*n),
            LuaValue::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }
}

impl<'a> FromLuaValue<'a> for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_lua_value(value: &'a LuaValue) -> Option<Self> {
        value.boolean_ref().copied()
    }
}

impl<'a> FromLuaValue<'a> for String {
    const EXPECTED: &'static str = "string";

    fn from_lua_value(value: &'a LuaValue) -> Option<Self> {
        value.string_ref().cloned()
    }
}

impl<'a> FromLuaValue<'a> for &'a str {
    const EXPECTED: &'static str = "string";

    fn from_lua_value(value: &'a LuaValue) -> Option<Self> {
        value.string_ref().map(String::as_str)
    }
}

impl<'a> FromLuaValue<'a> for &'a LuaTable {
    const EXPECTED: &'static str = "table";

    fn from_lua_value(value: &'a LuaValue) -> Option<Self> {
        value.table_ref()
    }
}

/// Fixed-size float vectors written as whitespace-separated strings, e.g. `rgbcolor = "1 0.5 0"`.
///
/// Missing components are zero and extra components are ignored. Unparseable components
/// make the whole field a mismatch.
impl<'a, const N: usize> FromLuaValue<'a> for [f64; N] {
    const EXPECTED: &'static str = "whitespace-separated numbers";

    fn from_lua_value(value: &'a LuaValue) -> Option<Self> {
        let mut out = [0.0; N];
        for (slot, component) in out.iter_mut().zip(value.string_ref()?.split_whitespace()) {
            *slot = component.parse().ok()?;
        }
        Some(out)
    }
}

/// Whitespace-separated word lists, e.g. `badtargetcategory = "VTOL GROUNDSCOUT"`.
impl<'a> FromLuaValue<'a> for Vec<String> {
    const EXPECTED: &'static str = "whitespace-separated words";

    fn from_lua_value(value: &'a LuaValue) -> Option<Self> {
        Some(value.string_ref()?.split_whitespace().map(str::to_string).collect())
    }
}

/// Read-only view over a converted table that hands out typed fields.
#[derive(Clone, Copy, Debug)]
pub struct TableParser<'a> {
    table: &'a LuaTable,
}

impl<'a> TableParser<'a> {
    pub fn new(table: &'a LuaTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &'a LuaTable {
        self.table
    }

    pub fn try_extract<T: FromLuaValue<'a>>(&self, key: &str) -> Result<T, ExtractError> {
        let value = match self.table.get(key) {
            None | Some(LuaValue::Nil) => {
                return Err(ExtractError::FieldAbsent { key: key.to_string() });
            }
            Some(value) => value,
        };

        T::from_lua_value(value).ok_or_else(|| ExtractError::TypeMismatch {
            key: key.to_string(),
            expected: T::EXPECTED,
            found: value.type_name(),
        })
    }

    /// Parser over a nested table, if `key` holds one.
    pub fn sub_table(&self, key: &str) -> Option<TableParser<'a>> {
        self.try_extract::<&LuaTable>(key).ok().map(TableParser::new)
    }
}

/// Explicit zero-value fallback for extraction results.
pub trait OrZero<T> {
    /// Returns the extracted value, or `T::default()` after logging why extraction failed.
    fn or_zero(self) -> T;
}

impl<T: Default> OrZero<T> for Result<T, ExtractError> {
    fn or_zero(self) -> T {
        match self {
            Ok(value) => value,
            Err(err @ ExtractError::FieldAbsent { .. }) => {
                trace!(%err, "using zero value");
                T::default()
            }
            Err(err) => {
                debug!(%err, "ignoring malformed field");
                T::default()
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lua::value::TableKey;

    fn table(entries: Vec<(&str, LuaValue)>) -> LuaTable {
        entries
            .into_iter()
            .map(|(key, value)| (TableKey::Name(key.to_string()), value))
            .collect()
    }

    #[test]
    fn numbers_coerce_between_representations() {
        let t = table(vec![
            ("int", LuaValue::Integer(250)),
            ("whole", LuaValue::Number(42.0)),
            ("fraction", LuaValue::Number(1.25)),
            ("text", LuaValue::String("3".to_string())),
            ("text_float", LuaValue::String(" 2.5 ".to_string())),
        ]);
        let p = TableParser::new(&t);

        assert_eq!(p.try_extract::<i64>("int"), Ok(250));
        assert_eq!(p.try_extract::<i64>("whole"), Ok(42));
        assert_eq!(p.try_extract::<f64>("int"), Ok(250.0));
        assert_eq!(p.try_extract::<f64>("fraction"), Ok(1.25));
        assert_eq!(p.try_extract::<i32>("text"), Ok(3));
        assert_eq!(p.try_extract::<f64>("text_float"), Ok(2.5));
        assert!(matches!(
            p.try_extract::<i64>("fraction"),
            Err(ExtractError::TypeMismatch { expected: "integer", found: "number", .. })
        ));
    }

    #[test]
    fn strings_and_booleans_are_strict() {
        let t = table(vec![
            ("name", LuaValue::String("armpw".to_string())),
            ("number", LuaValue::Integer(1)),
            ("flag", LuaValue::Boolean(true)),
        ]);
        let p = TableParser::new(&t);

        assert_eq!(p.try_extract::<String>("name"), Ok("armpw".to_string()));
        assert!(p.try_extract::<String>("number").is_err());
        assert_eq!(p.try_extract::<bool>("flag"), Ok(true));
        assert!(p.try_extract::<bool>("number").is_err());
    }

    #[test]
    fn absent_and_mismatched_fall_back_to_zero() {
        let t = table(vec![("health", LuaValue::String("lots".to_string()))]);
        let p = TableParser::new(&t);

        assert_eq!(
            p.try_extract::<i64>("metalcost"),
            Err(ExtractError::FieldAbsent { key: "metalcost".to_string() })
        );
        assert_eq!(p.try_extract::<i64>("metalcost").or_zero(), 0);
        assert_eq!(p.try_extract::<i64>("health").or_zero(), 0);
        assert_eq!(p.try_extract::<String>("name").or_zero(), "");
    }

    #[test]
    fn vectors_and_word_lists() {
        let t = table(vec![
            ("rgbcolor", LuaValue::String("1 0.5 0".to_string())),
            ("short", LuaValue::String("0.25".to_string())),
            ("bad", LuaValue::String("1 x 0".to_string())),
            ("categories", LuaValue::String("VTOL  GROUNDSCOUT".to_string())),
        ]);
        let p = TableParser::new(&t);

        assert_eq!(p.try_extract::<[f64; 3]>("rgbcolor"), Ok([1.0, 0.5, 0.0]));
        assert_eq!(p.try_extract::<[f64; 4]>("short"), Ok([0.25, 0.0, 0.0, 0.0]));
        assert!(p.try_extract::<[f64; 3]>("bad").is_err());
        assert_eq!(
            p.try_extract::<Vec<String>>("categories"),
            Ok(vec!["VTOL".to_string(), "GROUNDSCOUT".to_string()])
        );
    }

    #[test]
    fn nested_tables() {
        let inner = table(vec![("techlevel", LuaValue::Integer(2))]);
        let t = table(vec![("customparams", LuaValue::Table(inner))]);
        let p = TableParser::new(&t);

        let custom = p.sub_table("customparams").expect("missing sub table");
        assert_eq!(custom.try_extract::<i32>("techlevel"), Ok(2));
        assert!(p.sub_table("weapondefs").is_none());
    }
}
