use std::collections::HashSet;
use std::ffi::c_void;

use mlua::Lua;
use mlua::LuaOptions;
use mlua::StdLib;
use mlua::Table;
use mlua::Value;
use tracing::trace;

use super::value::LuaTable;
use super::value::LuaValue;
use super::value::TableKey;

/// Nesting limit applied when converting evaluated tables. Definition files stay well
/// below this.
pub const DEFAULT_MAX_TABLE_DEPTH: usize = 32;

/// Base library functions that read files.
const REMOVED_GLOBALS: [&str; 2] = ["dofile", "loadfile"];

/// Controls how an evaluated Lua value is turned into a [`LuaValue`] tree.
#[derive(Clone, Debug)]
pub struct ConvertOptions {
    /// Tables nested deeper than this are dropped from their parent.
    pub max_depth: usize,
    /// Lower-case every string key, matching how the engine normalizes definition tables.
    pub lowercase_keys: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_TABLE_DEPTH,
            lowercase_keys: false,
        }
    }
}

/// Installs the minimal `Spring` table definition documents expect to find.
///
/// Unit files consult `Spring.GetModOptions()` and
/// `Spring.Utilities.Gametype.IsScavengers()` to tweak values for special game modes.
/// Both report the stock game.
pub fn install_engine_stubs(lua: &Lua) -> mlua::Result<()> {
    let spring = lua.create_table()?;

    let mod_options = lua.create_table()?;
    mod_options.set("forceallunits", false)?;
    spring.set(
        "GetModOptions",
        lua.create_function(move |_, ()| Ok(mod_options.clone()))?,
    )?;

    let gametype = lua.create_table()?;
    gametype.set("IsScavengers", lua.create_function(|_, ()| Ok(false))?)?;
    let utilities = lua.create_table()?;
    utilities.set("Gametype", gametype)?;
    spring.set("Utilities", utilities)?;

    lua.globals().set("Spring", spring)
}

/// A fresh state with the base, table, string and math libraries, and no file loaders.
/// Documents get nothing that reaches the file system, the environment or other processes.
pub fn sandboxed_state() -> mlua::Result<Lua> {
    let lua = Lua::new_with(StdLib::TABLE | StdLib::STRING | StdLib::MATH, LuaOptions::default())?;
    {
        let globals = lua.globals();
        for name in REMOVED_GLOBALS {
            globals.raw_set(name, Value::Nil)?;
        }
    }
    Ok(lua)
}

/// Evaluates `source` as a Lua chunk in a fresh sandboxed state and converts whatever it
/// returns.
///
/// `chunk_name` only shows up in Lua error messages.
pub fn evaluate(source: &[u8], chunk_name: &str, options: &ConvertOptions) -> mlua::Result<LuaValue> {
    let lua = sandboxed_state()?;
    install_engine_stubs(&lua)?;

    trace!(chunk_name, "evaluating lua document");
    let value: Value = lua.load(source).set_name(format!("={chunk_name}")).eval()?;

    let mut path = HashSet::new();
    Ok(convert_value(&value, options, 0, &mut path)?.unwrap_or(LuaValue::Nil))
}

/// `None` means the value has no representation in the tree and should be skipped.
///
/// `path` holds the tables currently being converted above this value. A table that
/// contains itself, directly or further down, is cut at the repeat.
fn convert_value(
    value: &Value,
    options: &ConvertOptions,
    depth: usize,
    path: &mut HashSet<*const c_void>,
) -> mlua::Result<Option<LuaValue>> {
    let converted = match value {
        Value::Nil => LuaValue::Nil,
        Value::Boolean(b) => LuaValue::Boolean(*b),
        Value::Integer(i) => LuaValue::Integer(*i),
        Value::Number(n) => LuaValue::Number(*n),
        Value::String(s) => LuaValue::String(String::from(s.to_string_lossy())),
        Value::Table(table) => {
            if depth >= options.max_depth {
                trace!(depth, "dropping table nested beyond the depth limit");
                return Ok(None);
            }
            let pointer = table.to_pointer();
            if !path.insert(pointer) {
                trace!(depth, "dropping reference to an enclosing table");
                return Ok(None);
            }
            let converted = convert_table(table, options, depth + 1, path);
            path.remove(&pointer);
            LuaValue::Table(converted?)
        }
        other => {
            trace!(type_name = other.type_name(), "dropping unsupported lua value");
            return Ok(None);
        }
    };

    Ok(Some(converted))
}

fn convert_table(
    table: &Table,
    options: &ConvertOptions,
    depth: usize,
    path: &mut HashSet<*const c_void>,
) -> mlua::Result<LuaTable> {
    let mut converted = LuaTable::new();

    table.for_each::<Value, Value>(|key, value| {
        let Some(key) = convert_key(&key, options) else {
            trace!(type_name = key.type_name(), "dropping entry with unsupported key");
            return Ok(());
        };

        if let Some(value) = convert_value(&value, options, depth, path)? {
            converted.insert(key, value);
        }

        Ok(())
    })?;

    Ok(converted)
}

fn convert_key(key: &Value, options: &ConvertOptions) -> Option<TableKey> {
    match key {
        Value::Integer(i) => Some(TableKey::Index(*i)),
        Value::Number(n) if n.is_finite() && n.fract() == 0.0 => Some(TableKey::Index(*n as i64)),
        Value::String(s) => {
            let name = String::from(s.to_string_lossy());
            if options.lowercase_keys {
                Some(TableKey::Name(name.to_lowercase()))
            } else {
                Some(TableKey::Name(name))
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn eval(source: &str) -> LuaValue {
        evaluate(source.as_bytes(), "test", &ConvertOptions::default()).expect("evaluation failed")
    }

    #[test]
    fn converts_scalars_and_nested_tables() {
        let value = eval(
            r#"
            return {
                armck = {
                    metalcost = 110,
                    speed = 1.5,
                    name = "Construction Kbot",
                    canmove = true,
                    buildoptions = { "armsolar", "armmex" },
                },
            }
            "#,
        );

        let root = value.table_ref().expect("root is not a table");
        let unit = root.get("armck").and_then(LuaValue::table_ref).expect("missing unit table");
        assert_eq!(unit.get("metalcost"), Some(&LuaValue::Integer(110)));
        assert_eq!(unit.get("speed"), Some(&LuaValue::Number(1.5)));
        assert_eq!(unit.get("canmove"), Some(&LuaValue::Boolean(true)));
        assert_eq!(unit.get("name"), Some(&LuaValue::String("Construction Kbot".to_string())));

        let options = unit.get("buildoptions").and_then(LuaValue::table_ref).expect("missing build options");
        assert_eq!(options.get_index(1), Some(&LuaValue::String("armsolar".to_string())));
        assert_eq!(options.get_index(2), Some(&LuaValue::String("armmex".to_string())));
    }

    #[test]
    fn engine_stubs_are_available() {
        let value = eval(
            r#"
            local scav = Spring.Utilities.Gametype.IsScavengers()
            local force = Spring.GetModOptions().forceallunits
            return { scav = scav, force = force }
            "#,
        );

        let root = value.table_ref().expect("root is not a table");
        assert_eq!(root.get("scav"), Some(&LuaValue::Boolean(false)));
        assert_eq!(root.get("force"), Some(&LuaValue::Boolean(false)));
    }

    #[test]
    fn functions_are_dropped() {
        let value = eval("return { f = function() end, kept = 1 }");
        let root = value.table_ref().expect("root is not a table");
        assert!(root.get("f").is_none());
        assert_eq!(root.get("kept"), Some(&LuaValue::Integer(1)));
    }

    #[test]
    fn self_references_are_cut() {
        let value = eval("local t = { x = 1 } t.me = t return t");
        let root = value.table_ref().expect("root is not a table");
        assert_eq!(root.get("x"), Some(&LuaValue::Integer(1)));
        assert!(root.get("me").is_none());
    }

    #[test]
    fn repeated_self_references_convert_quickly() {
        let started = std::time::Instant::now();
        let value = eval(
            r#"
            local t = { x = 1 }
            t.a = t
            t.b = t
            t.inner = { back = t, again = t }
            return t
            "#,
        );
        assert!(started.elapsed() < std::time::Duration::from_secs(2));

        let root = value.table_ref().expect("root is not a table");
        assert!(root.get("a").is_none());
        assert!(root.get("b").is_none());
        let inner = root.get("inner").and_then(LuaValue::table_ref).expect("missing inner table");
        assert!(inner.is_empty());
    }

    #[test]
    fn shared_tables_are_kept_in_every_place() {
        let value = eval("local shared = { n = 2 } return { left = shared, right = shared }");
        let root = value.table_ref().expect("root is not a table");
        for side in ["left", "right"] {
            let table = root.get(side).and_then(LuaValue::table_ref).expect("missing shared table");
            assert_eq!(table.get("n"), Some(&LuaValue::Integer(2)));
        }
    }

    #[test]
    fn documents_cannot_reach_the_host() {
        let value = eval(
            r#"
            return {
                no_os = os == nil,
                no_io = io == nil,
                no_require = require == nil,
                no_dofile = dofile == nil,
                no_loadfile = loadfile == nil,
                formatted = string.format("%d-%s", math.floor(2.5), table.concat({ "a", "b" })),
            }
            "#,
        );
        let root = value.table_ref().expect("root is not a table");
        for key in ["no_os", "no_io", "no_require", "no_dofile", "no_loadfile"] {
            assert_eq!(root.get(key), Some(&LuaValue::Boolean(true)), "{key}");
        }
        assert_eq!(root.get("formatted"), Some(&LuaValue::String("2-ab".to_string())));
    }

    #[test]
    fn keys_can_be_lowercased() {
        let options = ConvertOptions {
            lowercase_keys: true,
            ..Default::default()
        };
        let value = evaluate(b"return { MetalCost = 5 }", "test", &options).expect("evaluation failed");
        let root = value.table_ref().expect("root is not a table");
        assert_eq!(root.get("metalcost"), Some(&LuaValue::Integer(5)));
    }

    #[test]
    fn chunks_without_return_evaluate_to_nil() {
        assert_eq!(eval("local x = 1"), LuaValue::Nil);
    }

    #[test]
    fn syntax_errors_are_reported() {
        assert!(evaluate(b"return {", "broken", &ConvertOptions::default()).is_err());
    }
}
