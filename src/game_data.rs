//! Utilities for locating definition documents inside a Beyond All Reason game checkout.
//!
//! Everything goes through a [`VfsPath`], so a physical checkout and an in-memory tree
//! (as used by the tests) are handled the same way.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use tracing::debug;
use tracing::warn;
use vfs::PhysicalFS;
use vfs::VfsPath;

use crate::error::ErrorKind;
use crate::unit_defs::types::UnitRef;

/// Directory holding one Lua document per unit, nested by faction and category.
pub const UNITS_DIR: &str = "units";
/// The build menu layout document.
pub const LAYOUT_PATH: &str = "luaui/configs/gridmenu_layouts.lua";

const DOCUMENT_EXTENSION: &str = "lua";

/// Source of one unit document.
#[derive(Clone, Debug)]
pub struct UnitDocument {
    pub unit_ref: UnitRef,
    pub source: Vec<u8>,
}

/// Opens a game checkout directory as a file tree.
pub fn open_game_dir(game_dir: &Path) -> Result<VfsPath, ErrorKind> {
    if !game_dir.is_dir() {
        return Err(ErrorKind::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("game directory {} does not exist", game_dir.display()),
        )));
    }

    Ok(VfsPath::new(PhysicalFS::new(game_dir)))
}

pub fn read_document(path: &VfsPath) -> Result<Vec<u8>, ErrorKind> {
    let mut data = Vec::new();
    path.open_file()?.read_to_end(&mut data)?;
    Ok(data)
}

/// Finds every `*.lua` file below `units_dir`. The unit ref is the file stem; when two
/// files share a stem the first one in path order is kept.
pub fn discover_unit_documents(root: &VfsPath, units_dir: &str) -> Result<BTreeMap<UnitRef, VfsPath>, ErrorKind> {
    let units_root = root.join(units_dir)?;
    let mut documents: BTreeMap<UnitRef, VfsPath> = BTreeMap::new();

    let mut paths = Vec::new();
    for entry in units_root.walk_dir()? {
        let path = entry?;
        if path.is_file()? && path.extension().as_deref() == Some(DOCUMENT_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    for path in paths {
        let filename = path.filename();
        let stem = filename
            .strip_suffix(DOCUMENT_EXTENSION)
            .and_then(|stem| stem.strip_suffix('.'))
            .unwrap_or(&filename);
        let unit_ref = UnitRef::from(stem);

        if let Some(existing) = documents.get(&unit_ref) {
            warn!(
                unit = %unit_ref,
                kept = existing.as_str(),
                ignored = path.as_str(),
                "duplicate unit document"
            );
            continue;
        }
        documents.insert(unit_ref, path);
    }

    debug!(count = documents.len(), units_dir, "discovered unit documents");
    Ok(documents)
}

/// Reads every discovered unit document. Unreadable files are logged and skipped.
pub fn load_unit_documents(root: &VfsPath, units_dir: &str) -> Result<Vec<UnitDocument>, ErrorKind> {
    let documents = discover_unit_documents(root, units_dir)?
        .into_iter()
        .filter_map(|(unit_ref, path)| match read_document(&path) {
            Ok(source) => Some(UnitDocument { unit_ref, source }),
            Err(err) => {
                warn!(unit = %unit_ref, path = path.as_str(), %err, "failed to read unit document");
                None
            }
        })
        .collect();

    Ok(documents)
}

pub fn load_layout_document(root: &VfsPath, layout_path: &str) -> Result<Vec<u8>, ErrorKind> {
    read_document(&root.join(layout_path)?)
}
