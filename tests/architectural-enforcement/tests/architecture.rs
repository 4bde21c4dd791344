//! Source-tree invariants for the routing core
//!
//! These tests walk the production sources of `switchboard-core` and fail
//! on violations that compile fine but erode the architecture:
//! - `reqwest` usage outside `src/backend/` (the router must stay
//!   transport-agnostic; provider wire traffic belongs to adapters)
//! - `std::thread::sleep` anywhere in production code (the core is async;
//!   a blocking sleep stalls the whole runtime worker)

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Root of the switchboard-core source tree, relative to this crate
fn core_src() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../switchboard/core/src")
}

/// All production `.rs` files under `src/`
fn production_sources() -> Vec<PathBuf> {
    WalkDir::new(core_src())
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
        .map(|e| e.path().to_path_buf())
        .collect()
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| panic!("failed to read {path:?}: {e}"))
}

#[test]
fn reqwest_is_confined_to_the_backend_boundary() {
    let backend_dir = core_src().join("backend");

    let violations: Vec<PathBuf> = production_sources()
        .into_iter()
        .filter(|path| !path.starts_with(&backend_dir))
        .filter(|path| read(path).contains("reqwest::"))
        .collect();

    assert!(
        violations.is_empty(),
        "reqwest used outside src/backend/: {violations:?}"
    );
}

#[test]
fn no_blocking_sleep_in_production_code() {
    let violations: Vec<PathBuf> = production_sources()
        .into_iter()
        .filter(|path| {
            let source = read(path);
            source.contains("thread::sleep") || source.contains("std::thread::sleep")
        })
        .collect();

    assert!(
        violations.is_empty(),
        "blocking sleep in production code: {violations:?}"
    );
}

#[test]
fn source_tree_is_present() {
    // Guard against the relative path silently rotting if crates move
    assert!(
        core_src().join("lib.rs").exists(),
        "expected switchboard-core sources at {:?}",
        core_src()
    );
}
