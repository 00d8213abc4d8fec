use std::fs;

use pipewatch_engine::{ensure_dir, write_atomically, PersistError};
use tempfile::TempDir;

#[test]
fn creates_missing_directory() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("nested").join("pipewatch");
    assert!(!new_dir.exists());
    ensure_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_creates_and_replaces() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("state").join("preferences.ron");

    write_atomically(&target, "(theme: Light)").unwrap();
    assert_eq!(fs::read_to_string(&target).unwrap(), "(theme: Light)");

    write_atomically(&target, "(theme: Dark)").unwrap();
    assert_eq!(fs::read_to_string(&target).unwrap(), "(theme: Dark)");

    let leftovers = fs::read_dir(target.parent().unwrap()).unwrap().count();
    assert_eq!(leftovers, 1);
}

#[test]
fn file_in_place_of_directory_is_an_error() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not_a_dir");
    fs::write(&blocker, "x").unwrap();

    let result = write_atomically(&blocker.join("preferences.ron"), "data");
    assert!(matches!(result, Err(PersistError::Directory(_))));
    assert_eq!(fs::read_to_string(&blocker).unwrap(), "x");
}

#[test]
fn bare_file_name_has_no_parent() {
    let result = write_atomically(std::path::Path::new("preferences.ron"), "data");
    assert!(matches!(result, Err(PersistError::NoParent(_))));
}
