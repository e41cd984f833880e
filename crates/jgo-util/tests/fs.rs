use jgo_util::fs::{ensure_dir, find_ancestor_with, write_atomic};
use tempfile::TempDir;

#[test]
fn test_find_ancestor_with_direct() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("jgo.toml"), "").unwrap();
    let result = find_ancestor_with(tmp.path(), "jgo.toml");
    assert_eq!(result, Some(tmp.path().to_path_buf()));
}

#[test]
fn test_find_ancestor_with_nested() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("jgo.toml"), "").unwrap();
    let nested = tmp.path().join("a").join("b").join("c");
    std::fs::create_dir_all(&nested).unwrap();
    let result = find_ancestor_with(&nested, "jgo.toml");
    assert_eq!(result, Some(tmp.path().to_path_buf()));
}

#[test]
fn test_find_ancestor_with_not_found() {
    let tmp = TempDir::new().unwrap();
    let result = find_ancestor_with(tmp.path(), "NonExistent.file");
    assert_eq!(result, None);
}

#[test]
fn test_ensure_dir_creates_parents() {
    let tmp = TempDir::new().unwrap();
    let deep = tmp.path().join("x").join("y").join("z");
    ensure_dir(&deep).unwrap();
    assert!(deep.is_dir());
    // Idempotent on an existing directory.
    ensure_dir(&deep).unwrap();
}

#[test]
fn test_write_atomic_creates_file_with_contents() {
    let tmp = TempDir::new().unwrap();
    let dest = tmp.path().join("sub").join("artifact.jar");
    write_atomic(&dest, b"payload").unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
}

#[test]
fn test_write_atomic_replaces_existing() {
    let tmp = TempDir::new().unwrap();
    let dest = tmp.path().join("f.txt");
    write_atomic(&dest, b"one").unwrap();
    write_atomic(&dest, b"two").unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), b"two");
}
