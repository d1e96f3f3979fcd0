use super::*;

#[test]
fn written_file_is_removed_on_drop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("in_X.json");
    let guard = TempFile::write(path.clone(), b"{}").unwrap();
    assert_eq!(std::fs::read(guard.path()).unwrap(), b"{}");
    drop(guard);
    assert!(!path.exists());
}

#[test]
fn kept_file_survives() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out_X.mov");
    let guard = TempFile::guard(path.clone());
    std::fs::write(&path, b"video").unwrap();
    assert_eq!(guard.keep(), path);
    assert!(path.exists());
}

#[test]
fn never_created_file_is_fine() {
    let dir = tempfile::tempdir().unwrap();
    drop(TempFile::guard(dir.path().join("out_missing.mov")));
}

#[test]
fn write_into_missing_dir_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = TempFile::write(dir.path().join("nope/in.json"), b"{}").unwrap_err();
    assert!(err.to_string().contains("write temp file"));
}
