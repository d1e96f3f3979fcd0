use super::*;

#[test]
fn upload_then_exists() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path().join("bucket"));

    let src = dir.path().join("asset.glb");
    std::fs::write(&src, b"glTF").unwrap();

    assert!(!store.exists("renders/A/input.glb").unwrap());
    let uri = store.upload(&src, "renders/A/input.glb").unwrap();
    assert!(uri.starts_with("file://"));
    assert!(uri.ends_with("renders/A/input.glb"));
    assert!(store.exists("renders/A/input.glb").unwrap());
    assert_eq!(
        std::fs::read(store.path_for("renders/A/input.glb").unwrap()).unwrap(),
        b"glTF"
    );
}

#[test]
fn upload_bytes_writes_content() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());
    store
        .upload_bytes(b"{}", "renders/A/input.json", "application/json")
        .unwrap();
    assert_eq!(
        std::fs::read_to_string(dir.path().join("renders/A/input.json")).unwrap(),
        "{}"
    );
}

#[test]
fn directories_are_not_objects() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("renders/A")).unwrap();
    let store = FsStore::new(dir.path());
    assert!(!store.exists("renders/A").unwrap());
}

#[test]
fn missing_source_is_a_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());
    let err = store
        .upload(&dir.path().join("nope.glb"), "renders/A/input.glb")
        .unwrap_err();
    assert!(matches!(err, RenderError::StorageAccess(_)));
}

#[test]
fn keys_cannot_escape_the_root() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());
    assert!(store.exists("../outside").is_err());
}
