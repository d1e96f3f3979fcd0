use super::*;

fn store(endpoint: &str) -> GcsStore {
    let client = Client::new();
    let tokens = Arc::new(TokenSource::new(Some("test-token"), client.clone()));
    GcsStore::new(client, tokens, "render-bucket").with_endpoint(endpoint)
}

#[test]
fn uris_use_gs_scheme() {
    let s = store("https://storage.googleapis.com/");
    assert_eq!(s.bucket(), "render-bucket");
    assert_eq!(
        s.uri("renders/ABCDEF123456/_SUCCESS"),
        "gs://render-bucket/renders/ABCDEF123456/_SUCCESS"
    );
}

#[test]
fn object_urls_encode_the_key_as_one_segment() {
    let s = store("https://storage.googleapis.com");
    let url = s.object_url("renders/ABCDEF123456/_SUCCESS").unwrap();
    assert_eq!(
        url.as_str(),
        "https://storage.googleapis.com/storage/v1/b/render-bucket/o/renders%2FABCDEF123456%2F_SUCCESS"
    );
}

#[test]
fn unreachable_backend_is_a_storage_access_error() {
    let s = store("http://127.0.0.1:1");
    let err = s.exists("renders/ABCDEF123456/_SUCCESS").unwrap_err();
    assert!(matches!(err, RenderError::StorageAccess(_)), "{err}");
    let err = s
        .upload_bytes(b"", "renders/ABCDEF123456/_SUCCESS", "text/plain")
        .unwrap_err();
    assert!(matches!(err, RenderError::StorageAccess(_)), "{err}");
}

#[test]
fn invalid_keys_fail_before_any_request() {
    let s = store("http://127.0.0.1:1");
    assert!(matches!(
        s.exists("../x"),
        Err(RenderError::InvalidRequest(_))
    ));
}
