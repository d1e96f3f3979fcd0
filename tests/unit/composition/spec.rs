use serde_json::json;

use super::*;

#[test]
fn accepts_non_empty_objects() {
    let spec = CompositionSpec::from_value(json!({"MOVEMENT": {"NAME": "ZOOM_IN"}})).unwrap();
    assert!(spec.as_map().contains_key("MOVEMENT"));
}

#[test]
fn rejects_arrays_scalars_and_empty_objects() {
    for value in [json!([1, 2]), json!("x"), json!(3), json!(null), json!({})] {
        let err = CompositionSpec::from_value(value).unwrap_err();
        assert!(matches!(err, RenderError::InvalidRequest(_)), "{err}");
    }
}

#[test]
fn rejects_invalid_json_text() {
    assert!(matches!(
        CompositionSpec::from_json_str("{not json"),
        Err(RenderError::InvalidRequest(_))
    ));
}

#[test]
fn serialized_bytes_are_a_json_object() {
    let spec = CompositionSpec::from_value(json!({"a": 1.5, "b": [true]})).unwrap();
    let bytes = spec.to_json_bytes().unwrap();
    let back: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(back.is_object());
    assert_eq!(back["a"], json!(1.5));
}

#[test]
fn deserialize_goes_through_validation() {
    assert!(serde_json::from_str::<CompositionSpec>("[1]").is_err());
    assert!(serde_json::from_str::<CompositionSpec>("{\"k\": 1}").is_ok());
}
