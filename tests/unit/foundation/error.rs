use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        RenderError::invalid_request("x")
            .to_string()
            .contains("invalid request:")
    );
    assert!(
        RenderError::invalid_configuration("x")
            .to_string()
            .contains("invalid configuration:")
    );
    assert!(
        RenderError::provisioning("x")
            .to_string()
            .contains("provisioning error:")
    );
    assert!(
        RenderError::storage_access("x")
            .to_string()
            .contains("storage access error:")
    );
    assert!(RenderError::exit_code(3).to_string().contains("code 3"));
}

#[test]
fn classes_separate_never_started_from_ran_and_unknown() {
    assert_eq!(
        RenderError::invalid_request("x").class(),
        FailureClass::NeverStarted
    );
    assert_eq!(
        RenderError::provisioning("x").class(),
        FailureClass::NeverStarted
    );
    assert_eq!(RenderError::exit_code(1).class(), FailureClass::RanAndFailed);
    assert_eq!(
        RenderError::OutputMissing(PathBuf::from("out.mov")).class(),
        FailureClass::RanAndFailed
    );
    assert_eq!(
        RenderError::storage_access("x").class(),
        FailureClass::Unknown
    );
}

#[test]
fn exit_code_value_only_for_exit_failures() {
    assert_eq!(RenderError::exit_code(1).exit_code_value(), Some(1));
    assert_eq!(
        RenderError::RenderProcess(ProcessFailure::ExecutableMissing("blender".into()))
            .exit_code_value(),
        None
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = RenderError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
