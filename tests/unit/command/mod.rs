use crate::command::builder::CommandBuilder;
use crate::command::contract::{ExecutionContract, shell_quote};
use crate::foundation::error::RenderError;
use crate::settings::RendererConfig;

fn renderer() -> RendererConfig {
    RendererConfig {
        app: Some("/opt/blender/blender".into()),
        script_file: Some("/srv/blender_script/process.py".into()),
        base_scene: Some("/srv/base.blend".into()),
        function_name: "process".into(),
    }
}

#[test]
fn build_produces_documented_word_order() {
    let contract = CommandBuilder::new(renderer())
        .build("/in/a.glb", "/tmp/in_X.json", "/tmp/out_X.mov", None)
        .unwrap();
    assert_eq!(contract.program, "/opt/blender/blender");
    assert_eq!(
        contract.args(),
        vec![
            "/srv/base.blend",
            "--background",
            "--python",
            "/srv/blender_script/process.py",
            "--",
            "--json_file_path=/tmp/in_X.json",
            "--glb_file_path=/in/a.glb",
            "--out_file_path=/tmp/out_X.mov",
            "--function=process",
        ]
    );
}

#[test]
fn build_is_deterministic() {
    let builder = CommandBuilder::new(renderer());
    let a = builder.build("a.glb", "c.json", "o.mov", Some("s.blend")).unwrap();
    let b = builder.build("a.glb", "c.json", "o.mov", Some("s.blend")).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.shell_line(), b.shell_line());
}

#[test]
fn scene_override_wins_and_empty_values_are_omitted() {
    let mut cfg = renderer();
    cfg.function_name = String::new();
    let builder = CommandBuilder::new(cfg);

    let contract = builder.build("a.glb", "c.json", "o.mov", Some("alt.blend")).unwrap();
    assert_eq!(contract.scene.as_deref(), Some("alt.blend"));
    assert!(!contract.script_args.iter().any(|a| a.starts_with("--function")));

    let contract = builder.build("a.glb", "", "o.mov", Some("")).unwrap();
    assert_eq!(contract.scene.as_deref(), Some("/srv/base.blend"));
    assert!(!contract.script_args.iter().any(|a| a.starts_with("--json_file_path")));
}

#[test]
fn scene_word_is_dropped_when_unknown() {
    let mut cfg = renderer();
    cfg.base_scene = None;
    let contract = CommandBuilder::new(cfg).build("a", "c", "o", None).unwrap();
    assert_eq!(contract.args()[0], "--background");
}

#[test]
fn missing_binary_or_script_is_invalid_configuration() {
    let mut cfg = renderer();
    cfg.app = None;
    let err = CommandBuilder::new(cfg).build("a", "c", "o", None).unwrap_err();
    assert!(matches!(err, RenderError::InvalidConfiguration(_)));
    assert!(err.to_string().contains("BLENDER_APP"));

    let mut cfg = renderer();
    cfg.script_file = Some(" ".into());
    let err = CommandBuilder::new(cfg).build("a", "c", "o", None).unwrap_err();
    assert!(err.to_string().contains("BLENDER_SCRIPT_FILE"));
}

#[test]
fn shell_quote_leaves_plain_words_and_escapes_the_rest() {
    assert_eq!(shell_quote("--out_file_path=/data/x.mov"), "--out_file_path=/data/x.mov");
    assert_eq!(shell_quote(""), "''");
    assert_eq!(shell_quote("a b"), "'a b'");
    assert_eq!(shell_quote("it's"), r"'it'\''s'");
    assert_eq!(shell_quote("$(rm -rf /)"), "'$(rm -rf /)'");
}

#[test]
fn shell_line_matches_command_words() {
    let contract = ExecutionContract {
        program: "blender".into(),
        scene: None,
        script: "/s/p y.py".into(),
        script_args: vec!["--function=process".into()],
    };
    assert_eq!(
        contract.shell_line(),
        "blender --background --python '/s/p y.py' -- --function=process"
    );
    let cmd = contract.to_command();
    assert_eq!(cmd.get_program(), "blender");
    assert_eq!(cmd.get_args().count(), 5);
}

#[test]
fn check_reports_missing_script() {
    let builder = CommandBuilder::new(RendererConfig {
        script_file: Some("  ".into()),
        ..renderer()
    });
    let err = builder.check().unwrap_err();
    assert!(matches!(err, RenderError::InvalidConfiguration(ref m) if m.contains("BLENDER_SCRIPT_FILE")));
    assert!(CommandBuilder::new(renderer()).check().is_ok());
}
