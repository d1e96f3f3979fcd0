use std::collections::HashSet;

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::*;

#[test]
fn minted_ids_have_fixed_length_and_alphabet() {
    let id = JobId::mint();
    assert_eq!(id.as_str().len(), JobId::LEN);
    assert!(
        id.as_str()
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    );
}

#[test]
fn hundred_thousand_seeded_ids_do_not_collide() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut seen = HashSet::with_capacity(100_000);
    for _ in 0..100_000 {
        assert!(seen.insert(JobId::mint_with(&mut rng)));
    }
}

#[test]
fn parse_rejects_path_like_ids() {
    assert!(JobId::parse("ABCDEF123456").is_ok());
    assert!(JobId::parse("../ETC/PASSW").is_err());
    assert!(JobId::parse("SHORT").is_err());
    assert!(JobId::parse("ABCDEF1234567").is_err());
}

#[test]
fn job_id_serde_validates() {
    let id: JobId = serde_json::from_str("\"ABCDEF123456\"").unwrap();
    assert_eq!(id.to_string(), "ABCDEF123456");
    assert!(serde_json::from_str::<JobId>("\"a/b\"").is_err());
}

#[test]
fn environment_parses_aliases() {
    assert_eq!(
        "local".parse::<ExecutionEnvironment>().unwrap(),
        ExecutionEnvironment::Local
    );
    assert_eq!(
        "GCP".parse::<ExecutionEnvironment>().unwrap(),
        ExecutionEnvironment::Cloud
    );
    assert_eq!(
        " cloud ".parse::<ExecutionEnvironment>().unwrap(),
        ExecutionEnvironment::Cloud
    );
    assert!(matches!(
        "mars".parse::<ExecutionEnvironment>(),
        Err(RenderError::InvalidConfiguration(_))
    ));
}

#[test]
fn status_terminality_and_wire_names() {
    assert!(!JobStatus::Pending.is_terminal());
    assert!(JobStatus::Succeeded.is_terminal());
    assert!(JobStatus::Failed.is_terminal());
    assert_eq!(
        serde_json::to_string(&JobStatus::Succeeded).unwrap(),
        "\"SUCCEEDED\""
    );
    assert_eq!(JobStatus::Pending.to_string(), "PENDING");
}
