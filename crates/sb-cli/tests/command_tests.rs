//! Subcommands against in-memory Slack

use pretty_assertions::assert_eq;
use sb_cli::commands::{run_batch, run_with_client, self_test};
use sb_cli::{BatchKind, Settings, TestArgs};
use sb_instructions::InstructionSource;
use sb_test_utils::{fake_client, instruction_file, FakeAdminApi, FakeScimApi};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn photo_command_runs_its_processor() {
    let admin = Arc::new(FakeAdminApi::new());
    let scim = Arc::new(FakeScimApi::new());
    let id = scim.add_user("Jane", "jane@example.com", true);

    let file = instruction_file("user_email,photo_url", &["jane@example.com,https://img/jane.png"]);
    let source = InstructionSource::open(file.path()).unwrap();
    let client = fake_client(&admin, &scim);

    let report = run_with_client(BatchKind::UpdateUserPhotos, &client, &source)
        .await
        .unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(scim.user(&id).unwrap().photo.as_deref(), Some("https://img/jane.png"));
}

#[tokio::test(start_paused = true)]
async fn wrong_file_shape_aborts_with_context() {
    let admin = Arc::new(FakeAdminApi::new());
    let scim = Arc::new(FakeScimApi::new());

    // an email-change file handed to the photo batch
    let file = instruction_file("current_email,new_email", &["a@example.com,b@example.com"]);
    let source = InstructionSource::open(file.path()).unwrap();
    let client = fake_client(&admin, &scim);

    let err = run_with_client(BatchKind::UpdateUserPhotos, &client, &source)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("update-user-photos aborted"));
    assert!(scim.calls().is_empty());
}

#[tokio::test]
async fn missing_token_is_reported_before_any_row() {
    let file = instruction_file("user_email,photo_url", &["jane@example.com,https://img/jane.png"]);
    let settings = Settings::default();

    let err = run_batch(BatchKind::UpdateUserPhotos, file.path(), &settings)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("failed to create Slack client"));
}

#[tokio::test]
async fn missing_instruction_file_is_reported() {
    let settings = Settings::default();
    let err = run_batch(
        BatchKind::DeactivateUsers,
        &PathBuf::from("/nonexistent/deactivate_users.csv"),
        &settings,
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("/nonexistent/deactivate_users.csv"));
}

#[tokio::test(start_paused = true)]
async fn self_test_reports_files_and_sleeps() {
    let present = tempfile::NamedTempFile::new().unwrap();
    let files = vec![present.path().to_path_buf(), PathBuf::from("/nonexistent/x.csv")];

    let start = tokio::time::Instant::now();
    let found = self_test(&TestArgs { sleep_secs: 5 }, &files).await;

    assert_eq!(
        found.iter().map(|(_, ok)| *ok).collect::<Vec<_>>(),
        vec![true, false]
    );
    assert!(start.elapsed() >= std::time::Duration::from_secs(5));
}
