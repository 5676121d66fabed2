//! Subcommand execution

use crate::config::Settings;
use crate::{BatchKind, Commands, TestArgs};
use anyhow::{Context, Result};
use sb_core::BatchReport;
use sb_directory::DirectoryClient;
use sb_instructions::InstructionSource;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Run `command` to completion
///
/// # Errors
/// Fails if the instruction file, the Slack client or the batch itself fails.
/// Row-level failures are logged and counted, not returned.
pub async fn execute(command: Commands, settings: &Settings) -> Result<()> {
    match command {
        Commands::Test(args) => {
            let files: Vec<PathBuf> = BatchKind::ALL.iter().map(|k| k.default_file()).collect();
            self_test(&args, &files).await;
            Ok(())
        }
        other => {
            let (kind, file) = other.batch().context("not a batch command")?;
            run_batch(kind, &file, settings).await.map(drop)
        }
    }
}

/// Open `file`, connect to Slack and run the `kind` batch
///
/// # Errors
/// Fails if the file cannot be opened, the token is missing or the batch aborts.
pub async fn run_batch(kind: BatchKind, file: &Path, settings: &Settings) -> Result<BatchReport> {
    let source = InstructionSource::open(file)
        .with_context(|| format!("failed to open instruction file '{}'", file.display()))?;
    tracing::info!(
        "Loaded {} instructions from '{}'",
        source.total_instructions(),
        file.display()
    );

    let client = DirectoryClient::connect(&settings.slack_user_token, settings.directory_config())
        .context("failed to create Slack client")?;

    run_with_client(kind, &client, &source).await
}

/// Run the `kind` processor over `source`
///
/// # Errors
/// Fails if the batch aborts on a malformed row.
pub async fn run_with_client(
    kind: BatchKind,
    client: &DirectoryClient,
    source: &InstructionSource,
) -> Result<BatchReport> {
    let report = match kind {
        BatchKind::UpdateUserPhotos => sb_core::update_user_photo_processor(client, source).await,
        BatchKind::ChangeUserEmails => sb_core::change_user_email_processor(client, source).await,
        BatchKind::DeactivateUsers => sb_core::deactivate_user_processor(client, source).await,
        BatchKind::AssignRoles => sb_core::assign_role_processor(client, source).await,
        BatchKind::AddToChannels => sb_core::add_to_channel_processor(client, source).await,
        BatchKind::InviteNewUsers => sb_core::invite_new_user_processor(client, source).await,
    }
    .with_context(|| format!("{kind} aborted"))?;

    Ok(report)
}

/// Which of `files` exist
#[must_use]
pub fn check_instruction_files(files: &[PathBuf]) -> Vec<(PathBuf, bool)> {
    files
        .iter()
        .map(|file| {
            let found = file.is_file();
            if found {
                tracing::info!("File '{}' found", file.display());
            } else {
                tracing::error!("File '{}' not found!", file.display());
            }
            (file.clone(), found)
        })
        .collect()
}

/// Report instruction files, then sleep on the runtime
pub async fn self_test(args: &TestArgs, files: &[PathBuf]) -> Vec<(PathBuf, bool)> {
    let found = check_instruction_files(files);

    tracing::info!(
        "Script self test is working. Sleeping {} seconds",
        args.sleep_secs
    );
    tokio::time::sleep(Duration::from_secs(args.sleep_secs)).await;
    tracing::info!("Script self test finished");

    found
}
