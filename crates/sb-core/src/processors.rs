//! One processor per instruction kind
//!
//! Every processor walks its rows in file order and for each one:
//! 1. Resolves the target through the directory client
//! 2. Skips the row if the target is absent or the lookup failed
//! 3. Applies the mutation, skipping the row if it fails
//!
//! Nothing a single row does stops the batch. A malformed row does, since
//! everything after it is unreadable.

use crate::error::ProcessError;
use crate::report::{BatchReport, RowOutcome};
use sb_directory::{DirectoryClient, DirectoryError, ScimUser};
use sb_instructions::InstructionSource;
use sb_models::{
    AddUserInstructionEntry, AssignAdminOwnerInstructionEntry, AssignPhotoInstructionEntry,
    ChangeUserEmailInstructionEntry, DeactivateRemoveUserInstructionEntry,
    InviteNewUserInstructionEntry, User, Workspace, WorkspaceRole,
};

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// Remote id of the account registered under `email`
async fn resolve_user_id(client: &DirectoryClient, email: &str) -> Result<String, RowOutcome> {
    match client.search_user(email).await {
        Ok(Some(user)) => Ok(user.id),
        Ok(None) => {
            tracing::error!("User '{email}' not found in Slack");
            Err(RowOutcome::NotFound)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to search user '{email}'");
            Err(RowOutcome::Failed)
        }
    }
}

/// Row id if present, otherwise a lookup by email
async fn user_id_from_row(
    client: &DirectoryClient,
    slack_id: &str,
    email: &str,
) -> Result<String, RowOutcome> {
    match non_empty(slack_id) {
        Some(id) => Ok(id.to_string()),
        None => resolve_user_id(client, email).await,
    }
}

async fn workspace_id_from_row(
    client: &DirectoryClient,
    slack_id: &str,
    name: &str,
) -> Result<String, RowOutcome> {
    if let Some(id) = non_empty(slack_id) {
        return Ok(id.to_string());
    }

    match client
        .verify_workspace_exists_in_slack(&Workspace::new(name))
        .await
    {
        Ok(Some(id)) => Ok(id),
        Ok(None) => {
            tracing::error!("Workspace '{name}' not found in Slack");
            Err(RowOutcome::NotFound)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to look up workspace '{name}'");
            Err(RowOutcome::Failed)
        }
    }
}

fn applied(result: Result<(), DirectoryError>, action: &str, email: &str) -> RowOutcome {
    match result {
        Ok(()) => RowOutcome::Succeeded,
        Err(e) => {
            tracing::error!(error = %e, "Failed to {action} for user '{email}'");
            RowOutcome::Failed
        }
    }
}

fn finish(batch: &str, report: BatchReport) -> BatchReport {
    if report.is_clean() {
        tracing::info!("{batch} finished: {report}");
    } else {
        tracing::warn!("{batch} finished: {report}");
    }
    report
}

/// Point each listed user's avatar at the row's photo URL
///
/// # Errors
/// - `ProcessError::Instructions` if the file is unreadable or a row is malformed
pub async fn update_user_photo_processor(
    client: &DirectoryClient,
    instructions: &InstructionSource,
) -> Result<BatchReport, ProcessError> {
    let mut report = BatchReport::new();

    for entry in instructions.assign_photo_instructions()? {
        let entry: AssignPhotoInstructionEntry = entry?;
        tracing::info!("Working on {}", entry.user_email);

        let outcome = match resolve_user_id(client, &entry.user_email).await {
            Ok(id) => applied(
                client.update_photo(&id, &entry.photo_url).await,
                "update photo",
                &entry.user_email,
            ),
            Err(outcome) => outcome,
        };
        report.record(outcome);
    }

    Ok(finish("update-user-photos", report))
}

/// Move each user from `current_email` to `new_email`
///
/// # Errors
/// - `ProcessError::Instructions` if the file is unreadable or a row is malformed
pub async fn change_user_email_processor(
    client: &DirectoryClient,
    instructions: &InstructionSource,
) -> Result<BatchReport, ProcessError> {
    let mut report = BatchReport::new();

    for entry in instructions.change_email_instructions()? {
        let entry: ChangeUserEmailInstructionEntry = entry?;
        tracing::info!("Working on {} -> {}", entry.current_email, entry.new_email);

        let outcome = match resolve_user_id(client, &entry.current_email).await {
            Ok(id) => applied(
                client.change_user_email(&id, &entry.new_email).await,
                "change email",
                &entry.current_email,
            ),
            Err(outcome) => outcome,
        };
        report.record(outcome);
    }

    Ok(finish("change-user-emails", report))
}

/// Deactivate each listed user
///
/// # Errors
/// - `ProcessError::Instructions` if the file is unreadable or a row is malformed
pub async fn deactivate_user_processor(
    client: &DirectoryClient,
    instructions: &InstructionSource,
) -> Result<BatchReport, ProcessError> {
    let mut report = BatchReport::new();

    for entry in instructions.deactivate_remove_instructions()? {
        let entry: DeactivateRemoveUserInstructionEntry = entry?;
        tracing::info!("Working on {}", entry.user_email);

        let outcome =
            match user_id_from_row(client, &entry.user_slack_id, &entry.user_email).await {
                Ok(id) => {
                    let user = User::new(entry.user_email.clone(), entry.user_email.clone())
                        .with_slack_id(id);
                    applied(
                        client.deactivate_user(&user).await,
                        "deactivate",
                        &entry.user_email,
                    )
                }
                Err(outcome) => outcome,
            };
        report.record(outcome);
    }

    Ok(finish("deactivate-users", report))
}

/// Grant admin or owner in the row's workspace
///
/// # Errors
/// - `ProcessError::Instructions` if the file is unreadable or a row is malformed
pub async fn assign_role_processor(
    client: &DirectoryClient,
    instructions: &InstructionSource,
) -> Result<BatchReport, ProcessError> {
    let mut report = BatchReport::new();

    for entry in instructions.assign_role_instructions()? {
        let entry: AssignAdminOwnerInstructionEntry = entry?;
        tracing::info!(
            "Working on {} ({} in {})",
            entry.user_email,
            entry.role,
            entry.workspace_name
        );
        report.record(assign_role(client, &entry).await);
    }

    Ok(finish("assign-roles", report))
}

async fn assign_role(client: &DirectoryClient, entry: &AssignAdminOwnerInstructionEntry) -> RowOutcome {
    let workspace_id =
        match workspace_id_from_row(client, &entry.workspace_slack_id, &entry.workspace_name).await {
            Ok(id) => id,
            Err(outcome) => return outcome,
        };
    let user_id = match user_id_from_row(client, &entry.user_slack_id, &entry.user_email).await {
        Ok(id) => id,
        Err(outcome) => return outcome,
    };

    let result = match entry.role {
        WorkspaceRole::Admin => client.make_user_admin(&user_id, &workspace_id).await,
        WorkspaceRole::Owner => client.make_user_owner(&user_id, &workspace_id).await,
    };
    applied(result, "assign role", &entry.user_email)
}

/// Add each user to the row's workspace and channel
///
/// # Errors
/// - `ProcessError::Instructions` if the file is unreadable or a row is malformed
pub async fn add_to_channel_processor(
    client: &DirectoryClient,
    instructions: &InstructionSource,
) -> Result<BatchReport, ProcessError> {
    let mut report = BatchReport::new();

    for entry in instructions.add_to_channel_instructions()? {
        let entry: AddUserInstructionEntry = entry?;
        tracing::info!(
            "Working on {} ({} / {})",
            entry.user_email,
            entry.workspace_name,
            entry.channel_name
        );
        report.record(add_to_channel(client, &entry).await);
    }

    Ok(finish("add-to-channels", report))
}

async fn add_to_channel(client: &DirectoryClient, entry: &AddUserInstructionEntry) -> RowOutcome {
    let workspace_id =
        match workspace_id_from_row(client, &entry.workspace_slack_id, &entry.workspace_name).await {
            Ok(id) => id,
            Err(outcome) => return outcome,
        };
    let user_id = match user_id_from_row(client, &entry.user_slack_id, &entry.user_email).await {
        Ok(id) => id,
        Err(outcome) => return outcome,
    };
    let channel_ids: Vec<String> = non_empty(&entry.channel_slack_id)
        .map(str::to_string)
        .into_iter()
        .collect();

    applied(
        client
            .add_user_to_workspace_by_ids(&user_id, &workspace_id, &channel_ids)
            .await,
        "add to workspace",
        &entry.user_email,
    )
}

/// Invite each new user into the row's workspace and channel
///
/// Rows whose email already has an account are skipped. Title, section and
/// location, when given, are written to the new account afterwards.
///
/// # Errors
/// - `ProcessError::Instructions` if the file is unreadable or a row is malformed
pub async fn invite_new_user_processor(
    client: &DirectoryClient,
    instructions: &InstructionSource,
) -> Result<BatchReport, ProcessError> {
    let mut report = BatchReport::new();

    for entry in instructions.invite_new_user_instructions()? {
        let entry: InviteNewUserInstructionEntry = entry?;
        tracing::info!("Working on {} ({})", entry.user_email, entry.workspace_name);
        report.record(invite_new_user(client, &entry).await);
    }

    Ok(finish("invite-new-users", report))
}

async fn invite_new_user(client: &DirectoryClient, entry: &InviteNewUserInstructionEntry) -> RowOutcome {
    match client.verify_user_not_exists_in_slack(&entry.user_email).await {
        Ok(()) => {}
        Err(e @ DirectoryError::UserAlreadyExists(_)) => {
            tracing::warn!("Skipping '{}': {e}", entry.user_email);
            return RowOutcome::Failed;
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to search user '{}'", entry.user_email);
            return RowOutcome::Failed;
        }
    }

    let workspace_id =
        match workspace_id_from_row(client, &entry.workspace_slack_id, &entry.workspace_name).await {
            Ok(id) => id,
            Err(outcome) => return outcome,
        };
    let channel_ids: Vec<String> = non_empty(&entry.channel_slack_id)
        .map(str::to_string)
        .into_iter()
        .collect();

    let user_id = match client
        .invite_new_user_to_workspace(&entry.user_email, &workspace_id, &channel_ids, false, false)
        .await
    {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, "Failed to invite user '{}'", entry.user_email);
            return RowOutcome::Failed;
        }
    };
    tracing::info!("Invited {} as {user_id}", entry.user_email);

    if entry.title.is_none() && entry.section.is_none() && entry.location.is_none() {
        return RowOutcome::Succeeded;
    }

    let mut user = User::new(entry.user_name.clone(), entry.user_email.clone()).with_slack_id(user_id.clone());
    user.title.clone_from(&entry.title);
    user.section.clone_from(&entry.section);
    user.location.clone_from(&entry.location);

    let profile = ScimUser::for_user(&user, &user.name)
        .with_id(user_id)
        .with_active(true);
    applied(client.update_user(&profile).await, "update profile", &entry.user_email)
}
