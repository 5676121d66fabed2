//! Directory client against in-memory Slack

use pretty_assertions::assert_eq;
use sb_directory::{DirectoryConfig, DirectoryError, MultipleMatchPolicy, ScimResponse};
use sb_models::{Channel, EntityKind, User, Workspace};
use sb_test_utils::{fake_client, fake_client_with_config, FakeAdminApi, FakeScimApi};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn fakes() -> (Arc<FakeAdminApi>, Arc<FakeScimApi>) {
    (Arc::new(FakeAdminApi::new()), Arc::new(FakeScimApi::new()))
}

#[tokio::test(start_paused = true)]
async fn workspace_is_created_once() {
    let (admin, scim) = fakes();
    admin.push_response("admin.teams.list", json!({"ok": true, "teams": []}));
    admin.push_response("admin.teams.create", json!({"ok": true, "team": "W1"}));
    admin.push_response(
        "admin.teams.list",
        json!({"ok": true, "teams": [{"id": "W1", "name": "Cairo Office"}]}),
    );
    let client = fake_client(&admin, &scim);
    let workspace = Workspace::new("Cairo Office");

    assert_eq!(client.create_workspace_in_slack(&workspace).await.unwrap(), "W1");
    assert_eq!(client.create_workspace_in_slack(&workspace).await.unwrap(), "W1");

    let creates = admin.calls_to("admin.teams.create");
    assert_eq!(creates.len(), 1);
    assert_eq!(
        creates[0],
        json!({"team_name": "Cairo Office", "team_domain": "cairo-office-misr"})
    );
}

#[tokio::test(start_paused = true)]
async fn long_domain_fails_before_create() {
    let (admin, scim) = fakes();
    admin.push_response("admin.teams.list", json!({"ok": true, "teams": []}));
    let client = fake_client(&admin, &scim);

    let err = client
        .create_workspace_in_slack(&Workspace::new("Training ABCDEFGHIJKLMNOP"))
        .await
        .unwrap_err();

    assert!(matches!(err, DirectoryError::DomainTooLong { .. }));
    assert!(admin.calls_to("admin.teams.create").is_empty());
    assert!(!client.debouncer().keys().contains(&"admin_teams_create".to_string()));
}

#[tokio::test(start_paused = true)]
async fn existence_check_widens_ambiguous_search() {
    let (admin, scim) = fakes();
    scim.add_user("Jane", "jane@example.com", true);
    scim.add_user("Jane Two", "jane@example.com", true);

    let client = fake_client(&admin, &scim);
    assert!(matches!(
        client.verify_user_not_exists_in_slack("jane@example.com").await,
        Err(DirectoryError::UserAlreadyExists(_))
    ));
    assert!(client
        .verify_user_not_exists_in_slack("nobody@example.com")
        .await
        .is_ok());

    let strict = fake_client_with_config(
        &admin,
        &scim,
        DirectoryConfig::new().with_multiple_match_policy(MultipleMatchPolicy::Propagate),
    );
    assert!(matches!(
        strict.verify_user_not_exists_in_slack("jane@example.com").await,
        Err(DirectoryError::MultipleUsersWithSameEmail(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn workspace_members_follow_cursor() {
    let (admin, scim) = fakes();
    admin.push_response(
        "users.list",
        json!({"ok": true, "members": [{"id": "U1"}, {"id": "U2"}],
               "response_metadata": {"next_cursor": "c2"}}),
    );
    admin.push_response(
        "users.list",
        json!({"ok": true, "members": [{"id": "U3"}],
               "response_metadata": {"next_cursor": ""}}),
    );
    let client = fake_client(&admin, &scim);
    let workspace = Workspace::new("HQ").with_slack_id("T1");

    let members = client.get_users_of_workspace(&workspace).await.unwrap();
    let ids: Vec<&str> = members.iter().filter_map(|m| m["id"].as_str()).collect();
    assert_eq!(ids, vec!["U1", "U2", "U3"]);

    let pages = admin.calls_to("users.list");
    assert_eq!(pages[0], json!({"team_id": "T1", "limit": 150}));
    assert_eq!(pages[1], json!({"team_id": "T1", "limit": 150, "cursor": "c2"}));
}

#[tokio::test(start_paused = true)]
async fn rejected_username_falls_back_to_email_local_part() {
    let (admin, scim) = fakes();
    scim.push_create_response(ScimResponse::new(
        400,
        json!({"Errors": {"code": 400, "description": "username_too_long too long"}}),
    ));
    let client = fake_client(&admin, &scim);
    let user = User::new("Mohamed Abdelrahman Elsayed Mahmoud", "mohamed.a@example.com");

    let id = client.upload_new_single_user(&user).await.unwrap();

    let stored = scim.user(&id).unwrap();
    assert_eq!(stored.user_name, "mohamed.a");
    assert_eq!(stored.display_name, "Mohamed Abdelrahman Elsayed Mahmoud");
    assert_eq!(
        scim.calls(),
        vec![
            "create Mohamed Abdelrahman Elsayed Mahmoud".to_string(),
            "create mohamed.a".to_string(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn channel_creation_and_linking() {
    let (admin, scim) = fakes();
    admin.push_response(
        "conversations.create",
        json!({"ok": true, "channel": {"id": "C9"}}),
    );
    let client = fake_client(&admin, &scim);
    let main = Workspace::new("HQ").with_slack_id("T1");
    let other = Workspace::new("Branch").with_slack_id("T2");
    let channel = Channel::new("Sales Team", "HQ").with_description("Sales chatter");

    let id = client.create_channel_in_slack(&channel, &main).await.unwrap();
    assert_eq!(id, "C9");
    assert_eq!(
        admin.calls_to("conversations.create")[0],
        json!({"name": "sales-team", "team_id": "T1", "is_private": false,
               "description": "Sales chatter"})
    );

    let channel = channel.with_slack_id(id);
    client
        .link_channel_to_additional_workspace(&channel, &[other], &main)
        .await
        .unwrap();
    assert_eq!(
        admin.calls_to("admin.conversations.setTeams")[0],
        json!({"channel_id": "C9", "target_team_ids": "T2", "team_id": "T1"})
    );
}

#[tokio::test(start_paused = true)]
async fn linking_requires_every_remote_id() {
    let (admin, scim) = fakes();
    let client = fake_client(&admin, &scim);
    let main = Workspace::new("HQ").with_slack_id("T1");
    let channel = Channel::new("general", "HQ").with_slack_id("C1");

    let err = client
        .link_channel_to_additional_workspace(&channel, &[Workspace::new("Branch")], &main)
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(admin.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn invite_resolves_new_account() {
    let (admin, scim) = fakes();
    let client = fake_client(&admin, &scim);

    // invited account shows up only after the invite
    let err = client
        .invite_new_user_to_workspace("new@example.com", "T1", &["C1".into(), "C2".into()], false, true)
        .await
        .unwrap_err();
    assert!(matches!(err, DirectoryError::NewUserNotFound(_)));
    assert_eq!(
        admin.calls_to("admin.users.invite")[0],
        json!({"team_id": "T1", "email": "new@example.com", "channel_ids": "C1,C2",
               "email_password_policy_enabled": false, "resend": true})
    );

    let id = scim.add_user("New", "new@example.com", true);
    let found = client
        .invite_new_user_to_workspace("new@example.com", "T1", &[], false, false)
        .await
        .unwrap();
    assert_eq!(found, id);
}

#[tokio::test(start_paused = true)]
async fn deactivate_then_reactivate() {
    let (admin, scim) = fakes();
    let id = scim.add_user("Jane", "jane@example.com", true);
    let client = fake_client(&admin, &scim);

    client
        .deactivate_user(&User::new("Jane", "jane@example.com").with_slack_id(id.clone()))
        .await
        .unwrap();
    assert!(!scim.user(&id).unwrap().active);
    assert_eq!(
        client.verify_deactivated_user_email("jane@example.com").await.unwrap(),
        Some(id.clone())
    );

    client.activate_user(&id).await.unwrap();
    assert!(scim.user(&id).unwrap().active);
    assert_eq!(
        client.debouncer().keys(),
        vec!["admin_users_delete", "patch_user", "scim_search_users"]
    );
}

#[tokio::test(start_paused = true)]
async fn repeated_calls_are_spaced_by_cooldown() {
    let (admin, scim) = fakes();
    let id = scim.add_user("Jane", "jane@example.com", true);
    let client = fake_client(&admin, &scim);

    let start = tokio::time::Instant::now();
    for i in 0..3 {
        client
            .update_photo(&id, &format!("https://img.example.com/{i}.png"))
            .await
            .unwrap();
    }

    // 3s window + 1s pad for each call after the first
    assert!(start.elapsed() >= Duration::from_secs(8));
    assert_eq!(
        scim.user(&id).unwrap().photo.as_deref(),
        Some("https://img.example.com/2.png")
    );
}

#[tokio::test(start_paused = true)]
async fn channel_made_private() {
    let (admin, scim) = fakes();
    let client = fake_client(&admin, &scim);

    client
        .make_channel_private(&Channel::new("general", "HQ").with_slack_id("C1"))
        .await
        .unwrap();
    assert_eq!(
        admin.calls(),
        vec![(
            "admin.conversations.convertToPrivate".to_string(),
            json!({"channel_id": "C1"})
        )]
    );

    admin.push_response(
        "admin.conversations.convertToPrivate",
        json!({"ok": false, "error": "channel_not_found"}),
    );
    let err = client
        .make_channel_private(&Channel::new("gone", "HQ").with_slack_id("C404"))
        .await
        .unwrap_err();
    assert!(matches!(err, DirectoryError::Api { ref error, .. } if error == "channel_not_found"));
}

#[tokio::test(start_paused = true)]
async fn private_channel_needs_remote_id() {
    let (admin, scim) = fakes();
    let client = fake_client(&admin, &scim);

    let err = client
        .make_channel_private(&Channel::new("general", "HQ"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DirectoryError::MissingRemoteId { kind: EntityKind::Channel, .. }
    ));
    assert!(admin.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn user_removed_from_workspace() {
    let (admin, scim) = fakes();
    let client = fake_client(&admin, &scim);
    let user = User::new("Jane", "jane@example.com").with_slack_id("U1");
    let workspace = Workspace::new("HQ").with_slack_id("T1");

    client.remove_user_from_workspace(&user, &workspace).await.unwrap();
    assert_eq!(
        admin.calls(),
        vec![(
            "admin.users.remove".to_string(),
            json!({"team_id": "T1", "user_id": "U1"})
        )]
    );
}

#[tokio::test(start_paused = true)]
async fn removal_needs_both_remote_ids() {
    let (admin, scim) = fakes();
    let client = fake_client(&admin, &scim);
    let user = User::new("Jane", "jane@example.com").with_slack_id("U1");
    let workspace = Workspace::new("HQ").with_slack_id("T1");

    let err = client
        .remove_user_from_workspace(&user, &Workspace::new("Branch"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DirectoryError::MissingRemoteId { kind: EntityKind::Workspace, .. }
    ));

    let err = client
        .remove_user_from_workspace(&User::new("Ghost", "ghost@example.com"), &workspace)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DirectoryError::MissingRemoteId { kind: EntityKind::User, .. }
    ));
    assert!(admin.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn user_invited_to_channel_of_same_workspace() {
    let (admin, scim) = fakes();
    let client = fake_client(&admin, &scim);

    client
        .invite_user_to_channel_of_same_workspace("U1", "C1")
        .await
        .unwrap();
    assert_eq!(
        admin.calls(),
        vec![(
            "admin.conversations.invite".to_string(),
            json!({"channel_id": "C1", "user_ids": "U1"})
        )]
    );

    admin.push_response(
        "admin.conversations.invite",
        json!({"ok": false, "error": "user_must_be_admin"}),
    );
    let err = client
        .invite_user_to_channel_of_same_workspace("U2", "C1")
        .await
        .unwrap_err();
    assert!(matches!(err, DirectoryError::Api { ref method, .. } if method == "admin.conversations.invite"));
}
