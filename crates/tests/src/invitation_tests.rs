use crate::fixtures::test_app::TestApp;
use seatdesk_services::Store;

#[tokio::test]
async fn create_invitation_marks_licence_invited_and_sends_letter() {
    let app = TestApp::spawn().await;
    let team = app.seed_team("acme", 2).await;
    let licence_id = &team.licence_ids[0];

    let resp = app
        .auth_post("/api/invitation", &team.token)
        .json(&serde_json::json!({
            "licence_id": licence_id,
            "email": "  Reader@Example.com ",
            "description": "Design team seat",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["invitation"]["email"], "reader@example.com");
    assert_eq!(body["invitation"]["status"], "created");
    assert_eq!(body["licence"]["status"], "invited");
    assert_eq!(body["licence"]["last_invitee_email"], "reader@example.com");
    assert!(body["invitation"].get("token").is_none(), "token must not leak to the admin");

    let letter = app.outbox.last_for("reader@example.com").unwrap();
    assert!(
        letter
            .accept_url
            .starts_with("https://seatdesk.test/corporate/verify-invitation/")
    );
    assert!(letter.accept_url.ends_with(&letter.invitation.token));
}

#[tokio::test]
async fn invitation_flow_grants_licence() {
    let app = TestApp::spawn().await;
    let team = app.seed_team("acme", 1).await;
    let licence_id = &team.licence_ids[0];
    let token = app.invite(&team, licence_id, "reader@example.com").await;

    // Verify (public)
    let resp = app
        .client
        .get(app.url(&format!("/api/invitation/verify/{}", token)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let verified: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(verified["licence"]["id"], licence_id.as_str());
    assert_eq!(verified["assignee"]["email"], "reader@example.com");
    assert!(verified["membership"].is_null());

    // Accept (public)
    let resp = app
        .client
        .post(app.url("/api/invitation/accept"))
        .json(&serde_json::json!({ "token": token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let accepted: serde_json::Value = resp.json().await.unwrap();
    let ftc_id = accepted["ftc_id"].as_str().unwrap().to_string();
    assert_eq!(accepted["invitation"]["status"], "accepted");
    assert_eq!(accepted["licence"]["status"], "granted");
    assert_eq!(accepted["licence"]["assignee_id"], ftc_id.as_str());
    assert_eq!(accepted["membership"]["b2b_licence_id"], licence_id.as_str());
    assert_eq!(accepted["membership"]["pay_method"], "b2b");
    assert_eq!(accepted["membership"]["tier"], "standard");

    // The admin sees the licence as granted
    let resp = app
        .auth_get(&format!("/api/licence/{}", licence_id), &team.token)
        .send()
        .await
        .unwrap();
    let licence: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(licence["status"], "granted");

    // One snapshot of the empty membership was archived before the grant
    let snapshots = app.store.list_snapshots(&ftc_id).await.unwrap();
    assert_eq!(snapshots.len(), 1);
}

#[tokio::test]
async fn accepting_twice_is_rejected() {
    let app = TestApp::spawn().await;
    let team = app.seed_team("acme", 1).await;
    let token = app.invite(&team, &team.licence_ids[0], "reader@example.com").await;

    let accept = || {
        app.client
            .post(app.url("/api/invitation/accept"))
            .json(&serde_json::json!({ "token": token }))
            .send()
    };

    assert_eq!(accept().await.unwrap().status(), 200);

    let resp = accept().await.unwrap();
    assert_eq!(resp.status(), 409);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "already_used");
}

#[tokio::test]
async fn concurrent_accepts_grant_once() {
    let app = TestApp::spawn().await;
    let team = app.seed_team("acme", 1).await;
    let token = app.invite(&team, &team.licence_ids[0], "reader@example.com").await;

    let requests = (0..5).map(|_| {
        app.client
            .post(app.url("/api/invitation/accept"))
            .json(&serde_json::json!({ "token": token }))
            .send()
    });
    let statuses: Vec<u16> = futures::future::join_all(requests)
        .await
        .into_iter()
        .map(|r| r.unwrap().status().as_u16())
        .collect();

    assert_eq!(statuses.iter().filter(|s| **s == 200).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == 409).count(), 4);
}

#[tokio::test]
async fn expired_invitation_is_gone() {
    let app = TestApp::spawn_with_settings(|s| {
        s.licensing.invitation_expiration_days = 0;
    })
    .await;
    let team = app.seed_team("acme", 1).await;
    let token = app.invite(&team, &team.licence_ids[0], "reader@example.com").await;

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let resp = app
        .client
        .get(app.url(&format!("/api/invitation/verify/{}", token)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 410);

    let resp = app
        .client
        .post(app.url("/api/invitation/accept"))
        .json(&serde_json::json!({ "token": token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 410);
}

#[tokio::test]
async fn revoked_invitation_frees_the_licence() {
    let app = TestApp::spawn().await;
    let team = app.seed_team("acme", 1).await;
    let licence_id = &team.licence_ids[0];
    let token = app.invite(&team, licence_id, "first@example.com").await;

    let invitation = app
        .store
        .find_invitation_by_token(&token)
        .await
        .unwrap()
        .unwrap();

    let resp = app
        .auth_delete(&format!("/api/invitation/{}", invitation.id), &team.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "revoked");

    // Revoking again conflicts
    let resp = app
        .auth_delete(&format!("/api/invitation/{}", invitation.id), &team.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // The old token no longer works
    let resp = app
        .client
        .post(app.url("/api/invitation/accept"))
        .json(&serde_json::json!({ "token": token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // And the licence can go to someone else
    let second = app.invite(&team, licence_id, "second@example.com").await;
    let resp = app
        .client
        .post(app.url("/api/invitation/accept"))
        .json(&serde_json::json!({ "token": second }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn second_invitation_on_invited_licence_conflicts() {
    let app = TestApp::spawn().await;
    let team = app.seed_team("acme", 1).await;
    let licence_id = &team.licence_ids[0];
    app.invite(&team, licence_id, "first@example.com").await;

    let resp = app
        .auth_post("/api/invitation", &team.token)
        .json(&serde_json::json!({
            "licence_id": licence_id,
            "email": "second@example.com",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "licence_unavailable");
    assert_eq!(app.outbox.len(), 1);
}

#[tokio::test]
async fn inviting_an_active_member_conflicts() {
    let app = TestApp::spawn().await;
    let team = app.seed_team("acme", 2).await;
    let token = app.invite(&team, &team.licence_ids[0], "reader@example.com").await;
    let resp = app
        .client
        .post(app.url("/api/invitation/accept"))
        .json(&serde_json::json!({ "token": token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .auth_post("/api/invitation", &team.token)
        .json(&serde_json::json!({
            "licence_id": team.licence_ids[1],
            "email": "READER@example.com",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "already_member");
}

#[tokio::test]
async fn invalid_email_is_rejected() {
    let app = TestApp::spawn().await;
    let team = app.seed_team("acme", 1).await;

    let resp = app
        .auth_post("/api/invitation", &team.token)
        .json(&serde_json::json!({
            "licence_id": team.licence_ids[0],
            "email": "not-an-email",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
    assert_eq!(app.outbox.len(), 0);
}

#[tokio::test]
async fn admin_routes_require_a_token() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .get(app.url("/api/invitation"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = app
        .auth_get("/api/invitation", "garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn unknown_token_is_not_found() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .get(app.url("/api/invitation/verify/no-such-token"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = app
        .client
        .post(app.url("/api/invitation/accept"))
        .json(&serde_json::json!({ "token": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
}

#[tokio::test]
async fn list_invitations_paginates() {
    let app = TestApp::spawn().await;
    let team = app.seed_team("acme", 3).await;
    for (i, licence_id) in team.licence_ids.iter().enumerate() {
        app.invite(&team, licence_id, &format!("reader{}@example.com", i))
            .await;
    }

    let resp = app
        .auth_get("/api/invitation?page=1&per_page=2", &team.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let page: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(page["total"], 3);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["total_pages"], 2);
}
