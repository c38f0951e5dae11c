use crate::fixtures::test_app::TestApp;
use seatdesk_services::Store;

async fn accept(app: &TestApp, token: &str) -> serde_json::Value {
    let resp = app
        .client
        .post(app.url("/api/invitation/accept"))
        .json(&serde_json::json!({ "token": token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn list_licences_for_team() {
    let app = TestApp::spawn().await;
    let team = app.seed_team("acme", 5).await;

    let resp = app
        .auth_get("/api/licence?page=2&per_page=2", &team.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let page: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(page["total"], 5);
    assert_eq!(page["page"], 2);
    assert_eq!(page["total_pages"], 3);
    let items = page["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|l| l["status"] == "available"));
    assert!(items.iter().all(|l| l["plan"]["tier"] == "standard"));
}

#[tokio::test]
async fn get_unknown_licence_is_not_found() {
    let app = TestApp::spawn().await;
    let team = app.seed_team("acme", 1).await;

    let resp = app
        .auth_get("/api/licence/lic_missing", &team.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn revoke_granted_licence_clears_membership() {
    let app = TestApp::spawn().await;
    let team = app.seed_team("acme", 1).await;
    let licence_id = &team.licence_ids[0];

    let token = app.invite(&team, licence_id, "reader@example.com").await;
    let accepted = accept(&app, &token).await;
    let ftc_id = accepted["ftc_id"].as_str().unwrap().to_string();

    let resp = app
        .auth_post(&format!("/api/licence/{}/revoke", licence_id), &team.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let licence: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(licence["status"], "available");
    assert!(licence["assignee_id"].is_null());
    assert!(licence["last_invitee_email"].is_null());

    let membership = app.store.find_membership(&ftc_id).await.unwrap().unwrap();
    assert_eq!(membership.b2b_licence_id, None);
    assert_eq!(membership.tier, None);
    assert_eq!(membership.legacy_tier, Some(0));
    // Grant and revoke each archived the membership first
    assert_eq!(app.store.list_snapshots(&ftc_id).await.unwrap().len(), 2);

    // The reader's identity survives so they can be invited again
    let token = app.invite(&team, licence_id, "reader@example.com").await;
    let again = accept(&app, &token).await;
    assert_eq!(again["ftc_id"], ftc_id.as_str());
    assert_eq!(again["licence"]["status"], "granted");
}

#[tokio::test]
async fn revoking_an_ungranted_licence_conflicts() {
    let app = TestApp::spawn().await;
    let team = app.seed_team("acme", 1).await;

    let resp = app
        .auth_post(
            &format!("/api/licence/{}/revoke", team.licence_ids[0]),
            &team.token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "licence_unavailable");
}
