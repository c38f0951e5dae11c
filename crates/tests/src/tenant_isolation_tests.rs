use seatdesk_db::models::{LicenceTransaction, TransactionKind};
use seatdesk_services::Store;

use crate::fixtures::{seed::STANDARD_MONTHLY, test_app::TestApp};

#[tokio::test]
async fn teams_only_see_their_own_licences() {
    let app = TestApp::spawn().await;
    let acme = app.seed_team("acme", 2).await;
    let globex = app.seed_team("globex", 3).await;

    let page: serde_json::Value = app
        .auth_get("/api/licence", &acme.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 2);
    assert!(
        page["items"]
            .as_array()
            .unwrap()
            .iter()
            .all(|l| l["team_id"] == acme.team_id.as_str())
    );

    let resp = app
        .auth_get(&format!("/api/licence/{}", globex.licence_ids[0]), &acme.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn cannot_invite_onto_another_teams_licence() {
    let app = TestApp::spawn().await;
    let acme = app.seed_team("acme", 1).await;
    let globex = app.seed_team("globex", 1).await;

    let resp = app
        .auth_post("/api/invitation", &acme.token)
        .json(&serde_json::json!({
            "licence_id": globex.licence_ids[0],
            "email": "reader@example.com",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(app.outbox.len(), 0);
}

#[tokio::test]
async fn cannot_revoke_another_teams_invitation_or_licence() {
    let app = TestApp::spawn().await;
    let acme = app.seed_team("acme", 1).await;
    let globex = app.seed_team("globex", 1).await;

    let token = app
        .invite(&globex, &globex.licence_ids[0], "reader@example.com")
        .await;
    let invitation = app
        .store
        .find_invitation_by_token(&token)
        .await
        .unwrap()
        .unwrap();

    let resp = app
        .auth_delete(&format!("/api/invitation/{}", invitation.id), &acme.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = app
        .auth_post(
            &format!("/api/licence/{}/revoke", globex.licence_ids[0]),
            &acme.token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Untouched on the owning side
    let page: serde_json::Value = app
        .auth_get("/api/invitation", &globex.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["items"][0]["status"], "created");
}

#[tokio::test]
async fn cannot_renew_another_teams_licence() {
    let app = TestApp::spawn().await;
    let acme = app.seed_team("acme", 1).await;
    let globex = app.seed_team("globex", 1).await;

    let event = app.order_event(
        &acme.team_id,
        "order_hijack",
        vec![LicenceTransaction {
            transaction_id: "order_hijack-0".to_string(),
            kind: TransactionKind::Renewal,
            price_id: STANDARD_MONTHLY.to_string(),
            target_licence_id: Some(globex.licence_ids[0].clone()),
        }],
    );
    let resp = app.confirm_order(&event).await;
    assert_eq!(resp.status(), 207);
}
