use chrono::Utc;
use seatdesk_db::models::{
    Cycle, LicenceTransaction, PaymentConfirmedEvent, Price, Tier, TransactionKind,
};
use seatdesk_services::Store;

use super::test_app::{TEST_CMS_KEY, TestApp};

pub const STANDARD_MONTHLY: &str = "price_standard_month";
pub const PREMIUM_YEARLY: &str = "price_premium_year";

/// A team with an admin token and a handful of purchased licences.
pub struct SeededTeam {
    pub team_id: String,
    pub admin_id: String,
    pub token: String,
    pub licence_ids: Vec<String>,
}

impl TestApp {
    pub async fn seed_prices(&self) {
        for (id, tier, cycle, unit_amount) in [
            (STANDARD_MONTHLY, Tier::Standard, Cycle::Month, 3_900),
            (PREMIUM_YEARLY, Tier::Premium, Cycle::Year, 39_900),
        ] {
            let price = Price {
                id: id.to_string(),
                tier,
                cycle,
                unit_amount,
                live: false,
            };
            self.store
                .save_price(&price)
                .await
                .expect("Failed to seed price");
        }
    }

    pub fn order_event(
        &self,
        team_id: &str,
        order_id: &str,
        transactions: Vec<LicenceTransaction>,
    ) -> PaymentConfirmedEvent {
        PaymentConfirmedEvent {
            order_id: order_id.to_string(),
            team_id: team_id.to_string(),
            approved_by: "cms-operator".to_string(),
            approved_at: Utc::now(),
            transactions,
        }
    }

    pub fn new_units(&self, order_id: &str, count: usize, price_id: &str) -> Vec<LicenceTransaction> {
        (0..count)
            .map(|i| LicenceTransaction {
                transaction_id: format!("{}-txn-{}", order_id, i),
                kind: TransactionKind::New,
                price_id: price_id.to_string(),
                target_licence_id: None,
            })
            .collect()
    }

    pub async fn confirm_order(&self, event: &PaymentConfirmedEvent) -> reqwest::Response {
        self.client
            .post(self.url("/api/order/confirm"))
            .header("x-cms-key", TEST_CMS_KEY)
            .json(event)
            .send()
            .await
            .expect("Order confirmation request failed")
    }

    /// Seed a team whose order for `count` standard licences has been confirmed.
    pub async fn seed_team(&self, slug: &str, count: usize) -> SeededTeam {
        self.seed_prices().await;

        let team_id = format!("team_{}", slug);
        let admin_id = format!("admin_{}", slug);
        let order_id = format!("order_{}", slug);

        let event = self.order_event(
            &team_id,
            &order_id,
            self.new_units(&order_id, count, STANDARD_MONTHLY),
        );
        let resp = self.confirm_order(&event).await;
        assert_eq!(resp.status(), 200, "Seeding order for {} failed", slug);

        let report: serde_json::Value = resp.json().await.unwrap();
        let licence_ids = report["succeeded"]
            .as_array()
            .expect("succeeded should be an array")
            .iter()
            .map(|v| v["licence_id"].as_str().unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(licence_ids.len(), count);

        SeededTeam {
            token: self.admin_token(&admin_id, &team_id),
            team_id,
            admin_id,
            licence_ids,
        }
    }

    /// Invite `email` onto a licence and return the token from the sent letter.
    pub async fn invite(&self, team: &SeededTeam, licence_id: &str, email: &str) -> String {
        let resp = self
            .auth_post("/api/invitation", &team.token)
            .json(&serde_json::json!({
                "licence_id": licence_id,
                "email": email,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201, "Invitation for {} failed", email);

        self.outbox
            .last_for(email)
            .expect("Invitation letter should have been sent")
            .invitation
            .token
    }

    pub fn auth_get(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub fn auth_post(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub fn auth_delete(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }
}
