use async_trait::async_trait;
use seatdesk_db::models::{Assignee, Invitation, Licence};
use serde::Serialize;
use tracing::info;

/// Everything needed to write the invitation email.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationLetter {
    pub invitation: Invitation,
    pub licence: Licence,
    pub assignee: Assignee,
    pub accept_url: String,
}

impl InvitationLetter {
    pub fn new(
        invitation: Invitation,
        licence: Licence,
        assignee: Assignee,
        site_base_url: &str,
    ) -> Self {
        let accept_url = accept_url(site_base_url, &invitation.token);
        Self {
            invitation,
            licence,
            assignee,
            accept_url,
        }
    }
}

pub fn accept_url(site_base_url: &str, token: &str) -> String {
    format!(
        "{}/corporate/verify-invitation/{}",
        site_base_url.trim_end_matches('/'),
        token
    )
}

#[async_trait]
pub trait InvitationNotifier: Send + Sync {
    async fn send(&self, letter: &InvitationLetter) -> anyhow::Result<()>;
}

/// Writes the letter to the log instead of mailing it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl InvitationNotifier for LogNotifier {
    async fn send(&self, letter: &InvitationLetter) -> anyhow::Result<()> {
        info!(
            to = %letter.invitation.email,
            registered = letter.assignee.is_registered(),
            licence_id = %letter.licence.id,
            tier = ?letter.licence.plan.tier,
            expires_at = %letter.invitation.expires_at(),
            accept_url = %letter.accept_url,
            "Invitation letter"
        );
        Ok(())
    }
}
