use std::sync::Arc;

use chrono::Utc;
use seatdesk_db::models::{Assignee, Invitation, Licence, LicenceStatus, Membership, Plan};
use serde::Serialize;
use tracing::{info, warn};

use super::error::{LicensingError, LicensingResult};
use super::settle;
use crate::concurrency::count_and_list;
use crate::dao::{PaginatedResult, PaginationParams, Store, StoreTx};
use crate::notify::{InvitationLetter, InvitationNotifier};

#[derive(Debug, Clone, Serialize)]
pub struct InvitationCreated {
    pub invitation: Invitation,
    pub licence: Licence,
    pub plan: Plan,
    pub assignee: Assignee,
}

/// What the acceptance page shows before the invitee confirms.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationVerified {
    pub invitation: Invitation,
    pub licence: Licence,
    pub assignee: Assignee,
    pub membership: Option<Membership>,
}

/// Admin-side invitation lifecycle: offering a licence to an email and
/// withdrawing the offer.
#[derive(Clone)]
pub struct InvitationEngine {
    store: Arc<dyn Store>,
    notifier: Arc<dyn InvitationNotifier>,
    expiration_days: i64,
    site_base_url: String,
}

impl InvitationEngine {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn InvitationNotifier>,
        expiration_days: i64,
        site_base_url: String,
    ) -> Self {
        Self {
            store,
            notifier,
            expiration_days,
            site_base_url,
        }
    }

    pub async fn create_invitation(
        &self,
        team_id: &str,
        admin_id: &str,
        licence_id: &str,
        email: &str,
        description: Option<String>,
    ) -> LicensingResult<InvitationCreated> {
        let email = email.trim().to_ascii_lowercase();

        let mut tx = self.store.begin().await?;
        let outcome = self
            .create_in_tx(tx.as_mut(), team_id, admin_id, licence_id, &email, description)
            .await;
        let (invitation, licence, assignee) = settle(tx, outcome).await?;

        info!(
            invitation_id = %invitation.id,
            licence_id = %licence.id,
            team_id,
            "Invitation created"
        );

        let letter = InvitationLetter::new(
            invitation.clone(),
            licence.clone(),
            assignee.clone(),
            &self.site_base_url,
        );
        if let Err(e) = self.notifier.send(&letter).await {
            warn!(invitation_id = %invitation.id, error = %e, "Failed to send invitation letter");
        }

        Ok(InvitationCreated {
            plan: licence.plan.clone(),
            invitation,
            licence,
            assignee,
        })
    }

    async fn create_in_tx(
        &self,
        tx: &mut dyn StoreTx,
        team_id: &str,
        admin_id: &str,
        licence_id: &str,
        email: &str,
        description: Option<String>,
    ) -> LicensingResult<(Invitation, Licence, Assignee)> {
        let licence = tx
            .retrieve_licence(licence_id, team_id, true)
            .await
            .map_err(LicensingError::from_lock)?
            .ok_or(LicensingError::NotFound("licence"))?;

        if licence.effective_status(Utc::now().date_naive()) != LicenceStatus::Available {
            return Err(LicensingError::LicenceUnavailable);
        }
        if licence
            .last_invitee_email
            .as_deref()
            .is_some_and(|previous| !previous.eq_ignore_ascii_case(email))
        {
            return Err(LicensingError::InviteeMismatch);
        }

        // Plain reads: acceptance repeats the membership check under lock.
        let assignee = match self.store.find_reader_by_email(email).await? {
            Some(reader) => {
                let membership = self.store.find_membership(&reader.ftc_id).await?;
                if membership.is_some_and(|m| !m.is_expired()) {
                    return Err(LicensingError::AlreadyMember);
                }
                reader.assignee()
            }
            None => Assignee::unregistered(email.to_string()),
        };

        let invitation = Invitation::new(
            licence.id.clone(),
            team_id.to_string(),
            admin_id.to_string(),
            email.to_string(),
            description,
            self.expiration_days,
        );
        let licence = licence.invited(&invitation);

        tx.save_invitation(&invitation).await?;
        tx.save_licence(&licence).await?;
        Ok((invitation, licence, assignee))
    }

    pub async fn revoke_invitation(
        &self,
        team_id: &str,
        invitation_id: &str,
    ) -> LicensingResult<Invitation> {
        let mut tx = self.store.begin().await?;
        let outcome = revoke_in_tx(tx.as_mut(), team_id, invitation_id).await;
        let invitation = settle(tx, outcome).await?;

        info!(invitation_id, team_id, "Invitation revoked");
        Ok(invitation)
    }

    /// Read-only preview of what accepting `token` would grant. Fails
    /// the same way acceptance would.
    pub async fn verify_invitation(&self, token: &str) -> LicensingResult<InvitationVerified> {
        let invitation = self
            .store
            .find_invitation_by_token(token)
            .await?
            .ok_or(LicensingError::NotFound("invitation"))?;
        ensure_acceptable(&invitation)?;

        let licence = self
            .store
            .find_licence(&invitation.licence_id, &invitation.team_id)
            .await?
            .ok_or(LicensingError::NotFound("licence"))?;
        if !licence.is_pending_invitation(&invitation.id, Utc::now().date_naive()) {
            return Err(LicensingError::LicenceUnavailable);
        }

        let (assignee, membership) =
            match self.store.find_reader_by_email(&invitation.email).await? {
                Some(reader) => {
                    let membership = self.store.find_membership(&reader.ftc_id).await?;
                    (reader.assignee(), membership)
                }
                None => (Assignee::unregistered(invitation.email.clone()), None),
            };
        if membership.as_ref().is_some_and(|m| !m.is_expired()) {
            return Err(LicensingError::AlreadyMember);
        }

        Ok(InvitationVerified {
            invitation,
            licence,
            assignee,
            membership,
        })
    }

    pub async fn list_invitations(
        &self,
        team_id: &str,
        params: PaginationParams,
    ) -> LicensingResult<PaginatedResult<Invitation>> {
        let params = params.sanitized();
        let counter = Arc::clone(&self.store);
        let lister = Arc::clone(&self.store);
        let (count_team, list_team) = (team_id.to_string(), team_id.to_string());
        let list_params = params.clone();

        let page = count_and_list(
            async move { counter.count_invitations(&count_team).await },
            async move { lister.list_invitations(&list_team, &list_params).await },
            &params,
        )
        .await?;
        Ok(page)
    }

    pub async fn count_invitations(&self, team_id: &str) -> LicensingResult<u64> {
        Ok(self.store.count_invitations(team_id).await?)
    }
}

async fn revoke_in_tx(
    tx: &mut dyn StoreTx,
    team_id: &str,
    invitation_id: &str,
) -> LicensingResult<Invitation> {
    let invitation = tx
        .retrieve_invitation(invitation_id, team_id, false)
        .await?
        .ok_or(LicensingError::NotFound("invitation"))?;
    if !invitation.is_revocable() {
        return Err(LicensingError::AlreadyUsed);
    }

    // Licence before invitation, matching acceptance.
    let licence = tx
        .retrieve_licence(&invitation.licence_id, team_id, true)
        .await
        .map_err(LicensingError::from_lock)?;

    let invitation = tx
        .retrieve_invitation(invitation_id, team_id, true)
        .await
        .map_err(LicensingError::from_lock)?
        .ok_or(LicensingError::NotFound("invitation"))?;
    if !invitation.is_revocable() {
        return Err(LicensingError::AlreadyUsed);
    }

    let invitation = invitation.revoked();
    tx.save_invitation(&invitation).await?;

    match licence {
        Some(licence) if licence.can_invitation_be_revoked(&invitation.id) => {
            tx.save_licence(&licence.unlinked()).await?;
        }
        Some(_) => {}
        None => warn!(
            licence_id = %invitation.licence_id,
            "Licence of revoked invitation no longer exists"
        ),
    }

    Ok(invitation)
}

pub(crate) fn ensure_acceptable(invitation: &Invitation) -> LicensingResult<()> {
    if invitation.status.is_terminal() {
        return Err(LicensingError::AlreadyUsed);
    }
    if invitation.is_expired() {
        return Err(LicensingError::Expired);
    }
    Ok(())
}
