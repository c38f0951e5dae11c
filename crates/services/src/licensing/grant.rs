use std::sync::Arc;

use chrono::Utc;
use seatdesk_db::models::{
    Invitation, Licence, LicenceStatus, MemberSnapshot, Membership, Reader, SnapshotReason,
};
use serde::Serialize;
use tracing::info;

use super::error::{LicensingError, LicensingResult};
use super::invitation::ensure_acceptable;
use super::reconcile::{with_licence_granted, with_licence_revoked};
use super::settle;
use crate::concurrency::count_and_list;
use crate::dao::{PaginatedResult, PaginationParams, Store, StoreTx};

#[derive(Debug, Clone, Serialize)]
pub struct InvitationAccepted {
    pub licence: Licence,
    pub invitation: Invitation,
    pub reader: Reader,
    pub membership: Membership,
}

/// Turns accepted invitations into memberships and takes granted
/// licences back.
///
/// Every workflow locks rows in the same order (licence, invitation,
/// reader, membership) so two of them can never wait on each other.
#[derive(Clone)]
pub struct GrantWorkflow {
    store: Arc<dyn Store>,
}

impl GrantWorkflow {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn accept_invitation(&self, token: &str) -> LicensingResult<InvitationAccepted> {
        let mut tx = self.store.begin().await?;
        let outcome = accept_in_tx(tx.as_mut(), token).await;
        let accepted = settle(tx, outcome).await?;

        info!(
            licence_id = %accepted.licence.id,
            invitation_id = %accepted.invitation.id,
            ftc_id = %accepted.reader.ftc_id,
            "Licence granted"
        );
        Ok(accepted)
    }

    pub async fn revoke_granted_licence(
        &self,
        team_id: &str,
        licence_id: &str,
    ) -> LicensingResult<Licence> {
        let mut tx = self.store.begin().await?;
        let outcome = revoke_in_tx(tx.as_mut(), team_id, licence_id).await;
        let licence = settle(tx, outcome).await?;

        info!(licence_id, team_id, "Granted licence revoked");
        Ok(licence)
    }

    pub async fn licence(&self, team_id: &str, licence_id: &str) -> LicensingResult<Licence> {
        self.store
            .find_licence(licence_id, team_id)
            .await?
            .ok_or(LicensingError::NotFound("licence"))
    }

    pub async fn list_licences(
        &self,
        team_id: &str,
        params: PaginationParams,
    ) -> LicensingResult<PaginatedResult<Licence>> {
        let params = params.sanitized();
        let counter = Arc::clone(&self.store);
        let lister = Arc::clone(&self.store);
        let (count_team, list_team) = (team_id.to_string(), team_id.to_string());
        let list_params = params.clone();

        let page = count_and_list(
            async move { counter.count_licences(&count_team).await },
            async move { lister.list_licences(&list_team, &list_params).await },
            &params,
        )
        .await?;
        Ok(page)
    }

    pub async fn count_licences(&self, team_id: &str) -> LicensingResult<u64> {
        Ok(self.store.count_licences(team_id).await?)
    }
}

async fn accept_in_tx(tx: &mut dyn StoreTx, token: &str) -> LicensingResult<InvitationAccepted> {
    let invitation = tx
        .find_invitation_by_token(token)
        .await?
        .ok_or(LicensingError::NotFound("invitation"))?;
    ensure_acceptable(&invitation)?;

    let licence = tx
        .retrieve_licence(&invitation.licence_id, &invitation.team_id, true)
        .await
        .map_err(LicensingError::from_lock)?
        .ok_or(LicensingError::NotFound("licence"))?;
    if !licence.is_pending_invitation(&invitation.id, Utc::now().date_naive()) {
        return Err(LicensingError::LicenceUnavailable);
    }

    let invitation = tx
        .retrieve_invitation(&invitation.id, &invitation.team_id, true)
        .await
        .map_err(LicensingError::from_lock)?
        .ok_or(LicensingError::NotFound("invitation"))?;
    ensure_acceptable(&invitation)?;

    let reader = match tx.lock_reader_by_email(&invitation.email).await? {
        Some(reader) => reader,
        None => {
            let reader = Reader::new(invitation.email.clone());
            tx.save_reader(&reader).await?;
            reader
        }
    };
    let assignee = reader.assignee();

    let current = tx
        .lock_membership(&reader.ftc_id)
        .await?
        .unwrap_or_default();
    if !current.is_expired() {
        return Err(LicensingError::AlreadyMember);
    }

    let compound_id = current
        .compound_id
        .clone()
        .unwrap_or_else(|| reader.ftc_id.clone());
    tx.insert_snapshot(&MemberSnapshot::new(
        SnapshotReason::B2bGrant,
        compound_id,
        current.clone(),
    ))
    .await?;

    let membership = with_licence_granted(current, &licence, &assignee);
    tx.save_membership(&membership).await?;

    let licence = licence.granted(reader.ftc_id.clone());
    tx.save_licence(&licence).await?;
    let invitation = invitation.accepted();
    tx.save_invitation(&invitation).await?;

    Ok(InvitationAccepted {
        licence,
        invitation,
        reader,
        membership,
    })
}

async fn revoke_in_tx(
    tx: &mut dyn StoreTx,
    team_id: &str,
    licence_id: &str,
) -> LicensingResult<Licence> {
    let licence = tx
        .retrieve_licence(licence_id, team_id, true)
        .await
        .map_err(LicensingError::from_lock)?
        .ok_or(LicensingError::NotFound("licence"))?;
    if licence.status != LicenceStatus::Granted {
        return Err(LicensingError::LicenceUnavailable);
    }

    if let Some(assignee_id) = licence.assignee_id.as_deref() {
        let membership = tx.lock_membership(assignee_id).await?;
        // A membership since moved to another source is left alone.
        if let Some(m) = membership.filter(|m| m.b2b_licence_id.as_deref() == Some(&licence.id)) {
            let compound_id = m
                .compound_id
                .clone()
                .unwrap_or_else(|| assignee_id.to_string());
            tx.insert_snapshot(&MemberSnapshot::new(
                SnapshotReason::B2bRevoke,
                compound_id,
                m.clone(),
            ))
            .await?;
            tx.save_membership(&with_licence_revoked(m)).await?;
        }
    }

    let licence = licence.unlinked();
    tx.save_licence(&licence).await?;
    Ok(licence)
}
