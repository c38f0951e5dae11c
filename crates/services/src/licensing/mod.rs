pub mod error;
pub mod grant;
pub mod invitation;
pub mod order;
pub mod reconcile;

use std::sync::Arc;

use seatdesk_config::LicensingSettings;
use tracing::warn;

use crate::concurrency::WorkerPool;
use crate::dao::{Store, StoreTx};
use crate::notify::InvitationNotifier;

pub use error::{ErrorKind, LicensingError, LicensingResult};
pub use grant::{GrantWorkflow, InvitationAccepted};
pub use invitation::{InvitationCreated, InvitationEngine, InvitationVerified};
pub use order::{AppliedTransaction, FailedTransaction, OrderConfirmationPipeline, OrderReport};

/// Commits when `outcome` is a success, rolls back otherwise. The
/// outcome's own error wins over a failed rollback.
pub(crate) async fn settle<T>(
    mut tx: Box<dyn StoreTx>,
    outcome: LicensingResult<T>,
) -> LicensingResult<T> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "Rollback failed");
            }
            Err(e)
        }
    }
}

/// The three workflows wired to one store.
#[derive(Clone)]
pub struct Licensing {
    pub invitations: InvitationEngine,
    pub grants: GrantWorkflow,
    pub orders: OrderConfirmationPipeline,
}

impl Licensing {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn InvitationNotifier>,
        settings: &LicensingSettings,
    ) -> Self {
        let pool = Arc::new(WorkerPool::new(settings.max_workers));
        Self {
            invitations: InvitationEngine::new(
                Arc::clone(&store),
                notifier,
                settings.invitation_expiration_days,
                settings.site_base_url.clone(),
            ),
            grants: GrantWorkflow::new(Arc::clone(&store)),
            orders: OrderConfirmationPipeline::new(store, pool),
        }
    }
}
