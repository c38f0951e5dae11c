use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use seatdesk_db::models::{
    Licence, LicenceStatus, LicenceTransaction, MemberSnapshot, PaymentConfirmedEvent,
    ProcessedTransaction, SnapshotReason, TransactionKind,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::{LicensingError, LicensingResult};
use super::reconcile::with_licence_renewed;
use super::settle;
use crate::concurrency::WorkerPool;
use crate::dao::{Store, StoreTx};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppliedTransaction {
    pub transaction_id: String,
    pub licence_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailedTransaction {
    pub transaction_id: String,
    pub reason: String,
}

/// Per-unit outcome of one order confirmation. Units that succeeded
/// stay written even when others failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReport {
    pub order_id: String,
    pub succeeded: Vec<AppliedTransaction>,
    pub failed: Vec<FailedTransaction>,
}

impl OrderReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

struct OrderContext {
    order_id: String,
    team_id: String,
    approved_by: String,
    approved_at: DateTime<Utc>,
}

/// Builds or extends one licence per purchased unit once an order's
/// payment is confirmed. Units run on the shared [`WorkerPool`], each in
/// its own transaction.
#[derive(Clone)]
pub struct OrderConfirmationPipeline {
    store: Arc<dyn Store>,
    pool: Arc<WorkerPool>,
}

impl OrderConfirmationPipeline {
    pub fn new(store: Arc<dyn Store>, pool: Arc<WorkerPool>) -> Self {
        Self { store, pool }
    }

    pub async fn confirm_order(&self, event: PaymentConfirmedEvent) -> OrderReport {
        let ctx = Arc::new(OrderContext {
            order_id: event.order_id,
            team_id: event.team_id,
            approved_by: event.approved_by,
            approved_at: event.approved_at,
        });
        let submitted: Vec<String> = event
            .transactions
            .iter()
            .map(|t| t.transaction_id.clone())
            .collect();

        info!(
            order_id = %ctx.order_id,
            units = submitted.len(),
            workers = self.pool.size(),
            "Confirming order"
        );

        let store = Arc::clone(&self.store);
        let unit_ctx = Arc::clone(&ctx);
        let outcomes = self
            .pool
            .run_all(event.transactions, move |txn: LicenceTransaction| {
                let store = Arc::clone(&store);
                let ctx = Arc::clone(&unit_ctx);
                async move {
                    let id = txn.transaction_id.clone();
                    (id, build_unit(store.as_ref(), &ctx, txn).await)
                }
            })
            .await;

        let mut report = OrderReport {
            order_id: ctx.order_id.clone(),
            succeeded: Vec::new(),
            failed: Vec::new(),
        };
        let mut reported = HashSet::new();
        for (transaction_id, outcome) in outcomes {
            reported.insert(transaction_id.clone());
            match outcome {
                Ok(licence_id) => {
                    info!(%transaction_id, %licence_id, "Order unit applied");
                    report.succeeded.push(AppliedTransaction {
                        transaction_id,
                        licence_id,
                    });
                }
                Err(e) => {
                    warn!(%transaction_id, error = %e, "Order unit failed");
                    report.failed.push(FailedTransaction {
                        transaction_id,
                        reason: e.to_string(),
                    });
                }
            }
        }
        for transaction_id in submitted {
            if !reported.contains(&transaction_id) {
                report.failed.push(FailedTransaction {
                    transaction_id,
                    reason: "worker aborted".into(),
                });
            }
        }

        info!(
            order_id = %report.order_id,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Order confirmation finished"
        );
        report
    }
}

async fn build_unit(
    store: &dyn Store,
    ctx: &OrderContext,
    txn: LicenceTransaction,
) -> LicensingResult<String> {
    let mut tx = store.begin().await?;
    let outcome = apply_unit(tx.as_mut(), ctx, &txn).await;
    settle(tx, outcome).await
}

async fn apply_unit(
    tx: &mut dyn StoreTx,
    ctx: &OrderContext,
    txn: &LicenceTransaction,
) -> LicensingResult<String> {
    if let Some(done) = tx.find_processed_transaction(&txn.transaction_id).await? {
        return Ok(done.licence_id);
    }

    let price = tx
        .find_price(&txn.price_id)
        .await?
        .ok_or(LicensingError::NotFound("price"))?;
    let approved_on = ctx.approved_at.date_naive();

    let licence = match txn.kind {
        TransactionKind::New => Licence::new(
            ctx.team_id.clone(),
            price.plan(),
            price.cycle.extend(approved_on),
            Some(ctx.order_id.clone()),
            Some(ctx.approved_by.clone()),
        ),
        TransactionKind::Renewal => {
            let target = txn
                .target_licence_id
                .as_deref()
                .ok_or(LicensingError::NotFound("renewal target"))?;
            let current = tx
                .retrieve_licence(target, &ctx.team_id, true)
                .await
                .map_err(LicensingError::from_lock)?
                .ok_or(LicensingError::NotFound("licence"))?;

            let from = current.expire_date.max(approved_on);
            let renewed = current.renewed(price.plan(), price.cycle.extend(from));
            if renewed.status == LicenceStatus::Granted {
                extend_membership(tx, &renewed).await?;
            }
            renewed
        }
    };

    tx.save_licence(&licence).await?;
    tx.record_transaction(&ProcessedTransaction {
        transaction_id: txn.transaction_id.clone(),
        order_id: ctx.order_id.clone(),
        licence_id: licence.id.clone(),
        kind: txn.kind,
        applied_at: Utc::now(),
    })
    .await?;

    Ok(licence.id)
}

async fn extend_membership(tx: &mut dyn StoreTx, licence: &Licence) -> LicensingResult<()> {
    let Some(assignee_id) = licence.assignee_id.as_deref() else {
        return Ok(());
    };
    let Some(m) = tx.lock_membership(assignee_id).await? else {
        return Ok(());
    };
    if m.b2b_licence_id.as_deref() != Some(&licence.id) {
        return Ok(());
    }

    let compound_id = m
        .compound_id
        .clone()
        .unwrap_or_else(|| assignee_id.to_string());
    tx.insert_snapshot(&MemberSnapshot::new(
        SnapshotReason::B2bRenewal,
        compound_id,
        m.clone(),
    ))
    .await?;
    tx.save_membership(&with_licence_renewed(m, licence)).await?;
    Ok(())
}
