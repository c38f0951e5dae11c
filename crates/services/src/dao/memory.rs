//! In-process backend with the same locking semantics as the MongoDB one.
//!
//! Rows locked by a transaction stay locked until it commits or rolls
//! back; a competing transaction waits on the lock and then reads the
//! committed state. Writes are buffered in the transaction and applied
//! in one step on commit, so nothing partial is ever observable.
//!
//! Single process only: suitable for development and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use seatdesk_db::models::{
    Invitation, Licence, MemberSnapshot, Membership, Price, ProcessedTransaction, Reader,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use super::base::{DaoError, DaoResult, PaginationParams};
use super::store::{Store, StoreTx};
use crate::licensing::reconcile::normalize;

#[derive(Debug, Default, Clone)]
struct Tables {
    licences: HashMap<String, Licence>,
    invitations: HashMap<String, Invitation>,
    readers: HashMap<String, Reader>,
    memberships: HashMap<String, Membership>,
    snapshots: Vec<MemberSnapshot>,
    prices: HashMap<String, Price>,
    processed: HashMap<String, ProcessedTransaction>,
}

impl Tables {
    fn membership(&self, id: &str) -> Option<Membership> {
        self.memberships
            .values()
            .find(|m| m.is_identified_by(id))
            .cloned()
    }

    fn reader_by_email(&self, email: &str) -> Option<Reader> {
        self.readers
            .values()
            .find(|r| r.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    fn invitation_by_token(&self, token: &str) -> Option<Invitation> {
        self.invitations
            .values()
            .find(|i| i.token == token)
            .cloned()
    }

    fn merge(&mut self, other: Tables) {
        self.licences.extend(other.licences);
        self.invitations.extend(other.invitations);
        self.readers.extend(other.readers);
        self.memberships.extend(other.memberships);
        self.snapshots.extend(other.snapshots);
        self.prices.extend(other.prices);
        self.processed.extend(other.processed);
    }
}

type LockTable = DashMap<String, Arc<Mutex<()>>>;

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    locks: Arc<LockTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of snapshots ever written, across all identities.
    pub fn snapshot_count(&self) -> usize {
        self.tables.read().snapshots.len()
    }
}

fn page_of<T: Clone>(
    mut rows: Vec<T>,
    created_at: impl Fn(&T) -> chrono::DateTime<chrono::Utc>,
    page: &PaginationParams,
) -> Vec<T> {
    rows.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    rows.into_iter()
        .skip(page.skip() as usize)
        .take(page.per_page as usize)
        .collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> DaoResult<Box<dyn StoreTx>> {
        Ok(Box::new(MemoryTx {
            tables: Arc::clone(&self.tables),
            locks: Arc::clone(&self.locks),
            guards: HashMap::new(),
            pending: Tables::default(),
            open: true,
        }))
    }

    async fn find_licence(&self, id: &str, team_id: &str) -> DaoResult<Option<Licence>> {
        Ok(self
            .tables
            .read()
            .licences
            .get(id)
            .filter(|l| l.team_id == team_id)
            .cloned())
    }

    async fn list_licences(
        &self,
        team_id: &str,
        page: &PaginationParams,
    ) -> DaoResult<Vec<Licence>> {
        let rows: Vec<Licence> = self
            .tables
            .read()
            .licences
            .values()
            .filter(|l| l.team_id == team_id)
            .cloned()
            .collect();
        Ok(page_of(rows, |l| l.created_at, page))
    }

    async fn count_licences(&self, team_id: &str) -> DaoResult<u64> {
        let tables = self.tables.read();
        Ok(tables.licences.values().filter(|l| l.team_id == team_id).count() as u64)
    }

    async fn find_invitation_by_token(&self, token: &str) -> DaoResult<Option<Invitation>> {
        Ok(self.tables.read().invitation_by_token(token))
    }

    async fn list_invitations(
        &self,
        team_id: &str,
        page: &PaginationParams,
    ) -> DaoResult<Vec<Invitation>> {
        let rows: Vec<Invitation> = self
            .tables
            .read()
            .invitations
            .values()
            .filter(|i| i.team_id == team_id)
            .cloned()
            .collect();
        Ok(page_of(rows, |i| i.created_at, page))
    }

    async fn count_invitations(&self, team_id: &str) -> DaoResult<u64> {
        let tables = self.tables.read();
        Ok(tables.invitations.values().filter(|i| i.team_id == team_id).count() as u64)
    }

    async fn find_reader_by_email(&self, email: &str) -> DaoResult<Option<Reader>> {
        Ok(self.tables.read().reader_by_email(email))
    }

    async fn find_membership(&self, id: &str) -> DaoResult<Option<Membership>> {
        Ok(self.tables.read().membership(id).map(normalize))
    }

    async fn list_snapshots(&self, compound_id: &str) -> DaoResult<Vec<MemberSnapshot>> {
        let mut rows: Vec<MemberSnapshot> = self
            .tables
            .read()
            .snapshots
            .iter()
            .filter(|s| s.compound_id == compound_id)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.created_at);
        Ok(rows)
    }

    async fn find_price(&self, id: &str) -> DaoResult<Option<Price>> {
        Ok(self.tables.read().prices.get(id).cloned())
    }

    async fn save_price(&self, price: &Price) -> DaoResult<()> {
        self.tables
            .write()
            .prices
            .insert(price.id.clone(), price.clone());
        Ok(())
    }
}

pub struct MemoryTx {
    tables: Arc<RwLock<Tables>>,
    locks: Arc<LockTable>,
    guards: HashMap<String, OwnedMutexGuard<()>>,
    pending: Tables,
    open: bool,
}

impl MemoryTx {
    fn ensure_open(&self) -> DaoResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(DaoError::TransactionClosed)
        }
    }

    async fn lock(&mut self, key: String) -> DaoResult<()> {
        self.ensure_open()?;
        if self.guards.contains_key(&key) {
            return Ok(());
        }

        let mutex = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        debug!(%key, "Row locked");
        self.guards.insert(key, guard);
        Ok(())
    }

    /// Looks in this transaction's own writes first, then in committed
    /// state.
    fn read<T>(&self, pick: impl Fn(&Tables) -> Option<T>) -> Option<T> {
        pick(&self.pending).or_else(|| pick(&self.tables.read()))
    }

    fn finish(&mut self) {
        self.open = false;
        self.pending = Tables::default();
        self.release_locks();
    }

    /// Drops every held guard and forgets lock entries nobody else is
    /// waiting on, so the table only holds rows currently in use.
    fn release_locks(&mut self) {
        for (key, guard) in self.guards.drain() {
            drop(guard);
            self.locks
                .remove_if(&key, |_, mutex| Arc::strong_count(mutex) == 1);
        }
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        self.release_locks();
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn retrieve_licence(
        &mut self,
        id: &str,
        team_id: &str,
        for_update: bool,
    ) -> DaoResult<Option<Licence>> {
        if for_update {
            self.lock(format!("licence:{id}")).await?;
        }
        self.ensure_open()?;
        Ok(self.read(|t| {
            t.licences
                .get(id)
                .filter(|l| l.team_id == team_id)
                .cloned()
        }))
    }

    async fn save_licence(&mut self, licence: &Licence) -> DaoResult<()> {
        self.ensure_open()?;
        self.pending
            .licences
            .insert(licence.id.clone(), licence.clone());
        Ok(())
    }

    async fn retrieve_invitation(
        &mut self,
        id: &str,
        team_id: &str,
        for_update: bool,
    ) -> DaoResult<Option<Invitation>> {
        if for_update {
            self.lock(format!("invitation:{id}")).await?;
        }
        self.ensure_open()?;
        Ok(self.read(|t| {
            t.invitations
                .get(id)
                .filter(|i| i.team_id == team_id)
                .cloned()
        }))
    }

    async fn find_invitation_by_token(&mut self, token: &str) -> DaoResult<Option<Invitation>> {
        self.ensure_open()?;
        Ok(self.read(|t| t.invitation_by_token(token)))
    }

    async fn save_invitation(&mut self, invitation: &Invitation) -> DaoResult<()> {
        self.ensure_open()?;
        self.pending
            .invitations
            .insert(invitation.id.clone(), invitation.clone());
        Ok(())
    }

    async fn lock_reader_by_email(&mut self, email: &str) -> DaoResult<Option<Reader>> {
        self.lock(format!("reader:{}", email.to_ascii_lowercase()))
            .await?;
        Ok(self.read(|t| t.reader_by_email(email)))
    }

    async fn save_reader(&mut self, reader: &Reader) -> DaoResult<()> {
        self.ensure_open()?;
        if let Some(existing) = self.read(|t| t.reader_by_email(&reader.email)) {
            if existing.ftc_id != reader.ftc_id {
                return Err(DaoError::DuplicateKey(format!("email {}", reader.email)));
            }
        }
        self.pending
            .readers
            .insert(reader.ftc_id.clone(), reader.clone());
        Ok(())
    }

    async fn lock_membership(&mut self, id: &str) -> DaoResult<Option<Membership>> {
        self.lock(format!("membership:{id}")).await?;
        Ok(self.read(|t| t.membership(id)).map(normalize))
    }

    async fn save_membership(&mut self, membership: &Membership) -> DaoResult<()> {
        self.ensure_open()?;
        let key = membership
            .compound_id
            .clone()
            .ok_or_else(|| DaoError::Conflict("membership without compound id".into()))?;
        self.pending
            .memberships
            .insert(key, normalize(membership.clone()));
        Ok(())
    }

    async fn insert_snapshot(&mut self, snapshot: &MemberSnapshot) -> DaoResult<()> {
        self.ensure_open()?;
        self.pending.snapshots.push(snapshot.clone());
        Ok(())
    }

    async fn find_price(&mut self, id: &str) -> DaoResult<Option<Price>> {
        self.ensure_open()?;
        Ok(self.read(|t| t.prices.get(id).cloned()))
    }

    async fn find_processed_transaction(
        &mut self,
        transaction_id: &str,
    ) -> DaoResult<Option<ProcessedTransaction>> {
        self.lock(format!("order_txn:{transaction_id}")).await?;
        Ok(self.read(|t| t.processed.get(transaction_id).cloned()))
    }

    async fn record_transaction(&mut self, record: &ProcessedTransaction) -> DaoResult<()> {
        self.ensure_open()?;
        if self.read(|t| t.processed.get(&record.transaction_id).cloned()).is_some() {
            return Err(DaoError::DuplicateKey(record.transaction_id.clone()));
        }
        self.pending
            .processed
            .insert(record.transaction_id.clone(), record.clone());
        Ok(())
    }

    async fn commit(&mut self) -> DaoResult<()> {
        self.ensure_open()?;
        let pending = std::mem::take(&mut self.pending);
        self.tables.write().merge(pending);
        self.finish();
        Ok(())
    }

    async fn rollback(&mut self) -> DaoResult<()> {
        self.finish();
        Ok(())
    }
}
