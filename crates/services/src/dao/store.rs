//! Storage seam for the licensing workflows.
//!
//! Backends ([`MongoStore`](super::mongo::MongoStore) in production,
//! [`MemoryStore`](super::memory::MemoryStore) for development and tests)
//! implement these traits so the workflows never touch a driver directly.
//!
//! Every mutation goes through a [`StoreTx`]. Reads taken with
//! `for_update` (and every `lock_*` call) hold the row exclusively until
//! the transaction commits or rolls back; a second transaction asking for
//! the same row either waits for it or fails with
//! [`DaoError::Conflict`](super::base::DaoError::Conflict), depending on
//! the backend. Nothing written through a transaction is visible to others
//! before `commit`.

use async_trait::async_trait;
use seatdesk_db::models::{
    Invitation, Licence, MemberSnapshot, Membership, Price, ProcessedTransaction, Reader,
};

use super::base::{DaoResult, PaginationParams};

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> DaoResult<Box<dyn StoreTx>>;

    async fn find_licence(&self, id: &str, team_id: &str) -> DaoResult<Option<Licence>>;
    async fn list_licences(
        &self,
        team_id: &str,
        page: &PaginationParams,
    ) -> DaoResult<Vec<Licence>>;
    async fn count_licences(&self, team_id: &str) -> DaoResult<u64>;

    async fn find_invitation_by_token(&self, token: &str) -> DaoResult<Option<Invitation>>;
    async fn list_invitations(
        &self,
        team_id: &str,
        page: &PaginationParams,
    ) -> DaoResult<Vec<Invitation>>;
    async fn count_invitations(&self, team_id: &str) -> DaoResult<u64>;

    async fn find_reader_by_email(&self, email: &str) -> DaoResult<Option<Reader>>;
    /// Membership whose compound, ftc or union id equals `id`, normalized.
    async fn find_membership(&self, id: &str) -> DaoResult<Option<Membership>>;
    /// Audit trail for one identity, oldest first.
    async fn list_snapshots(&self, compound_id: &str) -> DaoResult<Vec<MemberSnapshot>>;

    async fn find_price(&self, id: &str) -> DaoResult<Option<Price>>;
    async fn save_price(&self, price: &Price) -> DaoResult<()>;
}

#[async_trait]
pub trait StoreTx: Send {
    async fn retrieve_licence(
        &mut self,
        id: &str,
        team_id: &str,
        for_update: bool,
    ) -> DaoResult<Option<Licence>>;
    async fn save_licence(&mut self, licence: &Licence) -> DaoResult<()>;

    async fn retrieve_invitation(
        &mut self,
        id: &str,
        team_id: &str,
        for_update: bool,
    ) -> DaoResult<Option<Invitation>>;
    async fn find_invitation_by_token(&mut self, token: &str) -> DaoResult<Option<Invitation>>;
    async fn save_invitation(&mut self, invitation: &Invitation) -> DaoResult<()>;

    async fn lock_reader_by_email(&mut self, email: &str) -> DaoResult<Option<Reader>>;
    async fn save_reader(&mut self, reader: &Reader) -> DaoResult<()>;

    async fn lock_membership(&mut self, id: &str) -> DaoResult<Option<Membership>>;
    async fn save_membership(&mut self, membership: &Membership) -> DaoResult<()>;
    async fn insert_snapshot(&mut self, snapshot: &MemberSnapshot) -> DaoResult<()>;

    async fn find_price(&mut self, id: &str) -> DaoResult<Option<Price>>;
    async fn find_processed_transaction(
        &mut self,
        transaction_id: &str,
    ) -> DaoResult<Option<ProcessedTransaction>>;
    async fn record_transaction(&mut self, record: &ProcessedTransaction) -> DaoResult<()>;

    async fn commit(&mut self) -> DaoResult<()>;
    async fn rollback(&mut self) -> DaoResult<()>;
}
