//! MongoDB backend. Needs a replica set, since every mutation runs in a
//! multi-document transaction on a [`ClientSession`].
//!
//! A row is locked by touching it inside the transaction
//! (`find_one_and_update` on a `lock_nonce` field): a second transaction
//! that touches the same document gets a write conflict, surfaced as
//! [`DaoError::Conflict`]. Rows that do not exist yet cannot be locked;
//! the unique indexes on `readers.email`, `memberships.compound_id` and
//! `order_transactions._id` make a concurrent insert fail instead.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use mongodb::options::ReturnDocument;
use mongodb::{Client, ClientSession, Collection, Database};
use seatdesk_db::models::{
    Invitation, Licence, MemberSnapshot, Membership, Price, ProcessedTransaction, Reader,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::base::{map_write_error, BaseDao, DaoError, DaoResult, PaginationParams};
use super::store::{Store, StoreTx};
use crate::licensing::reconcile::normalize;

#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
    licences: BaseDao<Licence>,
    invitations: BaseDao<Invitation>,
    readers: BaseDao<Reader>,
    memberships: BaseDao<Membership>,
    snapshots: BaseDao<MemberSnapshot>,
    prices: BaseDao<Price>,
}

impl MongoStore {
    pub fn new(client: Client, db_name: &str) -> Self {
        let db = client.database(db_name);
        Self {
            licences: BaseDao::new(&db, Licence::COLLECTION),
            invitations: BaseDao::new(&db, Invitation::COLLECTION),
            readers: BaseDao::new(&db, Reader::COLLECTION),
            memberships: BaseDao::new(&db, Membership::COLLECTION),
            snapshots: BaseDao::new(&db, MemberSnapshot::COLLECTION),
            prices: BaseDao::new(&db, Price::COLLECTION),
            client,
            db,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

fn membership_filter(id: &str) -> Document {
    doc! {
        "$or": [
            { "compound_id": id },
            { "ftc_id": id },
            { "union_id": id },
        ]
    }
}

fn email_filter(email: &str) -> Document {
    doc! { "email": email.to_ascii_lowercase() }
}

#[async_trait]
impl Store for MongoStore {
    async fn begin(&self) -> DaoResult<Box<dyn StoreTx>> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;
        Ok(Box::new(MongoTx {
            session,
            db: self.db.clone(),
            open: true,
        }))
    }

    async fn find_licence(&self, id: &str, team_id: &str) -> DaoResult<Option<Licence>> {
        self.licences.find_by_id_in_team(team_id, id).await
    }

    async fn list_licences(
        &self,
        team_id: &str,
        page: &PaginationParams,
    ) -> DaoResult<Vec<Licence>> {
        self.licences
            .find_page(doc! { "team_id": team_id }, None, page)
            .await
    }

    async fn count_licences(&self, team_id: &str) -> DaoResult<u64> {
        self.licences.count(doc! { "team_id": team_id }).await
    }

    async fn find_invitation_by_token(&self, token: &str) -> DaoResult<Option<Invitation>> {
        self.invitations.find_one(doc! { "token": token }).await
    }

    async fn list_invitations(
        &self,
        team_id: &str,
        page: &PaginationParams,
    ) -> DaoResult<Vec<Invitation>> {
        self.invitations
            .find_page(doc! { "team_id": team_id }, None, page)
            .await
    }

    async fn count_invitations(&self, team_id: &str) -> DaoResult<u64> {
        self.invitations.count(doc! { "team_id": team_id }).await
    }

    async fn find_reader_by_email(&self, email: &str) -> DaoResult<Option<Reader>> {
        self.readers.find_one(email_filter(email)).await
    }

    async fn find_membership(&self, id: &str) -> DaoResult<Option<Membership>> {
        let found = self.memberships.find_one(membership_filter(id)).await?;
        Ok(found.map(normalize))
    }

    async fn list_snapshots(&self, compound_id: &str) -> DaoResult<Vec<MemberSnapshot>> {
        self.snapshots
            .find_many(
                doc! { "compound_id": compound_id },
                Some(doc! { "created_at": 1 }),
            )
            .await
    }

    async fn find_price(&self, id: &str) -> DaoResult<Option<Price>> {
        self.prices.find_one(doc! { "_id": id }).await
    }

    async fn save_price(&self, price: &Price) -> DaoResult<()> {
        self.prices
            .collection()
            .replace_one(doc! { "_id": &price.id }, price)
            .upsert(true)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }
}

pub struct MongoTx {
    session: ClientSession,
    db: Database,
    open: bool,
}

impl MongoTx {
    fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection::<T>(name)
    }

    fn ensure_open(&self) -> DaoResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(DaoError::TransactionClosed)
        }
    }

    async fn find<T>(&mut self, name: &str, filter: Document) -> DaoResult<Option<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        self.ensure_open()?;
        let coll = self.collection::<T>(name);
        Ok(coll.find_one(filter).session(&mut self.session).await?)
    }

    /// Reads the matching document and claims it for this transaction.
    async fn lock<T>(&mut self, name: &str, filter: Document) -> DaoResult<Option<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        self.ensure_open()?;
        let coll = self.collection::<T>(name);
        let found = coll
            .find_one_and_update(filter, doc! { "$set": { "lock_nonce": ObjectId::new() } })
            .return_document(ReturnDocument::After)
            .session(&mut self.session)
            .await
            .map_err(map_write_error)?;
        debug!(collection = name, found = found.is_some(), "Row locked");
        Ok(found)
    }

    async fn upsert<T>(&mut self, name: &str, filter: Document, value: &T) -> DaoResult<()>
    where
        T: Serialize + Send + Sync,
    {
        self.ensure_open()?;
        let coll = self.collection::<T>(name);
        coll.replace_one(filter, value)
            .upsert(true)
            .session(&mut self.session)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn insert<T>(&mut self, name: &str, value: &T) -> DaoResult<()>
    where
        T: Serialize + Send + Sync,
    {
        self.ensure_open()?;
        let coll = self.collection::<T>(name);
        coll.insert_one(value)
            .session(&mut self.session)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }
}

#[async_trait]
impl StoreTx for MongoTx {
    async fn retrieve_licence(
        &mut self,
        id: &str,
        team_id: &str,
        for_update: bool,
    ) -> DaoResult<Option<Licence>> {
        let filter = doc! { "_id": id, "team_id": team_id };
        if for_update {
            self.lock(Licence::COLLECTION, filter).await
        } else {
            self.find(Licence::COLLECTION, filter).await
        }
    }

    async fn save_licence(&mut self, licence: &Licence) -> DaoResult<()> {
        self.upsert(Licence::COLLECTION, doc! { "_id": &licence.id }, licence)
            .await
    }

    async fn retrieve_invitation(
        &mut self,
        id: &str,
        team_id: &str,
        for_update: bool,
    ) -> DaoResult<Option<Invitation>> {
        let filter = doc! { "_id": id, "team_id": team_id };
        if for_update {
            self.lock(Invitation::COLLECTION, filter).await
        } else {
            self.find(Invitation::COLLECTION, filter).await
        }
    }

    async fn find_invitation_by_token(&mut self, token: &str) -> DaoResult<Option<Invitation>> {
        self.find(Invitation::COLLECTION, doc! { "token": token })
            .await
    }

    async fn save_invitation(&mut self, invitation: &Invitation) -> DaoResult<()> {
        self.upsert(
            Invitation::COLLECTION,
            doc! { "_id": &invitation.id },
            invitation,
        )
        .await
    }

    async fn lock_reader_by_email(&mut self, email: &str) -> DaoResult<Option<Reader>> {
        self.lock(Reader::COLLECTION, email_filter(email)).await
    }

    async fn save_reader(&mut self, reader: &Reader) -> DaoResult<()> {
        let mut reader = reader.clone();
        reader.email = reader.email.to_ascii_lowercase();
        self.upsert(Reader::COLLECTION, doc! { "_id": &reader.ftc_id }, &reader)
            .await
    }

    async fn lock_membership(&mut self, id: &str) -> DaoResult<Option<Membership>> {
        let found: Option<Membership> = self
            .lock(Membership::COLLECTION, membership_filter(id))
            .await?;
        Ok(found.map(normalize))
    }

    async fn save_membership(&mut self, membership: &Membership) -> DaoResult<()> {
        let compound_id = membership
            .compound_id
            .clone()
            .ok_or_else(|| DaoError::Conflict("membership without compound id".into()))?;
        let membership = normalize(membership.clone());
        self.upsert(
            Membership::COLLECTION,
            doc! { "compound_id": compound_id },
            &membership,
        )
        .await
    }

    async fn insert_snapshot(&mut self, snapshot: &MemberSnapshot) -> DaoResult<()> {
        self.insert(MemberSnapshot::COLLECTION, snapshot).await
    }

    async fn find_price(&mut self, id: &str) -> DaoResult<Option<Price>> {
        self.find(Price::COLLECTION, doc! { "_id": id }).await
    }

    async fn find_processed_transaction(
        &mut self,
        transaction_id: &str,
    ) -> DaoResult<Option<ProcessedTransaction>> {
        self.find(
            ProcessedTransaction::COLLECTION,
            doc! { "_id": transaction_id },
        )
        .await
    }

    async fn record_transaction(&mut self, record: &ProcessedTransaction) -> DaoResult<()> {
        self.insert(ProcessedTransaction::COLLECTION, record).await
    }

    async fn commit(&mut self) -> DaoResult<()> {
        self.ensure_open()?;
        self.open = false;
        self.session
            .commit_transaction()
            .await
            .map_err(map_write_error)
    }

    async fn rollback(&mut self) -> DaoResult<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.session.abort_transaction().await?;
        Ok(())
    }
}
