use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

use crate::models::{
    Invitation, Licence, MemberSnapshot, Membership, ProcessedTransaction, Reader,
};

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Licences
    create_indexes(
        db,
        Licence::COLLECTION,
        vec![
            index(bson::doc! { "team_id": 1, "created_at": -1 }),
            index(bson::doc! { "team_id": 1, "status": 1 }),
            index(bson::doc! { "assignee_id": 1 }),
        ],
    )
    .await?;

    // Invitations
    create_indexes(
        db,
        Invitation::COLLECTION,
        vec![
            index_unique(bson::doc! { "token": 1 }),
            index(bson::doc! { "team_id": 1, "created_at": -1 }),
            index(bson::doc! { "licence_id": 1 }),
        ],
    )
    .await?;

    // Readers
    create_indexes(
        db,
        Reader::COLLECTION,
        vec![index_unique(bson::doc! { "email": 1 })],
    )
    .await?;

    // Memberships
    create_indexes(
        db,
        Membership::COLLECTION,
        vec![
            index_unique(bson::doc! { "compound_id": 1 }),
            index(bson::doc! { "ftc_id": 1 }),
            index(bson::doc! { "union_id": 1 }),
        ],
    )
    .await?;

    // Member snapshots
    create_indexes(
        db,
        MemberSnapshot::COLLECTION,
        vec![index(bson::doc! { "compound_id": 1, "created_at": -1 })],
    )
    .await?;

    // Processed order transactions
    create_indexes(
        db,
        ProcessedTransaction::COLLECTION,
        vec![index(bson::doc! { "order_id": 1 })],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}
