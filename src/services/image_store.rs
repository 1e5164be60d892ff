use crate::entities::{prelude::*, *};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

/// Queries against the `images` metadata table.
///
/// Every function takes the connection explicitly so callers can run them
/// either on the pool or inside an open transaction.
pub struct ImageStore;

impl ImageStore {
    pub async fn insert<C: ConnectionTrait>(
        db: &C,
        original_filename: &str,
        stored_filename: &str,
        uploaded_at: DateTime<Utc>,
    ) -> Result<images::Model, DbErr> {
        images::ActiveModel {
            original_filename: Set(original_filename.to_string()),
            stored_filename: Set(stored_filename.to_string()),
            upload_timestamp: Set(uploaded_at),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: i32,
    ) -> Result<Option<images::Model>, DbErr> {
        Images::find_by_id(id).one(db).await
    }

    pub async fn stored_filename_taken<C: ConnectionTrait>(
        db: &C,
        stored_filename: &str,
    ) -> Result<bool, DbErr> {
        let hit = Images::find()
            .select_only()
            .column(images::Column::Id)
            .filter(images::Column::StoredFilename.eq(stored_filename))
            .into_tuple::<i32>()
            .one(db)
            .await?;
        Ok(hit.is_some())
    }

    /// Newest first; ids break ties between identical timestamps.
    pub async fn list<C: ConnectionTrait>(db: &C) -> Result<Vec<images::Model>, DbErr> {
        Images::find()
            .order_by_desc(images::Column::UploadTimestamp)
            .order_by_desc(images::Column::Id)
            .all(db)
            .await
    }

    /// Returns `false` when no row had this id.
    pub async fn delete<C: ConnectionTrait>(db: &C, id: i32) -> Result<bool, DbErr> {
        let res = Images::delete_by_id(id).exec(db).await?;
        Ok(res.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GalleryConfig;
    use crate::infrastructure::database::setup_database;
    use chrono::Duration;

    async fn test_db() -> sea_orm::DatabaseConnection {
        setup_database(&GalleryConfig::development("unused"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = test_db().await;
        let now = Utc::now();

        let record = ImageStore::insert(&db, "cat.png", "cat.png", now)
            .await
            .unwrap();
        assert_eq!(record.original_filename, "cat.png");
        assert_eq!(record.stored_filename, "cat.png");

        let found = ImageStore::find_by_id(&db, record.id).await.unwrap();
        assert_eq!(found, Some(record.clone()));
        assert!(ImageStore::stored_filename_taken(&db, "cat.png").await.unwrap());
        assert!(!ImageStore::stored_filename_taken(&db, "dog.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_database_fills_missing_timestamp() {
        let db = test_db().await;
        let before = Utc::now() - Duration::seconds(5);

        let record = images::ActiveModel {
            original_filename: Set("raw.png".to_string()),
            stored_filename: Set("raw.png".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        assert!(record.upload_timestamp >= before);
        assert!(record.upload_timestamp <= Utc::now() + Duration::seconds(5));
        assert_eq!(
            ImageStore::find_by_id(&db, record.id)
                .await
                .unwrap()
                .map(|r| r.upload_timestamp),
            Some(record.upload_timestamp)
        );
    }

    #[tokio::test]
    async fn test_stored_filename_is_unique() {
        let db = test_db().await;

        ImageStore::insert(&db, "cat.png", "cat.png", Utc::now())
            .await
            .unwrap();
        let second = ImageStore::insert(&db, "other.png", "cat.png", Utc::now()).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_list_orders_newest_first() {
        let db = test_db().await;
        let base = Utc::now();

        let old = ImageStore::insert(&db, "a.png", "a.png", base - Duration::hours(2))
            .await
            .unwrap();
        let new = ImageStore::insert(&db, "b.png", "b.png", base).await.unwrap();
        let mid = ImageStore::insert(&db, "c.png", "c.png", base - Duration::hours(1))
            .await
            .unwrap();

        let ids: Vec<i32> = ImageStore::list(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![new.id, mid.id, old.id]);
    }

    #[tokio::test]
    async fn test_delete_and_ids_are_not_reused() {
        let db = test_db().await;

        let first = ImageStore::insert(&db, "a.png", "a.png", Utc::now())
            .await
            .unwrap();
        assert!(ImageStore::delete(&db, first.id).await.unwrap());
        assert!(!ImageStore::delete(&db, first.id).await.unwrap());

        let second = ImageStore::insert(&db, "a.png", "a.png", Utc::now())
            .await
            .unwrap();
        assert!(second.id > first.id);
    }
}
