//! # Item Repository
//!
//! Catalog CRUD plus the three reservation primitives. The primitives are
//! the concurrency core of the whole system:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  RESERVATION = CONDITIONAL UPDATE                                       │
//! │                                                                         │
//! │  reserve:   UPDATE items SET status='reserved', holder...              │
//! │             WHERE id = ? AND status = 'available'                      │
//! │                                                                         │
//! │  Two buyers race on the same item → both run the UPDATE → SQLite       │
//! │  serializes writes → exactly one matches the WHERE clause.             │
//! │  rows_affected == 0 means you lost; the caller sees Conflict.          │
//! │                                                                         │
//! │  No SELECT-then-UPDATE. No table locks held across awaits.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `release` and `finalize` additionally name the holder in the WHERE clause
//! so a stale caller can never free or settle somebody else's hold.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use market_core::{Holder, HolderKind, Item, ItemCondition, ItemMode, ItemStatus};

use crate::error::{DbError, DbResult};

// =============================================================================
// Row Mapping
// =============================================================================

/// Raw database row for an item. `images` is a JSON array of strings and the
/// holder is split across two nullable columns, so [`Item`] cannot derive
/// `FromRow` directly.
#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: String,
    owner_id: String,
    title: String,
    description: String,
    category: String,
    condition: ItemCondition,
    mode: ItemMode,
    buy_price_cents: Option<i64>,
    daily_price_cents: Option<i64>,
    deposit_cents: Option<i64>,
    status: ItemStatus,
    holder_kind: Option<HolderKind>,
    holder_id: Option<String>,
    images: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ItemRow {
    fn into_item(self) -> DbResult<Item> {
        let images: Vec<String> = serde_json::from_str(&self.images)
            .map_err(|e| DbError::corrupt("item", format!("images column: {e}")))?;

        let holder = match (self.holder_kind, self.holder_id) {
            (Some(kind), Some(id)) => Some(Holder { kind, id }),
            (None, None) => None,
            _ => {
                return Err(DbError::corrupt(
                    "item",
                    "holder_kind and holder_id must be set together",
                ))
            }
        };

        Ok(Item {
            id: self.id,
            owner_id: self.owner_id,
            title: self.title,
            description: self.description,
            category: self.category,
            condition: self.condition,
            mode: self.mode,
            buy_price_cents: self.buy_price_cents,
            daily_price_cents: self.daily_price_cents,
            deposit_cents: self.deposit_cents,
            status: self.status,
            holder,
            images,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_ITEM: &str = "SELECT id, owner_id, title, description, category, condition, mode, \
     buy_price_cents, daily_price_cents, deposit_cents, status, holder_kind, holder_id, \
     images, created_at, updated_at FROM items";

// =============================================================================
// Input Types
// =============================================================================

/// Fields for a new listing. Validation happens in market-core before this
/// reaches the database.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub condition: ItemCondition,
    pub mode: ItemMode,
    pub buy_price_cents: Option<i64>,
    pub daily_price_cents: Option<i64>,
    pub deposit_cents: Option<i64>,
    pub images: Vec<String>,
}

/// Partial update for a listing. `None` fields are left unchanged.
/// Status, holder, owner, and mode are never client-writable.
#[derive(Debug, Clone, Default)]
pub struct UpdateItem {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub condition: Option<ItemCondition>,
    pub buy_price_cents: Option<i64>,
    pub daily_price_cents: Option<i64>,
    pub deposit_cents: Option<i64>,
    pub images: Option<Vec<String>>,
}

/// Optional filters for listing queries.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub owner_id: Option<String>,
    pub category: Option<String>,
    pub status: Option<ItemStatus>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog items.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    // =========================================================================
    // CRUD
    // =========================================================================

    /// Inserts a new listing with status `available` and returns it.
    pub async fn insert(&self, new: NewItem) -> DbResult<Item> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let images_json = serde_json::to_string(&new.images)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        debug!(item_id = %id, owner_id = %new.owner_id, "Inserting item");

        sqlx::query(
            "INSERT INTO items \
               (id, owner_id, title, description, category, condition, mode, \
                buy_price_cents, daily_price_cents, deposit_cents, status, images, \
                created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'available', ?, ?, ?)",
        )
        .bind(&id)
        .bind(&new.owner_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.category)
        .bind(new.condition)
        .bind(new.mode)
        .bind(new.buy_price_cents)
        .bind(new.daily_price_cents)
        .bind(new.deposit_cents)
        .bind(&images_json)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.require(&id).await
    }

    /// Fetches an item by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Item>> {
        let row: Option<ItemRow> =
            sqlx::query_as::<_, ItemRow>(&format!("{SELECT_ITEM} WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(ItemRow::into_item).transpose()
    }

    /// Fetches an item by ID, or returns NotFound.
    pub async fn require(&self, id: &str) -> DbResult<Item> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("item", id))
    }

    /// Lists items, newest first, with optional filters.
    ///
    /// SQLite treats `(? IS NULL OR col = ?)` well enough at this scale;
    /// no dynamic SQL needed.
    pub async fn list(&self, filter: &ItemFilter, limit: i64) -> DbResult<Vec<Item>> {
        let rows: Vec<ItemRow> = sqlx::query_as::<_, ItemRow>(&format!(
            "{SELECT_ITEM} \
             WHERE (?1 IS NULL OR owner_id = ?1) \
               AND (?2 IS NULL OR category = ?2) \
               AND (?3 IS NULL OR status = ?3) \
             ORDER BY created_at DESC \
             LIMIT ?4"
        ))
        .bind(&filter.owner_id)
        .bind(&filter.category)
        .bind(filter.status)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ItemRow::into_item).collect()
    }

    /// Updates listing fields. Only touches columns with `Some` values;
    /// never touches status, holder, owner, or mode.
    ///
    /// Frozen transaction amounts make this safe at any time: an in-flight
    /// order or borrow keeps the prices it was created with.
    pub async fn update_listing(&self, id: &str, update: UpdateItem) -> DbResult<Item> {
        let images_json = match &update.images {
            Some(images) => Some(
                serde_json::to_string(images).map_err(|e| DbError::Internal(e.to_string()))?,
            ),
            None => None,
        };

        let result = sqlx::query(
            "UPDATE items SET \
               title = COALESCE(?, title), \
               description = COALESCE(?, description), \
               category = COALESCE(?, category), \
               condition = COALESCE(?, condition), \
               buy_price_cents = COALESCE(?, buy_price_cents), \
               daily_price_cents = COALESCE(?, daily_price_cents), \
               deposit_cents = COALESCE(?, deposit_cents), \
               images = COALESCE(?, images), \
               updated_at = ? \
             WHERE id = ?",
        )
        .bind(&update.title)
        .bind(&update.description)
        .bind(&update.category)
        .bind(update.condition)
        .bind(update.buy_price_cents)
        .bind(update.daily_price_cents)
        .bind(update.deposit_cents)
        .bind(&images_json)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("item", id));
        }

        self.require(id).await
    }

    /// Deletes a listing, but only while it is `available`. An item held by
    /// an order or borrow (or already settled) cannot be deleted.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM items WHERE id = ? AND status = 'available'")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            // Distinguish "gone" from "held"
            return match self.get(id).await? {
                Some(_) => Err(DbError::conflict(
                    "item",
                    id,
                    "cannot delete while reserved, rented, or sold",
                )),
                None => Err(DbError::not_found("item", id)),
            };
        }

        Ok(())
    }

    // =========================================================================
    // Reservation Primitives
    // =========================================================================

    /// `available → reserved`, recording the holder. The atomic claim: of
    /// all concurrent callers, exactly one gets Ok.
    pub async fn reserve(&self, id: &str, holder: &Holder) -> DbResult<()> {
        debug!(item_id = %id, holder_id = %holder.id, "Reserving item");

        let result = sqlx::query(
            "UPDATE items SET status = 'reserved', holder_kind = ?, holder_id = ?, \
             updated_at = ? WHERE id = ? AND status = 'available'",
        )
        .bind(holder.kind)
        .bind(&holder.id)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get(id).await? {
                Some(_) => Err(DbError::conflict("item", id, "not available")),
                None => Err(DbError::not_found("item", id)),
            };
        }

        Ok(())
    }

    /// `reserved|rented → available`, clearing the holder. Only the named
    /// holder can release; a release by a stale or foreign holder is a no-op.
    ///
    /// Idempotent by design: cancel paths and expiry paths may both reach
    /// here for the same hold. Returns whether this call did the release.
    pub async fn release(&self, id: &str, holder: &Holder) -> DbResult<bool> {
        debug!(item_id = %id, holder_id = %holder.id, "Releasing item");

        let result = sqlx::query(
            "UPDATE items SET status = 'available', holder_kind = NULL, holder_id = NULL, \
             updated_at = ? \
             WHERE id = ? AND holder_kind = ? AND holder_id = ? \
               AND status IN ('reserved', 'rented')",
        )
        .bind(Utc::now())
        .bind(id)
        .bind(holder.kind)
        .bind(&holder.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// `reserved → rented|sold`, keeping the holder on record. Driven by
    /// payment settlement; only the holder that took the reservation can
    /// settle it.
    pub async fn finalize(&self, id: &str, holder: &Holder, to: ItemStatus) -> DbResult<()> {
        debug!(item_id = %id, holder_id = %holder.id, status = ?to, "Finalizing item");

        let result = sqlx::query(
            "UPDATE items SET status = ?, updated_at = ? \
             WHERE id = ? AND status = 'reserved' AND holder_kind = ? AND holder_id = ?",
        )
        .bind(to)
        .bind(Utc::now())
        .bind(id)
        .bind(holder.kind)
        .bind(&holder.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get(id).await? {
                Some(_) => Err(DbError::conflict("item", id, "not reserved by this holder")),
                None => Err(DbError::not_found("item", id)),
            };
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn listing(owner: &str) -> NewItem {
        NewItem {
            owner_id: owner.to_string(),
            title: "Desk lamp".to_string(),
            description: "Warm white".to_string(),
            category: "furniture".to_string(),
            condition: ItemCondition::Good,
            mode: ItemMode::Both,
            buy_price_cents: Some(1500),
            daily_price_cents: Some(200),
            deposit_cents: Some(500),
            images: vec!["img/1.jpg".to_string()],
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let db = test_db().await;
        let item = db.items().insert(listing("alice")).await.unwrap();

        assert_eq!(item.status, ItemStatus::Available);
        assert_eq!(item.images, vec!["img/1.jpg"]);

        let fetched = db.items().get(&item.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Desk lamp");
        assert_eq!(fetched.buy_price_cents, Some(1500));
        assert!(fetched.holder.is_none());
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let db = test_db().await;
        assert!(db.items().get("nope").await.unwrap().is_none());
        assert!(matches!(
            db.items().require("nope").await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = test_db().await;
        let repo = db.items();
        repo.insert(listing("alice")).await.unwrap();
        let mut other = listing("bob");
        other.category = "electronics".to_string();
        repo.insert(other).await.unwrap();

        let all = repo.list(&ItemFilter::default(), 50).await.unwrap();
        assert_eq!(all.len(), 2);

        let filter = ItemFilter {
            owner_id: Some("alice".to_string()),
            ..Default::default()
        };
        let alices = repo.list(&filter, 50).await.unwrap();
        assert_eq!(alices.len(), 1);
        assert_eq!(alices[0].owner_id, "alice");

        let filter = ItemFilter {
            category: Some("electronics".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.list(&filter, 50).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_listing_partial() {
        let db = test_db().await;
        let item = db.items().insert(listing("alice")).await.unwrap();

        let updated = db
            .items()
            .update_listing(
                &item.id,
                UpdateItem {
                    title: Some("Brass desk lamp".to_string()),
                    buy_price_cents: Some(1800),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Brass desk lamp");
        assert_eq!(updated.buy_price_cents, Some(1800));
        // Untouched fields survive
        assert_eq!(updated.description, "Warm white");
        assert_eq!(updated.daily_price_cents, Some(200));
    }

    #[tokio::test]
    async fn test_reserve_claims_exactly_once() {
        let db = test_db().await;
        let item = db.items().insert(listing("alice")).await.unwrap();

        let first = Holder::order("order-1");
        let second = Holder::order("order-2");

        db.items().reserve(&item.id, &first).await.unwrap();
        let err = db.items().reserve(&item.id, &second).await.unwrap_err();
        assert!(err.is_conflict());

        let held = db.items().require(&item.id).await.unwrap();
        assert_eq!(held.status, ItemStatus::Reserved);
        assert_eq!(held.holder, Some(first));
    }

    #[tokio::test]
    async fn test_release_is_holder_scoped_and_idempotent() {
        let db = test_db().await;
        let item = db.items().insert(listing("alice")).await.unwrap();
        let holder = Holder::borrow("req-1");

        db.items().reserve(&item.id, &holder).await.unwrap();

        // A foreign holder cannot free the item
        let released = db
            .items()
            .release(&item.id, &Holder::borrow("req-2"))
            .await
            .unwrap();
        assert!(!released);
        assert_eq!(
            db.items().require(&item.id).await.unwrap().status,
            ItemStatus::Reserved
        );

        // The real holder can, once
        assert!(db.items().release(&item.id, &holder).await.unwrap());
        assert!(!db.items().release(&item.id, &holder).await.unwrap());

        let freed = db.items().require(&item.id).await.unwrap();
        assert_eq!(freed.status, ItemStatus::Available);
        assert!(freed.holder.is_none());
    }

    #[tokio::test]
    async fn test_finalize_requires_matching_holder() {
        let db = test_db().await;
        let item = db.items().insert(listing("alice")).await.unwrap();
        let holder = Holder::order("order-1");

        db.items().reserve(&item.id, &holder).await.unwrap();

        let err = db
            .items()
            .finalize(&item.id, &Holder::order("order-9"), ItemStatus::Sold)
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        db.items()
            .finalize(&item.id, &holder, ItemStatus::Sold)
            .await
            .unwrap();
        let sold = db.items().require(&item.id).await.unwrap();
        assert_eq!(sold.status, ItemStatus::Sold);
        // The settling transaction stays on record
        assert_eq!(sold.holder, Some(holder));
    }

    #[tokio::test]
    async fn test_rented_item_releases_back_to_available() {
        let db = test_db().await;
        let item = db.items().insert(listing("alice")).await.unwrap();
        let holder = Holder::borrow("req-1");

        db.items().reserve(&item.id, &holder).await.unwrap();
        db.items()
            .finalize(&item.id, &holder, ItemStatus::Rented)
            .await
            .unwrap();
        assert_eq!(
            db.items().require(&item.id).await.unwrap().status,
            ItemStatus::Rented
        );

        assert!(db.items().release(&item.id, &holder).await.unwrap());
        assert_eq!(
            db.items().require(&item.id).await.unwrap().status,
            ItemStatus::Available
        );
    }

    #[tokio::test]
    async fn test_delete_only_when_available() {
        let db = test_db().await;
        let item = db.items().insert(listing("alice")).await.unwrap();
        let holder = Holder::order("order-1");

        db.items().reserve(&item.id, &holder).await.unwrap();
        assert!(db.items().delete(&item.id).await.unwrap_err().is_conflict());

        db.items().release(&item.id, &holder).await.unwrap();
        db.items().delete(&item.id).await.unwrap();
        assert!(db.items().get(&item.id).await.unwrap().is_none());
    }
}
