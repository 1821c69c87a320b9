//! # Catalog Service
//!
//! Listing CRUD with ownership checks and mode/price validation. Status and
//! holder never pass through here - only the order, borrow, and checkout
//! services move those, via the reservation primitives.

use tracing::info;

use market_core::{validation, Item, ItemCondition, ItemMode};
use market_db::{Database, ItemFilter, NewItem, UpdateItem};

use crate::error::{ApiError, ApiResult};

/// Fields accepted for a new listing.
#[derive(Debug, Clone)]
pub struct NewListing {
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

/// Catalog operations.
#[derive(Clone)]
pub struct CatalogService {
    db: Database,
}

impl CatalogService {
    pub fn new(db: Database) -> Self {
        CatalogService { db }
    }

    /// Creates a listing owned by `owner_id`, status `available`.
    pub async fn create(&self, owner_id: &str, listing: NewListing) -> ApiResult<Item> {
        validation::validate_listing(
            &listing.title,
            &listing.description,
            &listing.category,
            listing.mode,
            listing.buy_price_cents,
            listing.daily_price_cents,
            listing.deposit_cents,
        )
        .map_err(market_core::CoreError::from)?;

        let item = self
            .db
            .items()
            .insert(NewItem {
                owner_id: owner_id.to_string(),
                title: listing.title,
                description: listing.description,
                category: listing.category,
                condition: listing.condition,
                mode: listing.mode,
                buy_price_cents: listing.buy_price_cents,
                daily_price_cents: listing.daily_price_cents,
                deposit_cents: listing.deposit_cents,
                images: listing.images,
            })
            .await?;

        info!(item_id = %item.id, owner_id = %owner_id, "Listing created");
        Ok(item)
    }

    /// Fetches one item. Listings are public; no caller check.
    pub async fn get(&self, id: &str) -> ApiResult<Item> {
        Ok(self.db.items().require(id).await?)
    }

    /// Lists items with optional filters, newest first.
    pub async fn list(&self, filter: ItemFilter, limit: i64) -> ApiResult<Vec<Item>> {
        Ok(self.db.items().list(&filter, limit).await?)
    }

    /// Updates listing fields. Owner-only. The merged result must still
    /// satisfy the mode/price rules; frozen transaction amounts make edits
    /// safe for in-flight orders and borrows.
    pub async fn update(&self, user_id: &str, id: &str, update: UpdateItem) -> ApiResult<Item> {
        let item = self.db.items().require(id).await?;
        if item.owner_id != user_id {
            return Err(ApiError::Forbidden(
                "only the owner can edit a listing".to_string(),
            ));
        }

        if let Some(title) = &update.title {
            validation::validate_title(title).map_err(market_core::CoreError::from)?;
        }
        if let Some(description) = &update.description {
            validation::validate_description(description).map_err(market_core::CoreError::from)?;
        }
        if let Some(category) = &update.category {
            validation::validate_category(category).map_err(market_core::CoreError::from)?;
        }
        validation::validate_prices(
            item.mode,
            update.buy_price_cents.or(item.buy_price_cents),
            update.daily_price_cents.or(item.daily_price_cents),
            update.deposit_cents.or(item.deposit_cents),
        )
        .map_err(market_core::CoreError::from)?;

        Ok(self.db.items().update_listing(id, update).await?)
    }

    /// Deletes a listing. Owner-only, and only while `available`.
    pub async fn delete(&self, user_id: &str, id: &str) -> ApiResult<()> {
        let item = self.db.items().require(id).await?;
        if item.owner_id != user_id {
            return Err(ApiError::Forbidden(
                "only the owner can delete a listing".to_string(),
            ));
        }

        self.db.items().delete(id).await?;
        info!(item_id = %id, "Listing deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use market_db::DbConfig;

    async fn service() -> CatalogService {
        CatalogService::new(Database::new(DbConfig::in_memory()).await.unwrap())
    }

    fn listing() -> NewListing {
        NewListing {
            title: "Bike".to_string(),
            description: "3 gears".to_string(),
            category: "outdoors".to_string(),
            condition: ItemCondition::Fair,
            mode: ItemMode::Both,
            buy_price_cents: Some(12000),
            daily_price_cents: Some(800),
            deposit_cents: Some(3000),
            images: vec![],
        }
    }

    #[tokio::test]
    async fn test_create_validates_prices() {
        let svc = service().await;

        let mut bad = listing();
        bad.daily_price_cents = None;
        let err = svc.create("alice", bad).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let item = svc.create("alice", listing()).await.unwrap();
        assert_eq!(item.owner_id, "alice");
    }

    #[tokio::test]
    async fn test_update_is_owner_only() {
        let svc = service().await;
        let item = svc.create("alice", listing()).await.unwrap();

        let err = svc
            .update("bob", &item.id, UpdateItem::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let updated = svc
            .update(
                "alice",
                &item.id,
                UpdateItem {
                    title: Some("Blue bike".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Blue bike");
    }

    #[tokio::test]
    async fn test_update_cannot_break_mode_rules() {
        let svc = service().await;
        let item = svc.create("alice", listing()).await.unwrap();

        // Both-mode listing must keep a positive daily price
        let err = svc
            .update(
                "alice",
                &item.id,
                UpdateItem {
                    daily_price_cents: Some(0),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_delete_is_owner_only() {
        let svc = service().await;
        let item = svc.create("alice", listing()).await.unwrap();

        assert!(matches!(
            svc.delete("bob", &item.id).await.unwrap_err(),
            ApiError::Forbidden(_)
        ));
        svc.delete("alice", &item.id).await.unwrap();
        assert!(matches!(
            svc.get(&item.id).await.unwrap_err(),
            ApiError::NotFound(_)
        ));
    }
}
