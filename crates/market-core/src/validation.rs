//! # Validation Module
//!
//! Input validation for listings, applied at the API boundary before any
//! state is touched.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                      │
//! │  └── Type and shape checks                                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - business rule validation                       │
//! │  ├── required fields, length limits                                    │
//! │  └── mode ↔ price consistency                                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  └── NOT NULL / CHECK / foreign key constraints                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::ItemMode;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a listing title.
///
/// ## Rules
/// - Must not be empty (after trimming)
/// - Must not exceed 200 characters
pub fn validate_title(title: &str) -> ValidationResult<()> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::Required { field: "title" });
    }
    if title.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "title",
            max: 200,
        });
    }
    Ok(())
}

/// Validates a listing description (may be empty, bounded length).
pub fn validate_description(description: &str) -> ValidationResult<()> {
    if description.len() > 5000 {
        return Err(ValidationError::TooLong {
            field: "description",
            max: 5000,
        });
    }
    Ok(())
}

/// Validates a category label.
pub fn validate_category(category: &str) -> ValidationResult<()> {
    let category = category.trim();
    if category.is_empty() {
        return Err(ValidationError::Required { field: "category" });
    }
    if category.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "category",
            max: 50,
        });
    }
    Ok(())
}

// =============================================================================
// Price Consistency
// =============================================================================

/// Validates the mode-dependent price fields of a listing.
///
/// ## Rules
/// - Buying modes require a positive `buy_price_cents`
/// - Borrowing modes require a positive `daily_price_cents`; the deposit is
///   optional but may not be negative
/// - Prices for modes the listing does not offer must be absent
pub fn validate_prices(
    mode: ItemMode,
    buy_price_cents: Option<i64>,
    daily_price_cents: Option<i64>,
    deposit_cents: Option<i64>,
) -> ValidationResult<()> {
    if mode.allows_buy() {
        match buy_price_cents {
            None => return Err(ValidationError::ModeMismatch("buy price required for this mode")),
            Some(c) if c <= 0 => {
                return Err(ValidationError::NonPositiveAmount {
                    field: "buy_price_cents",
                })
            }
            _ => {}
        }
    } else if buy_price_cents.is_some() {
        return Err(ValidationError::ModeMismatch(
            "buy price not allowed on a borrow-only listing",
        ));
    }

    if mode.allows_borrow() {
        match daily_price_cents {
            None => {
                return Err(ValidationError::ModeMismatch(
                    "daily price required for this mode",
                ))
            }
            Some(c) if c <= 0 => {
                return Err(ValidationError::NonPositiveAmount {
                    field: "daily_price_cents",
                })
            }
            _ => {}
        }
        if let Some(d) = deposit_cents {
            if d < 0 {
                return Err(ValidationError::NegativeAmount {
                    field: "deposit_cents",
                });
            }
        }
    } else if daily_price_cents.is_some() || deposit_cents.is_some() {
        return Err(ValidationError::ModeMismatch(
            "borrow pricing not allowed on a buy-only listing",
        ));
    }

    Ok(())
}

/// Validates a full listing payload in one call.
pub fn validate_listing(
    title: &str,
    description: &str,
    category: &str,
    mode: ItemMode,
    buy_price_cents: Option<i64>,
    daily_price_cents: Option<i64>,
    deposit_cents: Option<i64>,
) -> ValidationResult<()> {
    validate_title(title)?;
    validate_description(description)?;
    validate_category(category)?;
    validate_prices(mode, buy_price_cents, daily_price_cents, deposit_cents)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_rules() {
        assert!(validate_title("Graphing calculator").is_ok());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(201)).is_err());
    }

    #[test]
    fn test_buy_mode_requires_buy_price() {
        assert!(validate_prices(ItemMode::Buy, Some(1000), None, None).is_ok());
        assert!(validate_prices(ItemMode::Buy, None, None, None).is_err());
        assert!(validate_prices(ItemMode::Buy, Some(0), None, None).is_err());
        assert!(validate_prices(ItemMode::Buy, Some(1000), Some(100), None).is_err());
    }

    #[test]
    fn test_borrow_mode_requires_daily_price() {
        assert!(validate_prices(ItemMode::Borrow, None, Some(500), Some(0)).is_ok());
        assert!(validate_prices(ItemMode::Borrow, None, Some(500), None).is_ok());
        assert!(validate_prices(ItemMode::Borrow, None, None, None).is_err());
        assert!(validate_prices(ItemMode::Borrow, None, Some(500), Some(-1)).is_err());
        assert!(validate_prices(ItemMode::Borrow, Some(1000), Some(500), None).is_err());
    }

    #[test]
    fn test_both_mode_requires_both_prices() {
        assert!(validate_prices(ItemMode::Both, Some(1000), Some(500), Some(2000)).is_ok());
        assert!(validate_prices(ItemMode::Both, Some(1000), None, None).is_err());
        assert!(validate_prices(ItemMode::Both, None, Some(500), None).is_err());
    }

    #[test]
    fn test_full_listing() {
        assert!(validate_listing(
            "Bike",
            "City bike, 3 gears",
            "outdoors",
            ItemMode::Both,
            Some(12000),
            Some(800),
            Some(3000),
        )
        .is_ok());
    }
}
