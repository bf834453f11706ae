use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_COUNTRY: &str = "IN";

/// Holding model representing one portfolio entry of a user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Holding {
    pub id: Uuid,
    pub user_id: Uuid,
    pub symbol: String,
    pub quantity: Decimal,
    pub avg_price: Option<Decimal>,
    pub country: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Holding {
    /// Create a new Holding with normalized symbol and country
    pub fn new(
        user_id: Uuid,
        symbol: &str,
        quantity: Decimal,
        avg_price: Option<Decimal>,
        country: Option<&str>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            symbol: normalize_symbol(symbol),
            quantity,
            avg_price,
            country: normalize_country(country),
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate quantity and average price
    pub fn validate(&self) -> Result<(), String> {
        if self.symbol.is_empty() {
            return Err("Symbol is required".to_string());
        }
        if self.quantity <= Decimal::ZERO {
            return Err("Quantity must be a positive number".to_string());
        }
        if let Some(price) = self.avg_price {
            if price < Decimal::ZERO {
                return Err("avgPrice must be a non-negative number".to_string());
            }
        }
        validate_country(&self.country)
    }

    /// Projection read by the news pipeline
    pub fn as_ref_pair(&self) -> HoldingRef {
        HoldingRef {
            symbol: self.symbol.clone(),
            country: Some(self.country.clone()),
        }
    }
}

/// Symbol + country projection of a holding, as loaded across all users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct HoldingRef {
    pub symbol: String,
    pub country: Option<String>,
}

impl HoldingRef {
    pub fn new(symbol: impl Into<String>, country: Option<&str>) -> Self {
        Self {
            symbol: symbol.into(),
            country: country.map(str::to_string),
        }
    }
}

/// Trim and upper-case a ticker symbol
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Trim and upper-case a country code, defaulting to `IN` when blank
pub fn normalize_country(country: Option<&str>) -> String {
    let country = country.map(str::trim).unwrap_or_default();
    if country.is_empty() {
        DEFAULT_COUNTRY.to_string()
    } else {
        country.to_uppercase()
    }
}

/// Country codes are at most two characters after normalization
pub fn validate_country(country: &str) -> Result<(), String> {
    if country.chars().count() > 2 {
        return Err(format!("Invalid country code: {}", country));
    }
    Ok(())
}
