use crate::error::{AppError, AppResult, RepositoryError};
use crate::models::{normalize_country, normalize_symbol, validate_country, Holding};
use crate::repositories::HoldingStore;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Service for managing user portfolios
pub struct PortfolioService {
    holdings: Arc<dyn HoldingStore>,
}

impl PortfolioService {
    pub fn new(holdings: Arc<dyn HoldingStore>) -> Self {
        Self { holdings }
    }

    /// Holdings of a user
    pub async fn list(&self, user_id: Uuid) -> AppResult<Vec<Holding>> {
        Ok(self.holdings.find_by_user(user_id).await?)
    }

    /// Add a holding to a user's portfolio
    pub async fn add(
        &self,
        user_id: Uuid,
        symbol: &str,
        quantity: Decimal,
        avg_price: Option<Decimal>,
        country: Option<&str>,
    ) -> AppResult<Holding> {
        let holding = Holding::new(user_id, symbol, quantity, avg_price, country);
        holding.validate().map_err(AppError::Validation)?;

        info!(%user_id, symbol = %holding.symbol, country = %holding.country, "Adding holding");

        match self.holdings.insert(&holding).await {
            Ok(saved) => Ok(saved),
            Err(RepositoryError::Duplicate(_)) => Err(AppError::Validation(format!(
                "{} already in portfolio",
                holding.symbol
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Change quantity and/or average price of an existing holding
    pub async fn update(
        &self,
        user_id: Uuid,
        symbol: &str,
        country: Option<&str>,
        quantity: Option<Decimal>,
        avg_price: Option<Decimal>,
    ) -> AppResult<Holding> {
        let symbol = normalize_symbol(symbol);
        let country = normalize_country(country);

        if symbol.is_empty() {
            return Err(AppError::Validation("Symbol is required".to_string()));
        }
        validate_country(&country).map_err(AppError::Validation)?;
        if quantity.is_none() && avg_price.is_none() {
            return Err(AppError::Validation(
                "Provide quantity or avgPrice to update".to_string(),
            ));
        }
        if quantity.is_some_and(|q| q <= Decimal::ZERO) {
            return Err(AppError::Validation(
                "Quantity must be a positive number".to_string(),
            ));
        }
        if avg_price.is_some_and(|p| p < Decimal::ZERO) {
            return Err(AppError::Validation(
                "avgPrice must be a non-negative number".to_string(),
            ));
        }

        self.holdings
            .update(user_id, &symbol, &country, quantity, avg_price)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Holding {} ({}) not found", symbol, country)))
    }

    /// Remove every holding of a symbol from a user's portfolio
    pub async fn remove(&self, user_id: Uuid, symbol: &str) -> AppResult<u64> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(AppError::Validation("Symbol is required".to_string()));
        }

        let removed = self.holdings.delete_by_symbol(user_id, &symbol).await?;
        if removed == 0 {
            return Err(AppError::NotFound(format!("Holding {} not found", symbol)));
        }

        info!(%user_id, %symbol, removed, "Removed holding");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MemoryHoldingStore;
    use rust_decimal::Decimal;

    fn service() -> PortfolioService {
        PortfolioService::new(Arc::new(MemoryHoldingStore::new()))
    }

    #[tokio::test]
    async fn test_add_normalizes_and_lists() {
        let service = service();
        let user = Uuid::new_v4();

        let holding = service
            .add(user, " reliance ", Decimal::from(10), Some(Decimal::from(2500)), None)
            .await
            .unwrap();
        assert_eq!(holding.symbol, "RELIANCE");
        assert_eq!(holding.country, "IN");

        let listed = service.list(user).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(service.list(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_rejects_bad_input() {
        let service = service();
        let user = Uuid::new_v4();

        for result in [
            service.add(user, "", Decimal::ONE, None, None).await,
            service.add(user, "ACME", Decimal::ZERO, None, None).await,
            service.add(user, "ACME", Decimal::ONE, Some(Decimal::NEGATIVE_ONE), None).await,
            service.add(user, "ACME", Decimal::ONE, None, Some("IND")).await,
        ] {
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn test_duplicate_add_is_validation_error() {
        let service = service();
        let user = Uuid::new_v4();

        service.add(user, "ACME", Decimal::ONE, None, Some("us")).await.unwrap();
        let err = service.add(user, "acme", Decimal::from(2), None, Some("US")).await.unwrap_err();
        match err {
            AppError::Validation(msg) => assert!(msg.contains("already in portfolio")),
            other => panic!("unexpected error: {other:?}"),
        }

        // Same symbol in another market is a separate holding
        service.add(user, "ACME", Decimal::ONE, None, Some("IN")).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let service = service();
        let user = Uuid::new_v4();
        service.add(user, "ACME", Decimal::ONE, None, None).await.unwrap();

        let updated = service
            .update(user, "acme", None, Some(Decimal::from(5)), None)
            .await
            .unwrap();
        assert_eq!(updated.quantity, Decimal::from(5));

        assert!(matches!(
            service.update(user, "ACME", None, None, None).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.update(user, "FOO", None, Some(Decimal::ONE), None).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.update(user, "ACME", Some("IND"), Some(Decimal::ONE), None).await,
            Err(AppError::Validation(_))
        ));

        assert_eq!(service.remove(user, "acme").await.unwrap(), 1);
        assert!(matches!(service.remove(user, "ACME").await, Err(AppError::NotFound(_))));
    }
}
