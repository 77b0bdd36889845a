//! Catalog lookup contract and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{Product, ProductId};

use crate::error::SagaError;

/// Read-only product lookup against the catalog.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Fetches a product snapshot, or `None` if the product is unknown.
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, SagaError>;
}

/// In-memory catalog for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryCatalog {
    /// Creates a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a product.
    pub fn add_product(&self, product: Product) {
        self.products
            .write()
            .unwrap()
            .insert(product.id.clone(), product);
    }

    /// Returns the number of known products.
    pub fn product_count(&self) -> usize {
        self.products.read().unwrap().len()
    }
}

#[async_trait]
impl CatalogService for InMemoryCatalog {
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, SagaError> {
        Ok(self.products.read().unwrap().get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;

    #[tokio::test]
    async fn test_lookup_known_product() {
        let catalog = InMemoryCatalog::new();
        catalog.add_product(Product::new("SKU-001", "Widget", Money::from_cents(1000), 5));

        let product = catalog
            .get_product(&ProductId::new("SKU-001"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.name, "Widget");
        assert_eq!(product.stock, 5);
    }

    #[tokio::test]
    async fn test_lookup_unknown_product() {
        let catalog = InMemoryCatalog::new();
        let result = catalog.get_product(&ProductId::new("SKU-404")).await.unwrap();
        assert!(result.is_none());
    }
}
