//! Catalog product snapshot.

use common::Money;
use serde::{Deserialize, Serialize};

use crate::order::ProductId;

/// A product as seen by the catalog at lookup time.
///
/// The `stock` field is advisory only; the authoritative stock check is the
/// inventory ledger reservation performed during checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: u32,
}

impl Product {
    /// Creates a new catalog snapshot.
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Money, stock: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            stock,
        }
    }
}
