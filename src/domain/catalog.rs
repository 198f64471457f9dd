//! Keyed reference data: product catalog and customer directory
//!
//! Both are built once by the loader and only queried afterwards.

use crate::domain::types::{Customer, Product};
use rustc_hash::FxHashMap;
use tracing::warn;

/// Product catalog keyed by SKU
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: FxHashMap<String, Product>,
    /// SKUs in load order
    order: Vec<String>,
}

impl Catalog {
    /// Build from rows in file order. A repeated SKU replaces the earlier row.
    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Self {
        let mut catalog = Self::default();
        for product in products {
            catalog.insert(product);
        }
        catalog
    }

    fn insert(&mut self, product: Product) {
        let sku = product.sku.clone();
        if self.products.insert(sku.clone(), product).is_some() {
            warn!(sku = %sku, "catalog_duplicate_sku_replaced");
        } else {
            self.order.push(sku);
        }
    }

    #[inline]
    pub fn get(&self, sku: &str) -> Option<&Product> {
        self.products.get(sku)
    }

    /// Catalog weight in grams, only when the SKU is known with a positive weight
    pub fn weight_of(&self, sku: &str) -> Option<f64> {
        self.get(sku).map(|p| p.weight).filter(|w| *w > 0.0)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Products in load order
    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.order.iter().filter_map(|sku| self.products.get(sku))
    }
}

/// Customer directory keyed by customer id
#[derive(Debug, Clone, Default)]
pub struct CustomerDirectory {
    customers: FxHashMap<String, Customer>,
}

impl CustomerDirectory {
    pub fn from_customers(customers: impl IntoIterator<Item = Customer>) -> Self {
        let customers = customers.into_iter().map(|c| (c.customer_id.clone(), c)).collect();
        Self { customers }
    }

    #[inline]
    pub fn get(&self, customer_id: &str) -> Option<&Customer> {
        self.customers.get(customer_id)
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }
}
