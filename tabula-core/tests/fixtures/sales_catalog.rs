// Collections over tests/fixtures/sales.sql, included by src/testing.rs and
// tests/common/mod.rs. `Collection` and `CollectionCatalog` must be in scope.

/// `customers` declares its key; `orders` and `order_items` fall back to `id`
pub fn sales_catalog() -> CollectionCatalog {
    CollectionCatalog::new()
        .with(Collection::table("sales", "customers", "customers").primary_key(["id"]))
        .unwrap()
        .with(Collection::table("sales", "orders", "orders"))
        .unwrap()
        .with(Collection::table("sales", "order_items", "order_items"))
        .unwrap()
}
