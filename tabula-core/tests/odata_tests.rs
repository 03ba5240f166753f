//! End-to-end requests against a SQLite sales database

mod common;

use common::{get, ids, Sales};
use http::StatusCode;
use serde_json::json;
use tabula_core::prelude::*;

#[test]
fn test_first_page_has_next_link() {
    let sales = Sales::new();
    let response = get(&sales.service(), "customers", "$top=5&$skip=0");

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(ids(&response), vec![1, 2, 3, 4, 5]);
    assert_eq!(
        response.json_body().unwrap()["@odata.nextLink"],
        "http://localhost:8080/odata/sales/customers?$skip=5&$top=5"
    );
}

#[test]
fn test_last_page_has_no_next_link() {
    let sales = Sales::new();
    let response = get(&sales.service(), "customers", "$top=5&$skip=5");

    assert_eq!(ids(&response), vec![6, 7, 8, 9, 10]);
    assert!(response.json_body().unwrap().get("@odata.nextLink").is_none());
}

#[test]
fn test_next_link_keeps_other_options() {
    let sales = Sales::new();
    let response = get(&sales.service(), "customers", "$orderby=id%20desc&$top=3");

    assert_eq!(ids(&response), vec![10, 9, 8]);
    assert_eq!(
        response.json_body().unwrap()["@odata.nextLink"],
        "http://localhost:8080/odata/sales/customers?$orderby=id%20desc&$skip=3&$top=3"
    );
}

#[test]
fn test_top_zero_is_an_empty_page() {
    let sales = Sales::new();
    let response = get(&sales.service(), "customers", "$top=0");

    let body = response.json_body().unwrap();
    assert_eq!(body["value"], json!([]));
    assert!(body.get("@odata.nextLink").is_none());
}

#[test]
fn test_next_link_modes() {
    let sales = Sales::new();
    let query = QueryConfig::default().with_page_size(3, 10);

    let server_driven = TabulaConfig { query: query.clone(), ..TabulaConfig::default() };
    let response = get(&sales.service_with(server_driven), "customers", "");
    assert_eq!(ids(&response), vec![1, 2, 3]);
    assert_eq!(
        response.json_body().unwrap()["@odata.nextLink"],
        "http://localhost:8080/odata/sales/customers?$skip=3&$top=3"
    );

    let lazy = TabulaConfig { query: query.with_next_link(NextLinkMode::Lazy), ..TabulaConfig::default() };
    let service = sales.service_with(lazy);
    let response = get(&service, "customers", "");
    assert!(response.json_body().unwrap().get("@odata.nextLink").is_none());
    let response = get(&service, "customers", "$top=3");
    assert!(response.json_body().unwrap().get("@odata.nextLink").is_some());
}

#[test]
fn test_top_is_clamped_to_max_page_size() {
    let sales = Sales::new();
    let config = TabulaConfig {
        query: QueryConfig::default().with_page_size(2, 4),
        ..TabulaConfig::default()
    };
    let response = get(&sales.service_with(config), "customers", "$top=50");
    assert_eq!(ids(&response).len(), 4);
}

#[test]
fn test_select_preserves_requested_order() {
    let sales = Sales::new();
    let response = get(&sales.service(), "customers", "$select=name,id&$top=1");
    let body = response.json_body().unwrap();

    let keys: Vec<&String> = body["value"][0].as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["name", "id"]);
    assert_eq!(body["@odata.context"], "http://localhost:8080/odata/sales/$metadata#customers(name,id)");
}

#[test]
fn test_invalid_select_is_bad_request() {
    let sales = Sales::new();
    let response = get(&sales.service(), "customers", "$select=name;DROP%20TABLE%20customers");
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json_body().unwrap()["error"]["message"].is_string());
}

#[test]
fn test_filter_and_count() {
    let sales = Sales::new();
    let response = get(&sales.service(), "customers", "$filter=city%20eq%20'Paris'&$count=true&$top=1");
    let body = response.json_body().unwrap();

    assert_eq!(ids(&response), vec![1]);
    assert_eq!(body["@odata.count"], 2);
    assert!(body.get("@odata.nextLink").is_some());
}

#[test]
fn test_count_ignores_paging() {
    let sales = Sales::new();
    let response = get(&sales.service(), "orders", "$count=true&$skip=4");
    assert_eq!(ids(&response), vec![5]);
    assert_eq!(response.json_body().unwrap()["@odata.count"], 5);
}

#[test]
fn test_unparsable_filter_follows_policy() {
    let sales = Sales::new();
    let query = "$filter=1%3D1;%20DROP%20TABLE%20x%20eq%201";

    let response = get(&sales.service(), "customers", query);
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let config = TabulaConfig {
        query: QueryConfig::default().with_filter_policy(ParsePolicy::Ignore),
        ..TabulaConfig::default()
    };
    let response = get(&sales.service_with(config), "customers", query);
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(ids(&response).len(), 10);
}

#[test]
fn test_compound_filter_is_rejected() {
    let sales = Sales::new();
    for query in [
        "$filter=total%20gt%205%20and%20total%20lt%20100",
        "$filter=status%20eq%20'open'%20or%20status%20eq%20'shipped'",
    ] {
        let response = get(&sales.service(), "orders", query);
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", query);
        assert!(response.json_body().unwrap()["error"]["message"].is_string());
    }

    let config = TabulaConfig {
        query: QueryConfig::default().with_filter_policy(ParsePolicy::Ignore),
        ..TabulaConfig::default()
    };
    let response = get(&sales.service_with(config), "orders", "$filter=status%20eq%20'open'%20or%20status%20eq%20'shipped'");
    assert_eq!(ids(&response), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_invalid_paging_follows_policy() {
    let sales = Sales::new();
    assert_eq!(get(&sales.service(), "customers", "$top=abc").status, StatusCode::BAD_REQUEST);
    assert_eq!(get(&sales.service(), "customers", "$count=yes").status, StatusCode::BAD_REQUEST);

    let config = TabulaConfig {
        query: QueryConfig::default().with_parameter_policy(ParsePolicy::Ignore),
        ..TabulaConfig::default()
    };
    let response = get(&sales.service_with(config), "customers", "$top=abc&$count=yes");
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(ids(&response).len(), 10);
}

#[test]
fn test_expand_nests_related_entity() {
    let sales = Sales::new();
    let response = get(&sales.service(), "orders", "$expand=Customer&$orderby=id");
    let rows = response.json_body().unwrap()["value"].as_array().unwrap().clone();

    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0]["customer_id"], 1);
    assert_eq!(
        rows[0]["Customer"],
        json!({"id": 1, "name": "Customer 1", "city": "Paris", "created": "2024-01-01"})
    );
    assert_eq!(rows[2]["Customer"]["name"], "Customer 2");
    assert_eq!(rows[4]["Customer"], json!(null));

    let keys: Vec<&String> = rows[0].as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["id", "customer_id", "total", "status", "Customer"]);
}

#[test]
fn test_expand_survives_select_and_filter() {
    let sales = Sales::new();
    let response = get(
        &sales.service(),
        "orders",
        "$select=id,total&$expand=Customer&$filter=status%20eq%20'shipped'&$orderby=id",
    );
    let rows = response.json_body().unwrap()["value"].as_array().unwrap().clone();

    assert_eq!(rows.len(), 2);
    let keys: Vec<&String> = rows[1].as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["id", "total", "Customer"]);
    assert_eq!(rows[1]["Customer"]["id"], 2);
}

#[test]
fn test_collection_valued_expand_is_bad_request() {
    let sales = Sales::new();
    let response = get(&sales.service(), "customers", "$expand=Orders&$top=2");
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let message = response.json_body().unwrap()["error"]["message"].as_str().unwrap().to_string();
    assert!(message.contains("Orders"), "{}", message);
}

#[test]
fn test_unknown_expand_is_skipped() {
    let sales = Sales::new();
    let response = get(&sales.service(), "customers", "$expand=Nope&$top=2");

    assert_eq!(response.status, StatusCode::OK);
    let row = response.json_body().unwrap()["value"][0].as_object().unwrap().clone();
    assert!(!row.contains_key("Nope"));
}

#[test]
fn test_declared_reference_drives_expand() {
    let sales = Sales::new();
    let catalog = CollectionCatalog::new()
        .with(Collection::table("shop", "clients", "customers"))
        .unwrap()
        .with(
            Collection::sql("shop", "big_orders", "SELECT * FROM orders WHERE total > 40")
                .reference("customer_id", "customers(id)")
                .unwrap(),
        )
        .unwrap();
    let service = sales.service_for(catalog, TabulaConfig::default());

    let response = service.collection(
        "shop",
        "big_orders",
        &QueryParams::parse("$expand=Customer&$orderby=id"),
        MetadataLevel::None,
    );
    let body = response.json_body().unwrap();
    assert!(body.get("@odata.context").is_none());
    assert_eq!(ids(&response), vec![1, 3, 5]);
    assert_eq!(body["value"][0]["Customer"]["name"], "Customer 1");
    assert_eq!(body["value"][2]["Customer"], json!(null));
}

#[test]
fn test_unknown_collection_is_not_found() {
    let sales = Sales::new();
    let response = get(&sales.service(), "invoices", "");
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json_body().unwrap()["error"]["message"], "collection sales/invoices not found");
}

#[test]
fn test_entity_by_key() {
    let sales = Sales::new();
    let service = sales.service();

    let response = service.entity("sales", "customers(2)", MetadataLevel::Minimal);
    let body = response.json_body().unwrap();
    assert_eq!(body["@odata.context"], "http://localhost:8080/odata/sales/$metadata#customers/$entity");
    assert_eq!(body["name"], "Customer 2");

    let response = service.entity("sales", "customers(id=3)", MetadataLevel::Minimal);
    assert_eq!(response.json_body().unwrap()["id"], 3);

    assert_eq!(service.entity("sales", "customers(99)", MetadataLevel::Minimal).status, StatusCode::NOT_FOUND);
    assert_eq!(service.entity("sales", "customers('x)", MetadataLevel::Minimal).status, StatusCode::BAD_REQUEST);
}

#[test]
fn test_entity_key_matches_metadata_key() {
    let sales = Sales::new();
    let catalog = Sales::catalog()
        .with(
            Collection::sql("sales", "lines", "SELECT sku, order_id, qty FROM order_items WHERE id > 1")
                .reference("order_id", "orders(id)")
                .unwrap(),
        )
        .unwrap();
    let service = sales.service_for(catalog, TabulaConfig::default());

    let xml = service.metadata("sales").body_string();
    assert!(xml.contains("<EntityType Name=\"Line\"><Key><PropertyRef Name=\"sku\"/></Key>"), "{}", xml);

    let response = service.entity("sales", "lines('B-7')", MetadataLevel::Minimal);
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json_body().unwrap()["qty"], 1);

    let response = service.navigate("sales", "lines('A-1')", "Order", MetadataLevel::Minimal);
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json_body().unwrap()["id"], 3);
}

#[test]
fn test_navigation_to_single_entity() {
    let sales = Sales::new();
    let service = sales.service();

    let response = service.navigate("sales", "orders(3)", "Customer", MetadataLevel::Minimal);
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json_body().unwrap();
    assert_eq!(body["id"], 2);
    assert_eq!(body["@odata.context"], "http://localhost:8080/odata/sales/$metadata#customers/$entity");
}

#[test]
fn test_navigation_missing_key_is_not_found() {
    let sales = Sales::new();
    let service = sales.service();

    assert_eq!(service.navigate("sales", "orders(42)", "Customer", MetadataLevel::Minimal).status, StatusCode::NOT_FOUND);
    assert_eq!(service.navigate("sales", "orders(5)", "Customer", MetadataLevel::Minimal).status, StatusCode::NOT_FOUND);
    assert_eq!(service.navigate("sales", "orders(1)", "Warehouse", MetadataLevel::Minimal).status, StatusCode::NOT_FOUND);
}

#[test]
fn test_navigation_to_many() {
    let sales = Sales::new();
    let service = sales.service();

    let response = service.handle("/sales/customers(1)/Orders", "", None);
    let body = response.json_body().unwrap();
    assert_eq!(ids(&response), vec![1, 2]);
    assert_eq!(body["@odata.context"], "http://localhost:8080/odata/sales/$metadata#orders");

    let response = service.handle("/sales/customers(2)/Orders", "", None);
    assert_eq!(response.json_body().unwrap()["id"], 3);
}

#[test]
fn test_metadata_document() {
    let sales = Sales::new();
    let response = sales.service().metadata("sales");
    assert_eq!(response.status, StatusCode::OK);
    let xml = response.body_string();

    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
    assert!(xml.contains("<Schema xmlns=\"http://docs.oasis-open.org/odata/ns/edm\" Namespace=\"Default\">"));
    assert!(xml.contains(
        "<EntityType Name=\"Customer\"><Key><PropertyRef Name=\"id\"/></Key>\
         <Property Name=\"id\" Type=\"Edm.Int32\" Nullable=\"false\"/>\
         <Property Name=\"name\" Type=\"Edm.String\"/>\
         <Property Name=\"city\" Type=\"Edm.String\"/>\
         <Property Name=\"created\" Type=\"Edm.Date\"/>"
    ));
    assert!(xml.contains("<EntityType Name=\"OrderItem\">"));
    assert!(xml.contains("<NavigationProperty Name=\"Customer\" Type=\"Default.Customer\" Nullable=\"true\"/>"));
    assert!(xml.contains("<NavigationProperty Name=\"Orders\" Type=\"Collection(Default.Order)\" Nullable=\"true\"/>"));
    assert!(xml.contains("<EntityContainer Name=\"Container\">"));
    assert!(xml.contains("<NavigationPropertyBinding Path=\"Customer\" Target=\"customers\"/>"));
}

#[test]
fn test_schema_cache_serves_stale_until_invalidated() {
    let sales = Sales::new();
    let service = sales.service();
    assert!(!service.metadata("sales").body_string().contains("vip"));

    let conn = rusqlite::Connection::open(sales.engine.path()).unwrap();
    conn.execute_batch("ALTER TABLE customers ADD COLUMN vip BOOLEAN").unwrap();
    drop(conn);

    assert!(!service.metadata("sales").body_string().contains("vip"));
    assert!(service.cache().invalidate("sales", "customers"));
    assert!(service.metadata("sales").body_string().contains("<Property Name=\"vip\" Type=\"Edm.Boolean\"/>"));
}

#[test]
fn test_http_rendering() {
    let sales = Sales::new();
    let http = sales.service().handle("/sales/customers", "$top=1", Some("application/json;odata.metadata=full")).into_http();

    assert_eq!(http.status(), StatusCode::OK);
    assert_eq!(http.headers()["OData-Version"], "4.0");
    assert!(http.headers()["Content-Type"].to_str().unwrap().contains("odata.metadata=full"));

    let http = sales.service().handle("/sales/customers(77)", "", None).into_http();
    assert_eq!(http.status(), StatusCode::NOT_FOUND);
}
