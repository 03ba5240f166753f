pub mod collections;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use tabula_core::query::QueryParams;
use tabula_core::{ODataService, SqliteEngine, TabulaConfig};

/// Service over a SQLite file and a collections file
pub fn service(database: &Path, collections: &Path, config: TabulaConfig) -> Result<ODataService> {
    if !database.exists() {
        bail!("database {} does not exist", database.display());
    }
    let catalog = collections::load(collections)?;
    Ok(ODataService::new(Arc::new(catalog), Arc::new(SqliteEngine::open(database)), config))
}

/// `sales/orders` or `/sales/orders` into `(group, collection)`
fn collection_path(path: &str) -> Result<(&str, &str)> {
    match path.trim_matches('/').split('/').collect::<Vec<_>>().as_slice() {
        [group, name] if !group.is_empty() && !name.is_empty() => Ok((*group, *name)),
        _ => bail!("expected GROUP/COLLECTION, got {:?}", path),
    }
}

/// Print the SQL of a collection request
pub fn sql(service: &ODataService, path: &str, query: &str) -> Result<()> {
    let (group, name) = collection_path(path)?;
    let sql = service.collection_sql(group, name, &QueryParams::parse(query))?;
    println!("{}", sql);
    Ok(())
}

/// Run a request and print the response body; failures exit non-zero
pub fn query(service: &ODataService, path: &str, query: &str, accept: Option<&str>) -> Result<()> {
    let response = service.handle(path, query, accept);
    let body = match response.json_body() {
        Some(json) => serde_json::to_string_pretty(json)?,
        None => response.body_string(),
    };
    println!("{}", body);

    if !response.status.is_success() {
        bail!("request failed with status {}", response.status);
    }
    Ok(())
}

/// Print the CSDL document of a group
pub fn metadata(service: &ODataService, group: &str) -> Result<()> {
    let response = service.metadata(group);
    if !response.status.is_success() {
        bail!("{}", response.body_string());
    }
    println!("{}", response.body_string());
    Ok(())
}
