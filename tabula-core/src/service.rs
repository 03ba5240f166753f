//! Request-level operations
//!
//! [`ODataService`] owns the collaborators a request needs (registry, engine,
//! schema cache, configuration) and exposes one method per resource kind.
//! Each method opens its own engine session and never fails outright: errors
//! are folded into an [`ODataResponse`] carrying the error envelope.

use std::sync::Arc;
use std::thread::JoinHandle;

use serde_json::{json, Value};

use crate::config::TabulaConfig;
use crate::engine::{SqlEngine, SqlSession};
use crate::metadata::{self, EntitySetSchema};
use crate::model::{Collection, CollectionRegistry};
use crate::navigation::{self, Addressed, EntityPath};
use crate::pagination::{build_next_link, detect_more, include_next_link, total_count};
use crate::query::{build_query, resolve_expansions, Expansion, QueryOptions, QueryParams};
use crate::relations::{discover_heuristic, same_table, Reference, RelationshipSet, TableColumns};
use crate::response::{
    collection_envelope, context_url, entity_context_url, entity_envelope, format_row, format_rows,
    MetadataLevel, ODataResponse,
};
use crate::schema::{SchemaCache, WarmUpReport};
use crate::sql::strip_schema;
use crate::{Error, Result};

pub struct ODataService {
    registry: Arc<dyn CollectionRegistry>,
    engine: Arc<dyn SqlEngine>,
    cache: Arc<SchemaCache>,
    config: TabulaConfig,
}

impl ODataService {
    pub fn new(
        registry: Arc<dyn CollectionRegistry>,
        engine: Arc<dyn SqlEngine>,
        config: TabulaConfig,
    ) -> Self {
        let cache = Arc::new(SchemaCache::from_config(&config.cache));
        Self { registry, engine, cache, config }
    }

    /// Share an existing schema cache
    pub fn with_cache(mut self, cache: Arc<SchemaCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &TabulaConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<SchemaCache> {
        &self.cache
    }

    /// Start the background warm-up when `cache.warm_up` is enabled
    pub fn start_warm_up(&self) -> Option<JoinHandle<WarmUpReport>> {
        if !self.config.cache.warm_up {
            return None;
        }
        Some(self.cache.spawn_warm_up(Arc::clone(&self.engine), Arc::clone(&self.registry)))
    }

    /// Route `/{group}[/$metadata | /{collection}[(key)[/{navigation}]]]`
    ///
    /// Transport and routing belong to the embedding server; this covers the
    /// resource paths alone, for tools and tests.
    pub fn handle(&self, path: &str, query: &str, accept: Option<&str>) -> ODataResponse {
        let params = QueryParams::parse(query);
        let level = MetadataLevel::negotiate(accept, params.get("$format"));
        let segments: Vec<&str> = path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [group] => self.service_document(group, level),
            [group, "$metadata"] => self.metadata(group),
            [group, resource] if resource.contains('(') => self.entity(group, resource, level),
            [group, resource] => self.collection(group, resource, &params, level),
            [group, resource, navigation] => self.navigate(group, resource, navigation, level),
            _ => ODataResponse::error(&Error::not_found(format!("no resource at {}", path)), level),
        }
    }

    /// `GET /{group}/{collection}` with system query options
    pub fn collection(&self, group: &str, name: &str, params: &QueryParams, level: MetadataLevel) -> ODataResponse {
        ODataResponse::from_result(self.try_collection(group, name, params, level), level)
    }

    /// `GET /{group}/{collection}(key)`
    pub fn entity(&self, group: &str, segment: &str, level: MetadataLevel) -> ODataResponse {
        ODataResponse::from_result(self.try_entity(group, segment, level), level)
    }

    /// `GET /{group}/{collection}(key)/{navigation}`
    pub fn navigate(&self, group: &str, segment: &str, navigation: &str, level: MetadataLevel) -> ODataResponse {
        ODataResponse::from_result(self.try_navigate(group, segment, navigation, level), level)
    }

    /// `GET /{group}/$metadata`
    pub fn metadata(&self, group: &str) -> ODataResponse {
        ODataResponse::from_result(self.try_metadata(group), MetadataLevel::default())
    }

    /// `GET /{group}`
    pub fn service_document(&self, group: &str, level: MetadataLevel) -> ODataResponse {
        ODataResponse::from_result(self.try_service_document(group, level), level)
    }

    fn lookup(&self, group: &str, name: &str) -> Result<Arc<Collection>> {
        self.registry
            .get(group, name)
            .ok_or_else(|| Error::not_found(format!("collection {}/{} not found", group, name)))
    }

    fn group_collections(&self, group: &str) -> Result<Vec<Arc<Collection>>> {
        let collections = self.registry.collections(group);
        if collections.is_empty() {
            return Err(Error::not_found(format!("group {} not found", group)));
        }
        Ok(collections)
    }

    /// Relationships between the group's collections
    ///
    /// The engine's foreign-key catalog is used when it knows any edge between
    /// registered tables; otherwise column names are scanned. Any failure
    /// yields an empty set.
    fn discover(&self, session: &dyn SqlSession, group: &str) -> RelationshipSet {
        let collections = self.registry.collections(group);
        let known_tables: Vec<String> = collections.iter().map(|c| c.table_name()).collect();

        match session.foreign_keys() {
            Ok(Some(foreign_keys)) => {
                let set = RelationshipSet::from_catalog(&foreign_keys, &known_tables);
                if !set.is_empty() {
                    log::debug!("{} relationships from the foreign-key catalog", set.forward.len());
                    return set;
                }
            }
            Ok(None) => {}
            Err(e) => log::warn!("foreign-key catalog unavailable: {}", e),
        }

        let tables: Vec<TableColumns> = collections
            .iter()
            .filter_map(|c| match self.cache.get(session, c) {
                Ok(snapshot) => Some(TableColumns { table: c.table_name(), columns: snapshot.column_names() }),
                Err(e) => {
                    log::debug!("relationship scan skipped {}: {}", c.name, e);
                    None
                }
            })
            .collect();
        discover_heuristic(&tables)
    }

    /// Registered collection reading from `table`, if any
    fn collection_for_table(&self, group: &str, table: &str) -> Option<Arc<Collection>> {
        self.registry.collections(group).into_iter().find(|c| same_table(&c.table_name(), table))
    }

    fn entity_set_name(&self, group: &str, table: &str) -> String {
        self.collection_for_table(group, table)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| strip_schema(table).to_string())
    }

    fn target_columns(&self, session: &dyn SqlSession, group: &str, edge: &Reference) -> Result<Vec<String>> {
        match self.collection_for_table(group, &edge.target_table) {
            Some(target) => Ok(self.cache.get(session, &target)?.column_names()),
            None => Ok(session.describe(&edge.target_table)?.into_iter().map(|c| c.name).collect()),
        }
    }

    /// Page query and resolved expansions of a collection request
    fn plan(
        &self,
        session: &dyn SqlSession,
        collection: &Collection,
        options: &QueryOptions,
    ) -> Result<(String, Vec<Expansion>)> {
        let expansions = if options.expand.is_empty() {
            Vec::new()
        } else {
            let snapshot = self.cache.get(session, collection)?;
            let discovered = self.discover(session, &collection.group);
            resolve_expansions(collection, &options.expand, &discovered, &snapshot.column_names(), |edge| {
                self.target_columns(session, &collection.group, edge)
            })?
        };

        let sql = build_query(collection, options, &expansions, self.config.query.filter_policy)?;
        Ok((sql, expansions))
    }

    /// SQL a collection request would run, without running it
    pub fn collection_sql(&self, group: &str, name: &str, params: &QueryParams) -> Result<String> {
        let collection = self.lookup(group, name)?;
        let options = QueryOptions::from_params(params, &self.config.query)?;
        let session = self.engine.connect()?;
        let (sql, _) = self.plan(session.as_ref(), &collection, &options)?;
        Ok(sql)
    }

    fn try_collection(
        &self,
        group: &str,
        name: &str,
        params: &QueryParams,
        level: MetadataLevel,
    ) -> Result<ODataResponse> {
        let collection = self.lookup(group, name)?;
        let query_config = &self.config.query;
        let options = QueryOptions::from_params(params, query_config)?;

        let session = self.engine.connect()?;
        let session = session.as_ref();

        let (sql, expansions) = self.plan(session, &collection, &options)?;
        let result = session.execute(&sql)?;
        let columns = result.column_names();
        let (rows, more) = detect_more(result.rows, options.page.top);

        let group_url = self.config.service.group_url(group);
        let collection_url = format!("{}/{}", group_url, collection.name);

        let next_link = include_next_link(query_config.next_link, &options.page, more)
            .then(|| build_next_link(&collection_url, params, &options.page));
        let count = options.count.then(|| {
            total_count(session, &collection, options.filter.as_deref(), query_config.filter_policy)
        });
        let context =
            level.includes_context().then(|| context_url(&group_url, &collection.name, &options.select));

        let value = format_rows(&columns, rows, &expansions);
        Ok(ODataResponse::json(collection_envelope(context, value, next_link, count), level))
    }

    fn try_entity(&self, group: &str, segment: &str, level: MetadataLevel) -> Result<ODataResponse> {
        let path = EntityPath::parse(segment)?;
        let collection = self.lookup(group, &path.collection)?;
        let session = self.engine.connect()?;

        let key_column = self.key_column(session.as_ref(), &collection)?;
        let sql = navigation::entity_sql(&collection, &key_column, &path.key);
        log::debug!("{}/{} entity: {}", group, collection.name, sql);
        let mut result = session.execute(&sql)?;
        if result.rows.len() > 1 {
            log::warn!("key {} of {} matches {} rows", path.key.to_sql(), collection.name, result.rows.len());
        }
        let columns = result.column_names();
        let Some(row) = result.rows.drain(..).next() else {
            return Err(Error::not_found(format!("{} not found", segment)));
        };

        let context = level
            .includes_context()
            .then(|| entity_context_url(&self.config.service.group_url(group), &collection.name));
        Ok(ODataResponse::json(entity_envelope(context, format_row(&columns, row, &[])), level))
    }

    /// The column the CSDL document declares as the entity key
    fn key_column(&self, session: &dyn SqlSession, collection: &Collection) -> Result<String> {
        let snapshot = self.cache.get(session, collection)?;
        metadata::key_column(collection, &snapshot.columns)
            .map(String::from)
            .ok_or_else(|| Error::execution(format!("{} has no columns to key on", collection.name)))
    }

    fn try_navigate(
        &self,
        group: &str,
        segment: &str,
        navigation: &str,
        level: MetadataLevel,
    ) -> Result<ODataResponse> {
        let path = EntityPath::parse(segment)?;
        let collection = self.lookup(group, &path.collection)?;
        let session = self.engine.connect()?;
        let session = session.as_ref();

        let discovered = self.discover(session, group);
        let edge = navigation::resolve(&collection, navigation, &discovered)?;
        let key_column = self.key_column(session, &collection)?;
        let sql = navigation::navigation_sql(&collection, &key_column, edge, &path.key);
        log::debug!("{}/{} navigation {}: {}", group, collection.name, navigation, sql);

        let rows = session.execute(&sql)?;
        let group_url = self.config.service.group_url(group);
        let target_set = self.entity_set_name(group, &edge.target_table);

        let body = match navigation::classify(rows, || format!("{}/{} not found", segment, navigation))? {
            Addressed::Single(result) => {
                let columns = result.column_names();
                let row = result.rows.into_iter().next().unwrap_or_default();
                let context = level.includes_context().then(|| entity_context_url(&group_url, &target_set));
                entity_envelope(context, format_row(&columns, row, &[]))
            }
            Addressed::Many(result) => {
                let columns = result.column_names();
                let context = level.includes_context().then(|| context_url(&group_url, &target_set, &[]));
                collection_envelope(context, format_rows(&columns, result.rows, &[]), None, None)
            }
        };
        Ok(ODataResponse::json(body, level))
    }

    fn try_metadata(&self, group: &str) -> Result<ODataResponse> {
        let collections = self.group_collections(group)?;
        let session = self.engine.connect()?;
        let session = session.as_ref();

        let mut snapshots = Vec::with_capacity(collections.len());
        for collection in &collections {
            match self.cache.get(session, collection) {
                Ok(snapshot) => snapshots.push((Arc::clone(collection), snapshot)),
                Err(e) => log::warn!("metadata omits {}/{}: {}", group, collection.name, e),
            }
        }

        let discovered = self.discover(session, group);
        let sets: Vec<EntitySetSchema<'_>> = snapshots
            .iter()
            .map(|(collection, snapshot)| EntitySetSchema { collection, columns: &snapshot.columns })
            .collect();

        Ok(ODataResponse::xml(metadata::generate(&self.config.service, &sets, &discovered)))
    }

    fn try_service_document(&self, group: &str, level: MetadataLevel) -> Result<ODataResponse> {
        let collections = self.group_collections(group)?;
        let value: Vec<Value> = collections
            .iter()
            .map(|c| json!({ "name": c.name, "kind": "EntitySet", "url": c.name }))
            .collect();

        let context = level
            .includes_context()
            .then(|| format!("{}/$metadata", self.config.service.group_url(group)));
        Ok(ODataResponse::json(collection_envelope(context, value, None, None), level))
    }
}
