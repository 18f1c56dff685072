//! Document collections and their indexes.
//!
//! These are thin request-shaping wrappers over [`Client::request`]: build the path, attach
//! options, pull the interesting field out of the response.

use crate::error::codes;
use crate::{Client, GracefulExt, Request, Result};
use serde::Serialize;
use serde_json::Value;

/// Options for writes (`save`, `replace`, `update`, `remove`).
///
/// A revision is sent as an `if-match` precondition; the other fields become query
/// parameters. A plain string converts into options carrying only a revision:
///
/// ```
/// use c8_client::WriteOptions;
///
/// let options = WriteOptions::from("_XqlOdo----");
/// assert_eq!(options.rev.as_deref(), Some("_XqlOdo----"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOptions {
    #[serde(skip)]
    pub rev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for_sync: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_new: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_old: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_null: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_objects: Option<bool>,
}

impl WriteOptions {
    pub(crate) fn apply(&self, request: Request) -> Result<Request> {
        let request = match &self.rev {
            Some(rev) => request.with_header("if-match", rev)?,
            None => request,
        };
        request.with_query(self)
    }
}

impl From<&str> for WriteOptions {
    fn from(rev: &str) -> Self {
        Self {
            rev: Some(rev.to_string()),
            ..Self::default()
        }
    }
}

impl From<String> for WriteOptions {
    fn from(rev: String) -> Self {
        Self {
            rev: Some(rev),
            ..Self::default()
        }
    }
}

/// Conditional-read preconditions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Only return the document if its revision matches.
    pub if_match: Option<String>,
    /// Only return the document if its revision differs.
    pub if_none_match: Option<String>,
}

impl ReadOptions {
    pub(crate) fn apply(&self, request: Request) -> Result<Request> {
        let request = match &self.if_none_match {
            Some(rev) => request.with_header("if-none-match", rev)?,
            None => request,
        };
        match &self.if_match {
            Some(rev) => request.with_header("if-match", rev),
            None => Ok(request),
        }
    }
}

/// Resolves a document key or id against a collection: ids (`coll/key`) pass through.
pub(crate) fn document_handle(collection: &str, handle: &str) -> String {
    if handle.contains('/') {
        handle.to_string()
    } else {
        format!("{}/{}", collection, handle)
    }
}

/// Index types supported by [`IndexSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    Hash,
    Skiplist,
    Persistent,
    Geo,
    Fulltext,
    Ttl,
}

/// Definition of an index to create.
///
/// ```
/// use c8_client::IndexSpec;
///
/// let spec = IndexSpec::persistent(["value"]).name("by_value").unique(true);
/// let json = serde_json::to_value(&spec).unwrap();
/// assert_eq!(json["type"], "persistent");
/// assert_eq!(json["fields"][0], "value");
/// assert!(json.get("sparse").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSpec {
    #[serde(rename = "type")]
    pub kind: IndexType,
    pub fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sparse: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_json: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_after: Option<u64>,
}

impl IndexSpec {
    /// An index of `kind` over `fields`, with every optional setting left to the server.
    pub fn new<I, S>(kind: IndexType, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            fields: fields.into_iter().map(Into::into).collect(),
            name: None,
            unique: None,
            sparse: None,
            geo_json: None,
            min_length: None,
            expire_after: None,
        }
    }

    /// A hash index over `fields`.
    pub fn hash<I: IntoIterator<Item = S>, S: Into<String>>(fields: I) -> Self {
        Self::new(IndexType::Hash, fields)
    }

    /// A skiplist index over `fields`.
    pub fn skiplist<I: IntoIterator<Item = S>, S: Into<String>>(fields: I) -> Self {
        Self::new(IndexType::Skiplist, fields)
    }

    /// A persistent index over `fields`.
    pub fn persistent<I: IntoIterator<Item = S>, S: Into<String>>(fields: I) -> Self {
        Self::new(IndexType::Persistent, fields)
    }

    /// A geo index over one `[latitude, longitude]` field or two separate fields.
    pub fn geo<I: IntoIterator<Item = S>, S: Into<String>>(fields: I) -> Self {
        Self::new(IndexType::Geo, fields)
    }

    /// A fulltext index over a single text field.
    pub fn fulltext<I: IntoIterator<Item = S>, S: Into<String>>(fields: I) -> Self {
        Self::new(IndexType::Fulltext, fields)
    }

    /// A TTL index removing documents `expire_after` seconds after the time in its field.
    pub fn ttl<I: IntoIterator<Item = S>, S: Into<String>>(fields: I, expire_after: u64) -> Self {
        Self {
            expire_after: Some(expire_after),
            ..Self::new(IndexType::Ttl, fields)
        }
    }

    /// Index name. The server picks one when unset.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Rejects documents that repeat an indexed value.
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = Some(unique);
        self
    }

    /// Leaves documents with a missing or `null` indexed field out of the index.
    pub fn sparse(mut self, sparse: bool) -> Self {
        self.sparse = Some(sparse);
        self
    }

    /// For geo indexes on a single field: read coordinates as `[longitude, latitude]`.
    pub fn geo_json(mut self, geo_json: bool) -> Self {
        self.geo_json = Some(geo_json);
        self
    }

    /// Fulltext only: words shorter than this are not indexed.
    pub fn min_length(mut self, min_length: u32) -> Self {
        self.min_length = Some(min_length);
        self
    }
}

impl Client {
    /// A handle on the document collection `name` in this client's fabric.
    pub fn collection(&self, name: impl Into<String>) -> DocumentCollection {
        DocumentCollection {
            client: self.clone(),
            name: name.into(),
        }
    }
}

/// A document collection.
#[derive(Clone)]
pub struct DocumentCollection {
    client: Client,
    name: String,
}

impl DocumentCollection {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Collection properties.
    pub async fn get(&self) -> Result<Value> {
        self.client
            .request(
                Request::get(format!("/_api/collection/{}", self.name)),
                |res| Ok(res.data),
            )
            .await
    }

    /// Whether the collection exists.
    pub async fn exists(&self) -> Result<bool> {
        Ok(self
            .get()
            .await
            .absent_on(codes::COLLECTION_NOT_FOUND)?
            .is_some())
    }

    /// Creates the collection with extra `properties` (e.g. `{"waitForSync": true}`).
    pub async fn create(&self, properties: Value) -> Result<Value> {
        let mut body = match properties {
            Value::Object(fields) => fields,
            _ => serde_json::Map::new(),
        };
        body.insert("name".to_string(), Value::String(self.name.clone()));
        self.client
            .request(
                Request::post("/_api/collection").with_json(&body)?,
                |res| Ok(res.data),
            )
            .await
    }

    /// Drops the collection.
    pub async fn drop(&self) -> Result<Value> {
        self.client
            .request(
                Request::delete(format!("/_api/collection/{}", self.name)),
                |res| Ok(res.data),
            )
            .await
    }

    /// Fetches a document by key or id.
    pub async fn document(&self, handle: &str) -> Result<Value> {
        self.document_with(handle, &ReadOptions::default()).await
    }

    /// Fetches a document, returning `None` if it does not exist.
    pub async fn document_opt(&self, handle: &str) -> Result<Option<Value>> {
        self.document(handle)
            .await
            .absent_on(codes::DOCUMENT_NOT_FOUND)
    }

    /// Fetches a document under read preconditions.
    pub async fn document_with(&self, handle: &str, options: &ReadOptions) -> Result<Value> {
        let request = Request::get(format!(
            "/_api/document/{}",
            document_handle(&self.name, handle)
        ));
        self.client
            .request(options.apply(request)?, |res| Ok(res.data))
            .await
    }

    /// Stores a new document.
    pub async fn save<T: Serialize + ?Sized>(
        &self,
        data: &T,
        options: impl Into<WriteOptions>,
    ) -> Result<Value> {
        let request = Request::post(format!("/_api/document/{}", self.name)).with_json(data)?;
        self.client
            .request(options.into().apply(request)?, |res| Ok(res.data))
            .await
    }

    /// Replaces a document.
    pub async fn replace<T: Serialize + ?Sized>(
        &self,
        handle: &str,
        data: &T,
        options: impl Into<WriteOptions>,
    ) -> Result<Value> {
        let request = Request::put(format!(
            "/_api/document/{}",
            document_handle(&self.name, handle)
        ))
        .with_json(data)?;
        self.client
            .request(options.into().apply(request)?, |res| Ok(res.data))
            .await
    }

    /// Partially updates a document.
    pub async fn update<T: Serialize + ?Sized>(
        &self,
        handle: &str,
        data: &T,
        options: impl Into<WriteOptions>,
    ) -> Result<Value> {
        let request = Request::patch(format!(
            "/_api/document/{}",
            document_handle(&self.name, handle)
        ))
        .with_json(data)?;
        self.client
            .request(options.into().apply(request)?, |res| Ok(res.data))
            .await
    }

    /// Removes a document.
    pub async fn remove(&self, handle: &str, options: impl Into<WriteOptions>) -> Result<Value> {
        let request = Request::delete(format!(
            "/_api/document/{}",
            document_handle(&self.name, handle)
        ));
        self.client
            .request(options.into().apply(request)?, |res| Ok(res.data))
            .await
    }

    fn index_handle(&self, name: &str) -> String {
        document_handle(&self.name, name)
    }

    /// Creates an index; the response describes it (`id`, `type`, `isNewlyCreated`, ...).
    pub async fn create_index(&self, spec: &IndexSpec) -> Result<Value> {
        let request = Request::post("/_api/index")
            .with_query_param("collection", self.name.as_str())
            .with_json(spec)?;
        self.client.request(request, |res| Ok(res.data)).await
    }

    pub async fn create_hash_index<I, S>(&self, fields: I) -> Result<Value>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.create_index(&IndexSpec::hash(fields)).await
    }

    pub async fn create_skip_list<I, S>(&self, fields: I) -> Result<Value>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.create_index(&IndexSpec::skiplist(fields)).await
    }

    pub async fn create_persistent_index<I, S>(&self, fields: I) -> Result<Value>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.create_index(&IndexSpec::persistent(fields)).await
    }

    pub async fn create_geo_index<I, S>(&self, fields: I) -> Result<Value>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.create_index(&IndexSpec::geo(fields)).await
    }

    pub async fn create_fulltext_index<I, S>(&self, fields: I) -> Result<Value>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.create_index(&IndexSpec::fulltext(fields)).await
    }

    pub async fn create_ttl_index<I, S>(&self, fields: I, expire_after: u64) -> Result<Value>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.create_index(&IndexSpec::ttl(fields, expire_after)).await
    }

    /// All indexes of the collection.
    pub async fn indexes(&self) -> Result<Vec<Value>> {
        let request =
            Request::get("/_api/index").with_query_param("collection", self.name.as_str());
        self.client
            .request(request, |res| res.field("indexes"))
            .await
    }

    /// One index, by name, id, or `collection/id` handle.
    pub async fn index(&self, name: &str) -> Result<Value> {
        let request = Request::get(format!("/_api/index/{}", self.index_handle(name)));
        self.client.request(request, |res| Ok(res.data)).await
    }

    /// Drops an index; the response carries its `id`.
    pub async fn drop_index(&self, name: &str) -> Result<Value> {
        let request = Request::delete(format!("/_api/index/{}", self.index_handle(name)));
        self.client.request(request, |res| Ok(res.data)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_handle() {
        assert_eq!(document_handle("people", "alice"), "people/alice");
        assert_eq!(document_handle("people", "places/home"), "places/home");
    }

    #[test]
    fn test_write_options_split_rev_and_query() {
        let options = WriteOptions {
            rev: Some("_rev1".to_string()),
            return_new: Some(true),
            ..WriteOptions::default()
        };
        let request = options.apply(Request::put("/_api/document/a/b")).unwrap();
        assert_eq!(request.headers["if-match"], "_rev1");
        assert_eq!(
            request.query_params,
            vec![("returnNew".to_string(), "true".to_string())]
        );
    }

    #[test]
    fn test_read_options_become_headers() {
        let options = ReadOptions {
            if_match: None,
            if_none_match: Some("_rev2".to_string()),
        };
        let request = options.apply(Request::get("/_api/document/a/b")).unwrap();
        assert_eq!(request.headers["if-none-match"], "_rev2");
        assert!(request.headers.get("if-match").is_none());
        assert!(request.query_params.is_empty());
    }

    #[test]
    fn test_ttl_spec_serialization() {
        let spec = IndexSpec::ttl(["createdAt"], 3600);
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({"type": "ttl", "fields": ["createdAt"], "expireAfter": 3600})
        );
    }

    #[test]
    fn test_geo_spec_serialization() {
        let spec = IndexSpec::geo(["value"]).geo_json(true);
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({"type": "geo", "fields": ["value"], "geoJson": true})
        );
    }
}
