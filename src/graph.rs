//! Named graphs, their vertex collections and their edge collections.

use crate::collection::{document_handle, ReadOptions, WriteOptions};
use crate::error::codes;
use crate::{Client, GracefulExt, Request, Result};
use serde::Serialize;
use serde_json::{Map, Value};

impl Client {
    /// A handle on the named graph `name` in this client's fabric.
    pub fn graph(&self, name: impl Into<String>) -> Graph {
        Graph {
            client: self.clone(),
            name: name.into(),
        }
    }
}

/// Merges `name` into a JSON object body; non-object properties are ignored.
fn with_name(properties: Value, name: &str) -> Map<String, Value> {
    let mut body = match properties {
        Value::Object(fields) => fields,
        _ => Map::new(),
    };
    body.insert("name".to_string(), Value::String(name.to_string()));
    body
}

/// A named graph.
///
/// ```no_run
/// use c8_client::{Client, WriteOptions};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), c8_client::Error> {
/// let client = Client::builder().url("https://gdn.example.com")?.build()?;
/// let graph = client.graph("social");
///
/// if !graph.exists().await? {
///     graph
///         .create(json!({
///             "edgeDefinitions": [{
///                 "collection": "knows",
///                 "from": ["people"],
///                 "to": ["people"]
///             }]
///         }))
///         .await?;
/// }
///
/// let knows = graph.edge_collection("knows");
/// knows
///     .save_between(
///         &json!({"since": 2019}),
///         "people/alice",
///         "people/bob",
///         WriteOptions::default(),
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Graph {
    client: Client,
    name: String,
}

impl Graph {
    /// The graph's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn path(&self, rest: &str) -> String {
        if rest.is_empty() {
            format!("/_api/graph/{}", self.name)
        } else {
            format!("/_api/graph/{}/{}", self.name, rest)
        }
    }

    /// The graph definition.
    pub async fn get(&self) -> Result<Value> {
        self.client
            .request(Request::get(self.path("")), |res| res.field("graph"))
            .await
    }

    /// Whether the graph exists.
    pub async fn exists(&self) -> Result<bool> {
        Ok(self
            .get()
            .await
            .absent_on(codes::GRAPH_NOT_FOUND)?
            .is_some())
    }

    /// Creates the graph from `properties` (edge definitions, orphan collections, ...).
    pub async fn create(&self, properties: Value) -> Result<Value> {
        let request = Request::post("/_api/graph").with_json(&with_name(properties, &self.name))?;
        self.client.request(request, |res| res.field("graph")).await
    }

    /// Drops the graph, and its collections when `drop_collections` is set.
    pub async fn drop(&self, drop_collections: bool) -> Result<bool> {
        let request = Request::delete(self.path(""))
            .with_query_param("dropCollections", drop_collections.to_string());
        self.client.request(request, |res| res.field("removed")).await
    }

    /// A handle on the vertex collection `name` within this graph. Makes no request.
    pub fn vertex_collection(&self, name: impl Into<String>) -> GraphVertexCollection {
        GraphVertexCollection {
            graph: self.clone(),
            name: name.into(),
        }
    }

    /// Names of the graph's vertex collections.
    pub async fn list_vertex_collections(&self) -> Result<Vec<String>> {
        self.client
            .request(Request::get(self.path("vertex")), |res| {
                res.field("collections")
            })
            .await
    }

    /// Handles on all of the graph's vertex collections.
    pub async fn vertex_collections(&self) -> Result<Vec<GraphVertexCollection>> {
        let names = self.list_vertex_collections().await?;
        Ok(names
            .into_iter()
            .map(|name| self.vertex_collection(name))
            .collect())
    }

    /// Adds an orphan vertex collection; returns the updated graph.
    pub async fn add_vertex_collection(&self, collection: &str) -> Result<Value> {
        let request = Request::post(self.path("vertex"))
            .with_json(&serde_json::json!({ "collection": collection }))?;
        self.client.request(request, |res| res.field("graph")).await
    }

    /// Removes a vertex collection from the graph; returns the updated graph.
    pub async fn remove_vertex_collection(
        &self,
        collection: &str,
        drop_collection: bool,
    ) -> Result<Value> {
        let request = Request::delete(self.path(&format!("vertex/{}", collection)))
            .with_query_param("dropCollection", drop_collection.to_string());
        self.client.request(request, |res| res.field("graph")).await
    }

    /// A handle on the edge collection `name` within this graph.
    pub fn edge_collection(&self, name: impl Into<String>) -> GraphEdgeCollection {
        GraphEdgeCollection {
            graph: self.clone(),
            name: name.into(),
        }
    }

    /// Names of the graph's edge collections.
    pub async fn list_edge_collections(&self) -> Result<Vec<String>> {
        self.client
            .request(Request::get(self.path("edge")), |res| {
                res.field("collections")
            })
            .await
    }

    /// Handles on all of the graph's edge collections.
    pub async fn edge_collections(&self) -> Result<Vec<GraphEdgeCollection>> {
        let names = self.list_edge_collections().await?;
        Ok(names
            .into_iter()
            .map(|name| self.edge_collection(name))
            .collect())
    }

    /// Adds an edge definition (`{collection, from, to}`); returns the updated graph.
    pub async fn add_edge_definition(&self, definition: Value) -> Result<Value> {
        let request = Request::post(self.path("edge")).with_json(&definition)?;
        self.client.request(request, |res| res.field("graph")).await
    }

    /// Replaces the edge definition named `definition_name`; returns the updated graph.
    pub async fn replace_edge_definition(
        &self,
        definition_name: &str,
        definition: Value,
    ) -> Result<Value> {
        let request =
            Request::put(self.path(&format!("edge/{}", definition_name))).with_json(&definition)?;
        self.client.request(request, |res| res.field("graph")).await
    }

    /// Removes an edge definition, dropping its collection when `drop_collection` is set.
    /// Returns the updated graph.
    pub async fn remove_edge_definition(
        &self,
        definition_name: &str,
        drop_collection: bool,
    ) -> Result<Value> {
        let request = Request::delete(self.path(&format!("edge/{}", definition_name)))
            .with_query_param("dropCollection", drop_collection.to_string());
        self.client.request(request, |res| res.field("graph")).await
    }

    /// Inserts a vertex into `collection` and returns the full response body.
    pub async fn add_vertex_to_collection(
        &self,
        collection: &str,
        properties: Value,
        return_new: bool,
    ) -> Result<Value> {
        let request = Request::post(self.path(&format!("vertex/{}", collection)))
            .with_json(&properties)?
            .with_query_param("returnNew", return_new.to_string());
        self.client.request(request, |res| Ok(res.data)).await
    }

    /// Inserts an edge into `collection` and returns the full response body.
    pub async fn add_edge_to_edge_collection(
        &self,
        collection: &str,
        properties: Value,
        return_new: bool,
    ) -> Result<Value> {
        let request = Request::post(self.path(&format!("edge/{}", collection)))
            .with_json(&properties)?
            .with_query_param("returnNew", return_new.to_string());
        self.client.request(request, |res| Ok(res.data)).await
    }
}

/// A vertex collection seen through a graph.
#[derive(Clone)]
pub struct GraphVertexCollection {
    graph: Graph,
    name: String,
}

impl GraphVertexCollection {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The graph this collection belongs to.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    fn path(&self, handle: &str) -> String {
        self.graph
            .path(&format!("vertex/{}", document_handle(&self.name, handle)))
    }

    /// Fetches a vertex by key or id.
    pub async fn vertex(&self, handle: &str) -> Result<Value> {
        self.vertex_with(handle, &ReadOptions::default()).await
    }

    /// Fetches a vertex, returning `None` if it does not exist.
    pub async fn vertex_opt(&self, handle: &str) -> Result<Option<Value>> {
        self.vertex(handle)
            .await
            .absent_on(codes::DOCUMENT_NOT_FOUND)
    }

    /// Fetches a vertex under `if-match` / `if-none-match` preconditions.
    pub async fn vertex_with(&self, handle: &str, options: &ReadOptions) -> Result<Value> {
        let request = options.apply(Request::get(self.path(handle)))?;
        self.graph
            .client
            .request(request, |res| res.field("vertex"))
            .await
    }

    /// Stores a new vertex; returns the full response body.
    pub async fn save<T: Serialize + ?Sized>(
        &self,
        data: &T,
        options: impl Into<WriteOptions>,
    ) -> Result<Value> {
        let request = Request::post(self.graph.path(&format!("vertex/{}", self.name)))
            .with_json(data)?;
        self.graph
            .client
            .request(options.into().apply(request)?, |res| Ok(res.data))
            .await
    }

    /// Replaces the vertex's body; returns the new revision metadata.
    pub async fn replace<T: Serialize + ?Sized>(
        &self,
        handle: &str,
        data: &T,
        options: impl Into<WriteOptions>,
    ) -> Result<Value> {
        let request = Request::put(self.path(handle)).with_json(data)?;
        self.graph
            .client
            .request(options.into().apply(request)?, |res| res.field("vertex"))
            .await
    }

    /// Merges `data` into the vertex; returns the new revision metadata.
    pub async fn update<T: Serialize + ?Sized>(
        &self,
        handle: &str,
        data: &T,
        options: impl Into<WriteOptions>,
    ) -> Result<Value> {
        let request = Request::patch(self.path(handle)).with_json(data)?;
        self.graph
            .client
            .request(options.into().apply(request)?, |res| res.field("vertex"))
            .await
    }

    /// Removes a vertex; returns the full response body.
    pub async fn remove(&self, handle: &str, options: impl Into<WriteOptions>) -> Result<Value> {
        let request = Request::delete(self.path(handle));
        self.graph
            .client
            .request(options.into().apply(request)?, |res| Ok(res.data))
            .await
    }
}

/// An edge collection seen through a graph.
#[derive(Clone)]
pub struct GraphEdgeCollection {
    graph: Graph,
    name: String,
}

impl GraphEdgeCollection {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The graph this collection belongs to.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    fn path(&self, handle: &str) -> String {
        self.graph
            .path(&format!("edge/{}", document_handle(&self.name, handle)))
    }

    /// Fetches an edge by key or id.
    pub async fn edge(&self, handle: &str) -> Result<Value> {
        self.edge_with(handle, &ReadOptions::default()).await
    }

    /// Fetches an edge, returning `None` if it does not exist.
    pub async fn edge_opt(&self, handle: &str) -> Result<Option<Value>> {
        self.edge(handle).await.absent_on(codes::DOCUMENT_NOT_FOUND)
    }

    /// Fetches an edge under `if-match` / `if-none-match` preconditions.
    pub async fn edge_with(&self, handle: &str, options: &ReadOptions) -> Result<Value> {
        let request = options.apply(Request::get(self.path(handle)))?;
        self.graph
            .client
            .request(request, |res| res.field("edge"))
            .await
    }

    /// Stores an edge whose `_from` and `_to` are already part of `data`.
    pub async fn save<T: Serialize + ?Sized>(
        &self,
        data: &T,
        options: impl Into<WriteOptions>,
    ) -> Result<Value> {
        let request =
            Request::post(self.graph.path(&format!("edge/{}", self.name))).with_json(data)?;
        self.graph
            .client
            .request(options.into().apply(request)?, |res| Ok(res.data))
            .await
    }

    /// Stores an edge between two vertices.
    ///
    /// `from` and `to` are resolved against this collection's name when they are bare keys.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailed`](crate::Error::SerializationFailed) if `data`
    /// does not serialize to a JSON object.
    pub async fn save_between<T: Serialize + ?Sized>(
        &self,
        data: &T,
        from: &str,
        to: &str,
        options: impl Into<WriteOptions>,
    ) -> Result<Value> {
        let mut edge = match serde_json::to_value(data)
            .map_err(|e| crate::Error::SerializationFailed(e.to_string()))?
        {
            Value::Object(fields) => fields,
            other => {
                return Err(crate::Error::SerializationFailed(format!(
                    "edge data must be an object, got {}",
                    other
                )))
            }
        };
        edge.insert(
            "_from".to_string(),
            Value::String(document_handle(&self.name, from)),
        );
        edge.insert(
            "_to".to_string(),
            Value::String(document_handle(&self.name, to)),
        );
        self.save(&edge, options).await
    }

    /// Replaces the edge's body; returns the new revision metadata.
    pub async fn replace<T: Serialize + ?Sized>(
        &self,
        handle: &str,
        data: &T,
        options: impl Into<WriteOptions>,
    ) -> Result<Value> {
        let request = Request::put(self.path(handle)).with_json(data)?;
        self.graph
            .client
            .request(options.into().apply(request)?, |res| res.field("edge"))
            .await
    }

    /// Merges `data` into the edge; returns the new revision metadata.
    pub async fn update<T: Serialize + ?Sized>(
        &self,
        handle: &str,
        data: &T,
        options: impl Into<WriteOptions>,
    ) -> Result<Value> {
        let request = Request::patch(self.path(handle)).with_json(data)?;
        self.graph
            .client
            .request(options.into().apply(request)?, |res| res.field("edge"))
            .await
    }

    /// Removes an edge; returns the service's `removed` flag.
    pub async fn remove(&self, handle: &str, options: impl Into<WriteOptions>) -> Result<bool> {
        let request = Request::delete(self.path(handle));
        self.graph
            .client
            .request(options.into().apply(request)?, |res| res.field("removed"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn graph() -> Graph {
        Client::builder()
            .url("http://localhost:8529")
            .unwrap()
            .build()
            .unwrap()
            .graph("social")
    }

    #[test]
    fn test_with_name_overrides_properties() {
        let body = with_name(json!({"name": "other", "orphanCollections": ["x"]}), "social");
        assert_eq!(body["name"], "social");
        assert_eq!(body["orphanCollections"], json!(["x"]));
        assert_eq!(with_name(Value::Null, "g").len(), 1);
    }

    #[test]
    fn test_vertex_and_edge_paths() {
        let graph = graph();
        assert_eq!(graph.path(""), "/_api/graph/social");
        assert_eq!(
            graph.vertex_collection("people").path("alice"),
            "/_api/graph/social/vertex/people/alice"
        );
        assert_eq!(
            graph.edge_collection("knows").path("places/k1"),
            "/_api/graph/social/edge/places/k1"
        );
    }
}
