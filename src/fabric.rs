//! Fabric management and data-center discovery.
//!
//! Fabric administration always runs against the `_system` fabric, whatever fabric the client
//! is currently scoped to. Data-center queries are not fabric-scoped at all.

use crate::client::DEFAULT_FABRIC;
use crate::error::codes;
use crate::hosts::DataCenter;
use crate::{Client, GracefulExt, Request, Result};
use http::Method;
use serde_json::{json, Value};

impl Client {
    fn system(&self) -> Client {
        self.with_fabric(DEFAULT_FABRIC)
    }

    /// Creates a fabric owned by `users`.
    ///
    /// `options` is sent as the fabric's `options` object, e.g. `{"dcList": "eu-1,us-1"}`
    /// (see [`dc_list_string`](crate::util::dc_list_string)).
    pub async fn create_fabric(&self, name: &str, users: &[&str], options: Value) -> Result<Value> {
        let users: Vec<Value> = users
            .iter()
            .map(|username| json!({ "username": username }))
            .collect();
        let request = Request::post("/_api/database").with_json(&json!({
            "name": name,
            "users": users,
            "options": options,
        }))?;
        self.system().request(request, |res| Ok(res.data)).await
    }

    /// Drops a fabric.
    pub async fn drop_fabric(&self, name: &str) -> Result<Value> {
        self.system()
            .request(
                Request::delete(format!("/_api/database/{}", name)),
                |res| Ok(res.data),
            )
            .await
    }

    /// Names of all fabrics visible to the caller.
    pub async fn list_fabrics(&self) -> Result<Vec<String>> {
        self.system()
            .request(Request::get("/_api/database"), |res| res.field("result"))
            .await
    }

    /// Properties of the fabric this client is scoped to.
    pub async fn fabric_info(&self) -> Result<Value> {
        self.request(Request::get("/_api/database/current"), |res| {
            res.field("result")
        })
        .await
    }

    /// Whether the fabric this client is scoped to exists.
    pub async fn fabric_exists(&self) -> Result<bool> {
        Ok(self
            .fabric_info()
            .await
            .absent_on(codes::FABRIC_NOT_FOUND)?
            .is_some())
    }

    /// Every data center of the deployment.
    ///
    /// The result can seed a new client through
    /// [`ClientBuilder::data_centers`](crate::ClientBuilder::data_centers).
    pub async fn edge_locations(&self) -> Result<Vec<DataCenter>> {
        let response = self
            .call::<Vec<DataCenter>>(Request::absolute(Method::GET, "/_api/datacenter/all"))
            .await?;
        tracing::debug!(count = response.data.len(), "Fetched edge locations");
        Ok(response.data)
    }

    /// The data center that answers this client's requests.
    pub async fn local_edge_location(&self) -> Result<DataCenter> {
        self.call::<DataCenter>(Request::absolute(Method::GET, "/_api/datacenter/local"))
            .await
            .map(|response| response.data)
    }
}
