//! etcd v2 key/value store client
//!
//! The platform's metadata store is etcd speaking the v2 keys API, which is
//! plain HTTP: `GET/PUT/DELETE {endpoint}/v2/keys{key}`. Directory nodes
//! and value nodes are distinct, matching the [`KvStore`] contract.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use shipway_store::{KvStore, StoreError};

pub struct EtcdKvStore {
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct KeysResponse {
    node: Node,
}

#[derive(Debug, Deserialize)]
struct Node {
    key: Option<String>,
    value: Option<String>,

    #[serde(default)]
    dir: bool,

    #[serde(default)]
    nodes: Vec<Node>,
}

impl EtcdKvStore {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn key_url(&self, key: &str) -> String {
        format!("{}/v2/keys{}", self.endpoint, key)
    }

    async fn request(
        &self,
        operation: &'static str,
        key: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, StoreError> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::operation(operation, key, e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::KeyNotFound(key.to_string()));
        }

        if !response.status().is_success() {
            return Err(StoreError::operation(
                operation,
                key,
                format!("etcd returned {}", response.status()),
            ));
        }

        Ok(response)
    }

    async fn parse(
        &self,
        operation: &'static str,
        key: &str,
        response: reqwest::Response,
    ) -> Result<KeysResponse, StoreError> {
        response
            .json()
            .await
            .map_err(|e| StoreError::operation(operation, key, e.to_string()))
    }
}

/// Collect the value-node keys of a subtree, sorted.
fn leaf_keys(node: &Node, out: &mut Vec<String>) {
    if node.dir {
        for child in &node.nodes {
            leaf_keys(child, out);
        }
    } else if let Some(key) = &node.key {
        out.push(key.clone());
    }
}

#[async_trait]
impl KvStore for EtcdKvStore {
    async fn get(&self, key: &str) -> Result<String, StoreError> {
        let response = self
            .request("get", key, self.client.get(self.key_url(key)))
            .await?;
        let body = self.parse("get", key, response).await?;

        body.node
            .value
            .ok_or_else(|| StoreError::operation("get", key, "key is a directory"))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.request(
            "set",
            key,
            self.client
                .put(self.key_url(key))
                .form(&[("value", value)]),
        )
        .await?;

        Ok(())
    }

    async fn has_key(&self, key: &str) -> bool {
        self.request("get", key, self.client.get(self.key_url(key)))
            .await
            .is_ok()
    }

    async fn list(&self, prefix: &str, recursive: bool) -> Result<Vec<String>, StoreError> {
        let mut request = self
            .client
            .get(self.key_url(prefix))
            .query(&[("sorted", "true")]);
        if recursive {
            request = request.query(&[("recursive", "true")]);
        }

        let response = self.request("list", prefix, request).await?;
        let body = self.parse("list", prefix, response).await?;

        let mut keys = Vec::new();
        leaf_keys(&body.node, &mut keys);
        keys.sort();
        Ok(keys)
    }

    async fn mkdir(&self, key: &str) -> Result<(), StoreError> {
        self.request(
            "mkdir",
            key,
            self.client.put(self.key_url(key)).form(&[("dir", "true")]),
        )
        .await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.request("delete", key, self.client.delete(self.key_url(key)))
            .await?;

        Ok(())
    }

    async fn delete_recursive(&self, key: &str) -> Result<(), StoreError> {
        self.request(
            "delete",
            key,
            self.client
                .delete(self.key_url(key))
                .query(&[("recursive", "true")]),
        )
        .await?;

        Ok(())
    }
}
