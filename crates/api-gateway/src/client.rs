//! Typed client for the administrative API

use reqwest::{Client, Response};

use common::constants::{
    GROUP_ADD_PATH, GROUP_LIST_PATH, PARAM_BOOTSTRAP_BROKERS, PARAM_GROUP_ID, PARAM_SUBSCRIPTION,
};
use common::error::{Error, Result};
use common::models::Group;

use crate::error::ErrorResponse;

/// Client for a running orchestrator
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// Base URL, always with a scheme
    url: String,
    client: Client,
}

impl ApiClient {
    /// Creates a client; `http://` is assumed when `url` has no scheme
    pub fn new(url: &str) -> Self {
        let url = if url.starts_with("http://") {
            url.to_string()
        } else {
            format!("http://{}", url)
        };

        Self {
            url: url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Adds a group. `subscription` and `bootstrap_brokers` are comma separated.
    pub async fn add_group(
        &self,
        group_id: &str,
        subscription: &str,
        bootstrap_brokers: &str,
    ) -> Result<()> {
        self.get(
            GROUP_ADD_PATH,
            &[
                (PARAM_GROUP_ID, group_id),
                (PARAM_SUBSCRIPTION, subscription),
                (PARAM_BOOTSTRAP_BROKERS, bootstrap_brokers),
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>> {
        let response = self.get(GROUP_LIST_PATH, &[]).await?;
        response
            .json()
            .await
            .map_err(|e| Error::Http(e.to_string()))
    }

    async fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Response> {
        let response = self
            .client
            .get(format!("{}{}", self.url, endpoint))
            .query(params)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        match serde_json::from_slice::<ErrorResponse>(&body) {
            Ok(envelope) => Err(Error::Api(envelope.error)),
            Err(_) => Err(Error::NonJsonResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use orchestrator_core::{Coordinator, ReconcilerConfig};
    use storage_adapter::FileStorage;
    use tempfile::TempDir;

    use crate::server::ApiServer;

    async fn spawn(router: Router) -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::Server::from_tcp(listener)
                .unwrap()
                .serve(router.into_make_service())
                .await
                .unwrap();
        });
        addr.to_string()
    }

    #[test]
    fn test_url_prefix() {
        assert_eq!(ApiClient::new("127.0.0.1:6666").url(), "http://127.0.0.1:6666");
        assert_eq!(ApiClient::new("http://master:6666/").url(), "http://master:6666");
    }

    #[tokio::test]
    async fn test_against_running_server() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path().join("state.json")));
        let coordinator = Arc::new(
            Coordinator::new(storage, ReconcilerConfig::default())
                .await
                .unwrap(),
        );

        let server = ApiServer::bind("127.0.0.1:0".parse().unwrap(), coordinator).unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.serve(std::future::pending()));

        let client = ApiClient::new(&addr.to_string());
        assert!(client.list_groups().await.unwrap().is_empty());

        client.add_group("foo", "bar", "localhost:9092").await.unwrap();
        let groups = client.list_groups().await.unwrap();
        assert_eq!(
            groups,
            vec![Group::new(
                "foo",
                vec!["bar".to_string()],
                vec!["localhost:9092".to_string()]
            )]
        );

        let err = client.add_group("foo", "bar", "").await.unwrap_err();
        assert!(matches!(err, Error::Api(ref msg) if msg.contains("already exists")));

        let err = client.add_group("", "", "").await.unwrap_err();
        assert_eq!(err.to_string(), "Missing required parameter group-id");
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let router = Router::new().route(
            "/api/group/list",
            get(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    r#"{"error":"error happened"}"#,
                )
            }),
        );
        let client = ApiClient::new(&spawn(router).await);

        let err = client.list_groups().await.unwrap_err();
        assert_eq!(err.to_string(), "error happened");
    }

    #[tokio::test]
    async fn test_non_json_error() {
        let router = Router::new().route(
            "/api/group/add",
            get(|| async { (StatusCode::BAD_GATEWAY, "<html>bad gateway</html>") }),
        );
        let client = ApiClient::new(&spawn(router).await);

        let err = client.add_group("foo", "", "").await.unwrap_err();
        assert!(matches!(err, Error::NonJsonResponse));
    }
}
