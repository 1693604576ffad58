//! HTTP server hosting the API

use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use axum::Router;
use tracing::info;

use common::error::{Error, Result};
use orchestrator_core::Coordinator;

use crate::routes::router;

/// Address the server listens on for a given API address.
///
/// Only the port of `api` is used; the server listens on all interfaces.
pub fn listen_addr(api: &str) -> Result<SocketAddr> {
    let address = api
        .strip_prefix("http://")
        .unwrap_or(api)
        .trim_end_matches('/');
    let port = address
        .rsplit_once(':')
        .and_then(|(_, port)| port.parse::<u16>().ok())
        .ok_or_else(|| Error::Config(format!("API address {} has no port", api)))?;

    Ok(SocketAddr::from(([0, 0, 0, 0], port)))
}

/// Bound API server
pub struct ApiServer {
    listener: TcpListener,
    router: Router,
}

impl ApiServer {
    /// Binds the listening socket
    pub fn bind(addr: SocketAddr, coordinator: Arc<Coordinator>) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            listener,
            router: router(coordinator),
        })
    }

    /// Address actually bound
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves requests until `shutdown` resolves
    pub async fn serve(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        info!("Starting HTTP server at {}", self.local_addr()?);

        axum::Server::from_tcp(self.listener)
            .map_err(|e| Error::Http(e.to_string()))?
            .serve(self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| Error::Http(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listen_addr() {
        assert_eq!(
            listen_addr("http://master:6666").unwrap(),
            "0.0.0.0:6666".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            listen_addr("127.0.0.1:7000").unwrap(),
            "0.0.0.0:7000".parse::<SocketAddr>().unwrap()
        );
        assert!(listen_addr("master").is_err());
    }
}
