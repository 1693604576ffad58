//! Group Orchestrator
//!
//! Wires the components together: configuration, durable storage, the
//! coordinator, the resource-manager driver and the administrative API.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::oneshot;
use tracing::{error, info};

use api_gateway::{listen_addr, ApiServer};
use cli_interface::CliError;
use config::ConfigManager;
use orchestrator_core::{Coordinator, ReconcilerConfig};
use resource_manager::{DriverConfig, MesosSchedulerDriver, SchedulerDriver};
use storage_adapter::{new_storage, StorageOptions};

/// Settings of a framework instance
#[derive(Debug, Clone)]
pub struct FrameworkConfig {
    /// Administrative API address; only its port is used for listening
    pub api: String,
    pub master: String,
    pub framework_name: String,
    pub framework_role: String,
    pub framework_timeout: Duration,
    /// Storage connection string, `file:<path>` or `zk:<host:port>[/chroot]`
    pub storage: String,
    /// Upper bound for each coordination service session
    pub storage_timeout: Duration,
    pub user: String,
    pub bind_ip: Option<IpAddr>,
    pub reconcile: ReconcilerConfig,
    pub resubscribe_delay: Duration,
}

impl FrameworkConfig {
    /// Reads the framework settings from the configuration
    pub fn from_config(config_manager: &ConfigManager) -> Result<Self> {
        let api = config_manager
            .get_optional_string("api")
            .ok_or(CliError::ApiRequired)?;

        let user = config_manager
            .get_optional_string("user")
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "root".to_string());

        let bind_ip = config_manager
            .get_optional_string("bind_ip")
            .map(|ip| ip.parse::<IpAddr>())
            .transpose()
            .context("invalid bind_ip")?;

        let reconcile = ReconcilerConfig {
            delay: config_manager.get_duration("reconcile_delay")?,
            max_tries: config_manager.get_u32("reconcile_max_tries")?,
        };

        Ok(Self {
            api,
            master: config_manager.get_string("master")?,
            framework_name: config_manager.get_string("framework_name")?,
            framework_role: config_manager.get_string("framework_role")?,
            framework_timeout: config_manager.get_duration("framework_timeout")?,
            storage: config_manager.get_string("storage")?,
            storage_timeout: config_manager.get_duration("storage_timeout")?,
            user,
            bind_ip,
            reconcile,
            resubscribe_delay: config_manager.get_duration("resubscribe_delay")?,
        })
    }
}

/// A running framework instance
pub struct Framework {
    coordinator: Arc<Coordinator>,
    driver: Arc<MesosSchedulerDriver>,
    server: ApiServer,
}

impl Framework {
    /// Loads the cluster state and binds the API server
    pub async fn new(config: FrameworkConfig) -> Result<Self> {
        let storage = new_storage(
            &config.storage,
            StorageOptions {
                session_timeout: config.storage_timeout,
            },
        )
        .await
        .with_context(|| format!("failed to open storage {}", config.storage))?;

        let coordinator = Arc::new(Coordinator::new(storage, config.reconcile.clone()).await?);

        let framework_id = coordinator.cluster().framework_id();
        let driver = Arc::new(MesosSchedulerDriver::new(DriverConfig {
            master: config.master.clone(),
            user: config.user.clone(),
            name: config.framework_name.clone(),
            role: config.framework_role.clone(),
            failover_timeout: config.framework_timeout,
            hostname: None,
            bind_ip: config.bind_ip,
            framework_id: Some(framework_id).filter(|id| !id.is_empty()),
            resubscribe_delay: config.resubscribe_delay,
        })?);

        let server = ApiServer::bind(listen_addr(&config.api)?, coordinator.clone())?;

        Ok(Self {
            coordinator,
            driver,
            server,
        })
    }

    pub fn coordinator(&self) -> Arc<Coordinator> {
        self.coordinator.clone()
    }

    /// Address the API server is bound to
    pub fn api_addr(&self) -> Result<SocketAddr> {
        Ok(self.server.local_addr()?)
    }

    /// Runs until the driver stops.
    ///
    /// Ctrl-C stops the driver. Failing to stop it terminates the process.
    pub async fn run(self) -> Result<()> {
        let Framework {
            coordinator,
            driver,
            server,
        } = self;

        let (stop_server, server_stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(server.serve(async move {
            let _ = server_stopped.await;
        }));

        let signal_coordinator = coordinator.clone();
        let signal_driver = driver.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            if let Err(e) = shutdown(&signal_coordinator, signal_driver.as_ref()).await {
                error!("{:#}", e);
                std::process::exit(1);
            }
        });

        info!("Starting scheduler driver");
        driver.run(coordinator).await?;

        let _ = stop_server.send(());
        server.await.context("API server task failed")??;
        Ok(())
    }
}

/// Stops a driver through the coordinator's shutdown path
pub async fn shutdown(coordinator: &Coordinator, driver: &dyn SchedulerDriver) -> Result<()> {
    coordinator
        .shutdown(driver)
        .await
        .context("failed to stop scheduler driver")
}
