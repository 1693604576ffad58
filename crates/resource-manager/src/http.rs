//! Mesos v1 scheduler HTTP API driver
//!
//! The driver keeps one long-lived SUBSCRIBE request open. Its response body is
//! a RecordIO stream of JSON events which are decoded and dispatched to a
//! [`Scheduler`] one at a time. Calls back to the master (RECONCILE, KILL,
//! ACKNOWLEDGE, TEARDOWN) are separate POSTs carrying the `Mesos-Stream-Id`
//! handed out at subscription time.

use std::io;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use futures::StreamExt;
use parking_lot::RwLock;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use common::error::{Error, Result};
use common::models::{Attribute, MasterInfo, Offer, Resource, TaskState, TaskStatus};

use crate::driver::SchedulerDriver;
use crate::recordio::RecordIoCodec;
use crate::scheduler::Scheduler;

const SCHEDULER_PATH: &str = "/api/v1/scheduler";
const STREAM_ID_HEADER: &str = "Mesos-Stream-Id";

/// Framework registration settings
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Master address, `host:port` with an optional `http://` scheme
    pub master: String,
    /// User tasks run as
    pub user: String,
    /// Framework name
    pub name: String,
    /// Framework role
    pub role: String,
    /// How long the master keeps the framework alive while disconnected
    pub failover_timeout: Duration,
    /// Hostname advertised to the master
    pub hostname: Option<String>,
    /// Local address outgoing connections are bound to
    pub bind_ip: Option<IpAddr>,
    /// Identity from an earlier registration
    pub framework_id: Option<String>,
    /// Pause before subscribing again after the event stream ends
    pub resubscribe_delay: Duration,
}

/// Scheduler driver speaking the Mesos v1 HTTP API
pub struct MesosSchedulerDriver {
    config: DriverConfig,

    client: Client,

    /// Scheduler endpoint on the master
    endpoint: String,

    /// Identity assigned by the master
    framework_id: RwLock<Option<String>>,

    /// Stream id of the current subscription
    stream_id: RwLock<Option<String>>,

    /// Cancelled by `stop`
    shutdown: CancellationToken,
}

impl MesosSchedulerDriver {
    /// Creates a driver. Nothing is sent before [`run`](Self::run) is called.
    pub fn new(config: DriverConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("group-orchestrator/", env!("CARGO_PKG_VERSION")))
            .local_address(config.bind_ip)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        let base = if config.master.starts_with("http://") || config.master.starts_with("https://")
        {
            config.master.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", config.master.trim_end_matches('/'))
        };

        Ok(Self {
            endpoint: format!("{}{}", base, SCHEDULER_PATH),
            framework_id: RwLock::new(config.framework_id.clone().filter(|id| !id.is_empty())),
            stream_id: RwLock::new(None),
            shutdown: CancellationToken::new(),
            client,
            config,
        })
    }

    /// Framework identity, once known
    pub fn framework_id(&self) -> Option<String> {
        self.framework_id.read().clone()
    }

    /// Subscribes and dispatches events until [`stop`](SchedulerDriver::stop) is called.
    ///
    /// When the event stream ends or the subscription fails the scheduler is told
    /// it was disconnected and the driver subscribes again after
    /// `resubscribe_delay`.
    pub async fn run(self: Arc<Self>, scheduler: Arc<dyn Scheduler>) -> Result<()> {
        let driver: Arc<dyn SchedulerDriver> = self.clone();

        while !self.shutdown.is_cancelled() {
            match self.subscribe(scheduler.as_ref(), &driver).await {
                Ok(()) => info!("Event stream from {} closed", self.endpoint),
                Err(e) => warn!("Subscription to {} failed: {}", self.endpoint, e),
            }

            if self.stream_id.write().take().is_some() {
                scheduler.disconnected(driver.clone()).await;
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.resubscribe_delay) => {}
            }
        }

        info!("Scheduler driver stopped");
        Ok(())
    }

    async fn subscribe(
        &self,
        scheduler: &dyn Scheduler,
        driver: &Arc<dyn SchedulerDriver>,
    ) -> Result<()> {
        let call = subscribe_call(&self.config, self.framework_id().as_deref());
        debug!("Subscribing to {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .json(&call)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Driver(format!(
                "SUBSCRIBE rejected with {}: {}",
                status, body
            )));
        }

        let stream_id = response
            .headers()
            .get(STREAM_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| Error::Driver(format!("Missing {} header", STREAM_ID_HEADER)))?;
        *self.stream_id.write() = Some(stream_id);

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| io::Error::new(io::ErrorKind::Other, e)));
        let mut records = Box::pin(FramedRead::new(
            StreamReader::new(body),
            RecordIoCodec::new(),
        ));

        loop {
            let record = tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                record = records.next() => record,
            };

            let Some(record) = record else {
                return Ok(());
            };
            let Some(event) = decode_event(&record?) else {
                continue;
            };
            self.dispatch(event, scheduler, driver).await;
        }
    }

    async fn dispatch(
        &self,
        event: wire::Event,
        scheduler: &dyn Scheduler,
        driver: &Arc<dyn SchedulerDriver>,
    ) {
        match event.kind.as_str() {
            "SUBSCRIBED" => {
                let Some(subscribed) = event.subscribed else {
                    warn!("SUBSCRIBED event without payload");
                    return;
                };
                let master = subscribed
                    .master_info
                    .map(wire::MasterInfo::into_model)
                    .unwrap_or_else(|| master_from_address(&self.config.master));
                let id = subscribed.framework_id.value;
                let previous = self.framework_id.write().replace(id.clone());

                if previous.is_some() {
                    scheduler.reregistered(driver.clone(), &master).await;
                } else {
                    scheduler.registered(driver.clone(), &id, &master).await;
                }
            }
            "OFFERS" => {
                if let Some(offers) = event.offers {
                    let offers: Vec<Offer> =
                        offers.offers.into_iter().map(wire::Offer::into_model).collect();
                    scheduler.resource_offers(driver.clone(), &offers).await;
                }
            }
            "RESCIND" => {
                if let Some(rescind) = event.rescind {
                    scheduler
                        .offer_rescinded(driver.clone(), &rescind.offer_id.value)
                        .await;
                }
            }
            "UPDATE" => {
                if let Some(update) = event.update {
                    let status = update.status.into_model();
                    scheduler.status_update(driver.clone(), &status).await;

                    if let Err(e) = self.acknowledge(&status).await {
                        warn!("Failed to acknowledge update for {}: {}", status.task_id, e);
                    }
                }
            }
            "MESSAGE" => {
                if let Some(message) = event.message {
                    let data = base64::engine::general_purpose::STANDARD
                        .decode(message.data.as_bytes())
                        .map(|raw| String::from_utf8_lossy(&raw).into_owned())
                        .unwrap_or(message.data);
                    scheduler
                        .framework_message(
                            driver.clone(),
                            &message.executor_id.value,
                            &message.agent_id.value,
                            &data,
                        )
                        .await;
                }
            }
            "FAILURE" => {
                if let Some(failure) = event.failure {
                    let agent_id = failure.agent_id.map(|a| a.value).unwrap_or_default();
                    match failure.executor_id {
                        Some(executor_id) => {
                            scheduler
                                .executor_lost(
                                    driver.clone(),
                                    &executor_id.value,
                                    &agent_id,
                                    failure.status.unwrap_or_default(),
                                )
                                .await
                        }
                        None => scheduler.agent_lost(driver.clone(), &agent_id).await,
                    }
                }
            }
            "ERROR" => {
                let message = event.error.map(|e| e.message).unwrap_or_default();
                scheduler.error(driver.clone(), &message).await;
            }
            "HEARTBEAT" => debug!("Heartbeat from {}", self.endpoint),
            other => debug!("Ignoring {} event", other),
        }
    }

    async fn acknowledge(&self, status: &TaskStatus) -> Result<()> {
        let (Some(uuid), Some(agent_id)) = (&status.uuid, &status.agent_id) else {
            return Ok(());
        };

        self.call(
            "ACKNOWLEDGE",
            json!({
                "acknowledge": {
                    "agent_id": { "value": agent_id },
                    "task_id": { "value": status.task_id },
                    "uuid": uuid,
                }
            }),
        )
        .await
    }

    /// Sends a call on the current subscription
    async fn call(&self, kind: &str, payload: Value) -> Result<()> {
        let stream_id = self.stream_id.read().clone().ok_or(Error::NotRegistered)?;
        let framework_id = self.framework_id().ok_or(Error::NotRegistered)?;

        let mut call = json!({
            "framework_id": { "value": framework_id },
            "type": kind,
        });
        if let (Some(call), Value::Object(payload)) = (call.as_object_mut(), payload) {
            call.extend(payload);
        }

        let response = self
            .client
            .post(&self.endpoint)
            .header(STREAM_ID_HEADER, stream_id)
            .json(&call)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::Driver(format!("{} rejected with {}: {}", kind, status, body)))
        }
    }
}

#[async_trait]
impl SchedulerDriver for MesosSchedulerDriver {
    async fn reconcile_tasks(&self, statuses: Vec<TaskStatus>) -> Result<()> {
        self.call("RECONCILE", reconcile_payload(&statuses)).await
    }

    async fn kill_task(&self, task_id: &str) -> Result<()> {
        self.call("KILL", json!({ "kill": { "task_id": { "value": task_id } } }))
            .await
    }

    async fn stop(&self) -> Result<()> {
        let result = if self.stream_id.read().is_some() {
            self.call("TEARDOWN", json!({})).await
        } else {
            Ok(())
        };
        self.shutdown.cancel();
        result
    }
}

fn subscribe_call(config: &DriverConfig, framework_id: Option<&str>) -> Value {
    let mut framework_info = json!({
        "user": config.user,
        "name": config.name,
        "role": config.role,
        "failover_timeout": config.failover_timeout.as_secs_f64(),
        "checkpoint": true,
    });
    if let Some(hostname) = &config.hostname {
        framework_info["hostname"] = json!(hostname);
    }

    let mut call = json!({
        "type": "SUBSCRIBE",
        "subscribe": { "framework_info": framework_info },
    });
    if let Some(id) = framework_id {
        call["framework_id"] = json!({ "value": id });
        call["subscribe"]["framework_info"]["id"] = json!({ "value": id });
    }
    call
}

fn reconcile_payload(statuses: &[TaskStatus]) -> Value {
    let tasks: Vec<Value> = statuses
        .iter()
        .map(|status| {
            let mut task = json!({ "task_id": { "value": status.task_id } });
            if let Some(agent_id) = &status.agent_id {
                task["agent_id"] = json!({ "value": agent_id });
            }
            task
        })
        .collect();
    json!({ "reconcile": { "tasks": tasks } })
}

fn master_from_address(address: &str) -> MasterInfo {
    let address = address
        .trim_start_matches("http://")
        .trim_start_matches("https://");
    match address.rsplit_once(':') {
        Some((host, port)) => MasterInfo {
            hostname: host.to_string(),
            port: port.trim_end_matches('/').parse().unwrap_or(5050),
        },
        None => MasterInfo {
            hostname: address.to_string(),
            port: 5050,
        },
    }
}

/// JSON shapes of the v1 scheduler events
mod wire {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct Id {
        pub value: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct Event {
        #[serde(rename = "type")]
        pub kind: String,
        pub subscribed: Option<Subscribed>,
        pub offers: Option<Offers>,
        pub rescind: Option<Rescind>,
        pub update: Option<Update>,
        pub message: Option<Message>,
        pub failure: Option<Failure>,
        pub error: Option<ErrorEvent>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Subscribed {
        pub framework_id: Id,
        pub master_info: Option<MasterInfo>,
    }

    #[derive(Debug, Deserialize)]
    pub struct MasterInfo {
        pub hostname: Option<String>,
        pub ip: Option<u32>,
        pub port: u16,
    }

    impl MasterInfo {
        pub fn into_model(self) -> super::MasterInfo {
            let hostname = match (self.hostname, self.ip) {
                (Some(hostname), _) => hostname,
                // The master reports its address in network byte order
                (None, Some(ip)) => std::net::Ipv4Addr::from(u32::from_be(ip)).to_string(),
                (None, None) => String::new(),
            };
            super::MasterInfo {
                hostname,
                port: self.port,
            }
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct Offers {
        #[serde(default)]
        pub offers: Vec<Offer>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Offer {
        pub id: Id,
        pub agent_id: Id,
        pub hostname: String,
        #[serde(default)]
        pub resources: Vec<Resource>,
        #[serde(default)]
        pub attributes: Vec<Attribute>,
    }

    impl Offer {
        pub fn into_model(self) -> super::Offer {
            super::Offer {
                id: self.id.value,
                agent_id: self.agent_id.value,
                hostname: self.hostname,
                resources: self.resources.into_iter().map(Resource::into_model).collect(),
                attributes: self
                    .attributes
                    .into_iter()
                    .map(Attribute::into_model)
                    .collect(),
            }
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct Scalar {
        pub value: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct Text {
        pub value: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct Range {
        pub begin: u64,
        pub end: u64,
    }

    #[derive(Debug, Deserialize)]
    pub struct Ranges {
        #[serde(default)]
        pub range: Vec<Range>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Resource {
        pub name: String,
        pub scalar: Option<Scalar>,
        pub ranges: Option<Ranges>,
    }

    impl Resource {
        pub fn into_model(self) -> super::Resource {
            super::Resource {
                name: self.name,
                scalar: self.scalar.map(|s| s.value),
                ranges: self
                    .ranges
                    .map(|r| r.range.into_iter().map(|r| (r.begin, r.end)).collect())
                    .unwrap_or_default(),
            }
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct Attribute {
        pub name: String,
        pub text: Option<Text>,
        pub scalar: Option<Scalar>,
    }

    impl Attribute {
        pub fn into_model(self) -> super::Attribute {
            super::Attribute {
                name: self.name,
                text: self.text.map(|t| t.value),
                scalar: self.scalar.map(|s| s.value),
            }
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct Rescind {
        pub offer_id: Id,
    }

    #[derive(Debug, Deserialize)]
    pub struct Update {
        pub status: Status,
    }

    #[derive(Debug, Deserialize)]
    pub struct Status {
        pub task_id: Id,
        pub state: TaskState,
        pub agent_id: Option<Id>,
        pub reason: Option<String>,
        pub message: Option<String>,
        pub uuid: Option<String>,
    }

    impl Status {
        pub fn into_model(self) -> TaskStatus {
            TaskStatus {
                task_id: self.task_id.value,
                state: self.state,
                agent_id: self.agent_id.map(|a| a.value),
                reason: self.reason,
                message: self.message,
                uuid: self.uuid,
            }
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct Message {
        pub agent_id: Id,
        pub executor_id: Id,
        #[serde(default)]
        pub data: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct Failure {
        pub agent_id: Option<Id>,
        pub executor_id: Option<Id>,
        pub status: Option<i32>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ErrorEvent {
        pub message: String,
    }
}

/// Parses one event record. Undecodable records are logged and skipped.
fn decode_event(record: &[u8]) -> Option<wire::Event> {
    match serde_json::from_slice(record) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(
                "Skipping undecodable event {}: {}",
                String::from_utf8_lossy(record),
                e
            );
            None
        }
    }
}
