//! sapcontrol web service capability and its UNIX-socket SOAP client.

use crate::error::{Error, Result};
use crate::soap::{self, Element};
use crate::types::{
    HaCheck, HaFailoverConfig, InstanceProperty, OsProcess, SapInstance, SystemRequest,
    VersionInfo,
};
use async_trait::async_trait;
use bytes::Bytes;
use hostexec::Context;
use http_body_util::{BodyExt, Full};
use hyper::header::{CONTENT_TYPE, HOST};
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UnixStream;

/// Per-request client-side timeout.
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Socket of the sapstartsrv daemon for `instance_number` (e.g. `"00"`).
pub fn socket_path(instance_number: &str) -> PathBuf {
    PathBuf::from(format!("/tmp/.sapstream5{instance_number}13"))
}

/// The sapcontrol SOAP API as used by the agent.
#[async_trait]
pub trait SapControlWebService: Send + Sync {
    async fn get_instance_properties(&self, ctx: &Context) -> Result<Vec<InstanceProperty>>;

    async fn get_process_list(&self, ctx: &Context) -> Result<Vec<OsProcess>>;

    async fn get_system_instance_list(&self, ctx: &Context) -> Result<Vec<SapInstance>>;

    /// Start the local instance. Returns once the request is accepted.
    async fn start(&self, ctx: &Context) -> Result<()>;

    /// Stop the local instance. Returns once the request is accepted.
    async fn stop(&self, ctx: &Context) -> Result<()>;

    async fn start_system(&self, ctx: &Context, request: &SystemRequest) -> Result<()>;

    async fn stop_system(&self, ctx: &Context, request: &SystemRequest) -> Result<()>;

    async fn ha_check_config(&self, ctx: &Context) -> Result<Vec<HaCheck>>;

    async fn ha_get_failover_config(&self, ctx: &Context) -> Result<HaFailoverConfig>;

    async fn get_version_info(&self, ctx: &Context) -> Result<Vec<VersionInfo>>;
}

/// Builds a web service client for an instance number.
pub trait WebServiceConnector: Send + Sync {
    fn connect(&self, instance_number: &str) -> Arc<dyn SapControlWebService>;
}

/// Connector producing [`SapControlClient`]s on the standard socket path.
#[derive(Debug, Clone)]
pub struct UnixSocketConnector {
    pub timeout: Duration,
}

impl Default for UnixSocketConnector {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CLIENT_TIMEOUT,
        }
    }
}

impl WebServiceConnector for UnixSocketConnector {
    fn connect(&self, instance_number: &str) -> Arc<dyn SapControlWebService> {
        Arc::new(SapControlClient::new(socket_path(instance_number)).with_timeout(self.timeout))
    }
}

/// SOAP 1.1 client talking HTTP/1.1 over a UNIX socket.
///
/// Every call opens its own connection; there is nothing to release.
#[derive(Debug, Clone)]
pub struct SapControlClient {
    socket: PathBuf,
    timeout: Duration,
}

impl SapControlClient {
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self {
            socket: socket.into(),
            timeout: DEFAULT_CLIENT_TIMEOUT,
        }
    }

    pub fn for_instance(instance_number: &str) -> Self {
        Self::new(socket_path(instance_number))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Invoke `action` and return its `<actionResponse>` element.
    async fn call(&self, ctx: &Context, action: &str, params: &str) -> Result<Element> {
        let body = soap::envelope(action, params);
        log::debug!("sapcontrol {} -> {}", action, self.socket.display());

        let exchange = tokio::time::timeout(self.timeout, self.exchange(action, body));
        let xml = match ctx.run(exchange).await? {
            Ok(result) => result?,
            Err(_) => return Err(Error::Timeout(self.timeout)),
        };

        soap::response_body(&xml, action)
    }

    async fn exchange(&self, action: &str, body: String) -> Result<String> {
        let stream = UnixStream::connect(&self.socket)
            .await
            .map_err(|source| Error::Connect {
                path: self.socket.display().to_string(),
                source,
            })?;

        let (mut sender, connection) =
            hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                log::debug!("sapcontrol connection closed with error: {e}");
            }
        });

        let request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(HOST, "localhost")
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"urn:SAPControl#{action}\""))
            .body(Full::new(Bytes::from(body)))?;

        let response = sender.send_request(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let text = String::from_utf8_lossy(&bytes).into_owned();

        // Faults arrive as HTTP 500 with a SOAP body; let the parser report them.
        if !status.is_success() && !text.contains("Fault>") {
            return Err(Error::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

#[async_trait]
impl SapControlWebService for SapControlClient {
    async fn get_instance_properties(&self, ctx: &Context) -> Result<Vec<InstanceProperty>> {
        let body = self.call(ctx, "GetInstanceProperties", "").await?;
        soap::parse_instance_properties(&body)
    }

    async fn get_process_list(&self, ctx: &Context) -> Result<Vec<OsProcess>> {
        let body = self.call(ctx, "GetProcessList", "").await?;
        soap::parse_process_list(&body)
    }

    async fn get_system_instance_list(&self, ctx: &Context) -> Result<Vec<SapInstance>> {
        let body = self.call(ctx, "GetSystemInstanceList", "").await?;
        soap::parse_system_instance_list(&body)
    }

    async fn start(&self, ctx: &Context) -> Result<()> {
        self.call(ctx, "Start", "").await?;
        Ok(())
    }

    async fn stop(&self, ctx: &Context) -> Result<()> {
        self.call(ctx, "Stop", "").await?;
        Ok(())
    }

    async fn start_system(&self, ctx: &Context, request: &SystemRequest) -> Result<()> {
        self.call(ctx, "StartSystem", &soap::system_params(request))
            .await?;
        Ok(())
    }

    async fn stop_system(&self, ctx: &Context, request: &SystemRequest) -> Result<()> {
        self.call(ctx, "StopSystem", &soap::system_params(request))
            .await?;
        Ok(())
    }

    async fn ha_check_config(&self, ctx: &Context) -> Result<Vec<HaCheck>> {
        let body = self.call(ctx, "HACheckConfig", "").await?;
        soap::parse_ha_check_config(&body)
    }

    async fn ha_get_failover_config(&self, ctx: &Context) -> Result<HaFailoverConfig> {
        let body = self.call(ctx, "HAGetFailoverConfig", "").await?;
        soap::parse_ha_failover_config(&body)
    }

    async fn get_version_info(&self, ctx: &Context) -> Result<Vec<VersionInfo>> {
        let body = self.call(ctx, "GetVersionInfo", "").await?;
        soap::parse_version_info(&body)
    }
}
