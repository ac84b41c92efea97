//! The pluggable HTTP edge a [`crate::session::Session`] talks through.
//!
//! A webshell round trip is strictly `send(command) -> output`: one HTTP
//! request carrying the profile's secret and the command, one decoded
//! response. Flavor-specific payload framing lives behind this trait;
//! the session layer never sees HTTP, status codes, or envelopes.

use std::time::Duration;

use async_trait::async_trait;
use husk_protocol::SessionInfo;
use tracing::debug;

use crate::error::Result;
use crate::error::SessionError;

/// One round trip to the remote webshell.
///
/// Implementations must bound every call (the remote may hang forever) and
/// surface failures only as [`SessionError`]: connectivity problems as
/// `Network`, undecodable responses as `Unexpected`. Dropping the returned
/// future must cancel the in-flight request.
#[async_trait]
pub trait ShellTransport: Send + Sync {
    async fn send(&self, command: &str) -> Result<String>;
}

/// Pick the transport for a profile's variant tag.
///
/// Every current flavor speaks the same form-POST convention and differs
/// only in its default parameter names (already resolved by
/// [`SessionInfo::params`]), so they share the HTTP implementation. A
/// flavor that needs real payload framing plugs in here as another
/// `ShellTransport`.
pub fn for_profile(
    client: &reqwest::Client,
    info: &SessionInfo,
    request_timeout: Duration,
) -> Box<dyn ShellTransport> {
    Box::new(HttpShellTransport::new(
        client.clone(),
        info.clone(),
        request_timeout,
    ))
}

/// Form-POST transport shared by the PHP/JSP/ASPX flavors.
pub struct HttpShellTransport {
    client: reqwest::Client,
    info: SessionInfo,
    request_timeout: Duration,
}

impl HttpShellTransport {
    pub fn new(client: reqwest::Client, info: SessionInfo, request_timeout: Duration) -> Self {
        Self {
            client,
            info,
            request_timeout,
        }
    }

    async fn round_trip(&self, command: &str) -> Result<String> {
        let (secret_param, command_param) = self.info.params();
        let form = [
            (secret_param, self.info.secret.as_str()),
            (command_param, command),
        ];
        let response = self
            .client
            .post(&self.info.url)
            .form(&form)
            .send()
            .await
            .map_err(SessionError::network)?;
        let status = response.status();
        let body = response.text().await.map_err(SessionError::network)?;
        debug!(
            url = %self.info.url,
            status = status.as_u16(),
            bytes = body.len(),
            "webshell round trip"
        );
        if !status.is_success() {
            return Err(SessionError::unexpected(format!(
                "shell answered with status {status}"
            )));
        }
        self.decode(body)
    }

    /// Strip the response envelope.
    ///
    /// With a boundary marker configured, real output is the text between
    /// the first two marker occurrences. Anything else, typically a login
    /// page or an error page served instead of the shell, fails decoding.
    fn decode(&self, body: String) -> Result<String> {
        let Some(marker) = self.info.marker.as_deref() else {
            return Ok(body);
        };
        let Some(start) = body.find(marker) else {
            return Err(SessionError::unexpected(
                "response carried no output markers",
            ));
        };
        let inner = &body[start + marker.len()..];
        let Some(end) = inner.find(marker) else {
            return Err(SessionError::unexpected(
                "response output marker was not closed",
            ));
        };
        Ok(inner[..end].to_string())
    }
}

#[async_trait]
impl ShellTransport for HttpShellTransport {
    async fn send(&self, command: &str) -> Result<String> {
        match tokio::time::timeout(self.request_timeout, self.round_trip(command)).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::network(format!(
                "request to {} timed out after {:?}",
                self.info.url, self.request_timeout
            ))),
        }
    }
}
