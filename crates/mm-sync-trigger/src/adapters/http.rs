//! HTTP/1.1 command endpoint over a pre-connected TCP stream.
//!
//! `prepare` connects, runs the hyper client handshake and builds the whole
//! `POST` request. After the wait, `send` only hands the request to the
//! already-running connection. Just the response head is read; the body is
//! dropped.

use std::fmt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::client::conn::http1::{self, SendRequest};
use hyper::header::{CONNECTION, CONTENT_TYPE, HOST};
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::domain::{CommandStatus, DispatchError, DispatchPhase, RelayPayload};
use crate::ports::{CommandEndpoint, PreparedCommand};

/// Default JSON-RPC path of the local media player.
pub const DEFAULT_ENDPOINT_PATH: &str = "/jsonrpc";

type CommandBody = Full<Bytes>;
type PendingResponse = Pin<Box<dyn Future<Output = hyper::Result<Response<Incoming>>> + Send>>;

/// Command endpoint reached over HTTP on a local TCP port.
#[derive(Debug, Clone)]
pub struct HttpCommandEndpoint {
    addr: SocketAddr,
    path: String,
    io_timeout: Duration,
}

impl HttpCommandEndpoint {
    /// # Arguments
    ///
    /// * `addr` - Endpoint address, normally on loopback
    /// * `path` - Request target, e.g. `/jsonrpc`
    /// * `io_timeout` - Bound applied to connect, handshake and response separately
    pub fn new(addr: SocketAddr, path: impl Into<String>, io_timeout: Duration) -> Self {
        Self {
            addr,
            path: path.into(),
            io_timeout,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn build_request(&self, payload: &RelayPayload) -> Result<Request<CommandBody>, DispatchError> {
        Request::builder()
            .method(Method::POST)
            .uri(self.path.as_str())
            .header(HOST, self.addr.to_string())
            .header(CONTENT_TYPE, "application/json")
            .header(CONNECTION, "close")
            .body(Full::new(payload.to_bytes()))
            .map_err(|e| DispatchError::InvalidRequest(e.to_string()))
    }

    fn connect_error(&self, source: io::Error) -> DispatchError {
        DispatchError::Connect {
            addr: self.addr,
            source,
        }
    }

    fn connect_timeout(&self) -> DispatchError {
        DispatchError::Timeout {
            phase: DispatchPhase::Connect,
            timeout: self.io_timeout,
        }
    }
}

#[async_trait]
impl CommandEndpoint for HttpCommandEndpoint {
    type Prepared = HttpPreparedCommand;

    async fn prepare(&self, payload: &RelayPayload) -> Result<Self::Prepared, DispatchError> {
        let request = self.build_request(payload)?;

        let stream = timeout(self.io_timeout, TcpStream::connect(self.addr))
            .await
            .map_err(|_| self.connect_timeout())?
            .map_err(|e| self.connect_error(e))?;
        stream.set_nodelay(true).map_err(|e| self.connect_error(e))?;

        let mut builder = http1::Builder::new();
        builder.title_case_headers(true);
        let (mut sender, connection) = builder
            .handshake::<_, CommandBody>(TokioIo::new(stream))
            .await
            .map_err(|e| self.connect_error(io::Error::other(e)))?;

        let addr = self.addr;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!(%addr, error = %e, "command connection ended with error");
            }
        });

        timeout(self.io_timeout, sender.ready())
            .await
            .map_err(|_| self.connect_timeout())?
            .map_err(|e| self.connect_error(io::Error::other(e)))?;

        trace!(%addr, payload_bytes = payload.len(), "command pre-connected");
        Ok(HttpPreparedCommand {
            sender,
            request: Some(request),
            pending: None,
            io_timeout: self.io_timeout,
        })
    }
}

/// Open connection plus the built request waiting to be sent.
///
/// Dropping it closes the connection without writing anything.
pub struct HttpPreparedCommand {
    sender: SendRequest<CommandBody>,
    request: Option<Request<CommandBody>>,
    pending: Option<PendingResponse>,
    io_timeout: Duration,
}

impl fmt::Debug for HttpPreparedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpPreparedCommand")
            .field("sent", &self.request.is_none())
            .field("io_timeout", &self.io_timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PreparedCommand for HttpPreparedCommand {
    async fn send(&mut self) -> Result<(), DispatchError> {
        let request = self
            .request
            .take()
            .ok_or_else(|| DispatchError::Send(io::Error::other("command already sent")))?;
        if self.sender.is_closed() {
            return Err(DispatchError::Send(io::Error::from(
                io::ErrorKind::ConnectionAborted,
            )));
        }

        self.pending = Some(Box::pin(self.sender.send_request(request)));
        // Let the connection task write the request now.
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn response(&mut self) -> Result<CommandStatus, DispatchError> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| DispatchError::Response(io::Error::other("command not sent")))?;

        let response = timeout(self.io_timeout, pending)
            .await
            .map_err(|_| DispatchError::Timeout {
                phase: DispatchPhase::Response,
                timeout: self.io_timeout,
            })?
            .map_err(response_error)?;

        Ok(CommandStatus(response.status().as_u16()))
    }
}

fn response_error(e: hyper::Error) -> DispatchError {
    if e.is_parse() || e.is_parse_status() {
        DispatchError::BadStatusLine(e.to_string())
    } else {
        DispatchError::Response(io::Error::other(e))
    }
}
