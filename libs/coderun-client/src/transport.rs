/// Transport Adapters - Request/Response and Message-Stream Primitives
///
/// **Critical Architectural Boundary:**
/// - Adapters know HOW to reach the backend (reqwest, WebSocket)
/// - Adapters do NOT interpret status codes or bodies
/// - The acquisition state machine only sees these traits, so tests can
///   script a backend without a network
use crate::error::TransportError;
use async_trait::async_trait;
use coderun_common::endpoints::{join_url, stream_url};
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

/// Raw HTTP reply; status and body are interpreted by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

#[async_trait]
pub trait HttpTransport: std::fmt::Debug + Send + Sync {
    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
        token: Option<&str>,
    ) -> Result<HttpReply, TransportError>;

    async fn get(&self, path: &str, token: Option<&str>) -> Result<HttpReply, TransportError>;
}

/// An open, exclusively owned message channel
#[async_trait]
pub trait MessageStream: Send {
    /// Next text message; `None` once the peer closed the channel
    async fn next_text(&mut self) -> Option<Result<String, TransportError>>;

    async fn close(&mut self);
}

#[async_trait]
pub trait StreamConnector: std::fmt::Debug + Send + Sync {
    async fn open(&self, path: &str) -> Result<Box<dyn MessageStream>, TransportError>;
}

/// reqwest-backed HTTP adapter
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    fn authorize(request: reqwest::RequestBuilder, token: Option<&str>) -> reqwest::RequestBuilder {
        match token.filter(|t| !t.is_empty()) {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(request: reqwest::RequestBuilder) -> Result<HttpReply, TransportError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpReply { status, body })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
        token: Option<&str>,
    ) -> Result<HttpReply, TransportError> {
        let url = join_url(&self.base_url, path);
        debug!(url = %url, "POST");
        let request = Self::authorize(self.client.post(url).json(body), token);
        Self::send(request).await
    }

    async fn get(&self, path: &str, token: Option<&str>) -> Result<HttpReply, TransportError> {
        let url = join_url(&self.base_url, path);
        debug!(url = %url, "GET");
        let request = Self::authorize(self.client.get(url), token);
        Self::send(request).await
    }
}

/// WebSocket adapter; the stream URL is the API origin with `ws(s)://`
#[derive(Debug, Clone)]
pub struct WsConnector {
    base_url: String,
}

impl WsConnector {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl StreamConnector for WsConnector {
    async fn open(&self, path: &str) -> Result<Box<dyn MessageStream>, TransportError> {
        let url = stream_url(&self.base_url, path);
        debug!(url = %url, "Opening progress stream");
        let (socket, _response) = connect_async(url.as_str()).await?;
        Ok(Box::new(WsStream { socket }))
    }
}

struct WsStream {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl MessageStream for WsStream {
    async fn next_text(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.socket.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(_)) => return None,
                // ping/pong are answered by tungstenite; binary frames are not part of the protocol
                Ok(_) => continue,
                Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed) => return None,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.socket.close(None).await {
            debug!(error = %e, "Progress stream already closed");
        }
    }
}
