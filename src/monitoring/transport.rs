//! Push channel transport
//!
//! The session manager only sees text frames through `PushChannel`; the
//! WebSocket implementation lives behind `PushConnector` so tests can script
//! connections without a socket.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::config::ApiConfig;
use crate::error::{AppError, AppResult};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One open push connection
#[async_trait]
pub trait PushChannel: Send {
    /// Send a text frame
    async fn send_text(&mut self, text: &str) -> AppResult<()>;

    /// Next inbound text frame; `None` once the channel is closed
    async fn recv(&mut self) -> Option<AppResult<String>>;

    /// Close the channel, ignoring errors
    async fn close(&mut self);
}

/// Opens push connections for a wallet address
#[async_trait]
pub trait PushConnector: Send + Sync {
    async fn connect(&self, wallet_address: &str) -> AppResult<Box<dyn PushChannel>>;
}

/// WebSocket connector for `/ws/?wallet_address=...`
#[derive(Debug, Clone)]
pub struct WsConnector {
    api: ApiConfig,
}

impl WsConnector {
    pub fn new(api: ApiConfig) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PushConnector for WsConnector {
    async fn connect(&self, wallet_address: &str) -> AppResult<Box<dyn PushChannel>> {
        let url = self
            .api
            .push_url(wallet_address)
            .map_err(|e| AppError::Transport(e.to_string()))?;

        tracing::debug!(url = %url, "Opening push channel");
        let (stream, response) = connect_async(url.as_str()).await?;
        tracing::debug!(status = %response.status(), "Push channel upgraded");

        Ok(Box::new(WsChannel { stream }))
    }
}

/// Open WebSocket push channel
pub struct WsChannel {
    stream: WsStream,
}

#[async_trait]
impl PushChannel for WsChannel {
    async fn send_text(&mut self, text: &str) -> AppResult<()> {
        self.stream.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<AppResult<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => tracing::debug!("Skipping non-UTF-8 binary frame"),
                },
                Ok(Message::Close(frame)) => {
                    tracing::debug!(?frame, "Push channel closed by server");
                    return None;
                }
                // Control frames are answered by tungstenite
                Ok(_) => continue,
                Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                    return None
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::trace!(error = %e, "Push channel close error ignored");
        }
    }
}
