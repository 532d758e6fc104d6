//! WebSocket transport implementation.
//!
//! Dials the room server with tokio-tungstenite and translates the socket's
//! message stream into decoded protocol events plus a single close record.

use async_trait::async_trait;
use confab_protocol::close::NO_STATUS_CLOSE_CODE;
use confab_protocol::{codec, Event, Request};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        protocol::{frame::coding::CloseCode, CloseFrame},
        Error as WsError, Message,
    },
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, warn};

use crate::traits::{CloseInfo, Connection, Connector, TransportError};

/// WebSocket connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    /// Create a new WebSocket connector.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        debug!(%url, "WebSocket handshake completed");

        Ok(Box::new(WebSocketConnection::new(stream)))
    }

    fn name(&self) -> &'static str {
        "websocket"
    }
}

/// A WebSocket connection to a room server.
pub struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    open: bool,
    close_info: Option<CloseInfo>,
}

impl WebSocketConnection {
    fn new(stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Self {
        Self {
            stream,
            open: true,
            close_info: None,
        }
    }

    fn mark_closed(&mut self, info: CloseInfo) {
        self.open = false;
        if self.close_info.is_none() {
            self.close_info = Some(info);
        }
    }

    fn decode_frame(text: &str) -> Option<Event> {
        match codec::decode(text) {
            Ok(event) => Some(event),
            Err(e) => {
                debug!("Dropping undecodable frame: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl Connection for WebSocketConnection {
    async fn recv(&mut self) -> Result<Option<Event>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    if let Some(event) = Self::decode_frame(&text) {
                        return Ok(Some(event));
                    }
                    // Dropped frame, keep reading
                }
                Some(Ok(Message::Binary(data))) => {
                    // For compatibility, treat binary frames as text
                    match std::str::from_utf8(&data) {
                        Ok(text) => {
                            if let Some(event) = Self::decode_frame(text) {
                                return Ok(Some(event));
                            }
                        }
                        Err(_) => debug!("Dropping non-UTF-8 binary frame"),
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = self.stream.send(Message::Pong(data)).await {
                        warn!("Failed to send pong: {}", e);
                    }
                }
                Some(Ok(Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    let info = match frame {
                        Some(f) => CloseInfo::new(u16::from(f.code), f.reason.to_string()),
                        None => CloseInfo::new(NO_STATUS_CLOSE_CODE, ""),
                    };
                    debug!(code = info.code, reason = %info.reason, "Received close frame");
                    self.mark_closed(info);
                    return Ok(None);
                }
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    self.mark_closed(CloseInfo::abnormal());
                    return Ok(None);
                }
                Some(Err(e)) => {
                    warn!("WebSocket error: {}", e);
                    self.mark_closed(CloseInfo::abnormal());
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
                None => {
                    debug!("WebSocket stream ended");
                    self.mark_closed(CloseInfo::abnormal());
                    return Ok(None);
                }
            }
        }
    }

    async fn send(&mut self, request: &Request) -> Result<(), TransportError> {
        if !self.open {
            debug!("Send on closed connection dropped");
            return Ok(());
        }

        let text = codec::encode(request).map_err(|e| TransportError::SendFailed(e.to_string()))?;

        self.stream.send(Message::Text(text)).await.map_err(|e| {
            self.mark_closed(CloseInfo::abnormal());
            TransportError::SendFailed(e.to_string())
        })
    }

    async fn close(&mut self, code: u16, reason: &str) {
        if !self.open {
            return;
        }
        self.mark_closed(CloseInfo::new(code, reason));

        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_owned().into(),
        };
        if let Err(e) = self.stream.close(Some(frame)).await {
            debug!("Close handshake failed: {}", e);
        }
    }

    fn close_info(&self) -> Option<&CloseInfo> {
        self.close_info.as_ref()
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confab_protocol::EventType;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    async fn spawn_server<F, Fut>(handler: F) -> String
    where
        F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = accept_async(stream).await.unwrap();
            handler(ws).await;
        });
        format!("ws://{}/ws/test", addr)
    }

    #[tokio::test]
    async fn test_recv_event_then_close_with_reason() {
        let url = spawn_server(|mut ws| async move {
            ws.send(Message::Text(
                r#"{"type":"notice","timestamp":0,"data":"hi"}"#.into(),
            ))
            .await
            .unwrap();
            ws.close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "room.dispose".into(),
            }))
            .await
            .unwrap();
        })
        .await;

        let mut conn = WebSocketConnector::new().connect(&url).await.unwrap();
        assert!(conn.is_open());

        let event = conn.recv().await.unwrap().unwrap();
        assert_eq!(event.event_type(), EventType::Notice);

        assert!(conn.recv().await.unwrap().is_none());
        let info = conn.close_info().unwrap();
        assert_eq!(info.code, 1000);
        assert_eq!(info.reason, "room.dispose");
        assert!(!conn.is_open());
    }

    #[tokio::test]
    async fn test_malformed_frames_are_dropped() {
        let url = spawn_server(|mut ws| async move {
            ws.send(Message::Text("{not json".into())).await.unwrap();
            ws.send(Message::Text(r#"{"type":"peer.rename"}"#.into()))
                .await
                .unwrap();
            ws.send(Message::Text(
                r#"{"type":"peer.join","timestamp":1,"data":{"id":"b2","handle":"bob"}}"#.into(),
            ))
            .await
            .unwrap();
            // Keep the connection up until the client has read everything.
            let _ = ws.next().await;
        })
        .await;

        let mut conn = WebSocketConnector::new().connect(&url).await.unwrap();

        // The two bad frames never surface; the join does.
        let event = conn.recv().await.unwrap().unwrap();
        assert_eq!(event.event_type(), EventType::PeerJoin);
    }

    #[tokio::test]
    async fn test_send_after_close_is_noop() {
        let url = spawn_server(|mut ws| async move {
            ws.close(None).await.unwrap();
        })
        .await;

        let mut conn = WebSocketConnector::new().connect(&url).await.unwrap();
        assert!(conn.recv().await.unwrap().is_none());
        assert_eq!(conn.close_info().unwrap().code, NO_STATUS_CLOSE_CODE);

        // Never errors once closed.
        conn.send(&Request::Typing).await.unwrap();
    }

    #[tokio::test]
    async fn test_local_close_records_code_and_reason() {
        let url = spawn_server(|mut ws| async move {
            while ws.next().await.is_some() {}
        })
        .await;

        let mut conn = WebSocketConnector::new().connect(&url).await.unwrap();
        conn.close(1000, "logout").await;

        assert!(!conn.is_open());
        assert_eq!(conn.close_info().unwrap(), &CloseInfo::new(1000, "logout"));
    }
}
