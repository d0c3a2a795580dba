//! Transport seam between the connection manager and the network.
//!
//! A [`Transport`] opens connections; each [`TransportStream`] yields
//! open-connection events until it closes. A successful `connect` is the
//! "open" event.

use async_trait::async_trait;
use futures_util::StreamExt;
use log::debug;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// Non-fatal transport failure.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Event produced by an open connection.
#[derive(Debug)]
pub enum TransportEvent {
    /// Raw inbound payload.
    Message(Vec<u8>),
    /// Transport-level error. A `Closed` event is expected to follow.
    Error(TransportError),
    /// The connection is gone.
    Closed,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn TransportStream>, TransportError>;
}

#[async_trait]
pub trait TransportStream: Send {
    /// Wait for the next event. Once `Closed` is returned the stream is done.
    async fn next_event(&mut self) -> TransportEvent;

    /// Close the connection. Errors are ignored.
    async fn close(&mut self);
}

/// WebSocket transport backed by `tokio-tungstenite`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketTransport;

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn TransportStream>, TransportError> {
        let (ws, response) = connect_async(endpoint).await?;
        debug!("[Feed] WebSocket handshake status: {}", response.status());
        Ok(Box::new(WebSocketConnection { ws, errored: false }))
    }
}

struct WebSocketConnection {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    errored: bool,
}

#[async_trait]
impl TransportStream for WebSocketConnection {
    async fn next_event(&mut self) -> TransportEvent {
        // After an error the socket is unusable; report the close next.
        if self.errored {
            return TransportEvent::Closed;
        }

        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return TransportEvent::Message(text.as_str().as_bytes().to_vec());
                }
                Some(Ok(Message::Binary(data))) => return TransportEvent::Message(data.to_vec()),
                Some(Ok(Message::Close(frame))) => {
                    debug!("[Feed] Close frame received: {:?}", frame);
                    return TransportEvent::Closed;
                }
                // Ping/pong are answered by tungstenite itself
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    self.errored = true;
                    return TransportEvent::Error(e.into());
                }
                None => return TransportEvent::Closed,
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.ws.close(None).await {
            debug!("[Feed] Error while closing WebSocket: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::SinkExt;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    async fn local_server() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        (listener, url)
    }

    #[tokio::test]
    async fn test_connect_refused_is_error() {
        let (listener, url) = local_server().await;
        drop(listener);
        assert!(WebSocketTransport.connect(&url).await.is_err());
    }

    #[tokio::test]
    async fn test_messages_then_close() {
        let (listener, url) = local_server().await;
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            ws.send(Message::Text(
                r#"{"groupName":"A","temperature":19.0,"humidity":55.2}"#
                    .to_string()
                    .into(),
            ))
            .await
            .unwrap();
            ws.send(Message::Binary(b"raw".to_vec().into())).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let mut stream = WebSocketTransport.connect(&url).await.unwrap();
        match stream.next_event().await {
            TransportEvent::Message(payload) => {
                assert_eq!(
                    payload,
                    br#"{"groupName":"A","temperature":19.0,"humidity":55.2}"#.to_vec()
                );
            }
            other => panic!("unexpected event: {:?}", other),
        }
        match stream.next_event().await {
            TransportEvent::Message(payload) => assert_eq!(payload, b"raw".to_vec()),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(stream.next_event().await, TransportEvent::Closed));

        server.await.unwrap();
    }
}
