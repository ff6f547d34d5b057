//! WebSocket transport implementation using `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::error::{CapacityError, Error as WsError};
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, WebSocketConfig};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, warn};

use crate::{Connection, ConnectionConfig, ConnectionId, Transport, TransportError};

/// The WebSocket protocol settings for `config`.
///
/// Caps frames and messages at `max_message_size`, so an oversized frame
/// is refused from its header instead of being read into memory.
pub fn websocket_config(config: &ConnectionConfig) -> WebSocketConfig {
    let mut ws = WebSocketConfig::default();
    ws.max_message_size = Some(config.max_message_size);
    ws.max_frame_size = Some(config.max_message_size);
    ws
}

/// A WebSocket-based [`Transport`] that upgrades HTTP requests made to a
/// single path.
pub struct WebSocketTransport {
    listener: TcpListener,
    path: String,
    config: ConnectionConfig,
    next_id: u64,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address. Only upgrade
    /// requests for `path` are accepted.
    pub async fn bind(
        addr: &str,
        path: &str,
        config: ConnectionConfig,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, path, "WebSocket transport listening");
        Ok(Self {
            listener,
            path: path.to_string(),
            config,
            next_id: 1,
        })
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let path = self.path.clone();
        let check_path = move |req: &Request, resp: Response| {
            if req.uri().path() == path {
                Ok(resp)
            } else {
                let mut err = ErrorResponse::new(Some("not found".to_string()));
                *err.status_mut() = StatusCode::NOT_FOUND;
                Err(err)
            }
        };

        let ws = time::timeout(
            self.config.write_wait,
            tokio_tungstenite::accept_hdr_async_with_config(
                stream,
                check_path,
                Some(websocket_config(&self.config)),
            ),
        )
        .await
        .map_err(|_| TransportError::DeadlineExceeded("handshake"))?
        .map_err(|e| {
            TransportError::AcceptFailed(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                e,
            ))
        })?;

        let id = ConnectionId::new(self.next_id);
        self.next_id += 1;
        debug!(%id, %addr, "accepted WebSocket connection");

        Ok(WebSocketConnection::new(id, ws, self.config.clone()))
    }
}

type WsSink<S> = SplitSink<WebSocketStream<S>, Message>;
type WsSource<S> = SplitStream<WebSocketStream<S>>;

/// A single WebSocket connection.
///
/// The stream is split on construction; each half sits in a slot until its
/// pump takes it, so each pump can run at most once.
pub struct WebSocketConnection<S = TcpStream> {
    id: ConnectionId,
    config: ConnectionConfig,
    source: Mutex<Option<WsSource<S>>>,
    sink: Mutex<Option<WsSink<S>>>,
    /// Producer side of the write pump's queue. Dropped on close.
    outbound: Mutex<Option<mpsc::Sender<Message>>>,
    queued: Mutex<Option<mpsc::Receiver<Message>>>,
    reader: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    closed: watch::Sender<bool>,
}

impl<S> WebSocketConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wraps an already-upgraded WebSocket stream. The stream should have
    /// been created with [`websocket_config`] so oversized frames are
    /// refused before they are buffered.
    pub fn new(
        id: ConnectionId,
        ws: WebSocketStream<S>,
        config: ConnectionConfig,
    ) -> Self {
        let (sink, source) = ws.split();
        let (outbound, queued) = mpsc::channel(config.outbound_capacity.max(1));
        let (closed, _) = watch::channel(false);
        Self {
            id,
            config,
            source: Mutex::new(Some(source)),
            sink: Mutex::new(Some(sink)),
            outbound: Mutex::new(Some(outbound)),
            queued: Mutex::new(Some(queued)),
            reader: Mutex::new(None),
            closed,
        }
    }

    /// Whether [`close`](Connection::close) has been called.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    fn outbound_sender(&self) -> Option<mpsc::Sender<Message>> {
        lock(&self.outbound).clone()
    }

    async fn run_reader(&self) -> Result<(), TransportError> {
        let mut source = take(&self.source)
            .ok_or(TransportError::PumpUnavailable("read pump already started"))?;
        let reader = take(&self.reader)
            .ok_or(TransportError::PumpUnavailable("no reader attached"))?;

        let mut closed = self.closed.subscribe();
        if self.is_closed() {
            return Ok(());
        }

        loop {
            let next = tokio::select! {
                _ = closed.changed() => {
                    debug!(conn_id = %self.id, "read pump stopped by close");
                    return Ok(());
                }
                next = time::timeout(self.config.read_wait, source.next()) => next,
            };

            let limit = self.config.max_message_size;
            let data: Vec<u8> = match next {
                Err(_) => return Err(TransportError::DeadlineExceeded("read")),
                Ok(Some(Err(WsError::Capacity(e)))) => {
                    let size = match e {
                        CapacityError::MessageTooLong { size, .. } => size,
                        _ => limit + 1,
                    };
                    self.reject_oversized(size);
                    return Err(TransportError::MessageTooLarge { size, limit });
                }
                Ok(None) | Ok(Some(Ok(Message::Close(_)))) => return Ok(()),
                Ok(Some(Ok(Message::Text(text)))) => text.as_bytes().to_vec(),
                Ok(Some(Ok(Message::Binary(data)))) => data.to_vec(),
                Ok(Some(Ok(_))) => continue, // ping/pong/raw frame
                Ok(Some(Err(e))) => {
                    return Err(TransportError::ReceiveFailed(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            };

            if data.len() > limit {
                self.reject_oversized(data.len());
                return Err(TransportError::MessageTooLarge {
                    size: data.len(),
                    limit,
                });
            }

            if reader.send(data).await.is_err() {
                debug!(conn_id = %self.id, "reader dropped, stopping read pump");
                return Ok(());
            }
        }
    }

    /// Queues a "message too big" close frame ahead of the shutdown.
    fn reject_oversized(&self, size: usize) {
        warn!(
            conn_id = %self.id,
            size,
            limit = self.config.max_message_size,
            "oversized frame, closing connection"
        );
        if let Some(outbound) = self.outbound_sender() {
            let frame = CloseFrame {
                code: CloseCode::Size,
                reason: "message too big".into(),
            };
            let _ = outbound.try_send(Message::Close(Some(frame)));
        }
    }

    async fn run_writer(&self) -> Result<(), TransportError> {
        let mut sink = take(&self.sink)
            .ok_or(TransportError::PumpUnavailable("write pump already started"))?;
        let mut queued = take(&self.queued)
            .ok_or(TransportError::PumpUnavailable("write pump already started"))?;

        let period = self.config.ping_period;
        let mut heartbeat = time::interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                msg = queued.recv() => match msg {
                    Some(msg) => {
                        let closing = matches!(msg, Message::Close(_));
                        self.write(&mut sink, msg).await?;
                        if closing {
                            return Ok(());
                        }
                    }
                    None => {
                        // Queue closed by the owner: finish with a close frame.
                        let _ = self.write(&mut sink, Message::Close(None)).await;
                        return Ok(());
                    }
                },
                _ = heartbeat.tick() => {
                    self.write(&mut sink, Message::Ping(Vec::new().into())).await?;
                }
            }
        }
    }

    async fn write(
        &self,
        sink: &mut WsSink<S>,
        msg: Message,
    ) -> Result<(), TransportError> {
        match time::timeout(self.config.write_wait, sink.send(msg)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))),
            Err(_) => Err(TransportError::DeadlineExceeded("write")),
        }
    }
}

impl<S> Connection for WebSocketConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Error = TransportError;

    fn attach_reader(&self, reader: mpsc::Sender<Vec<u8>>) {
        *lock(&self.reader) = Some(reader);
    }

    async fn send(&self, data: Vec<u8>) -> Result<(), Self::Error> {
        let outbound = self.outbound_sender().ok_or_else(|| {
            TransportError::ConnectionClosed(format!("{} is closed", self.id))
        })?;
        let msg = match String::from_utf8(data) {
            Ok(text) => Message::Text(text.into()),
            Err(raw) => Message::Binary(raw.into_bytes().into()),
        };
        outbound.send(msg).await.map_err(|_| {
            TransportError::ConnectionClosed(format!(
                "{} write pump has exited",
                self.id
            ))
        })
    }

    async fn read_pump(&self) -> Result<(), Self::Error> {
        let result = self.run_reader().await;
        self.close();
        result
    }

    async fn write_pump(&self) -> Result<(), Self::Error> {
        let result = self.run_writer().await;
        self.close();
        result
    }

    fn close(&self) {
        if self.closed.send_replace(true) {
            return;
        }
        take(&self.outbound);
        take(&self.reader);
        debug!(conn_id = %self.id, "connection closed");
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

fn lock<T>(slot: &Mutex<T>) -> MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

fn take<T>(slot: &Mutex<Option<T>>) -> Option<T> {
    lock(slot).take()
}
