//! Shared helpers for the actor tests: an in-memory [`Connection`] and
//! configs that make the simulation predictable.

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use apollo_board::SimulationConfig;
use apollo_game::{GameConfig, Player, PlayerConfig, WorldConfig, WorldHandle};
use apollo_protocol::PlayerId;
use apollo_transport::{Connection, ConnectionId};
use serde_json::Value;
use tokio::sync::{mpsc, watch};

/// A connection whose wire is a pair of channels.
pub struct MockConnection {
    id: ConnectionId,
    reader: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    sent: mpsc::UnboundedSender<Vec<u8>>,
    closed: watch::Sender<bool>,
}

/// The test's end of a [`MockConnection`]: everything the server sent.
pub struct Peer {
    pub sent: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MockConnection {
    pub fn new(id: u64) -> (Arc<Self>, Peer) {
        let (sent, sent_rx) = mpsc::unbounded_channel();
        let (closed, _) = watch::channel(false);
        let conn = Self {
            id: ConnectionId::new(id),
            reader: Mutex::new(None),
            sent,
            closed,
        };
        (Arc::new(conn), Peer { sent: sent_rx })
    }

    /// Delivers one inbound frame as if the read pump had received it.
    pub async fn push(&self, frame: &[u8]) {
        let reader = self.reader.lock().unwrap().clone();
        if let Some(reader) = reader {
            let _ = reader.send(frame.to_vec()).await;
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    async fn wait_closed(&self) {
        let mut closed = self.closed.subscribe();
        while !*closed.borrow_and_update() {
            if closed.changed().await.is_err() {
                break;
            }
        }
    }
}

impl Connection for MockConnection {
    type Error = io::Error;

    fn attach_reader(&self, reader: mpsc::Sender<Vec<u8>>) {
        *self.reader.lock().unwrap() = Some(reader);
    }

    async fn send(&self, data: Vec<u8>) -> Result<(), io::Error> {
        if self.is_closed() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
        }
        self.sent
            .send(data)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"))
    }

    async fn read_pump(&self) -> Result<(), io::Error> {
        self.wait_closed().await;
        Ok(())
    }

    async fn write_pump(&self) -> Result<(), io::Error> {
        self.wait_closed().await;
        Ok(())
    }

    fn close(&self) {
        self.closed.send_replace(true);
        self.reader.lock().unwrap().take();
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Peer {
    /// The next frame the server sent, parsed as JSON.
    pub async fn next_json(&mut self) -> Value {
        let frame = tokio::time::timeout(Duration::from_secs(5), self.sent.recv())
            .await
            .expect("frame within deadline")
            .expect("connection still open");
        serde_json::from_slice(&frame).expect("valid JSON")
    }

    /// Skips frames until one satisfies `pred`.
    pub async fn next_matching(&mut self, pred: impl Fn(&Value) -> bool) -> Value {
        loop {
            let value = self.next_json().await;
            if pred(&value) {
                return value;
            }
        }
    }
}

/// Game settings with no spawning, so boards stay empty.
pub fn quiet_game() -> GameConfig {
    GameConfig {
        simulation: SimulationConfig {
            max_spawn_per_step: 0,
            ..SimulationConfig::default()
        },
        seed: Some(1),
        ..GameConfig::default()
    }
}

/// Game settings that attempt a spawn on every tick and never expire.
pub fn busy_game() -> GameConfig {
    GameConfig {
        simulation: SimulationConfig {
            spawn_interval: Duration::ZERO,
            entity_ttl: Duration::from_secs(3600),
            ..SimulationConfig::default()
        },
        seed: Some(7),
        ..GameConfig::default()
    }
}

pub fn world_config(game: GameConfig) -> WorldConfig {
    WorldConfig {
        game,
        ..WorldConfig::default()
    }
}

/// Builds a player over a fresh mock connection.
pub fn player(id: u64, world: &WorldHandle) -> (Player<MockConnection>, Arc<MockConnection>, Peer) {
    let (conn, peer) = MockConnection::new(id);
    let player = Player::new(
        PlayerId(id),
        Arc::clone(&conn),
        world.clone(),
        &PlayerConfig::default(),
    );
    (player, conn, peer)
}

/// Polls `check` until it holds, yielding between attempts.
pub async fn eventually(mut check: impl AsyncFnMut() -> bool) {
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never became true");
}
