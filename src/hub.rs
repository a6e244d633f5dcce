//! The coordinator: single owner of the session registry.
//!
//! All registry mutation and every broadcast happens inside one loop that
//! drains three bounded channels, so no two events are ever processed
//! concurrently and the registry needs no lock. Fan-out writes happen
//! inline in the same loop; the consequence is that a peer which stops
//! reading eventually stalls delivery to everyone once its socket buffer
//! fills, in exchange for every client observing broadcasts in the same
//! total order.

use std::{collections::HashMap, sync::Arc};

use tokio::{io::AsyncWriteExt, net::tcp::OwnedWriteHalf, select, sync::mpsc};

use crate::{
    logger::SharedLogger,
    session::{self, Session, SessionId},
};

// The register queue stays tiny: the loop drains it promptly and a small
// bound keeps a burst of handshakes from racing ahead of registration.
const REGISTER_CAPACITY: usize = 1;
const UNREGISTER_CAPACITY: usize = 16;
const BROADCAST_CAPACITY: usize = 32;

struct SessionRecord {
    username: String,
    writer: OwnedWriteHalf,
}

pub(crate) struct Hub {
    registry: HashMap<SessionId, SessionRecord>,
    next_id: SessionId,
    registers: mpsc::Receiver<Session>,
    unregisters: mpsc::Receiver<SessionId>,
    broadcasts: mpsc::Receiver<String>,
    // Handed to every reader task the hub spawns.
    unregister_tx: mpsc::Sender<SessionId>,
    broadcast_tx: mpsc::Sender<String>,
    logger: SharedLogger,
}

impl Hub {
    /// Creates the hub and the register-queue sender the acceptor feeds.
    pub(crate) fn new(logger: SharedLogger) -> (Self, mpsc::Sender<Session>) {
        let (register_tx, registers) = mpsc::channel(REGISTER_CAPACITY);
        let (unregister_tx, unregisters) = mpsc::channel(UNREGISTER_CAPACITY);
        let (broadcast_tx, broadcasts) = mpsc::channel(BROADCAST_CAPACITY);
        let hub = Self {
            registry: HashMap::new(),
            next_id: 1,
            registers,
            unregisters,
            broadcasts,
            unregister_tx,
            broadcast_tx,
            logger,
        };
        (hub, register_tx)
    }

    /// Processes events one at a time until the register queue closes,
    /// which happens when the acceptor shuts down.
    pub(crate) async fn run(mut self) {
        loop {
            select! {
                register = self.registers.recv() => match register {
                    Some(session) => self.register(session).await,
                    None => break,
                },
                Some(id) = self.unregisters.recv() => self.unregister(id),
                Some(message) = self.broadcasts.recv() => self.broadcast(&message).await,
            }
        }
    }

    async fn register(&mut self, session: Session) {
        let Session {
            username,
            reader,
            writer,
        } = session;

        // Members registered so far hear about the join; the newcomer
        // does not see its own join notice.
        self.broadcast(&format!("{username} joined the chat\n")).await;

        let id = self.next_id;
        self.next_id += 1;
        self.registry.insert(
            id,
            SessionRecord {
                username: username.clone(),
                writer,
            },
        );

        tokio::spawn(session::run_reader(
            id,
            username,
            reader,
            self.broadcast_tx.clone(),
            self.unregister_tx.clone(),
            Arc::clone(&self.logger),
        ));
    }

    async fn broadcast(&mut self, message: &str) {
        for record in self.registry.values_mut() {
            // One unwritable recipient must not cost the rest delivery.
            if let Err(err) = record.writer.write_all(message.as_bytes()).await {
                self.logger
                    .println(&format!("sending message to {} failed: {err}", record.username));
            }
        }
    }

    fn unregister(&mut self, id: SessionId) {
        // Duplicate unregister signals are possible; an absent id is a no-op.
        self.registry.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::{
        io::{AsyncBufReadExt, BufReader},
        net::{TcpListener, TcpStream},
        time::timeout,
    };

    use super::*;
    use crate::logger::MemoryLogger;

    fn new_hub() -> Hub {
        let (hub, _registers) = Hub::new(Arc::new(MemoryLogger::default()));
        hub
    }

    /// Builds a handshake-complete session over a real socket pair and
    /// returns the client end alongside it.
    async fn session_pair(username: &str) -> (Session, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let client = TcpStream::connect(addr).await.expect("connect");
        let (accepted, _) = listener.accept().await.expect("accept");
        let (reader, writer) = accepted.into_split();
        let session = Session {
            username: username.to_string(),
            reader: BufReader::new(reader),
            writer,
        };
        (session, client)
    }

    async fn read_line(stream: &mut BufReader<TcpStream>) -> String {
        let mut line = String::new();
        timeout(Duration::from_secs(1), stream.read_line(&mut line))
            .await
            .expect("timed out waiting for a line")
            .expect("read line");
        line
    }

    #[tokio::test]
    async fn register_notifies_existing_sessions_but_not_the_joiner() {
        let mut hub = new_hub();
        let (alice, alice_peer) = session_pair("alice").await;
        hub.register(alice).await;
        assert_eq!(hub.registry.len(), 1);

        let (bob, bob_peer) = session_pair("bob").await;
        hub.register(bob).await;
        assert_eq!(hub.registry.len(), 2);

        let mut alice_peer = BufReader::new(alice_peer);
        assert_eq!(read_line(&mut alice_peer).await, "bob joined the chat\n");

        let mut bob_peer = BufReader::new(bob_peer);
        let mut line = String::new();
        let pending = timeout(Duration::from_millis(100), bob_peer.read_line(&mut line)).await;
        assert!(pending.is_err(), "joiner must not see its own join notice");
    }

    #[tokio::test]
    async fn broadcast_reaches_every_registered_session() {
        let mut hub = new_hub();
        let (alice, alice_peer) = session_pair("alice").await;
        let (bob, bob_peer) = session_pair("bob").await;
        hub.register(alice).await;
        hub.register(bob).await;

        hub.broadcast("alice: hello\n").await;

        let mut alice_peer = BufReader::new(alice_peer);
        assert_eq!(read_line(&mut alice_peer).await, "bob joined the chat\n");
        assert_eq!(read_line(&mut alice_peer).await, "alice: hello\n");

        let mut bob_peer = BufReader::new(bob_peer);
        assert_eq!(read_line(&mut bob_peer).await, "alice: hello\n");
    }

    #[tokio::test]
    async fn unregister_removes_exactly_one_and_tolerates_duplicates() {
        let mut hub = new_hub();
        let (alice, _alice_peer) = session_pair("alice").await;
        let (bob, _bob_peer) = session_pair("bob").await;
        hub.register(alice).await;
        hub.register(bob).await;

        let alice_id = hub
            .registry
            .iter()
            .find(|(_, record)| record.username == "alice")
            .map(|(id, _)| *id)
            .expect("alice is registered");

        hub.unregister(alice_id);
        assert_eq!(hub.registry.len(), 1);

        // A duplicate signal for the same session changes nothing.
        hub.unregister(alice_id);
        assert_eq!(hub.registry.len(), 1);
    }

    #[tokio::test]
    async fn write_failure_to_one_session_does_not_stop_the_rest() {
        let mut hub = new_hub();
        let (gone, gone_peer) = session_pair("gone").await;
        hub.register(gone).await;
        let (alice, alice_peer) = session_pair("alice").await;
        hub.register(alice).await;

        drop(gone_peer);
        hub.broadcast("alice: one\n").await;
        hub.broadcast("alice: two\n").await;

        let mut alice_peer = BufReader::new(alice_peer);
        assert_eq!(read_line(&mut alice_peer).await, "alice: one\n");
        assert_eq!(read_line(&mut alice_peer).await, "alice: two\n");
    }
}
