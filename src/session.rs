use tokio::{
    io::{AsyncBufReadExt, BufReader},
    net::tcp::{OwnedReadHalf, OwnedWriteHalf},
    sync::mpsc,
};

use crate::logger::SharedLogger;

/// Identity of a registered session, assigned by the coordinator.
pub(crate) type SessionId = u64;

/// A handshake-complete connection waiting to be registered.
///
/// The read half goes to the session's reader task; the write half moves
/// into the coordinator's registry, which is the only place writes happen.
pub(crate) struct Session {
    pub(crate) username: String,
    pub(crate) reader: BufReader<OwnedReadHalf>,
    pub(crate) writer: OwnedWriteHalf,
}

/// Reads lines from one client until its stream ends, forwarding each as a
/// broadcast event. End of stream triggers unregistration; any other read
/// failure is reported and the loop keeps going.
pub(crate) async fn run_reader(
    id: SessionId,
    username: String,
    mut reader: BufReader<OwnedReadHalf>,
    broadcasts: mpsc::Sender<String>,
    unregisters: mpsc::Sender<SessionId>,
    logger: SharedLogger,
) {
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                logger.println(&format!("client connection closed: {username}"));
                break;
            }
            // The line keeps its trailing newline; recipients see it verbatim.
            Ok(_) => {
                if broadcasts.send(format!("{username}: {line}")).await.is_err() {
                    // Coordinator is gone; nothing left to deliver to.
                    break;
                }
            }
            Err(err) => logger.println(&format!("receiving message failed: {err}")),
        }
    }
    let _ = unregisters.send(id).await;
}
