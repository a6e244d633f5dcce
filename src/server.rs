//! Listener setup and the accept loop.
//!
//! The server binds a listener (falling back to random ephemeral ports if
//! none was configured), then accepts connections until a shutdown future
//! completes. Each accepted connection gets its own handshake task: write
//! the welcome line, read one line as the username, and hand the session
//! to the coordinator. A failed accept or handshake is reported through
//! the log sink and never takes the server down.

use std::{future::Future, net::SocketAddr, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    select,
    sync::mpsc,
};
use tracing::warn;

use crate::{
    config::{self, ServerConfig},
    hub::Hub,
    logger::SharedLogger,
    session::Session,
};

/// A bound chat server, ready to run.
pub struct Server {
    listener: TcpListener,
    welcome: String,
    logger: SharedLogger,
    hub: Hub,
    registers: mpsc::Sender<Session>,
}

impl Server {
    /// Binds the listener and sets up the coordinator. A bind failure is
    /// the one fatal error in the system; everything after this point is
    /// report-and-continue.
    pub async fn bind(config: ServerConfig, logger: SharedLogger) -> Result<Self> {
        let listener = bind_listener(&config, &logger).await?;
        let (hub, registers) = Hub::new(Arc::clone(&logger));
        Ok(Self {
            listener,
            welcome: config.welcome,
            logger,
            hub,
            registers,
        })
    }

    /// The address the server is listening on.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until `shutdown` completes. Returning drops the
    /// listener and the register queue, which in turn ends the coordinator
    /// loop and closes the remaining sessions.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Server {
            listener,
            welcome,
            logger,
            hub,
            registers,
        } = self;

        tokio::spawn(hub.run());
        tokio::pin!(shutdown);

        loop {
            select! {
                _ = &mut shutdown => break,
                accept = listener.accept() => {
                    handle_accept(accept, &welcome, &registers, &logger);
                }
            }
        }

        Ok(())
    }

    /// Runs until ctrl-c.
    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}

async fn bind_listener(config: &ServerConfig, logger: &SharedLogger) -> Result<TcpListener> {
    if let Some(port) = config.port {
        return TcpListener::bind((config.host.as_str(), port))
            .await
            .with_context(|| format!("failed to bind {}:{port}", config.host));
    }

    // No port configured: pick from the ephemeral range and retry a fresh
    // pick at most twice if it happens to be taken.
    let mut port = config::random_port();
    let mut retries = 0;
    loop {
        match TcpListener::bind((config.host.as_str(), port)).await {
            Ok(listener) => return Ok(listener),
            Err(err) if retries < 2 => {
                logger.println(&format!("port {port} not available: {err}"));
                port = config::random_port();
                logger.println(&format!("switching to port {port}"));
                retries += 1;
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to bind {}:{port}", config.host));
            }
        }
    }
}

fn handle_accept(
    result: std::io::Result<(TcpStream, SocketAddr)>,
    welcome: &str,
    registers: &mpsc::Sender<Session>,
    logger: &SharedLogger,
) {
    match result {
        Ok((stream, peer)) => {
            let welcome = welcome.to_string();
            let registers = registers.clone();
            let logger = Arc::clone(logger);
            tokio::spawn(async move {
                // A failed handshake abandons this connection and nothing else.
                if let Err(err) = handshake(stream, &welcome, &registers).await {
                    logger.println(&format!("handshake with {peer} failed: {err}"));
                }
            });
        }
        Err(err) => logger.println(&format!("connection failed: {err}")),
    }
}

async fn handshake(
    stream: TcpStream,
    welcome: &str,
    registers: &mpsc::Sender<Session>,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    writer
        .write_all(format!("{welcome}\n").as_bytes())
        .await
        .context("sending welcome failed")?;

    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .await
        .context("reading username failed")?;
    if read == 0 {
        bail!("connection closed before a username was sent");
    }

    // No username validation by design; an empty line is a valid username.
    let username = line.trim_end_matches(['\r', '\n']).to_string();
    registers
        .send(Session {
            username,
            reader,
            writer,
        })
        .await
        .map_err(|_| anyhow!("coordinator stopped"))?;
    Ok(())
}
