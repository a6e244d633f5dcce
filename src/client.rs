//! Client side: a programmatic line-oriented handle plus the interactive
//! terminal mode used by the `client` subcommand.

use anyhow::{Context, Result};
use tokio::{
    io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
    select,
};
use tracing::warn;

use crate::cli::ClientArgs;

/// Line-oriented handle over a chat connection.
pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    /// Connects to a server. The welcome line is not consumed here; the
    /// first [`Client::read`] returns it.
    pub async fn connect(addr: std::net::SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("failed to connect to {addr}"))?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
        })
    }

    /// Reads one line, terminator included. `None` on end of stream.
    pub async fn read(&mut self) -> io::Result<Option<String>> {
        read_line(&mut self.reader).await
    }

    /// Writes `message` verbatim; callers supply the trailing newline.
    pub async fn send(&mut self, message: &str) -> io::Result<()> {
        self.writer.write_all(message.as_bytes()).await
    }

    /// Shuts the connection down.
    pub async fn close(mut self) {
        if let Err(err) = self.writer.shutdown().await {
            warn!(?err, "failed to shut down connection cleanly");
        }
    }
}

async fn read_line(reader: &mut BufReader<OwnedReadHalf>) -> io::Result<Option<String>> {
    let mut line = String::new();
    let bytes = reader.read_line(&mut line).await?;
    if bytes == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Interactive client: prints the welcome line, sends the username, then
/// relays stdin lines to the server and every received line to stdout.
pub async fn run(args: ClientArgs) -> Result<()> {
    let stream = TcpStream::connect(args.server)
        .await
        .with_context(|| format!("failed to connect to {}", args.server))?;
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let welcome = read_line(&mut reader)
        .await?
        .context("server closed before sending a welcome")?;
    write_stdout(&welcome).await?;
    writer
        .write_all(format!("{}\n", args.username).as_bytes())
        .await?;

    let mut stdin = BufReader::new(io::stdin());
    let mut input = String::new();
    loop {
        input.clear();
        select! {
            line = read_line(&mut reader) => match line? {
                Some(line) => write_stdout(&line).await?,
                None => {
                    write_stdout("*** server closed the connection\n").await?;
                    break;
                }
            },
            read = stdin.read_line(&mut input) => {
                if read? == 0 {
                    break;
                }
                writer.write_all(input.as_bytes()).await?;
            }
        }
    }

    if let Err(err) = writer.shutdown().await {
        warn!(?err, "failed to shut down client writer cleanly");
    }
    Ok(())
}

async fn write_stdout(line: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    stdout.write_all(line.as_bytes()).await?;
    stdout.flush().await
}
