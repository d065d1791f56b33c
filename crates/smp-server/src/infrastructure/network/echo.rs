//! LineEcho: a minimal connection handler.
//!
//! Writes every newline-terminated line it receives straight back to the
//! sender.  The session ends when the peer closes its side or when the server
//! asks the client to disconnect, in which case the write half is shut down
//! cleanly so the peer sees EOF.

use async_trait::async_trait;
use smp_core::ConnectionId;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use super::session::{ConnectionHandler, DisconnectSignal};

#[derive(Debug, Default, Clone, Copy)]
pub struct LineEcho;

#[async_trait]
impl ConnectionHandler for LineEcho {
    async fn serve(
        &self,
        id: ConnectionId,
        stream: TcpStream,
        mut disconnect: DisconnectSignal,
    ) -> std::io::Result<()> {
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        loop {
            tokio::select! {
                () = disconnect.requested() => {
                    debug!("client {id}: disconnect requested");
                    write_half.shutdown().await?;
                    return Ok(());
                }
                line = lines.next_line() => match line? {
                    Some(line) => {
                        write_half.write_all(line.as_bytes()).await?;
                        write_half.write_all(b"\n").await?;
                    }
                    None => {
                        debug!("client {id}: peer closed the connection");
                        return Ok(());
                    }
                },
            }
        }
    }
}
