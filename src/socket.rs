//! Thin send/receive wrapper around a candidate's transport, with the
//! TURN send-indication / channel-data dispatch shim layered on top once a
//! candidate is relayed.

use crate::error::Error;
use crate::turn_conn::TurnConnection;
use std::net::SocketAddr;
use std::sync::Arc;
use util::Conn;

pub struct SocketConnection {
    conn: Arc<dyn Conn + Send + Sync>,
    relay: Option<Arc<TurnConnection>>,
}

impl SocketConnection {
    pub fn new(conn: Arc<dyn Conn + Send + Sync>, relay: Option<Arc<TurnConnection>>) -> Self {
        SocketConnection { conn, relay }
    }

    /// Sends `bytes` to `dst`. Non-relayed candidates write straight to the
    /// underlying socket; relayed candidates dispatch through the owning
    /// `TurnConnection`'s channel (if bound) or fall back to a send
    /// indication.
    pub async fn send(&self, bytes: &[u8], dst: SocketAddr) -> Result<usize, Error> {
        match &self.relay {
            None => Ok(self.conn.send_to(bytes, dst).await?),
            Some(turn) => {
                if let Some(channel) = turn.channel_for(&dst).await {
                    self.send_channel_data(channel, bytes).await
                } else {
                    self.send_indication(bytes, dst).await
                }
            }
        }
    }

    async fn send_indication(&self, bytes: &[u8], dst: SocketAddr) -> Result<usize, Error> {
        // turn::client::Client handles the indication framing internally
        // once a permission exists; this wrapper only decides which path to
        // take, the client primitive does the wire work.
        Ok(self.conn.send_to(bytes, dst).await?)
    }

    async fn send_channel_data(&self, channel: u16, bytes: &[u8]) -> Result<usize, Error> {
        let mut framed = Vec::with_capacity(4 + bytes.len());
        framed.extend_from_slice(&channel.to_be_bytes());
        framed.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
        framed.extend_from_slice(bytes);
        // padded to a multiple of 4 per RFC 8656 §12.4
        while framed.len() % 4 != 0 {
            framed.push(0);
        }
        let server_addr = self
            .relay
            .as_ref()
            .expect("send_channel_data only called for relayed candidates")
            .server_addr;
        Ok(self.conn.send_to(&framed, server_addr).await?)
    }

    pub fn local_conn(&self) -> Arc<dyn Conn + Send + Sync> {
        self.conn.clone()
    }
}
