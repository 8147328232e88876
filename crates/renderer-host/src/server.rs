//! Host message loop.
//!
//! Reads client request frames, resolves each one on its own task, and
//! funnels replies through a single writer task so frames never interleave.

use std::sync::Arc;

use log::{debug, error, info, warn};
use renderer_protocol::connection::{recv_client_frame, send_host_message};
use renderer_protocol::{ClientMessage, HostMessage, ProtocolError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

use crate::resolver::Resolver;

/// Serves one renderer client connection.
#[derive(Clone)]
pub struct HostServer {
    resolver: Arc<Resolver>,
}

impl HostServer {
    pub fn new(resolver: Arc<Resolver>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    /// Serve until the client closes its end. In-flight requests are
    /// answered before this returns.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> anyhow::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<HostMessage>();

        let writer_task = tokio::spawn(async move {
            while let Some(reply) = rx.recv().await {
                match send_host_message(&mut writer, &reply).await {
                    Ok(()) => {}
                    // Oversized reply: nothing was written, the stream is intact.
                    Err(ProtocolError::Io(e)) if e.kind() == std::io::ErrorKind::InvalidInput => {
                        warn!(
                            "[renderer-host] Dropping {:?} reply: {}",
                            reply.message_type(),
                            e
                        );
                    }
                    Err(e) => {
                        error!(
                            "[renderer-host] Failed to send {:?} reply: {}",
                            reply.message_type(),
                            e
                        );
                        break;
                    }
                }
            }
        });

        let result = loop {
            let frame = match recv_client_frame(&mut reader).await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("[renderer-host] Client closed the channel");
                    break Ok(());
                }
                Err(e) => {
                    error!("[renderer-host] Channel read error: {}", e);
                    break Err(e.into());
                }
            };

            let request = match ClientMessage::decode(&frame) {
                Ok(request) => request,
                Err(e) => {
                    warn!("[renderer-host] Skipping undecodable request: {}", e);
                    continue;
                }
            };
            debug!("[renderer-host] Request: {:?}", request);

            let resolver = self.resolver.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(reply) = resolver.handle_request(request).await {
                    // Receiver gone means the writer failed; nothing to do.
                    let _ = tx.send(reply);
                }
            });
        };

        drop(tx);
        writer_task.await?;
        result
    }

    /// Serve on the process's stdin and stdout.
    pub async fn serve_stdio(&self) -> anyhow::Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }
}
