//! Drive a [`RendererClient`] over a framed byte stream.
//!
//! One task drains the client's outbound port into frames, another decodes
//! host frames and feeds them to [`RendererClient::handle_message`].

use std::sync::Arc;

use log::{error, info, warn};
use renderer_protocol::connection::{recv_host_frame, send_client_message};
use renderer_protocol::HostMessage;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;

use crate::client::{ClientConfig, ClientError, RendererClient};
use crate::port::ChannelPort;
use crate::widget::EditorWidget;
use crate::RendererEnvironment;

/// A client wired to a host connection.
pub struct Connection {
    pub client: Arc<RendererClient>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Connection {
    /// Stop both transport tasks. Pending renders stay pending.
    pub fn close(&self) {
        self.reader.abort();
        self.writer.abort();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Activate a client on top of `reader`/`writer`.
///
/// Must be called from within a tokio runtime.
pub fn connect<R, W>(
    reader: R,
    writer: W,
    environment: RendererEnvironment,
    widget: Arc<dyn EditorWidget>,
    config: ClientConfig,
) -> Result<Connection, ClientError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (port, mut outbound) = ChannelPort::new();
    let client = Arc::new(RendererClient::activate(
        environment,
        Arc::new(port),
        widget,
        config,
    )?);

    let writer = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(message) = outbound.recv().await {
            if let Err(e) = send_client_message(&mut writer, &message).await {
                error!("[renderer-client] Failed to send {:?}: {}", message, e);
                break;
            }
        }
    });

    let reader_client = client.clone();
    let reader = tokio::spawn(async move {
        read_loop(reader, reader_client).await;
    });

    Ok(Connection {
        client,
        reader,
        writer,
    })
}

async fn read_loop<R: AsyncRead + Unpin>(mut reader: R, client: Arc<RendererClient>) {
    loop {
        match recv_host_frame(&mut reader).await {
            Ok(Some(frame)) => match HostMessage::decode(&frame) {
                Ok(message) => client.handle_message(message),
                Err(e) => warn!("[renderer-client] Skipping undecodable host frame: {}", e),
            },
            Ok(None) => {
                info!("[renderer-client] Host closed the channel");
                break;
            }
            Err(e) => {
                error!("[renderer-client] Channel read error: {}", e);
                break;
            }
        }
    }
}
