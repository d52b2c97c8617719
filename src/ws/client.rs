use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::dispatch::Command;
use crate::error::ClientError;

#[derive(Debug, Deserialize)]
pub struct Reply {
    pub success: bool,
    pub message: Option<String>,
}

/// Send a single command to a running daemon and wait for its reply.
pub async fn send(url: &str, command: &Command) -> Result<Reply, ClientError> {
    let (mut ws, _) = tokio_tungstenite::connect_async(url).await?;
    ws.send(Message::Text(serde_json::to_string(command)?)).await?;

    while let Some(msg) = ws.next().await {
        if let Message::Text(text) = msg? {
            let reply = serde_json::from_str(&text)?;
            let _ = ws.close(None).await;
            return Ok(reply);
        }
    }
    Err(ClientError::Closed)
}
