use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};

use crate::dispatch::{Command, Dispatcher, Response};

/// Bind the command endpoint. Binding happens up front so a taken port is a
/// startup error rather than something discovered later.
pub async fn bind(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "command server listening");
    Ok(listener)
}

pub async fn serve(listener: TcpListener, dispatcher: Dispatcher) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                debug!(%peer_addr, "new command connection");
                tokio::spawn(handle_connection(stream, peer_addr, dispatcher.clone()));
            }
            Err(e) => warn!(error = %e, "failed to accept command connection"),
        }
    }
}

/// Parse one text frame and run it.
pub fn handle_text(dispatcher: &Dispatcher, text: &str) -> Response {
    match serde_json::from_str::<Command>(text) {
        Ok(command) => {
            debug!(?command, "received command");
            dispatcher.dispatch(command)
        }
        Err(e) => {
            warn!(error = %e, "failed to parse command");
            Response::rejected(format!("Parse error: {e}"))
        }
    }
}

async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, dispatcher: Dispatcher) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%peer_addr, error = %e, "websocket handshake failed");
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let response = handle_text(&dispatcher, &text);
                match serde_json::to_string(&response) {
                    Ok(json) => {
                        if let Err(e) = ws_sender.send(Message::Text(json)).await {
                            warn!(%peer_addr, error = %e, "failed to send response");
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "failed to encode response"),
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(data)) => {
                if let Err(e) = ws_sender.send(Message::Pong(data)).await {
                    warn!(%peer_addr, error = %e, "failed to send pong");
                    break;
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!(%peer_addr, error = %e, "websocket error");
                break;
            }
        }
    }

    debug!(%peer_addr, "command connection closed");
}
