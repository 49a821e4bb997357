use anyhow::Result;
use futures::SinkExt;
use futures::StreamExt;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::codec::Framed;
use tracing::{error, info, warn};
use uuid::Uuid;

use mybridge::config::Config;
use mybridge::dispatch::Dispatcher;
use mybridge::protocol::{ClientFrame, EventCodec, ServerMessage};
use mybridge::session::{CredentialCache, MySqlConnector, SessionRegistry, SqlConnector};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(config.log_level.clone())
        .init();

    // Display version
    info!("mybridge v{}", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(config);
    let registry = Arc::new(SessionRegistry::new(config.max_sessions));
    let credentials = Arc::new(CredentialCache::new());
    let connector: Arc<dyn SqlConnector> =
        Arc::new(MySqlConnector::new(config.connect_timeout_duration()));
    let dispatcher = Arc::new(Dispatcher::new(registry, credentials, connector));

    let listener = TcpListener::bind((config.bind.as_str(), config.port)).await?;
    info!("Listening on {}:{}", config.bind, config.port);

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutting down");
        std::process::exit(0);
    });

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {addr}");
                let dispatcher = dispatcher.clone();
                let config = config.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_session(stream, addr, dispatcher, config).await {
                        error!("Session error from {addr}: {e}");
                    }
                });
            }
            Err(e) => {
                error!("Accept failed: {e}");
            }
        }
    }
}

/// One transport session: a fresh session id, one framed event stream, and a
/// guaranteed teardown when the stream ends.
async fn handle_session(
    stream: tokio::net::TcpStream,
    addr: std::net::SocketAddr,
    dispatcher: Arc<Dispatcher>,
    config: Arc<Config>,
) -> Result<()> {
    stream.set_nodelay(true)?;

    let session_id = Uuid::new_v4();
    let codec = EventCodec::new(config.max_frame_bytes);
    let mut framed = Framed::new(stream, codec);
    info!("Session {session_id} opened for {addr}");

    while let Some(frame) = framed.next().await {
        match frame {
            Ok(ClientFrame::Message(msg)) => {
                let reply = dispatcher.dispatch(session_id, msg).await;
                framed.send(reply).await?;
            }
            Ok(ClientFrame::Malformed { detail }) => {
                warn!("Malformed event from session {session_id}: {detail}");
                framed
                    .send(ServerMessage::Error {
                        message: format!("Malformed event: {detail}"),
                    })
                    .await?;
            }
            Err(e) => {
                error!("Codec error on session {session_id}: {e}");
                break;
            }
        }
    }

    dispatcher.session_closed(session_id).await;
    info!("Session {session_id} closed");
    Ok(())
}
