use std::{io, net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::{HeaderValue, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::{net::TcpListener, sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info};

use super::{connection::ClientConnection, connection_registry::ConnectionRegistry};
use crate::error::StartupError;

/// Общее состояние обработчиков axum.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    /// Размер очереди исходящих сообщений одного клиента.
    pub client_queue_capacity: usize,
}

impl AppState {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        client_queue_capacity: usize,
    ) -> Self {
        Self {
            registry,
            client_queue_capacity,
        }
    }
}

/// Собирает маршрутизатор: `/ws` (upgrade) и `/health` (счётчик онлайна).
pub fn build_router(
    state: AppState,
    allow_origins: &[String],
) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(cors_layer(allow_origins))
        .layer(TraceLayer::new_for_http())
}

/// Привязывает TCP-слушатель.
pub async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}

/// Запускает HTTP-сервер в отдельной задаче.
///
/// Отмена `shutdown` переводит сервер в режим graceful shutdown:
/// новые соединения больше не принимаются.
pub fn spawn_listener(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> JoinHandle<io::Result<()>> {
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
    })
}

fn cors_layer(allow_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods([Method::GET]);
    if allow_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allow_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin.trim()).ok())
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, peer, state))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "online": state.registry.count(),
    }))
}

/// Обслуживает одно WebSocket-соединение до его закрытия.
///
/// Входящие кадры служат только признаком жизни клиента. Исходящие
/// события пишет отдельная задача, читающая очередь соединения.
async fn handle_socket(
    socket: WebSocket,
    peer: SocketAddr,
    state: AppState,
) {
    let registry = state.registry;
    let (conn, rx) =
        ClientConnection::channel(registry.next_id(), Some(peer), state.client_queue_capacity);
    let conn = Arc::new(conn);
    if !registry.add(Arc::clone(&conn)) {
        debug!(connection_id = conn.id(), %peer, "Registry is closed, rejecting client");
        return;
    }
    info!(connection_id = conn.id(), %peer, online = registry.count(), "Client connected");

    let (ws_tx, mut ws_rx) = socket.split();
    let writer = tokio::spawn(write_loop(Arc::clone(&conn), ws_tx, rx));

    loop {
        tokio::select! {
            _ = conn.closed() => break,
            frame = ws_rx.next() => match frame {
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!(connection_id = conn.id(), error = %e, "Read error");
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    registry.remove(conn.id());
    conn.close();
    let _ = writer.await;
    info!(connection_id = conn.id(), %peer, online = registry.count(), "Client disconnected");
}

async fn write_loop(
    conn: Arc<ClientConnection>,
    mut ws_tx: futures::stream::SplitSink<WebSocket, WsMessage>,
    mut rx: mpsc::Receiver<Arc<str>>,
) {
    loop {
        tokio::select! {
            _ = conn.closed() => break,
            next = rx.recv() => match next {
                Some(text) => {
                    if let Err(e) = ws_tx.send(WsMessage::Text(text.to_string().into())).await {
                        debug!(connection_id = conn.id(), error = %e, "Write error");
                        conn.close();
                        return;
                    }
                }
                None => break,
            },
        }
    }
    let _ = ws_tx.close().await;
}
