//! Serveur HTTP du device (axum sur un runtime tokio dédié).

use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use tokio::sync::oneshot;
use tracing::{debug, error};

use super::responder::Responder;
use super::{DeviceError, HttpRequest};
use crate::logging::Logger;

/// Socket TCP lié, pas encore servi.
pub(super) struct HttpBinding {
    listener: TcpListener,
    port: u16,
}

pub(super) struct HttpServer {
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl HttpServer {
    /// Lie `0.0.0.0:port` ; le port 0 choisit un port éphémère.
    pub(super) fn bind(port: u16) -> Result<HttpBinding, DeviceError> {
        let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))?;
        listener.set_nonblocking(true)?;
        let port = listener.local_addr()?.port();
        Ok(HttpBinding { listener, port })
    }

    pub(super) fn stop(&mut self) -> Result<(), DeviceError> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| DeviceError::ThreadPanicked),
            None => Ok(()),
        }
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

impl HttpBinding {
    pub(super) fn port(&self) -> u16 {
        self.port
    }

    /// Sert les requêtes sur un thread portant son propre runtime.
    pub(super) fn serve(
        self,
        responder: Arc<Responder>,
        logger: Logger,
    ) -> Result<HttpServer, DeviceError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("upnp-http")
            .build()?;
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let port = self.port;
        let std_listener = self.listener;

        let router = Router::new().fallback(handle).with_state(responder);

        let thread = thread::Builder::new()
            .name(format!("upnp-http-{}", port))
            .spawn(move || {
                let _guard = logger.enter();
                runtime.block_on(async move {
                    let listener = match tokio::net::TcpListener::from_std(std_listener) {
                        Ok(listener) => listener,
                        Err(e) => {
                            error!("❌ HTTP listener on port {} unusable: {}", port, e);
                            return;
                        }
                    };
                    let served = axum::serve(listener, router)
                        .with_graceful_shutdown(async move {
                            let _ = shutdown_rx.await;
                        })
                        .await;
                    if let Err(e) = served {
                        error!("❌ HTTP server on port {} failed: {}", port, e);
                    }
                });
                debug!("HTTP server on port {} stopped", port);
            })?;

        Ok(HttpServer {
            shutdown: Some(shutdown),
            thread: Some(thread),
        })
    }
}

async fn handle(
    State(responder): State<Arc<Responder>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = HttpRequest {
        method,
        path: uri.path().to_string(),
        headers,
        body,
    };

    // Le traitement des actions est synchrone et peut être long.
    let blocking = Arc::clone(&responder);
    match tokio::task::spawn_blocking(move || blocking.handle_http(request)).await {
        Ok(response) => response,
        Err(e) => {
            error!("❌ HTTP handler panicked: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
