//! HTTP server for receiving UPnP event notifications.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::sync::mpsc;
use warp::http::StatusCode;
use warp::Filter;

use crate::error::CallbackError;
use crate::router::{EventRouter, NotificationPayload};

/// HTTP callback server shared by all subscriptions.
///
/// Serves `NOTIFY /<path>` for every path registered with its [`EventRouter`]
/// and answers:
///
/// - `200` when the notification was forwarded,
/// - `400` when `NT`/`NTS` are present with unexpected values,
/// - `404` for unregistered paths,
/// - `405` for any method other than `NOTIFY`.
///
/// Dropping the server stops it as well; [`CallbackServer::shutdown`]
/// additionally waits for the serving task to finish.
pub struct CallbackServer {
    port: u16,
    event_router: Arc<EventRouter>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

impl CallbackServer {
    /// Bind the first free port in `port_range` (inclusive) and start serving.
    ///
    /// A range of `(0, 0)` lets the OS pick the port.
    pub async fn new(
        port_range: (u16, u16),
        event_sender: mpsc::UnboundedSender<NotificationPayload>,
    ) -> Result<Self, CallbackError> {
        let (start, end) = port_range;
        if start > end {
            return Err(CallbackError::InvalidPortRange { start, end });
        }

        let event_router = Arc::new(EventRouter::new(event_sender));
        let routes = notify_route(event_router.clone()).recover(handle_rejection);

        for port in start..=end {
            let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
            let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);

            let bound = warp::serve(routes.clone()).try_bind_with_graceful_shutdown(addr, async move {
                shutdown_rx.recv().await;
            });

            match bound {
                Ok((addr, server)) => {
                    tracing::info!(%addr, "callback server listening");
                    let server_handle = tokio::spawn(server);
                    return Ok(Self {
                        port: addr.port(),
                        event_router,
                        shutdown_tx: Some(shutdown_tx),
                        server_handle: Some(server_handle),
                    });
                }
                Err(e) => {
                    tracing::trace!(port, error = %e, "port unavailable");
                }
            }
        }

        Err(CallbackError::NoAvailablePort { start, end })
    }

    /// The port the server is bound to
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Callback URL a device should use to reach `path` via `local_addr`
    pub fn callback_url(&self, local_addr: IpAddr, path: &str) -> String {
        format!("http://{}/{}", SocketAddr::new(local_addr, self.port), path)
    }

    /// The router deciding which paths are accepted
    pub fn router(&self) -> &Arc<EventRouter> {
        &self.event_router
    }

    /// Stop accepting connections and wait for in-flight requests to drain
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }

        if let Some(handle) = self.server_handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "callback server task failed");
            }
        }
        tracing::info!(port = self.port, "callback server stopped");
    }
}

fn notify_route(
    router: Arc<EventRouter>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::method()
        .and(warp::path::full())
        .and(warp::header::optional::<String>("sid"))
        .and(warp::header::optional::<String>("nt"))
        .and(warp::header::optional::<String>("nts"))
        .and(warp::body::bytes())
        .and_then(
            move |method: warp::http::Method,
                  path: warp::path::FullPath,
                  sid: Option<String>,
                  nt: Option<String>,
                  nts: Option<String>,
                  body: bytes::Bytes| {
                let router = router.clone();
                async move {
                    if method.as_str() != "NOTIFY" {
                        return Err(warp::reject::custom(MethodNotAllowed));
                    }

                    if !validate_upnp_headers(&nt, &nts) {
                        tracing::debug!(path = path.as_str(), ?nt, ?nts, "invalid UPnP headers");
                        return Err(warp::reject::custom(InvalidUpnpHeaders));
                    }

                    let target = path.as_str().trim_matches('/').to_string();
                    let event_xml = String::from_utf8_lossy(&body).into_owned();
                    tracing::trace!(path = %target, ?sid, bytes = body.len(), "NOTIFY received");

                    if router.route_event(target.clone(), sid, event_xml).await {
                        Ok(warp::reply::with_status("", StatusCode::OK))
                    } else {
                        tracing::debug!(path = %target, "NOTIFY for unregistered path");
                        Err(warp::reject::not_found())
                    }
                }
            },
        )
}

/// `NT` and `NTS` are optional, but when present must name a property change event
fn validate_upnp_headers(nt: &Option<String>, nts: &Option<String>) -> bool {
    nt.as_deref().map_or(true, |v| v == "upnp:event")
        && nts.as_deref().map_or(true, |v| v == "upnp:propchange")
}

#[derive(Debug)]
struct InvalidUpnpHeaders;

impl warp::reject::Reject for InvalidUpnpHeaders {}

#[derive(Debug)]
struct MethodNotAllowed;

impl warp::reject::Reject for MethodNotAllowed {}

async fn handle_rejection(
    err: warp::Rejection,
) -> Result<impl warp::Reply, std::convert::Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Unknown callback path")
    } else if err.find::<InvalidUpnpHeaders>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid UPnP headers")
    } else if err.find::<MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Only NOTIFY is accepted")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };

    Ok(warp::reply::with_status(message, code))
}
