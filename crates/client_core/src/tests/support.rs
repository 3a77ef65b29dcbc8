use axum::Router;
use tokio::net::TcpListener;

use crate::service::{HttpService, RemoteService};

/// Serves `app` on an ephemeral local port and returns its base url.
pub(crate) async fn spawn_server(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

/// An address nothing listens on.
pub(crate) async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}

pub(crate) struct EchoApi {
    pub(crate) http: HttpService,
}

impl RemoteService for EchoApi {
    fn from_http(http: HttpService) -> Self {
        Self { http }
    }
}
