//! HTTP/1 connection loop.

use anyhow::Result;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::dav::DavHandler;

/// Accept connections on `listener` forever, one task per connection.
///
/// Errors on a single connection are logged and never stop the loop.
pub async fn serve(listener: TcpListener, handler: Arc<DavHandler>) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("Serving WebDAV on http://{}{}/", addr, handler.prefix());

    loop {
        let (stream, peer) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let handler = handler.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let handler = handler.clone();
                async move { Ok::<_, Infallible>(handler.handle(req).await) }
            });

            if let Err(err) = http1::Builder::new()
                .timer(TokioTimer::new())
                .keep_alive(true)
                .serve_connection(io, service)
                .await
            {
                error!("Error serving connection from {}: {:?}", peer, err);
            } else {
                debug!("Connection from {} closed", peer);
            }
        });
    }
}

/// Bind `addr` and serve on it.
pub async fn bind_and_serve(addr: SocketAddr, handler: Arc<DavHandler>) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve(listener, handler).await
}
