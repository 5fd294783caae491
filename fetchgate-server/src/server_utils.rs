//! Listener setup and shutdown for the proxy daemon.

use anyhow::{Context, Result};
use listenfd::ListenFd;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use fetchgate_types::ProxyConfig;

/// Listen backlog for the proxy socket.
const BACKLOG: i32 = 1024;

/// Open the listener intercepted traffic and controllers arrive on.
///
/// A socket handed over by the service manager (fd 3) takes precedence over
/// the configured address, so a restarted proxy keeps its port without a gap.
pub async fn create_listener(config: &ProxyConfig) -> Result<TcpListener> {
    if let Some(listener) = ListenFd::from_env().take_tcp_listener(0)? {
        info!("[Server] Proxy listening on inherited socket {:?}", listener.local_addr().ok());
        listener.set_nonblocking(true)?;
        return Ok(TcpListener::from_std(listener)?);
    }

    let bind_addr = config.get_bind_address();
    let ip: IpAddr = bind_addr
        .parse()
        .with_context(|| format!("invalid bind address '{}'", bind_addr))?;
    let addr = SocketAddr::new(ip, config.port);

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    // Lets a second proxy instance bind the same port during a handover.
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nonblocking(true)?;
    socket
        .bind(&addr.into())
        .with_context(|| format!("proxy port {} is unavailable", addr))?;
    socket.listen(BACKLOG)?;

    info!("[Server] Proxy listening on {} (scope {})", addr, config.scope);
    Ok(TcpListener::from_std(socket.into())?)
}

/// Resolves on Ctrl-C or SIGTERM. In-flight intercepted requests finish
/// before the server stops.
#[allow(
    clippy::expect_used,
    reason = "the proxy cannot be stopped cleanly without its signal handlers"
)]
pub async fn shutdown_signal() {
    let interrupt = async {
        signal::ctrl_c().await.expect("Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let source = tokio::select! {
        () = interrupt => "Ctrl-C",
        () = terminate => "SIGTERM",
    };
    info!("[Server] {} received, draining intercepted requests", source);
}
