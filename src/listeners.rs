use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv6Addr, SocketAddr};

pub async fn create_listener(
    host: &str,
    port: u16,
) -> std::io::Result<(String, tokio::net::TcpListener)> {
    if host == "*" {
        return create_wildcard_listener(port).await;
    }

    let addr = format!("{}:{}", host, port);
    tracing::info!("Attempting to bind server to {}...", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    Ok((addr, listener))
}

// Wildcard binding goes through socket2 so a single IPv6 socket can cover
// IPv4 as well on dual-stack systems; plain IPv4 is the fallback.
async fn create_wildcard_listener(
    port: u16,
) -> std::io::Result<(String, tokio::net::TcpListener)> {
    match dual_stack_listener(port) {
        Ok(listener) => {
            let addr = format!("[::]:{}", port);
            tracing::info!("Bound wildcard listener on {} (dual-stack)", addr);
            Ok((addr, listener))
        }
        Err(e) => {
            tracing::warn!(
                "Failed to bind dual-stack IPv6 listener: {}. Falling back to IPv4.",
                e
            );
            let addr = format!("0.0.0.0:{}", port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            Ok((addr, listener))
        }
    }
}

fn dual_stack_listener(port: u16) -> std::io::Result<tokio::net::TcpListener> {
    let addr = SocketAddr::from((Ipv6Addr::UNSPECIFIED, port));

    let socket = Socket::new(Domain::IPV6, Type::STREAM, Some(Protocol::TCP))?;
    // Dual-stack mode is not available everywhere; an IPv6-only socket is
    // still better than no socket.
    if let Err(e) = socket.set_only_v6(false) {
        tracing::warn!(
            "Failed to set dual-stack mode for IPv6 socket: {}. Continuing anyway.",
            e
        );
    }
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;

    // Make it non-blocking for tokio
    socket.set_nonblocking(true)?;
    tokio::net::TcpListener::from_std(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_binds_explicit_host() {
        let (addr, listener) = create_listener("127.0.0.1", 0).await.unwrap();
        assert!(addr.starts_with("127.0.0.1:"));
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }

    #[tokio::test]
    async fn test_binds_wildcard_host() {
        let (_, listener) = create_listener("*", 0).await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_unspecified());
    }
}
