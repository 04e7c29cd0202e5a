//! Client address resolution behind reverse proxies.

use std::net::IpAddr;

/// Picks the address to report for a client.
///
/// Order of preference:
///
/// 1. the first entry of `X-Forwarded-For`
/// 2. `X-Real-IP`
/// 3. the TCP peer address
///
/// Header values that don't parse as an IP address are ignored.
pub fn observed_ip(
    forwarded_for: Option<&str>,
    real_ip: Option<&str>,
    peer: IpAddr,
) -> IpAddr {
    let from_forwarded = forwarded_for
        .and_then(|value| value.split(',').next())
        .and_then(|first| first.trim().parse().ok());
    if let Some(ip) = from_forwarded {
        return ip;
    }

    real_ip
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(peer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> IpAddr {
        "10.0.0.9".parse().unwrap()
    }

    #[test]
    fn test_first_forwarded_for_entry_wins() {
        let ip = observed_ip(
            Some("203.0.113.7, 198.51.100.2"),
            Some("192.0.2.1"),
            peer(),
        );
        assert_eq!(ip, "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_real_ip_used_without_forwarded_for() {
        let ip = observed_ip(None, Some(" 192.0.2.1 "), peer());
        assert_eq!(ip, "192.0.2.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_garbage_headers_fall_back_to_peer() {
        let ip = observed_ip(Some("unknown"), Some("nope"), peer());
        assert_eq!(ip, peer());
    }

    #[test]
    fn test_no_headers_uses_peer() {
        assert_eq!(observed_ip(None, None, peer()), peer());
    }
}
