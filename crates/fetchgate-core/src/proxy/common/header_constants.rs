//! Standard HTTP header names used by the interception path.

/// Identifies the client that issued a proxied request.
pub const X_FETCHGATE_CLIENT: &str = "x-fetchgate-client";

/// `Via` pseudonym this proxy adds to every request it sends upstream.
pub const VIA_PSEUDONYM: &str = "fetchgate";

/// Value appended to `Via` on outgoing requests.
pub const VIA_VALUE: &str = "1.1 fetchgate";

/// Hop-by-hop headers never forwarded upstream.
pub const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// Whether a `Via` header value lists this proxy as a hop.
pub fn via_includes_self(via: &str) -> bool {
    via.split(',')
        .filter_map(|hop| hop.split_whitespace().nth(1))
        .any(|pseudonym| pseudonym.eq_ignore_ascii_case(VIA_PSEUDONYM))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_via_includes_self() {
        assert!(via_includes_self(VIA_VALUE));
        assert!(via_includes_self("1.0 squid, 1.1 fetchgate"));
        assert!(!via_includes_self("1.1 varnish"));
        assert!(!via_includes_self("fetchgate"));
    }
}
