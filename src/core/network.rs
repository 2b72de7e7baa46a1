use std::net::IpAddr;

use ipnetwork::IpNetworkError;
use sqlx::types::ipnetwork::IpNetwork;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid range {raw}: {source}")]
pub(crate) struct IpRangeError {
    raw: String,
    #[source]
    source: IpNetworkError,
}

/// Comma-separated CIDR blocks; a bare address is a single host.
pub(crate) fn parse_ranges(raw: &str) -> Result<Vec<IpNetwork>, IpRangeError> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<IpNetwork>()
                .map_err(|source| IpRangeError { raw: item.to_string(), source })
        })
        .collect()
}

pub(crate) fn is_allowed(ip: IpAddr, ranges: &[IpNetwork]) -> bool {
    let ip = canonical(ip);
    ranges.iter().any(|range| range.contains(ip))
}

// IPv4-mapped IPv6 peers (::ffff:a.b.c.d) are matched against IPv4 ranges.
fn canonical(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(value: &str) -> IpAddr {
        value.parse().unwrap()
    }

    #[test]
    fn ipv4_range_matches_members_only() {
        let ranges = parse_ranges("10.20.0.0/16").unwrap();
        assert!(is_allowed(ip("10.20.4.7"), &ranges));
        assert!(!is_allowed(ip("10.21.0.1"), &ranges));
        assert!(!is_allowed(ip("::1"), &ranges));
    }

    #[test]
    fn bare_address_is_single_host() {
        let ranges = parse_ranges("192.168.1.10").unwrap();
        assert_eq!(ranges[0].prefix(), 32);
        assert!(is_allowed(ip("192.168.1.10"), &ranges));
        assert!(!is_allowed(ip("192.168.1.11"), &ranges));
    }

    #[test]
    fn ipv6_range_and_mapped_ipv4() {
        let ranges = parse_ranges("fd00::/8, 127.0.0.0/8").unwrap();
        assert!(is_allowed(ip("fd12:3456::1"), &ranges));
        assert!(is_allowed(ip("::ffff:127.0.0.1"), &ranges));
    }

    #[test]
    fn rejects_malformed_ranges() {
        assert!(parse_ranges("10.0.0.0/33").is_err());
        assert!(parse_ranges("not-an-ip/8").is_err());
    }

    #[test]
    fn parse_ranges_skips_blank_items() {
        let ranges = parse_ranges("127.0.0.1/32, ,::1/128").unwrap();
        assert_eq!(ranges.len(), 2);
        assert!(is_allowed(ip("::1"), &ranges));
        assert!(!is_allowed(ip("10.0.0.1"), &ranges));
    }
}
