use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{request::Parts, HeaderMap};
use sqlx::types::ipnetwork::IpNetwork;

use crate::core::network;
use crate::core::state::AppState;

/// Best-effort client address; `None` when nothing usable was found.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ClientIp(pub(crate) Option<IpAddr>);

#[async_trait]
impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|info| info.0.ip());
        let trusted = &state.settings().schedule().trusted_proxies;
        Ok(ClientIp(resolve(&parts.headers, peer, trusted)))
    }
}

/// The socket peer, unless the peer is a trusted proxy. Behind a trusted proxy:
/// `CF-Connecting-IP`, then the nearest untrusted `X-Forwarded-For` hop, then
/// `X-Real-IP`, then the peer itself.
pub(crate) fn resolve(
    headers: &HeaderMap,
    peer: Option<IpAddr>,
    trusted: &[IpNetwork],
) -> Option<IpAddr> {
    let peer = peer?;
    if !network::is_allowed(peer, trusted) {
        return Some(peer);
    }

    header_ip(headers, "cf-connecting-ip")
        .or_else(|| forwarded_client(headers, trusted))
        .or_else(|| header_ip(headers, "x-real-ip"))
        .or(Some(peer))
}

// Hops are appended by each proxy, so the rightmost untrusted one is the
// last address no trusted proxy could have been handed by the client.
fn forwarded_client(headers: &HeaderMap, trusted: &[IpNetwork]) -> Option<IpAddr> {
    let hops: Vec<IpAddr> = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|hop| hop.trim().parse().ok())
        .collect();

    hops.iter()
        .rev()
        .find(|hop| !network::is_allowed(**hop, trusted))
        .or_else(|| hops.first())
        .copied()
}

fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    headers.get(name).and_then(|value| value.to_str().ok()).and_then(|value| value.trim().parse().ok())
}
