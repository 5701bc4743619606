//! Stream registry key derived from the peer address.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;

use feedwire_realtime::ConnectionKey;

/// Registry key for the caller's stream: the peer socket address, or a
/// random key when the server was not started with connect info.
#[derive(Debug, Clone)]
pub struct ClientKey(pub ConnectionKey);

impl<S> FromRequestParts<S> for ClientKey
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let key = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| ConnectionKey::from(*addr))
            .unwrap_or_else(ConnectionKey::random);
        Ok(ClientKey(key))
    }
}
