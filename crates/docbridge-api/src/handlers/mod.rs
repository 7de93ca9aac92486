//! HTTP handlers for docbridge-api.

pub mod documents;
pub mod intake;
pub mod status;

use std::net::SocketAddr;

use axum::extract::ConnectInfo;

/// Remote address of the caller, or `"unknown"` when the server was not
/// started with connection info.
pub(crate) fn client_ip(connect_info: Option<ConnectInfo<SocketAddr>>) -> String {
    connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
