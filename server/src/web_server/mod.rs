use std::net::SocketAddr;

mod handlers;
pub mod warp;

pub use self::warp::{routes, WebServer};

/// Serve until the server terminates, fails if the socket cannot be bound
#[hannibal::message(result = "anyhow::Result<()>")]
#[derive(Debug)]
pub struct Listen {
    pub socket: SocketAddr,
}
