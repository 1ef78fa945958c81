//! The Roku External Control Protocol over HTTP

pub mod request;
pub mod router;
pub mod server;
pub mod templates;

pub use request::{Method, ParseError, Request, Response};
pub use router::{decode, Router};
pub use server::EcpServer;
