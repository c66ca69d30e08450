//! bfs-http: HTTP transport adapter for the bfs BucketFS client
//!
//! This crate provides the implementation of the Transport trait
//! using the reqwest crate. It is the only crate that directly
//! depends on an HTTP client.

pub mod connect;
pub mod transport;

pub use connect::connect;
pub use transport::ReqwestTransport;
