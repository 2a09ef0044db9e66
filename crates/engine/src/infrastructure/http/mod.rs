//! HTTP boundary: inbound notification routes and the outbound bridge
//! client.

pub mod action_client;
pub mod ingress;

pub use action_client::HttpActionClient;
pub use ingress::{router, IngressState};
