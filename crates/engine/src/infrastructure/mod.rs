//! External dependency implementations: event correlation, transport,
//! persistence, and the port traits they implement.

pub mod clock;
pub mod correlator;
pub mod http;
pub mod persistence;
pub mod ports;
