//! Sessions and server-pushed event streams.

pub mod client;
pub mod events;
pub mod hub;
pub mod registry;
pub mod server;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;
