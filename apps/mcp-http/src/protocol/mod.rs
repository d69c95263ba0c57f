//! JSON-RPC envelope handling and method dispatch.

pub mod context;
pub mod dispatcher;
pub mod envelope;
pub mod errors;
pub mod registry;
