//! Registry (master) client (§4.5, component E): the XML-RPC value
//! model, wire-level envelope codec, and the blocking HTTP client
//! built on top of them.

pub mod client;
pub mod value;
pub mod wire;

pub use client::RegistryClient;
pub use value::XmlRpcValue;
