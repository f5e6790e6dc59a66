// Parley - JSON-RPC tool server that asks a human for input
// Library exports

pub mod broker;
pub mod config;
pub mod dialog;
pub mod errors;
pub mod lifecycle;
pub mod protocol;
pub mod session;
pub mod tools;
pub mod ui_link;

pub use errors::ParleyError;
