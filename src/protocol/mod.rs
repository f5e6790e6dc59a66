// JSON-RPC surface: message types, method routing, and the stdio loop

pub mod dispatcher;
pub mod server;
pub mod types;

pub use dispatcher::Dispatcher;
pub use server::{StdioServer, StopReason};
pub use types::{request_key, JsonRpcError, JsonRpcRequest, JsonRpcResponse, Method};
