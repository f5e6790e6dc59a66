// Tool surface exposed over `list-tools` / `call-tool`
//
// Tools are registered once at startup into a name-keyed registry; a
// duplicate name is rejected at registration time.

pub mod implementations;
pub mod registry;
pub mod types;

pub use registry::{Tool, ToolRegistry};
pub use types::{ContentBlock, ToolCallResult, ToolContext, ToolDefinition, ToolInputSchema};
