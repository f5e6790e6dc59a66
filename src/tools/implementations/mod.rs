// Tool implementations
//
// Concrete implementations of the built-in tools

// Asking the user
pub mod collect;
pub mod continue_session;

// Fire-and-forget
pub mod send_notification;

// Re-exports for convenience
pub use collect::CollectTool;
pub use continue_session::ContinueSessionTool;
pub use send_notification::SendNotificationTool;
