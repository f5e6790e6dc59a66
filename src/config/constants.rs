// Project-wide constants
//
// Centralised here so timeouts, addresses and protocol markers have one
// source of truth. Import via `use crate::config::constants::*;`.

/// Default lifetime of a pending waiter before it fails with a timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default bind address for the UI host link (localhost only).
pub const DEFAULT_UI_HOST_ADDR: &str = "127.0.0.1:47821";

/// Directory under the home directory holding config and the endpoint file.
pub const CONFIG_DIR_NAME: &str = ".parley";

/// File name of the endpoint file the UI host reads to find the link port.
pub const ENDPOINT_FILE_NAME: &str = "ui-host.json";

/// Protocol version reported when the client does not send one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Title used for native fallback dialogs.
pub const DEFAULT_DIALOG_TITLE: &str = "Parley";
