// Platform detection and back-end selection

use super::{DialogBackend, LinuxDialog, MacDialog, WindowsDialog};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    /// Linux and the BSDs: anything with an X11/Wayland dialog tool
    Linux,
    Windows,
    Other(String),
}

impl Platform {
    pub fn current() -> Self {
        Self::from_os_id(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value to a platform.
    pub fn from_os_id(id: &str) -> Self {
        match id {
            "macos" => Platform::MacOs,
            "linux" | "freebsd" | "openbsd" | "netbsd" | "dragonfly" => Platform::Linux,
            "windows" => Platform::Windows,
            other => Platform::Other(other.to_string()),
        }
    }
}

/// Dialog back-end for a platform, if it has one.
pub fn backend_for(platform: &Platform) -> Option<Arc<dyn DialogBackend>> {
    match platform {
        Platform::MacOs => Some(Arc::new(MacDialog)),
        Platform::Linux => Some(Arc::new(LinuxDialog::new())),
        Platform::Windows => Some(Arc::new(WindowsDialog)),
        Platform::Other(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_os_id() {
        assert_eq!(Platform::from_os_id("macos"), Platform::MacOs);
        assert_eq!(Platform::from_os_id("linux"), Platform::Linux);
        assert_eq!(Platform::from_os_id("freebsd"), Platform::Linux);
        assert_eq!(Platform::from_os_id("windows"), Platform::Windows);
        assert_eq!(
            Platform::from_os_id("ios"),
            Platform::Other("ios".to_string())
        );
    }

    #[test]
    fn test_backend_selection() {
        assert_eq!(backend_for(&Platform::MacOs).unwrap().name(), "macos");
        assert_eq!(backend_for(&Platform::Linux).unwrap().name(), "linux");
        assert_eq!(backend_for(&Platform::Windows).unwrap().name(), "windows");
        assert!(backend_for(&Platform::Other("wasi".into())).is_none());
    }
}
