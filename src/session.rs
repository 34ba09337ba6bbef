//! Session-scoped flag storage.
//!
//! Holds the "bypass mode" flag (skip phone verification) and the developer
//! shortcut flag for the lifetime of a browser-like session. The onboarding
//! controller reads both once when it mounts and clears the bypass flag when
//! onboarding completes.

use std::sync::atomic::{AtomicBool, Ordering};

pub trait SessionFlags: Send + Sync {
    fn bypass_enabled(&self) -> bool;
    fn developer_shortcut(&self) -> bool;
    fn clear_bypass(&self);
}

/// Process-local flags.
#[derive(Debug, Default)]
pub struct MemorySessionFlags {
    bypass: AtomicBool,
    developer_shortcut: AtomicBool,
}

impl MemorySessionFlags {
    pub fn new(bypass: bool, developer_shortcut: bool) -> Self {
        Self {
            bypass: AtomicBool::new(bypass),
            developer_shortcut: AtomicBool::new(developer_shortcut),
        }
    }

    pub fn set_bypass(&self, enabled: bool) {
        self.bypass.store(enabled, Ordering::SeqCst);
    }
}

impl SessionFlags for MemorySessionFlags {
    fn bypass_enabled(&self) -> bool {
        self.bypass.load(Ordering::SeqCst)
    }

    fn developer_shortcut(&self) -> bool {
        self.developer_shortcut.load(Ordering::SeqCst)
    }

    fn clear_bypass(&self) {
        self.bypass.store(false, Ordering::SeqCst);
    }
}
