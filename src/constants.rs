//! Well-known paths and fixed defaults.
//!
//! Single source of truth for every filesystem location and magic default
//! the tool relies on. Code that needs a redirectable path for testing
//! takes it as a parameter instead of reading these directly.

/// Filesystem locations.
pub mod paths {
    /// The configuration file consumed by the display server.
    pub const XORG_CONF: &str = "/etc/X11/xorg.conf";

    /// Directory holding the persisted device/monitor registry.
    pub const REGISTRY_DIR: &str = "/var/lib/xorgcfg";

    /// File name of the registry inside [`REGISTRY_DIR`].
    pub const REGISTRY_FILE: &str = "registry.toml";

    /// One-line file naming the console keymap.
    pub const KEYMAP_FILE: &str = "/etc/mudur/keymap";

    /// Directory listing the installed xkb layout symbol files.
    pub const XKB_SYMBOLS_DIR: &str = "/usr/share/X11/xkb/symbols/pc";

    /// Kernel input device inventory, scanned for touchpad markers.
    pub const INPUT_DEVICES: &str = "/proc/bus/input/devices";
}

/// Fixed configuration defaults.
pub mod defaults {
    /// Keyboard layout used when the system keymap cannot be determined.
    pub const KEYMAP: &str = "trq";

    /// Driver used for no-probe failsafe configurations.
    pub const SAFE_DRIVER: &str = "vesa";

    /// Color depth forced by failsafe configurations.
    pub const SAFE_DEPTH: u8 = 16;
}
