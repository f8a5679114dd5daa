//! Domain objects describing probed hardware: video devices, monitors and
//! the screens binding them together.
//!
//! Nothing in here touches the hardware. Probe collaborators fill these in
//! from sysfs/DDC/driver databases; this module only models the facts and
//! the few derivations the configuration builder needs.

use tracing::debug;

/// Drivers that can run a 24-bit default depth. Everything else falls back
/// to 16-bit.
pub const TRUECOLOR_DRIVERS: &[&str] = &["i810", "intel", "nv", "nvidia", "radeon", "fglrx"];

/// Failsafe sync ranges used when nothing could be probed.
pub const FALLBACK_HSYNC: (f32, f32) = (31.5, 50.0);
pub const FALLBACK_VREF: (f32, f32) = (50.0, 70.0);

/// Resolutions every display is assumed to manage.
pub const FALLBACK_RESOLUTIONS: &[&str] = &["800x600", "640x480"];

/// A video adapter, as reported by the probing collaborator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Device {
    /// Stable card id, `<vendorId>:<deviceId>@<busId>` for real hardware.
    pub id: String,
    /// Identifier written into the configuration, assigned per screen.
    pub identifier: Option<String>,
    pub bus_id: String,
    pub vendor_id: String,
    pub device_id: String,
    pub vendor_name: String,
    pub board_name: String,
    /// Chosen driver module name, e.g. `intel` or `vesa`.
    pub driver: String,
    /// Monitors attached to this card, preferred output first.
    pub monitors: Vec<Monitor>,
}

impl Device {
    pub fn new(bus_id: &str, vendor_id: &str, device_id: &str) -> Self {
        Self {
            id: format!("{vendor_id}:{device_id}@{bus_id}"),
            bus_id: bus_id.to_string(),
            vendor_id: vendor_id.to_string(),
            device_id: device_id.to_string(),
            vendor_name: "Unknown Vendor".to_string(),
            board_name: "Unknown Board".to_string(),
            ..Self::default()
        }
    }
}

/// A display, as reported by the probing collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct Monitor {
    /// Stable monitor id, e.g. `EISA_<id>` for DDC-probed displays.
    pub id: String,
    /// Identifier written into the configuration, assigned per screen.
    pub identifier: Option<String>,
    /// Whether the probe actually saw the display (vs. assumed defaults).
    pub probed: bool,
    /// Digital input (LCD panel) vs. analog.
    pub digital: bool,
    /// Horizontal sync range in kHz.
    pub hsync: (f32, f32),
    /// Vertical refresh range in Hz.
    pub vref: (f32, f32),
    /// Supported resolutions, preferred/native mode first.
    pub res: Vec<String>,
    pub vendor_name: String,
    pub model_name: String,
    pub eisa_id: String,
}

impl Default for Monitor {
    fn default() -> Self {
        Self {
            id: String::new(),
            identifier: None,
            probed: false,
            digital: false,
            hsync: (0.0, 0.0),
            vref: (0.0, 0.0),
            res: FALLBACK_RESOLUTIONS.iter().map(|s| s.to_string()).collect(),
            vendor_name: "Unknown Vendor".to_string(),
            model_name: "Unknown Model".to_string(),
            eisa_id: String::new(),
        }
    }
}

impl Monitor {
    /// A monitor with the conservative failsafe timings, for configurations
    /// built without probing.
    pub fn failsafe() -> Self {
        Self {
            hsync: FALLBACK_HSYNC,
            vref: FALLBACK_VREF,
            ..Self::default()
        }
    }
}

/// One configured screen: a device/monitor pair plus the requested mode.
///
/// The derived fields (`identifier`, `depth`, `modes`) are computed by
/// [`Screen::setup`] once the screen number is known.
#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    pub device: Device,
    pub monitor: Monitor,
    /// 0 = primary, 1 = secondary.
    pub number: u8,
    pub identifier: String,
    /// Explicit color depth. Left `None`, a default is derived from the
    /// driver during setup.
    pub depth: Option<u8>,
    /// Requested resolution, e.g. `1024x768`.
    pub res: String,
    /// Modes offered to the server, requested resolution first.
    pub modes: Vec<String>,
}

impl Screen {
    pub fn new(device: Device, monitor: Monitor) -> Self {
        let res = monitor
            .res
            .first()
            .cloned()
            .unwrap_or_else(|| FALLBACK_RESOLUTIONS[0].to_string());
        Self {
            device,
            monitor,
            number: 0,
            identifier: String::new(),
            depth: None,
            res,
            modes: Vec::new(),
        }
    }

    /// Derive the per-screen fields for the given screen number.
    ///
    /// Identifiers become `Screen<N>`/`Monitor<N>`/`VideoCard<N>`. The
    /// depth defaults to 24 for truecolor-capable drivers and 16 otherwise,
    /// unless set explicitly. The mode list is the monitor's resolution
    /// list starting at the requested resolution; a resolution the monitor
    /// did not report is prepended instead.
    pub fn setup(&mut self, number: u8) {
        self.number = number;
        self.identifier = format!("Screen{number}");
        self.monitor.identifier = Some(format!("Monitor{number}"));
        self.device.identifier = Some(format!("VideoCard{number}"));

        let depth = self.depth.unwrap_or_else(|| {
            if TRUECOLOR_DRIVERS.contains(&self.device.driver.as_str()) {
                24
            } else {
                16
            }
        });
        self.depth = Some(depth);

        self.modes = match self.monitor.res.iter().position(|r| *r == self.res) {
            Some(i) => self.monitor.res[i..].to_vec(),
            None => {
                let mut modes = Vec::with_capacity(self.monitor.res.len() + 1);
                modes.push(self.res.clone());
                modes.extend(self.monitor.res.iter().cloned());
                modes
            }
        };
        debug!(screen = %self.identifier, depth, modes = ?self.modes, "screen setup");
    }
}

/// Touchpad protocols with a built-in tuning profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchpadKind {
    Synaptics,
    Alps,
}

impl TouchpadKind {
    /// The per-protocol option table written into the touchpad's
    /// `InputDevice` section.
    pub fn options(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Synaptics => &[
                ("Protocol", "auto-dev"),
                ("Device", "/dev/input/mice"),
                ("LeftEdge", "1700"),
                ("RightEdge", "5300"),
                ("TopEdge", "1700"),
                ("BottomEdge", "4200"),
                ("FingerLow", "25"),
                ("FingerHigh", "30"),
                ("MaxTapTime", "180"),
                ("MaxTapMove", "220"),
                ("VertScrollDelta", "100"),
                ("MinSpeed", "0.09"),
                ("MaxSpeed", "0.18"),
                ("AccelFactor", "0.0015"),
                ("SHMConfig", "on"),
            ],
            Self::Alps => &[
                ("Protocol", "auto-dev"),
                ("LeftEdge", "130"),
                ("RightEdge", "840"),
                ("TopEdge", "130"),
                ("BottomEdge", "640"),
                ("FingerLow", "7"),
                ("FingerHigh", "8"),
                ("MaxTapTime", "300"),
                ("MaxTapMove", "110"),
                ("EmulateMidButtonTime", "75"),
                ("VertScrollDelta", "20"),
                ("HorizScrollDelta", "20"),
                ("MinSpeed", "0.60"),
                ("MaxSpeed", "1.10"),
                ("AccelFactor", "0.030"),
                ("SHMConfig", "on"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor_with_res(res: &[&str]) -> Monitor {
        Monitor {
            res: res.iter().map(|s| s.to_string()).collect(),
            hsync: FALLBACK_HSYNC,
            vref: FALLBACK_VREF,
            ..Monitor::default()
        }
    }

    fn device_with_driver(driver: &str) -> Device {
        let mut dev = Device::new("PCI:0:2:0", "8086", "27a2");
        dev.driver = driver.to_string();
        dev
    }

    #[test]
    fn test_card_id_derivation() {
        let dev = Device::new("PCI:1:0:0", "10de", "0240");
        assert_eq!(dev.id, "10de:0240@PCI:1:0:0");
    }

    #[test]
    fn test_setup_assigns_identifiers() {
        let mut scr = Screen::new(device_with_driver("intel"), monitor_with_res(&["800x600"]));
        scr.setup(1);
        assert_eq!(scr.identifier, "Screen1");
        assert_eq!(scr.monitor.identifier.as_deref(), Some("Monitor1"));
        assert_eq!(scr.device.identifier.as_deref(), Some("VideoCard1"));
    }

    #[test]
    fn test_mode_rotation_starts_at_requested_resolution() {
        let mon = monitor_with_res(&["1280x1024", "1024x768", "800x600"]);
        let mut scr = Screen::new(device_with_driver("intel"), mon);
        scr.res = "1024x768".to_string();
        scr.setup(0);
        assert_eq!(scr.modes, ["1024x768", "800x600"]);
    }

    #[test]
    fn test_unknown_resolution_is_prepended() {
        let mon = monitor_with_res(&["1280x1024", "1024x768", "800x600"]);
        let mut scr = Screen::new(device_with_driver("intel"), mon);
        scr.res = "640x480".to_string();
        scr.setup(0);
        assert_eq!(scr.modes, ["640x480", "1280x1024", "1024x768", "800x600"]);
    }

    #[test]
    fn test_requested_resolution_defaults_to_preferred() {
        let mon = monitor_with_res(&["1400x1050", "1024x768"]);
        let scr = Screen::new(device_with_driver("intel"), mon);
        assert_eq!(scr.res, "1400x1050");
    }

    #[test]
    fn test_depth_defaults_by_driver() {
        let mut scr = Screen::new(device_with_driver("nvidia"), Monitor::failsafe());
        scr.setup(0);
        assert_eq!(scr.depth, Some(24));

        let mut scr = Screen::new(device_with_driver("vesa"), Monitor::failsafe());
        scr.setup(0);
        assert_eq!(scr.depth, Some(16));
    }

    #[test]
    fn test_explicit_depth_wins() {
        let mut scr = Screen::new(device_with_driver("nvidia"), Monitor::failsafe());
        scr.depth = Some(16);
        scr.setup(0);
        assert_eq!(scr.depth, Some(16));
    }

    #[test]
    fn test_touchpad_profiles_differ() {
        let syn = TouchpadKind::Synaptics.options();
        let alps = TouchpadKind::Alps.options();
        assert!(syn.iter().any(|&(k, v)| k == "LeftEdge" && v == "1700"));
        assert!(alps.iter().any(|&(k, v)| k == "LeftEdge" && v == "130"));
    }
}
