//! The configuration builder: assembles the canonical section tree a
//! working display setup needs and maps domain objects onto it.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::conf::{Document, Options, Section, Value};
use crate::constants::paths;
use crate::hwdata::{Device, Monitor, Screen, TouchpadKind};
use crate::util::write_atomic;

/// Server layout variants supported by [`XConfig::finalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    SingleHead,
    DualHead,
}

impl Layout {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SingleHead => "singleHead",
            Self::DualHead => "dualHead",
        }
    }
}

/// Modules loaded by every generated configuration, in emit order.
const MODULES: &[&str] = &[
    "dbe", "type1", "freetype", "record", "xtrap", "glx", "dri", "v4l", "extmod",
];

/// Font directories offered to the server, in emit order.
const FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/misc/",
    "/usr/share/fonts/dejavu/",
    "/usr/share/fonts/TTF/",
    "/usr/share/fonts/freefont/",
    "/usr/share/fonts/TrueType/",
    "/usr/share/fonts/corefonts",
    "/usr/share/fonts/Speedo/",
    "/usr/share/fonts/Type1/",
    "/usr/share/fonts/100dpi/",
    "/usr/share/fonts/75dpi/",
    "/usr/share/fonts/encodings/",
];

/// Builder façade over a [`Document`] holding one display configuration.
///
/// The canonical shape is fixed: `Module`, `Extensions`, `dri`, `Files`,
/// `ServerFlags`, the keyboard and mouse `InputDevice` pair, optionally a
/// touchpad, one or two `Device`/`Monitor`/`Screen` triples, and a closing
/// `ServerLayout`. Trees are transient: built or loaded, mutated, rendered,
/// discarded.
#[derive(Debug)]
pub struct XConfig {
    doc: Document,
    primary: Option<Screen>,
    secondary: Option<Screen>,
}

impl Default for XConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl XConfig {
    /// A configuration populated with the canonical defaults, no disk I/O.
    pub fn new() -> Self {
        let mut doc = Document::new();

        let mut module = Section::new("Module");
        for name in MODULES {
            module.add_str("Load", name);
        }
        let mut extmod = Section::new("extmod");
        extmod.options.set_flag("omit xfree86-dga");
        module.children.push(extmod);
        doc.sections.push(module);

        doc.sections.push(Section::new("Extensions"));

        let mut dri = Section::new("dri");
        dri.set_token("Mode", "0666");
        doc.sections.push(dri);

        let mut files = Section::new("Files");
        files.set_str("RgbPath", "/usr/lib/X11/rgb");
        for path in FONT_PATHS {
            files.add_str("FontPath", path);
        }
        doc.sections.push(files);

        let mut flags = Section::new("ServerFlags");
        flags.options.set("AllowMouseOpenFail", "true");
        flags.options.set("BlankTime", "0");
        flags.options.set("StandbyTime", "0");
        flags.options.set("SuspendTime", "0");
        flags.options.set("OffTime", "0");
        doc.sections.push(flags);

        let mut keyboard = Section::new("InputDevice");
        keyboard.set_str("Identifier", "Keyboard0");
        keyboard.set_str("Driver", "kbd");
        keyboard.options.set("AutoRepeat", "500 30");
        keyboard.options.set("XkbModel", "pc105");
        keyboard.options.set("XkbLayout", crate::constants::defaults::KEYMAP);
        doc.sections.push(keyboard);

        let mut mouse = Section::new("InputDevice");
        mouse.set_str("Identifier", "Mouse0");
        mouse.set_str("Driver", "mouse");
        mouse.options.set("Protocol", "ExplorerPS/2");
        mouse.options.set("Device", "/dev/input/mice");
        mouse.options.set("ZAxisMapping", "4 5 6 7");
        mouse.options.set("Buttons", "5");
        doc.sections.push(mouse);

        Self {
            doc,
            primary: None,
            secondary: None,
        }
    }

    /// Parse an existing configuration file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;
        let doc = Document::parse(&contents)
            .with_context(|| format!("Malformed configuration in {}", path.display()))?;
        info!(path = %path.display(), sections = doc.sections.len(), "loaded configuration");
        Ok(Self {
            doc,
            primary: None,
            secondary: None,
        })
    }

    /// Parse the system configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(paths::XORG_CONF))
    }

    /// Render to configuration text.
    pub fn render(&self) -> String {
        self.doc.render()
    }

    /// Write to `path` via a temp file and rename, so a failed write never
    /// leaves a truncated configuration behind.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        write_atomic(path, &self.render())?;
        info!(path = %path.display(), "wrote display configuration");
        Ok(())
    }

    /// Write the system configuration file.
    pub fn save(&self) -> Result<()> {
        self.save_to(Path::new(paths::XORG_CONF))
    }

    /// Read access to the underlying section tree.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn primary_screen(&self) -> Option<&Screen> {
        self.primary.as_ref()
    }

    pub fn secondary_screen(&self) -> Option<&Screen> {
        self.secondary.as_ref()
    }

    /// The cards driving the configured screens, with the screens'
    /// monitors (carrying their assigned identifiers) attached. A card
    /// driving both screens comes back once with both monitors.
    pub fn configured_cards(&self) -> Vec<Device> {
        let mut cards: Vec<Device> = Vec::new();
        for screen in [self.primary.as_ref(), self.secondary.as_ref()]
            .into_iter()
            .flatten()
        {
            match cards.iter_mut().find(|c| c.id == screen.device.id) {
                Some(card) => card.monitors.push(screen.monitor.clone()),
                None => {
                    let mut card = screen.device.clone();
                    card.monitors = vec![screen.monitor.clone()];
                    cards.push(card);
                }
            }
        }
        cards
    }

    /// Append a `Load` entry to the `Module` section.
    pub fn add_module(&mut self, name: &str) {
        self.doc.get_or_create("Module").add_str("Load", name);
    }

    /// Names of all loaded modules.
    pub fn modules(&self) -> Vec<String> {
        self.doc
            .find_section("Module")
            .map(|sec| {
                sec.entries
                    .iter()
                    .filter(|e| e.key == "Load")
                    .filter_map(|e| e.values.first())
                    .map(Value::to_plain_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Set one server flag option.
    pub fn set_flag(&mut self, flag: &str, value: &str) {
        self.doc.get_or_create("ServerFlags").options.set(flag, value);
    }

    /// The server flag options.
    pub fn flags(&self) -> Option<&Options> {
        self.doc.find_section("ServerFlags").map(|s| &s.options)
    }

    fn input_device(&self, driver: &str) -> Option<&Section> {
        self.doc
            .sections
            .iter()
            .find(|s| s.name == "InputDevice" && s.get_str("Driver") == Some(driver))
    }

    fn input_device_mut(&mut self, driver: &str) -> Option<&mut Section> {
        self.doc
            .sections_named_mut("InputDevice")
            .find(|s| s.get_str("Driver") == Some(driver))
    }

    /// Update options on the keyboard input device.
    pub fn set_keyboard<'a>(&mut self, options: impl IntoIterator<Item = (&'a str, &'a str)>) {
        if let Some(sec) = self.input_device_mut("kbd") {
            sec.options.extend(options);
        }
    }

    pub fn keyboard_options(&self) -> Option<&Options> {
        self.input_device("kbd").map(|s| &s.options)
    }

    /// Update options on the mouse input device.
    pub fn set_mouse<'a>(&mut self, options: impl IntoIterator<Item = (&'a str, &'a str)>) {
        if let Some(sec) = self.input_device_mut("mouse") {
            sec.options.extend(options);
        }
    }

    pub fn mouse_options(&self) -> Option<&Options> {
        self.input_device("mouse").map(|s| &s.options)
    }

    /// Apply a touchpad tuning profile, appending the touchpad input
    /// device section when none exists yet.
    pub fn set_touchpad(&mut self, kind: TouchpadKind) {
        if let Some(sec) = self.input_device_mut("synaptics") {
            sec.options.extend(kind.options().iter().copied());
            return;
        }

        let mut sec = Section::new("InputDevice");
        sec.set_str("Identifier", "Touchpad");
        sec.set_str("Driver", "synaptics");
        sec.options.extend(kind.options().iter().copied());
        self.doc.sections.push(sec);
        debug!(profile = ?kind, "added touchpad input device");
    }

    pub fn touchpad_options(&self) -> Option<&Options> {
        self.input_device("synaptics").map(|s| &s.options)
    }

    fn add_device(&mut self, dev: &Device, number: u8) {
        let mut sec = Section::new("Device");
        sec.set_int("Screen", i64::from(number));
        sec.set_str("Identifier", dev.identifier.as_deref().unwrap_or_default());
        sec.set_str("Driver", &dev.driver);
        sec.set_str("VendorName", &dev.vendor_name);
        sec.set_str("BoardName", &dev.board_name);
        self.doc.sections.push(sec);
    }

    fn add_monitor(&mut self, mon: &Monitor) {
        let mut sec = Section::new("Monitor");
        sec.set_str("Identifier", mon.identifier.as_deref().unwrap_or_default());
        sec.set_str("VendorName", &mon.vendor_name);
        sec.set_str("ModelName", &mon.model_name);
        sec.set_token("HorizSync", &range_token(mon.hsync));
        sec.set_token("VertRefresh", &range_token(mon.vref));
        self.doc.sections.push(sec);
    }

    fn add_screen(&mut self, scr: &Screen) {
        let depth = i64::from(scr.depth.unwrap_or(crate::constants::defaults::SAFE_DEPTH));

        let mut sec = Section::new("Screen");
        sec.set_str("Identifier", &scr.identifier);
        sec.set_str("Device", scr.device.identifier.as_deref().unwrap_or_default());
        sec.set_str("Monitor", scr.monitor.identifier.as_deref().unwrap_or_default());
        sec.set_int("DefaultDepth", depth);

        let mut display = Section::new("Display");
        display.set_int("Depth", depth);
        display.set(
            "Modes",
            scr.modes.iter().map(|m| Value::quoted(m.as_str())).collect(),
        );
        sec.children.push(display);

        self.doc.sections.push(sec);
    }

    fn add_screen_sections(&mut self, screen: &Screen) {
        self.add_device(&screen.device, screen.number);
        self.add_monitor(&screen.monitor);
        self.add_screen(screen);
    }

    /// Configure the primary (number 0) screen.
    pub fn set_primary_screen(&mut self, mut screen: Screen) {
        screen.setup(0);
        self.add_screen_sections(&screen);
        self.primary = Some(screen);
    }

    /// Configure the secondary (number 1) screen, for dual-head layouts.
    pub fn set_secondary_screen(&mut self, mut screen: Screen) {
        screen.setup(1);
        self.add_screen_sections(&screen);
        self.secondary = Some(screen);
    }

    /// Strip all screen-related sections, ahead of a rebuild.
    pub fn remove_screens(&mut self) {
        self.doc.remove_sections(&["Device", "Monitor", "Screen"]);
        self.primary = None;
        self.secondary = None;
    }

    fn bind_input_devices(&mut self, sec: &mut Section) {
        sec.add(
            "InputDevice",
            vec![Value::quoted("Mouse0"), Value::quoted("CorePointer")],
        );
        sec.add(
            "InputDevice",
            vec![Value::quoted("Keyboard0"), Value::quoted("CoreKeyboard")],
        );
        if self.touchpad_options().is_some() {
            self.add_module("synaptics");
            sec.add(
                "InputDevice",
                vec![Value::quoted("Touchpad"), Value::quoted("SendCoreEvents")],
            );
        }
    }

    /// Append the closing `ServerLayout` section.
    pub fn finalize(&mut self, layout: Layout) -> Result<()> {
        let mut sec = Section::new("ServerLayout");

        match layout {
            Layout::SingleHead => {
                let identifier = self
                    .primary
                    .as_ref()
                    .map(|s| s.identifier.clone())
                    .context("no primary screen configured")?;
                sec.set_str("Identifier", "SingleHead");
                sec.set_str("Screen", &identifier);
            }
            Layout::DualHead => {
                let primary = self
                    .primary
                    .as_ref()
                    .map(|s| s.identifier.clone())
                    .context("no primary screen configured")?;
                let secondary = self
                    .secondary
                    .as_ref()
                    .map(|s| s.identifier.clone())
                    .context("dual-head layout needs a secondary screen")?;
                sec.set_str("Identifier", "DualHead");
                sec.add(
                    "Screen",
                    vec![Value::Integer(0), Value::quoted(primary.as_str())],
                );
                sec.add(
                    "Screen",
                    vec![
                        Value::Integer(1),
                        Value::quoted(secondary.as_str()),
                        Value::token("RightOf"),
                        Value::quoted(primary.as_str()),
                    ],
                );
            }
        }

        self.bind_input_devices(&mut sec);
        sec.options.set("Xinerama", "off");
        sec.options.set("Clone", "off");

        self.doc.sections.push(sec);
        Ok(())
    }
}

/// A sync/refresh range as a single bare token, e.g. `31.5-50`.
fn range_token((lo, hi): (f32, f32)) -> String {
    format!("{lo}-{hi}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hwdata::{FALLBACK_HSYNC, FALLBACK_VREF};

    fn test_device(driver: &str) -> Device {
        let mut dev = Device::new("PCI:0:2:0", "8086", "27a2");
        dev.driver = driver.to_string();
        dev
    }

    fn test_monitor(res: &[&str]) -> Monitor {
        Monitor {
            res: res.iter().map(|s| s.to_string()).collect(),
            hsync: FALLBACK_HSYNC,
            vref: FALLBACK_VREF,
            ..Monitor::default()
        }
    }

    #[test]
    fn test_new_has_canonical_section_order() {
        let config = XConfig::new();
        let names: Vec<&str> = config
            .document()
            .sections
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(
            names,
            [
                "Module",
                "Extensions",
                "dri",
                "Files",
                "ServerFlags",
                "InputDevice",
                "InputDevice"
            ]
        );
    }

    #[test]
    fn test_new_defaults() {
        let config = XConfig::new();
        assert_eq!(
            config.modules(),
            ["dbe", "type1", "freetype", "record", "xtrap", "glx", "dri", "v4l", "extmod"]
        );
        assert_eq!(config.flags().unwrap().get("BlankTime"), Some("0"));
        assert_eq!(
            config.keyboard_options().unwrap().get("XkbModel"),
            Some("pc105")
        );
        assert_eq!(config.mouse_options().unwrap().get("Buttons"), Some("5"));

        // dri mode keeps its literal spelling
        let dri = config.document().find_section("dri").unwrap();
        assert_eq!(dri.value("Mode", 0), Some(&Value::token("0666")));

        // extmod subsection carries the bare flag option
        let module = config.document().find_section("Module").unwrap();
        assert_eq!(module.children[0].name, "extmod");
        assert_eq!(
            module.children[0].options.iter().next(),
            Some(("omit xfree86-dga", None))
        );
    }

    #[test]
    fn test_set_keyboard_updates_options() {
        let mut config = XConfig::new();
        config.set_keyboard([("XkbLayout", "us")]);
        assert_eq!(
            config.keyboard_options().unwrap().get("XkbLayout"),
            Some("us")
        );
        // untouched defaults survive
        assert_eq!(
            config.keyboard_options().unwrap().get("AutoRepeat"),
            Some("500 30")
        );
    }

    #[test]
    fn test_set_touchpad_appends_then_updates() {
        let mut config = XConfig::new();
        config.set_touchpad(TouchpadKind::Synaptics);
        assert_eq!(
            config.touchpad_options().unwrap().get("LeftEdge"),
            Some("1700")
        );

        // second call updates the existing section instead of adding one
        config.set_touchpad(TouchpadKind::Alps);
        assert_eq!(
            config.touchpad_options().unwrap().get("LeftEdge"),
            Some("130")
        );
        let touchpads = config
            .document()
            .sections
            .iter()
            .filter(|s| s.get_str("Identifier") == Some("Touchpad"))
            .count();
        assert_eq!(touchpads, 1);
    }

    #[test]
    fn test_primary_screen_sections() {
        let mut config = XConfig::new();
        let mut screen = Screen::new(test_device("nvidia"), test_monitor(&["1024x768", "800x600"]));
        screen.res = "1024x768".to_string();
        config.set_primary_screen(screen);

        let dev = config.document().find_section("Device").unwrap();
        assert_eq!(dev.get_int("Screen"), Some(0));
        assert_eq!(dev.get_str("Identifier"), Some("VideoCard0"));
        assert_eq!(dev.get_str("Driver"), Some("nvidia"));

        let mon = config.document().find_section("Monitor").unwrap();
        assert_eq!(mon.get_str("Identifier"), Some("Monitor0"));
        assert_eq!(mon.get_str("HorizSync"), Some("31.5-50"));
        assert_eq!(mon.get_str("VertRefresh"), Some("50-70"));

        let scr = config.document().find_section("Screen").unwrap();
        assert_eq!(scr.get_str("Device"), Some("VideoCard0"));
        assert_eq!(scr.get_str("Monitor"), Some("Monitor0"));
        assert_eq!(scr.get_int("DefaultDepth"), Some(24));
        assert_eq!(scr.children[0].get_int("Depth"), Some(24));
    }

    #[test]
    fn test_finalize_single_head_binds_core_devices() {
        let mut config = XConfig::new();
        config.set_primary_screen(Screen::new(test_device("intel"), test_monitor(&["800x600"])));
        config.finalize(Layout::SingleHead).unwrap();

        let layout = config.document().find_section("ServerLayout").unwrap();
        assert_eq!(layout.get_str("Identifier"), Some("SingleHead"));
        assert_eq!(layout.get_str("Screen"), Some("Screen0"));
        assert_eq!(layout.options.get("Xinerama"), Some("off"));
        assert_eq!(layout.options.get("Clone"), Some("off"));

        let bindings: Vec<String> = layout
            .entries
            .iter()
            .filter(|e| e.key == "InputDevice")
            .map(|e| e.to_string())
            .collect();
        assert_eq!(
            bindings,
            [
                "InputDevice\t\"Mouse0\" \"CorePointer\"",
                "InputDevice\t\"Keyboard0\" \"CoreKeyboard\""
            ]
        );
    }

    #[test]
    fn test_finalize_with_touchpad_loads_module_and_binds() {
        let mut config = XConfig::new();
        config.set_touchpad(TouchpadKind::Alps);
        config.set_primary_screen(Screen::new(test_device("intel"), test_monitor(&["800x600"])));
        config.finalize(Layout::SingleHead).unwrap();

        assert!(config.modules().iter().any(|m| m == "synaptics"));
        let layout = config.document().find_section("ServerLayout").unwrap();
        assert!(
            layout
                .entries
                .iter()
                .any(|e| e.key == "InputDevice"
                    && e.values.first() == Some(&Value::quoted("Touchpad")))
        );
    }

    #[test]
    fn test_finalize_without_primary_fails() {
        let mut config = XConfig::new();
        assert!(config.finalize(Layout::SingleHead).is_err());
    }

    #[test]
    fn test_finalize_dual_head_places_second_screen() {
        let mut config = XConfig::new();
        config.set_primary_screen(Screen::new(test_device("intel"), test_monitor(&["1024x768"])));
        config.set_secondary_screen(Screen::new(test_device("intel"), test_monitor(&["800x600"])));
        config.finalize(Layout::DualHead).unwrap();

        let layout = config.document().find_section("ServerLayout").unwrap();
        assert_eq!(layout.get_str("Identifier"), Some("DualHead"));
        let screens: Vec<String> = layout
            .entries
            .iter()
            .filter(|e| e.key == "Screen")
            .map(|e| e.to_string())
            .collect();
        assert_eq!(
            screens,
            [
                "Screen\t0 \"Screen0\"",
                "Screen\t1 \"Screen1\" RightOf \"Screen0\""
            ]
        );
    }

    #[test]
    fn test_remove_screens_strips_triples() {
        let mut config = XConfig::new();
        config.set_primary_screen(Screen::new(test_device("intel"), test_monitor(&["800x600"])));
        assert!(config.document().find_section("Device").is_some());

        config.remove_screens();
        assert!(config.document().find_section("Device").is_none());
        assert!(config.document().find_section("Monitor").is_none());
        assert!(config.document().find_section("Screen").is_none());
        assert!(config.primary_screen().is_none());
        // non-screen sections survive
        assert!(config.document().find_section("Module").is_some());
    }

    #[test]
    fn test_builder_document_round_trips() {
        let mut config = XConfig::new();
        config.set_touchpad(TouchpadKind::Synaptics);
        let mut screen = Screen::new(
            test_device("nvidia"),
            test_monitor(&["1280x1024", "1024x768", "800x600"]),
        );
        screen.res = "1024x768".to_string();
        config.set_primary_screen(screen);
        config.finalize(Layout::SingleHead).unwrap();

        let text = config.render();
        let reparsed = Document::parse(&text).unwrap();
        assert_eq!(config.document(), &reparsed);
    }

    #[test]
    fn test_single_head_end_to_end() {
        let mut config = XConfig::new();
        let mut screen = Screen::new(test_device("intel"), test_monitor(&["1024x768", "800x600"]));
        screen.res = "800x600".to_string();
        config.set_primary_screen(screen);
        config.finalize(Layout::SingleHead).unwrap();

        let text = config.render();
        assert_eq!(text.matches("Section \"Device\"").count(), 1);
        assert_eq!(text.matches("Section \"Monitor\"").count(), 1);
        assert_eq!(text.matches("Section \"Screen\"").count(), 1);
        assert!(text.contains("Driver\t\"intel\""));
        assert!(text.contains("HorizSync\t31.5-50"));
        // 800x600 is last in the monitor's list, so the rotated tail is
        // just the requested mode
        assert!(text.contains("\t\tModes\t\"800x600\"\n"));
        assert_eq!(config.primary_screen().unwrap().modes, ["800x600"]);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xorg.conf");

        let mut config = XConfig::new();
        config.set_primary_screen(Screen::new(test_device("vesa"), test_monitor(&["800x600"])));
        config.finalize(Layout::SingleHead).unwrap();
        config.save_to(&path).unwrap();

        let loaded = XConfig::load_from(&path).unwrap();
        assert_eq!(loaded.document(), config.document());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(XConfig::load_from(&dir.path().join("absent.conf")).is_err());
    }
}
