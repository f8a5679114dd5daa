//! High-level configuration workflows: failsafe setup, configuration from
//! probe results, and screen reconfiguration from recorded facts.

use anyhow::{Context, Result, bail};
use std::path::Path;
use tracing::info;

use crate::builder::{Layout, XConfig};
use crate::constants::defaults;
use crate::hwdata::{Device, Monitor, Screen, TouchpadKind};
use crate::registry::RegistryStore;

/// One screen of a reconfiguration request, resolved against the
/// registry by [`set_screens`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenRequest {
    /// Card id recorded in the registry.
    pub card: String,
    /// Monitor key recorded in the registry.
    pub monitor: String,
    /// Requested resolution, e.g. `1024x768`.
    pub resolution: String,
    /// Explicit depth; derived from the driver when absent.
    pub depth: Option<u8>,
}

/// Write a failsafe single-head configuration without touching hardware:
/// a fabricated card for `driver`, conservative monitor timings, 16-bit
/// depth.
pub fn safe_configure(
    driver: &str,
    keymap: &str,
    conf_path: &Path,
    store: &RegistryStore,
) -> Result<()> {
    let tag = driver.to_uppercase();

    let dev = Device {
        id: format!("{tag}_CONFIGURED_CARD"),
        driver: driver.to_string(),
        vendor_name: format!("{tag} Configured Vendor"),
        board_name: format!("{tag} Configured Board"),
        ..Device::default()
    };
    let mut mon = Monitor::failsafe();
    mon.vendor_name = format!("{tag} Configured Vendor");
    mon.model_name = format!("{tag} Configured Model");

    let mut screen = Screen::new(dev, mon);
    screen.depth = Some(defaults::SAFE_DEPTH);

    let mut config = XConfig::new();
    config.set_keyboard([("XkbLayout", keymap)]);
    config.set_primary_screen(screen);
    config.finalize(Layout::SingleHead)?;
    config.save_to(conf_path)?;

    let mut registry = store.load();
    registry.record_configuration(&config, Layout::SingleHead, &config.configured_cards());
    store.save(&registry)?;

    info!(driver, "failsafe configuration written");
    Ok(())
}

/// Build a single-head configuration from externally probed device and
/// monitor facts, at the monitor's preferred resolution.
pub fn configure(
    device: Device,
    monitor: Monitor,
    keymap: &str,
    touchpad: Option<TouchpadKind>,
    conf_path: &Path,
    store: &RegistryStore,
) -> Result<()> {
    let screen = Screen::new(device, monitor);

    let mut config = XConfig::new();
    config.set_keyboard([("XkbLayout", keymap)]);
    if let Some(kind) = touchpad {
        config.set_touchpad(kind);
    }
    config.set_primary_screen(screen);
    config.finalize(Layout::SingleHead)?;
    config.save_to(conf_path)?;

    let mut registry = store.load();
    registry.record_configuration(&config, Layout::SingleHead, &config.configured_cards());
    store.save(&registry)?;

    info!("configuration written");
    Ok(())
}

/// Rebuild the screen sections of the written configuration from
/// registry facts: strip the old `Device`/`Monitor`/`Screen` triples and
/// add one per request. The rest of the file (modules, input devices,
/// server layout) is left as loaded.
pub fn set_screens(
    requests: &[ScreenRequest],
    conf_path: &Path,
    store: &RegistryStore,
) -> Result<()> {
    if requests.is_empty() || requests.len() > 2 {
        bail!("expected one or two screens, got {}", requests.len());
    }

    let mut registry = store.load();
    let mut config = XConfig::load_from(conf_path)?;
    config.remove_screens();

    for (index, request) in requests.iter().enumerate() {
        let card = registry
            .card_records
            .get(&request.card)
            .with_context(|| format!("unknown card {}", request.card))?;
        let monitor = registry
            .monitor_records
            .get(&request.monitor)
            .with_context(|| format!("unknown monitor {}", request.monitor))?;

        let mut screen = Screen::new(
            card.to_device(&request.card),
            monitor.to_monitor(&request.monitor),
        );
        screen.res = request.resolution.clone();
        screen.depth = request.depth;

        if index == 0 {
            config.set_primary_screen(screen);
        } else {
            config.set_secondary_screen(screen);
        }
    }

    config.save_to(conf_path)?;

    let layout = if requests.len() == 2 {
        Layout::DualHead
    } else {
        Layout::SingleHead
    };
    registry.record_configuration(&config, layout, &[]);
    store.save(&registry)?;

    info!(screens = requests.len(), "screen sections rebuilt");
    Ok(())
}
