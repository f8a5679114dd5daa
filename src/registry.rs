//! Persisted registry of configured cards, monitors and screens.
//!
//! A small TOML document, independent of the display server's own
//! configuration grammar, recording what was configured last so later
//! incremental edits (screen changes, monitor swaps) can rebuild domain
//! objects without re-probing hardware.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::builder::{Layout, XConfig};
use crate::constants::paths;
use crate::hwdata::{Device, Monitor};
use crate::util::write_atomic;

/// Facts recorded for one configured screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenRecord {
    /// Card id of the driving device.
    pub card: String,
    /// Registry key of the attached monitor.
    pub monitor: String,
    pub resolution: String,
    pub depth: u8,
}

/// Facts recorded for one video card, keyed by its stable card id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardRecord {
    pub bus_id: String,
    pub vendor_id: String,
    pub device_id: String,
    pub vendor_name: String,
    pub board_name: String,
    pub driver: String,
    /// Registry keys of the monitors seen on this card.
    pub monitors: Vec<String>,
}

impl CardRecord {
    pub fn from_device(dev: &Device) -> Self {
        Self {
            bus_id: dev.bus_id.clone(),
            vendor_id: dev.vendor_id.clone(),
            device_id: dev.device_id.clone(),
            vendor_name: dev.vendor_name.clone(),
            board_name: dev.board_name.clone(),
            driver: dev.driver.clone(),
            monitors: dev.monitors.iter().filter_map(monitor_key).collect(),
        }
    }

    /// Rebuild the domain object recorded under `id`.
    pub fn to_device(&self, id: &str) -> Device {
        Device {
            id: id.to_string(),
            identifier: None,
            bus_id: self.bus_id.clone(),
            vendor_id: self.vendor_id.clone(),
            device_id: self.device_id.clone(),
            vendor_name: self.vendor_name.clone(),
            board_name: self.board_name.clone(),
            driver: self.driver.clone(),
            monitors: Vec::new(),
        }
    }
}

/// Facts recorded for one monitor, keyed by its configuration identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorRecord {
    pub probed: bool,
    pub digital: bool,
    pub hsync_min: f32,
    pub hsync_max: f32,
    pub vref_min: f32,
    pub vref_max: f32,
    pub resolutions: Vec<String>,
    pub eisa_id: String,
    pub vendor_name: String,
    pub model_name: String,
}

impl MonitorRecord {
    pub fn from_monitor(mon: &Monitor) -> Self {
        Self {
            probed: mon.probed,
            digital: mon.digital,
            hsync_min: mon.hsync.0,
            hsync_max: mon.hsync.1,
            vref_min: mon.vref.0,
            vref_max: mon.vref.1,
            resolutions: mon.res.clone(),
            eisa_id: mon.eisa_id.clone(),
            vendor_name: mon.vendor_name.clone(),
            model_name: mon.model_name.clone(),
        }
    }

    /// Rebuild the domain object recorded under `key`.
    pub fn to_monitor(&self, key: &str) -> Monitor {
        Monitor {
            id: key.to_string(),
            identifier: None,
            probed: self.probed,
            digital: self.digital,
            hsync: (self.hsync_min, self.hsync_max),
            vref: (self.vref_min, self.vref_max),
            res: self.resolutions.clone(),
            vendor_name: self.vendor_name.clone(),
            model_name: self.model_name.clone(),
            eisa_id: self.eisa_id.clone(),
        }
    }
}

/// The registry key a monitor is filed under: its stable probe id when
/// one is known (`EISA_…`, or the key it was loaded from), else the
/// `Monitor<N>` identifier assigned during screen setup.
fn monitor_key(mon: &Monitor) -> Option<String> {
    if !mon.id.is_empty() {
        return Some(mon.id.clone());
    }
    mon.identifier.clone()
}

/// The whole persisted registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_layout: Option<String>,
    /// Card ids in configuration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cards: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub screens: BTreeMap<String, ScreenRecord>,
    #[serde(default, rename = "card", skip_serializing_if = "BTreeMap::is_empty")]
    pub card_records: BTreeMap<String, CardRecord>,
    #[serde(default, rename = "monitor", skip_serializing_if = "BTreeMap::is_empty")]
    pub monitor_records: BTreeMap<String, MonitorRecord>,
}

impl Registry {
    /// Record a finished configuration: the layout, both screens, and the
    /// full card/monitor inventory when one was probed. With an empty
    /// `cards` slice the existing inventory is left untouched (screen-only
    /// edits).
    pub fn record_configuration(&mut self, config: &XConfig, layout: Layout, cards: &[Device]) {
        self.server_layout = Some(layout.as_str().to_string());

        for screen in [config.primary_screen(), config.secondary_screen()]
            .into_iter()
            .flatten()
        {
            let Some(monitor) = monitor_key(&screen.monitor) else {
                warn!(screen = %screen.identifier, "screen monitor has no registry key, skipping");
                continue;
            };
            self.screens.insert(
                screen.identifier.clone(),
                ScreenRecord {
                    card: screen.device.id.clone(),
                    monitor,
                    resolution: screen.res.clone(),
                    depth: screen.depth.unwrap_or(crate::constants::defaults::SAFE_DEPTH),
                },
            );
        }

        if !cards.is_empty() {
            self.cards = cards.iter().map(|c| c.id.clone()).collect();
        }

        for card in cards {
            self.card_records
                .insert(card.id.clone(), CardRecord::from_device(card));
            for mon in &card.monitors {
                let Some(key) = monitor_key(mon) else {
                    warn!(card = %card.id, "monitor has no registry key, skipping");
                    continue;
                };
                self.monitor_records
                    .insert(key, MonitorRecord::from_monitor(mon));
            }
        }
    }

    /// One line per configured card: `<id> <board> - <vendor>`.
    pub fn list_cards(&self) -> Vec<String> {
        self.cards
            .iter()
            .filter_map(|id| {
                self.card_records
                    .get(id)
                    .map(|c| format!("{id} {} - {}", c.board_name, c.vendor_name))
            })
            .collect()
    }

    /// One line per monitor recorded for the card: `<key> <model> - <vendor>`.
    pub fn list_monitors(&self, card_id: &str) -> Vec<String> {
        self.card_records
            .get(card_id)
            .map(|card| {
                card.monitors
                    .iter()
                    .filter_map(|key| {
                        self.monitor_records
                            .get(key)
                            .map(|m| format!("{key} {} - {}", m.model_name, m.vendor_name))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The configured screens in number order.
    pub fn screens(&self) -> Vec<(&str, &ScreenRecord)> {
        ["Screen0", "Screen1"]
            .iter()
            .filter_map(|name| self.screens.get_key_value(*name))
            .map(|(k, v)| (k.as_str(), v))
            .collect()
    }

    /// File a monitor under the lowest free `Monitor<N>` slot and return
    /// the allocated key.
    pub fn add_monitor(&mut self, record: MonitorRecord) -> String {
        let key = (0..)
            .map(|n| format!("Monitor{n}"))
            .find(|key| !self.monitor_records.contains_key(key))
            .expect("unbounded range");
        self.monitor_records.insert(key.clone(), record);
        key
    }

    /// Drop a monitor record. Returns whether anything was removed.
    pub fn remove_monitor(&mut self, key: &str) -> bool {
        self.monitor_records.remove(key).is_some()
    }
}

/// Where the registry lives on disk. Passed to [`RegistryStore::new`]
/// explicitly so tests can point it at a scratch directory.
#[derive(Debug, Clone)]
pub struct RegistryPaths {
    pub dir: PathBuf,
    pub file: String,
}

impl Default for RegistryPaths {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(paths::REGISTRY_DIR),
            file: paths::REGISTRY_FILE.to_string(),
        }
    }
}

/// Loads and saves the [`Registry`]. Stateless between calls; each
/// operation is one open-read-close or an atomic write.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    pub fn new(paths: RegistryPaths) -> Self {
        Self {
            path: paths.dir.join(paths.file),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the registry, starting empty when the file is missing or does
    /// not parse. A corrupt registry only costs re-probing, so it is not
    /// worth failing the whole operation over.
    pub fn load(&self) -> Registry {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                info!(path = %self.path.display(), error = %e, "no readable registry, starting empty");
                return Registry::default();
            }
        };
        match toml::from_str(&contents) {
            Ok(registry) => registry,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "registry does not parse, starting empty");
                Registry::default()
            }
        }
    }

    pub fn save(&self, registry: &Registry) -> Result<()> {
        let contents =
            toml::to_string_pretty(registry).context("Failed to serialize registry")?;
        write_atomic(&self.path, &contents)?;
        info!(path = %self.path.display(), "wrote registry");
        Ok(())
    }
}
