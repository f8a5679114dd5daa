#![forbid(unsafe_code)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{Level as TraceLevel, info};
use tracing_subscriber::FmtSubscriber;

use xorgcfg::builder::XConfig;
use xorgcfg::hwdata::{Device, Monitor};
use xorgcfg::registry::{RegistryPaths, RegistryStore};
use xorgcfg::setup::ScreenRequest;
use xorgcfg::{constants, probe, setup};

#[derive(Parser, Debug)]
#[command(name = "xorgcfg", about = "X.org display configuration generator", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a failsafe 800x600 configuration without probing hardware
    Safe {
        /// Driver to configure
        #[arg(long, default_value = constants::defaults::SAFE_DRIVER)]
        driver: String,
    },
    /// Build a configuration from probed device and monitor facts
    Configure {
        /// Bus location, e.g. PCI:0:2:0
        #[arg(long)]
        bus_id: String,
        /// PCI vendor id, e.g. 8086
        #[arg(long)]
        vendor_id: String,
        /// PCI device id, e.g. 27a2
        #[arg(long)]
        device_id: String,
        /// Driver module name, e.g. intel
        #[arg(long)]
        driver: String,
        /// Horizontal sync range in kHz, e.g. 31.5-50
        #[arg(long, default_value = "31.5-50", value_parser = parse_range)]
        hsync: (f32, f32),
        /// Vertical refresh range in Hz, e.g. 50-70
        #[arg(long, default_value = "50-70", value_parser = parse_range)]
        vref: (f32, f32),
        /// Supported resolutions, preferred first
        #[arg(long, value_delimiter = ',', default_value = "800x600,640x480")]
        resolutions: Vec<String>,
    },
    /// Print the configured cards and screens from the registry
    Info,
    /// Parse a configuration file and print its normalized form
    Show {
        /// Path to the configuration file
        #[arg(default_value = constants::paths::XORG_CONF)]
        path: PathBuf,
    },
    /// Rebuild the screen sections from recorded facts
    SetScreens {
        /// Screen spec: card=<id>,monitor=<key>,resolution=<WxH>[,depth=<16|24>]
        #[arg(long = "screen", required = true, value_parser = parse_screen_request)]
        screens: Vec<ScreenRequest>,
    },
}

/// Parse a `lo-hi` float range argument.
fn parse_range(spec: &str) -> Result<(f32, f32), String> {
    let (lo, hi) = spec
        .split_once('-')
        .ok_or_else(|| format!("expected <min>-<max>, got '{spec}'"))?;
    let lo = lo.trim().parse::<f32>().map_err(|e| format!("bad range minimum: {e}"))?;
    let hi = hi.trim().parse::<f32>().map_err(|e| format!("bad range maximum: {e}"))?;
    if lo > hi {
        return Err(format!("range minimum {lo} exceeds maximum {hi}"));
    }
    Ok((lo, hi))
}

/// Parse one `--screen` argument of comma-separated `key=value` fields.
fn parse_screen_request(spec: &str) -> Result<ScreenRequest, String> {
    let mut card = None;
    let mut monitor = None;
    let mut resolution = None;
    let mut depth = None;

    for part in spec.split(',') {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got '{part}'"))?;
        let value = value.trim();
        match key.trim() {
            "card" => card = Some(value.to_string()),
            "monitor" => monitor = Some(value.to_string()),
            "resolution" => resolution = Some(value.to_string()),
            "depth" => {
                depth = Some(value.parse::<u8>().map_err(|e| format!("bad depth: {e}"))?);
            }
            other => return Err(format!("unknown field '{other}'")),
        }
    }

    Ok(ScreenRequest {
        card: card.ok_or("missing card")?,
        monitor: monitor.ok_or("missing monitor")?,
        resolution: resolution.ok_or("missing resolution")?,
        depth,
    })
}

fn main() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let conf_path = Path::new(constants::paths::XORG_CONF);
    let store = RegistryStore::new(RegistryPaths::default());

    match cli.command {
        Command::Safe { driver } => {
            let keymap = probe::query_keymap();
            setup::safe_configure(&driver, &keymap, conf_path, &store)?;
        }
        Command::Configure {
            bus_id,
            vendor_id,
            device_id,
            driver,
            hsync,
            vref,
            resolutions,
        } => {
            let mut device = Device::new(&bus_id, &vendor_id, &device_id);
            device.driver = driver;
            let monitor = Monitor {
                hsync,
                vref,
                res: resolutions,
                ..Monitor::default()
            };
            let keymap = probe::query_keymap();
            let touchpad = probe::query_touchpad();
            setup::configure(device, monitor, &keymap, touchpad, conf_path, &store)?;
        }
        Command::Info => {
            let registry = store.load();
            let cards = registry.list_cards();
            if cards.is_empty() {
                info!("no cards configured yet");
            }
            for line in cards {
                println!("{line}");
            }
            for card_id in &registry.cards {
                for line in registry.list_monitors(card_id) {
                    println!("  {line}");
                }
            }
            for (name, screen) in registry.screens() {
                println!(
                    "{name}: card={} monitor={} resolution={} depth={}",
                    screen.card, screen.monitor, screen.resolution, screen.depth
                );
            }
        }
        Command::Show { path } => {
            let config = XConfig::load_from(&path)?;
            print!("{}", config.render());
        }
        Command::SetScreens { screens } => {
            setup::set_screens(&screens, conf_path, &store)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("31.5-50"), Ok((31.5, 50.0)));
        assert_eq!(parse_range("50-70"), Ok((50.0, 70.0)));
        assert!(parse_range("50").is_err());
        assert!(parse_range("70-50").is_err());
    }

    #[test]
    fn test_parse_screen_request_full() {
        let req =
            parse_screen_request("card=8086:27a2@PCI:0:2:0,monitor=Monitor0,resolution=1024x768,depth=24")
                .unwrap();
        assert_eq!(req.card, "8086:27a2@PCI:0:2:0");
        assert_eq!(req.monitor, "Monitor0");
        assert_eq!(req.resolution, "1024x768");
        assert_eq!(req.depth, Some(24));
    }

    #[test]
    fn test_parse_screen_request_depth_optional() {
        let req = parse_screen_request("card=a,monitor=b,resolution=800x600").unwrap();
        assert_eq!(req.depth, None);
    }

    #[test]
    fn test_parse_screen_request_rejects_unknown_field() {
        assert!(parse_screen_request("card=a,monitor=b,resolution=c,rotate=left").is_err());
        assert!(parse_screen_request("monitor=b,resolution=c").is_err());
        assert!(parse_screen_request("garbage").is_err());
    }
}
