//! Light text probes: the console keymap and the touchpad protocol.
//!
//! These are the only probes the tool performs itself, both plain text
//! reads. Everything heavier (PCI enumeration, DDC/EDID, driver
//! databases) is a collaborator's job and enters the core as already
//! typed [`crate::hwdata`] objects.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::constants::{defaults, paths};
use crate::hwdata::TouchpadKind;

/// The keyboard layout to configure, from the system keymap file.
pub fn query_keymap() -> String {
    query_keymap_from(
        Path::new(paths::KEYMAP_FILE),
        Path::new(paths::XKB_SYMBOLS_DIR),
    )
}

/// Testable variant of [`query_keymap`] with explicit paths.
///
/// Falls back to the built-in default when the file is missing or the
/// named layout has no symbol file installed. Variant suffixes after a
/// `-` are stripped; the symbol files do not carry them.
pub fn query_keymap_from(keymap_file: &Path, symbols_dir: &Path) -> String {
    let mut kmap = fs::read_to_string(keymap_file)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    if kmap.is_empty() {
        kmap = defaults::KEYMAP.to_string();
    }
    if let Some((base, _)) = kmap.split_once('-') {
        kmap = base.to_string();
    }

    match installed_keymaps(symbols_dir) {
        Some(installed) if !installed.contains(&kmap) => {
            debug!(keymap = %kmap, "keymap has no installed symbol file, using default");
            defaults::KEYMAP.to_string()
        }
        _ => kmap,
    }
}

/// Names of the installed layout symbol files, `None` when the directory
/// cannot be read (in which case validation is skipped).
fn installed_keymaps(dir: &Path) -> Option<Vec<String>> {
    let entries = fs::read_dir(dir).ok()?;
    Some(
        entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
    )
}

/// Scan the kernel input inventory for a known touchpad.
pub fn query_touchpad() -> Option<TouchpadKind> {
    let inventory = fs::read_to_string(paths::INPUT_DEVICES).ok()?;
    detect_touchpad(&inventory)
}

/// Recognize a touchpad protocol from input inventory text.
pub fn detect_touchpad(inventory: &str) -> Option<TouchpadKind> {
    for line in inventory.lines() {
        if line.contains("SynPS/2") {
            return Some(TouchpadKind::Synaptics);
        }
        if line.contains("AlpsPS/2") {
            return Some(TouchpadKind::Alps);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_synaptics() {
        let inventory = "\
I: Bus=0011 Vendor=0002 Product=0007 Version=01b1
N: Name=\"SynPS/2 Synaptics TouchPad\"
P: Phys=isa0060/serio1/input0
";
        assert_eq!(detect_touchpad(inventory), Some(TouchpadKind::Synaptics));
    }

    #[test]
    fn test_detect_alps() {
        let inventory = "N: Name=\"AlpsPS/2 ALPS GlidePoint\"\n";
        assert_eq!(detect_touchpad(inventory), Some(TouchpadKind::Alps));
    }

    #[test]
    fn test_detect_none_without_markers() {
        let inventory = "N: Name=\"AT Translated Set 2 keyboard\"\n";
        assert_eq!(detect_touchpad(inventory), None);
    }

    #[test]
    fn test_keymap_missing_file_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let kmap = query_keymap_from(&dir.path().join("keymap"), &dir.path().join("symbols"));
        assert_eq!(kmap, defaults::KEYMAP);
    }

    #[test]
    fn test_keymap_reads_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let keymap_file = dir.path().join("keymap");
        let symbols = dir.path().join("symbols");
        fs::create_dir(&symbols).unwrap();
        fs::write(symbols.join("us"), "").unwrap();
        fs::write(&keymap_file, "us\n").unwrap();

        assert_eq!(query_keymap_from(&keymap_file, &symbols), "us");
    }

    #[test]
    fn test_keymap_variant_suffix_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let keymap_file = dir.path().join("keymap");
        let symbols = dir.path().join("symbols");
        fs::create_dir(&symbols).unwrap();
        fs::write(symbols.join("us"), "").unwrap();
        fs::write(&keymap_file, "us-intl\n").unwrap();

        assert_eq!(query_keymap_from(&keymap_file, &symbols), "us");
    }

    #[test]
    fn test_keymap_unknown_layout_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let keymap_file = dir.path().join("keymap");
        let symbols = dir.path().join("symbols");
        fs::create_dir(&symbols).unwrap();
        fs::write(symbols.join("us"), "").unwrap();
        fs::write(&keymap_file, "nosuch\n").unwrap();

        assert_eq!(query_keymap_from(&keymap_file, &symbols), defaults::KEYMAP);
    }
}
