//! Deliverable location tests.
//!
//! # Scope
//! Two-phase search behavior: expected-path hits, verification against
//! same-named decoys, platform-preference tie-breaking, and full-set
//! resolution over a synthetic installer layout.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use unpacker_rs::locate::{builtin_specs, locate, locate_deliverables, PathFlavor};

fn spec(name: &str) -> unpacker_rs::locate::DeliverableSpec {
    builtin_specs()
        .into_iter()
        .find(|s| s.name == name)
        .expect("known spec name")
}

/// Create a verified usb_drivers candidate under `dir`.
fn plant_drivers(dir: &Path) {
    let candidate = dir.join("libusb_64_32");
    fs::create_dir_all(&candidate).unwrap();
    fs::write(candidate.join("58-pemicro.rules"), b"rules").unwrap();
}

#[test]
fn decoy_without_verification_sibling_is_rejected() {
    let tmp = TempDir::new().unwrap();
    // The decoy sorts first in walk order but lacks the rules file.
    fs::create_dir_all(tmp.path().join("a_docs/libusb_64_32")).unwrap();
    plant_drivers(&tmp.path().join("z_real"));

    let found = locate(tmp.path(), &spec("usb_drivers")).unwrap();
    assert_eq!(found, tmp.path().join("z_real/libusb_64_32"));
}

#[test]
fn linux_candidate_beats_windows_candidate_found_earlier() {
    let tmp = TempDir::new().unwrap();
    // Walk order visits the Windows-flavored candidate first; preference
    // must still pick the Linux-flavored one.
    plant_drivers(&tmp.path().join("a/win32"));
    plant_drivers(&tmp.path().join("z/linux-x86"));

    let found = locate(tmp.path(), &spec("usb_drivers")).unwrap();
    assert_eq!(found, tmp.path().join("z/linux-x86/libusb_64_32"));
}

#[test]
fn neutral_candidate_beats_windows_candidate() {
    let tmp = TempDir::new().unwrap();
    plant_drivers(&tmp.path().join("a/win32"));
    plant_drivers(&tmp.path().join("m/shared"));

    let found = locate(tmp.path(), &spec("usb_drivers")).unwrap();
    assert_eq!(found, tmp.path().join("m/shared/libusb_64_32"));
}

#[test]
fn same_flavor_ties_resolve_to_first_in_walk_order() {
    let tmp = TempDir::new().unwrap();
    plant_drivers(&tmp.path().join("alpha"));
    plant_drivers(&tmp.path().join("beta"));

    let found = locate(tmp.path(), &spec("usb_drivers")).unwrap();
    assert_eq!(found, tmp.path().join("alpha/libusb_64_32"));
}

#[test]
fn flavor_is_judged_on_the_relative_path_only() {
    // A Linux-flavored scratch prefix (e.g. /tmp/linux-ci/...) must not
    // promote every candidate under the root.
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("linux-host");
    plant_drivers(&root.join("a/win32"));
    plant_drivers(&root.join("b/shared"));

    let found = locate(&root, &spec("usb_drivers")).unwrap();
    assert_eq!(found, root.join("b/shared/libusb_64_32"));
    assert_eq!(
        PathFlavor::of_path(Path::new("a/win32/libusb_64_32")),
        PathFlavor::Windows
    );
}

#[test]
fn debug_server_resolves_through_versioned_plugin_dir() {
    let tmp = TempDir::new().unwrap();
    // A differently-versioned plugin than the expected fixed path carries.
    let lin = tmp
        .path()
        .join("eclipse/plugins/com.pemicro.debug.gdbjtag.ppc_2.0.1.202001011200/lin");
    fs::create_dir_all(&lin).unwrap();
    fs::write(lin.join("pegdbserver_power_console"), b"elf").unwrap();

    let found = locate(tmp.path(), &spec("debug_server")).unwrap();
    assert_eq!(found, lin);
}

#[test]
fn missing_deliverable_is_absent_not_an_error() {
    let tmp = TempDir::new().unwrap();
    plant_drivers(tmp.path());

    let set = locate_deliverables(tmp.path());
    assert!(set.usb_drivers.is_some());
    assert!(set.compiler.is_none());
    assert!(!set.is_complete());
    assert_eq!(set.missing(), vec!["compiler", "debug_server", "runtime_lib"]);
}

#[test]
fn full_layout_resolves_every_target() {
    let tmp = TempDir::new().unwrap();
    let layout = tmp.path().join("C_/MakingInstalers/Layout");

    let compiler = layout.join("Cross_Tools_zg_ia_sf/powerpc-eabivle-4_9");
    fs::create_dir_all(compiler.join("bin")).unwrap();
    fs::write(compiler.join("bin/powerpc-eabivle-gcc"), b"elf").unwrap();

    let lin = layout
        .join("eclipse_zg_ia_sf/plugins/com.pemicro.debug.gdbjtag.ppc_1.7.2.201709281658/lin");
    fs::create_dir_all(&lin).unwrap();
    fs::write(lin.join("pegdbserver_power_console"), b"elf").unwrap();

    let ewl = layout.join("S32DS_zg_ia_sf/e200_ewl2");
    fs::create_dir_all(ewl.join("EWL_C")).unwrap();

    let drivers = layout.join("Drivers_zg_ia_sf/libusb_64_32");
    fs::create_dir_all(&drivers).unwrap();
    fs::write(drivers.join("58-pemicro.rules"), b"rules").unwrap();

    let set = locate_deliverables(tmp.path());
    assert!(set.is_complete());
    assert_eq!(set.compiler.unwrap(), compiler);
    assert_eq!(set.debug_server.unwrap(), lin);
    assert_eq!(set.runtime_lib.unwrap(), ewl);
    assert_eq!(set.usb_drivers.unwrap(), drivers);
}
