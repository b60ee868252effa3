//! Installable-layout assembly.
//!
//! Collaborator boundary: consumes the paths produced by the locator and
//! produces a Debian package staging tree, then delegates to `dpkg-deb`.
//! Plain copying and string formatting; the expansion core never calls in
//! here.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::locate::DeliverableSet;

/// Package identity used for the staging prefix and control file.
pub const PACKAGE_NAME: &str = "s32ds-power-linux";

/// Error producing the final package artifact.
#[derive(Debug)]
pub enum AssembleError {
    Io(io::Error),
    /// `dpkg-deb` is not installed.
    BuilderMissing,
    /// `dpkg-deb` exited non-zero.
    BuilderFailed(String),
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "assembly I/O error: {e}"),
            Self::BuilderMissing => write!(f, "dpkg-deb not found on PATH"),
            Self::BuilderFailed(stderr) => write!(f, "dpkg-deb failed: {stderr}"),
        }
    }
}

impl std::error::Error for AssembleError {}

impl From<io::Error> for AssembleError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Install prefix inside the staging tree.
fn install_prefix(staging: &Path) -> PathBuf {
    staging.join("usr/local").join(PACKAGE_NAME)
}

/// Copy every resolved deliverable into the staging layout.
///
/// Absent deliverables are simply not staged; the caller reports them.
pub fn stage_deliverables(staging: &Path, set: &DeliverableSet) -> io::Result<()> {
    let prefix = install_prefix(staging);
    fs::create_dir_all(&prefix)?;

    if let Some(compiler) = &set.compiler {
        copy_tree(compiler, &prefix.join("powerpc-eabivle-4_9"))?;
    }
    if let Some(server) = &set.debug_server {
        copy_tree(server, &prefix.join("pegdbserver"))?;
    }
    if let Some(runtime) = &set.runtime_lib {
        copy_tree(runtime, &prefix.join("e200_ewl2"))?;
    }
    if let Some(drivers) = &set.usb_drivers {
        // Driver payload is a flat set of files; subdirectories (if any)
        // belong to the driver bundle and are copied as-is.
        copy_tree(drivers, &prefix.join("drivers"))?;
    }
    Ok(())
}

/// Write the Debian `control` and `postinst` files.
pub fn write_control_files(staging: &Path, version: &str) -> io::Result<()> {
    let debian = staging.join("DEBIAN");
    fs::create_dir_all(&debian)?;

    let control = format!(
        r"Package: {PACKAGE_NAME}
Version: {version}
Architecture: amd64
Maintainer: Automated Extraction
Description: NXP S32 Design Studio for Power Architecture - Extracted Toolchain
 Extracted toolchain containing:
  - PowerPC GCC compiler (eabivle-4.9)
  - P&E GDB server for PowerPC debugging
  - e200 EWL runtime library
  - USB drivers for P&E Micro debugging hardware
"
    );
    fs::write(debian.join("control"), control)?;

    let postinst = format!(
        r"#!/bin/bash
set -e

if [ -f /usr/local/{PACKAGE_NAME}/drivers/58-pemicro.rules ]; then
    cp -f /usr/local/{PACKAGE_NAME}/drivers/58-pemicro.rules /lib/udev/rules.d/
    if [ -e /sbin/udevadm ]; then
        /sbin/udevadm control --reload-rules
    fi
    chmod 644 /lib/udev/rules.d/58-pemicro.rules
fi

if [ -f /usr/local/{PACKAGE_NAME}/drivers/libp64-0.1.so.4 ]; then
    cp -f /usr/local/{PACKAGE_NAME}/drivers/libp64-0.1.so.4 /usr/lib/
    /sbin/ldconfig
fi

exit 0
"
    );
    let postinst_path = debian.join("postinst");
    fs::write(&postinst_path, postinst)?;

    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(&postinst_path, Permissions::from_mode(0o755))?;
    }
    Ok(())
}

/// Invoke `dpkg-deb --build` over the staging tree.
pub fn build_package(staging: &Path, output: &Path) -> Result<(), AssembleError> {
    let result = Command::new("dpkg-deb")
        .arg("--build")
        .arg(staging)
        .arg(output)
        .output();

    let out = match result {
        Ok(out) => out,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(AssembleError::BuilderMissing),
        Err(e) => return Err(AssembleError::Io(e)),
    };
    if !out.status.success() {
        return Err(AssembleError::BuilderFailed(
            String::from_utf8_lossy(&out.stderr).trim().to_string(),
        ));
    }
    Ok(())
}

/// Recursive copy preserving the source directory shape.
fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
