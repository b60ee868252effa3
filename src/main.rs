//! Installer Unpacker CLI
//!
//! Carves the ZIP payload out of a self-extracting installer binary,
//! expands the nested archive tree to a fixpoint, locates the deliverable
//! artifacts, and packages them into an installable .deb layout.
//!
//! # Workflow
//!
//! 1. Carve payload: installer.bin -> installer_payload.zip
//! 2. Extract the payload into the work directory
//! 3. Namespaced JAR sweep, then flat ZIP sweep (or a single goal-directed
//!    combined sweep with `--until-targets`)
//! 4. Locate deliverables; report found/missing
//! 5. Stage the layout and build the package with dpkg-deb
//!
//! # Exit Codes
//!
//! - `0`: Success
//! - `1`: Runtime failure (carving, expansion, or packaging failed)
//! - `2`: Invalid arguments

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use unpacker_rs::assemble::{self, PACKAGE_NAME};
use unpacker_rs::expand::{ExpandConfig, FixpointDriver, PAYLOAD_FILE_NAME};
use unpacker_rs::locate::locate_deliverables;
use unpacker_rs::payload::carve_payload;
use unpacker_rs::progress::StderrSink;

fn print_usage(exe: &std::ffi::OsStr) {
    eprintln!(
        "usage: {} [OPTIONS] [installer.bin]

Carve, expand, and repackage a self-extracting installer. When no installer
path is given, the first .bin file in the current directory is used.

OPTIONS:
    --version=<V>       Package version (default: 2017.1)
    --output=<FILE>     Output .deb path (default: {}_<V>_amd64.deb)
    --work-dir=<DIR>    Expansion directory (default: installer)
    --until-targets     Stop expanding as soon as all deliverables are found
    --strict            Fail on the first unextractable archive
    --skip-package      Locate and report deliverables, skip dpkg-deb
    --help, -h          Show this help message",
        exe.to_string_lossy(),
        PACKAGE_NAME
    );
}

struct Options {
    installer: Option<PathBuf>,
    version: String,
    output: Option<PathBuf>,
    work_dir: PathBuf,
    until_targets: bool,
    strict: bool,
    skip_package: bool,
}

fn parse_args() -> Result<Options, ()> {
    let mut args = env::args_os();
    let exe = args.next().unwrap_or_else(|| "unpacker-rs".into());

    let mut opts = Options {
        installer: None,
        version: "2017.1".to_string(),
        output: None,
        work_dir: PathBuf::from("installer"),
        until_targets: false,
        strict: false,
        skip_package: false,
    };

    for arg in args {
        if let Some(flag) = arg.to_str() {
            if let Some(value) = flag.strip_prefix("--version=") {
                if value.is_empty() {
                    eprintln!("--version requires a value");
                    return Err(());
                }
                opts.version = value.to_string();
                continue;
            }
            if let Some(value) = flag.strip_prefix("--output=") {
                opts.output = Some(PathBuf::from(value));
                continue;
            }
            if let Some(value) = flag.strip_prefix("--work-dir=") {
                opts.work_dir = PathBuf::from(value);
                continue;
            }
            match flag {
                "--until-targets" => {
                    opts.until_targets = true;
                    continue;
                }
                "--strict" => {
                    opts.strict = true;
                    continue;
                }
                "--skip-package" => {
                    opts.skip_package = true;
                    continue;
                }
                "--help" | "-h" => {
                    print_usage(&exe);
                    std::process::exit(0);
                }
                _ if flag.starts_with("--") => {
                    eprintln!("unknown flag: {}", flag);
                    print_usage(&exe);
                    return Err(());
                }
                _ => {}
            }
        }

        if opts.installer.is_some() {
            print_usage(&exe);
            return Err(());
        }
        opts.installer = Some(PathBuf::from(arg));
    }
    Ok(opts)
}

/// First .bin file in the current directory, in name order.
fn find_installer_bin() -> Option<PathBuf> {
    let mut bins: Vec<PathBuf> = fs::read_dir(".")
        .ok()?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "bin"))
        .collect();
    bins.sort();
    bins.into_iter().next()
}

fn run(opts: &Options) -> Result<(), String> {
    let installer = match &opts.installer {
        Some(path) => path.clone(),
        None => find_installer_bin()
            .ok_or_else(|| "no .bin file found; pass an installer path".to_string())?,
    };
    if !installer.is_file() {
        return Err(format!("installer does not exist: {}", installer.display()));
    }

    let mut sink = StderrSink;

    // Step 1: carve the embedded payload.
    let payload = PathBuf::from(PAYLOAD_FILE_NAME);
    let offset = carve_payload(&installer, &payload).map_err(|e| e.to_string())?;
    eprintln!(
        "carved payload from {} (offset {offset}) -> {}",
        installer.display(),
        payload.display()
    );

    // Step 2: unpack the payload into a fresh work directory.
    if opts.work_dir.exists() {
        fs::remove_dir_all(&opts.work_dir)
            .map_err(|e| format!("cannot reset {}: {e}", opts.work_dir.display()))?;
    }
    let timeout = ExpandConfig::zip_sweep().tool_timeout;
    unpacker_rs::expand::extract_into(&payload, &opts.work_dir, timeout)
        .map_err(|e| e.to_string())?;
    fs::remove_file(&payload).map_err(|e| e.to_string())?;
    eprintln!("payload unpacked into {}", opts.work_dir.display());

    // Step 3: expand nested archives.
    if opts.until_targets {
        let config = ExpandConfig {
            corruption_tolerant: !opts.strict,
            ..ExpandConfig::goal_sweep()
        };
        let driver = FixpointDriver::new(config).map_err(|e| e.to_string())?;
        let goal = |root: &Path| locate_deliverables(root).is_complete();
        driver
            .run_until(&opts.work_dir, &goal, &mut sink)
            .map_err(|e| e.to_string())?;
    } else {
        for config in [ExpandConfig::jar_sweep(), ExpandConfig::zip_sweep()] {
            let config = ExpandConfig {
                corruption_tolerant: !opts.strict,
                ..config
            };
            let driver = FixpointDriver::new(config).map_err(|e| e.to_string())?;
            driver.run(&opts.work_dir, &mut sink).map_err(|e| e.to_string())?;
        }
    }

    // Step 4: locate deliverables.
    let set = locate_deliverables(&opts.work_dir);
    report(&set);

    if opts.skip_package {
        return Ok(());
    }

    // Step 5: stage and build.
    let staging = env::temp_dir().join(format!("{PACKAGE_NAME}-build-{}", std::process::id()));
    if staging.exists() {
        fs::remove_dir_all(&staging).map_err(|e| e.to_string())?;
    }
    assemble::stage_deliverables(&staging, &set).map_err(|e| e.to_string())?;
    assemble::write_control_files(&staging, &opts.version).map_err(|e| e.to_string())?;

    let output = opts.output.clone().unwrap_or_else(|| {
        PathBuf::from(format!("{PACKAGE_NAME}_{}_amd64.deb", opts.version))
    });
    let built = assemble::build_package(&staging, &output);
    let _ = fs::remove_dir_all(&staging);
    built.map_err(|e| e.to_string())?;

    eprintln!("package created: {}", output.display());
    Ok(())
}

fn report(set: &unpacker_rs::locate::DeliverableSet) {
    let row = |name: &str, path: &Option<PathBuf>| match path {
        Some(p) => eprintln!("  {name}: {}", p.display()),
        None => eprintln!("  {name}: not found"),
    };
    eprintln!("deliverables:");
    row("compiler", &set.compiler);
    row("debug server", &set.debug_server);
    row("runtime library", &set.runtime_lib);
    row("usb drivers", &set.usb_drivers);
}

fn main() -> ExitCode {
    let Ok(opts) = parse_args() else {
        return ExitCode::from(2);
    };
    match run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::FAILURE
        }
    }
}
