//! Deterministic ZIP fixtures for integration tests.
//!
//! Output is Zip32-only with fixed timestamps, explicit sizes, and real
//! CRC-32 values (no data descriptors), so both the structured reader and
//! external tools accept the archives. Corruption knobs truncate otherwise
//! valid bytes.

#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::Path;

use flate2::write::DeflateEncoder;
use flate2::{Compression, Crc};

/// One entry in a fixture archive.
pub struct FixtureEntry<'a> {
    pub name: &'a str,
    pub payload: &'a [u8],
    pub deflate: bool,
}

impl<'a> FixtureEntry<'a> {
    pub fn stored(name: &'a str, payload: &'a [u8]) -> Self {
        Self {
            name,
            payload,
            deflate: false,
        }
    }

    pub fn deflated(name: &'a str, payload: &'a [u8]) -> Self {
        Self {
            name,
            payload,
            deflate: true,
        }
    }
}

fn u16le(v: u16) -> [u8; 2] {
    v.to_le_bytes()
}

fn u32le(v: u32) -> [u8; 4] {
    v.to_le_bytes()
}

fn crc32(payload: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(payload);
    crc.sum()
}

/// Build deterministic ZIP bytes.
///
/// Local header offsets recorded in the central directory are stable and
/// align with the written local headers.
pub fn zip_bytes(entries: &[FixtureEntry<'_>]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut cd = Vec::new();

    for entry in entries {
        let name_bytes = entry.name.as_bytes();
        let method: u16 = if entry.deflate { 8 } else { 0 };
        let crc = crc32(entry.payload);

        let data = if entry.deflate {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(entry.payload).expect("deflate fixture");
            encoder.finish().expect("deflate fixture finish")
        } else {
            entry.payload.to_vec()
        };

        let local_off = out.len() as u32;

        out.extend_from_slice(&u32le(0x04034b50));
        out.extend_from_slice(&u16le(20));
        out.extend_from_slice(&u16le(0));
        out.extend_from_slice(&u16le(method));
        out.extend_from_slice(&u16le(0));
        out.extend_from_slice(&u16le(0));
        out.extend_from_slice(&u32le(crc));
        out.extend_from_slice(&u32le(data.len() as u32));
        out.extend_from_slice(&u32le(entry.payload.len() as u32));
        out.extend_from_slice(&u16le(name_bytes.len() as u16));
        out.extend_from_slice(&u16le(0));
        out.extend_from_slice(name_bytes);
        out.extend_from_slice(&data);

        cd.extend_from_slice(&u32le(0x02014b50));
        cd.extend_from_slice(&u16le(20));
        cd.extend_from_slice(&u16le(20));
        cd.extend_from_slice(&u16le(0));
        cd.extend_from_slice(&u16le(method));
        cd.extend_from_slice(&u16le(0));
        cd.extend_from_slice(&u16le(0));
        cd.extend_from_slice(&u32le(crc));
        cd.extend_from_slice(&u32le(data.len() as u32));
        cd.extend_from_slice(&u32le(entry.payload.len() as u32));
        cd.extend_from_slice(&u16le(name_bytes.len() as u16));
        cd.extend_from_slice(&u16le(0));
        cd.extend_from_slice(&u16le(0));
        cd.extend_from_slice(&u16le(0));
        cd.extend_from_slice(&u16le(0));
        cd.extend_from_slice(&u32le(0));
        cd.extend_from_slice(&u32le(local_off));
        cd.extend_from_slice(name_bytes);
    }

    let cd_start = out.len() as u32;
    out.extend_from_slice(&cd);
    let cd_size = cd.len() as u32;

    out.extend_from_slice(&u32le(0x06054b50));
    out.extend_from_slice(&u16le(0));
    out.extend_from_slice(&u16le(0));
    out.extend_from_slice(&u16le(entries.len() as u16));
    out.extend_from_slice(&u16le(entries.len() as u16));
    out.extend_from_slice(&u32le(cd_size));
    out.extend_from_slice(&u32le(cd_start));
    out.extend_from_slice(&u16le(0));

    out
}

/// Convenience: a ZIP holding plain stored files.
pub fn zip_with_files(files: &[(&str, &[u8])]) -> Vec<u8> {
    let entries: Vec<FixtureEntry<'_>> = files
        .iter()
        .map(|(name, payload)| FixtureEntry::stored(name, payload))
        .collect();
    zip_bytes(&entries)
}

/// Write a fixture archive to disk.
pub fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
    fs::write(path, zip_with_files(files)).expect("write fixture archive");
}

/// Valid archive bytes truncated inside the central directory, so the
/// end-of-central-directory record is gone and no reader can recover.
pub fn corrupt_zip_bytes() -> Vec<u8> {
    let mut bytes = zip_with_files(&[("victim.txt", b"payload bytes")]);
    let cut = bytes.len() - 40;
    bytes.truncate(cut);
    bytes
}

/// A chain of `depth` archives: each wraps the next, the innermost holds
/// `leaf`. Extracting one layer always reveals exactly one new archive.
pub fn nested_zip_chain(depth: usize, leaf_name: &str, leaf_payload: &[u8]) -> Vec<u8> {
    assert!(depth >= 1);
    let mut bytes = zip_with_files(&[(leaf_name, leaf_payload)]);
    for level in 1..depth {
        let inner_name = format!("layer_{}.zip", depth - level);
        bytes = zip_with_files(&[(inner_name.as_str(), bytes.as_slice())]);
    }
    bytes
}
