/*
Copyright 2022 Daniel Brotsky. All rights reserved.

All of the copyrighted work in this repository is licensed under the
GNU Affero General Public License, reproduced in the LICENSE-AGPL file.

Attribution:

Some source files in this repository are derived from files in two Adobe Open
Source projects: the Adobe License Decoder repository found at this URL:
    https://github.com/adobe/adobe-license-decoder.rs
and the FRL Online Proxy repository found at this URL:
    https://github.com/adobe/frl-online-proxy

The files in those original works are copyright 2022 Adobe and the use of those
materials in this work is permitted by the MIT license under which they were
released.  That license is reproduced here in the LICENSE-MIT file.
*/
use std::io::Write;
use std::path::Path;

use plist::{Dictionary, Value};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use ipa_base::{plist_encode, Result, SignatureBlock, StoreItem};

use crate::archive::PackageArchive;

/// An archive held in memory, which counts how often it was saved.
#[derive(Debug, Default, Clone)]
pub struct MemoryArchive {
    pub entries: Vec<(String, Vec<u8>)>,
    pub serialized: usize,
}

impl MemoryArchive {
    pub fn with_entries(entries: &[(&str, &[u8])]) -> Self {
        let entries = entries.iter().map(|(n, b)| (n.to_string(), b.to_vec())).collect();
        MemoryArchive { entries, serialized: 0 }
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, b)| b.as_slice())
    }
}

impl PackageArchive for MemoryArchive {
    fn list(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }

    fn read(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.get(name).map(<[u8]>::to_vec))
    }

    fn write(&mut self, name: &str, bytes: Vec<u8>) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = bytes,
            None => self.entries.push((name.to_string(), bytes)),
        }
    }

    fn serialize(&mut self) -> Result<()> {
        self.serialized += 1;
        Ok(())
    }
}

pub fn manifest_plist(sinf_paths: &[&str]) -> Vec<u8> {
    let mut dict = Dictionary::new();
    let paths = sinf_paths.iter().map(|p| Value::String(p.to_string())).collect();
    dict.insert("SinfPaths".to_string(), Value::Array(paths));
    plist_encode(&dict).expect("Can't encode manifest")
}

pub fn store_item(signature: &[u8]) -> StoreItem {
    let mut metadata = Dictionary::new();
    metadata.insert("bundleDisplayName".to_string(), Value::String("Example".to_string()));
    metadata.insert("softwareVersionBundleId".to_string(), Value::String("com.example.app".into()));
    metadata.insert("itemId".to_string(), Value::Integer(896_694_807i64.into()));
    StoreItem {
        url: "https://example.com/Example.ipa".to_string(),
        md5: String::new(),
        signatures: vec![SignatureBlock { id: 0, bytes: signature.to_vec() }],
        metadata,
    }
}

/// Build a zip file with the given entries, alternately stored and deflated.
pub fn make_zip(entries: &[(&str, &[u8])]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("Can't create temp file");
    {
        let mut writer = ZipWriter::new(file.as_file_mut());
        for (i, (name, bytes)) in entries.iter().enumerate() {
            let method =
                if i % 2 == 0 { CompressionMethod::Stored } else { CompressionMethod::Deflated };
            let options = FileOptions::default().compression_method(method);
            writer.start_file(*name, options).expect("Can't start entry");
            writer.write_all(bytes).expect("Can't write entry");
        }
        writer.finish().expect("Can't finish zip");
    }
    file
}

/// Each entry's name, compression method, CRC and raw (compressed) bytes.
pub fn raw_entries(path: &Path) -> Vec<(String, CompressionMethod, u32, Vec<u8>)> {
    let file = std::fs::File::open(path).expect("Can't open zip");
    let mut archive = ZipArchive::new(file).expect("Not a zip");
    let mut result = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index_raw(i).expect("Can't read entry");
        let mut bytes = Vec::new();
        std::io::Read::read_to_end(&mut entry, &mut bytes).expect("Can't read entry");
        result.push((entry.name().to_string(), entry.compression(), entry.crc32(), bytes));
    }
    result
}

/// The uncompressed content of one entry.
pub fn entry_content(path: &Path, name: &str) -> Option<Vec<u8>> {
    let file = std::fs::File::open(path).expect("Can't open zip");
    let mut archive = ZipArchive::new(file).expect("Not a zip");
    let mut entry = archive.by_name(name).ok()?;
    let mut bytes = Vec::new();
    std::io::Read::read_to_end(&mut entry, &mut bytes).expect("Can't read entry");
    Some(bytes)
}
