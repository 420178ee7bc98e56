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
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::NamedTempFile;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use ipa_base::Result;

/// The operations the signer needs from a package archive.  Writes are
/// staged until [`PackageArchive::serialize`], which saves the whole
/// archive back where it came from.
pub trait PackageArchive {
    /// Entry names, in archive order, followed by staged new entries.
    fn list(&self) -> Vec<String>;
    /// The content of an entry, or `None` if there is no such entry.
    fn read(&mut self, name: &str) -> Result<Option<Vec<u8>>>;
    /// Stage an entry for writing, replacing any existing entry of that name.
    fn write(&mut self, name: &str, bytes: Vec<u8>);
    fn serialize(&mut self) -> Result<()>;
}

/// A zip file on disk.  The file stays open from [`ZipPackage::open`]
/// until the package is dropped; saving replaces it with the rebuilt
/// archive in one rename.  Entries that aren't rewritten are copied
/// without recompression, so their bytes don't change.
pub struct ZipPackage {
    path: PathBuf,
    file: File,
    archive: ZipArchive<File>,
    names: Vec<String>,
    pending: Vec<(String, Vec<u8>)>,
}

impl ZipPackage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let (archive, names) = Self::index(&file)?;
        debug!("Opened package {} with {} entries", path.display(), names.len());
        Ok(ZipPackage { path, file, archive, names, pending: Vec::new() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn index(file: &File) -> Result<(ZipArchive<File>, Vec<String>)> {
        let mut archive = ZipArchive::new(file.try_clone()?)?;
        let mut names = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            names.push(archive.by_index_raw(i)?.name().to_string());
        }
        Ok((archive, names))
    }

    /// Write the new archive into a temporary file beside the package,
    /// so a failure part way through never touches the package itself.
    fn build(&mut self) -> Result<NamedTempFile> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut staged = tempfile::Builder::new().prefix(".ipa-sign").tempfile_in(&dir)?;
        {
            let mut writer = ZipWriter::new(staged.as_file_mut());
            for i in 0..self.archive.len() {
                let entry = self.archive.by_index_raw(i)?;
                if self.pending.iter().any(|(name, _)| name == entry.name()) {
                    continue;
                }
                writer.raw_copy_file(entry)?;
            }
            let options = FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(9));
            for (name, bytes) in self.pending.iter() {
                writer.start_file(name.as_str(), options)?;
                writer.write_all(bytes)?;
            }
            writer.finish()?;
        }
        staged.as_file().sync_all()?;
        Ok(staged)
    }
}

impl PackageArchive for ZipPackage {
    fn list(&self) -> Vec<String> {
        let mut names = self.names.clone();
        for (name, _) in self.pending.iter() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    fn read(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        if let Some((_, bytes)) = self.pending.iter().find(|(n, _)| n == name) {
            return Ok(Some(bytes.clone()));
        }
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        Ok(Some(bytes))
    }

    fn write(&mut self, name: &str, bytes: Vec<u8>) {
        self.pending.retain(|(n, _)| n != name);
        self.pending.push((name.to_string(), bytes));
    }

    fn serialize(&mut self) -> Result<()> {
        let staged = self.build()?;
        std::fs::set_permissions(staged.path(), self.file.metadata()?.permissions())?;
        let file = staged.persist(&self.path).map_err(|err| err.error)?;
        debug!(
            "Wrote package {} ({} bytes, {} rewritten entries)",
            self.path.display(),
            file.metadata()?.len(),
            self.pending.len()
        );
        let (archive, names) = Self::index(&file)?;
        self.file = file;
        self.archive = archive;
        self.names = names;
        self.pending.clear();
        Ok(())
    }
}
