//! ZIP containers: KMZ packages, zipped shapefiles, and the export archive.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{CodecError, Result};
use crate::input::{extension_of, stem_of};

/// Largest archive member that will be inflated.
pub const MAX_ENTRY_BYTES: u64 = 512 * 1024 * 1024;

fn oversized(name: &str) -> CodecError {
    CodecError::MalformedArchive {
        file: name.to_string(),
        reason: format!("entry inflates past {} MiB", MAX_ENTRY_BYTES / (1024 * 1024)),
    }
}

/// An opened ZIP held in memory.
pub struct Archive<'a> {
    zip: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> Archive<'a> {
    pub fn open(bytes: &'a [u8]) -> Result<Self> {
        Ok(Self {
            zip: ZipArchive::new(Cursor::new(bytes))?,
        })
    }

    /// File entries, skipping directories and macOS resource forks.
    pub fn entries(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .zip
            .file_names()
            .filter(|n| !n.ends_with('/') && !n.starts_with("__MACOSX/"))
            .filter(|n| !stem_of(n).starts_with("._"))
            .map(String::from)
            .collect();
        names.sort();
        names
    }

    /// Inflate one entry. Entries larger than [`MAX_ENTRY_BYTES`] are refused
    /// whatever size their header declares.
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        let file = self.zip.by_name(name)?;
        if file.size() > MAX_ENTRY_BYTES {
            return Err(oversized(name));
        }
        let mut buf = Vec::new();
        file.take(MAX_ENTRY_BYTES + 1).read_to_end(&mut buf)?;
        if buf.len() as u64 > MAX_ENTRY_BYTES {
            return Err(oversized(name));
        }
        Ok(buf)
    }

    pub fn read_text(&mut self, name: &str) -> Result<String> {
        let bytes = self.read(name)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// `doc.kml` anywhere in the archive, else the first `.kml` entry.
    pub fn find_kml(&self) -> Option<String> {
        let kml: Vec<String> = self
            .entries()
            .into_iter()
            .filter(|n| extension_of(n) == "kml")
            .collect();
        kml.iter()
            .find(|n| {
                let file = n.rsplit('/').next().unwrap_or(n);
                file.eq_ignore_ascii_case("doc.kml")
            })
            .or_else(|| kml.first())
            .cloned()
    }

    /// Every complete `.shp` + `.dbf` pair (same path stem), with its `.prj`.
    pub fn find_shapefiles(&self) -> Vec<ShapefileEntries> {
        let mut groups: BTreeMap<String, ShapefileEntries> = BTreeMap::new();
        for name in self.entries() {
            let key = match name.rfind('.') {
                Some(i) => name[..i].to_ascii_lowercase(),
                None => continue,
            };
            let group = groups.entry(key).or_default();
            match extension_of(&name).as_str() {
                "shp" => group.shp = Some(name),
                "dbf" => group.dbf = Some(name),
                "prj" => group.prj = Some(name),
                _ => {}
            }
        }
        groups
            .into_values()
            .filter(|g| g.shp.is_some() && g.dbf.is_some())
            .collect()
    }
}

/// Entry names of one shapefile dataset inside an archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapefileEntries {
    pub shp: Option<String>,
    pub dbf: Option<String>,
    pub prj: Option<String>,
}

/// Build a deflated ZIP from `(name, bytes)` members.
pub fn write_zip<'b>(members: impl IntoIterator<Item = (String, &'b [u8])>) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in members {
        writer.start_file(name, options)?;
        writer.write_all(bytes)?;
    }
    Ok(writer.finish()?.into_inner())
}
