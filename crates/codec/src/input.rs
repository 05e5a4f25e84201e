//! The file-input boundary: named byte buffers chosen by the user.

use std::path::Path;

/// One file of a user selection.
#[derive(Debug, Clone)]
pub struct InputFile {
    /// File name as presented to the user (no directory component required).
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, keeping only its file name.
    pub fn read(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }

    /// Lowercased extension without the dot, empty when there is none.
    pub fn extension(&self) -> String {
        extension_of(&self.name)
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        stem_of(&self.name)
    }

    pub fn has_extension(&self, ext: &str) -> bool {
        self.extension() == ext
    }
}

/// Lowercased extension of a path-like name.
pub(crate) fn extension_of(name: &str) -> String {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match file.rfind('.') {
        Some(i) if i > 0 => file[i + 1..].to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// Name without directory and extension.
pub(crate) fn stem_of(name: &str) -> &str {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match file.rfind('.') {
        Some(i) if i > 0 => &file[..i],
        _ => file,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_lowercased() {
        assert_eq!(InputFile::new("Roads.SHP", vec![]).extension(), "shp");
        assert_eq!(InputFile::new("dir/doc.kml", vec![]).extension(), "kml");
        assert_eq!(InputFile::new("README", vec![]).extension(), "");
        assert_eq!(InputFile::new(".hidden", vec![]).extension(), "");
    }

    #[test]
    fn stems() {
        assert_eq!(stem_of("a/b/parcels.dbf"), "parcels");
        assert_eq!(stem_of("archive.tar.zip"), "archive.tar");
    }
}
