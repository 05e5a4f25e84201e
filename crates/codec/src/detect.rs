//! Format detection and the import pipeline.
//!
//! A selection of files is first grouped (shapefile members travel together),
//! then each group runs down an ordered table of detectors. The first detector
//! whose predicate holds decodes the group; adding a format means adding a row.

use std::collections::BTreeMap;
use std::fmt;

use geoweave_core::transform::to_registry_crs;
use geoweave_core::{Crs, FeatureSet};
use tracing::{debug, info};

use crate::archive::Archive;
use crate::error::{CodecError, Result};
use crate::geojson::read_geojson;
use crate::input::InputFile;
use crate::kml::read_kml;
use crate::shapefile::{read_shapefile, ShapefileSource};

/// Extensions that belong to a shapefile dataset.
const SHAPEFILE_MEMBERS: &[&str] = &["shp", "dbf", "prj", "shx", "cpg", "qix", "sbn", "sbx"];

/// Which decoder produced a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    ShapefilePair,
    Kml,
    Kmz,
    ZipKml,
    ZipShapefile,
    GeoJson,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ShapefilePair => "Shapefile",
            Self::Kml => "KML",
            Self::Kmz => "KMZ",
            Self::ZipKml => "KML (zipped)",
            Self::ZipShapefile => "Shapefile (zipped)",
            Self::GeoJson => "GeoJSON",
        };
        f.write_str(name)
    }
}

/// One import unit: a file plus the sidecars that travel with it.
#[derive(Debug)]
pub struct Candidate<'a> {
    pub primary: &'a InputFile,
    pub members: Vec<&'a InputFile>,
}

impl<'a> Candidate<'a> {
    /// The member with the given (lowercase) extension.
    pub fn member(&self, ext: &str) -> Option<&'a InputFile> {
        self.members.iter().copied().find(|f| f.has_extension(ext))
    }

    fn is_zip_with(&self, probe: impl Fn(&Archive<'_>) -> bool) -> bool {
        self.primary.has_extension("zip")
            && Archive::open(&self.primary.bytes)
                .map(|a| probe(&a))
                .unwrap_or(false)
    }
}

/// A row of the detection table.
pub struct Detector {
    pub format: SourceFormat,
    pub matches: fn(&Candidate<'_>) -> bool,
    pub decode: fn(&Candidate<'_>) -> Result<(FeatureSet, Crs)>,
}

/// Detection order: first match wins.
pub static DETECTORS: &[Detector] = &[
    Detector {
        format: SourceFormat::ShapefilePair,
        matches: |c| SHAPEFILE_MEMBERS.contains(&c.primary.extension().as_str()),
        decode: decode_shapefile_pair,
    },
    Detector {
        format: SourceFormat::Kml,
        matches: |c| c.primary.has_extension("kml"),
        decode: |c| Ok((read_kml(&text_of(c.primary))?, Crs::wgs84())),
    },
    Detector {
        format: SourceFormat::Kmz,
        matches: |c| c.primary.has_extension("kmz"),
        decode: decode_zipped_kml,
    },
    Detector {
        format: SourceFormat::ZipKml,
        matches: |c| c.is_zip_with(|a| a.find_kml().is_some()),
        decode: decode_zipped_kml,
    },
    Detector {
        format: SourceFormat::ZipShapefile,
        matches: |c| c.is_zip_with(|a| !a.find_shapefiles().is_empty()),
        decode: decode_zipped_shapefiles,
    },
    Detector {
        format: SourceFormat::GeoJson,
        matches: |c| c.primary.has_extension("geojson") || c.primary.has_extension("json"),
        decode: |c| read_geojson(&text_of(c.primary)),
    },
];

/// Features decoded from one import unit, already in the registry CRS.
#[derive(Debug, Clone)]
pub struct ImportedDataset {
    /// Display name, the primary file's stem.
    pub name: String,
    pub file_name: String,
    pub format: SourceFormat,
    pub source_crs: Crs,
    pub features: FeatureSet,
}

/// Decode a user selection into datasets, one per import unit.
///
/// A dataset with zero features is returned as such; the caller decides how
/// to report it.
pub fn import(files: &[InputFile]) -> Result<Vec<ImportedDataset>> {
    group(files)
        .iter()
        .map(import_candidate)
        .collect::<Result<Vec<_>>>()
}

/// Group a selection: shapefile members by stem, every other file alone.
pub fn group(files: &[InputFile]) -> Vec<Candidate<'_>> {
    let mut shapefiles: BTreeMap<String, Vec<&InputFile>> = BTreeMap::new();
    let mut out = Vec::new();
    for file in files {
        if SHAPEFILE_MEMBERS.contains(&file.extension().as_str()) {
            shapefiles
                .entry(file.stem().to_ascii_lowercase())
                .or_default()
                .push(file);
        } else {
            out.push(Candidate {
                primary: file,
                members: vec![file],
            });
        }
    }
    for members in shapefiles.into_values() {
        let primary = members
            .iter()
            .copied()
            .find(|f| f.has_extension("shp"))
            .unwrap_or(members[0]);
        out.push(Candidate { primary, members });
    }
    out
}

fn import_candidate(candidate: &Candidate<'_>) -> Result<ImportedDataset> {
    let file = candidate.primary;
    let extension = file.extension();
    let Some(detector) = DETECTORS.iter().find(|d| (d.matches)(candidate)) else {
        return Err(if extension == "zip" {
            CodecError::MalformedArchive {
                file: file.name.clone(),
                reason: "unsupported ZIP contents: no .kml entry and no complete .shp/.dbf pair"
                    .into(),
            }
        } else {
            CodecError::UnsupportedFormat {
                file: file.name.clone(),
                extension,
            }
        });
    };
    debug!(file = %file.name, format = %detector.format, "detected format");

    let (mut features, crs) =
        (detector.decode)(candidate).map_err(|e| e.in_file(&file.name, &extension))?;
    features.map_geometries(|g| to_registry_crs(g, &crs));
    info!(
        file = %file.name,
        format = %detector.format,
        features = features.len(),
        crs = %crs,
        "imported"
    );

    Ok(ImportedDataset {
        name: file.stem().to_string(),
        file_name: file.name.clone(),
        format: detector.format,
        source_crs: crs,
        features,
    })
}

fn text_of(file: &InputFile) -> String {
    String::from_utf8_lossy(&file.bytes).into_owned()
}

fn decode_shapefile_pair(c: &Candidate<'_>) -> Result<(FeatureSet, Crs)> {
    let dataset = c.primary.stem().to_string();
    let shp = c.member("shp").ok_or_else(|| CodecError::MissingMember {
        dataset: dataset.clone(),
        member: "shp",
    })?;
    let dbf = c.member("dbf").ok_or_else(|| CodecError::MissingMember {
        dataset: dataset.clone(),
        member: "dbf",
    })?;
    let prj = c.member("prj").map(text_of);
    read_shapefile(ShapefileSource {
        shp: &shp.bytes,
        dbf: &dbf.bytes,
        prj: prj.as_deref(),
    })
}

fn decode_zipped_kml(c: &Candidate<'_>) -> Result<(FeatureSet, Crs)> {
    let mut archive = Archive::open(&c.primary.bytes)?;
    let entry = archive.find_kml().ok_or_else(|| CodecError::MalformedArchive {
        file: c.primary.name.clone(),
        reason: "no .kml entry".into(),
    })?;
    debug!(entry = %entry, "reading KML from archive");
    let text = archive.read_text(&entry)?;
    Ok((read_kml(&text)?, Crs::wgs84()))
}

/// Every shapefile pair in the archive, combined into one collection.
fn decode_zipped_shapefiles(c: &Candidate<'_>) -> Result<(FeatureSet, Crs)> {
    let mut archive = Archive::open(&c.primary.bytes)?;
    let mut combined = FeatureSet::new();
    let mut declared: Option<Crs> = None;

    for entries in archive.find_shapefiles() {
        let (Some(shp_name), Some(dbf_name)) = (entries.shp, entries.dbf) else {
            continue;
        };
        let shp = archive.read(&shp_name)?;
        let dbf = archive.read(&dbf_name)?;
        let prj = match &entries.prj {
            Some(name) => Some(archive.read_text(name)?),
            None => None,
        };
        let (mut features, crs) = read_shapefile(ShapefileSource {
            shp: &shp,
            dbf: &dbf,
            prj: prj.as_deref(),
        })?;
        // Datasets may disagree; bring each to lon/lat-or-mercator via the first CRS.
        match &declared {
            None => declared = Some(crs),
            Some(first) if !first.is_equivalent(&crs) => {
                let target_is_mercator = first.is_web_mercator();
                features.map_geometries(|g| {
                    let projected = to_registry_crs(g, &crs);
                    if target_is_mercator {
                        projected
                    } else {
                        geoweave_core::transform::unproject_geometry(&projected)
                    }
                });
            }
            Some(_) => {}
        }
        combined.extend(features);
    }
    Ok((combined, declared.unwrap_or_else(Crs::wgs84)))
}
