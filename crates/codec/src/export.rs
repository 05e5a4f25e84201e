//! Export of registry layers to GeoJSON, KML or a zipped shapefile set.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use geoweave_core::transform::unproject_geometry;
use geoweave_core::vector::is_geometry_alias;
use geoweave_core::{Feature, FeatureSet, GeometryFamily, LayerStyle};
use tracing::info;

use crate::archive::write_zip;
use crate::error::{CodecError, Result};
use crate::geojson::write_geojson;
use crate::kml::write_kml;
use crate::shapefile::write_shapefile;

/// Target format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    GeoJson,
    Kml,
    Shapefile,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::GeoJson => "geojson",
            Self::Kml => "kml",
            Self::Shapefile => "zip",
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            Self::GeoJson => "application/geo+json",
            Self::Kml => "application/vnd.google-earth.kml+xml",
            Self::Shapefile => "application/zip",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::GeoJson => "geojson",
            Self::Kml => "kml",
            Self::Shapefile => "shapefile",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "geojson" | "json" => Ok(Self::GeoJson),
            "kml" => Ok(Self::Kml),
            "shapefile" | "shp" | "zip" => Ok(Self::Shapefile),
            other => Err(CodecError::Invalid(format!("unknown export format '{}'", other))),
        }
    }
}

/// One layer handed to the exporter. Geometries are in the registry CRS.
#[derive(Debug, Clone, Copy)]
pub struct ExportLayer<'a> {
    pub name: &'a str,
    pub features: &'a FeatureSet,
    pub style: Option<&'a LayerStyle>,
}

/// A finished download.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Serialize the selected layers.
pub fn export(layers: &[ExportLayer<'_>], format: ExportFormat) -> Result<ExportArtifact> {
    let stem = artifact_stem(layers.iter().map(|l| l.name));
    let bytes = match format {
        ExportFormat::GeoJson => {
            let features = flatten(layers);
            ensure_any(&features, &stem)?;
            write_geojson(&features)?.into_bytes()
        }
        ExportFormat::Kml => {
            let features = flatten(layers);
            ensure_any(&features, &stem)?;
            let style = layers.iter().find_map(|l| l.style);
            let name = layers.iter().map(|l| l.name).collect::<Vec<_>>().join(", ");
            write_kml(&name, &features, style).into_bytes()
        }
        ExportFormat::Shapefile => write_shapefile_zip(layers, &stem)?,
    };

    let file_name = format!("{}.{}", stem, format.extension());
    info!(file = %file_name, %format, bytes = bytes.len(), "exported");
    Ok(ExportArtifact {
        file_name,
        media_type: format.media_type(),
        bytes,
    })
}

/// Lon/lat copies of every feature, aliases stripped.
fn flatten(layers: &[ExportLayer<'_>]) -> FeatureSet {
    layers
        .iter()
        .flat_map(|l| l.features.iter())
        .map(to_export_feature)
        .collect()
}

fn to_export_feature(f: &Feature) -> Feature {
    Feature {
        geometry: f.geometry.as_ref().map(unproject_geometry),
        properties: f
            .properties
            .iter()
            .filter(|(k, _)| !is_geometry_alias(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        id: f.id.clone(),
    }
}

fn ensure_any(features: &FeatureSet, stem: &str) -> Result<()> {
    if features.is_empty() {
        return Err(CodecError::EmptyExport(format!("{} has no features", stem)));
    }
    Ok(())
}

/// One dataset per (layer, geometry family) partition, all in one archive.
fn write_shapefile_zip(layers: &[ExportLayer<'_>], stem: &str) -> Result<Vec<u8>> {
    let mut partitions: Vec<(String, GeometryFamily, Vec<Feature>)> = Vec::new();
    let mut used: HashSet<String> = HashSet::new();

    for layer in layers {
        let mut by_family: BTreeMap<GeometryFamily, Vec<Feature>> = BTreeMap::new();
        for feature in layer.features.iter() {
            if let Some(family) = feature.family() {
                by_family
                    .entry(family)
                    .or_default()
                    .push(to_export_feature(feature));
            }
        }
        let base = slug(layer.name);
        for (family, features) in by_family {
            let mut member = format!("{}_{}", base, family.label());
            let mut n = 2;
            while !used.insert(member.clone()) {
                member = format!("{}_{}_{}", base, family.label(), n);
                n += 1;
            }
            partitions.push((member, family, features));
        }
    }

    if partitions.is_empty() {
        return Err(CodecError::EmptyExport(format!(
            "{} has no features with geometry",
            stem
        )));
    }

    let mut files: Vec<(String, Vec<u8>)> = Vec::new();
    for (member, family, features) in &partitions {
        let refs: Vec<&Feature> = features.iter().collect();
        let encoded = write_shapefile(*family, &refs)?;
        files.push((format!("{}.shp", member), encoded.shp));
        files.push((format!("{}.shx", member), encoded.shx));
        files.push((format!("{}.dbf", member), encoded.dbf));
        files.push((format!("{}.prj", member), encoded.prj.into_bytes()));
    }
    write_zip(files.iter().map(|(name, bytes)| (name.clone(), bytes.as_slice())))
}

/// Lowercase ASCII slug; runs of other characters collapse into `_`.
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    let trimmed = out.trim_end_matches('_');
    if trimmed.is_empty() {
        "export".to_string()
    } else {
        trimmed.to_string()
    }
}

/// File stem for an export of the named layers.
pub fn artifact_stem<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let slugs: Vec<String> = names
        .into_iter()
        .map(slug)
        .filter(|s| s != "export")
        .collect();
    if slugs.is_empty() {
        "export".to_string()
    } else {
        slugs.join("_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs() {
        assert_eq!(slug("Río Grande (2024)"), "r_o_grande_2024");
        assert_eq!(slug("  "), "export");
        assert_eq!(artifact_stem(["Roads", "Parks & Rec"]), "roads_parks_rec");
        assert_eq!(artifact_stem(std::iter::empty()), "export");
    }

    #[test]
    fn formats_parse() {
        assert_eq!("SHP".parse::<ExportFormat>().unwrap(), ExportFormat::Shapefile);
        assert_eq!(ExportFormat::Kml.media_type(), "application/vnd.google-earth.kml+xml");
        assert!("gpx".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn empty_export_fails_for_every_format() {
        let empty = FeatureSet::new();
        let layers = [ExportLayer {
            name: "Nothing",
            features: &empty,
            style: None,
        }];
        for format in [ExportFormat::GeoJson, ExportFormat::Kml, ExportFormat::Shapefile] {
            let err = export(&layers, format).unwrap_err();
            assert_eq!(err.kind(), geoweave_core::ErrorKind::EmptyResult);
        }
    }
}
