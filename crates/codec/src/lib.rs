//! # geoweave codec
//!
//! Multi-format vector import and export.
//!
//! Import runs a selection of files through an ordered detector table
//! (shapefile pair, KML, KMZ, zipped KML, zipped shapefile, GeoJSON), decodes
//! it and reprojects every geometry into the registry CRS (Web Mercator).
//! Export goes the other way: unproject, strip geometry-name aliases, then
//! serialize as GeoJSON, KML, or a ZIP of per-geometry-kind shapefiles.
//!
//! ```no_run
//! use geoweave_codec::{import, InputFile};
//!
//! let file = InputFile::read("parcels.geojson")?;
//! for dataset in import(&[file])? {
//!     println!("{}: {} features", dataset.name, dataset.features.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod archive;
pub mod detect;
pub mod error;
pub mod export;
pub mod geojson;
pub mod input;
pub mod kml;
pub mod shapefile;

pub use detect::{import, ImportedDataset, SourceFormat, DETECTORS};
pub use error::{CodecError, Result};
pub use export::{export, ExportArtifact, ExportFormat, ExportLayer};
pub use input::InputFile;
