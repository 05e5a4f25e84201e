//! Coordinate Reference System descriptors
//!
//! geoweave only ever computes in two CRSs (EPSG:4326 at codec and network
//! boundaries, EPSG:3857 while resident in the registry). `Crs` records what a
//! source *declared* so the codec can decide whether a reprojection applies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// EPSG code of the geographic CRS used at all codec and network boundaries.
pub const EPSG_WGS84: u32 = 4326;
/// EPSG code of the projected display CRS used inside the registry.
pub const EPSG_WEB_MERCATOR: u32 = 3857;

/// ESRI-flavoured WKT written next to exported shapefiles.
pub const WGS84_PRJ_WKT: &str = "GEOGCS[\"GCS_WGS_1984\",DATUM[\"D_WGS_1984\",\
SPHEROID[\"WGS_1984\",6378137.0,298.257223563]],PRIMEM[\"Greenwich\",0.0],\
UNIT[\"Degree\",0.0174532925199433]]";

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crs {
    /// WKT representation (as found in a `.prj` sidecar)
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
}

impl Crs {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
        }
    }

    /// Create a CRS from a WKT string, recognising the two CRSs geoweave knows.
    ///
    /// Anything that is neither WGS 84 nor Web Mercator keeps its WKT but no EPSG code.
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        let wkt = wkt.into();
        let upper = wkt.to_ascii_uppercase();
        let epsg = if upper.contains("MERCATOR_AUXILIARY_SPHERE")
            || upper.contains("PSEUDO-MERCATOR")
            || upper.contains("PSEUDO_MERCATOR")
            || upper.contains("\"EPSG\",\"3857\"")
        {
            Some(EPSG_WEB_MERCATOR)
        } else if upper.starts_with("GEOGCS") && upper.contains("WGS") && upper.contains("84") {
            Some(EPSG_WGS84)
        } else {
            None
        };
        Self {
            wkt: Some(wkt),
            epsg,
        }
    }

    /// Parse an `EPSG:xxxx` / `urn:ogc:def:crs:EPSG::xxxx` identifier.
    pub fn from_identifier(id: &str) -> Option<Self> {
        let code = id.rsplit(':').next()?.trim();
        code.parse().ok().map(Self::from_epsg)
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(EPSG_WGS84)
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::from_epsg(EPSG_WEB_MERCATOR)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    pub fn is_web_mercator(&self) -> bool {
        matches!(self.epsg, Some(EPSG_WEB_MERCATOR) | Some(900913) | Some(102100))
    }

    /// Whether coordinates in this CRS are longitude/latitude degrees.
    ///
    /// Unknown CRSs are treated as geographic, which is what every supported
    /// format declares by default.
    pub fn is_geographic(&self) -> bool {
        !self.is_web_mercator()
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &Crs) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b || (self.is_web_mercator() && other.is_web_mercator());
        }
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }
        false
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            let end = wkt
                .char_indices()
                .nth(50)
                .map(|(i, _)| i)
                .unwrap_or(wkt.len());
            return format!("WKT:{}", &wkt[..end]);
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::wgs84()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = Crs::from_epsg(4326);
        assert_eq!(crs.epsg(), Some(4326));
        assert_eq!(crs.identifier(), "EPSG:4326");
        assert!(crs.is_geographic());
    }

    #[test]
    fn test_prj_wkt_recognition() {
        assert_eq!(Crs::from_wkt(WGS84_PRJ_WKT).epsg(), Some(EPSG_WGS84));

        let merc = "PROJCS[\"WGS_1984_Web_Mercator_Auxiliary_Sphere\",GEOGCS[\"GCS_WGS_1984\"],\
                    PROJECTION[\"Mercator_Auxiliary_Sphere\"]]";
        let crs = Crs::from_wkt(merc);
        assert!(crs.is_web_mercator());
        assert!(!crs.is_geographic());

        let utm = "PROJCS[\"WGS_1984_UTM_Zone_30N\",PROJECTION[\"Transverse_Mercator\"]]";
        assert_eq!(Crs::from_wkt(utm).epsg(), None);
    }

    #[test]
    fn test_identifier_forms() {
        assert_eq!(Crs::from_identifier("EPSG:3857"), Some(Crs::web_mercator()));
        assert_eq!(
            Crs::from_identifier("urn:ogc:def:crs:EPSG::4326"),
            Some(Crs::wgs84())
        );
        assert!(Crs::from_identifier("CRS84").is_none());
    }

    #[test]
    fn test_crs_equivalence() {
        assert!(Crs::from_epsg(900913).is_equivalent(&Crs::web_mercator()));
        assert!(!Crs::wgs84().is_equivalent(&Crs::web_mercator()));
    }
}
