//! WMS capabilities discovery and WMS/WFS request building.
//!
//! Everything cross-origin goes through a [`ProxyRoute`]; the URLs handed to a
//! renderer (WMS tile sources) are built from the normalized base directly.

use geoweave_core::{Crs, Extent, FeatureSet};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::error::{CloudError, Result};
use crate::http::{describe_error_body, is_exception_element, HttpTransport};
use crate::proxy::ProxyRoute;

/// A `(name, title)` pair advertised by a capabilities document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLayer {
    pub name: String,
    pub title: String,
}

// ── URLs ─────────────────────────────────────────────────────────────────

/// Normalize a user-typed server URL.
///
/// Defaults the scheme to `http`, drops trailing slashes and a trailing `/web`
/// (the GeoServer admin UI path users tend to paste).
pub fn normalize_base_url(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CloudError::InvalidUrl {
            url: input.to_string(),
            reason: "empty server URL".into(),
        });
    }
    let mut base = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };
    loop {
        let before = base.len();
        while base.ends_with('/') {
            base.pop();
        }
        if base.to_ascii_lowercase().ends_with("/web") {
            base.truncate(base.len() - "/web".len());
        }
        if base.len() == before {
            break;
        }
    }
    Url::parse(&base).map_err(|e| CloudError::InvalidUrl {
        url: input.to_string(),
        reason: e.to_string(),
    })?;
    Ok(base)
}

/// `GetCapabilities` request for the server's WMS endpoint.
pub fn capabilities_url(base: &str) -> String {
    format!("{}/wms?service=WMS&version=1.1.1&request=GetCapabilities", base)
}

/// Split `workspace:layer`.
fn workspace_of(name: &str) -> Option<&str> {
    name.split_once(':').map(|(ws, _)| ws).filter(|ws| !ws.is_empty())
}

/// A WMS tile source: endpoint plus fixed GetMap parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct WmsTileSource {
    pub endpoint: String,
    pub params: Vec<(&'static str, String)>,
}

impl WmsTileSource {
    pub fn new(base: &str, layer: &str) -> Self {
        Self {
            endpoint: format!("{}/wms", base),
            params: vec![
                ("SERVICE", "WMS".into()),
                ("VERSION", "1.1.1".into()),
                ("REQUEST", "GetMap".into()),
                ("LAYERS", layer.to_string()),
                ("FORMAT", "image/png".into()),
                ("TRANSPARENT", "true".into()),
                ("TILED", "true".into()),
                ("SRS", "EPSG:3857".into()),
            ],
        }
    }

    pub fn layer(&self) -> &str {
        self.params
            .iter()
            .find(|(k, _)| *k == "LAYERS")
            .map(|(_, v)| v.as_str())
            .unwrap_or_default()
    }

    /// Full GetMap URL for one tile in Web Mercator.
    pub fn tile_url(&self, extent: &Extent, width: u32, height: u32) -> Result<String> {
        let mut url = Url::parse(&self.endpoint).map_err(|e| CloudError::InvalidUrl {
            url: self.endpoint.clone(),
            reason: e.to_string(),
        })?;
        {
            let mut q = url.query_pairs_mut();
            for (k, v) in &self.params {
                q.append_pair(k, v);
            }
            q.append_pair(
                "BBOX",
                &format!(
                    "{},{},{},{}",
                    extent.min_x, extent.min_y, extent.max_x, extent.max_y
                ),
            );
            q.append_pair("WIDTH", &width.to_string());
            q.append_pair("HEIGHT", &height.to_string());
        }
        Ok(url.into())
    }
}

/// WFS `GetFeature` request returning GeoJSON in lon/lat.
///
/// Namespaced names resolve through the workspace's own OWS endpoint.
pub fn wfs_feature_url(base: &str, layer: &str) -> Result<String> {
    let endpoint = match workspace_of(layer) {
        Some(ws) => format!("{}/{}/ows", base, ws),
        None => format!("{}/wfs", base),
    };
    let mut url = Url::parse(&endpoint).map_err(|e| CloudError::InvalidUrl {
        url: endpoint.clone(),
        reason: e.to_string(),
    })?;
    url.query_pairs_mut()
        .append_pair("service", "WFS")
        .append_pair("version", "1.0.0")
        .append_pair("request", "GetFeature")
        .append_pair("typeName", layer)
        .append_pair("outputFormat", "application/json")
        .append_pair("srsName", "EPSG:4326");
    Ok(url.into())
}

// ── Capabilities parsing ─────────────────────────────────────────────────

struct OpenLayer {
    depth: usize,
    name: Option<String>,
    title: Option<String>,
}

/// Parse a WMS capabilities document.
///
/// Any service-exception element fails the whole document. Otherwise named
/// layers nested inside another `Layer` are returned; when there are none the
/// top-level named layers are used instead.
pub fn parse_capabilities(xml: &str) -> Result<Vec<RemoteLayer>> {
    if let Some(message) = crate::http::exception_text(xml) {
        return Err(CloudError::RemoteService {
            service: "WMS",
            message,
        });
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut open: Vec<OpenLayer> = Vec::new();
    let mut field: Option<&'static str> = None;
    let mut nested = Vec::new();
    let mut top_level = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| CloudError::decode("WMS capabilities", e))?;
        match event {
            Event::Start(e) => {
                let local = e.local_name();
                if is_exception_element(local.as_ref()) {
                    // exception_text already caught well-formed ones
                    return Err(CloudError::RemoteService {
                        service: "WMS",
                        message: "service exception".into(),
                    });
                }
                match local.as_ref() {
                    b"Layer" => open.push(OpenLayer {
                        depth: open.len() + 1,
                        name: None,
                        title: None,
                    }),
                    b"Name" if !open.is_empty() => field = Some("name"),
                    b"Title" if !open.is_empty() => field = Some("title"),
                    _ => field = None,
                }
            }
            Event::Text(t) => {
                if let (Some(which), Some(layer)) = (field, open.last_mut()) {
                    let text = t
                        .unescape()
                        .map_err(|e| CloudError::decode("WMS capabilities", e))?
                        .trim()
                        .to_string();
                    match which {
                        "name" if layer.name.is_none() => layer.name = Some(text),
                        "title" if layer.title.is_none() => layer.title = Some(text),
                        _ => {}
                    }
                }
            }
            Event::End(e) => {
                field = None;
                if e.local_name().as_ref() == b"Layer" {
                    if let Some(layer) = open.pop() {
                        if let Some(name) = layer.name.filter(|n| !n.is_empty()) {
                            let title = layer.title.unwrap_or_else(|| name.clone());
                            let record = RemoteLayer { name, title };
                            if layer.depth > 1 {
                                nested.push(record);
                            } else {
                                top_level.push(record);
                            }
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(if nested.is_empty() { top_level } else { nested })
}

// ── Fetches ──────────────────────────────────────────────────────────────

/// Request and parse the capabilities document of `base` (already normalized).
pub async fn fetch_capabilities<T: HttpTransport>(
    transport: &T,
    route: &ProxyRoute,
    base: &str,
) -> Result<Vec<RemoteLayer>> {
    let target = capabilities_url(base);
    let url = route.route(&target)?;
    debug!(%url, "requesting capabilities");

    let response = transport.get(&url).await?;
    response.ensure_success(&target, "WMS")?;
    let layers = parse_capabilities(&response.text())?;
    if layers.is_empty() {
        warn!(base, "capabilities advertise no named layers");
    }
    info!(base, layers = layers.len(), "capabilities discovered");
    Ok(layers)
}

/// Fetch every feature of a WFS layer as lon/lat features.
pub async fn fetch_wfs_features<T: HttpTransport>(
    transport: &T,
    route: &ProxyRoute,
    base: &str,
    layer: &str,
) -> Result<(FeatureSet, Crs)> {
    let target = wfs_feature_url(base, layer)?;
    let url = route.route(&target)?;
    debug!(%url, "requesting WFS features");

    let response = transport.get(&url).await?;
    response.ensure_success(&target, "WFS")?;
    if !response.is_json() {
        return Err(CloudError::UnexpectedContent {
            url: target,
            found: response
                .content_type
                .clone()
                .unwrap_or_else(|| "untyped".into()),
            message: describe_error_body(&response),
        });
    }

    let value: serde_json::Value = serde_json::from_slice(&response.body)
        .map_err(|e| CloudError::decode("WFS", e))?;
    if value.get("type").is_none() {
        // JSON, but an error object rather than GeoJSON
        return Err(CloudError::RemoteService {
            service: "WFS",
            message: describe_error_body(&response),
        });
    }
    let (features, crs) = geoweave_codec::geojson::read_geojson_value(value)?;
    info!(layer, features = features.len(), "WFS features fetched");
    Ok((features, crs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_base_urls() {
        assert_eq!(
            normalize_base_url("demo.example.org/geoserver/web/").unwrap(),
            "http://demo.example.org/geoserver"
        );
        assert_eq!(
            normalize_base_url(" https://x.org/geoserver// ").unwrap(),
            "https://x.org/geoserver"
        );
        assert!(normalize_base_url("   ").is_err());
    }

    #[test]
    fn wfs_urls_resolve_workspaces() {
        let url = wfs_feature_url("http://h/geoserver", "topp:states").unwrap();
        assert!(url.starts_with("http://h/geoserver/topp/ows?service=WFS&version=1.0.0"));
        assert!(url.contains("typeName=topp%3Astates"));
        assert!(url.contains("outputFormat=application%2Fjson"));
        assert!(url.contains("srsName=EPSG%3A4326"));

        let url = wfs_feature_url("http://h/geoserver", "states").unwrap();
        assert!(url.starts_with("http://h/geoserver/wfs?"));
    }

    #[test]
    fn wms_tile_source_parameters() {
        let src = WmsTileSource::new("http://h/geoserver", "topp:states");
        assert_eq!(src.endpoint, "http://h/geoserver/wms");
        assert_eq!(src.layer(), "topp:states");
        let url = src
            .tile_url(&Extent::new(0.0, 0.0, 10.0, 10.0), 256, 256)
            .unwrap();
        assert!(url.contains("SRS=EPSG%3A3857"));
        assert!(url.contains("TILED=true"));
        assert!(url.contains("WIDTH=256"));
    }

    const CAPS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<WMT_MS_Capabilities version="1.1.1">
  <Service><Name>OGC:WMS</Name><Title>Demo</Title></Service>
  <Capability>
    <Layer>
      <Title>Root</Title>
      <Layer queryable="1"><Name>topp:states</Name><Title>USA Population</Title></Layer>
      <Layer queryable="1"><Name>sf:roads</Name><Title>Roads</Title>
        <Style><Name>line</Name><Title>Line style</Title></Style>
      </Layer>
    </Layer>
  </Capability>
</WMT_MS_Capabilities>"#;

    #[test]
    fn collects_nested_layers() {
        let layers = parse_capabilities(CAPS).unwrap();
        assert_eq!(
            layers,
            vec![
                RemoteLayer {
                    name: "topp:states".into(),
                    title: "USA Population".into()
                },
                RemoteLayer {
                    name: "sf:roads".into(),
                    title: "Roads".into()
                },
            ]
        );
    }

    #[test]
    fn falls_back_to_top_level_layers() {
        let xml = "<WMS_Capabilities><Capability>\
            <Layer><Name>a</Name><Title>A</Title></Layer>\
            <Layer><Name>b</Name></Layer>\
            </Capability></WMS_Capabilities>";
        let layers = parse_capabilities(xml).unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[1].title, "b");
    }

    const GEOSERVER_CAPS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE WMT_MS_Capabilities SYSTEM "http://localhost:8080/geoserver/schemas/wms/1.1.1/WMS_MS_Capabilities.dtd">
<WMT_MS_Capabilities version="1.1.1" updateSequence="142">
  <Service>
    <Name>OGC:WMS</Name>
    <Title>GeoServer Web Map Service</Title>
    <Abstract>A compliant implementation of WMS plus most of the SLD extension.</Abstract>
    <KeywordList><Keyword>WFS</Keyword><Keyword>WMS</Keyword><Keyword>GEOSERVER</Keyword></KeywordList>
    <OnlineResource xmlns:xlink="http://www.w3.org/1999/xlink" xlink:type="simple" xlink:href="http://geoserver.org"/>
    <Fees>NONE</Fees>
    <AccessConstraints>NONE</AccessConstraints>
  </Service>
  <Capability>
    <Request>
      <GetCapabilities>
        <Format>application/vnd.ogc.wms_xml</Format>
        <DCPType><HTTP><Get><OnlineResource xmlns:xlink="http://www.w3.org/1999/xlink" xlink:type="simple" xlink:href="http://localhost:8080/geoserver/wms?SERVICE=WMS&amp;"/></Get></HTTP></DCPType>
      </GetCapabilities>
      <GetMap>
        <Format>image/png</Format>
        <Format>image/jpeg</Format>
        <DCPType><HTTP><Get><OnlineResource xmlns:xlink="http://www.w3.org/1999/xlink" xlink:type="simple" xlink:href="http://localhost:8080/geoserver/wms?SERVICE=WMS&amp;"/></Get></HTTP></DCPType>
      </GetMap>
    </Request>
    <Exception>
      <Format>application/vnd.ogc.se_xml</Format>
      <Format>application/vnd.ogc.se_inimage</Format>
      <Format>application/vnd.ogc.se_blank</Format>
    </Exception>
    <UserDefinedSymbolization SupportSLD="1" UserLayer="1" UserStyle="1" RemoteWFS="1"/>
    <Layer>
      <Title>GeoServer Web Map Service</Title>
      <Abstract>A compliant implementation of WMS plus most of the SLD extension.</Abstract>
      <SRS>EPSG:4326</SRS>
      <LatLonBoundingBox minx="-180.0" miny="-90.0" maxx="180.0" maxy="90.0"/>
      <Layer queryable="1">
        <Name>topp:states</Name>
        <Title>USA Population</Title>
        <Abstract>This is some census data on the states.</Abstract>
        <KeywordList><Keyword>census</Keyword><Keyword>united</Keyword></KeywordList>
        <SRS>EPSG:4326</SRS>
        <LatLonBoundingBox minx="-124.731422" miny="24.955967" maxx="-66.969849" maxy="49.371735"/>
        <BoundingBox SRS="EPSG:4326" minx="-124.731422" miny="24.955967" maxx="-66.969849" maxy="49.371735"/>
        <Style>
          <Name>population</Name>
          <Title>Population in the United States</Title>
          <LegendURL width="20" height="20">
            <Format>image/png</Format>
            <OnlineResource xmlns:xlink="http://www.w3.org/1999/xlink" xlink:type="simple" xlink:href="http://localhost:8080/geoserver/wms?request=GetLegendGraphic&amp;format=image%2Fpng&amp;layer=topp%3Astates"/>
          </LegendURL>
        </Style>
      </Layer>
    </Layer>
  </Capability>
</WMT_MS_Capabilities>"#;

    #[test]
    fn geoserver_document_lists_its_layers() {
        let layers = parse_capabilities(GEOSERVER_CAPS).unwrap();
        assert_eq!(
            layers,
            vec![RemoteLayer {
                name: "topp:states".into(),
                title: "USA Population".into()
            }]
        );
    }

    #[test]
    fn exception_wins_over_layers() {
        let xml = r#"<ServiceExceptionReport version="1.1.1">
            <ServiceException code="LayerNotDefined">nope</ServiceException>
            </ServiceExceptionReport>
            <Layer><Name>late</Name></Layer>"#;
        let err = parse_capabilities(xml).unwrap_err();
        assert_eq!(err.kind(), geoweave_core::ErrorKind::RemoteServiceException);
        assert!(err.to_string().contains("nope"));
    }
}
