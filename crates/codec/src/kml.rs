//! KML reading and writing.
//!
//! The reader is a streaming pass over the document: it does not care how deep
//! Placemarks sit inside Document/Folder nesting, and it keeps only what maps
//! onto the feature model (name, description, ExtendedData, geometry).

use std::fmt::Write as _;

use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use geoweave_core::vector::is_geometry_alias;
use geoweave_core::{AttributeValue, Feature, FeatureSet, LayerStyle};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{CodecError, Result};

// ── Reading ──────────────────────────────────────────────────────────────

/// Geometry under construction while its closing tag has not been seen.
enum Pending {
    Multi(Vec<Geometry<f64>>),
    Polygon {
        outer: Option<LineString<f64>>,
        inners: Vec<LineString<f64>>,
    },
}

#[derive(Default)]
struct PlacemarkBuilder {
    feature: Option<Feature>,
    geometry: Option<Geometry<f64>>,
}

/// Parse KML text into lon/lat features.
pub fn read_kml(text: &str) -> Result<FeatureSet> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut features = FeatureSet::new();
    let mut path: Vec<String> = Vec::new();
    let mut text_buf = String::new();
    let mut placemark = PlacemarkBuilder::default();
    let mut pending: Vec<Pending> = Vec::new();
    let mut coords: Vec<Coord<f64>> = Vec::new();
    let mut data_name: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(&e);
                text_buf.clear();
                match name.as_str() {
                    "Placemark" => {
                        placemark = PlacemarkBuilder {
                            feature: Some(Feature::empty()),
                            geometry: None,
                        };
                        pending.clear();
                    }
                    "MultiGeometry" => pending.push(Pending::Multi(Vec::new())),
                    "Polygon" => pending.push(Pending::Polygon {
                        outer: None,
                        inners: Vec::new(),
                    }),
                    "Data" | "SimpleData" => data_name = attribute(&e, "name")?,
                    "Point" | "LineString" | "LinearRing" => coords.clear(),
                    _ => {}
                }
                path.push(name);
            }
            Event::Text(e) => text_buf.push_str(&e.unescape()?),
            Event::CData(e) => text_buf.push_str(&String::from_utf8_lossy(&e.into_inner())),
            Event::End(_) => {
                let Some(name) = path.pop() else { continue };
                let parent = path.last().map(String::as_str);
                let text = std::mem::take(&mut text_buf);

                match name.as_str() {
                    "coordinates" => coords = parse_coordinates(&text)?,
                    "Point" => {
                        let c = std::mem::take(&mut coords)
                            .first()
                            .copied()
                            .ok_or_else(|| CodecError::Invalid("Point without coordinates".into()))?;
                        emit(Point::from(c).into(), &mut pending, &mut placemark);
                    }
                    "LineString" => {
                        let ls = LineString::new(std::mem::take(&mut coords));
                        emit(ls.into(), &mut pending, &mut placemark);
                    }
                    "LinearRing" => {
                        let ring = LineString::new(std::mem::take(&mut coords));
                        match (parent, pending.last_mut()) {
                            (Some("outerBoundaryIs"), Some(Pending::Polygon { outer, .. })) => {
                                *outer = Some(ring)
                            }
                            (Some("innerBoundaryIs"), Some(Pending::Polygon { inners, .. })) => {
                                inners.push(ring)
                            }
                            _ => emit(ring.into(), &mut pending, &mut placemark),
                        }
                    }
                    "Polygon" => {
                        if let Some(Pending::Polygon { outer, inners }) = pending.pop() {
                            let outer = outer.ok_or_else(|| {
                                CodecError::Invalid("Polygon without outerBoundaryIs".into())
                            })?;
                            emit(Polygon::new(outer, inners).into(), &mut pending, &mut placemark);
                        }
                    }
                    "MultiGeometry" => {
                        if let Some(Pending::Multi(parts)) = pending.pop() {
                            emit(collapse_multi(parts), &mut pending, &mut placemark);
                        }
                    }
                    "name" | "description" if parent == Some("Placemark") => {
                        if let Some(f) = placemark.feature.as_mut() {
                            if !text.is_empty() {
                                f.set_property(name.as_str(), AttributeValue::String(text));
                            }
                        }
                    }
                    "value" if parent == Some("Data") => {
                        if let (Some(f), Some(key)) = (placemark.feature.as_mut(), data_name.clone()) {
                            f.set_property(key, AttributeValue::String(text));
                        }
                    }
                    "SimpleData" => {
                        if let (Some(f), Some(key)) = (placemark.feature.as_mut(), data_name.take()) {
                            f.set_property(key, AttributeValue::String(text));
                        }
                    }
                    "Placemark" => {
                        if let Some(mut f) = placemark.feature.take() {
                            f.geometry = placemark.geometry.take();
                            features.push(f);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(features)
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Result<Option<String>> {
    Ok(match e.try_get_attribute(key).map_err(quick_xml::Error::from)? {
        Some(attr) => Some(attr.unescape_value()?.into_owned()),
        None => None,
    })
}

/// Route a finished geometry into the enclosing MultiGeometry or the Placemark.
fn emit(geometry: Geometry<f64>, pending: &mut [Pending], placemark: &mut PlacemarkBuilder) {
    match pending.last_mut() {
        Some(Pending::Multi(parts)) => parts.push(geometry),
        _ => placemark.geometry = Some(geometry),
    }
}

/// Homogeneous MultiGeometry becomes a Multi*, anything else a collection.
fn collapse_multi(parts: Vec<Geometry<f64>>) -> Geometry<f64> {
    if !parts.is_empty() && parts.iter().all(|g| matches!(g, Geometry::Point(_))) {
        let points = parts
            .into_iter()
            .filter_map(|g| match g {
                Geometry::Point(p) => Some(p),
                _ => None,
            })
            .collect::<Vec<_>>();
        return MultiPoint::new(points).into();
    }
    if !parts.is_empty() && parts.iter().all(|g| matches!(g, Geometry::LineString(_))) {
        let lines = parts
            .into_iter()
            .filter_map(|g| match g {
                Geometry::LineString(l) => Some(l),
                _ => None,
            })
            .collect::<Vec<_>>();
        return MultiLineString::new(lines).into();
    }
    if !parts.is_empty() && parts.iter().all(|g| matches!(g, Geometry::Polygon(_))) {
        let polys = parts
            .into_iter()
            .filter_map(|g| match g {
                Geometry::Polygon(p) => Some(p),
                _ => None,
            })
            .collect::<Vec<_>>();
        return MultiPolygon::new(polys).into();
    }
    Geometry::GeometryCollection(GeometryCollection::new_from(parts))
}

/// `lon,lat[,alt]` tuples separated by whitespace.
fn parse_coordinates(text: &str) -> Result<Vec<Coord<f64>>> {
    text.split_whitespace()
        .map(|tuple| {
            let mut parts = tuple.split(',');
            let mut next = || -> Result<f64> {
                parts
                    .next()
                    .and_then(|v| v.trim().parse::<f64>().ok())
                    .ok_or_else(|| CodecError::Invalid(format!("bad coordinate tuple '{}'", tuple)))
            };
            let x = next()?;
            let y = next()?;
            Ok(Coord { x, y })
        })
        .collect()
}

// ── Writing ──────────────────────────────────────────────────────────────

/// Serialize lon/lat features as a KML document.
pub fn write_kml<'a>(
    document_name: &str,
    features: impl IntoIterator<Item = &'a Feature>,
    style: Option<&LayerStyle>,
) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<kml xmlns=\"http://www.opengis.net/kml/2.2\">\n<Document>\n");
    let _ = writeln!(out, "<name>{}</name>", escape(document_name));
    if let Some(style) = style {
        let _ = writeln!(
            out,
            "<Style id=\"default\"><LineStyle><color>{}</color><width>{}</width></LineStyle>\
             <PolyStyle><color>{}</color></PolyStyle></Style>",
            style.stroke.to_kml(),
            style.stroke_width,
            style.fill.to_kml()
        );
    }

    for feature in features {
        out.push_str("<Placemark>");
        if let Some(AttributeValue::String(name)) = feature.get_property("name") {
            let _ = write!(out, "<name>{}</name>", escape(name.as_str()));
        }
        if let Some(AttributeValue::String(desc)) = feature.get_property("description") {
            let _ = write!(out, "<description>{}</description>", escape(desc.as_str()));
        }
        if style.is_some() {
            out.push_str("<styleUrl>#default</styleUrl>");
        }
        let data = feature
            .properties
            .iter()
            .filter(|(k, _)| !is_geometry_alias(k) && *k != "name" && *k != "description")
            .collect::<Vec<_>>();
        if !data.is_empty() {
            out.push_str("<ExtendedData>");
            for (k, v) in data {
                let _ = write!(
                    out,
                    "<Data name=\"{}\"><value>{}</value></Data>",
                    escape(k.as_str()),
                    escape(v.to_string().as_str())
                );
            }
            out.push_str("</ExtendedData>");
        }
        if let Some(g) = &feature.geometry {
            write_geometry(&mut out, g);
        }
        out.push_str("</Placemark>\n");
    }

    out.push_str("</Document>\n</kml>\n");
    out
}

fn write_geometry(out: &mut String, geometry: &Geometry<f64>) {
    match geometry {
        Geometry::Point(p) => {
            out.push_str("<Point><coordinates>");
            write_coords(out, std::iter::once(p.0));
            out.push_str("</coordinates></Point>");
        }
        Geometry::Line(l) => write_geometry(out, &Geometry::LineString(LineString::from(*l))),
        Geometry::LineString(ls) => {
            out.push_str("<LineString><coordinates>");
            write_coords(out, ls.coords().copied());
            out.push_str("</coordinates></LineString>");
        }
        Geometry::Polygon(poly) => {
            out.push_str("<Polygon><outerBoundaryIs><LinearRing><coordinates>");
            write_coords(out, poly.exterior().coords().copied());
            out.push_str("</coordinates></LinearRing></outerBoundaryIs>");
            for inner in poly.interiors() {
                out.push_str("<innerBoundaryIs><LinearRing><coordinates>");
                write_coords(out, inner.coords().copied());
                out.push_str("</coordinates></LinearRing></innerBoundaryIs>");
            }
            out.push_str("</Polygon>");
        }
        Geometry::MultiPoint(mp) => write_multi(out, mp.iter().map(|p| Geometry::Point(*p))),
        Geometry::MultiLineString(ml) => {
            write_multi(out, ml.iter().cloned().map(Geometry::LineString))
        }
        Geometry::MultiPolygon(mp) => write_multi(out, mp.iter().cloned().map(Geometry::Polygon)),
        Geometry::GeometryCollection(gc) => write_multi(out, gc.iter().cloned()),
        Geometry::Rect(r) => write_geometry(out, &Geometry::Polygon(r.to_polygon())),
        Geometry::Triangle(t) => write_geometry(out, &Geometry::Polygon(t.to_polygon())),
    }
}

fn write_multi(out: &mut String, parts: impl Iterator<Item = Geometry<f64>>) {
    out.push_str("<MultiGeometry>");
    for part in parts {
        write_geometry(out, &part);
    }
    out.push_str("</MultiGeometry>");
}

fn write_coords(out: &mut String, coords: impl Iterator<Item = Coord<f64>>) {
    let mut first = true;
    for c in coords {
        if !first {
            out.push(' ');
        }
        first = false;
        let _ = write!(out, "{},{}", c.x, c.y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoweave_core::GeometryFamily;

    const SAMPLE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <name>Survey</name>
    <Folder>
      <name>Wells</name>
      <Placemark>
        <name>Well A</name>
        <description><![CDATA[<b>active</b>]]></description>
        <ExtendedData>
          <Data name="depth"><value>42</value></Data>
          <SchemaData schemaUrl="#s"><SimpleData name="owner">city</SimpleData></SchemaData>
        </ExtendedData>
        <Point><coordinates>-3.70,40.41,650</coordinates></Point>
      </Placemark>
    </Folder>
    <Placemark>
      <name>Lot</name>
      <Polygon>
        <outerBoundaryIs><LinearRing><coordinates>
          0,0 10,0 10,10 0,10 0,0
        </coordinates></LinearRing></outerBoundaryIs>
        <innerBoundaryIs><LinearRing><coordinates>
          2,2 4,2 4,4 2,2
        </coordinates></LinearRing></innerBoundaryIs>
      </Polygon>
    </Placemark>
    <Placemark>
      <name>Mixed</name>
      <MultiGeometry>
        <Point><coordinates>1,1</coordinates></Point>
        <LineString><coordinates>0,0 1,1</coordinates></LineString>
      </MultiGeometry>
    </Placemark>
  </Document>
</kml>"##;

    #[test]
    fn reads_nested_placemarks() {
        let set = read_kml(SAMPLE).unwrap();
        assert_eq!(set.len(), 3);

        let well = &set.features[0];
        assert_eq!(well.get_property("name"), Some(&AttributeValue::from("Well A")));
        assert_eq!(
            well.get_property("description"),
            Some(&AttributeValue::from("<b>active</b>"))
        );
        assert_eq!(well.get_property("depth"), Some(&AttributeValue::from("42")));
        assert_eq!(well.get_property("owner"), Some(&AttributeValue::from("city")));
        match &well.geometry {
            Some(Geometry::Point(p)) => assert_eq!((p.x(), p.y()), (-3.70, 40.41)),
            other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn reads_polygon_with_hole() {
        let set = read_kml(SAMPLE).unwrap();
        match &set.features[1].geometry {
            Some(Geometry::Polygon(p)) => {
                assert_eq!(p.exterior().0.len(), 5);
                assert_eq!(p.interiors().len(), 1);
            }
            other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn heterogeneous_multigeometry_is_a_collection() {
        let set = read_kml(SAMPLE).unwrap();
        assert!(matches!(
            set.features[2].geometry,
            Some(Geometry::GeometryCollection(_))
        ));
        assert_eq!(set.features[2].family(), Some(GeometryFamily::Point));
    }

    #[test]
    fn point_does_not_borrow_previous_coordinates() {
        let text = "<kml><Document>\
            <Placemark><LineString><coordinates>0,0 1,1</coordinates></LineString></Placemark>\
            <Placemark><Point></Point></Placemark>\
            </Document></kml>";
        assert!(read_kml(text).is_err());

        let text = "<kml><Document>\
            <Placemark><Point><coordinates>5,6</coordinates></Point></Placemark>\
            <Placemark><Point><extrude>1</extrude></Point></Placemark>\
            </Document></kml>";
        assert!(read_kml(text).is_err());
    }

    #[test]
    fn bad_coordinates_are_an_error() {
        let text = "<kml><Placemark><Point><coordinates>abc</coordinates></Point></Placemark></kml>";
        assert!(read_kml(text).is_err());
    }

    #[test]
    fn write_then_read_keeps_attributes() {
        let set = read_kml(SAMPLE).unwrap();
        let text = write_kml("Survey & co", set.iter(), Some(&LayerStyle::default()));
        assert!(text.contains("<name>Survey &amp; co</name>"));
        let back = read_kml(&text).unwrap();
        assert_eq!(back.len(), set.len());
        assert_eq!(back.features[0].properties, set.features[0].properties);
        assert_eq!(back.features[1].geometry, set.features[1].geometry);
    }
}
