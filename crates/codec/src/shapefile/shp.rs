//! ESRI shape geometry files (`.shp` / `.shx`).
//!
//! Header and record headers are big-endian, everything inside a record is
//! little-endian. Lengths and offsets are counted in 16-bit words.

use std::io::{Cursor, Seek, SeekFrom};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use geo::{Contains, Winding};
use geo_types::{
    Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon,
};
use geoweave_core::Extent;

use crate::error::{CodecError, Result};

const FILE_CODE: i32 = 9994;
const VERSION: i32 = 1000;
const HEADER_LEN: usize = 100;

/// Shape types written by the encoder. The reader also accepts Z/M variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeType {
    Null = 0,
    Point = 1,
    PolyLine = 3,
    Polygon = 5,
    MultiPoint = 8,
}

impl ShapeType {
    /// Map any type code (including Z = +10, M = +20 variants) to its XY base.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Null),
            1 | 11 | 21 => Some(Self::Point),
            3 | 13 | 23 => Some(Self::PolyLine),
            5 | 15 | 25 => Some(Self::Polygon),
            8 | 18 | 28 => Some(Self::MultiPoint),
            _ => None,
        }
    }
}

// ── Reading ──────────────────────────────────────────────────────────────

/// Decode every record of a `.shp` file, `None` for null shapes.
pub fn read_shp(bytes: &[u8]) -> Result<Vec<Option<Geometry<f64>>>> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::Invalid("SHP header truncated".into()));
    }
    let mut cur = Cursor::new(bytes);
    let code = cur.read_i32::<BigEndian>()?;
    if code != FILE_CODE {
        return Err(CodecError::Invalid(format!("bad SHP file code {}", code)));
    }
    cur.seek(SeekFrom::Start(24))?;
    let file_words = cur.read_i32::<BigEndian>()?;
    let file_len = (file_words.max(0) as usize * 2).min(bytes.len());

    let mut geometries = Vec::new();
    let mut pos = HEADER_LEN;
    while pos + 8 <= file_len {
        cur.seek(SeekFrom::Start(pos as u64))?;
        let _record_number = cur.read_i32::<BigEndian>()?;
        let content_len = cur.read_i32::<BigEndian>()?.max(0) as usize * 2;
        let end = pos + 8 + content_len;
        if end > bytes.len() {
            return Err(CodecError::Invalid("SHP record runs past end of file".into()));
        }
        geometries.push(read_record(&bytes[pos + 8..end])?);
        pos = end;
    }
    Ok(geometries)
}

fn read_record(content: &[u8]) -> Result<Option<Geometry<f64>>> {
    if content.len() < 4 {
        return Ok(None);
    }
    let mut cur = Cursor::new(content);
    let code = cur.read_i32::<LittleEndian>()?;
    let shape = ShapeType::from_code(code)
        .ok_or_else(|| CodecError::Invalid(format!("unsupported shape type {}", code)))?;

    let geometry = match shape {
        ShapeType::Null => return Ok(None),
        ShapeType::Point => {
            let x = cur.read_f64::<LittleEndian>()?;
            let y = cur.read_f64::<LittleEndian>()?;
            Geometry::Point(Point::new(x, y))
        }
        ShapeType::MultiPoint => {
            cur.seek(SeekFrom::Current(32))?;
            let n = cur.read_i32::<LittleEndian>()?.max(0) as usize;
            let points = read_points(&mut cur, n)?;
            Geometry::MultiPoint(MultiPoint::new(points.into_iter().map(Point::from).collect()))
        }
        ShapeType::PolyLine | ShapeType::Polygon => {
            cur.seek(SeekFrom::Current(32))?;
            let n_parts = cur.read_i32::<LittleEndian>()?.max(0) as usize;
            let n_points = cur.read_i32::<LittleEndian>()?.max(0) as usize;
            ensure_room(&cur, n_parts, 4, "part indices")?;
            let mut starts = Vec::with_capacity(n_parts);
            for _ in 0..n_parts {
                starts.push(cur.read_i32::<LittleEndian>()?.max(0) as usize);
            }
            let points = read_points(&mut cur, n_points)?;
            let parts = split_parts(&points, &starts);
            if shape == ShapeType::PolyLine {
                lines_to_geometry(parts)
            } else {
                rings_to_geometry(parts)
            }
        }
    };
    Ok(Some(geometry))
}

/// Counts come from the file; refuse any that the record cannot hold.
fn ensure_room(cur: &Cursor<&[u8]>, count: usize, item_len: usize, what: &str) -> Result<()> {
    let left = cur.get_ref().len().saturating_sub(cur.position() as usize);
    match count.checked_mul(item_len) {
        Some(needed) if needed <= left => Ok(()),
        _ => Err(CodecError::Invalid(format!(
            "SHP record declares {} {} but holds {} bytes",
            count, what, left
        ))),
    }
}

fn read_points(cur: &mut Cursor<&[u8]>, n: usize) -> Result<Vec<Coord<f64>>> {
    ensure_room(cur, n, 16, "points")?;
    let mut points = Vec::with_capacity(n);
    for _ in 0..n {
        let x = cur.read_f64::<LittleEndian>()?;
        let y = cur.read_f64::<LittleEndian>()?;
        points.push(Coord { x, y });
    }
    Ok(points)
}

fn split_parts(points: &[Coord<f64>], starts: &[usize]) -> Vec<LineString<f64>> {
    starts
        .iter()
        .enumerate()
        .filter_map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(points.len());
            points.get(start..end).map(|p| LineString::new(p.to_vec()))
        })
        .collect()
}

fn lines_to_geometry(mut parts: Vec<LineString<f64>>) -> Geometry<f64> {
    if parts.len() == 1 {
        Geometry::LineString(parts.remove(0))
    } else {
        Geometry::MultiLineString(MultiLineString::new(parts))
    }
}

/// Group rings into polygons: clockwise rings are shells, counter-clockwise
/// rings are holes of the first shell that contains them.
fn rings_to_geometry(rings: Vec<LineString<f64>>) -> Geometry<f64> {
    let (shells, holes): (Vec<_>, Vec<_>) = rings.into_iter().partition(|r| r.is_cw());

    // Wrongly wound files: treat every ring as a shell.
    if shells.is_empty() {
        return polygons_to_geometry(holes.into_iter().map(|r| Polygon::new(r, vec![])).collect());
    }

    let mut polygons: Vec<(LineString<f64>, Vec<LineString<f64>>)> =
        shells.into_iter().map(|s| (s, Vec::new())).collect();
    let mut orphans = Vec::new();
    for hole in holes {
        let probe = hole.0.first().copied().map(Point::from);
        let owner = probe.and_then(|p| {
            polygons
                .iter()
                .position(|(shell, _)| Polygon::new(shell.clone(), vec![]).contains(&p))
        });
        match owner {
            Some(i) => polygons[i].1.push(hole),
            None => orphans.push(hole),
        }
    }

    let mut out: Vec<Polygon<f64>> = polygons
        .into_iter()
        .map(|(shell, holes)| Polygon::new(shell, holes))
        .collect();
    out.extend(orphans.into_iter().map(|r| Polygon::new(r, vec![])));
    polygons_to_geometry(out)
}

fn polygons_to_geometry(mut polygons: Vec<Polygon<f64>>) -> Geometry<f64> {
    if polygons.len() == 1 {
        Geometry::Polygon(polygons.remove(0))
    } else {
        Geometry::MultiPolygon(MultiPolygon::new(polygons))
    }
}

// ── Writing ──────────────────────────────────────────────────────────────

/// Encoded `.shp` and `.shx` pair.
pub struct ShapeFiles {
    pub shp: Vec<u8>,
    pub shx: Vec<u8>,
}

/// Encode geometries of one shape type. Geometries that do not belong to the
/// type contribute only the matching parts they contain (none → null shape).
pub fn write_shp(shape: ShapeType, geometries: &[Option<&Geometry<f64>>]) -> Result<ShapeFiles> {
    let mut records: Vec<Vec<u8>> = Vec::with_capacity(geometries.len());
    let mut extent: Option<Extent> = None;

    for geometry in geometries {
        let content = match geometry {
            Some(g) => encode_record(shape, g)?,
            None => None,
        };
        if let (Some(_), Some(g)) = (&content, geometry) {
            if let Some(e) = Extent::of_geometry(g) {
                extent = Some(extent.map_or(e, |acc| acc.union(&e)));
            }
        }
        match content {
            Some(bytes) => records.push(bytes),
            None => records.push(null_record()?),
        }
    }

    let extent = extent.unwrap_or_else(|| Extent::new(0.0, 0.0, 0.0, 0.0));
    let shp_words = (HEADER_LEN + records.iter().map(|r| 8 + r.len()).sum::<usize>()) / 2;
    let shx_words = (HEADER_LEN + records.len() * 8) / 2;

    let mut shp = Vec::with_capacity(shp_words * 2);
    let mut shx = Vec::with_capacity(shx_words * 2);
    write_header(&mut shp, shape, shp_words, &extent)?;
    write_header(&mut shx, shape, shx_words, &extent)?;

    let mut offset_words = HEADER_LEN / 2;
    for (i, record) in records.iter().enumerate() {
        let content_words = record.len() / 2;
        shp.write_i32::<BigEndian>(i as i32 + 1)?;
        shp.write_i32::<BigEndian>(content_words as i32)?;
        shp.extend_from_slice(record);

        shx.write_i32::<BigEndian>(offset_words as i32)?;
        shx.write_i32::<BigEndian>(content_words as i32)?;
        offset_words += 4 + content_words;
    }

    Ok(ShapeFiles { shp, shx })
}

fn write_header(out: &mut Vec<u8>, shape: ShapeType, words: usize, extent: &Extent) -> Result<()> {
    out.write_i32::<BigEndian>(FILE_CODE)?;
    out.extend_from_slice(&[0u8; 20]);
    out.write_i32::<BigEndian>(words as i32)?;
    out.write_i32::<LittleEndian>(VERSION)?;
    out.write_i32::<LittleEndian>(shape as i32)?;
    write_bbox(out, extent)?;
    // Z and M ranges.
    for _ in 0..4 {
        out.write_f64::<LittleEndian>(0.0)?;
    }
    Ok(())
}

fn write_bbox(out: &mut Vec<u8>, e: &Extent) -> Result<()> {
    out.write_f64::<LittleEndian>(e.min_x)?;
    out.write_f64::<LittleEndian>(e.min_y)?;
    out.write_f64::<LittleEndian>(e.max_x)?;
    out.write_f64::<LittleEndian>(e.max_y)?;
    Ok(())
}

fn null_record() -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(4);
    out.write_i32::<LittleEndian>(ShapeType::Null as i32)?;
    Ok(out)
}

fn encode_record(shape: ShapeType, geometry: &Geometry<f64>) -> Result<Option<Vec<u8>>> {
    let mut out = Vec::new();
    match shape {
        ShapeType::Null => return Ok(None),
        ShapeType::Point => {
            let Some(p) = collect_points(geometry).into_iter().next() else {
                return Ok(None);
            };
            out.write_i32::<LittleEndian>(ShapeType::Point as i32)?;
            out.write_f64::<LittleEndian>(p.x)?;
            out.write_f64::<LittleEndian>(p.y)?;
        }
        ShapeType::MultiPoint => {
            let points = collect_points(geometry);
            if points.is_empty() {
                return Ok(None);
            }
            out.write_i32::<LittleEndian>(ShapeType::MultiPoint as i32)?;
            write_bbox(&mut out, &bbox_of(&points))?;
            out.write_i32::<LittleEndian>(points.len() as i32)?;
            for p in &points {
                out.write_f64::<LittleEndian>(p.x)?;
                out.write_f64::<LittleEndian>(p.y)?;
            }
        }
        ShapeType::PolyLine | ShapeType::Polygon => {
            let parts = if shape == ShapeType::PolyLine {
                collect_lines(geometry)
            } else {
                collect_rings(geometry)
            };
            if parts.is_empty() {
                return Ok(None);
            }
            let points: Vec<Coord<f64>> = parts.iter().flat_map(|p| p.0.iter().copied()).collect();
            if points.is_empty() {
                return Ok(None);
            }
            out.write_i32::<LittleEndian>(shape as i32)?;
            write_bbox(&mut out, &bbox_of(&points))?;
            out.write_i32::<LittleEndian>(parts.len() as i32)?;
            out.write_i32::<LittleEndian>(points.len() as i32)?;
            let mut start = 0i32;
            for part in &parts {
                out.write_i32::<LittleEndian>(start)?;
                start += part.0.len() as i32;
            }
            for p in &points {
                out.write_f64::<LittleEndian>(p.x)?;
                out.write_f64::<LittleEndian>(p.y)?;
            }
        }
    }
    Ok(Some(out))
}

fn bbox_of(points: &[Coord<f64>]) -> Extent {
    points.iter().skip(1).fold(
        Extent::new(points[0].x, points[0].y, points[0].x, points[0].y),
        |e, p| Extent::new(e.min_x.min(p.x), e.min_y.min(p.y), e.max_x.max(p.x), e.max_y.max(p.y)),
    )
}

fn collect_points(geometry: &Geometry<f64>) -> Vec<Coord<f64>> {
    match geometry {
        Geometry::Point(p) => vec![p.0],
        Geometry::MultiPoint(mp) => mp.iter().map(|p| p.0).collect(),
        Geometry::GeometryCollection(gc) => gc.iter().flat_map(collect_points).collect(),
        _ => Vec::new(),
    }
}

fn collect_lines(geometry: &Geometry<f64>) -> Vec<LineString<f64>> {
    match geometry {
        Geometry::Line(l) => vec![LineString::from(*l)],
        Geometry::LineString(ls) => vec![ls.clone()],
        Geometry::MultiLineString(ml) => ml.0.clone(),
        Geometry::GeometryCollection(gc) => gc.iter().flat_map(collect_lines).collect(),
        _ => Vec::new(),
    }
}

/// Rings of every polygon part: outer clockwise, holes counter-clockwise.
fn collect_rings(geometry: &Geometry<f64>) -> Vec<LineString<f64>> {
    let polygons: Vec<Polygon<f64>> = match geometry {
        Geometry::Polygon(p) => vec![p.clone()],
        Geometry::MultiPolygon(mp) => mp.0.clone(),
        Geometry::Rect(r) => vec![r.to_polygon()],
        Geometry::Triangle(t) => vec![t.to_polygon()],
        Geometry::GeometryCollection(gc) => {
            return gc.iter().flat_map(collect_rings).collect();
        }
        _ => Vec::new(),
    };
    let mut rings = Vec::new();
    for polygon in polygons {
        let (mut exterior, interiors) = polygon.into_inner();
        exterior.make_cw_winding();
        rings.push(exterior);
        for mut hole in interiors {
            hole.make_ccw_winding();
            rings.push(hole);
        }
    }
    rings
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{line_string, point, polygon};

    #[test]
    fn points_round_trip() {
        let a: Geometry<f64> = point!(x: 1.5, y: -2.0).into();
        let b: Geometry<f64> = point!(x: 3.0, y: 4.0).into();
        let files = write_shp(ShapeType::Point, &[Some(&a), None, Some(&b)]).unwrap();
        assert_eq!(files.shx.len(), 100 + 3 * 8);

        let back = read_shp(&files.shp).unwrap();
        assert_eq!(back, vec![Some(a), None, Some(b)]);
    }

    #[test]
    fn polygon_holes_survive_winding() {
        // Exterior given counter-clockwise, hole clockwise: both must be flipped.
        let poly: Geometry<f64> = polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)],
            interiors: [[(x: 2.0, y: 2.0), (x: 2.0, y: 4.0), (x: 4.0, y: 4.0), (x: 4.0, y: 2.0)]],
        )
        .into();
        let files = write_shp(ShapeType::Polygon, &[Some(&poly)]).unwrap();
        let back = read_shp(&files.shp).unwrap();
        match &back[0] {
            Some(Geometry::Polygon(p)) => {
                assert!(p.exterior().is_cw());
                assert_eq!(p.interiors().len(), 1);
                assert!(p.interiors()[0].is_ccw());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn two_shells_make_a_multipolygon() {
        let a = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)];
        let b = polygon![(x: 5.0, y: 5.0), (x: 6.0, y: 5.0), (x: 6.0, y: 6.0)];
        let mp: Geometry<f64> = MultiPolygon::new(vec![a, b]).into();
        let files = write_shp(ShapeType::Polygon, &[Some(&mp)]).unwrap();
        let back = read_shp(&files.shp).unwrap();
        assert!(matches!(&back[0], Some(Geometry::MultiPolygon(m)) if m.0.len() == 2));
    }

    #[test]
    fn polylines_split_into_parts() {
        let ml: Geometry<f64> = MultiLineString::new(vec![
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)],
            line_string![(x: 2.0, y: 2.0), (x: 3.0, y: 3.0), (x: 4.0, y: 3.0)],
        ])
        .into();
        let files = write_shp(ShapeType::PolyLine, &[Some(&ml)]).unwrap();
        assert_eq!(read_shp(&files.shp).unwrap(), vec![Some(ml)]);
    }

    #[test]
    fn z_variants_are_read_as_xy() {
        assert_eq!(ShapeType::from_code(15), Some(ShapeType::Polygon));
        assert_eq!(ShapeType::from_code(21), Some(ShapeType::Point));
        assert_eq!(ShapeType::from_code(31), None);
    }

    #[test]
    fn inflated_counts_are_rejected() {
        let mp: Geometry<f64> = MultiPoint::new(vec![point!(x: 1.0, y: 2.0)]).into();
        let mut shp = write_shp(ShapeType::MultiPoint, &[Some(&mp)]).unwrap().shp;
        // header, record header, shape type, bbox
        let n_points = HEADER_LEN + 8 + 4 + 32;
        shp[n_points..n_points + 4].copy_from_slice(&i32::MAX.to_le_bytes());
        assert!(matches!(read_shp(&shp), Err(CodecError::Invalid(_))));

        let pg: Geometry<f64> = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)].into();
        let mut shp = write_shp(ShapeType::Polygon, &[Some(&pg)]).unwrap().shp;
        let n_parts = HEADER_LEN + 8 + 4 + 32;
        shp[n_parts..n_parts + 4].copy_from_slice(&i32::MAX.to_le_bytes());
        assert!(matches!(read_shp(&shp), Err(CodecError::Invalid(_))));
    }

    #[test]
    fn rejects_garbage() {
        assert!(read_shp(&[0u8; 100]).is_err());
        assert!(read_shp(b"short").is_err());
    }
}
