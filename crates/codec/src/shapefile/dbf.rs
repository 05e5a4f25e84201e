//! dBASE III attribute tables (`.dbf`).

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use geoweave_core::{AttributeValue, Attributes};

use super::fields::FieldKind;
use crate::error::{CodecError, Result};

const HEADER_LEN: usize = 32;
const DESCRIPTOR_LEN: usize = 32;
const HEADER_TERMINATOR: u8 = 0x0D;
const FILE_TERMINATOR: u8 = 0x1A;
const DELETED: u8 = b'*';

#[derive(Debug, Clone)]
struct FieldDescriptor {
    name: String,
    type_code: u8,
    length: usize,
    decimals: u8,
}

/// Decode a DBF table. Deleted records are kept as `None` so indices still
/// line up with the geometry records of the `.shp`.
pub fn read_dbf(bytes: &[u8]) -> Result<Vec<Option<Attributes>>> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::Invalid("DBF header truncated".into()));
    }
    let mut cur = Cursor::new(bytes);
    let _version = cur.read_u8()?;
    let mut _date = [0u8; 3];
    cur.read_exact(&mut _date)?;
    let n_records = cur.read_u32::<LittleEndian>()? as usize;
    let header_len = cur.read_u16::<LittleEndian>()? as usize;
    let record_len = cur.read_u16::<LittleEndian>()? as usize;

    let mut fields = Vec::new();
    let mut pos = HEADER_LEN;
    while pos + DESCRIPTOR_LEN <= bytes.len() && bytes[pos] != HEADER_TERMINATOR {
        let raw = &bytes[pos..pos + DESCRIPTOR_LEN];
        let name_end = raw[..11].iter().position(|&b| b == 0).unwrap_or(11);
        fields.push(FieldDescriptor {
            name: String::from_utf8_lossy(&raw[..name_end]).trim().to_string(),
            type_code: raw[11],
            length: raw[16] as usize,
            decimals: raw[17],
        });
        pos += DESCRIPTOR_LEN;
    }

    let declared: usize = 1 + fields.iter().map(|f| f.length).sum::<usize>();
    if record_len != declared {
        tracing::warn!(record_len, declared, "DBF record length disagrees with fields");
    }
    let record_len = record_len.max(1);

    let stored = bytes.len().saturating_sub(header_len) / record_len;
    if n_records > stored {
        tracing::warn!(expected = n_records, stored, "DBF ends before its record count");
    }
    let mut records = Vec::with_capacity(n_records.min(stored));
    for i in 0..n_records.min(stored) {
        let start = header_len + i * record_len;
        let Some(record) = bytes.get(start..start + record_len) else {
            break;
        };
        if record[0] == FILE_TERMINATOR {
            break;
        }
        if record[0] == DELETED {
            records.push(None);
            continue;
        }
        let mut attrs = Attributes::new();
        let mut offset = 1;
        for field in &fields {
            let raw = record.get(offset..offset + field.length).unwrap_or(&[]);
            attrs.insert(field.name.clone(), decode_value(field, raw));
            offset += field.length;
        }
        records.push(Some(attrs));
    }
    Ok(records)
}

fn decode_value(field: &FieldDescriptor, raw: &[u8]) -> AttributeValue {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_matches(|c: char| c == ' ' || c == '\0');
    if text.is_empty() {
        return AttributeValue::Null;
    }
    match field.type_code {
        b'N' | b'F' => {
            if field.decimals == 0 {
                if let Ok(i) = text.parse::<i64>() {
                    return AttributeValue::Int(i);
                }
            }
            match text.parse::<f64>() {
                Ok(v) => AttributeValue::Float(v),
                Err(_) => AttributeValue::Null,
            }
        }
        b'L' => match text.chars().next() {
            Some('T' | 't' | 'Y' | 'y') => AttributeValue::Bool(true),
            Some('F' | 'f' | 'N' | 'n') => AttributeValue::Bool(false),
            _ => AttributeValue::Null,
        },
        b'D' if text.len() == 8 && text.bytes().all(|b| b.is_ascii_digit()) => {
            AttributeValue::String(format!("{}-{}-{}", &text[..4], &text[4..6], &text[6..]))
        }
        _ => AttributeValue::String(text.to_string()),
    }
}

/// A column ready to be written.
#[derive(Debug, Clone)]
pub struct DbfColumn {
    /// Sanitized name, at most ten ASCII characters.
    pub name: String,
    pub kind: FieldKind,
}

/// Encode rows of values (one per column, in column order) as a DBF table.
pub fn write_dbf(columns: &[DbfColumn], rows: &[Vec<&AttributeValue>]) -> Result<Vec<u8>> {
    // A table without columns is not readable by most tools.
    let placeholder = [DbfColumn {
        name: "FID".to_string(),
        kind: FieldKind::Integer { width: 9 },
    }];
    let fid_only = columns.is_empty();
    let columns = if fid_only { &placeholder[..] } else { columns };

    let header_len = HEADER_LEN + columns.len() * DESCRIPTOR_LEN + 1;
    let record_len = 1 + columns.iter().map(|c| c.kind.width() as usize).sum::<usize>();
    let mut out = Vec::with_capacity(header_len + rows.len() * record_len + 1);

    out.write_u8(0x03)?;
    // Fixed last-update date; readers ignore it.
    out.extend_from_slice(&[95, 7, 26]);
    out.write_u32::<LittleEndian>(rows.len() as u32)?;
    out.write_u16::<LittleEndian>(header_len as u16)?;
    out.write_u16::<LittleEndian>(record_len as u16)?;
    out.extend_from_slice(&[0u8; 20]);

    for column in columns {
        let mut name = [0u8; 11];
        let bytes = column.name.as_bytes();
        let n = bytes.len().min(10);
        name[..n].copy_from_slice(&bytes[..n]);
        out.extend_from_slice(&name);
        out.write_u8(column.kind.type_code())?;
        out.extend_from_slice(&[0u8; 4]);
        out.write_u8(column.kind.width())?;
        out.write_u8(column.kind.decimals())?;
        out.extend_from_slice(&[0u8; 14]);
    }
    out.write_u8(HEADER_TERMINATOR)?;

    for (fid, row) in rows.iter().enumerate() {
        out.write_u8(b' ')?;
        if fid_only {
            out.extend(columns[0].kind.encode(&AttributeValue::Int(fid as i64)));
            continue;
        }
        for (column, value) in columns.iter().zip(row.iter()) {
            out.extend(column.kind.encode(value));
        }
    }
    out.write_u8(FILE_TERMINATOR)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let columns = vec![
            DbfColumn {
                name: "name".into(),
                kind: FieldKind::Character { width: 8 },
            },
            DbfColumn {
                name: "pop".into(),
                kind: FieldKind::Integer { width: 6 },
            },
            DbfColumn {
                name: "area".into(),
                kind: FieldKind::Decimal {
                    width: 24,
                    decimals: 8,
                },
            },
            DbfColumn {
                name: "capital".into(),
                kind: FieldKind::Logical,
            },
        ];
        let a = [
            AttributeValue::from("Lima"),
            AttributeValue::Int(9000),
            AttributeValue::Float(2672.3),
            AttributeValue::Bool(true),
        ];
        let b = [
            AttributeValue::from("Cusco"),
            AttributeValue::Null,
            AttributeValue::Float(0.5),
            AttributeValue::Bool(false),
        ];
        let rows: Vec<Vec<&AttributeValue>> = vec![a.iter().collect(), b.iter().collect()];
        let bytes = write_dbf(&columns, &rows).unwrap();

        let records: Vec<Attributes> = read_dbf(&bytes).unwrap().into_iter().flatten().collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["name"], AttributeValue::from("Lima"));
        assert_eq!(records[0]["pop"], AttributeValue::Int(9000));
        assert_eq!(records[0]["area"], AttributeValue::Float(2672.3));
        assert_eq!(records[0]["capital"], AttributeValue::Bool(true));
        assert_eq!(records[1]["pop"], AttributeValue::Null);
        assert_eq!(records[1]["capital"], AttributeValue::Bool(false));
    }

    #[test]
    fn deleted_records_are_placeholders() {
        let columns = vec![DbfColumn {
            name: "id".into(),
            kind: FieldKind::Integer { width: 3 },
        }];
        let one = AttributeValue::Int(1);
        let two = AttributeValue::Int(2);
        let mut bytes = write_dbf(&columns, &[vec![&one], vec![&two]]).unwrap();
        let header_len = HEADER_LEN + DESCRIPTOR_LEN + 1;
        bytes[header_len] = DELETED;

        let records = read_dbf(&bytes).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].is_none());
        assert_eq!(records[1].as_ref().unwrap()["id"], AttributeValue::Int(2));
    }

    #[test]
    fn record_count_is_bounded_by_the_data() {
        let mut bytes = vec![0u8; HEADER_LEN];
        bytes[0] = 0x03;
        bytes[4..8].copy_from_slice(&u32::MAX.to_le_bytes());
        bytes[8..10].copy_from_slice(&((HEADER_LEN + 1) as u16).to_le_bytes());
        bytes[10..12].copy_from_slice(&1u16.to_le_bytes());
        bytes.push(HEADER_TERMINATOR);

        assert!(read_dbf(&bytes).unwrap().is_empty());
    }

    #[test]
    fn dates_are_iso_formatted() {
        let field = FieldDescriptor {
            name: "d".into(),
            type_code: b'D',
            length: 8,
            decimals: 0,
        };
        assert_eq!(
            decode_value(&field, b"20240131"),
            AttributeValue::from("2024-01-31")
        );
    }

    #[test]
    fn truncated_header_is_an_error() {
        assert!(read_dbf(&[0x03, 1, 2]).is_err());
    }
}
