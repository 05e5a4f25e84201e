//! DBF field naming and typing for shapefile export.

use std::collections::HashSet;

use geoweave_core::AttributeValue;

/// Longest field name a DBF header can hold.
pub const MAX_FIELD_NAME: usize = 10;
/// Longest character field a DBF record can hold.
pub const MAX_CHAR_WIDTH: usize = 254;

/// Make attribute keys legal, unique DBF field names.
///
/// Names keep only `[A-Za-z0-9_]`, are cut to ten characters, and collisions
/// (case-insensitive, as readers compare them) get a numeric suffix that still
/// fits in ten characters. Output order matches input order.
pub fn sanitize_field_names<S: AsRef<str>>(keys: &[S]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(keys.len());

    for key in keys {
        let mut base: String = key
            .as_ref()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .take(MAX_FIELD_NAME)
            .collect();
        if base.trim_matches('_').is_empty() {
            base = "FIELD".to_string();
        }

        let mut candidate = base.clone();
        let mut n = 1usize;
        while taken.contains(&candidate.to_ascii_uppercase()) {
            let suffix = n.to_string();
            let keep = MAX_FIELD_NAME.saturating_sub(suffix.len()).min(base.len());
            candidate = format!("{}{}", &base[..keep], suffix);
            n += 1;
        }
        taken.insert(candidate.to_ascii_uppercase());
        out.push(candidate);
    }
    out
}

/// DBF column type chosen from the values a key takes across a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Logical,
    Integer { width: u8 },
    Decimal { width: u8, decimals: u8 },
    Character { width: u8 },
}

impl FieldKind {
    pub fn type_code(self) -> u8 {
        match self {
            Self::Logical => b'L',
            Self::Integer { .. } | Self::Decimal { .. } => b'N',
            Self::Character { .. } => b'C',
        }
    }

    pub fn width(self) -> u8 {
        match self {
            Self::Logical => 1,
            Self::Integer { width } | Self::Decimal { width, .. } | Self::Character { width } => {
                width
            }
        }
    }

    pub fn decimals(self) -> u8 {
        match self {
            Self::Decimal { decimals, .. } => decimals,
            _ => 0,
        }
    }

    /// Infer the narrowest column that holds every value.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a AttributeValue>) -> Self {
        let mut bools = 0usize;
        let mut ints = 0usize;
        let mut floats = 0usize;
        let mut others = 0usize;
        let mut int_width = 1usize;
        let mut text_width = 1usize;

        for value in values {
            match value {
                AttributeValue::Null => {}
                AttributeValue::Bool(_) => bools += 1,
                AttributeValue::Int(i) => {
                    ints += 1;
                    int_width = int_width.max(i.to_string().len());
                }
                AttributeValue::Float(_) => floats += 1,
                AttributeValue::String(_) => others += 1,
            }
            if !value.is_null() {
                text_width = text_width.max(value.to_string().len());
            }
        }

        let text = Self::Character {
            width: text_width.min(MAX_CHAR_WIDTH) as u8,
        };
        if others > 0 {
            return text;
        }
        match (bools, ints, floats) {
            (b, 0, 0) if b > 0 => Self::Logical,
            (0, i, 0) if i > 0 && int_width <= 18 => Self::Integer {
                width: int_width as u8,
            },
            (0, _, f) if f > 0 => Self::Decimal {
                width: 24,
                decimals: 8,
            },
            (0, 0, 0) => Self::Character { width: 1 },
            _ => text,
        }
    }

    /// Encode one value to exactly `width()` bytes.
    pub fn encode(self, value: &AttributeValue) -> Vec<u8> {
        let width = self.width() as usize;
        let text = match (self, value) {
            (_, AttributeValue::Null) => String::new(),
            (Self::Logical, AttributeValue::Bool(b)) => (if *b { "T" } else { "F" }).to_string(),
            (Self::Logical, _) => "?".to_string(),
            (Self::Integer { .. }, v) => format!("{:>width$}", v.to_string(), width = width),
            (Self::Decimal { decimals, .. }, AttributeValue::Int(i)) => {
                format!("{:>width$.prec$}", *i as f64, width = width, prec = decimals as usize)
            }
            (Self::Decimal { decimals, .. }, AttributeValue::Float(f)) => {
                format!("{:>width$.prec$}", f, width = width, prec = decimals as usize)
            }
            (_, v) => v.to_string(),
        };

        let numeric = matches!(self, Self::Integer { .. } | Self::Decimal { .. });
        let mut bytes = if numeric && text.len() > width {
            // numbers that do not fit are written as null rather than cut
            Vec::new()
        } else {
            truncate_utf8(&text, width).as_bytes().to_vec()
        };
        bytes.resize(width, b' ');
        bytes
    }
}

fn truncate_utf8(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
