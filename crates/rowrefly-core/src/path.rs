//! JSON path syntax
//!
//! Dotted segments address object fields and trailing `[n]` addresses array
//! elements, so `items[2].sku` and `matrix[0][1]` are both valid.

use crate::value::Value;
use std::fmt;
use std::str::FromStr;

/// One step of a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(String),
    Index(usize),
}

/// A parsed path into a nested document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JsonPath {
    segments: Vec<Segment>,
}

impl JsonPath {
    pub fn parse(text: &str) -> Result<Self, PathError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        for part in text.split('.') {
            if part.is_empty() {
                return Err(PathError::EmptySegment(text.to_string()));
            }

            let (name, mut rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };

            if !name.is_empty() {
                segments.push(Segment::Field(name.to_string()));
            }

            while !rest.is_empty() {
                let inner = rest
                    .strip_prefix('[')
                    .ok_or_else(|| PathError::UnexpectedText(text.to_string()))?;
                let close = inner
                    .find(']')
                    .ok_or_else(|| PathError::UnclosedBracket(text.to_string()))?;
                let index = inner[..close]
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| PathError::InvalidIndex {
                        path: text.to_string(),
                        index: inner[..close].to_string(),
                    })?;
                segments.push(Segment::Index(index));
                rest = &inner[close + 1..];
            }
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Walk the path from `root`; `None` when any step is missing
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.segments.iter().try_fold(root, |node, segment| match (segment, node) {
            (Segment::Field(name), Value::Object(map)) => map.get(name),
            (Segment::Index(i), Value::Array(items)) => items.get(*i),
            _ => None,
        })
    }
}

impl FromStr for JsonPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            match segment {
                Segment::Field(name) => {
                    if !first {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", name)?;
                }
                Segment::Index(i) => write!(f, "[{}]", i)?,
            }
            first = false;
        }
        Ok(())
    }
}

/// `prefix.name`, or just `name` at the root
pub fn join_field(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// `prefix[index]`
pub fn join_index(prefix: &str, index: usize) -> String {
    format!("{}[{}]", prefix, index)
}

/// Text after the last dot: `order.items[0].sku` → `sku`
pub fn leaf_name(path: &str) -> &str {
    match path.rfind('.') {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Strip the `column.` prefix from a full path
pub fn relative_to<'a>(column: &str, path: &'a str) -> &'a str {
    path.strip_prefix(column)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(path)
}

/// Path syntax errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("Empty JSON path")]
    Empty,

    #[error("Empty segment in JSON path '{0}'")]
    EmptySegment(String),

    #[error("Unclosed '[' in JSON path '{0}'")]
    UnclosedBracket(String),

    #[error("Unexpected text after index in JSON path '{0}'")]
    UnexpectedText(String),

    #[error("Invalid array index '{index}' in JSON path '{path}'")]
    InvalidIndex { path: String, index: String },
}
