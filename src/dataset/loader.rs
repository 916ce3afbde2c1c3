//! JSON dataset reader.
//!
//! ## Format
//!
//! ```json
//! {
//!   "laptops": [["macbook", "thinkpad", 17], 3],
//!   "phones":  [["iphone", "pixel"]]
//! }
//! ```
//!
//! Each record maps a query name to `[elements]` or `[elements, weight]`.
//! Elements may be strings or numbers; both are interned into
//! [`Element`] ids in first-seen order (records in name order). The JSON
//! type is part of the token, so `"1"` and `1` are distinct elements. A
//! missing weight defaults to 1.

use serde_json::Value;
use std::collections::BTreeMap;

use super::DatasetError;
use crate::types::{Element, ElementSet};

/// A record as read from the input, before preprocessing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawQuery {
    /// Query name.
    pub name: String,
    /// Interned elements.
    pub elements: ElementSet,
    /// Weight.
    pub weight: f64,
}

impl RawQuery {
    /// Create a record.
    pub fn new(name: impl Into<String>, elements: ElementSet, weight: f64) -> Self {
        Self {
            name: name.into(),
            elements,
            weight,
        }
    }
}

/// Maps external element tokens to dense ids.
#[derive(Debug, Clone, Default)]
pub struct ElementInterner {
    ids: BTreeMap<String, Element>,
}

impl ElementInterner {
    /// Id of `token`, allocating one on first sight.
    pub fn intern(&mut self, token: &str) -> Element {
        if let Some(&e) = self.ids.get(token) {
            return e;
        }
        let e = Element::new(self.ids.len() as u32);
        self.ids.insert(token.to_string(), e);
        e
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing was interned.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Parse a dataset document.
pub fn parse_records(json: &str) -> Result<(Vec<RawQuery>, ElementInterner), DatasetError> {
    let document: BTreeMap<String, Value> = serde_json::from_str(json)?;
    let mut interner = ElementInterner::default();
    let mut records = Vec::with_capacity(document.len());

    for (name, value) in document {
        let record = parse_record(&name, &value, &mut interner)?;
        records.push(record);
    }
    Ok((records, interner))
}

fn parse_record(name: &str, value: &Value, interner: &mut ElementInterner) -> Result<RawQuery, DatasetError> {
    let malformed = |reason: &str| DatasetError::MalformedRecord {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let parts = value.as_array().ok_or_else(|| malformed("expected [elements, weight?]"))?;
    let (elements, weight) = match parts.as_slice() {
        [elements] => (elements, None),
        [elements, weight] => (elements, Some(weight)),
        _ => return Err(malformed("expected one or two entries")),
    };

    let tokens = elements.as_array().ok_or_else(|| malformed("elements must be an array"))?;
    let mut set = ElementSet::new();
    for token in tokens {
        let e = match token {
            Value::String(s) => interner.intern(&format!("s:{s}")),
            Value::Number(n) => interner.intern(&format!("n:{n}")),
            _ => return Err(malformed("elements must be strings or numbers")),
        };
        set.insert(e);
    }

    let weight = match weight {
        None => 1.0,
        Some(w) => w.as_f64().ok_or_else(|| malformed("weight must be a number"))?,
    };
    if !(weight.is_finite() && weight > 0.0) {
        return Err(DatasetError::InvalidWeight {
            name: name.to_string(),
            weight,
        });
    }

    Ok(RawQuery::new(name, set, weight))
}
