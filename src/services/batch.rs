//! Single-vs-batch resolution of an intake payload.

use serde_json::Value;

use crate::errors::{AppError, INVALID_DATA_FORMAT};
use crate::services::normalizer::RawRecord;

/// Readings of one request, yielded lazily in input order.
///
/// Consumed once; there is no way to restart it.
#[derive(Debug)]
pub enum Batch {
    Single(Option<RawRecord>),
    Many(std::vec::IntoIter<Value>),
}

impl Iterator for Batch {
    type Item = RawRecord;

    fn next(&mut self) -> Option<RawRecord> {
        match self {
            Batch::Single(record) => record.take(),
            Batch::Many(items) => items.next().map(RawRecord::from_value),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Batch::Single(record) => {
                let n = usize::from(record.is_some());
                (n, Some(n))
            }
            Batch::Many(items) => items.size_hint(),
        }
    }
}

impl ExactSizeIterator for Batch {}

/// Decide whether a parsed body is one reading or a list of readings.
///
/// - An object is a single reading.
/// - An array whose first element is an object or array is a batch; elements
///   that are not objects become readings with no fields.
/// - An empty array is an empty batch.
/// - Any other array is treated as one reading without named fields.
/// - Scalars, strings and null are rejected.
pub fn resolve_batch(body: Value) -> Result<Batch, AppError> {
    match body {
        Value::Object(map) => Ok(Batch::Single(Some(RawRecord::from(map)))),
        Value::Array(items) => match items.first() {
            None | Some(Value::Object(_)) | Some(Value::Array(_)) => {
                Ok(Batch::Many(items.into_iter()))
            }
            Some(_) => Ok(Batch::Single(Some(RawRecord::default()))),
        },
        _ => Err(AppError::MalformedInput(INVALID_DATA_FORMAT.to_string())),
    }
}
