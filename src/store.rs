use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::str;
use std::sync::Arc;
use thiserror::Error as ThisError;

/// A value held by the store. Only scalars are supported.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Text(Bytes),
    Integer(i64),
}

impl Scalar {
    /// Interprets the scalar as a base-10 signed 64-bit integer.
    pub fn to_integer(&self) -> Result<i64, StoreError> {
        match self {
            Scalar::Integer(i) => Ok(*i),
            Scalar::Text(data) => str::from_utf8(data)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or(StoreError::NotAnInteger),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

#[derive(Debug, ThisError, PartialEq)]
pub enum StoreError {
    #[error("value is not an integer or out of range")]
    NotAnInteger,
}

/// The Store is responsible for managing key-value pairs. All keys live in a single map behind
/// one reader/writer lock: writers exclude each other and all readers, readers run in parallel.
/// The store is designed to be thread-safe, allowing it to be shared and cloned cheaply using
/// reference counting.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<RwLock<HashMap<String, Scalar>>>,
}

impl Store {
    pub fn new() -> Store {
        Self::default()
    }

    /// Inserts `value` under `key`, replacing whatever was there.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Scalar>) {
        self.inner.write().insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<Scalar> {
        self.inner.read().get(key).cloned()
    }

    /// Removes `key`, returning whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        self.inner.write().remove(key).is_some()
    }

    pub fn exists(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }

    /// Returns every key, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Adds `increment` to the integer stored at `key` and returns the new value.
    ///
    /// A missing key counts as zero. The result keeps the kind of the scalar it replaces, and
    /// a missing key is created as text. The read and the write happen under the same lock.
    pub fn incr_by(&self, key: &str, increment: i64) -> Result<i64, StoreError> {
        let mut keys = self.inner.write();

        let (current, is_text) = match keys.get(key) {
            None => (0, true),
            Some(scalar @ Scalar::Text(_)) => (scalar.to_integer()?, true),
            Some(Scalar::Integer(i)) => (*i, false),
        };

        let value = current
            .checked_add(increment)
            .ok_or(StoreError::NotAnInteger)?;

        let scalar = if is_text {
            Scalar::Text(Bytes::from(value.to_string()))
        } else {
            Scalar::Integer(value)
        };
        keys.insert(key.to_string(), scalar);

        Ok(value)
    }
}
