//! Payload codecs
//!
//! Records are opaque bytes to the frame layer. A [`PayloadCodec`] maps a
//! typed value to and from those bytes and sits strictly above the record
//! codec; readers and writers only see the encoded payload.
//!
//! [`FeatureCodec`] is the bundled codec for named feature sets: context
//! features (one value list per name) plus sequence features (a list of
//! value lists per name), each tagged as int64, float or bytes.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TfRecordError};

/// Converts a typed item to and from a record payload
pub trait PayloadCodec {
    type Item;

    fn encode(&self, item: &Self::Item) -> Result<Vec<u8>>;

    fn decode(&self, payload: &[u8]) -> Result<Self::Item>;
}

/// Identity codec: payloads are returned as-is
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl PayloadCodec for RawCodec {
    type Item = Bytes;

    fn encode(&self, item: &Bytes) -> Result<Vec<u8>> {
        Ok(item.to_vec())
    }

    fn decode(&self, payload: &[u8]) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(payload))
    }
}

// =============================================================================
// Feature Sets
// =============================================================================

/// Element type of a feature value list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureType {
    Int64,
    Float,
    Bytes,
}

/// A typed list of values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Feature {
    Int64(Vec<i64>),
    Float(Vec<f32>),
    Bytes(Vec<Vec<u8>>),
}

impl Feature {
    pub fn feature_type(&self) -> FeatureType {
        match self {
            Feature::Int64(_) => FeatureType::Int64,
            Feature::Float(_) => FeatureType::Float,
            Feature::Bytes(_) => FeatureType::Bytes,
        }
    }

    /// Number of values in the list
    pub fn len(&self) -> usize {
        match self {
            Feature::Int64(v) => v.len(),
            Feature::Float(v) => v.len(),
            Feature::Bytes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_int64(&self) -> Option<&[i64]> {
        match self {
            Feature::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<&[f32]> {
        match self {
            Feature::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[Vec<u8>]> {
        match self {
            Feature::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

/// Named context and sequence features for one record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// One value list per name (e.g. `length`, `label`)
    pub context: BTreeMap<String, Feature>,
    /// One list of value lists per name (e.g. per-token features)
    pub sequence: BTreeMap<String, Vec<Feature>>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a context feature, replacing any previous value under `name`
    pub fn with_context(mut self, name: impl Into<String>, feature: Feature) -> Self {
        self.context.insert(name.into(), feature);
        self
    }

    /// Add a sequence feature, replacing any previous value under `name`
    ///
    /// Every step of one sequence feature must share an element type.
    pub fn with_sequence(mut self, name: impl Into<String>, steps: Vec<Feature>) -> Self {
        self.sequence.insert(name.into(), steps);
        self
    }

    pub fn context(&self, name: &str) -> Option<&Feature> {
        self.context.get(name)
    }

    pub fn sequence(&self, name: &str) -> Option<&[Feature]> {
        self.sequence.get(name).map(|steps| steps.as_slice())
    }

    /// Check that every sequence feature uses one element type throughout
    pub fn validate(&self) -> Result<()> {
        for (name, steps) in &self.sequence {
            if let Some(first) = steps.first() {
                let expected = first.feature_type();
                if let Some(step) = steps.iter().position(|s| s.feature_type() != expected) {
                    return Err(TfRecordError::Serialization(format!(
                        "sequence feature '{}' mixes element types at step {}",
                        name, step
                    )));
                }
            }
        }
        Ok(())
    }
}

/// bincode codec for [`FeatureSet`] payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureCodec;

impl PayloadCodec for FeatureCodec {
    type Item = FeatureSet;

    fn encode(&self, item: &FeatureSet) -> Result<Vec<u8>> {
        item.validate()?;
        bincode::serialize(item).map_err(|e| TfRecordError::Serialization(e.to_string()))
    }

    fn decode(&self, payload: &[u8]) -> Result<FeatureSet> {
        let features: FeatureSet = bincode::deserialize(payload)
            .map_err(|e| TfRecordError::Serialization(e.to_string()))?;
        features.validate()?;
        Ok(features)
    }
}
