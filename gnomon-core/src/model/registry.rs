use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::model::ModelSet;
use crate::types::GnomonError;

/// A parameter set valid for windows with GC content in `[gc_min, gc_max]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcBucket {
    pub gc_min: f64,
    pub gc_max: f64,
    pub model: ModelSet,
}

/// Parameter sets keyed by GC content.
///
/// Buckets are searched in order; the first one whose range contains the
/// window's GC content wins.
///
/// # Examples
///
/// ```rust
/// use gnomon_core::model::{ModelRegistry, ModelSet};
///
/// let registry = ModelRegistry::single(ModelSet::uniform());
/// assert!(registry.for_gc(0.42).is_ok());
/// assert!(registry.for_gc(1.5).is_err());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelRegistry {
    pub buckets: Vec<GcBucket>,
}

impl ModelRegistry {
    /// One parameter set covering every GC content
    #[must_use]
    pub fn single(model: ModelSet) -> Self {
        Self {
            buckets: vec![GcBucket {
                gc_min: 0.0,
                gc_max: 1.0,
                model,
            }],
        }
    }

    pub fn for_gc(&self, gc: f64) -> Result<&ModelSet, GnomonError> {
        self.buckets
            .iter()
            .find(|bucket| bucket.gc_min <= gc && gc <= bucket.gc_max)
            .map(|bucket| &bucket.model)
            .ok_or(GnomonError::MissingModel(gc))
    }

    /// Parse either a registry (`{"buckets": [...]}`) or a bare parameter set
    pub fn from_json(json: &str) -> Result<Self, GnomonError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if value.get("buckets").is_some() {
            let registry: Self = serde_json::from_value(value)?;
            if registry.buckets.is_empty() {
                return Err(GnomonError::InvalidModel(
                    "model registry has no buckets".to_string(),
                ));
            }
            debug!("Loaded {} GC buckets", registry.buckets.len());
            Ok(registry)
        } else {
            Ok(Self::single(serde_json::from_value(value)?))
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, GnomonError> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_buckets() -> ModelRegistry {
        ModelRegistry {
            buckets: vec![
                GcBucket {
                    gc_min: 0.0,
                    gc_max: 0.45,
                    model: ModelSet::uniform(),
                },
                GcBucket {
                    gc_min: 0.45,
                    gc_max: 1.0,
                    model: ModelSet::uniform(),
                },
            ],
        }
    }

    #[test]
    fn test_first_matching_bucket() {
        let registry = two_buckets();
        let low = registry.for_gc(0.3).unwrap() as *const ModelSet;
        let edge = registry.for_gc(0.45).unwrap() as *const ModelSet;
        let high = registry.for_gc(0.7).unwrap() as *const ModelSet;
        assert_eq!(low, edge);
        assert_ne!(low, high);
    }

    #[test]
    fn test_missing_bucket() {
        let registry = ModelRegistry {
            buckets: two_buckets().buckets.into_iter().take(1).collect(),
        };
        assert!(matches!(
            registry.for_gc(0.6),
            Err(GnomonError::MissingModel(gc)) if gc == 0.6
        ));
    }

    #[test]
    fn test_from_json_accepts_both_layouts() {
        let registry = two_buckets();
        let json = serde_json::to_string(&registry).unwrap();
        assert_eq!(ModelRegistry::from_json(&json).unwrap().buckets.len(), 2);

        let single = ModelSet::uniform().to_json().unwrap();
        let loaded = ModelRegistry::from_json(&single).unwrap();
        assert_eq!(loaded.buckets.len(), 1);
        assert_eq!(loaded.buckets[0].gc_max, 1.0);

        assert!(matches!(
            ModelRegistry::from_json(r#"{"buckets": []}"#),
            Err(GnomonError::InvalidModel(_))
        ));
        assert!(ModelRegistry::from_json("{}").is_err());
    }
}
