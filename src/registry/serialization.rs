//! Structural encoding of loss entities
//!
//! Stateless functions and class descriptors encode to their bare name,
//! loss objects to a [`ConfigurationMapping`]. Decoding looks names up in a
//! [`LookupScope`] and rebuilds objects through the registered class factory.

use super::{LookupScope, LossEntity};
use crate::error::{Error, Result};
use crate::losses::ConfigMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// Serialized form of a stateful loss: `{class_name, config}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationMapping {
    /// Registry key of the class
    pub class_name: String,
    /// Constructor arguments by name
    #[serde(default)]
    pub config: ConfigMap,
}

impl ConfigurationMapping {
    /// Create a mapping for `class_name`
    pub fn new(class_name: impl Into<String>, config: ConfigMap) -> Self {
        Self {
            class_name: class_name.into(),
            config,
        }
    }
}

/// Output of `serialize`, input of `deserialize`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SerializedLoss {
    /// Bare name of a function or class
    Name(String),
    /// Configuration of a loss object
    Config(ConfigurationMapping),
}

impl SerializedLoss {
    /// Name to look up: the bare name or the mapping's class name
    pub fn lookup_name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Config(mapping) => &mapping.class_name,
        }
    }
}

impl fmt::Display for SerializedLoss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => f.write_str(self.lookup_name()),
        }
    }
}

impl From<&str> for SerializedLoss {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for SerializedLoss {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<ConfigurationMapping> for SerializedLoss {
    fn from(mapping: ConfigurationMapping) -> Self {
        Self::Config(mapping)
    }
}

/// Encode and decode loss entities
pub trait SerializationEngine {
    /// Encode `entity` into its portable form
    fn serialize_object(&self, entity: &LossEntity) -> Result<SerializedLoss>;

    /// Rebuild an entity, resolving names through `scope`
    fn deserialize_object(
        &self,
        form: &SerializedLoss,
        scope: LookupScope<'_>,
    ) -> Result<LossEntity>;
}

/// Engine backed by the factories registered for each class name
#[derive(Debug, Clone, Copy, Default)]
pub struct FactoryEngine;

impl SerializationEngine for FactoryEngine {
    fn serialize_object(&self, entity: &LossEntity) -> Result<SerializedLoss> {
        Ok(match entity {
            LossEntity::Class(class) => SerializedLoss::Name(class.name().to_string()),
            LossEntity::Function(function) => SerializedLoss::Name(function.name().to_string()),
            LossEntity::Instance(instance) => SerializedLoss::Config(ConfigurationMapping::new(
                instance.class_name(),
                instance.get_config()?,
            )),
        })
    }

    fn deserialize_object(
        &self,
        form: &SerializedLoss,
        scope: LookupScope<'_>,
    ) -> Result<LossEntity> {
        match form {
            SerializedLoss::Name(name) => match scope.lookup(name)? {
                LossEntity::Class(class) => {
                    trace!(%name, "Instantiating loss class with defaults");
                    class
                        .instantiate(&ConfigMap::new(), &scope)
                        .map(LossEntity::Instance)
                }
                entity => {
                    trace!(%name, kind = entity.kind(), "Found loss by name");
                    Ok(entity.clone())
                }
            },
            SerializedLoss::Config(mapping) => match scope.lookup(&mapping.class_name)? {
                LossEntity::Class(class) => {
                    trace!(class_name = %mapping.class_name, "Instantiating loss class");
                    class
                        .instantiate(&mapping.config, &scope)
                        .map(LossEntity::Instance)
                }
                other => Err(Error::invalid_config(
                    &mapping.class_name,
                    format!("expected a loss class, found a {}", other.kind()),
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::losses::{CategoricalCrossentropy, LossFunction, MeanSquaredError, Tensor};
    use crate::registry::{registry, CustomObjects, LossClass};
    use serde_json::json;

    #[test]
    fn test_serialized_forms_in_json() {
        let name: SerializedLoss = serde_json::from_value(json!("mse")).unwrap();
        assert_eq!(name, SerializedLoss::from("mse"));

        let mapping: SerializedLoss =
            serde_json::from_value(json!({"class_name": "Hinge"})).unwrap();
        assert_eq!(
            mapping,
            SerializedLoss::Config(ConfigurationMapping::new("Hinge", ConfigMap::new()))
        );
        assert_eq!(mapping.to_string(), r#"{"class_name":"Hinge","config":{}}"#);
    }

    #[test]
    fn test_serialize_instance() {
        let entity = LossEntity::instance(MeanSquaredError::default());
        let form = FactoryEngine.serialize_object(&entity).unwrap();

        match form {
            SerializedLoss::Config(mapping) => {
                assert_eq!(mapping.class_name, "MeanSquaredError");
                assert_eq!(mapping.config["name"], json!("mean_squared_error"));
                assert_eq!(mapping.config["reduction"], json!("sum_over_batch_size"));
            }
            other => panic!("expected a configuration mapping, got {other:?}"),
        }
    }

    #[test]
    fn test_serialize_class_and_function_to_names() {
        let class = LossEntity::Class(LossClass::of::<CategoricalCrossentropy>());
        assert_eq!(
            FactoryEngine.serialize_object(&class).unwrap(),
            SerializedLoss::from("CategoricalCrossentropy")
        );

        let function = registry().lookup("MAE").unwrap();
        assert_eq!(
            FactoryEngine.serialize_object(function).unwrap(),
            SerializedLoss::from("mean_absolute_error")
        );
    }

    #[test]
    fn test_class_name_deserializes_to_default_instance() {
        let scope = LookupScope::new(registry(), None);
        let entity = FactoryEngine
            .deserialize_object(&SerializedLoss::from("CategoricalCrossentropy"), scope)
            .unwrap();
        let LossEntity::Instance(instance) = entity else {
            panic!("expected an instance");
        };
        assert_eq!(instance.class_name(), "CategoricalCrossentropy");
        assert_eq!(instance.name(), "categorical_crossentropy");
    }

    #[test]
    fn test_config_naming_a_function_is_rejected() {
        let scope = LookupScope::new(registry(), None);
        let form = SerializedLoss::Config(ConfigurationMapping::new("hinge", ConfigMap::new()));
        let err = FactoryEngine.deserialize_object(&form, scope).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_custom_objects_shadow_registry() {
        fn zero(y_true: &Tensor, _: &Tensor) -> Result<Tensor> {
            Ok(Tensor::zeros(&y_true.shape()[..1]))
        }
        let shadow = LossFunction::new("mean_squared_error", zero);
        let mut custom = CustomObjects::new();
        custom.insert("mean_squared_error".to_string(), shadow.into());

        let scope = LookupScope::new(registry(), Some(&custom));
        let entity = FactoryEngine
            .deserialize_object(&SerializedLoss::from("mean_squared_error"), scope)
            .unwrap();
        assert!(entity.same_as(&LossEntity::Function(shadow)));
    }

    #[test]
    fn test_instantiated_config_is_applied() {
        let scope = LookupScope::new(registry(), None);
        let form = SerializedLoss::Config(ConfigurationMapping::new(
            "CategoricalCrossentropy",
            json!({"label_smoothing": 0.1}).as_object().unwrap().clone(),
        ));
        let entity = FactoryEngine.deserialize_object(&form, scope).unwrap();
        let LossEntity::Instance(instance) = entity else {
            panic!("expected an instance");
        };
        assert_eq!(instance.class_name(), "CategoricalCrossentropy");
        assert_eq!(instance.get_config().unwrap()["label_smoothing"], json!(0.1));
    }
}
