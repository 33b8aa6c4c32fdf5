//! Resolution of loss identifiers
//!
//! [`get`] is the entry point most callers want: it accepts whatever a user
//! wrote (nothing, a name, a configuration mapping, or a loss object) and
//! returns something that can be called on tensors. [`serialize`] and
//! [`deserialize`] are the primitives it builds on.

use super::serialization::{
    ConfigurationMapping, FactoryEngine, SerializationEngine, SerializedLoss,
};
use super::{registry, CustomObjects, LookupScope, LossClass, LossEntity, RegistryTable};
use crate::error::{Error, Result};
use crate::losses::{ConfigMap, Loss, LossFunction, Tensor};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// What a caller passes to [`get`]
#[derive(Debug, Clone)]
pub enum Identifier {
    /// No loss configured
    None,
    /// Canonical name or alias
    Name(String),
    /// `{class_name, config}` mapping
    Config(ConfigurationMapping),
    /// Already resolved class, function or object
    Entity(LossEntity),
    /// Any other value, kept for the error message
    Value(Value),
}

impl Identifier {
    /// Identifier for a loss object
    pub fn instance(loss: impl Loss + 'static) -> Self {
        Self::Entity(LossEntity::instance(loss))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Name(name) => write!(f, "'{name}'"),
            Self::Config(mapping) => write!(f, "{}", SerializedLoss::Config(mapping.clone())),
            Self::Entity(entity) => write!(f, "<{} '{}'>", entity.kind(), entity.name()),
            Self::Value(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<ConfigurationMapping> for Identifier {
    fn from(mapping: ConfigurationMapping) -> Self {
        Self::Config(mapping)
    }
}

impl From<SerializedLoss> for Identifier {
    fn from(form: SerializedLoss) -> Self {
        match form {
            SerializedLoss::Name(name) => Self::Name(name),
            SerializedLoss::Config(mapping) => Self::Config(mapping),
        }
    }
}

impl From<LossEntity> for Identifier {
    fn from(entity: LossEntity) -> Self {
        Self::Entity(entity)
    }
}

impl From<LossClass> for Identifier {
    fn from(class: LossClass) -> Self {
        Self::Entity(class.into())
    }
}

impl From<LossFunction> for Identifier {
    fn from(function: LossFunction) -> Self {
        Self::Entity(function.into())
    }
}

impl From<Arc<dyn Loss>> for Identifier {
    fn from(instance: Arc<dyn Loss>) -> Self {
        Self::Entity(instance.into())
    }
}

impl From<LossCallable> for Identifier {
    fn from(callable: LossCallable) -> Self {
        Self::Entity(callable.into())
    }
}

impl From<Value> for Identifier {
    /// `null` → `None`, strings → names, well-formed mappings → configs
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::None,
            Value::String(name) => Self::Name(name),
            Value::Object(map) => {
                match serde_json::from_value::<ConfigurationMapping>(Value::Object(map.clone())) {
                    Ok(mapping) => Self::Config(mapping),
                    Err(_) => Self::Value(Value::Object(map)),
                }
            }
            other => Self::Value(other),
        }
    }
}

impl<T: Into<Identifier>> From<Option<T>> for Identifier {
    fn from(identifier: Option<T>) -> Self {
        identifier.map_or(Self::None, Into::into)
    }
}

/// A loss that can be called on tensors
#[derive(Debug, Clone)]
pub enum LossCallable {
    /// Stateless loss function
    Function(LossFunction),
    /// Loss object
    Instance(Arc<dyn Loss>),
}

impl LossCallable {
    /// Compute per-sample loss values
    pub fn call(&self, y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
        match self {
            Self::Function(function) => function.call(y_true, y_pred),
            Self::Instance(instance) => instance.call(y_true, y_pred),
        }
    }

    /// Function name or instance name
    pub fn name(&self) -> &str {
        match self {
            Self::Function(function) => function.name(),
            Self::Instance(instance) => instance.name(),
        }
    }

    /// The function, if this is one
    pub fn as_function(&self) -> Option<LossFunction> {
        match self {
            Self::Function(function) => Some(*function),
            Self::Instance(_) => None,
        }
    }

    /// The loss object, if this is one
    pub fn as_instance(&self) -> Option<&Arc<dyn Loss>> {
        match self {
            Self::Function(_) => None,
            Self::Instance(instance) => Some(instance),
        }
    }

    /// Identity comparison with a registry entity
    pub fn same_as(&self, entity: &LossEntity) -> bool {
        LossEntity::from(self.clone()).same_as(entity)
    }
}

impl From<LossCallable> for LossEntity {
    fn from(callable: LossCallable) -> Self {
        match callable {
            LossCallable::Function(function) => Self::Function(function),
            LossCallable::Instance(instance) => Self::Instance(instance),
        }
    }
}

/// Resolves identifiers against a registry through a serialization engine
#[derive(Debug, Clone)]
pub struct Resolver<'a, E = FactoryEngine> {
    registry: &'a RegistryTable,
    engine: E,
}

impl Default for Resolver<'static, FactoryEngine> {
    fn default() -> Self {
        Self::new(registry(), FactoryEngine)
    }
}

impl<'a, E: SerializationEngine> Resolver<'a, E> {
    /// Create a resolver over `registry`
    pub fn new(registry: &'a RegistryTable, engine: E) -> Self {
        Self { registry, engine }
    }

    /// Registry used as the lookup namespace
    pub fn registry(&self) -> &'a RegistryTable {
        self.registry
    }

    /// Encode a loss into its portable form
    pub fn serialize(&self, loss: &LossEntity) -> Result<SerializedLoss> {
        self.engine.serialize_object(loss)
    }

    /// Rebuild a loss from its portable form; `custom` names win over the registry
    pub fn deserialize(
        &self,
        form: &SerializedLoss,
        custom: Option<&CustomObjects>,
    ) -> Result<LossEntity> {
        self.engine
            .deserialize_object(form, LookupScope::new(self.registry, custom))
    }

    /// Resolve `identifier` into a callable loss.
    ///
    /// `None` yields `Ok(None)`. Names and mappings go through
    /// [`Resolver::deserialize`], which already instantiates class names.
    /// Entities pass through untouched, except class descriptors, which are
    /// instantiated with their default configuration.
    #[instrument(skip_all, fields(identifier = %identifier))]
    pub fn get(
        &self,
        identifier: Identifier,
        custom: Option<&CustomObjects>,
    ) -> Result<Option<LossCallable>> {
        let entity = match identifier {
            Identifier::None => {
                trace!("No loss configured");
                return Ok(None);
            }
            Identifier::Config(mapping) => self.deserialize(&mapping.into(), custom)?,
            Identifier::Name(name) => self.deserialize(&name.into(), custom)?,
            Identifier::Entity(entity) => entity,
            Identifier::Value(value) => return Err(Error::invalid_identifier(value)),
        };

        let callable = match entity {
            LossEntity::Function(function) => LossCallable::Function(function),
            LossEntity::Instance(instance) => LossCallable::Instance(instance),
            LossEntity::Class(class) => {
                let scope = LookupScope::new(self.registry, custom);
                LossCallable::Instance(class.instantiate(&ConfigMap::new(), &scope)?)
            }
        };
        debug!(name = callable.name(), "Resolved loss");
        Ok(Some(callable))
    }
}

/// Encode a loss function, class or object into its portable form
pub fn serialize(loss: impl Into<LossEntity>) -> Result<SerializedLoss> {
    Resolver::default().serialize(&loss.into())
}

/// Rebuild a loss from a name or configuration mapping
pub fn deserialize(form: impl Into<SerializedLoss>) -> Result<LossEntity> {
    Resolver::default().deserialize(&form.into(), None)
}

/// [`deserialize`] with caller-supplied names taking precedence
pub fn deserialize_with(
    form: impl Into<SerializedLoss>,
    custom: &CustomObjects,
) -> Result<LossEntity> {
    Resolver::default().deserialize(&form.into(), Some(custom))
}

/// Resolve any identifier into a callable loss, or `None` when none is configured
pub fn get(identifier: impl Into<Identifier>) -> Result<Option<LossCallable>> {
    Resolver::default().get(identifier.into(), None)
}

/// [`get`] with caller-supplied names taking precedence
pub fn get_with(
    identifier: impl Into<Identifier>,
    custom: &CustomObjects,
) -> Result<Option<LossCallable>> {
    Resolver::default().get(identifier.into(), Some(custom))
}
