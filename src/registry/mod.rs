//! Registry of built-in loss entities and name resolution
//!
//! The registry maps canonical names (and a handful of short aliases) to loss
//! classes and loss functions. It is built once, on first use, and is
//! read-only afterwards.
//!
//! # Key Components
//!
//! - **RegistryTable**: the process-wide name → entity mapping
//! - **LookupScope**: registry plus optional per-call custom objects
//! - **SerializationEngine**: structural encode/decode of loss entities
//! - **Resolver**: `serialize`, `deserialize` and `get` on top of the engine
//!
//! # Usage Examples
//!
//! ```rust
//! use lossreg::registry::{self, Identifier};
//! use serde_json::json;
//!
//! let mae = registry::get("mae")?.expect("a loss");
//! assert_eq!(mae.name(), "mean_absolute_error");
//!
//! let identifier = Identifier::from(json!({
//!     "class_name": "CategoricalCrossentropy",
//!     "config": {"from_logits": true},
//! }));
//! let loss = registry::get(identifier)?.expect("a loss");
//! assert_eq!(loss.name(), "categorical_crossentropy");
//!
//! assert!(registry::get(Identifier::None)?.is_none());
//! # Ok::<(), lossreg::Error>(())
//! ```

pub mod resolver;
pub mod serialization;

use crate::error::{Error, Result};
use crate::losses::{self, functions, ConfigMap, FromConfig, Loss, LossFunction};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub use resolver::{
    deserialize, deserialize_with, get, get_with, serialize, Identifier, LossCallable, Resolver,
};
pub use serialization::{ConfigurationMapping, FactoryEngine, SerializationEngine, SerializedLoss};

/// Caller-supplied names consulted before the registry
pub type CustomObjects = HashMap<String, LossEntity>;

/// Factory building a loss instance from its configuration
pub type LossFactory = fn(&ConfigMap, &LookupScope<'_>) -> Result<Arc<dyn Loss>>;

/// Short names layered on top of the canonical entries
const ALIASES: [(&str, &str); 4] = [
    ("mae", "mean_absolute_error"),
    ("MAE", "mean_absolute_error"),
    ("mse", "mean_squared_error"),
    ("MSE", "mean_squared_error"),
];

static REGISTRY: Lazy<RegistryTable> = Lazy::new(RegistryTable::builtin);

/// Process-wide table of built-in losses
pub fn registry() -> &'static RegistryTable {
    &REGISTRY
}

fn build_instance<T: FromConfig>(
    config: &ConfigMap,
    scope: &LookupScope<'_>,
) -> Result<Arc<dyn Loss>> {
    Ok(Arc::new(T::from_config(config, scope)?))
}

/// Descriptor of an instantiable loss class
#[derive(Clone, Copy)]
pub struct LossClass {
    name: &'static str,
    factory: LossFactory,
}

impl LossClass {
    /// Descriptor for a class with a hand-written factory
    pub const fn new(name: &'static str, factory: LossFactory) -> Self {
        Self { name, factory }
    }

    /// Descriptor for a type implementing [`FromConfig`]
    pub fn of<T: FromConfig>() -> Self {
        Self::new(T::CLASS_NAME, build_instance::<T>)
    }

    /// Class name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Build an instance from `config`
    pub fn instantiate(
        &self,
        config: &ConfigMap,
        scope: &LookupScope<'_>,
    ) -> Result<Arc<dyn Loss>> {
        (self.factory)(config, scope)
    }
}

impl PartialEq for LossClass {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.factory as usize == other.factory as usize
    }
}

impl Eq for LossClass {}

impl fmt::Debug for LossClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LossClass").field(&self.name).finish()
    }
}

/// Anything the registry can hand out for a name
#[derive(Debug, Clone)]
pub enum LossEntity {
    /// Class descriptor, instantiated from a configuration mapping
    Class(LossClass),
    /// Stateless loss function
    Function(LossFunction),
    /// Constructed loss object
    Instance(Arc<dyn Loss>),
}

impl LossEntity {
    /// Wrap a loss object
    pub fn instance(loss: impl Loss + 'static) -> Self {
        Self::Instance(Arc::new(loss))
    }

    /// Canonical name of a class or function, instance name otherwise
    pub fn name(&self) -> &str {
        match self {
            Self::Class(class) => class.name(),
            Self::Function(function) => function.name(),
            Self::Instance(instance) => instance.name(),
        }
    }

    /// Short description of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Class(_) => "class",
            Self::Function(_) => "function",
            Self::Instance(_) => "instance",
        }
    }

    /// Whether the entity can be called on tensors as it is
    pub fn is_callable(&self) -> bool {
        !matches!(self, Self::Class(_))
    }

    /// Identity comparison: same class, same function, or same object
    pub fn same_as(&self, other: &LossEntity) -> bool {
        match (self, other) {
            (Self::Class(a), Self::Class(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => a == b,
            (Self::Instance(a), Self::Instance(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<LossClass> for LossEntity {
    fn from(class: LossClass) -> Self {
        Self::Class(class)
    }
}

impl From<LossFunction> for LossEntity {
    fn from(function: LossFunction) -> Self {
        Self::Function(function)
    }
}

impl From<Arc<dyn Loss>> for LossEntity {
    fn from(instance: Arc<dyn Loss>) -> Self {
        Self::Instance(instance)
    }
}

/// Name → entity mapping of the built-in losses
#[derive(Debug, Default)]
pub struct RegistryTable {
    entries: HashMap<String, LossEntity>,
    aliases: BTreeMap<String, String>,
}

impl RegistryTable {
    /// Build the table of built-in classes and functions plus their aliases
    pub fn builtin() -> Self {
        let classes = [
            LossClass::of::<losses::LossFunctionWrapper>(),
            // Probabilistic
            LossClass::of::<losses::KLDivergence>(),
            LossClass::of::<losses::Poisson>(),
            LossClass::of::<losses::BinaryCrossentropy>(),
            LossClass::of::<losses::CategoricalCrossentropy>(),
            LossClass::of::<losses::SparseCategoricalCrossentropy>(),
            // Regression
            LossClass::of::<losses::MeanSquaredError>(),
            LossClass::of::<losses::MeanAbsoluteError>(),
            LossClass::of::<losses::MeanAbsolutePercentageError>(),
            LossClass::of::<losses::MeanSquaredLogarithmicError>(),
            LossClass::of::<losses::CosineSimilarity>(),
            LossClass::of::<losses::LogCosh>(),
            LossClass::of::<losses::Huber>(),
            // Hinge
            LossClass::of::<losses::Hinge>(),
            LossClass::of::<losses::SquaredHinge>(),
            LossClass::of::<losses::CategoricalHinge>(),
        ];

        let builtin_functions = [
            // Probabilistic
            LossFunction::new("kl_divergence", functions::kl_divergence),
            LossFunction::new("poisson", functions::poisson),
            LossFunction::new("binary_crossentropy", functions::binary_crossentropy),
            LossFunction::new("categorical_crossentropy", functions::categorical_crossentropy),
            LossFunction::new(
                "sparse_categorical_crossentropy",
                functions::sparse_categorical_crossentropy,
            ),
            // Regression
            LossFunction::new("mean_squared_error", functions::mean_squared_error),
            LossFunction::new("mean_absolute_error", functions::mean_absolute_error),
            LossFunction::new(
                "mean_absolute_percentage_error",
                functions::mean_absolute_percentage_error,
            ),
            LossFunction::new(
                "mean_squared_logarithmic_error",
                functions::mean_squared_logarithmic_error,
            ),
            LossFunction::new("cosine_similarity", functions::cosine_similarity),
            LossFunction::new("log_cosh", functions::log_cosh),
            LossFunction::new("huber", functions::huber),
            // Hinge
            LossFunction::new("hinge", functions::hinge),
            LossFunction::new("squared_hinge", functions::squared_hinge),
            LossFunction::new("categorical_hinge", functions::categorical_hinge),
        ];

        let mut table = Self::default();
        for class in classes {
            table.insert(class.into());
        }
        for function in builtin_functions {
            table.insert(function.into());
        }
        for (alias, target) in ALIASES {
            table.insert_alias(alias, target);
        }

        debug!(
            entries = table.len(),
            aliases = table.aliases.len(),
            "Built loss registry"
        );
        table
    }

    fn insert(&mut self, entity: LossEntity) {
        let name = entity.name().to_string();
        let previous = self.entries.insert(name, entity);
        debug_assert!(previous.is_none(), "duplicate canonical loss name");
    }

    fn insert_alias(&mut self, alias: &str, target: &str) {
        debug_assert!(!self.entries.contains_key(alias), "alias shadows an entry: {alias}");
        if let Some(entity) = self.entries.get(target).cloned() {
            self.entries.insert(alias.to_string(), entity);
            self.aliases.insert(alias.to_string(), target.to_string());
        }
    }

    /// Entity registered under `name`, if any
    pub fn get(&self, name: &str) -> Option<&LossEntity> {
        self.entries.get(name)
    }

    /// Entity registered under `name`
    pub fn lookup(&self, name: &str) -> Result<&LossEntity> {
        self.get(name).ok_or_else(|| Error::unknown_identifier(name))
    }

    /// Whether `name` is a canonical name or an alias
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All keys, aliases included, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Canonical names only, sorted
    pub fn canonical_names(&self) -> Vec<&str> {
        self.names()
            .into_iter()
            .filter(|name| !self.aliases.contains_key(*name))
            .collect()
    }

    /// Alias → canonical name pairs
    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    /// Number of keys, aliases included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Names visible to one resolution call: custom objects first, then the registry
#[derive(Debug, Clone, Copy)]
pub struct LookupScope<'a> {
    registry: &'a RegistryTable,
    custom: Option<&'a CustomObjects>,
}

impl<'a> LookupScope<'a> {
    /// Create a scope over `registry` with optional overrides
    pub fn new(registry: &'a RegistryTable, custom: Option<&'a CustomObjects>) -> Self {
        Self { registry, custom }
    }

    /// Entity for `name`, custom objects taking precedence
    pub fn get(&self, name: &str) -> Option<&'a LossEntity> {
        self.custom
            .and_then(|custom| custom.get(name))
            .or_else(|| self.registry.get(name))
    }

    /// Entity for `name`, or an unknown identifier error
    pub fn lookup(&self, name: &str) -> Result<&'a LossEntity> {
        self.get(name).ok_or_else(|| Error::unknown_identifier(name))
    }

    /// Underlying registry
    pub fn registry(&self) -> &'a RegistryTable {
        self.registry
    }
}
