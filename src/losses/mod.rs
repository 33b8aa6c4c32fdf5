//! Loss entities managed by the registry
//!
//! A loss is either a stateless [`LossFunction`] taking `(y_true, y_pred)`
//! tensors, or a stateful object implementing [`Loss`] that can be rebuilt
//! from its configuration through [`FromConfig`].
//!
//! # Usage Examples
//!
//! ```rust
//! use lossreg::losses::{functions, CategoricalCrossentropy, Loss, Tensor};
//! use ndarray::array;
//!
//! let y_true: Tensor = array![[0.0, 1.0], [1.0, 0.0]].into_dyn();
//! let y_pred: Tensor = array![[0.1, 0.9], [0.8, 0.2]].into_dyn();
//!
//! let per_sample = functions::mean_squared_error(&y_true, &y_pred)?;
//! assert_eq!(per_sample.shape(), &[2]);
//!
//! let loss = CategoricalCrossentropy::default();
//! assert_eq!(loss.call(&y_true, &y_pred)?.len(), 2);
//! # Ok::<(), lossreg::Error>(())
//! ```

use crate::error::{Error, Result};
use crate::registry::LookupScope;
use ndarray::ArrayD;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Dense tensor type consumed by loss functions
pub type Tensor = ArrayD<f64>;

/// Keyword-style configuration of a loss class
pub type ConfigMap = serde_json::Map<String, Value>;

/// Signature shared by all stateless loss functions
pub type LossFn = fn(&Tensor, &Tensor) -> Result<Tensor>;

/// Generates a loss class whose configuration is only [`BaseConfig`]
macro_rules! simple_loss_class {
    ($(#[$meta:meta])* $class:ident, $default_name:literal, $func:path) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $class {
            config: $crate::losses::BaseConfig,
        }

        impl $class {
            /// Create the loss from its configuration
            pub fn new(config: $crate::losses::BaseConfig) -> Self {
                Self { config }
            }

            /// Loss configuration
            pub fn config(&self) -> &$crate::losses::BaseConfig {
                &self.config
            }
        }

        impl Default for $class {
            fn default() -> Self {
                Self::new($crate::losses::BaseConfig::named($default_name))
            }
        }

        impl $crate::losses::Loss for $class {
            fn class_name(&self) -> &'static str {
                <Self as $crate::losses::FromConfig>::CLASS_NAME
            }

            fn name(&self) -> &str {
                &self.config.name
            }

            fn reduction(&self) -> $crate::losses::Reduction {
                self.config.reduction
            }

            fn call(
                &self,
                y_true: &$crate::losses::Tensor,
                y_pred: &$crate::losses::Tensor,
            ) -> $crate::error::Result<$crate::losses::Tensor> {
                $func(y_true, y_pred)
            }

            fn get_config(&self) -> $crate::error::Result<$crate::losses::ConfigMap> {
                $crate::losses::config_to_map(
                    <Self as $crate::losses::FromConfig>::CLASS_NAME,
                    &self.config,
                )
            }
        }

        impl $crate::losses::FromConfig for $class {
            const CLASS_NAME: &'static str = stringify!($class);

            fn from_config(
                config: &$crate::losses::ConfigMap,
                _scope: &$crate::registry::LookupScope<'_>,
            ) -> $crate::error::Result<Self> {
                let defaults = Self::default().config;
                $crate::losses::merge_config(
                    <Self as $crate::losses::FromConfig>::CLASS_NAME,
                    &defaults,
                    config,
                )
                .map(Self::new)
            }
        }
    };
}

pub mod functions;
pub mod hinge;
pub mod probabilistic;
pub mod regression;
pub mod wrapper;

pub use hinge::{CategoricalHinge, Hinge, SquaredHinge};
pub use probabilistic::{
    BinaryCrossentropy, CategoricalCrossentropy, KLDivergence, Poisson,
    SparseCategoricalCrossentropy,
};
pub use regression::{
    CosineSimilarity, Huber, LogCosh, MeanAbsoluteError, MeanAbsolutePercentageError,
    MeanSquaredError, MeanSquaredLogarithmicError,
};
pub use wrapper::LossFunctionWrapper;

/// How per-sample loss values are combined by the training loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    /// Sum divided by the number of samples
    #[default]
    SumOverBatchSize,
    /// Plain sum
    Sum,
    /// Keep per-sample values
    None,
}

/// Configuration shared by every loss class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseConfig {
    /// Reduction applied by the consumer of the loss
    pub reduction: Reduction,
    /// Instance name
    pub name: String,
}

impl BaseConfig {
    /// Default configuration carrying the given instance name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            reduction: Reduction::default(),
            name: name.into(),
        }
    }
}

/// Base trait for stateful loss objects
///
/// The trait has no registry entry of its own, so resolving the name `"Loss"`
/// fails with [`Error::UnknownIdentifier`]. Concrete classes are registered
/// through [`FromConfig`].
pub trait Loss: Send + Sync + fmt::Debug {
    /// Name of the class, used as the registry key when deserializing
    fn class_name(&self) -> &'static str;

    /// Instance name
    fn name(&self) -> &str;

    /// Reduction the consumer should apply to [`Loss::call`] results
    fn reduction(&self) -> Reduction;

    /// Compute per-sample loss values
    fn call(&self, y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor>;

    /// Configuration accepted back by the class factory
    fn get_config(&self) -> Result<ConfigMap>;
}

/// Loss classes that can be rebuilt from a configuration mapping
pub trait FromConfig: Loss + Sized + 'static {
    /// Registry key of the class
    const CLASS_NAME: &'static str;

    /// Build an instance; `scope` resolves names nested in the configuration
    fn from_config(config: &ConfigMap, scope: &LookupScope<'_>) -> Result<Self>;
}

/// Stateless loss callable
#[derive(Clone, Copy)]
pub struct LossFunction {
    name: &'static str,
    func: LossFn,
}

impl LossFunction {
    /// Wrap a function under its canonical name
    pub const fn new(name: &'static str, func: LossFn) -> Self {
        Self { name, func }
    }

    /// Canonical name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Compute per-sample loss values
    pub fn call(&self, y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
        (self.func)(y_true, y_pred)
    }

    /// Underlying function pointer
    pub fn as_fn(&self) -> LossFn {
        self.func
    }
}

impl PartialEq for LossFunction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.func as usize == other.func as usize
    }
}

impl Eq for LossFunction {}

impl fmt::Debug for LossFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LossFunction").field(&self.name).finish()
    }
}

/// Encode a typed configuration as a configuration mapping
pub fn config_to_map<C: Serialize>(class_name: &str, config: &C) -> Result<ConfigMap> {
    match serde_json::to_value(config)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::invalid_config(
            class_name,
            format!("configuration must encode to a mapping, got {other}"),
        )),
    }
}

/// Overlay `overrides` on `defaults` and decode the result.
///
/// Keys absent from `defaults` are rejected, the way unexpected keyword
/// arguments are.
pub fn merge_config<C>(class_name: &str, defaults: &C, overrides: &ConfigMap) -> Result<C>
where
    C: Serialize + DeserializeOwned,
{
    let mut merged = config_to_map(class_name, defaults)?;
    for (key, value) in overrides {
        if !merged.contains_key(key) {
            return Err(Error::invalid_config(
                class_name,
                format!("unexpected keyword argument '{key}'"),
            ));
        }
        merged.insert(key.clone(), value.clone());
    }
    serde_json::from_value(Value::Object(merged))
        .map_err(|e| Error::invalid_config(class_name, e.to_string()))
}
