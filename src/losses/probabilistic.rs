//! Probabilistic loss classes

use super::{config_to_map, functions, merge_config, ConfigMap, FromConfig, Loss, Reduction, Tensor};
use crate::error::{Error, Result};
use crate::registry::LookupScope;
use serde::{Deserialize, Serialize};

simple_loss_class!(
    /// Kullback-Leibler divergence between `y_true` and `y_pred`
    KLDivergence,
    "kl_divergence",
    functions::kl_divergence
);

simple_loss_class!(
    /// Poisson loss between `y_true` and `y_pred`
    Poisson,
    "poisson",
    functions::poisson
);

fn check_label_smoothing(class_name: &str, label_smoothing: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&label_smoothing) {
        return Err(Error::invalid_config(
            class_name,
            format!("label_smoothing must be in [0, 1], got {label_smoothing}"),
        ));
    }
    Ok(())
}

/// Configuration for [`BinaryCrossentropy`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryCrossentropyConfig {
    /// Whether `y_pred` holds logits instead of probabilities
    pub from_logits: bool,
    /// Squeeze labels towards 0.5 by this amount
    pub label_smoothing: f64,
    /// Reduction applied by the consumer
    pub reduction: Reduction,
    /// Instance name
    pub name: String,
}

impl Default for BinaryCrossentropyConfig {
    fn default() -> Self {
        Self {
            from_logits: false,
            label_smoothing: 0.0,
            reduction: Reduction::default(),
            name: "binary_crossentropy".to_string(),
        }
    }
}

/// Crossentropy between binary labels and predictions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BinaryCrossentropy {
    config: BinaryCrossentropyConfig,
}

impl BinaryCrossentropy {
    /// Create the loss, validating the smoothing factor
    pub fn new(config: BinaryCrossentropyConfig) -> Result<Self> {
        check_label_smoothing(Self::CLASS_NAME, config.label_smoothing)?;
        Ok(Self { config })
    }

    /// Loss configuration
    pub fn config(&self) -> &BinaryCrossentropyConfig {
        &self.config
    }
}

impl Loss for BinaryCrossentropy {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn reduction(&self) -> Reduction {
        self.config.reduction
    }

    fn call(&self, y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
        functions::binary_crossentropy_with(
            y_true,
            y_pred,
            self.config.from_logits,
            self.config.label_smoothing,
        )
    }

    fn get_config(&self) -> Result<ConfigMap> {
        config_to_map(Self::CLASS_NAME, &self.config)
    }
}

impl FromConfig for BinaryCrossentropy {
    const CLASS_NAME: &'static str = "BinaryCrossentropy";

    fn from_config(config: &ConfigMap, _scope: &LookupScope<'_>) -> Result<Self> {
        Self::new(merge_config(Self::CLASS_NAME, &BinaryCrossentropyConfig::default(), config)?)
    }
}

/// Configuration for [`CategoricalCrossentropy`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalCrossentropyConfig {
    /// Whether `y_pred` holds logits instead of probabilities
    pub from_logits: bool,
    /// Spread this much probability mass uniformly over the classes
    pub label_smoothing: f64,
    /// Reduction applied by the consumer
    pub reduction: Reduction,
    /// Instance name
    pub name: String,
}

impl Default for CategoricalCrossentropyConfig {
    fn default() -> Self {
        Self {
            from_logits: false,
            label_smoothing: 0.0,
            reduction: Reduction::default(),
            name: "categorical_crossentropy".to_string(),
        }
    }
}

/// Crossentropy between one-hot labels and per-class predictions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CategoricalCrossentropy {
    config: CategoricalCrossentropyConfig,
}

impl CategoricalCrossentropy {
    /// Create the loss, validating the smoothing factor
    pub fn new(config: CategoricalCrossentropyConfig) -> Result<Self> {
        check_label_smoothing(Self::CLASS_NAME, config.label_smoothing)?;
        Ok(Self { config })
    }

    /// Loss configuration
    pub fn config(&self) -> &CategoricalCrossentropyConfig {
        &self.config
    }
}

impl Loss for CategoricalCrossentropy {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn reduction(&self) -> Reduction {
        self.config.reduction
    }

    fn call(&self, y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
        functions::categorical_crossentropy_with(
            y_true,
            y_pred,
            self.config.from_logits,
            self.config.label_smoothing,
        )
    }

    fn get_config(&self) -> Result<ConfigMap> {
        config_to_map(Self::CLASS_NAME, &self.config)
    }
}

impl FromConfig for CategoricalCrossentropy {
    const CLASS_NAME: &'static str = "CategoricalCrossentropy";

    fn from_config(config: &ConfigMap, _scope: &LookupScope<'_>) -> Result<Self> {
        Self::new(merge_config(
            Self::CLASS_NAME,
            &CategoricalCrossentropyConfig::default(),
            config,
        )?)
    }
}

/// Configuration for [`SparseCategoricalCrossentropy`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseCategoricalCrossentropyConfig {
    /// Whether `y_pred` holds logits instead of probabilities
    pub from_logits: bool,
    /// Reduction applied by the consumer
    pub reduction: Reduction,
    /// Instance name
    pub name: String,
}

impl Default for SparseCategoricalCrossentropyConfig {
    fn default() -> Self {
        Self {
            from_logits: false,
            reduction: Reduction::default(),
            name: "sparse_categorical_crossentropy".to_string(),
        }
    }
}

/// Crossentropy between integer labels and per-class predictions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseCategoricalCrossentropy {
    config: SparseCategoricalCrossentropyConfig,
}

impl SparseCategoricalCrossentropy {
    /// Create the loss from its configuration
    pub fn new(config: SparseCategoricalCrossentropyConfig) -> Self {
        Self { config }
    }

    /// Loss configuration
    pub fn config(&self) -> &SparseCategoricalCrossentropyConfig {
        &self.config
    }
}

impl Loss for SparseCategoricalCrossentropy {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn reduction(&self) -> Reduction {
        self.config.reduction
    }

    fn call(&self, y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
        functions::sparse_categorical_crossentropy_with(y_true, y_pred, self.config.from_logits)
    }

    fn get_config(&self) -> Result<ConfigMap> {
        config_to_map(Self::CLASS_NAME, &self.config)
    }
}

impl FromConfig for SparseCategoricalCrossentropy {
    const CLASS_NAME: &'static str = "SparseCategoricalCrossentropy";

    fn from_config(config: &ConfigMap, _scope: &LookupScope<'_>) -> Result<Self> {
        merge_config(
            Self::CLASS_NAME,
            &SparseCategoricalCrossentropyConfig::default(),
            config,
        )
        .map(Self::new)
    }
}
