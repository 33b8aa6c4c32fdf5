//! Regression loss classes

use super::{config_to_map, functions, merge_config, ConfigMap, FromConfig, Loss, Reduction, Tensor};
use crate::error::{Error, Result};
use crate::registry::LookupScope;
use serde::{Deserialize, Serialize};

simple_loss_class!(
    /// Mean of squared errors between labels and predictions
    MeanSquaredError,
    "mean_squared_error",
    functions::mean_squared_error
);

simple_loss_class!(
    /// Mean of absolute errors between labels and predictions
    MeanAbsoluteError,
    "mean_absolute_error",
    functions::mean_absolute_error
);

simple_loss_class!(
    /// Mean absolute percentage error between labels and predictions
    MeanAbsolutePercentageError,
    "mean_absolute_percentage_error",
    functions::mean_absolute_percentage_error
);

simple_loss_class!(
    /// Mean squared logarithmic error between labels and predictions
    MeanSquaredLogarithmicError,
    "mean_squared_logarithmic_error",
    functions::mean_squared_logarithmic_error
);

simple_loss_class!(
    /// Negative cosine similarity between labels and predictions
    CosineSimilarity,
    "cosine_similarity",
    functions::cosine_similarity
);

simple_loss_class!(
    /// Logarithm of the hyperbolic cosine of the prediction error
    LogCosh,
    "log_cosh",
    functions::log_cosh
);

/// Configuration for [`Huber`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HuberConfig {
    /// Error magnitude where the loss turns from quadratic to linear
    pub delta: f64,
    /// Reduction applied by the consumer
    pub reduction: Reduction,
    /// Instance name
    pub name: String,
}

impl Default for HuberConfig {
    fn default() -> Self {
        Self {
            delta: 1.0,
            reduction: Reduction::default(),
            name: "huber_loss".to_string(),
        }
    }
}

/// Huber loss between labels and predictions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Huber {
    config: HuberConfig,
}

impl Huber {
    /// Create the loss; `delta` must be positive
    pub fn new(config: HuberConfig) -> Result<Self> {
        if config.delta.is_nan() || config.delta <= 0.0 {
            return Err(Error::invalid_config(
                Self::CLASS_NAME,
                format!("delta must be positive, got {}", config.delta),
            ));
        }
        Ok(Self { config })
    }

    /// Loss configuration
    pub fn config(&self) -> &HuberConfig {
        &self.config
    }
}

impl Loss for Huber {
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
        functions::huber_with(y_true, y_pred, self.config.delta)
    }

    fn get_config(&self) -> Result<ConfigMap> {
        config_to_map(Self::CLASS_NAME, &self.config)
    }
}

impl FromConfig for Huber {
    const CLASS_NAME: &'static str = "Huber";

    fn from_config(config: &ConfigMap, _scope: &LookupScope<'_>) -> Result<Self> {
        Self::new(merge_config(Self::CLASS_NAME, &HuberConfig::default(), config)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::registry;
    use approx::assert_relative_eq;
    use ndarray::array;
    use serde_json::json;

    #[test]
    fn test_huber_delta_from_config() {
        let scope = LookupScope::new(registry(), None);
        let config = json!({"delta": 2.0, "reduction": "sum"});
        let loss = Huber::from_config(config.as_object().unwrap(), &scope).unwrap();

        assert_relative_eq!(loss.config().delta, 2.0);
        assert_eq!(loss.reduction(), Reduction::Sum);

        let y_true = array![[0.0]].into_dyn();
        let y_pred = array![[1.5]].into_dyn();
        assert_relative_eq!(loss.call(&y_true, &y_pred).unwrap()[[0]], 1.125);
    }

    #[test]
    fn test_huber_rejects_non_positive_delta() {
        let config = HuberConfig {
            delta: 0.0,
            ..Default::default()
        };
        assert!(Huber::new(config).is_err());
    }

    #[test]
    fn test_mean_squared_error_class_matches_function() {
        let y_true = array![[1.0, 2.0], [3.0, 4.0]].into_dyn();
        let y_pred = array![[1.5, 2.0], [2.0, 5.0]].into_dyn();

        let class_values = MeanSquaredError::default().call(&y_true, &y_pred).unwrap();
        let fn_values = functions::mean_squared_error(&y_true, &y_pred).unwrap();
        assert_eq!(class_values, fn_values);
    }

    #[test]
    fn test_get_config_keys() {
        let config = MeanAbsoluteError::default().get_config().unwrap();
        let mut keys: Vec<_> = config.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["name", "reduction"]);
        assert_eq!(config["name"], json!("mean_absolute_error"));
    }
}
