//! Loss class wrapping a stateless loss function

use super::{
    config_to_map, merge_config, ConfigMap, FromConfig, Loss, LossFunction, Reduction, Tensor,
};
use crate::error::{Error, Result};
use crate::registry::{LookupScope, LossEntity};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Configuration for [`LossFunctionWrapper`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossFunctionWrapperConfig {
    /// Name of the wrapped function, resolved through the lookup scope
    #[serde(rename = "fn")]
    pub function: String,
    /// Reduction applied by the consumer
    pub reduction: Reduction,
    /// Instance name
    pub name: String,
}

/// Gives a stateless loss function a name and a reduction
#[derive(Debug, Clone, PartialEq)]
pub struct LossFunctionWrapper {
    function: LossFunction,
    config: LossFunctionWrapperConfig,
}

impl LossFunctionWrapper {
    /// Wrap `function`, naming the instance after it
    pub fn new(function: LossFunction) -> Self {
        Self::with_reduction(function, Reduction::default())
    }

    /// Wrap `function` with an explicit reduction
    pub fn with_reduction(function: LossFunction, reduction: Reduction) -> Self {
        Self {
            function,
            config: LossFunctionWrapperConfig {
                function: function.name().to_string(),
                reduction,
                name: function.name().to_string(),
            },
        }
    }

    /// Wrapped function
    pub fn function(&self) -> LossFunction {
        self.function
    }

    /// Loss configuration
    pub fn config(&self) -> &LossFunctionWrapperConfig {
        &self.config
    }
}

impl Loss for LossFunctionWrapper {
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
        self.function.call(y_true, y_pred)
    }

    fn get_config(&self) -> Result<ConfigMap> {
        config_to_map(Self::CLASS_NAME, &self.config)
    }
}

impl FromConfig for LossFunctionWrapper {
    const CLASS_NAME: &'static str = "LossFunctionWrapper";

    fn from_config(config: &ConfigMap, scope: &LookupScope<'_>) -> Result<Self> {
        let function_name = config
            .get("fn")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::invalid_config(Self::CLASS_NAME, "missing string key 'fn'"))?;

        let function = match scope.lookup(function_name)? {
            LossEntity::Function(function) => *function,
            other => {
                return Err(Error::invalid_config(
                    Self::CLASS_NAME,
                    format!(
                        "'fn' must name a loss function, '{function_name}' is a {}",
                        other.kind()
                    ),
                ))
            }
        };

        let defaults = Self::new(function).config;
        let mut config = merge_config(Self::CLASS_NAME, &defaults, config)?;
        // aliases resolve to the canonical function name
        config.function = function.name().to_string();
        Ok(Self { function, config })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::losses::functions;
    use crate::registry::{registry, CustomObjects};
    use serde_json::json;

    #[test]
    fn test_wrapper_resolves_alias() {
        let scope = LookupScope::new(registry(), None);
        let config = json!({"fn": "mse", "reduction": "sum"});
        let loss = LossFunctionWrapper::from_config(config.as_object().unwrap(), &scope).unwrap();

        assert_eq!(loss.function().name(), "mean_squared_error");
        assert_eq!(loss.config().function, "mean_squared_error");
        assert_eq!(loss.name(), "mean_squared_error");
        assert_eq!(loss.reduction(), Reduction::Sum);
    }

    #[test]
    fn test_wrapper_uses_custom_functions_first() {
        let custom_fn = LossFunction::new("my_error", functions::mean_absolute_error);
        let mut custom = CustomObjects::new();
        custom.insert("my_error".to_string(), LossEntity::Function(custom_fn));
        let scope = LookupScope::new(registry(), Some(&custom));

        let config = json!({"fn": "my_error"});
        let loss = LossFunctionWrapper::from_config(config.as_object().unwrap(), &scope).unwrap();
        assert_eq!(loss.function(), custom_fn);
    }

    #[test]
    fn test_wrapper_rejects_class_names() {
        let scope = LookupScope::new(registry(), None);
        let config = json!({"fn": "MeanSquaredError"});
        let err =
            LossFunctionWrapper::from_config(config.as_object().unwrap(), &scope).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_wrapper_requires_fn() {
        let scope = LookupScope::new(registry(), None);
        let err = LossFunctionWrapper::from_config(&ConfigMap::new(), &scope).unwrap_err();
        assert!(err.to_string().contains("'fn'"));
    }

    #[test]
    fn test_wrapper_unknown_function() {
        let scope = LookupScope::new(registry(), None);
        let config = json!({"fn": "no_such_function"});
        let err =
            LossFunctionWrapper::from_config(config.as_object().unwrap(), &scope).unwrap_err();
        assert!(err.is_unknown_identifier());
    }
}
