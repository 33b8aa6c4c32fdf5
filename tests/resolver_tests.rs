//! Integration tests for loss resolution and serialization

use lossreg::losses::{
    BinaryCrossentropy, CategoricalCrossentropy, CategoricalHinge, CosineSimilarity, Hinge, Huber,
    KLDivergence, LogCosh, MeanAbsoluteError, MeanAbsolutePercentageError, MeanSquaredError,
    MeanSquaredLogarithmicError, Poisson, SparseCategoricalCrossentropy, SquaredHinge,
};
use lossreg::registry::LookupScope;
use lossreg::{
    deserialize, deserialize_with, get, get_with, registry, serialize, ConfigMap,
    ConfigurationMapping, CustomObjects, Error, FromConfig, Identifier, Loss, LossClass,
    LossEntity, LossFunction, Reduction, Result, SerializedLoss, Tensor,
};
use ndarray::array;
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

fn defaults() -> Vec<Arc<dyn Loss>> {
    vec![
        Arc::new(KLDivergence::default()),
        Arc::new(Poisson::default()),
        Arc::new(BinaryCrossentropy::default()),
        Arc::new(CategoricalCrossentropy::default()),
        Arc::new(SparseCategoricalCrossentropy::default()),
        Arc::new(MeanSquaredError::default()),
        Arc::new(MeanAbsoluteError::default()),
        Arc::new(MeanAbsolutePercentageError::default()),
        Arc::new(MeanSquaredLogarithmicError::default()),
        Arc::new(CosineSimilarity::default()),
        Arc::new(LogCosh::default()),
        Arc::new(Huber::default()),
        Arc::new(Hinge::default()),
        Arc::new(SquaredHinge::default()),
        Arc::new(CategoricalHinge::default()),
    ]
}

#[test]
fn test_default_instances_round_trip() -> Result<()> {
    for loss in defaults() {
        let serialized = serialize(loss.clone())?;
        let rebuilt = match deserialize(serialized)? {
            LossEntity::Instance(instance) => instance,
            other => panic!("{} rebuilt as a {}", loss.class_name(), other.kind()),
        };

        assert_eq!(rebuilt.class_name(), loss.class_name());
        assert_eq!(rebuilt.get_config()?, loss.get_config()?);
    }
    Ok(())
}

#[test]
fn test_function_wrapper_round_trip() -> Result<()> {
    let form = SerializedLoss::from(ConfigurationMapping::new(
        "LossFunctionWrapper",
        json!({"fn": "mse", "reduction": "sum", "name": "wrapped"})
            .as_object()
            .unwrap()
            .clone(),
    ));
    let wrapped = match deserialize(form)? {
        LossEntity::Instance(instance) => instance,
        other => panic!("wrapper rebuilt as a {}", other.kind()),
    };
    let config = wrapped.get_config()?;
    assert_eq!(config["fn"], json!("mean_squared_error"));

    let rebuilt = match deserialize(serialize(wrapped.clone())?)? {
        LossEntity::Instance(instance) => instance,
        other => panic!("wrapper rebuilt as a {}", other.kind()),
    };
    assert_eq!(rebuilt.class_name(), "LossFunctionWrapper");
    assert_eq!(rebuilt.name(), "wrapped");
    assert_eq!(rebuilt.reduction(), Reduction::Sum);
    assert_eq!(rebuilt.get_config()?, config);

    let y_true: Tensor = array![[0.0, 2.0]].into_dyn();
    let y_pred: Tensor = array![[1.0, 0.0]].into_dyn();
    approx::assert_relative_eq!(rebuilt.call(&y_true, &y_pred)?[[0]], 2.5);
    Ok(())
}

#[test]
fn test_round_trip_through_json_text() -> Result<()> {
    let loss = Huber::from_config(
        json!({"delta": 0.25, "reduction": "sum", "name": "robust"})
            .as_object()
            .unwrap(),
        &LookupScope::new(registry(), None),
    )?;

    let text = serde_json::to_string(&serialize(LossEntity::instance(loss.clone()))?)?;
    let form: SerializedLoss = serde_json::from_str(&text)?;
    let rebuilt = get(form)?.expect("a loss");
    let rebuilt = rebuilt.as_instance().expect("an instance");

    assert_eq!(rebuilt.name(), "robust");
    assert_eq!(rebuilt.reduction(), Reduction::Sum);
    assert_eq!(rebuilt.get_config()?, loss.get_config()?);
    Ok(())
}

#[test]
fn test_functions_serialize_to_bare_names() -> Result<()> {
    let mse = get("MSE")?.expect("a loss");
    assert_eq!(serialize(mse)?, SerializedLoss::from("mean_squared_error"));
    assert_eq!(
        serde_json::to_value(serialize(get("log_cosh")?.expect("a loss"))?)?,
        json!("log_cosh")
    );
    Ok(())
}

#[test]
fn test_resolved_function_and_class_agree() -> Result<()> {
    let y_true: Tensor = array![[0.0, 1.0, 0.0], [1.0, 0.0, 0.0]].into_dyn();
    let y_pred: Tensor = array![[0.1, 0.8, 0.1], [0.5, 0.3, 0.2]].into_dyn();

    let function = get("categorical_crossentropy")?.expect("a loss");
    let instance = get("CategoricalCrossentropy")?.expect("a loss");
    let a = function.call(&y_true, &y_pred)?;
    let b = instance.call(&y_true, &y_pred)?;
    for (x, y) in a.iter().zip(b.iter()) {
        approx::assert_relative_eq!(*x, *y);
    }
    Ok(())
}

#[test]
fn test_from_logits_mapping() -> Result<()> {
    let mapping = ConfigurationMapping::new(
        "CategoricalCrossentropy",
        json!({"from_logits": true}).as_object().unwrap().clone(),
    );
    let loss = get(mapping)?.expect("a loss");
    let config = loss.as_instance().expect("an instance").get_config()?;
    assert_eq!(config["from_logits"], json!(true));
    Ok(())
}

#[test]
fn test_bad_config_values_surface_as_invalid_config() {
    let err = get(json!({
        "class_name": "BinaryCrossentropy",
        "config": {"from_logits": "yes"},
    }))
    .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidConfig { ref class_name, .. } if class_name == "BinaryCrossentropy"
    ));
}

/// Loss scaled by a constant, defined outside the crate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ScaledConfig {
    scale: f64,
    name: String,
}

#[derive(Debug)]
struct Scaled {
    config: ScaledConfig,
}

impl Loss for Scaled {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn reduction(&self) -> Reduction {
        Reduction::Sum
    }

    fn call(&self, y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
        Ok(lossreg::losses::functions::mean_absolute_error(y_true, y_pred)? * self.config.scale)
    }

    fn get_config(&self) -> Result<ConfigMap> {
        lossreg::losses::config_to_map(Self::CLASS_NAME, &self.config)
    }
}

impl FromConfig for Scaled {
    const CLASS_NAME: &'static str = "Scaled";

    fn from_config(config: &ConfigMap, _scope: &LookupScope<'_>) -> Result<Self> {
        let defaults = ScaledConfig {
            scale: 1.0,
            name: "scaled".to_string(),
        };
        let config = lossreg::losses::merge_config(Self::CLASS_NAME, &defaults, config)?;
        Ok(Self { config })
    }
}

#[test]
fn test_custom_class_round_trip() -> Result<()> {
    let mut custom = CustomObjects::new();
    custom.insert("Scaled".to_string(), LossClass::of::<Scaled>().into());

    let original = Identifier::instance(Scaled {
        config: ScaledConfig {
            scale: 3.0,
            name: "tripled".to_string(),
        },
    });
    let loss = get(original)?.expect("a loss");
    let serialized = serialize(loss)?;

    assert!(deserialize(serialized.clone()).unwrap_err().is_unknown_identifier());

    let rebuilt = get_with(serialized, &custom)?.expect("a loss");
    let y_true: Tensor = array![[0.0, 0.0]].into_dyn();
    let y_pred: Tensor = array![[1.0, 1.0]].into_dyn();
    approx::assert_relative_eq!(rebuilt.call(&y_true, &y_pred)?[[0]], 3.0);
    assert_eq!(rebuilt.name(), "tripled");
    Ok(())
}

#[test]
fn test_custom_function_override() -> Result<()> {
    fn my_fn(y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
        lossreg::losses::functions::hinge(y_true, y_pred)
    }
    let function = LossFunction::new("MyCustomLoss", my_fn);
    let mut custom = CustomObjects::new();
    custom.insert("MyCustomLoss".to_string(), function.into());

    let entity = deserialize_with("MyCustomLoss", &custom)?;
    assert!(entity.same_as(&LossEntity::Function(function)));
    Ok(())
}

proptest! {
    #[test]
    fn unregistered_names_are_unknown(name in "[a-z_]{1,24}_xyz") {
        let err = get(name.as_str()).unwrap_err();
        prop_assert!(err.is_unknown_identifier());
    }

    #[test]
    fn numbers_are_never_interpreted(value in any::<i64>()) {
        let err = get(json!(value)).unwrap_err();
        prop_assert!(
            matches!(err, Error::InvalidIdentifier(ref shown) if *shown == value.to_string())
        );
    }
}
