//! Utility functions for tools built on the loss registry

/// Conversions between tensors and nested JSON arrays
pub mod tensor {
    use crate::error::{Error, Result};
    use crate::losses::Tensor;
    use ndarray::IxDyn;
    use serde_json::Value;

    fn infer_shape(value: &Value, shape: &mut Vec<usize>) {
        if let Value::Array(items) = value {
            shape.push(items.len());
            if let Some(first) = items.first() {
                infer_shape(first, shape);
            }
        }
    }

    fn flatten(value: &Value, depth: usize, shape: &[usize], out: &mut Vec<f64>) -> Result<()> {
        match value {
            Value::Array(items) => {
                if depth >= shape.len() || items.len() != shape[depth] {
                    return Err(Error::shape("nested arrays must be rectangular"));
                }
                for item in items {
                    flatten(item, depth + 1, shape, out)?;
                }
                Ok(())
            }
            Value::Number(number) if depth == shape.len() => {
                let value = number
                    .as_f64()
                    .ok_or_else(|| Error::invalid_input(format!("{number} is not a float")))?;
                out.push(value);
                Ok(())
            }
            other => Err(Error::invalid_input(format!(
                "expected a number or an array, got {other}"
            ))),
        }
    }

    /// Parse a tensor from nested JSON arrays of numbers
    pub fn from_json(value: &Value) -> Result<Tensor> {
        let mut shape = Vec::new();
        infer_shape(value, &mut shape);

        let mut data = Vec::new();
        flatten(value, 0, &shape, &mut data)?;
        Tensor::from_shape_vec(IxDyn(&shape), data).map_err(|e| Error::shape(e.to_string()))
    }

    /// Render a tensor as nested JSON arrays
    pub fn to_json(tensor: &Tensor) -> Value {
        if tensor.ndim() == 0 {
            return tensor.iter().next().map_or(Value::Null, |&v| Value::from(v));
        }
        Value::Array(
            tensor
                .outer_iter()
                .map(|sub| to_json(&sub.to_owned()))
                .collect(),
        )
    }

}
