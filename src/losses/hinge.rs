//! Hinge loss classes for maximum-margin classification

use super::functions;

simple_loss_class!(
    /// Hinge loss; binary labels in {0, 1} are mapped to {-1, 1}
    Hinge,
    "hinge",
    functions::hinge
);

simple_loss_class!(
    /// Squared hinge loss; binary labels in {0, 1} are mapped to {-1, 1}
    SquaredHinge,
    "squared_hinge",
    functions::squared_hinge
);

simple_loss_class!(
    /// Categorical hinge loss over one-hot labels
    CategoricalHinge,
    "categorical_hinge",
    functions::categorical_hinge
);
