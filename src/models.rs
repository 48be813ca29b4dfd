//! Frozen predictors and the helpers that produce them.
//!
//! This module contains:
//! - [`DenseNetwork`] — a stack of dense layers evaluated with `ndarray`, persisted as JSON.
//! - [`Classifier`] / [`Regressor`] — role-checked wrappers behind the [`Predictor`] trait.
//! - `to_ndarrays`, [`fit_regressor`], [`fit_classifier`] — training helpers that turn a
//!   descriptor/fingerprint matrix into a network the pipeline can load.
//!
//! A network file is checked on load: layer shapes must chain, every parameter
//! must be finite, the input must be [`FEATURE_WIDTH`] wide and the output a
//! single value with the activation the role demands.

use std::fmt;
use std::fs;
use std::path::Path;

use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{BbbError, Result};
use crate::features::{FeatureVector, FEATURE_WIDTH};

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Element-wise activation applied after a layer's affine map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// `max(0, x)`
    Relu,
    /// `1 / (1 + e^-x)`
    Sigmoid,
    /// `tanh(x)`
    Tanh,
    /// Identity.
    Linear,
}

impl Activation {
    /// Apply to one value.
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => sigmoid(x),
            Activation::Tanh => x.tanh(),
            Activation::Linear => x,
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// `activation(W · x + b)` with `W` of shape `(outputs, inputs)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    weights: Array2<f64>,
    bias: Array1<f64>,
    activation: Activation,
}

impl DenseLayer {
    /// Build a layer; `bias` must have one entry per weight row.
    pub fn new(weights: Array2<f64>, bias: Array1<f64>, activation: Activation) -> Result<Self> {
        let layer = Self {
            weights,
            bias,
            activation,
        };
        layer.validate()?;
        Ok(layer)
    }

    fn validate(&self) -> Result<()> {
        if self.weights.nrows() != self.bias.len() {
            return Err(BbbError::Shape(format!(
                "layer has {} weight rows but {} biases",
                self.weights.nrows(),
                self.bias.len()
            )));
        }
        if self.weights.is_empty() {
            return Err(BbbError::Shape("layer has no weights".into()));
        }
        if self.weights.iter().chain(self.bias.iter()).any(|v| !v.is_finite()) {
            return Err(BbbError::InvalidInput("layer parameters must be finite".into()));
        }
        Ok(())
    }

    /// Number of inputs.
    pub fn input_width(&self) -> usize {
        self.weights.ncols()
    }

    /// Number of outputs.
    pub fn output_width(&self) -> usize {
        self.weights.nrows()
    }

    /// Activation function.
    pub fn activation(&self) -> Activation {
        self.activation
    }

    fn forward(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        let mut z = self.weights.dot(&x) + &self.bias;
        z.mapv_inplace(|v| self.activation.apply(v));
        z
    }
}

/// An ordered stack of dense layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseNetwork {
    layers: Vec<DenseLayer>,
}

impl DenseNetwork {
    /// Build a network, checking that consecutive layer shapes chain.
    pub fn new(layers: Vec<DenseLayer>) -> Result<Self> {
        let net = Self { layers };
        net.validate()?;
        Ok(net)
    }

    fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(BbbError::Shape("network has no layers".into()));
        }
        for layer in &self.layers {
            layer.validate()?;
        }
        for (i, pair) in self.layers.windows(2).enumerate() {
            if pair[0].output_width() != pair[1].input_width() {
                return Err(BbbError::Shape(format!(
                    "layer {i} emits {} values but layer {} expects {}",
                    pair[0].output_width(),
                    i + 1,
                    pair[1].input_width()
                )));
            }
        }
        Ok(())
    }

    /// Layers in evaluation order.
    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    /// Width of the first layer.
    pub fn input_width(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::input_width)
    }

    /// Width of the last layer.
    pub fn output_width(&self) -> usize {
        self.layers.last().map_or(0, DenseLayer::output_width)
    }

    /// Activation of the last layer.
    pub fn final_activation(&self) -> Option<Activation> {
        self.layers.last().map(DenseLayer::activation)
    }

    /// Evaluate on one input row.
    pub fn forward(&self, x: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        if x.len() != self.input_width() {
            return Err(BbbError::Shape(format!(
                "network expects {} inputs, got {}",
                self.input_width(),
                x.len()
            )));
        }
        let mut layers = self.layers.iter();
        let mut h = match layers.next() {
            Some(first) => first.forward(x),
            None => return Err(BbbError::Shape("network has no layers".into())),
        };
        for layer in layers {
            h = layer.forward(h.view());
        }
        Ok(h)
    }

    /// Persist as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    /// Read a JSON network and validate its internal shapes.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let net: Self = serde_json::from_str(&text)?;
        net.validate()?;
        Ok(net)
    }
}

// ---------------------------------------------------------------------------
// Predictors
// ---------------------------------------------------------------------------

/// Which of the two frozen models a network plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    /// BBB+ probability, sigmoid output.
    Classifier,
    /// logBB, linear output.
    Regressor,
}

impl ModelRole {
    /// Final activation a network in this role must have.
    pub fn required_activation(self) -> Activation {
        match self {
            ModelRole::Classifier => Activation::Sigmoid,
            ModelRole::Regressor => Activation::Linear,
        }
    }

    fn check(self, net: &DenseNetwork) -> Result<()> {
        if net.input_width() != FEATURE_WIDTH {
            return Err(BbbError::Shape(format!(
                "{self} expects {FEATURE_WIDTH} inputs, file has {}",
                net.input_width()
            )));
        }
        if net.output_width() != 1 {
            return Err(BbbError::Shape(format!(
                "{self} must emit one value, file emits {}",
                net.output_width()
            )));
        }
        if net.final_activation() != Some(self.required_activation()) {
            return Err(BbbError::InvalidInput(format!(
                "{self} must end in {:?}, file ends in {:?}",
                self.required_activation(),
                net.final_activation()
            )));
        }
        Ok(())
    }

    fn load(self, path: &Path) -> Result<DenseNetwork> {
        let unavailable =
            |e: BbbError| BbbError::ResourceUnavailable(format!("{self} {}: {e}", path.display()));
        let net = DenseNetwork::load(path).map_err(unavailable)?;
        self.check(&net).map_err(unavailable)?;
        info!(role = %self, path = %path.display(), layers = net.layers().len(), "loaded model");
        Ok(net)
    }
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelRole::Classifier => f.write_str("classifier"),
            ModelRole::Regressor => f.write_str("regressor"),
        }
    }
}

/// A frozen model mapping one feature vector to one number.
pub trait Predictor: Send + Sync {
    /// Score one feature vector.
    fn predict(&self, features: &FeatureVector) -> Result<f64>;
}

fn scalar_output(net: &DenseNetwork, features: &FeatureVector) -> Result<f64> {
    let out = net.forward(features.view())?;
    match out.first() {
        Some(v) if v.is_finite() => Ok(*v),
        Some(v) => Err(BbbError::InvalidInput(format!("model produced {v}"))),
        None => Err(BbbError::Shape("model produced no output".into())),
    }
}

/// BBB+ probability model.
#[derive(Debug, Clone)]
pub struct Classifier(DenseNetwork);

impl Classifier {
    /// Wrap a network after checking it fits the classifier role.
    pub fn new(net: DenseNetwork) -> Result<Self> {
        ModelRole::Classifier.check(&net)?;
        Ok(Self(net))
    }

    /// Load from JSON; any failure is [`BbbError::ResourceUnavailable`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        ModelRole::Classifier.load(path.as_ref()).map(Self)
    }

    /// Underlying network.
    pub fn network(&self) -> &DenseNetwork {
        &self.0
    }
}

impl Predictor for Classifier {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        scalar_output(&self.0, features).map(|p| p.clamp(0.0, 1.0))
    }
}

/// logBB model.
#[derive(Debug, Clone)]
pub struct Regressor(DenseNetwork);

impl Regressor {
    /// Wrap a network after checking it fits the regressor role.
    pub fn new(net: DenseNetwork) -> Result<Self> {
        ModelRole::Regressor.check(&net)?;
        Ok(Self(net))
    }

    /// Load from JSON; any failure is [`BbbError::ResourceUnavailable`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        ModelRole::Regressor.load(path.as_ref()).map(Self)
    }

    /// Underlying network.
    pub fn network(&self) -> &DenseNetwork {
        &self.0
    }
}

impl Predictor for Regressor {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        scalar_output(&self.0, features)
    }
}

// ---------------------------------------------------------------------------
// Training helpers
// ---------------------------------------------------------------------------

/// Convert descriptor and target vectors into ndarray arrays suitable for Linfa.
///
/// - `descriptors` is a Vec of samples, each sample is a Vec of features (n_samples x n_features).
/// - `targets` is a Vec of target values (length n_samples).
pub fn to_ndarrays(
    descriptors: Vec<Vec<f64>>,
    targets: Vec<f64>,
) -> Result<(Array2<f64>, Array1<f64>)> {
    let n_samples = descriptors.len();
    let Some(first) = descriptors.first() else {
        return Err(BbbError::Shape("descriptors is empty".into()));
    };
    let n_features = first.len();

    let mut flat: Vec<f64> = Vec::with_capacity(n_samples * n_features);
    for row in &descriptors {
        if row.len() != n_features {
            return Err(BbbError::Shape("inconsistent feature lengths in descriptors".into()));
        }
        flat.extend_from_slice(row);
    }
    let x = Array2::from_shape_vec((n_samples, n_features), flat)?;

    if targets.len() != n_samples {
        return Err(BbbError::Shape(
            "targets length does not match number of descriptor rows".into(),
        ));
    }
    Ok((x, Array1::from_vec(targets)))
}

/// Ordinary least squares via `linfa-linear`, returned as a one-layer linear network.
pub fn fit_regressor(x: &Array2<f64>, y: &Array1<f64>) -> Result<DenseNetwork> {
    let dataset = Dataset::new(x.clone(), y.clone());
    let model = LinearRegression::default().fit(&dataset)?;
    let weights = model.params().clone().insert_axis(Axis(0));
    let bias = Array1::from_elem(1, model.intercept());
    DenseNetwork::new(vec![DenseLayer::new(weights, bias, Activation::Linear)?])
}

/// Settings for [`fit_classifier`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticOptions {
    /// Gradient step size.
    pub learning_rate: f64,
    /// Upper bound on full-batch epochs.
    pub max_epochs: usize,
    /// L2 penalty on the weights (not the bias).
    pub l2: f64,
    /// Stop once the loss improves by less than this.
    pub tolerance: f64,
}

impl Default for LogisticOptions {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_epochs: 2_000,
            l2: 1e-4,
            tolerance: 1e-9,
        }
    }
}

/// Full-batch gradient descent on binary cross-entropy, returned as a
/// one-layer sigmoid network. Labels must be 0.0 or 1.0.
pub fn fit_classifier(
    x: &Array2<f64>,
    labels: &Array1<f64>,
    options: &LogisticOptions,
) -> Result<DenseNetwork> {
    let n = x.nrows();
    if n == 0 || labels.len() != n {
        return Err(BbbError::Shape(format!(
            "{} rows but {} labels",
            n,
            labels.len()
        )));
    }
    if labels.iter().any(|&l| l != 0.0 && l != 1.0) {
        return Err(BbbError::InvalidInput("labels must be 0 or 1".into()));
    }

    let mut w = Array1::<f64>::zeros(x.ncols());
    let mut b = 0.0;
    let mut previous = f64::INFINITY;
    for epoch in 0..options.max_epochs {
        let p = (x.dot(&w) + b).mapv(sigmoid);
        let loss = cross_entropy(&p, labels) + 0.5 * options.l2 * w.dot(&w);
        if previous - loss < options.tolerance {
            debug!(epoch, loss, "classifier converged");
            break;
        }
        previous = loss;

        let residual = &p - labels;
        let grad_w = x.t().dot(&residual) / n as f64 + &w * options.l2;
        let grad_b = residual.sum() / n as f64;
        w.scaled_add(-options.learning_rate, &grad_w);
        b -= options.learning_rate * grad_b;
    }

    let weights = w.insert_axis(Axis(0));
    DenseNetwork::new(vec![DenseLayer::new(
        weights,
        Array1::from_elem(1, b),
        Activation::Sigmoid,
    )?])
}

fn cross_entropy(p: &Array1<f64>, y: &Array1<f64>) -> f64 {
    const EPS: f64 = 1e-12;
    let total: f64 = p
        .iter()
        .zip(y)
        .map(|(&p, &y)| -(y * (p + EPS).ln() + (1.0 - y) * (1.0 - p + EPS).ln()))
        .sum();
    total / p.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn feature_network(activation: Activation) -> DenseNetwork {
        let mut w = Array2::zeros((1, FEATURE_WIDTH));
        w[[0, FEATURE_WIDTH - 9]] = 0.5;
        DenseNetwork::new(vec![DenseLayer::new(w, array![0.25], activation).unwrap()]).unwrap()
    }

    #[test]
    fn activations() {
        assert_eq!(Activation::Relu.apply(-2.0), 0.0);
        assert_eq!(Activation::Relu.apply(3.0), 3.0);
        assert_abs_diff_eq!(Activation::Sigmoid.apply(0.0), 0.5);
        assert!(Activation::Sigmoid.apply(-1000.0).is_finite());
        assert_abs_diff_eq!(Activation::Tanh.apply(0.0), 0.0);
        assert_eq!(Activation::Linear.apply(-7.5), -7.5);
    }

    #[test]
    fn two_layer_forward() {
        let hidden = DenseLayer::new(
            array![[1.0, -1.0], [0.5, 0.5]],
            array![0.0, 1.0],
            Activation::Relu,
        )
        .unwrap();
        let out =
            DenseLayer::new(array![[2.0, 1.0]], array![-1.0], Activation::Linear).unwrap();
        let net = DenseNetwork::new(vec![hidden, out]).unwrap();
        // hidden = relu([1-3, 0.5*1+0.5*3+1]) = [0, 3]; out = 0*2 + 3 - 1
        let y = net.forward(array![1.0, 3.0].view()).unwrap();
        assert_abs_diff_eq!(y[0], 2.0);
        assert!(matches!(net.forward(array![1.0].view()), Err(BbbError::Shape(_))));
    }

    #[test]
    fn rejects_broken_networks() {
        let a =
            DenseLayer::new(Array2::zeros((3, 2)), Array1::zeros(3), Activation::Relu).unwrap();
        let b =
            DenseLayer::new(Array2::zeros((1, 4)), Array1::zeros(1), Activation::Linear).unwrap();
        assert!(DenseNetwork::new(vec![a, b]).is_err());
        assert!(DenseNetwork::new(Vec::new()).is_err());
        assert!(
            DenseLayer::new(Array2::zeros((2, 2)), Array1::zeros(3), Activation::Relu).is_err()
        );
        assert!(DenseLayer::new(array![[f64::NAN]], array![0.0], Activation::Relu).is_err());
    }

    #[test]
    fn roles_check_final_activation_and_width() {
        assert!(Classifier::new(feature_network(Activation::Sigmoid)).is_ok());
        assert!(Classifier::new(feature_network(Activation::Linear)).is_err());
        assert!(Regressor::new(feature_network(Activation::Linear)).is_ok());
        assert!(Regressor::new(feature_network(Activation::Sigmoid)).is_err());

        let narrow = DenseNetwork::new(vec![
            DenseLayer::new(Array2::zeros((1, 5)), Array1::zeros(1), Activation::Linear).unwrap(),
        ])
        .unwrap();
        assert!(matches!(Regressor::new(narrow), Err(BbbError::Shape(_))));
    }

    #[test]
    fn predictors_read_the_feature_vector() {
        let mut values = Array1::zeros(FEATURE_WIDTH);
        values[FEATURE_WIDTH - 9] = 2.0;
        let features = FeatureVector::from_array(values).unwrap();

        let reg = Regressor::new(feature_network(Activation::Linear)).unwrap();
        assert_abs_diff_eq!(reg.predict(&features).unwrap(), 1.25);

        let clf = Classifier::new(feature_network(Activation::Sigmoid)).unwrap();
        assert_abs_diff_eq!(clf.predict(&features).unwrap(), sigmoid(1.25));
    }

    #[test]
    fn json_round_trip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clf.json");
        let mut w = Array2::zeros((1, FEATURE_WIDTH));
        w[[0, 3]] = 0.1 + 0.2;
        w[[0, 4]] = 1.0 / 3.0;
        let layer = DenseLayer::new(w, array![-1e-17], Activation::Sigmoid).unwrap();
        let net = DenseNetwork::new(vec![layer]).unwrap();
        net.save(&path).unwrap();
        let loaded = Classifier::load(&path).unwrap();
        assert_eq!(loaded.network(), &net);
    }

    #[test]
    fn load_failures_are_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Regressor::load(dir.path().join("missing.json")),
            Err(BbbError::ResourceUnavailable(_))
        ));

        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, "not json").unwrap();
        assert!(matches!(Classifier::load(&garbage), Err(BbbError::ResourceUnavailable(_))));

        // A valid network in the wrong role is unavailable too.
        let reg_path = dir.path().join("reg.json");
        feature_network(Activation::Linear).save(&reg_path).unwrap();
        assert!(matches!(Classifier::load(&reg_path), Err(BbbError::ResourceUnavailable(_))));
    }

    #[test]
    fn conversion_checks_shapes() {
        let desc = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let tgt = vec![3.0, 7.0];
        let (x, y) = to_ndarrays(desc, tgt).unwrap();
        assert_eq!(x.shape(), &[2, 2]);
        assert_eq!(y.len(), 2);

        assert!(to_ndarrays(vec![vec![1.0], vec![1.0, 2.0]], vec![0.0, 0.0]).is_err());
        assert!(to_ndarrays(vec![vec![1.0]], vec![0.0, 1.0]).is_err());
        assert!(to_ndarrays(Vec::new(), Vec::new()).is_err());
    }

    #[test]
    fn least_squares_regressor() {
        // y = x0 + x1 + 1
        let (x, y) = to_ndarrays(
            vec![vec![1.0, 2.0], vec![2.0, 3.0], vec![3.0, 5.0], vec![4.0, 5.0], vec![0.0, 1.0]],
            vec![4.0, 6.0, 9.0, 10.0, 2.0],
        )
        .unwrap();
        let net = fit_regressor(&x, &y).unwrap();
        let pred = net.forward(array![5.0, 6.0].view()).unwrap();
        assert_abs_diff_eq!(pred[0], 12.0, epsilon = 1e-6);
        assert_eq!(net.final_activation(), Some(Activation::Linear));
    }

    #[test]
    fn gradient_descent_classifier_separates() {
        let x = array![[-2.0, 0.1], [-1.5, -0.3], [-1.0, 0.2], [1.0, -0.1], [1.5, 0.3], [2.0, 0.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let net = fit_classifier(&x, &y, &LogisticOptions::default()).unwrap();
        for (row, label) in x.rows().into_iter().zip(y.iter()) {
            let p = net.forward(row).unwrap()[0];
            assert_eq!(p > 0.5, *label == 1.0, "p = {p}");
        }
        let bad_labels = array![0.0, 1.0, 2.0, 0.0, 1.0, 0.0];
        assert!(fit_classifier(&x, &bad_labels, &LogisticOptions::default()).is_err());
    }
}
