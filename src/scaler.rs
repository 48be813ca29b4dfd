//! Standard scaling of the nine descriptor columns.
//!
//! The scaler is fitted once on a training matrix and then frozen. At
//! inference it only ever runs `(x - mean) / scale`, column by column. A
//! column with no spread (including the reserved slot) gets a scale of 1 so
//! it passes through centred but unscaled.
//!
//! ```
//! use bbbp::scaler::ScalerState;
//! use ndarray::array;
//!
//! let x = array![
//!     [1.0, 10.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
//!     [3.0, 30.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
//! ];
//! let state = ScalerState::fit(&x).unwrap();
//! assert_eq!(state.mean()[0], 2.0);
//! assert_eq!(state.scale()[0], 1.0);
//! assert_eq!(state.scale()[8], 1.0); // no spread
//! ```

use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::descriptors::{DescriptorVector, DESCRIPTOR_COUNT};
use crate::error::{BbbError, Result};

/// Fitted per-column mean and scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl ScalerState {
    /// Build from explicit parameters, validating width and scales.
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        let state = Self { mean, scale };
        state.validate()?;
        Ok(state)
    }

    /// Fit on an `N × 9` matrix using the population standard deviation.
    pub fn fit(x: &Array2<f64>) -> Result<Self> {
        if x.nrows() == 0 {
            return Err(BbbError::Scaling("cannot fit a scaler on zero rows".into()));
        }
        if x.ncols() != DESCRIPTOR_COUNT {
            return Err(BbbError::Shape(format!(
                "scaler expects {DESCRIPTOR_COUNT} columns, got {}",
                x.ncols()
            )));
        }
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| BbbError::Scaling("empty matrix".into()))?;
        let scale = x.std_axis(Axis(0), 0.0).mapv(|s| {
            if s == 0.0 || !s.is_finite() {
                1.0
            } else {
                s
            }
        });
        Self::new(mean.to_vec(), scale.to_vec())
    }

    /// Scale one descriptor vector.
    pub fn transform(&self, v: &DescriptorVector) -> DescriptorVector {
        let mut out = [0.0; DESCRIPTOR_COUNT];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = (v.0[i] - self.mean[i]) / self.scale[i];
        }
        DescriptorVector(out)
    }

    /// Scale every row of an `N × 9` matrix.
    pub fn transform_matrix(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != DESCRIPTOR_COUNT {
            return Err(BbbError::Shape(format!(
                "scaler expects {DESCRIPTOR_COUNT} columns, got {}",
                x.ncols()
            )));
        }
        let mean = Array1::from_vec(self.mean.clone());
        let scale = Array1::from_vec(self.scale.clone());
        Ok((x - &mean) / &scale)
    }

    /// Column means.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Column scales (never zero).
    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    fn validate(&self) -> Result<()> {
        if self.mean.len() != DESCRIPTOR_COUNT || self.scale.len() != DESCRIPTOR_COUNT {
            return Err(BbbError::Shape(format!(
                "scaler state must have {DESCRIPTOR_COUNT} columns, got mean {} / scale {}",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if self.mean.iter().any(|m| !m.is_finite()) {
            return Err(BbbError::Scaling("non-finite mean".into()));
        }
        if self.scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(BbbError::Scaling("scales must be positive and finite".into()));
        }
        Ok(())
    }

    /// Persist as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load and validate a JSON scaler file.
    ///
    /// Every failure is reported as [`BbbError::ResourceUnavailable`] so the
    /// pipeline can treat a broken file exactly like a missing one.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let unavailable = |e: &dyn std::fmt::Display| {
            BbbError::ResourceUnavailable(format!("scaler {}: {e}", path.display()))
        };
        let text = fs::read_to_string(path).map_err(|e| unavailable(&e))?;
        let state: Self = serde_json::from_str(&text).map_err(|e| unavailable(&e))?;
        state.validate().map_err(|e| unavailable(&e))?;
        info!(path = %path.display(), "loaded scaler");
        Ok(state)
    }
}

/// A scaler that may not have been fitted yet.
#[derive(Debug, Clone, Default)]
pub struct FeatureScaler {
    state: Option<ScalerState>,
}

impl FeatureScaler {
    /// Unfitted scaler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing state.
    pub fn with_state(state: ScalerState) -> Self {
        Self { state: Some(state) }
    }

    /// Fit and keep the resulting state.
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&ScalerState> {
        Ok(&*self.state.insert(ScalerState::fit(x)?))
    }

    /// Whether a state is present.
    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    /// Fitted state, if any.
    pub fn state(&self) -> Option<&ScalerState> {
        self.state.as_ref()
    }

    /// Scale one vector; errors when nothing has been fitted.
    pub fn transform(&self, v: &DescriptorVector) -> Result<DescriptorVector> {
        self.state
            .as_ref()
            .map(|s| s.transform(v))
            .ok_or_else(|| BbbError::Scaling("scaler has not been fitted or loaded".into()))
    }
}
