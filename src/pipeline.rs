//! SMILES in, verdicts out.
//!
//! [`ModelContext`] owns the two frozen predictors and the fitted scaler. It is
//! built once: either everything loads and the context is
//! [`ModelState::Loaded`], or the first failure is kept as
//! [`ModelState::Unavailable`] and every later request is answered from that
//! cached reason without touching the filesystem again.
//!
//! Each input then runs independently:
//!
//! ```text
//! standardize ─┬─ Rejected ──────────────────────────────► Invalid
//!              └─ Canonical ─► fingerprint ┐
//!                            ─► descriptors ─► scale ─► assemble ─► classifier ┐
//!                                                              └──► regressor  ┴─► decide ─► OK
//! ```
//!
//! ```
//! use bbbp::pipeline::{ModelContext, PredictionStatus};
//!
//! let ctx = ModelContext::from_parts(None, None, None);
//! let rows = ctx.predict_batch(&["CCO", "not a molecule"]);
//! assert!(rows.iter().all(|r| r.status == PredictionStatus::ModelsUnavailable));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::canonical::{standardize, CanonicalSmiles, Standardized};
use crate::config::PipelineConfig;
use crate::decision::{DecisionThresholds, Verdict};
use crate::descriptors::{self, fingerprint};
use crate::error::{BbbError, Result};
use crate::features::{assemble, FeatureVector};
use crate::models::{Classifier, Predictor, Regressor};
use crate::molecule::Molecule;
use crate::scaler::ScalerState;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome class of one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PredictionStatus {
    /// Both models ran and a verdict was reached.
    #[serde(rename = "OK")]
    Ok,
    /// The input is not a parseable molecule.
    Invalid,
    /// The molecule parsed but its features or predictions were unusable.
    PreprocessingError,
    /// The models or scaler are not loaded.
    ModelsUnavailable,
}

impl fmt::Display for PredictionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PredictionStatus::Ok => "OK",
            PredictionStatus::Invalid => "Invalid",
            PredictionStatus::PreprocessingError => "PreprocessingError",
            PredictionStatus::ModelsUnavailable => "ModelsUnavailable",
        })
    }
}

/// Everything known about one input once it has been processed.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    /// The string exactly as supplied.
    pub input: String,
    /// Canonical form, when the input parsed.
    pub canonical: Option<CanonicalSmiles>,
    /// Outcome class.
    pub status: PredictionStatus,
    /// Why the input did not reach a verdict.
    pub message: Option<String>,
    /// Classifier probability on OK rows.
    pub probability: Option<f64>,
    /// Regressor logBB on OK rows.
    pub logbb: Option<f64>,
    /// Fused verdict on OK rows.
    pub verdict: Option<Verdict>,
}

impl PredictionResult {
    fn failed(
        input: &str,
        canonical: Option<CanonicalSmiles>,
        status: PredictionStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            input: input.to_string(),
            canonical,
            status,
            message: Some(message.into()),
            probability: None,
            logbb: None,
            verdict: None,
        }
    }

    /// Whether the row carries a verdict.
    pub fn is_ok(&self) -> bool {
        self.status == PredictionStatus::Ok
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Predictors and scaler that loaded successfully.
#[derive(Clone)]
pub struct LoadedModels {
    classifier: Arc<dyn Predictor>,
    regressor: Arc<dyn Predictor>,
    scaler: ScalerState,
}

impl LoadedModels {
    /// Bundle already-built resources.
    pub fn new(
        classifier: Arc<dyn Predictor>,
        regressor: Arc<dyn Predictor>,
        scaler: ScalerState,
    ) -> Self {
        Self {
            classifier,
            regressor,
            scaler,
        }
    }

    /// Load all three files named by `config`.
    pub fn load(config: &PipelineConfig) -> Result<Self> {
        let classifier = Classifier::load(&config.classifier_path)?;
        let regressor = Regressor::load(&config.regressor_path)?;
        let scaler = ScalerState::load(&config.scaler_path)?;
        Ok(Self::new(Arc::new(classifier), Arc::new(regressor), scaler))
    }

    /// The fitted scaler.
    pub fn scaler(&self) -> &ScalerState {
        &self.scaler
    }
}

impl fmt::Debug for LoadedModels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModels")
            .field("scaler", &self.scaler)
            .finish_non_exhaustive()
    }
}

/// Whether the pipeline can predict at all.
#[derive(Debug, Clone)]
pub enum ModelState {
    /// Ready.
    Loaded(LoadedModels),
    /// Loading failed; the reason is reported on every row.
    Unavailable(String),
}

/// Shared, read-only prediction context.
#[derive(Debug, Clone)]
pub struct ModelContext {
    state: ModelState,
    thresholds: DecisionThresholds,
}

impl ModelContext {
    /// Load everything named by `config`. Never fails: a load error becomes
    /// [`ModelState::Unavailable`].
    pub fn load(config: &PipelineConfig) -> Self {
        let state = match LoadedModels::load(config) {
            Ok(models) => {
                info!("models and scaler loaded");
                ModelState::Loaded(models)
            }
            Err(e) => {
                warn!(error = %e, "models unavailable; every prediction will report it");
                ModelState::Unavailable(e.to_string())
            }
        };
        Self {
            state,
            thresholds: config.thresholds.clone(),
        }
    }

    /// Like [`ModelContext::load`] but surfaces the load error to the caller.
    pub fn try_load(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::from_models(LoadedModels::load(config)?)
            .with_thresholds(config.thresholds.clone()))
    }

    /// Context around already-loaded models.
    pub fn from_models(models: LoadedModels) -> Self {
        Self {
            state: ModelState::Loaded(models),
            thresholds: DecisionThresholds::default(),
        }
    }

    /// Context from optional parts; any missing part makes it unavailable.
    pub fn from_parts(
        classifier: Option<Arc<dyn Predictor>>,
        regressor: Option<Arc<dyn Predictor>>,
        scaler: Option<ScalerState>,
    ) -> Self {
        let state = match (classifier, regressor, scaler) {
            (Some(c), Some(r), Some(s)) => ModelState::Loaded(LoadedModels::new(c, r, s)),
            (None, _, _) => ModelState::Unavailable("classifier not loaded".into()),
            (_, None, _) => ModelState::Unavailable("regressor not loaded".into()),
            (_, _, None) => ModelState::Unavailable("scaler not loaded".into()),
        };
        Self {
            state,
            thresholds: DecisionThresholds::default(),
        }
    }

    /// Replace the decision thresholds.
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: DecisionThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Current state.
    pub fn state(&self) -> &ModelState {
        &self.state
    }

    /// Whether predictions can be made.
    pub fn is_available(&self) -> bool {
        matches!(self.state, ModelState::Loaded(_))
    }

    /// Thresholds in use.
    pub fn thresholds(&self) -> &DecisionThresholds {
        &self.thresholds
    }

    /// Process one input.
    pub fn predict_one(&self, input: &str) -> PredictionResult {
        match &self.state {
            ModelState::Loaded(models) => self.run(models, input),
            ModelState::Unavailable(reason) => {
                PredictionResult::failed(input, None, PredictionStatus::ModelsUnavailable, reason)
            }
        }
    }

    /// Process a batch in parallel. Output order matches input order.
    pub fn predict_batch<S>(&self, inputs: &[S]) -> Vec<PredictionResult>
    where
        S: AsRef<str> + Sync,
    {
        let results: Vec<PredictionResult> = match &self.state {
            ModelState::Unavailable(reason) => {
                warn!(items = inputs.len(), %reason, "batch skipped, models unavailable");
                inputs
                    .iter()
                    .map(|s| {
                        PredictionResult::failed(
                            s.as_ref(),
                            None,
                            PredictionStatus::ModelsUnavailable,
                            reason.as_str(),
                        )
                    })
                    .collect()
            }
            ModelState::Loaded(models) => inputs
                .par_iter()
                .map(|s| self.run(models, s.as_ref()))
                .collect(),
        };
        log_batch(&results);
        results
    }

    /// Like [`predict_batch`](Self::predict_batch) but checks `stop` before
    /// each item and returns the longest completed prefix once it is raised.
    pub fn predict_batch_until<S>(&self, inputs: &[S], stop: &AtomicBool) -> Vec<PredictionResult>
    where
        S: AsRef<str> + Sync,
    {
        let partial: Vec<Option<PredictionResult>> = inputs
            .par_iter()
            .map(|s| (!stop.load(Ordering::Relaxed)).then(|| self.predict_one(s.as_ref())))
            .collect();
        let results: Vec<PredictionResult> = partial.into_iter().map_while(|r| r).collect();
        if results.len() < inputs.len() {
            info!(completed = results.len(), total = inputs.len(), "batch stopped early");
        }
        log_batch(&results);
        results
    }

    fn run(&self, models: &LoadedModels, input: &str) -> PredictionResult {
        let (canonical, mol) = match standardize(input) {
            Standardized::Canonical(canonical, mol) => (canonical, mol),
            Standardized::Rejected(reason) => {
                debug!(input, %reason, "rejected input");
                return PredictionResult::failed(
                    input,
                    None,
                    PredictionStatus::Invalid,
                    reason.to_string(),
                );
            }
        };

        let scored = featurize(&mol, &models.scaler).and_then(|features| {
            let prob = models.classifier.predict(&features)?;
            let logbb = models.regressor.predict(&features)?;
            Ok((prob, logbb))
        });
        match scored {
            Ok((prob, logbb)) => PredictionResult {
                input: input.to_string(),
                canonical: Some(canonical),
                status: PredictionStatus::Ok,
                message: None,
                probability: Some(prob),
                logbb: Some(logbb),
                verdict: Some(self.thresholds.decide(prob, logbb)),
            },
            Err(e) => {
                debug!(input, error = %e, "preprocessing failed");
                let status = if e.is_unavailable() {
                    PredictionStatus::ModelsUnavailable
                } else {
                    PredictionStatus::PreprocessingError
                };
                PredictionResult::failed(input, Some(canonical), status, e.to_string())
            }
        }
    }
}

fn log_batch(results: &[PredictionResult]) {
    let ok = results.iter().filter(|r| r.is_ok()).count();
    info!(total = results.len(), ok, failed = results.len() - ok, "batch complete");
}

/// Build the model input for a parsed molecule.
pub fn featurize(mol: &Molecule, scaler: &ScalerState) -> Result<FeatureVector> {
    let fp = fingerprint::encode(Some(mol));
    let raw = descriptors::extract(Some(mol));
    let scaled = scaler.transform(&raw);
    if let Some(pos) = scaled.as_slice().iter().position(|v| !v.is_finite()) {
        return Err(BbbError::InvalidInput(format!(
            "descriptor {} is not finite",
            descriptors::DESCRIPTOR_NAMES[pos]
        )));
    }
    Ok(assemble(&fp, &scaled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::DESCRIPTOR_COUNT;
    use crate::features::FEATURE_WIDTH;
    use std::sync::atomic::AtomicUsize;

    /// Returns a fixed value and counts how often it was asked.
    struct Fixed {
        value: f64,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(value: f64) -> Arc<Self> {
            Arc::new(Self {
                value,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl Predictor for Fixed {
        fn predict(&self, features: &FeatureVector) -> Result<f64> {
            assert_eq!(features.len(), FEATURE_WIDTH);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.value)
        }
    }

    struct Failing;

    impl Predictor for Failing {
        fn predict(&self, _: &FeatureVector) -> Result<f64> {
            Err(BbbError::Shape("boom".into()))
        }
    }

    struct Gone;

    impl Predictor for Gone {
        fn predict(&self, _: &FeatureVector) -> Result<f64> {
            Err(BbbError::ResourceUnavailable("weights evicted".into()))
        }
    }

    fn identity_scaler() -> ScalerState {
        ScalerState::new(vec![0.0; DESCRIPTOR_COUNT], vec![1.0; DESCRIPTOR_COUNT]).unwrap()
    }

    fn context(prob: f64, logbb: f64) -> (ModelContext, Arc<Fixed>, Arc<Fixed>) {
        let clf = Fixed::new(prob);
        let reg = Fixed::new(logbb);
        let ctx = ModelContext::from_parts(
            Some(clf.clone()),
            Some(reg.clone()),
            Some(identity_scaler()),
        );
        (ctx, clf, reg)
    }

    #[test]
    fn valid_input_gets_a_verdict() {
        let (ctx, _, _) = context(0.9, 0.1);
        let r = ctx.predict_one("OCC");
        assert_eq!(r.status, PredictionStatus::Ok);
        assert_eq!(r.canonical.as_ref().map(|c| c.as_str()), Some("CCO"));
        assert_eq!(r.probability, Some(0.9));
        assert_eq!(r.logbb, Some(0.1));
        assert_eq!(r.verdict, Some(Verdict::Yes));
        assert!(r.message.is_none());
    }

    #[test]
    fn invalid_input_never_reaches_predictors() {
        let (ctx, clf, reg) = context(0.9, 0.1);
        let r = ctx.predict_one("C1CC(");
        assert_eq!(r.status, PredictionStatus::Invalid);
        assert!(r.probability.is_none() && r.verdict.is_none());
        assert_eq!(clf.calls.load(Ordering::SeqCst), 0);
        assert_eq!(reg.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unavailable_context_makes_no_calls() {
        let clf = Fixed::new(0.9);
        let reg = Fixed::new(0.1);
        let ctx = ModelContext::from_parts(Some(clf.clone()), Some(reg.clone()), None);
        assert!(!ctx.is_available());
        let rows = ctx.predict_batch(&["CCO", "c1ccccc1", "garbage("]);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.status == PredictionStatus::ModelsUnavailable));
        assert!(rows.iter().all(|r| r.message.as_deref() == Some("scaler not loaded")));
        assert_eq!(clf.calls.load(Ordering::SeqCst), 0);
        assert_eq!(reg.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn batch_keeps_order_and_isolates_failures() {
        let (ctx, clf, _) = context(0.1, 1.0);
        let inputs = ["CCO", "", "c1ccccc1", "Xx", "CCN"];
        let rows = ctx.predict_batch(&inputs);
        let statuses: Vec<_> = rows.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                PredictionStatus::Ok,
                PredictionStatus::Invalid,
                PredictionStatus::Ok,
                PredictionStatus::Invalid,
                PredictionStatus::Ok,
            ]
        );
        for (row, input) in rows.iter().zip(inputs) {
            assert_eq!(row.input, input);
        }
        assert!(rows.iter().filter(|r| r.is_ok()).all(|r| r.verdict == Some(Verdict::No)));
        assert_eq!(clf.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn predictor_failure_is_a_preprocessing_error() {
        let ctx = ModelContext::from_parts(
            Some(Arc::new(Failing)),
            Some(Fixed::new(0.0)),
            Some(identity_scaler()),
        );
        let r = ctx.predict_one("CCO");
        assert_eq!(r.status, PredictionStatus::PreprocessingError);
        assert!(r.canonical.is_some());
        assert!(r.verdict.is_none());
    }

    #[test]
    fn unavailable_predictor_is_reported_as_such() {
        let ctx = ModelContext::from_parts(
            Some(Arc::new(Gone)),
            Some(Fixed::new(0.0)),
            Some(identity_scaler()),
        );
        let r = ctx.predict_one("CCO");
        assert_eq!(r.status, PredictionStatus::ModelsUnavailable);
        assert!(r.message.unwrap().contains("weights evicted"));
    }

    #[test]
    fn custom_thresholds_apply() {
        let (ctx, _, _) = context(0.45, -0.35);
        assert_eq!(ctx.predict_one("CCO").verdict, Some(Verdict::Yes));
        let strict = ctx.with_thresholds(DecisionThresholds {
            low_prob: 0.5,
            ..DecisionThresholds::default()
        });
        assert_eq!(strict.predict_one("CCO").verdict, Some(Verdict::No));
    }

    #[test]
    fn raised_stop_flag_returns_nothing() {
        let (ctx, clf, _) = context(0.9, 0.1);
        let stop = AtomicBool::new(true);
        assert!(ctx.predict_batch_until(&["CCO", "CCN"], &stop).is_empty());
        assert_eq!(clf.calls.load(Ordering::SeqCst), 0);

        let go = AtomicBool::new(false);
        assert_eq!(ctx.predict_batch_until(&["CCO", "CCN"], &go).len(), 2);
    }

    #[test]
    fn featurize_is_full_width() {
        let mol = Molecule::from_smiles("c1ccccc1O").unwrap();
        let fv = featurize(&mol, &identity_scaler()).unwrap();
        assert_eq!(fv.len(), FEATURE_WIDTH);
        assert!(fv.fingerprint().sum() > 0.0);
    }
}
