#![warn(missing_docs)]
//! bbbp — blood-brain barrier permeability prediction from SMILES.
//!
//! This crate turns a SMILES string into one verdict by fusing two frozen models:
//!
//! - **canonical** — deterministic canonical SMILES (`C1=CC=CC=C1` and `c1ccccc1` agree)
//! - **descriptors** — 2048-bit Morgan fingerprint plus nine physicochemical and
//!   constitutional descriptors (MolWt, MolMR, TPSA, MolLogP, rotatable bonds,
//!   H-bond donors/acceptors, aromatic rings, one reserved slot)
//! - **scaler** / **features** — standard scaling and the fixed 2057-wide model input
//! - **models** — dense networks behind the [`Predictor`] trait, plus training helpers
//! - **decision** — the threshold cascade that fuses probability and logBB
//! - **pipeline** — [`ModelContext`], the loaded-or-unavailable context that runs batches
//! - **data_io** — SMILES/CSV readers and the [`ResultTable`] writer
//!
//! Everything below the pipeline is pure Rust; the molecule layer has no
//! native toolkit behind it.
//!
//! # Quick examples
//!
//! ### Canonicalize and describe a molecule
//! ```
//! use bbbp::{standardize, Descriptors};
//!
//! let aspirin = standardize("OC(=O)c1ccccc1OC(C)=O");
//! let mol = aspirin.molecule().unwrap();
//! let d = Descriptors::compute(mol);
//! println!("{}  MolWt: {:.3}  TPSA: {:.2}  HBD: {}  HBA: {}",
//!          aspirin.canonical().unwrap(), d.mol_wt, d.tpsa, d.num_h_donors, d.num_h_acceptors);
//! ```
//!
//! ### Decide from model outputs
//! ```
//! use bbbp::{decide, Verdict};
//! assert_eq!(decide(0.90, -0.25), Verdict::Yes);
//! assert_eq!(decide(0.15, 1.00), Verdict::No);
//! ```
//!
//! ### Run a batch
//! ```no_run
//! use bbbp::{ModelContext, PipelineConfig, ResultTable};
//!
//! let config = PipelineConfig::from_file("bbbp.toml")?.apply_env_overrides();
//! let ctx = ModelContext::load(&config);
//! let results = ctx.predict_batch(&["CCO", "CN1C=NC2=C1C(=O)N(C(=O)N2C)C"]);
//! print!("{}", ResultTable::new(&results));
//! # Ok::<(), bbbp::BbbError>(())
//! ```

pub mod canonical;
pub mod config;
pub mod data_io;
pub mod decision;
pub mod descriptors;
pub mod element;
pub mod error;
pub mod features;
pub mod models;
pub mod molecule;
pub mod pipeline;
pub mod scaler;

// ─────────────────────────────────────────────────────────────────────────────
// Convenience re-exports
// ─────────────────────────────────────────────────────────────────────────────
pub use canonical::{standardize, CanonicalSmiles, Standardized};
pub use config::PipelineConfig;
pub use data_io::ResultTable;
pub use decision::{decide, DecisionThresholds, Verdict};
pub use descriptors::{DescriptorVector, Descriptors};
pub use error::{BbbError, Result};
pub use features::{FeatureVector, FEATURE_WIDTH};
pub use models::{Classifier, DenseNetwork, Predictor, Regressor};
pub use molecule::{Molecule, SmilesError};
pub use pipeline::{ModelContext, PredictionResult, PredictionStatus};
pub use scaler::ScalerState;
