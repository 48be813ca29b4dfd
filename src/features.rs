//! Fixed-width model input: fingerprint bits followed by scaled descriptors.

use ndarray::{s, Array1, ArrayView1};

use crate::descriptors::fingerprint::{Fingerprint, FINGERPRINT_BITS};
use crate::descriptors::{DescriptorVector, DESCRIPTOR_COUNT};
use crate::error::{BbbError, Result};

/// Width of every feature vector the models see.
pub const FEATURE_WIDTH: usize = FINGERPRINT_BITS + DESCRIPTOR_COUNT;

/// One model input row, always [`FEATURE_WIDTH`] long.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Array1<f64>);

impl FeatureVector {
    /// Wrap an existing array, checking its width.
    pub fn from_array(values: Array1<f64>) -> Result<Self> {
        if values.len() != FEATURE_WIDTH {
            return Err(BbbError::Shape(format!(
                "feature vector must have {FEATURE_WIDTH} values, got {}",
                values.len()
            )));
        }
        Ok(Self(values))
    }

    /// All values.
    pub fn view(&self) -> ArrayView1<'_, f64> {
        self.0.view()
    }

    /// The fingerprint part.
    pub fn fingerprint(&self) -> ArrayView1<'_, f64> {
        self.0.slice(s![..FINGERPRINT_BITS])
    }

    /// The scaled descriptor part.
    pub fn descriptors(&self) -> ArrayView1<'_, f64> {
        self.0.slice(s![FINGERPRINT_BITS..])
    }

    /// Always [`FEATURE_WIDTH`].
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Unwrap the array.
    pub fn into_array(self) -> Array1<f64> {
        self.0
    }
}

/// Concatenate a fingerprint and already-scaled descriptors.
pub fn assemble(fingerprint: &Fingerprint, scaled: &DescriptorVector) -> FeatureVector {
    let mut values = Array1::zeros(FEATURE_WIDTH);
    for bit in fingerprint.active_bits() {
        values[bit] = 1.0;
    }
    for (i, v) in scaled.as_slice().iter().enumerate() {
        values[FINGERPRINT_BITS + i] = *v;
    }
    FeatureVector(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::fingerprint::encode;
    use crate::molecule::Molecule;

    #[test]
    fn width_is_fixed() {
        assert_eq!(FEATURE_WIDTH, 2057);
        let empty = assemble(&encode(None), &DescriptorVector::zeros());
        assert_eq!(empty.len(), FEATURE_WIDTH);
        assert!(empty.view().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn fingerprint_first_then_descriptors() {
        let mol = Molecule::from_smiles("CCO").unwrap();
        let fp = encode(Some(&mol));
        let mut d = [0.0; DESCRIPTOR_COUNT];
        d[0] = 1.5;
        d[7] = -2.0;
        let fv = assemble(&fp, &DescriptorVector(d));
        assert_eq!(fv.fingerprint(), fp.to_array());
        assert_eq!(fv.descriptors()[0], 1.5);
        assert_eq!(fv.descriptors()[7], -2.0);
        assert_eq!(fv.descriptors().len(), DESCRIPTOR_COUNT);
    }

    #[test]
    fn from_array_checks_width() {
        assert!(FeatureVector::from_array(Array1::zeros(FEATURE_WIDTH)).is_ok());
        assert!(matches!(
            FeatureVector::from_array(Array1::zeros(10)),
            Err(BbbError::Shape(_))
        ));
    }
}
