//! Signatures, named sketches and the signature distance seam.

use std::ops::Deref;

/// Fixed-width MinHash-style signature of a k-mer set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Signature {
    values: Vec<u32>,
}

impl Signature {
    /// Wrap raw signature values.
    pub fn new(values: Vec<u32>) -> Self {
        Self { values }
    }

    /// Signature values in hash-function order.
    pub fn values(&self) -> &[u32] {
        &self.values
    }

    /// Unwrap into the raw values.
    pub fn into_values(self) -> Vec<u32> {
        self.values
    }
}

impl Deref for Signature {
    type Target = [u32];

    fn deref(&self) -> &[u32] {
        &self.values
    }
}

impl From<Vec<u32>> for Signature {
    fn from(values: Vec<u32>) -> Self {
        Self::new(values)
    }
}

impl From<&[u32]> for Signature {
    fn from(values: &[u32]) -> Self {
        Self::new(values.to_vec())
    }
}

/// A signature paired with the name it is retrieved by.
///
/// The name is opaque to the index: a cluster, genome or family id. Several
/// sketches may share a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sketch {
    signature: Signature,
    name: String,
}

impl Sketch {
    /// Pair `signature` with `name`.
    pub fn new(signature: impl Into<Signature>, name: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            name: name.into(),
        }
    }

    /// The signature the index addresses and compares.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Name returned in query hits.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the sketch; stored copies are unaffected.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

/// Distance between two signatures.
///
/// Implementations must be deterministic and symmetric, and return values in
/// `[0, 1]` with 0 for identical signatures. The index only uses the value
/// for thresholding and ordering.
pub trait SignatureMetric {
    fn distance(&self, a: &[u32], b: &[u32]) -> f64;
}

/// Fraction of positions where two signatures differ.
///
/// For MinHash signatures this is `1 - J`, the estimated Jaccard distance of
/// the underlying k-mer sets. Signatures of different length are maximally
/// distant.
#[derive(Debug, Clone, Copy, Default)]
pub struct MismatchFraction;

impl SignatureMetric for MismatchFraction {
    fn distance(&self, a: &[u32], b: &[u32]) -> f64 {
        if a.len() != b.len() {
            return 1.0;
        }
        if a.is_empty() {
            return 0.0;
        }
        let mismatches = a.iter().zip(b.iter()).filter(|(x, y)| x != y).count();
        mismatches as f64 / a.len() as f64
    }
}

impl<F> SignatureMetric for F
where
    F: Fn(&[u32], &[u32]) -> f64,
{
    fn distance(&self, a: &[u32], b: &[u32]) -> f64 {
        self(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_fraction() {
        let m = MismatchFraction;
        assert_eq!(m.distance(&[1, 2, 3, 4], &[1, 2, 3, 4]), 0.0);
        assert_eq!(m.distance(&[1, 2, 3, 4], &[1, 9, 3, 9]), 0.5);
        assert_eq!(m.distance(&[1, 2], &[1, 2, 3]), 1.0);
        assert_eq!(m.distance(&[], &[]), 0.0);
    }

    #[test]
    fn test_mismatch_fraction_symmetric() {
        let m = MismatchFraction;
        let a = [5, 6, 7, 8, 9];
        let b = [5, 0, 7, 0, 0];
        assert_eq!(m.distance(&a, &b), m.distance(&b, &a));
    }

    #[test]
    fn test_closure_metric() {
        let always_half = |_: &[u32], _: &[u32]| 0.5;
        assert_eq!(always_half.distance(&[1], &[2]), 0.5);
    }

    #[test]
    fn test_rename_keeps_signature() {
        let mut sketch = Sketch::new(vec![1, 2, 3], "a");
        sketch.set_name("b");
        assert_eq!(sketch.name(), "b");
        assert_eq!(sketch.signature().values(), &[1, 2, 3]);
    }
}
