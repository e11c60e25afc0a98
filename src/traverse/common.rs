use crate::num::{Descriptor, Number};

/// Indices of the `k` smallest values, ordered by ascending value.
///
/// Runs a partial selection first so only the selected prefix is sorted.
/// Ties are broken by index.
pub fn k_smallest(values: &[Number], k: usize) -> Vec<usize> {
    let k = k.min(values.len());
    if k == 0 {
        return vec![];
    }

    let compare = |a: &usize, b: &usize| values[*a].total_cmp(&values[*b]).then(a.cmp(b));

    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.select_nth_unstable_by(k - 1, compare);
    indices.truncate(k);
    indices.sort_unstable_by(compare);
    indices
}

/// Scales a descriptor to unit L2 norm. Zero vectors are returned as is.
pub fn normalize(mut descriptor: Descriptor) -> Descriptor {
    let norm = descriptor.norm();
    if norm > 0.0 {
        descriptor /= norm;
    }
    descriptor
}

/// Squared euclidean distance between unit vectors.
#[inline]
pub fn unit_sq_distance(a: &Descriptor, b: &Descriptor) -> Number {
    2.0 - 2.0 * a.dot(b)
}
