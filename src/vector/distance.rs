//! Distance kernels used by the flat index.

/// Squared Euclidean distance between two equal-length vectors.
///
/// The square root is skipped because it does not change the ordering.
/// Callers validate lengths first; mismatched inputs are compared over the
/// shorter prefix.
#[inline]
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "distance over vectors of different length");

    // Four independent accumulators let the compiler vectorise the loop.
    let mut acc = [0.0f32; 4];
    let chunks_a = a.chunks_exact(4);
    let chunks_b = b.chunks_exact(4);
    let tail_a = chunks_a.remainder();
    let tail_b = chunks_b.remainder();

    for (ca, cb) in chunks_a.zip(chunks_b) {
        for lane in 0..4 {
            let d = ca[lane] - cb[lane];
            acc[lane] += d * d;
        }
    }

    let tail: f32 = tail_a
        .iter()
        .zip(tail_b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum();

    (acc[0] + acc[1]) + (acc[2] + acc[3]) + tail
}
