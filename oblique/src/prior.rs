//! Alignment prior concentrating mass near the sentence diagonal.

/// Returns the unnormalized weight of aligning the target position `j`
/// (0-based, in a sentence of `trg_len` words) to the source position `i`
/// (1-based, in a sentence of `src_len` words):
/// exp(−|(i−1)/I − j/J| · tension).
///
/// With `tension == 0` every source position weighs 1.
#[inline(always)]
pub fn unnormalized_prob(i: usize, src_len: usize, j: usize, trg_len: usize, tension: f64) -> f64 {
    let src_pos = (i - 1) as f64 / src_len as f64;
    let trg_pos = j as f64 / trg_len as f64;
    (-(src_pos - trg_pos).abs() * tension).exp()
}

/// Returns the sum of [`unnormalized_prob`] over all source positions
/// 1..=`src_len` for the target position `j`.
pub fn normalizer(src_len: usize, j: usize, trg_len: usize, tension: f64) -> f64 {
    let mut z = 0.0;
    for i in 1..=src_len {
        z += unnormalized_prob(i, src_len, j, trg_len, tension);
    }
    z
}
