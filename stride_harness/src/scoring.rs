//! Bit-error scoring.

/// Number of bit errors between the sent and received patterns.
///
/// A length mismatch counts every sent bit as wrong. Otherwise this is the
/// Hamming distance; `'?'` never matches a sent bit.
pub fn bit_errors(sent: &str, received: &str) -> usize {
    let sent_len = sent.chars().count();
    if sent_len != received.chars().count() {
        return sent_len;
    }
    sent.chars()
        .zip(received.chars())
        .filter(|(s, r)| s != r)
        .count()
}
