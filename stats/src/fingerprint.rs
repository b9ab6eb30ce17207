use blake3::Hasher;

/// Length of a rendered fingerprint in hex characters (20 bytes of digest).
pub(crate) const FINGERPRINT_LEN: usize = 40;

/// Computes the content fingerprint of a canonically serialized submission.
///
/// Blake3 truncated to 20 bytes, rendered as lowercase hex. The fingerprint
/// is a deduplication key, not a security boundary: two submissions with
/// identical canonical bytes always collide, and an accidental collision at
/// this length is treated as "same submission."
pub(crate) fn fingerprint(canonical: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(canonical);
    let digest = hasher.finalize();
    digest.to_hex()[..FINGERPRINT_LEN].to_string()
}
