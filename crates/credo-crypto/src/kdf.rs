use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Concat KDF (NIST SP 800-56A, as profiled by RFC 7518 §4.6.2) over SHA-256.
///
/// Derives `key_bits / 8` bytes from the ECDH shared secret `z`, binding the
/// content encryption algorithm and the optional party info.
pub fn concat_kdf(
    z: &[u8],
    algorithm_id: &str,
    apu: &[u8],
    apv: &[u8],
    key_bits: u32,
) -> Zeroizing<Vec<u8>> {
    let key_len = (key_bits / 8) as usize;

    let mut other_info = Vec::new();
    push_length_prefixed(&mut other_info, algorithm_id.as_bytes());
    push_length_prefixed(&mut other_info, apu);
    push_length_prefixed(&mut other_info, apv);
    other_info.extend_from_slice(&key_bits.to_be_bytes());

    let mut output = Zeroizing::new(Vec::with_capacity(key_len + 32));
    let mut counter: u32 = 1;
    while output.len() < key_len {
        let mut hasher = Sha256::new();
        hasher.update(counter.to_be_bytes());
        hasher.update(z);
        hasher.update(&other_info);
        output.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    output.truncate(key_len);
    output
}

fn push_length_prefixed(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
}
