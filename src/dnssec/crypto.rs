//! Thin adapter over the cryptographic primitives, keyed by the IANA DNSSEC
//! algorithm and digest-type registry numbers. Unknown numbers always fail
//! closed: an algorithm this module does not know is a verification failure,
//! never a pass.

use ring::{digest as ring_digest, signature};

/// DNSSEC signing algorithm numbers (RFC 4034, 5155, 5702, 6605, 8080).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Algorithm {
    RsaSha1 = 5,
    RsaSha1Nsec3Sha1 = 7,
    RsaSha256 = 8,
    RsaSha512 = 10,
    EcdsaP256Sha256 = 13,
    EcdsaP384Sha384 = 14,
    Ed25519 = 15,
    Ed448 = 16,
}

impl Algorithm {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            5 => Some(Self::RsaSha1),
            7 => Some(Self::RsaSha1Nsec3Sha1),
            8 => Some(Self::RsaSha256),
            10 => Some(Self::RsaSha512),
            13 => Some(Self::EcdsaP256Sha256),
            14 => Some(Self::EcdsaP384Sha384),
            15 => Some(Self::Ed25519),
            16 => Some(Self::Ed448),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Whether this verifier can check signatures made with the algorithm.
    /// SHA-1-based RSA and Ed448 parse but are not verifiable here.
    pub fn is_supported(self) -> bool {
        matches!(
            self,
            Self::RsaSha256 | Self::RsaSha512 | Self::EcdsaP256Sha256 | Self::EcdsaP384Sha384 | Self::Ed25519
        )
    }
}

/// DS digest type numbers (RFC 4034, 4509, 6605).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DigestType {
    Sha1 = 1,
    Sha256 = 2,
    Sha384 = 4,
}

impl DigestType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Sha1),
            2 => Some(Self::Sha256),
            4 => Some(Self::Sha384),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn digest_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
        }
    }
}

/// Outcome of a failed signature check. `Unsupported` means the algorithm
/// number itself was unusable; `Invalid` means the bytes did not verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    Unsupported,
    Invalid,
}

/// Computes the digest named by `digest_type` over `data`, or `None` for an
/// unknown digest type.
pub fn digest(digest_type: u8, data: &[u8]) -> Option<Vec<u8>> {
    let alg = match DigestType::from_u8(digest_type)? {
        DigestType::Sha1 => &ring_digest::SHA1_FOR_LEGACY_USE_ONLY,
        DigestType::Sha256 => &ring_digest::SHA256,
        DigestType::Sha384 => &ring_digest::SHA384,
    };
    Some(ring_digest::digest(alg, data).as_ref().to_vec())
}

/// Verifies `signature` over `signed_data` with the raw DNSKEY key material
/// in `public_key`, interpreted per `algorithm`.
pub fn verify_signature(
    algorithm: u8,
    public_key: &[u8],
    signed_data: &[u8],
    signature_bytes: &[u8],
) -> Result<(), SignatureError> {
    #[cfg(test)]
    {
        // Unit tests drive the chain engine with synthetic zones and no
        // signing keys; a magic marker stands in for a valid signature.
        // Compiled out of every non-test build.
        if signature_bytes == TEST_SIGNATURE_VALID {
            return Ok(());
        }
    }

    let alg = Algorithm::from_u8(algorithm).ok_or(SignatureError::Unsupported)?;
    match alg {
        Algorithm::RsaSha256 | Algorithm::RsaSha512 => {
            let params = if alg == Algorithm::RsaSha256 {
                &signature::RSA_PKCS1_1024_8192_SHA256_FOR_LEGACY_USE_ONLY
            } else {
                &signature::RSA_PKCS1_1024_8192_SHA512_FOR_LEGACY_USE_ONLY
            };
            let key = rsa_components(public_key).ok_or(SignatureError::Invalid)?;
            key.verify(params, signed_data, signature_bytes)
                .map_err(|_| SignatureError::Invalid)
        }
        Algorithm::EcdsaP256Sha256 | Algorithm::EcdsaP384Sha384 => {
            let params: &dyn signature::VerificationAlgorithm = if alg == Algorithm::EcdsaP256Sha256 {
                &signature::ECDSA_P256_SHA256_FIXED
            } else {
                &signature::ECDSA_P384_SHA384_FIXED
            };
            // DNSKEY carries the bare (x, y) point; ring wants the
            // uncompressed-point tag in front.
            let mut key = Vec::with_capacity(public_key.len() + 1);
            key.push(0x04);
            key.extend_from_slice(public_key);
            signature::UnparsedPublicKey::new(params, &key)
                .verify(signed_data, signature_bytes)
                .map_err(|_| SignatureError::Invalid)
        }
        Algorithm::Ed25519 => signature::UnparsedPublicKey::new(&signature::ED25519, public_key)
            .verify(signed_data, signature_bytes)
            .map_err(|_| SignatureError::Invalid),
        _ => Err(SignatureError::Unsupported),
    }
}

/// Splits an RFC 3110 RSA public key into (exponent, modulus) components.
/// The exponent length is one byte, or three when the first byte is zero.
fn rsa_components(public_key: &[u8]) -> Option<signature::RsaPublicKeyComponents<&[u8]>> {
    if public_key.len() <= 3 {
        return None;
    }
    let (exp_len, pos) = if public_key[0] == 0 {
        ((usize::from(public_key[1]) << 8) | usize::from(public_key[2]), 3)
    } else {
        (usize::from(public_key[0]), 1)
    };
    if public_key.len() <= pos + exp_len {
        return None;
    }
    Some(signature::RsaPublicKeyComponents {
        n: &public_key[pos + exp_len..],
        e: &public_key[pos..pos + exp_len],
    })
}

/// Marker accepted as a valid signature by `verify_signature` in unit tests.
#[cfg(test)]
pub(crate) const TEST_SIGNATURE_VALID: &[u8] = b"\x01unit-test-signature";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_numbers_fail_closed() {
        assert_eq!(digest(0, b"data"), None);
        assert_eq!(digest(3, b"data"), None);
        assert_eq!(
            verify_signature(0, b"key", b"data", b"sig"),
            Err(SignatureError::Unsupported)
        );
        assert_eq!(
            verify_signature(200, b"key", b"data", b"sig"),
            Err(SignatureError::Unsupported)
        );
        // Known but unverifiable algorithms are unsupported, not invalid.
        assert_eq!(
            verify_signature(16, b"key", b"data", b"sig"),
            Err(SignatureError::Unsupported)
        );
    }

    #[test]
    fn test_digest_lengths() {
        assert_eq!(digest(1, b"x").unwrap().len(), 20);
        assert_eq!(digest(2, b"x").unwrap().len(), 32);
        assert_eq!(digest(4, b"x").unwrap().len(), 48);
    }

    #[test]
    fn test_sha256_known_answer() {
        assert_eq!(
            hex::encode(digest(2, b"abc").unwrap()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_rsa_component_parsing() {
        // One-byte exponent length.
        let key = [3, 1, 0, 1, 0xaa, 0xbb, 0xcc];
        let parsed = rsa_components(&key).unwrap();
        assert_eq!(parsed.e, &[1, 0, 1]);
        assert_eq!(parsed.n, &[0xaa, 0xbb, 0xcc]);

        // Three-byte exponent length.
        let mut long = vec![0, 1, 0];
        long.extend(std::iter::repeat_n(7u8, 256));
        long.extend_from_slice(&[0xdd, 0xee]);
        let parsed = rsa_components(&long).unwrap();
        assert_eq!(parsed.e.len(), 256);
        assert_eq!(parsed.n, &[0xdd, 0xee]);

        assert!(rsa_components(&[]).is_none());
        assert!(rsa_components(&[5, 1, 2]).is_none());
    }

    #[test]
    fn test_garbage_signature_is_invalid() {
        // A structurally plausible ECDSA key that cannot possibly validate
        // this signature.
        let key = [0x11; 64];
        assert_eq!(
            verify_signature(13, &key, b"data", &[0x22; 64]),
            Err(SignatureError::Invalid)
        );
    }
}
