// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::{hash::sha256, CryptoError};
use daisy_types::SignatureBundle;
use libsecp256k1::{Message, PublicKey, PublicKeyFormat, SecretKey, Signature};
use rand::rngs::OsRng;

/// A raw secp256k1 keypair. The public half is the 65-byte uncompressed
/// point; the private half is the 32-byte scalar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPair {
    pub public: Vec<u8>,
    pub private: Vec<u8>,
}

impl KeyPair {
    pub fn generate() -> Self {
        let secret = SecretKey::random(&mut OsRng);
        let public = PublicKey::from_secret_key(&secret);
        Self {
            public: public.serialize().to_vec(),
            private: secret.serialize().to_vec(),
        }
    }

    pub fn from_private(private: &[u8]) -> Result<Self, CryptoError> {
        let secret =
            SecretKey::parse_slice(private).map_err(|_| CryptoError::MalformedPrivateKey)?;
        let public = PublicKey::from_secret_key(&secret);
        Ok(Self {
            public: public.serialize().to_vec(),
            private: secret.serialize().to_vec(),
        })
    }
}

/// Signs `data` with the keypair's private key. The signature is DER-encoded
/// and covers the sha256 digest of `data`.
pub fn sign(data: &[u8], keypair: &KeyPair) -> Result<SignatureBundle, CryptoError> {
    let secret =
        SecretKey::parse_slice(&keypair.private).map_err(|_| CryptoError::MalformedPrivateKey)?;
    let message = Message::parse(&sha256(data));
    let (signature, _recovery_id) = libsecp256k1::sign(&message, &secret);
    Ok(SignatureBundle {
        signature: signature.serialize_der().as_ref().to_vec(),
        public_key: keypair.public.clone(),
    })
}

/// Verifies `bundle.signature` over `data` against `bundle.public_key`,
/// returning the raw public key bytes on success.
pub fn verify(data: &[u8], bundle: &SignatureBundle) -> Result<Vec<u8>, CryptoError> {
    let public = parse_public_key(&bundle.public_key)?;
    let signature = Signature::parse_der(&bundle.signature)
        .map_err(|_| CryptoError::MalformedSignature)?;
    let message = Message::parse(&sha256(data));
    if libsecp256k1::verify(&message, &signature, &public) {
        Ok(bundle.public_key.clone())
    } else {
        Err(CryptoError::InvalidSignature)
    }
}

fn parse_public_key(bytes: &[u8]) -> Result<PublicKey, CryptoError> {
    let format = match bytes.len() {
        65 => PublicKeyFormat::Full,
        33 => PublicKeyFormat::Compressed,
        64 => PublicKeyFormat::Raw,
        _ => return Err(CryptoError::MalformedPublicKey),
    };
    PublicKey::parse_slice(bytes, Some(format)).map_err(|_| CryptoError::MalformedPublicKey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_err_eq, assert_ok, assert_ok_eq};
    use daisy_types::Invocation;

    #[test]
    fn sign_verify_roundtrip() {
        let keypair = KeyPair::generate();
        let payload = Invocation::new("test", vec!["1".into(), "2".into()]).signing_bytes();
        let bundle = assert_ok!(sign(&payload, &keypair));
        assert_ok_eq!(verify(&payload, &bundle), keypair.public);
    }

    #[test]
    fn tampered_payload_fails() {
        let keypair = KeyPair::generate();
        let bundle = sign(b"payload", &keypair).unwrap();
        assert_err_eq!(verify(b"payload!", &bundle), CryptoError::InvalidSignature);
    }

    #[test]
    fn foreign_public_key_fails() {
        let keypair = KeyPair::generate();
        let other = KeyPair::generate();
        let mut bundle = sign(b"payload", &keypair).unwrap();
        bundle.public_key = other.public;
        assert_err_eq!(verify(b"payload", &bundle), CryptoError::InvalidSignature);
    }

    #[test]
    fn corrupt_public_key_byte_fails() {
        let keypair = KeyPair::generate();
        let mut bundle = sign(b"payload", &keypair).unwrap();
        // Flip a byte inside the point encoding (not the format prefix).
        bundle.public_key[10] ^= 0xff;
        let result = verify(b"payload", &bundle);
        assert!(matches!(
            result,
            Err(CryptoError::InvalidSignature) | Err(CryptoError::MalformedPublicKey)
        ));
    }

    #[test]
    fn private_key_rederives_the_same_public() {
        let keypair = KeyPair::generate();
        let rebuilt = KeyPair::from_private(&keypair.private).unwrap();
        assert_eq!(rebuilt.public, keypair.public);
    }
}
