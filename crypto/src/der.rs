// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! DER `SubjectPublicKeyInfo` decoding.
//!
//! External signers hand the façade their public key in SPKI form
//! (`SEQUENCE { AlgorithmIdentifier, BIT STRING }`); the core only ever needs
//! the raw point bytes inside the bit string.

use crate::CryptoError;

const TAG_SEQUENCE: u8 = 0x30;
const TAG_BIT_STRING: u8 = 0x03;

/// Extracts the raw public key bytes from a DER-encoded
/// `SubjectPublicKeyInfo`.
pub fn decode_der_public_key(der: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let (outer, rest) = read_tlv(der, TAG_SEQUENCE)?;
    if !rest.is_empty() {
        return Err(CryptoError::MalformedDer("trailing bytes after SPKI"));
    }
    // AlgorithmIdentifier, skipped.
    let (_algorithm, after_algorithm) = read_tlv(outer, TAG_SEQUENCE)?;
    let (bit_string, after_key) = read_tlv(after_algorithm, TAG_BIT_STRING)?;
    if !after_key.is_empty() {
        return Err(CryptoError::MalformedDer("trailing bytes after key"));
    }
    // The first bit-string byte counts unused trailing bits; key bytes are
    // always octet-aligned.
    match bit_string.split_first() {
        Some((0, key)) if !key.is_empty() => Ok(key.to_vec()),
        Some((_, _)) => Err(CryptoError::MalformedDer("unaligned bit string")),
        None => Err(CryptoError::MalformedDer("empty bit string")),
    }
}

/// Reads one TLV element, returning its contents and the remainder of the
/// input. Long-form lengths up to two bytes are supported, which covers any
/// plausible public key.
fn read_tlv(input: &[u8], expected_tag: u8) -> Result<(&[u8], &[u8]), CryptoError> {
    let (&tag, after_tag) = input
        .split_first()
        .ok_or(CryptoError::MalformedDer("truncated element"))?;
    if tag != expected_tag {
        return Err(CryptoError::MalformedDer("unexpected tag"));
    }
    let (&first_len, after_len) = after_tag
        .split_first()
        .ok_or(CryptoError::MalformedDer("truncated length"))?;
    let (length, contents_start): (usize, &[u8]) = match first_len {
        len @ 0..=0x7f => (len as usize, after_len),
        0x81 => {
            let (&len, rest) = after_len
                .split_first()
                .ok_or(CryptoError::MalformedDer("truncated length"))?;
            (len as usize, rest)
        },
        0x82 => {
            if after_len.len() < 2 {
                return Err(CryptoError::MalformedDer("truncated length"));
            }
            let len = u16::from_be_bytes([after_len[0], after_len[1]]) as usize;
            (len, &after_len[2..])
        },
        _ => return Err(CryptoError::MalformedDer("unsupported length form")),
    };
    if contents_start.len() < length {
        return Err(CryptoError::MalformedDer("length overruns input"));
    }
    Ok(contents_start.split_at(length))
}
