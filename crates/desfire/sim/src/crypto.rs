//! Cryptography of the simulated three-pass mutual authentication
//!
//! Both sides encrypt with the shared key in CBC mode from a zero IV. The card
//! sends `ek(RndB)`, the reader answers `ek(RndA || RndB')` and the card closes
//! with `ek(RndA')`, where `X'` is `X` rotated left by one byte.

use cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::NoPadding};
use nexum_desfire::{KeyMaterial, KeyVariant, TransportError};
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroizing;

type DesEncryptor = cbc::Encryptor<des::Des>;
type DesDecryptor = cbc::Decryptor<des::Des>;
type AesEncryptor = cbc::Encryptor<aes::Aes128>;
type AesDecryptor = cbc::Decryptor<aes::Aes128>;

/// Failure of a cipher operation
#[derive(Debug, Error)]
pub(crate) enum CryptoError {
    #[error("invalid key or IV length")]
    InvalidLength,

    #[error("data is not a whole number of {0} byte blocks")]
    BlockLength(usize),
}

impl From<CryptoError> for TransportError {
    fn from(error: CryptoError) -> Self {
        Self::other(error.to_string())
    }
}

/// Cipher block size for a key
pub(crate) const fn block_size(key: &KeyMaterial) -> usize {
    match key.variant() {
        KeyVariant::Des => 8,
        KeyVariant::Aes => 16,
    }
}

/// Encrypt `data` in place
pub(crate) fn encrypt(key: &KeyMaterial, data: &mut [u8]) -> Result<(), CryptoError> {
    let len = check_blocks(key, data)?;
    let iv = [0u8; 16];
    let iv = &iv[..block_size(key)];

    let result = match key.variant() {
        KeyVariant::Des => DesEncryptor::new_from_slices(key.as_bytes(), iv)
            .map_err(|_| CryptoError::InvalidLength)?
            .encrypt_padded_mut::<NoPadding>(data, len)
            .map(|_| ()),
        KeyVariant::Aes => AesEncryptor::new_from_slices(key.as_bytes(), iv)
            .map_err(|_| CryptoError::InvalidLength)?
            .encrypt_padded_mut::<NoPadding>(data, len)
            .map(|_| ()),
    };
    result.map_err(|_| CryptoError::BlockLength(block_size(key)))
}

/// Decrypt `data` in place
pub(crate) fn decrypt(key: &KeyMaterial, data: &mut [u8]) -> Result<(), CryptoError> {
    check_blocks(key, data)?;
    let iv = [0u8; 16];
    let iv = &iv[..block_size(key)];

    let result = match key.variant() {
        KeyVariant::Des => DesDecryptor::new_from_slices(key.as_bytes(), iv)
            .map_err(|_| CryptoError::InvalidLength)?
            .decrypt_padded_mut::<NoPadding>(data)
            .map(|_| ()),
        KeyVariant::Aes => AesDecryptor::new_from_slices(key.as_bytes(), iv)
            .map_err(|_| CryptoError::InvalidLength)?
            .decrypt_padded_mut::<NoPadding>(data)
            .map(|_| ()),
    };
    result.map_err(|_| CryptoError::BlockLength(block_size(key)))
}

fn check_blocks(key: &KeyMaterial, data: &[u8]) -> Result<usize, CryptoError> {
    let block = block_size(key);
    if data.is_empty() || data.len() % block != 0 {
        return Err(CryptoError::BlockLength(block));
    }
    Ok(data.len())
}

/// Fresh random challenge of one cipher block
pub(crate) fn challenge(key: &KeyMaterial) -> Zeroizing<Vec<u8>> {
    let mut nonce = Zeroizing::new(vec![0u8; block_size(key)]);
    rand::rng().fill_bytes(&mut nonce);
    nonce
}

/// Rotate left by one byte
pub(crate) fn rotate(data: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut rotated = Zeroizing::new(data.to_vec());
    rotated.rotate_left(1);
    rotated
}

/// Reader side of the handshake
///
/// Decrypts the card's challenge and builds the answer token. Returns the token
/// and the reader's own challenge, which the card must echo rotated.
pub(crate) fn answer_challenge(
    key: &KeyMaterial,
    encrypted_rnd_b: &[u8],
) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>), CryptoError> {
    let mut rnd_b = Zeroizing::new(encrypted_rnd_b.to_vec());
    decrypt(key, &mut rnd_b)?;

    let rnd_a = challenge(key);
    let mut token = Vec::with_capacity(rnd_a.len() * 2);
    token.extend_from_slice(&rnd_a);
    token.extend_from_slice(&rotate(&rnd_b));
    encrypt(key, &mut token)?;

    Ok((token, rnd_a))
}

/// Reader side check of the card's final answer
pub(crate) fn verify_answer(
    key: &KeyMaterial,
    rnd_a: &[u8],
    encrypted_rnd_a: &[u8],
) -> Result<bool, CryptoError> {
    let mut answer = Zeroizing::new(encrypted_rnd_a.to_vec());
    decrypt(key, &mut answer)?;
    Ok(answer.as_slice() == rotate(rnd_a).as_slice())
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_des_known_answer() {
        // FIPS 81 single DES test vector, CBC with zero IV on one block
        let key = KeyMaterial::from_bytes(&hex!("0123456789ABCDEF")).unwrap();
        let mut block = hex!("4E6F772069732074");
        encrypt(&key, &mut block).unwrap();
        assert_eq!(block, hex!("3FA40E8A984D4815"));

        decrypt(&key, &mut block).unwrap();
        assert_eq!(block, hex!("4E6F772069732074"));
    }

    #[test]
    fn test_aes_known_answer() {
        // FIPS 197 appendix C.1
        let key = KeyMaterial::from_bytes(&hex!("000102030405060708090A0B0C0D0E0F")).unwrap();
        let mut block = hex!("00112233445566778899AABBCCDDEEFF");
        encrypt(&key, &mut block).unwrap();
        assert_eq!(block, hex!("69C4E0D86A7B0430D8CDB78070B4C55A"));
    }

    #[test]
    fn test_partial_block_rejected() {
        let key = KeyMaterial::default_aes();
        let mut data = [0u8; 15];
        assert!(matches!(
            encrypt(&key, &mut data),
            Err(CryptoError::BlockLength(16))
        ));
        assert!(decrypt(&key, &mut []).is_err());
    }

    #[test]
    fn test_handshake_tokens() {
        let key = KeyMaterial::default_des();
        let rnd_b = hex!("CF62E7B53ED842CB");
        let mut encrypted_rnd_b = rnd_b;
        encrypt(&key, &mut encrypted_rnd_b).unwrap();

        let (mut token, rnd_a) = answer_challenge(&key, &encrypted_rnd_b).unwrap();
        assert_eq!(token.len(), 16);
        decrypt(&key, &mut token).unwrap();
        assert_eq!(&token[..8], rnd_a.as_slice());
        assert_eq!(&token[8..], &hex!("62E7B53ED842CBCF"));

        let mut answer = rotate(&rnd_a);
        encrypt(&key, &mut answer).unwrap();
        assert!(verify_answer(&key, &rnd_a, &answer).unwrap());
        assert!(!verify_answer(&key, &rnd_a, &encrypted_rnd_b).unwrap());
    }

    #[test]
    fn test_errors_surface_as_transport_errors() {
        assert_eq!(
            TransportError::from(CryptoError::InvalidLength),
            TransportError::other("invalid key or IV length")
        );
        assert_eq!(
            TransportError::from(CryptoError::BlockLength(8)),
            TransportError::other("data is not a whole number of 8 byte blocks")
        );
    }
}
