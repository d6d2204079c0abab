use aes::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use crc::{Crc, CRC_32_CKSUM};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::EncodePublicKey;
use rsa::{BigUint, Oaep, RsaPrivateKey};
use sha1::Sha1;

use crate::error::{ClientError, Result};
use crate::{AES_BLOCK_SIZE, AES_KEY_SIZE, PUBLIC_KEY_SIZE, RSA_KEY_BITS};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;

/// Public exponent fixed by the server contract: together with the 1024-bit
/// modulus it keeps the X.509 SubjectPublicKeyInfo encoding at exactly
/// [`PUBLIC_KEY_SIZE`] bytes, which is the width of the wire field.
const RSA_PUBLIC_EXPONENT: u32 = 17;

const CKSUM: Crc<u32> = Crc::<u32>::new(&CRC_32_CKSUM);

/// Generates the client's RSA keypair.
///
/// Called exactly once per identity, at registration time. The private key
/// lives for the installation; the public half is returned in the DER form
/// the wire expects.
///
/// # Returns
/// The private key and the 160-byte SubjectPublicKeyInfo blob to submit to
/// the server.
pub fn generate_rsa_keypair() -> Result<(RsaPrivateKey, [u8; PUBLIC_KEY_SIZE])> {
    let mut rng = rand::thread_rng();
    let private_key = RsaPrivateKey::new_with_exp(
        &mut rng,
        RSA_KEY_BITS,
        &BigUint::from(RSA_PUBLIC_EXPONENT),
    )
    .map_err(|e| ClientError::Crypto(format!("RSA key generation failed: {e}")))?;

    let der = private_key
        .to_public_key()
        .to_public_key_der()
        .map_err(|e| ClientError::Crypto(format!("public key encoding failed: {e}")))?;
    let blob: [u8; PUBLIC_KEY_SIZE] = der.as_bytes().try_into().map_err(|_| {
        ClientError::Crypto(format!(
            "public key DER is {} bytes, the wire field holds exactly {PUBLIC_KEY_SIZE}",
            der.as_bytes().len()
        ))
    })?;

    Ok((private_key, blob))
}

/// Unwraps the server-issued session key.
///
/// The server generates a 256-bit AES key, encrypts it with RSAES-OAEP
/// under the client's public key, and ships it in the key-exchange
/// response. OAEP uses SHA-1 here for compatibility with the server.
pub fn unwrap_session_key(
    private_key: &RsaPrivateKey,
    wrapped: &[u8],
) -> Result<[u8; AES_KEY_SIZE]> {
    let plain = private_key
        .decrypt(Oaep::new::<Sha1>(), wrapped)
        .map_err(|e| ClientError::Crypto(format!("session key decryption failed: {e}")))?;
    plain.as_slice().try_into().map_err(|_| {
        ClientError::Crypto(format!(
            "unwrapped session key is {} bytes, expected {AES_KEY_SIZE}",
            plain.len()
        ))
    })
}

/// Encrypts the file bytes under the session key: AES-256-CBC with PKCS#7
/// padding.
///
/// The IV is a fixed all-zero block. That is required by the server
/// contract (the server decrypts with the same zero IV) and is NOT a safe
/// way to use CBC in general; do not reuse this function outside this
/// protocol.
pub fn encrypt_file(key: &[u8; AES_KEY_SIZE], plaintext: &[u8]) -> Vec<u8> {
    let iv = [0u8; AES_BLOCK_SIZE];
    Aes256CbcEnc::new(key.into(), (&iv).into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Ciphertext length [`encrypt_file`] produces for a plaintext of
/// `plain_len` bytes. PKCS#7 always adds between 1 and 16 padding bytes.
pub fn encrypted_len(plain_len: usize) -> usize {
    (plain_len / AES_BLOCK_SIZE + 1) * AES_BLOCK_SIZE
}

/// CRC-32 in the POSIX `cksum` flavor, which is what the server computes on
/// the decrypted upload: the 0x04C11DB7 polynomial over the data, then over
/// the data length (least significant byte first, as few bytes as
/// possible), complemented at the end.
///
/// Golden values: `"123456789"` → 930766865, `""` → 4294967295.
pub fn cksum(data: &[u8]) -> u32 {
    let mut digest = CKSUM.digest();
    digest.update(data);
    let mut len = data.len();
    while len > 0 {
        digest.update(&[(len & 0xFF) as u8]);
        len >>= 8;
    }
    digest.finalize()
}

/// Text-safe storage form of the private key: Base64 over the PKCS#1 DER.
pub fn encode_private_key(key: &RsaPrivateKey) -> Result<String> {
    let der = key
        .to_pkcs1_der()
        .map_err(|e| ClientError::Crypto(format!("private key encoding failed: {e}")))?;
    Ok(BASE64.encode(der.as_bytes()))
}

/// Inverse of [`encode_private_key`]; used on the reconnect path.
pub fn decode_private_key(encoded: &str) -> Result<RsaPrivateKey> {
    let der = BASE64
        .decode(encoded.trim())
        .map_err(|e| ClientError::Crypto(format!("private key is not valid base64: {e}")))?;
    RsaPrivateKey::from_pkcs1_der(&der)
        .map_err(|e| ClientError::Crypto(format!("private key DER decoding failed: {e}")))
}
