//! Field-level encryption for the persisted connection list.
//!
//! Values are sealed with AES-256-GCM. A random 12-byte nonce is prepended
//! to the ciphertext and the whole thing is stored as base64 text.
//!
//! The key is a base64-encoded 32-byte value taken from the `TRELLIS_KEY`
//! environment variable or, failing that, from a dotenv-style key file. If
//! neither provides one, a fresh key is generated and written to the file.

use crate::error::{Result, TrellisError};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use std::fs::OpenOptions;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;
use tracing::{debug, info};

/// Name of the variable holding the key, in the environment or key file.
pub const KEY_VAR: &str = "TRELLIS_KEY";

/// The length of an AES-256 key in bytes.
pub const KEY_LENGTH: usize = 32;

/// Encrypts and decrypts individual connection fields.
#[derive(Clone)]
pub struct FieldCipher {
    key: [u8; KEY_LENGTH],
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher").finish_non_exhaustive()
    }
}

impl FieldCipher {
    /// Creates a cipher from raw key bytes.
    pub fn new(key: &[u8; KEY_LENGTH]) -> Result<Self> {
        let cipher = Self { key: *key };
        cipher.aead_key()?;
        Ok(cipher)
    }

    fn aead_key(&self) -> Result<LessSafeKey> {
        let unbound = UnboundKey::new(&AES_256_GCM, &self.key)
            .map_err(|_| TrellisError::crypto("invalid key"))?;
        Ok(LessSafeKey::new(unbound))
    }

    /// Creates a cipher from a base64-encoded key.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        Self::new(&decode_key(encoded)?)
    }

    /// Loads the key from `TRELLIS_KEY` or `key_file`, creating the file
    /// with a new key when neither has one.
    pub fn load_or_create(key_file: &Path) -> Result<Self> {
        Self::resolve(std::env::var(KEY_VAR).ok(), key_file)
    }

    fn resolve(env_key: Option<String>, key_file: &Path) -> Result<Self> {
        if let Some(encoded) = env_key.filter(|k| !k.trim().is_empty()) {
            debug!("Using encryption key from {}", KEY_VAR);
            return Self::from_base64(encoded.trim());
        }

        if let Some(encoded) = read_key_file(key_file)? {
            debug!("Using encryption key from {}", key_file.display());
            return Self::from_base64(&encoded);
        }

        let key = generate_key()?;
        write_key_file(key_file, &BASE64.encode(key))?;
        info!("Generated a new encryption key at {}", key_file.display());
        Self::new(&key)
    }

    /// Encrypts `plaintext` to base64 text.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        SystemRandom::new()
            .fill(&mut nonce_bytes)
            .map_err(|_| TrellisError::crypto("failed to generate nonce"))?;

        let mut in_out = plaintext.as_bytes().to_vec();
        self.aead_key()?
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| TrellisError::crypto("encryption failed"))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);
        Ok(BASE64.encode(sealed))
    }

    /// Decrypts base64 text produced by [`FieldCipher::encrypt`].
    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let data = BASE64
            .decode(ciphertext)
            .map_err(|e| TrellisError::crypto(format!("invalid ciphertext: {e}")))?;
        if data.len() < NONCE_LEN {
            return Err(TrellisError::crypto("invalid ciphertext: too short"));
        }

        let (nonce_bytes, sealed) = data.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| TrellisError::crypto("invalid nonce"))?;

        let mut in_out = sealed.to_vec();
        let key = self.aead_key()?;
        let plaintext = key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| TrellisError::crypto("decryption failed (wrong key?)"))?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|_| TrellisError::crypto("decrypted value is not UTF-8"))
    }

    /// Encrypts an optional field. Absent, empty and `"None"` values are
    /// stored as they are.
    pub fn encrypt_field(&self, value: Option<&str>) -> Result<Option<String>> {
        match value {
            Some(v) if !is_blank(v) => self.encrypt(v).map(Some),
            other => Ok(other.map(String::from)),
        }
    }

    /// Decrypts an optional field; the inverse of [`FieldCipher::encrypt_field`].
    pub fn decrypt_field(&self, value: Option<&str>) -> Result<Option<String>> {
        match value {
            Some(v) if !is_blank(v) => self.decrypt(v).map(Some),
            other => Ok(other.map(String::from)),
        }
    }
}

fn is_blank(value: &str) -> bool {
    value.is_empty() || value == "None"
}

/// Generates a random 32-byte key.
pub fn generate_key() -> Result<[u8; KEY_LENGTH]> {
    let mut key = [0u8; KEY_LENGTH];
    SystemRandom::new()
        .fill(&mut key)
        .map_err(|_| TrellisError::crypto("failed to generate key"))?;
    Ok(key)
}

/// Decodes a base64-encoded key, checking its length.
pub fn decode_key(encoded: &str) -> Result<[u8; KEY_LENGTH]> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| TrellisError::crypto(format!("key is not valid base64: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| TrellisError::crypto(format!("invalid key length: expected {KEY_LENGTH} bytes")))
}

fn read_key_file(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }

    let entries = dotenvy::from_path_iter(path)
        .map_err(|e| TrellisError::crypto(format!("Failed to read {}: {e}", path.display())))?;
    for entry in entries {
        let (name, value) = entry
            .map_err(|e| TrellisError::crypto(format!("Malformed key file {}: {e}", path.display())))?;
        if name == KEY_VAR && !value.trim().is_empty() {
            return Ok(Some(value.trim().to_string()));
        }
    }
    Ok(None)
}

fn write_key_file(path: &Path, encoded: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            TrellisError::crypto(format!("Failed to create {}: {e}", parent.display()))
        })?;
    }

    // Keep any other variables already in the file.
    let mut content = if path.exists() {
        std::fs::read_to_string(path)
            .map_err(|e| TrellisError::crypto(format!("Failed to read {}: {e}", path.display())))?
    } else {
        String::new()
    };
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(&format!("{KEY_VAR}={encoded}\n"));

    let write_error = |e: std::io::Error| {
        TrellisError::crypto(format!("Failed to write {}: {e}", path.display()))
    };

    // The key unlocks every stored credential, so only the owner may read it.
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).map_err(write_error)?;
    file.write_all(content.as_bytes()).map_err(write_error)?;

    // `mode` only applies on creation; tighten a key file that already existed.
    #[cfg(unix)]
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(write_error)?;

    Ok(())
}
