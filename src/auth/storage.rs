use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::RngCore;
use std::fs;
use std::path::{Path, PathBuf};

use super::Credential;

const AUTH_FILE: &str = "auth.dat";
const NONCE_SIZE: usize = 12;
/// Leading byte of every sealed file, bumped if the layout changes
const FORMAT_VERSION: u8 = 1;
const KEY_SEED: &[u8] = b"fusion-launcher-credential-key-v1";

/// Encrypted on-disk copy of the signed-in credential.
///
/// Layout: version byte, 12-byte nonce, AES-256-GCM ciphertext.
pub struct CredentialStorage {
    path: PathBuf,
    cipher: Aes256Gcm,
}

fn storage_key() -> [u8; 32] {
    let mut key = [0u8; 32];
    key.iter_mut()
        .zip(KEY_SEED.iter().cycle())
        .for_each(|(k, s)| *k = *s);
    key
}

impl CredentialStorage {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(AUTH_FILE),
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&storage_key())),
        }
    }

    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, String> {
        let mut nonce = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| format!("Failed to encrypt credential: {}", e))?;

        let mut sealed = Vec::with_capacity(1 + NONCE_SIZE + ciphertext.len());
        sealed.push(FORMAT_VERSION);
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, String> {
        match sealed.split_first() {
            Some((&FORMAT_VERSION, rest)) if rest.len() > NONCE_SIZE => {
                let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);
                self.cipher
                    .decrypt(Nonce::from_slice(nonce), ciphertext)
                    .map_err(|e| format!("Failed to decrypt credential: {}", e))
            }
            Some((&FORMAT_VERSION, _)) => Err("Auth file is truncated".to_string()),
            Some((version, _)) => Err(format!("Unknown auth file format {}", version)),
            None => Err("Auth file is empty".to_string()),
        }
    }

    pub fn store(&self, credential: &Credential) -> Result<(), String> {
        let json = serde_json::to_vec(credential)
            .map_err(|e| format!("Failed to serialize credential: {}", e))?;

        let sealed = self.seal(&json)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create data directory: {}", e))?;
        }
        fs::write(&self.path, &sealed)
            .map_err(|e| format!("Failed to write auth file: {}", e))?;

        tracing::debug!("Credential stored securely");

        Ok(())
    }

    pub fn load(&self) -> Result<Option<Credential>, String> {
        if !self.path.exists() {
            return Ok(None);
        }

        let sealed =
            fs::read(&self.path).map_err(|e| format!("Failed to read auth file: {}", e))?;

        let decrypted = match self.open(&sealed) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Discarding unreadable auth file: {}", e);
                fs::remove_file(&self.path).ok();
                return Ok(None);
            }
        };

        let credential: Credential = serde_json::from_slice(&decrypted)
            .map_err(|e| format!("Failed to parse credential: {}", e))?;

        Ok(Some(credential))
    }

    pub fn clear(&self) -> Result<(), String> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|e| format!("Failed to delete auth file: {}", e))?;
            tracing::debug!("Stored credential cleared");
        }

        Ok(())
    }
}
