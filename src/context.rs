//! Engine configuration and context.
//!
//! Every engine call receives an explicit [`EngineContext`] carrying the
//! configuration, the collaborator handles and the decrypt cache. There is
//! no process-wide state.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use meetsync_core::error::{MeetSyncError, MeetSyncResult};

use crate::decrypt::DecryptCache;
use crate::transport::{AccountDirectory, EnvelopeCipher, SlotTransport};

fn default_max_occurrences() -> u16 {
    365
}

/// Static engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Well-known public key used for participants without a registered key
    /// (guests invited by email).
    pub fallback_public_key: String,
    /// Key the conference copy is sealed with, letting the server resolve
    /// guest slot siblings.
    pub server_public_key: String,
    /// Cap on occurrences enumerated per series during expansion.
    #[serde(default = "default_max_occurrences")]
    pub max_occurrences: u16,
}

impl EngineConfig {
    pub fn new(fallback_public_key: impl Into<String>, server_public_key: impl Into<String>) -> Self {
        EngineConfig {
            fallback_public_key: fallback_public_key.into(),
            server_public_key: server_public_key.into(),
            max_occurrences: default_max_occurrences(),
        }
    }

    /// Load from a TOML file. Embedding applications usually construct the
    /// config directly instead.
    pub fn from_file(path: &Path) -> MeetSyncResult<Self> {
        config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .map_err(|e| MeetSyncError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| MeetSyncError::Config(e.to_string()))
    }
}

/// Everything an engine call needs, passed explicitly.
#[derive(Clone)]
pub struct EngineContext {
    pub config: EngineConfig,
    pub transport: Arc<dyn SlotTransport>,
    pub directory: Arc<dyn AccountDirectory>,
    pub cipher: Arc<dyn EnvelopeCipher>,
    pub decrypt_cache: Arc<DecryptCache>,
}

impl EngineContext {
    pub fn new(
        config: EngineConfig,
        transport: Arc<dyn SlotTransport>,
        directory: Arc<dyn AccountDirectory>,
        cipher: Arc<dyn EnvelopeCipher>,
    ) -> Self {
        EngineContext {
            config,
            transport,
            directory,
            cipher,
            decrypt_cache: Arc::new(DecryptCache::default()),
        }
    }
}
