pub mod disk;
pub mod memory;

use crate::config::AppConfig;
use crate::core::cache::RateCache;
use crate::core::prefs::PreferenceStore;
use anyhow::Result;
use disk::{FjallPreferenceStore, FjallRateCache};
use fjall::{Keyspace, PartitionCreateOptions};
use memory::{MemoryPreferenceStore, MemoryRateCache};
use std::sync::Arc;
use tracing::warn;

const RATES_PARTITION: &str = "rates";
const PREFERENCES_PARTITION: &str = "preferences";

/// The persisted-state boundary: the shared rate cache and the per-user
/// preference records. Keeps the keyspace alive for as long as the
/// partition-backed stores are in use.
pub struct Stores {
    pub rates: Arc<dyn RateCache>,
    pub preferences: Arc<dyn PreferenceStore>,
    _keyspace: Option<Keyspace>,
}

/// Opens the fjall keyspace under the configured data path, falling
/// back to in-memory stores when it cannot be opened. The app stays
/// usable either way; only durability is lost.
pub fn open(config: &AppConfig) -> Stores {
    match open_disk(config) {
        Ok(stores) => stores,
        Err(e) => {
            warn!("Persistent store unavailable ({}), using in-memory stores", e);
            Stores {
                rates: Arc::new(MemoryRateCache::new()),
                preferences: Arc::new(MemoryPreferenceStore::new()),
                _keyspace: None,
            }
        }
    }
}

fn open_disk(config: &AppConfig) -> Result<Stores> {
    let dir = config.default_data_path()?.join("store");
    let keyspace = fjall::Config::new(dir).open()?;

    let rates = keyspace.open_partition(RATES_PARTITION, PartitionCreateOptions::default())?;
    let preferences =
        keyspace.open_partition(PREFERENCES_PARTITION, PartitionCreateOptions::default())?;

    Ok(Stores {
        rates: Arc::new(FjallRateCache::new(rates)),
        preferences: Arc::new(FjallPreferenceStore::new(preferences)),
        _keyspace: Some(keyspace),
    })
}
