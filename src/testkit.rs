//! In-memory collaborator fakes shared by the engine tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use meetsync_core::error::{MeetSyncError, MeetSyncResult};
use meetsync_core::protocol::{
    CancelMeeting, ConferenceRecord, CreateMeeting, NewSlot, RemovedSlots, UpdateMeeting,
};
use meetsync_core::slot::{
    EncryptedPayload, Slot, SlotInstance, SlotOwner, SlotRecord, SlotSeries, SlotStatus,
    parse_ghost_instance_id,
};
use meetsync_core::window::DateWindow;

use crate::context::{EngineConfig, EngineContext};
use crate::transport::{AccountDirectory, AccountProfile, EnvelopeCipher, SlotTransport};

pub const FALLBACK_KEY: &str = "pk:fallback";
pub const SERVER_KEY: &str = "pk:server";

/// Key-value slot store applying requests verbatim.
#[derive(Default)]
pub struct MemoryStore {
    pub records: Mutex<HashMap<String, SlotRecord>>,
    pub conference: Mutex<Option<ConferenceRecord>>,
    /// Addresses whose calendars report busy.
    pub busy: Mutex<Vec<String>>,
    /// Addresses whose availability check fails outright.
    pub availability_outage: Mutex<Vec<String>>,
    pub last_update: Mutex<Option<UpdateMeeting>>,
    pub last_cancel: Mutex<Option<CancelMeeting>>,
}

impl MemoryStore {
    pub fn insert(&self, record: SlotRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.id().to_string(), record);
    }

    pub fn mark_busy(&self, address: &str) {
        self.busy.lock().unwrap().push(address.to_lowercase());
    }

    pub fn break_availability(&self, address: &str) {
        self.availability_outage
            .lock()
            .unwrap()
            .push(address.to_lowercase());
    }
}

fn slot_view(new: &NewSlot) -> Slot {
    Slot {
        id: new.id.clone(),
        owner: new.owner.clone(),
        start: new.start,
        end: new.end,
        version: new.version,
        payload: Some(new.payload.clone()),
        content_hash: Some(new.content_hash.clone()),
        status: SlotStatus::Confirmed,
    }
}

fn record_from_new(new: &NewSlot) -> SlotRecord {
    if let Some(rrule) = &new.rrule {
        return SlotRecord::Series(SlotSeries {
            id: new.id.clone(),
            owner: new.owner.clone(),
            start: new.start,
            end: new.end,
            version: new.version,
            payload: Some(new.payload.clone()),
            content_hash: Some(new.content_hash.clone()),
            rrule: rrule.clone(),
        });
    }
    if let Some((series_id, _)) = parse_ghost_instance_id(&new.id) {
        return SlotRecord::Instance(SlotInstance {
            id: new.id.clone(),
            series_id: Some(series_id.to_string()),
            owner: new.owner.clone(),
            start: new.start,
            end: new.end,
            version: new.version,
            payload: Some(new.payload.clone()),
            content_hash: Some(new.content_hash.clone()),
            status: SlotStatus::Confirmed,
            ghost: false,
        });
    }
    SlotRecord::Single(slot_view(new))
}

fn patched(record: &SlotRecord, patch: &meetsync_core::protocol::SlotPatch) -> SlotRecord {
    let mut updated = record.clone();
    match &mut updated {
        SlotRecord::Single(s) => {
            s.start = patch.start;
            s.end = patch.end;
            s.version = patch.version;
            s.payload = Some(patch.payload.clone());
            s.content_hash = Some(patch.content_hash.clone());
        }
        SlotRecord::Series(s) => {
            s.start = patch.start;
            s.end = patch.end;
            s.version = patch.version;
            s.payload = Some(patch.payload.clone());
            s.content_hash = Some(patch.content_hash.clone());
        }
        SlotRecord::Instance(s) => {
            s.start = patch.start;
            s.end = patch.end;
            s.version = patch.version;
            s.payload = Some(patch.payload.clone());
            s.content_hash = Some(patch.content_hash.clone());
        }
    }
    updated
}

#[async_trait]
impl SlotTransport for MemoryStore {
    async fn create_meeting(&self, request: &CreateMeeting) -> MeetSyncResult<Vec<Slot>> {
        let mut records = self.records.lock().unwrap();
        let mut created = Vec::new();
        for new in &request.slots {
            records.insert(new.id.clone(), record_from_new(new));
            created.push(slot_view(new));
        }
        *self.conference.lock().unwrap() = request.conference.clone();
        Ok(created)
    }

    async fn update_meeting(&self, request: &UpdateMeeting) -> MeetSyncResult<Vec<Slot>> {
        let mut records = self.records.lock().unwrap();
        let mut surviving = Vec::new();

        for patch in &request.patches {
            let record = records.get(&patch.slot_id).ok_or_else(|| {
                MeetSyncError::from_transport_status(404, patch.slot_id.clone())
            })?;
            let updated = patched(record, patch);
            records.insert(patch.slot_id.clone(), updated.clone());
            surviving.push(Slot {
                id: updated.id().to_string(),
                owner: updated.owner().clone(),
                start: updated.start(),
                end: updated.end(),
                version: updated.version(),
                payload: updated.payload().cloned(),
                content_hash: updated.content_hash().map(String::from),
                status: SlotStatus::Confirmed,
            });
        }
        for slot_id in &request.remove {
            records.remove(slot_id);
        }
        for new in &request.add {
            records.insert(new.id.clone(), record_from_new(new));
            surviving.push(slot_view(new));
        }
        if request.conference.is_some() {
            *self.conference.lock().unwrap() = request.conference.clone();
        }

        *self.last_update.lock().unwrap() = Some(request.clone());
        Ok(surviving)
    }

    async fn cancel_meeting(&self, request: &CancelMeeting) -> MeetSyncResult<RemovedSlots> {
        let mut records = self.records.lock().unwrap();
        records
            .remove(&request.slot_id)
            .ok_or_else(|| MeetSyncError::from_transport_status(404, request.slot_id.clone()))?;
        *self.last_cancel.lock().unwrap() = Some(request.clone());
        Ok(RemovedSlots {
            ids: vec![request.slot_id.clone()],
        })
    }

    async fn fetch_slot(&self, slot_id: &str) -> MeetSyncResult<Option<SlotRecord>> {
        Ok(self.records.lock().unwrap().get(slot_id).cloned())
    }

    async fn fetch_slots(&self, slot_ids: &[String]) -> MeetSyncResult<Vec<SlotRecord>> {
        let records = self.records.lock().unwrap();
        Ok(slot_ids
            .iter()
            .filter_map(|id| records.get(id).cloned())
            .collect())
    }

    async fn is_available(
        &self,
        owner: &SlotOwner,
        _window: &DateWindow,
        _ignore_meeting: Option<&str>,
    ) -> MeetSyncResult<bool> {
        match owner {
            SlotOwner::Account(address) => {
                let address = address.to_lowercase();
                if self.availability_outage.lock().unwrap().contains(&address) {
                    return Err(MeetSyncError::from_transport_status(
                        503,
                        "availability backend down",
                    ));
                }
                Ok(!self.busy.lock().unwrap().contains(&address))
            }
            SlotOwner::Guest(_) => Ok(true),
        }
    }
}

/// Directory backed by a fixed address → public key map.
#[derive(Default)]
pub struct MemoryDirectory {
    pub keys: HashMap<String, String>,
}

impl MemoryDirectory {
    pub fn with_keys(pairs: &[(&str, &str)]) -> Self {
        MemoryDirectory {
            keys: pairs
                .iter()
                .map(|(address, key)| (address.to_lowercase(), key.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl AccountDirectory for MemoryDirectory {
    async fn resolve(&self, address: &str) -> MeetSyncResult<Option<AccountProfile>> {
        Ok(self
            .keys
            .get(&address.to_lowercase())
            .map(|key| AccountProfile {
                address: address.to_string(),
                public_key: Some(key.clone()),
                display_name: None,
            }))
    }

    async fn resolve_many(&self, addresses: &[String]) -> MeetSyncResult<Vec<AccountProfile>> {
        let mut profiles = Vec::new();
        for address in addresses {
            if let Some(profile) = self.resolve(address).await? {
                profiles.push(profile);
            }
        }
        Ok(profiles)
    }
}

/// Toy asymmetric cipher: the payload remembers the public key it was
/// sealed for, and only matching key material opens it.
#[derive(Default)]
pub struct MemoryCipher {
    pub decrypt_calls: AtomicUsize,
}

#[async_trait]
impl EnvelopeCipher for MemoryCipher {
    async fn encrypt(&self, public_key: &str, plaintext: &str) -> MeetSyncResult<EncryptedPayload> {
        Ok(EncryptedPayload(json!({
            "key": public_key,
            "body": plaintext,
        })))
    }

    async fn decrypt(
        &self,
        key_material: &str,
        payload: &EncryptedPayload,
    ) -> MeetSyncResult<String> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        let sealed_for = payload.0["key"].as_str().unwrap_or_default();
        if sealed_for != key_material {
            return Err(MeetSyncError::DecryptionFailed);
        }
        Ok(payload.0["body"].as_str().unwrap_or_default().to_string())
    }
}

pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub directory: Arc<MemoryDirectory>,
    pub cipher: Arc<MemoryCipher>,
    pub ctx: EngineContext,
}

/// Wire a context over fresh fakes, registering public keys for the given
/// addresses.
pub fn harness(keys: &[(&str, &str)]) -> TestHarness {
    let store = Arc::new(MemoryStore::default());
    let directory = Arc::new(MemoryDirectory::with_keys(keys));
    let cipher = Arc::new(MemoryCipher::default());
    let ctx = EngineContext::new(
        EngineConfig::new(FALLBACK_KEY, SERVER_KEY),
        store.clone(),
        directory.clone(),
        cipher.clone(),
    );
    TestHarness {
        store,
        directory,
        cipher,
        ctx,
    }
}
