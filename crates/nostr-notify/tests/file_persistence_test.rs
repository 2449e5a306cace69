use nostr_notify::{
    normalize_at, FileStorageAdapter, HistoryStore, Identity, InboundEvent, Result, Settings,
    StorageAdapter, HISTORY_CAPACITY, HISTORY_STORAGE_KEY,
};
use nostr::{EventId, Keys, Timestamp};
use std::sync::Arc;
use tempfile::TempDir;

fn open(dir: &TempDir) -> Arc<dyn StorageAdapter> {
    Arc::new(FileStorageAdapter::new(dir.path().to_path_buf()).unwrap())
}

#[test]
fn settings_persist_across_reopen() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let identity = Identity::generate();

    Settings::new(open(&dir)).save(&identity.secret_hex(), "wss://relay.damus.io\nwss://nos.lol")?;

    let settings = Settings::new(open(&dir));
    let loaded = settings.require_identity()?;
    assert_eq!(loaded.public_key(), identity.public_key());
    assert_eq!(settings.relays()?.len(), 2);
    Ok(())
}

#[test]
fn history_snapshot_on_disk_matches_memory() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let sender = Keys::generate();
    let mut history = HistoryStore::load(open(&dir), HISTORY_CAPACITY);

    for i in 0..3u8 {
        let event = InboundEvent {
            id: EventId::from_byte_array([i; 32]),
            pubkey: sender.public_key(),
            content: String::new(),
            created_at: Timestamp::from(1_700_000_000),
        };
        let n = normalize_at(&format!(r#"{{"message":"m{}"}}"#, i), &event, i as u64).unwrap();
        history.insert(n).unwrap();
    }

    let on_disk = std::fs::read_to_string(dir.path().join(format!("{}.json", HISTORY_STORAGE_KEY)))
        .unwrap();
    assert_eq!(on_disk, serde_json::to_string(history.all())?);

    let reloaded = HistoryStore::load(open(&dir), HISTORY_CAPACITY);
    let messages: Vec<_> = reloaded.all().iter().map(|n| n.message.as_str()).collect();
    assert_eq!(messages, vec!["m2", "m1", "m0"]);
    Ok(())
}

#[test]
fn garbage_snapshot_on_disk_loads_empty() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(format!("{}.json", HISTORY_STORAGE_KEY)),
        "[{\"id\": 1",
    )
    .unwrap();

    let history = HistoryStore::load(open(&dir), HISTORY_CAPACITY);
    assert!(history.is_empty());
}
