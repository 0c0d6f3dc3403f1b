use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::core::item::Item;
use crate::core::list::List;
use crate::core::note::Note;
use crate::store::Store;
use crate::sync::gateway::{Gateway, GatewayError};
use crate::sync::SyncStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Items,
    Lists,
    Notes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Insert,
    Update,
    Delete,
}

/// A change record as delivered on the wire: full new/old row images.
#[derive(Debug, Clone, Deserialize)]
pub struct RawChange {
    pub table: Table,
    pub event_type: EventType,
    #[serde(default)]
    pub record: Value,
    #[serde(default)]
    pub old_record: Value,
}

/// Wire shape for note rows — the owning item travels with the note.
#[derive(Debug, Clone, Deserialize)]
struct NoteRecord {
    item_id: Uuid,
    #[serde(flatten)]
    note: Note,
}

#[derive(Debug, Clone)]
pub enum ChangeEvent {
    ItemInserted(Item),
    ItemUpdated(Item),
    ItemDeleted(Uuid),
    ListInserted(List),
    ListUpdated(List),
    ListDeleted(Uuid),
    NoteInserted { item_id: Uuid, note: Note },
    NoteUpdated { item_id: Uuid, note: Note },
    NoteDeleted { item_id: Uuid, note_id: Uuid },
}

impl ChangeEvent {
    /// Decode a raw wire change. Unparseable records are dropped with a log
    /// line rather than failing the whole batch.
    pub fn decode(raw: RawChange) -> Option<Self> {
        let event = match (raw.table, raw.event_type) {
            (Table::Items, EventType::Insert) => Self::ItemInserted(decode_row(raw.record)?),
            (Table::Items, EventType::Update) => Self::ItemUpdated(decode_row(raw.record)?),
            (Table::Items, EventType::Delete) => Self::ItemDeleted(row_id(&raw.old_record)?),
            (Table::Lists, EventType::Insert) => Self::ListInserted(decode_row(raw.record)?),
            (Table::Lists, EventType::Update) => Self::ListUpdated(decode_row(raw.record)?),
            (Table::Lists, EventType::Delete) => Self::ListDeleted(row_id(&raw.old_record)?),
            (Table::Notes, EventType::Insert) => {
                let NoteRecord { item_id, note } = decode_row(raw.record)?;
                Self::NoteInserted { item_id, note }
            }
            (Table::Notes, EventType::Update) => {
                let NoteRecord { item_id, note } = decode_row(raw.record)?;
                Self::NoteUpdated { item_id, note }
            }
            (Table::Notes, EventType::Delete) => {
                let item_id = field_id(&raw.old_record, "item_id")?;
                let note_id = row_id(&raw.old_record)?;
                Self::NoteDeleted { item_id, note_id }
            }
        };
        Some(event)
    }
}

fn decode_row<T: serde::de::DeserializeOwned>(record: Value) -> Option<T> {
    match serde_json::from_value(record) {
        Ok(row) => Some(row),
        Err(e) => {
            log::debug!("Skipping unparseable change record: {}", e);
            None
        }
    }
}

fn row_id(record: &Value) -> Option<Uuid> {
    field_id(record, "id")
}

fn field_id(record: &Value, field: &str) -> Option<Uuid> {
    record.get(field).and_then(|v| v.as_str()).and_then(|s| s.parse().ok())
}

/// Owns the realtime subscription lifecycle. Registration is idempotent (a
/// guard flag prevents a duplicate channel), and `stop` tears everything
/// down so a stale session never keeps receiving deliveries.
pub struct ChangeFeed<G> {
    gateway: G,
    cursor: Option<String>,
    lists: Vec<Uuid>,
    active: bool,
    pub status: SyncStatus,
}

impl<G: Gateway> ChangeFeed<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            cursor: None,
            lists: Vec::new(),
            active: false,
            status: SyncStatus::default(),
        }
    }

    /// Begin delivering changes for `lists`. Returns false if the feed was
    /// already running — the existing registration is kept.
    pub fn start(&mut self, lists: Vec<Uuid>) -> bool {
        if self.active {
            log::debug!("Change feed already running, keeping existing subscription");
            return false;
        }
        self.lists = lists;
        self.cursor = None;
        self.active = true;
        log::info!("Change feed started for {} lists", self.lists.len());
        true
    }

    /// Full teardown, called on sign-out or user change.
    pub fn stop(&mut self) {
        self.active = false;
        self.cursor = None;
        self.lists.clear();
        self.status = SyncStatus::Idle;
        log::info!("Change feed stopped");
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Update the list filter as lists are created and deleted.
    pub fn set_lists(&mut self, lists: Vec<Uuid>) {
        self.lists = lists;
    }

    /// Pull the next page of changes. An inactive feed yields nothing.
    pub async fn poll(&mut self) -> Result<Vec<ChangeEvent>, GatewayError> {
        if !self.active {
            return Ok(Vec::new());
        }
        self.status = SyncStatus::Syncing;
        match self.gateway.changes(self.cursor.as_deref(), &self.lists).await {
            Ok(batch) => {
                if batch.cursor.is_some() {
                    self.cursor = batch.cursor;
                }
                self.status =
                    SyncStatus::LastSynced(chrono::Local::now().format("%H:%M").to_string());
                Ok(batch.events)
            }
            Err(e) => {
                self.status = SyncStatus::Error(e.to_string());
                Err(e)
            }
        }
    }

    /// Poll once and fold the events into the store. Skipped entirely while
    /// a fresh local write is still propagating, so the feed never races
    /// ahead of the write's own effect.
    pub async fn pump<SG: Gateway>(
        &mut self,
        store: &mut Store<SG>,
    ) -> Result<usize, GatewayError> {
        if store.write_cooldown_active() {
            return Ok(0);
        }
        let events = self.poll().await?;
        let count = events.len();
        for event in events {
            store.apply_remote_event(event);
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::gateway::ChangeBatch;

    struct NullGateway;

    impl Gateway for NullGateway {
        async fn list_lists(&self) -> Result<Vec<List>, GatewayError> {
            Ok(Vec::new())
        }
        async fn create_list(
            &self,
            _draft: &crate::sync::gateway::ListDraft,
        ) -> Result<List, GatewayError> {
            Err(GatewayError::NotFound)
        }
        async fn update_list(
            &self,
            _id: Uuid,
            _patch: &crate::core::patch::ListPatch,
        ) -> Result<List, GatewayError> {
            Err(GatewayError::NotFound)
        }
        async fn delete_list(&self, _id: Uuid) -> Result<(), GatewayError> {
            Ok(())
        }
        async fn list_items(&self) -> Result<Vec<Item>, GatewayError> {
            Ok(Vec::new())
        }
        async fn create_item(
            &self,
            _draft: &crate::sync::gateway::ItemDraft,
        ) -> Result<Item, GatewayError> {
            Err(GatewayError::NotFound)
        }
        async fn update_item(
            &self,
            _id: Uuid,
            _patch: &crate::core::patch::ItemPatch,
        ) -> Result<Item, GatewayError> {
            Err(GatewayError::NotFound)
        }
        async fn delete_item(&self, _id: Uuid) -> Result<(), GatewayError> {
            Ok(())
        }
        async fn add_note(&self, _item_id: Uuid, _content: &str) -> Result<Note, GatewayError> {
            Err(GatewayError::NotFound)
        }
        async fn update_note(
            &self,
            _item_id: Uuid,
            _note_id: Uuid,
            _content: &str,
        ) -> Result<Note, GatewayError> {
            Err(GatewayError::NotFound)
        }
        async fn delete_note(&self, _item_id: Uuid, _note_id: Uuid) -> Result<(), GatewayError> {
            Ok(())
        }
        async fn add_attachment(
            &self,
            _item_id: Uuid,
            _upload: &crate::core::attachment::AttachmentUpload,
        ) -> Result<crate::core::attachment::Attachment, GatewayError> {
            Err(GatewayError::NotFound)
        }
        async fn delete_attachment(
            &self,
            _item_id: Uuid,
            _attachment_id: Uuid,
        ) -> Result<(), GatewayError> {
            Ok(())
        }
        async fn check_users_exist(
            &self,
            _emails: &[String],
        ) -> Result<Vec<crate::sync::gateway::UserCheck>, GatewayError> {
            Ok(Vec::new())
        }
        async fn changes(
            &self,
            _cursor: Option<&str>,
            _lists: &[Uuid],
        ) -> Result<ChangeBatch, GatewayError> {
            Ok(ChangeBatch::default())
        }
    }

    #[test]
    fn start_is_idempotent() {
        let mut feed = ChangeFeed::new(NullGateway);
        assert!(feed.start(vec![Uuid::new_v4()]));
        assert!(!feed.start(vec![Uuid::new_v4()]));
        assert!(feed.is_active());
    }

    #[test]
    fn stop_tears_the_subscription_down() {
        let mut feed = ChangeFeed::new(NullGateway);
        feed.start(vec![Uuid::new_v4()]);
        feed.stop();
        assert!(!feed.is_active());
        // A stopped feed can be started again for the next session.
        assert!(feed.start(Vec::new()));
    }

    #[tokio::test]
    async fn inactive_feed_yields_nothing() {
        let mut feed = ChangeFeed::new(NullGateway);
        assert!(feed.poll().await.unwrap().is_empty());
    }

    #[test]
    fn decode_reads_delete_ids_from_the_old_record() {
        let id = Uuid::new_v4();
        let raw = RawChange {
            table: Table::Items,
            event_type: EventType::Delete,
            record: Value::Null,
            old_record: serde_json::json!({ "id": id.to_string() }),
        };
        match ChangeEvent::decode(raw) {
            Some(ChangeEvent::ItemDeleted(got)) => assert_eq!(got, id),
            other => panic!("unexpected decode result: {:?}", other.is_some()),
        }
    }

    #[test]
    fn decode_drops_unparseable_records() {
        let raw = RawChange {
            table: Table::Items,
            event_type: EventType::Insert,
            record: serde_json::json!({ "nonsense": true }),
            old_record: Value::Null,
        };
        assert!(ChangeEvent::decode(raw).is_none());
    }
}
