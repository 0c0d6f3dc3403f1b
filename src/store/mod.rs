pub mod clock;
pub mod search;
pub mod views;


use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use thiserror::Error;
use uuid::Uuid;

use crate::core::attachment::{AttachmentUpload, MAX_ATTACHMENT_BYTES};
use crate::core::bucket::bucket_for_date;
use crate::core::item::{Item, ItemKind, ReminderStatus, Status, TaskStatus};
use crate::core::list::List;
use crate::core::note::HoldDirective;
use crate::core::patch::{ItemPatch, KindPatch, ListPatch};
use crate::core::item::ON_HOLD_KEY;
use crate::sync::gateway::{Gateway, GatewayError, ItemDraft, ListDraft};
use crate::sync::realtime::ChangeEvent;
use clock::{Clock, ExpiryMap};
use views::{DisplayMode, ListSelection, View};

/// How long a shared-list mutation may wait for realtime confirmation
/// before the in-flight marker lapses ("assume failed, stop waiting").
const IN_FLIGHT_TIMEOUT_SECS: i64 = 8;
/// How long a fresh local write is protected from being overwritten by a
/// background reload carrying stale pre-write state.
const RECENT_WRITE_WINDOW_SECS: i64 = 30;
/// Background reloads are skipped this soon after a local write.
const RELOAD_COOLDOWN_SECS: i64 = 5;
/// Hard ceiling on the initial load; after this `loading` is forced false.
const LOAD_CEILING_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),
    #[error("item not found")]
    ItemNotFound,
    #[error("list not found")]
    ListNotFound,
    #[error("loading timed out")]
    LoadTimeout,
    #[error("{failed} of {total} operations failed")]
    PartialFailure { failed: usize, total: usize },
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Plain-language, retry-suggesting message for a failed gateway call.
/// Access-denied reads differently from a generic failure.
fn user_message(op: &str, err: &GatewayError) -> String {
    if err.is_access_denied() {
        format!("You don't have access to {op}.")
    } else {
        format!("Could not {op}. Please check your connection and try again.")
    }
}

/// In-memory authoritative client state for lists and items.
///
/// Owned by the composition root and injected where needed — never ambient.
/// All mutations run on the single cooperative event loop; the in-flight
/// and recently-updated sets manage the races between mutations that are
/// awaiting network completion.
pub struct Store<G> {
    gateway: G,
    clock: Arc<dyn Clock>,

    pub lists: Vec<List>,
    pub items: Vec<Item>,

    // UI cursors
    pub current_list: ListSelection,
    pub current_view: View,
    pub display_mode: DisplayMode,
    pub selected_item: Option<Uuid>,

    // Mutation bookkeeping
    in_flight: ExpiryMap,
    recently_updated: ExpiryMap,
    last_local_write: Option<NaiveDateTime>,

    pub loading: bool,
    /// User-visible failure of the most recent operation.
    pub error: Option<String>,
}

impl<G: Gateway> Store<G> {
    pub fn new(gateway: G, clock: Arc<dyn Clock>) -> Self {
        Self {
            gateway,
            in_flight: ExpiryMap::new(clock.clone()),
            recently_updated: ExpiryMap::new(clock.clone()),
            clock,
            lists: Vec::new(),
            items: Vec::new(),
            current_list: ListSelection::All,
            current_view: View::Tasks,
            display_mode: DisplayMode::Columns,
            selected_item: None,
            last_local_write: None,
            loading: false,
            error: None,
        }
    }

    fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Whether `id` has a mutation awaiting realtime confirmation. The
    /// marker lapses on its own after the confirmation timeout.
    pub fn is_in_flight(&self, id: Uuid) -> bool {
        self.in_flight.contains(&id)
    }

    pub fn list_is_shared(&self, list_id: Uuid) -> bool {
        self.lists.iter().any(|l| l.id == list_id && l.is_shared())
    }

    pub fn default_list(&self) -> Option<&List> {
        self.lists.iter().find(|l| l.is_default).or_else(|| self.lists.first())
    }

    /// True shortly after a local write; background reloads and feed pumps
    /// are skipped while this holds.
    pub fn write_cooldown_active(&self) -> bool {
        self.last_local_write
            .is_some_and(|at| self.now() - at < Duration::seconds(RELOAD_COOLDOWN_SECS))
    }

    /// Drop all session state on sign-out or user change.
    pub fn clear(&mut self) {
        self.lists.clear();
        self.items.clear();
        self.current_list = ListSelection::All;
        self.selected_item = None;
        self.in_flight.clear();
        self.recently_updated.clear();
        self.last_local_write = None;
        self.loading = false;
        self.error = None;
    }

    fn fail(&mut self, op: &str, err: GatewayError) -> StoreError {
        log::warn!("{}: {}", op, err);
        self.error = Some(user_message(op, &err));
        StoreError::Gateway(err)
    }

    fn reject(&mut self, msg: &str) -> StoreError {
        self.error = Some(msg.to_string());
        StoreError::Validation(msg.to_string())
    }

    fn reject_missing_item(&mut self) -> StoreError {
        self.error = Some("That item no longer exists.".to_string());
        StoreError::ItemNotFound
    }

    fn note_local_write(&mut self) {
        self.last_local_write = Some(self.now());
    }

    fn protect(&mut self, id: Uuid) {
        self.recently_updated.insert(id, Duration::seconds(RECENT_WRITE_WINDOW_SECS));
    }

    /// Duplicate-title check: case-insensitive, among non-deleted,
    /// non-complete items of the same list.
    fn validate_title(
        &mut self,
        title: &str,
        list_id: Uuid,
        exclude: Option<Uuid>,
    ) -> Result<(), StoreError> {
        let wanted = title.trim().to_lowercase();
        let clash = self.items.iter().any(|item| {
            item.list_id == list_id
                && item.is_active()
                && Some(item.id) != exclude
                && item.title.trim().to_lowercase() == wanted
        });
        if clash {
            return Err(self.reject(&format!("An item called \"{}\" already exists.", title.trim())));
        }
        Ok(())
    }

    // --- Loading -----------------------------------------------------------

    /// Fetch all accessible lists and items in parallel. Creates the default
    /// list for a brand-new user, tolerating the race where a concurrent
    /// load creates it first. Never panics past this boundary; failures set
    /// `error` and leave `loading` false.
    pub async fn load_data(&mut self) -> Result<(), StoreError> {
        self.loading = true;
        self.error = None;

        let ceiling = std::time::Duration::from_secs(LOAD_CEILING_SECS);
        let fetched = tokio::time::timeout(ceiling, self.fetch_all()).await;
        let (mut lists, items) = match fetched {
            Ok(Ok(data)) => data,
            Ok(Err(e)) => {
                self.loading = false;
                return Err(self.fail("load your data", e));
            }
            Err(_) => {
                // Safety ceiling: the UI must never hang on a spinner.
                self.loading = false;
                self.error = Some("Loading is taking too long. Please try again.".to_string());
                return Err(StoreError::LoadTimeout);
            }
        };

        if lists.is_empty() {
            match self.gateway.create_list(&ListDraft::default_list()).await {
                Ok(list) => lists.push(list),
                Err(e) if e.is_conflict() => {
                    // A concurrent load won the race; take its result.
                    log::info!("Default list created concurrently, re-fetching lists");
                    match self.gateway.list_lists().await {
                        Ok(fresh) => lists = fresh,
                        Err(e) => {
                            self.loading = false;
                            return Err(self.fail("load your lists", e));
                        }
                    }
                }
                Err(e) => {
                    self.loading = false;
                    return Err(self.fail("create your first list", e));
                }
            }
        }

        self.lists = lists;
        self.merge_loaded_items(items);
        self.loading = false;
        log::info!("Loaded {} lists, {} items", self.lists.len(), self.items.len());
        Ok(())
    }

    async fn fetch_all(&self) -> Result<(Vec<List>, Vec<Item>), GatewayError> {
        let (lists, items) =
            futures::future::join(self.gateway.list_lists(), self.gateway.list_items()).await;
        Ok((lists?, items?))
    }

    /// Replace local items with fetched ones, except that items inside the
    /// recently-updated window keep their local copy — a background fetch
    /// may carry pre-write server state for a write still propagating.
    fn merge_loaded_items(&mut self, fetched: Vec<Item>) {
        let mut merged: Vec<Item> = Vec::with_capacity(fetched.len());
        for item in fetched {
            if self.recently_updated.contains(&item.id) {
                if let Some(local) = self.items.iter().find(|i| i.id == item.id) {
                    merged.push(local.clone());
                    continue;
                }
            }
            merged.push(item);
        }
        for local in &self.items {
            if self.recently_updated.contains(&local.id)
                && !merged.iter().any(|i| i.id == local.id)
            {
                // Still propagating and missing from the fetch; keep it.
                merged.push(local.clone());
            }
        }
        self.items = merged;
    }

    /// Debounced background reload: skipped entirely right after a local
    /// write so the reload cannot race ahead of the write's own effect.
    pub async fn refresh_if_idle(&mut self) -> Result<bool, StoreError> {
        if self.write_cooldown_active() {
            return Ok(false);
        }
        self.reload_items().await?;
        Ok(true)
    }

    async fn reload_items(&mut self) -> Result<(), StoreError> {
        match self.gateway.list_items().await {
            Ok(items) => {
                self.merge_loaded_items(items);
                Ok(())
            }
            Err(e) => Err(self.fail("refresh your items", e)),
        }
    }

    // --- Item mutations ----------------------------------------------------

    /// Persist a new item, then append it locally. No optimistic add: on
    /// failure local state is untouched.
    pub async fn add_item(&mut self, draft: ItemDraft) -> Result<Uuid, StoreError> {
        if draft.title.trim().is_empty() {
            return Err(self.reject("A title is required."));
        }
        if !self.lists.iter().any(|l| l.id == draft.list_id) {
            self.error = Some("That list no longer exists.".to_string());
            return Err(StoreError::ListNotFound);
        }
        self.validate_title(&draft.title, draft.list_id, None)?;

        let created = match self.gateway.create_item(&draft).await {
            Ok(item) => item,
            Err(e) => return Err(self.fail("add the item", e)),
        };
        let id = created.id;
        self.items.push(created);
        self.protect(id);
        self.note_local_write();
        Ok(id)
    }

    /// Field-level update. On a shared list the patch is not applied
    /// locally: the item is marked in-flight and the visible change arrives
    /// through the realtime feed, so every collaborator sees the same
    /// interim state. On a non-shared list the patch applies optimistically
    /// and a failed persist rolls back by reloading server truth.
    pub async fn update_item(&mut self, id: Uuid, patch: ItemPatch) -> Result<(), StoreError> {
        let Some(index) = self.items.iter().position(|i| i.id == id) else {
            return Err(self.reject_missing_item());
        };
        if let Some(kind) = &patch.kind {
            let compatible = match kind {
                KindPatch::Task(_) => self.items[index].is_task(),
                KindPatch::Reminder(_) => self.items[index].is_reminder(),
            };
            if !compatible {
                return Err(self.reject("That change does not apply to this kind of item."));
            }
        }
        if let Some(title) = patch.title.clone() {
            let list_id = patch.list_id.unwrap_or(self.items[index].list_id);
            self.validate_title(&title, list_id, Some(id))?;
        }

        if self.list_is_shared(self.items[index].list_id) {
            self.in_flight.insert(id, Duration::seconds(IN_FLIGHT_TIMEOUT_SECS));
            if let Err(e) = self.gateway.update_item(id, &patch).await {
                self.in_flight.cancel(&id);
                return Err(self.fail("save your changes", e));
            }
            return Ok(());
        }

        let now = self.now();
        if patch.apply_to(&mut self.items[index], now).is_err() {
            return Err(self.reject("That change does not apply to this kind of item."));
        }
        self.protect(id);
        self.note_local_write();

        match self.gateway.update_item(id, &patch).await {
            Ok(_) => {
                if patch.sets_reminder_date_without_status() {
                    // A date change without an explicit status lands in the
                    // date-derived bucket once the write is confirmed.
                    let today = self.today();
                    if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
                        if let ItemKind::Reminder { status, reminder_date, .. } = &mut item.kind {
                            if !status.is_complete() {
                                *status = ReminderStatus::from_bucket(bucket_for_date(
                                    *reminder_date,
                                    today,
                                ));
                            }
                        }
                    }
                }
                Ok(())
            }
            Err(e) => {
                let err = self.fail("save your changes", e);
                // Discard the optimistic copy and fall back to server truth.
                self.recently_updated.cancel(&id);
                if let Err(reload) = self.reload_items().await {
                    log::warn!("Reload after failed update also failed: {}", reload);
                }
                Err(err)
            }
        }
    }

    /// Soft delete. Always optimistic — trash is low-contention and
    /// recoverable — so the marker stays applied even if the persist fails.
    pub async fn delete_item(&mut self, id: Uuid) -> Result<(), StoreError> {
        let now = self.now();
        let Some(item) = self.items.iter_mut().find(|i| i.id == id) else {
            return Err(self.reject_missing_item());
        };
        item.deleted_at = Some(now);
        item.updated_at = now;
        if self.selected_item == Some(id) {
            self.selected_item = None;
        }
        self.protect(id);
        self.note_local_write();

        if let Err(e) = self.gateway.update_item(id, &ItemPatch::soft_delete(now)).await {
            return Err(self.fail("move the item to the trash", e));
        }
        Ok(())
    }

    /// Clear the deletion marker and recompute a type-appropriate status:
    /// `start` for tasks, the frequency for recurring reminders, the
    /// date-derived bucket for plain ones. Persists, then applies.
    pub async fn restore_item(&mut self, id: Uuid) -> Result<(), StoreError> {
        let today = self.today();
        let Some(item) = self.items.iter().find(|i| i.id == id) else {
            return Err(self.reject_missing_item());
        };
        let status = match &item.kind {
            ItemKind::Task { .. } => Status::Task(TaskStatus::Start),
            ItemKind::Reminder { recurrence: Some(r), .. } => {
                Status::Reminder(ReminderStatus::from_frequency(r.frequency))
            }
            ItemKind::Reminder { reminder_date, .. } => {
                Status::Reminder(ReminderStatus::from_bucket(bucket_for_date(*reminder_date, today)))
            }
        };
        let patch = ItemPatch::restore(status);

        if let Err(e) = self.gateway.update_item(id, &patch).await {
            return Err(self.fail("restore the item", e));
        }
        let now = self.now();
        if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
            if let Err(e) = patch.apply_to(item, now) {
                log::warn!("Restore patch did not apply: {}", e);
            }
        }
        self.protect(id);
        self.note_local_write();
        Ok(())
    }

    /// Hard delete of a single item.
    pub async fn permanently_delete_item(&mut self, id: Uuid) -> Result<(), StoreError> {
        if !self.items.iter().any(|i| i.id == id) {
            return Err(self.reject_missing_item());
        }
        if let Err(e) = self.gateway.delete_item(id).await {
            return Err(self.fail("delete the item", e));
        }
        self.items.retain(|i| i.id != id);
        if self.selected_item == Some(id) {
            self.selected_item = None;
        }
        self.note_local_write();
        Ok(())
    }

    /// Hard-delete every trashed item. Deletions run as independent
    /// concurrent requests: the ones that succeed leave local state even
    /// when others fail, and failures are reported as an aggregate count.
    pub async fn empty_trash(&mut self) -> Result<usize, StoreError> {
        let ids: Vec<Uuid> = self.items.iter().filter(|i| i.is_trashed()).map(|i| i.id).collect();
        if ids.is_empty() {
            return Ok(0);
        }
        let gateway = &self.gateway;
        let results =
            futures::future::join_all(ids.iter().map(|id| gateway.delete_item(*id))).await;

        let total = ids.len();
        let mut failed = 0usize;
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(()) => {
                    self.items.retain(|i| i.id != *id);
                    if self.selected_item == Some(*id) {
                        self.selected_item = None;
                    }
                }
                Err(e) => {
                    failed += 1;
                    log::warn!("Failed to delete trashed item {}: {}", id, e);
                }
            }
        }
        self.note_local_write();
        if failed > 0 {
            self.error = Some(format!(
                "{failed} of {total} items could not be deleted. Please try again."
            ));
            return Err(StoreError::PartialFailure { failed, total });
        }
        Ok(total)
    }

    /// Drag-and-drop between status columns. No-op when the status is
    /// unchanged; moving a reminder into `today` also stamps its date to
    /// now, since "today" implies immediacy.
    pub async fn move_item(&mut self, id: Uuid, target: Status) -> Result<(), StoreError> {
        let today = self.today();
        let Some(item) = self.items.iter().find(|i| i.id == id) else {
            return Err(self.reject_missing_item());
        };
        if item.display_status(today) == target {
            return Ok(());
        }
        let patch = match (&item.kind, target) {
            (ItemKind::Task { .. }, Status::Task(status)) => ItemPatch::task_status(status),
            (ItemKind::Reminder { .. }, Status::Reminder(ReminderStatus::Today)) => {
                ItemPatch::reminder_move_today(self.now())
            }
            (ItemKind::Reminder { .. }, Status::Reminder(status)) => {
                ItemPatch::reminder_status(status)
            }
            _ => return Err(self.reject("That change does not apply to this kind of item.")),
        };
        self.update_item(id, patch).await
    }

    // --- Notes -------------------------------------------------------------

    /// Append a note. Notes carry server-generated ids and timestamps the
    /// client cannot fabricate, so there is no optimistic mutation — the
    /// returned shape is merged once the persist resolves. A hold-directive
    /// note also flips the item's on-hold flag.
    pub async fn add_note(&mut self, item_id: Uuid, content: &str) -> Result<Uuid, StoreError> {
        if content.trim().is_empty() {
            return Err(self.reject("A note needs some text."));
        }
        if !self.items.iter().any(|i| i.id == item_id) {
            return Err(self.reject_missing_item());
        }
        let note = match self.gateway.add_note(item_id, content).await {
            Ok(note) => note,
            Err(e) => return Err(self.fail("add the note", e)),
        };
        let directive = note.hold_directive();
        let note_id = note.id;
        if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
            item.notes.push(note);
        }
        self.protect(item_id);
        self.note_local_write();
        if let Some(directive) = directive {
            self.apply_hold_directive(item_id, directive).await?;
        }
        Ok(note_id)
    }

    pub async fn update_note(
        &mut self,
        item_id: Uuid,
        note_id: Uuid,
        content: &str,
    ) -> Result<(), StoreError> {
        if !self.items.iter().any(|i| i.id == item_id) {
            return Err(self.reject_missing_item());
        }
        let updated = match self.gateway.update_note(item_id, note_id, content).await {
            Ok(note) => note,
            Err(e) => return Err(self.fail("save the note", e)),
        };
        let directive = updated.hold_directive();
        if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
            if let Some(note) = item.notes.iter_mut().find(|n| n.id == note_id) {
                *note = updated;
            } else {
                item.notes.push(updated);
            }
        }
        self.protect(item_id);
        self.note_local_write();
        if let Some(directive) = directive {
            self.apply_hold_directive(item_id, directive).await?;
        }
        Ok(())
    }

    pub async fn delete_note(&mut self, item_id: Uuid, note_id: Uuid) -> Result<(), StoreError> {
        if !self.items.iter().any(|i| i.id == item_id) {
            return Err(self.reject_missing_item());
        }
        if let Err(e) = self.gateway.delete_note(item_id, note_id).await {
            return Err(self.fail("delete the note", e));
        }
        if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
            item.notes.retain(|n| n.id != note_id);
        }
        self.protect(item_id);
        self.note_local_write();
        Ok(())
    }

    async fn apply_hold_directive(
        &mut self,
        item_id: Uuid,
        directive: HoldDirective,
    ) -> Result<(), StoreError> {
        let patch = match directive {
            HoldDirective::On => ItemPatch::metadata_set(ON_HOLD_KEY, "true"),
            HoldDirective::Off => ItemPatch::metadata_clear(ON_HOLD_KEY),
        };
        self.update_item(item_id, patch).await
    }

    // --- Attachments -------------------------------------------------------

    /// Upload an attachment. Size is validated before any network call.
    pub async fn add_attachment(
        &mut self,
        item_id: Uuid,
        upload: AttachmentUpload,
    ) -> Result<Uuid, StoreError> {
        if upload.oversized() {
            return Err(self.reject(&format!(
                "Attachments are limited to {} MB.",
                MAX_ATTACHMENT_BYTES / (1024 * 1024)
            )));
        }
        if !self.items.iter().any(|i| i.id == item_id) {
            return Err(self.reject_missing_item());
        }
        let attachment = match self.gateway.add_attachment(item_id, &upload).await {
            Ok(attachment) => attachment,
            Err(e) => return Err(self.fail("upload the attachment", e)),
        };
        let attachment_id = attachment.id;
        if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
            item.attachments.push(attachment);
        }
        self.protect(item_id);
        self.note_local_write();
        Ok(attachment_id)
    }

    /// Remove an attachment's metadata and its stored object.
    pub async fn delete_attachment(
        &mut self,
        item_id: Uuid,
        attachment_id: Uuid,
    ) -> Result<(), StoreError> {
        if !self.items.iter().any(|i| i.id == item_id) {
            return Err(self.reject_missing_item());
        }
        if let Err(e) = self.gateway.delete_attachment(item_id, attachment_id).await {
            return Err(self.fail("delete the attachment", e));
        }
        if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
            item.attachments.retain(|a| a.id != attachment_id);
        }
        self.protect(item_id);
        self.note_local_write();
        Ok(())
    }

    // --- Lists -------------------------------------------------------------

    pub async fn add_list(&mut self, draft: ListDraft) -> Result<Uuid, StoreError> {
        if draft.name.trim().is_empty() {
            return Err(self.reject("A list needs a name."));
        }
        let created = match self.gateway.create_list(&draft).await {
            Ok(list) => list,
            Err(e) => return Err(self.fail("create the list", e)),
        };
        let id = created.id;
        self.lists.push(created);
        Ok(id)
    }

    pub async fn update_list(&mut self, id: Uuid, patch: ListPatch) -> Result<(), StoreError> {
        if !self.lists.iter().any(|l| l.id == id) {
            self.error = Some("That list no longer exists.".to_string());
            return Err(StoreError::ListNotFound);
        }
        let updated = match self.gateway.update_list(id, &patch).await {
            Ok(list) => list,
            Err(e) => return Err(self.fail("save the list", e)),
        };
        if let Some(list) = self.lists.iter_mut().find(|l| l.id == id) {
            *list = updated;
        }
        Ok(())
    }

    /// Delete a list. Its trashed items are reassigned to the fallback list
    /// first (so the trash survives), its active items are dropped, and the
    /// selection moves off the deleted list. The last list cannot go.
    pub async fn delete_list(&mut self, id: Uuid) -> Result<(), StoreError> {
        let Some(index) = self.lists.iter().position(|l| l.id == id) else {
            self.error = Some("That list no longer exists.".to_string());
            return Err(StoreError::ListNotFound);
        };
        if self.lists.len() == 1 {
            return Err(self.reject("Cannot delete your last list. Create another list first."));
        }
        let fallback = self
            .lists
            .iter()
            .find(|l| l.id != id)
            .map(|l| l.id)
            .expect("a second list exists");

        let trashed: Vec<Uuid> = self
            .items
            .iter()
            .filter(|i| i.list_id == id && i.is_trashed())
            .map(|i| i.id)
            .collect();
        if !trashed.is_empty() {
            let patch = ItemPatch::move_to_list(fallback);
            let gateway = &self.gateway;
            let results =
                futures::future::join_all(trashed.iter().map(|iid| gateway.update_item(*iid, &patch)))
                    .await;
            let mut failed = 0usize;
            for (iid, result) in trashed.iter().zip(results) {
                match result {
                    Ok(_) => {
                        if let Some(item) = self.items.iter_mut().find(|i| i.id == *iid) {
                            item.list_id = fallback;
                        }
                    }
                    Err(e) => {
                        failed += 1;
                        log::warn!("Failed to reassign trashed item {}: {}", iid, e);
                    }
                }
            }
            if failed > 0 {
                // Deleting now would drop trash we failed to move; abort.
                let total = trashed.len();
                self.error = Some(format!(
                    "Could not move {failed} of {total} trashed items. The list was not deleted."
                ));
                return Err(StoreError::PartialFailure { failed, total });
            }
        }

        if let Err(e) = self.gateway.delete_list(id).await {
            return Err(self.fail("delete the list", e));
        }

        // Active items of the deleted list are dropped, not reassigned.
        if let Some(selected) = self.selected_item {
            let dropped = self
                .items
                .iter()
                .any(|i| i.id == selected && i.list_id == id && !i.is_trashed());
            if dropped {
                self.selected_item = None;
            }
        }
        self.items.retain(|i| i.list_id != id || i.is_trashed());
        self.lists.remove(index);
        if self.current_list == ListSelection::List(id) {
            self.current_list = ListSelection::List(fallback);
        }
        self.note_local_write();
        Ok(())
    }

    /// Share a list after verifying every invitee has an account.
    pub async fn share_list(&mut self, id: Uuid, emails: Vec<String>) -> Result<(), StoreError> {
        if !self.lists.iter().any(|l| l.id == id) {
            self.error = Some("That list no longer exists.".to_string());
            return Err(StoreError::ListNotFound);
        }
        let checks = match self.gateway.check_users_exist(&emails).await {
            Ok(checks) => checks,
            Err(e) => return Err(self.fail("share the list", e)),
        };
        let missing: Vec<String> = checks
            .iter()
            .filter(|c| !c.exists)
            .map(|c| c.email.clone())
            .collect();
        if !missing.is_empty() {
            return Err(self.reject(&format!("No account found for {}.", missing.join(", "))));
        }
        self.update_list(id, ListPatch::share_with(emails)).await
    }

    // --- Projections -------------------------------------------------------

    /// The single source of truth the column/category UI renders against.
    pub fn filtered_items(&self) -> Vec<Item> {
        views::filtered_items(
            &self.items,
            &self.lists,
            self.current_view,
            self.current_list,
            self.today(),
        )
    }

    pub fn search_items(&self, query: &str) -> Vec<Item> {
        search::search_items(&self.items, query)
    }

    // --- Realtime reconciliation -------------------------------------------

    /// Fold an externally-delivered change into local state. Item updates
    /// are the confirmation path for shared-list edits: they clear the
    /// in-flight marker and install the authoritative record. Note changes
    /// only apply for shared lists — non-shared note changes already arrived
    /// through the request/response path.
    pub fn apply_remote_event(&mut self, event: ChangeEvent) {
        match event {
            ChangeEvent::ItemInserted(item) => {
                let shared = self.list_is_shared(item.list_id);
                if shared && !self.items.iter().any(|i| i.id == item.id) {
                    log::debug!("Realtime insert: {}", item.id);
                    self.items.push(item);
                }
            }
            ChangeEvent::ItemUpdated(item) => {
                self.in_flight.cancel(&item.id);
                if let Some(local) = self.items.iter_mut().find(|i| i.id == item.id) {
                    *local = item;
                } else {
                    log::debug!("Realtime update for unknown item {}", item.id);
                }
            }
            ChangeEvent::ItemDeleted(id) => {
                self.items.retain(|i| i.id != id);
                if self.selected_item == Some(id) {
                    self.selected_item = None;
                }
                self.in_flight.cancel(&id);
                self.recently_updated.cancel(&id);
            }
            ChangeEvent::ListInserted(list) | ChangeEvent::ListUpdated(list) => {
                if let Some(local) = self.lists.iter_mut().find(|l| l.id == list.id) {
                    *local = list;
                } else {
                    self.lists.push(list);
                }
            }
            ChangeEvent::ListDeleted(id) => {
                self.lists.retain(|l| l.id != id);
                if self.current_list == ListSelection::List(id) {
                    self.current_list = ListSelection::All;
                }
            }
            ChangeEvent::NoteInserted { item_id, note } => {
                if !self.item_on_shared_list(item_id) {
                    return;
                }
                if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
                    if !item.notes.iter().any(|n| n.id == note.id) {
                        item.notes.push(note);
                    }
                }
            }
            ChangeEvent::NoteUpdated { item_id, note } => {
                if !self.item_on_shared_list(item_id) {
                    return;
                }
                self.in_flight.cancel(&item_id);
                if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
                    if let Some(local) = item.notes.iter_mut().find(|n| n.id == note.id) {
                        *local = note;
                    } else {
                        item.notes.push(note);
                    }
                }
            }
            ChangeEvent::NoteDeleted { item_id, note_id } => {
                if !self.item_on_shared_list(item_id) {
                    return;
                }
                if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
                    item.notes.retain(|n| n.id != note_id);
                }
            }
        }
    }

    fn item_on_shared_list(&self, item_id: Uuid) -> bool {
        self.items
            .iter()
            .find(|i| i.id == item_id)
            .map(|i| self.list_is_shared(i.list_id))
            .unwrap_or(false)
    }
}
