//! Chat use-case service.
//!
//! # Responsibility
//! - Run validation before any store call.
//! - Stamp creation time and merge body-only updates onto stored chats.
//! - Classify store failures into `ErrorEnvelope`s exactly once.
//!
//! # Invariants
//! - Validation failures never reach the store.
//! - `update_chat` fetches then merges; it never writes a partial record.
//! - Listing never returns an empty collection; emptiness is `NotFound`.
//! - No retries and no concurrency control: concurrent updates to one chat
//!   are last-write-wins.

use crate::envelope::{classify, ErrorEnvelope};
use crate::model::chat::{Chat, ChatId, UpdateChatRequest};
use crate::repo::chat_repo::{ChatStore, StoreError};
use crate::validate::{validate, ValidationMode};
use chrono::{DateTime, Utc};
use log::{debug, error, warn};

const NO_RECORDS_MESSAGE: &str = "no records found";

pub type ServiceResult<T> = Result<T, ErrorEnvelope>;

/// Chat service facade over an injected store.
pub struct ChatService<S: ChatStore> {
    store: S,
    clock: fn() -> DateTime<Utc>,
}

impl<S: ChatStore> ChatService<S> {
    /// Creates a service stamping chats with the system clock.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Utc::now)
    }

    /// Creates a service with a caller-provided clock.
    pub fn with_clock(store: S, clock: fn() -> DateTime<Utc>) -> Self {
        Self { store, clock }
    }

    /// Gets one chat by id.
    pub fn get_chat(&self, id: ChatId) -> ServiceResult<Chat> {
        self.store.get(id).map_err(|err| store_failure("get", &err))
    }

    /// Validates and persists a new chat.
    ///
    /// Returns the stored chat with its store-assigned `id`.
    pub fn create_chat(&self, mut chat: Chat) -> ServiceResult<Chat> {
        if let Err(err) = validate(ValidationMode::Create, &mut chat) {
            return Err(rejected("create", err));
        }

        chat.created_at = (self.clock)();
        let created = self
            .store
            .create(&chat)
            .map_err(|err| store_failure("create", &err))?;
        debug!(
            "event=chat_create module=service status=ok chat_id={}",
            created.id
        );
        Ok(created)
    }

    /// Replaces the body of an existing chat.
    ///
    /// Only `body` is taken from the request; `id`, `sender`, `receiver` and
    /// `created_at` come from the stored chat.
    pub fn update_chat(&self, request: UpdateChatRequest) -> ServiceResult<Chat> {
        let mut candidate = request.to_candidate();
        if let Err(err) = validate(ValidationMode::Update, &mut candidate) {
            return Err(rejected("update", err));
        }

        let mut current = self
            .store
            .get(request.id)
            .map_err(|err| store_failure("update", &err))?;
        current.body = candidate.body;

        let updated = self
            .store
            .update(&current)
            .map_err(|err| store_failure("update", &err))?;
        debug!(
            "event=chat_update module=service status=ok chat_id={}",
            updated.id
        );
        Ok(updated)
    }

    /// Deletes one chat after confirming it exists.
    pub fn delete_chat(&self, id: ChatId) -> ServiceResult<()> {
        let chat = self
            .store
            .get(id)
            .map_err(|err| store_failure("delete", &err))?;
        self.store
            .delete(chat.id)
            .map_err(|err| store_failure("delete", &err))?;
        debug!("event=chat_delete module=service status=ok chat_id={id}");
        Ok(())
    }

    /// Lists all chats; an empty store is reported as `NotFound`.
    pub fn get_all_chats(&self) -> ServiceResult<Vec<Chat>> {
        let chats = self
            .store
            .get_all()
            .map_err(|err| store_failure("list", &err))?;
        if chats.is_empty() {
            return Err(rejected("list", ErrorEnvelope::not_found(NO_RECORDS_MESSAGE)));
        }
        Ok(chats)
    }
}

fn rejected(operation: &str, envelope: ErrorEnvelope) -> ErrorEnvelope {
    warn!(
        "event=chat_{operation} module=service status=rejected error_code={} message={}",
        envelope.tag(),
        envelope.message()
    );
    envelope
}

fn store_failure(operation: &str, err: &StoreError) -> ErrorEnvelope {
    let envelope = classify(err);
    match err {
        StoreError::NotFound(_) => debug!(
            "event=chat_{operation} module=service status=rejected error_code={}",
            envelope.tag()
        ),
        _ => error!(
            "event=chat_{operation} module=service status=error error_code={} error={err}",
            envelope.tag()
        ),
    }
    envelope
}

#[cfg(test)]
mod tests {
    use super::ChatService;
    use crate::envelope::ErrorKind;
    use crate::model::chat::{Chat, ChatId, UpdateChatRequest};
    use crate::repo::chat_repo::{ChatStore, StoreError, StoreResult};
    use chrono::{DateTime, TimeZone, Utc};
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct FakeStore {
        rows: RefCell<Vec<Chat>>,
        next_id: Cell<ChatId>,
        calls: RefCell<Vec<&'static str>>,
        updated: RefCell<Vec<Chat>>,
        fail_writes: Cell<bool>,
    }

    impl FakeStore {
        fn with_rows(rows: Vec<Chat>) -> Self {
            let store = Self::default();
            store.next_id.set(rows.len() as ChatId);
            *store.rows.borrow_mut() = rows;
            store
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.borrow().clone()
        }

        fn write_error(&self) -> StoreResult<()> {
            if self.fail_writes.get() {
                return Err(StoreError::InvalidData("disk on fire".to_string()));
            }
            Ok(())
        }
    }

    impl ChatStore for FakeStore {
        fn get(&self, id: ChatId) -> StoreResult<Chat> {
            self.calls.borrow_mut().push("get");
            self.rows
                .borrow()
                .iter()
                .find(|chat| chat.id == id)
                .cloned()
                .ok_or(StoreError::NotFound(id))
        }

        fn create(&self, chat: &Chat) -> StoreResult<Chat> {
            self.calls.borrow_mut().push("create");
            self.write_error()?;
            let id = self.next_id.get() + 1;
            self.next_id.set(id);
            let mut created = chat.clone();
            created.id = id;
            self.rows.borrow_mut().push(created.clone());
            Ok(created)
        }

        fn update(&self, chat: &Chat) -> StoreResult<Chat> {
            self.calls.borrow_mut().push("update");
            self.write_error()?;
            self.updated.borrow_mut().push(chat.clone());
            Ok(chat.clone())
        }

        fn delete(&self, id: ChatId) -> StoreResult<()> {
            self.calls.borrow_mut().push("delete");
            self.write_error()?;
            self.rows.borrow_mut().retain(|chat| chat.id != id);
            Ok(())
        }

        fn get_all(&self) -> StoreResult<Vec<Chat>> {
            self.calls.borrow_mut().push("get_all");
            Ok(self.rows.borrow().clone())
        }
    }

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    fn stored(id: ChatId, sender: &str, receiver: &str, body: &str) -> Chat {
        let mut chat = Chat::new(sender, receiver, body);
        chat.id = id;
        chat.created_at = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        chat
    }

    #[test]
    fn create_stamps_time_and_returns_store_id() {
        let store = FakeStore::default();
        let service = ChatService::with_clock(&store, fixed_clock);

        let created = service
            .create_chat(Chat::new(" +62811132431 ", "555-8909", " hello "))
            .unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(created.created_at, fixed_clock());
        assert_eq!(created.sender, "+62811132431");
        assert_eq!(created.body, "hello");
        assert_eq!(store.calls(), vec!["create"]);
    }

    #[test]
    fn create_ignores_client_supplied_timestamp() {
        let store = FakeStore::default();
        let service = ChatService::with_clock(&store, fixed_clock);
        let mut chat = Chat::new("+62811132431", "555-8909", "hello");
        chat.created_at = Utc.with_ymd_and_hms(1999, 1, 1, 0, 0, 0).unwrap();

        let created = service.create_chat(chat).unwrap();
        assert_eq!(created.created_at, fixed_clock());
    }

    #[test]
    fn create_validation_failure_never_touches_store() {
        let store = FakeStore::default();
        let service = ChatService::new(&store);

        let err = service
            .create_chat(Chat::new("", "+6282323232", "hello"))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnprocessableEntity);
        assert_eq!(err.message(), "Required Sender");
        assert!(store.calls().is_empty());
    }

    #[test]
    fn create_same_sender_and_receiver_is_rejected() {
        let store = FakeStore::default();
        let service = ChatService::new(&store);

        let err = service
            .create_chat(Chat::new("+6213131312", "+6213131312", "hello"))
            .unwrap_err();

        assert_eq!(err.message(), "Sender and Receiver must different");
        assert_eq!(err.tag(), "invalid_request");
    }

    #[test]
    fn create_store_failure_is_classified() {
        let store = FakeStore::default();
        store.fail_writes.set(true);
        let service = ChatService::new(&store);

        let err = service
            .create_chat(Chat::new("+62811132431", "555-8909", "hello"))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InternalServer);
        assert!(err.message().starts_with("error when processing request: "));
    }

    #[test]
    fn get_missing_chat_is_not_found() {
        let store = FakeStore::default();
        let service = ChatService::new(&store);

        let err = service.get_chat(7).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.message(), "no record matching given id");
    }

    #[test]
    fn update_merges_body_onto_stored_chat() {
        let original = stored(1, "A", "B", "old");
        let store = FakeStore::with_rows(vec![original.clone()]);
        let service = ChatService::new(&store);

        let updated = service
            .update_chat(UpdateChatRequest::new(1, "  new "))
            .unwrap();

        assert_eq!(updated.sender, "A");
        assert_eq!(updated.receiver, "B");
        assert_eq!(updated.body, "new");
        assert_eq!(updated.created_at, original.created_at);
        let persisted = store.updated.borrow();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].sender, "A");
        assert_eq!(persisted[0].receiver, "B");
        assert_eq!(persisted[0].body, "new");
        assert_eq!(store.calls(), vec!["get", "update"]);
    }

    #[test]
    fn update_with_blank_body_is_rejected_before_lookup() {
        let store = FakeStore::with_rows(vec![stored(1, "A", "B", "old")]);
        let service = ChatService::new(&store);

        let err = service
            .update_chat(UpdateChatRequest::new(1, " \t"))
            .unwrap_err();

        assert_eq!(err.message(), "Required Body");
        assert!(store.calls().is_empty());
    }

    #[test]
    fn update_missing_chat_propagates_not_found() {
        let store = FakeStore::default();
        let service = ChatService::new(&store);

        let err = service
            .update_chat(UpdateChatRequest::new(3, "new"))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(store.calls(), vec!["get"]);
    }

    #[test]
    fn delete_missing_chat_skips_store_delete() {
        let store = FakeStore::default();
        let service = ChatService::new(&store);

        let err = service.delete_chat(5).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.message(), "no record matching given id");
        assert_eq!(store.calls(), vec!["get"]);
    }

    #[test]
    fn delete_existing_chat_removes_it() {
        let store = FakeStore::with_rows(vec![stored(4, "A", "B", "x")]);
        let service = ChatService::new(&store);

        service.delete_chat(4).unwrap();

        assert_eq!(store.calls(), vec!["get", "delete"]);
        assert!(store.rows.borrow().is_empty());
    }

    #[test]
    fn delete_store_failure_is_internal_server() {
        let store = FakeStore::with_rows(vec![stored(4, "A", "B", "x")]);
        store.fail_writes.set(true);
        let service = ChatService::new(&store);

        let err = service.delete_chat(4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InternalServer);
    }

    #[test]
    fn list_on_empty_store_is_not_found() {
        let store = FakeStore::default();
        let service = ChatService::new(&store);

        let err = service.get_all_chats().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.message(), "no records found");
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn list_returns_stored_chats() {
        let store = FakeStore::with_rows(vec![stored(1, "A", "B", "x"), stored(2, "C", "D", "y")]);
        let service = ChatService::new(&store);

        let chats = service.get_all_chats().unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[1].id, 2);
    }
}
