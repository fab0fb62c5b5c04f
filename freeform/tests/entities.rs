use bson::doc;
use freeform::memory::MemoryDriver;
use freeform::prelude::*;

fn mapper() -> Mapper {
    Mapper::new(MemoryDriver::named("test"))
}

#[test]
fn creation_is_lazy_until_the_first_write() {
    let mapper = mapper();
    let notes = mapper.collection("Note");

    let note = notes.create();
    assert!(note.id().is_none());
    assert!(!note.is_saved());
    assert_eq!(notes.count(doc! {}).unwrap(), 0);

    note.set("title", "groceries").unwrap();
    assert!(note.is_saved());
    assert_eq!(notes.count(doc! {}).unwrap(), 1);

    // later writes update in place rather than inserting again
    note.set("pinned", true).unwrap();
    assert_eq!(notes.count(doc! {}).unwrap(), 1);
}

#[test]
fn create_with_inserts_immediately() {
    let mapper = mapper();
    let notes = mapper.collection("Note");

    let note = notes
        .create_with(doc! { "title": "travel", "pinned": false })
        .unwrap();
    assert!(note.is_saved());
    assert_eq!(note.get("title").unwrap().unwrap().as_str(), Some("travel"));

    // an empty field map stays lazy
    let blank = notes.create_with(doc! {}).unwrap();
    assert!(!blank.is_saved());
}

#[test]
fn fields_round_trip_through_the_store() {
    let mapper = mapper();
    let notes = mapper.collection("Note");

    let note = notes.create();
    note.set("title", "meeting").unwrap();
    note.set("priority", 3_i64).unwrap();
    note.set("done", false).unwrap();

    let id = note.id().unwrap();
    let found = notes.find_by_id(&id).unwrap().unwrap();
    assert_eq!(found.get("title").unwrap().unwrap().as_str(), Some("meeting"));
    assert_eq!(found.get("priority").unwrap().unwrap().as_i64(), Some(3));
    assert_eq!(found.get("done").unwrap().unwrap().as_bool(), Some(false));
    assert_eq!(found.get("never_set").unwrap(), None);
}

#[test]
fn clones_share_state() {
    let mapper = mapper();
    let notes = mapper.collection("Note");

    let note = notes.create();
    let alias = note.clone();
    alias.set("title", "shared").unwrap();

    assert_eq!(note.id(), alias.id());
    assert_eq!(note.get("title").unwrap().unwrap().as_str(), Some("shared"));
}

#[test]
fn refresh_pulls_writes_made_through_another_handle() {
    let mapper = mapper();
    let notes = mapper.collection("Note");

    let note = notes.create();
    note.set("title", "draft").unwrap();

    let other = notes.find_by_id(&note.id().unwrap()).unwrap().unwrap();
    other.set("title", "final").unwrap();

    // the first handle still holds its cached copy until asked to refresh
    assert_eq!(note.get("title").unwrap().unwrap().as_str(), Some("draft"));
    note.refresh().unwrap();
    assert_eq!(note.get("title").unwrap().unwrap().as_str(), Some("final"));
}

#[test]
fn equality_follows_identifiers() {
    let mapper = mapper();
    let notes = mapper.collection("Note");

    let a = notes.create();
    let b = notes.create();
    assert_ne!(a, b);
    assert_ne!(a, a.clone()); // unsaved entities equal nothing

    a.set("n", 1_i64).unwrap();
    b.set("n", 1_i64).unwrap();
    assert_ne!(a, b);

    let a_again = notes.find_by_id(&a.id().unwrap()).unwrap().unwrap();
    assert_eq!(a, a_again);
}

#[test]
fn remove_reverts_to_unsaved() {
    let mapper = mapper();
    let notes = mapper.collection("Note");

    let note = notes.create();
    note.set("title", "temp").unwrap();
    let first_id = note.id().unwrap();

    note.remove().unwrap();
    assert!(!note.is_saved());
    assert_eq!(note.get("title").unwrap(), None);
    assert!(notes.find_by_id(&first_id).unwrap().is_none());

    // writing again inserts a fresh document under a new identifier
    note.set("title", "reborn").unwrap();
    assert_ne!(note.id(), Some(first_id));
    assert_eq!(notes.count(doc! {}).unwrap(), 1);
}

#[test]
fn increment_returns_the_new_value() {
    let mapper = mapper();
    let notes = mapper.collection("Note");

    let note = notes.create();
    note.set("title", "counted").unwrap();

    assert_eq!(note.incr("views").unwrap(), 1);
    assert_eq!(note.increment("views", 5).unwrap(), 6);
    assert_eq!(note.get("views").unwrap().unwrap().as_i64(), Some(6));

    // increments hit the store, not just the cache
    let found = notes.find_by_id(&note.id().unwrap()).unwrap().unwrap();
    assert_eq!(found.get("views").unwrap().unwrap().as_i64(), Some(6));

    let unsaved = notes.create();
    assert!(matches!(
        unsaved.incr("views"),
        Err(MapperError::MissingIdentifier(_))
    ));
}

#[test]
fn keys_and_values_skip_metadata() {
    let mapper = mapper();
    let notes = mapper.collection("Note");

    let note = notes.create();
    note.set("title", "listed").unwrap();
    note.set("priority", 2_i64).unwrap();

    assert_eq!(note.keys(), vec!["title".to_string(), "priority".to_string()]);
    let values = note.values().unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(values[0].as_str(), Some("listed"));
    assert_eq!(values[1].as_i64(), Some(2));

    // metadata keys are invisible through get as well
    assert!(note.get("_id").unwrap().is_none());
    assert!(note.get(CLASS_KEY).unwrap().is_none());
    assert!(note.get(EMBED_KEY).unwrap().is_none());
}

#[test]
fn export_strips_identifiers_and_embed_tags() {
    let mapper = mapper();
    let notes = mapper.collection("Note");
    let tags = mapper.collection("Tag");

    let tag = tags.create();
    tag.set("label", "urgent").unwrap();

    let note = notes.create();
    note.set("title", "exported").unwrap();
    note.set("tag", tag).unwrap();

    let exported = note.to_document();
    assert!(exported.get("_id").is_none());
    assert_eq!(
        exported.get("title"),
        Some(&bson::Bson::String("exported".to_string()))
    );
    let Some(bson::Bson::Document(nested)) = exported.get("tag") else {
        panic!("tag should export as a document");
    };
    assert!(nested.get(EMBED_KEY).is_none());
    assert_eq!(
        nested.get("label"),
        Some(&bson::Bson::String("urgent".to_string()))
    );

    let json = note.to_json().unwrap();
    assert_eq!(json["title"], serde_json::json!("exported"));
    assert_eq!(json["tag"]["label"], serde_json::json!("urgent"));
}

#[test]
fn chrono_timestamps_store_as_datetimes() {
    let mapper = mapper();
    let notes = mapper.collection("Note");

    let at = chrono::Utc::now();
    let note = notes.create();
    note.set("created_at", at).unwrap();

    let found = notes.find_by_id(&note.id().unwrap()).unwrap().unwrap();
    let value = found.get("created_at").unwrap().unwrap();
    let Some(bson::Bson::DateTime(stored)) = value.as_scalar() else {
        panic!("created_at should be a datetime");
    };
    // BSON datetimes carry millisecond precision
    assert_eq!(stored.timestamp_millis(), at.timestamp_millis());
}
