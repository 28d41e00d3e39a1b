mod common;

use std::sync::{Arc, Mutex};

use docmodel::prelude::*;

use common::CountingConnector;

async fn users(config: impl FnOnce(ModelConfig) -> ModelConfig) -> Model {
    let base = ModelConfig::new(CountingConnector::new())
        .schema(doc! { "name": "String", "email": "String" })
        .collection("users");

    build_model(config(base)).await.unwrap()
}

#[tokio::test]
async fn create_find_update_and_remove() {
    let users = users(|config| config).await;

    let mut alice = users.create(doc! { "name": "Alice", "email": "alice@example.com" }).await.unwrap();
    users.create(doc! { "name": "Bob", "email": "bob@example.com" }).await.unwrap();

    assert!(!alice.is_new());
    let id = alice.id().cloned().unwrap();
    assert!(matches!(id, Bson::Binary(_)));

    assert_eq!(users.count(Query::all()).await.unwrap(), 2);

    alice.set("name", "Alice Liddell");
    alice.save().await.unwrap();

    let found = users.find_by_id(id.clone()).await.unwrap().unwrap();
    assert_eq!(found.get("name"), Some(&Bson::from("Alice Liddell")));

    let bob = users
        .find_one(Filter::eq("name", "Bob").into())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bob.get("email"), Some(&Bson::from("bob@example.com")));

    found.remove().await.unwrap();
    assert!(users.find_by_id(id).await.unwrap().is_none());
    assert!(!users.delete_by_id(Bson::from("missing")).await.unwrap());

    let bob_id = bob.id().cloned().unwrap();
    assert!(users.delete_by_id(bob_id).await.unwrap());
    assert_eq!(users.count(Query::all()).await.unwrap(), 0);
}

#[tokio::test]
async fn find_supports_sorting_and_pagination() {
    let users = users(|config| config).await;

    for name in ["Carol", "Alice", "Bob"] {
        users.create(doc! { "name": name }).await.unwrap();
    }

    let page = users
        .find(Query::builder().sort("name", SortDirection::Asc).limit(2).build())
        .await
        .unwrap()
        .into_iter()
        .map(|user| user.get("name").and_then(Bson::as_str).unwrap_or_default().to_string())
        .collect::<Vec<_>>();

    assert_eq!(page, vec!["Alice", "Bob"]);
}

#[tokio::test]
async fn autoincrement_numbers_new_documents_from_start_at() {
    let users = users(|config| config.autoinc(AutoIncrementOptions::new("seq").start_at(5))).await;

    let first = users.create(doc! { "name": "Alice" }).await.unwrap();
    let second = users.create(doc! { "name": "Bob" }).await.unwrap();
    let explicit = users.create(doc! { "name": "Carol", "seq": 100_i64 }).await.unwrap();

    assert_eq!(first.get("seq"), Some(&Bson::Int64(5)));
    assert_eq!(second.get("seq"), Some(&Bson::Int64(6)));
    assert_eq!(explicit.get("seq"), Some(&Bson::Int64(100)));

    // Saving an existing document keeps its number.
    let mut first = first;
    first.set("name", "Alicia");
    first.save().await.unwrap();
    assert_eq!(first.get("seq"), Some(&Bson::Int64(5)));
}

#[tokio::test]
async fn explicit_numbers_push_the_counter_forward() {
    let users = users(|config| config.autoinc(AutoIncrementOptions::new("seq"))).await;

    let explicit = users.create(doc! { "name": "Alice", "seq": 2_i64 }).await.unwrap();
    let next = users.create(doc! { "name": "Bob" }).await.unwrap();
    let after = users.create(doc! { "name": "Carol" }).await.unwrap();

    assert_eq!(explicit.get("seq"), Some(&Bson::Int64(2)));
    assert_eq!(next.get("seq"), Some(&Bson::Int64(3)));
    assert_eq!(after.get("seq"), Some(&Bson::Int64(4)));

    // A lower explicit number leaves the counter where it is.
    users.create(doc! { "name": "Dave", "seq": 1_i32 }).await.unwrap();
    assert_eq!(users.next_count().await.unwrap(), 5);
}

#[tokio::test]
async fn autoincrement_field_is_unique_unless_disabled() {
    let unique_users = users(|config| config.autoinc(AutoIncrementOptions::new("seq"))).await;

    assert_eq!(unique_users.schema().indexes()[0].keys, doc! { "seq": 1 });
    unique_users.create(doc! { "name": "Alice", "seq": 7_i64 }).await.unwrap();
    let err = unique_users.create(doc! { "name": "Bob", "seq": 7_i64 }).await.unwrap_err();
    assert!(matches!(err, ModelError::Store(DocumentStoreError::DocumentAlreadyExists(_, _))));

    let tickets = users(|config| {
        config
            .collection("tickets")
            .autoinc(AutoIncrementOptions::new("seq").unique(false))
    })
    .await;

    assert!(tickets.schema().indexes().is_empty());
    tickets.create(doc! { "name": "Alice", "seq": 7_i64 }).await.unwrap();
    tickets.create(doc! { "name": "Bob", "seq": 7_i64 }).await.unwrap();
}

#[tokio::test]
async fn autoincrement_on_id_with_custom_step() {
    let invoices = users(|config| {
        config
            .collection("invoices")
            .autoinc(AutoIncrementOptions::default().start_at(1000).increment_by(10))
    })
    .await;

    let first = invoices.create(doc! { "name": "first" }).await.unwrap();
    let second = invoices.create(doc! { "name": "second" }).await.unwrap();

    assert_eq!(first.id(), Some(&Bson::Int64(1000)));
    assert_eq!(second.id(), Some(&Bson::Int64(1010)));
    assert!(invoices.find_by_id(1010_i64).await.unwrap().is_some());
}

#[tokio::test]
async fn next_count_and_reset_count() {
    let users = users(|config| config.autoinc(AutoIncrementOptions::new("seq").start_at(5))).await;

    assert_eq!(users.next_count().await.unwrap(), 5);

    users.create(doc! { "name": "Alice" }).await.unwrap();
    users.create(doc! { "name": "Bob" }).await.unwrap();
    assert_eq!(users.next_count().await.unwrap(), 7);

    assert_eq!(users.reset_count().await.unwrap(), 5);
    assert_eq!(users.next_count().await.unwrap(), 5);

    let carol = users.create(doc! { "name": "Carol" }).await.unwrap();
    assert_eq!(carol.get("seq"), Some(&Bson::Int64(5)));
}

#[tokio::test]
async fn counter_helpers_require_autoincrement() {
    let users = users(|config| config).await;

    assert!(matches!(
        users.next_count().await,
        Err(ModelError::CounterNotConfigured(ref name)) if name == "users"
    ));
    assert!(matches!(users.reset_count().await, Err(ModelError::CounterNotConfigured(_))));
}

#[tokio::test]
async fn seeding_keeps_an_existing_counter() {
    let connector = CountingConnector::new();
    let config = ModelConfig::new(connector.clone())
        .schema(doc! { "name": "String" })
        .collection("users")
        .autoinc(AutoIncrementOptions::new("seq"));

    let users = build_model(config.clone()).await.unwrap();
    users.create(doc! { "name": "Alice" }).await.unwrap();

    let rebuilt = build_model(config).await.unwrap();
    let bob = rebuilt.create(doc! { "name": "Bob" }).await.unwrap();

    assert_eq!(bob.get("seq"), Some(&Bson::Int64(2)));
}

#[tokio::test]
async fn unique_email_index_rejects_duplicates() {
    let users = users(|config| config.index((doc! { "email": 1 }, IndexOptions::unique()))).await;

    users.create(doc! { "name": "Alice", "email": "a@example.com" }).await.unwrap();
    let err = users
        .create(doc! { "name": "Impostor", "email": "a@example.com" })
        .await
        .unwrap_err();

    assert!(matches!(err, ModelError::Store(DocumentStoreError::DocumentAlreadyExists(_, ref c)) if c == "users"));
    assert_eq!(users.count(Query::all()).await.unwrap(), 1);
}

#[tokio::test]
async fn pre_save_hook_edits_the_document_before_it_is_stored() {
    let users = users(|config| {
        config.pre(HookEvent::Save, pre_hook(|doc, next| async move {
            if let Some(email) = doc.get_str("email") {
                doc.set("email", email.to_lowercase());
            }
            next.proceed();
        }))
    })
    .await;

    let alice = users.create(doc! { "name": "Alice", "email": "Alice@Example.COM" }).await.unwrap();
    let stored = users.find_by_id(alice.id().cloned().unwrap()).await.unwrap().unwrap();

    assert_eq!(stored.get("email"), Some(&Bson::from("alice@example.com")));
}

#[tokio::test]
async fn save_waits_for_a_deferred_continuation() {
    let users = users(|config| {
        config.pre(HookEvent::Save, pre_hook(|doc, next| async move {
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                doc.set("checked", true);
                next.proceed();
            });
        }))
    })
    .await;

    let alice = users.create(doc! { "name": "Alice" }).await.unwrap();

    assert_eq!(alice.get("checked"), Some(&Bson::Boolean(true)));
}

#[tokio::test]
async fn failing_pre_hook_aborts_the_save() {
    let users = users(|config| {
        config.pre(HookEvent::Save, pre_hook(|doc, next| async move {
            if doc.get_str("name").as_deref() == Some("root") {
                next.fail("reserved name");
            } else {
                next.proceed();
            }
        }))
    })
    .await;

    let err = users.create(doc! { "name": "root" }).await.unwrap_err();

    assert!(matches!(err, ModelError::Hook { event: HookEvent::Save, ref message } if message == "reserved name"));
    assert_eq!(users.count(Query::all()).await.unwrap(), 0);
}

#[tokio::test]
async fn dropped_continuation_aborts_the_remove() {
    let users = users(|config| {
        config.pre(HookEvent::Remove, pre_hook(|_, next| async move { drop(next) }))
    })
    .await;

    let alice = users.create(doc! { "name": "Alice" }).await.unwrap();
    let err = alice.remove().await.unwrap_err();

    assert!(matches!(err, ModelError::HookAborted { event: HookEvent::Remove }));
    assert_eq!(users.count(Query::all()).await.unwrap(), 1);
}

#[tokio::test]
async fn post_hooks_see_the_stored_document() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let saved = seen.clone();
    let removed = seen.clone();

    let users = users(move |config| {
        config
            .post(HookEvent::Save, post_hook(move |doc| {
                let saved = saved.clone();
                async move {
                    saved.lock().unwrap().push(format!("saved {}", doc.get_str("name").unwrap_or("?")));
                }
            }))
            .post(HookEvent::Remove, post_hook(move |doc| {
                let removed = removed.clone();
                async move {
                    removed.lock().unwrap().push(format!("removed {}", doc.get_str("name").unwrap_or("?")));
                }
            }))
    })
    .await;

    let alice = users.create(doc! { "name": "Alice" }).await.unwrap();
    alice.remove().await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec!["saved Alice", "removed Alice"]);
}

#[tokio::test]
async fn post_find_hooks_run_once_per_loaded_document() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let loaded = seen.clone();

    let users = users(move |config| {
        config.post(HookEvent::Find, post_hook(move |doc| {
            let loaded = loaded.clone();
            async move {
                loaded.lock().unwrap().push(doc.get_str("name").unwrap_or("?").to_string());
            }
        }))
    })
    .await;

    let alice = users.create(doc! { "name": "Alice" }).await.unwrap();
    users.create(doc! { "name": "Bob" }).await.unwrap();
    assert!(seen.lock().unwrap().is_empty());

    users.find(Query::all()).await.unwrap();
    users.find_by_id(alice.id().cloned().unwrap()).await.unwrap();
    users.find_one(Filter::eq("name", "Bob").into()).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec!["Alice", "Bob", "Alice", "Bob"]);
}

#[tokio::test]
async fn instance_methods_are_callable() {
    let greet: InstanceMethod = Arc::new(|user: &Instance, args: Vec<Bson>| -> ModelResult<Bson> {
        let greeting = args.first().and_then(Bson::as_str).unwrap_or("Hello");
        let name = user.get("name").and_then(Bson::as_str).unwrap_or("stranger");

        Ok(Bson::from(format!("{greeting}, {name}")))
    });

    let users = users(|config| config.method("greet", greet)).await;
    let alice = users.new_instance(doc! { "name": "Alice" });

    assert!(alice.is_new());
    assert_eq!(alice.call("greet", vec![]).unwrap(), Bson::from("Hello, Alice"));
    assert_eq!(alice.call("greet", vec![Bson::from("Hi")]).unwrap(), Bson::from("Hi, Alice"));
    assert!(matches!(alice.call("wave", vec![]), Err(ModelError::MethodNotFound(_))));
}

#[tokio::test]
async fn timestamps_are_maintained_when_enabled() {
    let users = users(|config| {
        config.schema_options(SchemaOptions { to_object: None, timestamps: true })
    })
    .await;

    let mut alice = users.create(doc! { "name": "Alice" }).await.unwrap();
    let created = alice.get("createdAt").cloned().unwrap();
    assert!(matches!(created, Bson::DateTime(_)));
    assert!(alice.get("updatedAt").is_some());

    alice.set("name", "Alicia");
    alice.save().await.unwrap();

    assert_eq!(alice.get("createdAt"), Some(&created));
}

#[tokio::test]
async fn callback_variant_delivers_the_same_result() {
    let users = users(|config| config.autoinc(AutoIncrementOptions::new("seq"))).await;
    let received = Arc::new(Mutex::new(None));
    let sink = received.clone();

    users
        .create(doc! { "name": "Alice" })
        .callback(move |result| {
            *sink.lock().unwrap() = result.ok().and_then(|user| user.get("seq").cloned());
        })
        .await;

    assert_eq!(*received.lock().unwrap(), Some(Bson::Int64(1)));

    let count = users.count(Query::all()).await.unwrap();
    let mut counted = None;
    users
        .count(Query::all())
        .callback(|result| counted = result.ok())
        .await;

    assert_eq!(counted, Some(count));
}
