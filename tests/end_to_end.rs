//! End-to-end attach scenarios through the Rust API.
#![allow(clippy::unwrap_used, clippy::float_cmp)]

use attachkit::extension::{ExtraInfoData, StorageExtension};
use attachkit::runtime::{Catalog, DEFAULT_SCHEMA, DefaultCatalog};
use attachkit::{AttachInfo, AttachOptions, Database, DbConfig, Error, RuntimeSettings};
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct AttachState {
    attach_called: AtomicBool,
    transaction_called: AtomicBool,
    observed: Mutex<Option<Observed>>,
}

#[derive(Debug, Clone, PartialEq)]
struct Observed {
    name: Option<String>,
    custom: Option<String>,
    flag: Option<bool>,
    count: Option<i64>,
    ratio: Option<f64>,
    connection_id: Option<u64>,
}

fn recording_extension(state: &Arc<AttachState>) -> StorageExtension {
    StorageExtension::new()
        .with_extra_info(Arc::clone(state))
        .with_attach(|info| {
            let Some(state) = info
                .extra_info()
                .cloned()
                .and_then(|data| data.downcast::<AttachState>().ok())
            else {
                info.set_error("extra info missing");
                return;
            };
            state.attach_called.store(true, Ordering::SeqCst);

            let path = info.path().unwrap_or_default().to_string();
            info.set_path(path);

            let observed = Observed {
                name: info.name().map(str::to_string),
                custom: info.get_option_varchar("custom").map(str::to_string),
                flag: info.get_option_boolean("flag"),
                count: info.get_option_bigint("count"),
                ratio: info.get_option_double("ratio"),
                connection_id: info.client_context().map(|c| c.connection_id()),
            };
            *state.observed.lock().unwrap() = Some(observed);
            info.set_default_catalog();
        })
        .with_transaction(|info| {
            if let Some(state) = info.extra_info_as::<AttachState>() {
                state.transaction_called.store(true, Ordering::SeqCst);
            }
            info.set_default_transaction_manager();
        })
}

#[test]
fn test_attach_with_options_and_extra_info() {
    let state = Arc::new(AttachState::default());
    let config = DbConfig::new();
    config
        .add_storage_extension("cstorage", recording_extension(&state))
        .unwrap();

    let db = Database::open(config);
    let client = db.connect();
    let options = AttachOptions::for_type("cstorage")
        .with_option("custom", "value")
        .with_option("flag", true)
        .with_option("count", 42)
        .with_option("ratio", 1.5);
    let attachment = db
        .attach(&client, AttachInfo::new("capi_ext", ":memory:"), options)
        .unwrap();

    assert!(state.attach_called.load(Ordering::SeqCst));
    assert!(state.transaction_called.load(Ordering::SeqCst));
    let observed = state.observed.lock().unwrap().clone().unwrap();
    assert_eq!(
        observed,
        Observed {
            name: Some("capi_ext".to_string()),
            custom: Some("value".to_string()),
            flag: Some(true),
            count: Some(42),
            ratio: Some(1.5),
            connection_id: Some(client.connection_id()),
        }
    );

    assert_eq!(attachment.path(), ":memory:");
    let catalog = attachment
        .catalog()
        .as_any()
        .downcast_ref::<DefaultCatalog>()
        .unwrap();
    assert!(catalog.create_schema("analytics").unwrap());
    assert_eq!(
        catalog.schema_names().unwrap(),
        vec!["analytics".to_string(), DEFAULT_SCHEMA.to_string()]
    );

    let manager = attachment.transaction_manager();
    let txn = manager.begin().unwrap();
    manager.commit(txn).unwrap();
    assert!(matches!(manager.commit(txn), Err(Error::TransactionNotFound(_))));

    db.detach("capi_ext").unwrap();
    assert!(db.attached_names().unwrap().is_empty());
}

#[test]
fn test_attach_failure_is_verbatim_and_skips_transaction() {
    let transaction_calls = Arc::new(AtomicUsize::new(0));
    let calls = Arc::clone(&transaction_calls);
    let config = DbConfig::new();
    config
        .add_storage_extension(
            "cfail",
            StorageExtension::new()
                .with_attach(|info| info.set_error("attach failure"))
                .with_transaction(move |info| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    info.set_default_transaction_manager();
                }),
        )
        .unwrap();

    let db = Database::open(config);
    let client = db.connect();
    let err = db
        .attach(
            &client,
            AttachInfo::new("failing", ":memory:"),
            AttachOptions::for_type("cfail"),
        )
        .unwrap_err();

    assert_eq!(err.to_string(), "attach failure");
    assert_eq!(transaction_calls.load(Ordering::SeqCst), 0);
    assert!(db.attachment("failing").unwrap().is_none());
}

#[test]
fn test_missing_callbacks_fail_with_fixed_text() {
    let config = DbConfig::new();
    config
        .add_storage_extension("bare", StorageExtension::new())
        .unwrap();
    let db = Database::open(config);
    let client = db.connect();

    let err = db
        .attach(&client, AttachInfo::new("b", ""), AttachOptions::for_type("bare"))
        .unwrap_err();
    assert!(err.is_defect());
    assert_eq!(
        err.to_string(),
        "Attach callback was not set for storage extension"
    );
}

#[test]
fn test_path_rewrite_is_installed() {
    let config = DbConfig::new();
    config
        .add_storage_extension(
            "rewriting",
            StorageExtension::new()
                .with_attach(|info| {
                    let rewritten = format!("/data/{}.db", info.name().unwrap_or_default());
                    info.set_path(rewritten);
                    info.set_default_catalog();
                })
                .with_transaction(|info| info.set_default_transaction_manager()),
        )
        .unwrap();
    let db = Database::open(config);
    let client = db.connect();

    let attachment = db
        .attach(
            &client,
            AttachInfo::new("sales", "ignored"),
            AttachOptions::for_type("rewriting"),
        )
        .unwrap();
    assert_eq!(attachment.path(), "/data/sales.db");
}

#[test]
fn test_declared_options_lose_to_call_site() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let config = DbConfig::new();
    config
        .add_storage_extension(
            "layered",
            StorageExtension::new()
                .with_attach(move |info| {
                    let mode = info.get_option_varchar("mode").map(str::to_string);
                    let size = info.get_option_bigint("size");
                    sink.lock().unwrap().push((mode, size));
                    info.set_default_catalog();
                })
                .with_transaction(|info| info.set_default_transaction_manager()),
        )
        .unwrap();
    let db = Database::open(config);
    let client = db.connect();

    let info = AttachInfo::new("l", "")
        .with_option("mode", "declared")
        .with_option("size", "12");
    let options = AttachOptions::for_type("layered").with_option("mode", "call-site");
    db.attach(&client, info, options).unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![(Some("call-site".to_string()), Some(12))]
    );
}

#[test]
fn test_replacing_registration_destroys_previous_extra_info() {
    let destroyed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&destroyed);
    let mut first = StorageExtension::new();
    first.set_extra_info(
        Arc::new("first"),
        Some(Box::new(move |_: &ExtraInfoData| {
            counter.fetch_add(1, Ordering::SeqCst);
        })),
    );

    let config = DbConfig::new();
    config.add_storage_extension("swap", first).unwrap();
    assert_eq!(destroyed.load(Ordering::SeqCst), 0);
    config
        .add_storage_extension("swap", StorageExtension::new())
        .unwrap();
    assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    drop(config);
    assert_eq!(destroyed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_attach_declared_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[[attach]]
name = "first"
path = ":memory:"
type = "memstore"
options = {{ cache_mb = 64 }}

[[attach]]
name = "second"
type = "memstore"
options = {{ cache_mb = "128" }}
"#
    )
    .unwrap();

    let sizes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&sizes);
    let settings = RuntimeSettings::load_from_file(file.path()).unwrap();
    let config = DbConfig::with_settings(settings);
    config
        .add_storage_extension(
            "memstore",
            StorageExtension::new()
                .with_attach(move |info| {
                    sink.lock().unwrap().push(info.get_option_bigint("cache_mb"));
                    info.set_default_catalog();
                })
                .with_transaction(|info| info.set_default_transaction_manager()),
        )
        .unwrap();

    let db = Database::open(config);
    let client = db.connect();
    let attached = db.attach_declared(&client).unwrap();

    assert_eq!(attached.len(), 2);
    assert_eq!(*sizes.lock().unwrap(), vec![Some(64), Some(128)]);
    assert_eq!(db.attached_names().unwrap(), vec!["first", "second"]);
}

#[test]
fn test_concurrent_attaches_share_registry() {
    let config = DbConfig::new();
    config
        .add_storage_extension(
            "memstore",
            StorageExtension::new()
                .with_attach(|info| info.set_default_catalog())
                .with_transaction(|info| info.set_default_transaction_manager()),
        )
        .unwrap();
    let db = Arc::new(Database::open(config));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let db = Arc::clone(&db);
            std::thread::spawn(move || {
                let client = db.connect();
                db.attach(
                    &client,
                    AttachInfo::new(format!("db{i}"), ""),
                    AttachOptions::for_type("memstore"),
                )
                .map(|_| ())
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }
    assert_eq!(db.attached_names().unwrap().len(), 8);
}
