use std::io::Write;

use chrono::{DateTime, TimeZone, Utc};
use futures::executor::block_on;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use rtdb_rx::{
    CodecConfig, CollectionEventType, CollectionPath, DataStrategy, DatabaseService, DateStrategy,
    DecodeError, DecodeResultStreamExt, KeyStrategy, MemoryDatabase, MemoryReference,
    NonConformingFloatStrategy, Path, Reference, RxError, TransportError,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Upload {
    file_name: String,
    #[serde(with = "rtdb_rx::codec::date")]
    uploaded_at: DateTime<Utc>,
    #[serde(with = "rtdb_rx::codec::bytes")]
    thumbnail: Vec<u8>,
    #[serde(with = "rtdb_rx::codec::float")]
    ratio: f64,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn upload(ratio: f64) -> Upload {
    Upload {
        file_name: "cat.png".to_string(),
        uploaded_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        thumbnail: vec![0xde, 0xad, 0xbe, 0xef],
        ratio,
    }
}

fn service_with(config: CodecConfig) -> (MemoryDatabase, DatabaseService<MemoryReference>) {
    let db = MemoryDatabase::new();
    let service = DatabaseService::with_config(db.reference(), config);
    (db, service)
}

#[test]
fn config_file_drives_stored_representation() {
    init_tracing();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "date": {{ "kind": "seconds_since_1970" }},
            "data": "hex",
            "keys": "camel_case",
            "non_conforming_floats": {{
                "kind": "convert_to_string",
                "positive_infinity": "+inf",
                "negative_infinity": "-inf",
                "nan": "nan"
            }}
        }}"#
    )
    .unwrap();

    let config = CodecConfig::load(file.path()).unwrap();
    assert_eq!(config.keys, KeyStrategy::CamelCase);
    assert_eq!(config.data, DataStrategy::Hex);

    let (db, service) = service_with(config);
    let path: Path<Upload> = Path::parse("uploads/cat").unwrap();
    service.set_value(&path, &upload(f64::INFINITY)).unwrap();

    assert_eq!(
        db.value_at("uploads/cat"),
        json!({
            "fileName": "cat.png",
            "uploadedAt": 1_714_566_600.0,
            "thumbnail": "deadbeef",
            "ratio": "+inf",
        })
    );
    assert_eq!(block_on(service.fetch_once(&path)).unwrap(), upload(f64::INFINITY));
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Sighting {
    species_name: String,
    #[serde(with = "rtdb_rx::codec::date")]
    seen_at: DateTime<Utc>,
    #[serde(with = "rtdb_rx::codec::bytes")]
    photo: Vec<u8>,
}

#[test]
fn formatted_dates_and_snake_keys_round_trip() {
    let config = CodecConfig {
        date: DateStrategy::Formatted("%Y-%m-%d %H:%M:%S".to_string()),
        keys: KeyStrategy::SnakeCase,
        ..CodecConfig::default()
    };
    let (db, service) = service_with(config);
    let path: Path<Sighting> = Path::parse("sightings/heron").unwrap();
    let sighting = Sighting {
        species_name: "grey heron".to_string(),
        seen_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        photo: vec![0xde, 0xad, 0xbe, 0xef],
    };
    service.set_value(&path, &sighting).unwrap();

    assert_eq!(
        db.value_at("sightings/heron"),
        json!({
            "species_name": "grey heron",
            "seen_at": "2024-05-01 12:30:00",
            "photo": "3q2+7w==",
        })
    );
    assert_eq!(block_on(service.fetch_once(&path)).unwrap(), sighting);
}

/// Rust-side snake_case fields, including segments that camelCase cannot
/// restore on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SnakeFields {
    address_line_1: String,
    pos_x_y: i32,
    line2_text: String,
    http_server: String,
    user_id: u32,
    x: bool,
    _private_field: bool,
    #[serde(rename = "userID")]
    legacy_user_id: u32,
}

/// Rust-side camelCase fields, including acronyms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CamelFields {
    address_line1: String,
    pos_x_y: i32,
    line2_text: String,
    http_server: String,
    #[serde(rename = "userID")]
    user_id: u32,
    x: bool,
    #[serde(rename = "_privateField")]
    private_field: bool,
}

fn snake_fields() -> SnakeFields {
    SnakeFields {
        address_line_1: "1 Main St".to_string(),
        pos_x_y: 3,
        line2_text: "Apt 4".to_string(),
        http_server: "nginx".to_string(),
        user_id: 7,
        x: true,
        _private_field: false,
        legacy_user_id: 8,
    }
}

fn camel_fields() -> CamelFields {
    CamelFields {
        address_line1: "1 Main St".to_string(),
        pos_x_y: 3,
        line2_text: "Apt 4".to_string(),
        http_server: "nginx".to_string(),
        user_id: 7,
        x: true,
        private_field: false,
    }
}

fn round_trip<T>(keys: KeyStrategy, value: &T) -> serde_json::Value
where
    T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug + Send + 'static,
{
    let (db, service) = service_with(CodecConfig {
        keys,
        ..CodecConfig::default()
    });
    let path: Path<T> = Path::parse("records/r1").unwrap();
    service.set_value(&path, value).unwrap();
    let fetched = block_on(service.fetch_once(&path));
    assert_eq!(fetched.as_ref().ok(), Some(value), "{keys:?}: {fetched:?}");
    db.value_at("records/r1")
}

#[test]
fn key_strategies_round_trip_every_field_shape() {
    for keys in [KeyStrategy::UseDefaultKeys, KeyStrategy::CamelCase] {
        round_trip(keys, &snake_fields());
    }
    for keys in [KeyStrategy::UseDefaultKeys, KeyStrategy::SnakeCase] {
        round_trip(keys, &camel_fields());
    }
}

#[test]
fn camel_case_stores_unrestorable_keys_verbatim() {
    let stored = round_trip(KeyStrategy::CamelCase, &snake_fields());
    assert_eq!(
        stored,
        json!({
            "address_line_1": "1 Main St",
            "pos_x_y": 3,
            "line2Text": "Apt 4",
            "httpServer": "nginx",
            "userId": 7,
            "x": true,
            "_privateField": false,
            "userID": 8,
        })
    );
}

#[test]
fn snake_case_stores_acronyms_verbatim() {
    let stored = round_trip(KeyStrategy::SnakeCase, &camel_fields());
    assert_eq!(
        stored,
        json!({
            "address_line1": "1 Main St",
            "posXY": 3,
            "line2_text": "Apt 4",
            "http_server": "nginx",
            "userID": 7,
            "x": true,
            "_private_field": false,
        })
    );
}

#[test]
fn rejected_float_fails_the_write_and_stores_nothing() {
    let (db, service) = service_with(CodecConfig {
        non_conforming_floats: NonConformingFloatStrategy::Reject,
        ..CodecConfig::default()
    });
    let path: Path<Upload> = Path::parse("uploads/bad").unwrap();

    let err = service.set_value(&path, &upload(f64::NAN)).unwrap_err();
    assert!(err.is_encode());
    assert!(db.value_at("uploads/bad").is_null());
}

#[test]
fn added_values_keep_insertion_order() {
    let (_db, service) = service_with(CodecConfig::default());
    let log: CollectionPath<String> = CollectionPath::new(["log"]).unwrap();

    let keys: Vec<String> = ["one", "two", "three"]
        .iter()
        .map(|line| service.add_value(&log, &(*line).to_string()).unwrap())
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);

    let all = service.observe_collection(CollectionEventType::ChildAdded, &log).subscribe();
    let lines: Vec<String> = block_on(all.successes().take(3).collect());
    assert_eq!(lines, vec!["one", "two", "three"]);
}

#[test]
fn presence_on_a_live_value_stream() {
    let (db, service) = service_with(CodecConfig::default());
    let path: Path<u32> = Path::parse("profile/age").unwrap();
    let mut failures = Vec::new();

    let sub = service.observe(&path).subscribe();
    service.set_value(&path, &30).unwrap();
    db.reference_at("profile/age").set_value(json!("thirty")).unwrap();
    service.set_value(&path, &31).unwrap();
    db.reference_at("profile").set_value(json!(null)).unwrap();

    let seen: Vec<Option<u32>> = block_on(
        sub.if_present_handling_errors(|err| failures.push(err.clone()))
            .take(4)
            .collect(),
    );
    assert_eq!(seen, vec![None, Some(30), Some(31), None]);
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0], DecodeError::TypeMismatch { .. }));
}

#[test]
fn fetch_in_collection_takes_the_next_change() {
    let (_db, service) = service_with(CodecConfig::default());
    let scores: CollectionPath<u32> = CollectionPath::new(["scores"]).unwrap();
    service.set_value(&scores.child("ada").unwrap(), &1).unwrap();

    let result = block_on(async {
        let mut changed = service.fetch_once_in(CollectionEventType::ChildChanged, &scores);
        assert!(futures::poll!(&mut changed).is_pending());
        service.set_value(&scores.child("ada").unwrap(), &2).unwrap();
        changed.await
    });
    assert_eq!(result.unwrap(), 2);
}

#[test]
fn protected_location_rejects_writes() {
    let (db, service) = service_with(CodecConfig::default());
    db.protect("admin");
    let path: Path<bool> = Path::parse("admin/flags/beta").unwrap();

    let err = service.set_value(&path, &true).unwrap_err();
    assert!(matches!(
        err,
        RxError::Transport(TransportError::PermissionDenied { ref path }) if path == "admin"
    ));
}
