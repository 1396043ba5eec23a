//! Library-level tests of the ingestion pass against a real SQLite store.

use std::str::FromStr;

use rust_decimal::Decimal;
use tempfile::TempDir;

use tariff_ingest::config::Config;
use tariff_ingest::db;
use tariff_ingest::migrate;
use tariff_ingest::sqlite_store::SqliteStore;
use tariff_ingest_core::models::{TariffFields, TariffRecord, UpsertMode};
use tariff_ingest_core::parse::ParseOptions;
use tariff_ingest_core::store::TariffStore;
use tariff_ingest_core::upsert::Ingestor;

const LINES: &[&str] = &[
    "8471301000\tPersonal computer\tКомпьютер\tElectronics\tComputers\tpc,laptop\t10.00\t12.00\t0.00\t[\"CoC\"]",
    "2203000100\tPivo\tПиво\tIchimliklar\tPivo\tpivo\tMaxsus stavka\t12,50\t\t",
    "0101210000\tOtlar\t-\t-\t-\t-\t0\t12\t0\tVeterinariya sertifikati",
];

async fn open_store(tmp: &TempDir) -> SqliteStore {
    let mut config = Config::minimal();
    config.db.path = tmp.path().join("tariff.sqlite");
    let pool = db::connect(&config).await.unwrap();
    migrate::apply_schema(&pool).await.unwrap();
    SqliteStore::new(pool)
}

#[tokio::test]
async fn sqlite_store_round_trips_values() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    let mut fields = TariffFields::with_description("Pivo");
    fields.duty_rate = Decimal::from_str("12.50").unwrap();
    fields.required_certificates = vec!["Gigiyena sertifikati".to_string()];
    fields.sources = vec!["info.txt@abc".to_string()];
    let record = TariffRecord {
        code: "2203000100".to_string(),
        fields,
    };
    store.insert(&record).await.unwrap();

    let back = store.find_by_code("2203000100").await.unwrap().unwrap();
    assert_eq!(back, record);
    assert_eq!(back.fields.vat_rate.to_string(), "12.00");
    assert!(store.find_by_code("0000000000").await.unwrap().is_none());

    // Codes are unique; updates need an existing row.
    assert!(store.insert(&record).await.is_err());
    assert!(store
        .update("9999999999", &record.fields)
        .await
        .is_err());
    assert_eq!(store.count().await.unwrap(), 1);
    store.close().await;
}

#[tokio::test]
async fn schema_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;
    migrate::apply_schema(store.pool()).await.unwrap();
    migrate::apply_schema(store.pool()).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn two_passes_create_then_update() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    let mut first = Ingestor::new(&store, "info.txt@111111111111", UpsertMode::Overwrite, ParseOptions::default());
    first.ingest_lines(LINES.iter().copied(), None, 100, |_, _| {}).await;
    let first = first.finish();
    assert_eq!((first.created, first.updated, first.errors), (3, 0, 0));
    assert_eq!(first.fallbacks.duty.placeholder, 1);
    assert_eq!(first.fallbacks.excise_absent, 1);
    assert_eq!(first.fallbacks.certificates_verbatim, 1);

    let mut second = Ingestor::new(&store, "info.txt@222222222222", UpsertMode::Overwrite, ParseOptions::default());
    second.ingest_lines(LINES.iter().copied(), None, 100, |_, _| {}).await;
    let second = second.finish();
    assert_eq!((second.created, second.updated, second.errors), (0, 3, 0));

    let all = store.list_all().await.unwrap();
    let codes: Vec<&str> = all.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes, vec!["0101210000", "2203000100", "8471301000"]);

    let pivo = &all[1].fields;
    assert_eq!(pivo.duty_rate.to_string(), "0.00");
    assert_eq!(pivo.vat_rate.to_string(), "12.50");
    assert_eq!(pivo.excise_rate.to_string(), "0.00");
    assert_eq!(
        pivo.sources,
        vec!["info.txt@111111111111", "info.txt@222222222222"]
    );

    let otlar = &all[0].fields;
    assert_eq!(otlar.description_secondary.as_deref(), Some("-"));
    assert_eq!(otlar.required_certificates, vec!["Veterinariya sertifikati"]);
    store.close().await;
}
