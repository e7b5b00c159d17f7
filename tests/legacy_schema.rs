//! Opening a store written by the untracked scraper upgrades it in place.

use epoharvest::models::{DiscoveredDocument, Mode, TrackStatus};
use epoharvest::repository::TrackingRepository;

fn write_version_zero(path: &std::path::Path) {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE dates (
            date TEXT PRIMARY KEY,
            discovered_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            status TEXT DEFAULT 'pending'
        );
        CREATE TABLE documents (
            url TEXT PRIMARY KEY,
            date TEXT,
            doc_id TEXT,
            status TEXT DEFAULT 'pending',
            error_message TEXT,
            discovered_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            processed_at TIMESTAMP,
            FOREIGN KEY (date) REFERENCES dates(date)
        );
        INSERT INTO dates (date) VALUES ('20240103'), ('20240110');
        INSERT INTO documents (url, date, doc_id, status, error_message, processed_at) VALUES
            ('https://example.test/patents/EP1/document.xml', '20240103', 'EP1', 'completed', NULL, '2024-01-05 10:00:00'),
            ('https://example.test/patents/EP2/document.xml', '20240103', 'EP2', 'failed', 'timeout', '2024-01-05 10:01:00'),
            ('https://example.test/patents/EP3/document.xml', '20240110', 'EP3', 'pending', NULL, NULL);",
    )
    .unwrap();
}

#[tokio::test]
async fn legacy_store_keeps_claims_progress_and_gains_xml_track() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("epo.db");
    write_version_zero(&path);

    let repo = TrackingRepository::open(&path).await.unwrap();

    let failed = repo
        .get_document("https://example.test/patents/EP2/document.xml")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(failed.claims.status, TrackStatus::Failed);
    assert_eq!(failed.claims.error.as_deref(), Some("timeout"));
    assert!(failed.claims.processed_at.is_some());
    assert_eq!(failed.xml.status, TrackStatus::Pending);
    assert_eq!(failed.doc_index, 2);

    let claims: Vec<String> = repo
        .get_pending(Mode::Claims, None, None)
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.doc_id)
        .collect();
    assert_eq!(claims, vec!["EP3"]);

    let xml = repo.get_pending(Mode::Xml, None, None).await.unwrap();
    assert_eq!(xml.len(), 3);

    let stats = repo.stats().await.unwrap();
    assert_eq!(stats.claims.total, 3);
    assert_eq!(stats.claims.count(TrackStatus::Completed), 1);
    assert_eq!(stats.xml.count(TrackStatus::Pending), 3);
    assert_eq!(stats.known_dates, 2);
}

#[tokio::test]
async fn legacy_store_numbers_new_documents_after_existing_ones() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("epo.db");
    write_version_zero(&path);

    let repo = TrackingRepository::open(&path).await.unwrap();
    let added = repo
        .add_documents(&[DiscoveredDocument {
            url: "https://example.test/patents/EP4/document.xml".to_string(),
            date: "20240103".to_string(),
            doc_id: "EP4".to_string(),
        }])
        .await
        .unwrap();
    assert_eq!(added, 1);

    let indices: Vec<i64> = repo
        .documents_for_date("20240103")
        .await
        .unwrap()
        .iter()
        .map(|d| d.doc_index)
        .collect();
    assert_eq!(indices, vec![1, 2, 3]);

    drop(repo);
    let reopened = TrackingRepository::open(&path).await.unwrap();
    assert_eq!(reopened.documents_for_date("20240103").await.unwrap().len(), 3);
}
