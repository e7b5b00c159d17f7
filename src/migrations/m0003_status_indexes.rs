use cetane::prelude::*;

/// Adopted legacy databases may already carry the per-column indexes.
pub fn migration() -> Migration {
    Migration::new("0003_status_indexes")
        .depends_on(&["0002_xml_track"])
        .operation(RunSql::portable().for_backend(
            "sqlite",
            r#"CREATE INDEX IF NOT EXISTS idx_documents_date ON documents (date);
CREATE INDEX IF NOT EXISTS idx_documents_claims_status ON documents (claims_status);
CREATE INDEX IF NOT EXISTS idx_documents_xml_status ON documents (xml_status);
CREATE INDEX IF NOT EXISTS idx_documents_date_index ON documents (date, doc_index)"#,
        ))
}
