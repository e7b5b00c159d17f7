use cetane::prelude::*;

pub fn migration() -> Migration {
    Migration::new("0002_xml_track")
        .depends_on(&["0001_initial_schema"])
        .operation(AddField::new(
            "documents",
            Field::new("xml_status", FieldType::Text).default("'pending'"),
        ))
        .operation(AddField::new(
            "documents",
            Field::new("xml_error", FieldType::Text),
        ))
        .operation(AddField::new(
            "documents",
            Field::new("xml_processed_at", FieldType::Text),
        ))
        .operation(AddField::new(
            "documents",
            Field::new("doc_index", FieldType::Integer),
        ))
}
