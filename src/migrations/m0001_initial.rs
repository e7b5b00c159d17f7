use cetane::prelude::*;

pub fn migration() -> Migration {
    Migration::new("0001_initial_schema")
        .operation(
            CreateTable::new("dates")
                .add_field(Field::new("date", FieldType::Text).primary_key())
                .add_field(Field::new("discovered_at", FieldType::Text))
                .add_field(Field::new("status", FieldType::Text).default("'pending'")),
        )
        // documents carries only the claims track here; 0002 adds the xml track
        .operation(
            CreateTable::new("documents")
                .add_field(Field::new("url", FieldType::Text).primary_key())
                .add_field(
                    Field::new("date", FieldType::Text)
                        .not_null()
                        .references("dates", "date"),
                )
                .add_field(Field::new("doc_id", FieldType::Text))
                .add_field(Field::new("discovered_at", FieldType::Text))
                .add_field(Field::new("claims_status", FieldType::Text).default("'pending'"))
                .add_field(Field::new("claims_error", FieldType::Text))
                .add_field(Field::new("claims_processed_at", FieldType::Text)),
        )
}
