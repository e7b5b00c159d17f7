// Diesel table definitions for the tracking store.
// Kept in sync by hand with src/migrations/.

diesel::table! {
    dates (date) {
        date -> Text,
        discovered_at -> Nullable<Text>,
        status -> Nullable<Text>,
    }
}

diesel::table! {
    documents (url) {
        url -> Text,
        date -> Text,
        doc_id -> Nullable<Text>,
        doc_index -> Nullable<Integer>,
        discovered_at -> Nullable<Text>,
        claims_status -> Nullable<Text>,
        claims_error -> Nullable<Text>,
        claims_processed_at -> Nullable<Text>,
        xml_status -> Nullable<Text>,
        xml_error -> Nullable<Text>,
        xml_processed_at -> Nullable<Text>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(dates, documents);
