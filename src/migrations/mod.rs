mod m0001_initial;
mod m0002_xml_track;
mod m0003_status_indexes;

use cetane::prelude::MigrationRegistry;

/// Migrations whose effect is reproduced by legacy-layout adoption.
pub const LEGACY_ADOPTED: &[&str] = &["0001_initial_schema", "0002_xml_track"];

pub fn registry() -> MigrationRegistry {
    let mut reg = MigrationRegistry::new();
    reg.register(m0001_initial::migration());
    reg.register(m0002_xml_track::migration());
    reg.register(m0003_status_indexes::migration());
    reg
}
