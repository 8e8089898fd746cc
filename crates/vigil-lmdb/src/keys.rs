/// Name of the database holding application records
pub const DATA_DB: &str = "data";

/// Name of the database holding store metadata
pub const META_DB: &str = "meta";

/// Meta keys used in the meta database
pub mod meta_keys {
    pub const SCHEMA_VERSION: &str = "schema_version";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";
}

pub const SCHEMA_VERSION: u32 = 1;
