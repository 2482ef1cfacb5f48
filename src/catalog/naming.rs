/// Maps a logical schema name onto the catalog database that holds its tables.
pub trait DatabaseNameResolver: Send + Sync {
    fn database_name(&self, schema_name: &str) -> String;
}

// Wraps the schema name in a fixed prefix and suffix, e.g. to keep one catalog
// shared between several environments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AffixDatabaseNames {
    pub prefix: String,
    pub suffix: String,
}

impl AffixDatabaseNames {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }
}

impl DatabaseNameResolver for AffixDatabaseNames {
    fn database_name(&self, schema_name: &str) -> String {
        format!("{}{schema_name}{}", self.prefix, self.suffix)
    }
}
