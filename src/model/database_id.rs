use crate::error::{invalid_argument, FirestoreResult};

pub const DEFAULT_DATABASE_ID: &str = "(default)";

/// Identifies one Firestore database inside a Google Cloud project.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DatabaseId {
    project_id: String,
    database: String,
}

impl DatabaseId {
    pub fn new(project_id: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database: database.into(),
        }
    }

    pub fn default(project_id: impl Into<String>) -> Self {
        Self::new(project_id, DEFAULT_DATABASE_ID)
    }

    /// Parses a `projects/{project}/databases/{database}` resource name.
    pub fn from_resource_name(name: &str) -> FirestoreResult<Self> {
        let segments: Vec<&str> = name.trim_matches('/').split('/').collect();
        match segments.as_slice() {
            ["projects", project, "databases", database]
                if !project.is_empty() && !database.is_empty() =>
            {
                Ok(Self::new(*project, *database))
            }
            _ => Err(invalid_argument(format!(
                "'{name}' is not a database resource name"
            ))),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn is_default_database(&self) -> bool {
        self.database == DEFAULT_DATABASE_ID
    }

    pub fn with_database(&self, database: impl Into<String>) -> Self {
        Self::new(self.project_id.clone(), database)
    }

    /// `projects/{project}/databases/{database}`
    pub fn resource_name(&self) -> String {
        format!("projects/{}/databases/{}", self.project_id, self.database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_database() {
        let db = DatabaseId::default("shop");
        assert!(db.is_default_database());
        assert_eq!(db.resource_name(), "projects/shop/databases/(default)");
    }

    #[test]
    fn parses_resource_name() {
        let db = DatabaseId::from_resource_name("projects/shop/databases/orders").unwrap();
        assert_eq!(db.project_id(), "shop");
        assert_eq!(db.database(), "orders");

        let err = DatabaseId::from_resource_name("projects/shop").unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
    }
}
