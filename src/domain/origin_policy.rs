/// The configured `Origin` allow-list for form submissions.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed_origins: Vec<String>,
}

impl OriginPolicy {
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Self { allowed_origins }
    }

    /// Empty and `"null"` origins pass so curl and server-to-server callers
    /// keep working; anything else must match the allow-list exactly.
    pub fn allows(&self, origin: &str) -> bool {
        if origin.is_empty() || origin == "null" {
            return true;
        }
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }
}
