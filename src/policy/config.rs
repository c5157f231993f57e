use super::types::{Backup, Durability, Governance, Retention, Scope};

/// Policy governs scoping, retention, backups, locking and durability for tidyard.
///
/// Grouped fields provide clearer ownership and ergonomics.
#[derive(Clone, Debug, Default)]
pub struct Policy {
    pub scope: Scope,
    pub retention: Retention,
    pub backup: Backup,
    pub governance: Governance,
    pub durability: Durability,
}

impl Policy {
    /// Defaults plus a hard requirement for durable jobs: no local fallback.
    ///
    /// # Example
    /// ```rust
    /// use tidyard::policy::Policy;
    /// let policy = Policy::strict_preset();
    /// assert!(!policy.governance.allow_local_fallback);
    /// ```
    #[must_use]
    pub fn strict_preset() -> Self {
        let mut p = Self::default();
        p.apply_strict_preset();
        p
    }

    /// Mutate this Policy to apply the strict preset; see `strict_preset()`.
    pub fn apply_strict_preset(&mut self) -> &mut Self {
        self.governance.allow_local_fallback = false;
        self.durability.fsync = true;
        self.scope.confine_to_target = true;
        self
    }

    /// Retention override.
    #[must_use]
    pub fn with_max_sessions(mut self, n: usize) -> Self {
        self.retention.max_sessions_per_folder = n.max(1);
        self
    }
}
