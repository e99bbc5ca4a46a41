//! Configuration options for tag discovery

/// What enumeration does when a DESFire tag cannot be identified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumerationPolicy {
    /// Skip the tag, log a warning and keep going (default)
    #[default]
    SkipUnreachable,
    /// Abort the whole enumeration with `TagUnreachable`
    Strict,
}

/// Configuration options for [`TagDirectory`](crate::TagDirectory)
#[derive(Debug, Clone, Default)]
pub struct DirectoryConfig {
    /// Per-tag failure policy
    pub policy: EnumerationPolicy,
}

impl DirectoryConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-tag failure policy
    pub const fn with_policy(mut self, policy: EnumerationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Shorthand for the strict policy
    pub const fn strict(self) -> Self {
        self.with_policy(EnumerationPolicy::Strict)
    }
}
