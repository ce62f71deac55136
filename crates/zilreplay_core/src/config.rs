//! Replay configuration.

use zilreplay_store::XattrSet;

/// Number of 32-bit words in the extended-attribute request map.
pub const DEFAULT_XVA_MAP_SIZE: u32 = 3;

/// Configuration for a [`ReplayEngine`](crate::ReplayEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayConfig {
    /// Whether records carrying extended attributes can be replayed.
    pub xattr_support: bool,

    /// Whether records carrying access-control lists can be replayed.
    pub acl_support: bool,

    /// Request-map word count every extended-attribute block must declare.
    pub xva_map_size: u32,

    /// Extended attributes the store is able to apply.
    pub xattr_capability: XattrSet,

    /// Whether bytes left after the last sub-structure, beyond word padding,
    /// are an error.
    pub strict_trailing: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            xattr_support: true,
            acl_support: true,
            xva_map_size: DEFAULT_XVA_MAP_SIZE,
            xattr_capability: XattrSet::ALL,
            strict_trailing: true,
        }
    }
}

impl ReplayConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether extended-attribute records are supported.
    #[must_use]
    pub const fn xattr_support(mut self, value: bool) -> Self {
        self.xattr_support = value;
        self
    }

    /// Sets whether ACL records are supported.
    #[must_use]
    pub const fn acl_support(mut self, value: bool) -> Self {
        self.acl_support = value;
        self
    }

    /// Sets the expected request-map word count.
    #[must_use]
    pub const fn xva_map_size(mut self, words: u32) -> Self {
        self.xva_map_size = words;
        self
    }

    /// Sets the extended attributes the store can apply.
    #[must_use]
    pub const fn xattr_capability(mut self, attrs: XattrSet) -> Self {
        self.xattr_capability = attrs;
        self
    }

    /// Sets whether over-long records are rejected.
    #[must_use]
    pub const fn strict_trailing(mut self, value: bool) -> Self {
        self.strict_trailing = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ReplayConfig::default();
        assert!(config.xattr_support);
        assert!(config.acl_support);
        assert_eq!(config.xva_map_size, 3);
        assert_eq!(config.xattr_capability, XattrSet::ALL);
        assert!(config.strict_trailing);
    }

    #[test]
    fn builder_pattern() {
        let config = ReplayConfig::new()
            .acl_support(false)
            .xva_map_size(1)
            .xattr_capability(XattrSet::HIDDEN | XattrSet::SYSTEM)
            .strict_trailing(false);

        assert!(!config.acl_support);
        assert!(config.xattr_support);
        assert_eq!(config.xva_map_size, 1);
        assert!(!config.xattr_capability.contains(XattrSet::IMMUTABLE));
        assert!(!config.strict_trailing);
    }
}
