//! Resolver settings.

use std::path::PathBuf;

/// Default system resolver configuration file.
pub const DEFAULT_RESOLV_CONF: &str = "/etc/resolv.conf";

/// Settings key holding the statically configured fallback nameservers.
pub const FALLBACK_NAMESERVERS: &str = "FallbackNameservers";

/// Maximum number of `nameserver` lines a resolver file may declare (`MAXNS`).
pub const MAX_NAMESERVERS: usize = 3;

/// Maximum number of domains on the `search` line (`MAXDNSRCH`).
pub const MAX_SEARCH_DOMAINS: usize = 6;

/// Settings read once when the resolver is initialized.
///
/// # Example
///
/// ```
/// use resolv_manager::ResolverSettings;
///
/// let settings = ResolverSettings::new()
///     .with_dnsproxy(true)
///     .with_fallback_nameservers(["8.8.8.8", "1.1.1.1"]);
///
/// assert!(settings.use_dnsproxy);
/// assert_eq!(settings.fallback_nameservers.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Target of the resolv-file backend.
    pub resolv_conf: PathBuf,

    /// Try the DNS proxy backend first, falling back to the file on failure.
    pub use_dnsproxy: bool,

    /// Interface-less servers registered when the proxy backend is active.
    pub fallback_nameservers: Vec<String>,
}

impl ResolverSettings {
    /// Creates settings targeting `/etc/resolv.conf` with the proxy disabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resolv_conf: PathBuf::from(DEFAULT_RESOLV_CONF),
            use_dnsproxy: false,
            fallback_nameservers: Vec::new(),
        }
    }

    /// Overrides the resolv.conf path (useful for testing).
    #[must_use]
    pub fn with_resolv_conf(mut self, path: impl Into<PathBuf>) -> Self {
        self.resolv_conf = path.into();
        self
    }

    #[must_use]
    pub const fn with_dnsproxy(mut self, enabled: bool) -> Self {
        self.use_dnsproxy = enabled;
        self
    }

    #[must_use]
    pub fn with_fallback_nameservers<I, S>(mut self, servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallback_nameservers = servers.into_iter().map(Into::into).collect();
        self
    }

    /// Looks up a string-list setting by key. Unknown keys yield an empty list.
    #[must_use]
    pub fn string_list(&self, key: &str) -> &[String] {
        match key {
            FALLBACK_NAMESERVERS => &self.fallback_nameservers,
            _ => &[],
        }
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sets_defaults() {
        let s = ResolverSettings::new();
        assert_eq!(s.resolv_conf, PathBuf::from("/etc/resolv.conf"));
        assert!(!s.use_dnsproxy);
        assert!(s.fallback_nameservers.is_empty());
    }

    #[test]
    fn string_list_by_key() {
        let s = ResolverSettings::new().with_fallback_nameservers(["9.9.9.9"]);
        assert_eq!(s.string_list(FALLBACK_NAMESERVERS), ["9.9.9.9".to_string()]);
        assert!(s.string_list("Timeservers").is_empty());
    }
}
