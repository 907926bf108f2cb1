//! Resolver entries: one (interface, domain, server) binding each.

use crate::scheduler::{ExpiryTimer, TimerToken};
use std::time::Duration;

/// Entry flag bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryFlags(u32);

impl EntryFlags {
    pub const NONE: Self = Self(0);

    /// Statically configured fallback server.
    pub const PUBLIC: Self = Self(1 << 0);

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

/// An active resolver binding.
///
/// An absent interface marks a global entry. An entry carries an expiry timer
/// iff it was created with a nonzero lifetime; the timer is cancelled when the
/// entry is dropped.
#[derive(Debug)]
pub struct ResolverEntry {
    pub(crate) interface: Option<String>,
    pub(crate) domain: Option<String>,
    pub(crate) server: Option<String>,
    pub(crate) flags: EntryFlags,
    pub(crate) expiry: Option<ExpiryTimer>,
}

impl ResolverEntry {
    pub(crate) fn new(
        interface: Option<&str>,
        domain: Option<&str>,
        server: Option<&str>,
        flags: EntryFlags,
    ) -> Self {
        Self {
            interface: interface.map(str::to_owned),
            domain: domain.map(str::to_owned),
            server: server.map(str::to_owned),
            flags,
            expiry: None,
        }
    }

    #[must_use]
    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }

    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    #[must_use]
    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    #[must_use]
    pub const fn flags(&self) -> EntryFlags {
        self.flags
    }

    #[must_use]
    pub const fn is_public(&self) -> bool {
        self.flags.contains(EntryFlags::PUBLIC)
    }

    /// Lifetime of the currently armed timer, `None` for permanent entries.
    #[must_use]
    pub fn lifetime(&self) -> Option<Duration> {
        self.expiry.as_ref().map(ExpiryTimer::lifetime)
    }

    #[must_use]
    pub const fn expires(&self) -> bool {
        self.expiry.is_some()
    }

    pub(crate) fn has_token(&self, token: TimerToken) -> bool {
        self.expiry.as_ref().is_some_and(|t| t.token() == token)
    }

    /// Exact match on all three fields; absent only equals absent.
    pub(crate) fn is(&self, interface: Option<&str>, domain: Option<&str>, server: Option<&str>) -> bool {
        self.interface() == interface && self.domain() == domain && self.server() == server
    }

    /// Request match: absent interface or domain in the request means "any".
    pub(crate) fn matches(&self, interface: Option<&str>, domain: Option<&str>, server: Option<&str>) -> bool {
        interface.is_none_or(|i| self.interface() == Some(i))
            && domain.is_none_or(|d| self.domain() == Some(d))
            && self.server() == server
    }

    /// Cancels the pending expiry, if any.
    pub(crate) fn cancel_expiry(&mut self) {
        if let Some(timer) = self.expiry.take() {
            timer.cancel();
        }
    }
}
