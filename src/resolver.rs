//! The resolver context: active bindings plus the backend they are mirrored to.
//!
//! Every mutation first updates the in-memory entry list and then forwards the
//! change to exactly one backend, chosen once at [`ResolverBuilder::init`]:
//! either a [`DnsProxy`] or the [`ResolvFileStore`]. Removal always collects
//! matching entries first and detaches them in a second pass.

use crate::collaborators::{
    DnsProxy, InterfaceIndex, NoServices, ServiceId, ServiceRegistry, SystemInterfaces,
};
use crate::config::{FALLBACK_NAMESERVERS, ResolverSettings};
use crate::entry::{EntryFlags, ResolverEntry};
use crate::error::{ResolverError, Result};
use crate::resolvfile::ResolvFileStore;
use crate::scheduler::{ExpiryScheduler, TimerToken};
use std::time::Duration;

enum Backend {
    DnsProxy(Box<dyn DnsProxy>),
    ResolvFile(ResolvFileStore),
}

impl Backend {
    fn append(
        &mut self,
        interface: Option<&str>,
        domain: Option<&str>,
        server: Option<&str>,
    ) -> Result<()> {
        match self {
            Self::DnsProxy(proxy) => proxy.append(interface, domain, server),
            Self::ResolvFile(store) => store.append(interface, domain, server),
        }
    }

    fn remove(
        &mut self,
        interface: Option<&str>,
        domain: Option<&str>,
        server: Option<&str>,
    ) -> Result<()> {
        match self {
            Self::DnsProxy(proxy) => proxy.remove(interface, domain, server),
            Self::ResolvFile(store) => store.remove(interface, domain, server),
        }
    }
}

/// Builds a [`Resolver`] and selects its backend.
///
/// # Example
///
/// ```rust,ignore
/// use resolv_manager::{Resolver, ResolverSettings};
///
/// let mut resolver = Resolver::builder(ResolverSettings::new().with_dnsproxy(true))
///     .dnsproxy(Box::new(my_proxy))
///     .services(Box::new(my_services))
///     .init();
/// ```
pub struct ResolverBuilder {
    settings: ResolverSettings,
    dnsproxy: Option<Box<dyn DnsProxy>>,
    services: Box<dyn ServiceRegistry>,
    interfaces: Box<dyn InterfaceIndex>,
}

impl ResolverBuilder {
    #[must_use]
    pub fn dnsproxy(mut self, proxy: Box<dyn DnsProxy>) -> Self {
        self.dnsproxy = Some(proxy);
        self
    }

    #[must_use]
    pub fn services(mut self, services: Box<dyn ServiceRegistry>) -> Self {
        self.services = services;
        self
    }

    #[must_use]
    pub fn interfaces(mut self, interfaces: Box<dyn InterfaceIndex>) -> Self {
        self.interfaces = interfaces;
        self
    }

    /// Selects the backend and registers fallback nameservers.
    ///
    /// The DNS proxy is used only if enabled in the settings, supplied, and
    /// its `init` succeeds. Otherwise the resolver silently runs in
    /// resolv.conf mode. Fallback nameservers are added only in proxy mode.
    #[must_use]
    pub fn init(self) -> Resolver {
        let Self {
            settings,
            dnsproxy,
            services,
            interfaces,
        } = self;

        tracing::debug!(dnsproxy = settings.use_dnsproxy, "Initializing resolver");

        let file_backend = || Backend::ResolvFile(ResolvFileStore::new(&settings.resolv_conf));
        let backend = match dnsproxy {
            Some(mut proxy) if settings.use_dnsproxy => match proxy.init() {
                Ok(()) => Backend::DnsProxy(proxy),
                Err(e) => {
                    tracing::warn!(error = %e, "DNS proxy unavailable, falling back to resolv.conf");
                    file_backend()
                }
            },
            Some(_) | None => {
                if settings.use_dnsproxy {
                    tracing::warn!("No DNS proxy supplied, falling back to resolv.conf");
                }
                file_backend()
            }
        };

        let mut resolver = Resolver {
            backend,
            entries: Vec::new(),
            scheduler: ExpiryScheduler::new(),
            services,
            interfaces,
        };

        if resolver.uses_dnsproxy() {
            tracing::info!("Resolver using DNS proxy backend");
            for server in settings.string_list(FALLBACK_NAMESERVERS) {
                tracing::debug!(%server, "Adding fallback nameserver");
                if let Err(e) = resolver.insert(
                    None,
                    None,
                    Some(server.as_str()),
                    Duration::ZERO,
                    EntryFlags::PUBLIC,
                ) {
                    tracing::warn!(%server, error = %e, "Failed to add fallback nameserver");
                }
            }
        } else {
            tracing::info!(
                path = %settings.resolv_conf.display(),
                "Resolver using resolv.conf backend"
            );
        }

        resolver
    }
}

/// Authoritative set of active (interface, domain, server) bindings.
///
/// All methods run on the daemon's event loop; the resolver is not shared
/// across threads. Entries learned with a lifetime expire through
/// [`next_expired`](Self::next_expired) and [`expire`](Self::expire), which
/// the loop must drive:
///
/// ```rust,ignore
/// loop {
///     tokio::select! {
///         Some(token) = resolver.next_expired() => { resolver.expire(token); }
///         Some(req) = requests.recv() => handle(&mut resolver, req),
///     }
/// }
/// ```
pub struct Resolver {
    backend: Backend,
    entries: Vec<ResolverEntry>,
    scheduler: ExpiryScheduler,
    services: Box<dyn ServiceRegistry>,
    interfaces: Box<dyn InterfaceIndex>,
}

impl Resolver {
    /// Starts building a resolver with no services and system interface lookup.
    #[must_use]
    pub fn builder(settings: ResolverSettings) -> ResolverBuilder {
        ResolverBuilder {
            settings,
            dnsproxy: None,
            services: Box::new(NoServices),
            interfaces: Box::new(SystemInterfaces),
        }
    }

    /// Returns `true` if mutations are routed to the DNS proxy.
    #[must_use]
    pub const fn uses_dnsproxy(&self) -> bool {
        matches!(self.backend, Backend::DnsProxy(_))
    }

    /// The resolv.conf store, present only in resolv.conf mode.
    #[must_use]
    pub const fn resolvfile(&self) -> Option<&ResolvFileStore> {
        match &self.backend {
            Backend::ResolvFile(store) => Some(store),
            Backend::DnsProxy(_) => None,
        }
    }

    /// Active entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[ResolverEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if an entry with exactly these fields is active.
    #[must_use]
    pub fn contains(&self, interface: Option<&str>, domain: Option<&str>, server: Option<&str>) -> bool {
        self.entries.iter().any(|e| e.is(interface, domain, server))
    }

    /// Adds a permanent binding, replacing an identical permanent one.
    ///
    /// # Errors
    ///
    /// - [`ResolverError::InvalidArgument`] if both `domain` and `server` are absent.
    /// - [`ResolverError::OutOfMemory`] if the entry cannot be allocated.
    /// - Any backend error; the entry stays active.
    pub fn append(
        &mut self,
        interface: Option<&str>,
        domain: Option<&str>,
        server: Option<&str>,
    ) -> Result<()> {
        if domain.is_none() && server.is_none() {
            return Err(ResolverError::InvalidArgument("domain or server required"));
        }

        // A replaced entry frees its slot, so `insert` cannot fail to reserve
        // after a removal.
        let matches = self.collect(|e| !e.expires() && e.is(interface, domain, server));
        let replaced = self.remove_entries(&matches);

        self.insert(interface, domain, server, Duration::ZERO, EntryFlags::NONE)?;
        replaced
    }

    /// Adds or refreshes a binding that expires after `lifetime`.
    ///
    /// If an expiring entry with the same fields exists, a zero `lifetime`
    /// expires it immediately and any other value rearms its timer. A new
    /// entry with a nonzero lifetime is reported to the service owning the
    /// interface.
    ///
    /// # Errors
    ///
    /// - [`ResolverError::InvalidArgument`] if `server` is absent.
    /// - [`ResolverError::OutOfMemory`] if the entry cannot be allocated.
    /// - Any backend error; the entry stays active.
    ///
    /// # Panics
    ///
    /// Arming a timer panics outside a Tokio runtime.
    pub fn append_with_lifetime(
        &mut self,
        interface: Option<&str>,
        domain: Option<&str>,
        server: Option<&str>,
        lifetime: Duration,
    ) -> Result<()> {
        tracing::debug!(?interface, ?domain, ?server, ?lifetime, "Appending resolver entry");

        if server.is_none() {
            return Err(ResolverError::InvalidArgument("server required"));
        }

        let existing = self
            .entries
            .iter()
            .position(|e| e.expires() && e.is(interface, domain, server));

        if let Some(pos) = existing {
            self.entries[pos].cancel_expiry();
            if lifetime.is_zero() {
                self.expire_at(pos);
            } else {
                self.entries[pos].expiry = Some(self.scheduler.arm(lifetime));
            }
            return Ok(());
        }

        self.insert(interface, domain, server, lifetime, EntryFlags::NONE)
    }

    /// Removes every entry serving `server`, narrowed by `interface` and
    /// `domain` when given.
    ///
    /// # Errors
    ///
    /// - [`ResolverError::InvalidArgument`] if `server` is absent.
    /// - [`ResolverError::NotFound`] if nothing matched.
    /// - The first backend error; all matches are still removed.
    pub fn remove(
        &mut self,
        interface: Option<&str>,
        domain: Option<&str>,
        server: Option<&str>,
    ) -> Result<()> {
        tracing::debug!(?interface, ?domain, ?server, "Removing resolver entry");

        if server.is_none() {
            return Err(ResolverError::InvalidArgument("server required"));
        }

        let matches = self.collect(|e| e.matches(interface, domain, server));
        if matches.is_empty() {
            return Err(ResolverError::NotFound);
        }

        self.remove_entries(&matches)
    }

    /// Removes every entry bound to `interface`.
    ///
    /// # Errors
    ///
    /// - [`ResolverError::InvalidArgument`] if `interface` is absent.
    /// - [`ResolverError::NotFound`] if the interface had no entries.
    /// - The first backend error; all entries are still removed.
    pub fn remove_all(&mut self, interface: Option<&str>) -> Result<()> {
        tracing::debug!(?interface, "Removing all resolver entries");

        let Some(interface) = interface else {
            return Err(ResolverError::InvalidArgument("interface required"));
        };

        let matches = self.collect(|e| e.interface() == Some(interface));
        if matches.is_empty() {
            return Err(ResolverError::NotFound);
        }

        self.remove_entries(&matches)
    }

    /// Flushes pending proxy requests. No-op in resolv.conf mode.
    pub fn flush(&mut self) {
        if let Backend::DnsProxy(proxy) = &mut self.backend {
            proxy.flush();
        }
    }

    /// Re-registers expiring servers of `interface` with the DNS proxy so it
    /// picks up new source addresses. No-op in resolv.conf mode.
    ///
    /// Entries and their timers are left untouched.
    ///
    /// # Errors
    ///
    /// - [`ResolverError::InvalidArgument`] if `interface` is absent in proxy mode.
    /// - The first proxy error; remaining entries are still re-registered.
    pub fn redo_servers(&mut self, interface: Option<&str>) -> Result<()> {
        let Backend::DnsProxy(proxy) = &mut self.backend else {
            return Ok(());
        };

        tracing::debug!(?interface, "Redoing resolver servers");

        let Some(interface) = interface else {
            return Err(ResolverError::InvalidArgument("interface required"));
        };

        let mut result = Ok(());
        for entry in self
            .entries
            .iter()
            .filter(|e| e.expires() && e.interface() == Some(interface))
        {
            let redo = proxy
                .remove(entry.interface(), entry.domain(), entry.server())
                .and_then(|()| proxy.append(entry.interface(), entry.domain(), entry.server()));
            if let Err(e) = redo {
                tracing::warn!(server = ?entry.server(), error = %e, "Failed to redo server");
                result = result.and(Err(e));
            }
        }
        result
    }

    /// Waits for the next expiry timer to fire.
    pub async fn next_expired(&mut self) -> Option<TimerToken> {
        self.scheduler.next_expired().await
    }

    /// Removes the entry whose timer fired with `token`.
    ///
    /// Returns `false` if no active entry carries the token, which happens
    /// when the entry was removed or rearmed after the timer fired.
    pub fn expire(&mut self, token: TimerToken) -> bool {
        let Some(pos) = self.entries.iter().position(|e| e.has_token(token)) else {
            tracing::debug!(?token, "Ignoring stale expiry timer");
            return false;
        };
        self.expire_at(pos);
        true
    }

    /// Tears the resolver down.
    ///
    /// In proxy mode the proxy is stopped; in resolv.conf mode both stores are
    /// emptied and the file is left as last written. Pending timers are
    /// cancelled either way.
    pub fn cleanup(&mut self) {
        tracing::debug!("Cleaning up resolver");

        match &mut self.backend {
            Backend::DnsProxy(proxy) => proxy.cleanup(),
            Backend::ResolvFile(store) => store.clear(),
        }
        for entry in &mut self.entries {
            entry.cancel_expiry();
        }
        self.entries.clear();
    }

    fn collect(&self, pred: impl Fn(&ResolverEntry) -> bool) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| pred(e))
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Detaches the entries at `positions` (ascending), forwards each removal
    /// to the backend and cancels its timer.
    fn remove_entries(&mut self, positions: &[usize]) -> Result<()> {
        let mut result = Ok(());
        for &pos in positions.iter().rev() {
            let mut entry = self.entries.remove(pos);
            if let Err(e) = self
                .backend
                .remove(entry.interface(), entry.domain(), entry.server())
            {
                tracing::warn!(server = ?entry.server(), error = %e, "Backend removal failed");
                result = result.and(Err(e));
            }
            entry.cancel_expiry();
        }
        result
    }

    /// Removes the entry at `pos` the way a fired timer does: the owning
    /// service is told first, then the entry is detached.
    fn expire_at(&mut self, pos: usize) {
        let entry = &self.entries[pos];
        tracing::debug!(
            interface = ?entry.interface(),
            domain = ?entry.domain(),
            server = ?entry.server(),
            "Resolver entry expired"
        );

        if let (Some(service), Some(server)) = (self.service_for(entry.interface()), entry.server()) {
            self.services.nameserver_remove(service, server, true);
        }

        if let Err(e) = self.remove_entries(&[pos]) {
            tracing::warn!(error = %e, "Failed to apply expiry to backend");
        }
    }

    fn insert(
        &mut self,
        interface: Option<&str>,
        domain: Option<&str>,
        server: Option<&str>,
        lifetime: Duration,
        flags: EntryFlags,
    ) -> Result<()> {
        tracing::debug!(
            ?interface,
            ?domain,
            ?server,
            ?lifetime,
            flags = flags.bits(),
            "Inserting resolver entry"
        );

        if domain.is_none() && server.is_none() {
            return Err(ResolverError::InvalidArgument("domain or server required"));
        }

        self.entries.try_reserve(1)?;
        let mut entry = ResolverEntry::new(interface, domain, server, flags);

        if !lifetime.is_zero() {
            entry.expiry = Some(self.scheduler.arm(lifetime));

            // Only servers learned dynamically are reported to the service.
            if let (Some(service), Some(server)) = (self.service_for(interface), server) {
                self.services.nameserver_append(service, server, true);
            }
        }

        self.entries.push(entry);
        self.backend.append(interface, domain, server)
    }

    fn service_for(&self, interface: Option<&str>) -> Option<ServiceId> {
        let index = self.interfaces.index(interface?).ok()?;
        self.services.lookup_by_index(index)
    }
}
