//! Interfaces of the components the resolver drives but does not own.

use crate::error::Result;
use crate::util::if_nametoindex;
use std::io;

/// A DNS proxy that answers queries itself instead of relying on resolv.conf.
///
/// When initialized successfully it becomes the sole backend for every
/// resolver mutation for the rest of the process lifetime.
pub trait DnsProxy {
    /// Starts the proxy. An error makes the resolver fall back to resolv.conf.
    ///
    /// # Errors
    ///
    /// Any failure to bring the proxy up.
    fn init(&mut self) -> Result<()>;

    /// Registers a server (or a domain-only binding) for `interface`.
    ///
    /// # Errors
    ///
    /// Implementation-defined; surfaced to the resolver caller.
    fn append(&mut self, interface: Option<&str>, domain: Option<&str>, server: Option<&str>)
    -> Result<()>;

    /// Unregisters a binding previously passed to [`append`](Self::append).
    ///
    /// # Errors
    ///
    /// Implementation-defined; surfaced to the resolver caller.
    fn remove(&mut self, interface: Option<&str>, domain: Option<&str>, server: Option<&str>)
    -> Result<()>;

    /// Drops pending queries and cached answers.
    fn flush(&mut self);

    /// Stops the proxy.
    fn cleanup(&mut self);
}

/// Opaque handle of a per-connection service, as issued by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceId(pub u32);

/// Per-connection service state that tracks which nameservers it uses.
///
/// Only servers learned with a nonzero lifetime are reported here.
pub trait ServiceRegistry {
    /// Finds the service bound to an interface index.
    fn lookup_by_index(&self, index: u32) -> Option<ServiceId>;

    /// Adds `server` to the service's nameserver set.
    fn nameserver_append(&mut self, service: ServiceId, server: &str, rolling: bool);

    /// Removes `server` from the service's nameserver set.
    fn nameserver_remove(&mut self, service: ServiceId, server: &str, rolling: bool);
}

/// Maps interface names to kernel interface indexes.
pub trait InterfaceIndex {
    /// # Errors
    ///
    /// Returns an error if the interface does not exist.
    fn index(&self, name: &str) -> io::Result<u32>;
}

/// Registry with no services; every lookup misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoServices;

impl ServiceRegistry for NoServices {
    fn lookup_by_index(&self, _index: u32) -> Option<ServiceId> {
        None
    }

    fn nameserver_append(&mut self, _service: ServiceId, _server: &str, _rolling: bool) {}

    fn nameserver_remove(&mut self, _service: ServiceId, _server: &str, _rolling: bool) {}
}

/// Interface lookup backed by `if_nametoindex(3)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInterfaces;

impl InterfaceIndex for SystemInterfaces {
    fn index(&self, name: &str) -> io::Result<u32> {
        if_nametoindex(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_services_never_matches() {
        assert_eq!(NoServices.lookup_by_index(1), None);
    }

    #[test]
    fn system_interfaces_rejects_unknown_names() {
        assert!(SystemInterfaces.index("nosuchif0").is_err());
    }
}
