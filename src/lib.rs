//! # resolv-manager
//!
//! DNS resolver state for a network connection manager.
//!
//! The daemon learns nameservers and search domains per interface from many
//! places (DHCP, router advertisements, static configuration). This crate
//! keeps the authoritative set of those bindings and mirrors it to one of two
//! backends, chosen once at startup:
//!
//! - a DNS proxy running inside the daemon ([`DnsProxy`]), or
//! - the system `/etc/resolv.conf`, regenerated after every change.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use resolv_manager::{Resolver, ResolverSettings};
//! use std::time::Duration;
//!
//! let mut resolver = Resolver::builder(ResolverSettings::new()).init();
//!
//! // Static server.
//! resolver.append(Some("eth0"), None, Some("192.168.1.1"))?;
//!
//! // Server learned from DHCP, valid for an hour.
//! resolver.append_with_lifetime(Some("eth0"), None, Some("10.0.0.1"), Duration::from_secs(3600))?;
//!
//! // Interface went down.
//! resolver.remove_all(Some("eth0"))?;
//! ```
//!
//! ## Expiry
//!
//! Servers added with a lifetime are removed when it elapses. Timers run on
//! the Tokio runtime; the event loop feeds fired timers back with
//! [`Resolver::next_expired`] and [`Resolver::expire`].
//!
//! ## resolv.conf format
//!
//! ```text
//! # Generated by Connection Manager
//! search newest.example older.example
//! nameserver 10.0.0.1
//! nameserver 192.168.1.1
//! ```
//!
//! Newest bindings come first. At most [`MAX_SEARCH_DOMAINS`] domains and
//! [`MAX_NAMESERVERS`] servers are written; older ones stay in memory.
//!
//! ## Permissions
//!
//! Writing `/etc/resolv.conf` requires root. A failed write is returned to the
//! caller and is not retried.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod collaborators;
pub mod config;
pub mod entry;
pub mod error;
pub mod resolver;
pub mod resolvfile;
pub mod scheduler;
pub mod util;

pub use collaborators::{DnsProxy, InterfaceIndex, NoServices, ServiceId, ServiceRegistry, SystemInterfaces};
pub use config::{
    DEFAULT_RESOLV_CONF, FALLBACK_NAMESERVERS, MAX_NAMESERVERS, MAX_SEARCH_DOMAINS, ResolverSettings,
};
pub use entry::{EntryFlags, ResolverEntry};
pub use error::{ResolverError, Result};
pub use resolver::{Resolver, ResolverBuilder};
pub use resolvfile::{ResolvFileEntry, ResolvFileStore};
pub use scheduler::{ExpiryScheduler, ExpiryTimer, TimerToken};
