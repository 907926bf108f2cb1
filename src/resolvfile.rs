//! `/etc/resolv.conf` generation.
//!
//! The store keeps every binding in append order and rewrites the whole file
//! after each change. Generation walks the store newest-first so the most
//! recently learned server is the primary one; bindings beyond the system
//! limits stay in memory but are not written.

use crate::config::{MAX_NAMESERVERS, MAX_SEARCH_DOMAINS};
use crate::error::Result;
use crate::util::UmaskGuard;
use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// First line of every generated file.
const GENERATED_HEADER: &str = "# Generated by Connection Manager";

/// `rw-r--r--`
const RESOLV_CONF_MODE: u32 = 0o644;

/// One binding mirrored into the resolver file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvFileEntry {
    pub interface: Option<String>,
    pub domain: Option<String>,
    pub server: Option<String>,
}

/// Ordered bindings mirrored to the resolver file when no DNS proxy runs.
///
/// # Example
///
/// ```rust,ignore
/// use resolv_manager::ResolvFileStore;
///
/// let mut store = ResolvFileStore::new("/etc/resolv.conf");
/// store.append(Some("eth0"), None, Some("8.8.8.8"))?;
/// store.append(Some("eth0"), None, Some("1.1.1.1"))?;
/// // nameserver 1.1.1.1
/// // nameserver 8.8.8.8
/// ```
#[derive(Debug)]
pub struct ResolvFileStore {
    path: PathBuf,
    entries: Vec<ResolvFileEntry>,
}

impl ResolvFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
        }
    }

    /// Returns the resolver file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resident bindings, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[ResolvFileEntry] {
        &self.entries
    }

    /// Appends a binding as the most recent one and rewrites the file.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::OutOfMemory`](crate::ResolverError::OutOfMemory)
    /// without changing the store if the binding cannot be allocated, or
    /// [`ResolverError::Io`](crate::ResolverError::Io) if the file cannot be
    /// written. In the latter case the binding is kept.
    pub fn append(
        &mut self,
        interface: Option<&str>,
        domain: Option<&str>,
        server: Option<&str>,
    ) -> Result<()> {
        tracing::debug!(?interface, ?domain, ?server, "resolv.conf append");

        self.entries.try_reserve(1)?;
        self.entries.push(ResolvFileEntry {
            interface: interface.map(str::to_owned),
            domain: domain.map(str::to_owned),
            server: server.map(str::to_owned),
        });

        self.export()
    }

    /// Removes matching bindings and rewrites the file, even if nothing
    /// matched.
    ///
    /// An absent `interface` or `domain` matches any value; `server` must be
    /// equal, absent matching only absent.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::Io`](crate::ResolverError::Io) if the file
    /// cannot be written. The bindings stay removed.
    pub fn remove(
        &mut self,
        interface: Option<&str>,
        domain: Option<&str>,
        server: Option<&str>,
    ) -> Result<()> {
        tracing::debug!(?interface, ?domain, ?server, "resolv.conf remove");

        let matches: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                interface.is_none_or(|i| e.interface.as_deref() == Some(i))
                    && domain.is_none_or(|d| e.domain.as_deref() == Some(d))
                    && e.server.as_deref() == server
            })
            .map(|(pos, _)| pos)
            .collect();

        for pos in matches.into_iter().rev() {
            self.entries.remove(pos);
        }

        self.export()
    }

    /// Drops every binding without touching the file.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Renders the file content for the current bindings.
    ///
    /// ```text
    /// # Generated by Connection Manager
    /// search newest.example older.example
    /// nameserver 1.1.1.1
    /// nameserver 8.8.8.8
    /// ```
    #[must_use]
    pub fn generate_content(&self) -> String {
        let mut content = format!("{GENERATED_HEADER}\n");

        let domains: Vec<&str> = self
            .entries
            .iter()
            .rev()
            .filter_map(|e| e.domain.as_deref())
            .take(MAX_SEARCH_DOMAINS)
            .collect();
        if !domains.is_empty() {
            content.push_str("search ");
            content.push_str(&domains.join(" "));
            content.push('\n');
        }

        for server in self
            .entries
            .iter()
            .rev()
            .filter_map(|e| e.server.as_deref())
            .take(MAX_NAMESERVERS)
        {
            content.push_str("nameserver ");
            content.push_str(server);
            content.push('\n');
        }

        content
    }

    /// Truncates and rewrites the resolver file.
    ///
    /// No retry and no rollback: a failed write may leave the file truncated.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::Io`](crate::ResolverError::Io) if the file
    /// cannot be opened, truncated or written.
    pub fn export(&self) -> Result<()> {
        let content = self.generate_content();

        let _umask = UmaskGuard::set(0o022);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .mode(RESOLV_CONF_MODE)
            .open(&self.path)?;
        file.set_len(0)?;
        file.write_all(content.as_bytes())?;

        tracing::info!(
            path = %self.path.display(),
            entries = self.entries.len(),
            "Wrote resolver configuration"
        );
        Ok(())
    }
}
