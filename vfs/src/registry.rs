use alloc::{
    boxed::Box,
    string::String,
    sync::{Arc, Weak},
};

use spin::RwLock;
use strata_errno::Errno;

use crate::{backend::VfsBackend, root::RootBackend, PATH_MAX_PREFIX, VFS_MAX_COUNT};

/// The leading path under which a backend's namespace appears. The empty
/// prefix is the default catch-all; `Ignored` marks a backend reachable
/// only through reserved descriptors, never by path.
#[derive(Debug)]
pub(crate) enum Prefix {
    Path(String),
    Ignored,
}

impl Prefix {
    /// Validates a registration prefix: empty, or `[2, PATH_MAX_PREFIX]`
    /// bytes starting with `/` and not ending with `/`.
    pub(crate) fn parse(base_path: &str) -> Result<Self, Errno> {
        let len = base_path.len();
        if len != 0 && (len < 2 || len > PATH_MAX_PREFIX) {
            return Err(Errno::EINVAL);
        }
        if len != 0 && (!base_path.starts_with('/') || base_path.ends_with('/')) {
            return Err(Errno::EINVAL);
        }
        Ok(Self::Path(String::from(base_path)))
    }

    /// The prefix as reported to observers; the ignored sentinel reads as
    /// the empty string.
    pub(crate) fn as_str(&self) -> &str {
        match self {
            Self::Path(path) => path,
            Self::Ignored => "",
        }
    }
}

pub(crate) struct VfsEntry {
    pub(crate) prefix: Prefix,
    pub(crate) index: usize,
    pub(crate) ops: Box<dyn VfsBackend>,
}

impl VfsEntry {
    /// Strips this entry's prefix from `path`; a path equal to the prefix
    /// becomes `"/"`.
    pub(crate) fn translate<'a>(&self, path: &'a str) -> &'a str {
        let prefix = self.prefix.as_str();
        debug_assert!(path.starts_with(prefix));
        if path.len() == prefix.len() {
            "/"
        } else {
            &path[prefix.len()..]
        }
    }
}

/// Fixed table of registered backends. Slot indices are stable for the
/// lifetime of a registration and reused after unregistration. Lookups
/// clone the slot's `Arc` under the read lock and release it before any
/// backend call, so an entry can never be freed mid-call while a
/// descriptor for an unregistered backend still fails `EBADF`.
pub(crate) struct Registry {
    slots: RwLock<[Option<Arc<VfsEntry>>; VFS_MAX_COUNT]>,
}

impl Registry {
    /// Builds a registry with the root directory backend occupying slot 0
    /// under the empty prefix.
    pub(crate) fn with_root() -> Arc<Self> {
        Arc::new_cyclic(|registry: &Weak<Registry>| {
            let mut slots: [Option<Arc<VfsEntry>>; VFS_MAX_COUNT] =
                core::array::from_fn(|_| None);
            slots[0] = Some(Arc::new(VfsEntry {
                prefix: Prefix::Path(String::new()),
                index: 0,
                ops: Box::new(RootBackend::new(registry.clone())),
            }));
            Self {
                slots: RwLock::new(slots),
            }
        })
    }

    /// Places a backend in the first free slot and returns its index.
    pub(crate) fn insert(
        &self,
        prefix: Prefix,
        ops: Box<dyn VfsBackend>,
    ) -> Result<usize, Errno> {
        let mut slots = self.slots.write();
        let index = slots
            .iter()
            .position(Option::is_none)
            .ok_or(Errno::ENOMEM)?;
        slots[index] = Some(Arc::new(VfsEntry { prefix, index, ops }));
        Ok(index)
    }

    /// Detaches and returns the entry at `index`, freeing the slot.
    pub(crate) fn take(&self, index: usize) -> Option<Arc<VfsEntry>> {
        self.slots.write().get_mut(index)?.take()
    }

    pub(crate) fn get(&self, index: usize) -> Option<Arc<VfsEntry>> {
        self.slots.read().get(index)?.clone()
    }

    /// Longest-prefix resolution. A non-empty prefix shorter than the path
    /// must be followed by `/` in the path, so `/dev` matches `/dev/x` but
    /// not `/devices`. The empty prefix is the fallback, chosen only when
    /// nothing longer matches; the ignored sentinel never matches.
    pub(crate) fn resolve(&self, path: &str) -> Option<Arc<VfsEntry>> {
        let slots = self.slots.read();
        let mut best: Option<&Arc<VfsEntry>> = None;
        let mut best_len: Option<usize> = None;

        for entry in slots.iter().flatten() {
            let Prefix::Path(prefix) = &entry.prefix else {
                continue;
            };
            if !path.starts_with(prefix.as_str()) {
                continue;
            }
            if prefix.is_empty() {
                if best.is_none() {
                    best = Some(entry);
                }
                continue;
            }
            if path.len() > prefix.len() && path.as_bytes()[prefix.len()] != b'/' {
                continue;
            }
            if best_len.is_none_or(|len| prefix.len() > len) {
                best_len = Some(prefix.len());
                best = Some(entry);
            }
        }

        best.cloned()
    }
}
