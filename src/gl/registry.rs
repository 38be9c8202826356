//! Version-keyed cache of resolved interfaces.
//!
//! Resolving a function table and detecting capabilities touches hundreds of entry
//! points, so it is done once per API version and shared by every device created on a
//! context of that version. The cache is an ordinary value: create one with
//! [`InterfaceRegistry::new`], or explicitly opt into the process-wide instance with
//! [`InterfaceRegistry::global`]. Either can be [`reset`](InterfaceRegistry::reset).

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::caps::GlCaps;
use super::consts::GL_VERSION;
use super::functions::{GlFunctions, Loader, query_version_string};
use super::interface::GlInterface;
use super::version::GlVersion;
use crate::errors::{GpuError, Result};

/// A resolved function table plus the capabilities detected through it.
pub struct GlContextInterface {
    gl: Arc<dyn GlInterface>,
    caps: GlCaps,
}

impl std::fmt::Debug for GlContextInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlContextInterface").field("version", &self.caps.version).finish_non_exhaustive()
    }
}

impl GlContextInterface {
    /// Detects capabilities through an already resolved interface.
    pub fn new(gl: Arc<dyn GlInterface>) -> Result<Self> {
        let caps = GlCaps::detect(gl.as_ref())?;
        Ok(Self { gl, caps })
    }

    #[inline]
    #[must_use]
    pub fn gl(&self) -> &Arc<dyn GlInterface> {
        &self.gl
    }

    #[inline]
    #[must_use]
    pub fn caps(&self) -> &GlCaps {
        &self.caps
    }

    #[inline]
    #[must_use]
    pub fn version(&self) -> GlVersion {
        self.caps.version
    }
}

#[derive(Default)]
pub struct InterfaceRegistry {
    entries: RwLock<FxHashMap<GlVersion, Arc<GlContextInterface>>>,
}

impl InterfaceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry. Initialized empty on first use.
    pub fn global() -> &'static InterfaceRegistry {
        static GLOBAL: OnceLock<InterfaceRegistry> = OnceLock::new();
        GLOBAL.get_or_init(InterfaceRegistry::new)
    }

    /// Returns the cached interface for the version of the current context, resolving
    /// and caching a new one through `loader` on a miss.
    ///
    /// # Safety
    ///
    /// Same contract as [`GlFunctions::load`].
    pub unsafe fn get_or_load(&self, loader: &mut Loader<'_>) -> Result<Arc<GlContextInterface>> {
        // SAFETY: forwarded from the caller.
        let version_string = unsafe { query_version_string(loader) }
            .ok_or(GpuError::MissingEntryPoint("glGetString"))?;
        let version = GlVersion::parse(&version_string)?;

        if let Some(cached) = self.get(&version) {
            return Ok(cached);
        }

        // SAFETY: forwarded from the caller.
        let functions = unsafe { GlFunctions::load(loader)? };
        let context = GlContextInterface::new(Arc::new(functions))?;
        Ok(self.insert(version, context))
    }

    /// Returns the cached interface for the version reported by `gl`, detecting and
    /// caching `gl` itself on a miss.
    pub fn get_or_register(&self, gl: Arc<dyn GlInterface>) -> Result<Arc<GlContextInterface>> {
        let version_string = gl
            .get_string(GL_VERSION)
            .ok_or(GpuError::UnsupportedVersion(String::from("<no version string>")))?;
        let version = GlVersion::parse(&version_string)?;
        if let Some(cached) = self.get(&version) {
            return Ok(cached);
        }
        let context = GlContextInterface::new(gl)?;
        Ok(self.insert(version, context))
    }

    pub fn get(&self, version: &GlVersion) -> Option<Arc<GlContextInterface>> {
        self.entries.read().get(version).cloned()
    }

    /// Keeps the first entry when two threads race to resolve the same version.
    fn insert(&self, version: GlVersion, context: GlContextInterface) -> Arc<GlContextInterface> {
        let mut entries = self.entries.write();
        let entry = entries.entry(version).or_insert_with(|| {
            log::debug!("Caching interface for {version}");
            Arc::new(context)
        });
        Arc::clone(entry)
    }

    /// Drops every cached interface. Devices already holding one keep it alive.
    pub fn reset(&self) {
        let mut entries = self.entries.write();
        log::debug!("Resetting interface registry ({} entries)", entries.len());
        entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
