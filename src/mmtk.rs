//! MMTk instance.
use crate::global_state::GlobalState;
use crate::plan::Epsilon;
use crate::util::options::Options;
use crate::vm::VMBinding;
use std::default::Default;
use std::sync::Arc;

/// MMTk builder. This is used to set options and other settings before actually creating an MMTk instance.
pub struct MMTKBuilder {
    /// The options for this instance.
    pub options: Options,
}

impl MMTKBuilder {
    /// Create an MMTK builder with options read from environment variables, or using built-in
    /// default if not overridden by environment variables.
    pub fn new() -> Self {
        MMTKBuilder {
            options: Options::default(),
        }
    }

    /// Create an MMTK builder with build-in default options, but without reading options from
    /// environment variables.
    pub fn new_no_env_vars() -> Self {
        MMTKBuilder {
            options: Options::without_env_vars(),
        }
    }

    /// Set an option. Returns false, and keeps the old value, if the option is unknown or the
    /// value is invalid.
    pub fn set_option(&mut self, name: &str, val: &str) -> bool {
        self.options.set_from_str(name, val)
    }

    /// Build an MMTk instance. Panics if the heap cannot be reserved or committed.
    pub fn build<VM: VMBinding>(&self) -> MMTK<VM> {
        self.try_build()
            .unwrap_or_else(|e| panic!("Failed to initialize the heap: {}", e))
    }

    /// Build an MMTk instance, reporting failures to reserve or commit the heap.
    pub fn try_build<VM: VMBinding>(&self) -> std::io::Result<MMTK<VM>> {
        MMTK::new(Arc::new(self.options.clone()))
    }
}

impl Default for MMTKBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An MMTk instance: one heap with its collector. The runtime owns it, usually for the rest of
/// the process, and passes it to every call in [`crate::memory_manager`].
pub struct MMTK<VM: VMBinding> {
    pub(crate) options: Arc<Options>,
    pub(crate) state: Arc<GlobalState>,
    pub(crate) plan: Epsilon<VM>,
}

impl<VM: VMBinding> MMTK<VM> {
    fn new(options: Arc<Options>) -> std::io::Result<Self> {
        let state = Arc::new(GlobalState::default());
        let plan = Epsilon::new(options.clone(), state.clone())?;
        Ok(MMTK {
            options,
            state,
            plan,
        })
    }

    pub fn get_options(&self) -> &Options {
        &self.options
    }

    pub fn get_plan(&self) -> &Epsilon<VM> {
        &self.plan
    }
}
