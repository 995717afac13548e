use log::SetLoggerError;

/// Attempt to install `env_logger` as the logger, defaulting to the `info` level unless
/// `RUST_LOG` says otherwise. Called from [`crate::memory_manager::mmtk_init`].
///
/// Does nothing if the "builtin_env_logger" feature is disabled, in which case the runtime is
/// expected to install its own `log` implementation.
pub fn try_init() -> Result<(), SetLoggerError> {
    cfg_if::cfg_if! {
        if #[cfg(feature = "builtin_env_logger")] {
            env_logger::try_init_from_env(
                env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
            )
        } else {
            Ok(())
        }
    }
}
