use crate::util::constants::*;

/// Environment variables starting with this prefix are read into [`Options`] when the options
/// are created, e.g. `EPSILON_SLIDING_GC=true` sets `sliding_gc`.
pub const ENV_VAR_PREFIX: &str = "EPSILON_";

pub const DEFAULT_MAX_HEAP_SIZE: usize = 512 * BYTES_IN_MBYTE;
pub const DEFAULT_INITIAL_HEAP_SIZE: usize = 16 * BYTES_IN_MBYTE;
pub const DEFAULT_MIN_HEAP_EXPAND: usize = 128 * BYTES_IN_MBYTE;
pub const DEFAULT_MAX_TLAB_SIZE: usize = 4 * BYTES_IN_MBYTE;
pub const DEFAULT_UPDATE_COUNTERS_STEP: usize = BYTES_IN_MBYTE;
pub const DEFAULT_PRINT_HEAP_STEPS: usize = 20;

fn always_valid<T>(_: &T) -> bool {
    true
}

macro_rules! options {
    ($($(#[$outer:meta])* $name:ident: $type:ty[$validator:expr] = $default:expr),*,) => [
        options!($($(#[$outer])* $name: $type[$validator] = $default),*);
    ];
    ($($(#[$outer:meta])* $name:ident: $type:ty[$validator:expr] = $default:expr),*) => [
        /// Collector options. They are read once, when the heap is built.
        #[derive(Clone, Debug)]
        pub struct Options {
            $($(#[$outer])* pub $name: $type),*
        }
        impl Options {
            /// Set an option by its snake-case name. Returns false, and keeps the old value, if the
            /// name is unknown, the value cannot be parsed, or the validator rejects it.
            pub fn set_from_str(&mut self, s: &str, val: &str) -> bool {
                match s {
                    // Parse the given value from str (by env vars or by calling set_option()) to the right type
                    $(stringify!($name) => if let Ok(ref val) = val.parse::<$type>() {
                        let validate_fn = $validator;
                        let is_valid = validate_fn(val);
                        if is_valid {
                            self.$name = val.clone();
                        } else {
                            warn!("Unable to set {}={:?}. Invalid value. The previous value is kept.", s, val);
                        }
                        is_valid
                    } else {
                        warn!("Unable to set {}={:?}. Can't parse value. The previous value is kept.", s, val);
                        false
                    })*
                    _ => {
                        warn!("Unknown option {}", s);
                        false
                    }
                }
            }

            /// The built-in defaults, ignoring the environment.
            pub fn without_env_vars() -> Self {
                Options {
                    $($name: $default),*
                }
            }

            /// Apply every environment variable of the form `EPSILON_<OPTION>`.
            pub fn read_env_var_settings(&mut self) {
                for (key, val) in std::env::vars() {
                    if let Some(rest_of_key) = key.strip_prefix(ENV_VAR_PREFIX) {
                        let lowercase: &str = &rest_of_key.to_lowercase();
                        match lowercase {
                            $(stringify!($name) => { self.set_from_str(lowercase, &val); },)*
                            _ => {}
                        }
                    }
                }
            }
        }
        impl Default for Options {
            fn default() -> Self {
                let mut options = Self::without_env_vars();
                options.read_env_var_settings();
                options
            }
        }
    ]
}

options! {
    /// Size of the address range reserved for the heap.
    max_heap_size:         usize [|v: &usize| *v > 0] = DEFAULT_MAX_HEAP_SIZE,
    /// Bytes committed when the heap is built. Clamped to `max_heap_size`.
    initial_heap_size:     usize [always_valid] = DEFAULT_INITIAL_HEAP_SIZE,
    /// Run a sliding mark-compact cycle for collection requests. Without it, requests are ignored
    /// and the heap only grows.
    sliding_gc:            bool  [always_valid] = false,
    /// Collect when an allocation cannot be satisfied (needs `sliding_gc`).
    implicit_gc:           bool  [always_valid] = true,
    /// Re-mark the heap after each cycle and check the live counts match.
    verify:                bool  [always_valid] = false,
    /// Uncommit the memory above the new top after each cycle.
    uncommit:              bool  [always_valid] = false,
    /// Minimum step when the committed part of the heap grows.
    min_heap_expand:       usize [|v: &usize| *v > 0] = DEFAULT_MIN_HEAP_EXPAND,
    /// Upper bound of a TLAB.
    max_tlab_size:         usize [|v: &usize| *v > 0] = DEFAULT_MAX_TLAB_SIZE,
    /// Size TLABs adaptively with `tlab_elasticity`.
    elastic_tlab:          bool  [always_valid] = true,
    /// Let the adaptive TLAB size of an idle thread decay back to zero.
    elastic_tlab_decay:    bool  [always_valid] = true,
    /// Growth factor of the adaptive TLAB size.
    tlab_elasticity:       f64   [|v: &f64| *v >= 1.0] = 1.1,
    /// Milliseconds without a TLAB refill after which a thread counts as idle.
    tlab_decay_time:       u64   [|v: &u64| *v > 0] = 1000,
    /// Allocation volume between two monitoring counter updates.
    update_counters_step:  usize [|v: &usize| *v > 0] = DEFAULT_UPDATE_COUNTERS_STEP,
    /// Number of heap occupancy reports over the whole heap. 0 disables the reports.
    print_heap_steps:      usize [always_valid] = DEFAULT_PRINT_HEAP_STEPS,
}
