pub mod phase_timer;

pub use self::phase_timer::PhaseTimer;
