//! Time subsystem.
//!
//! Tick timing for the animation scheduler, decoupled from the engine so
//! hosts can drive ticks from their own loop or from a `TickClock`.
//! Intended usage:
//! - one `TickClock` per engine
//! - call `tick()` once per scheduler interval and hand the `Tick` to
//!   `Engine::tick`

mod tick_clock;

pub use tick_clock::{Tick, TickClock};
