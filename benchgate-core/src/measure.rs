//! Timing primitives
//!
//! Wall-clock time comes from `std::time::Instant`. Alongside it we read the
//! hardware tick counter (RDTSCP on x86_64, CNTVCT_EL0 on AArch64) so reports
//! can show cycles per iteration where the platform exposes them.

use std::time::Duration;

#[cfg(target_arch = "x86_64")]
#[inline(always)]
fn read_ticks() -> u64 {
    let mut aux = 0u32;
    // SAFETY: RDTSCP is present on every x86_64 CPU we run on and has no
    // memory side effects.
    unsafe { std::arch::x86_64::__rdtscp(&mut aux) }
}

#[cfg(target_arch = "aarch64")]
#[inline(always)]
fn read_ticks() -> u64 {
    let ticks: u64;
    // SAFETY: CNTVCT_EL0 is readable from EL0 on all AArch64 implementations.
    unsafe {
        std::arch::asm!("mrs {}, cntvct_el0", out(reg) ticks, options(nostack, nomem));
    }
    ticks
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline(always)]
fn read_ticks() -> u64 {
    0
}

/// `true` when [`Timer`] reports real tick counts instead of zero.
pub const HAS_CYCLE_COUNTER: bool = cfg!(any(target_arch = "x86_64", target_arch = "aarch64"));

/// A point in time paired with the tick counter at that moment.
#[derive(Debug, Clone, Copy)]
pub struct Instant {
    wall: std::time::Instant,
    ticks: u64,
}

impl Instant {
    /// Capture the current instant.
    #[inline(always)]
    pub fn now() -> Self {
        let ticks = read_ticks();
        Self {
            wall: std::time::Instant::now(),
            ticks,
        }
    }

    /// Wall-clock time since this instant.
    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        self.wall.elapsed()
    }

    /// Ticks elapsed since this instant (0 without a cycle counter).
    #[inline(always)]
    pub fn elapsed_ticks(&self) -> u64 {
        read_ticks().saturating_sub(self.ticks)
    }
}

/// Elapsed time of one timed region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Elapsed {
    /// Wall-clock nanoseconds.
    pub nanos: u64,
    /// Hardware ticks.
    pub cycles: u64,
}

/// Measures a single timed region.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start timing.
    #[inline(always)]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Stop timing and return what elapsed.
    #[inline(always)]
    pub fn stop(&self) -> Elapsed {
        let nanos = self.start.elapsed().as_nanos() as u64;
        Elapsed {
            nanos,
            cycles: self.start.elapsed_ticks(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_covers_sleep() {
        let timer = Timer::start();
        std::thread::sleep(Duration::from_millis(10));
        let elapsed = timer.stop();
        assert!(elapsed.nanos >= 5_000_000);
    }

    #[test]
    fn ticks_are_monotonic() {
        if HAS_CYCLE_COUNTER {
            let a = read_ticks();
            let b = read_ticks();
            assert!(b >= a);
        } else {
            assert_eq!(Instant::now().elapsed_ticks(), 0);
        }
    }
}
