//! Enablement state: the switch deciding whether guarded calls check anything.
//!
//! Each contract category is one bit of a single `AtomicU8`, so a guarded
//! call takes exactly one atomic load and can never observe a partially
//! applied toggle. The process-wide instance starts disabled unless the
//! `CONTRACTS_ENABLED` environment variable is `1`, `true`, or `yes`.
//!
//! A thread may also force a fixed [`Enablement`] for the dynamic extent of
//! a closure ([`with_forced`]). The generation driver uses this to check
//! probes (including recursive calls inside them) without touching the
//! process-wide switch that other threads read.

use std::cell::Cell;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

use crate::contracts::ContractKind;

/// Environment variable read once when the global state is first used.
pub const ENABLE_ENV_VAR: &str = "CONTRACTS_ENABLED";

/// A snapshot of which contract categories are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Enablement(u8);

impl Enablement {
    pub const NONE: Enablement = Enablement(0);
    pub const ALL: Enablement = Enablement(0b111);

    const fn bit(kind: ContractKind) -> u8 {
        match kind {
            ContractKind::Precondition => 0b001,
            ContractKind::Postcondition => 0b010,
            ContractKind::Invariant => 0b100,
        }
    }

    pub fn only(kind: ContractKind) -> Enablement {
        Enablement(Self::bit(kind))
    }

    pub fn with(self, kind: ContractKind) -> Enablement {
        Enablement(self.0 | Self::bit(kind))
    }

    pub fn without(self, kind: ContractKind) -> Enablement {
        Enablement(self.0 & !Self::bit(kind))
    }

    pub fn checks(self, kind: ContractKind) -> bool {
        self.0 & Self::bit(kind) != 0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

thread_local! {
    static FORCED: Cell<Option<Enablement>> = const { Cell::new(None) };
}

/// Runs `f` with `mode` in effect for every guarded call made on this thread,
/// regardless of which [`EnablementState`] the operations are bound to.
/// The previous override (if any) is restored afterwards, also on unwind.
pub fn with_forced<R>(mode: Enablement, f: impl FnOnce() -> R) -> R {
    struct Restore(Option<Enablement>);

    impl Drop for Restore {
        fn drop(&mut self) {
            FORCED.with(|cell| cell.set(self.0));
        }
    }

    let _restore = Restore(FORCED.with(|cell| cell.replace(Some(mode))));
    f()
}

/// Process-wide (or embedder-owned) enablement switch.
#[derive(Debug)]
pub struct EnablementState {
    bits: AtomicU8,
}

impl EnablementState {
    pub const fn new(initial: Enablement) -> Self {
        EnablementState {
            bits: AtomicU8::new(initial.0),
        }
    }

    /// The process-wide singleton, initialized from [`ENABLE_ENV_VAR`].
    pub fn global() -> &'static EnablementState {
        static GLOBAL: OnceLock<EnablementState> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let initial = std::env::var(ENABLE_ENV_VAR)
                .map(|v| parse_enabled(&v))
                .unwrap_or(false);
            if initial {
                tracing::debug!("contract checking enabled from {}", ENABLE_ENV_VAR);
            }
            EnablementState::new(if initial {
                Enablement::ALL
            } else {
                Enablement::NONE
            })
        })
    }

    /// The mode a call starting now observes. A forced override on the
    /// current thread wins over the stored bits.
    pub fn snapshot(&self) -> Enablement {
        FORCED
            .with(|cell| cell.get())
            .unwrap_or_else(|| Enablement(self.bits.load(Ordering::Acquire)))
    }

    pub fn set(&self, mode: Enablement) {
        self.bits.store(mode.0, Ordering::Release);
    }

    pub fn enable(&self) {
        self.set(Enablement::ALL);
    }

    pub fn disable(&self) {
        self.set(Enablement::NONE);
    }

    pub fn enable_kind(&self, kind: ContractKind) {
        self.bits.fetch_or(Enablement::bit(kind), Ordering::AcqRel);
    }

    pub fn disable_kind(&self, kind: ContractKind) {
        self.bits.fetch_and(!Enablement::bit(kind), Ordering::AcqRel);
    }

    /// True when any category is checked.
    pub fn is_enabled(&self) -> bool {
        !self.snapshot().is_none()
    }
}

/// Whether an environment value turns checking on.
pub fn parse_enabled(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

/// Enables every category on the process-wide state.
pub fn enable_contracts() {
    EnablementState::global().enable();
}

/// Disables every category on the process-wide state.
pub fn disable_contracts() {
    EnablementState::global().disable();
}

/// Reads the process-wide state.
pub fn contracts_enabled() -> bool {
    EnablementState::global().is_enabled()
}
