//! Function-pointer finite state machine engine.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                      │
//! │  ┌────────────────────┬───────────┬──────────┬────────────────┐  │
//! │  │ StateId            │ on_enter  │ on_exit  │ on_update      │  │
//! │  ├────────────────────┼───────────┼──────────┼────────────────┤  │
//! │  │ Initializing       │ fn(ctx)   │    -     │ fn(ctx)->Opt   │  │
//! │  │ Calibrating        │ fn(ctx)   │    -     │ fn(ctx)->Opt   │  │
//! │  │ Idle               │ fn(ctx)   │    -     │ fn(ctx)->Opt   │  │
//! │  │ Measuring          │ fn(ctx)   │    -     │ fn(ctx)->Opt   │  │
//! │  │ ThresholdExceeded  │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Opt   │  │
//! │  │ CommunicationError │ fn(ctx)   │    -     │ fn(ctx)->Opt   │  │
//! │  │ Maintenance        │ fn(ctx)   │    -     │ fn(ctx)->Opt   │  │
//! │  └────────────────────┴───────────┴──────────┴────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the
//! current pointer.  Event-driven transitions go through
//! [`Fsm::force_transition`], which uses the same path.  A request for the
//! state already active does nothing at all.

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all possible system states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Initializing = 0,
    Calibrating = 1,
    Idle = 2,
    Measuring = 3,
    ThresholdExceeded = 4,
    CommunicationError = 5,
    Maintenance = 6,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 7;

    pub const ALL: [StateId; StateId::COUNT] = [
        Self::Initializing,
        Self::Calibrating,
        Self::Idle,
        Self::Measuring,
        Self::ThresholdExceeded,
        Self::CommunicationError,
        Self::Maintenance,
    ];

    /// Convert a table index back to `StateId`.  Asserts in debug builds;
    /// returns `CommunicationError` in release.
    pub fn from_index(idx: usize) -> Self {
        match Self::ALL.get(idx) {
            Some(id) => *id,
            None => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::CommunicationError
            }
        }
    }

    /// Upper-case name used in status payloads and the status report.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "INITIALIZING",
            Self::Calibrating => "CALIBRATING",
            Self::Idle => "IDLE",
            Self::Measuring => "MEASURING",
            Self::ThresholdExceeded => "THRESHOLD_EXCEEDED",
            Self::CommunicationError => "COMMUNICATION_ERROR",
            Self::Maintenance => "MAINTENANCE",
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition.
pub type StateActionFn = fn(&mut FsmContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

/// A completed state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: StateId,
    pub to: StateId,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    /// Index of the currently active state.
    current: usize,
    /// Monotonically increasing tick counter.
    tick_count: u64,
    /// Tick at which the current state was entered.
    state_entry_tick: u64,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick: evaluate the current state's rule and
    /// take at most one transition.
    pub fn tick(&mut self, ctx: &mut FsmContext) -> Option<Transition> {
        self.tick_count += 1;
        ctx.ticks_in_state = self.tick_count - self.state_entry_tick;
        ctx.total_ticks = self.tick_count;

        let next = (self.table[self.current].on_update)(ctx)?;
        self.transition(next, ctx)
    }

    /// Transition in response to an event rather than a tick rule.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut FsmContext) -> Option<Transition> {
        self.transition(next, ctx)
    }

    /// The current state's identity.
    pub fn current_state(&self) -> StateId {
        self.table[self.current].id
    }

    /// Display name of the current state.
    pub fn current_name(&self) -> &'static str {
        self.table[self.current].name
    }

    /// Ticks run since construction.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// How many ticks the FSM has been in the current state.
    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    /// The single place where states change.  Self-transitions are no-ops.
    fn transition(&mut self, next_id: StateId, ctx: &mut FsmContext) -> Option<Transition> {
        let next_idx = next_id as usize;
        if next_idx == self.current {
            return None;
        }
        let from = self.current_state();

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.state_entry_tick = self.tick_count;
        ctx.ticks_in_state = 0;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }

        Some(Transition { from, to: next_id })
    }
}
