//! Margin-call orchestration
//!
//! The stateful controller invoked once per evaluation tick:
//! aggregate → detect → select → submit → emit. Each tick is a
//! discrete, non-preemptible unit of work, so position state observed
//! at requirement-computation time is the state at order-submission
//! time.
//!
//! Exactly one orchestrator exists per portfolio and ticks are
//! processed sequentially. `SharedOrchestrator` enforces that
//! discipline for callers that share a handle across threads: a tick
//! arriving mid-cycle coalesces into at most one pending re-evaluation.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use types::order::OrderType;
use types::portfolio::PortfolioSnapshot;

use crate::aggregator::{self, ExclusionPolicy, PortfolioMarginState};
use crate::events::{EventSink, MarginCallEvent, SubmittedOrder};
use crate::providers::{MarkPriceSource, OrderSubmitter};
use crate::requirement::RequirementParams;
use crate::selector;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginEngineConfig {
    pub requirement: RequirementParams,
    pub exclusion: ExclusionPolicy,
    /// Order type used for liquidating orders
    pub order_type: OrderType,
}

impl Default for MarginEngineConfig {
    fn default() -> Self {
        Self {
            requirement: RequirementParams::default(),
            exclusion: ExclusionPolicy::default(),
            order_type: OrderType::Market,
        }
    }
}

/// Evaluation-cycle state machine
///
/// `Idle → Evaluating → (NoCall | CallDetected) → OrdersSubmitted → Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Evaluating,
    NoCall,
    CallDetected,
    OrdersSubmitted,
}

/// Result of one evaluation tick
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Deficiency was zero; no observable action
    NoCall { state: PortfolioMarginState },
    /// Margin call detected; liquidating orders submitted and one
    /// event emitted
    Call {
        state: PortfolioMarginState,
        event: MarginCallEvent,
    },
}

impl CycleOutcome {
    pub fn is_call(&self) -> bool {
        matches!(self, CycleOutcome::Call { .. })
    }

    pub fn state(&self) -> &PortfolioMarginState {
        match self {
            CycleOutcome::NoCall { state } | CycleOutcome::Call { state, .. } => state,
        }
    }
}

/// The margin-call orchestrator for one portfolio
pub struct MarginCallOrchestrator<M, O, E> {
    config: MarginEngineConfig,
    marks: M,
    submitter: O,
    sink: E,
    phase: CyclePhase,
    cycles_run: u64,
}

impl<M, O, E> MarginCallOrchestrator<M, O, E>
where
    M: MarkPriceSource,
    O: OrderSubmitter,
    E: EventSink,
{
    pub fn new(config: MarginEngineConfig, marks: M, submitter: O, sink: E) -> Self {
        Self {
            config,
            marks,
            submitter,
            sink,
            phase: CyclePhase::Idle,
            cycles_run: 0,
        }
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    /// Completed evaluation cycles since construction
    pub fn cycles_run(&self) -> u64 {
        self.cycles_run
    }

    pub fn marks_mut(&mut self) -> &mut M {
        &mut self.marks
    }

    pub fn submitter(&self) -> &O {
        &self.submitter
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }

    fn transition(&mut self, phase: CyclePhase) {
        debug!(from = ?self.phase, to = ?phase, "cycle phase");
        self.phase = phase;
    }

    /// Run one evaluation cycle against a portfolio snapshot.
    ///
    /// If a deficiency is detected, submits the liquidation plan
    /// through the order-management collaborator and emits exactly one
    /// `MarginCallEvent`. A rejected submission is recorded on the
    /// event and the remaining candidates are still submitted; nothing
    /// is rolled back.
    pub fn evaluate_tick(&mut self, snapshot: &PortfolioSnapshot, now: i64) -> CycleOutcome {
        self.transition(CyclePhase::Evaluating);
        self.cycles_run += 1;

        let state = aggregator::evaluate(
            snapshot,
            &self.marks,
            &self.config.requirement,
            self.config.exclusion,
            now,
        );

        if !state.is_margin_call() {
            self.transition(CyclePhase::NoCall);
            self.transition(CyclePhase::Idle);
            return CycleOutcome::NoCall { state };
        }

        self.transition(CyclePhase::CallDetected);
        let plan = selector::select(
            state.deficiency,
            &snapshot.positions,
            &state.requirements,
            &self.marks,
        );
        info!(
            portfolio = %snapshot.portfolio_id,
            deficiency = %state.deficiency,
            candidates = plan.candidates.len(),
            "margin call detected"
        );

        let mut orders = Vec::with_capacity(plan.candidates.len());
        for candidate in &plan.candidates {
            match self.submitter.submit_order(
                &candidate.symbol,
                candidate.close_quantity,
                self.config.order_type,
            ) {
                Ok(order_id) => {
                    orders.push(SubmittedOrder::accepted(
                        candidate.symbol.clone(),
                        candidate.close_quantity,
                        order_id,
                    ));
                }
                Err(err) => {
                    error!(
                        symbol = %candidate.symbol,
                        %err,
                        "liquidation order rejected, continuing with remaining candidates"
                    );
                    orders.push(SubmittedOrder::failed(
                        candidate.symbol.clone(),
                        candidate.close_quantity,
                        err.to_string(),
                    ));
                }
            }
        }
        self.transition(CyclePhase::OrdersSubmitted);

        if plan.insufficient_liquidatable_margin {
            warn!(
                portfolio = %snapshot.portfolio_id,
                remaining = %plan.projected_deficiency,
                "candidate set exhausted with deficiency remaining"
            );
        }

        let event = MarginCallEvent::new(
            snapshot.portfolio_id,
            state.deficiency,
            state.total_maintenance,
            state.total_value,
            orders,
            plan.insufficient_liquidatable_margin,
            now,
        );
        self.sink.on_margin_call(&event);

        self.transition(CyclePhase::Idle);
        CycleOutcome::Call { state, event }
    }
}

/// How a tick on a shared handle was handled
#[derive(Debug, Clone, PartialEq)]
pub enum TickDisposition {
    /// The cycle ran (including any coalesced re-evaluation)
    Ran(CycleOutcome),
    /// A cycle was in flight; one re-evaluation was scheduled
    Coalesced,
}

/// Serialized per-portfolio handle
///
/// No two liquidation cycles for the same portfolio run concurrently:
/// the mutex admits one cycle at a time, and ticks arriving mid-cycle
/// collapse into a single pending re-evaluation, using the snapshot of
/// the tick that runs it. The running tick re-checks the flag before
/// returning (reacquiring the lock if a concurrent tick set it during
/// release), so a pending re-evaluation never waits for the next tick.
/// A flag set while the lock is held through `lock` (inspection, mark
/// updates) runs on the next tick.
pub struct SharedOrchestrator<M, O, E> {
    inner: Mutex<MarginCallOrchestrator<M, O, E>>,
    pending: AtomicBool,
}

impl<M, O, E> SharedOrchestrator<M, O, E>
where
    M: MarkPriceSource,
    O: OrderSubmitter,
    E: EventSink,
{
    pub fn new(orchestrator: MarginCallOrchestrator<M, O, E>) -> Self {
        Self {
            inner: Mutex::new(orchestrator),
            pending: AtomicBool::new(false),
        }
    }

    /// Lock the underlying orchestrator (inspection, mark updates)
    pub fn lock(&self) -> parking_lot::MutexGuard<'_, MarginCallOrchestrator<M, O, E>> {
        self.inner.lock()
    }

    /// Deliver an evaluation tick.
    ///
    /// Runs the cycle if no cycle is in flight; otherwise schedules at
    /// most one pending re-evaluation and returns `Coalesced`. The
    /// running tick drains the pending flag before returning.
    pub fn tick(&self, snapshot: &PortfolioSnapshot, now: i64) -> TickDisposition {
        let mut guard = match self.inner.try_lock() {
            Some(guard) => guard,
            None => {
                self.pending.store(true, Ordering::SeqCst);
                return TickDisposition::Coalesced;
            }
        };
        let mut outcome = guard.evaluate_tick(snapshot, now);
        loop {
            while self.pending.swap(false, Ordering::SeqCst) {
                outcome = guard.evaluate_tick(snapshot, now);
            }
            drop(guard);
            // A concurrent tick can set the flag between the last
            // check and the unlock; reclaim the lock to honor it now
            // instead of on the next tick.
            if !self.pending.load(Ordering::SeqCst) {
                break;
            }
            match self.inner.try_lock() {
                Some(reacquired) => guard = reacquired,
                // Whoever holds the lock is inside a tick and will
                // drain the flag before returning
                None => break,
            }
        }
        TickDisposition::Ran(outcome)
    }
}
