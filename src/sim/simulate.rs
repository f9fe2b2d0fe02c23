//! Event scheduler
//!
//! Jumps the system from event to event: find the earliest next event, evolve every
//! ball to it along its exact trajectory, resolve it, forget the cached predictions
//! it made stale, record it. Repeats until nothing else can happen.

use super::cache::EventCache;
use super::detect;
use super::events::Event;
use super::motion;
use super::resolve::Resolver;
use super::system::{HistoryEntry, System};
use crate::config::SimConfig;
use crate::error::Result;

/// Outcome of a run
#[derive(Debug, Clone, PartialEq)]
pub struct SimResult {
    /// Final system, with the full history
    pub system: System,
    /// False when `max_events` cut the run short
    pub complete: bool,
    /// Events resolved, not counting the null events bracketing the history
    pub events: usize,
}

impl SimResult {
    pub fn history(&self) -> &[HistoryEntry] {
        &self.system.history
    }
}

/// Step-by-step driver behind [`simulate`]
pub struct Simulation<'a> {
    system: System,
    cache: EventCache,
    config: &'a SimConfig,
    resolver: &'a Resolver,
    events: usize,
}

impl<'a> Simulation<'a> {
    /// Validate the inputs and open the history with a null event at the current time
    pub fn new(mut system: System, config: &'a SimConfig, resolver: &'a Resolver) -> Result<Self> {
        config.validate()?;
        system.normalize_order();
        system.validate()?;

        system.history.clear();
        system.push_history(Event::null(system.t));
        Ok(Self { system, cache: EventCache::new(), config, resolver, events: 0 })
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    pub fn events(&self) -> usize {
        self.events
    }

    /// The next event, without resolving it
    pub fn peek(&mut self) -> Event {
        let mut event = detect::next_event(&self.system, &mut self.cache, self.config);
        // Rounding must not send time backwards
        event.time = event.time.max(self.system.t);
        event
    }

    /// Whether the run has nothing left to resolve
    pub fn finished(&mut self) -> bool {
        let next = self.peek();
        next.time == f64::INFINITY || self.config.t_final.is_some_and(|t| next.time > t)
    }

    /// Resolve the next event.
    ///
    /// Returns `None` once the system is at rest, or after advancing it to
    /// `t_final` when the next event lies beyond the cut-off.
    pub fn step(&mut self) -> Option<Event> {
        let event = self.peek();
        if let Some(t_final) = self.config.t_final.filter(|&t| event.time > t) {
            self.advance(t_final.max(self.system.t));
            return None;
        }
        if event.time == f64::INFINITY {
            return None;
        }

        self.advance(event.time);
        let changed = self.resolver.resolve(&mut self.system, &event);
        self.cache.invalidate(&changed);
        self.system.push_history(event);
        self.events += 1;
        log::debug!("{}", event);
        Some(event)
    }

    /// Step until finished or capped, then close the history
    pub fn run(mut self) -> SimResult {
        log::info!(
            "Simulating {} balls: {} rails, {} jaws, {} pockets",
            self.system.balls.len(),
            self.system.table.linear_cushions.len(),
            self.system.table.circular_cushions.len(),
            self.system.table.pockets.len()
        );

        let complete = loop {
            if self.events >= self.config.max_events && !self.finished() {
                let moving = self.system.balls.iter().filter(|b| b.phase().is_energetic()).count();
                log::warn!("Stopped after {} events with {} balls still moving", self.events, moving);
                break false;
            }
            if self.step().is_none() {
                break true;
            }
        };

        let t = self.system.t;
        self.system.push_history(Event::null(t));
        log::info!("Simulation ended at t = {:.4} s after {} events (complete: {})", t, self.events, complete);

        SimResult { system: self.system, complete, events: self.events }
    }

    /// Move every ball along its trajectory up to `time`
    fn advance(&mut self, time: f64) {
        let dt = time - self.system.t;
        if dt > 0.0 {
            for ball in &mut self.system.balls {
                let mut state = motion::evolve(&ball.state, &ball.params, dt);
                state.t = time;
                ball.state = state;
            }
        }
        self.system.t = time;
    }
}

/// Run `system` to rest (or to a configured cap) and return it with its history
pub fn simulate(system: System, config: &SimConfig, resolver: &Resolver) -> Result<SimResult> {
    Ok(Simulation::new(system, config, resolver)?.run())
}
