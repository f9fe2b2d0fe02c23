//! Candidate generation and next-event selection
//!
//! Fills every cache entry the scheduler is about to need, solving all missing
//! quartics in one batch, then picks the earliest event across classes.

use super::ball::{Ball, MotionPhase};
use super::cache::{EventCache, PairKey};
use super::equations::{
    Contact, ball_ball_coeffs, ball_circular_cushion_coeffs, ball_linear_cushion_time, ball_pocket_coeffs,
    contact_quartic, rolling_away_from, transition_time,
};
use super::events::{Event, EventClass, EventKind};
use super::system::System;
use crate::config::SimConfig;
use crate::roots::{Quartic, solve_quartics};

/// Cache key for the stick-ball pair; the cue itself has no ID
const CUE_KEY: u32 = 0;

/// A cache miss waiting for its quartic to be solved
struct Pending {
    class: EventClass,
    key: PairKey,
    quartic: Quartic,
}

/// Fill every missing cache entry for the classes `config` includes
pub fn populate(system: &System, cache: &mut EventCache, config: &SimConfig) {
    let now = system.t;
    let mut pending = Vec::new();

    if config.includes(EventClass::StickBall) {
        populate_stick_ball(system, cache);
    }
    populate_transitions(system, cache);

    if config.includes(EventClass::BallBall) {
        for (i, b1) in system.balls.iter().enumerate() {
            for b2 in &system.balls[i + 1..] {
                let key = (b1.id, b2.id);
                if cache.contains(EventClass::BallBall, key) {
                    continue;
                }
                if skip_ball_ball(b1, b2) {
                    cache.insert(EventClass::BallBall, key, f64::INFINITY);
                    continue;
                }
                let d = b1.radius() + b2.radius();
                match contact_quartic(ball_ball_coeffs(b1, b2), d) {
                    (quartic, Contact::Apart | Contact::TouchingSeparating) => {
                        pending.push(Pending { class: EventClass::BallBall, key, quartic })
                    }
                    // Pressed together already: collide on the spot
                    (_, Contact::TouchingApproaching) => cache.insert(EventClass::BallBall, key, now),
                    (_, Contact::Overlapping) => cache.insert(EventClass::BallBall, key, f64::INFINITY),
                }
            }
        }
    }

    if config.includes(EventClass::BallCircularCushion) {
        for ball in &system.balls {
            for cushion in &system.table.circular_cushions {
                let key = (ball.id, cushion.id);
                if cache.contains(EventClass::BallCircularCushion, key) {
                    continue;
                }
                if !ball.phase().is_translating() {
                    cache.insert(EventClass::BallCircularCushion, key, f64::INFINITY);
                    continue;
                }
                let d = ball.radius() + cushion.radius;
                match contact_quartic(ball_circular_cushion_coeffs(ball, cushion), d) {
                    (quartic, Contact::Apart | Contact::TouchingSeparating) => {
                        pending.push(Pending { class: EventClass::BallCircularCushion, key, quartic })
                    }
                    (_, Contact::TouchingApproaching) => cache.insert(EventClass::BallCircularCushion, key, now),
                    (_, Contact::Overlapping) => cache.insert(EventClass::BallCircularCushion, key, f64::INFINITY),
                }
            }
        }
    }

    if config.includes(EventClass::BallLinearCushion) {
        for ball in &system.balls {
            for cushion in &system.table.linear_cushions {
                let key = (ball.id, cushion.id);
                if !cache.contains(EventClass::BallLinearCushion, key) {
                    let tau = ball_linear_cushion_time(ball, cushion);
                    cache.insert(EventClass::BallLinearCushion, key, now + tau);
                }
            }
        }
    }

    if config.includes(EventClass::BallPocket) {
        for ball in &system.balls {
            for pocket in &system.table.pockets {
                let key = (ball.id, pocket.id);
                if cache.contains(EventClass::BallPocket, key) {
                    continue;
                }
                if !ball.phase().is_translating() {
                    cache.insert(EventClass::BallPocket, key, f64::INFINITY);
                    continue;
                }
                let d = pocket.capture_distance(ball.radius());
                match contact_quartic(ball_pocket_coeffs(ball, pocket), d) {
                    // Already over the hole: captured on the spot
                    (_, Contact::Overlapping | Contact::TouchingApproaching) => {
                        cache.insert(EventClass::BallPocket, key, now)
                    }
                    (quartic, _) => pending.push(Pending { class: EventClass::BallPocket, key, quartic }),
                }
            }
        }
    }

    if pending.is_empty() {
        return;
    }
    let batch: Vec<Quartic> = pending.iter().map(|p| p.quartic).collect();
    let taus = solve_quartics(&batch, config.quartic_solver);
    for (p, tau) in pending.iter().zip(taus) {
        cache.insert(p.class, p.key, now + tau);
    }
}

/// Pairs that can never collide from their current states
fn skip_ball_ball(b1: &Ball, b2: &Ball) -> bool {
    if b1.phase() == MotionPhase::Pocketed || b2.phase() == MotionPhase::Pocketed {
        return true;
    }
    if !b1.phase().is_translating() && !b2.phase().is_translating() {
        return true;
    }
    rolling_away_from(b1, b2) || rolling_away_from(b2, b1)
}

fn populate_stick_ball(system: &System, cache: &mut EventCache) {
    let Some(cue) = &system.cue else {
        return;
    };
    let key = (CUE_KEY, cue.ball_id);
    if cache.contains(EventClass::StickBall, key) {
        return;
    }
    // Only a fresh shot on a system at rest gets struck
    let struck = system.history.iter().any(|h| h.event.class() == EventClass::StickBall);
    let time = if system.t == 0.0 && !struck && !system.has_energy() && cue.v0 > 0.0 {
        system.t
    } else {
        f64::INFINITY
    };
    cache.insert(EventClass::StickBall, key, time);
}

fn populate_transitions(system: &System, cache: &mut EventCache) {
    for ball in &system.balls {
        if cache.transition(ball.id).is_some() {
            continue;
        }
        let event = match transition_time(ball) {
            Some((dt, to)) => Event::new(
                EventKind::Transition { ball: ball.id, from: ball.phase(), to },
                system.t + dt,
            ),
            None => Event::never(),
        };
        cache.insert_transition(ball.id, event);
    }
}

/// Turn the winning cache entry of `class` into an event
fn event_for(class: EventClass, key: PairKey, time: f64) -> Event {
    let (a, b) = key;
    let kind = match class {
        EventClass::StickBall => EventKind::StickBall { ball: b },
        EventClass::BallBall => EventKind::BallBall { ball1: a, ball2: b },
        EventClass::BallCircularCushion => EventKind::BallCircularCushion { ball: a, cushion: b },
        EventClass::BallLinearCushion => EventKind::BallLinearCushion { ball: a, cushion: b },
        EventClass::BallPocket => EventKind::BallPocket { ball: a, pocket: b },
        EventClass::Transition | EventClass::Null => EventKind::Null,
    };
    Event::new(kind, time)
}

/// Earliest cached event across the included classes.
///
/// Equal times go to the class that comes first in [`EventClass`] order. Returns
/// a null event at infinity when nothing will ever happen.
pub fn earliest(cache: &EventCache, config: &SimConfig) -> Event {
    let mut best = Event::never();
    for class in EventClass::ALL {
        if !config.includes(class) {
            continue;
        }
        let candidate = if class == EventClass::Transition {
            cache.next_transition()
        } else {
            cache.next(class).map(|(key, time)| event_for(class, key, time))
        };
        if let Some(event) = candidate.filter(|e| e.time < best.time) {
            best = event;
        }
    }
    best
}

/// Populate the cache and return the next event
pub fn next_event(system: &System, cache: &mut EventCache, config: &SimConfig) -> Event {
    populate(system, cache, config);
    earliest(cache, config)
}
