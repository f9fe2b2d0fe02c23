//! Simulation events

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ball::MotionPhase;

/// Event class. Declaration order is the tie-break precedence when two classes
/// produce events at exactly the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventClass {
    StickBall,
    Transition,
    BallBall,
    BallCircularCushion,
    BallLinearCushion,
    BallPocket,
    Null,
}

impl EventClass {
    /// Every class that can actually occur, in precedence order
    pub const ALL: [EventClass; 6] = [
        EventClass::StickBall,
        EventClass::Transition,
        EventClass::BallBall,
        EventClass::BallCircularCushion,
        EventClass::BallLinearCushion,
        EventClass::BallPocket,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventClass::StickBall => "stick_ball",
            EventClass::Transition => "transition",
            EventClass::BallBall => "ball_ball",
            EventClass::BallCircularCushion => "ball_circular_cushion",
            EventClass::BallLinearCushion => "ball_linear_cushion",
            EventClass::BallPocket => "ball_pocket",
            EventClass::Null => "null",
        }
    }

    /// Which positions of a cache key hold ball IDs.
    ///
    /// Keys are `(ball1, ball2)`, `(ball, object)` or `(cue, ball)`.
    pub fn ball_slots(&self) -> &'static [usize] {
        match self {
            EventClass::BallBall => &[0, 1],
            EventClass::BallCircularCushion | EventClass::BallLinearCushion | EventClass::BallPocket => &[0],
            EventClass::StickBall => &[1],
            EventClass::Transition | EventClass::Null => &[],
        }
    }
}

impl fmt::Display for EventClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened, and to whom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Start or end of a run; no participants
    Null,
    StickBall { ball: u32 },
    Transition { ball: u32, from: MotionPhase, to: MotionPhase },
    BallBall { ball1: u32, ball2: u32 },
    BallLinearCushion { ball: u32, cushion: u32 },
    BallCircularCushion { ball: u32, cushion: u32 },
    BallPocket { ball: u32, pocket: u32 },
}

impl EventKind {
    pub fn class(&self) -> EventClass {
        match self {
            EventKind::Null => EventClass::Null,
            EventKind::StickBall { .. } => EventClass::StickBall,
            EventKind::Transition { .. } => EventClass::Transition,
            EventKind::BallBall { .. } => EventClass::BallBall,
            EventKind::BallLinearCushion { .. } => EventClass::BallLinearCushion,
            EventKind::BallCircularCushion { .. } => EventClass::BallCircularCushion,
            EventKind::BallPocket { .. } => EventClass::BallPocket,
        }
    }
}

/// An event at an absolute simulation time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub time: f64,
}

impl Event {
    pub fn new(kind: EventKind, time: f64) -> Self {
        Self { kind, time }
    }

    pub fn null(time: f64) -> Self {
        Self { kind: EventKind::Null, time }
    }

    /// Null event that never happens
    pub fn never() -> Self {
        Self::null(f64::INFINITY)
    }

    #[inline]
    pub fn class(&self) -> EventClass {
        self.kind.class()
    }

    /// IDs of the balls taking part
    pub fn ball_ids(&self) -> Vec<u32> {
        match self.kind {
            EventKind::Null => Vec::new(),
            EventKind::BallBall { ball1, ball2 } => vec![ball1, ball2],
            EventKind::StickBall { ball }
            | EventKind::Transition { ball, .. }
            | EventKind::BallLinearCushion { ball, .. }
            | EventKind::BallCircularCushion { ball, .. }
            | EventKind::BallPocket { ball, .. } => vec![ball],
        }
    }

    pub fn involves(&self, ball_id: u32) -> bool {
        self.ball_ids().contains(&ball_id)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EventKind::Null => write!(f, "null @ {:.6}", self.time),
            EventKind::StickBall { ball } => write!(f, "stick-ball {} @ {:.6}", ball, self.time),
            EventKind::Transition { ball, from, to } => {
                write!(f, "{} {}->{} @ {:.6}", ball, from.as_str(), to.as_str(), self.time)
            }
            EventKind::BallBall { ball1, ball2 } => write!(f, "ball-ball {}-{} @ {:.6}", ball1, ball2, self.time),
            EventKind::BallLinearCushion { ball, cushion } => {
                write!(f, "ball-linear-cushion {}-{} @ {:.6}", ball, cushion, self.time)
            }
            EventKind::BallCircularCushion { ball, cushion } => {
                write!(f, "ball-circular-cushion {}-{} @ {:.6}", ball, cushion, self.time)
            }
            EventKind::BallPocket { ball, pocket } => write!(f, "ball-pocket {}-{} @ {:.6}", ball, pocket, self.time),
        }
    }
}
