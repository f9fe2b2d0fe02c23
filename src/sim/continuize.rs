//! Ball states between events
//!
//! The history only holds snapshots at event times. Motion in between is exact, so
//! any instant can be recovered by evolving the latest snapshot before it.

use super::ball::BallState;
use super::motion;
use super::system::HistoryEntry;

/// States of ball `ball_id` at each of `timestamps`.
///
/// Timestamps before the first snapshot get the first snapshot's state. Returns
/// `None` if the ball never appears in the history.
pub fn interpolate_ball_states(history: &[HistoryEntry], ball_id: u32, timestamps: &[f64]) -> Option<Vec<BallState>> {
    let first = history.first()?;
    let first_ball = first.balls.iter().find(|b| b.id == ball_id)?;

    let states = timestamps
        .iter()
        .map(|&t| {
            // Last snapshot at or before t; later snapshots at the same time win
            let idx = history.partition_point(|h| h.event.time <= t);
            if idx == 0 {
                return first_ball.state;
            }
            let entry = &history[idx - 1];
            match entry.balls.iter().find(|b| b.id == ball_id) {
                Some(ball) => {
                    let mut state = motion::evolve(&ball.state, &ball.params, t - entry.event.time);
                    state.t = t;
                    state
                }
                None => first_ball.state,
            }
        })
        .collect();
    Some(states)
}

/// Evenly spaced timestamps from the first to the last event of `history`
pub fn timestamps(history: &[HistoryEntry], dt: f64) -> Vec<f64> {
    let (Some(first), Some(last)) = (history.first(), history.last()) else {
        return Vec::new();
    };
    let (start, end) = (first.event.time, last.event.time);
    if !(dt > 0.0) || !end.is_finite() || end < start {
        return Vec::new();
    }
    let n = ((end - start) / dt).floor() as usize;
    let mut out: Vec<f64> = (0..=n).map(|i| start + i as f64 * dt).collect();
    if out.last().is_some_and(|&t| t < end) {
        out.push(end);
    }
    out
}
