//! Ball racks for demos and tests

use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::ball::{Ball, BallParams};
use super::system::{Cue, System};
use super::table::Table;

/// Balls per row of a nine-ball diamond, apex first
pub const NINE_BALL_ROWS: [usize; 5] = [1, 2, 3, 2, 1];

/// Nine-ball table playing surface in metres
pub const NINE_BALL_TABLE: (f64, f64) = (1.27, 2.54);

/// Nine-ball diamond with its apex at `apex`, rows stacked towards +y.
///
/// Neighbours sit `2 * gap` apart and every ball is then nudged by up to `gap / 2`
/// per axis, so no two balls touch. IDs run from 1 to 9.
pub fn nine_ball_diamond(apex: DVec2, params: BallParams, gap: f64, rng: &mut impl Rng) -> Vec<Ball> {
    let spacing = 2.0 * params.r + 2.0 * gap;
    let row_step = spacing * 3f64.sqrt() / 2.0;
    let mut balls = Vec::with_capacity(9);
    let mut id = 1;
    for (row, &count) in NINE_BALL_ROWS.iter().enumerate() {
        let y = apex.y + row as f64 * row_step;
        for k in 0..count {
            let x = apex.x + (k as f64 - (count - 1) as f64 / 2.0) * spacing;
            let jitter = DVec2::new(rng.random::<f64>() - 0.5, rng.random::<f64>() - 0.5) * gap;
            balls.push(Ball::at_rest(id, x + jitter.x, y + jitter.y, params));
            id += 1;
        }
    }
    balls
}

/// A racked nine-ball table with the cue ball (ID 0) lined up for the break
pub fn nine_ball_break(seed: u64) -> System {
    let params = BallParams::default();
    let (width, length) = NINE_BALL_TABLE;
    let mut rng = Pcg32::seed_from_u64(seed);

    let mut balls = nine_ball_diamond(DVec2::new(width / 2.0, length * 0.75), params, params.r * 1e-3, &mut rng);
    let mut cue_ball = Ball::at_rest(0, width / 2.0, length * 0.25, params);
    cue_ball.state.pos.x += (rng.random::<f64>() - 0.5) * params.r * 0.1;
    balls.push(cue_ball);

    let cue = Cue::aimed_at(0).with_stroke(6.0, 90.0, 0.0, 0.0, -0.1);
    System::new(balls, Table::pocket_table(width, length, params.r)).with_cue(cue)
}

/// Balls resting at `positions` on the cloth, IDs counting up from 1
pub fn spread(positions: &[(f64, f64)], params: BallParams) -> Vec<Ball> {
    positions
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| Ball::at_rest(i as u32 + 1, x, y, params))
        .collect()
}
