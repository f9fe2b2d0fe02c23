//! Table geometry: cushion segments and pockets
//!
//! All geometry is immutable once the run starts. Heights live in the z component
//! of the defining points.

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::polar_to_cartesian;

/// Which side of a linear cushion is the playing surface.
///
/// The segment normal is the left-hand perpendicular of `p2 - p1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CushionDirection {
    /// Balls approach from the side the normal points to
    Side1,
    /// Balls approach from the side opposite the normal
    Side2,
    /// Check both sides
    #[default]
    Both,
}

/// Straight cushion between `p1` and `p2`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearCushion {
    pub id: u32,
    pub p1: DVec3,
    pub p2: DVec3,
    #[serde(default)]
    pub direction: CushionDirection,
}

impl LinearCushion {
    pub fn new(id: u32, p1: DVec3, p2: DVec3, direction: CushionDirection) -> Self {
        Self { id, p1, p2, direction }
    }

    /// Height of the cushion nose above the cloth
    #[inline]
    pub fn height(&self) -> f64 {
        self.p1.z
    }

    /// Length of the segment in the table plane
    pub fn length(&self) -> f64 {
        (self.p2 - self.p1).truncate().length()
    }

    /// Unit left-hand perpendicular of `p2 - p1` in the table plane
    pub fn normal(&self) -> DVec3 {
        let d = (self.p2 - self.p1).truncate().normalize_or_zero();
        DVec3::new(-d.y, d.x, 0.0)
    }

    /// Signed distance of `p` from the cushion line, positive on the normal side
    pub fn signed_distance(&self, p: DVec3) -> f64 {
        (p - self.p1).truncate().dot(self.normal().truncate())
    }

    /// Normal pointing from the cushion line towards `p`
    pub fn normal_towards(&self, p: DVec3) -> DVec3 {
        let n = self.normal();
        if self.signed_distance(p) >= 0.0 { n } else { -n }
    }

    /// Fraction along the segment of the projection of `p` (0 at `p1`, 1 at `p2`)
    pub fn projection(&self, p: DVec3) -> f64 {
        let d = (self.p2 - self.p1).truncate();
        let len_sq = d.length_squared();
        if len_sq == 0.0 {
            return 0.0;
        }
        (p - self.p1).truncate().dot(d) / len_sq
    }

    /// Closest point to `p` on the infinite cushion line, at `p`'s height
    pub fn closest_point(&self, p: DVec3) -> DVec3 {
        let s = self.projection(p);
        let c = self.p1 + (self.p2 - self.p1) * s;
        DVec3::new(c.x, c.y, p.z)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.p1.is_finite() || !self.p2.is_finite() {
            return Err(SimError::degenerate(format!("linear cushion {} has non-finite endpoints", self.id)));
        }
        if self.length() == 0.0 {
            return Err(SimError::degenerate(format!("linear cushion {} has zero length", self.id)));
        }
        Ok(())
    }
}

/// Circular cushion segment (e.g. a pocket jaw)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircularCushion {
    pub id: u32,
    /// Centre; z is the cushion height
    pub center: DVec3,
    pub radius: f64,
}

impl CircularCushion {
    pub fn new(id: u32, center: DVec3, radius: f64) -> Self {
        Self { id, center, radius }
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.center.z
    }

    /// Outward normal at the point of the cushion closest to `p`
    pub fn normal_towards(&self, p: DVec3) -> DVec3 {
        (p - self.center).truncate().normalize_or_zero().extend(0.0)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.center.is_finite() || !(self.radius > 0.0) {
            return Err(SimError::degenerate(format!("circular cushion {} needs a positive radius", self.id)));
        }
        Ok(())
    }
}

/// Pocket: a ball is captured once its centre is within `radius - ball radius`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pocket {
    pub id: u32,
    pub center: DVec3,
    pub radius: f64,
    #[serde(default = "default_pocket_depth")]
    pub depth: f64,
}

fn default_pocket_depth() -> f64 {
    0.08
}

impl Pocket {
    pub fn new(id: u32, center: DVec3, radius: f64) -> Self {
        Self { id, center, radius, depth: default_pocket_depth() }
    }

    /// Centre distance at which a ball of `ball_radius` is captured
    #[inline]
    pub fn capture_distance(&self, ball_radius: f64) -> f64 {
        self.radius - ball_radius
    }

    pub fn validate(&self) -> Result<()> {
        if !self.center.is_finite() || !(self.radius > 0.0) || !(self.depth >= 0.0) {
            return Err(SimError::degenerate(format!("pocket {} needs a positive radius and depth", self.id)));
        }
        Ok(())
    }
}

/// Everything balls can interact with besides each other
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub linear_cushions: Vec<LinearCushion>,
    pub circular_cushions: Vec<CircularCushion>,
    pub pockets: Vec<Pocket>,
}

/// Cushion nose height as a fraction of ball diameter
const CUSHION_HEIGHT_FRACTION: f64 = 0.64;

impl Table {
    /// Pocketless rectangle `[0, width] x [0, length]` with inward-facing cushions
    pub fn rectangular(width: f64, length: f64, ball_radius: f64) -> Self {
        let h = CUSHION_HEIGHT_FRACTION * 2.0 * ball_radius;
        let corners = [
            DVec3::new(0.0, 0.0, h),
            DVec3::new(width, 0.0, h),
            DVec3::new(width, length, h),
            DVec3::new(0.0, length, h),
        ];
        // Counter-clockwise, so every left-hand normal points into the table
        let linear_cushions = (0..4)
            .map(|i| LinearCushion::new(i as u32, corners[i], corners[(i + 1) % 4], CushionDirection::Side1))
            .collect();
        Self { linear_cushions, ..Default::default() }
    }

    /// Six-pocket table: rails broken at the pockets, rounded jaws at every rail end
    pub fn pocket_table(width: f64, length: f64, ball_radius: f64) -> Self {
        let h = CUSHION_HEIGHT_FRACTION * 2.0 * ball_radius;
        let corner_radius = 2.1 * ball_radius;
        let side_radius = 2.3 * ball_radius;
        let jaw_radius = 0.2 * ball_radius;
        // Narrow enough that a ball slipping past a jaw crosses the capture circle
        let corner_gap = corner_radius * 0.95;
        let side_gap = side_radius;

        let p = |x: f64, y: f64| DVec3::new(x, y, h);
        // Rails listed counter-clockwise so the left-hand normal faces the cloth
        let rails = [
            (p(corner_gap, 0.0), p(width - corner_gap, 0.0)),
            (p(width, corner_gap), p(width, length / 2.0 - side_gap)),
            (p(width, length / 2.0 + side_gap), p(width, length - corner_gap)),
            (p(width - corner_gap, length), p(corner_gap, length)),
            (p(0.0, length - corner_gap), p(0.0, length / 2.0 + side_gap)),
            (p(0.0, length / 2.0 - side_gap), p(0.0, corner_gap)),
        ];

        let mut table = Table::default();
        let mut jaw_id = 0;
        for (i, (a, b)) in rails.iter().enumerate() {
            let rail = LinearCushion::new(i as u32, *a, *b, CushionDirection::Side1);
            // Jaws sit just behind the rail line so they round off its ends
            let back = -rail.normal() * jaw_radius;
            for end in [*a, *b] {
                table.circular_cushions.push(CircularCushion::new(jaw_id, end + back, jaw_radius));
                jaw_id += 1;
            }
            table.linear_cushions.push(rail);
        }

        let mut pocket_centers = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(width, 0.0),
            DVec2::new(width, length),
            DVec2::new(0.0, length),
        ];
        // Side pockets sit slightly behind the rail line
        pocket_centers.push(DVec2::new(width, length / 2.0) + polar_to_cartesian(side_radius * 0.2, 0.0));
        pocket_centers.push(DVec2::new(0.0, length / 2.0) - polar_to_cartesian(side_radius * 0.2, 0.0));

        for (i, c) in pocket_centers.iter().enumerate() {
            let radius = if i < 4 { corner_radius } else { side_radius };
            table.pockets.push(Pocket::new(i as u32, DVec3::new(c.x, c.y, 0.0), radius));
        }
        table
    }

    pub fn validate(&self) -> Result<()> {
        for c in &self.linear_cushions {
            c.validate()?;
        }
        for c in &self.circular_cushions {
            c.validate()?;
        }
        for p in &self.pockets {
            p.validate()?;
        }
        // Cache entries are keyed by (ball, id), so a repeated id hides a segment
        unique_ids("linear cushion", self.linear_cushions.iter().map(|c| c.id))?;
        unique_ids("circular cushion", self.circular_cushions.iter().map(|c| c.id))?;
        unique_ids("pocket", self.pockets.iter().map(|p| p.id))
    }

    /// Ensure geometry is sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.linear_cushions.sort_by_key(|c| c.id);
        self.circular_cushions.sort_by_key(|c| c.id);
        self.pockets.sort_by_key(|p| p.id);
    }
}

fn unique_ids(kind: &str, ids: impl Iterator<Item = u32>) -> Result<()> {
    let mut ids: Vec<u32> = ids.collect();
    ids.sort_unstable();
    match ids.windows(2).find(|w| w[0] == w[1]) {
        Some(w) => Err(SimError::degenerate(format!("duplicate {} id {}", kind, w[0]))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangular_normals_point_inward() {
        let table = Table::rectangular(1.0, 2.0, 0.028575);
        let center = DVec3::new(0.5, 1.0, 0.0);
        for c in &table.linear_cushions {
            assert!(c.signed_distance(center) > 0.0, "cushion {} faces out", c.id);
        }
    }

    #[test]
    fn test_zero_length_cushion_rejected() {
        let c = LinearCushion::new(0, DVec3::ONE, DVec3::ONE, CushionDirection::Both);
        assert!(matches!(c.validate(), Err(SimError::DegenerateGeometry(_))));
    }

    #[test]
    fn test_projection_and_closest_point() {
        let c = LinearCushion::new(0, DVec3::new(0.0, 0.0, 0.03), DVec3::new(2.0, 0.0, 0.03), CushionDirection::Side1);
        let p = DVec3::new(0.5, 0.3, 0.028);
        assert!((c.projection(p) - 0.25).abs() < 1e-12);
        let q = c.closest_point(p);
        assert!((q - DVec3::new(0.5, 0.0, 0.028)).length() < 1e-12);
        assert!((c.normal_towards(DVec3::new(0.5, -1.0, 0.0)) + DVec3::Y).length() < 1e-12);
    }

    #[test]
    fn test_pocket_table_layout() {
        let table = Table::pocket_table(1.27, 2.54, 0.028575);
        assert_eq!(table.pockets.len(), 6);
        assert_eq!(table.linear_cushions.len(), 6);
        assert_eq!(table.circular_cushions.len(), 12);
        assert!(table.validate().is_ok());
        let center = DVec3::new(0.635, 1.27, 0.0);
        for c in &table.linear_cushions {
            assert!(c.signed_distance(center) > 0.0);
        }
    }

    #[test]
    fn test_pocket_mouths_are_covered() {
        let r = 0.028575;
        let table = Table::pocket_table(1.27, 2.54, r);
        // A ball centre crossing the foot rail line next to the corner, just clear of the jaw
        let jaw = &table.circular_cushions[0];
        let crossing_x = jaw.center.x - ((r + jaw.radius).powi(2) - jaw.center.y.powi(2)).sqrt();
        let corner = &table.pockets[0];
        let dist = DVec2::new(crossing_x - corner.center.x, -corner.center.y).length();
        assert!(dist < corner.capture_distance(r));
    }

    #[test]
    fn test_duplicate_geometry_ids_rejected() {
        let mut table = Table::rectangular(1.0, 2.0, 0.028575);
        table.linear_cushions[3].id = 1;
        assert!(matches!(table.validate(), Err(SimError::DegenerateGeometry(_))));

        let mut table = Table::pocket_table(1.27, 2.54, 0.028575);
        table.circular_cushions[11].id = 0;
        assert!(matches!(table.validate(), Err(SimError::DegenerateGeometry(_))));

        let mut table = Table::pocket_table(1.27, 2.54, 0.028575);
        table.pockets[5].id = 2;
        assert!(matches!(table.validate(), Err(SimError::DegenerateGeometry(_))));
    }
}
