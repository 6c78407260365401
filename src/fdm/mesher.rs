// src/fdm/mesher.rs
//! Non-uniform rectangular meshes
//!
//! # Concentration
//!
//! Points are placed through an inverse hyperbolic-sine change of variables
//! around a concentration point `c` with width `d`:
//! ```text
//! x_i = c + d·sinh(c₁(1 - u_i) + c₂u_i),   u_i = i/(n-1)
//! c₁ = asinh((x_min - c)/d),   c₂ = asinh((x_max - c)/d)
//! ```
//! Spacing is smallest near `c` (≈ `d·(c₂ - c₁)/(n-1)`) and grows
//! exponentially towards the edges. `d` is given relative to the axis width,
//! so the same density means the same shape for any range.
//!
//! Ranges and concentration points are given in *state* units; the axis
//! coordinate (linear or log) is applied before the points are laid out.

use crate::error::{validation::*, PdeError, PdeResult};
use crate::models::heston::HestonParams;
use crate::models::model::{Coordinate, Dimension};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Concentration {
    /// Concentration point in state units
    pub point: f64,
    /// Width of the dense region relative to the axis width (> 0)
    pub density: f64,
}

/// Description of one mesh axis
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisSpec {
    pub lower: f64,
    pub upper: f64,
    pub size: usize,
    pub concentration: Option<Concentration>,
    #[serde(default)]
    pub coordinate: Coordinate,
}

impl AxisSpec {
    pub fn uniform(lower: f64, upper: f64, size: usize, coordinate: Coordinate) -> Self {
        AxisSpec {
            lower,
            upper,
            size,
            concentration: None,
            coordinate,
        }
    }

    pub fn concentrated(
        lower: f64,
        upper: f64,
        size: usize,
        coordinate: Coordinate,
        point: f64,
        density: f64,
    ) -> Self {
        AxisSpec {
            lower,
            upper,
            size,
            concentration: Some(Concentration { point, density }),
            coordinate,
        }
    }

    pub fn validate(&self, field: &str) -> PdeResult<()> {
        validate_grid_size(field, self.size)?;
        validate_finite("lower", self.lower)?;
        validate_finite("upper", self.upper)?;
        if self.upper <= self.lower {
            return Err(PdeError::config(
                field,
                format!("degenerate range [{}, {}]", self.lower, self.upper),
            ));
        }
        if self.coordinate == Coordinate::Log {
            validate_positive("lower", self.lower)?;
        }
        if let Some(c) = self.concentration {
            validate_positive("density", c.density)?;
            validate_range("concentration point", c.point, self.lower, self.upper)?;
        }
        Ok(())
    }
}

/// Strictly increasing coordinates along one dimension, in mesh units.
#[derive(Clone, Debug, PartialEq)]
pub struct Fdm1dMesher {
    locations: Vec<f64>,
    coordinate: Coordinate,
}

impl Fdm1dMesher {
    pub fn new(spec: &AxisSpec) -> PdeResult<Self> {
        spec.validate("axis")?;

        let start = spec.coordinate.to_mesh(spec.lower);
        let end = spec.coordinate.to_mesh(spec.upper);
        let n = spec.size;
        let last = (n - 1) as f64;

        let mut locations: Vec<f64> = match spec.concentration {
            None => (0..n)
                .map(|i| start + (end - start) * i as f64 / last)
                .collect(),
            Some(c) => {
                let point = spec.coordinate.to_mesh(c.point);
                let width = c.density * (end - start);
                let c1 = ((start - point) / width).asinh();
                let c2 = ((end - point) / width).asinh();
                (0..n)
                    .map(|i| {
                        let u = i as f64 / last;
                        point + width * (c1 * (1.0 - u) + c2 * u).sinh()
                    })
                    .collect()
            }
        };
        locations[0] = start;
        locations[n - 1] = end;

        Self::from_locations(locations, spec.coordinate)
    }

    /// Mesh from explicit coordinates (already in mesh units).
    pub fn from_locations(locations: Vec<f64>, coordinate: Coordinate) -> PdeResult<Self> {
        validate_grid_size("locations", locations.len())?;
        if let Some(bad) = locations.iter().find(|x| !x.is_finite()) {
            return Err(PdeError::InvalidParameters {
                parameter: "location".to_string(),
                value: *bad,
                constraint: "mesh coordinates must be finite".to_string(),
            });
        }
        if let Some(i) = locations.windows(2).position(|w| w[1] <= w[0]) {
            return Err(PdeError::config(
                "locations",
                format!(
                    "coordinates must be strictly increasing: x[{}] = {} ≥ x[{}] = {}",
                    i,
                    locations[i],
                    i + 1,
                    locations[i + 1]
                ),
            ));
        }
        Ok(Fdm1dMesher {
            locations,
            coordinate,
        })
    }

    pub fn locations(&self) -> &[f64] {
        &self.locations
    }

    pub fn size(&self) -> usize {
        self.locations.len()
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub fn lower(&self) -> f64 {
        self.locations[0]
    }

    pub fn upper(&self) -> f64 {
        self.locations[self.locations.len() - 1]
    }

    /// State value of mesh point `i`.
    pub fn state(&self, i: usize) -> f64 {
        self.coordinate.to_state(self.locations[i])
    }

    pub fn states(&self) -> Vec<f64> {
        self.locations
            .iter()
            .map(|&x| self.coordinate.to_state(x))
            .collect()
    }

    /// Spacing to the left neighbour, `None` at the lower edge.
    pub fn dminus(&self, i: usize) -> Option<f64> {
        (i > 0).then(|| self.locations[i] - self.locations[i - 1])
    }

    /// Spacing to the right neighbour, `None` at the upper edge.
    pub fn dplus(&self, i: usize) -> Option<f64> {
        (i + 1 < self.locations.len()).then(|| self.locations[i + 1] - self.locations[i])
    }

    /// Index `i` of the cell `[x_i, x_{i+1}]` containing mesh coordinate `x`,
    /// clamped to `[0, n-2]`.
    pub fn locate(&self, x: f64) -> usize {
        let pos = self.locations.partition_point(|&xi| xi <= x);
        pos.saturating_sub(1).min(self.locations.len() - 2)
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.lower() && x <= self.upper()
    }
}

/// Two-dimensional tensor-product mesh (`[spot, variance]`).
#[derive(Clone, Debug, PartialEq)]
pub struct FdmMesher {
    axes: [Fdm1dMesher; 2],
}

impl FdmMesher {
    pub fn new(spot: Fdm1dMesher, variance: Fdm1dMesher) -> Self {
        FdmMesher {
            axes: [spot, variance],
        }
    }

    pub fn from_specs(spot: &AxisSpec, variance: &AxisSpec) -> PdeResult<Self> {
        spot.validate("spot axis")?;
        variance.validate("variance axis")?;
        Ok(Self::new(Fdm1dMesher::new(spot)?, Fdm1dMesher::new(variance)?))
    }

    /// Mesh for a Heston problem: log-spot concentrated at the strike, variance
    /// concentrated at zero.
    ///
    /// The spot range spans `±5` standard deviations of `ln S` at the larger
    /// of `v0` and `θ` around both spot and strike; the variance range is
    /// `[0, 5·max(v0, θ)]`.
    pub fn for_heston(
        params: &HestonParams,
        maturity: f64,
        strike: f64,
        spot_size: usize,
        variance_size: usize,
    ) -> PdeResult<Self> {
        validate_positive("maturity", maturity)?;
        validate_positive("strike", strike)?;
        validate_positive("s0", params.s0)?;

        let v_scale = params.v0.max(params.theta);
        validate_positive("max(v0, theta)", v_scale)?;
        let std_dev = (v_scale * maturity).sqrt();
        let lo = params.s0.min(strike).ln() - 5.0 * std_dev;
        let hi = params.s0.max(strike).ln() + 5.0 * std_dev;

        let spot = AxisSpec::concentrated(
            lo.exp(),
            hi.exp(),
            spot_size,
            Coordinate::Log,
            strike,
            0.1,
        );
        let variance = AxisSpec::concentrated(
            0.0,
            5.0 * v_scale,
            variance_size,
            Coordinate::Linear,
            0.0,
            0.15,
        );
        Self::from_specs(&spot, &variance)
    }

    pub fn axis(&self, dim: Dimension) -> &Fdm1dMesher {
        &self.axes[dim.index()]
    }

    /// Grid shape `(spot points, variance points)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.axes[0].size(), self.axes[1].size())
    }

    pub fn len(&self) -> usize {
        self.axes[0].size() * self.axes[1].size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn coordinates(&self) -> [Coordinate; 2] {
        [self.axes[0].coordinate(), self.axes[1].coordinate()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_uniform_axis() {
        let mesher = Fdm1dMesher::new(&AxisSpec::uniform(0.0, 1.0, 5, Coordinate::Linear))
            .expect("Valid axis");
        assert_eq!(mesher.locations(), &[0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(mesher.dminus(0), None);
        assert_eq!(mesher.dplus(4), None);
        assert_relative_eq!(mesher.dplus(1).unwrap_or_default(), 0.25);
    }

    #[test]
    fn test_concentration_shrinks_spacing_near_point() {
        let spec = AxisSpec::concentrated(50.0, 200.0, 101, Coordinate::Log, 100.0, 0.05);
        let mesher = Fdm1dMesher::new(&spec).expect("Valid axis");

        let centre = mesher.locate(100f64.ln());
        let near = mesher.dplus(centre).unwrap_or_default();
        let edge = mesher.dplus(0).unwrap_or_default();
        assert!(
            near < 0.5 * edge,
            "spacing near the strike ({}) should be much finer than at the edge ({})",
            near,
            edge
        );
        assert_relative_eq!(mesher.state(0), 50.0, epsilon = 1e-10);
        assert_relative_eq!(mesher.state(100), 200.0, epsilon = 1e-10);
    }

    #[test]
    fn test_rejects_too_few_points_and_degenerate_range() {
        let few = AxisSpec::uniform(0.0, 1.0, 2, Coordinate::Linear);
        assert!(Fdm1dMesher::new(&few).is_err());

        let flat = AxisSpec::uniform(1.0, 1.0, 10, Coordinate::Linear);
        assert!(Fdm1dMesher::new(&flat).is_err());

        let log_of_zero = AxisSpec::uniform(0.0, 1.0, 10, Coordinate::Log);
        assert!(Fdm1dMesher::new(&log_of_zero).is_err());
    }

    #[test]
    fn test_from_locations_rejects_non_monotone() {
        let err = Fdm1dMesher::from_locations(vec![0.0, 0.5, 0.5, 1.0], Coordinate::Linear)
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_locate_clamps_to_cells() {
        let mesher = Fdm1dMesher::new(&AxisSpec::uniform(0.0, 1.0, 5, Coordinate::Linear))
            .expect("Valid axis");
        assert_eq!(mesher.locate(0.0), 0);
        assert_eq!(mesher.locate(0.3), 1);
        assert_eq!(mesher.locate(0.5), 2);
        assert_eq!(mesher.locate(1.0), 3);
    }

    #[test]
    fn test_heston_mesher_contains_spot_and_strike() {
        let params = HestonParams::default();
        let mesher = FdmMesher::for_heston(&params, 1.0, 110.0, 60, 30).expect("Valid mesher");
        assert_eq!(mesher.shape(), (60, 30));

        let spot = mesher.axis(Dimension::Spot);
        assert!(spot.contains(100f64.ln()));
        assert!(spot.contains(110f64.ln()));
        assert_eq!(mesher.axis(Dimension::Variance).lower(), 0.0);
        assert_eq!(mesher.coordinates(), [Coordinate::Log, Coordinate::Linear]);
    }
}
