//! Static terrain and the drifting climate layered over the space.
//!
//! Terrain is a grid of unit cells, some of which are impassable. The climate
//! is coarser: every [`CLIMATE_CELL`] square carries its own conditions, which
//! drift slowly and follow a global day/night cycle.

use cogverse_data::Vec2;
use rand::Rng;
use std::f64::consts::TAU;

/// Side length of one climate cell in world units.
pub const CLIMATE_CELL: f64 = 10.0;
pub const COMFORT_TEMPERATURE: f64 = 20.0;
pub const COMFORT_HUMIDITY: f64 = 0.5;
pub const TEMPERATURE_RANGE: (f64, f64) = (-10.0, 50.0);

/// Local environmental conditions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conditions {
    pub temperature: f64,
    pub humidity: f64,
    pub radiation: f64,
    pub toxicity: f64,
}

impl Conditions {
    /// What lies outside the world.
    pub const HARSH: Conditions = Conditions {
        temperature: TEMPERATURE_RANGE.0,
        humidity: 0.0,
        radiation: 1.0,
        toxicity: 1.0,
    };

    pub const MILD: Conditions = Conditions {
        temperature: COMFORT_TEMPERATURE,
        humidity: COMFORT_HUMIDITY,
        radiation: 0.0,
        toxicity: 0.0,
    };

    /// How habitable these conditions are, in `[0, 1]`.
    pub fn survival_factor(&self) -> f64 {
        let temperature = 1.0 - (self.temperature - COMFORT_TEMPERATURE).abs() / 50.0;
        let humidity = 1.0 - (self.humidity - COMFORT_HUMIDITY).abs() / 0.5;
        let radiation = (1.0 - self.radiation).max(0.0);
        let toxicity = (1.0 - self.toxicity).max(0.0);
        (temperature * humidity * radiation * toxicity).clamp(0.0, 1.0)
    }
}

/// Mean of three uniform draws: a cheap bell-shaped sample with spread `sigma`.
fn jitter<R: Rng>(sigma: f64, rng: &mut R) -> f64 {
    if sigma <= 0.0 {
        return 0.0;
    }
    let spread = 3.0 * sigma;
    let sum: f64 = (0..3).map(|_| rng.gen_range(-spread..=spread)).sum();
    sum / 3.0
}

/// Temperature multiplier for a point in the day/night cycle.
///
/// The first half of the cycle is day and warms by up to 20%; the second half
/// is night and cools by up to 10%.
pub fn day_modifier(tick: u64, day_cycle: u64) -> f64 {
    let cycle = day_cycle.max(1);
    let phase = (tick % cycle) as f64 / cycle as f64;
    if phase < 0.5 {
        1.0 + 0.2 * (phase * TAU).sin()
    } else {
        1.0 - 0.1 * ((phase - 0.5) * TAU).sin()
    }
}

/// Impassable unit cells.
#[derive(Debug, Clone)]
pub struct Terrain {
    cols: usize,
    rows: usize,
    blocked: Vec<bool>,
}

impl Terrain {
    /// Fully open terrain covering `width x height`.
    pub fn open(width: f64, height: f64) -> Self {
        let cols = (width.ceil() as usize).max(1);
        let rows = (height.ceil() as usize).max(1);
        Self {
            cols,
            rows,
            blocked: vec![false; cols * rows],
        }
    }

    /// Blocks each cell independently with probability `density`.
    pub fn scatter<R: Rng>(&mut self, density: f64, rng: &mut R) {
        if density <= 0.0 {
            return;
        }
        for cell in &mut self.blocked {
            *cell = rng.gen_bool(density.min(1.0));
        }
    }

    fn cell(&self, position: Vec2) -> Option<usize> {
        if !position.is_finite() || position.x < 0.0 || position.y < 0.0 {
            return None;
        }
        let cx = (position.x as usize).min(self.cols - 1);
        let cy = (position.y as usize).min(self.rows - 1);
        Some(cy * self.cols + cx)
    }

    pub fn is_blocked(&self, position: Vec2) -> bool {
        self.cell(position).is_some_and(|i| self.blocked[i])
    }

    pub fn block(&mut self, position: Vec2) {
        if let Some(i) = self.cell(position) {
            self.blocked[i] = true;
        }
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked.iter().filter(|b| **b).count()
    }
}

#[derive(Debug, Clone, Copy)]
struct ClimateCell {
    base_temperature: f64,
    conditions: Conditions,
}

/// Coarse grid of drifting conditions.
#[derive(Debug, Clone)]
pub struct Climate {
    cols: usize,
    rows: usize,
    day_cycle: u64,
    cells: Vec<ClimateCell>,
}

impl Climate {
    /// Uniform comfortable climate.
    pub fn mild(width: f64, height: f64, day_cycle: u64) -> Self {
        let cols = ((width / CLIMATE_CELL).ceil() as usize).max(1);
        let rows = ((height / CLIMATE_CELL).ceil() as usize).max(1);
        let cell = ClimateCell {
            base_temperature: COMFORT_TEMPERATURE,
            conditions: Conditions::MILD,
        };
        Self {
            cols,
            rows,
            day_cycle,
            cells: vec![cell; cols * rows],
        }
    }

    /// Scatters local variation over every cell.
    pub fn vary<R: Rng>(&mut self, rng: &mut R) {
        for cell in &mut self.cells {
            let (lo, hi) = TEMPERATURE_RANGE;
            cell.base_temperature = (COMFORT_TEMPERATURE + jitter(5.0, rng)).clamp(lo, hi);
            cell.conditions = Conditions {
                temperature: cell.base_temperature,
                humidity: (COMFORT_HUMIDITY + jitter(0.1, rng)).clamp(0.0, 1.0),
                radiation: jitter(0.1, rng).max(0.0),
                toxicity: jitter(0.05, rng).max(0.0),
            };
        }
    }

    /// Drifts every cell by one step and applies the day/night cycle.
    pub fn update<R: Rng>(&mut self, tick: u64, dt: f64, rng: &mut R) {
        let modifier = day_modifier(tick, self.day_cycle);
        let (lo, hi) = TEMPERATURE_RANGE;
        for cell in &mut self.cells {
            cell.base_temperature = (cell.base_temperature + jitter(0.1, rng) * dt).clamp(lo, hi);
            let c = &mut cell.conditions;
            c.humidity = (c.humidity + jitter(0.01, rng) * dt).clamp(0.0, 1.0);
            c.temperature = (cell.base_temperature * modifier).clamp(lo, hi);
        }
    }

    /// Conditions at `position`; harsh anywhere outside `[0, size]`.
    pub fn at(&self, position: Vec2, width: f64, height: f64) -> Conditions {
        if !position.is_finite()
            || !(0.0..=width).contains(&position.x)
            || !(0.0..=height).contains(&position.y)
        {
            return Conditions::HARSH;
        }
        let cx = ((position.x / CLIMATE_CELL) as usize).min(self.cols - 1);
        let cy = ((position.y / CLIMATE_CELL) as usize).min(self.rows - 1);
        self.cells[cy * self.cols + cx].conditions
    }

    pub fn mean_temperature(&self) -> f64 {
        let total: f64 = self.cells.iter().map(|c| c.conditions.temperature).sum();
        total / self.cells.len() as f64
    }
}
