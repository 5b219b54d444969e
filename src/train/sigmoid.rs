//! Precomputed logistic function

pub const TABLE_SIZE: usize = 1000;
/// Activations beyond ±MAX_EXP are treated as saturated.
pub const MAX_EXP: f32 = 6.0;

pub struct SigmoidTable {
    values: Vec<f32>,
}

impl Default for SigmoidTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SigmoidTable {
    pub fn new() -> Self {
        let values = (0..TABLE_SIZE)
            .map(|i| {
                let x = (i as f64 / TABLE_SIZE as f64 * 2.0 - 1.0) * MAX_EXP as f64;
                let e = x.exp();
                (e / (e + 1.0)) as f32
            })
            .collect();
        SigmoidTable { values }
    }

    /// `σ(x)` for `x` strictly inside `(-MAX_EXP, MAX_EXP)`, `None` otherwise.
    #[inline]
    pub fn get(&self, x: f32) -> Option<f32> {
        if x <= -MAX_EXP || x >= MAX_EXP || x.is_nan() {
            return None;
        }
        let i = ((x + MAX_EXP) * (TABLE_SIZE as f32 / MAX_EXP / 2.0)) as usize;
        Some(self.values[i.min(TABLE_SIZE - 1)])
    }

    /// `σ(x)` clamped to exactly 0 or 1 outside the table range.
    #[inline]
    pub fn saturating(&self, x: f32) -> f32 {
        match self.get(x) {
            Some(v) => v,
            None if x >= MAX_EXP => 1.0,
            None => 0.0,
        }
    }
}
