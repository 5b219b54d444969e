//! Relaxed-consistency shared weight buffer
//!
//! Training threads update the same matrices without locks. Each cell is an
//! `f32` stored as the bits of an `AtomicU32` and accessed with
//! `Ordering::Relaxed`: a concurrent read-modify-write may lose one of two
//! racing additions, but never tears a value. Stochastic gradient descent
//! tolerates the lost updates.

use rand::Rng;
use std::sync::atomic::{AtomicU32, Ordering};

pub struct SharedMatrix {
    cells: Box<[AtomicU32]>,
    cols: usize,
}

impl SharedMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        let cells = (0..rows * cols)
            .map(|_| AtomicU32::new(0f32.to_bits()))
            .collect();
        SharedMatrix { cells, cols }
    }

    /// Uniform values in `[-0.5 / cols, 0.5 / cols)`.
    pub fn random<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Self {
        let scale = cols as f32;
        let cells = (0..rows * cols)
            .map(|_| AtomicU32::new(((rng.gen::<f32>() - 0.5) / scale).to_bits()))
            .collect();
        SharedMatrix { cells, cols }
    }

    pub fn rows(&self) -> usize {
        if self.cols == 0 {
            0
        } else {
            self.cells.len() / self.cols
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn row(&self, row: usize) -> &[AtomicU32] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        f32::from_bits(self.cells[row * self.cols + col].load(Ordering::Relaxed))
    }

    /// `out = row`
    pub fn copy_row(&self, row: usize, out: &mut [f32]) {
        for (o, c) in out.iter_mut().zip(self.row(row)) {
            *o = f32::from_bits(c.load(Ordering::Relaxed));
        }
    }

    /// Dot product of `row` with `v`.
    #[inline]
    pub fn dot(&self, row: usize, v: &[f32]) -> f32 {
        self.row(row)
            .iter()
            .zip(v)
            .map(|(c, x)| f32::from_bits(c.load(Ordering::Relaxed)) * x)
            .sum()
    }

    /// `acc += g * row`
    #[inline]
    pub fn accumulate_into(&self, row: usize, acc: &mut [f32], g: f32) {
        for (a, c) in acc.iter_mut().zip(self.row(row)) {
            *a += g * f32::from_bits(c.load(Ordering::Relaxed));
        }
    }

    /// `row += g * v`
    #[inline]
    pub fn add_scaled(&self, row: usize, v: &[f32], g: f32) {
        for (c, x) in self.row(row).iter().zip(v) {
            let current = f32::from_bits(c.load(Ordering::Relaxed));
            c.store((current + g * x).to_bits(), Ordering::Relaxed);
        }
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.cells
            .into_vec()
            .into_iter()
            .map(|c| f32::from_bits(c.into_inner()))
            .collect()
    }
}
