use log::info;

use crate::motif::{Background, Motif};

/// Exact discrete distribution of a motif's total score under the
/// background, computed by iterated convolution over positions. One
/// instance is owned per worker; its two buffers grow to the largest
/// motif that worker handles and are reused across motifs.
pub struct ScoreDistribution {
    /// Working buffer. Holds the PDF during convolution and the
    /// upper-tail survival function after `compute` returns.
    dist: Vec<f64>,
    /// Snapshot of the PDF taken before each convolution step.
    snapshot: Vec<f64>,
    size: usize,
}

impl ScoreDistribution {
    pub fn new() -> Self {
        Self { dist: Vec::new(), snapshot: Vec::new(), size: 0 }
    }

    /// Build the survival function for `motif`. Afterwards
    /// `self.survival(motif, score)` is `P(total score >= score)` for
    /// any window score until the next call to `compute`.
    pub fn compute(&mut self, motif: &Motif, bkg: &Background) {
        let size = motif.cdf_size;
        if self.dist.len() < size {
            self.dist.resize(size, 0f64);
            self.snapshot.resize(size, 0f64);
        }
        self.size = size;
        let cdf_max = motif.cdf_max as usize;
        let pdf = &mut self.dist;
        let tmp = &mut self.snapshot;
        pdf[..size].fill(0f64);
        pdf[0] = 1f64;
        for (i, row) in motif.pwm.iter().enumerate() {
            let support = i * cdf_max;
            tmp[..=support].copy_from_slice(&pdf[..=support]);
            pdf[..=support + cdf_max].fill(0f64);
            for b in 0..4 {
                let shift = (row[b] - motif.min) as usize;
                let q = bkg.freq(b);
                for k in 0..=support {
                    pdf[k + shift] += tmp[k] * q;
                }
            }
        }
        let total: f64 = pdf[..size].iter().sum();
        if (total - 1.0).abs() > 1e-4 {
            info!(
                "motif {}: score distribution sums to {total}, rescaling",
                motif.name
            );
            for p in pdf[..size].iter_mut() {
                *p /= total;
            }
        }
        // integrate the upper tail in place
        for k in (0..size - 1).rev() {
            pdf[k] += pdf[k + 1];
        }
    }

    /// Upper-tail probability of observing `score` or better.
    pub fn survival(&self, motif: &Motif, score: i32) -> f64 {
        let idx =
            (score - motif.cdf_offset).clamp(0, self.size as i32 - 1) as usize;
        self.dist[idx]
    }

    /// Smallest integer score whose upper-tail probability is below
    /// `pvalue`, or `None` when even a perfect match cannot reach it.
    pub fn threshold(&self, motif: &Motif, pvalue: f64) -> Option<i32> {
        let best = (motif.max_score - motif.cdf_offset) as usize;
        if self.dist[best] > pvalue * 1.0001 {
            return None;
        }
        let found = self.dist[..self.size]
            .iter()
            .position(|&tail| tail < pvalue)
            .map(|k| k as i32 + motif.cdf_offset);
        // a borderline motif may never dip strictly below the p-value,
        // only a perfect match then qualifies
        Some(found.unwrap_or(motif.max_score))
    }
}

impl Default for ScoreDistribution {
    fn default() -> Self {
        Self::new()
    }
}
