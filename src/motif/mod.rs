use log::info;

use crate::alphabet::{consensus_row, NUM_CODES};
use crate::errs::{YamError, YamResult};

pub mod parser;
pub mod score_dist;

/// Longest supported motif, in positions.
pub const MAX_MOTIF_SIZE: usize = 50;
/// Longest accepted motif name, in bytes.
pub const MAX_MOTIF_NAME_LEN: usize = 256;
/// Score pinned to the non-standard letter index of every PWM row. One
/// such letter inside a window drags the window score far below any
/// threshold while staying clear of `i32` overflow over 50 positions.
pub const AMBIGUITY_SCORE: i32 = -10_000_000;
/// Hard cap on the score-distribution support, larger motifs are
/// rejected.
pub const MAX_CDF_SIZE: usize = 2_097_152;
/// Background frequencies are clamped to this floor before
/// normalization.
pub const MIN_BKG: f64 = 0.001;

const PWM_SCALE: f64 = 1000.0;

pub type ScoreRow = [i32; NUM_CODES];

/// Background letter frequencies over A/C/G/T. Resolution order is user
/// override, then motif-file-supplied, then uniform.
#[derive(Debug, Clone, PartialEq)]
pub struct Background([f64; 4]);

impl Default for Background {
    fn default() -> Self {
        Background([0.25; 4])
    }
}

impl Background {
    /// Clamp to the minimum frequency and renormalize.
    pub fn new(raw: [f64; 4]) -> Self {
        let clamped = raw.map(|q| q.max(MIN_BKG));
        let total: f64 = clamped.iter().sum();
        if (total - 1.0).abs() > 0.02 {
            info!(
                "background frequencies sum to {total:.4}, rescaling to 1"
            );
        }
        Background(clamped.map(|q| q / total))
    }

    /// Parse a user-supplied "a,c,g,t" string.
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let freqs = raw
            .split(',')
            .map(|part| {
                part.trim().parse::<f64>().map_err(|e| {
                    anyhow::anyhow!(
                        "invalid background frequency {part:?}, {e}"
                    )
                })
            })
            .collect::<anyhow::Result<Vec<f64>>>()?;
        if freqs.len() != 4 {
            anyhow::bail!(
                "expected 4 comma-separated background frequencies, got {}",
                freqs.len()
            );
        }
        if freqs.iter().any(|&q| q <= 0f64) {
            anyhow::bail!("background frequencies must be positive");
        }
        Ok(Self::new([freqs[0], freqs[1], freqs[2], freqs[3]]))
    }

    #[inline]
    pub fn freq(&self, base: usize) -> f64 {
        self.0[base]
    }
}

/// A motif as read from a file, before conversion to integer scores.
/// Rows are per-position probability vectors over A/C/G/T that already
/// sum to 1.
#[derive(Debug, Clone)]
pub struct RawMotif {
    pub name: String,
    pub file_line: usize,
    pub rows: Vec<[f64; 4]>,
    pub nsites: Option<f64>,
}

/// A scoring-ready motif: per-position integer log-odds for the forward
/// and reverse-complement orientations plus the geometry of its score
/// distribution.
#[derive(Debug, Clone)]
pub struct Motif {
    pub name: String,
    pub file_line: usize,
    pub size: usize,
    pub pwm: Vec<ScoreRow>,
    pub pwm_rc: Vec<ScoreRow>,
    /// Smallest and largest single-position score across A/C/G/T.
    pub(crate) min: i32,
    pub(crate) max: i32,
    /// Sum of the per-position minima and maxima.
    pub min_score: i32,
    pub max_score: i32,
    pub cdf_offset: i32,
    pub(crate) cdf_max: i32,
    pub cdf_size: usize,
    /// Smallest integer score whose upper-tail probability is below the
    /// requested p-value. `None` while unset, and after the scan phase
    /// `None` marks a motif that cannot reach the requested p-value.
    pub threshold: Option<i32>,
}

impl Motif {
    /// Convert a probability matrix into integer log-odds scores:
    /// `⌊1000·log2((p·nsites + pseudo/4) / ((nsites + pseudo)·bkg))⌋`.
    pub fn from_probabilities(
        raw: RawMotif,
        bkg: &Background,
        pseudocount: f64,
        default_nsites: f64,
    ) -> YamResult<Self> {
        let size = raw.rows.len();
        if size == 0 || size > MAX_MOTIF_SIZE {
            return Err(YamError::MotifSyntax {
                line: raw.file_line,
                msg: format!(
                    "motif {} has {size} positions, must be 1..={MAX_MOTIF_SIZE}",
                    raw.name
                ),
            });
        }
        let nsites = match raw.nsites {
            Some(ns) if ns > 0f64 => ns,
            Some(ns) => {
                info!(
                    "motif {}: ignoring non-positive site count {ns}, using \
                     {default_nsites}",
                    raw.name
                );
                default_nsites
            }
            None => default_nsites,
        };
        let pwm = raw
            .rows
            .iter()
            .map(|row| {
                let mut scores = [AMBIGUITY_SCORE; NUM_CODES];
                for b in 0..4 {
                    let odds = (row[b] * nsites + pseudocount / 4.0)
                        / ((nsites + pseudocount) * bkg.freq(b));
                    scores[b] = (odds.log2() * PWM_SCALE) as i32;
                }
                scores
            })
            .collect::<Vec<ScoreRow>>();
        Self::from_pwm(raw.name, raw.file_line, pwm)
    }

    /// Build a motif from an IUPAC consensus string. Letters covered by
    /// the consensus code share the position's probability equally.
    pub fn from_consensus(
        consensus: &str,
        bkg: &Background,
        pseudocount: f64,
        default_nsites: f64,
    ) -> YamResult<Self> {
        let rows = consensus
            .chars()
            .map(|letter| {
                consensus_row(letter).ok_or_else(|| YamError::MotifSyntax {
                    line: 0,
                    msg: format!(
                        "{letter:?} is not an IUPAC DNA/RNA letter"
                    ),
                })
            })
            .collect::<YamResult<Vec<[f64; 4]>>>()?;
        let raw = RawMotif {
            name: consensus.to_string(),
            file_line: 0,
            rows,
            nsites: None,
        };
        let mut motif =
            Self::from_probabilities(raw, bkg, pseudocount, default_nsites)?;
        // consensus motifs only report exact matches
        motif.threshold = Some(motif.max_score);
        Ok(motif)
    }

    fn from_pwm(
        name: String,
        file_line: usize,
        pwm: Vec<ScoreRow>,
    ) -> YamResult<Self> {
        let size = pwm.len();
        let pwm_rc = (0..size)
            .map(|i| {
                let fwd = &pwm[size - 1 - i];
                let mut row = [AMBIGUITY_SCORE; NUM_CODES];
                for b in 0..4 {
                    row[b] = fwd[3 - b];
                }
                row
            })
            .collect::<Vec<ScoreRow>>();
        let min = pwm
            .iter()
            .flat_map(|row| row[..4].iter().copied())
            .min()
            .expect("motif has at least one position");
        let max = pwm
            .iter()
            .flat_map(|row| row[..4].iter().copied())
            .max()
            .expect("motif has at least one position");
        let min_score = pwm
            .iter()
            .map(|row| row[..4].iter().copied().min().unwrap())
            .sum::<i32>();
        let max_score = pwm
            .iter()
            .map(|row| row[..4].iter().copied().max().unwrap())
            .sum::<i32>();
        let cdf_max = max - min;
        let cdf_size = size * cdf_max as usize + 1;
        if cdf_size > MAX_CDF_SIZE {
            return Err(YamError::CdfTooLarge {
                name,
                size: cdf_size,
                max: MAX_CDF_SIZE,
            });
        }
        Ok(Self {
            name,
            file_line,
            size,
            pwm,
            pwm_rc,
            min,
            max,
            min_score,
            max_score,
            cdf_offset: min * size as i32,
            cdf_max,
            cdf_size,
            threshold: None,
        })
    }

    /// Hit score as a percentage of the best achievable score.
    pub fn score_pct(&self, score: i32) -> f64 {
        if self.max_score == 0 {
            0f64
        } else {
            100f64 * score as f64 / self.max_score as f64
        }
    }
}
