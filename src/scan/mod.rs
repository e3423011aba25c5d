use log::{debug, info};

use crate::bed::BedRegion;
use crate::motif::score_dist::ScoreDistribution;
use crate::motif::{Background, Motif, ScoreRow};
use crate::seqs::SequenceCatalog;
use crate::util::{Strand, StrandRule, TAB};

pub mod subcommand;

/// One unit of scanning work: a sequence interval, annotated with its
/// BED provenance when range restriction is active.
#[derive(Debug, Clone)]
pub(crate) struct ScanRange {
    pub seq_index: usize,
    pub start: usize,
    pub end: usize,
    pub bed: Option<BedAnnotation>,
}

#[derive(Debug, Clone)]
pub(crate) struct BedAnnotation {
    pub name: Option<String>,
    pub strand: StrandRule,
}

impl ScanRange {
    fn len(&self) -> usize {
        self.end - self.start
    }
}

/// Whole sequences, or the resolved BED regions when `-x` is given.
pub(crate) fn build_scan_ranges(
    catalog: &SequenceCatalog,
    bed_regions: Option<Vec<BedRegion>>,
) -> Vec<ScanRange> {
    match bed_regions {
        Some(regions) => regions
            .into_iter()
            .map(|r| ScanRange {
                seq_index: r.seq_index,
                start: r.start,
                end: r.end,
                bed: Some(BedAnnotation { name: r.name, strand: r.strand }),
            })
            .collect(),
        None => catalog
            .lengths
            .iter()
            .enumerate()
            .map(|(i, &len)| ScanRange {
                seq_index: i,
                start: 0,
                end: len,
                bed: None,
            })
            .collect(),
    }
}

/// Which orientations of this range get scanned, intersecting the BED
/// strand column with the forward-only flag.
pub(crate) fn orientations(
    range: &ScanRange,
    forward_only: bool,
) -> (bool, bool) {
    let rule =
        range.bed.as_ref().map(|b| b.strand).unwrap_or(StrandRule::Both);
    let fwd = rule.covers(Strand::Positive);
    let rev = rule.covers(Strand::Negative) && !forward_only;
    (fwd, rev)
}

/// Number of scored windows across all motifs and ranges, the `m` of
/// the Benjamini-Hochberg correction applied downstream.
pub(crate) fn max_possible_hits(
    motifs: &[Motif],
    ranges: &[ScanRange],
    forward_only: bool,
) -> u64 {
    motifs
        .iter()
        .map(|motif| {
            ranges
                .iter()
                .map(|range| {
                    let windows = range
                        .len()
                        .saturating_sub(motif.size - 1)
                        as u64;
                    let (fwd, rev) = orientations(range, forward_only);
                    windows * (fwd as u64 + rev as u64)
                })
                .sum::<u64>()
        })
        .sum()
}

/// First motif index owned by each worker, one extra entry closing the
/// last chunk. Motif `i` belongs to worker `i * n_workers / n_motifs`,
/// which yields contiguous chunks.
pub(crate) fn partition_bounds(
    n_motifs: usize,
    n_workers: usize,
) -> Vec<usize> {
    let mut bounds = Vec::with_capacity(n_workers + 1);
    for w in 0..n_workers {
        bounds.push((w * n_motifs + n_workers - 1) / n_workers);
    }
    bounds.push(n_motifs);
    bounds
}

/// Compute the score distribution and derive the motif's threshold.
/// Consensus motifs keep their exact-match threshold and skip the
/// distribution entirely.
pub(crate) fn prepare_motif(
    motif: &mut Motif,
    scratch: &mut ScoreDistribution,
    bkg: &Background,
    pvalue: f64,
    all_hits: bool,
    consensus_mode: bool,
) {
    if consensus_mode {
        return;
    }
    scratch.compute(motif, bkg);
    motif.threshold = if all_hits {
        Some(0)
    } else {
        scratch.threshold(motif, pvalue)
    };
    if motif.threshold.is_none() {
        info!(
            "motif {} cannot reach p-value {pvalue:e}, it will produce no \
             hits",
            motif.name
        );
    }
}

#[inline]
pub(crate) fn score_window(pwm: &[ScoreRow], window: &[u8]) -> i32 {
    pwm.iter().zip(window).map(|(row, &c)| row[c as usize]).sum()
}

pub(crate) fn format_pvalue(p: f64) -> String {
    if p >= 0.001 {
        let mut s = format!("{p:.6}");
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.push('0');
        }
        s
    } else {
        format!("{p:.2e}")
    }
}

fn format_hit(
    seq_name: &str,
    range: &ScanRange,
    offset: usize,
    motif: &Motif,
    strand: Strand,
    score: i32,
    pvalue: f64,
    raw: &[u8],
) -> String {
    let tab = TAB;
    let window = &raw[offset..offset + motif.size];
    let matched = match strand {
        Strand::Positive => String::from_utf8_lossy(window).into_owned(),
        Strand::Negative => {
            String::from_utf8_lossy(&bio::alphabets::dna::revcomp(window))
                .into_owned()
        }
    };
    let mut row = String::new();
    if let Some(bed) = &range.bed {
        row.push_str(&format!(
            "{}:{}-{}({}){tab}{}{tab}",
            seq_name,
            range.start,
            range.end,
            bed.strand,
            bed.name.as_deref().unwrap_or("."),
        ));
    }
    row.push_str(&format!(
        "{seq_name}{tab}{}{tab}{}{tab}{}{tab}{}{tab}{}{tab}{:.3}{tab}{:.1}\
         {tab}{matched}",
        offset + 1,
        offset + motif.size,
        strand.to_char(),
        motif.name,
        format_pvalue(pvalue),
        score as f64 / 1000.0,
        motif.score_pct(score),
    ));
    row
}

/// Slide `motif` across one range, appending a formatted row for every
/// window whose score clears the threshold. Windows touching
/// non-standard letters score far below any threshold through the
/// ambiguity row and fall out silently. Ranges shorter than the motif
/// produce nothing.
pub(crate) fn scan_range(
    motif: &Motif,
    dist: Option<&ScoreDistribution>,
    seq_name: &str,
    raw: &[u8],
    codes: &[u8],
    range: &ScanRange,
    forward_only: bool,
    rows: &mut Vec<String>,
) {
    let threshold = match motif.threshold {
        Some(t) => t,
        None => return,
    };
    if range.bed.is_some() {
        debug!(
            "scanning {seq_name}:{}-{} for motif {}",
            range.start, range.end, motif.name
        );
    }
    let l = motif.size;
    let end = range.end.min(codes.len());
    if end < range.start + l {
        return;
    }
    let (do_fwd, do_rev) = orientations(range, forward_only);
    if !do_fwd && !do_rev {
        return;
    }
    let floor = threshold - 1;
    let pvalue_of = |score: i32| {
        dist.map(|d| d.survival(motif, score)).unwrap_or(1f64)
    };
    for offset in range.start..=(end - l) {
        let window = &codes[offset..offset + l];
        if do_fwd && do_rev {
            let mut fwd = 0i32;
            let mut rev = 0i32;
            for (i, &c) in window.iter().enumerate() {
                fwd += motif.pwm[i][c as usize];
                rev += motif.pwm_rc[i][c as usize];
            }
            if fwd > floor {
                rows.push(format_hit(
                    seq_name,
                    range,
                    offset,
                    motif,
                    Strand::Positive,
                    fwd,
                    pvalue_of(fwd),
                    raw,
                ));
            }
            if rev > floor {
                rows.push(format_hit(
                    seq_name,
                    range,
                    offset,
                    motif,
                    Strand::Negative,
                    rev,
                    pvalue_of(rev),
                    raw,
                ));
            }
        } else {
            let (pwm, strand) = if do_fwd {
                (&motif.pwm, Strand::Positive)
            } else {
                (&motif.pwm_rc, Strand::Negative)
            };
            let score = score_window(pwm, window);
            if score > floor {
                rows.push(format_hit(
                    seq_name,
                    range,
                    offset,
                    motif,
                    strand,
                    score,
                    pvalue_of(score),
                    raw,
                ));
            }
        }
    }
}
