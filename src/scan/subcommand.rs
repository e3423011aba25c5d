use std::io::Write;
use std::path::PathBuf;
use std::thread;

use anyhow::{bail, Context};
use clap::Args;
use crossbeam_channel::bounded;
use indicatif::{ProgressBar, ProgressDrawTarget};
use itertools::Itertools;
use log::{debug, info};
use prettytable::row;

use crate::alphabet::encode_seq;
use crate::bed::read_bed_regions;
use crate::errs::YamResult;
use crate::logging::{init_logging, level_filter};
use crate::motif::parser::parse_motif_file;
use crate::motif::score_dist::ScoreDistribution;
use crate::motif::{Background, Motif, MAX_MOTIF_NAME_LEN};
use crate::scan::{
    build_scan_ranges, max_possible_hits, partition_bounds, prepare_motif,
    scan_range, ScanRange,
};
use crate::seqs::{
    open_sequence_reader, peek_catalog, read_all, SeqInput, SeqRecord,
    SequenceCatalog,
};
use crate::util::{
    ensure_unique_names, format_int_with_commas, get_master_progress_bar,
};
use crate::writers::{create_writer, OutWriter, ScanStats, ScanTsvWriter};

/// Rows shipped from a worker to the writing thread per channel send.
const ROW_BATCH: usize = 4096;

type HitWriter = ScanTsvWriter<Box<dyn Write>>;

#[derive(Args)]
#[command(arg_required_else_help = true)]
pub struct ScanMotifs {
    /// Text file of motifs to scan with. MEME, JASPAR, HOCOMOCO PCM,
    /// and HOMER formats are auto-detected.
    #[clap(help_heading = "Input Options")]
    #[arg(
        short = 'm',
        long = "motifs",
        required_unless_present = "consensus",
        conflicts_with = "consensus"
    )]
    motifs: Option<PathBuf>,
    /// Scan a single motif given as an IUPAC consensus string instead
    /// of a motif file. Only exact consensus matches are reported.
    #[clap(help_heading = "Input Options")]
    #[arg(short = '1', long = "consensus")]
    consensus: Option<String>,
    /// Sequences in FASTA or FASTQ format, gzip accepted; '-' reads
    /// standard input.
    #[clap(help_heading = "Input Options")]
    #[arg(short = 's', long = "seqs")]
    seqs: String,
    /// Restrict scanning to the ranges in this BED file. Requires
    /// unique sequence names.
    #[clap(help_heading = "Input Options")]
    #[arg(short = 'x', long = "bed")]
    bed: Option<PathBuf>,
    /// Output file, stdout when omitted.
    #[clap(help_heading = "Output Options")]
    #[arg(short = 'o', long = "out")]
    out: Option<PathBuf>,
    /// Background frequencies as "A,C,G,T", e.g. "0.3,0.2,0.2,0.3".
    /// Overrides any frequencies found in the motif file.
    #[clap(help_heading = "Scoring Options")]
    #[arg(short = 'b', long = "bkg")]
    background: Option<String>,
    /// Report hits with a p-value below this threshold.
    #[clap(help_heading = "Scoring Options")]
    #[arg(short = 't', long = "pvalue", default_value_t = 1e-4)]
    pvalue: f64,
    /// Ignore the p-value threshold and report every window scoring at
    /// least zero.
    #[clap(help_heading = "Scoring Options")]
    #[arg(short = '0', long = "all-hits")]
    all_hits: bool,
    /// Pseudocount added to the motif counts before log-odds
    /// conversion.
    #[clap(help_heading = "Scoring Options")]
    #[arg(short = 'p', long = "pseudocount", default_value_t = 1)]
    pseudocount: u32,
    /// Nominal motif site count used when the motif file does not
    /// declare one.
    #[clap(help_heading = "Scoring Options")]
    #[arg(short = 'n', long = "nsites", default_value_t = 1000)]
    nsites: u32,
    /// Only scan the forward strand.
    #[clap(help_heading = "Scanning Options")]
    #[arg(short = 'f', long = "forward-only")]
    forward_only: bool,
    /// Respect softmasking: lowercase bases score as non-standard.
    #[clap(help_heading = "Scanning Options")]
    #[arg(short = 'M', long = "mask")]
    mask: bool,
    /// Rename duplicated motif or sequence names instead of aborting.
    #[clap(help_heading = "Input Options")]
    #[arg(short = 'd', long = "dedup")]
    dedup: bool,
    /// Keep whole header lines as names instead of trimming at the
    /// first whitespace.
    #[clap(help_heading = "Input Options")]
    #[arg(short = 'r', long = "full-names")]
    full_names: bool,
    /// Low-memory scan: hold one sequence at a time and re-read the
    /// sequence file once per motif. Single-threaded.
    #[clap(help_heading = "Compute Options")]
    #[arg(short = 'l', long = "low-mem")]
    low_mem: bool,
    /// Number of worker threads. Motifs are partitioned across
    /// workers, which requires the sequences to be held in memory.
    #[clap(help_heading = "Compute Options")]
    #[arg(short = 'j', long = "threads", default_value_t = 1)]
    threads: usize,
    /// Show a progress bar while scanning.
    #[clap(help_heading = "Logging Options")]
    #[arg(short = 'g', long = "progress")]
    progress: bool,
    /// Report progress information.
    #[clap(help_heading = "Logging Options")]
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
    /// Report everything, including invariant warnings.
    #[clap(help_heading = "Logging Options")]
    #[arg(short = 'w', long = "very-verbose")]
    very_verbose: bool,
    /// Output log to this file.
    #[clap(help_heading = "Logging Options")]
    #[arg(long, alias = "log")]
    log_filepath: Option<PathBuf>,
}

impl ScanMotifs {
    fn validate(&self) -> anyhow::Result<()> {
        if !(self.pvalue > 0f64 && self.pvalue <= 1f64) {
            bail!("p-value threshold must be in (0, 1], got {}", self.pvalue);
        }
        if self.threads == 0 {
            bail!("need at least one worker thread");
        }
        if self.pseudocount == 0 {
            bail!(
                "pseudocount must be at least 1, zero-probability matrix \
                 cells have no log-odds score otherwise"
            );
        }
        if self.nsites == 0 {
            bail!("nominal site count must be at least 1");
        }
        if self.low_mem && self.threads > 1 {
            bail!(
                "low-memory scanning re-reads the input once per motif and \
                 is single-threaded, drop -l or -j"
            );
        }
        Ok(())
    }

    fn load_motifs(
        &self,
        user_bkg: Option<Background>,
    ) -> anyhow::Result<(Vec<Motif>, Background, bool)> {
        let pseudocount = self.pseudocount as f64;
        let nsites = self.nsites as f64;
        let (mut motifs, background) = if let Some(consensus) = &self.consensus
        {
            let background = user_bkg.unwrap_or_default();
            let motif = Motif::from_consensus(
                consensus,
                &background,
                pseudocount,
                nsites,
            )?;
            info!("scanning single consensus motif {}", motif.name);
            (vec![motif], background)
        } else {
            let path = self
                .motifs
                .as_ref()
                .expect("clap requires motifs or consensus");
            let parsed = parse_motif_file(path, self.full_names)?;
            if let Some(hint) = &parsed.strands {
                let file_forward_only = !hint.contains('-');
                if file_forward_only && !self.forward_only {
                    info!(
                        "motif file suggests scanning only the forward \
                         strand (strands: {hint}), both will be scanned"
                    );
                } else if !file_forward_only && self.forward_only {
                    info!(
                        "motif file suggests scanning both strands (strands: \
                         {hint}), only the forward strand will be scanned"
                    );
                }
            }
            let background = match (user_bkg, parsed.background) {
                (Some(bkg), file_bkg) => {
                    if file_bkg.is_some() {
                        debug!(
                            "user background overrides the motif file \
                             background"
                        );
                    }
                    bkg
                }
                (None, Some(raw)) => {
                    debug!("using background frequencies from the motif file");
                    Background::new(raw)
                }
                (None, None) => Background::default(),
            };
            let motifs = parsed
                .motifs
                .into_iter()
                .map(|raw| {
                    Motif::from_probabilities(
                        raw,
                        &background,
                        pseudocount,
                        nsites,
                    )
                })
                .collect::<YamResult<Vec<Motif>>>()?;
            (motifs, background)
        };
        let mut names =
            motifs.iter().map(|m| m.name.clone()).collect::<Vec<String>>();
        let dedupped = ensure_unique_names(
            &mut names,
            "motif",
            self.dedup,
            MAX_MOTIF_NAME_LEN,
        )?;
        if dedupped {
            for (motif, name) in motifs.iter_mut().zip(names) {
                motif.name = name;
            }
        }
        Ok((motifs, background, dedupped))
    }

    fn progress_bar(&self, n_motifs: usize) -> ProgressBar {
        let pb = get_master_progress_bar(n_motifs);
        if !self.progress {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        pb.set_message("motifs scanned");
        pb
    }

    pub fn run(&self) -> anyhow::Result<()> {
        let _handle = init_logging(
            level_filter(self.verbose, self.very_verbose),
            self.log_filepath.as_ref(),
        )?;
        self.validate()?;
        let input = SeqInput::parse(&self.seqs);
        let streaming = self.low_mem && !input.is_stdin();
        if self.low_mem && input.is_stdin() {
            info!(
                "standard input cannot be re-read, sequences will be held in \
                 memory"
            );
        }
        let user_bkg = self
            .background
            .as_deref()
            .map(Background::parse)
            .transpose()?;
        let (mut motifs, background, dedupped_motifs) =
            self.load_motifs(user_bkg)?;
        let (mut catalog, records) = if streaming {
            (peek_catalog(&input, self.full_names)?, Vec::new())
        } else {
            read_all(&input, self.full_names)?
        };
        // the BED name → index relation must stay injective, so range
        // restriction never deduplicates sequence names
        let seq_dedup = self.dedup && self.bed.is_none();
        let dedupped_seqs = catalog.finish(seq_dedup)?;
        let bed_regions = self
            .bed
            .as_ref()
            .map(|p| read_bed_regions(p, &catalog))
            .transpose()?;
        let bed_mode = bed_regions.is_some();
        let ranges = build_scan_ranges(&catalog, bed_regions);

        let stats = ScanStats::new(
            motifs.len(),
            catalog.len(),
            catalog.total_length(),
            dedupped_motifs || dedupped_seqs,
            max_possible_hits(&motifs, &ranges, self.forward_only),
        );
        let args_echo = std::env::args().skip(1).join(" ");
        let mut writer = ScanTsvWriter::new(create_writer(self.out.as_ref())?);
        writer.write_preamble(&args_echo, &stats, bed_mode)?;
        info!(
            "scanning {} motif(s) against {} sequence(s), {} bases",
            motifs.len(),
            catalog.len(),
            format_int_with_commas(catalog.total_length() as isize)
        );

        let consensus_mode = self.consensus.is_some();
        let n_workers = self.threads.min(motifs.len());
        if streaming {
            self.run_streaming(
                &input,
                &mut motifs,
                &background,
                &catalog,
                &ranges,
                consensus_mode,
                &mut writer,
            )?;
        } else if n_workers > 1 {
            self.run_pool(
                n_workers,
                &mut motifs,
                &background,
                &catalog,
                &records,
                &ranges,
                consensus_mode,
                &mut writer,
            )?;
        } else {
            self.run_serial(
                &mut motifs,
                &background,
                &catalog,
                &records,
                &ranges,
                consensus_mode,
                &mut writer,
            )?;
        }
        if log::log_enabled!(log::Level::Debug) {
            log_motif_table(&motifs);
        }
        let n_rows = writer.finish()?;
        info!(
            "done, wrote {} hit(s)",
            format_int_with_commas(n_rows as isize)
        );
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn run_serial(
        &self,
        motifs: &mut [Motif],
        background: &Background,
        catalog: &SequenceCatalog,
        records: &[SeqRecord],
        ranges: &[ScanRange],
        consensus_mode: bool,
        writer: &mut HitWriter,
    ) -> anyhow::Result<()> {
        let encoded = records
            .iter()
            .map(|r| encode_seq(&r.seq, self.mask))
            .collect::<Vec<Vec<u8>>>();
        let pb = self.progress_bar(motifs.len());
        let mut scratch = ScoreDistribution::new();
        let mut rows = Vec::new();
        for motif in motifs.iter_mut() {
            prepare_motif(
                motif,
                &mut scratch,
                background,
                self.pvalue,
                self.all_hits,
                consensus_mode,
            );
            for range in ranges {
                scan_range(
                    motif,
                    (!consensus_mode).then_some(&scratch),
                    &catalog.names[range.seq_index],
                    &records[range.seq_index].seq,
                    &encoded[range.seq_index],
                    range,
                    self.forward_only,
                    &mut rows,
                );
                for r in rows.drain(..) {
                    writer.write(r.as_str())?;
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();
        Ok(())
    }

    /// The low-memory path: motif-major, re-reading the sequence file
    /// once per motif and holding a single record at a time.
    #[allow(clippy::too_many_arguments)]
    fn run_streaming(
        &self,
        input: &SeqInput,
        motifs: &mut [Motif],
        background: &Background,
        catalog: &SequenceCatalog,
        ranges: &[ScanRange],
        consensus_mode: bool,
        writer: &mut HitWriter,
    ) -> anyhow::Result<()> {
        // ranges are sorted by sequence, remember each sequence's span
        let mut spans = vec![0..0usize; catalog.len()];
        let mut i = 0;
        while i < ranges.len() {
            let seq = ranges[i].seq_index;
            let start = i;
            while i < ranges.len() && ranges[i].seq_index == seq {
                i += 1;
            }
            spans[seq] = start..i;
        }
        let pb = self.progress_bar(motifs.len());
        let mut scratch = ScoreDistribution::new();
        let mut rows = Vec::new();
        for motif in motifs.iter_mut() {
            prepare_motif(
                motif,
                &mut scratch,
                background,
                self.pvalue,
                self.all_hits,
                consensus_mode,
            );
            let mut n_seen = 0usize;
            let reader = open_sequence_reader(input, self.full_names)?;
            for (idx, rec) in reader.enumerate() {
                let rec = rec.with_context(|| {
                    format!("failed re-reading {input} for motif {}", motif.name)
                })?;
                catalog.verify_record(idx, &rec)?;
                n_seen += 1;
                let span = spans[idx].clone();
                if span.is_empty() {
                    continue;
                }
                let codes = encode_seq(&rec.seq, self.mask);
                for range in &ranges[span] {
                    scan_range(
                        motif,
                        (!consensus_mode).then_some(&scratch),
                        &catalog.names[idx],
                        &rec.seq,
                        &codes,
                        range,
                        self.forward_only,
                        &mut rows,
                    );
                    for r in rows.drain(..) {
                        writer.write(r.as_str())?;
                    }
                }
            }
            if n_seen != catalog.len() {
                bail!(
                    "sequence file shrank between passes: expected {} \
                     records, found {n_seen}",
                    catalog.len()
                );
            }
            pb.inc(1);
        }
        pb.finish_and_clear();
        Ok(())
    }

    /// In-memory multi-worker path. Motifs are split into contiguous
    /// chunks, each worker owns its chunk and its own distribution
    /// scratch, and formatted rows funnel through a channel to the
    /// single writer.
    #[allow(clippy::too_many_arguments)]
    fn run_pool(
        &self,
        n_workers: usize,
        motifs: &mut [Motif],
        background: &Background,
        catalog: &SequenceCatalog,
        records: &[SeqRecord],
        ranges: &[ScanRange],
        consensus_mode: bool,
        writer: &mut HitWriter,
    ) -> anyhow::Result<()> {
        info!(
            "distributing {} motifs across {n_workers} workers",
            motifs.len()
        );
        let encoded = records
            .iter()
            .map(|r| encode_seq(&r.seq, self.mask))
            .collect::<Vec<Vec<u8>>>();
        let encoded = &encoded;
        let pb = self.progress_bar(motifs.len());
        let bounds = partition_bounds(motifs.len(), n_workers);
        let (snd, rcv) = bounded::<Vec<String>>(n_workers * 2);
        let forward_only = self.forward_only;
        let pvalue = self.pvalue;
        let all_hits = self.all_hits;
        let mut write_error: Option<anyhow::Error> = None;
        thread::scope(|scope| {
            let mut rest = motifs;
            for w in 0..n_workers {
                let (chunk, tail) = rest.split_at_mut(bounds[w + 1] - bounds[w]);
                rest = tail;
                let snd = snd.clone();
                let pb = pb.clone();
                scope.spawn(move || {
                    let mut scratch = ScoreDistribution::new();
                    let mut rows: Vec<String> = Vec::new();
                    for motif in chunk.iter_mut() {
                        prepare_motif(
                            motif,
                            &mut scratch,
                            background,
                            pvalue,
                            all_hits,
                            consensus_mode,
                        );
                        for range in ranges {
                            scan_range(
                                motif,
                                (!consensus_mode).then_some(&scratch),
                                &catalog.names[range.seq_index],
                                &records[range.seq_index].seq,
                                &encoded[range.seq_index],
                                range,
                                forward_only,
                                &mut rows,
                            );
                            if rows.len() >= ROW_BATCH
                                && snd.send(std::mem::take(&mut rows)).is_err()
                            {
                                return;
                            }
                        }
                        if !rows.is_empty()
                            && snd.send(std::mem::take(&mut rows)).is_err()
                        {
                            return;
                        }
                        pb.inc(1);
                    }
                });
            }
            drop(snd);
            for batch in rcv.iter() {
                // keep draining after a write failure so workers are
                // never blocked on a full channel
                if write_error.is_some() {
                    continue;
                }
                for row in &batch {
                    if let Err(e) = writer.write(row.as_str()) {
                        write_error = Some(e);
                        break;
                    }
                }
            }
        });
        pb.finish_and_clear();
        match write_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn log_motif_table(motifs: &[Motif]) {
    let mut tab = prettytable::Table::new();
    tab.set_format(*prettytable::format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    tab.set_titles(row!["motif", "size", "min_score", "max_score", "threshold"]);
    for m in motifs {
        let threshold = m
            .threshold
            .map(|t| t.to_string())
            .unwrap_or_else(|| "unreachable".to_string());
        tab.add_row(row![m.name, m.size, m.min_score, m.max_score, threshold]);
    }
    debug!("motif summary:\n{tab}");
}
