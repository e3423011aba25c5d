use std::path::PathBuf;

use clap::Args;
use log::{debug, info};
use log_once::info_once;
use rand::prelude::*;
use rand::rngs::StdRng;

use crate::alphabet::{decode_base, encode_seq};
use crate::logging::{init_logging, level_filter};
use crate::seqs::{open_sequence_reader, SeqInput};
use crate::shuffle::{
    block_shuffle, euler_shuffle, fisher_yates, markov_shuffle, MAX_SHUFFLE_K,
};
use crate::writers::{create_writer, FastaWriter, OutWriter, FASTA_WRAP};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShuffleMethod {
    FisherYates,
    Linear,
    Markov,
    Euler,
}

#[derive(Args)]
#[command(arg_required_else_help = true)]
pub struct ShuffleSeqs {
    /// Sequences in FASTA or FASTQ format, gzip accepted; '-' reads
    /// standard input. FASTQ input is written back out as FASTA.
    #[clap(help_heading = "Input Options")]
    #[arg(short = 'i', long = "input")]
    input: String,
    /// Size of the k-mers to preserve while shuffling.
    #[clap(help_heading = "Shuffle Options")]
    #[arg(
        short = 'k',
        long = "kmer",
        default_value_t = 3,
        value_parser = clap::value_parser!(u8).range(1..=MAX_SHUFFLE_K as i64)
    )]
    kmer: u8,
    /// Output file, stdout when omitted. Output is FASTA wrapped to 60
    /// columns.
    #[clap(help_heading = "Output Options")]
    #[arg(short = 'o', long = "out")]
    out: Option<PathBuf>,
    /// Seed for the random number generator, drawn from entropy when
    /// omitted.
    #[clap(help_heading = "Shuffle Options")]
    #[arg(short = 's', long = "seed")]
    seed: Option<u64>,
    /// Generate sequences from a Markov model of the k-mer transition
    /// counts instead of preserving exact counts.
    #[clap(help_heading = "Shuffle Options")]
    #[arg(short = 'm', long = "markov", conflicts_with = "linear")]
    markov: bool,
    /// Shuffle non-overlapping k-blocks instead of walking the k-mer
    /// graph.
    #[clap(help_heading = "Shuffle Options")]
    #[arg(short = 'l', long = "linear")]
    linear: bool,
    /// Emit this many shuffles per input sequence, each headed
    /// '>name repeat-N'.
    #[clap(help_heading = "Output Options")]
    #[arg(
        short = 'r',
        long = "repeats",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    repeats: Option<u32>,
    /// Restart the random number generator from the seed for every
    /// input sequence, making each record's shuffle independent of file
    /// order.
    #[clap(help_heading = "Shuffle Options")]
    #[arg(short = 'R', long = "reseed")]
    reseed: bool,
    /// Write each sequence on a single line instead of wrapping.
    #[clap(help_heading = "Output Options")]
    #[arg(short = 'n', long = "no-wrap")]
    no_wrap: bool,
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

impl ShuffleSeqs {
    fn method(&self) -> ShuffleMethod {
        if self.linear {
            ShuffleMethod::Linear
        } else if self.markov {
            ShuffleMethod::Markov
        } else if self.kmer == 1 {
            ShuffleMethod::FisherYates
        } else {
            ShuffleMethod::Euler
        }
    }

    pub fn run(&self) -> anyhow::Result<()> {
        let _handle = init_logging(
            level_filter(self.verbose, self.very_verbose),
            self.log_filepath.as_ref(),
        )?;
        let k = self.kmer as usize;
        let method = self.method();
        let base_seed = match self.seed {
            Some(seed) => seed,
            None => StdRng::from_entropy().gen(),
        };
        info!("shuffling with {method:?}, k={k}, seed {base_seed}");
        let mut rng = StdRng::seed_from_u64(base_seed);
        let input = SeqInput::parse(&self.input);
        let wrap = if self.no_wrap { None } else { Some(FASTA_WRAP) };
        let mut writer = FastaWriter::new(create_writer(self.out.as_ref())?, wrap);
        let mut n_records = 0usize;
        for rec in open_sequence_reader(&input, false)? {
            let rec = rec?;
            if self.reseed {
                rng = StdRng::seed_from_u64(base_seed);
            }
            for rep in 1..=self.repeats.unwrap_or(1) {
                let shuffled = match method {
                    ShuffleMethod::FisherYates => {
                        let mut bytes = rec.seq.clone();
                        fisher_yates(&mut bytes, &mut rng);
                        bytes
                    }
                    ShuffleMethod::Linear => {
                        let mut bytes = rec.seq.clone();
                        block_shuffle(&mut bytes, k, &mut rng);
                        bytes
                    }
                    ShuffleMethod::Markov => {
                        if rec.seq.len() < 100 {
                            info_once!(
                                "Markov shuffling of sequences shorter than \
                                 100 bases is prone to homopolymer runs"
                            );
                        }
                        let codes = encode_seq(&rec.seq, false);
                        markov_shuffle(&codes, k, &mut rng)
                            .iter()
                            .map(|&c| decode_base(c))
                            .collect()
                    }
                    ShuffleMethod::Euler => {
                        let codes = encode_seq(&rec.seq, false);
                        euler_shuffle(&codes, k, &mut rng)
                            .iter()
                            .map(|&c| decode_base(c))
                            .collect()
                    }
                };
                let header = match self.repeats {
                    Some(_) => format!("{} repeat-{rep}", rec.name),
                    None => rec.name.clone(),
                };
                writer.write((header.as_str(), shuffled.as_slice()))?;
            }
            n_records += 1;
            if n_records % 10_000 == 0 {
                debug!("shuffled {n_records} sequences");
            }
        }
        writer.finish()?;
        info!("done, shuffled {n_records} sequence(s)");
        Ok(())
    }
}
