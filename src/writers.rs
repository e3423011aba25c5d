use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use derive_new::new;

use crate::util::create_out_directory;

pub trait OutWriter<T> {
    fn write(&mut self, item: T) -> anyhow::Result<u64>;
}

/// File target or stdout when no path is given.
pub(crate) fn create_writer(
    out: Option<&PathBuf>,
) -> anyhow::Result<Box<dyn Write>> {
    match out {
        Some(p) => {
            create_out_directory(p)?;
            let fh = File::create(p)
                .with_context(|| format!("failed to create {p:?}"))?;
            Ok(Box::new(fh))
        }
        None => Ok(Box::new(std::io::stdout())),
    }
}

/// Figures for the scanner's statistics header line.
#[derive(Debug, Clone, new)]
pub struct ScanStats {
    pub motif_count: usize,
    pub seq_count: usize,
    pub seq_length_total: usize,
    pub dedupped: bool,
    pub max_possible_hits: u64,
}

const HIT_COLUMNS: &str =
    "seq_name\tstart\tend\tstrand\tmotif\tpvalue\tscore\tscore_pct\tmatch";

pub struct ScanTsvWriter<W: Write> {
    buf_writer: BufWriter<W>,
    rows_written: u64,
}

impl<W: Write> ScanTsvWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { buf_writer: BufWriter::new(writer), rows_written: 0 }
    }

    pub fn write_preamble(
        &mut self,
        args: &str,
        stats: &ScanStats,
        bed_mode: bool,
    ) -> anyhow::Result<()> {
        writeln!(
            self.buf_writer,
            "##yamscan v{} [ {args} ]",
            env!("CARGO_PKG_VERSION")
        )?;
        writeln!(
            self.buf_writer,
            "##MotifCount={} SeqCount={} SeqLengthTotal={} Dedupped={} \
             MaxPossibleHits={}",
            stats.motif_count,
            stats.seq_count,
            stats.seq_length_total,
            stats.dedupped,
            stats.max_possible_hits,
        )?;
        let prefix = if bed_mode { "bed_range\tbed_name\t" } else { "" };
        writeln!(self.buf_writer, "#{prefix}{HIT_COLUMNS}")?;
        Ok(())
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn finish(mut self) -> anyhow::Result<u64> {
        self.buf_writer.flush()?;
        Ok(self.rows_written)
    }
}

impl<W: Write> OutWriter<&str> for ScanTsvWriter<W> {
    fn write(&mut self, row: &str) -> anyhow::Result<u64> {
        self.buf_writer.write_all(row.as_bytes())?;
        self.buf_writer.write_all(b"\n")?;
        self.rows_written += 1;
        Ok(1)
    }
}

/// Default column width of shuffled FASTA output.
pub const FASTA_WRAP: usize = 60;

pub struct FastaWriter<W: Write> {
    buf_writer: BufWriter<W>,
    wrap: Option<usize>,
}

impl<W: Write> FastaWriter<W> {
    pub fn new(writer: W, wrap: Option<usize>) -> Self {
        Self { buf_writer: BufWriter::new(writer), wrap }
    }

    pub fn finish(mut self) -> anyhow::Result<()> {
        self.buf_writer.flush()?;
        Ok(())
    }
}

impl<'a, W: Write> OutWriter<(&'a str, &'a [u8])> for FastaWriter<W> {
    fn write(&mut self, (header, seq): (&'a str, &'a [u8])) -> anyhow::Result<u64> {
        writeln!(self.buf_writer, ">{header}")?;
        let mut lines = 1u64;
        match self.wrap {
            Some(width) => {
                for chunk in seq.chunks(width) {
                    self.buf_writer.write_all(chunk)?;
                    self.buf_writer.write_all(b"\n")?;
                    lines += 1;
                }
            }
            None => {
                self.buf_writer.write_all(seq)?;
                self.buf_writer.write_all(b"\n")?;
                lines += 1;
            }
        }
        Ok(lines)
    }
}
