use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;

use anyhow::Context;
use indexmap::IndexMap;
use log::debug;

use crate::errs::{YamError, YamResult};
use crate::util::ensure_unique_names;

/// Longest accepted sequence name, in bytes.
pub const MAX_SEQ_NAME_LEN: usize = 512;

/// A sequence source, `-` means standard input.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SeqInput {
    Stdin,
    Path(PathBuf),
}

impl SeqInput {
    pub fn parse(raw: &str) -> Self {
        if raw == "-" {
            Self::Stdin
        } else {
            Self::Path(PathBuf::from(raw))
        }
    }

    pub fn is_stdin(&self) -> bool {
        matches!(self, Self::Stdin)
    }
}

impl Display for SeqInput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdin => write!(f, "<stdin>"),
            Self::Path(p) => write!(f, "{}", p.to_string_lossy()),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SeqRecord {
    pub name: String,
    pub seq: Vec<u8>,
}

enum SeqFormat {
    Fasta,
    Fastq,
}

/// Open a FASTA or FASTQ stream, transparently decompressing gzip. The
/// format is sniffed from the first decompressed byte.
pub fn open_sequence_reader(
    input: &SeqInput,
    full_names: bool,
) -> anyhow::Result<Box<dyn Iterator<Item = anyhow::Result<SeqRecord>>>> {
    let raw: Box<dyn Read> = match input {
        SeqInput::Stdin => Box::new(std::io::stdin()),
        SeqInput::Path(p) => Box::new(
            File::open(p)
                .with_context(|| format!("failed to open sequence file {p:?}"))?,
        ),
    };
    let (decompressed, compression) = niffler::get_reader(raw)
        .with_context(|| format!("failed to read {input}"))?;
    debug!("reading sequences from {input} (compression: {compression:?})");
    let mut buffered = BufReader::new(decompressed);
    let format = match buffered.fill_buf()?.first() {
        Some(b'>') => SeqFormat::Fasta,
        Some(b'@') => SeqFormat::Fastq,
        _ => return Err(YamError::UnknownSequenceFormat.into()),
    };
    let records: Box<dyn Iterator<Item = anyhow::Result<SeqRecord>>> =
        match format {
            SeqFormat::Fasta => Box::new(
                bio::io::fasta::Reader::from_bufread(buffered)
                    .records()
                    .enumerate()
                    .map(move |(i, rec)| {
                        let rec = rec.with_context(|| {
                            format!("failed to read FASTA record {}", i + 1)
                        })?;
                        to_seq_record(
                            rec.id(),
                            rec.desc(),
                            rec.seq(),
                            full_names,
                            i,
                        )
                    }),
            ),
            SeqFormat::Fastq => Box::new(
                bio::io::fastq::Reader::from_bufread(buffered)
                    .records()
                    .enumerate()
                    .map(move |(i, rec)| {
                        let rec = rec.with_context(|| {
                            format!("failed to read FASTQ record {}", i + 1)
                        })?;
                        to_seq_record(
                            rec.id(),
                            rec.desc(),
                            rec.seq(),
                            full_names,
                            i,
                        )
                    }),
            ),
        };
    Ok(records)
}

fn to_seq_record(
    id: &str,
    desc: Option<&str>,
    seq: &[u8],
    full_names: bool,
    index: usize,
) -> anyhow::Result<SeqRecord> {
    let name = match (full_names, desc) {
        (true, Some(d)) => format!("{id} {d}"),
        _ => id.to_string(),
    };
    if name.is_empty() {
        anyhow::bail!("sequence record {} has no name", index + 1);
    }
    if name.len() > MAX_SEQ_NAME_LEN {
        return Err(YamError::NameTooLong {
            kind: "sequence",
            name,
            cap: MAX_SEQ_NAME_LEN,
        }
        .into());
    }
    if seq.is_empty() {
        return Err(YamError::EmptySequence(name).into());
    }
    Ok(SeqRecord { name, seq: seq.to_vec() })
}

/// Names and lengths of every record in a sequence file, in file order.
/// This is the authority the scanner works from: BED lookups resolve
/// against it and the streaming path checks every re-read against it.
#[derive(Debug, Default)]
pub struct SequenceCatalog {
    /// Display names, possibly rewritten by deduplication.
    pub names: Vec<String>,
    /// Names exactly as read, used to detect drift between passes.
    source_names: Vec<String>,
    pub lengths: Vec<usize>,
    index: IndexMap<String, usize>,
}

impl SequenceCatalog {
    fn push(&mut self, name: String, length: usize) {
        self.source_names.push(name.clone());
        self.names.push(name);
        self.lengths.push(length);
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn total_length(&self) -> usize {
        self.lengths.iter().sum()
    }

    /// Resolve duplicate names, then build the name → index table.
    /// Returns whether any name was rewritten.
    pub fn finish(&mut self, dedup: bool) -> YamResult<bool> {
        let renamed = ensure_unique_names(
            &mut self.names,
            "sequence",
            dedup,
            MAX_SEQ_NAME_LEN,
        )?;
        self.index = self
            .names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Ok(renamed)
    }

    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Streaming re-reads must replay the exact record sequence the
    /// peek pass saw.
    pub fn verify_record(
        &self,
        index: usize,
        record: &SeqRecord,
    ) -> YamResult<()> {
        let expected = self.source_names.get(index);
        if expected.map(|n| n.as_str()) != Some(record.name.as_str())
            || self.lengths.get(index) != Some(&record.seq.len())
        {
            return Err(YamError::StreamingDrift {
                index,
                expected: expected.cloned().unwrap_or_default(),
                found: record.name.clone(),
            });
        }
        Ok(())
    }
}

/// Read every record into memory, returning the catalog alongside the
/// records themselves.
pub fn read_all(
    input: &SeqInput,
    full_names: bool,
) -> anyhow::Result<(SequenceCatalog, Vec<SeqRecord>)> {
    let mut catalog = SequenceCatalog::default();
    let mut records = Vec::new();
    for rec in open_sequence_reader(input, full_names)? {
        let rec = rec?;
        catalog.push(rec.name.clone(), rec.seq.len());
        records.push(rec);
    }
    if records.is_empty() {
        anyhow::bail!("no sequences found in {input}");
    }
    Ok((catalog, records))
}

/// Enumerate names and lengths without retaining the bases, for the
/// low-memory path.
pub fn peek_catalog(
    input: &SeqInput,
    full_names: bool,
) -> anyhow::Result<SequenceCatalog> {
    let mut catalog = SequenceCatalog::default();
    for rec in open_sequence_reader(input, full_names)? {
        let rec = rec?;
        catalog.push(rec.name, rec.seq.len());
    }
    if catalog.is_empty() {
        anyhow::bail!("no sequences found in {input}");
    }
    Ok(catalog)
}
