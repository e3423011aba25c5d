use thiserror::Error;

pub type YamResult<T> = Result<T, YamError>;

#[derive(Error, Debug)]
pub enum YamError {
    #[error("invalid strand {0}, must be one of '+', '-', '.'")]
    InvalidStrand(char),
    #[error("motif file line {line}: {msg}")]
    MotifSyntax { line: usize, msg: String },
    #[error(
        "motif file uses a protein alphabet, only DNA/RNA motifs can be \
         scanned"
    )]
    ProteinAlphabet,
    #[error(
        "could not detect motif file format (MEME, HOMER, JASPAR, or \
         HOCOMOCO PCM) from the leading lines"
    )]
    UnknownMotifFormat,
    #[error("{kind} name {name:?} is longer than {cap} characters")]
    NameTooLong { kind: &'static str, name: String, cap: usize },
    #[error("found duplicate {kind} names: {preview} ({total} duplicates)")]
    DuplicateNames { kind: &'static str, preview: String, total: usize },
    #[error("sequence {0:?} is empty")]
    EmptySequence(String),
    #[error(
        "unrecognized sequence file format, expected FASTA ('>') or FASTQ \
         ('@') after decompression"
    )]
    UnknownSequenceFormat,
    #[error("BED line {line}: {msg}")]
    BedSyntax { line: usize, msg: String },
    #[error(
        "BED line {line}: sequence {name:?} is not present in the sequence \
         file"
    )]
    BedUnknownSequence { line: usize, name: String },
    #[error(
        "motif {name}: score range requires a distribution of {size} \
         entries, the maximum is {max}"
    )]
    CdfTooLarge { name: String, size: usize, max: usize },
    #[error(
        "sequence file changed between passes at record {index}: expected \
         {expected:?}, found {found:?}"
    )]
    StreamingDrift { index: usize, expected: String, found: String },
}
