use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use log::{debug, info};

use crate::errs::{YamError, YamResult};
use crate::parsing_utils::{
    consume_char, consume_digit, consume_float, consume_string,
};
use crate::seqs::SequenceCatalog;
use crate::util::StrandRule;

/// A scan restriction resolved against the sequence catalog:
/// `start..end` in 0-based half-open coordinates, already trimmed to
/// the sequence bounds.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BedRegion {
    pub seq_index: usize,
    pub start: usize,
    pub end: usize,
    pub name: Option<String>,
    pub strand: StrandRule,
    pub file_line: usize,
}

fn is_skippable(line: &str) -> bool {
    let t = line.trim_start();
    t.is_empty()
        || t.starts_with('#')
        || t.starts_with("browser")
        || t.starts_with("track")
}

fn parse_bed_line(
    line: &str,
    line_num: usize,
) -> YamResult<(String, u64, u64, Option<String>, StrandRule)> {
    let syntax = |msg: String| YamError::BedSyntax { line: line_num, msg };
    let (rest, chrom) = consume_string(line)
        .map_err(|_| syntax("missing chrom field".to_string()))?;
    let (rest, start) = consume_digit(rest)
        .map_err(|_| syntax("missing or invalid start field".to_string()))?;
    let (rest, end) = consume_digit(rest)
        .map_err(|_| syntax("missing or invalid end field".to_string()))?;
    let (rest, name) = match consume_string(rest) {
        Ok((rest, name)) => {
            let name = if name == "." { None } else { Some(name) };
            (rest, name)
        }
        Err(_) => ("", None),
    };
    // field 5 is an ignored score column, numeric or '.'
    let rest = match consume_float(rest) {
        Ok((rest, _score)) => rest,
        Err(_) => match consume_string(rest) {
            Ok((rest, _dot)) => rest,
            Err(_) => "",
        },
    };
    let strand = match consume_char(rest) {
        Ok((_, c)) => StrandRule::try_from(c).map_err(|_| {
            syntax(format!("invalid strand field {c:?}"))
        })?,
        Err(_) => StrandRule::Both,
    };
    Ok((chrom, start, end, name, strand))
}

/// Read a BED file and resolve each region against the catalog.
/// Unknown sequence names and empty ranges are fatal; ranges past the
/// end of their sequence are trimmed with a verbose-mode warning. The
/// result is sorted by (sequence index, start) so scan output within a
/// motif stays ordered.
pub fn read_bed_regions(
    path: &Path,
    catalog: &SequenceCatalog,
) -> anyhow::Result<Vec<BedRegion>> {
    let fh = File::open(path)
        .with_context(|| format!("failed to open BED file {path:?}"))?;
    let mut regions = Vec::new();
    for (idx, line) in BufReader::new(fh).lines().enumerate() {
        let line_num = idx + 1;
        let line = line
            .with_context(|| format!("failed to read BED line {line_num}"))?;
        if is_skippable(&line) {
            continue;
        }
        let (chrom, start, end, name, strand) =
            parse_bed_line(&line, line_num)?;
        if start >= end {
            return Err(YamError::BedSyntax {
                line: line_num,
                msg: format!("start {start} must be less than end {end}"),
            }
            .into());
        }
        let seq_index = catalog.lookup(&chrom).ok_or_else(|| {
            YamError::BedUnknownSequence { line: line_num, name: chrom.clone() }
        })?;
        let seq_len = catalog.lengths[seq_index] as u64;
        let end = if end > seq_len {
            info!(
                "BED line {line_num}: {chrom}:{start}-{end} extends past the \
                 end of {chrom} ({seq_len} bases), trimming"
            );
            seq_len
        } else {
            end
        };
        if start >= end {
            return Err(YamError::BedSyntax {
                line: line_num,
                msg: format!(
                    "range {chrom}:{start}-{end} is empty after trimming to \
                     the sequence end"
                ),
            }
            .into());
        }
        regions.push(BedRegion {
            seq_index,
            start: start as usize,
            end: end as usize,
            name,
            strand,
            file_line: line_num,
        });
    }
    if regions.is_empty() {
        anyhow::bail!("no usable regions in BED file {path:?}");
    }
    regions.sort_by_key(|r| (r.seq_index, r.start, r.end));
    debug!("loaded {} BED region(s)", regions.len());
    Ok(regions)
}

#[cfg(test)]
mod bed_tests {
    use std::io::Write;

    use super::*;
    use crate::seqs::{peek_catalog, SeqInput};

    fn catalog() -> SequenceCatalog {
        let mut fh = tempfile::NamedTempFile::new().unwrap();
        fh.write_all(b">chr1\n").unwrap();
        fh.write_all("A".repeat(100).as_bytes()).unwrap();
        fh.write_all(b"\n>chr2\n").unwrap();
        fh.write_all("C".repeat(50).as_bytes()).unwrap();
        fh.write_all(b"\n").unwrap();
        fh.flush().unwrap();
        let input = SeqInput::parse(fh.path().to_str().unwrap());
        let mut catalog = peek_catalog(&input, false).unwrap();
        catalog.finish(false).unwrap();
        catalog
    }

    fn write_bed(contents: &str) -> tempfile::NamedTempFile {
        let mut fh = tempfile::NamedTempFile::new().unwrap();
        fh.write_all(contents.as_bytes()).unwrap();
        fh.flush().unwrap();
        fh
    }

    #[test]
    fn test_parse_bed_variants() {
        let catalog = catalog();
        let bed = write_bed(
            "# comment\n\
             browser position chr1\n\
             track name=test\n\
             chr1\t10\t20\tr1\t0\t+\n\
             chr2\t0\t50\n\
             chr1\t5\t9\tr2\t.\t.\n",
        );
        let regions = read_bed_regions(bed.path(), &catalog).unwrap();
        assert_eq!(regions.len(), 3);
        // sorted by (sequence, start)
        assert_eq!(regions[0].start, 5);
        assert_eq!(regions[0].name.as_deref(), Some("r2"));
        assert_eq!(regions[0].strand, StrandRule::Both);
        assert_eq!(regions[1].start, 10);
        assert_eq!(regions[1].strand, StrandRule::Positive);
        assert_eq!(regions[2].seq_index, 1);
        assert_eq!(regions[2].name, None);
    }

    #[test]
    fn test_end_past_sequence_is_trimmed() {
        let catalog = catalog();
        let bed = write_bed("chr2\t40\t80\n");
        let regions = read_bed_regions(bed.path(), &catalog).unwrap();
        assert_eq!(regions[0].start, 40);
        assert_eq!(regions[0].end, 50);
    }

    #[test]
    fn test_start_not_below_end_is_fatal() {
        let catalog = catalog();
        let bed = write_bed("chr1\t20\t20\n");
        assert!(read_bed_regions(bed.path(), &catalog).is_err());
        let bed = write_bed("chr1\t30\t20\n");
        assert!(read_bed_regions(bed.path(), &catalog).is_err());
    }

    #[test]
    fn test_unknown_sequence_is_fatal() {
        let catalog = catalog();
        let bed = write_bed("chr9\t0\t10\n");
        let err = read_bed_regions(bed.path(), &catalog).unwrap_err();
        assert!(err.to_string().contains("chr9"));
    }

    #[test]
    fn test_bad_strand_is_fatal() {
        let catalog = catalog();
        let bed = write_bed("chr1\t0\t10\tr1\t0\tx\n");
        assert!(read_bed_regions(bed.path(), &catalog).is_err());
    }

    #[test]
    fn test_start_beyond_sequence_is_fatal() {
        let catalog = catalog();
        let bed = write_bed("chr2\t60\t70\n");
        assert!(read_bed_regions(bed.path(), &catalog).is_err());
    }
}
