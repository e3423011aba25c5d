use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{anyhow, bail, Context};
use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;

use crate::errs::{YamError, YamResult};
use crate::motif::{RawMotif, MAX_MOTIF_NAME_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotifFormat {
    Meme,
    Homer,
    Jaspar,
    HocomocoPcm,
}

/// Everything read from a motif file: the probability matrices plus any
/// file-level background and strand hints (MEME only).
#[derive(Debug, Default)]
pub struct ParsedMotifs {
    pub motifs: Vec<RawMotif>,
    pub background: Option<[f64; 4]>,
    pub strands: Option<String>,
}

pub fn parse_motif_file(
    path: &Path,
    full_names: bool,
) -> anyhow::Result<ParsedMotifs> {
    let fh = File::open(path)
        .with_context(|| format!("failed to open motif file {path:?}"))?;
    let lines = BufReader::new(fh)
        .lines()
        .collect::<std::io::Result<Vec<String>>>()
        .with_context(|| format!("failed to read motif file {path:?}"))?;
    parse_motif_lines(&lines, full_names)
        .with_context(|| format!("failed to parse motif file {path:?}"))
}

pub fn parse_motif_lines(
    lines: &[String],
    full_names: bool,
) -> anyhow::Result<ParsedMotifs> {
    let format = detect_format(lines)?;
    debug!("detected motif file format {format:?}");
    let parsed = match format {
        MotifFormat::Meme => parse_meme(lines, full_names)?,
        MotifFormat::Homer => parse_homer(lines, full_names)?,
        MotifFormat::Jaspar => parse_jaspar(lines, full_names)?,
        MotifFormat::HocomocoPcm => parse_hocomoco(lines, full_names)?,
    };
    if parsed.motifs.is_empty() {
        bail!("no motifs found");
    }
    debug!("parsed {} motif(s)", parsed.motifs.len());
    Ok(parsed)
}

fn detect_format(lines: &[String]) -> YamResult<MotifFormat> {
    let (first_idx, first) = lines
        .iter()
        .enumerate()
        .find(|(_, l)| !l.trim().is_empty())
        .ok_or(YamError::UnknownMotifFormat)?;
    if first.contains("MEME version ") {
        return Ok(MotifFormat::Meme);
    }
    if !first.trim_start().starts_with('>') {
        return Err(YamError::UnknownMotifFormat);
    }
    for line in lines.iter().skip(first_idx + 1) {
        let t = line.trim_start();
        if t.starts_with('A') && t.contains('[') && t.contains(']') {
            return Ok(MotifFormat::Jaspar);
        }
    }
    if first.contains('\t') {
        return Ok(MotifFormat::Homer);
    }
    // negative values in the matrix body mean a pre-computed PWM, which
    // cannot be converted back into probabilities
    for (idx, line) in lines.iter().enumerate().skip(first_idx) {
        let t = line.trim_start();
        if !t.starts_with('>') && t.contains('-') {
            return Err(YamError::MotifSyntax {
                line: idx + 1,
                msg: "matrix contains negative values, only HOCOMOCO PCM \
                      (count) files are supported"
                    .to_string(),
            });
        }
    }
    Ok(MotifFormat::HocomocoPcm)
}

fn motif_name(
    raw: &str,
    full_names: bool,
    line: usize,
) -> YamResult<String> {
    let name = if full_names {
        raw.trim().to_string()
    } else {
        raw.split_whitespace().next().unwrap_or("").to_string()
    };
    if name.is_empty() {
        return Err(YamError::MotifSyntax {
            line,
            msg: "motif header is missing a name".to_string(),
        });
    }
    if name.len() > MAX_MOTIF_NAME_LEN {
        return Err(YamError::NameTooLong {
            kind: "motif",
            name,
            cap: MAX_MOTIF_NAME_LEN,
        });
    }
    Ok(name)
}

fn parse_numeric_row(
    line: &str,
    line_num: usize,
    name: &str,
) -> YamResult<[f64; 4]> {
    let values = line
        .split_whitespace()
        .map(|tok| {
            tok.parse::<f64>().map_err(|_| YamError::MotifSyntax {
                line: line_num,
                msg: format!("motif {name}: invalid matrix value {tok:?}"),
            })
        })
        .collect::<YamResult<Vec<f64>>>()?;
    if values.len() != 4 {
        return Err(YamError::MotifSyntax {
            line: line_num,
            msg: format!(
                "motif {name}: matrix row has {} letter columns, expected 4",
                values.len()
            ),
        });
    }
    Ok([values[0], values[1], values[2], values[3]])
}

/// Check a probability row sums to 1 and rescale it exactly. More than
/// 0.1 off is fatal, more than 0.02 off gets a verbose-mode warning.
fn check_prob_row(
    row: &mut [f64; 4],
    line_num: usize,
    name: &str,
) -> YamResult<()> {
    let total: f64 = row.iter().sum();
    let err = (total - 1.0).abs();
    if err > 0.1 {
        return Err(YamError::MotifSyntax {
            line: line_num,
            msg: format!(
                "motif {name}: position probabilities sum to {total:.4}"
            ),
        });
    }
    if err > 0.02 {
        info!(
            "motif {name}: rescaling position with probability sum \
             {total:.4} (line {line_num})"
        );
    }
    for p in row.iter_mut() {
        *p /= total;
    }
    Ok(())
}

lazy_static! {
    static ref NSITES_RE: Regex = Regex::new(r"nsites=\s*(\S+)").unwrap();
    static ref WIDTH_RE: Regex = Regex::new(r"\bw=\s*(\d+)").unwrap();
    static ref ALENGTH_RE: Regex = Regex::new(r"alength=\s*(\d+)").unwrap();
}

const PROTEIN_ALPHABET: &str = "ACDEFGHIKLMNPQRSTVWY";

fn parse_meme(
    lines: &[String],
    full_names: bool,
) -> anyhow::Result<ParsedMotifs> {
    let mut parsed = ParsedMotifs::default();
    let mut i = 0usize;
    while i < lines.len() {
        let line = lines[i].trim();
        if line.starts_with("ALPHABET=") {
            if line.contains(PROTEIN_ALPHABET) {
                return Err(YamError::ProteinAlphabet.into());
            }
        } else if let Some(hint) = line.strip_prefix("strands:") {
            parsed.strands = Some(hint.trim().to_string());
        } else if line.starts_with("Background letter frequencies") {
            i += 1;
            let freq_line =
                lines.get(i).map(|l| l.trim().to_string()).unwrap_or_default();
            parsed.background = Some(parse_meme_background(&freq_line, i + 1)?);
        } else if line.starts_with("MOTIF") {
            let header_line = i + 1;
            let name = motif_name(&line[5..], full_names, header_line)?;
            i += 1;
            while i < lines.len()
                && !lines[i].contains("letter-probability matrix")
            {
                if lines[i].trim().starts_with("MOTIF") {
                    break;
                }
                i += 1;
            }
            if i >= lines.len()
                || !lines[i].contains("letter-probability matrix")
            {
                bail!(
                    "motif {name} (line {header_line}) has no \
                     letter-probability matrix"
                );
            }
            let attrs = &lines[i];
            if let Some(alength) = ALENGTH_RE
                .captures(attrs)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<usize>().ok())
            {
                if alength != 4 {
                    return Err(YamError::MotifSyntax {
                        line: i + 1,
                        msg: format!(
                            "motif {name}: alphabet length {alength}, \
                             expected 4"
                        ),
                    }
                    .into());
                }
            }
            let nsites = NSITES_RE
                .captures(attrs)
                .and_then(|c| c.get(1))
                .map(|m| {
                    m.as_str().parse::<f64>().map_err(|_| {
                        anyhow!(
                            "motif {name}: invalid nsites value {:?}",
                            m.as_str()
                        )
                    })
                })
                .transpose()?;
            let width = WIDTH_RE
                .captures(attrs)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<usize>().ok());
            i += 1;
            let mut rows = Vec::new();
            while i < lines.len() {
                let row_line = lines[i].trim();
                if row_line.is_empty()
                    || row_line.starts_with('-')
                    || row_line.starts_with('*')
                    || row_line.starts_with("MOTIF")
                {
                    break;
                }
                let mut row = parse_numeric_row(row_line, i + 1, &name)?;
                check_prob_row(&mut row, i + 1, &name)?;
                rows.push(row);
                i += 1;
            }
            if let Some(w) = width {
                if w != rows.len() {
                    return Err(YamError::MotifSyntax {
                        line: header_line,
                        msg: format!(
                            "motif {name} declares w= {w} but has {} matrix \
                             rows",
                            rows.len()
                        ),
                    }
                    .into());
                }
            }
            parsed.motifs.push(RawMotif {
                name,
                file_line: header_line,
                rows,
                nsites,
            });
            continue;
        }
        i += 1;
    }
    Ok(parsed)
}

fn parse_meme_background(
    line: &str,
    line_num: usize,
) -> anyhow::Result<[f64; 4]> {
    let tokens = line.split_whitespace().collect::<Vec<&str>>();
    if tokens.len() < 8 || tokens.len() % 2 != 0 {
        bail!(
            "line {line_num}: malformed background frequency line {line:?}"
        );
    }
    let mut freqs = [0f64; 4];
    let mut seen = [false; 4];
    for pair in tokens.chunks(2) {
        let base = match pair[0] {
            "A" => 0,
            "C" => 1,
            "G" => 2,
            "T" | "U" => 3,
            _ => continue,
        };
        freqs[base] = pair[1].parse::<f64>().map_err(|_| {
            anyhow!(
                "line {line_num}: invalid background frequency {:?}",
                pair[1]
            )
        })?;
        seen[base] = true;
    }
    if !seen.iter().all(|&s| s) {
        bail!(
            "line {line_num}: background frequency line is missing one of \
             A/C/G/T"
        );
    }
    Ok(freqs)
}

fn parse_homer(
    lines: &[String],
    full_names: bool,
) -> anyhow::Result<ParsedMotifs> {
    let mut motifs: Vec<RawMotif> = Vec::new();
    let mut current: Option<RawMotif> = None;
    for (idx, line) in lines.iter().enumerate() {
        let line_num = idx + 1;
        let t = line.trim();
        if t.is_empty() {
            continue;
        }
        if let Some(header) = t.strip_prefix('>') {
            if let Some(motif) = current.take() {
                motifs.push(require_rows(motif)?);
            }
            let fields = header.split('\t').collect::<Vec<&str>>();
            let raw_name =
                if fields.len() >= 2 { fields[1] } else { fields[0] };
            current = Some(RawMotif {
                name: motif_name(raw_name, full_names, line_num)?,
                file_line: line_num,
                rows: Vec::new(),
                nsites: None,
            });
        } else {
            let motif =
                current.as_mut().ok_or_else(|| YamError::MotifSyntax {
                    line: line_num,
                    msg: "matrix row before any '>' header".to_string(),
                })?;
            let mut row = parse_numeric_row(t, line_num, &motif.name)?;
            check_prob_row(&mut row, line_num, &motif.name)?;
            motif.rows.push(row);
        }
    }
    if let Some(motif) = current.take() {
        motifs.push(require_rows(motif)?);
    }
    Ok(ParsedMotifs { motifs, ..Default::default() })
}

fn require_rows(motif: RawMotif) -> YamResult<RawMotif> {
    if motif.rows.is_empty() {
        Err(YamError::MotifSyntax {
            line: motif.file_line,
            msg: format!("motif {} has no matrix rows", motif.name),
        })
    } else {
        Ok(motif)
    }
}

struct JasparCounts {
    name: String,
    file_line: usize,
    rows: [Option<Vec<f64>>; 4],
}

impl JasparCounts {
    fn finish(self) -> YamResult<RawMotif> {
        let line = self.file_line;
        let name = self.name;
        let [a, c, g, t] = self.rows;
        let (a, c, g, t) = match (a, c, g, t) {
            (Some(a), Some(c), Some(g), Some(t)) => (a, c, g, t),
            _ => {
                return Err(YamError::MotifSyntax {
                    line,
                    msg: format!(
                        "motif {name} is missing one of the A/C/G/T count \
                         rows"
                    ),
                })
            }
        };
        if [c.len(), g.len(), t.len()].iter().any(|&l| l != a.len()) {
            return Err(YamError::MotifSyntax {
                line,
                msg: format!("motif {name} has ragged count rows"),
            });
        }
        let mut rows = Vec::with_capacity(a.len());
        let mut totals = Vec::with_capacity(a.len());
        for j in 0..a.len() {
            let total = a[j] + c[j] + g[j] + t[j];
            if total <= 0f64 {
                return Err(YamError::MotifSyntax {
                    line,
                    msg: format!(
                        "motif {name}: position {} has no counts",
                        j + 1
                    ),
                });
            }
            rows.push([a[j] / total, c[j] / total, g[j] / total, t[j] / total]);
            totals.push(total);
        }
        let nsites = totals.iter().sum::<f64>() / totals.len() as f64;
        Ok(RawMotif { name, file_line: line, rows, nsites: Some(nsites) })
    }
}

fn parse_jaspar(
    lines: &[String],
    full_names: bool,
) -> anyhow::Result<ParsedMotifs> {
    let mut motifs = Vec::new();
    let mut current: Option<JasparCounts> = None;
    for (idx, line) in lines.iter().enumerate() {
        let line_num = idx + 1;
        let t = line.trim();
        if t.is_empty() {
            continue;
        }
        if let Some(header) = t.strip_prefix('>') {
            if let Some(counts) = current.take() {
                motifs.push(counts.finish()?);
            }
            current = Some(JasparCounts {
                name: motif_name(header, full_names, line_num)?,
                file_line: line_num,
                rows: [None, None, None, None],
            });
        } else {
            let counts =
                current.as_mut().ok_or_else(|| YamError::MotifSyntax {
                    line: line_num,
                    msg: "count row before any '>' header".to_string(),
                })?;
            let (base, values) = parse_jaspar_row(t, line_num)?;
            if counts.rows[base].is_some() {
                return Err(YamError::MotifSyntax {
                    line: line_num,
                    msg: format!(
                        "motif {}: duplicate count row for letter index \
                         {base}",
                        counts.name
                    ),
                }
                .into());
            }
            counts.rows[base] = Some(values);
        }
    }
    if let Some(counts) = current.take() {
        motifs.push(counts.finish()?);
    }
    Ok(ParsedMotifs { motifs, ..Default::default() })
}

fn parse_jaspar_row(
    line: &str,
    line_num: usize,
) -> YamResult<(usize, Vec<f64>)> {
    let syntax = |msg: String| YamError::MotifSyntax { line: line_num, msg };
    let letter = line
        .chars()
        .next()
        .ok_or_else(|| syntax("empty count row".to_string()))?;
    let base = match letter.to_ascii_uppercase() {
        'A' => 0,
        'C' => 1,
        'G' => 2,
        'T' | 'U' => 3,
        _ => {
            return Err(syntax(format!(
                "count row letter {letter:?} is not one of A/C/G/T/U"
            )))
        }
    };
    let open = line
        .find('[')
        .ok_or_else(|| syntax("count row is missing '['".to_string()))?;
    let close = line
        .rfind(']')
        .ok_or_else(|| syntax("count row is missing ']'".to_string()))?;
    if close <= open {
        return Err(syntax("mismatched brackets in count row".to_string()));
    }
    let values = line[open + 1..close]
        .split_whitespace()
        .map(|tok| {
            tok.parse::<f64>().map_err(|_| {
                syntax(format!("invalid count {tok:?}"))
            })
        })
        .collect::<YamResult<Vec<f64>>>()?;
    if values.is_empty() {
        return Err(syntax("count row has no values".to_string()));
    }
    Ok((base, values))
}

fn parse_hocomoco(
    lines: &[String],
    full_names: bool,
) -> anyhow::Result<ParsedMotifs> {
    struct Pcm {
        name: String,
        file_line: usize,
        rows: Vec<[f64; 4]>,
    }
    fn finish(pcm: Pcm) -> YamResult<RawMotif> {
        if pcm.rows.is_empty() {
            return Err(YamError::MotifSyntax {
                line: pcm.file_line,
                msg: format!("motif {} has no matrix rows", pcm.name),
            });
        }
        let totals =
            pcm.rows.iter().map(|r| r.iter().sum::<f64>()).collect::<Vec<_>>();
        let lo = totals.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = totals.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let spread = hi - lo;
        if spread > 1.0 + 1e-9 {
            return Err(YamError::MotifSyntax {
                line: pcm.file_line,
                msg: format!(
                    "motif {}: position count totals range from {lo} to \
                     {hi}, they must agree",
                    pcm.name
                ),
            });
        }
        if spread > 0f64 {
            info!(
                "motif {}: position count totals differ by {spread} (line \
                 {})",
                pcm.name, pcm.file_line
            );
        }
        let rows = pcm
            .rows
            .iter()
            .zip(totals.iter())
            .map(|(row, &total)| row.map(|count| count / total))
            .collect::<Vec<[f64; 4]>>();
        let nsites = totals.iter().sum::<f64>() / totals.len() as f64;
        Ok(RawMotif {
            name: pcm.name,
            file_line: pcm.file_line,
            rows,
            nsites: Some(nsites),
        })
    }

    let mut motifs = Vec::new();
    let mut current: Option<Pcm> = None;
    for (idx, line) in lines.iter().enumerate() {
        let line_num = idx + 1;
        let t = line.trim();
        if t.is_empty() {
            continue;
        }
        if let Some(header) = t.strip_prefix('>') {
            if let Some(pcm) = current.take() {
                motifs.push(finish(pcm)?);
            }
            current = Some(Pcm {
                name: motif_name(header, full_names, line_num)?,
                file_line: line_num,
                rows: Vec::new(),
            });
        } else {
            let pcm =
                current.as_mut().ok_or_else(|| YamError::MotifSyntax {
                    line: line_num,
                    msg: "count row before any '>' header".to_string(),
                })?;
            pcm.rows.push(parse_numeric_row(t, line_num, &pcm.name)?);
        }
    }
    if let Some(pcm) = current.take() {
        motifs.push(finish(pcm)?);
    }
    Ok(ParsedMotifs { motifs, ..Default::default() })
}

#[cfg(test)]
mod parser_tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    fn lines_of(text: &str) -> Vec<String> {
        text.lines().map(|l| l.to_string()).collect()
    }

    const MEME_TWO_MOTIFS: &str = "\
MEME version 4

ALPHABET= ACGT

strands: + -

Background letter frequencies
A 0.30 C 0.20 G 0.20 T 0.30

MOTIF MA0004.1 Arnt
letter-probability matrix: alength= 4 w= 3 nsites= 20 E= 0
 0.200000  0.800000  0.000000  0.000000
 0.950000  0.000000  0.050000  0.000000
 0.000000  0.000000  1.000000  0.000000

MOTIF crp
letter-probability matrix: alength= 4 w= 2
 0.25 0.25 0.25 0.25
 0.10 0.40 0.40 0.10
";

    #[test]
    fn test_meme_parse() {
        let lines = lines_of(MEME_TWO_MOTIFS);
        assert_eq!(detect_format(&lines).unwrap(), MotifFormat::Meme);
        let parsed = parse_motif_lines(&lines, false).unwrap();
        assert_eq!(parsed.motifs.len(), 2);
        assert_eq!(parsed.strands.as_deref(), Some("+ -"));
        let bkg = parsed.background.unwrap();
        assert_approx_eq!(bkg[0], 0.3, 1e-9);
        assert_approx_eq!(bkg[1], 0.2, 1e-9);
        let arnt = &parsed.motifs[0];
        assert_eq!(arnt.name, "MA0004.1");
        assert_eq!(arnt.rows.len(), 3);
        assert_eq!(arnt.nsites, Some(20.0));
        assert_approx_eq!(arnt.rows[0][1], 0.8, 1e-9);
        let crp = &parsed.motifs[1];
        assert_eq!(crp.name, "crp");
        assert_eq!(crp.nsites, None);
        assert_eq!(crp.rows.len(), 2);
    }

    #[test]
    fn test_meme_full_names() {
        let lines = lines_of(MEME_TWO_MOTIFS);
        let parsed = parse_motif_lines(&lines, true).unwrap();
        assert_eq!(parsed.motifs[0].name, "MA0004.1 Arnt");
    }

    #[test]
    fn test_meme_protein_alphabet_is_fatal() {
        let text = "\
MEME version 4

ALPHABET= ACDEFGHIKLMNPQRSTVWY

MOTIF prot
letter-probability matrix: alength= 20 w= 1
";
        let err =
            parse_motif_lines(&lines_of(text), false).unwrap_err();
        assert!(err.to_string().contains("protein"));
    }

    #[test]
    fn test_meme_bad_row_sum_is_fatal() {
        let text = "\
MEME version 4

MOTIF bad
letter-probability matrix: alength= 4 w= 1
 0.50 0.10 0.10 0.10
";
        assert!(parse_motif_lines(&lines_of(text), false).is_err());
    }

    #[test]
    fn test_meme_slightly_off_row_rescales() {
        let text = "\
MEME version 4

MOTIF ok
letter-probability matrix: alength= 4 w= 1
 0.30 0.25 0.25 0.25
";
        let parsed = parse_motif_lines(&lines_of(text), false).unwrap();
        let row = parsed.motifs[0].rows[0];
        assert_approx_eq!(row.iter().sum::<f64>(), 1.0, 1e-12);
    }

    #[test]
    fn test_meme_width_mismatch_is_fatal() {
        let text = "\
MEME version 4

MOTIF short
letter-probability matrix: alength= 4 w= 3
 0.25 0.25 0.25 0.25
";
        assert!(parse_motif_lines(&lines_of(text), false).is_err());
    }

    #[test]
    fn test_jaspar_parse() {
        let text = "\
>MA0002.1 RUNX1
A [ 10 12  4  1 ]
C [  2  2  7  1 ]
G [  3  1  1 20 ]
T [ 10 10 13  3 ]
";
        let lines = lines_of(text);
        assert_eq!(detect_format(&lines).unwrap(), MotifFormat::Jaspar);
        let parsed = parse_motif_lines(&lines, false).unwrap();
        assert_eq!(parsed.motifs.len(), 1);
        let m = &parsed.motifs[0];
        assert_eq!(m.name, "MA0002.1");
        assert_eq!(m.rows.len(), 4);
        assert_eq!(m.nsites, Some(25.0));
        assert_approx_eq!(m.rows[0][0], 10.0 / 25.0, 1e-9);
        assert_approx_eq!(m.rows[3][2], 20.0 / 25.0, 1e-9);
        for row in &m.rows {
            assert_approx_eq!(row.iter().sum::<f64>(), 1.0, 1e-12);
        }
    }

    #[test]
    fn test_jaspar_missing_row_is_fatal() {
        let text = "\
>M1
A [ 1 2 ]
C [ 1 2 ]
G [ 1 2 ]
";
        assert!(parse_motif_lines(&lines_of(text), false).is_err());
    }

    #[test]
    fn test_homer_parse() {
        let text = ">ACGT\t1-ACGT\t6.04\n\
0.7 0.1 0.1 0.1\n\
0.1 0.7 0.1 0.1\n\
0.1 0.1 0.7 0.1\n\
0.1 0.1 0.1 0.7\n\
>TTTT\t2-TTTT\t3.2\n\
0.02 0.02 0.02 0.94\n";
        let lines = lines_of(text);
        assert_eq!(detect_format(&lines).unwrap(), MotifFormat::Homer);
        let parsed = parse_motif_lines(&lines, false).unwrap();
        assert_eq!(parsed.motifs.len(), 2);
        assert_eq!(parsed.motifs[0].name, "1-ACGT");
        assert_eq!(parsed.motifs[0].rows.len(), 4);
        assert_eq!(parsed.motifs[1].name, "2-TTTT");
    }

    #[test]
    fn test_hocomoco_parse() {
        let text = "\
>AHR_HUMAN.H11MO.0.B
40\t20\t10\t30
25\t25\t25\t25
10\t10\t10\t70
";
        let lines = lines_of(text);
        assert_eq!(
            detect_format(&lines).unwrap(),
            MotifFormat::HocomocoPcm
        );
        let parsed = parse_motif_lines(&lines, false).unwrap();
        let m = &parsed.motifs[0];
        assert_eq!(m.name, "AHR_HUMAN.H11MO.0.B");
        assert_eq!(m.rows.len(), 3);
        assert_eq!(m.nsites, Some(100.0));
        assert_approx_eq!(m.rows[0][0], 0.4, 1e-9);
        assert_approx_eq!(m.rows[2][3], 0.7, 1e-9);
    }

    #[test]
    fn test_hocomoco_unequal_totals_fatal() {
        let text = "\
>bad
40\t20\t10\t30
10\t10\t10\t10
";
        assert!(parse_motif_lines(&lines_of(text), false).is_err());
    }

    #[test]
    fn test_hocomoco_pwm_rejected() {
        let text = "\
>precomputed
0.53\t-1.24\t0.11\t0.02
-0.4\t0.9\t-2.2\t0.3
";
        let err = parse_motif_lines(&lines_of(text), false).unwrap_err();
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn test_unknown_format() {
        let text = "just some text\nwith no motifs\n";
        assert!(parse_motif_lines(&lines_of(text), false).is_err());
    }

    #[test]
    fn test_name_cap() {
        let long = "x".repeat(MAX_MOTIF_NAME_LEN + 1);
        let text = format!(
            ">{long}\n10\t10\t10\t10\n"
        );
        assert!(parse_motif_lines(&lines_of(&text), false).is_err());
    }

    #[test]
    fn test_jaspar_u_row_maps_to_t() {
        let text = "\
>rna
A [ 5 0 ]
C [ 0 5 ]
G [ 0 0 ]
U [ 0 0 ]
";
        let parsed = parse_motif_lines(&lines_of(text), false).unwrap();
        let m = &parsed.motifs[0];
        assert_eq!(m.rows.len(), 2);
        assert_approx_eq!(m.rows[0][0], 1.0, 1e-12);
        assert_approx_eq!(m.rows[1][1], 1.0, 1e-12);
    }

    #[test]
    fn test_jaspar_wins_detection_over_homer() {
        // a tab in the header is not enough to call it HOMER when the
        // body carries bracketed count rows
        let text = ">M1\tname\nA [ 1 ]\nC [ 1 ]\nG [ 1 ]\nT [ 1 ]\n";
        let lines = lines_of(text);
        assert_eq!(detect_format(&lines).unwrap(), MotifFormat::Jaspar);
    }

    #[test]
    fn test_meme_motif_without_matrix_is_fatal() {
        let text = "\
MEME version 4

MOTIF headless

MOTIF ok
letter-probability matrix: alength= 4 w= 1
 0.25 0.25 0.25 0.25
";
        let err = parse_motif_lines(&lines_of(text), false).unwrap_err();
        assert!(err.to_string().contains("headless"));
    }

    #[test]
    fn test_meme_row_with_wrong_letter_count_is_fatal() {
        let text = "\
MEME version 4

MOTIF bad
letter-probability matrix: alength= 4 w= 1
 0.25 0.25 0.50
";
        assert!(parse_motif_lines(&lines_of(text), false).is_err());
    }

    #[test]
    fn test_empty_file_is_unknown_format() {
        assert!(matches!(
            detect_format(&lines_of("\n\n")),
            Err(crate::errs::YamError::UnknownMotifFormat)
        ));
    }
}
