use std::fmt::{Display, Formatter};
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use log::{debug, info};
use rustc_hash::FxHashSet;

use crate::errs::{YamError, YamResult};

pub(crate) const TAB: char = '\t';

pub(crate) fn create_out_directory<T: AsRef<std::ffi::OsStr>>(
    raw_path: T,
) -> anyhow::Result<()> {
    if let Some(p) = Path::new(&raw_path).parent() {
        if !p.exists() && p != Path::new("") {
            info!("creating directory at {p:?}");
            std::fs::create_dir_all(p)?;
        }
    }
    Ok(())
}

fn get_master_progress_bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40.green/yellow} {pos:>7}/{len:7} {msg}",
    )
    .unwrap()
    .progress_chars("##-")
}

pub(crate) fn get_master_progress_bar<
    T: num_traits::Num + num_traits::cast::AsPrimitive<u64>,
>(
    n: T,
) -> ProgressBar {
    ProgressBar::new(n.as_()).with_style(get_master_progress_bar_style())
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Default, PartialOrd, Ord)]
pub enum Strand {
    #[default]
    Positive,
    Negative,
}

impl Strand {
    pub fn parse_char(x: char) -> YamResult<Self> {
        match x {
            '+' => Ok(Self::Positive),
            '-' => Ok(Self::Negative),
            _ => Err(YamError::InvalidStrand(x)),
        }
    }

    pub fn to_char(&self) -> char {
        match self {
            Strand::Positive => '+',
            Strand::Negative => '-',
        }
    }
}

impl Display for Strand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// Which orientations of a range are eligible for scanning, parsed from
/// the BED strand column where '.' means both.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum StrandRule {
    Positive,
    Negative,
    Both,
}

impl StrandRule {
    pub fn covers(&self, strand: Strand) -> bool {
        match &self {
            StrandRule::Positive => strand == Strand::Positive,
            StrandRule::Negative => strand == Strand::Negative,
            StrandRule::Both => true,
        }
    }
}

impl TryFrom<char> for StrandRule {
    type Error = YamError;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value {
            '+' => Ok(Self::Positive),
            '-' => Ok(Self::Negative),
            '.' => Ok(Self::Both),
            _ => Err(YamError::InvalidStrand(value)),
        }
    }
}

impl From<StrandRule> for char {
    fn from(value: StrandRule) -> Self {
        match value {
            StrandRule::Positive => '+',
            StrandRule::Negative => '-',
            StrandRule::Both => '.',
        }
    }
}

impl Display for StrandRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", char::from(*self))
    }
}

/// Check a list of names for duplicates, the first occurrence always
/// wins. With `dedup` every later occurrence is renamed by appending
/// `__N<i>` where `<i>` is its one-based position in the list, otherwise
/// up to five offenders are reported and the whole list is rejected.
/// Returns whether any name was rewritten.
pub(crate) fn ensure_unique_names(
    names: &mut [String],
    kind: &'static str,
    dedup: bool,
    cap: usize,
) -> YamResult<bool> {
    let mut seen = FxHashSet::default();
    let mut offenders = Vec::new();
    let mut renamed = false;
    for (i, name) in names.iter_mut().enumerate() {
        if seen.contains(name.as_str()) {
            if dedup {
                let rename = format!("{}__N{}", name, i + 1);
                if rename.len() > cap {
                    return Err(YamError::NameTooLong {
                        kind,
                        name: rename,
                        cap,
                    });
                }
                debug!("renaming duplicate {kind} {name} to {rename}");
                *name = rename;
                renamed = true;
            } else {
                offenders.push(name.clone());
                continue;
            }
        }
        seen.insert(name.clone());
    }
    if !offenders.is_empty() {
        return Err(YamError::DuplicateNames {
            kind,
            preview: offenders.iter().take(5).join(", "),
            total: offenders.len(),
        });
    }
    Ok(renamed)
}

pub fn format_int_with_commas(val: isize) -> String {
    let mut num = val
        .abs()
        .to_string()
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(std::str::from_utf8)
        .collect::<Result<Vec<&str>, _>>()
        .unwrap()
        .join(",");
    if val < 0 {
        num = format!("-{num}")
    }
    num
}
