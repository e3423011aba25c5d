use clap::Subcommand;

use crate::scan::subcommand::ScanMotifs;
use crate::shuffle::subcommand::ShuffleSeqs;

#[derive(Subcommand)]
pub enum Commands {
    /// Scan DNA/RNA sequences for motif matches scoring above an exact
    /// p-value threshold. Motifs may come from a MEME, JASPAR, HOCOMOCO
    /// PCM, or HOMER file, or from a single IUPAC consensus string.
    Scan(ScanMotifs),
    /// Shuffle DNA/RNA sequences while preserving k-mer composition,
    /// with Fisher-Yates, block, Markov, and random-Eulerian-walk
    /// kernels.
    Shuffle(ShuffleSeqs),
}

impl Commands {
    pub fn run(&self) -> anyhow::Result<()> {
        match self {
            Self::Scan(x) => x.run(),
            Self::Shuffle(x) => x.run(),
        }
    }
}
