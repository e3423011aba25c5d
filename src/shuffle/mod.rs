use rand::prelude::*;
use rand::rngs::StdRng;

use crate::alphabet::NUM_CODES;

pub mod subcommand;

/// Largest supported k-mer size; the k-mer count table is 5^k entries.
pub const MAX_SHUFFLE_K: usize = 9;

/// Classical unbiased in-place shuffle over the raw bytes, the k=1
/// kernel. Case and ambiguity codes travel with their bytes.
pub fn fisher_yates(seq: &mut [u8], rng: &mut StdRng) {
    seq.shuffle(rng);
}

/// Permute complete k-blocks, leaving a short tail block in place.
/// k-mer counts are only approximately preserved but the pass is O(n).
pub fn block_shuffle(seq: &mut [u8], k: usize, rng: &mut StdRng) {
    let n_blocks = seq.len() / k;
    if n_blocks < 2 {
        return;
    }
    let mut order = (0..n_blocks).collect::<Vec<usize>>();
    order.shuffle(rng);
    let original = seq.to_vec();
    for (slot, &block) in order.iter().enumerate() {
        seq[slot * k..(slot + 1) * k]
            .copy_from_slice(&original[block * k..(block + 1) * k]);
    }
}

#[inline]
fn pack(codes: &[u8]) -> usize {
    codes.iter().fold(0usize, |acc, &c| acc * NUM_CODES + c as usize)
}

/// Categorical draw over a count row, the total must be positive.
fn draw_weighted(row: &[u64], rng: &mut StdRng) -> u8 {
    let total: u64 = row.iter().sum();
    let mut ticket = rng.gen_range(0..total);
    for (b, &count) in row.iter().enumerate() {
        if ticket < count {
            return b as u8;
        }
        ticket -= count;
    }
    unreachable!("draw from an empty count row")
}

fn kmer_counts(codes: &[u8], k: usize) -> Vec<u64> {
    let mut counts = vec![0u64; NUM_CODES.pow(k as u32)];
    for window in codes.windows(k) {
        counts[pack(window)] += 1;
    }
    counts
}

/// First-order generation from the k-mer transition table. The leading
/// k−1 letters are copied verbatim, every following letter is drawn
/// from its prefix row. A prefix row with no outgoing counts falls back
/// to the whole-sequence base composition.
pub fn markov_shuffle(codes: &[u8], k: usize, rng: &mut StdRng) -> Vec<u8> {
    let n = codes.len();
    if n < k || k < 1 {
        return codes.to_vec();
    }
    let vsize = NUM_CODES.pow((k - 1) as u32);
    let counts = kmer_counts(codes, k);
    let mut base_counts = [0u64; NUM_CODES];
    for &c in codes {
        base_counts[c as usize] += 1;
    }
    let mut out = codes[..k - 1].to_vec();
    let mut vertex = pack(&codes[..k - 1]);
    for _ in (k - 1)..n {
        let row = &counts[vertex * NUM_CODES..(vertex + 1) * NUM_CODES];
        let total: u64 = row.iter().sum();
        let b = if total == 0 {
            draw_weighted(&base_counts, rng)
        } else {
            draw_weighted(row, rng)
        };
        out.push(b);
        vertex = (vertex * NUM_CODES + b as usize) % vsize;
    }
    out
}

const VERTEX_UNROUTED: u8 = 0;
const VERTEX_ROUTED: u8 = 1;
const VERTEX_NO_EDGES: u8 = 2;

/// k-mer-composition-preserving shuffle by a random Eulerian trail.
///
/// Each k-mer is an edge from its prefix (k−1)-mer to its suffix
/// (k−1)-mer, so the input spells an Eulerian trail through the edge
/// multigraph. The output's final edge is pinned to the input's last
/// k-mer; with that edge set aside, last-exit random walks toward the
/// trail's terminal vertex select a uniform arborescence, and the trail
/// is then walked by consuming pooled edges at random, leaving each
/// vertex through its arborescence edge once the pool runs dry.
pub fn euler_shuffle(codes: &[u8], k: usize, rng: &mut StdRng) -> Vec<u8> {
    let n = codes.len();
    if k < 2 || n <= k {
        // one k-mer or fewer, nothing can move
        return codes.to_vec();
    }
    let vsize = NUM_CODES.pow((k - 1) as u32);
    let mut counts = kmer_counts(codes, k);

    // pin the final edge and root the arborescence at its source
    let last_kmer = pack(&codes[n - k..]);
    counts[last_kmer] -= 1;
    let root = last_kmer / NUM_CODES;

    let mut state = vec![VERTEX_UNROUTED; vsize];
    for v in 0..vsize {
        let row = &counts[v * NUM_CODES..(v + 1) * NUM_CODES];
        if row.iter().all(|&c| c == 0) {
            state[v] = VERTEX_NO_EDGES;
        }
    }
    state[root] = VERTEX_ROUTED;

    let mut exit_edge: Vec<Option<u8>> = vec![None; vsize];
    let mut visited = Vec::new();
    for v0 in 0..vsize {
        if state[v0] != VERTEX_UNROUTED {
            continue;
        }
        visited.clear();
        let mut v = v0;
        while state[v] == VERTEX_UNROUTED {
            visited.push(v);
            let b =
                draw_weighted(&counts[v * NUM_CODES..(v + 1) * NUM_CODES], rng);
            exit_edge[v] = Some(b);
            v = (v * NUM_CODES + b as usize) % vsize;
        }
        for &u in &visited {
            state[u] = VERTEX_ROUTED;
        }
    }

    // arborescence edges are reserved for each vertex's last departure
    for v in 0..vsize {
        if let Some(b) = exit_edge[v] {
            counts[v * NUM_CODES + b as usize] -= 1;
        }
    }

    let mut out = codes[..k - 1].to_vec();
    let mut v = pack(&codes[..k - 1]);
    for _ in 0..(n - k) {
        let row = &counts[v * NUM_CODES..(v + 1) * NUM_CODES];
        let total: u64 = row.iter().sum();
        let b = if total > 0 {
            let b = draw_weighted(row, rng);
            counts[v * NUM_CODES + b as usize] -= 1;
            b
        } else {
            exit_edge[v]
                .expect("every vertex on the trail keeps a reserved exit edge")
        };
        out.push(b);
        v = (v * NUM_CODES + b as usize) % vsize;
    }
    debug_assert_eq!(v, root);
    out.push((last_kmer % NUM_CODES) as u8);
    out
}
