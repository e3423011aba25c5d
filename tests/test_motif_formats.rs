use std::io::Write;

mod common;
use common::{header_lines, hit_rows, run_yamscan, write_file};

// Four renditions of the same strong ACGT motif, one per accepted
// format. Scanning the same sequence with -0 must find the exact
// match through every parser.

const MEME_ACGT: &str = "\
MEME version 4

ALPHABET= ACGT

strands: + -

Background letter frequencies
A 0.25 C 0.25 G 0.25 T 0.25

MOTIF acgt
letter-probability matrix: alength= 4 w= 4 nsites= 100
 0.97 0.01 0.01 0.01
 0.01 0.97 0.01 0.01
 0.01 0.01 0.97 0.01
 0.01 0.01 0.01 0.97
";

const HOMER_ACGT: &str = "\
>ACGT\tacgt\t6.0
0.97 0.01 0.01 0.01
0.01 0.97 0.01 0.01
0.01 0.01 0.97 0.01
0.01 0.01 0.01 0.97
";

const JASPAR_ACGT: &str = "\
>acgt
A [ 97  1  1  1 ]
C [  1 97  1  1 ]
G [  1  1 97  1 ]
T [  1  1  1 97 ]
";

const HOCOMOCO_ACGT: &str = "\
>acgt
97\t1\t1\t1
1\t97\t1\t1
1\t1\t97\t1
1\t1\t1\t97
";

const SEQ: &str = ">seq1\nTTTACGTTTT\n";

fn best_hit_of(motifs: &str) -> Vec<String> {
    let dir = tempfile::tempdir().unwrap();
    let motif_fp = write_file(dir.path(), "motifs.txt", motifs);
    let fasta = write_file(dir.path(), "seqs.fa", SEQ);
    let out = dir.path().join("hits.tsv");
    run_yamscan(&[
        "scan",
        "-m",
        motif_fp.to_str().unwrap(),
        "-s",
        fasta.to_str().unwrap(),
        "-0",
        "-f",
        "-o",
        out.to_str().unwrap(),
    ])
    .unwrap();
    let rows = hit_rows(&out);
    assert!(!rows.is_empty());
    rows.into_iter()
        .max_by(|a, b| {
            let score_a = a[6].parse::<f64>().unwrap();
            let score_b = b[6].parse::<f64>().unwrap();
            score_a.partial_cmp(&score_b).unwrap()
        })
        .unwrap()
}

#[test]
fn test_meme_scan_finds_exact_match() {
    let hit = best_hit_of(MEME_ACGT);
    assert_eq!(hit[1], "4");
    assert_eq!(hit[2], "7");
    assert_eq!(hit[4], "acgt");
    assert_eq!(hit[7], "100.0");
    assert_eq!(hit[8], "ACGT");
}

#[test]
fn test_homer_scan_finds_exact_match() {
    let hit = best_hit_of(HOMER_ACGT);
    assert_eq!(hit[1], "4");
    assert_eq!(hit[4], "acgt");
    assert_eq!(hit[8], "ACGT");
}

#[test]
fn test_jaspar_scan_finds_exact_match() {
    let hit = best_hit_of(JASPAR_ACGT);
    assert_eq!(hit[1], "4");
    assert_eq!(hit[4], "acgt");
    assert_eq!(hit[7], "100.0");
    assert_eq!(hit[8], "ACGT");
}

#[test]
fn test_hocomoco_scan_finds_exact_match() {
    let hit = best_hit_of(HOCOMOCO_ACGT);
    assert_eq!(hit[1], "4");
    assert_eq!(hit[4], "acgt");
    assert_eq!(hit[8], "ACGT");
}

#[test]
fn test_gzipped_sequences_are_read_transparently() {
    let dir = tempfile::tempdir().unwrap();
    let gz_fp = dir.path().join("seqs.fa.gz");
    {
        let raw = std::fs::File::create(&gz_fp).unwrap();
        let mut writer = niffler::get_writer(
            Box::new(raw),
            niffler::compression::Format::Gzip,
            niffler::Level::Six,
        )
        .unwrap();
        writer.write_all(SEQ.as_bytes()).unwrap();
    }
    let out = dir.path().join("hits.tsv");
    run_yamscan(&[
        "scan",
        "-1",
        "ACGT",
        "-s",
        gz_fp.to_str().unwrap(),
        "-f",
        "-o",
        out.to_str().unwrap(),
    ])
    .unwrap();
    let rows = hit_rows(&out);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][1], "4");
    assert_eq!(rows[0][8], "ACGT");
}

#[test]
fn test_protein_meme_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let motifs = write_file(
        dir.path(),
        "motifs.txt",
        "MEME version 4\n\nALPHABET= ACDEFGHIKLMNPQRSTVWY\n",
    );
    let fasta = write_file(dir.path(), "seqs.fa", SEQ);
    let result = run_yamscan(&[
        "scan",
        "-m",
        motifs.to_str().unwrap(),
        "-s",
        fasta.to_str().unwrap(),
    ]);
    assert!(result.is_err());
}

#[test]
fn test_background_override_changes_scores() {
    // the user background shifts log-odds, so the same window scores
    // differently under a skewed background
    let dir = tempfile::tempdir().unwrap();
    let fasta = write_file(dir.path(), "seqs.fa", SEQ);
    let motifs = write_file(dir.path(), "motifs.txt", HOMER_ACGT);
    let plain = dir.path().join("plain.tsv");
    let skewed = dir.path().join("skewed.tsv");
    run_yamscan(&[
        "scan",
        "-m",
        motifs.to_str().unwrap(),
        "-s",
        fasta.to_str().unwrap(),
        "-0",
        "-f",
        "-o",
        plain.to_str().unwrap(),
    ])
    .unwrap();
    run_yamscan(&[
        "scan",
        "-m",
        motifs.to_str().unwrap(),
        "-s",
        fasta.to_str().unwrap(),
        "-b",
        "0.4,0.1,0.1,0.4",
        "-0",
        "-f",
        "-o",
        skewed.to_str().unwrap(),
    ])
    .unwrap();
    let plain_best = hit_rows(&plain)
        .into_iter()
        .find(|r| r[8] == "ACGT")
        .unwrap();
    let skewed_best = hit_rows(&skewed)
        .into_iter()
        .find(|r| r[8] == "ACGT")
        .unwrap();
    assert_ne!(plain_best[6], skewed_best[6]);
}

#[test]
fn test_mask_option_skips_softmasked_hits() {
    let dir = tempfile::tempdir().unwrap();
    let fasta = write_file(dir.path(), "seqs.fa", ">s\nTTTacgtTTT\n");
    let masked = dir.path().join("masked.tsv");
    let unmasked = dir.path().join("unmasked.tsv");
    run_yamscan(&[
        "scan",
        "-1",
        "ACGT",
        "-s",
        fasta.to_str().unwrap(),
        "-f",
        "-M",
        "-o",
        masked.to_str().unwrap(),
    ])
    .unwrap();
    run_yamscan(&[
        "scan",
        "-1",
        "ACGT",
        "-s",
        fasta.to_str().unwrap(),
        "-f",
        "-o",
        unmasked.to_str().unwrap(),
    ])
    .unwrap();
    assert!(hit_rows(&masked).is_empty());
    let rows = hit_rows(&unmasked);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][8], "acgt");
}

#[test]
fn test_full_names_flag_keeps_comments() {
    let dir = tempfile::tempdir().unwrap();
    let fasta =
        write_file(dir.path(), "seqs.fa", ">seq1 primary assembly\nTTTACGTTTT\n");
    let out = dir.path().join("hits.tsv");
    run_yamscan(&[
        "scan",
        "-1",
        "ACGT",
        "-s",
        fasta.to_str().unwrap(),
        "-f",
        "-r",
        "-o",
        out.to_str().unwrap(),
    ])
    .unwrap();
    let rows = hit_rows(&out);
    assert_eq!(rows[0][0], "seq1 primary assembly");
}

#[test]
fn test_bed_end_trimmed_to_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let fasta = write_file(
        dir.path(),
        "seqs.fa",
        &format!(">chr1\n{}\n", "A".repeat(30)),
    );
    let bed = write_file(dir.path(), "ranges.bed", "chr1\t20\t99\n");
    let out = dir.path().join("hits.tsv");
    run_yamscan(&[
        "scan",
        "-1",
        "AAAA",
        "-s",
        fasta.to_str().unwrap(),
        "-x",
        bed.to_str().unwrap(),
        "-f",
        "-o",
        out.to_str().unwrap(),
    ])
    .unwrap();
    let rows = hit_rows(&out);
    // trimmed to [20, 30), offsets 20..=26
    assert_eq!(rows.len(), 7);
    assert!(rows.iter().all(|r| r[0] == "chr1:20-30(.)"));
    assert!(header_lines(&out)[1].contains("MaxPossibleHits=7"));
}
