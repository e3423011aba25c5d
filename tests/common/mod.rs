use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::Output;

use anyhow::anyhow;

pub fn run_yamscan(args: &[&str]) -> anyhow::Result<Output> {
    let exe = Path::new(env!("CARGO_BIN_EXE_yamscan"));
    assert!(exe.exists());

    let output = std::process::Command::new(exe)
        .args(args)
        .stderr(std::process::Stdio::null())
        .output()?;
    if output.status.success() {
        Ok(output)
    } else {
        Err(anyhow!("failed to run {:?}", args.join(" ")))
    }
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let fp = dir.join(name);
    let mut fh = File::create(&fp).unwrap();
    fh.write_all(contents.as_bytes()).unwrap();
    fh.flush().unwrap();
    fp
}

pub fn read_to_string(fp: &Path) -> String {
    let mut buff = String::new();
    File::open(fp).unwrap().read_to_string(&mut buff).unwrap();
    buff
}

/// Hit rows of a scan output file, header lines dropped, split on tabs.
pub fn hit_rows(fp: &Path) -> Vec<Vec<String>> {
    read_to_string(fp)
        .lines()
        .filter(|l| !l.starts_with('#') && !l.is_empty())
        .map(|l| l.split('\t').map(|f| f.to_string()).collect())
        .collect()
}

/// Header lines of a scan output file (the `##`/`#` preamble).
pub fn header_lines(fp: &Path) -> Vec<String> {
    read_to_string(fp)
        .lines()
        .filter(|l| l.starts_with('#'))
        .map(|l| l.to_string())
        .collect()
}

/// Records of a FASTA file as (header, concatenated sequence) pairs.
pub fn fasta_records(fp: &Path) -> Vec<(String, String)> {
    let mut records: Vec<(String, String)> = Vec::new();
    for line in read_to_string(fp).lines() {
        if let Some(header) = line.strip_prefix('>') {
            records.push((header.to_string(), String::new()));
        } else if let Some(last) = records.last_mut() {
            last.1.push_str(line.trim());
        }
    }
    records
}
