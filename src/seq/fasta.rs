// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier
// Modifications (c) 2026 Peter Carlton

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::seq::file::SeqFile;
use crate::seq::record::SeqRecord;

pub fn read_fasta_file<P: AsRef<Path>>(path: P) -> Result<SeqFile, std::io::Error> {
    let file = File::open(path)?;
    read_fasta(file)
}

pub fn read_fasta<R: Read>(input: R) -> Result<SeqFile, std::io::Error> {
    let mut result: SeqFile = Vec::new();
    let mut current_record: Option<SeqRecord> = None;

    for line in BufReader::new(input).lines() {
        let l = line?;
        let l = l.trim_end();
        if let Some(hdr) = l.strip_prefix('>') {
            if let Some(done) = current_record.take() {
                result.push(done);
            }
            current_record = Some(SeqRecord {
                header: hdr.to_string(),
                sequence: String::new(),
            });
        } else if let Some(rec) = current_record.as_mut() {
            // append line to current record's sequence
            rec.sequence.push_str(l);
        }
        // Text before the first header is not part of any record.
    }
    if let Some(done) = current_record {
        result.push(done);
    }
    Ok(result)
}
