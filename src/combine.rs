// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Peter Carlton

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{debug, info};

use crate::errors::PhyloError;

/// Writes the bytes of every input, in order and without separators, to `dest`. Any existing
/// `dest` is truncated. Returns the number of bytes written.
pub fn combine_files<P: AsRef<Path>>(inputs: &[P], dest: &Path) -> Result<u64, PhyloError> {
    let out = File::create(dest).map_err(|e| PhyloError::Combine(dest.to_path_buf(), e))?;
    let mut writer = BufWriter::new(out);
    let mut total: u64 = 0;

    for input in inputs {
        let input = input.as_ref();
        let mut reader =
            File::open(input).map_err(|e| PhyloError::Combine(input.to_path_buf(), e))?;
        let n = io::copy(&mut reader, &mut writer).map_err(|e| copy_error(input, dest, e))?;
        debug!("appended {} bytes from {}", n, input.display());
        total += n;
    }
    writer
        .flush()
        .map_err(|e| PhyloError::Combine(dest.to_path_buf(), e))?;

    info!(
        "Combined {} file(s), {} bytes, into {}",
        inputs.len(),
        total,
        dest.display()
    );
    Ok(total)
}

// io::copy doesn't say which side failed; blame the input unless it is a write-type error.
fn copy_error(input: &Path, dest: &Path, e: io::Error) -> PhyloError {
    let culprit: PathBuf = match e.kind() {
        io::ErrorKind::WriteZero | io::ErrorKind::StorageFull => dest.to_path_buf(),
        _ => input.to_path_buf(),
    };
    PhyloError::Combine(culprit, e)
}
