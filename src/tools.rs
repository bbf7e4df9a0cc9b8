// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier
// Modifications (c) 2026 Peter Carlton

use std::{
    path::Path,
    process::{Command, Output},
};

use itertools::Itertools;
use log::{debug, error, info};

use crate::{config::ToolsConfig, errors::PhyloError};

pub const CLUSTALO_ITERATIONS: u32 = 3;

// FastTree's amino-acid model switch (Whelan & Goldman).
pub const SUBSTITUTION_MODEL_FLAG: &str = "-wag";

pub const UNKNOWN_ERROR: &str = "Unknown error";

pub fn clustalo_args(input: &Path, output: &Path) -> Vec<String> {
    vec![
        String::from("-i"),
        input.display().to_string(),
        String::from("-o"),
        output.display().to_string(),
        String::from("--force"),
        String::from("--full"),
        format!("--iterations={}", CLUSTALO_ITERATIONS),
    ]
}

pub fn fasttree_args(aligned: &Path) -> Vec<String> {
    vec![
        String::from(SUBSTITUTION_MODEL_FLAG),
        aligned.display().to_string(),
    ]
}

/// Runs Clustal Omega on `input`, writing the alignment to `output`. The aligner writes the file
/// itself; we only look at its exit status.
pub fn align_sequences(tools: &ToolsConfig, input: &Path, output: &Path) -> Result<(), PhyloError> {
    let tool_path = tools.clustalo_path();
    let args = clustalo_args(input, output);
    debug!("{} {}", tool_path.display(), args.iter().join(" "));

    let out = Command::new(&tool_path)
        .args(&args)
        .output()
        .map_err(|e| {
            error!("could not start {}: {}", tool_path.display(), e);
            PhyloError::Align(format!("could not run {}: {}", tool_path.display(), e))
        })?;

    if !out.status.success() {
        let detail = failure_detail(&out);
        error!("clustalo: {}", detail);
        return Err(PhyloError::Align(detail));
    }
    info!(
        "Alignment complete. Results saved to {}",
        output.display()
    );
    Ok(())
}

/// Runs FastTree on the aligned file and returns the Newick text it prints on stdout.
pub fn infer_tree(tools: &ToolsConfig, aligned: &Path) -> Result<String, PhyloError> {
    let tool_path = tools.fasttree_path();
    let args = fasttree_args(aligned);
    debug!("{} {}", tool_path.display(), args.iter().join(" "));

    let out = Command::new(&tool_path)
        .args(&args)
        .output()
        .map_err(|e| {
            error!("could not start {}: {}", tool_path.display(), e);
            PhyloError::TreeBuild(format!("could not run {}: {}", tool_path.display(), e))
        })?;

    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
        let msg = if stderr.is_empty() {
            String::from(UNKNOWN_ERROR)
        } else {
            stderr
        };
        error!("FastTree ({}): {}", out.status, msg);
        return Err(PhyloError::TreeBuild(msg));
    }
    debug!(
        "FastTree wrote {} bytes to stdout, {} to stderr",
        out.stdout.len(),
        out.stderr.len()
    );
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

// Exit status, followed by whatever the tool said on stderr.
fn failure_detail(out: &Output) -> String {
    let stderr = String::from_utf8_lossy(&out.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("{}", out.status)
    } else {
        format!("{}: {}", out.status, stderr)
    }
}
