// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier
// Modifications (c) 2026 Peter Carlton

use std::{fmt, io, path::PathBuf};

#[derive(Debug)]
pub enum PhyloError {
    Io(io::Error),
    Format(String),
    // An input file could not be read, or the combined file could not be written.
    Combine(PathBuf, io::Error),
    Align(String),
    TreeBuild(String),
    TreeProcessing(String),
    Gui(String),
}

impl PhyloError {
    // Anything that goes wrong after the tree tool has produced its output gets this label.
    pub fn processing<E: fmt::Display>(e: E) -> Self {
        PhyloError::TreeProcessing(e.to_string())
    }

    pub fn into_processing(self) -> Self {
        match self {
            PhyloError::TreeProcessing(_) => self,
            other => PhyloError::processing(other),
        }
    }
}

// These allow conversion to PhyloError, required for main() to return Result<()> and for '?' to
// work.

impl From<io::Error> for PhyloError {
    fn from(e: io::Error) -> Self {
        PhyloError::Io(e)
    }
}

impl From<String> for PhyloError {
    fn from(s: String) -> Self {
        PhyloError::Format(s)
    }
}

impl fmt::Display for PhyloError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhyloError::Io(e) => write!(f, "I/O error: {}", e),
            PhyloError::Format(msg) => write!(f, "Format error: {}", msg),
            PhyloError::Combine(path, e) => {
                write!(f, "Could not combine {}: {}", path.display(), e)
            }
            PhyloError::Align(msg) => write!(f, "Clustal Omega alignment failed: {}", msg),
            PhyloError::TreeBuild(msg) => write!(f, "Error generating tree: {}", msg),
            PhyloError::TreeProcessing(msg) => write!(f, "Error in tree processing: {}", msg),
            PhyloError::Gui(msg) => write!(f, "GUI error: {}", msg),
        }
    }
}

impl std::error::Error for PhyloError {}
