// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

// A FastA record: the header line (without '>') and the concatenated sequence lines. Aligned
// records keep their gap characters.

#[derive(Debug, Clone, PartialEq)]
pub struct SeqRecord {
    pub header: String,
    pub sequence: String,
}
