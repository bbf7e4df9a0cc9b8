// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

#![allow(dead_code)]

pub mod utils;
