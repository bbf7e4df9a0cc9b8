// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Peter Carlton

use std::path::PathBuf;

use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};

use crate::pipeline::{FileSelector, Notifier};

pub const FASTA_EXTENSIONS: [&str; 2] = ["fasta", "fa"];

/// Native multi-file chooser. Cancelling yields no files.
pub struct NativeFileSelector;

impl FileSelector for NativeFileSelector {
    fn select_files(&mut self) -> Vec<PathBuf> {
        FileDialog::new()
            .add_filter("FASTA files", &FASTA_EXTENSIONS)
            .set_title("Select FASTA files")
            .pick_files()
            .unwrap_or_default()
    }
}

/// Blocking native message boxes.
pub struct NativeNotifier;

fn show(level: MessageLevel, title: &str, message: &str) {
    let _ = MessageDialog::new()
        .set_level(level)
        .set_title(title)
        .set_description(message)
        .set_buttons(MessageButtons::Ok)
        .show();
}

impl Notifier for NativeNotifier {
    fn info(&mut self, title: &str, message: &str) {
        show(MessageLevel::Info, title, message);
    }

    fn warning(&mut self, title: &str, message: &str) {
        show(MessageLevel::Warning, title, message);
    }

    fn error(&mut self, title: &str, message: &str) {
        show(MessageLevel::Error, title, message);
    }
}
