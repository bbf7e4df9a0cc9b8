// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier
// Modifications (c) 2026 Peter Carlton

use std::{
    fs,
    path::{Path, PathBuf},
};

use phylotree::{
    config::{PhyloConfig, ToolsConfig},
    errors::PhyloError,
    pipeline::{FileSelector, Notifier, Pipeline, Session, TreeDisplay},
    render::RenderedImage,
};

pub const TWO_TAXON_TREE: &str = "(alpha:0.05,beta:0.07);";

pub struct Preset(pub Vec<PathBuf>);

impl FileSelector for Preset {
    fn select_files(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dialog {
    Info(String),
    Warning(String),
    Error(String),
}

#[derive(Default)]
pub struct Dialogs {
    pub shown: Vec<Dialog>,
}

impl Notifier for Dialogs {
    fn info(&mut self, _title: &str, message: &str) {
        self.shown.push(Dialog::Info(message.to_string()));
    }

    fn warning(&mut self, _title: &str, message: &str) {
        self.shown.push(Dialog::Warning(message.to_string()));
    }

    fn error(&mut self, _title: &str, message: &str) {
        self.shown.push(Dialog::Error(message.to_string()));
    }
}

/// Remembers what would have been put in the window: the image and the new window size.
#[derive(Default)]
pub struct Screen {
    pub images: Vec<RenderedImage>,
    pub window_size: Option<(u32, u32)>,
    pub fail: bool,
}

impl TreeDisplay for Screen {
    fn show_tree(&mut self, image: &RenderedImage) -> Result<(), PhyloError> {
        if self.fail {
            return Err(PhyloError::Format(String::from("no display")));
        }
        self.window_size = Some(image.window_size());
        self.images.clear();
        self.images.push(image.clone());
        Ok(())
    }
}

/// A scratch layout: `bin/` for fake tools, `work/` for the pipeline's files, `log/` for
/// anything the fake tools want to tell the test.
pub struct Rig {
    _dir: tempfile::TempDir,
    pub bin: PathBuf,
    pub work: PathBuf,
    pub log: PathBuf,
}

impl Rig {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let bin = dir.path().join("bin");
        let work = dir.path().join("work");
        let log = dir.path().join("log");
        for d in [&bin, &work, &log] {
            fs::create_dir(d).expect("mkdir");
        }
        Rig {
            _dir: dir,
            bin,
            work,
            log,
        }
    }

    pub fn config(&self) -> PhyloConfig {
        PhyloConfig {
            tools: ToolsConfig {
                clustalo_bin_dir: Some(self.bin.clone()),
                fasttree_bin_dir: Some(self.bin.clone()),
                ..ToolsConfig::default()
            },
            ..PhyloConfig::default()
        }
    }

    pub fn session(&self) -> Session {
        Session::new(Pipeline::new(&self.config(), &self.work))
    }

    /// Clustal Omega stand-in: copies its -i file to its -o file.
    pub fn good_aligner(&self) {
        let body = format!(
            "echo \"$@\" > '{}'\ncp \"$2\" \"$4\"\n",
            self.log.join("clustalo.args").display()
        );
        write_script(&self.bin, "clustalo", &body);
    }

    pub fn failing_aligner(&self, stderr: &str) {
        let body = format!("echo '{}' >&2\nexit 1\n", stderr);
        write_script(&self.bin, "clustalo", &body);
    }

    /// FastTree stand-in: checks its arguments and prints `newick`.
    pub fn good_tree_builder(&self, newick: &str) {
        let body = format!(
            "touch '{}'\n\
             [ \"$1\" = \"-wag\" ] && [ -s \"$2\" ] || {{ echo 'bad arguments' >&2; exit 2; }}\n\
             echo '{}'\n",
            self.log.join("fasttree.ran").display(),
            newick
        );
        write_script(&self.bin, "FastTree", &body);
    }

    pub fn failing_tree_builder(&self, stderr: &str) {
        let mut body = format!("touch '{}'\n", self.log.join("fasttree.ran").display());
        if !stderr.is_empty() {
            body.push_str(&format!("echo '{}' >&2\n", stderr));
        }
        body.push_str("exit 1\n");
        write_script(&self.bin, "FastTree", &body);
    }

    pub fn tree_builder_ran(&self) -> bool {
        self.log.join("fasttree.ran").exists()
    }
}

#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}", body)).expect("write script");
    let mut perms = fs::metadata(&path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod");
}

pub fn data(name: &str) -> PathBuf {
    PathBuf::from("tests/data").join(name)
}
