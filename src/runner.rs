// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier
// Modifications (c) 2026 Peter Carlton

use std::path::{Path, PathBuf};

use clap::Parser;
use log::{error, info, warn};

use crate::config::{find_phylo_config, PhyloConfig};
use crate::errors::PhyloError;
use crate::pipeline::{FileSelector, Notifier, Pipeline, RunOutcome, Session, TreeDisplay};
use crate::render::RenderedImage;
use crate::ui::run_gui;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None) ]
struct Cli {
    /// FASTA files to process (headless mode only)
    #[arg(requires = "headless")]
    files: Vec<PathBuf>,

    /// Run the pipeline on FILES without opening a window
    #[arg(long)]
    headless: bool,

    /// Directory for the working files (default: current directory)
    #[arg(short = 'd', long)]
    workdir: Option<PathBuf>,

    /// Config file (default: ~/.phylotreeconfig, then ./.phylotreeconfig)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Width of the rendered tree image [px]
    #[arg(short, long)]
    width: Option<u32>,
}

// A bad config is not fatal: we fall back to defaults and tell the user why.
fn load_config(explicit: Option<&Path>) -> (PhyloConfig, Option<String>) {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => find_phylo_config(),
    };
    let Some(path) = path else {
        return (PhyloConfig::default(), None);
    };
    match PhyloConfig::from_file(&path) {
        Ok(cfg) => {
            info!("Using config {}", path.display());
            (cfg, None)
        }
        Err(e) => {
            let msg = format!("Error reading {}: {} (using defaults)", path.display(), e);
            warn!("{}", msg);
            (PhyloConfig::default(), Some(msg))
        }
    }
}

struct PresetFiles(Vec<PathBuf>);

impl FileSelector for PresetFiles {
    fn select_files(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.0)
    }
}

struct LogNotifier;

impl Notifier for LogNotifier {
    fn info(&mut self, title: &str, message: &str) {
        info!("{}: {}", title, message);
    }

    fn warning(&mut self, title: &str, message: &str) {
        warn!("{}: {}", title, message);
    }

    fn error(&mut self, title: &str, message: &str) {
        error!("{}: {}", title, message);
    }
}

// Headless runs just leave the image on disk.
struct ImageOnDisk;

impl TreeDisplay for ImageOnDisk {
    fn show_tree(&mut self, image: &RenderedImage) -> Result<(), PhyloError> {
        info!(
            "Tree image: {} ({}x{})",
            image.path.display(),
            image.width,
            image.height
        );
        Ok(())
    }
}

fn run_headless(mut session: Session, files: Vec<PathBuf>) -> Result<(), PhyloError> {
    let outcome = session.run(&mut PresetFiles(files), &mut LogNotifier, &mut ImageOnDisk);
    match outcome {
        RunOutcome::Success(output) => {
            println!("{}", output.tree.text_preview());
            Ok(())
        }
        RunOutcome::NoFiles => Ok(()),
        RunOutcome::Failed(e) => Err(e),
    }
}

pub fn run() -> Result<(), PhyloError> {
    env_logger::init();
    info!("Starting log");

    let cli = Cli::parse();

    let (mut config, config_warning) = load_config(cli.config.as_deref());
    if let Some(width) = cli.width {
        config.render.width = width;
        config.render.validate()?;
    }

    let workdir = cli.workdir.unwrap_or_else(|| PathBuf::from("."));
    if !workdir.is_dir() {
        return Err(PhyloError::Format(format!(
            "{} is not a directory",
            workdir.display()
        )));
    }
    let session = Session::new(Pipeline::new(&config, &workdir));

    if cli.headless {
        run_headless(session, cli.files)
    } else {
        run_gui(session, config_warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn cli_parses_headless_files() {
        let cli = Cli::try_parse_from(["phylotree", "--headless", "a.fa", "b.fa", "-w", "640"])
            .unwrap();
        assert!(cli.headless);
        assert_eq!(cli.files, vec![PathBuf::from("a.fa"), PathBuf::from("b.fa")]);
        assert_eq!(cli.width, Some(640));
    }

    #[test]
    fn files_require_headless() {
        assert!(Cli::try_parse_from(["phylotree", "a.fa"]).is_err());
    }

    #[test]
    fn broken_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(&path, "{ not json").unwrap();
        let (cfg, warning) = load_config(Some(&path));
        assert_eq!(cfg.render.width, 800);
        assert!(warning.unwrap().contains("using defaults"));
    }

    #[test]
    fn headless_without_files_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(Pipeline::new(&PhyloConfig::default(), dir.path()));
        assert!(run_headless(session, Vec::new()).is_ok());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
