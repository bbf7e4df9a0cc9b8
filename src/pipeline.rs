// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Peter Carlton

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, error, info, warn};

use crate::{
    combine::combine_files,
    config::{PhyloConfig, RenderConfig, ToolsConfig},
    errors::PhyloError,
    render::{render_tree_png, RenderedImage},
    seq::fasta::read_fasta_file,
    tools::{align_sequences, infer_tree},
    tree::{parse_newick, TreeNode},
};

// Working files. The names never depend on the inputs, so only one run may use a given
// directory at a time.
pub const COMBINED_FILE: &str = "combined_sequences.fasta";
pub const ALIGNED_FILE: &str = "aligned_sequences.fasta";
pub const TREE_FILE: &str = "phylogenetic_tree.nw";
pub const IMAGE_FILE: &str = "tree_image.png";

pub const NO_FILES_TITLE: &str = "No files";
pub const NO_FILES_MESSAGE: &str = "Please select FASTA files to continue.";
pub const SUCCESS_TITLE: &str = "Success";
pub const SUCCESS_MESSAGE: &str = "Pipeline completed successfully";
pub const ERROR_TITLE: &str = "Error";

/// Source of the user's sequence files. An empty list means the user chose nothing.
pub trait FileSelector {
    fn select_files(&mut self) -> Vec<PathBuf>;
}

/// Modal messages to the user.
pub trait Notifier {
    fn info(&mut self, title: &str, message: &str);
    fn warning(&mut self, title: &str, message: &str);
    fn error(&mut self, title: &str, message: &str);
}

/// Where a freshly rendered tree image ends up. Replaces whatever was shown before.
pub trait TreeDisplay {
    fn show_tree(&mut self, image: &RenderedImage) -> Result<(), PhyloError>;
}

#[derive(Debug, Clone)]
pub struct WorkFiles {
    dir: PathBuf,
}

impl WorkFiles {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        WorkFiles {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn combined(&self) -> PathBuf {
        self.dir.join(COMBINED_FILE)
    }

    pub fn aligned(&self) -> PathBuf {
        self.dir.join(ALIGNED_FILE)
    }

    pub fn tree(&self) -> PathBuf {
        self.dir.join(TREE_FILE)
    }

    pub fn image(&self) -> PathBuf {
        self.dir.join(IMAGE_FILE)
    }
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub combined_bytes: u64,
    pub tree: TreeNode,
    pub image: RenderedImage,
}

pub struct Pipeline {
    tools: ToolsConfig,
    render: RenderConfig,
    files: WorkFiles,
}

impl Pipeline {
    pub fn new(config: &PhyloConfig, workdir: &Path) -> Self {
        Pipeline {
            tools: config.tools.clone(),
            render: config.render.clone(),
            files: WorkFiles::new(workdir),
        }
    }

    pub fn work_files(&self) -> &WorkFiles {
        &self.files
    }

    pub fn combine<P: AsRef<Path>>(&self, inputs: &[P]) -> Result<u64, PhyloError> {
        let dest = self.files.combined();
        let n_bytes = combine_files(inputs, &dest)?;
        match read_fasta_file(&dest) {
            Ok(records) if records.is_empty() => {
                warn!("{} contains no FastA records", dest.display())
            }
            Ok(records) => info!("{} sequences to align", records.len()),
            Err(e) => warn!("could not re-read {}: {}", dest.display(), e),
        }
        Ok(n_bytes)
    }

    pub fn align(&self) -> Result<(), PhyloError> {
        align_sequences(&self.tools, &self.files.combined(), &self.files.aligned())
    }

    /// Runs the tree tool and returns its raw Newick output.
    pub fn build_tree(&self) -> Result<String, PhyloError> {
        infer_tree(&self.tools, &self.files.aligned())
    }

    /// Saves the raw tree, roots it at its midpoint, resolves polytomies, saves it again and
    /// renders it. Every failure here is a tree-processing error.
    pub fn process_tree(&self, newick: &str) -> Result<(TreeNode, RenderedImage), PhyloError> {
        self.try_process_tree(newick)
            .map_err(PhyloError::into_processing)
    }

    fn try_process_tree(&self, newick: &str) -> Result<(TreeNode, RenderedImage), PhyloError> {
        let tree_path = self.files.tree();
        fs::write(&tree_path, newick)?;
        info!("Phylogenetic tree saved to {}", tree_path.display());

        let text = fs::read_to_string(&tree_path)?;
        let tree = parse_newick(&text)?;
        debug!("parsed tree with {} leaves", tree.num_leaves());

        let mut tree = tree.midpoint_root();
        tree.resolve_polytomies();
        fs::write(&tree_path, tree.to_newick())?;
        info!("Rooted, resolved tree saved to {}", tree_path.display());

        let image = render_tree_png(&tree, &self.render, &self.files.image())?;
        Ok((tree, image))
    }

    /// Combine, align, build, process, display: each step only runs if the previous one worked.
    pub fn run<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        display: &mut dyn TreeDisplay,
    ) -> Result<PipelineOutput, PhyloError> {
        let combined_bytes = self.combine(inputs)?;
        self.align()?;
        let newick = self.build_tree()?;
        let (tree, image) = self.process_tree(&newick)?;
        display
            .show_tree(&image)
            .map_err(PhyloError::into_processing)?;
        Ok(PipelineOutput {
            combined_bytes,
            tree,
            image,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Selecting,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug)]
pub enum RunOutcome {
    NoFiles,
    Success(PipelineOutput),
    Failed(PhyloError),
}

/// Owns the pipeline and drives one run at a time from the user's action back to idle.
pub struct Session {
    pipeline: Pipeline,
    state: RunState,
    trail: Vec<RunState>,
}

impl Session {
    pub fn new(pipeline: Pipeline) -> Self {
        Session {
            pipeline,
            state: RunState::Idle,
            trail: vec![RunState::Idle],
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// States visited during the most recent run, starting and ending with Idle.
    pub fn last_run_states(&self) -> &[RunState] {
        &self.trail
    }

    fn enter(&mut self, state: RunState) {
        debug!("run state: {:?} -> {:?}", self.state, state);
        self.state = state;
        self.trail.push(state);
    }

    pub fn run(
        &mut self,
        selector: &mut dyn FileSelector,
        notifier: &mut dyn Notifier,
        display: &mut dyn TreeDisplay,
    ) -> RunOutcome {
        self.trail = vec![self.state];
        self.enter(RunState::Selecting);
        let files = selector.select_files();
        if files.is_empty() {
            warn!("no files selected");
            notifier.warning(NO_FILES_TITLE, NO_FILES_MESSAGE);
            self.enter(RunState::Idle);
            return RunOutcome::NoFiles;
        }
        info!("{} file(s) selected", files.len());

        self.enter(RunState::Running);
        let outcome = match self.pipeline.run(&files, display) {
            Ok(output) => {
                self.enter(RunState::Succeeded);
                info!("Final tree:\n{}", output.tree.text_preview());
                notifier.info(SUCCESS_TITLE, SUCCESS_MESSAGE);
                RunOutcome::Success(output)
            }
            Err(e) => {
                self.enter(RunState::Failed);
                error!("{}", e);
                notifier.error(ERROR_TITLE, &format!("An error occurred: {}", e));
                RunOutcome::Failed(e)
            }
        };
        self.enter(RunState::Idle);
        outcome
    }
}
