// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Peter Carlton

use std::{
    fs,
    path::{Path, PathBuf},
};

use hex_color::HexColor;
use serde::Deserialize;

use crate::errors::PhyloError;

pub const CONFIG_FILE_NAME: &str = ".phylotreeconfig";

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PhyloConfig {
    pub tools: ToolsConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub clustalo_bin_dir: Option<PathBuf>,
    pub clustalo_name: String,
    pub fasttree_bin_dir: Option<PathBuf>,
    pub fasttree_name: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        ToolsConfig {
            clustalo_bin_dir: None,
            clustalo_name: String::from("clustalo"),
            fasttree_bin_dir: None,
            fasttree_name: String::from("FastTree"),
        }
    }
}

impl ToolsConfig {
    pub fn clustalo_path(&self) -> PathBuf {
        tool_path(self.clustalo_bin_dir.as_deref(), &self.clustalo_name)
    }

    pub fn fasttree_path(&self) -> PathBuf {
        tool_path(self.fasttree_bin_dir.as_deref(), &self.fasttree_name)
    }
}

// A bare name is left for the OS to look up on PATH.
fn tool_path(bin_dir: Option<&Path>, name: &str) -> PathBuf {
    match bin_dir {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub row_height: u32,
    pub line_color: String,
    pub label_color: String,
    pub background: String,
    pub show_support: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            width: 800,
            row_height: 24,
            line_color: String::from("#000000"),
            label_color: String::from("#000000"),
            background: String::from("#ffffff"),
            show_support: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub fn svg_color(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn svg_opacity(&self) -> f32 {
        self.a as f32 / 255.0
    }
}

pub fn parse_color(s: &str) -> Result<Rgba, PhyloError> {
    let c = HexColor::parse(s)
        .map_err(|e| PhyloError::Format(format!("Bad colour '{}': {}", s, e)))?;
    Ok(Rgba {
        r: c.r,
        g: c.g,
        b: c.b,
        a: c.a,
    })
}

impl RenderConfig {
    pub fn validate(&self) -> Result<(), PhyloError> {
        if self.width < 100 {
            return Err(PhyloError::Format(format!(
                "render.width must be at least 100 (got {})",
                self.width
            )));
        }
        if self.row_height == 0 {
            return Err(PhyloError::Format(String::from(
                "render.row_height must be positive",
            )));
        }
        parse_color(&self.line_color)?;
        parse_color(&self.label_color)?;
        parse_color(&self.background)?;
        Ok(())
    }
}

impl PhyloConfig {
    pub fn from_file(path: &Path) -> Result<Self, PhyloError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, PhyloError> {
        let cfg: PhyloConfig = serde_json::from_str(text)
            .map_err(|e| PhyloError::Format(format!("Bad config: {}", e)))?;
        cfg.render.validate()?;
        Ok(cfg)
    }
}

pub fn find_phylo_config() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        let path = PathBuf::from(home).join(CONFIG_FILE_NAME);
        if path.exists() {
            return Some(path);
        }
    }
    if let Ok(cwd) = std::env::current_dir() {
        let path = cwd.join(CONFIG_FILE_NAME);
        if path.exists() {
            return Some(path);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_object_gives_defaults() {
        let cfg = PhyloConfig::from_json("{}").unwrap();
        assert_eq!(cfg.tools.clustalo_path(), PathBuf::from("clustalo"));
        assert_eq!(cfg.tools.fasttree_path(), PathBuf::from("FastTree"));
        assert_eq!(cfg.render.width, 800);
        assert!(!cfg.render.show_support);
    }

    #[test]
    fn bin_dirs_are_prefixed() {
        let text = json!({
            "tools": {
                "clustalo_bin_dir": "/opt/clustal/bin",
                "fasttree_bin_dir": "/opt/fasttree",
                "fasttree_name": "fasttree.exe"
            }
        })
        .to_string();
        let cfg = PhyloConfig::from_json(&text).unwrap();
        assert_eq!(
            cfg.tools.clustalo_path(),
            PathBuf::from("/opt/clustal/bin/clustalo")
        );
        assert_eq!(
            cfg.tools.fasttree_path(),
            PathBuf::from("/opt/fasttree/fasttree.exe")
        );
    }

    #[test]
    fn bad_colour_is_rejected() {
        let text = json!({ "render": { "line_color": "not-a-colour" } }).to_string();
        assert!(PhyloConfig::from_json(&text).is_err());
    }

    #[test]
    fn colour_parsing() {
        let c = parse_color("#1a2B3c").unwrap();
        assert_eq!(c.svg_color(), "#1a2b3c");
        assert_eq!(c.a, 255);
    }
}
