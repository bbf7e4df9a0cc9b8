// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier
// Modifications (c) 2026 Peter Carlton

use std::path::{Path, PathBuf};

use log::{debug, info};
use resvg::{tiny_skia, usvg};

use crate::{
    config::{parse_color, RenderConfig, Rgba},
    errors::PhyloError,
    tree::TreeNode,
};

const FONT_SIZE: f64 = 13.0;
const SUPPORT_FONT_SIZE: f64 = 9.0;
// Rough advance of one label character at FONT_SIZE; used to reserve room for labels.
const CHAR_WIDTH: f64 = 7.5;
const MARGIN: f64 = 10.0;
const SCALE_BAR_HEIGHT: f64 = 30.0;

/// Space kept below the tree image for the window's label, button and footer.
pub const WINDOW_PADDING: u32 = 150;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl RenderedImage {
    pub fn window_size(&self) -> (u32, u32) {
        (self.width, self.height + WINDOW_PADDING)
    }
}

pub struct TreeSvg {
    pub svg: String,
    pub width: u32,
    pub height: u32,
}

struct Geometry {
    left: f64,
    top: f64,
    row_height: f64,
    // Horizontal pixels per unit of branch length, or per level when there are no lengths.
    scale: f64,
    phylogram: bool,
    show_support: bool,
    line: Rgba,
    label: Rgba,
}

impl Geometry {
    fn x(&self, dist: f64, level: usize) -> f64 {
        if self.phylogram {
            self.left + dist * self.scale
        } else {
            self.left + level as f64 * self.scale
        }
    }

    fn row_y(&self, row: usize) -> f64 {
        self.top + (row as f64 + 0.5) * self.row_height
    }
}

fn height_in_edges(node: &TreeNode) -> usize {
    node.children
        .iter()
        .map(|c| 1 + height_in_edges(c))
        .max()
        .unwrap_or(0)
}

pub fn tree_to_svg(tree: &TreeNode, style: &RenderConfig) -> Result<TreeSvg, PhyloError> {
    let line = parse_color(&style.line_color)?;
    let label = parse_color(&style.label_color)?;
    let background = parse_color(&style.background)?;

    let names = tree.leaf_names();
    let n_leaves = names.len().max(1);
    let longest = names.iter().map(|n| n.chars().count()).max().unwrap_or(0);
    let width = style.width as f64;
    let label_width = (longest as f64 * CHAR_WIDTH + MARGIN).min(width / 2.0);
    let tree_width = (width - 2.0 * MARGIN - label_width).max(1.0);

    let max_dist = tree.max_root_to_tip();
    let phylogram = max_dist > 0.0;
    let scale = if phylogram {
        tree_width / max_dist
    } else {
        tree_width / height_in_edges(tree).max(1) as f64
    };
    let bottom = if phylogram {
        SCALE_BAR_HEIGHT
    } else {
        MARGIN
    };
    let height = (MARGIN + n_leaves as f64 * style.row_height as f64 + bottom).ceil();

    let geom = Geometry {
        left: MARGIN,
        top: MARGIN,
        row_height: style.row_height as f64,
        scale,
        phylogram,
        show_support: style.show_support,
        line,
        label,
    };

    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" viewBox=\"0 0 {} {}\">\n",
        width, height, width, height
    ));
    out.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\" fill-opacity=\"{:.3}\"/>\n",
        background.svg_color(),
        background.svg_opacity()
    ));
    out.push_str(&format!(
        "<g stroke=\"{}\" stroke-opacity=\"{:.3}\" stroke-width=\"1.5\" stroke-linecap=\"square\">\n",
        line.svg_color(),
        line.svg_opacity()
    ));
    let mut labels = String::new();
    let mut next_row = 0;
    draw_node(tree, 0.0, 0, &geom, &mut next_row, &mut out, &mut labels);
    out.push_str("</g>\n");

    out.push_str(&format!(
        "<g font-family=\"sans-serif\" fill=\"{}\" fill-opacity=\"{:.3}\">\n",
        label.svg_color(),
        label.svg_opacity()
    ));
    out.push_str(&labels);
    out.push_str("</g>\n");

    if phylogram {
        out.push_str(&scale_bar(max_dist, &geom, height));
    }
    out.push_str("</svg>\n");

    debug!(
        "tree SVG: {} leaves, {}x{} px, phylogram: {}",
        n_leaves, width, height, phylogram
    );
    Ok(TreeSvg {
        svg: out,
        width: width as u32,
        height: height as u32,
    })
}

// Draws the node's subtree and returns the node's y coordinate.
fn draw_node(
    node: &TreeNode,
    dist: f64,
    level: usize,
    geom: &Geometry,
    next_row: &mut usize,
    lines: &mut String,
    labels: &mut String,
) -> f64 {
    let x = geom.x(dist, level);
    if node.is_leaf() {
        let y = geom.row_y(*next_row);
        *next_row += 1;
        if let Some(name) = &node.name {
            labels.push_str(&format!(
                "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"{}\">{}</text>\n",
                x + 4.0,
                y + FONT_SIZE * 0.35,
                FONT_SIZE,
                escape_svg_text(name)
            ));
        }
        return y;
    }

    let mut ys = Vec::with_capacity(node.children.len());
    for child in &node.children {
        let child_dist = dist + child.length.unwrap_or(0.0);
        let cy = draw_node(child, child_dist, level + 1, geom, next_row, lines, labels);
        let cx = geom.x(child_dist, level + 1);
        lines.push_str(&format!(
            "<line x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\"/>\n",
            x, cy, cx, cy
        ));
        ys.push(cy);
    }
    let y_top = ys.iter().copied().fold(f64::INFINITY, f64::min);
    let y_bottom = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    lines.push_str(&format!(
        "<line x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\"/>\n",
        x, y_top, x, y_bottom
    ));
    let y = (y_top + y_bottom) / 2.0;

    if geom.show_support {
        if let Some(name) = &node.name {
            labels.push_str(&format!(
                "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"{}\" fill=\"{}\">{}</text>\n",
                x + 3.0,
                y - 3.0,
                SUPPORT_FONT_SIZE,
                geom.label.svg_color(),
                escape_svg_text(name)
            ));
        }
    }
    y
}

// A bar of "round" length (1, 2 or 5 times a power of ten) about a fifth of the tree depth.
fn scale_bar(max_dist: f64, geom: &Geometry, height: f64) -> String {
    let raw = max_dist / 5.0;
    let exp = raw.log10().floor() as i32;
    let unit = 10f64.powi(exp);
    let nice = [5.0, 2.0, 1.0]
        .iter()
        .map(|m| m * unit)
        .find(|v| *v <= raw)
        .unwrap_or(unit);
    let decimals = (-exp).max(0) as usize;
    let x0 = geom.left;
    let x1 = geom.left + nice * geom.scale;
    let y = height - SCALE_BAR_HEIGHT / 2.0;
    format!(
        "<g>\n<line x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" stroke=\"{}\" stroke-width=\"1.5\"/>\n\
         <text x=\"{:.1}\" y=\"{:.1}\" font-family=\"sans-serif\" font-size=\"{}\" fill=\"{}\">{:.*}</text>\n</g>\n",
        x0,
        y,
        x1,
        y,
        geom.line.svg_color(),
        x1 + 5.0,
        y + SUPPORT_FONT_SIZE * 0.35,
        SUPPORT_FONT_SIZE,
        geom.label.svg_color(),
        decimals,
        nice
    )
}

fn escape_svg_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn rasterize_svg(svg: &str) -> Result<tiny_skia::Pixmap, PhyloError> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    let tree = usvg::Tree::from_str(svg, &opt)
        .map_err(|e| PhyloError::Format(format!("SVG parse error: {}", e)))?;
    let size = tree.size().to_int_size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height()).ok_or_else(|| {
        PhyloError::Format(format!(
            "Cannot allocate a {}x{} image",
            size.width(),
            size.height()
        ))
    })?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());
    Ok(pixmap)
}

/// Lays the tree out, rasterises it and writes a PNG to `path`.
pub fn render_tree_png(
    tree: &TreeNode,
    style: &RenderConfig,
    path: &Path,
) -> Result<RenderedImage, PhyloError> {
    let svg = tree_to_svg(tree, style)?;
    let pixmap = rasterize_svg(&svg.svg)?;
    pixmap
        .save_png(path)
        .map_err(|e| PhyloError::Format(format!("Cannot write {}: {}", path.display(), e)))?;
    info!(
        "Rendered tree to {} ({}x{})",
        path.display(),
        pixmap.width(),
        pixmap.height()
    );
    Ok(RenderedImage {
        path: path.to_path_buf(),
        width: pixmap.width(),
        height: pixmap.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::parse_newick;

    #[test]
    fn svg_has_one_label_per_leaf() {
        let tree = parse_newick("((A:1,B:2):0.5,C:3);").unwrap();
        let svg = tree_to_svg(&tree, &RenderConfig::default()).unwrap();
        assert_eq!(svg.svg.matches("<text").count(), 3 + 1); // leaves + scale bar
        assert!(svg.svg.contains(">A</text>"));
        assert_eq!(svg.width, 800);
    }

    #[test]
    fn height_grows_with_leaves() {
        let style = RenderConfig::default();
        let small = tree_to_svg(&parse_newick("(A:1,B:1);").unwrap(), &style).unwrap();
        let big = tree_to_svg(&parse_newick("(A:1,B:1,C:1,D:1);").unwrap(), &style).unwrap();
        assert_eq!(big.height - small.height, 2 * style.row_height);
    }

    #[test]
    fn labels_are_escaped() {
        let tree = TreeNode {
            name: None,
            length: None,
            children: vec![
                TreeNode::leaf("a<b>&c", Some(1.0)),
                TreeNode::leaf("d", Some(1.0)),
            ],
        };
        let svg = tree_to_svg(&tree, &RenderConfig::default()).unwrap();
        assert!(svg.svg.contains("a&lt;b&gt;&amp;c"));
    }

    #[test]
    fn cladogram_without_lengths() {
        let tree = parse_newick("(A,(B,C));").unwrap();
        let svg = tree_to_svg(&tree, &RenderConfig::default()).unwrap();
        // no scale bar without branch lengths
        assert_eq!(svg.svg.matches("<text").count(), 3);
    }

    #[test]
    fn support_labels_are_optional() {
        let tree = parse_newick("((A:1,B:1)0.97:1,C:2);").unwrap();
        let style = RenderConfig {
            show_support: true,
            ..RenderConfig::default()
        };
        let svg = tree_to_svg(&tree, &style).unwrap();
        assert!(svg.svg.contains(">0.97</text>"));
        let plain = tree_to_svg(&tree, &RenderConfig::default()).unwrap();
        assert!(!plain.svg.contains(">0.97</text>"));
    }

    #[test]
    fn png_matches_layout_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree_image.png");
        let tree = parse_newick("((A:0.1,B:0.2):0.05,(C:0.3,D:0.1):0.02);").unwrap();
        let style = RenderConfig::default();
        let image = render_tree_png(&tree, &style, &path).unwrap();
        let svg = tree_to_svg(&tree, &style).unwrap();
        assert_eq!((image.width, image.height), (svg.width, svg.height));

        let reloaded = tiny_skia::Pixmap::load_png(&path).unwrap();
        assert_eq!(reloaded.width(), image.width);
        assert_eq!(reloaded.height(), image.height);
        assert_eq!(
            image.window_size(),
            (image.width, image.height + WINDOW_PADDING)
        );
    }
}
