// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Peter Carlton
// Modifications (c) 2026 Peter Carlton

use std::{collections::HashMap, fmt::Write};

use itertools::Itertools;

use crate::errors::PhyloError;

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub name: Option<String>,
    pub length: Option<f64>,
    pub children: Vec<TreeNode>,
}

/// Deepest parenthesis nesting accepted by `parse_newick`. Tree walks are recursive, so
/// this keeps them well inside the main thread's stack.
pub const MAX_NEWICK_DEPTH: usize = 1000;

#[derive(Clone, Copy)]
struct NodeInfo {
    depth: usize,
    y: usize,
}

pub fn parse_newick(input: &str) -> Result<TreeNode, PhyloError> {
    let mut parser = Parser::new(input);
    parser.skip_whitespace();
    if parser.peek().is_none() {
        return Err(PhyloError::Format(String::from("Empty Newick tree")));
    }
    let node = parser.parse_node()?;
    parser.skip_whitespace();
    if parser.peek() == Some(';') {
        parser.pos += 1;
    }
    parser.skip_whitespace();
    if parser.peek().is_some() {
        return Err(PhyloError::Format(format!(
            "Unexpected text after tree at position {}",
            parser.pos
        )));
    }
    Ok(node)
}

impl TreeNode {
    pub fn leaf(name: &str, length: Option<f64>) -> Self {
        TreeNode {
            name: Some(name.to_string()),
            length,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn num_leaves(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children.iter().map(TreeNode::num_leaves).sum()
        }
    }

    /// Leaf names, top to bottom. Unnamed leaves yield "".
    pub fn leaf_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_leaf_names(&mut names);
        names
    }

    fn collect_leaf_names(&self, names: &mut Vec<String>) {
        if self.is_leaf() {
            names.push(self.name.clone().unwrap_or_default());
        } else {
            for child in &self.children {
                child.collect_leaf_names(names);
            }
        }
    }

    fn has_unary_node(&self) -> bool {
        self.children.len() == 1 || self.children.iter().any(TreeNode::has_unary_node)
    }

    pub fn is_binary(&self) -> bool {
        self.children.len() <= 2 && self.children.iter().all(TreeNode::is_binary)
    }

    /// Largest distance from this node to any leaf below it. Missing lengths count as zero.
    pub fn max_root_to_tip(&self) -> f64 {
        self.children
            .iter()
            .map(|c| c.length.unwrap_or(0.0) + c.max_root_to_tip())
            .fold(0.0, f64::max)
    }

    pub fn to_newick(&self) -> String {
        let mut out = String::new();
        self.write_newick(&mut out);
        out.push(';');
        out
    }

    fn write_newick(&self, out: &mut String) {
        if !self.children.is_empty() {
            out.push('(');
            for (i, child) in self.children.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                child.write_newick(out);
            }
            out.push(')');
        }
        if let Some(name) = &self.name {
            out.push_str(&quote_label(name));
        }
        if let Some(len) = self.length {
            // Writing to a String cannot fail.
            let _ = write!(out, ":{}", len);
        }
    }

    /// Re-roots the tree at the midpoint of its longest leaf-to-leaf path. A tree whose root
    /// already sits there is returned as is.
    pub fn midpoint_root(&self) -> TreeNode {
        let mut graph = Graph::from_tree(self);
        graph.drop_root();
        graph.splice_degree_two();
        let leaves = graph.leaves();
        if leaves.len() < 2 {
            return self.clone();
        }

        let (d0, _) = graph.distances_from(leaves[0]);
        let a = farthest(&leaves, &d0);
        let (da, prev) = graph.distances_from(a);
        let b = farthest(&leaves, &da);

        let mut path = vec![b];
        let mut cur = b;
        while let Some(p) = prev[cur] {
            path.push(p);
            cur = p;
        }
        path.reverse();
        if path.len() < 2 {
            // All branch lengths are zero: there is no midpoint to move to.
            return self.clone();
        }

        let half = da[b] / 2.0;
        let tol = 1e-9 * da[b].max(1.0);
        // The midpoint is the only point whose farthest leaf is half the diameter away.
        if self.children.len() >= 2
            && !self.has_unary_node()
            && (self.max_root_to_tip() - half).abs() <= tol
        {
            return self.clone();
        }
        let mut i = 0;
        while i + 2 < path.len() && da[path[i + 1]] < half - tol {
            i += 1;
        }
        let (u, v) = (path[i], path[i + 1]);

        let root = if half - da[u] <= tol && graph.degree(u) > 1 {
            u
        } else if (da[v] - half).abs() <= tol && graph.degree(v) > 1 {
            v
        } else {
            let offset = (half - da[u]).max(0.0);
            let rest = (da[v] - da[u] - offset).max(0.0);
            graph.split_edge(u, v, offset, rest)
        };

        graph.build(root, None, None)
    }

    /// Turns every node with more than two children into a ladder of binary nodes joined by
    /// zero-length branches. The first child stays attached to the original node.
    pub fn resolve_polytomies(&mut self) {
        for child in &mut self.children {
            child.resolve_polytomies();
        }
        if self.children.len() > 2 {
            let rest = self.children.split_off(1);
            self.children.push(ladder(rest));
        }
    }

    /// Box-drawing picture of the tree with leaf names, one leaf per line.
    pub fn text_preview(&self) -> String {
        let (lines, order) = tree_lines_and_order(self);
        lines
            .iter()
            .zip(order.iter())
            .map(|(line, name)| format!("{} {}", line, name))
            .join("\n")
    }
}

fn ladder(mut nodes: Vec<TreeNode>) -> TreeNode {
    if nodes.len() > 2 {
        let rest = nodes.split_off(1);
        nodes.push(ladder(rest));
    }
    TreeNode {
        name: None,
        length: Some(0.0),
        children: nodes,
    }
}

fn farthest(leaves: &[usize], dist: &[f64]) -> usize {
    let mut best = leaves[0];
    for &leaf in leaves {
        if dist[leaf] > dist[best] {
            best = leaf;
        }
    }
    best
}

fn quote_label(name: &str) -> String {
    let special = name
        .chars()
        .any(|c| c.is_whitespace() || "(),:;[]'".contains(c));
    if name.is_empty() || special {
        format!("'{}'", name.replace('\'', "''"))
    } else {
        name.to_string()
    }
}

// Unrooted view of a tree, used for re-rooting. Node 0 is the original root.
struct Graph {
    labels: Vec<Option<String>>,
    adj: Vec<Vec<(usize, Option<f64>)>>,
}

impl Graph {
    fn from_tree(root: &TreeNode) -> Self {
        let mut graph = Graph {
            labels: Vec::new(),
            adj: Vec::new(),
        };
        graph.add(root);
        graph
    }

    fn add(&mut self, node: &TreeNode) -> usize {
        let id = self.push_node(node.name.clone());
        for child in &node.children {
            let cid = self.add(child);
            self.connect(id, cid, child.length);
        }
        id
    }

    fn push_node(&mut self, label: Option<String>) -> usize {
        self.labels.push(label);
        self.adj.push(Vec::new());
        self.labels.len() - 1
    }

    fn connect(&mut self, a: usize, b: usize, length: Option<f64>) {
        self.adj[a].push((b, length));
        self.adj[b].push((a, length));
    }

    fn disconnect(&mut self, a: usize, b: usize) -> Option<f64> {
        let length = self.adj[a]
            .iter()
            .find(|(n, _)| *n == b)
            .and_then(|(_, l)| *l);
        self.adj[a].retain(|(n, _)| *n != b);
        self.adj[b].retain(|(n, _)| *n != a);
        length
    }

    fn degree(&self, id: usize) -> usize {
        self.adj[id].len()
    }

    // A root with a single child is not a node of the unrooted tree.
    fn drop_root(&mut self) {
        if let [(only, _)] = self.adj[0].as_slice() {
            let only = *only;
            self.disconnect(0, only);
        }
    }

    // Nodes with exactly two neighbours (an old bifurcating root, unary internal nodes) are
    // replaced by a single branch.
    fn splice_degree_two(&mut self) {
        for id in 0..self.adj.len() {
            if let [(a, la), (b, lb)] = self.adj[id].as_slice() {
                let (a, b) = (*a, *b);
                let joined = match (la, lb) {
                    (None, None) => None,
                    _ => Some(la.unwrap_or(0.0) + lb.unwrap_or(0.0)),
                };
                self.disconnect(id, a);
                self.disconnect(id, b);
                self.connect(a, b, joined);
            }
        }
    }

    fn leaves(&self) -> Vec<usize> {
        (0..self.adj.len()).filter(|&id| self.degree(id) == 1).collect()
    }

    fn distances_from(&self, src: usize) -> (Vec<f64>, Vec<Option<usize>>) {
        let mut dist = vec![0.0; self.adj.len()];
        let mut prev: Vec<Option<usize>> = vec![None; self.adj.len()];
        let mut seen = vec![false; self.adj.len()];
        let mut stack = vec![src];
        seen[src] = true;
        while let Some(id) = stack.pop() {
            for &(n, len) in &self.adj[id] {
                if !seen[n] {
                    seen[n] = true;
                    dist[n] = dist[id] + len.unwrap_or(0.0);
                    prev[n] = Some(id);
                    stack.push(n);
                }
            }
        }
        (dist, prev)
    }

    fn split_edge(&mut self, u: usize, v: usize, to_u: f64, to_v: f64) -> usize {
        self.disconnect(u, v);
        let mid = self.push_node(None);
        self.connect(mid, u, Some(to_u));
        self.connect(mid, v, Some(to_v));
        mid
    }

    fn build(&self, id: usize, parent: Option<usize>, length: Option<f64>) -> TreeNode {
        let children = self.adj[id]
            .iter()
            .filter(|(n, _)| Some(*n) != parent)
            .map(|&(n, len)| self.build(n, Some(id), len))
            .collect();
        TreeNode {
            name: self.labels[id].clone(),
            length,
            children,
        }
    }
}

/// Box-drawing lines (one per leaf) and the leaf names in the same order.
pub fn tree_lines_and_order(root: &TreeNode) -> (Vec<String>, Vec<String>) {
    let root = collapse_unary(root.clone());
    let (node_map, leaves) = assign_rows_and_depths(&root);
    if leaves.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let lines = render_box_tree(&root, &node_map, &leaves);
    let order: Vec<String> = leaves.iter().map(|(_, name)| name.clone()).collect();
    (lines, order)
}

fn collapse_unary(mut node: TreeNode) -> TreeNode {
    while node.children.len() == 1 {
        let mut child = node.children.remove(0);
        if node.name.is_some() && child.name.is_none() {
            child.name = node.name.take();
        }
        node = child;
    }
    if !node.children.is_empty() {
        node.children = node.children.into_iter().map(collapse_unary).collect();
    }
    node
}

fn assign_rows_and_depths(root: &TreeNode) -> (HashMap<usize, NodeInfo>, Vec<(usize, String)>) {
    let mut node_map = HashMap::new();
    let mut leaves = Vec::new();
    let mut next_y = 0;

    fn walk(
        node: &TreeNode,
        depth: usize,
        next_y: &mut usize,
        node_map: &mut HashMap<usize, NodeInfo>,
        leaves: &mut Vec<(usize, String)>,
    ) -> usize {
        if node.children.is_empty() {
            let y = *next_y;
            *next_y += 1;
            node_map.insert(node as *const _ as usize, NodeInfo { depth, y });
            leaves.push((y, node.name.clone().unwrap_or_default()));
            return y;
        }
        let ys: Vec<usize> = node
            .children
            .iter()
            .map(|child| walk(child, depth + 1, next_y, node_map, leaves))
            .collect();
        let y_top = ys.iter().copied().min().unwrap_or(0);
        let y_bottom = ys.iter().copied().max().unwrap_or(0);
        let y = (y_top + y_bottom) / 2;
        node_map.insert(node as *const _ as usize, NodeInfo { depth, y });
        y
    }

    walk(root, 0, &mut next_y, &mut node_map, &mut leaves);
    (node_map, leaves)
}

fn render_box_tree(
    root: &TreeNode,
    node_map: &HashMap<usize, NodeInfo>,
    leaves: &[(usize, String)],
) -> Vec<String> {
    let n_rows = leaves.iter().map(|(y, _)| *y).max().unwrap_or(0) + 1;
    let max_depth = node_map.values().map(|info| info.depth).max().unwrap_or(0);
    let tree_width = max_depth * 2 + 1;
    let mut grid: Vec<Vec<char>> = vec![vec![' '; tree_width]; n_rows];

    fn is_horizontal(ch: char) -> bool {
        ch == '─'
    }

    fn is_vertical(ch: char) -> bool {
        ch == '│'
    }

    fn put(grid: &mut [Vec<char>], y: usize, x: usize, ch: char) {
        if y >= grid.len() || x >= grid[y].len() {
            return;
        }
        let existing = grid[y][x];
        if existing == ' ' {
            grid[y][x] = ch;
            return;
        }
        let junctions = ['┌', '└', '├', '┼'];
        if junctions.contains(&existing) {
            return;
        }
        if junctions.contains(&ch) {
            grid[y][x] = ch;
            return;
        }
        if (is_vertical(existing) && is_horizontal(ch))
            || (is_horizontal(existing) && is_vertical(ch))
        {
            grid[y][x] = '┼';
        }
    }

    fn draw_internal(node: &TreeNode, node_map: &HashMap<usize, NodeInfo>, grid: &mut [Vec<char>]) {
        let info = node_map[&(node as *const _ as usize)];
        if node.children.is_empty() {
            return;
        }
        let x_conn = info.depth * 2 + 1;
        let kid_infos: Vec<NodeInfo> = node
            .children
            .iter()
            .map(|kid| node_map[&(kid as *const _ as usize)])
            .collect();
        let y_top = kid_infos.iter().map(|k| k.y).min().unwrap_or(0);
        let y_bottom = kid_infos.iter().map(|k| k.y).max().unwrap_or(0);

        for y in (y_top + 1)..y_bottom {
            put(grid, y, x_conn, '│');
        }

        for (kid, ki) in node.children.iter().zip(kid_infos.iter()) {
            let y = ki.y;
            let jch = if y == y_top && y != y_bottom {
                '┌'
            } else if y == y_bottom && y != y_top {
                '└'
            } else {
                '├'
            };
            put(grid, y, x_conn, jch);
            for x in (x_conn + 1)..=(ki.depth * 2) {
                put(grid, y, x, '─');
            }
            draw_internal(kid, node_map, grid);
        }
    }

    draw_internal(root, node_map, &mut grid);

    // Extend every leaf's branch to the right edge so names line up.
    for (y, _) in leaves {
        let row = &grid[*y];
        let start = row
            .iter()
            .rposition(|&c| c != ' ')
            .map(|l| l + 1)
            .unwrap_or(0);
        for x in start..tree_width {
            put(&mut grid, *y, x, '─');
        }
    }

    for row in &mut grid {
        for x in 1..row.len() {
            if is_horizontal(row[x - 1]) {
                row[x] = match row[x] {
                    '│' => '┤',
                    '┌' => '┬',
                    '└' => '┴',
                    '├' => '┼',
                    other => other,
                };
            }
        }
    }

    grid.into_iter()
        .map(|row| row.into_iter().collect::<String>().trim_end().to_string())
        .collect()
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    // Whitespace and [bracketed comments] are insignificant outside quoted labels.
    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => self.pos += 1,
                Some('[') => {
                    while let Some(c) = self.peek() {
                        self.pos += 1;
                        if c == ']' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn parse_node(&mut self) -> Result<TreeNode, PhyloError> {
        self.skip_whitespace();
        let children = if self.peek() == Some('(') {
            self.pos += 1;
            self.depth += 1;
            if self.depth > MAX_NEWICK_DEPTH {
                return Err(PhyloError::Format(format!(
                    "Newick tree nested deeper than {} levels",
                    MAX_NEWICK_DEPTH
                )));
            }
            let mut children = Vec::new();
            loop {
                let child = self.parse_node()?;
                children.push(child);
                self.skip_whitespace();
                match self.peek() {
                    Some(',') => {
                        self.pos += 1;
                    }
                    Some(')') => {
                        self.pos += 1;
                        break;
                    }
                    _ => {
                        return Err(PhyloError::Format(String::from("Malformed Newick tree")));
                    }
                }
            }
            self.depth -= 1;
            children
        } else {
            Vec::new()
        };
        let name = self.parse_name_opt()?;
        let length = self.parse_branch_length()?;
        Ok(TreeNode {
            name,
            length,
            children,
        })
    }

    fn parse_name_opt(&mut self) -> Result<Option<String>, PhyloError> {
        self.skip_whitespace();
        match self.peek() {
            Some(':' | ',' | ')' | ';') | None => Ok(None),
            Some('(') => Err(PhyloError::Format(String::from(
                "Unexpected '(' where a label was expected",
            ))),
            Some('\'') => self.parse_quoted_name().map(Some),
            _ => Ok(Some(self.parse_name())),
        }
    }

    fn parse_name(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, ':' | ',' | ')' | '(' | ';' | '[') || c.is_whitespace() {
                break;
            }
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    // Quoted labels keep every character; '' stands for a single quote.
    fn parse_quoted_name(&mut self) -> Result<String, PhyloError> {
        self.pos += 1;
        let mut name = String::new();
        loop {
            match self.peek() {
                Some('\'') => {
                    self.pos += 1;
                    if self.peek() == Some('\'') {
                        name.push('\'');
                        self.pos += 1;
                    } else {
                        return Ok(name);
                    }
                }
                Some(c) => {
                    name.push(c);
                    self.pos += 1;
                }
                None => {
                    return Err(PhyloError::Format(String::from("Unterminated quoted label")));
                }
            }
        }
    }

    fn parse_branch_length(&mut self) -> Result<Option<f64>, PhyloError> {
        self.skip_whitespace();
        if self.peek() != Some(':') {
            return Ok(None);
        }
        self.pos += 1;
        self.skip_whitespace();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, ',' | ')' | ';' | '[') || c.is_whitespace() {
                break;
            }
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(Some)
            .map_err(|_| PhyloError::Format(format!("Bad branch length '{}'", text)))
    }
}
