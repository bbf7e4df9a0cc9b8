// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier
// Modifications (c) 2026 Peter Carlton

pub mod dialogs;
pub mod texture;

use eframe::egui;
use log::{info, warn};

use crate::{
    errors::PhyloError,
    pipeline::{Notifier, Session, TreeDisplay},
    render::RenderedImage,
    ui::dialogs::{NativeFileSelector, NativeNotifier},
};

pub const WINDOW_TITLE: &str = "Phylogenetic Tree Generator";
pub const INITIAL_SIZE: [f32; 2] = [500.0, 500.0];

const HEADING: &str = "Let's make a tree, shall we?!";
const RUN_BUTTON: &str = "Select FASTA Files and Run";
const FOOTER: &str = "Alignments by Clustal Omega, trees by FastTree";
const BACKGROUND_SVG: &str = include_str!("../assets/background.svg");

pub struct TreeApp {
    session: Session,
    background: Option<egui::TextureHandle>,
    tree_texture: Option<egui::TextureHandle>,
    startup_warning: Option<String>,
    torn_down: bool,
}

impl TreeApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        session: Session,
        startup_warning: Option<String>,
    ) -> Self {
        let background = match texture::background_image(BACKGROUND_SVG) {
            Ok(image) => Some(cc.egui_ctx.load_texture(
                "background",
                image,
                egui::TextureOptions::LINEAR,
            )),
            Err(e) => {
                warn!("no background image: {}", e);
                None
            }
        };
        TreeApp {
            session,
            background,
            tree_texture: None,
            startup_warning,
            torn_down: false,
        }
    }

    fn run_pipeline(&mut self, ctx: &egui::Context) {
        let mut region = TreeRegion {
            ctx,
            texture: &mut self.tree_texture,
        };
        // Outcome dialogs are shown by the session itself.
        let _ = self
            .session
            .run(&mut NativeFileSelector, &mut NativeNotifier, &mut region);
    }

    // Release GPU-side images before the window goes away.
    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.tree_texture = None;
        self.background = None;
        self.torn_down = true;
        info!("Window closing; textures released");
    }
}

fn paint_background(ui: &egui::Ui, texture: &egui::TextureHandle) {
    let panel = ui.max_rect();
    let center = egui::pos2(panel.center().x, panel.min.y + panel.height() * 0.6);
    let rect = egui::Rect::from_center_size(center, panel.size() * 0.7);
    let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
    ui.painter()
        .image(texture.id(), rect, uv, egui::Color32::from_white_alpha(90));
}

impl eframe::App for TreeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.viewport().close_requested()) {
            self.teardown();
            return;
        }

        if let Some(msg) = self.startup_warning.take() {
            NativeNotifier.warning("Configuration", &msg);
        }

        egui::TopBottomPanel::bottom("footer").show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.label(egui::RichText::new(FOOTER).small().italics());
            });
        });

        let mut run_clicked = false;
        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(bg) = &self.background {
                paint_background(ui, bg);
            }
            ui.vertical_centered(|ui| {
                ui.add_space(10.0);
                ui.label(egui::RichText::new(HEADING).size(20.0).strong());
                ui.add_space(20.0);
                run_clicked = ui.button(RUN_BUTTON).clicked();
                ui.add_space(10.0);
            });
            if let Some(tex) = &self.tree_texture {
                egui::ScrollArea::both().show(ui, |ui| {
                    ui.image((tex.id(), tex.size_vec2()));
                });
            }
        });

        if run_clicked {
            self.run_pipeline(ctx);
        }
    }
}

// The window's image area, as seen by the pipeline.
struct TreeRegion<'a> {
    ctx: &'a egui::Context,
    texture: &'a mut Option<egui::TextureHandle>,
}

impl TreeDisplay for TreeRegion<'_> {
    fn show_tree(&mut self, image: &RenderedImage) -> Result<(), PhyloError> {
        let color_image = texture::load_png(&image.path)?;
        // Drop the old tree before uploading the new one.
        *self.texture = None;
        *self.texture = Some(self.ctx.load_texture(
            "tree",
            color_image,
            egui::TextureOptions::LINEAR,
        ));

        let (w, h) = image.window_size();
        self.ctx
            .send_viewport_cmd(egui::ViewportCommand::InnerSize(egui::vec2(
                w as f32, h as f32,
            )));
        self.ctx.request_repaint();
        Ok(())
    }
}

pub fn run_gui(session: Session, startup_warning: Option<String>) -> Result<(), PhyloError> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(INITIAL_SIZE)
            .with_title(WINDOW_TITLE),
        ..Default::default()
    };

    eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(move |cc| Ok(Box::new(TreeApp::new(cc, session, startup_warning)))),
    )
    .map_err(|e| PhyloError::Gui(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use resvg::tiny_skia::Pixmap;

    fn show(image: &RenderedImage) -> (Result<(), PhyloError>, bool, Vec<egui::ViewportCommand>) {
        let ctx = egui::Context::default();
        let mut texture = None;
        let mut result = Ok(());
        let output = ctx.run(egui::RawInput::default(), |ctx| {
            let mut region = TreeRegion {
                ctx,
                texture: &mut texture,
            };
            result = region.show_tree(image);
        });
        let commands = output
            .viewport_output
            .get(&egui::ViewportId::ROOT)
            .map(|v| v.commands.clone())
            .unwrap_or_default();
        (result, texture.is_some(), commands)
    }

    fn is_resize(cmd: &egui::ViewportCommand) -> bool {
        matches!(cmd, egui::ViewportCommand::InnerSize(_))
    }

    #[test]
    fn unreadable_image_leaves_window_alone() {
        let dir = tempfile::tempdir().unwrap();
        let image = RenderedImage {
            path: dir.path().join("tree_image.png"),
            width: 300,
            height: 200,
        };
        let (result, has_texture, commands) = show(&image);
        assert!(result.is_err());
        assert!(!has_texture);
        assert!(!commands.iter().any(is_resize));
    }

    #[test]
    fn loaded_image_resizes_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree_image.png");
        Pixmap::new(30, 20).unwrap().save_png(&path).unwrap();
        let image = RenderedImage {
            path,
            width: 30,
            height: 20,
        };
        let (result, has_texture, commands) = show(&image);
        assert!(result.is_ok());
        assert!(has_texture);
        let expected = egui::vec2(30.0, (20 + crate::render::WINDOW_PADDING) as f32);
        assert!(commands
            .iter()
            .any(|c| matches!(c, egui::ViewportCommand::InnerSize(size) if *size == expected)));
    }
}
