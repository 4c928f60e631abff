use super::ActionProgress;
use super::SigapUploader;
use crate::catalog::FileTypeCatalog;
use crate::config::UploaderPreset;
use crate::upload::{ItemEdit, ItemId, ItemState, StagedUploadItem};
use crate::utils::file_size::FileSizeUtils;
use eframe::egui::{self, Align, Color32, RichText};

const ACCENT: Color32 = Color32::from_rgb(161, 89, 225);
const ERROR: Color32 = Color32::from_rgb(220, 50, 50);
const SUCCESS: Color32 = Color32::from_rgb(0, 180, 0);
const MUTED: Color32 = Color32::from_rgb(150, 150, 150);
const PREVIEW_SIZE: f32 = 48.0;

enum RowAction {
    Edit(ItemId, ItemEdit),
    Remove(ItemId),
}

impl SigapUploader {
    pub fn render(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let total_height = ui.available_height();
            let footer_height = 40.0;
            let footer_margin = 15.0;
            let content_height = total_height - footer_height - footer_margin;

            egui::ScrollArea::vertical()
                .max_height(content_height)
                .show(ui, |ui| {
                    ui.add_space(20.0);
                    ui.vertical_centered(|ui| {
                        let (heading, subject) = match self.config.uploader.preset {
                            UploaderPreset::Documents => ("SIGAP Document Uploader", "Documents"),
                            UploaderPreset::ProfilePhoto => ("SIGAP Profile Photo", "Profile photo"),
                        };
                        ui.heading(heading);
                        ui.add_space(5.0);
                        if let Some(persona_id) = self.config.uploader.persona_id {
                            ui.label(
                                RichText::new(format!("{} for persona #{}", subject, persona_id))
                                    .color(ui.visuals().text_color().gamma_multiply(0.7)),
                            );
                        }
                    });

                    ui.add_space(20.0);

                    if self.state.loading_catalog {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label("Loading file types...");
                        });
                        return;
                    }
                    if let Some(error) = self.state.catalog_error.clone() {
                        ui.colored_label(ERROR, format!("Could not load file types: {}", error));
                        if ui.button("🔄 Retry").clicked() {
                            self.load_catalog(ctx.clone());
                        }
                        return;
                    }

                    self.render_drop_zone(ui);
                    ui.add_space(10.0);
                    self.render_messages(ui);
                    self.render_items(ui, ctx);
                    ui.add_space(20.0);
                    self.render_actions(ui, ctx);
                    ui.add_space(20.0);

                    if !matches!(self.state.progress, ActionProgress::NotStarted) {
                        ui.group(|ui| {
                            let progress_bar =
                                egui::ProgressBar::new(self.state.get_progress_percentage())
                                    .show_percentage()
                                    .animate(false)
                                    .fill(ACCENT);
                            ui.add(progress_bar);
                            ui.label(self.state.get_status_text());
                            if let Some(message) = &self.state.server_message {
                                ui.label(RichText::new(message).color(MUTED));
                            }
                        });
                    }

                    ui.add_space(20.0);
                });

            ui.with_layout(egui::Layout::bottom_up(Align::Center), |ui| {
                ui.add_space(footer_margin);
                self.render_footer(ui);
            });
        });
    }

    fn render_drop_zone(&mut self, ui: &mut egui::Ui) {
        let enabled = self.drop_surface.is_enabled();
        let (count, max_files) = self
            .session
            .as_ref()
            .map(|s| (s.items().len(), s.max_files()))
            .unwrap_or((0, 0));

        let stroke_color = if self.drop_surface.is_hovering() {
            ACCENT
        } else {
            ui.visuals().widgets.noninteractive.bg_stroke.color
        };

        let response = ui
            .add_enabled_ui(enabled, |ui| {
                egui::Frame::group(ui.style())
                    .stroke(egui::Stroke::new(1.5, stroke_color))
                    .show(ui, |ui| {
                        ui.set_width(ui.available_width());
                        ui.vertical_centered(|ui| {
                            ui.add_space(16.0);
                            ui.label(RichText::new("📁 Drop files here or click to browse").size(16.0));
                            ui.add_space(4.0);
                            ui.label(
                                RichText::new(format!(
                                    "Up to {} files, {} MB each ({}/{} selected)",
                                    max_files,
                                    self.config.uploader.max_file_size_mb,
                                    count,
                                    max_files
                                ))
                                .color(MUTED),
                            );
                            ui.add_space(16.0);
                        });
                    })
                    .response
                    .interact(egui::Sense::click())
            })
            .inner;

        if enabled && response.clicked() {
            let files = self.drop_surface.pick_files();
            self.add_files(files);
        }
    }

    fn render_messages(&mut self, ui: &mut egui::Ui) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.messages().is_empty() {
            return;
        }

        let mut dismiss = false;
        egui::Frame::none()
            .fill(ui.style().visuals.extreme_bg_color)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.vertical(|ui| {
                        for message in session.messages() {
                            ui.colored_label(ERROR, format!("❌ {}", message));
                        }
                    });
                    ui.with_layout(egui::Layout::right_to_left(Align::Min), |ui| {
                        dismiss = ui.small_button("✖").clicked();
                    });
                });
            });
        if dismiss {
            session.dismiss_messages();
        }
        ui.add_space(10.0);
    }

    fn render_items(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.items().is_empty() {
            return;
        }

        let locked = session.is_submitting();
        let mut actions = Vec::new();

        ui.group(|ui| {
            for item in session.items() {
                if let Some(preview) = &item.preview {
                    if let Some(bytes) = &preview.bytes {
                        if self.state.registered_previews.insert(preview.uri.clone()) {
                            ctx.include_bytes(preview.uri.clone(), bytes.clone());
                        }
                    }
                }
                ui.add_enabled_ui(!locked, |ui| {
                    render_item_row(ui, item, session.catalog(), &mut actions);
                });
                ui.separator();
            }
        });

        let Some(session) = self.session.as_mut() else {
            return;
        };
        for action in actions {
            let result = match action {
                RowAction::Edit(id, edit) => session.update(&id, edit),
                RowAction::Remove(id) => session.remove(&id),
            };
            if let Err(e) = result {
                tracing::debug!("edit refused: {}", e);
            }
        }
    }

    fn render_actions(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let (submitting, has_items) = self
            .session
            .as_ref()
            .map(|s| (s.is_submitting(), !s.items().is_empty()))
            .unwrap_or((false, false));

        ui.vertical_centered(|ui| {
            ui.add_enabled_ui(!submitting, |ui| {
                let label = if submitting {
                    "⏳ Uploading..."
                } else {
                    "📤 Upload Files"
                };
                let button = egui::Button::new(label).min_size(egui::vec2(200.0, 40.0));
                if ui.add(button).clicked() {
                    self.start_upload(ctx);
                }
            });

            ui.add_space(5.0);
            ui.add_enabled_ui(!submitting && has_items, |ui| {
                if ui.button("🗑 Clear All").clicked() {
                    self.clear_all();
                }
            });
        });
    }

    fn render_footer(&self, ui: &mut egui::Ui) {
        let footer_width = 200.0;
        let indent = (ui.available_width() - footer_width) / 2.0;

        ui.horizontal(|ui| {
            ui.add_space(indent);
            ui.scope(|ui| {
                ui.set_width(footer_width);
                ui.horizontal_centered(|ui| {
                    ui.label("Sending to");
                    ui.colored_label(ACCENT, self.client.base_url());
                });
            });
        });
    }
}

fn render_item_row(
    ui: &mut egui::Ui,
    item: &StagedUploadItem,
    catalog: &FileTypeCatalog,
    actions: &mut Vec<RowAction>,
) {
    ui.horizontal(|ui| {
        match &item.preview {
            Some(preview) => {
                ui.add(
                    egui::Image::from_uri(preview.uri.clone())
                        .fit_to_exact_size(egui::vec2(PREVIEW_SIZE, PREVIEW_SIZE)),
                );
            }
            None => {
                ui.add_sized([PREVIEW_SIZE, PREVIEW_SIZE], egui::Label::new("📄"));
            }
        }

        ui.vertical(|ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new(&item.file.name).strong());
                ui.label(
                    RichText::new(FileSizeUtils::format_size(item.file.size_bytes)).color(MUTED),
                );
                render_state_badge(ui, &item.state);
            });

            ui.horizontal(|ui| {
                let selected_text = item
                    .assigned_type_id
                    .map(|id| catalog.name_of(id))
                    .unwrap_or_else(|| "Select a type...".to_string());
                let mut selected = item.assigned_type_id;
                egui::ComboBox::from_id_source(("file_type", item.id.as_str()))
                    .selected_text(selected_text)
                    .width(200.0)
                    .show_ui(ui, |ui| {
                        for file_type in catalog.active() {
                            ui.selectable_value(
                                &mut selected,
                                Some(file_type.id),
                                file_type.name.as_str(),
                            );
                        }
                    });
                if selected != item.assigned_type_id {
                    actions.push(RowAction::Edit(item.id.clone(), ItemEdit::AssignType(selected)));
                }

                let mut description = item.description.clone();
                let response = ui.add(
                    egui::TextEdit::singleline(&mut description)
                        .hint_text(item.file.name.as_str())
                        .desired_width(220.0),
                );
                if response.changed() {
                    actions.push(RowAction::Edit(
                        item.id.clone(),
                        ItemEdit::Description(description),
                    ));
                }

                if ui.button("🗑").on_hover_text("Remove").clicked() {
                    actions.push(RowAction::Remove(item.id.clone()));
                }
            });

            if let Some(detail) = item.error_detail() {
                ui.colored_label(ERROR, detail);
            }
        });
    });
}

fn render_state_badge(ui: &mut egui::Ui, state: &ItemState) {
    match state {
        ItemState::Pending => {}
        ItemState::Uploading => {
            ui.label("⏳");
        }
        ItemState::Succeeded => {
            ui.colored_label(SUCCESS, "✅");
        }
        ItemState::Failed(_) => {
            ui.colored_label(ERROR, "❌");
        }
    }
}
