use client_core::{FormView, NoticeSeverity, PostCard, PostForm, PostRow, UiAction, View};
use eframe::egui;

use crate::backend_bridge::BackendBridge;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusBannerSeverity {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StatusBanner {
    severity: StatusBannerSeverity,
    message: String,
}

impl StatusBanner {
    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: StatusBannerSeverity::Error,
            message: message.into(),
        }
    }
}

pub struct BlogApp {
    bridge: BackendBridge,
    title: String,
    /// Last view composed by the controller; replaced after every action.
    view: Option<View>,
    /// Set when the active screen could not be loaded from the store.
    load_error: Option<StatusBanner>,
}

impl BlogApp {
    pub fn new(bridge: BackendBridge, title: impl Into<String>) -> Self {
        let mut app = Self {
            bridge,
            title: title.into(),
            view: None,
            load_error: None,
        };
        app.refresh_view();
        app
    }

    fn apply(&mut self, action: UiAction) {
        if let Ok(screen) = self.bridge.dispatch(action) {
            tracing::debug!(action = action.name(), screen = %screen, "screen updated");
        }
        self.refresh_view();
    }

    fn refresh_view(&mut self) {
        match self.bridge.render() {
            Ok(view) => {
                self.view = Some(view);
                self.load_error = None;
            }
            Err(err) => {
                tracing::error!(error = %err, screen = %self.bridge.screen(), "failed to load screen");
                self.load_error = Some(StatusBanner::error(format!(
                    "Could not load posts: {err}"
                )));
            }
        }
    }

    fn current_banner(&self) -> Option<StatusBanner> {
        if let Some(banner) = &self.load_error {
            return Some(banner.clone());
        }
        self.bridge.notice().map(|notice| StatusBanner {
            severity: match notice.severity {
                NoticeSeverity::Info => StatusBannerSeverity::Info,
                NoticeSeverity::Error => StatusBannerSeverity::Error,
            },
            message: notice.message.clone(),
        })
    }

    fn show_navbar(&self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        egui::TopBottomPanel::top("blog_navbar").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                ui.heading(&self.title);
                ui.add_space(16.0);
                if ui.button("Home").clicked() {
                    actions.push(UiAction::GoHome);
                }
                if ui.button("Create post").clicked() {
                    actions.push(UiAction::GoCreate);
                }
                if ui.button("My posts").clicked() {
                    actions.push(UiAction::GoList);
                }
            });
            ui.add_space(6.0);
        });
    }

    fn show_status_banner(&mut self, ui: &mut egui::Ui) {
        let Some(banner) = self.current_banner() else {
            return;
        };
        let (fill, stroke) = match banner.severity {
            StatusBannerSeverity::Error => (
                egui::Color32::from_rgb(111, 53, 53),
                egui::Stroke::new(1.0, egui::Color32::from_rgb(175, 96, 96)),
            ),
            StatusBannerSeverity::Info => (
                egui::Color32::from_rgb(45, 90, 62),
                egui::Stroke::new(1.0, egui::Color32::from_rgb(88, 150, 108)),
            ),
        };

        egui::Frame::NONE
            .fill(fill)
            .stroke(stroke)
            .corner_radius(8.0)
            .inner_margin(egui::Margin::symmetric(10, 8))
            .show(ui, |ui| {
                ui.horizontal_wrapped(|ui| {
                    ui.label(egui::RichText::new(&banner.message).color(egui::Color32::WHITE));
                    if self.load_error.is_some() {
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("Dismiss").clicked() {
                                self.load_error = None;
                            }
                        });
                    }
                });
            });
        ui.add_space(8.0);
    }

    fn show_screen(&mut self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        let Self { bridge, view, .. } = self;
        let Some(view) = view.as_ref() else {
            return;
        };

        ui.heading(view.heading());
        ui.add_space(10.0);

        match view {
            View::Home { cards } => {
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        if cards.is_empty() {
                            ui.weak("No posts yet.");
                        }
                        for card in cards {
                            ui.group(|ui| show_card(ui, card));
                            ui.add_space(8.0);
                        }
                    });
            }
            View::Form(form_view) => show_form(ui, form_view, bridge.form_mut(), actions),
            View::ListOwnedPosts { rows } => {
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        if rows.is_empty() {
                            ui.weak("You have not published anything yet.");
                        }
                        for row in rows {
                            ui.group(|ui| show_row(ui, row, actions));
                            ui.add_space(8.0);
                        }
                    });
            }
        }
    }
}

fn show_card(ui: &mut egui::Ui, card: &PostCard) {
    ui.set_width(ui.available_width());
    ui.label(egui::RichText::new(&card.title).strong().size(16.0));
    let byline = match &card.author {
        Some(author) => format!("By {author} • {}", card.created_label),
        None => card.created_label.clone(),
    };
    ui.weak(byline);
    if !card.tags.is_empty() {
        ui.horizontal_wrapped(|ui| {
            for tag in &card.tags {
                ui.small(format!("#{tag}"));
            }
        });
    }
    ui.add_space(4.0);
    ui.label(&card.body);
}

fn show_row(ui: &mut egui::Ui, row: &PostRow, actions: &mut Vec<UiAction>) {
    show_card(ui, &row.card);
    ui.add_space(4.0);
    ui.horizontal(|ui| {
        if ui.button("Edit").clicked() {
            actions.push(row.edit);
        }
        if ui.button("Delete").clicked() {
            actions.push(row.delete);
        }
    });
}

fn show_form(
    ui: &mut egui::Ui,
    form_view: &FormView,
    form: &mut PostForm,
    actions: &mut Vec<UiAction>,
) {
    ui.label("Title");
    ui.add(
        egui::TextEdit::singleline(&mut form.title)
            .hint_text("Title")
            .desired_width(f32::INFINITY),
    );
    if form_view.show_tags {
        ui.label("Tags");
        ui.add(
            egui::TextEdit::singleline(&mut form.tags)
                .hint_text("Comma separated")
                .desired_width(f32::INFINITY),
        );
    }
    ui.label("Content");
    ui.add(
        egui::TextEdit::multiline(&mut form.content)
            .desired_rows(12)
            .desired_width(f32::INFINITY),
    );
    ui.add_space(8.0);
    if ui.button(form_view.submit_label).clicked() {
        actions.push(form_view.submit);
    }
}

impl eframe::App for BlogApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut actions = Vec::new();

        self.show_navbar(ctx, &mut actions);
        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_status_banner(ui);
            self.show_screen(ui, &mut actions);
        });

        for action in actions {
            self.apply(action);
        }
    }
}
