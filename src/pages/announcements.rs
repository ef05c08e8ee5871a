use tracing::{error, info, instrument};

use super::{LoadState, PageContext, LOAD_FAILED};
use crate::backend::SortOrder;
use crate::model::{Announcement, Status};
use crate::view::{self, Route};

pub const NOTHING_FOUND: &str = "Объявления не найдены.";

/// Every published announcement, newest first, with a marker map.
#[derive(Debug, Default)]
pub struct AnnouncementsPage {
    pub items: LoadState<Vec<Announcement>>,
}

impl AnnouncementsPage {
    #[instrument(skip_all)]
    pub async fn mount(&mut self, ctx: &PageContext) {
        self.items = LoadState::Loading;
        self.items = match ctx
            .backend
            .list_announcements(Status::Published, SortOrder::Descending, None)
            .await
        {
            Ok(rows) => {
                info!(count = rows.len(), "loaded announcements");
                LoadState::Loaded(rows)
            }
            Err(err) => {
                error!(?err, "error fetching announcements");
                LoadState::Error(err.to_string())
            }
        };
    }

    /// Rows safe to show publicly.
    pub fn visible(&self) -> Vec<&Announcement> {
        self.items
            .loaded()
            .map(|rows| rows.iter().filter(|a| a.status == Status::Published).collect())
            .unwrap_or_default()
    }

    pub fn render(&self, ctx: &PageContext) -> String {
        let visible: Vec<Announcement> = self.visible().into_iter().cloned().collect();
        let mut body = view::header();
        body.push_str("<div class=\"container\"><h2>Объявления</h2>");
        if self.items.is_loading() {
            body.push_str(&view::preloader());
        } else if let Some(message) = self.items.error() {
            body.push_str(&view::error_notice(LOAD_FAILED, message));
        } else if !visible.is_empty() {
            let markers = view::map_markers(&visible);
            body.push_str(&format!(
                "<div class=\"card\"><h3>Карта объявлений</h3>{}</div>",
                view::map(None, &markers)
            ));
        } else {
            body.push_str(&format!("<p>{}</p>", NOTHING_FOUND));
        }
        for a in &visible {
            body.push_str(&view::announcement_card(a));
        }
        body.push_str("</div>");
        body.push_str(&view::footer_nav(Route::Announcements, ctx.show_admin()));
        body
    }
}
