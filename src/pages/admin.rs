//! Moderation screen.
//!
//! Access is gated by `app.show_admin_nav` only. That flag is a deploy-time
//! toggle, not authorization: anyone running a build with it enabled can
//! approve or delete announcements. Real access control needs a
//! server-verified identity, which this app does not have.
use tracing::{error, info, instrument, warn};

use super::{failure_message, LoadState, PageContext, SubmitState, LOAD_FAILED};
use crate::backend::{ImageFile, SortOrder};
use crate::model::{Announcement, AnnouncementId, Status};
use crate::view::{self, Route};

pub const NO_ACCESS: &str = "У вас нет доступа к этой странице.";
pub const NOTHING_PENDING: &str = "Нет объявлений, требующих модерации.";
pub const BANNER_TITLE_REQUIRED: &str = "Укажите заголовок баннера.";
pub const BANNER_SAVED: &str = "Banner saved (simulation)";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BannerForm {
    pub title: String,
    pub subtitle: String,
    pub link: String,
    pub image: Option<ImageFile>,
}

#[derive(Debug, Default)]
pub struct AdminPage {
    pub pending: LoadState<Vec<Announcement>>,
    pub banner: BannerForm,
    pub banner_state: SubmitState,
}

impl AdminPage {
    pub fn enabled(ctx: &PageContext) -> bool {
        ctx.show_admin()
    }

    /// Load the moderation queue, oldest first.
    #[instrument(skip_all)]
    pub async fn mount(&mut self, ctx: &PageContext) {
        if !Self::enabled(ctx) {
            return;
        }
        self.pending = LoadState::Loading;
        self.pending = match ctx
            .backend
            .list_announcements(Status::Pending, SortOrder::Ascending, None)
            .await
        {
            Ok(rows) => {
                info!(count = rows.len(), "loaded moderation queue");
                LoadState::Loaded(rows)
            }
            Err(err) => {
                error!(?err, "error fetching pending announcements");
                LoadState::Error(err.to_string())
            }
        };
    }

    /// Publish a pending announcement and drop it from the local queue.
    #[instrument(skip_all, fields(id = %id))]
    pub async fn approve(&mut self, ctx: &PageContext, id: &AnnouncementId) {
        if !Self::enabled(ctx) {
            return;
        }
        match ctx
            .backend
            .set_announcement_status(id, Status::Published)
            .await
        {
            Ok(()) => info!("announcement approved"),
            Err(err) => {
                error!(?err, "approve failed");
                ctx.alert(&failure_message("Не удалось одобрить объявление", &err));
            }
        }
        self.remove_local(id);
    }

    /// Delete a pending announcement outright and drop it from the local queue.
    #[instrument(skip_all, fields(id = %id))]
    pub async fn reject(&mut self, ctx: &PageContext, id: &AnnouncementId) {
        if !Self::enabled(ctx) {
            return;
        }
        match ctx.backend.delete_announcement(id).await {
            Ok(()) => info!("announcement rejected"),
            Err(err) => {
                error!(?err, "reject failed");
                ctx.alert(&failure_message("Не удалось отклонить объявление", &err));
            }
        }
        self.remove_local(id);
    }

    fn remove_local(&mut self, id: &AnnouncementId) {
        if let LoadState::Loaded(rows) = &mut self.pending {
            rows.retain(|a| &a.id != id);
        }
    }

    /// Banner upload is not wired to storage yet; the form is logged and reset.
    #[instrument(skip_all)]
    pub async fn submit_banner(&mut self, ctx: &PageContext) {
        if !Self::enabled(ctx) || self.banner_state.is_submitting() {
            return;
        }
        if self.banner.title.trim().is_empty() {
            ctx.alert(BANNER_TITLE_REQUIRED);
            return;
        }
        self.banner_state = SubmitState::Submitting;
        warn!(
            title = %self.banner.title,
            subtitle = %self.banner.subtitle,
            link = %self.banner.link,
            image = ?self.banner.image.as_ref().map(|f| &f.name),
            "saving banner (simulation)"
        );
        self.banner = BannerForm::default();
        ctx.alert(BANNER_SAVED);
        self.banner_state = SubmitState::Done;
    }

    pub fn render(&self, ctx: &PageContext) -> String {
        let mut body = view::header();
        body.push_str("<div class=\"container\"><h2>Админ панель</h2>");
        if !Self::enabled(ctx) {
            body.push_str(&format!("<p>{}</p></div>", NO_ACCESS));
            body.push_str(&view::footer_nav(Route::Admin, false));
            return body;
        }
        body.push_str("<section><h2>Объявления на модерации</h2>");
        let rows = self.pending.loaded().map(Vec::as_slice).unwrap_or_default();
        if let Some(message) = self.pending.error() {
            body.push_str(&view::error_notice(LOAD_FAILED, message));
        } else if rows.is_empty() {
            body.push_str(&format!("<p>{}</p>", NOTHING_PENDING));
        }
        for a in rows {
            body.push_str(&format!(
                "<div class=\"card\" data-id=\"{}\"><h3>{}</h3><p>{}</p><button name=\"approve\" value=\"{}\">Одобрить</button><button name=\"reject\" value=\"{}\">Отклонить</button></div>",
                view::html_attr(&a.id.to_string()),
                view::html_escape(&a.title),
                view::html_escape(&a.description),
                view::html_attr(&a.id.to_string()),
                view::html_attr(&a.id.to_string())
            ));
        }
        body.push_str("</section>");
        body.push_str(&format!(
            "<section><h2>Загрузка баннера</h2><form class=\"card\" method=\"post\"><input type=\"text\" name=\"title\" required value=\"{}\" /><input type=\"text\" name=\"subtitle\" value=\"{}\" /><input type=\"url\" name=\"link\" value=\"{}\" /><input type=\"file\" name=\"image\" accept=\"image/*\" /><button type=\"submit\">Сохранить баннер</button></form></section>",
            view::html_attr(&self.banner.title),
            view::html_attr(&self.banner.subtitle),
            view::html_attr(&self.banner.link)
        ));
        body.push_str("</div>");
        body.push_str(&view::footer_nav(Route::Admin, true));
        body
    }
}
