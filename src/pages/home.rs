use tracing::{error, info, instrument, warn};

use super::{failure_message, LoadState, PageContext, SubmitState, LOAD_FAILED};
use crate::backend::SortOrder;
use crate::model::{Announcement, Status, UserProfile};
use crate::view::{self, Route};

pub const EMPTY_FEED: &str = "Пока объявлений нет. Будьте первым!";
pub const NO_IDENTITY: &str =
    "Мы не смогли получить ваш Telegram аккаунт. Откройте мини‑приложение внутри Telegram.";
pub const CITY_REQUIRED: &str = "Пожалуйста, укажите ваш город.";

/// Landing screen: latest published announcements and the city prompt.
#[derive(Debug, Default)]
pub struct HomePage {
    pub feed: LoadState<Vec<Announcement>>,
    pub profile_city: Option<String>,
    pub city_input: String,
    pub city_state: SubmitState,
}

impl HomePage {
    #[instrument(skip_all)]
    pub async fn mount(&mut self, ctx: &PageContext) {
        self.feed = LoadState::Loading;
        let limit = ctx.config.app.home_feed_limit;
        self.feed = match ctx
            .backend
            .list_announcements(Status::Published, SortOrder::Descending, Some(limit))
            .await
        {
            Ok(rows) => {
                info!(count = rows.len(), "loaded home feed");
                LoadState::Loaded(rows)
            }
            Err(err) => {
                error!(?err, "error fetching announcements");
                LoadState::Error(err.to_string())
            }
        };

        let Some(telegram_id) = ctx.session.telegram_id() else {
            return;
        };
        match ctx.backend.find_user_profile(&telegram_id).await {
            Ok(Some(profile)) => {
                let city = profile.city.filter(|c| !c.trim().is_empty());
                self.city_input = city.clone().unwrap_or_default();
                self.profile_city = city;
            }
            Ok(None) => {}
            Err(err) => warn!(?err, "error loading user profile"),
        }
    }

    /// Pin the typed city to the caller's profile.
    #[instrument(skip_all)]
    pub async fn save_city(&mut self, ctx: &PageContext) {
        if self.city_state.is_submitting() {
            return;
        }
        let Some(user) = ctx.session.user() else {
            ctx.alert(NO_IDENTITY);
            return;
        };
        let Some(telegram_id) = user.id_string() else {
            ctx.alert(NO_IDENTITY);
            return;
        };
        let city = self.city_input.trim().to_string();
        if city.is_empty() {
            ctx.alert(CITY_REQUIRED);
            return;
        }

        self.city_state = SubmitState::Submitting;
        let full_name = Some(user.full_name()).filter(|n| !n.is_empty());
        let profile = UserProfile {
            telegram_id,
            city: Some(city.clone()),
            full_name,
            username: user.username.clone(),
            avatar_url: user.photo_url.clone(),
        };
        match ctx.backend.upsert_user_profile(&profile).await {
            Ok(()) => {
                info!(%city, "saved profile city");
                self.profile_city = Some(city);
                self.city_state = SubmitState::Done;
            }
            Err(err) => {
                error!(?err, "error saving city");
                ctx.alert(&failure_message("Не удалось сохранить город", &err));
                self.city_state = SubmitState::Error(err.to_string());
            }
        }
    }

    pub fn render(&self, ctx: &PageContext) -> String {
        let user = ctx.session.user();
        let mut body = view::header();
        body.push_str("<div class=\"container\">");
        body.push_str(&view::greeting(user));

        if ctx.session.telegram_id().is_some() {
            match &self.profile_city {
                Some(city) => body.push_str(&format!(
                    "<p class=\"profile-city\">Ваш город: <strong>{}</strong></p>",
                    view::html_escape(city)
                )),
                None => {
                    let label = if self.city_state.is_submitting() {
                        "Сохраняем…"
                    } else {
                        "Сохранить город"
                    };
                    body.push_str(&format!(
                        "<div class=\"card city-card\"><h3>Город, где вы ищете питомцев</h3><form method=\"post\"><input type=\"text\" name=\"city\" placeholder=\"Например, Ростов-на-Дону\" value=\"{}\" /><button type=\"submit\">{}</button></form></div>",
                        view::html_attr(&self.city_input),
                        label
                    ));
                }
            }
        }

        body.push_str(&view::banner(
            "Помогите найти дом",
            Some("Публикуйте объявления о потерянных питомцах и возможностях усыновления"),
            None,
            None,
        ));
        let cta = match user.and_then(|u| u.display_first_name()) {
            Some(name) => format!("{}, создайте своё объявление!", name),
            None => "Создайте своё объявление!".to_string(),
        };
        body.push_str(&format!(
            "<div class=\"card premium-info\"><h3>{}</h3><a href=\"{}\" class=\"cta-button\">Создать объявление</a></div>",
            view::html_escape(&cta),
            Route::Create.path()
        ));

        body.push_str("<h2>Последние объявления</h2>");
        let published: Vec<&Announcement> = self
            .feed
            .loaded()
            .map(|rows| rows.iter().filter(|a| a.status == Status::Published).collect())
            .unwrap_or_default();
        if self.feed.is_loading() {
            body.push_str(&view::preloader());
        } else if let Some(message) = self.feed.error() {
            body.push_str(&view::error_notice(LOAD_FAILED, message));
        } else if published.is_empty() {
            body.push_str(&format!("<p>{}</p>", EMPTY_FEED));
        }
        for a in published {
            body.push_str(&view::summary_card(a));
        }
        body.push_str("</div>");
        body.push_str(&view::footer_nav(Route::Home, ctx.show_admin()));
        body
    }
}
