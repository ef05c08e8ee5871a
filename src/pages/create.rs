use chrono::Utc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{failure_message, PageContext, SubmitState};
use crate::backend::ImageFile;
use crate::geo::Geolocator;
use crate::model::{GeoPoint, NewAnnouncement, Status};
use crate::view::{self, Route};

pub const TITLE_REQUIRED: &str = "Пожалуйста, укажите заголовок объявления.";
pub const SENT_FOR_REVIEW: &str = "Объявление отправлено на модерацию!";

/// Storage path for an announcement photo: `announcements/<millis>-<random>.<ext>`.
pub fn announcement_image_path(millis: i64, suffix: &str, ext: &str) -> String {
    format!("announcements/{}-{}.{}", millis, suffix, ext)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateForm {
    pub title: String,
    pub description: String,
    pub image: Option<ImageFile>,
}

/// New announcement form. Submissions start out pending moderation.
#[derive(Debug, Default)]
pub struct CreatePage {
    pub form: CreateForm,
    pub location: Option<GeoPoint>,
    pub state: SubmitState,
}

impl CreatePage {
    /// Ask for the device position once. A denial just leaves the location empty.
    #[instrument(skip_all)]
    pub async fn mount(&mut self, geo: &dyn Geolocator) {
        match geo.current_position().await {
            Ok(point) => self.location = Some(point),
            Err(err) => {
                warn!(%err, "geolocation error");
                self.location = None;
            }
        }
    }

    #[instrument(skip_all)]
    pub async fn submit(&mut self, ctx: &PageContext) {
        if self.state.is_submitting() {
            return;
        }
        if self.form.title.trim().is_empty() {
            ctx.alert(TITLE_REQUIRED);
            return;
        }
        self.state = SubmitState::Submitting;

        let image_url = match &self.form.image {
            Some(file) => upload_image(ctx, file).await,
            None => None,
        };

        let row = NewAnnouncement {
            title: self.form.title.clone(),
            description: self.form.description.clone(),
            status: Status::Pending,
            image_url,
            location: self.location.map(|p| p.to_wkt()),
            user_id: ctx.session.telegram_id(),
        };

        match ctx.backend.insert_announcement(&row).await {
            Ok(()) => {
                info!(title = %row.title, has_image = row.image_url.is_some(), has_location = row.location.is_some(), "announcement submitted");
                ctx.alert(SENT_FOR_REVIEW);
                self.form = CreateForm::default();
                self.state = SubmitState::Done;
            }
            Err(err) => {
                error!(?err, "error inserting announcement");
                ctx.alert(&failure_message("Не удалось сохранить объявление", &err));
                self.state = SubmitState::Error(err.to_string());
            }
        }
    }

    pub fn render(&self, ctx: &PageContext) -> String {
        let mut body = view::header();
        body.push_str("<div class=\"container\"><h2>Создать объявление</h2><form class=\"card\" method=\"post\" enctype=\"multipart/form-data\">");
        body.push_str(&format!(
            "<label>Заголовок<br /><input type=\"text\" name=\"title\" required value=\"{}\" /></label>",
            view::html_attr(&self.form.title)
        ));
        body.push_str(&format!(
            "<label>Описание<br /><textarea name=\"description\" rows=\"4\">{}</textarea></label>",
            view::html_escape(&self.form.description)
        ));
        body.push_str("<label>Фото питомца (необязательно)<br /><input type=\"file\" name=\"image\" accept=\"image/*\" /></label>");
        match self.location {
            Some(p) => {
                body.push_str(&format!(
                    "<p>Ваше местоположение: {:.5}, {:.5}</p>",
                    p.lat, p.lng
                ));
                body.push_str(&view::map(
                    Some(p),
                    &[view::MapMarker {
                        position: p,
                        label: "Вы".into(),
                    }],
                ));
            }
            None => body.push_str("<p>Разрешите доступ к геолокации, чтобы добавить вашу позицию.</p>"),
        }
        let label = if self.state.is_submitting() {
            "Отправка…"
        } else {
            "Отправить"
        };
        let disabled = if self.state.is_submitting() { " disabled" } else { "" };
        body.push_str(&format!(
            "<button type=\"submit\"{}>{}</button></form></div>",
            disabled, label
        ));
        body.push_str(&view::footer_nav(Route::Create, ctx.show_admin()));
        body
    }
}

/// Upload the photo and return its public URL. A failed upload is reported
/// and the announcement goes out without an image.
async fn upload_image(ctx: &PageContext, file: &ImageFile) -> Option<String> {
    let bucket = &ctx.config.storage.announcements_bucket;
    let suffix = Uuid::new_v4().simple().to_string();
    let path = announcement_image_path(
        Utc::now().timestamp_millis(),
        &suffix[..10],
        &file.extension(),
    );
    match ctx.backend.upload_object(bucket, &path, file, false).await {
        Ok(()) => Some(ctx.backend.public_url(bucket, &path)),
        Err(err) => {
            error!(?err, %path, "photo upload failed");
            ctx.alert(&failure_message("Не удалось загрузить фото", &err));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_path_shape() {
        assert_eq!(
            announcement_image_path(1700000000000, "ab12cd34ef", "png"),
            "announcements/1700000000000-ab12cd34ef.png"
        );
    }
}
