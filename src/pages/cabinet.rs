use chrono::{NaiveDate, Utc};
use tracing::{error, info, instrument};

use super::{failure_message, PageContext, SubmitState};
use crate::backend::ImageFile;
use crate::model::{age_text, PetPassport};
use crate::view::{self, Route};

pub const NAME_REQUIRED: &str = "Укажите имя питомца.";
pub const NO_IDENTITY: &str =
    "Мы не смогли получить ваш Telegram ID. Откройте мини‑приложение внутри Telegram.";
pub const SAVED: &str = "Паспорт питомца сохранён!";

/// Storage path for a pet photo. One file per owner, overwritten on change.
pub fn pet_image_path(telegram_id: &str, ext: &str) -> String {
    format!("pets/{}.{}", telegram_id, ext)
}

/// Personal cabinet holding the caller's pet passport.
#[derive(Debug, Default)]
pub struct CabinetPage {
    pub pet: PetPassport,
    pub image: Option<ImageFile>,
    pub loading: bool,
    pub state: SubmitState,
}

impl CabinetPage {
    /// Load the caller's passport, if any, into the form.
    #[instrument(skip_all)]
    pub async fn mount(&mut self, ctx: &PageContext) {
        let Some(telegram_id) = ctx.session.telegram_id() else {
            return;
        };
        self.loading = true;
        match ctx.backend.find_pet_passport(&telegram_id).await {
            Ok(Some(stored)) => {
                info!(id = ?stored.id, "loaded pet passport");
                self.pet = stored;
            }
            Ok(None) => {}
            Err(err) => error!(?err, "error loading pet passport"),
        }
        self.loading = false;
    }

    pub fn age_text(&self, today: NaiveDate) -> String {
        age_text(self.pet.date_of_birth, today)
    }

    /// Insert on first save, update by id afterwards.
    #[instrument(skip_all)]
    pub async fn save(&mut self, ctx: &PageContext) {
        if self.state.is_submitting() || self.loading {
            return;
        }
        if self.pet.pet_name.trim().is_empty() {
            ctx.alert(NAME_REQUIRED);
            return;
        }
        let Some(telegram_id) = ctx.session.telegram_id() else {
            ctx.alert(NO_IDENTITY);
            return;
        };
        self.state = SubmitState::Submitting;

        let mut avatar_url = self.pet.avatar_url.clone();
        if let Some(file) = &self.image {
            let bucket = &ctx.config.storage.pets_bucket;
            let path = pet_image_path(&telegram_id, &file.extension());
            match ctx.backend.upload_object(bucket, &path, file, true).await {
                Ok(()) => avatar_url = Some(ctx.backend.public_url(bucket, &path)),
                Err(err) => {
                    error!(?err, %path, "pet photo upload failed");
                    ctx.alert(&failure_message("Не удалось загрузить фото питомца", &err));
                }
            }
        }

        let payload = PetPassport {
            id: None,
            telegram_id: Some(telegram_id),
            avatar_url: avatar_url.clone(),
            ..self.pet.clone()
        };

        let result = match self.pet.id.as_deref() {
            Some(id) => ctx.backend.update_pet_passport(id, &payload).await,
            None => ctx
                .backend
                .insert_pet_passport(&payload)
                .await
                .map(|stored| self.pet.id = stored.id),
        };

        match result {
            Ok(()) => {
                info!(id = ?self.pet.id, "saved pet passport");
                self.pet.telegram_id = payload.telegram_id;
                self.pet.avatar_url = avatar_url;
                self.image = None;
                ctx.alert(SAVED);
                self.state = SubmitState::Done;
            }
            Err(err) => {
                error!(?err, "error saving pet passport");
                ctx.alert(&failure_message("Не удалось сохранить паспорт", &err));
                self.state = SubmitState::Error(err.to_string());
            }
        }
    }

    pub fn render(&self, ctx: &PageContext) -> String {
        let pet = &self.pet;
        let mut body = view::header();
        body.push_str("<div class=\"container\"><h2>Личный кабинет</h2><p>Создайте цифровой паспорт питомца. Данные всегда под рукой.</p>");
        if ctx.session.user().is_none() {
            body.push_str("<p class=\"hint\">Мы не видим ваши данные Telegram. Убедитесь, что открываете мини‑приложение из Telegram.</p>");
        }
        body.push_str("<form class=\"card\" method=\"post\" enctype=\"multipart/form-data\">");
        match pet.avatar_url.as_deref() {
            Some(url) => body.push_str(&format!(
                "<div class=\"pet-avatar\"><img src=\"{}\" alt=\"{}\" /></div>",
                view::html_attr(url),
                view::html_attr(&pet.pet_name)
            )),
            None => body.push_str("<div class=\"pet-avatar\"><span>🐶</span></div>"),
        }
        body.push_str("<label>Фото питомца<br /><input type=\"file\" name=\"image\" accept=\"image/*\" /></label>");
        body.push_str(&format!(
            "<label>Имя питомца<br /><input type=\"text\" name=\"pet_name\" required value=\"{}\" /></label>",
            view::html_attr(&pet.pet_name)
        ));
        let dob = pet
            .date_of_birth
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        body.push_str(&format!(
            "<label>Дата рождения<br /><input type=\"date\" name=\"date_of_birth\" value=\"{}\" /></label>",
            dob
        ));
        let age = self.age_text(Utc::now().date_naive());
        if !age.is_empty() {
            body.push_str(&format!("<p class=\"age\">Возраст: {}</p>", age));
        }
        for (label, name, value) in [
            ("Аллергии", "allergies", &pet.allergies),
            ("Прививки", "vaccinations", &pet.vaccinations),
            ("Привычки", "habits", &pet.habits),
            ("Дополнительная информация", "additional_info", &pet.additional_info),
        ] {
            body.push_str(&format!(
                "<label>{}<br /><textarea name=\"{}\">{}</textarea></label>",
                label,
                name,
                view::html_escape(value.as_deref().unwrap_or_default())
            ));
        }
        let label = if self.state.is_submitting() {
            "Сохранение…"
        } else {
            "Сохранить паспорт"
        };
        let disabled = if self.state.is_submitting() || self.loading {
            " disabled"
        } else {
            ""
        };
        body.push_str(&format!(
            "<button type=\"submit\"{}>{}</button></form></div>",
            disabled, label
        ));
        body.push_str(&view::footer_nav(Route::Cabinet, ctx.show_admin()));
        body
    }
}
