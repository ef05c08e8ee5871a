//! Stateless HTML renderers shared by the pages.
use once_cell::sync::Lazy;
use reqwest::Url;

use crate::bridge::{TelegramUser, ThemeVars};
use crate::model::{Announcement, GeoPoint};

pub const APP_TITLE: &str = "Animal Family";
pub const CONTACT_MESSAGE: &str = "Привет, меня заинтересовало ваше объявление!";
const PLACEHOLDER_IMAGE: &str = "/pet-placeholder.png";

/// Screens reachable from the footer navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Announcements,
    Create,
    Cabinet,
    Admin,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Announcements => "/announcements",
            Route::Create => "/create",
            Route::Cabinet => "/cabinet",
            Route::Admin => "/admin",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::Announcements => "Announcements",
            Route::Create => "Create",
            Route::Cabinet => "Cabinet",
            Route::Admin => "Admin",
        }
    }
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn html_attr(s: &str) -> String {
    html_escape(s).replace('"', "&quot;")
}

static TELEGRAM_BASE: Lazy<Url> =
    Lazy::new(|| Url::parse("https://t.me/").expect("valid t.me URL"));

/// Deep link that opens a chat with `username` prefilled with the canned message.
pub fn contact_link(username: &str) -> String {
    let mut url = TELEGRAM_BASE.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .push(username.trim_start_matches('@'));
    }
    url.query_pairs_mut().append_pair("text", CONTACT_MESSAGE);
    url.to_string()
}

pub fn greeting_text(user: Option<&TelegramUser>) -> String {
    match user.and_then(TelegramUser::display_first_name) {
        Some(name) => format!("Привет, {}!", name),
        None => "Привет!".to_string(),
    }
}

pub fn header() -> String {
    format!(
        "<header class=\"header\"><h1>{}</h1><p>Your pet community in Telegram</p></header>",
        APP_TITLE
    )
}

pub fn greeting(user: Option<&TelegramUser>) -> String {
    format!(
        "<p class=\"greeting\">{} 🐾</p>",
        html_escape(&greeting_text(user))
    )
}

pub fn footer_nav(current: Route, show_admin: bool) -> String {
    let mut routes = vec![Route::Home, Route::Announcements, Route::Create, Route::Cabinet];
    if show_admin {
        routes.push(Route::Admin);
    }
    let links: String = routes
        .into_iter()
        .map(|r| {
            let class = if r == current { " class=\"active\"" } else { "" };
            format!("<a href=\"{}\"{}>{}</a>", r.path(), class, r.label())
        })
        .collect();
    format!("<nav class=\"footer-nav\">{}</nav>", links)
}

pub fn announcement_card(a: &Announcement) -> String {
    let image = a.image_url.as_deref().unwrap_or(PLACEHOLDER_IMAGE);
    let contact = a
        .owner_username
        .as_deref()
        .map(|u| {
            format!(
                "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">Написать владельцу</a>",
                html_attr(&contact_link(u))
            )
        })
        .unwrap_or_default();
    format!(
        "<div class=\"announcement-card\"><div class=\"announcement-image\"><img src=\"{}\" alt=\"{}\" width=\"80\" height=\"80\" /></div><div class=\"announcement-content\"><h3>{}</h3><p>{}</p>{}</div></div>",
        html_attr(image),
        html_attr(&a.title),
        html_escape(&a.title),
        html_escape(&a.description),
        contact
    )
}

/// Compact card used on the home feed.
pub fn summary_card(a: &Announcement) -> String {
    format!(
        "<div class=\"card\"><h3>{}</h3><p>{}</p></div>",
        html_escape(&a.title),
        html_escape(&a.description)
    )
}

pub fn banner(title: &str, subtitle: Option<&str>, image_url: Option<&str>, link: Option<&str>) -> String {
    let mut inner = String::new();
    if let Some(url) = image_url {
        inner.push_str(&format!(
            "<img class=\"banner-image\" src=\"{}\" alt=\"{}\" />",
            html_attr(url),
            html_attr(title)
        ));
    }
    inner.push_str(&format!("<h3>{}</h3>", html_escape(title)));
    if let Some(sub) = subtitle {
        inner.push_str(&format!("<p>{}</p>", html_escape(sub)));
    }
    let card = format!("<div class=\"card banner\">{}</div>", inner);
    match link {
        Some(href) => format!(
            "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
            html_attr(href),
            card
        ),
        None => card,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub position: GeoPoint,
    pub label: String,
}

/// Markers for the announcements that carry a location.
pub fn map_markers(items: &[Announcement]) -> Vec<MapMarker> {
    items
        .iter()
        .filter_map(|a| {
            a.location.map(|position| MapMarker {
                position,
                label: a.title.clone(),
            })
        })
        .collect()
}

/// Marker list for the map widget; tiles are drawn by the client library.
pub fn map(center: Option<GeoPoint>, markers: &[MapMarker]) -> String {
    let center_attr = center
        .map(|c| format!(" data-center=\"{},{}\"", c.lat, c.lng))
        .unwrap_or_default();
    let items: String = markers
        .iter()
        .map(|m| {
            format!(
                "<li data-lat=\"{}\" data-lng=\"{}\">{}</li>",
                m.position.lat,
                m.position.lng,
                html_escape(&m.label)
            )
        })
        .collect();
    format!("<ul class=\"map\"{}>{}</ul>", center_attr, items)
}

pub fn error_notice(prefix: &str, message: &str) -> String {
    format!(
        "<p class=\"error\">{}: {}</p>",
        html_escape(prefix),
        html_escape(message)
    )
}

pub fn preloader() -> String {
    "<div class=\"preloader\" role=\"status\"><div class=\"paw\">🐾</div><p>Загрузка…</p></div>".to_string()
}

pub fn theme_style(theme: &ThemeVars) -> String {
    let vars: String = theme
        .iter()
        .map(|(k, v)| format!("{}:{};", k, v))
        .collect();
    format!("<style>:root{{{}}}</style>", vars)
}

/// Full document around a page body.
pub fn document(theme: &ThemeVars, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="ru">
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1, maximum-scale=1">
    <title>{}</title>
    {}
  </head>
  <body>
    <main>
      {}
    </main>
  </body>
</html>"#,
        APP_TITLE,
        theme_style(theme),
        body
    )
}
