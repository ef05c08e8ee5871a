use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::model::{Announcement, AnnouncementId, GeoPoint, Status};

/// Columns requested for announcement reads; `users(username)` expands the
/// owner relation.
pub const ANNOUNCEMENT_COLUMNS: &str =
    "id,title,description,image_url,location,status,created_at,users(username)";

#[derive(Deserialize, Debug)]
pub struct OwnerRef {
    #[serde(default)]
    pub username: Option<String>,
}

/// Announcement as returned by the REST endpoint, before flattening.
#[derive(Deserialize, Debug)]
pub struct AnnouncementRow {
    pub id: AnnouncementId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub location: Option<Value>,
    pub status: Status,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub users: Option<OwnerRef>,
}

impl From<AnnouncementRow> for Announcement {
    fn from(row: AnnouncementRow) -> Self {
        Announcement {
            id: row.id,
            title: row.title.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
            image_url: row.image_url.filter(|u| !u.is_empty()),
            location: row.location.as_ref().and_then(GeoPoint::from_geojson),
            status: row.status,
            owner_username: row
                .users
                .and_then(|u| u.username)
                .filter(|u| !u.is_empty()),
            created_at: row.created_at.as_deref().and_then(parse_timestamp),
        }
    }
}

/// `timestamptz` columns carry an offset, plain `timestamp` ones don't.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Error payload shape shared by the REST and storage endpoints.
#[derive(Deserialize, Debug, Default)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    /// Best human-readable message, falling back to the raw body.
    pub fn describe(raw: &str) -> String {
        let parsed: ErrorBody = serde_json::from_str(raw).unwrap_or_default();
        parsed
            .message
            .or(parsed.error)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| raw.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_flattens_owner_and_location() {
        let row: AnnouncementRow = serde_json::from_value(json!({
            "id": 3,
            "title": "Found dog",
            "description": null,
            "image_url": "",
            "location": { "type": "Point", "coordinates": [39.7, 47.2] },
            "status": "published",
            "created_at": "2024-05-10T12:00:00.123456+00:00",
            "users": { "username": "ann" }
        }))
        .unwrap();
        let a = Announcement::from(row);
        assert_eq!(a.id, AnnouncementId::Int(3));
        assert_eq!(a.description, "");
        assert_eq!(a.image_url, None);
        assert_eq!(a.owner_username.as_deref(), Some("ann"));
        assert_eq!(a.location, Some(GeoPoint { lat: 47.2, lng: 39.7 }));
        assert!(a.created_at.is_some());
    }

    #[test]
    fn row_without_owner() {
        let row: AnnouncementRow = serde_json::from_value(json!({
            "id": "a1", "title": "t", "status": "pending", "users": null,
            "created_at": "2024-05-10T12:00:00"
        }))
        .unwrap();
        let a = Announcement::from(row);
        assert_eq!(a.owner_username, None);
        assert_eq!(a.location, None);
        assert!(a.created_at.is_some());
    }

    #[test]
    fn error_body_describe() {
        assert_eq!(
            ErrorBody::describe(r#"{"code":"42501","message":"permission denied"}"#),
            "permission denied"
        );
        assert_eq!(
            ErrorBody::describe(r#"{"statusCode":"404","error":"Bucket not found"}"#),
            "Bucket not found"
        );
        assert_eq!(ErrorBody::describe("bad gateway\n"), "bad gateway");
    }
}
