use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Moderation state of an announcement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Published,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Published => "published",
        }
    }
}

/// Announcement ids come back as numbers from the hosted database, but older
/// rows or other deployments may use text keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnouncementId {
    Int(i64),
    Text(String),
}

impl AnnouncementId {
    /// Numeric when the text is an integer, text otherwise.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        raw.parse::<i64>()
            .map(AnnouncementId::Int)
            .unwrap_or_else(|_| AnnouncementId::Text(raw.to_string()))
    }
}

impl std::fmt::Display for AnnouncementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnnouncementId::Int(v) => write!(f, "{}", v),
            AnnouncementId::Text(v) => f.write_str(v),
        }
    }
}

/// A geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// WKT form accepted by a `geography(Point)` column. Longitude comes first.
    pub fn to_wkt(&self) -> String {
        format!("POINT({} {})", self.lng, self.lat)
    }

    /// Read a point back from the GeoJSON the database returns for a
    /// geography column (`{"type":"Point","coordinates":[lng, lat]}`).
    pub fn from_geojson(value: &Value) -> Option<Self> {
        let coords = value.get("coordinates")?.as_array()?;
        let lng = coords.first()?.as_f64()?;
        let lat = coords.get(1)?.as_f64()?;
        Some(GeoPoint { lat, lng })
    }
}

/// Announcement row as read by the list pages, with the owner relation
/// flattened into `owner_username`.
#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub id: AnnouncementId,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub location: Option<GeoPoint>,
    pub status: Status,
    pub owner_username: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Row written by the create page. `status` is always pending on insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAnnouncement {
    pub title: String,
    pub description: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// WKT point, see [`GeoPoint::to_wkt`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Row of the `users` table, keyed by the stringified host identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub username: Option<String>,
    pub full_name: String,
    pub telegram_handle: Option<String>,
    pub avatar_url: Option<String>,
}

/// Row of the `user_profiles` table, one per host identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub telegram_id: String,
    pub city: Option<String>,
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

/// Pet passport as stored in `pet_passports`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetPassport {
    #[serde(default, skip_serializing, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub telegram_id: Option<String>,
    #[serde(default)]
    pub pet_name: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub vaccinations: Option<String>,
    #[serde(default)]
    pub habits: Option<String>,
    #[serde(default)]
    pub additional_info: Option<String>,
}

/// Accepts numeric or text keys and keeps them as strings.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Human-readable age like `"2 г. 3 мес."`. Empty when the date is missing,
/// in the future, or less than a month ago.
pub fn age_text(date_of_birth: Option<NaiveDate>, today: NaiveDate) -> String {
    let Some(dob) = date_of_birth else {
        return String::new();
    };
    let mut years = today.year() - dob.year();
    let mut months = today.month() as i32 - dob.month() as i32;
    if months < 0 {
        years -= 1;
        months += 12;
    }
    let mut parts = Vec::new();
    if years > 0 {
        parts.push(format!("{} г.", years));
    }
    if months > 0 && years >= 0 {
        parts.push(format!("{} мес.", months));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Status::Pending).unwrap(), json!("pending"));
        let s: Status = serde_json::from_value(json!("published")).unwrap();
        assert_eq!(s, Status::Published);
    }

    #[test]
    fn wkt_puts_longitude_first() {
        let p = GeoPoint { lat: 47.2, lng: 39.7 };
        assert_eq!(p.to_wkt(), "POINT(39.7 47.2)");
    }

    #[test]
    fn geojson_point_is_parsed() {
        let v = json!({ "type": "Point", "coordinates": [39.7, 47.2] });
        assert_eq!(GeoPoint::from_geojson(&v), Some(GeoPoint { lat: 47.2, lng: 39.7 }));
        assert_eq!(GeoPoint::from_geojson(&json!("0101000020E6")), None);
    }

    #[test]
    fn new_announcement_omits_absent_optionals() {
        let row = NewAnnouncement {
            title: "Lost cat".into(),
            description: String::new(),
            status: Status::Pending,
            image_url: None,
            location: None,
            user_id: None,
        };
        let v = serde_json::to_value(&row).unwrap();
        assert_eq!(v, json!({ "title": "Lost cat", "description": "", "status": "pending" }));
    }

    #[test]
    fn passport_id_is_never_written() {
        let pet = PetPassport {
            id: Some("abc".into()),
            pet_name: "Rex".into(),
            ..Default::default()
        };
        let v = serde_json::to_value(&pet).unwrap();
        assert!(v.get("id").is_none());
        assert_eq!(v["pet_name"], "Rex");
    }

    #[test]
    fn passport_reads_numeric_ids() {
        let pet: PetPassport = serde_json::from_value(json!({
            "id": 12,
            "telegram_id": "42",
            "pet_name": "Rex",
            "date_of_birth": "2020-01-31",
            "allergies": null
        }))
        .unwrap();
        assert_eq!(pet.id.as_deref(), Some("12"));
        assert_eq!(pet.telegram_id.as_deref(), Some("42"));
        assert_eq!(pet.date_of_birth, Some(date(2020, 1, 31)));
        assert_eq!(pet.allergies, None);
    }

    #[test]
    fn announcement_id_accepts_numbers_and_strings() {
        let a: AnnouncementId = serde_json::from_value(json!(7)).unwrap();
        let b: AnnouncementId = serde_json::from_value(json!("x-1")).unwrap();
        assert_eq!(a.to_string(), "7");
        assert_eq!(b.to_string(), "x-1");
        assert_eq!(AnnouncementId::parse(" 7 "), AnnouncementId::Int(7));
        assert_eq!(AnnouncementId::parse("x-1"), AnnouncementId::Text("x-1".into()));
    }

    #[test]
    fn age_text_cases() {
        let today = date(2024, 5, 10);
        assert_eq!(age_text(None, today), "");
        assert_eq!(age_text(Some(date(2022, 2, 1)), today), "2 г. 3 мес.");
        assert_eq!(age_text(Some(date(2023, 5, 1)), today), "1 г.");
        assert_eq!(age_text(Some(date(2023, 11, 1)), today), "6 мес.");
        assert_eq!(age_text(Some(date(2024, 5, 1)), today), "");
        assert_eq!(age_text(Some(date(2025, 1, 1)), today), "");
    }
}
