use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use reqwest::{header::HeaderMap, Client, Method, Request, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::model::{
    Announcement, AnnouncementId, NewAnnouncement, PetPassport, Status, UserProfile, UserRecord,
};

pub mod model;
pub mod storage;

pub use storage::ImageFile;

use model::{AnnouncementRow, ErrorBody, ANNOUNCEMENT_COLUMNS};

pub const TABLE_ANNOUNCEMENTS: &str = "announcements";
pub const TABLE_USERS: &str = "users";
pub const TABLE_USER_PROFILES: &str = "user_profiles";
pub const TABLE_PET_PASSPORTS: &str = "pet_passports";

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Sort direction for `created_at` ordered reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Everything the pages need from the hosted database and storage.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Rows with the given status ordered by `created_at`.
    async fn list_announcements(
        &self,
        status: Status,
        order: SortOrder,
        limit: Option<usize>,
    ) -> Result<Vec<Announcement>>;

    async fn insert_announcement(&self, row: &NewAnnouncement) -> Result<()>;

    async fn set_announcement_status(&self, id: &AnnouncementId, status: Status) -> Result<()>;

    async fn delete_announcement(&self, id: &AnnouncementId) -> Result<()>;

    /// Upsert on `id`.
    async fn upsert_user(&self, user: &UserRecord) -> Result<()>;

    async fn find_user_profile(&self, telegram_id: &str) -> Result<Option<UserProfile>>;

    /// Upsert on `telegram_id`.
    async fn upsert_user_profile(&self, profile: &UserProfile) -> Result<()>;

    async fn find_pet_passport(&self, telegram_id: &str) -> Result<Option<PetPassport>>;

    /// Insert and return the stored row (including the assigned id).
    async fn insert_pet_passport(&self, pet: &PetPassport) -> Result<PetPassport>;

    async fn update_pet_passport(&self, id: &str, pet: &PetPassport) -> Result<()>;

    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        file: &ImageFile,
        overwrite: bool,
    ) -> Result<()>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// PostgREST-style query: table plus ordered query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: String,
    params: Vec<(String, String)>,
}

impl Query {
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            params: Vec::new(),
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".into(), columns.into()));
        self
    }

    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.params.push((column.into(), format!("eq.{}", value)));
        self
    }

    pub fn order(mut self, column: &str, order: SortOrder) -> Self {
        let dir = match order {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        };
        self.params.push(("order".into(), format!("{}.{}", column, dir)));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.params.push(("limit".into(), n.to_string()));
        self
    }

    pub fn on_conflict(mut self, column: &str) -> Self {
        self.params.push(("on_conflict".into(), column.into()));
        self
    }

    pub fn url(&self, base: &Url) -> Result<Url> {
        let mut url = base
            .join(&format!("rest/v1/{}", self.table))
            .context("invalid backend base URL")?;
        if !self.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &self.params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }
}

/// Handle to the hosted database and storage service.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

static SHARED: OnceCell<Arc<SupabaseClient>> = OnceCell::new();

/// Process-wide client, built from the first configuration it sees.
pub fn shared(cfg: &Config) -> Result<Arc<SupabaseClient>> {
    SHARED
        .get_or_try_init(|| SupabaseClient::from_config(cfg).map(Arc::new))
        .cloned()
}

impl SupabaseClient {
    pub fn new(base_url: &str, api_key: String) -> Result<Self> {
        // Keep a trailing slash so `join` appends instead of replacing the last segment.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .with_context(|| format!("invalid backend URL: {}", base_url))?;
        let http = Client::builder()
            .user_agent("animal-family/0.1")
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(&cfg.backend.url, cfg.backend.anon_key.clone())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    pub fn build_select(&self, query: &Query, single: bool) -> Result<Request> {
        let mut builder = self.authed(self.http.get(query.url(&self.base_url)?));
        if single {
            builder = builder.header("Accept", SINGLE_OBJECT);
        }
        builder.build().context("failed to build select request")
    }

    pub fn build_insert(&self, query: &Query, body: &Value, returning: bool) -> Result<Request> {
        let prefer = if returning {
            "return=representation"
        } else {
            "return=minimal"
        };
        self.authed(self.http.post(query.url(&self.base_url)?))
            .header("Prefer", prefer)
            .json(body)
            .build()
            .context("failed to build insert request")
    }

    /// `query` is expected to carry `on_conflict`.
    pub fn build_upsert(&self, query: &Query, body: &Value) -> Result<Request> {
        self.authed(self.http.post(query.url(&self.base_url)?))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(body)
            .build()
            .context("failed to build upsert request")
    }

    pub fn build_update(&self, query: &Query, body: &Value) -> Result<Request> {
        self.authed(self.http.patch(query.url(&self.base_url)?))
            .header("Prefer", "return=minimal")
            .json(body)
            .build()
            .context("failed to build update request")
    }

    pub fn build_delete(&self, query: &Query) -> Result<Request> {
        self.authed(self.http.request(Method::DELETE, query.url(&self.base_url)?))
            .build()
            .context("failed to build delete request")
    }

    /// Send a request and return the body of a 2xx response. Any other status
    /// becomes an error carrying the service's message.
    async fn execute(&self, request: Request) -> Result<String> {
        let method = request.method().clone();
        let url = request.url().clone();
        info!(%method, path = url.path(), "backend request");
        log_headers(request.headers());

        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach backend")?;

        let status = res.status();
        let body = res.text().await.context("failed to read backend response")?;
        if !status.is_success() {
            let message = ErrorBody::describe(&body);
            warn!(%method, path = url.path(), %status, %message, "backend error");
            return Err(anyhow!(message));
        }
        debug!(%status, body_len = body.len(), "backend response");
        Ok(body)
    }

    async fn fetch_rows<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>> {
        let request = self.build_select(query, false)?;
        let body = self.execute(request).await?;
        serde_json::from_str(&body).context("invalid backend response JSON")
    }

    /// "At most one row": `limit=1` and take the first.
    async fn fetch_optional<T: DeserializeOwned>(&self, query: Query) -> Result<Option<T>> {
        let rows: Vec<T> = self.fetch_rows(&query.limit(1)).await?;
        Ok(rows.into_iter().next())
    }
}

fn log_headers(headers: &HeaderMap) {
    for (name, value) in headers {
        let lowered = name.as_str().to_ascii_lowercase();
        if lowered == "apikey" || lowered == "authorization" {
            debug!("  {}: [REDACTED]", name);
        } else {
            debug!("  {}: {}", name, value.to_str().unwrap_or("[invalid]"));
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).context("failed to encode row")
}

#[async_trait]
impl Backend for SupabaseClient {
    async fn list_announcements(
        &self,
        status: Status,
        order: SortOrder,
        limit: Option<usize>,
    ) -> Result<Vec<Announcement>> {
        let mut query = Query::table(TABLE_ANNOUNCEMENTS)
            .select(ANNOUNCEMENT_COLUMNS)
            .eq("status", status.as_str())
            .order("created_at", order);
        if let Some(n) = limit {
            query = query.limit(n);
        }
        let rows: Vec<AnnouncementRow> = self.fetch_rows(&query).await?;
        Ok(rows.into_iter().map(Announcement::from).collect())
    }

    async fn insert_announcement(&self, row: &NewAnnouncement) -> Result<()> {
        let request = self.build_insert(&Query::table(TABLE_ANNOUNCEMENTS), &to_json(row)?, false)?;
        self.execute(request).await?;
        Ok(())
    }

    async fn set_announcement_status(&self, id: &AnnouncementId, status: Status) -> Result<()> {
        let query = Query::table(TABLE_ANNOUNCEMENTS).eq("id", &id.to_string());
        let body = serde_json::json!({ "status": status.as_str() });
        let request = self.build_update(&query, &body)?;
        self.execute(request).await?;
        Ok(())
    }

    async fn delete_announcement(&self, id: &AnnouncementId) -> Result<()> {
        let query = Query::table(TABLE_ANNOUNCEMENTS).eq("id", &id.to_string());
        let request = self.build_delete(&query)?;
        self.execute(request).await?;
        Ok(())
    }

    async fn upsert_user(&self, user: &UserRecord) -> Result<()> {
        let query = Query::table(TABLE_USERS).on_conflict("id");
        let request = self.build_upsert(&query, &to_json(user)?)?;
        self.execute(request).await?;
        Ok(())
    }

    async fn find_user_profile(&self, telegram_id: &str) -> Result<Option<UserProfile>> {
        let query = Query::table(TABLE_USER_PROFILES)
            .select("*")
            .eq("telegram_id", telegram_id);
        self.fetch_optional(query).await
    }

    async fn upsert_user_profile(&self, profile: &UserProfile) -> Result<()> {
        let query = Query::table(TABLE_USER_PROFILES).on_conflict("telegram_id");
        let request = self.build_upsert(&query, &to_json(profile)?)?;
        self.execute(request).await?;
        Ok(())
    }

    async fn find_pet_passport(&self, telegram_id: &str) -> Result<Option<PetPassport>> {
        let query = Query::table(TABLE_PET_PASSPORTS)
            .select("*")
            .eq("telegram_id", telegram_id);
        self.fetch_optional(query).await
    }

    async fn insert_pet_passport(&self, pet: &PetPassport) -> Result<PetPassport> {
        let query = Query::table(TABLE_PET_PASSPORTS).select("*");
        let mut request = self.build_insert(&query, &to_json(pet)?, true)?;
        request
            .headers_mut()
            .insert("Accept", reqwest::header::HeaderValue::from_static(SINGLE_OBJECT));
        let body = self.execute(request).await?;
        let stored: PetPassport =
            serde_json::from_str(&body).context("invalid pet passport response JSON")?;
        if stored.id.is_none() {
            return Err(anyhow!("backend did not return the new pet passport id"));
        }
        Ok(stored)
    }

    async fn update_pet_passport(&self, id: &str, pet: &PetPassport) -> Result<()> {
        let query = Query::table(TABLE_PET_PASSPORTS).eq("id", id);
        let request = self.build_update(&query, &to_json(pet)?)?;
        self.execute(request).await?;
        Ok(())
    }

    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        file: &ImageFile,
        overwrite: bool,
    ) -> Result<()> {
        let request = self.build_upload(bucket, path, file, overwrite)?;
        self.execute(request).await?;
        info!(bucket, path, bytes = file.bytes.len(), "uploaded object");
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        storage::public_url(&self.base_url, bucket, path)
    }
}
