use crate::backend::Backend;
use crate::bridge::TelegramUser;
use crate::model::UserRecord;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

/// `users` row for a host identity, or None when the host gave no id.
pub fn user_record(user: &TelegramUser) -> Option<UserRecord> {
    let id = user.id_string()?;
    Some(UserRecord {
        id,
        username: user.username.clone(),
        full_name: user.full_name(),
        telegram_handle: user.username.clone(),
        avatar_url: user.photo_url.clone(),
    })
}

/// Fire-and-forget upsert of the host identity. The caller never awaits the
/// handle on the render path; failures are logged and dropped, no retry.
pub fn spawn(backend: Arc<dyn Backend>, user: &TelegramUser) -> Option<JoinHandle<()>> {
    let record = user_record(user)?;
    Some(tokio::spawn(async move {
        sync_identity(backend.as_ref(), &record).await;
    }))
}

/// Upsert one identity. Returns whether the write went through.
#[instrument(skip_all, fields(user_id = %record.id))]
pub async fn sync_identity(backend: &dyn Backend, record: &UserRecord) -> bool {
    match backend.upsert_user(record).await {
        Ok(()) => {
            info!("synced host identity");
            true
        }
        Err(err) => {
            warn!(?err, "unable to sync host identity");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_requires_id() {
        let user = TelegramUser {
            first_name: Some("Ann".into()),
            ..Default::default()
        };
        assert!(user_record(&user).is_none());
    }

    #[test]
    fn record_maps_fields() {
        let user = TelegramUser {
            id: Some(42),
            first_name: Some("Ann".into()),
            last_name: Some("Lee".into()),
            username: Some("ann".into()),
            photo_url: Some("https://t.me/i/ann.jpg".into()),
        };
        let rec = user_record(&user).unwrap();
        assert_eq!(rec.id, "42");
        assert_eq!(rec.full_name, "Ann Lee");
        assert_eq!(rec.username.as_deref(), Some("ann"));
        assert_eq!(rec.telegram_handle.as_deref(), Some("ann"));
        assert_eq!(rec.avatar_url.as_deref(), Some("https://t.me/i/ann.jpg"));
    }
}
