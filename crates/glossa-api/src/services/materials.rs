//! Material lifecycle: creation under the weekly quota, upload spooling,
//! ingestion claims, and deletion.
//!
//! Every creation path reserves an upload slot first; the reservation is a
//! conditional write in the store, so two concurrent requests cannot both
//! take the last slot.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::Multipart;
use chrono::{Duration, Utc};
use uuid::Uuid;

use glossa_core::entitlements::resolve;
use glossa_core::models::{Material, SourceKind};
use glossa_core::{AppError, Config};
use glossa_db::stores::{MaterialStore, SubscriptionStore};
use glossa_db::UploadReservation;

use crate::ingestion::{IngestionJob, IngestionQueue};
use crate::utils::upload::{
    extract_multipart_upload, sanitize_filename, validate_file_extension, validate_file_size,
};

#[derive(Clone)]
pub struct MaterialService {
    materials: Arc<dyn MaterialStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    queue: IngestionQueue,
    config: Config,
}

impl MaterialService {
    pub fn new(
        materials: Arc<dyn MaterialStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        queue: IngestionQueue,
        config: Config,
    ) -> Self {
        Self {
            materials,
            subscriptions,
            queue,
            config,
        }
    }

    /// Register a URL-backed material (YouTube link or article page).
    pub async fn create_from_url(
        &self,
        user_id: Uuid,
        title: &str,
        kind: SourceKind,
        url: &str,
    ) -> Result<Material, AppError> {
        if kind == SourceKind::File {
            return Err(AppError::InvalidInput(
                "File materials must go through the upload endpoint".to_string(),
            ));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(AppError::InvalidInput(
                "Source URL must be an http(s) URL".to_string(),
            ));
        }

        self.reserve_upload_slot(user_id).await?;

        let material = self
            .materials
            .create(user_id, title, kind, Some(url), None)
            .await?;
        tracing::info!(
            material_id = %material.id,
            source_kind = %kind,
            "Material registered"
        );
        Ok(material)
    }

    /// Register a file-backed material from a multipart upload.
    pub async fn create_from_upload(
        &self,
        user_id: Uuid,
        multipart: Multipart,
    ) -> Result<Material, AppError> {
        let upload = extract_multipart_upload(multipart).await?;
        self.create_from_file_bytes(user_id, upload.title, &upload.filename, upload.data)
            .await
    }

    /// Validate, reserve a quota slot, spool the file to disk, and persist
    /// the material row. Split from the multipart wrapper so tests can feed
    /// bytes directly.
    pub async fn create_from_file_bytes(
        &self,
        user_id: Uuid,
        title: Option<String>,
        original_filename: &str,
        file_data: Vec<u8>,
    ) -> Result<Material, AppError> {
        // 1. Validate before consuming a quota slot
        validate_file_size(file_data.len(), self.config.max_upload_size_bytes())?;
        validate_file_extension(original_filename, self.config.upload_allowed_extensions())?;
        let sanitized = sanitize_filename(original_filename)?;

        // 2. Reserve the quota slot
        self.reserve_upload_slot(user_id).await?;

        // 3. Spool to the upload directory under a collision-free name
        let upload_dir = PathBuf::from(self.config.upload_dir());
        tokio::fs::create_dir_all(&upload_dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create upload dir: {}", e)))?;
        let file_path = upload_dir.join(format!("{}_{}", Uuid::new_v4(), sanitized));
        tokio::fs::write(&file_path, &file_data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store uploaded file: {}", e)))?;

        // 4. Persist the row in `pending`
        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| derive_title(&sanitized));
        let material = self
            .materials
            .create(
                user_id,
                &title,
                SourceKind::File,
                None,
                Some(&file_path.to_string_lossy()),
            )
            .await?;

        tracing::info!(
            material_id = %material.id,
            file_size = file_data.len(),
            "Upload spooled and material registered"
        );
        Ok(material)
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Material>, AppError> {
        self.materials.list(user_id).await
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Material, AppError> {
        self.materials
            .get(user_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Material not found".to_string()))
    }

    /// Claim the material for ingestion and enqueue the extraction job.
    ///
    /// The claim is a compare-and-set on the status column; losing the race
    /// surfaces as an invalid transition. If the queue is full the claim is
    /// released so the material stays restartable.
    pub async fn start_ingestion(&self, user_id: Uuid, id: Uuid) -> Result<Material, AppError> {
        let material = self.get(user_id, id).await?;
        if !material.status.can_start_ingestion() {
            return Err(AppError::InvalidTransition {
                state: material.status.to_string(),
                operation: "start ingestion".to_string(),
            });
        }
        let prior_status = material.status;

        let Some(claimed) = self.materials.begin_processing(user_id, id).await? else {
            // Someone else claimed or the row changed under us
            let state = self
                .materials
                .get(user_id, id)
                .await?
                .map(|m| m.status.to_string())
                .unwrap_or_else(|| "deleted".to_string());
            return Err(AppError::InvalidTransition {
                state,
                operation: "start ingestion".to_string(),
            });
        };

        if let Err(e) = self.queue.submit(IngestionJob::ExtractMaterial {
            material_id: id,
            user_id,
        }) {
            self.materials.release_claim(id, prior_status).await?;
            return Err(e);
        }

        Ok(claimed)
    }

    /// Delete a material; cascades to its cards, quizzes, and chat history
    /// in the store. The spooled upload file is removed best-effort.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let material = self.get(user_id, id).await?;

        if !self.materials.delete(user_id, id).await? {
            return Err(AppError::NotFound("Material not found".to_string()));
        }

        if let Some(path) = material.file_path {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::debug!(error = %e, path = %path, "Spooled upload already gone");
            }
        }

        tracing::info!(material_id = %id, "Material deleted");
        Ok(())
    }

    async fn reserve_upload_slot(&self, user_id: Uuid) -> Result<(), AppError> {
        let now = Utc::now();
        let trial_end = now + Duration::days(self.config.trial_days());
        let subscription = self.subscriptions.get_or_create(user_id, trial_end).await?;
        let entitlements = resolve(&subscription, now);

        match self
            .subscriptions
            .reserve_upload(user_id, entitlements.upload_limit)
            .await?
        {
            UploadReservation::Granted(_) => Ok(()),
            UploadReservation::Denied { used } => Err(AppError::QuotaExceeded {
                resource: "weekly uploads".to_string(),
                used: used as i64,
                limit: entitlements.upload_limit as i64,
            }),
        }
    }
}

/// YouTube links get their own source kind; any other http(s) link is a
/// generic article URL.
pub fn classify_source_url(url: &str) -> SourceKind {
    let lowered = url.to_lowercase();
    if lowered.contains("youtube.com/") || lowered.contains("youtu.be/") {
        SourceKind::Youtube
    } else {
        SourceKind::Url
    }
}

fn derive_title(filename: &str) -> String {
    let stem = filename.rsplit_once('.').map(|(s, _)| s).unwrap_or(filename);
    if stem.trim().is_empty() {
        "Uploaded material".to_string()
    } else {
        stem.replace('_', " ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use glossa_core::models::{MaterialStatus, SubscriptionStatus};
    use glossa_db::test_support::fixtures::{create_test_material, create_test_subscription};
    use glossa_db::test_support::mock_stores::{MockMaterialStore, MockSubscriptionStore};

    fn service_with(
        materials: Arc<MockMaterialStore>,
        subscriptions: Arc<MockSubscriptionStore>,
        queue: IngestionQueue,
    ) -> MaterialService {
        MaterialService::new(materials, subscriptions, queue, crate::services::test_config())
    }

    fn idle_service() -> (
        MaterialService,
        Arc<MockMaterialStore>,
        Arc<MockSubscriptionStore>,
        tokio::sync::mpsc::Receiver<IngestionJob>,
    ) {
        let materials = Arc::new(MockMaterialStore::new());
        let subscriptions = Arc::new(MockSubscriptionStore::new());
        let (queue, rx) = IngestionQueue::with_idle_worker(8);
        let service = service_with(materials.clone(), subscriptions.clone(), queue);
        (service, materials, subscriptions, rx)
    }

    #[tokio::test]
    async fn test_create_from_url_starts_pending_and_consumes_slot() {
        let (service, _materials, subscriptions, _rx) = idle_service();
        let user_id = Uuid::new_v4();

        let material = service
            .create_from_url(user_id, "Noticias del dia", SourceKind::Url, "https://example.com/news")
            .await
            .unwrap();

        assert_eq!(material.status, MaterialStatus::Pending);
        assert_eq!(subscriptions.uploads_this_week(user_id), Some(1));
    }

    #[tokio::test]
    async fn test_create_denied_when_free_quota_exhausted() {
        let (service, _materials, subscriptions, _rx) = idle_service();
        let user_id = Uuid::new_v4();
        let mut subscription = create_test_subscription(user_id, SubscriptionStatus::Free);
        subscription.uploads_this_week = 1;
        subscriptions.add_subscription(subscription);

        let err = service
            .create_from_url(user_id, "Segundo", SourceKind::Url, "https://example.com/two")
            .await
            .unwrap_err();

        match err {
            AppError::QuotaExceeded { used, limit, .. } => {
                assert_eq!(used, 1);
                assert_eq!(limit, 1);
            }
            other => panic!("expected QuotaExceeded, got {:?}", other),
        }
        // The denied attempt must not consume anything.
        assert_eq!(subscriptions.uploads_this_week(user_id), Some(1));
    }

    #[tokio::test]
    async fn test_create_rolls_expired_window_before_check() {
        let (service, _materials, subscriptions, _rx) = idle_service();
        let user_id = Uuid::new_v4();
        let mut subscription = create_test_subscription(user_id, SubscriptionStatus::Free);
        subscription.uploads_this_week = 1;
        subscription.week_reset_at = Utc::now() - Duration::hours(2);
        subscriptions.add_subscription(subscription);

        let material = service
            .create_from_url(user_id, "Nueva semana", SourceKind::Youtube, "https://youtube.com/watch?v=x")
            .await
            .unwrap();

        assert_eq!(material.status, MaterialStatus::Pending);
        assert_eq!(subscriptions.uploads_this_week(user_id), Some(1));
    }

    #[tokio::test]
    async fn test_new_user_gets_trial_capacity() {
        let (service, _materials, subscriptions, _rx) = idle_service();
        let user_id = Uuid::new_v4();

        // No seeded subscription: the first touch provisions a trial, which
        // carries the pro upload limit.
        for i in 0..10 {
            service
                .create_from_url(
                    user_id,
                    &format!("Material {}", i),
                    SourceKind::Url,
                    "https://example.com/a",
                )
                .await
                .unwrap();
        }
        let err = service
            .create_from_url(user_id, "Once", SourceKind::Url, "https://example.com/a")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::QuotaExceeded { limit: 10, .. }));
        assert_eq!(subscriptions.uploads_this_week(user_id), Some(10));
    }

    #[tokio::test]
    async fn test_create_rejects_non_http_url() {
        let (service, _materials, _subscriptions, _rx) = idle_service();
        let err = service
            .create_from_url(Uuid::new_v4(), "Archivo", SourceKind::Url, "ftp://example.com/x")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_upload_rejects_disallowed_extension_before_quota() {
        let (service, _materials, subscriptions, _rx) = idle_service();
        let user_id = Uuid::new_v4();

        let err = service
            .create_from_file_bytes(user_id, None, "malware.exe", b"MZ".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        // Rejected before any subscription row is provisioned.
        assert_eq!(subscriptions.uploads_this_week(user_id), None);
    }

    #[tokio::test]
    async fn test_upload_spools_file_and_derives_title() {
        let (service, _materials, _subscriptions, _rx) = idle_service();
        let user_id = Uuid::new_v4();

        let material = service
            .create_from_file_bytes(
                user_id,
                None,
                "cuentos cortos.txt",
                "Habia una vez un gato.".as_bytes().to_vec(),
            )
            .await
            .unwrap();

        assert_eq!(material.source_kind, SourceKind::File);
        assert_eq!(material.title, "cuentos cortos");
        let path = material.file_path.expect("spooled path");
        let stored = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(stored.contains("un gato"));
        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn test_start_ingestion_claims_and_enqueues() {
        let (service, materials, _subscriptions, mut rx) = idle_service();
        let user_id = Uuid::new_v4();
        let material = create_test_material(user_id, MaterialStatus::Pending);
        let id = material.id;
        materials.add_material(material);

        let claimed = service.start_ingestion(user_id, id).await.unwrap();
        assert_eq!(claimed.status, MaterialStatus::Processing);

        let job = rx.try_recv().expect("job queued");
        assert!(matches!(
            job,
            IngestionJob::ExtractMaterial { material_id, .. } if material_id == id
        ));
    }

    #[tokio::test]
    async fn test_start_ingestion_rejects_processing_material() {
        let (service, materials, _subscriptions, _rx) = idle_service();
        let user_id = Uuid::new_v4();
        let material = create_test_material(user_id, MaterialStatus::Processing);
        let id = material.id;
        materials.add_material(material);

        let err = service.start_ingestion(user_id, id).await.unwrap_err();
        match err {
            AppError::InvalidTransition { state, .. } => assert_eq!(state, "processing"),
            other => panic!("expected InvalidTransition, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_material_can_be_restarted() {
        let (service, materials, _subscriptions, _rx) = idle_service();
        let user_id = Uuid::new_v4();
        let material = create_test_material(user_id, MaterialStatus::Failed);
        let id = material.id;
        materials.add_material(material);

        let claimed = service.start_ingestion(user_id, id).await.unwrap();
        assert_eq!(claimed.status, MaterialStatus::Processing);
    }

    #[tokio::test]
    async fn test_queue_full_releases_claim() {
        let materials = Arc::new(MockMaterialStore::new());
        let subscriptions = Arc::new(MockSubscriptionStore::new());
        let (queue, _rx) = IngestionQueue::with_idle_worker(1);
        // Fill the single slot so the next submit is rejected.
        queue
            .submit(IngestionJob::ExtractMaterial {
                material_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
            })
            .unwrap();
        let service = service_with(materials.clone(), subscriptions, queue);

        let user_id = Uuid::new_v4();
        let material = create_test_material(user_id, MaterialStatus::Pending);
        let id = material.id;
        materials.add_material(material);

        let err = service.start_ingestion(user_id, id).await.unwrap_err();
        assert!(matches!(err, AppError::ServiceUnavailable(_)));
        // The claim is rolled back so the learner can retry.
        assert_eq!(materials.status_of(id), Some(MaterialStatus::Pending));
    }

    #[tokio::test]
    async fn test_delete_is_scoped_to_owner() {
        let (service, materials, _subscriptions, _rx) = idle_service();
        let owner = Uuid::new_v4();
        let material = create_test_material(owner, MaterialStatus::Completed);
        let id = material.id;
        materials.add_material(material);

        let err = service.delete(Uuid::new_v4(), id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        service.delete(owner, id).await.unwrap();
        assert_eq!(materials.status_of(id), None);
    }

    #[test]
    fn test_derive_title_from_filename() {
        assert_eq!(derive_title("cuentos_cortos.txt"), "cuentos cortos");
        assert_eq!(derive_title("lesson.one.pdf"), "lesson.one");
        assert_eq!(derive_title(".txt"), "Uploaded material");
    }

    #[test]
    fn test_classify_source_url() {
        assert_eq!(
            classify_source_url("https://www.youtube.com/watch?v=dQw4"),
            SourceKind::Youtube
        );
        assert_eq!(
            classify_source_url("https://youtu.be/dQw4"),
            SourceKind::Youtube
        );
        assert_eq!(
            classify_source_url("https://elpais.com/articulo"),
            SourceKind::Url
        );
    }
}
