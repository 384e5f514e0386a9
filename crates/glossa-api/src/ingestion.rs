//! Background ingestion queue.
//!
//! Extraction runs off the request path: handlers claim the material row,
//! enqueue a job, and return 202. A bounded channel feeds a worker pool
//! capped by a semaphore; when the channel is full, submission fails fast
//! instead of stalling the handler.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, Semaphore};
use uuid::Uuid;

use glossa_ai::{ContentGenerator, ExtractionRequest, ExtractionSource};
use glossa_core::models::{Material, SourceKind};
use glossa_core::AppError;
use glossa_db::stores::MaterialStore;

#[derive(Debug, Clone)]
pub enum IngestionJob {
    ExtractMaterial { material_id: Uuid, user_id: Uuid },
}

pub struct IngestionQueue {
    tx: mpsc::Sender<IngestionJob>,
}

impl IngestionQueue {
    /// Create a new ingestion queue with a bounded channel.
    ///
    /// # Arguments
    /// * `materials` - Store the workers read claims from and write results to
    /// * `generator` - Content generator the workers call
    /// * `queue_size` - Channel bound; `submit()` fails when it is full
    /// * `max_concurrent` - Maximum number of concurrent extraction jobs
    pub fn new(
        materials: Arc<dyn MaterialStore>,
        generator: Arc<dyn ContentGenerator>,
        queue_size: usize,
        max_concurrent: usize,
    ) -> Self {
        let queue_size = queue_size.max(1);
        let max_concurrent = max_concurrent.max(1);
        let (tx, rx) = mpsc::channel(queue_size);

        tokio::spawn(async move {
            Self::worker_pool(rx, materials, generator, max_concurrent).await;
        });

        tracing::info!(
            queue_size = queue_size,
            max_concurrent = max_concurrent,
            "Ingestion queue initialized with bounded channel"
        );

        Self { tx }
    }

    /// Queue with the given capacity and no running worker. Jobs sit in the
    /// returned receiver, so tests can fill the channel deterministically.
    #[cfg(test)]
    pub(crate) fn with_idle_worker(queue_size: usize) -> (Self, mpsc::Receiver<IngestionJob>) {
        let (tx, rx) = mpsc::channel(queue_size.max(1));
        (Self { tx }, rx)
    }

    #[tracing::instrument(skip(self), fields(job.type = "extract"))]
    pub fn submit(&self, job: IngestionJob) -> Result<(), AppError> {
        match &job {
            IngestionJob::ExtractMaterial { material_id, .. } => {
                tracing::info!(material_id = %material_id, "Enqueuing extraction job");
            }
        }
        self.tx.try_send(job).map_err(|e| match &e {
            mpsc::error::TrySendError::Full(_) => {
                tracing::warn!("Ingestion queue is full, rejecting job");
                AppError::ServiceUnavailable(
                    "Ingestion queue is full, please try again later".to_string(),
                )
            }
            _ => AppError::Internal(format!("Failed to submit extraction job: {}", e)),
        })
    }

    async fn worker_pool(
        mut rx: mpsc::Receiver<IngestionJob>,
        materials: Arc<dyn MaterialStore>,
        generator: Arc<dyn ContentGenerator>,
        max_concurrent: usize,
    ) {
        let semaphore = Arc::new(Semaphore::new(max_concurrent));

        while let Some(job) = rx.recv().await {
            let permit = semaphore.clone().acquire_owned().await;
            let materials = materials.clone();
            let generator = generator.clone();

            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = Self::process_job(job, materials, generator).await {
                    tracing::error!(error = %e, "Extraction job failed");
                }
            });
        }
    }

    async fn process_job(
        job: IngestionJob,
        materials: Arc<dyn MaterialStore>,
        generator: Arc<dyn ContentGenerator>,
    ) -> Result<()> {
        match job {
            IngestionJob::ExtractMaterial {
                material_id,
                user_id,
            } => Self::process_extraction(material_id, user_id, materials, generator).await,
        }
    }

    #[tracing::instrument(
        skip(materials, generator),
        fields(material.id = %material_id, job.status = tracing::field::Empty)
    )]
    async fn process_extraction(
        material_id: Uuid,
        user_id: Uuid,
        materials: Arc<dyn MaterialStore>,
        generator: Arc<dyn ContentGenerator>,
    ) -> Result<()> {
        let start = std::time::Instant::now();
        tracing::info!(material_id = %material_id, "Starting extraction job");

        let Some(material) = materials.get(user_id, material_id).await? else {
            // Deleted between enqueue and pickup; nothing to do.
            tracing::info!(material_id = %material_id, "Material gone before extraction started");
            return Ok(());
        };

        let request = match Self::build_extraction_request(&material).await {
            Ok(request) => request,
            Err(e) => {
                materials.mark_failed(material_id).await?;
                tracing::Span::current().record("job.status", "failed");
                return Err(e.into());
            }
        };

        let result = generator.extract_flashcards(&request).await;
        let elapsed = start.elapsed();

        match result {
            Ok(output) => {
                let landed = materials
                    .complete_ingestion(material_id, &output.text, &output.cards)
                    .await?;
                if landed {
                    tracing::Span::current().record("job.status", "success");
                    tracing::info!(
                        material_id = %material_id,
                        card_count = output.cards.len(),
                        duration_ms = elapsed.as_millis(),
                        "Extraction completed successfully"
                    );
                } else {
                    // The claim no longer holds (material deleted mid-flight);
                    // the output is dropped rather than written over nothing.
                    tracing::Span::current().record("job.status", "suppressed");
                    tracing::info!(
                        material_id = %material_id,
                        "Extraction finished but the material is gone, discarding output"
                    );
                }
                Ok(())
            }
            Err(e) => {
                tracing::Span::current().record("job.status", "failed");
                tracing::error!(
                    material_id = %material_id,
                    error = %e,
                    duration_ms = elapsed.as_millis(),
                    "Extraction failed"
                );

                if !materials.mark_failed(material_id).await? {
                    tracing::info!(
                        material_id = %material_id,
                        "Material no longer processing, skipping failure mark"
                    );
                }

                Err(e.into())
            }
        }
    }

    /// Resolve the material's source into what the generator consumes.
    /// URL-backed sources pass through; file-backed sources are read here
    /// so the generator never touches the filesystem.
    async fn build_extraction_request(material: &Material) -> Result<ExtractionRequest, AppError> {
        let source = match material.source_kind {
            SourceKind::Youtube | SourceKind::Url => {
                let url = material.source_url.clone().ok_or_else(|| {
                    AppError::Internal(format!(
                        "Material {} has no source URL recorded",
                        material.id
                    ))
                })?;
                ExtractionSource::Url {
                    url,
                    kind: material.source_kind,
                }
            }
            SourceKind::File => {
                let path = material.file_path.clone().ok_or_else(|| {
                    AppError::Internal(format!(
                        "Material {} has no file path recorded",
                        material.id
                    ))
                })?;
                ExtractionSource::Text(read_file_text(&path).await?)
            }
        };

        Ok(ExtractionRequest {
            title: material.title.clone(),
            source,
        })
    }
}

impl Clone for IngestionQueue {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Read an uploaded file back as study text. PDFs go through text
/// extraction on a blocking thread; everything else is plain UTF-8.
async fn read_file_text(path: &str) -> Result<String, AppError> {
    let is_pdf = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    if is_pdf {
        let owned = path.to_string();
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&owned))
            .await
            .map_err(|e| AppError::Internal(format!("PDF extraction task panicked: {}", e)))?
            .map_err(|e| AppError::Internal(format!("PDF text extraction failed: {}", e)))?;
        Ok(text)
    } else {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read uploaded file: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glossa_ai::mock::MockGenerator;
    use glossa_core::models::MaterialStatus;
    use glossa_db::test_support::fixtures::create_test_material;
    use glossa_db::test_support::mock_stores::{MockFlashcardStore, MockMaterialStore};
    use std::time::Duration;

    async fn wait_for_status(
        store: &MockMaterialStore,
        id: Uuid,
        expected: MaterialStatus,
    ) -> bool {
        for _ in 0..200 {
            if store.status_of(id) == Some(expected) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    fn url_material(user_id: Uuid) -> glossa_core::models::Material {
        let mut material = create_test_material(user_id, MaterialStatus::Pending);
        material.source_kind = SourceKind::Url;
        material.source_url = Some("https://example.com/article".to_string());
        material.file_path = None;
        material
    }

    #[tokio::test]
    async fn test_extraction_completes_material_and_stores_cards() {
        let cards = MockFlashcardStore::new();
        let materials = Arc::new(MockMaterialStore::sharing_cards_with(&cards));
        let generator = Arc::new(MockGenerator::new());
        let user_id = Uuid::new_v4();

        let material = url_material(user_id);
        let id = material.id;
        materials.add_material(material);
        materials.begin_processing(user_id, id).await.unwrap();

        let queue = IngestionQueue::new(materials.clone(), generator, 10, 2);
        queue
            .submit(IngestionJob::ExtractMaterial {
                material_id: id,
                user_id,
            })
            .unwrap();

        assert!(wait_for_status(&materials, id, MaterialStatus::Completed).await);
        assert_eq!(cards.card_count(), 2);
    }

    #[tokio::test]
    async fn test_extraction_failure_marks_material_failed() {
        let materials = Arc::new(MockMaterialStore::new());
        let generator = Arc::new(MockGenerator::new());
        generator.set_failure("model unavailable");
        let user_id = Uuid::new_v4();

        let material = url_material(user_id);
        let id = material.id;
        materials.add_material(material);
        materials.begin_processing(user_id, id).await.unwrap();

        let queue = IngestionQueue::new(materials.clone(), generator, 10, 2);
        queue
            .submit(IngestionJob::ExtractMaterial {
                material_id: id,
                user_id,
            })
            .unwrap();

        assert!(wait_for_status(&materials, id, MaterialStatus::Failed).await);
    }

    #[tokio::test]
    async fn test_submit_fails_fast_when_queue_full() {
        let (queue, _rx) = IngestionQueue::with_idle_worker(1);
        let user_id = Uuid::new_v4();

        let first = queue.submit(IngestionJob::ExtractMaterial {
            material_id: Uuid::new_v4(),
            user_id,
        });
        assert!(first.is_ok());

        let second = queue.submit(IngestionJob::ExtractMaterial {
            material_id: Uuid::new_v4(),
            user_id,
        });
        assert!(matches!(second, Err(AppError::ServiceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_plain_text_file_is_read_back() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "El perro corre en el parque.").unwrap();
        let text = read_file_text(file.path().to_str().unwrap()).await.unwrap();
        assert!(text.contains("El perro corre"));
    }
}
