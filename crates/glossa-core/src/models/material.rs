use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Youtube,
    File,
    Url,
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SourceKind::Youtube => write!(f, "youtube"),
            SourceKind::File => write!(f, "file"),
            SourceKind::Url => write!(f, "url"),
        }
    }
}

impl FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "youtube" => Ok(SourceKind::Youtube),
            "file" => Ok(SourceKind::File),
            "url" => Ok(SourceKind::Url),
            _ => Err(anyhow::anyhow!("Invalid source kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum MaterialStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl MaterialStatus {
    /// Whether ingestion may be (re)started from this status.
    /// `completed` is terminal; `processing` is exclusive.
    pub fn can_start_ingestion(&self) -> bool {
        matches!(self, MaterialStatus::Pending | MaterialStatus::Failed)
    }

    /// Whether a status poll can stop: no further transitions happen
    /// without an explicit user action.
    pub fn is_settled(&self) -> bool {
        matches!(self, MaterialStatus::Completed | MaterialStatus::Failed)
    }
}

impl Display for MaterialStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MaterialStatus::Pending => write!(f, "pending"),
            MaterialStatus::Processing => write!(f, "processing"),
            MaterialStatus::Completed => write!(f, "completed"),
            MaterialStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for MaterialStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MaterialStatus::Pending),
            "processing" => Ok(MaterialStatus::Processing),
            "completed" => Ok(MaterialStatus::Completed),
            "failed" => Ok(MaterialStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid material status: {}", s)),
        }
    }
}

/// One imported content source owned by a user.
///
/// `extracted_text` is non-null exactly when `status` is `completed`; the
/// ingestion pipeline is the only writer of `status` and `extracted_text`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Material {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub source_kind: SourceKind,
    pub source_url: Option<String>,
    pub file_path: Option<String>,
    pub extracted_text: Option<String>,
    pub status: MaterialStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response models for API endpoints (wire names follow the client contract)
#[derive(Debug, Serialize, ToSchema)]
pub struct MaterialResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub source_type: SourceKind,
    pub source_url: Option<String>,
    pub file_path: Option<String>,
    pub processed_text: Option<String>,
    pub processing_status: MaterialStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Material> for MaterialResponse {
    fn from(material: Material) -> Self {
        Self {
            id: material.id,
            user_id: material.user_id,
            title: material.title,
            source_type: material.source_kind,
            source_url: material.source_url,
            file_path: material.file_path,
            processed_text: material.extracted_text,
            processing_status: material.status,
            created_at: material.created_at,
        }
    }
}

/// Cheap status projection for the poll endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct MaterialStatusResponse {
    pub id: Uuid,
    pub processing_status: MaterialStatus,
}

impl From<&Material> for MaterialStatusResponse {
    fn from(material: &Material) -> Self {
        Self {
            id: material.id,
            processing_status: material.status,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IngestionAccepted {
    pub message: String,
    pub material_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_display() {
        assert_eq!(SourceKind::Youtube.to_string(), "youtube");
        assert_eq!(SourceKind::File.to_string(), "file");
        assert_eq!(SourceKind::Url.to_string(), "url");
    }

    #[test]
    fn test_source_kind_from_str() {
        assert_eq!("youtube".parse::<SourceKind>().unwrap(), SourceKind::Youtube);
        assert_eq!("file".parse::<SourceKind>().unwrap(), SourceKind::File);
        assert!("torrent".parse::<SourceKind>().is_err());
    }

    #[test]
    fn test_material_status_display_round_trip() {
        for status in [
            MaterialStatus::Pending,
            MaterialStatus::Processing,
            MaterialStatus::Completed,
            MaterialStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<MaterialStatus>().unwrap(), status);
        }
        assert!("done".parse::<MaterialStatus>().is_err());
    }

    #[test]
    fn test_can_start_ingestion() {
        assert!(MaterialStatus::Pending.can_start_ingestion());
        assert!(MaterialStatus::Failed.can_start_ingestion());
        assert!(!MaterialStatus::Processing.can_start_ingestion());
        assert!(!MaterialStatus::Completed.can_start_ingestion());
    }

    #[test]
    fn test_is_settled() {
        assert!(!MaterialStatus::Pending.is_settled());
        assert!(!MaterialStatus::Processing.is_settled());
        assert!(MaterialStatus::Completed.is_settled());
        assert!(MaterialStatus::Failed.is_settled());
    }

    #[test]
    fn test_material_response_wire_names() {
        let material = Material {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Spanish podcast ep. 12".to_string(),
            source_kind: SourceKind::Youtube,
            source_url: Some("https://youtu.be/abc123".to_string()),
            file_path: None,
            extracted_text: Some("hola mundo".to_string()),
            status: MaterialStatus::Completed,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let response = MaterialResponse::from(material.clone());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["source_type"], "youtube");
        assert_eq!(json["processing_status"], "completed");
        assert_eq!(json["processed_text"], "hola mundo");
        assert_eq!(json["title"], "Spanish podcast ep. 12");
    }
}
