use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ArtifactId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Markdown,
    Json,
    Text,
    Code,
}

/// An immutable named content blob. Content is never edited in place: each
/// output an agent produces becomes a fresh artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: ArtifactId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    pub content: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(
        name: impl Into<String>,
        kind: ArtifactKind,
        content: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            id: ArtifactId::new_v4(),
            name: name.into(),
            kind,
            content: content.into(),
            created_by: created_by.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_as_type() {
        let artifact = Artifact::new("notes.md", ArtifactKind::Markdown, "# hi", "User");
        let json = serde_json::to_value(&artifact).unwrap();
        assert_eq!(json["type"], "markdown");
        assert_eq!(json["createdBy"], "User");
    }
}
