//! CAD file entity model: a step-format body paired with its mesh.

use serde::{Deserialize, Serialize};
use sheetflow_core::codec::base64_bytes;
use sheetflow_core::processing::{ProcessLevel, LEVEL_UNPROCESSED};
use sheetflow_core::types::{EntityId, Timestamp};
use sheetflow_core::upload::GeometryFormat;
use sqlx::FromRow;

/// Processing level, bend count and the engine's opaque feature payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct FeatureProps {
    pub process_level: ProcessLevel,
    pub bend_count: i32,
    /// Time the engine spent on feature recognition, in nanoseconds.
    pub fre_time_ns: i64,
    #[serde(with = "base64_bytes", default)]
    pub serial_data: Vec<u8>,
}

/// One extracted bend, resolved to the physical tool that forms it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BendFeature {
    pub angle: i64,
    #[serde(default)]
    pub tool_id: Option<String>,
    /// Engine-provided attributes this service carries but never inspects.
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// A row from the `cad_files` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct CadFile {
    pub id: EntityId,
    pub project_id: EntityId,
    pub file_name: String,
    pub step_url: Option<String>,
    pub obj_url: Option<String>,
    pub material: String,
    pub file_size: i64,
    #[sqlx(flatten)]
    pub feature_props: FeatureProps,
    #[sqlx(json)]
    pub bend_features: Vec<BendFeature>,
    pub created_at: Timestamp,
}

impl CadFile {
    /// A fresh, unprocessed record with neither location filled in.
    pub fn new(id: EntityId, project_id: EntityId, file_name: String, material: String) -> Self {
        Self {
            id,
            project_id,
            file_name,
            step_url: None,
            obj_url: None,
            material,
            file_size: 0,
            feature_props: FeatureProps {
                process_level: LEVEL_UNPROCESSED,
                ..FeatureProps::default()
            },
            bend_features: Vec::new(),
            created_at: chrono::Utc::now(),
        }
    }

    pub fn location(&self, format: GeometryFormat) -> Option<&str> {
        match format {
            GeometryFormat::Step => self.step_url.as_deref(),
            GeometryFormat::Mesh => self.obj_url.as_deref(),
        }
    }

    pub fn set_location(&mut self, format: GeometryFormat, location: String) {
        match format {
            GeometryFormat::Step => self.step_url = Some(location),
            GeometryFormat::Mesh => self.obj_url = Some(location),
        }
    }

    /// Both geometry locations are populated.
    pub fn is_complete(&self) -> bool {
        self.step_url.is_some() && self.obj_url.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetflow_core::types::new_id;

    #[test]
    fn record_is_complete_only_with_both_locations() {
        let mut cad = CadFile::new(new_id(), new_id(), "part.stp".into(), "steel".into());
        assert!(!cad.is_complete());

        cad.set_location(GeometryFormat::Mesh, "a/b/1.obj".into());
        assert!(!cad.is_complete());
        assert_eq!(cad.location(GeometryFormat::Mesh), Some("a/b/1.obj"));

        cad.set_location(GeometryFormat::Step, "a/b/1.stp".into());
        assert!(cad.is_complete());
    }

    #[test]
    fn bend_feature_keeps_engine_attributes() {
        let bend: BendFeature = serde_json::from_value(serde_json::json!({
            "angle": 90,
            "length": 42.5,
            "direction": "up"
        }))
        .unwrap();

        assert_eq!(bend.angle, 90);
        assert!(bend.tool_id.is_none());
        assert_eq!(bend.attributes["direction"], "up");

        let back = serde_json::to_value(&bend).unwrap();
        assert_eq!(back["length"], 42.5);
    }
}
