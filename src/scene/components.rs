//! Components describing scene elements and their editable metadata.

use std::collections::BTreeMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::editor::history::{ElementRecord, GeometryDescriptor};

/// Top-level container an element lives under
#[derive(
    Component, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum SceneGroup {
    /// Map data and user-created buildings
    Buildings,
    /// Imported external models
    ExternalModels,
}

impl SceneGroup {
    pub const ALL: [SceneGroup; 2] = [SceneGroup::Buildings, SceneGroup::ExternalModels];

    pub fn display_name(&self) -> &'static str {
        match self {
            SceneGroup::Buildings => "Buildings",
            SceneGroup::ExternalModels => "External Models",
        }
    }
}

/// Stable identifier of a scene element, independent of the ECS entity
#[derive(Component, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementId(pub String);

impl ElementId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Semantic category of an element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Building,
    Highway,
    Water,
    Natural,
    Landuse,
    Group,
    Merged,
    #[default]
    #[serde(other)]
    Other,
}

impl ElementKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ElementKind::Building => "Building",
            ElementKind::Highway => "Highway",
            ElementKind::Water => "Water",
            ElementKind::Natural => "Natural",
            ElementKind::Landuse => "Landuse",
            ElementKind::Other => "Other",
            ElementKind::Group => "Group",
            ElementKind::Merged => "Merged",
        }
    }
}

/// Face of a mesh a texture is applied to.
///
/// Material slots of multi-material meshes map to faces as
/// `[aside, top, side, bottom, side, side]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceKey {
    All,
    Top,
    Side,
    Aside,
    Bottom,
}

impl FaceKey {
    pub const SELECTABLE: [FaceKey; 5] = [
        FaceKey::All,
        FaceKey::Top,
        FaceKey::Side,
        FaceKey::Aside,
        FaceKey::Bottom,
    ];

    /// Face a material slot belongs to
    pub fn for_slot(index: usize) -> FaceKey {
        match index {
            0 => FaceKey::Aside,
            1 => FaceKey::Top,
            3 => FaceKey::Bottom,
            _ => FaceKey::Side,
        }
    }

    /// Whether a texture targeting this face lands on the given slot.
    /// Single-material meshes always take the texture on slot 0.
    pub fn applies_to_slot(&self, index: usize, slot_count: usize) -> bool {
        if slot_count <= 1 {
            return index == 0;
        }
        *self == FaceKey::All || FaceKey::for_slot(index) == *self
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FaceKey::All => "All faces",
            FaceKey::Top => "Top",
            FaceKey::Side => "Side",
            FaceKey::Aside => "Aside",
            FaceKey::Bottom => "Bottom",
        }
    }
}

/// User edits layered on top of the element's source data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Modifications {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    /// Color override applied by the user (`0xRRGGBB`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    /// Texture URL applied per face
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub textures: BTreeMap<FaceKey, String>,
}

impl Modifications {
    pub fn is_empty(&self) -> bool {
        self.height.is_none() && self.color.is_none() && self.textures.is_empty()
    }
}

/// Open metadata bag attached to every element
#[derive(Component, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementMetadata {
    #[serde(rename = "type", default)]
    pub kind: ElementKind,
    #[serde(default)]
    pub is_user_created: bool,
    #[serde(default)]
    pub is_external_model: bool,
    #[serde(default)]
    pub is_merged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_height: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_depth: Option<f32>,
    #[serde(default, skip_serializing_if = "Modifications::is_empty")]
    pub modifications: Modifications,
    /// Elements a merge consumed; restoring the merge recreates these
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub original_elements: Vec<ElementRecord>,
    /// Keys this editor does not interpret but must carry through
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ElementMetadata {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            ..default()
        }
    }
}

/// Parametric description the element's mesh was built from
#[derive(Component, Debug, Clone, PartialEq)]
pub struct ElementGeometry(pub GeometryDescriptor);

/// Material slots of a mesh element; slot 0 is also its `MeshMaterial3d`
#[derive(Component, Debug, Clone, PartialEq)]
pub struct ElementMaterials(pub Vec<Handle<StandardMaterial>>);

/// Entities of the two top-level groups
#[derive(Resource, Debug, Clone, Copy)]
pub struct SceneGroups {
    pub buildings: Entity,
    pub external_models: Entity,
}

impl SceneGroups {
    pub fn get(&self, group: SceneGroup) -> Entity {
        match group {
            SceneGroup::Buildings => self.buildings,
            SceneGroup::ExternalModels => self.external_models,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_slot_mapping() {
        let faces: Vec<FaceKey> = (0..6).map(FaceKey::for_slot).collect();
        assert_eq!(
            faces,
            vec![
                FaceKey::Aside,
                FaceKey::Top,
                FaceKey::Side,
                FaceKey::Bottom,
                FaceKey::Side,
                FaceKey::Side
            ]
        );
    }

    #[test]
    fn test_face_applies_to_slot() {
        assert!(FaceKey::Top.applies_to_slot(0, 1));
        assert!(!FaceKey::Top.applies_to_slot(0, 6));
        assert!(FaceKey::Top.applies_to_slot(1, 6));
        assert!(FaceKey::Side.applies_to_slot(4, 6));
        assert!((0..6).all(|i| FaceKey::All.applies_to_slot(i, 6)));
    }

    #[test]
    fn test_metadata_keeps_unknown_keys() {
        let json = r#"{"type":"building","isUserCreated":true,"osmId":1234,"modifications":{"color":16711680}}"#;
        let metadata: ElementMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.kind, ElementKind::Building);
        assert!(metadata.is_user_created);
        assert_eq!(metadata.modifications.color, Some(0xff0000));
        assert_eq!(metadata.extra.get("osmId"), Some(&serde_json::json!(1234)));

        let back = serde_json::to_value(&metadata).unwrap();
        assert_eq!(back["osmId"], serde_json::json!(1234));
        assert_eq!(back["type"], serde_json::json!("building"));
    }

    #[test]
    fn test_unknown_kind_reads_as_other() {
        let metadata: ElementMetadata = serde_json::from_str(r#"{"type":"railway"}"#).unwrap();
        assert_eq!(metadata.kind, ElementKind::Other);
    }
}
