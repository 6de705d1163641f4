//! Serializable records of scene state used by history entries.

use std::collections::BTreeMap;

use bevy::prelude::*;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BOX_SIZE, DEFAULT_MATERIAL_COLOR};
use crate::scene::{ElementMetadata, FaceKey, SceneGroup};

/// Serializable transform data
#[derive(Clone, Debug, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformData {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for TransformData {
    fn default() -> Self {
        Self::from(&Transform::IDENTITY)
    }
}

impl From<&Transform> for TransformData {
    fn from(t: &Transform) -> Self {
        Self {
            translation: t.translation,
            rotation: t.rotation,
            scale: t.scale,
        }
    }
}

impl From<TransformData> for Transform {
    fn from(t: TransformData) -> Self {
        Transform {
            translation: t.translation,
            rotation: t.rotation,
            scale: t.scale,
        }
    }
}

impl TransformData {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..default()
        }
    }

    /// Rotation as XYZ euler angles in radians
    pub fn euler(&self) -> Vec3 {
        let (x, y, z) = self.rotation.to_euler(EulerRot::XYZ);
        Vec3::new(x, y, z)
    }

    pub fn approx_eq(&self, other: &TransformData, tolerance: f32) -> bool {
        self.translation.abs_diff_eq(other.translation, tolerance)
            && self.scale.abs_diff_eq(other.scale, tolerance)
            && self.euler().abs_diff_eq(other.euler(), tolerance)
    }
}

/// Primitive a mesh was generated from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    Box,
    Sphere,
    Cylinder,
    Cone,
    Plane,
    Torus,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Geometry kind plus its numeric parameters (width, radius, segments, ...)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryDescriptor {
    pub kind: GeometryKind,
    #[serde(default)]
    pub parameters: BTreeMap<String, f32>,
}

impl GeometryDescriptor {
    pub fn new(kind: GeometryKind) -> Self {
        Self {
            kind,
            parameters: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: f32) -> Self {
        self.parameters.insert(key.to_string(), value);
        self
    }

    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        Self::new(GeometryKind::Box)
            .with("width", width)
            .with("height", height)
            .with("depth", depth)
    }

    /// The geometry substituted for unknown descriptors
    pub fn default_box() -> Self {
        Self::cuboid(DEFAULT_BOX_SIZE, DEFAULT_BOX_SIZE, DEFAULT_BOX_SIZE)
    }

    /// Approximate extents of the generated mesh
    pub fn bounding_size(&self) -> Vec3 {
        let radius = self.param("radius", 5.0);
        match self.kind {
            GeometryKind::Sphere => Vec3::splat(radius * 2.0),
            GeometryKind::Cylinder => {
                let r = self.param("radiusTop", 5.0).max(self.param("radiusBottom", 5.0));
                Vec3::new(r * 2.0, self.param("height", 10.0), r * 2.0)
            }
            GeometryKind::Cone => Vec3::new(radius * 2.0, self.param("height", 10.0), radius * 2.0),
            GeometryKind::Plane => Vec3::new(self.param("width", 10.0), 0.0, self.param("height", 10.0)),
            GeometryKind::Torus => {
                let outer = (radius + self.param("tube", 2.0)) * 2.0;
                Vec3::new(outer, self.param("tube", 2.0) * 2.0, outer)
            }
            GeometryKind::Box | GeometryKind::Unknown => Vec3::new(
                self.param("width", DEFAULT_BOX_SIZE),
                self.param("height", DEFAULT_BOX_SIZE),
                self.param("depth", DEFAULT_BOX_SIZE),
            ),
        }
    }

    /// Positive finite parameter, or `default` when missing or invalid
    pub fn param(&self, key: &str, default: f32) -> f32 {
        self.parameters
            .get(key)
            .copied()
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(default)
    }
}

/// Per-slot material values
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialDescriptor {
    /// Base color as `0xRRGGBB`
    pub color: u32,
    /// Emissive color as `0xRRGGBB`
    pub emissive: u32,
    pub opacity: f32,
    pub transparent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture_url: Option<String>,
}

impl Default for MaterialDescriptor {
    fn default() -> Self {
        Self::solid(DEFAULT_MATERIAL_COLOR)
    }
}

impl MaterialDescriptor {
    pub fn solid(color: u32) -> Self {
        Self {
            color,
            emissive: 0x000000,
            opacity: 1.0,
            transparent: false,
            texture_url: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Mesh,
    Group,
}

/// Everything needed to recreate one element
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub id: String,
    pub node: NodeKind,
    pub transform: TransformData,
    pub visible: bool,
    #[serde(default)]
    pub metadata: ElementMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<GeometryDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<MaterialDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementRecord>,
}

impl ElementRecord {
    /// Mesh record with a single material slot
    pub fn mesh(
        id: impl Into<String>,
        metadata: ElementMetadata,
        geometry: GeometryDescriptor,
        material: MaterialDescriptor,
    ) -> Self {
        Self {
            id: id.into(),
            node: NodeKind::Mesh,
            transform: TransformData::default(),
            visible: true,
            metadata,
            geometry: Some(geometry),
            materials: vec![material],
            children: Vec::new(),
        }
    }

    pub fn group(id: impl Into<String>, metadata: ElementMetadata, children: Vec<ElementRecord>) -> Self {
        Self {
            id: id.into(),
            node: NodeKind::Group,
            transform: TransformData::default(),
            visible: true,
            metadata,
            geometry: None,
            materials: Vec::new(),
            children,
        }
    }

    pub fn with_transform(mut self, transform: TransformData) -> Self {
        self.transform = transform;
        self
    }

    /// Group the record is recreated under
    pub fn target_group(&self) -> SceneGroup {
        if self.metadata.is_external_model {
            SceneGroup::ExternalModels
        } else {
            SceneGroup::Buildings
        }
    }

    pub fn applied_color(&self) -> Option<u32> {
        self.metadata.modifications.color
    }

    pub fn applied_textures(&self) -> &BTreeMap<FaceKey, String> {
        &self.metadata.modifications.textures
    }

    /// Record of an element produced by merging others
    pub fn is_merge_result(&self) -> bool {
        self.metadata.is_merged && !self.metadata.original_elements.is_empty()
    }

    /// Texture URL of every material slot in this record and its children
    pub fn slot_texture_urls(&self) -> Vec<Option<String>> {
        let mut urls: Vec<Option<String>> =
            self.materials.iter().map(|m| m.texture_url.clone()).collect();
        for child in &self.children {
            urls.extend(child.slot_texture_urls());
        }
        urls
    }
}

/// Full capture of both top-level groups
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub groups: BTreeMap<SceneGroup, Vec<ElementRecord>>,
    pub timestamp: DateTime<Local>,
}

impl Default for SceneSnapshot {
    fn default() -> Self {
        Self {
            groups: BTreeMap::new(),
            timestamp: Local::now(),
        }
    }
}

impl SceneSnapshot {
    pub fn records(&self, group: SceneGroup) -> &[ElementRecord] {
        self.groups.get(&group).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn element_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.groups.values().flatten().any(|record| record.id == id)
    }
}

/// Color of one element before a recorded recolor
#[derive(Clone, Debug, PartialEq)]
pub struct ColorState {
    pub element_id: String,
    /// Override recorded in the element's modifications
    pub applied: Option<u32>,
    /// Base color of every material slot, in traversal order
    pub slot_colors: Vec<u32>,
}

/// Textures of one element before a recorded texture change
#[derive(Clone, Debug, PartialEq)]
pub struct TextureState {
    pub element_id: String,
    pub applied: BTreeMap<FaceKey, String>,
    /// Texture URL of every material slot, in traversal order
    pub slot_urls: Vec<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ElementKind;

    #[test]
    fn test_param_falls_back_on_invalid_values() {
        let geometry = GeometryDescriptor::new(GeometryKind::Sphere)
            .with("radius", -2.0)
            .with("widthSegments", 16.0);
        assert_eq!(geometry.param("radius", 5.0), 5.0);
        assert_eq!(geometry.param("widthSegments", 32.0), 16.0);
        assert_eq!(geometry.param("missing", 1.5), 1.5);
    }

    #[test]
    fn test_target_group() {
        let mut record = ElementRecord::mesh(
            "m1",
            ElementMetadata::new(ElementKind::Other),
            GeometryDescriptor::default_box(),
            MaterialDescriptor::default(),
        );
        assert_eq!(record.target_group(), SceneGroup::Buildings);
        record.metadata.is_external_model = true;
        assert_eq!(record.target_group(), SceneGroup::ExternalModels);
    }

    #[test]
    fn test_unknown_geometry_kind_deserializes() {
        let geometry: GeometryDescriptor =
            serde_json::from_str(r#"{"kind":"extrude","parameters":{"depth":3.0}}"#).unwrap();
        assert_eq!(geometry.kind, GeometryKind::Unknown);
    }

    #[test]
    fn test_transform_euler_round_trip() {
        let transform = Transform::from_xyz(1.0, 2.0, 3.0)
            .with_rotation(Quat::from_euler(EulerRot::XYZ, 0.1, 0.2, 0.3));
        let data = TransformData::from(&transform);
        let euler = data.euler();
        assert!((euler.x - 0.1).abs() < 1e-5);
        assert!((euler.y - 0.2).abs() < 1e-5);
        assert!((euler.z - 0.3).abs() < 1e-5);
        assert_eq!(Transform::from(data), transform);
    }
}
