//! Structural validation of a model.
//!
//! [`Validator::validate`] walks every object sequence and returns the
//! [`Diagnostic`]s whose severity is enabled in its [`SeverityMask`]. The
//! pass only reads the model and never fails.

mod message;

pub use message::*;

use std::collections::HashSet;

use crate::model::{
    Bone, Material, Model, ModelObject, MorphCategory, NameCache, NamedObject, Texture, TextureId,
    ToonTexture, VertexType,
};
use crate::util::{epsilon_equal, shift_jis_len, Vec2, Vec3, EPSILON};

/// Longest first-language name, in Shift-JIS bytes, that fits a PMD-era field.
pub const MAX_NAME_SHIFT_JIS_LEN: usize = 15;

/// Tolerance for fixed axis length checks.
const AXIS_LENGTH_TOLERANCE: f32 = 1.0e-3;

/// Predicate telling whether a texture file exists.
pub type TextureExists = Box<dyn Fn(&Texture) -> bool>;

/// Model validator.
pub struct Validator {
    mask: SeverityMask,
    texture_exists: Option<TextureExists>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(SeverityMask::ALL)
    }
}

impl Validator {
    pub fn new(mask: SeverityMask) -> Self {
        Self { mask, texture_exists: None }
    }

    /// Enable the texture-not-found checks.
    pub fn with_texture_predicate(mut self, exists: impl Fn(&Texture) -> bool + 'static) -> Self {
        self.texture_exists = Some(Box::new(exists));
        self
    }

    /// Run every check.
    #[tracing::instrument(skip_all)]
    pub fn validate(&self, model: &Model) -> Vec<Diagnostic> {
        let mut out = Diagnostics { mask: self.mask, list: Vec::new() };
        self.validate_vertices(model, &mut out);
        self.validate_faces(model, &mut out);
        self.validate_materials(model, &mut out);
        self.validate_bones(model, &mut out);
        self.validate_labels(model, &mut out);
        self.validate_morphs(model, &mut out);
        self.validate_rigid_bodies(model, &mut out);
        self.validate_joints(model, &mut out);
        self.validate_soft_bodies(model, &mut out);
        tracing::debug!(count = out.list.len(), "validation finished");
        out.list
    }

    fn validate_vertices(&self, model: &Model, out: &mut Diagnostics) {
        for vertex in &model.vertices {
            let subject = Subject::Vertex(vertex.id());
            let detail = vertex.index().unwrap_or_default().to_string();
            let at = |out: &mut Diagnostics, kind, severity| {
                out.push(kind, severity, subject, detail.clone())
            };
            if let Some(kind) = non_finite(vertex.origin.to_array()) {
                at(out, kind, Severity::Error);
            }
            if let Some(kind) = non_finite(vertex.normal.to_array()) {
                at(out, kind, Severity::Error);
            } else if vertex.normal.length() < EPSILON {
                at(out, MessageKind::VertexNormalInvalid, Severity::Error);
            }
            match tex_coord_kind(vertex.uv) {
                Some(MessageKind::VertexTexCoordOutOfBound) => {
                    at(out, MessageKind::VertexTexCoordOutOfBound, Severity::Info)
                }
                Some(kind) => at(out, kind, Severity::Error),
                None => {}
            }
            for bone in vertex.used_bones() {
                if model.bones.resolve(*bone).is_none() {
                    at(out, MessageKind::VertexNullBoneObject, Severity::Error);
                }
            }
            let normalized = match vertex.vertex_type {
                VertexType::Bdef1 => epsilon_equal(vertex.weights[0], 1.0, EPSILON),
                VertexType::Bdef2 | VertexType::Sdef => (0.0..=1.0).contains(&vertex.weights[0]),
                VertexType::Bdef4 | VertexType::Qdef => {
                    epsilon_equal(vertex.weights.iter().sum(), 1.0, EPSILON)
                }
            };
            if !normalized {
                at(out, MessageKind::VertexBoneWeightNotNormalized, Severity::Warning);
            }
        }
    }

    fn validate_faces(&self, model: &Model, out: &mut Diagnostics) {
        let indices = &model.vertex_indices;
        if indices.len() % 3 != 0 {
            out.push(
                MessageKind::FaceNotTriangulated,
                Severity::Fatal,
                Subject::Model,
                indices.len().to_string(),
            );
            return;
        }
        let num_vertices = model.vertices.len();
        let mut used = vec![false; num_vertices];
        for (position, &index) in indices.iter().enumerate() {
            let index = index as usize;
            if num_vertices == 0 {
                out.push(MessageKind::FaceNullVertexObject, Severity::Error, Subject::Face(position), position.to_string());
            } else if index >= num_vertices {
                out.push(
                    MessageKind::FaceVertexObjectOutOfBound,
                    Severity::Error,
                    Subject::Face(position),
                    format!("{} ({})", position, index),
                );
            } else {
                used[index] = true;
            }
        }
        for (vertex, used) in model.vertices.iter().zip(used) {
            if !used {
                out.push(
                    MessageKind::FaceVertexObjectNotUsed,
                    Severity::Info,
                    Subject::Vertex(vertex.id()),
                    vertex.index().unwrap_or_default().to_string(),
                );
            }
        }
    }

    fn validate_materials(&self, model: &Model, out: &mut Diagnostics) {
        let mut names = HashSet::new();
        for material in &model.materials {
            let subject = Subject::Material(material.id());
            let detail = display_name(material);
            if material.name.first().is_empty() {
                out.push(MessageKind::MaterialEmptyName, Severity::Warning, subject, detail.clone());
            } else if !names.insert(material.name.first()) {
                out.push(MessageKind::MaterialDuplicatedName, Severity::Warning, subject, detail.clone());
            }
            let colors = [
                (material.ambient_color, MessageKind::MaterialAmbientColorOutOfBound),
                (material.diffuse_color, MessageKind::MaterialDiffuseColorOutOfBound),
                (material.specular_color, MessageKind::MaterialSpecularColorOutOfBound),
                (material.edge_color, MessageKind::MaterialEdgeColorOutOfBound),
            ];
            for (color, kind) in colors {
                if let Some((kind, severity)) = unit_range_kind(&color.to_array(), kind) {
                    out.push(kind, severity, subject, detail.clone());
                }
            }
            let opacities = [
                (material.diffuse_opacity, MessageKind::MaterialDiffuseOpacityOutOfBound),
                (material.edge_opacity, MessageKind::MaterialEdgeOpacityOutOfBound),
            ];
            for (opacity, kind) in opacities {
                if let Some((kind, severity)) = unit_range_kind(&[opacity], kind) {
                    out.push(kind, severity, subject, detail.clone());
                }
            }
            if let Some(exists) = &self.texture_exists {
                for (texture, kind) in material_textures(material) {
                    if let Some(texture) = model.textures.resolve(texture) {
                        if !exists(texture) {
                            out.push(kind, Severity::Warning, subject, texture.path.clone());
                        }
                    }
                }
            }
        }
        let total = model.total_material_vertex_indices();
        let len = model.vertex_indices.len();
        if total < len {
            out.push(MessageKind::MaterialVertexIndexNotFill, Severity::Fatal, Subject::Model, format!("{} < {}", total, len));
        } else if total > len {
            out.push(MessageKind::MaterialVertexIndexOverflow, Severity::Fatal, Subject::Model, format!("{} > {}", total, len));
        }
    }

    fn validate_bones(&self, model: &Model, out: &mut Diagnostics) {
        let mut names = HashSet::new();
        for bone in &model.bones {
            let subject = Subject::Bone(bone.id());
            let detail = display_name(bone);
            let name = bone.name.first();
            if name.is_empty() {
                out.push(MessageKind::BoneEmptyName, Severity::Error, subject, detail.clone());
            } else {
                if shift_jis_len(name) > MAX_NAME_SHIFT_JIS_LEN {
                    let severity = if bone.is_user_handleable() { Severity::Warning } else { Severity::Info };
                    out.push(MessageKind::BoneTooLongName, severity, subject, detail.clone());
                }
                if !names.insert(name) {
                    out.push(MessageKind::BoneDuplicatedName, Severity::Warning, subject, detail.clone());
                }
            }
            if let Some(kind) = non_finite(bone.origin.to_array()) {
                out.push(kind, Severity::Error, subject, detail.clone());
            }
            if let Some(parent) = model.bones.resolve(bone.parent_bone) {
                if transforms_after(parent, bone) {
                    out.push(MessageKind::BoneTransformBeforeParent, Severity::Warning, subject, detail.clone());
                }
            }
            if bone.has_inherent() {
                match model.bones.resolve(bone.inherent_parent_bone) {
                    None => out.push(
                        MessageKind::BoneInherentBoneNullBoneObject,
                        Severity::Warning,
                        subject,
                        detail.clone(),
                    ),
                    Some(parent) if transforms_after(parent, bone) => out.push(
                        MessageKind::BoneTransformBeforeInherentParent,
                        Severity::Warning,
                        subject,
                        detail.clone(),
                    ),
                    Some(_) => {}
                }
            }
            if let Some(constraint) = model.bone_constraint(bone.id()) {
                if let Some(effector) = model.bones.resolve(constraint.effector_bone) {
                    if transforms_after(effector, bone) {
                        out.push(MessageKind::BoneTransformBeforeConstraint, Severity::Warning, subject, detail.clone());
                    }
                }
            }
            if bone.has_fixed_axis()
                && !epsilon_equal(bone.fixed_axis.length(), 1.0, AXIS_LENGTH_TOLERANCE)
            {
                out.push(MessageKind::BoneFixedAxisNotNormalized, Severity::Warning, subject, detail);
            }
        }
    }

    fn validate_labels(&self, model: &Model, out: &mut Diagnostics) {
        let mut names = HashSet::new();
        let mut bones = HashSet::new();
        let mut morphs = HashSet::new();
        for label in &model.labels {
            let subject = Subject::Label(label.id());
            let detail = display_name(label);
            if label.name.first().is_empty() {
                out.push(MessageKind::LabelEmptyName, Severity::Warning, subject, detail.clone());
            } else if !names.insert(label.name.first()) {
                out.push(MessageKind::LabelDuplicatedName, Severity::Warning, subject, detail.clone());
            }
            if label.items.is_empty() {
                out.push(MessageKind::LabelEmptyItems, Severity::Info, subject, detail.clone());
            }
            for item in &label.items {
                let subject = Subject::LabelItem(label.id(), item.id());
                let detail = format!("{} [{}]", detail, item.index().unwrap_or_default());
                match item.target {
                    crate::model::LabelTarget::Bone(bone) => match model.bones.resolve(bone) {
                        Some(bone) => {
                            bones.insert(bone.id());
                        }
                        None => out.push(MessageKind::LabelItemNullBoneObject, Severity::Error, subject, detail),
                    },
                    crate::model::LabelTarget::Morph(morph) => match model.morphs.resolve(morph) {
                        Some(morph) => {
                            morphs.insert(morph.id());
                        }
                        None => out.push(MessageKind::LabelItemNullMorphObject, Severity::Error, subject, detail),
                    },
                }
            }
        }
        for bone in model.bones.iter().filter(|b| !bones.contains(&b.id())) {
            out.push(
                MessageKind::LabelNotAssignedBoneObject,
                Severity::Warning,
                Subject::Bone(bone.id()),
                display_name(bone),
            );
        }
        for morph in model.morphs.iter().filter(|m| !morphs.contains(&m.id())) {
            out.push(
                MessageKind::LabelNotAssignedMorphObject,
                Severity::Warning,
                Subject::Morph(morph.id()),
                display_name(morph),
            );
        }
    }

    fn validate_morphs(&self, model: &Model, out: &mut Diagnostics) {
        let mut names = HashSet::new();
        for morph in &model.morphs {
            let subject = Subject::Morph(morph.id());
            let detail = display_name(morph);
            let name = morph.name.first();
            if name.is_empty() {
                out.push(MessageKind::MorphEmptyName, Severity::Error, subject, detail);
                continue;
            }
            if shift_jis_len(name) > MAX_NAME_SHIFT_JIS_LEN {
                // base morphs are never shown to the user
                let severity = if morph.category == MorphCategory::Base { Severity::Info } else { Severity::Warning };
                out.push(MessageKind::MorphTooLongName, severity, subject, detail.clone());
            }
            if !names.insert(name) {
                out.push(MessageKind::MorphDuplicatedName, Severity::Warning, subject, detail);
            }
        }
    }

    fn validate_rigid_bodies(&self, model: &Model, out: &mut Diagnostics) {
        let mut names = HashSet::new();
        for body in &model.rigid_bodies {
            let subject = Subject::RigidBody(body.id());
            let detail = display_name(body);
            if body.name.first().is_empty() {
                out.push(MessageKind::RigidBodyEmptyName, Severity::Warning, subject, detail.clone());
            } else if !names.insert(body.name.first()) {
                out.push(MessageKind::RigidBodyDuplicatedName, Severity::Warning, subject, detail.clone());
            }
            for value in [body.origin, body.orientation] {
                if let Some(kind) = non_finite(value.to_array()) {
                    out.push(kind, Severity::Error, subject, detail.clone());
                }
            }
            if model.bones.resolve(body.bone).is_none() {
                out.push(MessageKind::RigidBodyNullBoneObject, Severity::Error, subject, detail);
            }
        }
    }

    fn validate_joints(&self, model: &Model, out: &mut Diagnostics) {
        let mut names = HashSet::new();
        for joint in &model.joints {
            let subject = Subject::Joint(joint.id());
            let detail = display_name(joint);
            if joint.name.first().is_empty() {
                out.push(MessageKind::JointEmptyName, Severity::Warning, subject, detail.clone());
            } else if !names.insert(joint.name.first()) {
                out.push(MessageKind::JointDuplicatedName, Severity::Warning, subject, detail.clone());
            }
            if model.rigid_bodies.resolve(joint.rigid_body_a).is_none() {
                out.push(MessageKind::JointNullRigidBodyAObject, Severity::Fatal, subject, detail.clone());
            }
            if model.rigid_bodies.resolve(joint.rigid_body_b).is_none() {
                out.push(MessageKind::JointNullRigidBodyBObject, Severity::Fatal, subject, detail.clone());
            }
            let vectors: [Vec3; 8] = [
                joint.origin,
                joint.linear_upper_limit,
                joint.linear_lower_limit,
                joint.linear_stiffness,
                joint.orientation,
                joint.angular_upper_limit,
                joint.angular_lower_limit,
                joint.angular_stiffness,
            ];
            for value in vectors {
                if let Some(kind) = non_finite(value.to_array()) {
                    out.push(kind, Severity::Error, subject, detail.clone());
                }
            }
        }
    }

    fn validate_soft_bodies(&self, model: &Model, out: &mut Diagnostics) {
        let mut names = HashSet::new();
        for soft_body in &model.soft_bodies {
            let subject = Subject::SoftBody(soft_body.id());
            let detail = display_name(soft_body);
            if soft_body.name.first().is_empty() {
                out.push(MessageKind::SoftBodyEmptyName, Severity::Warning, subject, detail.clone());
            } else if !names.insert(soft_body.name.first()) {
                out.push(MessageKind::SoftBodyDuplicatedName, Severity::Warning, subject, detail.clone());
            }
            if model.materials.resolve(soft_body.material).is_none() {
                out.push(MessageKind::SoftBodyNullMaterialObject, Severity::Error, subject, detail);
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Diagnostic list filtered by severity.
struct Diagnostics {
    mask: SeverityMask,
    list: Vec<Diagnostic>,
}

impl Diagnostics {
    fn push(&mut self, kind: MessageKind, severity: Severity, subject: Subject, detail: String) {
        if self.mask.contains(severity) {
            self.list.push(Diagnostic { kind, severity, subject, detail });
        }
    }
}

fn display_name<T: NamedObject>(object: &T) -> String {
    NameCache::of(object).display
}

fn non_finite<const N: usize>(values: [f32; N]) -> Option<MessageKind> {
    for value in values {
        if value.is_nan() {
            return Some(MessageKind::PrimitiveFloatNaN);
        }
        if value.is_infinite() {
            return Some(MessageKind::PrimitiveFloatInfinity);
        }
    }
    None
}

fn tex_coord_kind(uv: Vec2) -> Option<MessageKind> {
    non_finite(uv.to_array()).or_else(|| {
        uv.to_array()
            .iter()
            .any(|c| !(-1.0..=1.0).contains(c))
            .then_some(MessageKind::VertexTexCoordOutOfBound)
    })
}

/// Check components against `[0, 1]`; non-finite values report as primitives.
fn unit_range_kind(values: &[f32], kind: MessageKind) -> Option<(MessageKind, Severity)> {
    for &value in values {
        if value.is_nan() {
            return Some((MessageKind::PrimitiveFloatNaN, Severity::Error));
        }
        if value.is_infinite() {
            return Some((MessageKind::PrimitiveFloatInfinity, Severity::Error));
        }
        if !(0.0..=1.0).contains(&value) {
            return Some((kind, Severity::Warning));
        }
    }
    None
}

fn material_textures(material: &Material) -> [(Option<TextureId>, MessageKind); 3] {
    let toon = match material.toon {
        ToonTexture::Texture(texture) => texture,
        ToonTexture::Shared(_) => None,
    };
    [
        (material.diffuse_texture, MessageKind::MaterialDiffuseTextureNotFound),
        (material.sphere_map_texture, MessageKind::MaterialSphereMapTextureNotFound),
        (toon, MessageKind::MaterialToonTextureNotFound),
    ]
}

/// Whether `dependency` is resolved after `bone` in transform order.
///
/// Physics-driven bones run after every other bone, then stage, then index.
fn transforms_after(dependency: &Bone, bone: &Bone) -> bool {
    let key = |b: &Bone| (b.is_affected_by_physics(), b.stage_index, b.index().unwrap_or_default());
    key(dependency) > key(bone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Joint, Label, LabelItem, Vertex};

    fn kinds(diagnostics: &[Diagnostic]) -> Vec<MessageKind> {
        diagnostics.iter().map(|d| d.kind).collect()
    }

    #[test]
    fn test_bdef4_weight_sum() {
        let mut model = Model::new();
        let bone = Bone::new();
        let bone_id = bone.id();
        model.bones.push(bone).unwrap();
        let mut vertex = Vertex::new();
        vertex.vertex_type = VertexType::Bdef4;
        vertex.bones = [Some(bone_id); 4];
        vertex.weights = [0.3; 4];
        vertex.normal = Vec3::Y;
        let vertex_id = vertex.id();
        model.vertices.push(vertex).unwrap();

        let diagnostics = Validator::default().validate(&model);
        let weights: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.kind == MessageKind::VertexBoneWeightNotNormalized)
            .collect();
        assert_eq!(weights.len(), 1);
        assert_eq!(weights[0].severity, Severity::Warning);
        assert_eq!(weights[0].subject, Subject::Vertex(vertex_id));
    }

    #[test]
    fn test_mask_filters_severity() {
        let mut model = Model::new();
        model.bones.push(Bone::new()).unwrap();
        let all = Validator::default().validate(&model);
        assert!(kinds(&all).contains(&MessageKind::BoneEmptyName));
        assert!(kinds(&all).contains(&MessageKind::LabelNotAssignedBoneObject));
        let fatal = Validator::new(SeverityMask::at_least(Severity::Fatal)).validate(&model);
        assert!(fatal.is_empty());
    }

    #[test]
    fn test_faces_and_material_ranges() {
        let mut model = Model::new();
        model.vertices.push(Vertex::new()).unwrap();
        model.vertex_indices = vec![0, 0, 5];
        let mut material = Material::new();
        material.num_vertex_indices = 6;
        model.materials.push(material).unwrap();
        let found = kinds(&Validator::default().validate(&model));
        assert!(found.contains(&MessageKind::FaceVertexObjectOutOfBound));
        assert!(found.contains(&MessageKind::MaterialVertexIndexOverflow));

        model.vertex_indices.push(0);
        let found = kinds(&Validator::default().validate(&model));
        assert!(found.contains(&MessageKind::FaceNotTriangulated));
    }

    #[test]
    fn test_transform_order_and_labels() {
        let mut model = Model::new();
        let mut child = Bone::new();
        child.name.japanese = "child".into();
        let child_id = child.id();
        let mut parent = Bone::new();
        parent.name.japanese = "parent".into();
        child.parent_bone = Some(parent.id());
        model.bones.push(child).unwrap();
        model.bones.push(parent).unwrap();
        let mut label = Label::new();
        label.name.japanese = "label".into();
        label.items.push(LabelItem::with_bone(child_id)).unwrap();
        model.labels.push(label).unwrap();

        let diagnostics = Validator::default().validate(&model);
        let before_parent = diagnostics
            .iter()
            .find(|d| d.kind == MessageKind::BoneTransformBeforeParent)
            .unwrap();
        assert_eq!(before_parent.subject, Subject::Bone(child_id));
        assert_eq!(
            diagnostics.iter().filter(|d| d.kind == MessageKind::LabelNotAssignedBoneObject).count(),
            1
        );
    }

    #[test]
    fn test_joint_without_bodies_is_fatal() {
        let mut model = Model::new();
        let mut joint = Joint::new();
        joint.name.japanese = "j".into();
        model.joints.push(joint).unwrap();
        let diagnostics = Validator::new(SeverityMask::at_least(Severity::Fatal)).validate(&model);
        assert_eq!(
            kinds(&diagnostics),
            vec![MessageKind::JointNullRigidBodyAObject, MessageKind::JointNullRigidBodyBObject]
        );
    }

    #[test]
    fn test_missing_texture_predicate() {
        let mut model = Model::new();
        let texture = Texture::new("missing.png");
        let mut material = Material::new();
        material.name.japanese = "m".into();
        material.diffuse_texture = Some(texture.id());
        model.textures.push(texture).unwrap();
        model.materials.push(material).unwrap();
        let validator = Validator::default().with_texture_predicate(|_| false);
        let found = kinds(&validator.validate(&model));
        assert!(found.contains(&MessageKind::MaterialDiffuseTextureNotFound));
        assert!(!kinds(&Validator::default().validate(&model)).contains(&MessageKind::MaterialDiffuseTextureNotFound));
    }
}
