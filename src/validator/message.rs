//! Diagnostic kinds, severities and formatting.

use serde::{Deserialize, Serialize};

use crate::model::{
    BoneId, JointId, LabelId, LabelItemId, MaterialId, MorphId, RigidBodyId, SoftBodyId, VertexId,
};

// ============================================================================
// Severity
// ============================================================================

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    /// Bit of this severity inside a [`SeverityMask`].
    #[inline]
    pub const fn bit(self) -> u32 {
        match self {
            Self::Info => 1 << 1,
            Self::Warning => 1 << 2,
            Self::Error => 1 << 3,
            Self::Fatal => 1 << 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "info" => Some(Self::Info),
            "warning" | "warn" => Some(Self::Warning),
            "error" => Some(Self::Error),
            "fatal" => Some(Self::Fatal),
            _ => None,
        }
    }
}

/// Set of severities a validation pass reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeverityMask(pub u32);

impl SeverityMask {
    pub const ALL: Self = Self(
        Severity::Info.bit() | Severity::Warning.bit() | Severity::Error.bit() | Severity::Fatal.bit(),
    );

    /// Every severity at or above `minimum`.
    pub fn at_least(minimum: Severity) -> Self {
        let mut mask = 0;
        for severity in [Severity::Info, Severity::Warning, Severity::Error, Severity::Fatal] {
            if severity >= minimum {
                mask |= severity.bit();
            }
        }
        Self(mask)
    }

    #[inline]
    pub fn contains(self, severity: Severity) -> bool {
        self.0 & severity.bit() != 0
    }
}

impl Default for SeverityMask {
    fn default() -> Self {
        Self::ALL
    }
}

// ============================================================================
// Message kinds
// ============================================================================

macro_rules! message_kinds {
    ($($name:ident => $key:literal,)*) => {
        /// What a diagnostic reports.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum MessageKind {
            $($name,)*
        }

        impl MessageKind {
            /// Stable translation key.
            pub fn key(self) -> &'static str {
                match self {
                    $(Self::$name => $key,)*
                }
            }
        }
    };
}

message_kinds! {
    PrimitiveFloatNaN => "model.validator.primitive.float-nan",
    PrimitiveFloatInfinity => "model.validator.primitive.float-inf",
    VertexNormalInvalid => "model.validator.vertex.normal.invalid",
    VertexTexCoordOutOfBound => "model.validator.vertex.texcoord.oob",
    VertexNullBoneObject => "model.validator.vertex.bone.null",
    VertexBoneWeightNotNormalized => "model.validator.vertex.weight.not-normalized",
    FaceNotTriangulated => "model.validator.face.not-triangulated",
    FaceNullVertexObject => "model.validator.face.vertex.null",
    FaceVertexObjectOutOfBound => "model.validator.face.oob",
    FaceVertexObjectNotUsed => "model.validator.face.vertex.not-used",
    MaterialEmptyName => "model.validator.material.name.empty",
    MaterialDuplicatedName => "model.validator.material.name.duplicated",
    MaterialAmbientColorOutOfBound => "model.validator.material.ambient.color.oob",
    MaterialDiffuseColorOutOfBound => "model.validator.material.diffuse.color.oob",
    MaterialSpecularColorOutOfBound => "model.validator.material.specular.color.oob",
    MaterialEdgeColorOutOfBound => "model.validator.material.edge.color.oob",
    MaterialDiffuseOpacityOutOfBound => "model.validator.material.diffuse.opacity.oob",
    MaterialEdgeOpacityOutOfBound => "model.validator.material.edge.opacity.oob",
    MaterialDiffuseTextureNotFound => "model.validator.material.texture.diffuse.not-found",
    MaterialSphereMapTextureNotFound => "model.validator.material.texture.sphere-map.not-found",
    MaterialToonTextureNotFound => "model.validator.material.texture.toon.not-found",
    MaterialVertexIndexNotFill => "model.validator.material.face.not-fill",
    MaterialVertexIndexOverflow => "model.validator.material.face.oob",
    BoneTooLongName => "model.validator.bone.name.too-long",
    BoneEmptyName => "model.validator.bone.name.empty",
    BoneDuplicatedName => "model.validator.bone.name.duplicated",
    BoneTransformBeforeParent => "model.validator.bone.transform.before-parent",
    BoneInherentBoneNullBoneObject => "model.validator.bone.inherent.null",
    BoneTransformBeforeInherentParent => "model.validator.bone.transform.before-inherent-parent",
    BoneTransformBeforeConstraint => "model.validator.bone.transform.before-constraint",
    BoneFixedAxisNotNormalized => "model.validator.bone.fixed-axis.not-normalized",
    MorphTooLongName => "model.validator.morph.name.too-long",
    MorphEmptyName => "model.validator.morph.name.empty",
    MorphDuplicatedName => "model.validator.morph.name.duplicated",
    LabelEmptyName => "model.validator.label.name.empty",
    LabelDuplicatedName => "model.validator.label.name.duplicated",
    LabelEmptyItems => "model.validator.label.empty",
    LabelNotAssignedBoneObject => "model.validator.label.bone.not-assigned",
    LabelNotAssignedMorphObject => "model.validator.label.morph.not-assigned",
    LabelItemNullBoneObject => "model.validator.label.item.bone.null",
    LabelItemNullMorphObject => "model.validator.label.item.morph.null",
    RigidBodyEmptyName => "model.validator.rigid-body.name.empty",
    RigidBodyDuplicatedName => "model.validator.rigid-body.name.duplicated",
    RigidBodyNullBoneObject => "model.validator.rigid-body.bone.null",
    JointEmptyName => "model.validator.joint.name.empty",
    JointDuplicatedName => "model.validator.joint.name.duplicated",
    JointNullRigidBodyAObject => "model.validator.joint.rigid-body-a.null",
    JointNullRigidBodyBObject => "model.validator.joint.rigid-body-b.null",
    SoftBodyEmptyName => "model.validator.soft-body.name.empty",
    SoftBodyDuplicatedName => "model.validator.soft-body.name.duplicated",
    SoftBodyNullMaterialObject => "model.validator.soft-body.material.null",
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Object a diagnostic is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Model,
    Vertex(VertexId),
    /// Position inside the vertex index sequence.
    Face(usize),
    Material(MaterialId),
    Bone(BoneId),
    Morph(MorphId),
    Label(LabelId),
    LabelItem(LabelId, LabelItemId),
    RigidBody(RigidBodyId),
    Joint(JointId),
    SoftBody(SoftBodyId),
}

/// One validator finding.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: MessageKind,
    pub severity: Severity,
    pub subject: Subject,
    /// Display name or position of the subject.
    pub detail: String,
}

/// Localized text lookup.
pub trait Translator {
    fn translate(&self, key: &str) -> String;
}

/// Translator that returns keys unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyTranslator;

impl Translator for KeyTranslator {
    fn translate(&self, key: &str) -> String {
        key.to_string()
    }
}

impl Diagnostic {
    /// Render as a bullet line through a translator.
    pub fn format(&self, translator: &dyn Translator) -> String {
        let text = translator.translate(self.kind.key());
        if self.detail.is_empty() {
            format!("* {}", text)
        } else {
            format!("* {}: {}", text, self.detail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_mask() {
        let mask = SeverityMask::at_least(Severity::Error);
        assert!(!mask.contains(Severity::Warning));
        assert!(mask.contains(Severity::Error));
        assert!(mask.contains(Severity::Fatal));
        assert_eq!(SeverityMask::ALL.0, 0b11110);
        assert_eq!(Severity::parse("WARN"), Some(Severity::Warning));
    }

    #[test]
    fn test_format_through_translator() {
        let diagnostic = Diagnostic {
            kind: MessageKind::BoneEmptyName,
            severity: Severity::Error,
            subject: Subject::Model,
            detail: "3".into(),
        };
        assert_eq!(diagnostic.format(&KeyTranslator), "* model.validator.bone.name.empty: 3");
        struct Upper;
        impl Translator for Upper {
            fn translate(&self, key: &str) -> String {
                key.to_uppercase()
            }
        }
        assert!(diagnostic.format(&Upper).starts_with("* MODEL.VALIDATOR"));
    }
}
