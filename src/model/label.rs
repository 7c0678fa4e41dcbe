//! Display labels grouping bones and morphs.

use super::array::{model_object, ObjectArray};
use super::names::LocalizedName;
use super::{BoneId, LabelId, LabelItemId, MorphId};

/// Japanese name of the special root label.
pub const ROOT_LABEL_NAME: &str = "Root";

/// Japanese name of the special expression label.
pub const EXPRESSION_LABEL_NAME: &str = "表情";

/// Object a label item points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelTarget {
    Bone(Option<BoneId>),
    Morph(Option<MorphId>),
}

impl LabelTarget {
    pub fn bone(self) -> Option<BoneId> {
        match self {
            Self::Bone(id) => id,
            Self::Morph(_) => None,
        }
    }

    pub fn morph(self) -> Option<MorphId> {
        match self {
            Self::Morph(id) => id,
            Self::Bone(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LabelItem {
    pub(crate) id: LabelItemId,
    pub(crate) index: Option<usize>,
    pub target: LabelTarget,
}

model_object!(LabelItem, LabelItemId, "LabelItem");

impl LabelItem {
    pub fn new(target: LabelTarget) -> Self {
        Self { id: LabelItemId::next(), index: None, target }
    }

    pub fn with_bone(bone: BoneId) -> Self {
        Self::new(LabelTarget::Bone(Some(bone)))
    }

    pub fn with_morph(morph: MorphId) -> Self {
        Self::new(LabelTarget::Morph(Some(morph)))
    }
}

#[derive(Debug, Clone)]
pub struct Label {
    pub(crate) id: LabelId,
    pub(crate) index: Option<usize>,
    pub name: LocalizedName,
    pub is_special: bool,
    pub items: ObjectArray<LabelItem>,
}

model_object!(Label, LabelId, "Label", |this| {
    this.items = this.items.duplicate();
});

impl Default for Label {
    fn default() -> Self {
        Self {
            id: LabelId::next(),
            index: None,
            name: LocalizedName::default(),
            is_special: false,
            items: ObjectArray::new(),
        }
    }
}

impl Label {
    /// Create an unlinked label.
    pub fn new() -> Self {
        Self::default()
    }

    /// Special label holding the root bones.
    pub fn is_root(&self) -> bool {
        self.is_special && self.name.first() == ROOT_LABEL_NAME
    }

    pub fn contains_bone(&self, bone: BoneId) -> bool {
        self.items.iter().any(|item| item.target == LabelTarget::Bone(Some(bone)))
    }

    pub fn contains_morph(&self, morph: MorphId) -> bool {
        self.items.iter().any(|item| item.target == LabelTarget::Morph(Some(morph)))
    }

    pub fn copy_from(&mut self, other: &Label) {
        self.name = other.name.clone();
        self.is_special = other.is_special;
        self.items = other.items.duplicate();
    }
}
