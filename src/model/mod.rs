//! The editable model document.
//!
//! [`Model`] owns one [`ObjectArray`] per object kind plus the flat vertex
//! index sequence that materials partition into contiguous runs.
//!
//! ## Modules
//!
//! - `id` - typed stable identities
//! - `array` - the shared insert/remove/renumber routine
//! - `mutable` - owning and reference mutation handles
//! - `extension` - runtime records keyed by object id
//! - `resolver` - repointing references on delete and merge
//! - `editing` - duplicate merging and root bone helpers

mod array;
mod bone;
mod constraint;
pub mod editing;
mod extension;
mod id;
mod joint;
mod label;
mod material;
mod morph;
mod mutable;
mod names;
pub mod resolver;
mod rigid_body;
mod soft_body;
mod vertex;

pub use array::{ModelObject, ObjectArray};
pub use bone::*;
pub use constraint::*;
pub use extension::*;
pub use id::*;
pub use joint::*;
pub use label::*;
pub use material::*;
pub use morph::*;
pub use mutable::*;
pub use names::*;
pub use resolver::{BoneSite, MaterialSite, MorphSite, RigidBodySite};
pub use rigid_body::*;
pub use soft_body::*;
pub use vertex::*;

use std::fs;
use std::ops::Range;
use std::path::Path;

use crate::codec::{self, Buffer, Codec, IdSeed};
use crate::util::{Error, Result};

/// PMX 2.0.
pub const VERSION_2_0: f32 = 2.0;
/// PMX 2.1, adding soft bodies and flip/impulse morphs.
pub const VERSION_2_1: f32 = 2.1;

/// An editable rigged model.
#[derive(Debug)]
pub struct Model {
    pub version: f32,
    pub codec: Codec,
    pub additional_uv_count: u8,
    pub name: LocalizedName,
    pub comment: LocalizedName,
    pub vertices: ObjectArray<Vertex>,
    /// Triangle list shared by every material, as positions in `vertices`.
    pub vertex_indices: Vec<u32>,
    pub textures: ObjectArray<Texture>,
    pub materials: ObjectArray<Material>,
    pub bones: ObjectArray<Bone>,
    pub constraints: ObjectArray<Constraint>,
    pub morphs: ObjectArray<Morph>,
    pub labels: ObjectArray<Label>,
    pub rigid_bodies: ObjectArray<RigidBody>,
    pub joints: ObjectArray<Joint>,
    pub soft_bodies: ObjectArray<SoftBody>,
    pub extensions: ExtensionTable,
}

impl Default for Model {
    fn default() -> Self {
        Self::with_version(VERSION_2_0)
    }
}

impl Model {
    /// Create an empty PMX 2.0 model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty model of a PMX version.
    pub fn with_version(version: f32) -> Self {
        Self {
            version,
            codec: Codec::Utf16,
            additional_uv_count: 0,
            name: LocalizedName::default(),
            comment: LocalizedName::default(),
            vertices: ObjectArray::new(),
            vertex_indices: Vec::new(),
            textures: ObjectArray::new(),
            materials: ObjectArray::new(),
            bones: ObjectArray::new(),
            constraints: ObjectArray::new(),
            morphs: ObjectArray::new(),
            labels: ObjectArray::new(),
            rigid_bodies: ObjectArray::new(),
            joints: ObjectArray::new(),
            soft_bodies: ObjectArray::new(),
            extensions: ExtensionTable::new(),
        }
    }

    /// Whether PMX 2.1 only data (soft bodies, flip and impulse morphs) is written.
    #[inline]
    pub fn is_v21(&self) -> bool {
        self.version > VERSION_2_0
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    /// Parse a model from a buffer.
    #[tracing::instrument(skip_all)]
    pub fn load(buffer: &mut Buffer) -> Result<Self> {
        let model = codec::read_model(buffer, None)?;
        tracing::info!(
            vertices = model.vertices.len(),
            materials = model.materials.len(),
            bones = model.bones.len(),
            morphs = model.morphs.len(),
            "model loaded"
        );
        Ok(model)
    }

    /// Read and parse a model file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        Self::load(&mut Buffer::new(bytes))
    }

    /// Serialize the model into an immutable buffer.
    #[tracing::instrument(skip_all)]
    pub fn save(&self) -> Result<Buffer> {
        let buffer = codec::write_model(self)?;
        tracing::info!(bytes = buffer.len(), "model saved");
        Ok(buffer.into_buffer())
    }

    /// Serialize the model to a file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let buffer = self.save()?;
        fs::write(path.as_ref(), buffer.as_bytes())?;
        Ok(())
    }

    /// Serialize and parse the model back in place.
    ///
    /// Every object keeps its id, so ids held by commands stay valid.
    /// Extension records are carried over. A 2.0 model holding soft bodies
    /// goes through the 2.1 layout and keeps its own version.
    #[tracing::instrument(skip_all)]
    pub fn reload(&mut self) -> Result<()> {
        let version = self.version;
        if !self.is_v21() && !self.soft_bodies.is_empty() {
            self.version = VERSION_2_1;
        }
        let written = codec::write_model(self);
        self.version = version;
        let mut buffer = written?.into_buffer();
        let seed = IdSeed::from_model(self);
        let mut model = codec::read_model(&mut buffer, Some(seed))?;
        model.version = version;
        model.extensions = std::mem::take(&mut self.extensions);
        *self = model;
        tracing::info!(bytes = buffer.len(), "model reloaded");
        Ok(())
    }

    // ========================================================================
    // Material ranges
    // ========================================================================

    /// Offset of a material's run, summed from every material before it.
    pub fn material_offset(&self, index: usize) -> usize {
        self.materials
            .iter()
            .take(index)
            .map(|m| m.num_vertex_indices)
            .sum()
    }

    /// Run of `vertex_indices` owned by a material.
    pub fn material_range(&self, id: MaterialId) -> Option<Range<usize>> {
        let index = self.materials.position(id)?;
        let offset = self.material_offset(index);
        Some(offset..offset + self.materials[index].num_vertex_indices)
    }

    /// Sum of every material's run length.
    pub fn total_material_vertex_indices(&self) -> usize {
        self.materials.iter().map(|m| m.num_vertex_indices).sum()
    }

    /// Whether material runs exactly cover the vertex index sequence.
    pub fn has_consistent_material_ranges(&self) -> bool {
        self.total_material_vertex_indices() == self.vertex_indices.len()
    }

    /// Vertex indices drawn by a material.
    pub fn material_vertex_indices(&self, id: MaterialId) -> Result<&[u32]> {
        let range = self
            .material_range(id)
            .ok_or_else(|| Error::not_found(format!("Material {:?}", id)))?;
        self.vertex_indices.get(range.clone()).ok_or(Error::IndexOutOfBounds {
            index: range.end,
            count: self.vertex_indices.len(),
        })
    }

    /// Recompute each vertex's runtime material and soft body links.
    pub fn rebuild_vertex_links(&mut self) {
        for vertex in self.vertices.iter_mut() {
            vertex.material = None;
            vertex.soft_body = None;
        }
        let mut offset = 0;
        for material in self.materials.iter() {
            let end = (offset + material.num_vertex_indices).min(self.vertex_indices.len());
            for &vi in &self.vertex_indices[offset.min(end)..end] {
                if let Some(vertex) = self.vertices.at_mut(vi as usize) {
                    vertex.material = Some(material.id);
                }
            }
            offset = end;
        }
        for soft_body in self.soft_bodies.iter() {
            for &vi in &soft_body.pinned_vertex_indices {
                if let Some(vertex) = self.vertices.at_mut(vi as usize) {
                    vertex.soft_body = Some(soft_body.id);
                }
            }
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// First bone whose first-language name matches.
    pub fn find_bone(&self, name: &str) -> Option<&Bone> {
        self.bones.iter().find(|b| b.name.first() == name)
    }

    /// First morph whose first-language name matches.
    pub fn find_morph(&self, name: &str) -> Option<&Morph> {
        self.morphs.iter().find(|m| m.name.first() == name)
    }

    /// Constraint owned by a bone.
    pub fn bone_constraint(&self, bone: BoneId) -> Option<&Constraint> {
        self.constraints.resolve(self.bones.get(bone)?.constraint)
    }

    /// Bones whose parent is `bone`, in sequence order.
    pub fn child_bones(&self, bone: BoneId) -> Vec<BoneId> {
        self.bones
            .iter()
            .filter(|b| b.parent_bone == Some(bone))
            .map(|b| b.id)
            .collect()
    }

    /// Whether `ancestor` appears on `bone`'s parent or inherent-parent chains.
    pub fn is_bone_ancestor(&self, bone: BoneId, ancestor: BoneId) -> bool {
        let mut stack = vec![bone];
        let mut visited = std::collections::HashSet::new();
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let Some(b) = self.bones.get(current) else { continue };
            for next in [b.parent_bone, b.inherent_parent_bone].into_iter().flatten() {
                if next == ancestor {
                    return true;
                }
                stack.push(next);
            }
        }
        false
    }

    /// Special label holding the root bones, if present.
    pub fn root_label(&self) -> Option<&Label> {
        self.labels.iter().find(|l| l.is_root())
    }

    /// Bind or refresh the name cache of every named object.
    pub fn rebuild_name_caches(&mut self) {
        fn refresh<T: NamedObject>(table: &mut ExtensionTable, array: &ObjectArray<T>)
        where
            T::Id: Into<ObjectId>,
        {
            for object in array {
                table.rebind(object.id(), NameCache::of(object));
            }
        }
        refresh(&mut self.extensions, &self.materials);
        refresh(&mut self.extensions, &self.bones);
        refresh(&mut self.extensions, &self.morphs);
        refresh(&mut self.extensions, &self.labels);
        refresh(&mut self.extensions, &self.rigid_bodies);
        refresh(&mut self.extensions, &self.joints);
        refresh(&mut self.extensions, &self.soft_bodies);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_with_materials(sizes: &[usize]) -> (Model, Vec<MaterialId>) {
        let mut model = Model::new();
        let mut ids = Vec::new();
        for &size in sizes {
            let mut material = Material::new();
            material.num_vertex_indices = size;
            ids.push(material.id());
            model.materials.push(material).unwrap();
        }
        let total: usize = sizes.iter().sum();
        model.vertex_indices = (0..total as u32).collect();
        (model, ids)
    }

    #[test]
    fn test_material_ranges_are_cumulative() {
        let (model, ids) = model_with_materials(&[3, 6, 3]);
        assert_eq!(model.material_range(ids[0]), Some(0..3));
        assert_eq!(model.material_range(ids[1]), Some(3..9));
        assert_eq!(model.material_range(ids[2]), Some(9..12));
        assert!(model.has_consistent_material_ranges());
        assert_eq!(model.material_vertex_indices(ids[2]).unwrap(), &[9, 10, 11]);
    }

    #[test]
    fn test_rebuild_vertex_links() {
        let (mut model, ids) = model_with_materials(&[3, 3]);
        for _ in 0..6 {
            model.vertices.push(Vertex::new()).unwrap();
        }
        model.rebuild_vertex_links();
        assert_eq!(model.vertices[1].material(), Some(ids[0]));
        assert_eq!(model.vertices[4].material(), Some(ids[1]));
    }

    #[test]
    fn test_bone_ancestry() {
        let mut model = Model::new();
        let root = Bone::new();
        let root_id = root.id();
        model.bones.push(root).unwrap();
        let mut child = Bone::new();
        child.parent_bone = Some(root_id);
        let child_id = child.id();
        model.bones.push(child).unwrap();
        let mut grandchild = Bone::new();
        grandchild.inherent_parent_bone = Some(child_id);
        let grandchild_id = grandchild.id();
        model.bones.push(grandchild).unwrap();

        assert!(model.is_bone_ancestor(grandchild_id, root_id));
        assert!(!model.is_bone_ancestor(root_id, grandchild_id));
        assert_eq!(model.child_bones(root_id), vec![child_id]);
    }
}
