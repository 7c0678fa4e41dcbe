//! PMX reader.
//!
//! References are stored as positions. The reader allocates the id of each
//! position on first use, so a vertex can reference a bone that is parsed
//! later. [`IdSeed`] pre-fills those ids so a reloaded document keeps the
//! identities of the one it was written from.

use std::collections::{HashMap, VecDeque};

use super::buffer::Buffer;
use super::format::*;
use crate::model::*;
use crate::util::{Error, Result, Vec3};

// ============================================================================
// Id allocation
// ============================================================================

/// Ids per position, allocated on first use.
struct IdTable<I: Copy> {
    ids: HashMap<usize, I>,
    seed: Vec<I>,
    fresh: fn() -> I,
}

impl<I: Copy> IdTable<I> {
    fn new(seed: Vec<I>, fresh: fn() -> I) -> Self {
        Self { ids: HashMap::new(), seed, fresh }
    }

    fn at(&mut self, index: usize) -> I {
        let (seed, fresh) = (&self.seed, self.fresh);
        *self
            .ids
            .entry(index)
            .or_insert_with(|| seed.get(index).copied().unwrap_or_else(fresh))
    }

    /// Resolve a stored signed index; negative means null.
    fn get(&mut self, index: i32) -> Option<I> {
        usize::try_from(index).ok().map(|i| self.at(i))
    }
}

/// Ids handed out in file order for owned sub-objects.
struct IdQueue<I> {
    seed: VecDeque<I>,
    fresh: fn() -> I,
}

impl<I> IdQueue<I> {
    fn new(seed: Vec<I>, fresh: fn() -> I) -> Self {
        Self { seed: seed.into(), fresh }
    }

    fn next(&mut self) -> I {
        self.seed.pop_front().unwrap_or_else(self.fresh)
    }
}

/// Ids of an existing model, in the order a written copy would be read.
#[derive(Debug, Default, Clone)]
pub struct IdSeed {
    vertices: Vec<VertexId>,
    textures: Vec<TextureId>,
    materials: Vec<MaterialId>,
    bones: Vec<BoneId>,
    constraints: Vec<ConstraintId>,
    constraint_joints: Vec<ConstraintJointId>,
    morphs: Vec<MorphId>,
    morph_items: Vec<MorphItemId>,
    labels: Vec<LabelId>,
    label_items: Vec<LabelItemId>,
    rigid_bodies: Vec<RigidBodyId>,
    joints: Vec<JointId>,
    soft_bodies: Vec<SoftBodyId>,
    anchors: Vec<SoftBodyAnchorId>,
}

impl IdSeed {
    pub fn from_model(model: &Model) -> Self {
        let mut seed = Self {
            vertices: model.vertices.ids(),
            textures: model.textures.ids(),
            materials: model.materials.ids(),
            bones: model.bones.ids(),
            morphs: model.morphs.ids(),
            labels: model.labels.ids(),
            rigid_bodies: model.rigid_bodies.ids(),
            joints: model.joints.ids(),
            soft_bodies: model.soft_bodies.ids(),
            ..Self::default()
        };
        for bone in &model.bones {
            if let Some(constraint) = model.constraints.resolve(bone.constraint) {
                seed.constraints.push(constraint.id());
                seed.constraint_joints.extend(constraint.joint_ids());
            }
        }
        for morph in &model.morphs {
            let items = &morph.items;
            match morph.morph_type {
                MorphType::Group => seed.morph_items.extend(items.groups.ids()),
                MorphType::Flip => seed.morph_items.extend(items.flips.ids()),
                MorphType::Vertex => seed.morph_items.extend(items.vertices.ids()),
                MorphType::Bone => seed.morph_items.extend(items.bones.ids()),
                MorphType::Material => seed.morph_items.extend(items.materials.ids()),
                MorphType::Impulse => seed.morph_items.extend(items.impulses.ids()),
                _ => seed.morph_items.extend(items.uvs.ids()),
            }
        }
        for label in &model.labels {
            seed.label_items.extend(label.items.ids());
        }
        for soft_body in &model.soft_bodies {
            seed.anchors.extend(soft_body.anchors.ids());
        }
        seed
    }
}

// ============================================================================
// Reader
// ============================================================================

/// Parse a PMX document.
pub fn read_model(buffer: &mut Buffer, seed: Option<IdSeed>) -> Result<Model> {
    let seed = seed.unwrap_or_default();
    let mut reader = Reader::new(buffer, seed);
    reader.read()
}

struct Reader<'a> {
    buffer: &'a mut Buffer,
    codec: Codec,
    widths: IndexWidths,
    additional_uv_count: u8,
    vertices: IdTable<VertexId>,
    textures: IdTable<TextureId>,
    materials: IdTable<MaterialId>,
    bones: IdTable<BoneId>,
    morphs: IdTable<MorphId>,
    rigid_bodies: IdTable<RigidBodyId>,
    constraints: IdQueue<ConstraintId>,
    constraint_joints: IdQueue<ConstraintJointId>,
    morph_items: IdQueue<MorphItemId>,
    labels: IdQueue<LabelId>,
    label_items: IdQueue<LabelItemId>,
    joints: IdQueue<JointId>,
    soft_bodies: IdQueue<SoftBodyId>,
    anchors: IdQueue<SoftBodyAnchorId>,
}

impl<'a> Reader<'a> {
    fn new(buffer: &'a mut Buffer, seed: IdSeed) -> Self {
        Self {
            buffer,
            codec: Codec::Utf16,
            widths: IndexWidths::for_counts(0, 0, 0, 0, 0, 0),
            additional_uv_count: 0,
            vertices: IdTable::new(seed.vertices, VertexId::next),
            textures: IdTable::new(seed.textures, TextureId::next),
            materials: IdTable::new(seed.materials, MaterialId::next),
            bones: IdTable::new(seed.bones, BoneId::next),
            morphs: IdTable::new(seed.morphs, MorphId::next),
            rigid_bodies: IdTable::new(seed.rigid_bodies, RigidBodyId::next),
            constraints: IdQueue::new(seed.constraints, ConstraintId::next),
            constraint_joints: IdQueue::new(seed.constraint_joints, ConstraintJointId::next),
            morph_items: IdQueue::new(seed.morph_items, MorphItemId::next),
            labels: IdQueue::new(seed.labels, LabelId::next),
            label_items: IdQueue::new(seed.label_items, LabelItemId::next),
            joints: IdQueue::new(seed.joints, JointId::next),
            soft_bodies: IdQueue::new(seed.soft_bodies, SoftBodyId::next),
            anchors: IdQueue::new(seed.anchors, SoftBodyAnchorId::next),
        }
    }

    fn read(&mut self) -> Result<Model> {
        let mut model = self.read_header()?;
        self.read_vertices(&mut model)?;
        self.read_vertex_indices(&mut model)?;
        self.read_textures(&mut model)?;
        self.read_materials(&mut model)?;
        self.read_bones(&mut model)?;
        self.read_morphs(&mut model)?;
        self.read_labels(&mut model)?;
        self.read_rigid_bodies(&mut model)?;
        self.read_joints(&mut model)?;
        if model.is_v21() && !self.buffer.is_end() {
            self.read_soft_bodies(&mut model)?;
        }
        if !self.buffer.is_end() {
            tracing::warn!(remaining = self.buffer.remaining(), "trailing bytes after last block");
        }
        model.rebuild_vertex_links();
        Ok(model)
    }

    // ------------------------------------------------------------------------
    // Primitives
    // ------------------------------------------------------------------------

    fn read_string(&mut self) -> Result<String> {
        let len = self.buffer.read_length()?;
        let codec = self.codec;
        codec.decode(self.buffer.read_bytes(len)?)
    }

    fn read_name(&mut self) -> Result<LocalizedName> {
        let japanese = self.read_string()?;
        let english = self.read_string()?;
        Ok(LocalizedName { japanese, english })
    }

    fn read_bone_ref(&mut self) -> Result<Option<BoneId>> {
        let index = self.buffer.read_index(self.widths.bone)?;
        Ok(self.bones.get(index))
    }

    fn read_texture_ref(&mut self) -> Result<Option<TextureId>> {
        let index = self.buffer.read_index(self.widths.texture)?;
        Ok(self.textures.get(index))
    }

    fn read_material_ref(&mut self) -> Result<Option<MaterialId>> {
        let index = self.buffer.read_index(self.widths.material)?;
        Ok(self.materials.get(index))
    }

    fn read_morph_ref(&mut self) -> Result<Option<MorphId>> {
        let index = self.buffer.read_index(self.widths.morph)?;
        Ok(self.morphs.get(index))
    }

    fn read_rigid_body_ref(&mut self) -> Result<Option<RigidBodyId>> {
        let index = self.buffer.read_index(self.widths.rigid_body)?;
        Ok(self.rigid_bodies.get(index))
    }

    /// Unsigned vertex position, as used by morph entries.
    fn read_vertex_ref(&mut self) -> Result<Option<VertexId>> {
        let index = self.buffer.read_vertex_index(self.widths.vertex)?;
        Ok(Some(self.vertices.at(index as usize)))
    }

    // ------------------------------------------------------------------------
    // Header
    // ------------------------------------------------------------------------

    fn read_header(&mut self) -> Result<Model> {
        if self.buffer.read_bytes(4).map_err(|_| Error::InvalidSignature)? != PMX_SIGNATURE {
            return Err(Error::InvalidSignature);
        }
        let version = self.buffer.read_f32()?;
        if version != VERSION_2_0 && version != VERSION_2_1 {
            return Err(Error::UnsupportedVersion(version));
        }
        let info_length = self.buffer.read_byte()?;
        if info_length < INFO_LENGTH {
            return Err(Error::invalid(format!("info length {info_length}")));
        }
        let info = self.buffer.read_bytes(info_length as usize)?.to_vec();
        self.codec = Codec::from_u8(info[0])?;
        self.additional_uv_count = info[1];
        if self.additional_uv_count > MAX_ADDITIONAL_UV {
            return Err(Error::invalid(format!(
                "additional uv count {}",
                self.additional_uv_count
            )));
        }
        self.widths = IndexWidths::from_bytes([info[2], info[3], info[4], info[5], info[6], info[7]])?;

        let mut model = Model::with_version(version);
        model.codec = self.codec;
        model.additional_uv_count = self.additional_uv_count;
        model.name = self.read_name()?;
        model.comment = self.read_name()?;
        tracing::debug!(version, codec = ?self.codec, widths = ?self.widths, "header read");
        Ok(model)
    }

    // ------------------------------------------------------------------------
    // Blocks
    // ------------------------------------------------------------------------

    fn read_vertices(&mut self, model: &mut Model) -> Result<()> {
        let count = self.buffer.read_length()?;
        for index in 0..count {
            let mut vertex = Vertex::new();
            vertex.id = self.vertices.at(index);
            vertex.origin = self.buffer.read_vec3()?;
            vertex.normal = self.buffer.read_vec3()?;
            vertex.uv = self.buffer.read_vec2()?;
            for i in 0..self.additional_uv_count as usize {
                vertex.additional_uv[i] = self.buffer.read_vec4()?;
            }
            let raw_type = self.buffer.read_byte()?;
            vertex.vertex_type = VertexType::from_u8(raw_type).ok_or_else(|| {
                Error::InvalidStructure(format!("vertex {index}: unknown type {raw_type}"))
            })?;
            match vertex.vertex_type {
                VertexType::Bdef1 => {
                    vertex.bones[0] = self.read_bone_ref()?;
                    vertex.weights = [1.0, 0.0, 0.0, 0.0];
                }
                VertexType::Bdef2 | VertexType::Sdef => {
                    vertex.bones[0] = self.read_bone_ref()?;
                    vertex.bones[1] = self.read_bone_ref()?;
                    let w = self.buffer.read_clamped_f32()?;
                    vertex.weights = [w, 1.0 - w, 0.0, 0.0];
                    if vertex.vertex_type == VertexType::Sdef {
                        vertex.sdef_c = self.buffer.read_vec3()?;
                        vertex.sdef_r0 = self.buffer.read_vec3()?;
                        vertex.sdef_r1 = self.buffer.read_vec3()?;
                    }
                }
                VertexType::Bdef4 | VertexType::Qdef => {
                    for slot in 0..4 {
                        vertex.bones[slot] = self.read_bone_ref()?;
                    }
                    vertex.weights = self.buffer.read_vec4()?.to_array();
                }
            }
            vertex.edge_size = self.buffer.read_f32()?;
            model.vertices.push(vertex)?;
        }
        Ok(())
    }

    fn read_vertex_indices(&mut self, model: &mut Model) -> Result<()> {
        let count = self.buffer.read_length()?;
        let num_vertices = model.vertices.len() as u32;
        model
            .vertex_indices
            .try_reserve(count)
            .map_err(|e| Error::AllocationFailure(e.to_string()))?;
        for position in 0..count {
            let index = self.buffer.read_vertex_index(self.widths.vertex)?;
            if index >= num_vertices {
                tracing::warn!(position, index, num_vertices, "face index out of range, using 0");
                model.vertex_indices.push(0);
            } else {
                model.vertex_indices.push(index);
            }
        }
        Ok(())
    }

    fn read_textures(&mut self, model: &mut Model) -> Result<()> {
        let count = self.buffer.read_length()?;
        for index in 0..count {
            let mut texture = Texture::new(self.read_string()?);
            texture.id = self.textures.at(index);
            model.textures.push(texture)?;
        }
        Ok(())
    }

    fn read_materials(&mut self, model: &mut Model) -> Result<()> {
        let count = self.buffer.read_length()?;
        for index in 0..count {
            let mut material = Material::new();
            material.id = self.materials.at(index);
            material.name = self.read_name()?;
            material.diffuse_color = self.buffer.read_vec3()?;
            material.diffuse_opacity = self.buffer.read_f32()?;
            material.specular_color = self.buffer.read_vec3()?;
            material.specular_power = self.buffer.read_f32()?;
            material.ambient_color = self.buffer.read_vec3()?;
            material.flags = MaterialFlags(self.buffer.read_byte()?);
            material.edge_color = self.buffer.read_vec3()?;
            material.edge_opacity = self.buffer.read_f32()?;
            material.edge_size = self.buffer.read_f32()?;
            material.diffuse_texture = self.read_texture_ref()?;
            material.sphere_map_texture = self.read_texture_ref()?;
            material.sphere_map_type = SphereMapType::from_u8(self.buffer.read_byte()?);
            material.toon = if self.buffer.read_byte()? != 0 {
                ToonTexture::Shared(self.buffer.read_byte()?)
            } else {
                ToonTexture::Texture(self.read_texture_ref()?)
            };
            material.clob = self.read_string()?;
            let num_vertex_indices = self.buffer.read_i32()?;
            material.num_vertex_indices = usize::try_from(num_vertex_indices).map_err(|_| {
                Error::InvalidStructure(format!("material {index}: {num_vertex_indices} vertex indices"))
            })?;
            model.materials.push(material)?;
        }
        Ok(())
    }

    fn read_bones(&mut self, model: &mut Model) -> Result<()> {
        let count = self.buffer.read_length()?;
        for index in 0..count {
            let mut bone = Bone::new();
            bone.id = self.bones.at(index);
            bone.name = self.read_name()?;
            bone.origin = self.buffer.read_vec3()?;
            bone.parent_bone = self.read_bone_ref()?;
            bone.stage_index = self.buffer.read_i32()?;
            bone.flags = BoneFlags(self.buffer.read_u16()?);
            bone.destination = if bone.flags.contains(BoneFlags::HAS_DESTINATION_BONE) {
                BoneDestination::Bone(self.read_bone_ref()?)
            } else {
                BoneDestination::Offset(self.buffer.read_vec3()?)
            };
            if bone.has_inherent() {
                bone.inherent_parent_bone = self.read_bone_ref()?;
                bone.inherent_coefficient = self.buffer.read_f32()?;
            }
            if bone.has_fixed_axis() {
                bone.fixed_axis = self.buffer.read_vec3()?;
            }
            if bone.has_local_axes() {
                bone.local_x_axis = self.buffer.read_vec3()?;
                bone.local_z_axis = self.buffer.read_vec3()?;
            }
            if bone.has_external_parent() {
                bone.external_parent_key = self.buffer.read_i32()?;
            }
            if bone.flags.contains(BoneFlags::HAS_CONSTRAINT) {
                let constraint = self.read_constraint(bone.id)?;
                bone.constraint = Some(constraint.id);
                model.constraints.push(constraint)?;
            }
            model.bones.push(bone)?;
        }
        Ok(())
    }

    fn read_constraint(&mut self, target: BoneId) -> Result<Constraint> {
        let mut constraint = Constraint::new();
        constraint.id = self.constraints.next();
        constraint.target_bone = Some(target);
        constraint.effector_bone = self.read_bone_ref()?;
        constraint.num_iterations = self.buffer.read_i32()?;
        constraint.angle_limit = self.buffer.read_f32()?;
        let count = self.buffer.read_length()?;
        for _ in 0..count {
            let mut joint = ConstraintJoint::new(self.read_bone_ref()?);
            joint.id = self.constraint_joints.next();
            joint.has_angle_limit = self.buffer.read_byte()? != 0;
            if joint.has_angle_limit {
                joint.lower_limit = self.buffer.read_vec3()?;
                joint.upper_limit = self.buffer.read_vec3()?;
            }
            constraint.joints.push(joint)?;
        }
        Ok(constraint)
    }

    fn read_morphs(&mut self, model: &mut Model) -> Result<()> {
        let count = self.buffer.read_length()?;
        for index in 0..count {
            let mut morph = Morph::default();
            morph.id = self.morphs.at(index);
            morph.name = self.read_name()?;
            let category = self.buffer.read_byte()?;
            morph.category = MorphCategory::from_u8(category).ok_or_else(|| {
                Error::InvalidStructure(format!("morph {index}: unknown category {category}"))
            })?;
            let raw_type = self.buffer.read_byte()?;
            morph.morph_type = MorphType::from_u8(raw_type).ok_or_else(|| {
                Error::InvalidStructure(format!("morph {index}: unknown type {raw_type}"))
            })?;
            let num_items = self.buffer.read_length()?;
            self.read_morph_items(&mut morph, num_items)?;
            model.morphs.push(morph)?;
        }
        Ok(())
    }

    fn read_morph_items(&mut self, morph: &mut Morph, count: usize) -> Result<()> {
        let items = &mut morph.items;
        for _ in 0..count {
            let id = self.morph_items.next();
            match morph.morph_type {
                MorphType::Group | MorphType::Flip => {
                    let target = self.read_morph_ref()?;
                    let weight = self.buffer.read_f32()?;
                    if morph.morph_type == MorphType::Group {
                        let mut item = MorphGroup::new(target, weight);
                        item.id = id;
                        items.groups.push(item)?;
                    } else {
                        let mut item = MorphFlip::new(target, weight);
                        item.id = id;
                        items.flips.push(item)?;
                    }
                }
                MorphType::Vertex => {
                    let mut item = MorphVertex::new(self.read_vertex_ref()?, Vec3::ZERO);
                    item.id = id;
                    item.position = self.buffer.read_vec3()?;
                    items.vertices.push(item)?;
                }
                MorphType::Bone => {
                    let mut item = MorphBone::new(self.read_bone_ref()?);
                    item.id = id;
                    item.translation = self.buffer.read_vec3()?;
                    item.orientation = crate::util::Quat::from_vec4(self.buffer.read_vec4()?);
                    items.bones.push(item)?;
                }
                MorphType::Material => {
                    let target = self.read_material_ref()?;
                    let operation = MaterialMorphOperation::from_u8(self.buffer.read_byte()?);
                    let mut item = MorphMaterial::new(target, operation);
                    item.id = id;
                    item.diffuse_color = self.buffer.read_vec3()?;
                    item.diffuse_opacity = self.buffer.read_f32()?;
                    item.specular_color = self.buffer.read_vec3()?;
                    item.specular_power = self.buffer.read_f32()?;
                    item.ambient_color = self.buffer.read_vec3()?;
                    item.edge_color = self.buffer.read_vec3()?;
                    item.edge_opacity = self.buffer.read_f32()?;
                    item.edge_size = self.buffer.read_f32()?;
                    item.diffuse_texture_blend = self.buffer.read_vec4()?;
                    item.sphere_map_texture_blend = self.buffer.read_vec4()?;
                    item.toon_texture_blend = self.buffer.read_vec4()?;
                    items.materials.push(item)?;
                }
                MorphType::Impulse => {
                    let mut item = MorphImpulse::new(self.read_rigid_body_ref()?);
                    item.id = id;
                    item.is_local = self.buffer.read_byte()? != 0;
                    item.velocity = self.buffer.read_vec3()?;
                    item.torque = self.buffer.read_vec3()?;
                    items.impulses.push(item)?;
                }
                _ => {
                    let vertex = self.read_vertex_ref()?;
                    let mut item = MorphUv::new(vertex, self.buffer.read_vec4()?);
                    item.id = id;
                    items.uvs.push(item)?;
                }
            }
        }
        Ok(())
    }

    fn read_labels(&mut self, model: &mut Model) -> Result<()> {
        let count = self.buffer.read_length()?;
        for index in 0..count {
            let mut label = Label::new();
            label.id = self.labels.next();
            label.name = self.read_name()?;
            label.is_special = self.buffer.read_byte()? != 0;
            let num_items = self.buffer.read_length()?;
            for _ in 0..num_items {
                let target = match self.buffer.read_byte()? {
                    LABEL_ITEM_BONE => LabelTarget::Bone(self.read_bone_ref()?),
                    LABEL_ITEM_MORPH => LabelTarget::Morph(self.read_morph_ref()?),
                    other => {
                        return Err(Error::InvalidStructure(format!(
                            "label {index}: unknown item type {other}"
                        )))
                    }
                };
                let mut item = LabelItem::new(target);
                item.id = self.label_items.next();
                label.items.push(item)?;
            }
            model.labels.push(label)?;
        }
        Ok(())
    }

    fn read_rigid_bodies(&mut self, model: &mut Model) -> Result<()> {
        let count = self.buffer.read_length()?;
        for index in 0..count {
            let mut body = RigidBody::new();
            body.id = self.rigid_bodies.at(index);
            body.name = self.read_name()?;
            body.bone = self.read_bone_ref()?;
            body.collision_group = self.buffer.read_byte()?;
            body.collision_mask = self.buffer.read_u16()?;
            let shape = self.buffer.read_byte()?;
            body.shape = RigidBodyShape::from_u8(shape).ok_or_else(|| {
                Error::InvalidStructure(format!("rigid body {index}: unknown shape {shape}"))
            })?;
            body.size = self.buffer.read_vec3()?;
            body.origin = self.buffer.read_vec3()?;
            body.orientation = self.buffer.read_vec3()?;
            body.mass = self.buffer.read_f32()?;
            body.linear_damping = self.buffer.read_f32()?;
            body.angular_damping = self.buffer.read_f32()?;
            body.restitution = self.buffer.read_f32()?;
            body.friction = self.buffer.read_f32()?;
            let transform = self.buffer.read_byte()?;
            body.transform_type = RigidBodyTransformType::from_u8(transform).ok_or_else(|| {
                Error::InvalidStructure(format!("rigid body {index}: unknown transform type {transform}"))
            })?;
            model.rigid_bodies.push(body)?;
        }
        Ok(())
    }

    fn read_joints(&mut self, model: &mut Model) -> Result<()> {
        let count = self.buffer.read_length()?;
        for index in 0..count {
            let mut joint = Joint::new();
            joint.id = self.joints.next();
            joint.name = self.read_name()?;
            let raw_type = self.buffer.read_byte()?;
            joint.joint_type = JointType::from_u8(raw_type).unwrap_or_else(|| {
                tracing::warn!(index, raw_type, "unknown joint type, using 6DOF spring");
                JointType::Generic6DofSpring
            });
            joint.rigid_body_a = self.read_rigid_body_ref()?;
            joint.rigid_body_b = self.read_rigid_body_ref()?;
            joint.origin = self.buffer.read_vec3()?;
            joint.orientation = self.buffer.read_vec3()?;
            joint.linear_lower_limit = self.buffer.read_vec3()?;
            joint.linear_upper_limit = self.buffer.read_vec3()?;
            joint.angular_lower_limit = self.buffer.read_vec3()?;
            joint.angular_upper_limit = self.buffer.read_vec3()?;
            joint.linear_stiffness = self.buffer.read_vec3()?;
            joint.angular_stiffness = self.buffer.read_vec3()?;
            model.joints.push(joint)?;
        }
        Ok(())
    }

    fn read_soft_bodies(&mut self, model: &mut Model) -> Result<()> {
        let count = self.buffer.read_length()?;
        for _ in 0..count {
            let mut soft_body = SoftBody::new();
            soft_body.id = self.soft_bodies.next();
            soft_body.name = self.read_name()?;
            soft_body.shape = SoftBodyShape::from_u8(self.buffer.read_byte()?);
            soft_body.material = self.read_material_ref()?;
            soft_body.collision_group = self.buffer.read_byte()?;
            soft_body.collision_mask = self.buffer.read_u16()?;
            soft_body.flags = self.buffer.read_byte()?;
            soft_body.bending_constraints_distance = self.buffer.read_i32()?;
            soft_body.cluster_count = self.buffer.read_i32()?;
            soft_body.total_mass = self.buffer.read_f32()?;
            soft_body.collision_margin = self.buffer.read_f32()?;
            soft_body.aero_model = SoftBodyAeroModel::from_i32(self.buffer.read_i32()?);
            let mut config = [0.0f32; 12];
            for value in config.iter_mut() {
                *value = self.buffer.read_f32()?;
            }
            soft_body.config = SoftBodyConfig::from_array(config);
            soft_body.cluster = SoftBodyCluster {
                soft_vs_rigid_hardness: self.buffer.read_f32()?,
                soft_vs_kinetic_hardness: self.buffer.read_f32()?,
                soft_vs_soft_hardness: self.buffer.read_f32()?,
                soft_vs_rigid_impulse_split: self.buffer.read_f32()?,
                soft_vs_kinetic_impulse_split: self.buffer.read_f32()?,
                soft_vs_soft_impulse_split: self.buffer.read_f32()?,
            };
            soft_body.iterations = SoftBodyIterations {
                velocity: self.buffer.read_i32()?,
                positions: self.buffer.read_i32()?,
                drift: self.buffer.read_i32()?,
                cluster: self.buffer.read_i32()?,
            };
            soft_body.stiffness = SoftBodyStiffness {
                linear: self.buffer.read_f32()?,
                angular: self.buffer.read_f32()?,
                volume: self.buffer.read_f32()?,
            };
            let num_anchors = self.buffer.read_length()?;
            for _ in 0..num_anchors {
                let rigid_body = self.read_rigid_body_ref()?;
                let vertex_index = self.buffer.read_index(self.widths.vertex)?;
                let mut anchor = SoftBodyAnchor::new(rigid_body, self.vertices.get(vertex_index));
                anchor.id = self.anchors.next();
                anchor.is_near_enabled = self.buffer.read_byte()? != 0;
                soft_body.anchors.push(anchor)?;
            }
            let num_pins = self.buffer.read_length()?;
            for _ in 0..num_pins {
                let index = self.buffer.read_vertex_index(self.widths.vertex)?;
                soft_body.pinned_vertex_indices.push(index);
            }
            model.soft_bodies.push(soft_body)?;
        }
        Ok(())
    }
}
