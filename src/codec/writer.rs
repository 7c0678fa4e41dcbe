//! PMX writer.
//!
//! References are written as the current position of their target, so a
//! dangling reference is written as null. Index widths are chosen from the
//! sequence lengths at write time.

use super::buffer::MutableBuffer;
use super::format::*;
use crate::model::*;
use crate::util::{Error, Result};

/// Serialize a model into a growable buffer.
pub fn write_model(model: &Model) -> Result<MutableBuffer> {
    let mut writer = Writer::new(model);
    writer.write()?;
    Ok(writer.buffer)
}

struct Writer<'a> {
    model: &'a Model,
    buffer: MutableBuffer,
    widths: IndexWidths,
}

impl<'a> Writer<'a> {
    fn new(model: &'a Model) -> Self {
        let widths = IndexWidths::for_counts(
            model.vertices.len(),
            model.textures.len(),
            model.materials.len(),
            model.bones.len(),
            model.morphs.len(),
            model.rigid_bodies.len(),
        );
        Self { model, buffer: MutableBuffer::new(), widths }
    }

    fn write(&mut self) -> Result<()> {
        let model = self.model;
        if model.additional_uv_count > MAX_ADDITIONAL_UV {
            return Err(Error::invalid(format!(
                "additional uv count {}",
                model.additional_uv_count
            )));
        }
        self.write_header()?;
        self.write_vertices()?;
        self.write_vertex_indices()?;
        self.write_textures()?;
        self.write_materials()?;
        self.write_bones()?;
        self.write_morphs()?;
        self.write_labels()?;
        self.write_rigid_bodies()?;
        self.write_joints()?;
        if model.is_v21() {
            self.write_soft_bodies()?;
        } else if !model.soft_bodies.is_empty() {
            tracing::warn!(count = model.soft_bodies.len(), "soft bodies dropped from PMX 2.0 output");
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Primitives
    // ------------------------------------------------------------------------

    fn write_string(&mut self, value: &str) -> Result<()> {
        let bytes = self.model.codec.encode(value);
        self.write_count(bytes.len())?;
        self.buffer.write_byte_array(&bytes)
    }

    fn write_name(&mut self, name: &LocalizedName) -> Result<()> {
        self.write_string(&name.japanese)?;
        self.write_string(&name.english)
    }

    fn write_count(&mut self, count: usize) -> Result<()> {
        let count = i32::try_from(count)
            .map_err(|_| Error::invalid(format!("sequence of {count} elements")))?;
        self.buffer.write_i32(count)
    }

    fn write_bone_ref(&mut self, bone: Option<BoneId>) -> Result<()> {
        let index = self.model.bones.index_of(bone);
        self.buffer.write_index(index, self.widths.bone)
    }

    fn write_texture_ref(&mut self, texture: Option<TextureId>) -> Result<()> {
        let index = self.model.textures.index_of(texture);
        self.buffer.write_index(index, self.widths.texture)
    }

    fn write_material_ref(&mut self, material: Option<MaterialId>) -> Result<()> {
        let index = self.model.materials.index_of(material);
        self.buffer.write_index(index, self.widths.material)
    }

    fn write_morph_ref(&mut self, morph: Option<MorphId>) -> Result<()> {
        let index = self.model.morphs.index_of(morph);
        self.buffer.write_index(index, self.widths.morph)
    }

    fn write_rigid_body_ref(&mut self, rigid_body: Option<RigidBodyId>) -> Result<()> {
        let index = self.model.rigid_bodies.index_of(rigid_body);
        self.buffer.write_index(index, self.widths.rigid_body)
    }

    /// Unsigned vertex reference; the format has no null, so 0 stands in.
    fn write_vertex_ref(&mut self, vertex: Option<VertexId>) -> Result<()> {
        let index = self.model.vertices.index_of(vertex);
        let index = u32::try_from(index).unwrap_or_else(|_| {
            tracing::warn!("null vertex reference written as 0");
            0
        });
        self.buffer.write_vertex_index(index, self.widths.vertex)
    }

    // ------------------------------------------------------------------------
    // Header
    // ------------------------------------------------------------------------

    fn write_header(&mut self) -> Result<()> {
        let model = self.model;
        self.buffer.write_byte_array(PMX_SIGNATURE)?;
        self.buffer.write_f32(model.version)?;
        self.buffer.write_byte(INFO_LENGTH)?;
        self.buffer.write_byte(model.codec.as_u8())?;
        self.buffer.write_byte(model.additional_uv_count)?;
        self.buffer.write_byte_array(&self.widths.to_bytes())?;
        self.write_name(&model.name)?;
        self.write_name(&model.comment)
    }

    // ------------------------------------------------------------------------
    // Blocks
    // ------------------------------------------------------------------------

    fn write_vertices(&mut self) -> Result<()> {
        let model = self.model;
        self.write_count(model.vertices.len())?;
        for vertex in &model.vertices {
            self.buffer.write_vec3(vertex.origin)?;
            self.buffer.write_vec3(vertex.normal)?;
            self.buffer.write_vec2(vertex.uv)?;
            for uv in &vertex.additional_uv[..model.additional_uv_count as usize] {
                self.buffer.write_vec4(*uv)?;
            }
            self.buffer.write_byte(vertex.vertex_type.as_u8())?;
            match vertex.vertex_type {
                VertexType::Bdef1 => self.write_bone_ref(vertex.bones[0])?,
                VertexType::Bdef2 | VertexType::Sdef => {
                    self.write_bone_ref(vertex.bones[0])?;
                    self.write_bone_ref(vertex.bones[1])?;
                    self.buffer.write_f32(vertex.weights[0])?;
                    if vertex.vertex_type == VertexType::Sdef {
                        self.buffer.write_vec3(vertex.sdef_c)?;
                        self.buffer.write_vec3(vertex.sdef_r0)?;
                        self.buffer.write_vec3(vertex.sdef_r1)?;
                    }
                }
                VertexType::Bdef4 | VertexType::Qdef => {
                    for bone in vertex.bones {
                        self.write_bone_ref(bone)?;
                    }
                    self.buffer.write_vec4(vertex.weights.into())?;
                }
            }
            self.buffer.write_f32(vertex.edge_size)?;
        }
        Ok(())
    }

    fn write_vertex_indices(&mut self) -> Result<()> {
        let model = self.model;
        self.write_count(model.vertex_indices.len())?;
        for &index in &model.vertex_indices {
            self.buffer.write_vertex_index(index, self.widths.vertex)?;
        }
        Ok(())
    }

    fn write_textures(&mut self) -> Result<()> {
        let model = self.model;
        self.write_count(model.textures.len())?;
        for texture in &model.textures {
            self.write_string(&texture.path)?;
        }
        Ok(())
    }

    fn write_materials(&mut self) -> Result<()> {
        let model = self.model;
        self.write_count(model.materials.len())?;
        for material in &model.materials {
            self.write_name(&material.name)?;
            self.buffer.write_vec3(material.diffuse_color)?;
            self.buffer.write_f32(material.diffuse_opacity)?;
            self.buffer.write_vec3(material.specular_color)?;
            self.buffer.write_f32(material.specular_power)?;
            self.buffer.write_vec3(material.ambient_color)?;
            self.buffer.write_byte(material.flags.0)?;
            self.buffer.write_vec3(material.edge_color)?;
            self.buffer.write_f32(material.edge_opacity)?;
            self.buffer.write_f32(material.edge_size)?;
            self.write_texture_ref(material.diffuse_texture)?;
            self.write_texture_ref(material.sphere_map_texture)?;
            self.buffer.write_byte(material.sphere_map_type.as_u8())?;
            match material.toon {
                ToonTexture::Shared(index) => {
                    self.buffer.write_byte(1)?;
                    self.buffer.write_byte(index)?;
                }
                ToonTexture::Texture(texture) => {
                    self.buffer.write_byte(0)?;
                    self.write_texture_ref(texture)?;
                }
            }
            self.write_string(&material.clob)?;
            self.write_count(material.num_vertex_indices)?;
        }
        Ok(())
    }

    fn write_bones(&mut self) -> Result<()> {
        let model = self.model;
        self.write_count(model.bones.len())?;
        for bone in &model.bones {
            self.write_name(&bone.name)?;
            self.buffer.write_vec3(bone.origin)?;
            self.write_bone_ref(bone.parent_bone)?;
            self.buffer.write_i32(bone.stage_index)?;
            let constraint = model.constraints.resolve(bone.constraint);
            let mut flags = BoneFlags(bone.encoded_flags());
            flags.set(BoneFlags::HAS_CONSTRAINT, constraint.is_some());
            self.buffer.write_u16(flags.0)?;
            match bone.destination {
                BoneDestination::Bone(target) => self.write_bone_ref(target)?,
                BoneDestination::Offset(offset) => self.buffer.write_vec3(offset)?,
            }
            if flags.contains(BoneFlags::HAS_INHERENT_ORIENTATION)
                || flags.contains(BoneFlags::HAS_INHERENT_TRANSLATION)
            {
                self.write_bone_ref(bone.inherent_parent_bone)?;
                self.buffer.write_f32(bone.inherent_coefficient)?;
            }
            if flags.contains(BoneFlags::HAS_FIXED_AXIS) {
                self.buffer.write_vec3(bone.fixed_axis)?;
            }
            if flags.contains(BoneFlags::HAS_LOCAL_AXES) {
                self.buffer.write_vec3(bone.local_x_axis)?;
                self.buffer.write_vec3(bone.local_z_axis)?;
            }
            if flags.contains(BoneFlags::HAS_EXTERNAL_PARENT) {
                self.buffer.write_i32(bone.external_parent_key)?;
            }
            if let Some(constraint) = constraint {
                self.write_constraint(constraint)?;
            }
        }
        Ok(())
    }

    fn write_constraint(&mut self, constraint: &Constraint) -> Result<()> {
        self.write_bone_ref(constraint.effector_bone)?;
        self.buffer.write_i32(constraint.num_iterations)?;
        self.buffer.write_f32(constraint.angle_limit)?;
        self.write_count(constraint.joints.len())?;
        for joint in &constraint.joints {
            self.write_bone_ref(joint.bone)?;
            self.buffer.write_byte(joint.has_angle_limit as u8)?;
            if joint.has_angle_limit {
                self.buffer.write_vec3(joint.lower_limit)?;
                self.buffer.write_vec3(joint.upper_limit)?;
            }
        }
        Ok(())
    }

    fn write_morphs(&mut self) -> Result<()> {
        let model = self.model;
        self.write_count(model.morphs.len())?;
        for morph in &model.morphs {
            self.write_name(&morph.name)?;
            self.buffer.write_byte(morph.category.as_u8())?;
            self.buffer.write_byte(morph.morph_type.as_u8())?;
            self.write_count(morph.num_items())?;
            self.write_morph_items(morph)?;
        }
        Ok(())
    }

    fn write_morph_items(&mut self, morph: &Morph) -> Result<()> {
        let items = &morph.items;
        match morph.morph_type {
            MorphType::Group => {
                for item in &items.groups {
                    self.write_morph_ref(item.morph)?;
                    self.buffer.write_f32(item.weight)?;
                }
            }
            MorphType::Flip => {
                for item in &items.flips {
                    self.write_morph_ref(item.morph)?;
                    self.buffer.write_f32(item.weight)?;
                }
            }
            MorphType::Vertex => {
                for item in &items.vertices {
                    self.write_vertex_ref(item.vertex)?;
                    self.buffer.write_vec3(item.position)?;
                }
            }
            MorphType::Bone => {
                for item in &items.bones {
                    self.write_bone_ref(item.bone)?;
                    self.buffer.write_vec3(item.translation)?;
                    self.buffer.write_vec4(item.orientation.into())?;
                }
            }
            MorphType::Material => {
                for item in &items.materials {
                    self.write_material_ref(item.material)?;
                    self.buffer.write_byte(item.operation.as_u8())?;
                    self.buffer.write_vec3(item.diffuse_color)?;
                    self.buffer.write_f32(item.diffuse_opacity)?;
                    self.buffer.write_vec3(item.specular_color)?;
                    self.buffer.write_f32(item.specular_power)?;
                    self.buffer.write_vec3(item.ambient_color)?;
                    self.buffer.write_vec3(item.edge_color)?;
                    self.buffer.write_f32(item.edge_opacity)?;
                    self.buffer.write_f32(item.edge_size)?;
                    self.buffer.write_vec4(item.diffuse_texture_blend)?;
                    self.buffer.write_vec4(item.sphere_map_texture_blend)?;
                    self.buffer.write_vec4(item.toon_texture_blend)?;
                }
            }
            MorphType::Impulse => {
                for item in &items.impulses {
                    self.write_rigid_body_ref(item.rigid_body)?;
                    self.buffer.write_byte(item.is_local as u8)?;
                    self.buffer.write_vec3(item.velocity)?;
                    self.buffer.write_vec3(item.torque)?;
                }
            }
            MorphType::Texture
            | MorphType::Uva1
            | MorphType::Uva2
            | MorphType::Uva3
            | MorphType::Uva4 => {
                for item in &items.uvs {
                    self.write_vertex_ref(item.vertex)?;
                    self.buffer.write_vec4(item.position)?;
                }
            }
        }
        Ok(())
    }

    fn write_labels(&mut self) -> Result<()> {
        let model = self.model;
        self.write_count(model.labels.len())?;
        for label in &model.labels {
            self.write_name(&label.name)?;
            self.buffer.write_byte(label.is_special as u8)?;
            self.write_count(label.items.len())?;
            for item in &label.items {
                match item.target {
                    LabelTarget::Bone(bone) => {
                        self.buffer.write_byte(LABEL_ITEM_BONE)?;
                        self.write_bone_ref(bone)?;
                    }
                    LabelTarget::Morph(morph) => {
                        self.buffer.write_byte(LABEL_ITEM_MORPH)?;
                        self.write_morph_ref(morph)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn write_rigid_bodies(&mut self) -> Result<()> {
        let model = self.model;
        self.write_count(model.rigid_bodies.len())?;
        for body in &model.rigid_bodies {
            self.write_name(&body.name)?;
            self.write_bone_ref(body.bone)?;
            self.buffer.write_byte(body.collision_group)?;
            self.buffer.write_u16(body.collision_mask)?;
            self.buffer.write_byte(body.shape.as_u8())?;
            self.buffer.write_vec3(body.size)?;
            self.buffer.write_vec3(body.origin)?;
            self.buffer.write_vec3(body.orientation)?;
            self.buffer.write_f32(body.mass)?;
            self.buffer.write_f32(body.linear_damping)?;
            self.buffer.write_f32(body.angular_damping)?;
            self.buffer.write_f32(body.restitution)?;
            self.buffer.write_f32(body.friction)?;
            self.buffer.write_byte(body.transform_type.as_u8())?;
        }
        Ok(())
    }

    fn write_joints(&mut self) -> Result<()> {
        let model = self.model;
        self.write_count(model.joints.len())?;
        for joint in &model.joints {
            self.write_name(&joint.name)?;
            self.buffer.write_byte(joint.joint_type.as_u8())?;
            self.write_rigid_body_ref(joint.rigid_body_a)?;
            self.write_rigid_body_ref(joint.rigid_body_b)?;
            self.buffer.write_vec3(joint.origin)?;
            self.buffer.write_vec3(joint.orientation)?;
            self.buffer.write_vec3(joint.linear_lower_limit)?;
            self.buffer.write_vec3(joint.linear_upper_limit)?;
            self.buffer.write_vec3(joint.angular_lower_limit)?;
            self.buffer.write_vec3(joint.angular_upper_limit)?;
            self.buffer.write_vec3(joint.linear_stiffness)?;
            self.buffer.write_vec3(joint.angular_stiffness)?;
        }
        Ok(())
    }

    fn write_soft_bodies(&mut self) -> Result<()> {
        let model = self.model;
        self.write_count(model.soft_bodies.len())?;
        for soft_body in &model.soft_bodies {
            self.write_name(&soft_body.name)?;
            self.buffer.write_byte(soft_body.shape.as_u8())?;
            self.write_material_ref(soft_body.material)?;
            self.buffer.write_byte(soft_body.collision_group)?;
            self.buffer.write_u16(soft_body.collision_mask)?;
            self.buffer.write_byte(soft_body.flags)?;
            self.buffer.write_i32(soft_body.bending_constraints_distance)?;
            self.buffer.write_i32(soft_body.cluster_count)?;
            self.buffer.write_f32(soft_body.total_mass)?;
            self.buffer.write_f32(soft_body.collision_margin)?;
            self.buffer.write_i32(soft_body.aero_model.as_i32())?;
            for value in soft_body.config.to_array() {
                self.buffer.write_f32(value)?;
            }
            let cluster = soft_body.cluster;
            for value in [
                cluster.soft_vs_rigid_hardness,
                cluster.soft_vs_kinetic_hardness,
                cluster.soft_vs_soft_hardness,
                cluster.soft_vs_rigid_impulse_split,
                cluster.soft_vs_kinetic_impulse_split,
                cluster.soft_vs_soft_impulse_split,
            ] {
                self.buffer.write_f32(value)?;
            }
            let iterations = soft_body.iterations;
            for value in [iterations.velocity, iterations.positions, iterations.drift, iterations.cluster] {
                self.buffer.write_i32(value)?;
            }
            let stiffness = soft_body.stiffness;
            for value in [stiffness.linear, stiffness.angular, stiffness.volume] {
                self.buffer.write_f32(value)?;
            }
            self.write_count(soft_body.anchors.len())?;
            for anchor in &soft_body.anchors {
                self.write_rigid_body_ref(anchor.rigid_body)?;
                let vertex = model.vertices.index_of(anchor.vertex);
                self.buffer.write_index(vertex, self.widths.vertex)?;
                self.buffer.write_byte(anchor.is_near_enabled as u8)?;
            }
            self.write_count(soft_body.pinned_vertex_indices.len())?;
            for &index in &soft_body.pinned_vertex_indices {
                self.buffer.write_vertex_index(index, self.widths.vertex)?;
            }
        }
        Ok(())
    }
}
