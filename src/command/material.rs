//! Material commands.
//!
//! Materials own contiguous runs of the shared vertex index sequence, in
//! material order. Every command here moves runs together with materials so
//! the runs keep covering the sequence exactly.

use std::ops::Range;

use super::{new_object_name, CommandContext, MoveDirection, UndoCommand};
use crate::model::{
    resolver, DetachedRecords, Material, MaterialId, MaterialSite, Model, ModelObject, Texture,
    TextureId, ToonTexture,
};
use crate::util::{Error, Result};

fn missing(id: MaterialId) -> Error {
    Error::not_found(format!("Material {:?}", id))
}

/// Run of a material, checked against the vertex index sequence.
fn checked_range(model: &Model, id: MaterialId) -> Result<Range<usize>> {
    let range = model.material_range(id).ok_or_else(|| missing(id))?;
    if range.end > model.vertex_indices.len() {
        return Err(Error::IndexOutOfBounds { index: range.end, count: model.vertex_indices.len() });
    }
    Ok(range)
}

fn material_changed(cx: &mut CommandContext<'_>) {
    cx.model.rebuild_vertex_links();
    cx.model.rebuild_name_caches();
    cx.observer.rebuild_all_tracks();
}

// ============================================================================
// Delete
// ============================================================================

struct RemovedMaterial {
    material: Material,
    index: usize,
    offset: usize,
    run: Vec<u32>,
    sites: Vec<MaterialSite>,
    records: DetachedRecords,
}

/// Delete a material together with its run of vertex indices.
///
/// By default the model is serialized and parsed back afterwards, which
/// recomputes everything derived from run offsets. Ids survive the reload.
pub struct DeleteMaterialCommand {
    id: MaterialId,
    reload: bool,
    removed: Option<RemovedMaterial>,
}

impl DeleteMaterialCommand {
    pub fn new(id: MaterialId) -> Self {
        Self { id, reload: true, removed: None }
    }

    /// Delete the material currently at `index`.
    pub fn from_index(model: &Model, index: usize) -> Result<Self> {
        let id = model
            .materials
            .id_at(index)
            .ok_or(Error::IndexOutOfBounds { index, count: model.materials.len() })?;
        Ok(Self::new(id))
    }

    /// Whether to reload the model after deleting.
    pub fn with_reload(mut self, reload: bool) -> Self {
        self.reload = reload;
        self
    }
}

impl UndoCommand for DeleteMaterialCommand {
    fn name(&self) -> &'static str {
        "DeleteMaterial"
    }

    #[tracing::instrument(skip_all, fields(material = ?self.id))]
    fn redo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        let index = cx.model.materials.position(self.id).ok_or_else(|| missing(self.id))?;
        let range = checked_range(cx.model, self.id)?;
        let offset = range.start;
        let run: Vec<u32> = cx.model.vertex_indices.drain(range).collect();
        let sites = resolver::replace_material_references(cx.model, self.id, None);
        let records = cx.model.extensions.take(self.id);
        let material = cx.model.materials.remove(self.id)?;
        tracing::debug!(index, offset, run = run.len(), "material deleted");
        self.removed = Some(RemovedMaterial { material, index, offset, run, sites, records });
        cx.observer.clear_active_if_equals(self.id.into());
        if self.reload {
            cx.model.reload()?;
        }
        material_changed(cx);
        Ok(())
    }

    fn undo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        let removed = self.removed.take().ok_or_else(|| missing(self.id))?;
        let len = cx.model.vertex_indices.len();
        if removed.offset > len {
            return Err(Error::IndexOutOfBounds { index: removed.offset, count: len });
        }
        cx.model
            .vertex_indices
            .splice(removed.offset..removed.offset, removed.run);
        cx.model.materials.insert(removed.material, Some(removed.index))?;
        cx.model.extensions.restore(self.id, removed.records);
        resolver::restore_material_references(cx.model, &removed.sites, self.id);
        material_changed(cx);
        Ok(())
    }
}

// ============================================================================
// Move
// ============================================================================

/// Swap a material with its neighbor, rotating their two runs along.
///
/// Returns `false` when the material already sits at that end.
fn swap_with_neighbor(model: &mut Model, id: MaterialId, up: bool) -> Result<bool> {
    let index = model.materials.position(id).ok_or_else(|| missing(id))?;
    let neighbor = match up {
        true if index > 0 => index - 1,
        false if index + 1 < model.materials.len() => index + 1,
        _ => return Ok(false),
    };
    let first = index.min(neighbor);
    let offset = model.material_offset(first);
    let first_len = model.materials[first].num_vertex_indices;
    let end = offset + first_len + model.materials[first + 1].num_vertex_indices;
    let count = model.vertex_indices.len();
    let region = model
        .vertex_indices
        .get_mut(offset..end)
        .ok_or(Error::IndexOutOfBounds { index: end, count })?;
    region.rotate_left(first_len);
    model.materials.move_to(index, neighbor)?;
    Ok(true)
}

/// Move a material up, down, to the top or to the bottom.
///
/// The material travels one neighbor at a time so every run it passes
/// rotates along with it. Moving past either end is a no-op.
pub struct MoveMaterialCommand {
    id: MaterialId,
    direction: MoveDirection,
    steps: usize,
}

impl MoveMaterialCommand {
    pub fn new(id: MaterialId, direction: MoveDirection) -> Self {
        Self { id, direction, steps: 0 }
    }

    pub fn up(id: MaterialId) -> Self {
        Self::new(id, MoveDirection::Up)
    }

    pub fn down(id: MaterialId) -> Self {
        Self::new(id, MoveDirection::Down)
    }

    fn moves_up(&self) -> bool {
        matches!(self.direction, MoveDirection::Up | MoveDirection::Top)
    }
}

impl UndoCommand for MoveMaterialCommand {
    fn name(&self) -> &'static str {
        match self.direction {
            MoveDirection::Up => "MoveMaterialUp",
            MoveDirection::Down => "MoveMaterialDown",
            MoveDirection::Top => "MoveMaterialToTop",
            MoveDirection::Bottom => "MoveMaterialToBottom",
        }
    }

    fn redo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        let from = cx.model.materials.position(self.id).ok_or_else(|| missing(self.id))?;
        let to = self.direction.target(from, cx.model.materials.len());
        self.steps = 0;
        for _ in 0..from.abs_diff(to) {
            if swap_with_neighbor(cx.model, self.id, self.moves_up())? {
                self.steps += 1;
            }
        }
        if self.steps > 0 {
            tracing::debug!(from, to, "material moved");
            material_changed(cx);
        }
        Ok(())
    }

    fn undo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        let steps = std::mem::take(&mut self.steps);
        for _ in 0..steps {
            swap_with_neighbor(cx.model, self.id, !self.moves_up())?;
        }
        if steps > 0 {
            material_changed(cx);
        }
        Ok(())
    }
}

// ============================================================================
// Create
// ============================================================================

/// Insert an empty material named `新規{n}` / `NewMaterial{n}`.
///
/// Undo takes the material out together with whatever run it owns by then,
/// and redo puts both back.
pub struct CreateMaterialCommand {
    id: MaterialId,
    at: Option<usize>,
    pending: Option<Material>,
    run: Vec<u32>,
    records: DetachedRecords,
}

impl CreateMaterialCommand {
    /// Insert at `at`, or append when `None`.
    pub fn new(model: &Model, at: Option<usize>) -> Self {
        let mut material = Material::new();
        material.name = new_object_name("Material", model.materials.len() + 1);
        Self::with_material(material, at)
    }

    /// Insert a prepared material. Its run length must be zero.
    pub fn with_material(mut material: Material, at: Option<usize>) -> Self {
        material.num_vertex_indices = 0;
        Self { id: material.id(), at, pending: Some(material), run: Vec::new(), records: DetachedRecords::default() }
    }

    pub fn id(&self) -> MaterialId {
        self.id
    }
}

impl UndoCommand for CreateMaterialCommand {
    fn name(&self) -> &'static str {
        "CreateMaterial"
    }

    fn redo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        let mut material = self
            .pending
            .take()
            .ok_or_else(|| Error::already_exists(format!("Material {:?}", self.id)))?;
        let len = cx.model.materials.len();
        let index = self.at.map_or(len, |at| at.min(len));
        let offset = cx.model.material_offset(index);
        if offset > cx.model.vertex_indices.len() {
            return Err(Error::IndexOutOfBounds { index: offset, count: cx.model.vertex_indices.len() });
        }
        material.num_vertex_indices = self.run.len();
        let run = std::mem::take(&mut self.run);
        cx.model.vertex_indices.splice(offset..offset, run);
        cx.model.materials.insert(material, Some(index))?;
        let records = std::mem::take(&mut self.records);
        cx.model.extensions.restore(self.id, records);
        material_changed(cx);
        tracing::debug!(index, "material created");
        Ok(())
    }

    fn undo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        let range = checked_range(cx.model, self.id)?;
        self.run = cx.model.vertex_indices.drain(range).collect();
        self.records = cx.model.extensions.take(self.id);
        let material = cx.model.materials.remove(self.id)?;
        self.pending = Some(material);
        cx.observer.clear_active_if_equals(self.id.into());
        material_changed(cx);
        Ok(())
    }
}

// ============================================================================
// Copy from another model
// ============================================================================

/// Which texture slot of a material a path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextureSlot {
    Diffuse,
    SphereMap,
    Toon,
}

/// Append a copy of a material from another model, with its run.
///
/// Texture references are re-pointed by path: an existing texture with the
/// same path is reused, otherwise one is created (and removed again on undo).
/// The run is copied as-is, so it indexes this model's vertices.
pub struct CopyMaterialCommand {
    id: MaterialId,
    pending: Option<Material>,
    run: Vec<u32>,
    texture_paths: Vec<(TextureSlot, String)>,
    created_textures: Vec<TextureId>,
}

impl CopyMaterialCommand {
    pub fn new(source: &Model, material: MaterialId) -> Result<Self> {
        let original = source.materials.get(material).ok_or_else(|| missing(material))?;
        let run = source.material_vertex_indices(material)?.to_vec();
        let mut copy = Material::new();
        copy.copy_from(original);
        let mut texture_paths = Vec::new();
        let mut path_of = |slot: TextureSlot, texture: Option<TextureId>| {
            if let Some(texture) = source.textures.resolve(texture) {
                texture_paths.push((slot, texture.path.clone()));
            }
        };
        path_of(TextureSlot::Diffuse, copy.diffuse_texture.take());
        path_of(TextureSlot::SphereMap, copy.sphere_map_texture.take());
        if let ToonTexture::Texture(texture) = &mut copy.toon {
            path_of(TextureSlot::Toon, texture.take());
        }
        Ok(Self {
            id: copy.id,
            pending: Some(copy),
            run,
            texture_paths,
            created_textures: Vec::new(),
        })
    }

    /// Id of the material this command appends.
    pub fn id(&self) -> MaterialId {
        self.id
    }

    fn texture_for(&mut self, model: &mut Model, path: &str) -> Result<TextureId> {
        if let Some(texture) = model.textures.iter().find(|t| t.path == path) {
            return Ok(texture.id());
        }
        let texture = Texture::new(path);
        let id = texture.id();
        model.textures.push(texture)?;
        self.created_textures.push(id);
        Ok(id)
    }
}

impl UndoCommand for CopyMaterialCommand {
    fn name(&self) -> &'static str {
        "CopyMaterialFromModel"
    }

    fn redo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        let mut material = self
            .pending
            .take()
            .ok_or_else(|| Error::already_exists(format!("Material {:?}", self.id)))?;
        if !cx.model.has_consistent_material_ranges() {
            return Err(Error::invalid("material runs do not cover the vertex indices"));
        }
        for (slot, path) in std::mem::take(&mut self.texture_paths) {
            let texture = Some(self.texture_for(cx.model, &path)?);
            match slot {
                TextureSlot::Diffuse => material.diffuse_texture = texture,
                TextureSlot::SphereMap => material.sphere_map_texture = texture,
                TextureSlot::Toon => material.toon = ToonTexture::Texture(texture),
            }
            self.texture_paths.push((slot, path));
        }
        cx.model.vertex_indices.extend_from_slice(&self.run);
        cx.model.materials.push(material)?;
        material_changed(cx);
        Ok(())
    }

    fn undo(&mut self, cx: &mut CommandContext<'_>) -> Result<()> {
        let material = cx.model.materials.remove(self.id)?;
        let len = cx.model.vertex_indices.len().saturating_sub(self.run.len());
        cx.model.vertex_indices.truncate(len);
        for texture in self.created_textures.drain(..) {
            cx.model.textures.remove(texture)?;
        }
        cx.model.extensions.unbind(self.id);
        cx.observer.clear_active_if_equals(self.id.into());
        self.pending = Some(material);
        material_changed(cx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::Harness;
    use crate::command::Selection;
    use crate::model::{MaterialMorphOperation, Morph, MorphMaterial, MorphType, Vertex};

    /// Nine vertices and materials A, B, C drawing three indices each.
    fn three_materials() -> (Harness, Vec<MaterialId>) {
        let mut model = Model::new();
        for _ in 0..9 {
            model.vertices.push(Vertex::new()).unwrap();
        }
        model.vertex_indices = (0..9).collect();
        let mut ids = Vec::new();
        for name in ["A", "B", "C"] {
            let mut material = Material::new();
            material.name.japanese = name.into();
            material.num_vertex_indices = 3;
            ids.push(material.id());
            model.materials.push(material).unwrap();
        }
        (Harness::new(model), ids)
    }

    #[test]
    fn test_delete_middle_material() {
        let (mut harness, ids) = three_materials();
        let mut morph = Morph::new(MorphType::Material);
        morph
            .items
            .materials
            .push(MorphMaterial::new(Some(ids[1]), MaterialMorphOperation::default()))
            .unwrap();
        harness.model.morphs.push(morph).unwrap();
        harness.selection = Selection::with_active(ids[1]);

        let mut command = DeleteMaterialCommand::new(ids[1]);
        harness.redo(&mut command);
        let model = &harness.model;
        assert_eq!(model.materials.ids(), vec![ids[0], ids[2]]);
        assert_eq!(model.vertex_indices, vec![0, 1, 2, 6, 7, 8]);
        assert_eq!(model.materials.get(ids[2]).unwrap().index(), Some(1));
        assert!(model.has_consistent_material_ranges());
        assert_eq!(model.morphs[0].items.materials[0].material, None);
        assert!(harness.selection.active.is_none());

        harness.undo(&mut command);
        let model = &harness.model;
        assert_eq!(model.materials.ids(), ids);
        assert_eq!(model.vertex_indices, (0..9).collect::<Vec<u32>>());
        assert_eq!(model.morphs[0].items.materials[0].material, Some(ids[1]));
        assert_eq!(model.vertices[4].material(), Some(ids[1]));
    }

    #[test]
    fn test_delete_without_reload() {
        let (mut harness, ids) = three_materials();
        let mut command = DeleteMaterialCommand::new(ids[0]).with_reload(false);
        harness.redo(&mut command);
        assert_eq!(harness.model.vertex_indices, vec![3, 4, 5, 6, 7, 8]);
        assert_eq!(harness.model.vertices[0].material(), None);
        assert_eq!(harness.model.vertices[3].material(), Some(ids[1]));
    }

    #[test]
    fn test_move_material_rotates_runs() {
        let (mut harness, ids) = three_materials();
        harness.model.materials.get_mut(ids[0]).unwrap().num_vertex_indices = 6;
        harness.model.materials.get_mut(ids[1]).unwrap().num_vertex_indices = 0;
        harness.model.materials.get_mut(ids[2]).unwrap().num_vertex_indices = 3;

        let mut command = MoveMaterialCommand::up(ids[2]);
        harness.redo(&mut command);
        assert_eq!(harness.model.materials.ids(), vec![ids[0], ids[2], ids[1]]);
        assert_eq!(harness.model.vertex_indices, (0..9).collect::<Vec<u32>>());

        let mut command = MoveMaterialCommand::down(ids[0]);
        harness.redo(&mut command);
        assert_eq!(harness.model.materials.ids(), vec![ids[2], ids[0], ids[1]]);
        assert_eq!(harness.model.vertex_indices, vec![6, 7, 8, 0, 1, 2, 3, 4, 5]);
        assert!(harness.model.has_consistent_material_ranges());

        harness.undo(&mut command);
        assert_eq!(harness.model.materials.ids(), vec![ids[0], ids[2], ids[1]]);
        assert_eq!(harness.model.vertex_indices, (0..9).collect::<Vec<u32>>());
    }

    #[test]
    fn test_move_at_edge_is_noop() {
        let (mut harness, ids) = three_materials();
        let mut command = MoveMaterialCommand::up(ids[0]);
        harness.redo(&mut command);
        assert_eq!(harness.model.materials.ids(), ids);
        harness.undo(&mut command);
        assert_eq!(harness.model.materials.ids(), ids);
    }

    #[test]
    fn test_copy_material_from_model() {
        let (source, ids) = three_materials();
        let mut source = source.model;
        let texture = Texture::new("skin.png");
        let texture_id = texture.id();
        source.textures.push(texture).unwrap();
        source.materials.get_mut(ids[2]).unwrap().diffuse_texture = Some(texture_id);

        let (mut harness, _) = three_materials();
        let mut command = CopyMaterialCommand::new(&source, ids[2]).unwrap();
        harness.redo(&mut command);
        let model = &harness.model;
        assert_eq!(model.materials.len(), 4);
        assert_eq!(model.vertex_indices.len(), 12);
        assert_eq!(&model.vertex_indices[9..], &[6, 7, 8]);
        let copy = model.materials.get(command.id()).unwrap();
        assert_eq!(copy.name.japanese, "C");
        let texture = model.textures.resolve(copy.diffuse_texture).unwrap();
        assert_eq!(texture.path, "skin.png");
        assert_ne!(texture.id(), texture_id);

        harness.undo(&mut command);
        assert_eq!(harness.model.materials.len(), 3);
        assert_eq!(harness.model.vertex_indices.len(), 9);
        assert!(harness.model.textures.is_empty());

        harness.redo(&mut command);
        assert_eq!(harness.model.textures.len(), 1);
        assert!(harness.model.has_consistent_material_ranges());
    }

    #[test]
    fn test_move_material_to_bottom_and_top() {
        let (mut harness, ids) = three_materials();
        let mut bottom = MoveMaterialCommand::new(ids[0], MoveDirection::Bottom);
        assert_eq!(bottom.name(), "MoveMaterialToBottom");
        harness.redo(&mut bottom);
        assert_eq!(harness.model.materials.ids(), vec![ids[1], ids[2], ids[0]]);
        assert_eq!(harness.model.vertex_indices, vec![3, 4, 5, 6, 7, 8, 0, 1, 2]);

        let mut top = MoveMaterialCommand::new(ids[2], MoveDirection::Top);
        harness.redo(&mut top);
        assert_eq!(harness.model.materials.ids(), vec![ids[2], ids[1], ids[0]]);
        assert_eq!(harness.model.vertex_indices, vec![6, 7, 8, 3, 4, 5, 0, 1, 2]);
        assert_eq!(harness.model.vertices[7].material(), Some(ids[2]));

        harness.undo(&mut top);
        harness.undo(&mut bottom);
        assert_eq!(harness.model.materials.ids(), ids);
        assert_eq!(harness.model.vertex_indices, (0..9).collect::<Vec<u32>>());
    }

    #[test]
    fn test_create_material() {
        let (mut harness, ids) = three_materials();
        let mut command = CreateMaterialCommand::new(&harness.model, Some(1));
        harness.redo(&mut command);
        let created = command.id();
        assert_eq!(harness.model.materials.ids(), vec![ids[0], created, ids[1], ids[2]]);
        assert_eq!(harness.model.materials[1].name.english, "NewMaterial4");
        assert_eq!(harness.model.vertex_indices.len(), 9);
        assert!(harness.model.has_consistent_material_ranges());

        // give it a run, then undo takes the run out with it
        harness.model.vertex_indices.splice(3..3, [0, 1, 2]);
        harness.model.materials.get_mut(created).unwrap().num_vertex_indices = 3;
        harness.undo(&mut command);
        assert_eq!(harness.model.materials.ids(), ids);
        assert_eq!(harness.model.vertex_indices, (0..9).collect::<Vec<u32>>());

        harness.redo(&mut command);
        assert_eq!(harness.model.vertex_indices.len(), 12);
        assert_eq!(harness.model.material_range(created), Some(3..6));
    }
}
