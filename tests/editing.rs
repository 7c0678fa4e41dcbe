//! Integration tests driving edits through the undo stack.

use pmx_edit::command::*;
use pmx_edit::model::editing::merge_all_duplicate_bones;
use pmx_edit::model::*;
use pmx_edit::physics::NullPhysicsEngine;
use pmx_edit::util::Vec3;
use pmx_edit::validator::{MessageKind, Severity, Subject, Validator};
use pmx_edit::Settings;

/// Nine BDEF1 vertices split into materials A, B and C of three indices each.
fn three_materials() -> (Model, Vec<MaterialId>) {
    let mut model = Model::new();
    let mut bone = Bone::new();
    bone.name = LocalizedName::new("センター", "center");
    let bone_id = bone.id();
    model.bones.push(bone).unwrap();
    for i in 0..9 {
        let mut vertex = Vertex::new();
        vertex.origin = Vec3::new(i as f32, 0.0, 0.0);
        vertex.set_bdef1(Some(bone_id));
        model.vertices.push(vertex).unwrap();
    }
    model.vertex_indices = (0..9).collect();
    let mut ids = Vec::new();
    for name in ["A", "B", "C"] {
        let mut material = Material::new();
        material.name = LocalizedName::new(name, name);
        material.num_vertex_indices = 3;
        ids.push(material.id());
        model.materials.push(material).unwrap();
    }
    model.rebuild_vertex_links();
    (model, ids)
}

fn material_total(model: &Model) -> usize {
    model.materials.iter().map(|m| m.num_vertex_indices).sum()
}

#[test]
fn test_delete_middle_material_through_stack() {
    let (mut model, ids) = three_materials();
    let mut selection = Selection::with_active(ids[1]);
    let mut physics = NullPhysicsEngine::new();
    let mut stack = UndoStack::default();
    let mut cx = CommandContext::new(&mut model, &mut selection, &mut physics);

    let delete = DeleteMaterialCommand::from_index(cx.model, 1).unwrap();
    stack.push(Box::new(delete), &mut cx).unwrap();
    assert_eq!(cx.model.materials.ids(), vec![ids[0], ids[2]]);
    assert_eq!(cx.model.vertex_indices, vec![0, 1, 2, 6, 7, 8]);
    assert_eq!(cx.model.materials[1].index(), Some(1));
    assert_eq!(material_total(cx.model), cx.model.vertex_indices.len());

    assert!(stack.undo(&mut cx).unwrap());
    assert_eq!(cx.model.materials.ids(), ids);
    assert_eq!(cx.model.vertex_indices, (0..9).collect::<Vec<u32>>());
    assert_eq!(material_total(cx.model), 9);

    assert!(stack.redo(&mut cx).unwrap());
    assert_eq!(cx.model.vertex_indices.len(), 6);
    drop(cx);
    assert!(selection.active.is_none());
    assert!(selection.track_rebuilds > 0);
}

#[test]
fn test_material_range_invariant_over_edits() {
    let (mut model, ids) = three_materials();
    let (source, _) = three_materials();
    let mut selection = Selection::default();
    let mut physics = NullPhysicsEngine::new();
    let settings = Settings::default();
    let mut stack = settings.undo_stack();
    let mut cx = CommandContext::new(&mut model, &mut selection, &mut physics);

    let edits: Vec<Box<dyn UndoCommand>> = vec![
        Box::new(MoveMaterialCommand::down(ids[0])),
        Box::new(CopyMaterialCommand::new(&source, source.materials[2].id()).unwrap()),
        Box::new(DeleteMaterialCommand::new(ids[1]).with_reload(settings.reload_after_material_delete)),
        Box::new(MoveMaterialCommand::up(ids[2])),
    ];
    for edit in edits {
        stack.push(edit, &mut cx).unwrap();
        assert_eq!(material_total(cx.model), cx.model.vertex_indices.len());
        assert!(cx.model.has_consistent_material_ranges());
    }
    assert_eq!(cx.model.materials.len(), 3);
    assert_eq!(cx.model.vertex_indices.len(), 9);

    while stack.undo(&mut cx).unwrap() {
        assert_eq!(material_total(cx.model), cx.model.vertex_indices.len());
    }
    assert_eq!(cx.model.materials.ids(), ids);
    assert_eq!(cx.model.vertices.len(), 9);
    assert_eq!(cx.model.vertex_indices, (0..9).collect::<Vec<u32>>());
}

#[test]
fn test_bone_move_up_then_down_restores_order() {
    let mut model = Model::new();
    for name in ["センター", "上半身", "首", "頭"] {
        let mut bone = Bone::new();
        bone.name = LocalizedName::new(name, "");
        model.bones.push(bone).unwrap();
    }
    let original = model.bones.ids();
    let mut selection = Selection::default();
    let mut physics = NullPhysicsEngine::new();
    let mut stack = UndoStack::new(8);
    let mut cx = CommandContext::new(&mut model, &mut selection, &mut physics);

    let middle = original[2];
    stack.push(Box::new(MoveCommand::<Bone>::new(middle, MoveDirection::Up)), &mut cx).unwrap();
    assert_eq!(cx.model.bones.position(middle), Some(1));
    stack.push(Box::new(MoveCommand::<Bone>::new(middle, MoveDirection::Down)), &mut cx).unwrap();
    assert_eq!(cx.model.bones.ids(), original);
    for (i, bone) in cx.model.bones.iter().enumerate() {
        assert_eq!(bone.index(), Some(i));
    }
    assert_eq!(stack.undo_name(), Some("MoveBoneDown"));
    assert_eq!(stack.len(), 2);
}

#[test]
fn test_merge_duplicate_arm_bones() {
    let mut model = Model::new();
    let center = Bone::new();
    model.bones.push(center).unwrap();
    let mut first = Bone::new();
    first.name = LocalizedName::new("腕", "");
    let first_id = first.id();
    model.bones.push(first).unwrap();
    let mut second = Bone::new();
    second.name = LocalizedName::new("腕", "arm");
    let second_id = second.id();
    model.bones.push(second).unwrap();
    let mut elbow = Bone::new();
    elbow.name = LocalizedName::new("ひじ", "elbow");
    elbow.parent_bone = Some(second_id);
    model.bones.push(elbow).unwrap();
    let mut vertex = Vertex::new();
    vertex.set_bdef1(Some(second_id));
    model.vertices.push(vertex).unwrap();
    let mut body = RigidBody::new();
    body.bone = Some(second_id);
    model.rigid_bodies.push(body).unwrap();

    assert_eq!(merge_all_duplicate_bones(&mut model).unwrap(), 1);
    let arms: Vec<_> = model.bones.iter().filter(|b| b.name.japanese == "腕").collect();
    assert_eq!(arms.len(), 1);
    assert_eq!(arms[0].id(), first_id);
    assert!(!model.bones.contains(second_id));
    assert_eq!(model.vertices[0].bones[0], Some(first_id));
    assert_eq!(model.rigid_bodies[0].bone, Some(first_id));
    assert_eq!(model.bones[2].parent_bone, Some(first_id));
}

#[test]
fn test_bdef4_weight_warning() {
    let mut model = Model::new();
    let mut bone_ids = Vec::new();
    for _ in 0..4 {
        let bone = Bone::new();
        bone_ids.push(bone.id());
        model.bones.push(bone).unwrap();
    }
    let mut vertex = Vertex::new();
    vertex.vertex_type = VertexType::Bdef4;
    for (slot, &bone) in bone_ids.iter().enumerate() {
        vertex.bones[slot] = Some(bone);
    }
    vertex.weights = [0.3; 4];
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
fn test_undo_stack_limit_and_redo_truncation() {
    let mut model = Model::new();
    let mut selection = Selection::default();
    let mut physics = NullPhysicsEngine::new();
    let mut stack = UndoStack::new(2);
    let mut cx = CommandContext::new(&mut model, &mut selection, &mut physics);

    for _ in 0..3 {
        let create = create_rigid_body(cx.model);
        stack.push(Box::new(create), &mut cx).unwrap();
    }
    assert_eq!(cx.model.rigid_bodies.len(), 3);
    assert_eq!(stack.len(), 2);
    assert!(stack.undo(&mut cx).unwrap());
    assert!(stack.undo(&mut cx).unwrap());
    assert!(!stack.undo(&mut cx).unwrap());
    assert_eq!(cx.model.rigid_bodies.len(), 1);
    assert!(stack.can_redo());

    let create = create_label(cx.model);
    stack.push(Box::new(create), &mut cx).unwrap();
    assert!(!stack.can_redo());
    drop(cx);
    assert_eq!(physics.live_count(), 1);
}

#[test]
fn test_material_delete_keeps_soft_bodies_in_v20() {
    let (mut model, ids) = three_materials();
    assert!(!model.is_v21());
    let mut selection = Selection::default();
    let mut physics = NullPhysicsEngine::new();
    let mut stack = UndoStack::default();
    let mut cx = CommandContext::new(&mut model, &mut selection, &mut physics);

    let create = create_soft_body(cx.model);
    let body = create.id();
    stack.push(Box::new(create), &mut cx).unwrap();
    stack.push(Box::new(DeleteMaterialCommand::new(ids[1])), &mut cx).unwrap();
    assert_eq!(cx.model.soft_bodies.ids(), vec![body]);
    assert!(!cx.model.is_v21());

    assert!(stack.undo(&mut cx).unwrap());
    assert!(stack.undo(&mut cx).unwrap());
    assert!(cx.model.soft_bodies.is_empty());
    assert_eq!(cx.model.materials.ids(), ids);
    drop(cx);
    assert_eq!(physics.live_count(), 0);
}
