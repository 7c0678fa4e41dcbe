//! Rigid body, joint and soft body commands.
//!
//! Linking one of these objects binds its simulation handle and unlinking
//! destroys it. Joints are only bound while both of their bodies are.

use super::object::{command_names, CommandNames, CreateCommand, Deletable, DocumentObject};
use super::{new_object_name, CommandContext};
use crate::model::{
    resolver, Joint, JointId, JointType, Model, ModelObject, ObjectArray, ObjectId, RigidBody, RigidBodyId,
    RigidBodySite, SoftBody,
};
use crate::physics::{bind_physics, destroy_physics, physics_handle};
use crate::util::{Error, Result};

// ============================================================================
// Rigid bodies
// ============================================================================

impl DocumentObject for RigidBody {
    const NAMES: CommandNames = command_names!("RigidBody");

    fn object_id(id: Self::Id) -> ObjectId {
        id.into()
    }

    fn sequence(model: &Model) -> &ObjectArray<Self> {
        &model.rigid_bodies
    }

    fn sequence_mut(model: &mut Model) -> &mut ObjectArray<Self> {
        &mut model.rigid_bodies
    }

    fn on_linked(cx: &mut CommandContext<'_>, id: Self::Id) -> Result<()> {
        bind_physics(cx.model, cx.physics, id)?;
        Ok(())
    }

    fn on_unlinked(cx: &mut CommandContext<'_>, id: Self::Id) {
        destroy_physics(cx.model, cx.physics, id);
    }
}

/// What deleting a rigid body changed.
#[derive(Debug, Default)]
pub struct RigidBodyDeletion {
    sites: Vec<RigidBodySite>,
    /// Joints whose simulation object went away with the body.
    unbound_joints: Vec<JointId>,
}

impl Deletable for RigidBody {
    type Sites = RigidBodyDeletion;

    fn detach(cx: &mut CommandContext<'_>, id: Self::Id) -> Result<RigidBodyDeletion> {
        let sites = resolver::replace_rigid_body_references(cx.model, id, None);
        let mut unbound_joints = Vec::new();
        for site in &sites {
            if let RigidBodySite::JointA(joint) | RigidBodySite::JointB(joint) = *site {
                if !unbound_joints.contains(&joint) && destroy_physics(cx.model, cx.physics, joint) {
                    unbound_joints.push(joint);
                }
            }
        }
        Ok(RigidBodyDeletion { sites, unbound_joints })
    }

    fn reattach(cx: &mut CommandContext<'_>, deletion: RigidBodyDeletion, id: Self::Id) -> Result<()> {
        resolver::restore_rigid_body_references(cx.model, &deletion.sites, id);
        for joint in deletion.unbound_joints {
            bind_joint_if_ready(cx, joint)?;
        }
        Ok(())
    }
}

// ============================================================================
// Joints
// ============================================================================

fn bind_joint_if_ready(cx: &mut CommandContext<'_>, id: JointId) -> Result<()> {
    let Some(joint) = cx.model.joints.get(id) else {
        return Ok(());
    };
    let bound = |body: Option<RigidBodyId>| body.is_some_and(|b| physics_handle(cx.model, b).is_some());
    if bound(joint.rigid_body_a) && bound(joint.rigid_body_b) {
        bind_physics(cx.model, cx.physics, id)?;
    } else {
        tracing::debug!(?id, "joint left unbound, rigid bodies are not simulated");
    }
    Ok(())
}

impl DocumentObject for Joint {
    const NAMES: CommandNames = command_names!("Joint");

    fn object_id(id: Self::Id) -> ObjectId {
        id.into()
    }

    fn sequence(model: &Model) -> &ObjectArray<Self> {
        &model.joints
    }

    fn sequence_mut(model: &mut Model) -> &mut ObjectArray<Self> {
        &mut model.joints
    }

    fn on_linked(cx: &mut CommandContext<'_>, id: Self::Id) -> Result<()> {
        bind_joint_if_ready(cx, id)
    }

    fn on_unlinked(cx: &mut CommandContext<'_>, id: Self::Id) {
        destroy_physics(cx.model, cx.physics, id);
    }
}

impl Deletable for Joint {
    type Sites = ();

    fn detach(_cx: &mut CommandContext<'_>, _id: Self::Id) -> Result<()> {
        Ok(())
    }

    fn reattach(_cx: &mut CommandContext<'_>, _sites: (), _id: Self::Id) -> Result<()> {
        Ok(())
    }
}

/// Joint connecting two rigid bodies, appended to the joint sequence.
///
/// The body with the lower index becomes body A and names the joint. The
/// joint sits halfway between the bodies with their averaged orientation.
pub fn intermediate_joint(model: &Model, first: RigidBodyId, second: RigidBodyId) -> Result<CreateCommand<Joint>> {
    let resolve = |id: RigidBodyId| {
        model
            .rigid_bodies
            .get(id)
            .ok_or_else(|| Error::not_found(format!("RigidBody {:?}", id)))
    };
    let (first, second) = (resolve(first)?, resolve(second)?);
    if first.id == second.id {
        return Err(Error::invalid("intermediate joint needs two distinct rigid bodies"));
    }
    let (a, b) = if second.index() < first.index() { (second, first) } else { (first, second) };
    let mut joint = Joint::new();
    joint.name = a.name.clone();
    joint.joint_type = JointType::Generic6DofSpring;
    joint.rigid_body_a = Some(a.id);
    joint.rigid_body_b = Some(b.id);
    joint.origin = (a.origin + b.origin) * 0.5;
    joint.orientation = (a.orientation + b.orientation) * 0.5;
    Ok(CreateCommand::new(joint, None))
}

// ============================================================================
// Soft bodies
// ============================================================================

impl DocumentObject for SoftBody {
    const NAMES: CommandNames = command_names!("SoftBody");

    fn object_id(id: Self::Id) -> ObjectId {
        id.into()
    }

    fn sequence(model: &Model) -> &ObjectArray<Self> {
        &model.soft_bodies
    }

    fn sequence_mut(model: &mut Model) -> &mut ObjectArray<Self> {
        &mut model.soft_bodies
    }

    fn on_linked(cx: &mut CommandContext<'_>, id: Self::Id) -> Result<()> {
        bind_physics(cx.model, cx.physics, id)?;
        Ok(())
    }

    fn on_unlinked(cx: &mut CommandContext<'_>, id: Self::Id) {
        destroy_physics(cx.model, cx.physics, id);
    }

    fn refresh(model: &mut Model) {
        model.rebuild_vertex_links();
    }
}

impl Deletable for SoftBody {
    type Sites = ();

    fn detach(_cx: &mut CommandContext<'_>, _id: Self::Id) -> Result<()> {
        Ok(())
    }

    fn reattach(_cx: &mut CommandContext<'_>, _sites: (), _id: Self::Id) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Create
// ============================================================================

/// Append a default rigid body named `新規{n}` / `NewRigidBody{n}`.
pub fn create_rigid_body(model: &Model) -> CreateCommand<RigidBody> {
    let mut body = RigidBody::new();
    body.name = new_object_name("RigidBody", model.rigid_bodies.len() + 1);
    CreateCommand::new(body, None)
}

/// Append a default joint named `新規{n}` / `NewJoint{n}`.
pub fn create_joint(model: &Model) -> CreateCommand<Joint> {
    let mut joint = Joint::new();
    joint.name = new_object_name("Joint", model.joints.len() + 1);
    CreateCommand::new(joint, None)
}

/// Append a default soft body named `新規{n}` / `NewSoftBody{n}`.
pub fn create_soft_body(model: &Model) -> CreateCommand<SoftBody> {
    let mut soft_body = SoftBody::new();
    soft_body.name = new_object_name("SoftBody", model.soft_bodies.len() + 1);
    CreateCommand::new(soft_body, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::Harness;
    use crate::command::{DeleteCommand, MoveCommand, MoveDirection, UndoCommand};
    use crate::model::{SoftBodyAnchor, VERSION_2_1};
    use crate::util::Vec3;

    fn pair() -> (Harness, RigidBodyId, RigidBodyId) {
        let mut harness = Harness::new(Model::with_version(VERSION_2_1));
        let mut ids = Vec::new();
        for (name, x) in [("胸", 0.0), ("髪", 2.0)] {
            let mut command = create_rigid_body(&harness.model);
            ids.push(command.id());
            harness.redo(&mut command);
            let body = harness.model.rigid_bodies.get_mut(command.id()).unwrap();
            body.name.japanese = name.into();
            body.origin = Vec3::new(x, 0.0, 0.0);
            body.orientation = Vec3::new(x, 0.0, 0.0);
        }
        (harness, ids[0], ids[1])
    }

    #[test]
    fn test_create_binds_physics() {
        let (harness, a, _) = pair();
        assert_eq!(harness.physics.live_count(), 2);
        assert_eq!(harness.model.rigid_bodies[0].name.english, "NewRigidBody1");
        assert!(physics_handle(&harness.model, a).is_some());
    }

    #[test]
    fn test_intermediate_joint() {
        let (mut harness, a, b) = pair();
        let mut command = intermediate_joint(&harness.model, b, a).unwrap();
        harness.redo(&mut command);
        let joint = &harness.model.joints[0];
        assert_eq!(joint.rigid_body_a, Some(a));
        assert_eq!(joint.rigid_body_b, Some(b));
        assert_eq!(joint.name.japanese, "胸");
        assert_eq!(joint.origin, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(joint.orientation, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(joint.joint_type, JointType::Generic6DofSpring);
        assert_eq!(harness.physics.live_count(), 3);
        assert!(intermediate_joint(&harness.model, a, a).is_err());
    }

    #[test]
    fn test_delete_rigid_body_unbinds_joint_and_undo_rebinds() {
        let (mut harness, a, b) = pair();
        let mut joint = intermediate_joint(&harness.model, a, b).unwrap();
        harness.redo(&mut joint);
        let joint_id = joint.id();
        let mut soft_body = SoftBody::new();
        soft_body.anchors.push(SoftBodyAnchor::new(Some(b), None)).unwrap();
        harness.model.soft_bodies.push(soft_body).unwrap();

        let mut delete = DeleteCommand::<RigidBody>::new(b);
        harness.redo(&mut delete);
        assert_eq!(harness.model.joints[0].rigid_body_b, None);
        assert_eq!(harness.model.soft_bodies[0].anchors[0].rigid_body, None);
        assert!(physics_handle(&harness.model, joint_id).is_none());
        assert_eq!(harness.physics.live_count(), 1);

        harness.undo(&mut delete);
        assert_eq!(harness.model.rigid_bodies[1].id(), b);
        assert_eq!(harness.model.joints[0].rigid_body_b, Some(b));
        assert_eq!(harness.model.soft_bodies[0].anchors[0].rigid_body, Some(b));
        assert!(physics_handle(&harness.model, joint_id).is_some());
        assert_eq!(harness.physics.live_count(), 3);
    }

    #[test]
    fn test_move_and_create_undo() {
        let (mut harness, a, b) = pair();
        let mut command = MoveCommand::<RigidBody>::new(b, MoveDirection::Top);
        assert_eq!(command.name(), "MoveRigidBodyToTop");
        harness.redo(&mut command);
        assert_eq!(harness.model.rigid_bodies.ids(), vec![b, a]);
        harness.undo(&mut command);
        assert_eq!(harness.model.rigid_bodies.ids(), vec![a, b]);

        let mut create = create_soft_body(&harness.model);
        harness.redo(&mut create);
        assert_eq!(harness.physics.live_count(), 3);
        harness.undo(&mut create);
        assert!(harness.model.soft_bodies.is_empty());
        assert_eq!(harness.physics.live_count(), 2);
        harness.redo(&mut create);
        assert_eq!(harness.model.soft_bodies.len(), 1);
    }
}
