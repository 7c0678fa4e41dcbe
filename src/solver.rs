//! Axis-angle inverse kinematics.
//!
//! [`solve_axis_angle`] computes the rotation that turns one joint so the
//! effector points at the target. [`solve_constraint`] runs it over every
//! joint of a constraint for the configured number of iterations, keeping
//! the posed transforms in [`BoneStates`] and the per-iteration results in a
//! [`ConstraintState`] record bound to the constraint.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::model::{Bone, BoneId, ConstraintId, ConstraintJointId, Model, ModelObject, ObjectArray};
use crate::util::{constrain_orientation, is_null, transform_origin, translate, Mat4, Quat, Vec3, UNIT_X, UNIT_Y, UNIT_Z};

/// Lower and upper x limits applied to knee joints.
const KNEE_LOWER_LIMIT_DEGREES: f32 = 0.5;
const KNEE_UPPER_LIMIT_DEGREES: f32 = 180.0;

// ============================================================================
// Axis-angle step
// ============================================================================

/// Result kind of one axis-angle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisAngleOutcome {
    /// A correction was computed and must be applied.
    Rotate,
    /// Nothing to correct.
    NoOp,
    /// No stable axis exists: a local position sits on the joint origin, or
    /// effector and target point in opposite directions.
    Degenerate,
}

/// Output of [`solve_axis_angle`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisAngle {
    pub outcome: AxisAngleOutcome,
    pub axis: Vec3,
    pub angle: f32,
    pub effector_direction: Vec3,
    pub target_direction: Vec3,
}

impl AxisAngle {
    fn none(outcome: AxisAngleOutcome) -> Self {
        Self {
            outcome,
            axis: Vec3::ZERO,
            angle: 0.0,
            effector_direction: Vec3::ZERO,
            target_direction: Vec3::ZERO,
        }
    }

    #[inline]
    pub fn is_rotation(&self) -> bool {
        self.outcome == AxisAngleOutcome::Rotate
    }
}

/// Rotation in the local space of `transform` that aligns the effector with the target.
pub fn solve_axis_angle(
    transform: &Mat4,
    effector_position: Vec3,
    target_position: Vec3,
    epsilon: f32,
) -> AxisAngle {
    let inverse = transform.inverse();
    let local_effector = inverse.transform_point3(effector_position);
    let local_target = inverse.transform_point3(target_position);
    if is_null(local_effector, epsilon) || is_null(local_target, epsilon) {
        return AxisAngle::none(AxisAngleOutcome::Degenerate);
    }
    let effector_direction = local_effector.normalize();
    let target_direction = local_target.normalize();
    let axis = effector_direction.cross(target_direction);
    // acos is undefined outside [-1, 1]
    let cos_angle = effector_direction.dot(target_direction).clamp(-1.0, 1.0);
    let mut result = AxisAngle {
        outcome: AxisAngleOutcome::NoOp,
        axis,
        angle: 0.0,
        effector_direction,
        target_direction,
    };
    if is_null(axis, epsilon) {
        if cos_angle < 0.0 {
            result.outcome = AxisAngleOutcome::Degenerate;
        }
        return result;
    }
    result.axis = axis.normalize();
    if cos_angle.abs() <= epsilon {
        return result;
    }
    result.outcome = AxisAngleOutcome::Rotate;
    result.angle = cos_angle.acos();
    result
}

// ============================================================================
// Bone poses
// ============================================================================

/// Posed transform of one bone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneState {
    /// Orientation set by the user or by motion.
    pub local_orientation: Quat,
    pub local_translation: Vec3,
    /// Orientation written by the solver for chain joints.
    pub constraint_joint_orientation: Quat,
    pub world_transform: Mat4,
}

impl Default for BoneState {
    fn default() -> Self {
        Self {
            local_orientation: Quat::IDENTITY,
            local_translation: Vec3::ZERO,
            constraint_joint_orientation: Quat::IDENTITY,
            world_transform: Mat4::IDENTITY,
        }
    }
}

impl BoneState {
    /// Recompute the world transform from the bone origin, the parent pose and `orientation`.
    pub fn update_world_transform(
        &mut self,
        bone: &Bone,
        parent: Option<(&Bone, &Mat4)>,
        orientation: Quat,
    ) {
        let (parent_origin, parent_world) = match parent {
            Some((parent, world)) => (parent.origin, *world),
            None => (Vec3::ZERO, Mat4::IDENTITY),
        };
        let local = translate(bone.origin - parent_origin + self.local_translation)
            * Mat4::from_quat(orientation);
        self.world_transform = parent_world * local;
    }

    /// Position of the bone in model space.
    #[inline]
    pub fn world_origin(&self) -> Vec3 {
        transform_origin(&self.world_transform)
    }
}

/// Pose of every bone of a model.
#[derive(Debug, Clone, Default)]
pub struct BoneStates {
    states: HashMap<BoneId, BoneState>,
}

impl BoneStates {
    /// Rest pose of every bone.
    pub fn new(model: &Model) -> Self {
        let mut states = Self::default();
        states.update_all(model);
        states
    }

    pub fn get(&self, bone: BoneId) -> Option<&BoneState> {
        self.states.get(&bone)
    }

    pub fn get_mut(&mut self, bone: BoneId) -> &mut BoneState {
        self.states.entry(bone).or_default()
    }

    /// World origin of a bone, the model origin when it has no pose.
    pub fn world_origin(&self, bone: Option<BoneId>) -> Vec3 {
        bone.and_then(|b| self.states.get(&b))
            .map_or(Vec3::ZERO, BoneState::world_origin)
    }

    /// Recompute one bone from its parent with an explicit orientation.
    pub fn update(&mut self, bones: &ObjectArray<Bone>, bone: BoneId, orientation: Quat) {
        let Some(object) = bones.get(bone) else { return };
        let parent = bones.resolve(object.parent_bone);
        let parent_world = parent.map(|p| self.get_mut(p.id()).world_transform);
        let state = self.get_mut(bone);
        state.update_world_transform(object, parent.zip(parent_world.as_ref()), orientation);
    }

    /// Recompute every bone with its local orientation, parents first.
    pub fn update_all(&mut self, model: &Model) {
        let mut done = vec![false; model.bones.len()];
        for index in 0..model.bones.len() {
            self.update_with_ancestors(model, index, &mut done, 0);
        }
    }

    fn update_with_ancestors(&mut self, model: &Model, index: usize, done: &mut [bool], depth: usize) {
        if done[index] || depth > done.len() {
            return;
        }
        let bone = &model.bones[index];
        if let Some(parent) = bone.parent_bone.and_then(|p| model.bones.position(p)) {
            self.update_with_ancestors(model, parent, done, depth + 1);
        }
        let orientation = self.get_mut(bone.id()).local_orientation;
        self.update(&model.bones, bone.id(), orientation);
        done[index] = true;
    }
}

// ============================================================================
// Constraint loop
// ============================================================================

/// Snapshot of one joint or effector after one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationResult {
    pub transform: Mat4,
    pub effector_direction: Vec3,
    pub target_direction: Vec3,
    pub axis: Vec3,
    pub angle: f32,
}

/// Runtime state of a constraint, bound as an extension record.
#[derive(Debug, Clone)]
pub struct ConstraintState {
    pub enabled: bool,
    /// Per joint, one entry per iteration that rotated it.
    pub joint_results: HashMap<ConstraintJointId, Vec<(usize, IterationResult)>>,
    pub effector_results: HashMap<ConstraintJointId, Vec<(usize, IterationResult)>>,
}

impl Default for ConstraintState {
    fn default() -> Self {
        Self { enabled: true, joint_results: HashMap::new(), effector_results: HashMap::new() }
    }
}

impl ConstraintState {
    /// Result of a joint at an iteration.
    pub fn joint_result(&self, joint: ConstraintJointId, iteration: usize) -> Option<&IterationResult> {
        self.joint_results
            .get(&joint)?
            .iter()
            .find(|(i, _)| *i == iteration)
            .map(|(_, r)| r)
    }

    pub fn clear(&mut self) {
        self.joint_results.clear();
        self.effector_results.clear();
    }
}

/// Unit axis of a joint whose limits pin the other two axes at zero.
///
/// Checked in x, y, z order, so a joint pinned on every axis turns around x.
fn limited_axis(lower: Vec3, upper: Vec3, epsilon: f32) -> Option<Vec3> {
    let pinned = |l: f32, u: f32| l.abs() <= epsilon && u.abs() <= epsilon;
    let (x, y, z) = (
        pinned(lower.x, upper.x),
        pinned(lower.y, upper.y),
        pinned(lower.z, upper.z),
    );
    if y && z {
        Some(UNIT_X)
    } else if x && z {
        Some(UNIT_Y)
    } else if x && y {
        Some(UNIT_Z)
    } else {
        None
    }
}

/// Run a constraint over its joint chain.
///
/// A joint with nothing to correct is skipped and the chain carries on with
/// the next one. Fixed and limited axes replace the computed axis as is, the
/// angle limits decide the direction. Returns the number of joint rotations
/// applied.
#[tracing::instrument(skip_all)]
pub fn solve_constraint(
    model: &mut Model,
    bone_states: &mut BoneStates,
    constraint: ConstraintId,
    epsilon: f32,
) -> usize {
    let Model { bones, constraints, extensions, .. } = model;
    let bones: &ObjectArray<Bone> = bones;
    let Some(constraint) = constraints.get(constraint) else { return 0 };
    let state = match extensions.cast_or_bind_with(constraint.id(), ConstraintState::default) {
        Some(state) => state,
        None => return 0,
    };
    let joints: SmallVec<[(ConstraintJointId, BoneId); 8]> = constraint
        .joints
        .iter()
        .filter_map(|j| Some((j.id(), j.bone.filter(|&b| bones.contains(b))?)))
        .collect();
    if !state.enabled {
        for &(_, bone) in &joints {
            bone_states.get_mut(bone).constraint_joint_orientation = Quat::IDENTITY;
        }
        return 0;
    }
    let (Some(target), Some(effector)) = (
        bones.resolve(constraint.target_bone),
        bones.resolve(constraint.effector_bone),
    ) else {
        return 0;
    };
    state.clear();

    let mut applied = 0;
    for iteration in 0..constraint.num_iterations.max(0) as usize {
        let first_iteration = iteration == 0;
        for (j, &(joint_id, joint_bone_id)) in joints.iter().enumerate() {
            let Some(joint) = constraint.joints.get(joint_id) else { continue };
            let Some(joint_bone) = bones.get(joint_bone_id) else { continue };
            let effector_position = bone_states.world_origin(Some(effector.id()));
            let target_position = bone_states.world_origin(Some(target.id()));
            let joint_transform = bone_states.get_mut(joint_bone_id).world_transform;
            let step = solve_axis_angle(&joint_transform, effector_position, target_position, epsilon);
            if !step.is_rotation() {
                continue;
            }

            let is_knee = joint_bone.has_unit_x_constraint();
            let mut axis = step.axis;
            if joint_bone.has_fixed_axis() && !is_null(joint_bone.fixed_axis, epsilon) {
                axis = joint_bone.fixed_axis.normalize();
            } else if first_iteration && is_knee {
                axis = UNIT_X;
            } else if first_iteration && joint.has_angle_limit {
                if let Some(unit) = limited_axis(joint.lower_limit, joint.upper_limit, epsilon) {
                    axis = unit;
                }
            }
            let angle = step.angle.min(constraint.angle_limit * (j + 1) as f32);
            let orientation = Quat::from_axis_angle(axis, angle);

            let joint_state = bone_states.get_mut(joint_bone_id);
            let mut mixed = if first_iteration {
                orientation * joint_state.local_orientation
            } else {
                joint_state.constraint_joint_orientation * orientation
            };
            if is_knee {
                mixed = constrain_orientation(
                    Vec3::new(KNEE_UPPER_LIMIT_DEGREES.to_radians(), 0.0, 0.0),
                    Vec3::new(KNEE_LOWER_LIMIT_DEGREES.to_radians(), 0.0, 0.0),
                    mixed,
                );
            } else if joint.has_angle_limit {
                mixed = constrain_orientation(joint.upper_limit, joint.lower_limit, mixed);
            }
            joint_state.constraint_joint_orientation = mixed.normalize();

            for &(_, upper_bone) in joints[..=j].iter().rev() {
                let orientation = bone_states.get_mut(upper_bone).constraint_joint_orientation;
                bone_states.update(bones, upper_bone, orientation);
            }
            let effector_orientation = bone_states.get_mut(effector.id()).local_orientation;
            bone_states.update(bones, effector.id(), effector_orientation);

            let result = IterationResult {
                transform: bone_states.get_mut(joint_bone_id).world_transform,
                effector_direction: step.effector_direction,
                target_direction: step.target_direction,
                axis,
                angle,
            };
            state.joint_results.entry(joint_id).or_default().push((iteration, result));
            let effector_result = IterationResult {
                transform: bone_states.get_mut(effector.id()).world_transform,
                ..result
            };
            state.effector_results.entry(joint_id).or_default().push((iteration, effector_result));
            applied += 1;
        }
    }
    tracing::debug!(applied, iterations = constraint.num_iterations, "constraint solved");
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Constraint, ConstraintJoint};
    use crate::util::EPSILON;

    #[test]
    fn test_same_position_is_noop() {
        let p = Vec3::new(0.0, 1.0, 0.0);
        let result = solve_axis_angle(&Mat4::IDENTITY, p, p, EPSILON);
        assert_eq!(result.outcome, AxisAngleOutcome::NoOp);
        assert!(!result.angle.is_nan());
    }

    #[test]
    fn test_antiparallel_is_degenerate() {
        let result = solve_axis_angle(
            &Mat4::IDENTITY,
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, -2.0, 0.0),
            EPSILON,
        );
        assert_eq!(result.outcome, AxisAngleOutcome::Degenerate);
        assert!(!result.angle.is_nan());
    }

    #[test]
    fn test_origin_is_degenerate() {
        let result = solve_axis_angle(&Mat4::IDENTITY, Vec3::ZERO, Vec3::X, EPSILON);
        assert_eq!(result.outcome, AxisAngleOutcome::Degenerate);
        let result = solve_axis_angle(&Mat4::IDENTITY, Vec3::Y, Vec3::splat(1e-9), EPSILON);
        assert_eq!(result.outcome, AxisAngleOutcome::Degenerate);
    }

    #[test]
    fn test_orthogonal_pair_is_noop() {
        let result = solve_axis_angle(&Mat4::IDENTITY, Vec3::Y, Vec3::X, EPSILON);
        assert_eq!(result.outcome, AxisAngleOutcome::NoOp);
        assert_eq!(result.angle, 0.0);
    }

    #[test]
    fn test_generic_pair_angle() {
        let transform = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let result = solve_axis_angle(
            &transform,
            Vec3::new(1.0, 2.0, 0.0),
            Vec3::new(2.0, 1.0, 0.5),
            EPSILON,
        );
        assert_eq!(result.outcome, AxisAngleOutcome::Rotate);
        let dot = result.effector_direction.dot(result.target_direction);
        assert_eq!(result.angle, dot.clamp(-1.0, 1.0).acos());
        assert!((result.axis.length() - 1.0).abs() < 1e-5);
    }

    fn chain_model(target: Vec3) -> (Model, [BoneId; 3], ConstraintId) {
        let mut model = Model::new();
        let mut root = Bone::new();
        root.origin = Vec3::ZERO;
        let root_id = root.id();
        let mut tip = Bone::new();
        tip.origin = Vec3::new(0.0, 1.0, 0.0);
        tip.parent_bone = Some(root_id);
        let tip_id = tip.id();
        let mut ik = Bone::new();
        ik.origin = target;
        let ik_id = ik.id();

        let mut constraint = Constraint::new();
        constraint.target_bone = Some(ik_id);
        constraint.effector_bone = Some(tip_id);
        constraint.angle_limit = std::f32::consts::PI;
        constraint.num_iterations = 8;
        constraint.joints.push(ConstraintJoint::new(Some(root_id))).unwrap();
        let constraint_id = constraint.id();
        ik.constraint = Some(constraint_id);

        model.bones.push(root).unwrap();
        model.bones.push(tip).unwrap();
        model.bones.push(ik).unwrap();
        model.constraints.push(constraint).unwrap();
        (model, [root_id, tip_id, ik_id], constraint_id)
    }

    #[test]
    fn test_solve_constraint_reaches_target() {
        let (mut model, [_, tip, ik], constraint) = chain_model(Vec3::new(0.6, 0.8, 0.0));
        let mut states = BoneStates::new(&model);
        let applied = solve_constraint(&mut model, &mut states, constraint, 1e-6);
        assert_eq!(applied, 1);
        let distance = states.world_origin(Some(tip)).distance(states.world_origin(Some(ik)));
        assert!(distance < 1e-3, "distance {distance}");
        let state = model.extensions.cast::<ConstraintState>(constraint).unwrap();
        assert!(!state.joint_results.is_empty());
    }

    #[test]
    fn test_solve_constraint_orthogonal_target_stays() {
        let (mut model, [_, tip, _], constraint) = chain_model(Vec3::new(1.0, 0.0, 0.0));
        let mut states = BoneStates::new(&model);
        assert_eq!(solve_constraint(&mut model, &mut states, constraint, 1e-6), 0);
        let tip = states.world_origin(Some(tip));
        assert!(tip.distance(Vec3::new(0.0, 1.0, 0.0)) < 1e-6, "tip {tip}");
    }

    #[test]
    fn test_solve_constraint_skips_idle_joint() {
        let mut model = Model::new();
        let hip = Bone::new();
        let hip_id = hip.id();
        let mut knee = Bone::new();
        knee.origin = Vec3::new(0.0, 1.0, 0.0);
        knee.parent_bone = Some(hip_id);
        let knee_id = knee.id();
        let mut tip = Bone::new();
        tip.origin = Vec3::new(0.0, 2.0, 0.0);
        tip.parent_bone = Some(knee_id);
        let tip_id = tip.id();
        let mut ik = Bone::new();
        ik.origin = Vec3::new(1.0, 1.0, 0.0);
        let ik_id = ik.id();

        let mut constraint = Constraint::new();
        constraint.target_bone = Some(ik_id);
        constraint.effector_bone = Some(tip_id);
        constraint.angle_limit = std::f32::consts::PI;
        constraint.num_iterations = 4;
        let knee_joint = ConstraintJoint::new(Some(knee_id));
        let hip_joint = ConstraintJoint::new(Some(hip_id));
        let (knee_joint_id, hip_joint_id) = (knee_joint.id(), hip_joint.id());
        constraint.joints.push(knee_joint).unwrap();
        constraint.joints.push(hip_joint).unwrap();
        let constraint_id = constraint.id();
        ik.constraint = Some(constraint_id);
        for bone in [hip, knee, tip, ik] {
            model.bones.push(bone).unwrap();
        }
        model.constraints.push(constraint).unwrap();

        // the knee sees the target at a right angle, the hip still turns
        let mut states = BoneStates::new(&model);
        let applied = solve_constraint(&mut model, &mut states, constraint_id, 1e-6);
        assert_eq!(applied, 1);
        let distance = states.world_origin(Some(tip_id)).distance(states.world_origin(Some(ik_id)));
        assert!((distance - (2.0 - 2f32.sqrt())).abs() < 1e-4, "distance {distance}");
        let state = model.extensions.cast::<ConstraintState>(constraint_id).unwrap();
        assert!(state.joint_result(knee_joint_id, 0).is_none());
        assert!(state.joint_result(hip_joint_id, 0).is_some());
    }

    #[test]
    fn test_disabled_constraint_resets_joints() {
        let (mut model, [root, _, _], constraint) = chain_model(Vec3::new(0.6, 0.8, 0.0));
        let mut states = BoneStates::new(&model);
        states.get_mut(root).constraint_joint_orientation = Quat::from_rotation_z(0.3);
        model
            .extensions
            .bind(constraint, ConstraintState { enabled: false, ..Default::default() })
            .unwrap();
        assert_eq!(solve_constraint(&mut model, &mut states, constraint, 1e-6), 0);
        assert_eq!(states.get(root).unwrap().constraint_joint_orientation, Quat::IDENTITY);
    }

    #[test]
    fn test_limited_axis() {
        let lower = Vec3::new(-1.0, 0.0, 0.0);
        let upper = Vec3::new(0.5, 0.0, 0.0);
        assert_eq!(limited_axis(lower, upper, 1e-6), Some(UNIT_X));
        assert_eq!(limited_axis(Vec3::new(0.0, 0.0, -1.0), Vec3::ZERO, 1e-6), Some(UNIT_Z));
        assert_eq!(limited_axis(Vec3::ZERO, Vec3::ZERO, 1e-6), Some(UNIT_X));
        assert_eq!(limited_axis(Vec3::splat(-1.0), Vec3::splat(1.0), 1e-6), None);
    }
}
