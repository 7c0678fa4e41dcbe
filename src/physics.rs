//! Narrow interface to an external physics simulation.
//!
//! The document never reaches into a simulation directly. Rigid bodies,
//! joints and soft bodies get a [`PhysicsHandle`] when bound, recorded as a
//! [`PhysicsState`] in the model's extension table, and every later call goes
//! through that handle.

use std::collections::HashSet;

use crate::model::{JointId, Model, MorphId, ObjectId, RigidBodyId, SoftBodyId};
use crate::model::{Joint, RigidBody, SoftBody};
use crate::util::{Error, Result, Vec3};

/// Opaque simulation object handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhysicsHandle(pub u64);

/// A simulation backend.
pub trait PhysicsEngine {
    fn create_rigid_body(&mut self, rigid_body: &RigidBody) -> Result<PhysicsHandle>;

    /// Create a constraint between two already created rigid bodies.
    fn create_joint(
        &mut self,
        joint: &Joint,
        rigid_body_a: PhysicsHandle,
        rigid_body_b: PhysicsHandle,
    ) -> Result<PhysicsHandle>;

    fn create_soft_body(&mut self, soft_body: &SoftBody) -> Result<PhysicsHandle>;

    fn destroy(&mut self, handle: PhysicsHandle);

    /// Add or remove an object from the running simulation.
    fn set_enabled(&mut self, _handle: PhysicsHandle, _enabled: bool) {}

    /// Copy simulated positions back into `vertices`.
    fn synchronize_from_simulation(&mut self, handle: PhysicsHandle, vertices: &mut [Vec3]);

    /// Push animated positions into the simulation.
    fn synchronize_to_simulation(&mut self, handle: PhysicsHandle, vertices: &[Vec3]);

    fn add_global_force(&mut self, handle: PhysicsHandle, force: Vec3, weight: f32);

    fn add_local_force(&mut self, handle: PhysicsHandle, force: Vec3, weight: f32);
}

/// Runtime record of a bound physics object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicsState {
    pub handle: PhysicsHandle,
    pub enabled: bool,
}

/// Store object that can carry a physics handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicsObject {
    RigidBody(RigidBodyId),
    Joint(JointId),
    SoftBody(SoftBodyId),
}

impl PhysicsObject {
    pub fn object_id(self) -> ObjectId {
        match self {
            Self::RigidBody(id) => id.object_id(),
            Self::Joint(id) => id.object_id(),
            Self::SoftBody(id) => id.object_id(),
        }
    }
}

impl From<RigidBodyId> for PhysicsObject {
    fn from(id: RigidBodyId) -> Self {
        Self::RigidBody(id)
    }
}

impl From<JointId> for PhysicsObject {
    fn from(id: JointId) -> Self {
        Self::Joint(id)
    }
}

impl From<SoftBodyId> for PhysicsObject {
    fn from(id: SoftBodyId) -> Self {
        Self::SoftBody(id)
    }
}

// ============================================================================
// Binding
// ============================================================================

/// Handle of a bound object.
pub fn physics_handle(model: &Model, object: impl Into<PhysicsObject>) -> Option<PhysicsHandle> {
    model
        .extensions
        .cast::<PhysicsState>(object.into().object_id())
        .map(|s| s.handle)
}

/// Create the simulation object and attach its state, enabled.
///
/// A joint needs both of its rigid bodies bound first.
pub fn bind_physics(
    model: &mut Model,
    engine: &mut dyn PhysicsEngine,
    object: impl Into<PhysicsObject>,
) -> Result<PhysicsHandle> {
    let object = object.into();
    if model.extensions.contains::<PhysicsState>(object.object_id()) {
        return Err(Error::already_exists(format!("physics state of {:?}", object)));
    }
    let handle = match object {
        PhysicsObject::RigidBody(id) => {
            let body = model
                .rigid_bodies
                .get(id)
                .ok_or_else(|| Error::not_found(format!("RigidBody {:?}", id)))?;
            engine.create_rigid_body(body)?
        }
        PhysicsObject::Joint(id) => {
            let joint = model
                .joints
                .get(id)
                .ok_or_else(|| Error::not_found(format!("Joint {:?}", id)))?;
            let body_handle = |body: Option<RigidBodyId>| {
                let body = model.rigid_bodies.resolve(body)?.id;
                physics_handle(model, body)
            };
            let (Some(a), Some(b)) = (body_handle(joint.rigid_body_a), body_handle(joint.rigid_body_b))
            else {
                return Err(Error::null_object(format!("rigid bodies of Joint {:?}", id)));
            };
            engine.create_joint(joint, a, b)?
        }
        PhysicsObject::SoftBody(id) => {
            let soft_body = model
                .soft_bodies
                .get(id)
                .ok_or_else(|| Error::not_found(format!("SoftBody {:?}", id)))?;
            engine.create_soft_body(soft_body)?
        }
    };
    model.extensions.bind(object.object_id(), PhysicsState { handle, enabled: true })?;
    tracing::debug!(?object, ?handle, "physics bound");
    Ok(handle)
}

/// Destroy the simulation object. Returns whether one was bound.
pub fn destroy_physics(model: &mut Model, engine: &mut dyn PhysicsEngine, object: impl Into<PhysicsObject>) -> bool {
    let object = object.into();
    match model.extensions.unbind_record::<PhysicsState>(object.object_id()) {
        Some(state) => {
            engine.destroy(state.handle);
            tracing::debug!(?object, handle = ?state.handle, "physics destroyed");
            true
        }
        None => false,
    }
}

fn set_enabled(
    model: &mut Model,
    engine: &mut dyn PhysicsEngine,
    object: PhysicsObject,
    enabled: bool,
) -> Result<()> {
    let state = model
        .extensions
        .cast_mut::<PhysicsState>(object.object_id())
        .ok_or_else(|| Error::null_object(format!("physics state of {:?}", object)))?;
    if state.enabled != enabled {
        state.enabled = enabled;
        engine.set_enabled(state.handle, enabled);
    }
    Ok(())
}

pub fn enable_physics(model: &mut Model, engine: &mut dyn PhysicsEngine, object: impl Into<PhysicsObject>) -> Result<()> {
    set_enabled(model, engine, object.into(), true)
}

pub fn disable_physics(model: &mut Model, engine: &mut dyn PhysicsEngine, object: impl Into<PhysicsObject>) -> Result<()> {
    set_enabled(model, engine, object.into(), false)
}

/// Bind every rigid body, then every joint and soft body. Returns the number bound.
pub fn bind_all_physics(model: &mut Model, engine: &mut dyn PhysicsEngine) -> Result<usize> {
    let mut objects: Vec<PhysicsObject> = model.rigid_bodies.ids().into_iter().map(Into::into).collect();
    objects.extend(model.joints.ids().into_iter().map(PhysicsObject::from));
    objects.extend(model.soft_bodies.ids().into_iter().map(PhysicsObject::from));
    let mut count = 0;
    for object in objects {
        if physics_handle(model, object).is_none() {
            bind_physics(model, engine, object)?;
            count += 1;
        }
    }
    Ok(count)
}

/// Destroy every bound object, joints first.
pub fn destroy_all_physics(model: &mut Model, engine: &mut dyn PhysicsEngine) {
    let mut objects: Vec<PhysicsObject> = model.joints.ids().into_iter().map(Into::into).collect();
    objects.extend(model.soft_bodies.ids().into_iter().map(PhysicsObject::from));
    objects.extend(model.rigid_bodies.ids().into_iter().map(PhysicsObject::from));
    for object in objects {
        destroy_physics(model, engine, object);
    }
}

fn enabled_handles(model: &Model) -> Vec<PhysicsHandle> {
    let rigid_bodies = model.rigid_bodies.ids().into_iter().map(PhysicsObject::from);
    let soft_bodies = model.soft_bodies.ids().into_iter().map(PhysicsObject::from);
    rigid_bodies
        .chain(soft_bodies)
        .filter_map(|object| model.extensions.cast::<PhysicsState>(object.object_id()))
        .filter(|state| state.enabled)
        .map(|state| state.handle)
        .collect()
}

/// Per-frame feedback from the simulation into `vertices`.
pub fn synchronize_from_simulation(model: &Model, engine: &mut dyn PhysicsEngine, vertices: &mut [Vec3]) {
    for handle in enabled_handles(model) {
        engine.synchronize_from_simulation(handle, vertices);
    }
}

/// Per-frame push of animated state into the simulation.
pub fn synchronize_to_simulation(model: &Model, engine: &mut dyn PhysicsEngine, vertices: &[Vec3]) {
    for handle in enabled_handles(model) {
        engine.synchronize_to_simulation(handle, vertices);
    }
}

/// Apply the velocity of every item of an impulse morph at `weight`.
pub fn apply_impulse_morph(model: &Model, engine: &mut dyn PhysicsEngine, morph: MorphId, weight: f32) -> Result<()> {
    let morph = model
        .morphs
        .get(morph)
        .ok_or_else(|| Error::not_found(format!("Morph {:?}", morph)))?;
    for item in &morph.items.impulses {
        let Some(body) = model.rigid_bodies.resolve(item.rigid_body) else { continue };
        let Some(state) = model.extensions.cast::<PhysicsState>(body.id) else { continue };
        if !state.enabled {
            continue;
        }
        if item.is_local {
            engine.add_local_force(state.handle, item.velocity, weight);
        } else {
            engine.add_global_force(state.handle, item.velocity, weight);
        }
    }
    Ok(())
}

// ============================================================================
// Null engine
// ============================================================================

/// Engine without a simulation that keeps track of its live handles.
#[derive(Debug, Default)]
pub struct NullPhysicsEngine {
    next: u64,
    live: HashSet<PhysicsHandle>,
    disabled: HashSet<PhysicsHandle>,
    /// `(handle, force, weight, local)` of every applied force.
    pub forces: Vec<(PhysicsHandle, Vec3, f32, bool)>,
}

impl NullPhysicsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, handle: PhysicsHandle) -> bool {
        self.live.contains(&handle)
    }

    pub fn is_enabled(&self, handle: PhysicsHandle) -> bool {
        self.is_live(handle) && !self.disabled.contains(&handle)
    }

    fn allocate(&mut self) -> PhysicsHandle {
        self.next += 1;
        let handle = PhysicsHandle(self.next);
        self.live.insert(handle);
        handle
    }
}

impl PhysicsEngine for NullPhysicsEngine {
    fn create_rigid_body(&mut self, _rigid_body: &RigidBody) -> Result<PhysicsHandle> {
        Ok(self.allocate())
    }

    fn create_joint(&mut self, _joint: &Joint, a: PhysicsHandle, b: PhysicsHandle) -> Result<PhysicsHandle> {
        if !self.is_live(a) || !self.is_live(b) {
            return Err(Error::null_object("joint rigid body handle"));
        }
        Ok(self.allocate())
    }

    fn create_soft_body(&mut self, _soft_body: &SoftBody) -> Result<PhysicsHandle> {
        Ok(self.allocate())
    }

    fn destroy(&mut self, handle: PhysicsHandle) {
        self.live.remove(&handle);
        self.disabled.remove(&handle);
    }

    fn set_enabled(&mut self, handle: PhysicsHandle, enabled: bool) {
        if enabled {
            self.disabled.remove(&handle);
        } else {
            self.disabled.insert(handle);
        }
    }

    fn synchronize_from_simulation(&mut self, _handle: PhysicsHandle, _vertices: &mut [Vec3]) {}

    fn synchronize_to_simulation(&mut self, _handle: PhysicsHandle, _vertices: &[Vec3]) {}

    fn add_global_force(&mut self, handle: PhysicsHandle, force: Vec3, weight: f32) {
        self.forces.push((handle, force, weight, false));
    }

    fn add_local_force(&mut self, handle: PhysicsHandle, force: Vec3, weight: f32) {
        self.forces.push((handle, force, weight, true));
    }
}
