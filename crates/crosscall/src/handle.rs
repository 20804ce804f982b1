//! The closed set of opaque domain leaves a [`Value`](crate::Value) can hold.
//!
//! Handles are atomic from the value model's perspective: they cross the
//! module boundary as-is, never as structured data. The set is fixed at
//! build time; hosts that need more marshalable object kinds wrap them in
//! [`ObjectRef`].

use std::any::Any;
use std::sync::{Arc, Weak};

/// An opaque domain value carried inside a dynamic value.
#[derive(Debug)]
pub enum Handle {
    /// Weak reference to an externally owned host object.
    Object(ObjectRef),
    /// Binary-blob record, owned or shared.
    Blob(Blob),
    /// Integer grid position plus dimension.
    Block(BlockLocation),
    /// Float-space position plus dimension.
    World(WorldLocation),
}

impl Handle {
    /// Alternative name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Handle::Object(_) => "Handle::Object",
            Handle::Blob(_) => "Handle::Blob",
            Handle::Block(_) => "Handle::Block",
            Handle::World(_) => "Handle::World",
        }
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Handle::Object(a), Handle::Object(b)) => a == b,
            (Handle::Blob(a), Handle::Blob(b)) => a == b,
            (Handle::Block(a), Handle::Block(b)) => a == b,
            (Handle::World(a), Handle::World(b)) => a == b,
            _ => false,
        }
    }
}

/// Weak, type-tagged reference to an object owned by some host module.
///
/// The registry side never extends the referent's lifetime; once the owner
/// drops the object, [`ObjectRef::upgrade_as`] returns `None` and decoding
/// fails with a typed error instead of dangling.
#[derive(Clone)]
pub struct ObjectRef {
    type_name: &'static str,
    target: Weak<dyn Any + Send + Sync>,
}

impl ObjectRef {
    pub fn new<T: Any + Send + Sync>(target: &Arc<T>) -> Self {
        let erased: Arc<dyn Any + Send + Sync> = target.clone();
        Self {
            type_name: std::any::type_name::<T>(),
            target: Arc::downgrade(&erased),
        }
    }

    /// Name of the native type this reference was created from.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn upgrade_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.target.upgrade().and_then(|target| target.downcast::<T>().ok())
    }

    pub fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.target, &other.target)
    }
}

impl std::fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectRef")
            .field("type_name", &self.type_name)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Byte record that is either exclusively owned or shared with the sender.
///
/// The owned alternative is what makes the whole value model move-only: an
/// owned blob transfers across the call boundary exactly once.
#[derive(Debug)]
pub enum Blob {
    Owned(Box<[u8]>),
    Shared(Arc<[u8]>),
}

impl Blob {
    pub fn owned(bytes: impl Into<Box<[u8]>>) -> Self {
        Blob::Owned(bytes.into())
    }

    pub fn shared(bytes: Arc<[u8]>) -> Self {
        Blob::Shared(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Blob::Owned(bytes) => bytes,
            Blob::Shared(bytes) => bytes,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Blob::Owned(_))
    }

    /// Takes exclusive ownership of the bytes, cloning when shared.
    pub fn into_owned(self) -> Box<[u8]> {
        match self {
            Blob::Owned(bytes) => bytes,
            Blob::Shared(bytes) => bytes.as_ref().into(),
        }
    }
}

impl PartialEq for Blob {
    fn eq(&self, other: &Self) -> bool {
        self.bytes() == other.bytes()
    }
}

/// Integer grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn components(self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }

    pub fn from_components([x, y, z]: [i32; 3]) -> Self {
        Self { x, y, z }
    }

    pub fn as_vec3(self) -> Vec3 {
        Vec3::new(self.x as f32, self.y as f32, self.z as f32)
    }
}

/// Float-space position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn components(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    pub fn from_components([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }

    /// Component-wise truncation to the containing grid cell.
    pub fn to_block_pos(self) -> BlockPos {
        BlockPos::new(self.x as i32, self.y as i32, self.z as i32)
    }
}

/// Grid position paired with its dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLocation {
    pub pos: BlockPos,
    pub dim: i32,
}

impl BlockLocation {
    pub fn new(pos: BlockPos, dim: i32) -> Self {
        Self { pos, dim }
    }
}

impl From<BlockPos> for BlockLocation {
    fn from(pos: BlockPos) -> Self {
        Self { pos, dim: 0 }
    }
}

/// Float-space position paired with its dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldLocation {
    pub pos: Vec3,
    pub dim: i32,
}

impl WorldLocation {
    pub fn new(pos: Vec3, dim: i32) -> Self {
        Self { pos, dim }
    }
}

impl From<Vec3> for WorldLocation {
    fn from(pos: Vec3) -> Self {
        Self { pos, dim: 0 }
    }
}
