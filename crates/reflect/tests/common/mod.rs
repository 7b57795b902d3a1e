//! Shared reflected types for integration tests

#![allow(dead_code)]

use std::any::Any;
use std::collections::{HashMap, HashSet};

use helium_reflect::registry::{Composite, Field};
use helium_reflect::types::{Color3, Path, Tuid, Vector3};
use helium_reflect::{
    object_ptr, Object, ObjectHandle, ObjectPtr, Reflect, ReflectionContext, SortedMap, SortedSet,
};

/// Install a test subscriber once; filtered by `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Reflect, Default, Clone, Debug, PartialEq)]
#[reflect(structure)]
pub struct Bounds {
    pub min: Vector3,
    pub max: Vector3,
}

#[derive(Reflect, Default)]
pub struct SceneNode {
    pub name: String,
    pub id: Tuid,
}

#[derive(Reflect, Default)]
pub struct Material {
    pub color: Color3,
    pub texture: Path,
}

#[derive(Reflect, Default)]
pub struct Mesh {
    #[reflect(base)]
    pub node: SceneNode,
    pub tags: Vec<String>,
    pub weights: Vec<f32>,
    pub layers: HashSet<u32>,
    pub lookup: HashMap<String, i32>,
    pub ordered: SortedMap<u32, String>,
    pub bounds: Bounds,
    pub material: Option<ObjectPtr>,
    pub children: Vec<Option<ObjectPtr>>,
    #[reflect(discard)]
    pub cached: u32,
    #[reflect(skip)]
    pub scratch: u64,
}

/// Holds objects through every keyed container
#[derive(Reflect, Default)]
pub struct Rig {
    pub label: String,
    pub lines: Vec<String>,
    pub ranks: SortedSet<u16>,
    pub members: HashSet<ObjectHandle>,
    pub by_slot: HashMap<u32, Option<ObjectPtr>>,
    pub by_name: SortedMap<String, Option<ObjectPtr>>,
}

/// Records its lifecycle hooks
#[derive(Reflect, Default)]
#[reflect(name = "Tracked", manual_object)]
pub struct TrackedObject {
    pub value: i32,
    #[reflect(skip)]
    pub events: Vec<String>,
}

impl Object for TrackedObject {
    fn class(&self) -> &'static Composite {
        Self::composite()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn pre_serialize(&mut self) {
        self.events.push("pre_serialize".into());
    }

    fn post_serialize(&mut self) {
        self.events.push("post_serialize".into());
    }

    fn pre_deserialize(&mut self) {
        self.events.push("pre_deserialize".into());
    }

    fn post_deserialize(&mut self) {
        self.events.push("post_deserialize".into());
    }

    fn field_changed(&mut self, field: &Field) {
        self.events.push(format!("changed {}", field.name()));
    }
}

/// Context with every test type registered
pub fn context() -> ReflectionContext {
    init_tracing();
    let ctx = ReflectionContext::new();
    register_all(&ctx);
    ctx
}

pub fn register_all(ctx: &ReflectionContext) {
    ctx.register::<Bounds>().unwrap();
    ctx.register::<SceneNode>().unwrap();
    ctx.register::<Material>().unwrap();
    ctx.register::<Mesh>().unwrap();
    ctx.register::<TrackedObject>().unwrap();
    ctx.register::<Rig>().unwrap();
}

pub fn sample_material() -> ObjectPtr {
    object_ptr(Material {
        color: Color3::new(255, 128, 0),
        texture: Path::new("textures/brick.png"),
    })
}

/// A mesh with every field populated and two nested meshes
pub fn sample_mesh() -> ObjectPtr {
    let child = Mesh {
        node: SceneNode {
            name: "child".into(),
            id: Tuid::new(2),
        },
        weights: vec![0.5],
        ..Mesh::default()
    };

    let mut ordered = SortedMap::new();
    ordered.insert(3, "three".to_string());
    ordered.insert(1, "one".to_string());

    object_ptr(Mesh {
        node: SceneNode {
            name: "root <mesh> & \"friends\"".into(),
            id: Tuid::new(0xDEAD_BEEF),
        },
        tags: vec!["static".into(), "has \"quotes\"".into(), "a]]>b".into()],
        weights: vec![1.0, -2.5, 3.25],
        layers: [1, 5, 9].into_iter().collect(),
        lookup: [("alpha".to_string(), 1), ("beta".to_string(), -7)]
            .into_iter()
            .collect(),
        ordered,
        bounds: Bounds {
            min: Vector3::new(-1.0, -2.0, -3.0),
            max: Vector3::new(1.0, 2.0, 3.0),
        },
        material: Some(sample_material()),
        children: vec![Some(object_ptr(child)), None],
        cached: 99,
        scratch: 7,
    })
}

pub fn material(texture: &str) -> ObjectPtr {
    object_ptr(Material {
        color: Color3::new(1, 2, 3),
        texture: Path::new(texture),
    })
}

/// A rig with `count` entries in each container
pub fn sample_rig(count: u16) -> ObjectPtr {
    let mut by_name = SortedMap::new();
    for i in 0..count {
        by_name.insert(format!("n{}", i), Some(material(&format!("named/{}.png", i))));
    }
    object_ptr(Rig {
        label: "rig".into(),
        lines: (0..count).map(|i| format!("line {}", i)).collect(),
        ranks: (0..count).map(|i| i * 7).collect(),
        members: (0..count)
            .map(|i| ObjectHandle(material(&format!("member/{}.png", i))))
            .collect(),
        by_slot: (0..count)
            .map(|i| (u32::from(i), Some(material(&format!("slot/{}.png", i)))))
            .collect(),
        by_name,
    })
}

/// Read a typed view of a shared object
pub fn with<T: Object, R>(object: &ObjectPtr, f: impl FnOnce(&T) -> R) -> R {
    let guard = object.read();
    f(guard.downcast_ref::<T>().expect("unexpected object type"))
}
