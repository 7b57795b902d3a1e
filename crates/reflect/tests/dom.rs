//! Documents holding reflected payloads

mod common;

use std::sync::Arc;

use common::{sample_material, sample_mesh, Material, Mesh, SceneNode};
use helium_reflect::visitor::{FindByTypeSetVisitor, FindByTypeVisitor};
use helium_reflect::{Document, DocumentError, Reflect, Veto};
use parking_lot::Mutex;

#[test]
fn test_payload_queries() {
    common::init_tracing();
    let mut doc = Document::new();
    let root = doc.root();

    let scene = doc.create_object("Scene", None);
    let mesh = doc.create_object("Mesh", Some(sample_mesh()));
    let material = doc.create_object("Material", Some(sample_material()));
    let detached = doc.create_object("Spare", Some(sample_mesh()));
    let label = doc.create_attribute("label", "level 1");

    doc.add_child(root, scene).unwrap();
    doc.add_child(scene, mesh).unwrap();
    doc.add_child(scene, material).unwrap();
    doc.add_child(scene, label).unwrap();

    assert_eq!(doc.find_child(scene, "Mesh"), Some(mesh));
    assert_eq!(doc.attribute(scene, "label"), Some("level 1"));
    assert_eq!(doc.attribute(scene, "Mesh"), None);

    assert_eq!(doc.nodes_of_type(SceneNode::composite()), vec![mesh]);
    assert_eq!(doc.nodes_of_type(Material::composite()), vec![material]);
    assert!(!doc.get(detached).unwrap().is_attached());

    // The sample mesh holds a nested mesh and a material
    let mut meshes = FindByTypeVisitor::new(Mesh::composite());
    doc.accept(&mut meshes);
    assert_eq!(meshes.found().len(), 2);

    let mut any = FindByTypeSetVisitor::new([Mesh::composite(), Material::composite()]);
    doc.accept(&mut any);
    assert_eq!(any.found().len(), 4);

    doc.set_payload(material, None).unwrap();
    assert!(doc.nodes_of_type(Material::composite()).is_empty());
    assert!(matches!(
        doc.set_payload(label, None),
        Err(DocumentError::NotAnObject(_))
    ));
    assert!(doc.verify());
}

#[test]
fn test_listeners_guard_structure() {
    let mut doc = Document::new();
    let root = doc.root();
    let log = Arc::new(Mutex::new(Vec::new()));

    let seen = log.clone();
    doc.on_child_adding(move |doc, event| {
        let name = doc.get(event.child).map(|n| n.name().to_string());
        if name.as_deref() == Some("locked") {
            return Err(Veto::new("locked nodes stay out"));
        }
        seen.lock().push(format!("adding {}", name.unwrap_or_default()));
        Ok(())
    });
    let seen = log.clone();
    let added = doc.on_child_added(move |doc, event| {
        let attached = doc.get(event.child).is_some_and(|n| n.is_attached());
        seen.lock().push(format!("added attached={}", attached));
    });
    doc.on_child_removing(|doc, event| match doc.get(event.child) {
        Some(node) if node.name() == "pinned" => Err(Veto::new("pinned")),
        _ => Ok(()),
    });

    let open = doc.create_object("open", None);
    let locked = doc.create_object("locked", None);
    let pinned = doc.create_object("pinned", None);

    doc.add_child(root, open).unwrap();
    doc.add_child(root, pinned).unwrap();
    match doc.add_child(root, locked) {
        Err(DocumentError::Vetoed(veto)) => assert_eq!(veto.reason(), "locked nodes stay out"),
        other => panic!("expected a veto, got {:?}", other),
    }
    assert!(doc.get(locked).unwrap().parent().is_none());

    assert!(matches!(
        doc.remove_child(root, pinned),
        Err(DocumentError::Vetoed(_))
    ));
    assert_eq!(doc.get(root).unwrap().children(), &[open, pinned]);
    doc.remove_child(root, open).unwrap();

    assert_eq!(
        *log.lock(),
        vec![
            "adding open",
            "added attached=true",
            "adding pinned",
            "added attached=true",
        ]
    );

    assert_eq!(doc.listener_count(), 3);
    assert!(doc.remove_listener(added));
    assert!(!doc.remove_listener(added));
    assert!(doc.verify());
}
