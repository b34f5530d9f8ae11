//! End-to-end tests of the package manager over an in-memory registry

use mlpkg::{
    ErrorKind, LocalStore, MemoryRegistry, PackageManager, ResourceId, ResourceKind, Version,
};
use std::fs;
use tempfile::TempDir;

type Manager = PackageManager<MemoryRegistry, Vec<u8>>;

const NONE: [&str; 0] = [];

fn manager(temp: &TempDir) -> Manager {
    let store = LocalStore::init(temp.path()).unwrap();
    PackageManager::with_output(store, MemoryRegistry::new(), Vec::new())
}

fn write_workspace_file(temp: &TempDir, kind: ResourceKind, name: &str, contents: &[u8]) {
    fs::write(temp.path().join(kind.as_str()).join(name), contents).unwrap();
}

fn output(pm: Manager) -> String {
    String::from_utf8(pm.into_output()).unwrap()
}

/// Publish dataset.json@1.0.0 and model1.pmml@1.0.0 depending on it, then
/// clear the workspace copies
fn publish_model_and_dataset(temp: &TempDir, pm: &mut Manager) {
    write_workspace_file(temp, ResourceKind::Data, "dataset.json", b"[1, 2, 3]");
    write_workspace_file(temp, ResourceKind::Model, "model1.pmml", b"<PMML/>");

    assert_eq!(
        pm.publish_resource(ResourceKind::Data, "dataset.json", "1.0.0", &NONE, &NONE, &NONE),
        Ok(())
    );
    assert_eq!(
        pm.publish_resource(
            ResourceKind::Model,
            "model1.pmml",
            "1.0.0",
            &NONE,
            &["dataset.json@1.0.0"],
            &NONE,
        ),
        Ok(())
    );

    fs::remove_file(temp.path().join("data/dataset.json")).unwrap();
    fs::remove_file(temp.path().join("model/model1.pmml")).unwrap();
}

#[test]
fn test_publish_then_add_installs_dependency_first() {
    let temp = TempDir::new().unwrap();
    let mut pm = manager(&temp);
    publish_model_and_dataset(&temp, &mut pm);

    let installed = pm
        .add(ResourceKind::Model, "model1.pmml", Some("1.0.0"))
        .unwrap();

    let names: Vec<&str> = installed.iter().map(|id| id.name.as_str()).collect();
    assert_eq!(names, vec!["dataset.json", "model1.pmml"]);
    assert_eq!(
        fs::read(temp.path().join("data/dataset.json")).unwrap(),
        b"[1, 2, 3]"
    );
    assert_eq!(
        fs::read(temp.path().join("model/model1.pmml")).unwrap(),
        b"<PMML/>"
    );
}

#[test]
fn test_list_dependencies_output() {
    let temp = TempDir::new().unwrap();
    let mut pm = manager(&temp);
    publish_model_and_dataset(&temp, &mut pm);

    assert_eq!(
        pm.list_dependencies(ResourceKind::Model, "model1.pmml", Some("1.0.0")),
        Ok(())
    );
    assert_eq!(output(pm), "dataset.json@1.0.0\n");
}

#[test]
fn test_list_resources_output() {
    let temp = TempDir::new().unwrap();
    let mut pm = manager(&temp);
    publish_model_and_dataset(&temp, &mut pm);

    pm.add_package(ResourceKind::Model, "model1.pmml", None).unwrap();
    assert_eq!(pm.list_resources(None), Ok(()));
    assert_eq!(pm.list_resources(Some(ResourceKind::Model)), Ok(()));

    assert_eq!(
        output(pm),
        "data dataset.json@1.0.0\nmodel model1.pmml@1.0.0\nmodel model1.pmml@1.0.0\n"
    );
}

#[test]
fn test_list_available_output() {
    let temp = TempDir::new().unwrap();
    let mut pm = manager(&temp);
    publish_model_and_dataset(&temp, &mut pm);

    assert_eq!(pm.list_available_resources(Some(ResourceKind::Data)), Ok(()));
    assert_eq!(output(pm), "data dataset.json@1.0.0\n");
}

#[test]
fn test_publish_is_write_once() {
    let temp = TempDir::new().unwrap();
    let mut pm = manager(&temp);
    write_workspace_file(&temp, ResourceKind::Data, "dataset.json", b"v1");

    assert_eq!(
        pm.publish_resource(ResourceKind::Data, "dataset.json", "1.0.0", &NONE, &NONE, &NONE),
        Ok(())
    );
    assert_eq!(
        pm.publish_resource(ResourceKind::Data, "dataset.json", "1.0.0", &NONE, &NONE, &NONE),
        Err(ErrorKind::VersionConflict)
    );

    write_workspace_file(&temp, ResourceKind::Data, "dataset.json", b"v2");
    assert_eq!(
        pm.publish_resource(ResourceKind::Data, "dataset.json", "1.0.1", &NONE, &NONE, &NONE),
        Ok(())
    );
}

#[test]
fn test_publish_with_bad_dependency_spec() {
    let temp = TempDir::new().unwrap();
    let mut pm = manager(&temp);
    write_workspace_file(&temp, ResourceKind::Model, "m.pmml", b"m");

    assert_eq!(
        pm.publish_resource(ResourceKind::Model, "m.pmml", "1.0.0", &NONE, &["dataset.json"], &NONE),
        Err(ErrorKind::InvalidInput)
    );
    assert_eq!(
        pm.publish_resource(ResourceKind::Model, "m.pmml", "1.0.0", &NONE, &["d.csv@1.0"], &NONE),
        Err(ErrorKind::InvalidVersion)
    );
    assert!(pm.available(None).unwrap().is_empty());
}

#[test]
fn test_add_then_remove_round_trip() {
    let temp = TempDir::new().unwrap();
    let mut pm = manager(&temp);
    write_workspace_file(&temp, ResourceKind::Code, "train.py", b"print('train')");
    pm.publish_resource(ResourceKind::Code, "train.py", "0.1.0", &NONE, &NONE, &NONE)
        .unwrap();
    fs::remove_file(temp.path().join("code/train.py")).unwrap();

    let before = pm.resources(None).unwrap();
    pm.add_package(ResourceKind::Code, "train.py", Some("0.1.0")).unwrap();
    assert_eq!(pm.resources(None).unwrap().len(), 1);

    assert_eq!(pm.remove_package(ResourceKind::Code, "train.py"), Ok(()));
    assert_eq!(pm.resources(None).unwrap(), before);
    assert!(!temp.path().join("code/train.py").exists());
}

#[test]
fn test_add_does_not_overwrite_working_copy() {
    let temp = TempDir::new().unwrap();
    let mut pm = manager(&temp);
    write_workspace_file(&temp, ResourceKind::Code, "train.py", b"print('train')");
    pm.publish_resource(ResourceKind::Code, "train.py", "0.1.0", &NONE, &NONE, &NONE)
        .unwrap();
    write_workspace_file(&temp, ResourceKind::Code, "train.py", b"my unpublished edits");

    assert_eq!(
        pm.add_package(ResourceKind::Code, "train.py", Some("0.1.0")),
        Err(ErrorKind::Io)
    );
    assert_eq!(
        pm.remove_package(ResourceKind::Code, "train.py"),
        Err(ErrorKind::NotInstalled)
    );
    assert_eq!(
        fs::read(temp.path().join("code/train.py")).unwrap(),
        b"my unpublished edits"
    );
}

#[test]
fn test_remove_leaves_dependencies() {
    let temp = TempDir::new().unwrap();
    let mut pm = manager(&temp);
    publish_model_and_dataset(&temp, &mut pm);
    pm.add_package(ResourceKind::Model, "model1.pmml", None).unwrap();

    pm.remove_package(ResourceKind::Model, "model1.pmml").unwrap();

    let remaining: Vec<String> = pm
        .resources(None)
        .unwrap()
        .iter()
        .map(ResourceId::to_string)
        .collect();
    assert_eq!(remaining, vec!["data dataset.json@1.0.0"]);
}

#[test]
fn test_add_without_version_picks_highest() {
    let temp = TempDir::new().unwrap();
    let mut pm = manager(&temp);

    for version in ["1.2.0", "1.10.0", "1.9.0"] {
        write_workspace_file(&temp, ResourceKind::Model, "m.onnx", version.as_bytes());
        pm.publish_resource(ResourceKind::Model, "m.onnx", version, &NONE, &NONE, &NONE)
            .unwrap();
    }
    fs::remove_file(temp.path().join("model/m.onnx")).unwrap();

    pm.add_package(ResourceKind::Model, "m.onnx", None).unwrap();

    let installed = pm.store().get(ResourceKind::Model, "m.onnx").unwrap().unwrap();
    assert_eq!(installed.version, Version::new(1, 10, 0));
    assert_eq!(
        pm.store().read_artifact(ResourceKind::Model, "m.onnx").unwrap(),
        b"1.10.0"
    );
}

#[test]
fn test_add_unknown_resource() {
    let temp = TempDir::new().unwrap();
    let mut pm = manager(&temp);

    assert_eq!(
        pm.add_package(ResourceKind::Data, "nothing.csv", None),
        Err(ErrorKind::NotFound)
    );
    assert_eq!(
        pm.add_package(ResourceKind::Data, "nothing.csv", Some("1.0.0")),
        Err(ErrorKind::NotFound)
    );
}

#[test]
fn test_registry_down() {
    let temp = TempDir::new().unwrap();
    let mut pm = manager(&temp);
    publish_model_and_dataset(&temp, &mut pm);
    pm.registry().set_offline(true);

    assert_eq!(
        pm.add_package(ResourceKind::Model, "model1.pmml", Some("1.0.0")),
        Err(ErrorKind::RegistryUnavailable)
    );
    assert_eq!(
        pm.list_available_resources(None),
        Err(ErrorKind::RegistryUnavailable)
    );
    assert!(pm.resources(None).unwrap().is_empty());
}

#[test]
fn test_dependencies_of_installed_resource_work_offline() {
    let temp = TempDir::new().unwrap();
    let mut pm = manager(&temp);
    publish_model_and_dataset(&temp, &mut pm);
    pm.add_package(ResourceKind::Model, "model1.pmml", None).unwrap();
    pm.registry().set_offline(true);

    assert_eq!(
        pm.list_dependencies(ResourceKind::Model, "model1.pmml", None),
        Ok(())
    );
    assert_eq!(output(pm), "dataset.json@1.0.0\n");
}
