use super::registry::BackendRegistry;
use crate::backend::{GpuInfo, ResourcePool};
use crate::error::DeclFlowError;
use crate::model::{ResourceRequirements, Task};
use crate::test_support::MockBackend;
use std::sync::Arc;

fn gpu_pool(available: bool) -> ResourcePool {
    ResourcePool {
        gpus: vec![GpuInfo {
            name: "A5000".to_string(),
            vram: 24_000,
            available,
        }],
        ..Default::default()
    }
}

#[test]
fn test_register_get_unregister() {
    let registry = BackendRegistry::new();
    registry.register(Arc::new(MockBackend::new("alpha")));
    registry.register(Arc::new(MockBackend::new("beta")));

    assert!(registry.get("alpha").is_some());
    assert_eq!(registry.all().len(), 2);

    assert!(registry.unregister("alpha"));
    assert!(!registry.unregister("alpha"));
    assert!(registry.get("alpha").is_none());

    registry.clear();
    assert!(registry.all().is_empty());
}

#[test]
fn test_reregister_replaces_in_place() {
    let registry = BackendRegistry::new();
    registry.register(Arc::new(MockBackend::new("alpha")));
    registry.register(Arc::new(MockBackend::new("beta")));
    registry.register(Arc::new(MockBackend::new("alpha").unhealthy()));

    // Still two entries, and "alpha" keeps its slot at the front.
    let all = registry.all();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].name(), "alpha");
}

#[tokio::test]
async fn test_select_named_backend() {
    let registry = BackendRegistry::new();
    registry.register(Arc::new(MockBackend::new("gpu-1")));

    let mut task = Task::new("render");
    task.backend = Some("gpu-1".to_string());

    let selected = registry.select(&task).await.expect("selection succeeds");
    assert_eq!(selected.name(), "gpu-1");
}

#[tokio::test]
async fn test_select_named_not_registered() {
    let registry = BackendRegistry::new();

    let mut task = Task::new("render");
    task.backend = Some("missing".to_string());

    let err = registry.select(&task).await.expect_err("must fail");
    assert!(matches!(err, DeclFlowError::BackendNotRegistered(_)));
    assert_eq!(err.to_string(), "Backend \"missing\" not registered");
}

#[tokio::test]
async fn test_select_named_unhealthy() {
    let registry = BackendRegistry::new();
    registry.register(Arc::new(MockBackend::new("sick").unhealthy()));

    let mut task = Task::new("render");
    task.backend = Some("sick".to_string());

    let err = registry.select(&task).await.expect_err("must fail");
    assert_eq!(err.to_string(), "Backend \"sick\" is not healthy");
}

#[tokio::test]
async fn test_select_auto_first_healthy_in_insertion_order() {
    let registry = BackendRegistry::new();
    registry.register(Arc::new(MockBackend::new("down").unhealthy()));
    registry.register(Arc::new(MockBackend::new("first-up")));
    registry.register(Arc::new(MockBackend::new("second-up")));

    let selected = registry
        .select(&Task::new("render"))
        .await
        .expect("selection succeeds");
    assert_eq!(selected.name(), "first-up");
}

#[tokio::test]
async fn test_select_auto_throwing_health_check_is_skipped() {
    let registry = BackendRegistry::new();
    registry.register(Arc::new(MockBackend::new("explodes").health_check_fails()));
    registry.register(Arc::new(MockBackend::new("fine")));

    let selected = registry
        .select(&Task::new("render"))
        .await
        .expect("selection succeeds");
    assert_eq!(selected.name(), "fine");
}

#[tokio::test]
async fn test_select_auto_none_healthy() {
    let registry = BackendRegistry::new();
    registry.register(Arc::new(MockBackend::new("down").unhealthy()));

    let err = registry
        .select(&Task::new("render"))
        .await
        .expect_err("must fail");
    assert_eq!(err.to_string(), "No healthy backend available");
}

#[tokio::test]
async fn test_select_auto_prefers_available_gpu() {
    let registry = BackendRegistry::new();
    registry.register(Arc::new(
        MockBackend::new("cpu-only"), // healthy, first in order, no GPU
    ));
    registry.register(Arc::new(
        MockBackend::new("gpu-busy").with_resources(gpu_pool(false)),
    ));
    registry.register(Arc::new(
        MockBackend::new("gpu-free").with_resources(gpu_pool(true)),
    ));

    let mut task = Task::new("render");
    task.resources = Some(ResourceRequirements {
        gpu: Some("A5000".to_string()),
        ..Default::default()
    });

    let selected = registry.select(&task).await.expect("selection succeeds");
    assert_eq!(selected.name(), "gpu-free");

    // Without a GPU requirement, insertion order wins.
    let selected = registry
        .select(&Task::new("render"))
        .await
        .expect("selection succeeds");
    assert_eq!(selected.name(), "cpu-only");
}

#[tokio::test]
async fn test_select_auto_gpu_requirement_falls_back_to_first_healthy() {
    let registry = BackendRegistry::new();
    registry.register(Arc::new(MockBackend::new("cpu-a")));
    registry.register(Arc::new(MockBackend::new("cpu-b")));

    let mut task = Task::new("render");
    task.resources = Some(ResourceRequirements {
        gpu: Some("A5000".to_string()),
        ..Default::default()
    });

    let selected = registry.select(&task).await.expect("selection succeeds");
    assert_eq!(selected.name(), "cpu-a");
}
