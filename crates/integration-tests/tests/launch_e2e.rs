//! Kernel provisioning and launch end to end

#![cfg(unix)]

use pixi_kernel_core::application::{KernelProvisioner, LaunchDecision, ProvisionRequest};
use pixi_kernel_core::domain::{EnvMap, KernelSpec};
use pixi_kernel_infra_system::{launch, LaunchMode};
use pixi_kernel_integration_tests::{base_env, project_info, FakePixi};
use serde_json::json;
use std::path::Path;

fn python_spec() -> KernelSpec {
    KernelSpec::from_json(
        &json!({
            "argv": ["pixi", "run", "sh", "-c", "exit 7"],
            "display_name": "Python (Pixi)",
            "language": "python",
            "metadata": {"pixi-kernel": {"required-package": "ipykernel"}}
        })
        .to_string(),
    )
    .unwrap()
}

fn notebook(dir: &Path, environment: &str) -> String {
    let path = dir.join("analysis.ipynb");
    let content = json!({
        "cells": [],
        "metadata": {"pixi-kernel": {"environment": environment}},
        "nbformat": 4,
        "nbformat_minor": 5
    });
    std::fs::write(&path, content.to_string()).unwrap();
    path.display().to_string()
}

fn request(spec: KernelSpec, cwd: &Path, env: EnvMap) -> ProvisionRequest {
    ProvisionRequest {
        spec,
        argv: Vec::new(),
        cwd: cwd.to_path_buf(),
        env,
    }
}

#[tokio::test]
async fn test_kernel_runs_in_notebook_environment() {
    let project = tempfile::tempdir().unwrap();
    let pixi = FakePixi::new().unwrap().with_info(&project_info(
        project.path(),
        &[("default", &["ipykernel"]), ("cuda", &["ipykernel"])],
    ));
    let provisioner = KernelProvisioner::new(pixi.client().unwrap());

    let mut env = base_env();
    env.insert(
        "JPY_SESSION_NAME".to_string(),
        notebook(project.path(), "cuda"),
    );

    let plan = match provisioner
        .prepare(request(python_spec(), project.path(), env))
        .await
    {
        LaunchDecision::Kernel(plan) => plan,
        LaunchDecision::Fallback { message } => panic!("unexpected fallback: {message}"),
    };

    assert_eq!(plan.program, pixi.path().display().to_string());
    assert_eq!(plan.args[..3], ["run", "--environment", "cuda"]);
    assert!(pixi
        .calls()
        .contains(&"install --environment cuda".to_string()));

    let code = launch(&plan, LaunchMode::Managed).await.unwrap();
    assert_eq!(code, 7);
    assert!(pixi
        .calls()
        .contains(&"run --environment cuda sh -c exit 7".to_string()));
}

#[tokio::test]
async fn test_missing_package_serves_fallback() {
    let project = tempfile::tempdir().unwrap();
    let pixi = FakePixi::new()
        .unwrap()
        .with_info(&project_info(project.path(), &[("default", &["python"])]))
        .with_list(&json!([{"name": "python"}]));
    let provisioner = KernelProvisioner::new(pixi.client().unwrap());

    let decision = provisioner
        .prepare(request(python_spec(), project.path(), base_env()))
        .await;

    match decision {
        LaunchDecision::Fallback { message } => {
            assert!(message.contains("Python (Pixi)"), "{message}");
            assert!(message.contains("pixi add ipykernel"), "{message}");
        }
        LaunchDecision::Kernel(plan) => panic!("unexpected launch: {plan:?}"),
    }
}

#[tokio::test]
async fn test_spec_without_metadata_never_calls_pixi() {
    let project = tempfile::tempdir().unwrap();
    let pixi = FakePixi::new().unwrap();
    let provisioner = KernelProvisioner::new(pixi.client().unwrap());
    let spec = KernelSpec::from_json(
        r#"{"argv": ["pixi", "run", "python"], "display_name": "Bare"}"#,
    )
    .unwrap();

    let decision = provisioner
        .prepare(request(spec, project.path(), base_env()))
        .await;

    assert_eq!(
        decision,
        LaunchDecision::Fallback {
            message: "Kernel Bare uses pixi-kernel but does not have any Pixi kernel metadata."
                .to_string()
        }
    );
    assert!(pixi.calls().is_empty());
}

#[tokio::test]
async fn test_shell_marker_never_reaches_guest_pixi() {
    // Launched from inside `pixi shell`: the marker is inherited by this process
    std::env::set_var("PIXI_IN_SHELL", "1");

    let project = tempfile::tempdir().unwrap();
    let pixi = FakePixi::new()
        .unwrap()
        .with_info(&project_info(project.path(), &[("default", &["ipykernel"])]));
    let provisioner = KernelProvisioner::new(pixi.client().unwrap());

    let mut env = base_env();
    env.insert("PIXI_IN_SHELL".to_string(), "1".to_string());

    let plan = match provisioner
        .prepare(request(python_spec(), project.path(), env))
        .await
    {
        LaunchDecision::Kernel(plan) => plan,
        LaunchDecision::Fallback { message } => panic!("unexpected fallback: {message}"),
    };
    assert!(plan.remove_env.contains(&"PIXI_IN_SHELL".to_string()));

    // The fake exits 3 when it sees the marker
    let code = launch(&plan, LaunchMode::Managed).await.unwrap();
    assert_eq!(code, 7);
}
