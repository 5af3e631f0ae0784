//! Readiness verification end to end
//!
//! Real subprocess executor and system probe against a scripted fake `pixi`.

#![cfg(unix)]

use pixi_kernel_core::application::{EnvironmentCatalog, ReadinessRequest, ReadinessVerifier};
use pixi_kernel_core::ReadinessError;
use pixi_kernel_integration_tests::{base_env, project_info, FakePixi};
use serde_json::json;
use std::path::Path;

const KERNEL: &str = "Python (Pixi)";

fn request(cwd: &Path, environment: &str) -> ReadinessRequest {
    ReadinessRequest {
        environment_name: environment.to_string(),
        cwd: cwd.to_path_buf(),
        env: base_env(),
        required_package: "ipykernel".to_string(),
        kernel_name: KERNEL.to_string(),
    }
}

#[tokio::test]
async fn test_ready_environment_is_installed() {
    let project = tempfile::tempdir().unwrap();
    let pixi = FakePixi::new()
        .unwrap()
        .with_info(&project_info(project.path(), &[("default", &["python", "ipykernel"])]));
    let verifier = ReadinessVerifier::new(pixi.client().unwrap());

    let environment = verifier
        .verify(request(project.path(), "default"))
        .await
        .unwrap();

    assert_eq!(environment.name, "default");
    assert!(environment.prefix.ends_with(".pixi/envs/default"));
    let calls = pixi.calls();
    assert_eq!(calls.first().map(String::as_str), Some("--version"));
    assert!(calls.contains(&"info --json".to_string()));
    assert_eq!(
        calls.last().map(String::as_str),
        Some("install --environment default")
    );
    assert!(!calls.iter().any(|c| c.starts_with("list")));
}

#[tokio::test]
async fn test_missing_kernel_package() {
    let project = tempfile::tempdir().unwrap();
    let pixi = FakePixi::new()
        .unwrap()
        .with_info(&project_info(project.path(), &[("default", &["python"])]))
        .with_list(&json!([{"name": "python"}, {"name": "pip"}]));
    let verifier = ReadinessVerifier::new(pixi.client().unwrap());

    let err = verifier
        .verify(request(project.path(), "default"))
        .await
        .unwrap_err();

    match &err {
        ReadinessError::PackageNotFound {
            package, prefix, ..
        } => {
            assert_eq!(package, "ipykernel");
            assert!(prefix.ends_with(".pixi/envs/default"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("pixi add ipykernel"));
    assert!(!pixi.calls().iter().any(|c| c.starts_with("install")));
}

#[tokio::test]
async fn test_transitive_kernel_package() {
    let project = tempfile::tempdir().unwrap();
    let pixi = FakePixi::new()
        .unwrap()
        .with_info(&project_info(project.path(), &[("default", &["jupyterlab"])]))
        .with_list(&json!([{"name": "jupyterlab"}, {"name": "ipykernel"}]));
    let verifier = ReadinessVerifier::new(pixi.client().unwrap());

    let environment = verifier
        .verify(request(project.path(), "default"))
        .await
        .unwrap();

    assert_eq!(environment.name, "default");
    assert!(pixi
        .calls()
        .contains(&"list --json --environment default".to_string()));
}

#[tokio::test]
async fn test_no_manifest_relays_pixi_message() {
    let dir = tempfile::tempdir().unwrap();
    let message = "× could not find pixi.toml or pyproject.toml at directory /tmp/x\n";
    let pixi = FakePixi::new()
        .unwrap()
        .with_info(&json!({"environments_info": [], "project_info": null}))
        .with_project_error(message);
    let verifier = ReadinessVerifier::new(pixi.client().unwrap());

    let err = verifier
        .verify(request(dir.path(), "default"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ReadinessError::ProjectNotFound {
            message: message.to_string()
        }
    );
}

#[tokio::test]
async fn test_non_json_info_output() {
    let dir = tempfile::tempdir().unwrap();
    let pixi = FakePixi::new().unwrap().with_raw_info("not json at all");
    let verifier = ReadinessVerifier::new(pixi.client().unwrap());

    let err = verifier
        .verify(request(dir.path(), "default"))
        .await
        .unwrap_err();

    match err {
        ReadinessError::OutputMalformed { command, raw, .. } => {
            assert_eq!(command, "pixi info");
            assert!(raw.contains("not json at all"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_environment() {
    let project = tempfile::tempdir().unwrap();
    let pixi = FakePixi::new()
        .unwrap()
        .with_info(&project_info(project.path(), &[("default", &["ipykernel"])]));
    let verifier = ReadinessVerifier::new(pixi.client().unwrap());

    let err = verifier
        .verify(request(project.path(), "cuda"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Pixi environment cuda not found.");
}

#[tokio::test]
async fn test_install_failure_carries_stderr() {
    let project = tempfile::tempdir().unwrap();
    let pixi = FakePixi::new()
        .unwrap()
        .with_info(&project_info(project.path(), &[("default", &["ipykernel"])]))
        .with_install_error("failed to solve the environment");
    let verifier = ReadinessVerifier::new(pixi.client().unwrap());

    let err = verifier
        .verify(request(project.path(), "default"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ReadinessError::InstallFailed {
            environment: "default".to_string(),
            stderr: "failed to solve the environment".to_string(),
        }
    );
}

#[tokio::test]
async fn test_shell_marker_never_reaches_pixi() {
    let project = tempfile::tempdir().unwrap();
    let pixi = FakePixi::new()
        .unwrap()
        .with_info(&project_info(project.path(), &[("default", &["ipykernel"])]));
    let verifier = ReadinessVerifier::new(pixi.client().unwrap());

    let mut request = request(project.path(), "default");
    request
        .env
        .insert("PIXI_IN_SHELL".to_string(), "1".to_string());

    assert!(verifier.verify(request).await.is_ok());
}

#[tokio::test]
async fn test_version_is_checked_once_per_client() {
    let project = tempfile::tempdir().unwrap();
    let pixi = FakePixi::new()
        .unwrap()
        .with_info(&project_info(project.path(), &[("default", &["ipykernel"])]));
    let verifier = ReadinessVerifier::new(pixi.client().unwrap());

    verifier
        .verify(request(project.path(), "default"))
        .await
        .unwrap();
    verifier
        .verify(request(project.path(), "default"))
        .await
        .unwrap();

    let version_calls = pixi.calls().iter().filter(|c| *c == "--version").count();
    assert_eq!(version_calls, 1);
}

#[tokio::test]
async fn test_catalog_lists_project_environments() {
    let project = tempfile::tempdir().unwrap();
    let pixi = FakePixi::new().unwrap().with_info(&project_info(
        project.path(),
        &[("default", &["ipykernel"]), ("cuda", &["ipykernel"])],
    ));
    let catalog = EnvironmentCatalog::new(pixi.client().unwrap());

    let entries = catalog.list(project.path(), &base_env()).await;

    let names: Vec<(&str, bool)> = entries
        .iter()
        .map(|e| (e.name.as_str(), e.default))
        .collect();
    assert_eq!(names, vec![("default", true), ("cuda", false)]);
}
