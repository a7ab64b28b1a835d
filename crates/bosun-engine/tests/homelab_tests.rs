//! Rendering tests against the homelab fixture project

use bosun_core::Variables;
use bosun_engine::{EngineError, Renderer, load_service_manifest};
use serde_json::json;
use std::path::PathBuf;

fn manifest_dir() -> PathBuf {
    PathBuf::from(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../fixtures/homelab/manifest"
    ))
}

fn renderer() -> Renderer {
    Renderer::new(manifest_dir().join("provisions"))
}

#[test]
fn test_render_webapp_service() {
    let manifest = load_service_manifest(&manifest_dir().join("services/myapp.yml")).unwrap();
    let output = renderer().render_service(&manifest).unwrap();

    let app = &output.compose["services"]["myapp"];
    assert_eq!(app["image"], "ghcr.io/example/myapp:latest");
    assert_eq!(app["container_name"], "myapp");
    assert_eq!(app["restart"], "unless-stopped");
    assert_eq!(app["networks"], json!(["default", "proxy"]));
    assert_eq!(app["labels"], json!(["traefik.enable=true"]));
    assert_eq!(app["environment"], json!(["APP_NAME=myapp"]));

    let db = &output.compose["services"]["myapp-db"];
    assert_eq!(db["image"], "postgres:17");
    assert_eq!(db["environment"]["POSTGRES_DB"], "myapp");
    assert_eq!(db["environment"]["POSTGRES_PASSWORD"], "secret");
    assert!(output.compose["volumes"].get("myapp_db_data").is_some());

    assert_eq!(
        output.routing["http"]["routers"]["myapp"]["rule"],
        "Host(`myapp.example.com`)"
    );
    assert_eq!(
        output.routing["http"]["services"]["myapp"]["loadBalancer"]["servers"][0]["url"],
        "http://myapp:8080"
    );

    assert_eq!(
        output.monitoring["endpoints"],
        json!([{
            "name": "myapp",
            "url": "https://myapp.example.com",
            "interval": "60s",
            "conditions": ["[STATUS] == 200"]
        }])
    );
}

#[test]
fn test_render_stack() {
    let dir = manifest_dir();
    let output = renderer()
        .render_stack(
            &dir.join("stacks/test-stack.yml"),
            &dir.join("services"),
            &Variables::new(),
        )
        .unwrap();

    let services = output.compose["services"].as_object().unwrap();
    let mut names: Vec<&str> = services.keys().map(String::as_str).collect();
    names.sort();
    assert_eq!(
        names,
        vec!["cache", "cache-redis", "legacy", "myapp", "myapp-db"]
    );

    assert_eq!(services["cache-redis"]["image"], "redis:7.2");
    assert_eq!(services["legacy"]["image"], "legacy/app:1.0");
    assert_eq!(
        output.compose["networks"],
        json!({"default": {"name": "homelab"}, "proxy": {"external": true}})
    );
    assert_eq!(output.monitoring["endpoints"].as_array().unwrap().len(), 1);
}

#[test]
fn test_render_stack_with_overlay() {
    let dir = manifest_dir();
    let mut overlay = Variables::new();
    overlay.insert("domain".into(), json!("staging.example.com"));

    let output = renderer()
        .render_stack(
            &dir.join("stacks/test-stack.yml"),
            &dir.join("services"),
            &overlay,
        )
        .unwrap();

    assert_eq!(
        output.routing["http"]["routers"]["myapp"]["rule"],
        "Host(`staging.example.com`)"
    );
}

#[test]
fn test_circular_provision_renders() {
    let manifest = bosun_core::ServiceManifest::from_yaml("name: loop\nprovisions: [circular]\n").unwrap();
    let output = renderer().render_service(&manifest).unwrap();
    assert_eq!(output.compose["services"]["loop"]["image"], "busybox");
}

#[test]
fn test_missing_config_reports_every_variable() {
    let manifest =
        bosun_core::ServiceManifest::from_yaml("name: bare\nprovisions: [webapp]\n").unwrap();
    let err = renderer().render_service(&manifest).unwrap_err();

    assert!(matches!(err, EngineError::Provision { .. }));
    assert_eq!(err.provision_chain(), vec!["webapp", "container"]);
    assert_eq!(err.missing_variables().unwrap(), ["image"]);
}

#[test]
fn test_provision_listing() {
    let names = renderer().loader().list().unwrap();
    assert_eq!(
        names,
        vec![
            "circular",
            "container",
            "monitoring",
            "postgres",
            "redis",
            "reverse-proxy",
            "webapp"
        ]
    );
}
