//! Drives smart-format commands end to end against a temporary data directory.

use std::path::Path;

use clap::Parser;
use serde_json::{json, Value};
use smartformat_cli::{run, CliArgs};

async fn smart_format(data_dir: &Path, args: &[&str]) -> anyhow::Result<String> {
    let mut argv = vec!["smart-format", "--data-dir", data_dir.to_str().expect("utf-8 path")];
    argv.extend_from_slice(args);
    run(CliArgs::parse_from(argv)).await
}

fn write_json(dir: &Path, name: &str, value: &Value) -> String {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string(value).expect("json")).expect("write");
    path.to_string_lossy().into_owned()
}

fn elements() -> Value {
    json!([
        {
            "id": "title", "type": "text", "role": "heading",
            "x": 100, "y": 100, "width": 600, "height": 120, "fontSize": 48
        },
        {
            "id": "photo", "type": "image", "role": "decoration",
            "x": 100, "y": 300, "width": 880, "height": 500
        }
    ])
}

#[tokio::test]
async fn test_formats_lists_catalogue() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = smart_format(dir.path(), &["formats"]).await.expect("formats");
    assert!(out.contains("instagram:story"));
    assert!(out.contains("youtube:thumbnail"));
}

#[tokio::test]
async fn test_transform_with_validation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_json(dir.path(), "layout.json", &elements());

    let out = smart_format(
        dir.path(),
        &[
            "transform",
            "--input",
            input.as_str(),
            "--from",
            "instagram:post",
            "--to",
            "instagram:story",
            "--validate",
        ],
    )
    .await
    .expect("transform");

    let value: Value = serde_json::from_str(&out).expect("json output");
    let transformed = value["elements"].as_array().expect("elements");
    assert_eq!(transformed.len(), 2);
    for element in transformed {
        let y = element["y"].as_f64().expect("y");
        let height = element["height"].as_f64().expect("height");
        assert!(y + height <= 1920.0 + 0.01);
    }
    assert!(value["validation"]["isValid"].is_boolean());
}

#[tokio::test]
async fn test_offloaded_transform_matches_inline() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_json(dir.path(), "layout.json", &elements());
    let base = [
        "transform",
        "--input",
        input.as_str(),
        "--from",
        "instagram:post",
        "--to",
        "1280x720",
    ];

    let inline = smart_format(dir.path(), &base).await.expect("inline");
    let mut offloaded_args = base.to_vec();
    offloaded_args.push("--offload");
    let offloaded = smart_format(dir.path(), &offloaded_args).await.expect("offload");
    assert_eq!(inline, offloaded);
}

#[tokio::test]
async fn test_project_override_lifecycle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let record = json!({
        "id": "launch",
        "name": "Launch",
        "masterFormat": "instagram:post",
        "masterLayout": elements(),
    });
    let record_path = write_json(dir.path(), "project.json", &record);

    let imported = smart_format(dir.path(), &["import", "--input", record_path.as_str()])
        .await
        .expect("import");
    let imported: Value = serde_json::from_str(&imported).expect("json");
    let id = imported["id"].as_str().expect("id").to_string();

    let mut story = elements();
    story[0]["y"] = json!(640);
    let story_path = write_json(dir.path(), "story.json", &story);
    smart_format(
        dir.path(),
        &[
            "override",
            "set",
            "--project",
            id.as_str(),
            "--format",
            "instagram:story",
            "--input",
            story_path.as_str(),
        ],
    )
    .await
    .expect("override set");

    let resolved = smart_format(
        dir.path(),
        &["resolve", "--project", id.as_str(), "--format", "instagram:story"],
    )
    .await
    .expect("resolve");
    let resolved: Value = serde_json::from_str(&resolved).expect("json");
    assert_eq!(resolved["elements"][0]["y"].as_f64(), Some(640.0));

    let listed = smart_format(dir.path(), &["list"]).await.expect("list");
    assert!(listed.contains("instagram:story"));

    let reset = smart_format(
        dir.path(),
        &["override", "reset", "--project", id.as_str(), "--format", "instagram:story"],
    )
    .await
    .expect("reset");
    assert!(reset.contains("true"));

    let resolved = smart_format(
        dir.path(),
        &["resolve", "--project", id.as_str(), "--format", "instagram:story"],
    )
    .await
    .expect("resolve after reset");
    let resolved: Value = serde_json::from_str(&resolved).expect("json");
    assert_eq!(resolved["elements"][0]["y"].as_f64(), Some(100.0));
}

#[tokio::test]
async fn test_project_transform_uses_format_override() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut master = elements();
    master[0]["y"] = json!(900);
    master[0]["height"] = json!(100);
    let record = json!({
        "id": "promo",
        "name": "Promo",
        "masterFormat": "instagram:post",
        "masterLayout": master.clone(),
    });
    let record_path = write_json(dir.path(), "project.json", &record);
    smart_format(dir.path(), &["import", "--input", record_path.as_str()])
        .await
        .expect("import");

    let mut facebook = master;
    facebook[0]["y"] = json!(400);
    let facebook_path = write_json(dir.path(), "facebook.json", &facebook);
    smart_format(
        dir.path(),
        &[
            "override",
            "set",
            "--project",
            "promo",
            "--format",
            "facebook:post",
            "--input",
            facebook_path.as_str(),
        ],
    )
    .await
    .expect("override set");

    let out = smart_format(
        dir.path(),
        &["transform", "--project", "promo", "--to", "facebook:post"],
    )
    .await
    .expect("transform");
    let out: Value = serde_json::from_str(&out).expect("json");
    let title = &out[0];
    assert_eq!(title["id"].as_str(), Some("title"));
    assert_eq!(title["y"].as_f64(), Some(400.0));
    for element in out.as_array().expect("elements") {
        let y = element["y"].as_f64().expect("y");
        let height = element["height"].as_f64().expect("height");
        assert!(y + height <= 630.0 + 0.01, "{element}");
    }
}

#[tokio::test]
async fn test_unknown_project_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = smart_format(
        dir.path(),
        &["resolve", "--project", "missing", "--format", "instagram:story"],
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_advise_without_endpoint_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_json(dir.path(), "layout.json", &elements());
    std::env::remove_var("SMART_FORMAT_ADVISOR_URL");
    let result = smart_format(
        dir.path(),
        &[
            "transform",
            "--input",
            input.as_str(),
            "--from",
            "instagram:post",
            "--to",
            "instagram:story",
            "--advise",
        ],
    )
    .await;
    assert!(result.is_err());
}
