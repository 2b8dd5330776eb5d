/*
 * integration_tests.rs
 * Copyright (c) 2025 the pommel authors
 *
 * Integration tests for pommel using on-disk template fixtures.
 */

use std::path::Path;

use pommel::{DiskFileSystem, Engine, Value};
use pretty_assertions::assert_eq;

/// Engine with disk lookup rooted at the test fixtures directory.
fn fixture_engine() -> Engine {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let root = Path::new(manifest_dir).join("test-fixtures");
    Engine::new().with_file_system(DiskFileSystem::new(root))
}

fn data(json: serde_json::Value) -> Value {
    Value::from(json)
}

#[test]
fn simple_interpolation() {
    let engine = fixture_engine();
    let view = engine.compile_view("simple").expect("view should resolve");
    let result = view
        .render(&data(serde_json::json!({ "name": "World" })))
        .unwrap();
    assert_eq!(result, "Hello, World!");
}

#[test]
fn missing_variable_renders_empty() {
    let engine = fixture_engine();
    let view = engine.compile_view("simple").expect("view should resolve");
    let result = view.render(&data(serde_json::json!({}))).unwrap();
    assert_eq!(result, "Hello, !");
}

#[test]
fn conditional_true() {
    let engine = fixture_engine();
    let view = engine.compile_view("conditional").unwrap();
    let result = view
        .render(&data(
            serde_json::json!({ "show_greeting": true, "name": "Alice" }),
        ))
        .unwrap();
    assert_eq!(result, "Hello, Alice!");
}

#[test]
fn conditional_false() {
    let engine = fixture_engine();
    let view = engine.compile_view("conditional").unwrap();
    let result = view
        .render(&data(
            serde_json::json!({ "show_greeting": false, "name": "Alice" }),
        ))
        .unwrap();
    assert_eq!(result, "Goodbye.");
}

#[test]
fn forloop_with_separator() {
    let engine = fixture_engine();
    let view = engine.compile_view("forloop").unwrap();
    let result = view
        .render(&data(
            serde_json::json!({ "items": ["apple", "banana", "cherry"] }),
        ))
        .unwrap();
    assert_eq!(result, "Items: apple, banana, cherry");
}

#[test]
fn forloop_empty() {
    let engine = fixture_engine();
    let view = engine.compile_view("forloop").unwrap();
    let result = view
        .render(&data(serde_json::json!({ "items": [] })))
        .unwrap();
    assert_eq!(result, "Items: ");
}

#[test]
fn partials_resolve_from_the_template_directory() {
    let engine = fixture_engine();
    let view = engine.compile_view("with-partial").unwrap();
    let result = view
        .render(&data(serde_json::json!({ "name": "Test" })))
        .unwrap();
    assert_eq!(result, "Header\nHello, Test!\nFooter\n");
}

#[test]
fn blog_index_composes_with_its_layout() {
    let engine = fixture_engine();
    let view = engine.compile_view("blog/index").unwrap();
    let output = view
        .render(&data(serde_json::json!({
            "blog": {
                "url": "http://someblog.com",
                "title": "This is the blog title"
            },
            "posts": [
                {
                    "title": "My Post Title",
                    "url": "/my-post",
                    "post_class": "somepostclass"
                }
            ]
        })))
        .unwrap();

    assert!(output.contains("<title>This is the blog title</title>"));
    assert!(
        output
            .contains("<h2 class=\"post-title\"><a href=\"/my-post\">My Post Title</a></h2>"),
        "post markup missing from:\n{output}"
    );
}

#[test]
fn blog_post_composes_with_its_layout() {
    let engine = fixture_engine();
    let view = engine.compile_view("blog/post").unwrap();
    let output = view
        .render(&data(serde_json::json!({
            "blog": { "title": "This is the blog title" },
            "post": { "title": "My Post Title", "post_class": "somepostclass" }
        })))
        .unwrap();

    assert!(output.contains("<h1 class=\"post-title\">My Post Title</h1>"));
    assert!(output.contains("<article class=\"somepostclass\">"));
}

#[test]
fn compiled_views_are_cached_by_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("page.hbs");
    std::fs::write(&path, "first {{n}}").unwrap();

    let engine = Engine::new().with_file_system(DiskFileSystem::new(dir.path()));
    let first = engine.compile_view("page").unwrap();
    assert_eq!(
        first.render(&data(serde_json::json!({ "n": 1 }))).unwrap(),
        "first 1"
    );

    // Rewriting the file must not affect an engine that already compiled
    // it: the store serves the cached template.
    std::fs::write(&path, "second {{n}}").unwrap();
    let second = engine.compile_view("page").unwrap();
    assert_eq!(
        second.render(&data(serde_json::json!({ "n": 2 }))).unwrap(),
        "first 2"
    );
}
