/*
 * view_tests.rs
 * Copyright (c) 2025 the pommel authors
 *
 * View resolution, partials, and layout composition over an in-memory
 * template set: a small blog theme with an index page, a post page, and a
 * shared layout.
 */

use pommel::{
    Engine, EngineConfig, MissingPolicy, MemoryFileSystem, TemplateError, Value,
};
use pretty_assertions::assert_eq;

const DEFAULT_LAYOUT: &str = "<!DOCTYPE html>\n<html>\n<head><title>{{blog.title}}</title></head>\n<body>\n{{{body}}}\n</body>\n</html>\n";

const INDEX_TEMPLATE: &str = "{{!< default}}\n<div class=\"posts\">\n{{#each posts}}\n<article class=\"{{post_class}}\">\n  <h2 class=\"post-title\"><a href=\"{{url}}\">{{title}}</a></h2>\n</article>\n{{/each}}\n</div>\n";

const POST_TEMPLATE: &str = "{{!< default}}\n<article class=\"{{post.post_class}}\">\n  <h1 class=\"post-title\">{{post.title}}</h1>\n</article>\n";

const POST_NO_LAYOUT_TEMPLATE: &str = "<article class=\"{{post.post_class}}\">\n  <h1 class=\"post-title\">{{post.title}}</h1>\n</article>\n";

fn register_theme_helpers(engine: &mut Engine) {
    for name in ["asset", "date", "tags", "encode", "url", "excerpt"] {
        engine.register_value_helper(name, move |out, input| {
            let joined = input
                .args()
                .iter()
                .map(Value::render)
                .collect::<Vec<_>>()
                .join("|");
            out.write(&format!("{}:{}", input.name(), joined))
        });
    }
}

fn blog_engine() -> Engine {
    let fs = MemoryFileSystem::with_files([
        ("default.hbs", DEFAULT_LAYOUT),
        ("index.hbs", INDEX_TEMPLATE),
        ("post.hbs", POST_TEMPLATE),
        ("post-no-layout.hbs", POST_NO_LAYOUT_TEMPLATE),
    ]);
    let mut engine = Engine::new().with_file_system(fs);
    register_theme_helpers(&mut engine);
    engine
}

fn index_data() -> Value {
    Value::from(serde_json::json!({
        "blog": {
            "url": "http://someblog.com",
            "title": "This is the blog title"
        },
        "posts": [
            {
                "title": "My Post Title",
                "image": "/someimage.png",
                "post_class": "somepostclass"
            }
        ]
    }))
}

#[test]
fn index_view_renders_post_titles_inside_the_layout() {
    let engine = blog_engine();
    let view = engine.compile_view("index").expect("view should resolve");
    let output = view.render(&index_data()).expect("view should render");

    assert!(output.contains("<title>This is the blog title</title>"));
    assert!(
        output.contains("<h2 class=\"post-title\"><a href=\"url:\">My Post Title</a></h2>"),
        "post title missing from:\n{output}"
    );
    assert!(output.contains("<article class=\"somepostclass\">"));
}

#[test]
fn post_view_renders_inside_the_layout() {
    let engine = blog_engine();
    let view = engine.compile_view("post").expect("view should resolve");
    let output = view
        .render(&Value::from(serde_json::json!({
            "blog": { "title": "This is the blog title" },
            "post": { "title": "My Post Title", "post_class": "somepostclass" }
        })))
        .expect("view should render");

    assert!(output.contains("<h1 class=\"post-title\">My Post Title</h1>"));
    assert!(output.contains("<html>"));
}

#[test]
fn view_without_layout_directive_gets_no_wrapper() {
    let engine = blog_engine();
    let view = engine
        .compile_view("post-no-layout")
        .expect("view should resolve");
    let output = view
        .render(&Value::from(serde_json::json!({
            "post": { "title": "My Post Title", "post_class": "somepostclass" }
        })))
        .expect("view should render");

    assert!(output.contains("<h1 class=\"post-title\">My Post Title</h1>"));
    assert!(!output.contains("<html>"));
}

#[test]
fn unknown_view_name_is_an_error() {
    let engine = blog_engine();
    let err = engine.compile_view("nonexistent").unwrap_err();
    match err {
        TemplateError::PartialNotFound { name } => assert_eq!(name, "nonexistent"),
        other => panic!("unexpected error: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Layout composition
// ---------------------------------------------------------------------------

#[test]
fn layout_composition_equals_manual_substitution() {
    let engine = blog_engine();
    let data = index_data();

    // Render the child body alone (no layout directive) and substitute it
    // into the layout by hand.
    let child_only = INDEX_TEMPLATE.replace("{{!< default}}\n", "");
    let body = engine
        .render_template(&child_only, &data)
        .expect("child should render");

    let mut layout_data = match data.clone() {
        Value::Map(m) => m,
        _ => unreachable!(),
    };
    layout_data.insert("body".to_owned(), Value::String(body));
    let expected = engine
        .render_template(DEFAULT_LAYOUT, &Value::Map(layout_data))
        .expect("layout should render");

    let composed = engine
        .compile_view("index")
        .unwrap()
        .render(&data)
        .expect("view should render");
    assert_eq!(composed, expected);
}

#[test]
fn recursive_layouts_compose_outward() {
    let fs = MemoryFileSystem::with_files([
        ("page.hbs", "{{!< section}}\ncontent"),
        ("section.hbs", "{{!< site}}\n<section>\n{{{body}}}\n</section>"),
        ("site.hbs", "<main>\n{{{body}}}\n</main>"),
    ]);
    let engine = Engine::new().with_file_system(fs);
    let output = engine
        .compile_view("page")
        .unwrap()
        .render(&Value::from(serde_json::json!({})))
        .unwrap();
    assert_eq!(output, "<main>\n<section>\ncontent\n</section>\n</main>");
}

#[test]
fn cyclic_layouts_are_detected() {
    let fs = MemoryFileSystem::with_files([
        ("a.hbs", "{{!< b}}\nA {{{body}}}"),
        ("b.hbs", "{{!< a}}\nB {{{body}}}"),
    ]);
    let engine = Engine::new().with_file_system(fs);
    let err = engine
        .compile_view("a")
        .unwrap()
        .render(&Value::from(serde_json::json!({})))
        .unwrap_err();
    assert!(matches!(err, TemplateError::LayoutCycle { .. }));
}

#[test]
fn layout_without_body_placeholder_is_invalid() {
    let fs = MemoryFileSystem::with_files([
        ("page.hbs", "{{!< bare}}\ncontent"),
        ("bare.hbs", "<main>no placeholder</main>"),
    ]);
    let engine = Engine::new().with_file_system(fs);
    let err = engine
        .compile_view("page")
        .unwrap()
        .render(&Value::from(serde_json::json!({})))
        .unwrap_err();
    match err {
        TemplateError::InvalidLayout { name } => assert_eq!(name, "bare"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn layout_with_two_body_placeholders_is_invalid() {
    let fs = MemoryFileSystem::with_files([
        ("page.hbs", "{{!< twice}}\ncontent"),
        ("twice.hbs", "{{{body}}}{{{body}}}"),
    ]);
    let engine = Engine::new().with_file_system(fs);
    assert!(matches!(
        engine
            .compile_view("page")
            .unwrap()
            .render(&Value::from(serde_json::json!({})))
            .unwrap_err(),
        TemplateError::InvalidLayout { .. }
    ));
}

#[test]
fn missing_layout_is_fatal() {
    let fs = MemoryFileSystem::with_files([("page.hbs", "{{!< absent}}\ncontent")]);
    let engine = Engine::new().with_file_system(fs);
    assert!(matches!(
        engine
            .compile_view("page")
            .unwrap()
            .render(&Value::from(serde_json::json!({})))
            .unwrap_err(),
        TemplateError::PartialNotFound { .. }
    ));
}

// ---------------------------------------------------------------------------
// Partials
// ---------------------------------------------------------------------------

#[test]
fn standalone_file_partial_keeps_line_structure() {
    let fs = MemoryFileSystem::with_files([
        ("page.hbs", "<header>\n{{> site-nav}}\n</header>\n"),
        ("site-nav.hbs", "<nav>{{blog.title}}</nav>\n"),
    ]);
    let engine = Engine::new().with_file_system(fs);
    let output = engine
        .compile_view("page")
        .unwrap()
        .render(&Value::from(serde_json::json!({ "blog": { "title": "B" } })))
        .unwrap();
    // The standalone tag's own line is trimmed; the partial's final newline
    // supplies the line break.
    assert_eq!(output, "<header>\n<nav>B</nav>\n</header>\n");
}

#[test]
fn partial_with_context_path_is_rerooted() {
    let fs = MemoryFileSystem::with_files([
        ("page.hbs", "{{#each posts}}{{> post-card this}}{{/each}}"),
        ("post-card.hbs", "[{{title}}]"),
    ]);
    let engine = Engine::new().with_file_system(fs);
    let output = engine
        .compile_view("page")
        .unwrap()
        .render(&Value::from(serde_json::json!({
            "posts": [{ "title": "a" }, { "title": "b" }]
        })))
        .unwrap();
    assert_eq!(output, "[a][b]");
}

#[test]
fn registered_partial_takes_precedence_over_files() {
    let fs = MemoryFileSystem::with_files([
        ("page.hbs", "{{> footer}}"),
        ("footer.hbs", "from file"),
    ]);
    let mut engine = Engine::new().with_file_system(fs);
    engine
        .register_partial("footer", "from registration")
        .unwrap();
    let output = engine
        .compile_view("page")
        .unwrap()
        .render(&Value::from(serde_json::json!({})))
        .unwrap();
    assert_eq!(output, "from registration");
}

#[test]
fn missing_partial_renders_empty_by_default() {
    let fs = MemoryFileSystem::with_files([("page.hbs", "a{{> absent}}b")]);
    let engine = Engine::new().with_file_system(fs);
    let output = engine
        .compile_view("page")
        .unwrap()
        .render(&Value::from(serde_json::json!({})))
        .unwrap();
    assert_eq!(output, "ab");
}

#[test]
fn missing_partial_can_be_configured_fatal() {
    let fs = MemoryFileSystem::with_files([("page.hbs", "a{{> absent}}b")]);
    let engine =
        Engine::with_config(EngineConfig::new().with_missing_partial(MissingPolicy::Error))
            .with_file_system(fs);
    assert!(matches!(
        engine
            .compile_view("page")
            .unwrap()
            .render(&Value::from(serde_json::json!({})))
            .unwrap_err(),
        TemplateError::PartialNotFound { .. }
    ));
}

#[test]
fn self_including_partial_hits_the_depth_ceiling() {
    let fs = MemoryFileSystem::with_files([("loop.hbs", "x{{> loop}}")]);
    let engine = Engine::new().with_file_system(fs);
    let err = engine
        .compile_view("loop")
        .unwrap()
        .render(&Value::from(serde_json::json!({})))
        .unwrap_err();
    assert!(matches!(err, TemplateError::RecursivePartial { .. }));
}

#[test]
fn partial_render_is_independent_of_caller_frames() {
    // `../` inside a partial cannot escape into the including template;
    // the partial's supplied context is its root.
    let fs = MemoryFileSystem::with_files([
        ("page.hbs", "{{#each posts}}{{> card this}}{{/each}}"),
        ("card.hbs", "{{../outer}}"),
    ]);
    let engine = Engine::new().with_file_system(fs);
    let err = engine
        .compile_view("page")
        .unwrap()
        .render(&Value::from(serde_json::json!({
            "outer": "secret",
            "posts": [{ "title": "a" }]
        })))
        .unwrap_err();
    assert!(matches!(err, TemplateError::ContextDepth { .. }));
}
