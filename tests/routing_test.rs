// Routing integration tests
//
// Scan a real page tree on disk, then match URLs against the built table.

use rstest::rstest;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use kagami::page::{MapPageLoader, PageDefinition, PageLoader, PageMetadata, SidecarPageLoader, StaticPath};
use kagami::router::{ParamValue, Params, RouteError, RouteKind, RouteTableBuilder, Router, ScanMode};

fn write_page(root: &Path, relative: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, "<h1>page</h1>").unwrap();
}

fn site() -> TempDir {
    let dir = TempDir::new().unwrap();
    for page in [
        "index.html",
        "about.md",
        "blog/index.html",
        "blog/latest.html",
        "blog/[slug].html",
        "blog/[...rest].html",
        "docs/[...path].html",
        "[lang]/guide/[topic].html",
        "notes.txt",
    ] {
        write_page(dir.path(), page);
    }
    dir
}

fn empty_loader() -> Arc<dyn PageLoader> {
    Arc::new(MapPageLoader::new())
}

async fn router_for(dir: &TempDir) -> Router {
    let builder = RouteTableBuilder::new(dir.path(), empty_loader()).origin("https://example.com");
    Router::new(builder).await.unwrap()
}

#[tokio::test]
async fn test_scan_builds_expected_patterns() {
    let dir = site();
    let router = router_for(&dir).await;
    let table = router.table();

    let mut patterns: Vec<(&str, RouteKind)> = table
        .descriptors()
        .map(|route| (route.pathname.as_str(), route.kind))
        .collect();
    patterns.sort();

    assert_eq!(
        patterns,
        vec![
            ("/", RouteKind::Exact),
            ("/[lang]/guide/[topic]", RouteKind::Dynamic),
            ("/about", RouteKind::Exact),
            ("/blog", RouteKind::Exact),
            ("/blog/[...rest]", RouteKind::CatchAll),
            ("/blog/[slug]", RouteKind::Dynamic),
            ("/blog/latest", RouteKind::Exact),
            ("/docs/[...path]", RouteKind::CatchAll),
        ]
    );
    assert!(table.contains_key("https://example.com/blog/latest"));
}

#[rstest]
#[case("/", "/")]
#[case("/about", "/about")]
#[case("/about/", "/about")]
#[case("/blog", "/blog")]
#[case("/blog/latest", "/blog/latest")]
#[case("/blog/hello-world", "/blog/[slug]")]
#[case("/blog/2024/01/post", "/blog/[...rest]")]
#[case("/docs/getting-started/install", "/docs/[...path]")]
#[case("/en/guide/routing", "/[lang]/guide/[topic]")]
#[case("https://example.com/blog/latest?ref=home", "/blog/latest")]
#[tokio::test]
async fn test_match_precedence(#[case] url: &str, #[case] expected_pattern: &str) {
    // Test: exact beats dynamic, dynamic beats catch-all
    let dir = site();
    let router = router_for(&dir).await;

    let matched = router.match_url(url).unwrap_or_else(|| panic!("no match for {}", url));
    assert_eq!(matched.pathname, expected_pattern, "url {}", url);
}

#[tokio::test]
async fn test_dynamic_params_and_query_are_extracted() {
    let dir = site();
    let router = router_for(&dir).await;

    let matched = router.match_url("/en/guide/caching?draft=1&draft=2&q=a%20b").unwrap();
    assert_eq!(matched.kind, RouteKind::Dynamic);

    let params = matched.params.unwrap();
    assert_eq!(params.get("lang"), Some(&ParamValue::from("en")));
    assert_eq!(params.get("topic"), Some(&ParamValue::from("caching")));
    assert_eq!(matched.query.get("draft").map(String::as_str), Some("2"));
    assert_eq!(matched.query.get("q").map(String::as_str), Some("a b"));
}

#[tokio::test]
async fn test_catch_all_collects_remaining_segments() {
    let dir = site();
    let router = router_for(&dir).await;

    let matched = router.match_url("/docs/a/b/c/").unwrap();
    assert_eq!(matched.kind, RouteKind::CatchAll);
    assert_eq!(
        matched.params.unwrap().get("path"),
        Some(&ParamValue::from(vec!["a", "b", "c"]))
    );

    let bare = router.match_url("/docs").unwrap();
    assert_eq!(bare.params.unwrap().get("path"), Some(&ParamValue::Many(vec![])));
}

#[tokio::test]
async fn test_matched_file_path_points_at_page() {
    let dir = site();
    let router = router_for(&dir).await;

    let matched = router.match_url("/blog/hello").unwrap();
    assert_eq!(matched.file_path, dir.path().join("blog/[slug].html"));
}

#[tokio::test]
async fn test_non_page_files_are_ignored() {
    let dir = site();
    let router = router_for(&dir).await;
    assert!(router.match_url("/notes").is_none());
}

#[tokio::test]
async fn test_reload_picks_up_new_pages_and_notifies() {
    let dir = TempDir::new().unwrap();
    write_page(dir.path(), "index.html");
    let router = router_for(&dir).await;

    let reloads = Arc::new(AtomicUsize::new(0));
    let counter = reloads.clone();
    router.on_reload(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert!(router.match_url("/pricing").is_none());

    write_page(dir.path(), "pricing.html");
    router.reload().await.unwrap();

    assert!(router.match_url("/pricing").is_some());
    assert_eq!(reloads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_reload_keeps_previous_table() {
    let dir = TempDir::new().unwrap();
    write_page(dir.path(), "index.html");
    let pages = dir.path().to_path_buf();
    let builder = RouteTableBuilder::new(&pages, empty_loader());
    let router = Router::new(builder).await.unwrap();

    drop(dir);
    assert!(matches!(router.reload().await, Err(RouteError::InvalidPagesDir(_))));
    assert!(router.match_url("/").is_some());
}

#[tokio::test]
async fn test_build_mode_pre_resolves_static_paths() {
    let dir = TempDir::new().unwrap();
    write_page(dir.path(), "blog/[slug].html");
    let page = dir.path().join("blog/[slug].html");

    let paths = ["first", "second"]
        .iter()
        .map(|slug| {
            let mut params = Params::new();
            params.insert("slug".to_string(), ParamValue::from(*slug));
            StaticPath::new(params)
        })
        .collect();
    let loader = MapPageLoader::new().with(
        &page,
        PageDefinition::new(PageMetadata::default()).with_static_paths(paths),
    );

    let builder = RouteTableBuilder::new(dir.path(), Arc::new(loader)).mode(ScanMode::Build);
    let router = Router::new(builder).await.unwrap();

    assert_eq!(router.table().len(), 2);
    let matched = router.match_url("/blog/second").unwrap();
    assert_eq!(matched.params.unwrap().get("slug"), Some(&ParamValue::from("second")));
    // Only enumerated pages exist in build output
    assert!(router.match_url("/blog/third").is_none());
}

#[tokio::test]
async fn test_build_mode_rejects_dynamic_page_without_static_paths() {
    let dir = TempDir::new().unwrap();
    write_page(dir.path(), "blog/[slug].html");

    let builder = RouteTableBuilder::new(dir.path(), empty_loader()).mode(ScanMode::Build);
    let err = builder.build().await.unwrap_err();

    assert!(err.is_configuration_error());
    assert!(err.to_string().contains("[slug].html"));
}

#[tokio::test]
async fn test_sidecar_loader_supplies_static_paths() {
    let dir = TempDir::new().unwrap();
    write_page(dir.path(), "tags/[tag].html");
    std::fs::write(
        dir.path().join("tags/[tag].html.paths.json"),
        r#"[{ "params": { "tag": "rust" } }, { "params": { "tag": "web" } }]"#,
    )
    .unwrap();

    let builder = RouteTableBuilder::new(dir.path(), Arc::new(SidecarPageLoader::new())).mode(ScanMode::Build);
    let table = builder.build().await.unwrap();

    let mut pathnames: Vec<&str> = table.descriptors().map(|route| route.pathname.as_str()).collect();
    pathnames.sort();
    assert_eq!(pathnames, vec!["/tags/rust", "/tags/web"]);
}
