//! Integration tests for on-demand loading and reference rewriting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use devtree_store::{
    Artifact, Content, Namehash, ProduceResult, Producer, Replacer, Store, TreeNode,
};

/// Producer backed by a fixed set of sources; saves what it serves.
#[derive(Default)]
struct MapProducer {
    sources: HashMap<String, Content>,
    calls: AtomicUsize,
}

impl MapProducer {
    fn with(sources: &[(&str, Content)]) -> Self {
        Self {
            sources: sources
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Producer for MapProducer {
    async fn produce(
        &self,
        path: &str,
        _current: Option<TreeNode>,
        store: &Store,
    ) -> ProduceResult<Option<Content>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = devtree_store::path::normalize(path);
        let Some(data) = self.sources.get(&key) else {
            return Ok(None);
        };
        let saved = store.save(Artifact::new(key, data.clone()));
        Ok(Some(saved.data.clone()))
    }
}

/// Producer for `page.html` that loads its stylesheet first.
struct PageProducer;

#[async_trait]
impl Producer for PageProducer {
    async fn produce(
        &self,
        path: &str,
        _current: Option<TreeNode>,
        store: &Store,
    ) -> ProduceResult<Option<Content>> {
        match path {
            "page.html" => {
                store.load("style.css").await?;
                let saved = store.save(Artifact::new(
                    "page.html",
                    r#"<link href="style.css"><img src="missing.png">"#,
                ));
                Ok(Some(saved.data.clone()))
            }
            "style.css" => {
                let saved = store.save(Artifact::new("style.css", "body{}"));
                Ok(Some(saved.data.clone()))
            }
            _ => Ok(None),
        }
    }
}

struct FailingProducer;

#[async_trait]
impl Producer for FailingProducer {
    async fn produce(
        &self,
        path: &str,
        _current: Option<TreeNode>,
        _store: &Store,
    ) -> ProduceResult<Option<Content>> {
        anyhow::bail!("compile error in {}", path)
    }
}

fn html_css_namehash() -> Namehash {
    Namehash::builder()
        .entries([r"\.html$", r"\.css$"])
        .search_value(r#"\s(?:src|href)="([^"]*)""#)
        .search_value(r"url\(([^)]*)\)")
        .replacer(Replacer::template("[dir][name].[hash:8][ext]"))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_css_reference_rewritten_to_hashed_png() {
    let store = Store::default().with_namehash(html_css_namehash());
    store.save(Artifact::new("a.css", "a{background:url(b.png)}"));
    let png = store.save(Artifact::new("b.png", vec![1u8, 2, 3, 4]));

    let hash = png.hash.clone().unwrap();
    assert_eq!(png.output_path(), format!("b.{}.png", &hash[..8]));

    let css = store.load("a.css").await.unwrap().unwrap();
    assert_eq!(
        css.as_text().unwrap(),
        format!("a{{background:url(b.{}.png)}}", &hash[..8])
    );
}

#[tokio::test]
async fn test_rewrite_is_idempotent() {
    let store = Store::default().with_namehash(html_css_namehash());
    store.save(Artifact::new("a.css", "a{background:url(b.png)}"));
    store.save(Artifact::new("b.png", vec![9u8; 16]));

    let first = store.load("a.css").await.unwrap().unwrap();
    store.save(Artifact::new("a.css", first.clone()));
    let second = store.load("a.css").await.unwrap().unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_nested_directories_resolve_relative_references() {
    let store = Store::default().with_namehash(html_css_namehash());
    store.save(Artifact::new("css/site.css", "h1{background:url(../img/h.png)}"));
    let png = store.save(Artifact::new("img/h.png", vec![1u8]));

    let css = store.load("/css/site.css").await.unwrap().unwrap();
    assert_eq!(
        css.as_text().unwrap(),
        format!("h1{{background:url({})}}", png.output_path())
    );
}

#[tokio::test]
async fn test_non_entry_content_not_rewritten() {
    let store = Store::default().with_namehash(html_css_namehash());
    let js = store.save(Artifact::new("app.js", r#"x.src="b.png""#));
    store.save(Artifact::new("b.png", vec![1u8]));

    let content = store.load(js.output_path()).await.unwrap().unwrap();
    assert_eq!(content, Content::from(r#"x.src="b.png""#));
}

#[tokio::test]
async fn test_no_rewrite_without_replacer() {
    let store = Store::default().with_namehash(
        Namehash::builder()
            .entry(r"\.css$")
            .search_value(r"url\(([^)]*)\)")
            .build()
            .unwrap(),
    );
    store.save(Artifact::new("a.css", "url(b.png)"));
    store.save(Artifact::new("b.png", vec![1u8]));

    let css = store.load("a.css").await.unwrap().unwrap();
    assert_eq!(css, Content::from("url(b.png)"));
}

#[tokio::test]
async fn test_missing_path_is_none() {
    let store = Store::new(MapProducer::default());
    assert!(store.load("missing.js").await.unwrap().is_none());
}

#[tokio::test]
async fn test_producer_error_propagates() {
    let store = Store::new(FailingProducer);
    let err = store.load("app.ts").await.unwrap_err();
    assert_eq!(err.to_string(), "compile error in app.ts");
}

#[tokio::test]
async fn test_producer_runs_on_every_load() {
    let producer = Arc::new(MapProducer::with(&[("a.js", Content::from("a"))]));
    let store = Store::from_shared(producer.clone());

    store.load("a.js").await.unwrap();
    store.load("a.js").await.unwrap();

    assert_eq!(producer.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_producer_sees_current_raw_value() {
    struct Echo;

    #[async_trait]
    impl Producer for Echo {
        async fn produce(
            &self,
            _path: &str,
            current: Option<TreeNode>,
            _store: &Store,
        ) -> ProduceResult<Option<Content>> {
            let listing = match current {
                Some(TreeNode::Dir(children)) => children.keys().cloned().collect::<Vec<_>>().join(","),
                Some(TreeNode::File(content)) => return Ok(Some(content)),
                None => return Ok(None),
            };
            Ok(Some(Content::Text(listing)))
        }
    }

    let store = Store::new(Echo);
    store.save(Artifact::new("css/a.css", "a"));
    store.save(Artifact::new("css/b.css", "b"));

    assert_eq!(store.load("css").await.unwrap(), Some(Content::from("a.css,b.css")));
    assert_eq!(store.load("css/a.css").await.unwrap(), Some(Content::from("a")));
    assert_eq!(store.load("js").await.unwrap(), None);
}

#[tokio::test]
async fn test_dependency_saved_during_load_is_visible_to_rewrite() {
    let store = Store::new(PageProducer).with_namehash(
        Namehash::builder()
            .entry(r"\.html$")
            .search_value(r#"\s(?:src|href)="([^"]*)""#)
            .replacer(Replacer::template("[dir][name].[hash:8][ext]"))
            .build()
            .unwrap(),
    );

    let html = store.load("page.html").await.unwrap().unwrap();
    let css = store.get_by_origin("style.css").unwrap();

    assert_eq!(
        html.as_text().unwrap(),
        format!(
            r#"<link href="{}"><img src="missing.png">"#,
            css.output_path()
        )
    );
}

#[tokio::test]
async fn test_concurrent_loads_last_write_wins() {
    let producer = MapProducer::with(&[("a.js", Content::from("a"))]);
    let store = Arc::new(Store::new(producer));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.load("a.js").await.unwrap() })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap(), Some(Content::from("a")));
    }

    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_non_utf8_entry_returned_unchanged() {
    let store = Store::default().with_namehash(html_css_namehash());
    let bytes = vec![0xffu8, 0xfe, b'u', b'r', b'l'];
    store.save(Artifact::new("weird.css", bytes.clone()));

    let loaded = store.load("weird.css").await.unwrap().unwrap();
    assert_eq!(loaded, Content::Binary(bytes));
}
