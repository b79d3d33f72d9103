#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use oxigraph::model::{NamedNodeRef, Term};
use shacl_validator::engine::vocab as sh;
use shacl_validator::rdf::{RdfGraph, RdfSyntax, decode};
use shacl_validator::state::AppState;
use shacl_validator::{ServerConfig, build_router};
use tempfile::{TempDir, tempdir};
use tower::ServiceExt;

pub const PERSON_SHAPES: &str = r#"
@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix ex: <http://example.org/> .

ex:PersonShape a sh:NodeShape ;
    sh:targetClass ex:Person ;
    sh:property [ sh:path ex:name ; sh:minCount 1 ] .
"#;

pub const AGE_SHAPES: &str = r#"
@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
@prefix ex: <http://example.org/> .

ex:AgeShape a sh:NodeShape ;
    sh:targetClass ex:Person ;
    sh:property [ sh:path ex:age ; sh:datatype xsd:integer ; sh:maxCount 1 ] .
"#;

/// Alice has no name and a non-integer age.
pub const NAMELESS_PERSON: &str = r#"
@prefix ex: <http://example.org/> .

ex:alice a ex:Person ; ex:age "thirty" .
"#;

pub const VALID_PERSON: &str = r#"
@prefix ex: <http://example.org/> .

ex:bob a ex:Person ; ex:name "Bob" ; ex:age 41 .
"#;

/// A resource root laid out the way the server expects, in a temp dir.
pub struct TestResources {
    _tempdir: TempDir,
    root: PathBuf,
}

impl TestResources {
    pub fn new() -> Self {
        let tempdir = tempdir().expect("tempdir");
        let root = tempdir.path().to_path_buf();
        Self {
            _tempdir: tempdir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `files` (relative path, contents) plus a `domain.yaml`.
    pub fn add_domain(&self, folder: &str, descriptor: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = self.root.join(folder);
        fs::create_dir_all(&dir).expect("domain dir");
        fs::write(dir.join("domain.yaml"), descriptor).expect("descriptor");
        for (name, contents) in files {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("parent dir");
            }
            fs::write(path, contents).expect("fixture file");
        }
        dir
    }

    /// The `any` domain: type `person` (a shape directory holding two
    /// files) and type `names` (a single file).
    pub fn with_person_domain(self) -> Self {
        self.add_domain(
            "any",
            "validation_types:\n  person:\n    label: Person profile\n    shapes: shapes\n  names:\n    shapes: names.ttl\ndefault_report_syntax: text/turtle\n",
            &[
                ("shapes/person.ttl", PERSON_SHAPES),
                ("shapes/age.ttl", AGE_SHAPES),
                ("shapes/README.md", "not a shape file"),
                ("names.ttl", PERSON_SHAPES),
            ],
        );
        self
    }

    pub fn config(&self) -> ServerConfig {
        ServerConfig {
            resource_root: self.root.clone(),
            tmp_dir: Some(self.tmp_dir()),
            fetch_timeout_secs: 2,
            ..ServerConfig::default()
        }
    }

    pub fn tmp_dir(&self) -> PathBuf {
        let dir = self.root.join(".tmp");
        fs::create_dir_all(&dir).expect("tmp dir");
        dir
    }

    pub fn app_state(&self) -> Arc<AppState> {
        Arc::new(AppState::new(Arc::new(self.config())).expect("app state"))
    }

    pub fn router(&self) -> Router {
        build_router(self.app_state())
    }

    /// Router over an adjusted copy of [`TestResources::config`].
    pub fn router_with(&self, adjust: impl FnOnce(&mut ServerConfig)) -> Router {
        let mut config = self.config();
        adjust(&mut config);
        build_router(Arc::new(AppState::new(Arc::new(config)).expect("app state")))
    }

    pub fn leftover_temp_files(&self) -> usize {
        fs::read_dir(self.tmp_dir()).expect("tmp dir").count()
    }
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.expect("response")
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}

pub fn parse_report(bytes: &[u8], syntax: RdfSyntax) -> RdfGraph {
    decode(bytes, syntax, None, None).expect("report parses")
}

pub fn count(report: &RdfGraph, predicate: NamedNodeRef<'_>) -> usize {
    report.triples().triples_for_predicate(predicate).count()
}

pub fn conforms(report: &RdfGraph) -> Vec<bool> {
    report
        .triples()
        .triples_for_predicate(sh::CONFORMS)
        .map(|triple| match triple.object.into_owned() {
            Term::Literal(literal) => literal.value() == "true",
            other => panic!("sh:conforms is not a literal: {other}"),
        })
        .collect()
}

pub fn components(report: &RdfGraph) -> Vec<String> {
    let mut found: Vec<String> = report
        .triples()
        .triples_for_predicate(sh::SOURCE_CONSTRAINT_COMPONENT)
        .map(|triple| triple.object.to_string())
        .collect();
    found.sort();
    found
}
