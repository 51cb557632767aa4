//! Behavioural tests every storage engine must pass.
//!
//! Each scenario is a plain function taking the engine under test; the
//! `conformance!` macro instantiates it once per engine.

use std::collections::BTreeSet;
use std::sync::Arc;

use objstore_kinds::{KindRegistry, ObjectReference};
use objstore_store::{
    BatchReadRequest, CancelFlag, CatalogResolver, DatasourceEntry, DeleteObjectRequest,
    FileObjectStore, ObjectHistoryRequest, ObjectSearchRequest, ObjectStore, ReadObjectRequest,
    ReferenceResolver, ResolveError, ResolvedReference, SqliteObjectStore, StoreContext,
    StoreError, WriteObjectRequest, WriteObjectResponse, WriteStatus,
};
use objstore_types::Grn;
use tempfile::TempDir;

#[derive(Clone, Copy, Debug)]
enum Engine {
    Sqlite,
    File,
}

struct Harness {
    store: Box<dyn ObjectStore>,
    _dir: TempDir,
}

impl Harness {
    fn new(engine: Engine) -> Self {
        Self::with_resolver(engine, Arc::new(catalog()))
    }

    fn with_resolver(engine: Engine, resolver: Arc<dyn ReferenceResolver>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let kinds = Arc::new(KindRegistry::with_builtins().unwrap());
        let store: Box<dyn ObjectStore> = match engine {
            Engine::Sqlite => Box::new(
                SqliteObjectStore::open(dir.path().join("objects.db"), 5_000, kinds, resolver).unwrap(),
            ),
            Engine::File => Box::new(FileObjectStore::open(dir.path(), kinds, resolver).unwrap()),
        };
        Self { store, _dir: dir }
    }

    fn write(&self, grn: &Grn, body: &str) -> WriteObjectResponse {
        self.store
            .write(&ctx(), &WriteObjectRequest::new(grn.clone(), body))
            .unwrap()
    }

    fn history_len(&self, grn: &Grn) -> usize {
        self.store
            .history(&ctx(), &ObjectHistoryRequest::new(grn.clone()))
            .unwrap()
            .versions
            .len()
    }

    fn exists(&self, grn: &Grn) -> bool {
        self.store
            .read(&ctx(), &ReadObjectRequest::new(grn.clone()))
            .unwrap()
            .is_found()
    }
}

/// Knows the `timeseries` plugin but not the dummy kind's influx data source.
fn catalog() -> CatalogResolver {
    CatalogResolver::new()
        .with_datasource(DatasourceEntry::new("prometheus", "P1").as_default())
        .with_plugin("timeseries")
}

fn ctx() -> StoreContext {
    StoreContext::new(1, "admin")
}

fn dashboard(uid: &str) -> Grn {
    Grn::new(1, "dashboard", uid)
}

macro_rules! conformance {
    ($($name:ident),* $(,)?) => {
        mod sqlite {
            $(
                #[test]
                fn $name() {
                    super::$name(super::Engine::Sqlite);
                }
            )*
        }

        mod file {
            $(
                #[test]
                fn $name() {
                    super::$name(super::Engine::File);
                }
            )*
        }
    };
}

conformance!(
    end_to_end_scenario,
    identical_body_is_unchanged,
    optimistic_lock,
    unchanged_body_ignores_stale_previous_version,
    explicit_version_must_increase,
    largest_version_stops_updates,
    delete_cascades,
    delete_honours_previous_version,
    batch_requires_uniform_flags,
    batch_preserves_request_order,
    pagination_limit_boundary,
    pagination_walks_every_page,
    search_filters_and_projections,
    search_rejects_unsupported_options,
    history_rejects_page_token,
    tenant_isolation,
    unknown_kind_is_rejected,
    builder_error_touches_nothing,
    clear_history_starts_over,
    previous_version_only_guards_updates,
    historical_read_recomputes_summary,
    summary_round_trip,
    dangling_references_are_reported,
    resolver_outage_aborts_write,
    cancelled_write_commits_nothing,
    concurrent_writers_get_distinct_versions,
);

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

fn end_to_end_scenario(engine: Engine) {
    let h = Harness::new(engine);
    let grn = dashboard("abc");

    let rsp = h.write(&grn, r#"{"title":"X"}"#);
    assert_eq!(rsp.status, WriteStatus::Created);
    assert_eq!(rsp.version(), Some("1"));

    let rsp = h.write(&grn, r#"{"title":"X"}"#);
    assert_eq!(rsp.status, WriteStatus::Unchanged);
    assert_eq!(rsp.version(), Some("1"));

    let rsp = h
        .store
        .write(
            &ctx(),
            &WriteObjectRequest::new(grn.clone(), r#"{"title":"Y"}"#).with_previous_version("1"),
        )
        .unwrap();
    assert_eq!(rsp.status, WriteStatus::Updated);
    assert_eq!(rsp.version(), Some("2"));

    let history = h
        .store
        .history(&ctx(), &ObjectHistoryRequest::new(grn.clone()))
        .unwrap();
    let versions: Vec<_> = history.versions.iter().map(|v| v.version.as_str()).collect();
    assert_eq!(versions, ["2", "1"]);

    assert!(h.store.delete(&ctx(), &DeleteObjectRequest::new(grn.clone())).unwrap().ok);
    assert!(!h.exists(&grn));
}

fn identical_body_is_unchanged(engine: Engine) {
    let h = Harness::new(engine);
    let grn = dashboard("same");
    let first = h.write(&grn, r#"{"title":"Same","tags":["a"]}"#);

    // Key order differs; the normalized body does not.
    let second = h.write(&grn, r#"{"tags":["a"],"title":"Same"}"#);
    assert_eq!(second.status, WriteStatus::Unchanged);
    assert_eq!(second.object.as_ref().unwrap().etag, first.object.as_ref().unwrap().etag);
    assert_eq!(h.history_len(&grn), 1);
}

fn optimistic_lock(engine: Engine) {
    let h = Harness::new(engine);
    let grn = dashboard("lock");
    for title in ["a", "b", "c"] {
        h.write(&grn, &format!(r#"{{"title":"{title}"}}"#));
    }

    let stale = WriteObjectRequest::new(grn.clone(), r#"{"title":"d"}"#).with_previous_version("2");
    let err = h.store.write(&ctx(), &stale).unwrap_err();
    assert!(matches!(err, StoreError::OptimisticLock { .. }), "{err}");
    assert!(err.is_retryable());
    assert_eq!(h.history_len(&grn), 3);

    let fresh = WriteObjectRequest::new(grn.clone(), r#"{"title":"d"}"#).with_previous_version("3");
    assert_eq!(h.store.write(&ctx(), &fresh).unwrap().version(), Some("4"));
}

fn unchanged_body_ignores_stale_previous_version(engine: Engine) {
    let h = Harness::new(engine);
    let grn = dashboard("abc");
    for title in ["X", "Y", "Z"] {
        h.write(&grn, &format!(r#"{{"title":"{title}"}}"#));
    }

    let req = WriteObjectRequest::new(grn.clone(), r#"{"title":"Z"}"#).with_previous_version("2");
    let rsp = h.store.write(&ctx(), &req).unwrap();
    assert_eq!(rsp.status, WriteStatus::Unchanged);
    assert_eq!(rsp.version(), Some("3"));
    assert_eq!(h.history_len(&grn), 3);
}

fn explicit_version_must_increase(engine: Engine) {
    let h = Harness::new(engine);
    let grn = dashboard("explicit");
    h.write(&grn, r#"{"title":"a"}"#);

    let req = WriteObjectRequest::new(grn.clone(), r#"{"title":"b"}"#).with_version("10");
    assert_eq!(h.store.write(&ctx(), &req).unwrap().version(), Some("10"));

    let req = WriteObjectRequest::new(grn.clone(), r#"{"title":"c"}"#).with_version("5");
    assert!(matches!(h.store.write(&ctx(), &req), Err(StoreError::InvalidRequest(_))));

    assert_eq!(h.write(&grn, r#"{"title":"d"}"#).version(), Some("11"));
}

fn largest_version_stops_updates(engine: Engine) {
    let h = Harness::new(engine);
    let grn = dashboard("max");
    let max = u64::MAX.to_string();
    let req = WriteObjectRequest::new(grn.clone(), r#"{"title":"a"}"#).with_version(max.clone());
    assert_eq!(h.store.write(&ctx(), &req).unwrap().version(), Some(max.as_str()));

    let err = h
        .store
        .write(&ctx(), &WriteObjectRequest::new(grn.clone(), r#"{"title":"b"}"#))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidRequest(_)), "{err}");
    assert_eq!(h.history_len(&grn), 1);
    let current = h.store.read(&ctx(), &ReadObjectRequest::new(grn.clone())).unwrap();
    assert_eq!(current.object.unwrap().version, max);
}

fn delete_cascades(engine: Engine) {
    let h = Harness::new(engine);
    let grn = Grn::new(1, "dummy", "gone");
    h.write(&grn, "{}");
    h.write(&grn, r#"{"v":2}"#);

    assert!(h.store.delete(&ctx(), &DeleteObjectRequest::new(grn.clone())).unwrap().ok);
    assert!(!h.store.delete(&ctx(), &DeleteObjectRequest::new(grn.clone())).unwrap().ok);

    assert!(!h.exists(&grn));
    assert_eq!(h.history_len(&grn), 0);
    let search = ObjectSearchRequest {
        kinds: vec!["dummy".into()],
        ..Default::default()
    };
    assert!(h.store.search(&ctx(), &search).unwrap().results.is_empty());
    assert!(h.store.dangling_references(&ctx()).unwrap().is_empty());

    // Recreating starts over at version 1.
    assert_eq!(h.write(&grn, "{}").version(), Some("1"));
}

fn delete_honours_previous_version(engine: Engine) {
    let h = Harness::new(engine);
    let grn = dashboard("del");
    h.write(&grn, r#"{"title":"a"}"#);
    h.write(&grn, r#"{"title":"b"}"#);

    let mut req = DeleteObjectRequest::new(grn.clone());
    req.previous_version = Some("1".into());
    assert!(h.store.delete(&ctx(), &req).unwrap_err().is_retryable());
    assert!(h.exists(&grn));

    req.previous_version = Some("2".into());
    assert!(h.store.delete(&ctx(), &req).unwrap().ok);
}

fn batch_requires_uniform_flags(engine: Engine) {
    let h = Harness::new(engine);
    let req = BatchReadRequest {
        requests: vec![
            ReadObjectRequest::new(dashboard("a")).with_body(),
            ReadObjectRequest::new(dashboard("b")),
        ],
    };
    assert!(matches!(h.store.batch_read(&ctx(), &req), Err(StoreError::InvalidRequest(_))));

    let req = BatchReadRequest {
        requests: vec![ReadObjectRequest::new(dashboard("a")).at_version("1")],
    };
    assert!(matches!(h.store.batch_read(&ctx(), &req), Err(StoreError::InvalidRequest(_))));
}

fn batch_preserves_request_order(engine: Engine) {
    let h = Harness::new(engine);
    h.write(&dashboard("a"), r#"{"title":"A"}"#);
    h.write(&dashboard("c"), r#"{"title":"C"}"#);

    let req = BatchReadRequest {
        requests: ["c", "missing", "a"]
            .iter()
            .map(|uid| ReadObjectRequest::new(dashboard(uid)).with_body().with_summary())
            .collect(),
    };
    let rsp = h.store.batch_read(&ctx(), &req).unwrap();
    assert_eq!(rsp.results.len(), 3);
    assert_eq!(rsp.results[0].object.as_ref().unwrap().grn.uid, "c");
    assert!(!rsp.results[1].is_found());
    assert_eq!(rsp.results[2].summary.as_ref().unwrap().name, "A");
    assert!(rsp.results[2].object.as_ref().unwrap().body.is_some());

    assert!(h.store.batch_read(&ctx(), &BatchReadRequest::default()).unwrap().results.is_empty());
}

fn write_folders(h: &Harness, tenant: i64, n: usize) {
    let ctx = StoreContext::new(tenant, "admin");
    for i in 0..n {
        h.store
            .write(
                &ctx,
                &WriteObjectRequest::new(Grn::new(tenant, "folder", format!("f{i}")), format!(r#"{{"title":"F{i}"}}"#)),
            )
            .unwrap();
    }
}

fn folder_search(limit: usize, token: Option<String>) -> ObjectSearchRequest {
    ObjectSearchRequest {
        kinds: vec!["folder".into()],
        limit: Some(limit),
        next_page_token: token,
        ..Default::default()
    }
}

fn pagination_limit_boundary(engine: Engine) {
    let h = Harness::new(engine);
    write_folders(&h, 1, 3);
    write_folders(&h, 2, 5);

    let page = h.store.search(&ctx(), &folder_search(2, None)).unwrap();
    assert_eq!(page.results.len(), 2);
    assert_eq!(page.next_page_token.as_deref(), Some("1/folder/f2"));

    let page = h.store.search(&ctx(), &folder_search(3, None)).unwrap();
    assert_eq!(page.results.len(), 3);
    assert_eq!(page.next_page_token, None);
}

fn pagination_walks_every_page(engine: Engine) {
    let h = Harness::new(engine);
    write_folders(&h, 1, 7);

    let mut seen = Vec::new();
    let mut token = None;
    loop {
        let page = h.store.search(&ctx(), &folder_search(3, token)).unwrap();
        seen.extend(page.results.into_iter().map(|r| r.grn.uid));
        match page.next_page_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }
    let expected: Vec<String> = (0..7).map(|i| format!("f{i}")).collect();
    assert_eq!(seen, expected);
}

fn search_filters_and_projections(engine: Engine) {
    let h = Harness::new(engine);
    h.store
        .write(
            &ctx(),
            &WriteObjectRequest::new(dashboard("in"), r#"{"title":"In","tags":["prod"],"schemaVersion":36}"#)
                .with_folder("team-a"),
        )
        .unwrap();
    h.write(&dashboard("out"), r#"{"title":"Out"}"#);
    h.write(&Grn::new(1, "folder", "team-a"), r#"{"title":"Team A"}"#);

    let req = ObjectSearchRequest {
        folder: Some("team-a".into()),
        with_labels: true,
        with_fields: true,
        ..Default::default()
    };
    let rsp = h.store.search(&ctx(), &req).unwrap();
    assert_eq!(rsp.results.len(), 1);
    let hit = &rsp.results[0];
    assert_eq!(hit.grn, dashboard("in"));
    assert_eq!(hit.name, "In");
    assert_eq!(hit.slug, "in");
    assert!(hit.body.is_none());
    assert!(hit.labels.as_ref().unwrap().contains_key("prod"));
    assert_eq!(hit.fields.as_ref().unwrap()["schemaVersion"], 36);

    // Folder is kept when an update does not name one.
    h.write(&dashboard("in"), r#"{"title":"In again"}"#);
    assert_eq!(h.store.search(&ctx(), &req).unwrap().results.len(), 1);

    let all = h.store.search(&ctx(), &ObjectSearchRequest::default()).unwrap();
    assert_eq!(all.results.len(), 3);
    assert!(all.results.iter().all(|r| r.labels.is_none() && r.fields.is_none()));
    let kinds: BTreeSet<_> = all.results.iter().map(|r| r.grn.kind.as_str()).collect();
    assert_eq!(kinds, BTreeSet::from(["dashboard", "folder"]));
}

fn search_rejects_unsupported_options(engine: Engine) {
    let h = Harness::new(engine);
    let mut req = ObjectSearchRequest::default();
    req.labels.insert("env".into(), "prod".into());
    assert!(matches!(h.store.search(&ctx(), &req), Err(StoreError::Unsupported(_))));

    let req = ObjectSearchRequest {
        sort: vec!["name".into()],
        ..Default::default()
    };
    let err = h.store.search(&ctx(), &req).unwrap_err();
    assert!(err.to_string().contains("not yet supported"));
}

fn history_rejects_page_token(engine: Engine) {
    let h = Harness::new(engine);
    let grn = dashboard("h");
    h.write(&grn, r#"{"title":"a"}"#);

    let mut req = ObjectHistoryRequest::new(grn.clone());
    req.next_page_token = Some("x".into());
    assert!(matches!(h.store.history(&ctx(), &req), Err(StoreError::Unsupported(_))));

    assert_eq!(h.history_len(&dashboard("never-written")), 0);
}

fn tenant_isolation(engine: Engine) {
    let h = Harness::new(engine);
    let err = h
        .store
        .write(&ctx(), &WriteObjectRequest::new(Grn::new(2, "dashboard", "x"), r#"{"title":"x"}"#))
        .unwrap_err();
    assert!(matches!(err, StoreError::TenantMismatch { context: 1, grn: 2 }));

    // Tenant 0 means "the caller's tenant".
    h.write(&Grn::new(0, "dashboard", "mine"), r#"{"title":"mine"}"#);
    assert!(h.exists(&dashboard("mine")));

    let other = StoreContext::new(2, "intruder");
    let rsp = h
        .store
        .read(&other, &ReadObjectRequest::new(Grn::new(2, "dashboard", "mine")))
        .unwrap();
    assert!(!rsp.is_found());
    assert!(h.store.search(&other, &ObjectSearchRequest::default()).unwrap().results.is_empty());

    let token = ObjectSearchRequest {
        next_page_token: Some("1/dashboard/mine".into()),
        ..Default::default()
    };
    assert!(matches!(h.store.search(&other, &token), Err(StoreError::TenantMismatch { .. })));
}

fn unknown_kind_is_rejected(engine: Engine) {
    let h = Harness::new(engine);
    let err = h
        .store
        .write(&ctx(), &WriteObjectRequest::new(Grn::new(1, "spreadsheet", "s"), "{}"))
        .unwrap_err();
    assert!(matches!(err, StoreError::UnknownKind(ref k) if k == "spreadsheet"));
    assert_eq!(WriteObjectResponse::from_error(Grn::new(1, "spreadsheet", "s"), &err).status, WriteStatus::Error);

    let err = h
        .store
        .write(&ctx(), &WriteObjectRequest::new(Grn::new(1, "dashboard", ""), "{}"))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidGrn { .. }));
}

fn builder_error_touches_nothing(engine: Engine) {
    let h = Harness::new(engine);
    let grn = Grn::new(1, "svg", "icon");
    let err = h
        .store
        .write(
            &ctx(),
            &WriteObjectRequest::new(grn.clone(), r#"<svg><script>alert(1)</script></svg>"#),
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::Kind(_)), "{err}");
    assert!(!h.exists(&grn));
    assert_eq!(h.history_len(&grn), 0);

    let rsp = h.write(&grn, r#"<svg xmlns="http://www.w3.org/2000/svg"></svg>"#);
    assert_eq!(rsp.status, WriteStatus::Created);
}

fn clear_history_starts_over(engine: Engine) {
    let h = Harness::new(engine);
    let grn = dashboard("clear");
    h.write(&grn, r#"{"title":"a"}"#);
    h.write(&grn, r#"{"title":"b"}"#);
    h.write(&grn, r#"{"title":"c"}"#);

    let other = StoreContext::new(1, "importer");
    let rsp = h
        .store
        .write(&other, &WriteObjectRequest::new(grn.clone(), r#"{"title":"c"}"#).clearing_history())
        .unwrap();
    assert_eq!(rsp.status, WriteStatus::Created);
    assert_eq!(rsp.version(), Some("1"));
    assert_eq!(h.history_len(&grn), 1);

    let object = h
        .store
        .read(&ctx(), &ReadObjectRequest::new(grn.clone()))
        .unwrap()
        .object
        .unwrap();
    assert_eq!(object.version, "1");
    assert_eq!(object.created_by, "admin");
    assert_eq!(object.updated_by, "importer");

    assert_eq!(h.write(&grn, r#"{"title":"d"}"#).version(), Some("2"));
}

fn previous_version_only_guards_updates(engine: Engine) {
    let h = Harness::new(engine);
    let grn = dashboard("guard");

    let create = WriteObjectRequest::new(grn.clone(), r#"{"title":"a"}"#).with_previous_version("9");
    let rsp = h.store.write(&ctx(), &create).unwrap();
    assert_eq!(rsp.status, WriteStatus::Created);
    h.write(&grn, r#"{"title":"b"}"#);

    let reset = WriteObjectRequest::new(grn.clone(), r#"{"title":"c"}"#)
        .with_previous_version("1")
        .clearing_history();
    let rsp = h.store.write(&ctx(), &reset).unwrap();
    assert_eq!(rsp.status, WriteStatus::Created);
    assert_eq!(rsp.version(), Some("1"));
    assert_eq!(h.history_len(&grn), 1);
}

fn historical_read_recomputes_summary(engine: Engine) {
    let h = Harness::new(engine);
    let grn = dashboard("hist");
    let first = h.write(&grn, r#"{"title":"Old","tags":["v1"]}"#);
    h.store
        .write(&ctx(), &WriteObjectRequest::new(grn.clone(), r#"{"title":"New"}"#).with_comment("rename"))
        .unwrap();

    let old = h
        .store
        .read(&ctx(), &ReadObjectRequest::new(grn.clone()).at_version("1").with_body().with_summary())
        .unwrap();
    let object = old.object.unwrap();
    assert_eq!(object.version, "1");
    assert_eq!(object.etag, first.object.unwrap().etag);
    assert_eq!(object.body.as_deref(), Some(br#"{"tags":["v1"],"title":"Old"}"#.as_slice()));
    let summary = old.summary.unwrap();
    assert_eq!(summary.name, "Old");
    assert!(summary.labels.contains_key("v1"));

    let current = h
        .store
        .read(&ctx(), &ReadObjectRequest::new(grn.clone()).with_summary())
        .unwrap();
    assert_eq!(current.summary.unwrap().name, "New");
    let object = current.object.unwrap();
    assert!(object.body.is_none());
    assert_eq!(object.comment, "rename");

    let missing = h
        .store
        .read(&ctx(), &ReadObjectRequest::new(grn).at_version("7"))
        .unwrap();
    assert!(!missing.is_found());
}

fn summary_round_trip(engine: Engine) {
    let h = Harness::new(engine);
    let grn = Grn::new(1, "dummy", "d");
    let rsp = h.write(&grn, "{}");
    let written: objstore_kinds::ObjectSummary = serde_json::from_str(rsp.summary_json.as_deref().unwrap()).unwrap();

    let read = h
        .store
        .read(&ctx(), &ReadObjectRequest::new(grn).with_summary())
        .unwrap()
        .summary
        .unwrap();
    assert_eq!(read.name, written.name);
    assert_eq!(read.labels, written.labels);
    assert_eq!(read.fields, written.fields);
    assert_eq!(read.error, written.error);
    assert_eq!(read.references, written.references);
    assert!(read.nested.is_empty());
    assert_eq!(written.nested.len(), 1);
}

fn dangling_references_are_reported(engine: Engine) {
    let h = Harness::new(engine);
    let grn = Grn::new(1, "dummy", "refs");
    h.write(&grn, "{}");

    let dangling = h.store.dangling_references(&ctx()).unwrap();
    assert_eq!(dangling.len(), 1);
    assert_eq!(dangling[0].source, grn);
    assert_eq!(dangling[0].reference.reference, ObjectReference::new("ds", "influxdb", "influx-uid"));
    assert!(!dangling[0].reference.resolved.ok);
    assert!(!dangling[0].reference.resolved.warning.is_empty());

    assert!(h.store.dangling_references(&StoreContext::new(2, "other")).unwrap().is_empty());
}

fn resolver_outage_aborts_write(engine: Engine) {
    let down = |_: &ObjectReference| -> Result<ResolvedReference, ResolveError> {
        Err(ResolveError::Unavailable("catalog offline".into()))
    };
    let h = Harness::with_resolver(engine, Arc::new(down));
    let grn = Grn::new(1, "dummy", "d");

    let err = h.store.write(&ctx(), &WriteObjectRequest::new(grn.clone(), "{}")).unwrap_err();
    assert!(matches!(err, StoreError::Resolve(_)));
    assert!(!h.exists(&grn));

    // Kinds without references never reach the resolver.
    assert_eq!(h.write(&Grn::new(1, "folder", "f"), r#"{"title":"F"}"#).status, WriteStatus::Created);
}

fn cancelled_write_commits_nothing(engine: Engine) {
    let flag = CancelFlag::new();
    let trip = flag.clone();
    let resolver = move |r: &ObjectReference| -> Result<ResolvedReference, ResolveError> {
        trip.cancel();
        Ok(ResolvedReference::found(r.uid.clone()))
    };
    let h = Harness::with_resolver(engine, Arc::new(resolver));
    let grn = Grn::new(1, "dummy", "d");

    let ctx = ctx().with_cancel(flag);
    let err = h.store.write(&ctx, &WriteObjectRequest::new(grn.clone(), "{}")).unwrap_err();
    assert!(matches!(err, StoreError::Cancelled));
    assert!(!h.exists(&grn));
    assert_eq!(h.history_len(&grn), 0);
}

fn concurrent_writers_get_distinct_versions(engine: Engine) {
    let h = Harness::new(engine);
    let grn = dashboard("race");
    let store = h.store.as_ref();

    std::thread::scope(|s| {
        for i in 0..8 {
            let grn = grn.clone();
            s.spawn(move || {
                let body = format!(r#"{{"title":"writer {i}"}}"#);
                let rsp = store.write(&ctx(), &WriteObjectRequest::new(grn, body)).unwrap();
                assert_ne!(rsp.status, WriteStatus::Unchanged);
            });
        }
    });

    let history = store.history(&ctx(), &ObjectHistoryRequest::new(grn.clone())).unwrap();
    let versions: BTreeSet<_> = history.versions.iter().map(|v| v.version.clone()).collect();
    assert_eq!(versions.len(), 8);
    let current = store.read(&ctx(), &ReadObjectRequest::new(grn)).unwrap().object.unwrap();
    assert_eq!(current.version, "8");
}
