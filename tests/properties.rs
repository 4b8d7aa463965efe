//! Property tests for exposure and version filtering.

use std::collections::BTreeSet;
use std::sync::Arc;

use fragment_cache::{
    ApiVersion, ClassSchema, DocumentRef, EngineConfig, ExposureLevel, FieldSpec, FragmentEngine,
    InMemoryCacheStore, MemoryDocument, RenderOptions, SchemaRegistry, TransformPipeline,
};
use proptest::prelude::*;
use serde_json::{json, Value};

const VERSIONS: [&str; 3] = ["v1", "v2", "v3"];

/// One generated field: minimum exposure and optional version mask.
#[derive(Debug, Clone)]
struct FieldDecl {
    min_exposure: ExposureLevel,
    versions: Option<Vec<&'static str>>,
}

fn arb_level() -> impl Strategy<Value = ExposureLevel> {
    prop_oneof![
        Just(ExposureLevel::Short),
        Just(ExposureLevel::Public),
        Just(ExposureLevel::All),
    ]
}

fn arb_version() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("v1"), Just("v2"), Just("v3"), Just("unspecified")]
}

fn arb_field() -> impl Strategy<Value = FieldDecl> {
    (arb_level(), proptest::option::of(proptest::sample::subsequence(VERSIONS.to_vec(), 0..=3)))
        .prop_map(|(min_exposure, versions)| FieldDecl { min_exposure, versions })
}

fn arb_fields() -> impl Strategy<Value = Vec<FieldDecl>> {
    proptest::collection::vec(arb_field(), 1..8)
}

fn schema(decls: &[FieldDecl]) -> ClassSchema {
    decls.iter().enumerate().fold(ClassSchema::new("Item"), |schema, (i, decl)| {
        let mut spec = FieldSpec::scalar(format!("f{i}")).min_exposure(decl.min_exposure);
        if let Some(versions) = &decl.versions {
            spec = spec.versions(versions.iter().copied());
        }
        schema.field(spec)
    })
}

fn document(decls: &[FieldDecl]) -> MemoryDocument {
    (0..decls.len()).fold(MemoryDocument::new("Item", 1u64), |doc, i| {
        doc.with_attr(format!("f{i}"), json!(i))
    })
}

fn engine(registry: SchemaRegistry) -> FragmentEngine {
    FragmentEngine::new(
        Arc::new(registry),
        Arc::new(InMemoryCacheStore::new()),
        EngineConfig::default(),
        TransformPipeline::new(),
    )
}

fn key_set(value: &Value) -> BTreeSet<String> {
    value
        .as_object()
        .map(|o| o.keys().cloned().collect())
        .unwrap_or_default()
}

proptest! {
    /// Raising the exposure level never removes a field.
    #[test]
    fn exposure_is_monotonic(
        decls in arb_fields(),
        version in arb_version(),
        lower in arb_level(),
        higher in arb_level(),
    ) {
        prop_assume!(lower <= higher);
        let engine = engine(SchemaRegistry::new().with(schema(&decls)));
        let doc = document(&decls);
        let options = RenderOptions::default().version(version);

        let low = engine.render(&doc, &options.clone().exposure(lower)).unwrap();
        let high = engine.render(&doc, &options.exposure(higher)).unwrap();

        prop_assert!(key_set(&low).is_subset(&key_set(&high)));
    }

    /// A field appears exactly when its level and versions admit the request.
    #[test]
    fn fields_follow_visibility(
        decls in arb_fields(),
        version in arb_version(),
        level in arb_level(),
    ) {
        let engine = engine(SchemaRegistry::new().with(schema(&decls)));
        let out = engine
            .render(&document(&decls), &RenderOptions::default().version(version).exposure(level))
            .unwrap();

        let expected: Vec<String> = decls
            .iter()
            .enumerate()
            .filter(|(_, decl)| level >= decl.min_exposure)
            .filter(|(_, decl)| decl.versions.as_ref().map_or(true, |vs| vs.contains(&version)))
            .map(|(i, _)| format!("f{i}"))
            .collect();
        let actual: Vec<String> = out.as_object().unwrap().keys().cloned().collect();
        prop_assert_eq!(actual, expected);
    }

    /// Children are rendered at `Short` exactly when the parent's level
    /// equals the reference's threshold, otherwise at the parent's level.
    #[test]
    fn cascade_rule_holds(threshold in arb_level(), parent_level in arb_level()) {
        let registry = SchemaRegistry::new()
            .with(
                ClassSchema::new("Child")
                    .field(FieldSpec::scalar("short"))
                    .field(FieldSpec::scalar("public").min_exposure(ExposureLevel::Public))
                    .field(FieldSpec::scalar("all").min_exposure(ExposureLevel::All)),
            )
            .with(ClassSchema::new("Parent").field(FieldSpec::reference("child").min_exposure(threshold)));
        let engine = engine(registry);
        let child: DocumentRef = MemoryDocument::new("Child", 1u64)
            .with_attr("short", json!(1))
            .with_attr("public", json!(2))
            .with_attr("all", json!(3))
            .into_ref();
        let parent = MemoryDocument::new("Parent", 1u64).with_one("child", child);

        let out = engine
            .render(&parent, &RenderOptions::default().exposure(parent_level))
            .unwrap();

        if parent_level < threshold {
            prop_assert!(out.get("child").is_none());
        } else {
            let child_level = if parent_level == threshold { ExposureLevel::Short } else { parent_level };
            let expected: BTreeSet<String> = [
                ("short", ExposureLevel::Short),
                ("public", ExposureLevel::Public),
                ("all", ExposureLevel::All),
            ]
            .iter()
            .filter(|(_, min)| child_level >= *min)
            .map(|(name, _)| name.to_string())
            .collect();
            prop_assert_eq!(key_set(&out["child"]), expected);
        }
    }

    /// Rendering is deterministic regardless of cache state.
    #[test]
    fn cached_render_matches_cold(decls in arb_fields(), version in arb_version(), level in arb_level()) {
        let engine = engine(SchemaRegistry::new().with(schema(&decls)));
        let doc = document(&decls);
        let options = RenderOptions::default().version(ApiVersion::new(version)).exposure(level);

        let cold = serde_json::to_string(&engine.render(&doc, &options).unwrap()).unwrap();
        let warm = serde_json::to_string(&engine.render(&doc, &options).unwrap()).unwrap();
        prop_assert_eq!(cold, warm);
    }
}
