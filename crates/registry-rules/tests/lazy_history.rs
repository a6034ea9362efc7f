//! Lazy content history: fetch counting, ordering and failure isolation.

use std::sync::Arc;

use registry_rules::{
    LazyContentList, RuleApplicationType, RuleContext, RuleExecutorRegistry, RuleOutcome,
    RuleRequest, RulesError, RulesProperties, RulesResult, RulesService,
};
use registry_storage::fakes::{MemoryRegistryStorage, StorageCall, VersionState};
use registry_storage::{ContentHandle, ContentId, RegistryStorage, RuleType, StorageError};

const BODIES: [&str; 3] = ["{\"v\":1}", "{\"v\":2}", "{\"v\":3}"];

fn seeded() -> (MemoryRegistryStorage, Vec<ContentId>) {
    let storage = MemoryRegistryStorage::new();
    for (i, body) in BODIES.iter().enumerate() {
        storage
            .create_version("g", "a", &(i + 1).to_string(), *body, &[])
            .unwrap();
    }
    let ids = storage.enabled_content_ids("g", "a").unwrap();
    storage.reset_calls();
    (storage, ids)
}

#[test]
fn repeated_access_fetches_once() {
    let (storage, ids) = seeded();
    let list = LazyContentList::new(&storage, ids);

    let first = list.get(1).unwrap();
    let second = list.get(1).unwrap();

    assert_eq!(first, ContentHandle::from(BODIES[1]));
    assert_eq!(first, second);
    assert_eq!(storage.calls(StorageCall::ContentById), 1);
    assert!(!list.is_cached(0));
    assert!(list.is_cached(1));
    assert!(!list.is_cached(2));
}

#[test]
fn iteration_follows_id_order() {
    let (storage, ids) = seeded();
    let list = LazyContentList::new(&storage, ids);

    let contents: Vec<ContentHandle> = list.iter().collect::<RulesResult<_>>().unwrap();
    assert_eq!(
        contents,
        BODIES.iter().map(|b| ContentHandle::from(*b)).collect::<Vec<_>>()
    );

    // A second pass is served from the cache.
    assert_eq!(list.iter().count(), 3);
    assert_eq!(storage.calls(StorageCall::ContentById), 3);
}

#[test]
fn failed_fetch_is_isolated_and_retried() {
    let (storage, ids) = seeded();
    storage.fail_content_fetches(ids[1], 1);
    let list = LazyContentList::new(&storage, ids);

    let err = list.get(1).unwrap_err();
    assert!(matches!(err, RulesError::Storage(StorageError::Backend(_))));
    assert!(!list.is_cached(1));

    // Other positions are unaffected.
    assert_eq!(list.get(0).unwrap(), ContentHandle::from(BODIES[0]));
    assert_eq!(list.get(2).unwrap(), ContentHandle::from(BODIES[2]));

    // The retry goes back to storage and succeeds.
    assert_eq!(list.get(1).unwrap(), ContentHandle::from(BODIES[1]));
    assert_eq!(storage.calls(StorageCall::ContentById), 4);
    assert_eq!(list.get(1).unwrap(), ContentHandle::from(BODIES[1]));
    assert_eq!(storage.calls(StorageCall::ContentById), 4);
}

#[test]
fn disabled_versions_are_not_history() {
    let (storage, _) = seeded();
    storage
        .set_version_state("g", "a", "2", VersionState::Disabled)
        .unwrap();
    storage
        .set_version_state("g", "a", "3", VersionState::Deprecated)
        .unwrap();

    let ids = storage.enabled_content_ids("g", "a").unwrap();
    let list = LazyContentList::new(&storage, ids);
    assert_eq!(list.len(), 2);
    assert_eq!(list.get(1).unwrap(), ContentHandle::from(BODIES[2]));
}

fn walk_history(ctx: &RuleContext<'_>) -> RulesResult<RuleOutcome> {
    for content in ctx.current_content.iter() {
        if content? == *ctx.updated_content {
            return Ok(ctx.violation("content already registered"));
        }
    }
    Ok(RuleOutcome::Satisfied)
}

#[test]
fn history_is_shared_across_rules_in_one_call() {
    let (storage, _) = seeded();
    let storage = Arc::new(storage);
    storage.set_artifact_rule("g", "a", RuleType::Validity, "x");
    storage.set_artifact_rule("g", "a", RuleType::Integrity, "x");
    storage.reset_calls();

    let executors = RuleExecutorRegistry::new()
        .with_executor(RuleType::Validity, Arc::new(walk_history))
        .with_executor(RuleType::Integrity, Arc::new(walk_history));
    let svc = RulesService::new(
        storage.clone(),
        Arc::new(executors),
        Arc::new(RulesProperties::new()),
        Arc::new(registry_rules::ArtifactTypeRegistry::with_builtin()),
    );

    let outcome = svc
        .apply_rules(
            &RuleRequest::new("g", "a", "JSON", "{\"v\":4}"),
            RuleApplicationType::Update,
        )
        .unwrap();

    assert!(outcome.is_satisfied());
    // Two rules walked three versions: one fetch per position.
    assert_eq!(storage.calls(StorageCall::ContentById), 3);

    // A fresh call starts with a fresh cache.
    svc.apply_rules(
        &RuleRequest::new("g", "a", "JSON", "{\"v\":4}"),
        RuleApplicationType::Update,
    )
    .unwrap();
    assert_eq!(storage.calls(StorageCall::ContentById), 6);
}

#[test]
fn fetch_failure_inside_a_rule_surfaces_as_error() {
    let (storage, ids) = seeded();
    let storage = Arc::new(storage);
    storage.set_artifact_rule("g", "a", RuleType::Compatibility, "x");
    storage.fail_content_fetches(ids[0], 1);

    let executors =
        RuleExecutorRegistry::new().with_executor(RuleType::Compatibility, Arc::new(walk_history));
    let svc = RulesService::new(
        storage,
        Arc::new(executors),
        Arc::new(RulesProperties::new()),
        Arc::new(registry_rules::ArtifactTypeRegistry::with_builtin()),
    );
    let request = RuleRequest::new("g", "a", "JSON", "{\"v\":1}");

    assert!(matches!(
        svc.apply_rules(&request, RuleApplicationType::Update),
        Err(RulesError::Storage(StorageError::Backend(_)))
    ));
    // The injected failure is spent; the same candidate now gets a verdict.
    let outcome = svc
        .apply_rules(&request, RuleApplicationType::Update)
        .unwrap();
    assert!(!outcome.is_satisfied());
}
