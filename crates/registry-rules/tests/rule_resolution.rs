//! Tier resolution through the service: which storage and default lookups
//! happen, and which rules come out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use registry_rules::{
    DefaultRuleProvider, RuleApplicationType, RuleContext, RuleExecutor, RuleExecutorRegistry,
    RuleOutcome, RuleRequest, RuleTier, RulesProperties, RulesResult, RulesService,
};
use registry_storage::fakes::{MemoryRegistryStorage, StorageCall};
use registry_storage::{RuleConfiguration, RuleType, StorageError};

/// Default provider that counts how often it is consulted.
struct CountingDefaults {
    inner: RulesProperties,
    calls: AtomicUsize,
}

impl CountingDefaults {
    fn new(inner: RulesProperties) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DefaultRuleProvider for CountingDefaults {
    fn filtered_default_kinds(&self, existing_global: &[RuleType]) -> Vec<RuleType> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.filtered_default_kinds(existing_global)
    }

    fn default_config(&self, rule_type: RuleType) -> Option<RuleConfiguration> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.default_config(rule_type)
    }
}

/// Records (rule type, configuration) for every invocation and passes.
#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<(RuleType, String)>>,
}

impl RuleExecutor for Recorder {
    fn execute(&self, ctx: &RuleContext<'_>) -> RulesResult<RuleOutcome> {
        self.seen
            .lock()
            .unwrap()
            .push((ctx.rule_type, ctx.configuration.to_string()));
        Ok(RuleOutcome::Satisfied)
    }
}

fn recording_registry(recorder: &Arc<Recorder>) -> Arc<RuleExecutorRegistry> {
    let mut registry = RuleExecutorRegistry::new();
    for rule_type in RuleType::ALL {
        registry.register(rule_type, recorder.clone());
    }
    Arc::new(registry)
}

fn existing_artifact() -> Arc<MemoryRegistryStorage> {
    let storage = Arc::new(MemoryRegistryStorage::new());
    storage
        .create_version("com.example", "orders", "1", "{\"v\":1}", &[])
        .unwrap();
    storage.reset_calls();
    storage
}

fn service(
    storage: &Arc<MemoryRegistryStorage>,
    recorder: &Arc<Recorder>,
    defaults: &Arc<CountingDefaults>,
) -> RulesService {
    RulesService::new(
        storage.clone(),
        recording_registry(recorder),
        defaults.clone(),
        Arc::new(registry_rules::ArtifactTypeRegistry::with_builtin()),
    )
}

fn request() -> RuleRequest {
    RuleRequest::new("com.example", "orders", "JSON", "{\"v\":2}")
}

#[test]
fn artifact_rules_skip_global_and_default_lookups() {
    let storage = existing_artifact();
    storage.set_artifact_rule("com.example", "orders", RuleType::Validity, "FULL");
    storage.set_global_rule(RuleType::Compatibility, "BACKWARD");
    let defaults = CountingDefaults::new(
        RulesProperties::new().with_default(RuleType::Integrity, "FULL"),
    );
    let recorder = Arc::new(Recorder::default());
    let svc = service(&storage, &recorder, &defaults);

    let outcome = svc
        .apply_rules(&request(), RuleApplicationType::Update)
        .unwrap();

    assert!(outcome.is_satisfied());
    assert_eq!(storage.calls(StorageCall::GlobalRules), 0);
    assert_eq!(storage.calls(StorageCall::GlobalRule), 0);
    assert_eq!(defaults.calls(), 0);
    assert_eq!(
        *recorder.seen.lock().unwrap(),
        vec![(RuleType::Validity, "FULL".to_string())]
    );
}

#[test]
fn explicit_global_shadows_default() {
    let storage = existing_artifact();
    storage.set_global_rule(RuleType::Compatibility, "FORWARD");
    let defaults = CountingDefaults::new(
        RulesProperties::new()
            .with_default(RuleType::Compatibility, "BACKWARD")
            .with_default(RuleType::Validity, "SYNTAX_ONLY"),
    );
    let recorder = Arc::new(Recorder::default());
    let svc = service(&storage, &recorder, &defaults);

    let rules = svc
        .resolve_rules("com.example", "orders", RuleApplicationType::Update)
        .unwrap();
    assert_eq!(rules.tier(), RuleTier::GlobalAndDefault);
    assert_eq!(
        rules.get(RuleType::Compatibility),
        Some(&RuleConfiguration::new("FORWARD"))
    );
    assert_eq!(
        rules.get(RuleType::Validity),
        Some(&RuleConfiguration::new("SYNTAX_ONLY"))
    );

    svc.apply_rules(&request(), RuleApplicationType::Update)
        .unwrap();
    assert_eq!(
        *recorder.seen.lock().unwrap(),
        vec![
            (RuleType::Validity, "SYNTAX_ONLY".to_string()),
            (RuleType::Compatibility, "FORWARD".to_string()),
        ]
    );
}

#[test]
fn no_rules_anywhere_is_a_no_op_success() {
    let storage = existing_artifact();
    let defaults = CountingDefaults::new(RulesProperties::new());
    let recorder = Arc::new(Recorder::default());
    let svc = service(&storage, &recorder, &defaults);

    let outcome = svc
        .apply_rules(&request(), RuleApplicationType::Update)
        .unwrap();

    assert_eq!(outcome, RuleOutcome::Satisfied);
    assert!(recorder.seen.lock().unwrap().is_empty());
    assert_eq!(storage.calls(StorageCall::EnabledContentIds), 0);
    assert_eq!(storage.calls(StorageCall::ContentById), 0);
}

#[test]
fn create_mode_never_reads_artifact_rules() {
    let storage = Arc::new(MemoryRegistryStorage::new());
    storage.set_global_rule(RuleType::Validity, "FULL");
    let defaults = CountingDefaults::new(RulesProperties::new());
    let recorder = Arc::new(Recorder::default());
    let svc = service(&storage, &recorder, &defaults);

    let request = RuleRequest::new("com.example", "brand-new", "JSON", "{}");
    let outcome = svc
        .apply_rules(&request, RuleApplicationType::Create)
        .unwrap();

    assert!(outcome.is_satisfied());
    assert_eq!(storage.calls(StorageCall::ArtifactRules), 0);
    assert_eq!(storage.calls(StorageCall::EnabledContentIds), 0);
    assert_eq!(recorder.seen.lock().unwrap().len(), 1);
}

#[test]
fn update_of_missing_artifact_propagates_storage_error() {
    let storage = Arc::new(MemoryRegistryStorage::new());
    let defaults = CountingDefaults::new(RulesProperties::new());
    let recorder = Arc::new(Recorder::default());
    let svc = service(&storage, &recorder, &defaults);

    let err = svc
        .apply_rules(&request(), RuleApplicationType::Update)
        .unwrap_err();
    assert!(matches!(
        err,
        registry_rules::RulesError::Storage(StorageError::ArtifactNotFound { .. })
    ));
    assert!(recorder.seen.lock().unwrap().is_empty());
}

#[test]
fn defaults_loaded_from_environment_lookup_apply() {
    let storage = existing_artifact();
    let props = RulesProperties::from_lookup(|key| match key {
        "REGISTRY_RULES_GLOBAL_INTEGRITY" => Some("NO_DUPLICATES".to_string()),
        _ => None,
    });
    let defaults = CountingDefaults::new(props);
    let recorder = Arc::new(Recorder::default());
    let svc = service(&storage, &recorder, &defaults);

    let rules = svc
        .resolve_rules("com.example", "orders", RuleApplicationType::Update)
        .unwrap();
    assert_eq!(
        rules.iter().map(|(k, v)| (*k, v.to_string())).collect::<Vec<_>>(),
        vec![(RuleType::Integrity, "NO_DUPLICATES".to_string())]
    );
}
