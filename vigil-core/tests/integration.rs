//! Integration Tests for the Validation Engine
//!
//! These tests drive the whole stack: signals, rule verdicts, and the
//! per-field aggregation protocol. The engine keeps process-wide state
//! (named rules, settings, attachment table, context cache), so every
//! test here runs serialized.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use serial_test::serial;

use vigil_core::{
    add_named_rule, clear_named_rules, clear_view_model_contexts, detach_all, error_messages,
    for_view_model, is_valid, reset_settings, sub_value, update_settings, validity_signal,
    FieldRef, RuleArg, Signal, SubValue, ValidationError,
};

struct Person {
    first_name: Signal<String>,
    last_name: Signal<String>,
    email: Signal<String>,
}

impl Person {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            first_name: Signal::new(String::new()),
            last_name: Signal::new(String::new()),
            email: Signal::new(String::new()),
        })
    }
}

struct Profile {
    age: Signal<i64>,
    newsletter: Signal<bool>,
}

impl Profile {
    fn new(age: i64) -> Arc<Self> {
        Arc::new(Self {
            age: Signal::new(age),
            newsletter: Signal::new(false),
        })
    }
}

#[test]
#[serial]
fn field_with_no_rules_is_valid_from_the_start() {
    let vm = Person::new();
    let ctx = for_view_model(&vm);

    ctx.validate(&vm.first_name).unwrap();

    let field = vm.first_name.field_ref();
    assert!(is_valid(&field));
    assert!(error_messages(&field).is_empty());
}

#[test]
#[serial]
fn single_rule_initializes_from_current_state_when_valid() {
    let vm = Person::new();
    vm.first_name.set("Albert".to_string());

    let ctx = for_view_model(&vm);
    ctx.validate(&vm.first_name)
        .unwrap()
        .add_rule(|vm: &Person| !vm.first_name.get().is_empty());

    assert!(is_valid(&vm.first_name.field_ref()));
}

#[test]
#[serial]
fn single_rule_initializes_from_current_state_when_invalid() {
    let vm = Person::new();

    let ctx = for_view_model(&vm);
    ctx.validate(&vm.first_name)
        .unwrap()
        .add_rule(|vm: &Person| !vm.first_name.get().is_empty());

    let field = vm.first_name.field_ref();
    assert!(!is_valid(&field));
    assert_eq!(error_messages(&field).len(), 1);
}

#[test]
#[serial]
fn mutation_flips_validity() {
    let vm = Person::new();

    let ctx = for_view_model(&vm);
    ctx.validate(&vm.first_name)
        .unwrap()
        .add_rule(|vm: &Person| !vm.first_name.get().is_empty());

    let field = vm.first_name.field_ref();
    assert!(!is_valid(&field));

    vm.first_name.set("Albert".to_string());
    assert!(is_valid(&field));

    vm.first_name.set(String::new());
    assert!(!is_valid(&field));
}

#[test]
#[serial]
fn group_initializes_every_member_field() {
    let valid_vm = Person::new();
    let ctx = for_view_model(&valid_vm);
    ctx.validate([
        valid_vm.first_name.field_ref(),
        valid_vm.last_name.field_ref(),
    ])
    .unwrap()
    .add_rule(|_: &Person| true);

    assert!(is_valid(&valid_vm.first_name.field_ref()));
    assert!(is_valid(&valid_vm.last_name.field_ref()));

    let invalid_vm = Person::new();
    let ctx = for_view_model(&invalid_vm);
    ctx.validate([
        invalid_vm.first_name.field_ref(),
        invalid_vm.last_name.field_ref(),
    ])
    .unwrap()
    .add_rule(|_: &Person| false);

    assert!(!is_valid(&invalid_vm.first_name.field_ref()));
    assert!(!is_valid(&invalid_vm.last_name.field_ref()));
}

#[test]
#[serial]
fn group_shared_rule_keeps_member_fields_in_lockstep() {
    let vm = Person::new();
    let ctx = for_view_model(&vm);

    ctx.validate([vm.first_name.field_ref(), vm.last_name.field_ref()])
        .unwrap()
        .add_rule(|vm: &Person| !vm.first_name.get().is_empty());

    let first = vm.first_name.field_ref();
    let last = vm.last_name.field_ref();

    assert!(!is_valid(&first));
    assert!(!is_valid(&last));
    assert_eq!(error_messages(&first), error_messages(&last));

    vm.first_name.set("Ada".to_string());

    assert!(is_valid(&first));
    assert!(is_valid(&last));
    assert_eq!(error_messages(&first), error_messages(&last));
}

#[test]
#[serial]
fn each_failing_rule_contributes_its_own_message() {
    let vm = Person::new();
    let ctx = for_view_model(&vm);
    let group = ctx.validate(&vm.email).unwrap();

    group
        .add_rule(|vm: &Person| !vm.email.get().is_empty())
        .with_error_message("Email is required");
    group
        .add_rule(|vm: &Person| vm.email.get().contains('@'))
        .with_error_message("Email must contain @");

    let field = vm.email.field_ref();

    // Both rules fail: one message per failing rule, registration order.
    assert!(!is_valid(&field));
    assert_eq!(
        error_messages(&field),
        vec![
            "Email is required".to_string(),
            "Email must contain @".to_string()
        ]
    );

    // Only the second rule fails.
    vm.email.set("ada.lovelace".to_string());
    assert!(!is_valid(&field));
    assert_eq!(
        error_messages(&field),
        vec!["Email must contain @".to_string()]
    );

    vm.email.set("ada@lovelace.dev".to_string());
    assert!(is_valid(&field));
    assert!(error_messages(&field).is_empty());
}

#[test]
#[serial]
fn same_view_model_arc_reuses_the_context() {
    let vm = Person::new();

    let first = for_view_model(&vm);
    let second = for_view_model(&vm);
    assert!(Arc::ptr_eq(&first, &second));

    // Structurally identical, distinct identity: new context.
    let twin = Person::new();
    let third = for_view_model(&twin);
    assert!(!Arc::ptr_eq(&first, &third));
}

#[test]
#[serial]
fn deactivated_rule_never_invalidates_its_field() {
    let vm = Profile::new(10);
    let ctx = for_view_model(&vm);

    ctx.validate(&vm.age)
        .unwrap()
        .add_rule(|vm: &Profile| vm.age.get() >= 18)
        .when(|vm: &Profile| vm.newsletter.get());

    let field = vm.age.field_ref();

    // The predicate fails, but the condition holds it inactive.
    assert!(is_valid(&field));

    // Flipping the condition alone re-evaluates and republishes.
    vm.newsletter.set(true);
    assert!(!is_valid(&field));
    assert_eq!(error_messages(&field).len(), 1);

    vm.newsletter.set(false);
    assert!(is_valid(&field));
}

#[test]
#[serial]
fn one_publication_per_propagation_pass() {
    let vm = Profile::new(5);
    let ctx = for_view_model(&vm);

    // Two independent declarations against the same field.
    ctx.validate(&vm.age)
        .unwrap()
        .add_rule(|vm: &Profile| vm.age.get() >= 10)
        .with_error_message("too small");
    ctx.validate(&vm.age)
        .unwrap()
        .add_rule(|vm: &Profile| vm.age.get() <= 99)
        .with_error_message("too big");

    let field = vm.age.field_ref();
    assert!(!is_valid(&field));

    let publications = Arc::new(AtomicI32::new(0));
    let publications_clone = publications.clone();
    let flag = validity_signal(&field).expect("validity was published");
    let subscription = flag.subscribe(move || {
        publications_clone.fetch_add(1, Ordering::SeqCst);
    });

    // One rule goes from failing to passing, the other from passing to
    // failing. Whichever finishes first must not surface alone.
    vm.age.set(200);

    assert_eq!(publications.load(Ordering::SeqCst), 1);
    assert!(!is_valid(&field));
    assert_eq!(error_messages(&field), vec!["too big".to_string()]);

    vm.age.set(42);
    assert_eq!(publications.load(Ordering::SeqCst), 2);
    assert!(is_valid(&field));
    assert!(error_messages(&field).is_empty());

    flag.unsubscribe(subscription);
}

#[test]
#[serial]
fn min_rule_scenario() {
    clear_named_rules();
    add_named_rule("min", |_, field, args| {
        match (field.get::<i64>(), args.first().and_then(RuleArg::as_int)) {
            (Some(value), Some(bound)) => value >= bound,
            _ => false,
        }
    });

    let vm = Profile::new(15);
    let ctx = for_view_model(&vm);
    ctx.validate(&vm.age)
        .unwrap()
        .add_named_rule("min", vec![RuleArg::from(10)])
        .unwrap();

    let field = vm.age.field_ref();

    vm.age.set(9);
    assert!(!is_valid(&field));

    vm.age.set(10);
    assert!(is_valid(&field));

    vm.age.set(11);
    assert!(is_valid(&field));

    clear_named_rules();
}

#[test]
#[serial]
fn named_rule_runs_per_field_in_group_order() {
    clear_named_rules();

    let visited: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
    let visited_clone = visited.clone();
    add_named_rule("required", move |_, field, _| {
        visited_clone.lock().unwrap().push(field.id());
        field.get::<String>().map(|v| !v.is_empty()).unwrap_or(false)
    });

    let vm = Person::new();
    vm.first_name.set("Ada".to_string());
    let ctx = for_view_model(&vm);

    let first = vm.first_name.field_ref();
    let last = vm.last_name.field_ref();

    visited.lock().unwrap().clear();
    ctx.validate([first.clone(), last.clone()])
        .unwrap()
        .add_named_rule("required", Vec::new())
        .unwrap();

    // First field passes, second fails: both visited, in group order.
    assert_eq!(*visited.lock().unwrap(), vec![first.id(), last.id()]);
    assert!(!is_valid(&first));

    // A failing first field short-circuits the second.
    visited.lock().unwrap().clear();
    vm.first_name.set(String::new());
    assert_eq!(*visited.lock().unwrap(), vec![first.id()]);

    clear_named_rules();
}

#[test]
#[serial]
fn unknown_named_rule_fails_at_declaration_time() {
    clear_named_rules();

    let vm = Person::new();
    let ctx = for_view_model(&vm);
    let group = ctx.validate(&vm.email).unwrap();

    let result = group.add_named_rule("email", Vec::new());
    assert!(matches!(result, Err(ValidationError::UnknownRule(name)) if name == "email"));
}

#[test]
#[serial]
fn clearing_the_registry_leaves_attached_rules_working() {
    clear_named_rules();
    add_named_rule("nonzero", |_, field, _| {
        field.get::<i64>().map(|v| v != 0).unwrap_or(false)
    });

    let vm = Profile::new(1);
    let ctx = for_view_model(&vm);
    ctx.validate(&vm.age)
        .unwrap()
        .add_named_rule("nonzero", Vec::new())
        .unwrap();

    clear_named_rules();

    // The rule resolved its predicate at declaration time.
    let field = vm.age.field_ref();
    vm.age.set(0);
    assert!(!is_valid(&field));
    vm.age.set(3);
    assert!(is_valid(&field));
}

#[test]
#[serial]
fn custom_sub_field_names_are_respected() {
    reset_settings();
    update_settings(|s| {
        s.valid_sub_field_name = "_isValid".to_string();
        s.error_sub_field_name = "_errMsg".to_string();
    });

    let vm = Person::new();
    let ctx = for_view_model(&vm);
    ctx.validate(&vm.first_name)
        .unwrap()
        .add_rule(|vm: &Person| !vm.first_name.get().is_empty());

    let field = vm.first_name.field_ref();
    assert!(matches!(
        sub_value(&field, "_isValid"),
        Some(SubValue::Flag(_))
    ));
    assert!(matches!(
        sub_value(&field, "_errMsg"),
        Some(SubValue::Messages(_))
    ));
    assert!(sub_value(&field, "isValid").is_none());

    // The helpers read through the configured names.
    assert!(!is_valid(&field));

    reset_settings();
}

#[test]
#[serial]
fn default_error_message_fills_in_for_rules_without_one() {
    reset_settings();
    update_settings(|s| s.default_error_message = "This is plain wrong!".to_string());

    let vm = Person::new();
    let ctx = for_view_model(&vm);
    ctx.validate(&vm.first_name)
        .unwrap()
        .add_rule(|vm: &Person| !vm.first_name.get().is_empty());

    assert_eq!(
        error_messages(&vm.first_name.field_ref()),
        vec!["This is plain wrong!".to_string()]
    );

    reset_settings();
}

#[test]
#[serial]
fn last_error_message_wins_and_republishes_immediately() {
    let vm = Person::new();
    let ctx = for_view_model(&vm);

    let rule = ctx
        .validate(&vm.first_name)
        .unwrap()
        .add_rule(|vm: &Person| !vm.first_name.get().is_empty())
        .with_error_message("first message");

    let field = vm.first_name.field_ref();
    assert_eq!(error_messages(&field), vec!["first message".to_string()]);

    // No field mutation needed: setting the message republishes.
    rule.with_error_message("second message");
    assert_eq!(error_messages(&field), vec!["second message".to_string()]);
}

#[test]
#[serial]
fn selector_function_resolves_fields_against_the_view_model() {
    let vm = Person::new();
    let ctx = for_view_model(&vm);

    ctx.validate_with(|vm: &Person| {
        [vm.first_name.field_ref(), vm.last_name.field_ref()]
    })
    .unwrap()
    .add_rule(|vm: &Person| !vm.first_name.get().is_empty());

    assert!(!is_valid(&vm.first_name.field_ref()));
    assert!(!is_valid(&vm.last_name.field_ref()));

    vm.first_name.set("Grace".to_string());
    assert!(is_valid(&vm.first_name.field_ref()));
    assert!(is_valid(&vm.last_name.field_ref()));
}

#[test]
#[serial]
fn dead_and_empty_selections_are_rejected() {
    let vm = Person::new();
    let ctx = for_view_model(&vm);

    let dead = {
        let transient = Signal::new(0i64);
        transient.field_ref()
    };
    let result = ctx.validate(dead);
    assert!(matches!(result, Err(ValidationError::InvalidField(_))));

    let result = ctx.validate(Vec::<FieldRef>::new());
    assert!(matches!(result, Err(ValidationError::InvalidField(_))));
}

#[test]
#[serial]
fn rule_reading_a_field_twice_reruns_once_per_change() {
    let vm = Profile::new(50);
    let ctx = for_view_model(&vm);

    let evaluations = Arc::new(AtomicI32::new(0));
    let evaluations_clone = evaluations.clone();
    ctx.validate(&vm.age).unwrap().add_rule(move |vm: &Profile| {
        evaluations_clone.fetch_add(1, Ordering::SeqCst);
        vm.age.get() >= 0 && vm.age.get() < 100
    });

    assert_eq!(evaluations.load(Ordering::SeqCst), 1);

    vm.age.set(60);
    assert_eq!(evaluations.load(Ordering::SeqCst), 2);
}

#[test]
#[serial]
fn teardown_restores_a_pristine_process_state() {
    let vm = Person::new();
    let ctx = for_view_model(&vm);
    ctx.validate(&vm.first_name)
        .unwrap()
        .add_rule(|vm: &Person| !vm.first_name.get().is_empty());

    let field = vm.first_name.field_ref();
    assert!(!is_valid(&field));

    clear_view_model_contexts();
    detach_all();

    // Nothing attached anymore: the field reads as valid by default.
    assert!(is_valid(&field));
    assert!(validity_signal(&field).is_none());

    // Declarations start from scratch afterwards.
    let fresh = Person::new();
    let ctx = for_view_model(&fresh);
    ctx.validate(&fresh.first_name)
        .unwrap()
        .add_rule(|vm: &Person| !vm.first_name.get().is_empty());
    assert!(!is_valid(&fresh.first_name.field_ref()));

    clear_view_model_contexts();
    detach_all();
}
