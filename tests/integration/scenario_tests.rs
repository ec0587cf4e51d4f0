//! Shrinking scenarios
//!
//! Each test assembles a small program as real class files, runs a full
//! shrink against the standard library fixture and checks which classes and
//! members survive.

mod support;

use std::collections::{BTreeMap, HashMap};

use jvmshrink::analysis::{AnnotatedClassRules, ExplicitKeepRules, WarningKind};
use jvmshrink::classfile::access;
use jvmshrink::graph::{CounterSet, DependencyKind, ShrinkerGraph};
use jvmshrink::shrinker::{FullRunShrinker, KeepRulesMap, ShrinkerError, ShrinkerOptions, ShrinkerOutcome};
use support::*;

fn main_class(code: Vec<Insn>) -> ClassBuilder {
    ClassBuilder::class("test/Main")
        .default_constructor()
        .method(MethodDef::public_static("main", MAIN, code))
}

fn keep_main() -> KeepRulesMap<String> {
    keep_member("test/Main", &format!("main:{}", MAIN))
}

fn with_return(mut code: Vec<Insn>) -> Vec<Insn> {
    code.push(Insn::Return);
    code
}

// ============================================================================
// Basic reachability
// ============================================================================

#[test]
fn test_single_class_keeps_called_method() {
    let program = vec![ClassBuilder::class("test/Aaa")
        .default_constructor()
        .method(MethodDef::public_static(
            "aaa",
            "()V",
            vec![invoke_static("test/Aaa", "bbb", "()V"), Insn::Return],
        ))
        .method(MethodDef::public_static("bbb", "()V", vec![Insn::Return]))
        .method(MethodDef::public_static("ccc", "()V", vec![Insn::Return]))];

    let outcome = shrink(&program, &keep_member("test/Aaa", "aaa:()V"));

    assert_eq!(kept_classes(&outcome), strings(&["test/Aaa"]));
    assert_eq!(
        kept_members(&outcome, "test/Aaa"),
        Some(strings(&["aaa:()V", "bbb:()V"])),
        "ccc and the unused constructor should be pruned"
    );
    assert!(outcome.warnings.is_empty());
}

#[test]
fn test_virtual_call_within_class() {
    let program = vec![ClassBuilder::class("test/Aaa")
        .default_constructor()
        .method(MethodDef::public(
            "aaa",
            "()V",
            vec![Insn::Aload0, invoke_virtual("test/Aaa", "bbb", "()V"), Insn::Return],
        ))
        .method(MethodDef::public("bbb", "()V", vec![Insn::Return]))
        .method(MethodDef::public("ccc", "()V", vec![Insn::Return]))];

    let outcome = shrink(&program, &keep_member("test/Aaa", "aaa:()V"));

    assert_eq!(
        kept_members(&outcome, "test/Aaa"),
        Some(strings(&["aaa:()V", "bbb:()V"]))
    );
}

#[test]
fn test_unreferenced_classes_are_pruned() {
    let program = vec![
        main_class(vec![Insn::Return]),
        ClassBuilder::class("test/Unused").default_constructor(),
    ];

    let outcome = shrink(&program, &keep_main());

    assert_eq!(kept_classes(&outcome), strings(&["test/Main"]));
    assert_eq!(kept_members(&outcome, "test/Unused"), None);
}

// ============================================================================
// Interfaces and dispatch
// ============================================================================

fn foo_interface() -> ClassBuilder {
    ClassBuilder::interface("test/I").method(MethodDef::abstract_method("foo", "()V"))
}

#[test]
fn test_interface_through_concrete_type_is_pruned() {
    let program = vec![
        foo_interface(),
        ClassBuilder::class("test/Impl")
            .implements("test/I")
            .default_constructor()
            .method(MethodDef::public("foo", "()V", vec![Insn::Return])),
        main_class(with_return(
            [construct("test/Impl"), vec![invoke_virtual("test/Impl", "foo", "()V")]].concat(),
        )),
    ];

    let outcome = shrink(&program, &keep_main());

    assert_eq!(kept_classes(&outcome), strings(&["test/Impl", "test/Main"]));
    assert_eq!(
        kept_members(&outcome, "test/Impl"),
        Some(strings(&["<init>:()V", "foo:()V"]))
    );
    assert!(
        outcome
            .retained_interface_names("test/Impl", CounterSet::Shrink)
            .is_empty(),
        "the pruned interface must drop out of the implements list"
    );
}

#[test]
fn test_interface_through_abstract_type_is_kept() {
    let program = vec![
        foo_interface(),
        ClassBuilder::abstract_class("test/Abs")
            .implements("test/I")
            .default_constructor(),
        ClassBuilder::class("test/Impl")
            .extends("test/Abs")
            .default_constructor()
            .method(MethodDef::public("foo", "()V", vec![Insn::Return])),
        main_class(with_return(
            [construct("test/Impl"), vec![invoke_virtual("test/Abs", "foo", "()V")]].concat(),
        )),
    ];

    let outcome = shrink(&program, &keep_main());

    assert_eq!(
        kept_classes(&outcome),
        strings(&["test/Abs", "test/I", "test/Impl", "test/Main"])
    );
    assert_eq!(kept_members(&outcome, "test/I"), Some(strings(&["foo:()V"])));
    assert_eq!(
        kept_members(&outcome, "test/Impl"),
        Some(strings(&["<init>:()V", "foo:()V"]))
    );
    assert_eq!(
        outcome.retained_interface_names("test/Abs", CounterSet::Shrink),
        vec!["test/I".to_string()]
    );
}

#[test]
fn test_interface_call_keeps_implementation_of_instantiated_class() {
    let program = vec![
        foo_interface(),
        ClassBuilder::class("test/Used")
            .implements("test/I")
            .default_constructor()
            .method(MethodDef::public("foo", "()V", vec![Insn::Return])),
        ClassBuilder::class("test/NeverCreated")
            .implements("test/I")
            .default_constructor()
            .method(MethodDef::public("foo", "()V", vec![Insn::Return])),
        main_class(with_return(
            [construct("test/Used"), vec![invoke_interface("test/I", "foo", "()V")]].concat(),
        )),
    ];

    let outcome = shrink(&program, &keep_main());

    assert_eq!(
        kept_classes(&outcome),
        strings(&["test/I", "test/Main", "test/Used"])
    );
    assert_eq!(
        kept_members(&outcome, "test/Used"),
        Some(strings(&["<init>:()V", "foo:()V"]))
    );
    assert_eq!(kept_members(&outcome, "test/NeverCreated"), None);
}

#[test]
fn test_default_method_kept_through_implementing_class() {
    let program = vec![
        ClassBuilder::interface("test/Greeter")
            .method(MethodDef::public("greet", "()V", vec![Insn::Return])),
        ClassBuilder::class("test/Polite")
            .implements("test/Greeter")
            .default_constructor(),
        main_class(with_return(
            [
                construct("test/Polite"),
                vec![invoke_interface("test/Greeter", "greet", "()V")],
            ]
            .concat(),
        )),
    ];

    let outcome = shrink(&program, &keep_main());

    assert_eq!(
        kept_members(&outcome, "test/Greeter"),
        Some(strings(&["greet:()V"]))
    );
    assert_eq!(
        outcome.retained_interface_names("test/Polite", CounterSet::Shrink),
        vec!["test/Greeter".to_string()]
    );
}

#[test]
fn test_subinterface_kept_when_implementer_and_parent_are_kept() {
    let program = vec![
        foo_interface(),
        ClassBuilder::interface("test/J").implements("test/I"),
        ClassBuilder::class("test/Impl")
            .implements("test/J")
            .default_constructor()
            .method(MethodDef::public("foo", "()V", vec![Insn::Return])),
        main_class(with_return(
            [construct("test/Impl"), vec![invoke_interface("test/I", "foo", "()V")]].concat(),
        )),
    ];

    let outcome = shrink(&program, &keep_main());

    assert!(kept_classes(&outcome).contains(&"test/J".to_string()));
    assert_eq!(
        outcome.retained_interface_names("test/Impl", CounterSet::Shrink),
        vec!["test/J".to_string()]
    );
}

/// Two interfaces declaring `m`, one class implementing both, and a `Main`
/// with one static entry point per way of using them
fn overridden_methods_program() -> Vec<ClassBuilder> {
    let call = |owner: &str, interface: bool| {
        let call = if interface {
            invoke_interface(owner, "m", "()V")
        } else {
            invoke_virtual(owner, "m", "()V")
        };
        vec![Insn::Aload0, call, Insn::Return]
    };
    vec![
        ClassBuilder::interface("test/InterfaceOne").method(MethodDef::abstract_method("m", "()V")),
        ClassBuilder::interface("test/InterfaceTwo").method(MethodDef::abstract_method("m", "()V")),
        ClassBuilder::class("test/Implementation")
            .implements("test/InterfaceOne")
            .implements("test/InterfaceTwo")
            .default_constructor()
            .method(MethodDef::public("m", "()V", vec![Insn::Return])),
        ClassBuilder::class("test/Main")
            .method(MethodDef::public_static(
                "buildImplementation",
                "()V",
                with_return([construct("test/Implementation"), vec![Insn::Pop]].concat()),
            ))
            .method(MethodDef::public_static(
                "useInterfaceOne",
                "(Ltest/InterfaceOne;)V",
                call("test/InterfaceOne", true),
            ))
            .method(MethodDef::public_static(
                "useInterfaceTwo",
                "(Ltest/InterfaceTwo;)V",
                call("test/InterfaceTwo", true),
            ))
            .method(MethodDef::public_static(
                "useImplementation",
                "(Ltest/Implementation;)V",
                call("test/Implementation", false),
            )),
    ]
}

fn shrink_overridden_methods(entry_points: &[&str]) -> ShrinkerOutcome<String> {
    let keep = entry_points
        .iter()
        .fold(ExplicitKeepRules::new(), |rules, member| rules.keep_member("test/Main", *member));
    shrink(&overridden_methods_program(), &rules(keep))
}

#[test]
fn test_overridden_method_not_used() {
    let outcome = shrink_overridden_methods(&["buildImplementation:()V"]);

    assert_eq!(kept_members(&outcome, "test/InterfaceOne"), None);
    assert_eq!(kept_members(&outcome, "test/InterfaceTwo"), None);
    assert_eq!(
        kept_members(&outcome, "test/Implementation"),
        Some(strings(&["<init>:()V"]))
    );
}

#[test]
fn test_overridden_method_class_not_used() {
    let outcome = shrink_overridden_methods(&[
        "useInterfaceOne:(Ltest/InterfaceOne;)V",
        "useInterfaceTwo:(Ltest/InterfaceTwo;)V",
    ]);

    assert_eq!(kept_members(&outcome, "test/InterfaceOne"), Some(strings(&["m:()V"])));
    assert_eq!(kept_members(&outcome, "test/InterfaceTwo"), Some(strings(&["m:()V"])));
    assert_eq!(kept_members(&outcome, "test/Implementation"), None);
}

#[test]
fn test_overridden_method_through_first_interface() {
    let outcome = shrink_overridden_methods(&[
        "useInterfaceOne:(Ltest/InterfaceOne;)V",
        "buildImplementation:()V",
    ]);

    assert_eq!(kept_members(&outcome, "test/InterfaceOne"), Some(strings(&["m:()V"])));
    assert_eq!(kept_members(&outcome, "test/InterfaceTwo"), None);
    assert_eq!(
        kept_members(&outcome, "test/Implementation"),
        Some(strings(&["<init>:()V", "m:()V"]))
    );
    assert_eq!(
        outcome.retained_interface_names("test/Implementation", CounterSet::Shrink),
        vec!["test/InterfaceOne".to_string()]
    );
}

#[test]
fn test_overridden_method_through_second_interface() {
    let outcome = shrink_overridden_methods(&[
        "useInterfaceTwo:(Ltest/InterfaceTwo;)V",
        "buildImplementation:()V",
    ]);

    assert_eq!(kept_members(&outcome, "test/InterfaceOne"), None);
    assert_eq!(kept_members(&outcome, "test/InterfaceTwo"), Some(strings(&["m:()V"])));
    assert_eq!(
        kept_members(&outcome, "test/Implementation"),
        Some(strings(&["<init>:()V", "m:()V"]))
    );
}

#[test]
fn test_overridden_method_through_both_interfaces() {
    let outcome = shrink_overridden_methods(&[
        "useInterfaceOne:(Ltest/InterfaceOne;)V",
        "useInterfaceTwo:(Ltest/InterfaceTwo;)V",
        "buildImplementation:()V",
    ]);

    assert_eq!(kept_members(&outcome, "test/InterfaceOne"), Some(strings(&["m:()V"])));
    assert_eq!(kept_members(&outcome, "test/InterfaceTwo"), Some(strings(&["m:()V"])));
    assert_eq!(
        kept_members(&outcome, "test/Implementation"),
        Some(strings(&["<init>:()V", "m:()V"]))
    );
}

#[test]
fn test_overridden_method_through_class_only() {
    let outcome = shrink_overridden_methods(&[
        "useImplementation:(Ltest/Implementation;)V",
        "buildImplementation:()V",
    ]);

    assert_eq!(kept_members(&outcome, "test/InterfaceOne"), None);
    assert_eq!(kept_members(&outcome, "test/InterfaceTwo"), None);
    assert_eq!(
        kept_members(&outcome, "test/Implementation"),
        Some(strings(&["<init>:()V", "m:()V"]))
    );
    assert!(outcome
        .retained_interface_names("test/Implementation", CounterSet::Shrink)
        .is_empty());
}

const DO_SOMETHING: &str = "(Ljava/lang/Object;)V";

/// `ImplementationFromSuperclass` implements `MyInterface` with a method it inherits
fn inherited_implementation_program() -> Vec<ClassBuilder> {
    vec![
        ClassBuilder::interface("test/MyInterface")
            .method(MethodDef::abstract_method("doSomething", DO_SOMETHING)),
        ClassBuilder::class("test/MyImpl")
            .implements("test/MyInterface")
            .default_constructor()
            .method(MethodDef::public("doSomething", DO_SOMETHING, vec![Insn::Return])),
        ClassBuilder::class("test/DoesSomething")
            .default_constructor()
            .method(MethodDef::public("doSomething", DO_SOMETHING, vec![Insn::Return])),
        ClassBuilder::class("test/ImplementationFromSuperclass")
            .extends("test/DoesSomething")
            .implements("test/MyInterface")
            .default_constructor(),
        ClassBuilder::class("test/Main")
            .method(MethodDef::public_static(
                "useMyInterface",
                "(Ltest/MyInterface;)V",
                vec![
                    Insn::Aload0,
                    Insn::AconstNull,
                    invoke_interface("test/MyInterface", "doSomething", DO_SOMETHING),
                    Insn::Return,
                ],
            ))
            .method(MethodDef::public_static(
                "useImplementationFromSuperclass",
                "(Ltest/ImplementationFromSuperclass;)V",
                vec![
                    Insn::Aload0,
                    Insn::AconstNull,
                    invoke_virtual("test/ImplementationFromSuperclass", "doSomething", DO_SOMETHING),
                    Insn::Return,
                ],
            )),
    ]
}

#[test]
fn test_interface_implemented_by_inherited_method() {
    let outcome = shrink(
        &inherited_implementation_program(),
        &rules(
            ExplicitKeepRules::new()
                .keep_member("test/Main", "useImplementationFromSuperclass:(Ltest/ImplementationFromSuperclass;)V")
                .keep_member("test/Main", "useMyInterface:(Ltest/MyInterface;)V"),
        ),
    );

    assert_eq!(kept_members(&outcome, "test/ImplementationFromSuperclass"), Some(Vec::new()));
    assert_eq!(
        kept_members(&outcome, "test/MyInterface"),
        Some(strings(&["doSomething:(Ljava/lang/Object;)V"]))
    );
    assert_eq!(
        kept_members(&outcome, "test/DoesSomething"),
        Some(strings(&["doSomething:(Ljava/lang/Object;)V"]))
    );
    assert_eq!(kept_members(&outcome, "test/MyImpl"), None);
    assert_eq!(
        outcome.retained_interface_names("test/ImplementationFromSuperclass", CounterSet::Shrink),
        vec!["test/MyInterface".to_string()]
    );
}

#[test]
fn test_inherited_method_kept_through_interface_call_alone() {
    let outcome = shrink(
        &inherited_implementation_program(),
        &rules(
            ExplicitKeepRules::new()
                .keep_member("test/Main", "useMyInterface:(Ltest/MyInterface;)V")
                .keep_class("test/ImplementationFromSuperclass"),
        ),
    );

    assert_eq!(
        kept_members(&outcome, "test/DoesSomething"),
        Some(strings(&["doSomething:(Ljava/lang/Object;)V"]))
    );
}

/// A program class implementing a library interface, with entry points using it
/// through the library type and through the concrete type
fn char_sequence_program() -> Vec<ClassBuilder> {
    vec![
        ClassBuilder::class("test/MyCharSequence")
            .implements("java/lang/CharSequence")
            .default_constructor()
            .method(MethodDef::public("length", "()I", vec![Insn::Iconst0, Insn::Ireturn]))
            .method(MethodDef::public("charAt", "(I)C", vec![Insn::Iconst0, Insn::Ireturn]))
            .method(MethodDef::public(
                "subSequence",
                "(II)Ljava/lang/CharSequence;",
                vec![Insn::AconstNull, Insn::Areturn],
            )),
        foo_interface(),
        ClassBuilder::class("test/MyImpl")
            .implements("test/I")
            .default_constructor()
            .method(MethodDef::public("foo", "()V", vec![Insn::Return])),
        ClassBuilder::class("test/Main")
            .method(MethodDef::public_static(
                "buildMyCharSequence",
                "()Ltest/MyCharSequence;",
                [construct("test/MyCharSequence"), vec![Insn::Areturn]].concat(),
            ))
            .method(MethodDef::public_static(
                "callCharSequence",
                "(Ljava/lang/CharSequence;)V",
                vec![
                    Insn::Aload0,
                    invoke_interface("java/lang/CharSequence", "length", "()I"),
                    Insn::Pop,
                    Insn::Return,
                ],
            ))
            .method(MethodDef::public_static(
                "callMyCharSequence",
                "(Ltest/MyCharSequence;)V",
                vec![
                    Insn::Aload0,
                    invoke_virtual("test/MyCharSequence", "length", "()I"),
                    Insn::Pop,
                    Insn::Return,
                ],
            )),
    ]
}

fn shrink_char_sequence(entry_points: &[&str]) -> ShrinkerOutcome<String> {
    let keep = entry_points
        .iter()
        .fold(ExplicitKeepRules::new(), |rules, member| rules.keep_member("test/Main", *member));
    shrink(&char_sequence_program(), &rules(keep))
}

fn assert_char_sequence_kept(outcome: &ShrinkerOutcome<String>) {
    assert_eq!(
        kept_members(outcome, "test/MyCharSequence"),
        Some(strings(&[
            "<init>:()V",
            "charAt:(I)C",
            "length:()I",
            "subSequence:(II)Ljava/lang/CharSequence;",
        ]))
    );
    assert_eq!(
        outcome.retained_interface_names("test/MyCharSequence", CounterSet::Shrink),
        vec!["java/lang/CharSequence".to_string()]
    );
    assert_eq!(kept_members(outcome, "test/I"), None);
    assert_eq!(kept_members(outcome, "test/MyImpl"), None);
}

#[test]
fn test_library_interface_used_through_library_type() {
    let outcome = shrink_char_sequence(&[
        "buildMyCharSequence:()Ltest/MyCharSequence;",
        "callCharSequence:(Ljava/lang/CharSequence;)V",
    ]);

    assert_char_sequence_kept(&outcome);
    assert!(outcome.warnings.is_empty());
}

#[test]
fn test_library_interface_used_through_concrete_type() {
    let outcome = shrink_char_sequence(&[
        "buildMyCharSequence:()Ltest/MyCharSequence;",
        "callMyCharSequence:(Ltest/MyCharSequence;)V",
    ]);

    assert_char_sequence_kept(&outcome);
}

#[test]
fn test_library_interface_implementer_not_used() {
    let outcome = shrink_char_sequence(&["callCharSequence:(Ljava/lang/CharSequence;)V"]);

    assert_eq!(
        kept_members(&outcome, "test/Main"),
        Some(strings(&["callCharSequence:(Ljava/lang/CharSequence;)V"]))
    );
    assert_eq!(kept_members(&outcome, "test/MyCharSequence"), None);
    assert_eq!(kept_members(&outcome, "test/MyImpl"), None);
}

// ============================================================================
// Inheritance
// ============================================================================

#[test]
fn test_override_kept_only_for_instantiated_subclass() {
    let program = vec![
        ClassBuilder::class("test/Base")
            .default_constructor()
            .method(MethodDef::public("m", "()V", vec![Insn::Return])),
        ClassBuilder::class("test/Sub")
            .extends("test/Base")
            .default_constructor()
            .method(MethodDef::public("m", "()V", vec![Insn::Return])),
        ClassBuilder::class("test/Other")
            .extends("test/Base")
            .default_constructor()
            .method(MethodDef::public("m", "()V", vec![Insn::Return])),
        main_class(with_return(
            [construct("test/Sub"), vec![invoke_virtual("test/Base", "m", "()V")]].concat(),
        )),
    ];

    let outcome = shrink(&program, &keep_main());

    assert_eq!(
        kept_classes(&outcome),
        strings(&["test/Base", "test/Main", "test/Sub"])
    );
    assert_eq!(
        kept_members(&outcome, "test/Base"),
        Some(strings(&["<init>:()V", "m:()V"]))
    );
    assert_eq!(
        kept_members(&outcome, "test/Sub"),
        Some(strings(&["<init>:()V", "m:()V"]))
    );
    assert_eq!(kept_members(&outcome, "test/Other"), None);
}

#[test]
fn test_superclass_kept_with_subclass() {
    let program = vec![
        ClassBuilder::abstract_class("test/Root").default_constructor(),
        ClassBuilder::class("test/Leaf")
            .extends("test/Root")
            .default_constructor(),
    ];

    let outcome = shrink(
        &program,
        &rules(ExplicitKeepRules::new().keep_class("test/Leaf")),
    );

    assert_eq!(kept_classes(&outcome), strings(&["test/Leaf", "test/Root"]));
    assert_eq!(kept_members(&outcome, "test/Root"), Some(Vec::new()));
}

#[test]
fn test_library_overrides_live_with_their_class() {
    let program = vec![
        ClassBuilder::class("test/Named")
            .default_constructor()
            .method(MethodDef::public(
                "toString",
                "()Ljava/lang/String;",
                vec![Insn::AconstNull, Insn::Areturn],
            ))
            .method(MethodDef::public("unused", "()V", vec![Insn::Return])),
        ClassBuilder::class("test/Task")
            .implements("java/lang/Runnable")
            .default_constructor()
            .method(MethodDef::public("run", "()V", vec![Insn::Return]))
            .method(MethodDef::public("helper", "()V", vec![Insn::Return])),
        main_class(with_return(
            [construct("test/Named"), vec![Insn::Pop], construct("test/Task"), vec![Insn::Pop]]
                .concat(),
        )),
    ];

    let outcome = shrink(&program, &keep_main());

    assert_eq!(
        kept_members(&outcome, "test/Named"),
        Some(strings(&["<init>:()V", "toString:()Ljava/lang/String;"]))
    );
    assert_eq!(
        kept_members(&outcome, "test/Task"),
        Some(strings(&["<init>:()V", "run:()V"]))
    );
}

#[test]
fn test_field_resolved_through_superclass() {
    let program = vec![
        ClassBuilder::class("test/Base")
            .default_constructor()
            .field(FieldDef::new(access::PUBLIC, "count", "I"))
            .field(FieldDef::new(access::PUBLIC, "unusedField", "I")),
        ClassBuilder::class("test/Sub")
            .extends("test/Base")
            .default_constructor(),
        main_class(with_return(
            [construct("test/Sub"), vec![get_field("test/Sub", "count", "I"), Insn::Pop]].concat(),
        )),
    ];

    let outcome = shrink(&program, &keep_main());

    assert_eq!(
        kept_members(&outcome, "test/Base"),
        Some(strings(&["<init>:()V", "count:I"]))
    );
}

#[test]
fn test_super_call_keeps_overridden_method() {
    let program = vec![
        ClassBuilder::class("test/Base")
            .default_constructor()
            .method(MethodDef::public("greet", "()V", vec![Insn::Return]))
            .method(MethodDef::public("other", "()V", vec![Insn::Return])),
        ClassBuilder::class("test/Sub")
            .extends("test/Base")
            .default_constructor()
            .method(MethodDef::public(
                "greet",
                "()V",
                vec![Insn::Aload0, invoke_special("test/Base", "greet", "()V"), Insn::Return],
            )),
        main_class(with_return(
            [construct("test/Sub"), vec![invoke_virtual("test/Sub", "greet", "()V")]].concat(),
        )),
    ];

    let outcome = shrink(&program, &keep_main());

    assert_eq!(
        kept_members(&outcome, "test/Base"),
        Some(strings(&["<init>:()V", "greet:()V"]))
    );
}

/// Three-level chain where `Ccc` calls up through `super`
fn super_calls_program() -> Vec<ClassBuilder> {
    let super_call = |name: &str| vec![Insn::Aload0, invoke_special("test/Bbb", name, "()V"), Insn::Return];
    vec![
        ClassBuilder::class("test/Aaa")
            .default_constructor()
            .method(MethodDef::public("onlyInAaa", "()V", vec![Insn::Return]))
            .method(MethodDef::public("overridden", "()V", vec![Insn::Return])),
        ClassBuilder::class("test/Bbb")
            .extends("test/Aaa")
            .default_constructor()
            .method(MethodDef::public("onlyInBbb", "()V", vec![Insn::Return]))
            .method(MethodDef::public("overridden", "()V", vec![Insn::Return])),
        ClassBuilder::class("test/Ccc")
            .extends("test/Bbb")
            .default_constructor()
            .method(MethodDef::public("callBbbMethod", "()V", super_call("onlyInBbb")))
            .method(MethodDef::public("callAaaMethod", "()V", super_call("onlyInAaa")))
            .method(MethodDef::public("callOverriddenMethod", "()V", super_call("overridden"))),
    ]
}

#[test]
fn test_super_call_to_direct_superclass() {
    let outcome = shrink(&super_calls_program(), &keep_member("test/Ccc", "callBbbMethod:()V"));

    assert_eq!(kept_members(&outcome, "test/Aaa"), Some(Vec::new()));
    assert_eq!(kept_members(&outcome, "test/Bbb"), Some(strings(&["onlyInBbb:()V"])));
    assert_eq!(kept_members(&outcome, "test/Ccc"), Some(strings(&["callBbbMethod:()V"])));
}

#[test]
fn test_super_call_to_indirect_superclass() {
    let outcome = shrink(&super_calls_program(), &keep_member("test/Ccc", "callAaaMethod:()V"));

    assert_eq!(kept_members(&outcome, "test/Aaa"), Some(strings(&["onlyInAaa:()V"])));
    assert_eq!(kept_members(&outcome, "test/Bbb"), Some(Vec::new()));
    assert_eq!(kept_members(&outcome, "test/Ccc"), Some(strings(&["callAaaMethod:()V"])));
    assert!(outcome.warnings.is_empty());
}

#[test]
fn test_super_call_binds_to_nearest_declaration() {
    let outcome = shrink(
        &super_calls_program(),
        &keep_member("test/Ccc", "callOverriddenMethod:()V"),
    );

    assert_eq!(kept_members(&outcome, "test/Aaa"), Some(Vec::new()));
    assert_eq!(kept_members(&outcome, "test/Bbb"), Some(strings(&["overridden:()V"])));
    assert_eq!(
        kept_members(&outcome, "test/Ccc"),
        Some(strings(&["callOverriddenMethod:()V"]))
    );
}

#[test]
fn test_interface_method_called_from_abstract_class() {
    let program = vec![
        ClassBuilder::interface("test/MyInterface").method(MethodDef::abstract_method("m", "()V")),
        ClassBuilder::abstract_class("test/AbstractImpl")
            .implements("test/MyInterface")
            .default_constructor()
            .method(MethodDef::public(
                "helper",
                "()V",
                vec![Insn::Aload0, invoke_virtual("test/AbstractImpl", "m", "()V"), Insn::Return],
            )),
        ClassBuilder::class("test/RealImpl")
            .extends("test/AbstractImpl")
            .default_constructor()
            .method(MethodDef::public(
                "main",
                "()V",
                vec![Insn::Aload0, invoke_virtual("test/RealImpl", "helper", "()V"), Insn::Return],
            ))
            .method(MethodDef::public("m", "()V", vec![Insn::Return])),
    ];

    let outcome = shrink(&program, &keep_member("test/RealImpl", "main:()V"));

    assert_eq!(kept_members(&outcome, "test/MyInterface"), Some(strings(&["m:()V"])));
    assert_eq!(
        kept_members(&outcome, "test/RealImpl"),
        Some(strings(&["m:()V", "main:()V"]))
    );
    assert_eq!(
        kept_members(&outcome, "test/AbstractImpl"),
        Some(strings(&["helper:()V"]))
    );
    assert!(outcome.warnings.is_empty());
}

// ============================================================================
// Static state
// ============================================================================

#[test]
fn test_static_field_keeps_initializer_and_prunes_siblings() {
    let program = vec![
        ClassBuilder::class("test/Holder")
            .field(FieldDef::new(access::PUBLIC | access::STATIC, "value", "I"))
            .field(FieldDef::new(access::PUBLIC | access::STATIC, "other", "I"))
            .method(MethodDef::static_initializer(vec![
                Insn::Iconst0,
                put_static("test/Holder", "value", "I"),
                Insn::Return,
            ]))
            .method(MethodDef::public_static("helper", "()V", vec![Insn::Return])),
        main_class(vec![
            get_static("test/Holder", "value", "I"),
            Insn::Pop,
            Insn::Return,
        ]),
    ];

    let outcome = shrink(&program, &keep_main());

    assert_eq!(
        kept_members(&outcome, "test/Holder"),
        Some(strings(&["<clinit>:()V", "value:I"]))
    );
}

#[test]
fn test_initialized_class_rule_runs_static_initializer() {
    let program = vec![ClassBuilder::class("test/Config")
        .method(MethodDef::static_initializer(vec![Insn::Return]))];

    let structure = shrink(
        &program,
        &rules(ExplicitKeepRules::new().keep_class("test/Config")),
    );
    assert_eq!(kept_members(&structure, "test/Config"), Some(Vec::new()));

    let initialized = shrink(
        &program,
        &rules(ExplicitKeepRules::new().keep_initialized_class("test/Config")),
    );
    assert_eq!(
        kept_members(&initialized, "test/Config"),
        Some(strings(&["<clinit>:()V"]))
    );
}

// ============================================================================
// Annotations
// ============================================================================

#[test]
fn test_annotation_keeps_type_and_used_elements() {
    let program = vec![
        ClassBuilder::annotation_type("test/Marker")
            .method(MethodDef::abstract_method("value", "()Ljava/lang/String;"))
            .method(MethodDef::abstract_method("other", "()I")),
        ClassBuilder::class("test/Annotated")
            .annotate(annotation("test/Marker").with("value", Value::Str("x".to_string()))),
    ];

    let outcome = shrink(
        &program,
        &rules(ExplicitKeepRules::new().keep_class("test/Annotated")),
    );

    assert_eq!(
        kept_classes(&outcome),
        strings(&["test/Annotated", "test/Marker"])
    );
    assert_eq!(
        kept_members(&outcome, "test/Marker"),
        Some(strings(&["value:()Ljava/lang/String;"]))
    );
}

#[test]
fn test_enum_annotation_value_keeps_constant_without_initializer() {
    let program = vec![
        ClassBuilder::class("test/Priority")
            .access(access::PUBLIC | access::FINAL | access::ENUM)
            .field(FieldDef::new(
                access::PUBLIC | access::STATIC | access::FINAL | access::ENUM,
                "HIGH",
                "Ltest/Priority;",
            ))
            .field(FieldDef::new(
                access::PUBLIC | access::STATIC | access::FINAL | access::ENUM,
                "LOW",
                "Ltest/Priority;",
            ))
            .method(MethodDef::static_initializer(vec![Insn::Return])),
        ClassBuilder::annotation_type("test/Level")
            .method(MethodDef::abstract_method("value", "()Ltest/Priority;")),
        ClassBuilder::class("test/Task").annotate(annotation("test/Level").with(
            "value",
            Value::Enum {
                type_descriptor: "Ltest/Priority;".to_string(),
                name: "HIGH".to_string(),
            },
        )),
    ];

    let outcome = shrink(
        &program,
        &rules(ExplicitKeepRules::new().keep_class("test/Task")),
    );

    assert_eq!(
        kept_classes(&outcome),
        strings(&["test/Level", "test/Priority", "test/Task"])
    );
    assert_eq!(
        kept_members(&outcome, "test/Priority"),
        Some(strings(&["HIGH:Ltest/Priority;"]))
    );
}

#[test]
fn test_class_and_nested_annotation_values() {
    let program = vec![
        ClassBuilder::annotation_type("test/Uses")
            .method(MethodDef::abstract_method("value", "()Ljava/lang/Class;"))
            .method(MethodDef::abstract_method("inner", "()Ltest/Inner;")),
        ClassBuilder::annotation_type("test/Inner")
            .method(MethodDef::abstract_method("names", "()[Ljava/lang/String;")),
        ClassBuilder::class("test/Referenced").default_constructor(),
        ClassBuilder::class("test/Annotated").annotate(
            annotation("test/Uses")
                .with("value", Value::Class("Ltest/Referenced;".to_string()))
                .with(
                    "inner",
                    Value::Annotation(annotation("test/Inner").with(
                        "names",
                        Value::Array(vec![Value::Str("a".to_string()), Value::Str("b".to_string())]),
                    )),
                ),
        ),
    ];

    let outcome = shrink(
        &program,
        &rules(ExplicitKeepRules::new().keep_class("test/Annotated")),
    );

    assert_eq!(
        kept_classes(&outcome),
        strings(&["test/Annotated", "test/Inner", "test/Referenced", "test/Uses"])
    );
    assert_eq!(kept_members(&outcome, "test/Referenced"), Some(Vec::new()));
    assert_eq!(
        kept_members(&outcome, "test/Inner"),
        Some(strings(&["names:()[Ljava/lang/String;"]))
    );
}

#[test]
fn test_parameter_annotation_kept_with_method() {
    let program = vec![
        ClassBuilder::annotation_type("test/Param"),
        ClassBuilder::class("test/Handler").method(
            MethodDef::public_static("handle", "(Ljava/lang/String;)V", vec![Insn::Return])
                .parameter_annotations(vec![vec![annotation("test/Param")]]),
        ),
    ];

    let outcome = shrink(
        &program,
        &keep_member("test/Handler", "handle:(Ljava/lang/String;)V"),
    );

    assert_eq!(kept_classes(&outcome), strings(&["test/Handler", "test/Param"]));
}

#[test]
fn test_annotated_class_rule() {
    let program = vec![
        ClassBuilder::annotation_type("test/Keep"),
        ClassBuilder::class("test/Marked").annotate(annotation("test/Keep")),
        ClassBuilder::class("test/Plain"),
    ];

    let mut map: KeepRulesMap<String> = BTreeMap::new();
    map.insert(CounterSet::Shrink, Box::new(AnnotatedClassRules::new("test/Keep")));
    let outcome = shrink(&program, &map);

    assert_eq!(kept_classes(&outcome), strings(&["test/Keep", "test/Marked"]));
}

#[test]
fn test_annotations_of_pruned_methods_keep_nothing() {
    let program = vec![
        ClassBuilder::annotation_type("test/MyAnnotation")
            .method(MethodDef::abstract_method("klass", "()[Ljava/lang/Class;"))
            .method(MethodDef::abstract_method("nested", "()Ltest/Nested;")),
        ClassBuilder::annotation_type("test/Nested")
            .method(MethodDef::abstract_method("name", "()Ljava/lang/String;")),
        ClassBuilder::class("test/SomeClass"),
        ClassBuilder::class("test/SomeOtherClass"),
        ClassBuilder::class("test/Main")
            .method(MethodDef::public_static("notAnnotated", "()V", vec![Insn::Return]))
            .method(
                MethodDef::public_static("annotated", "()V", vec![Insn::Return]).annotate(
                    annotation("test/MyAnnotation")
                        .with(
                            "klass",
                            Value::Array(vec![
                                Value::Class("Ltest/SomeClass;".to_string()),
                                Value::Class("Ltest/SomeOtherClass;".to_string()),
                            ]),
                        )
                        .with(
                            "nested",
                            Value::Annotation(
                                annotation("test/Nested").with("name", Value::Str("n".to_string())),
                            ),
                        ),
                ),
            ),
    ];

    let outcome = shrink(&program, &keep_member("test/Main", "notAnnotated:()V"));

    assert_eq!(kept_classes(&outcome), strings(&["test/Main"]));
    assert_eq!(
        kept_members(&outcome, "test/Main"),
        Some(strings(&["notAnnotated:()V"]))
    );
}

// ============================================================================
// Type uses
// ============================================================================

#[test]
fn test_generic_signatures_keep_named_types() {
    let program = vec![
        ClassBuilder::class("test/Item"),
        ClassBuilder::class("test/Element"),
        ClassBuilder::class("test/Box")
            .implements("java/util/Comparator")
            .signature("Ljava/lang/Object;Ljava/util/Comparator<Ltest/Item;>;")
            .method(
                MethodDef::public("first", "()Ljava/lang/Object;", vec![Insn::AconstNull, Insn::Areturn])
                    .signature("()Ltest/Element;"),
            ),
    ];

    let outcome = shrink(&program, &keep_member("test/Box", "first:()Ljava/lang/Object;"));

    assert_eq!(
        kept_classes(&outcome),
        strings(&["test/Box", "test/Element", "test/Item"])
    );
    assert_eq!(kept_members(&outcome, "test/Item"), Some(Vec::new()));
    assert!(outcome.warnings.is_empty());
}

#[test]
fn test_inner_class_keeps_outer_but_not_the_reverse() {
    let program = vec![
        ClassBuilder::class("test/Outer")
            .declares_inner("test/Outer$Inner", "Inner")
            .method(MethodDef::public("run", "()V", vec![Insn::Return])),
        ClassBuilder::class("test/Outer$Inner").inner_of("test/Outer", "Inner"),
        ClassBuilder::class("test/Outer$1").enclosed_by("test/Outer", Some(("run", "()V"))),
    ];

    let inner = shrink(
        &program,
        &rules(ExplicitKeepRules::new().keep_class("test/Outer$Inner")),
    );
    assert_eq!(
        kept_classes(&inner),
        strings(&["test/Outer", "test/Outer$Inner"])
    );

    let anonymous = shrink(
        &program,
        &rules(ExplicitKeepRules::new().keep_class("test/Outer$1")),
    );
    assert_eq!(
        kept_classes(&anonymous),
        strings(&["test/Outer", "test/Outer$1"])
    );

    let outer = shrink(
        &program,
        &rules(ExplicitKeepRules::new().keep_class("test/Outer")),
    );
    assert_eq!(kept_classes(&outer), strings(&["test/Outer"]));
}

#[test]
fn test_type_checks_and_class_literals_keep_structure_only() {
    let program = vec![
        ClassBuilder::class("test/Checked"),
        ClassBuilder::class("test/Literal")
            .method(MethodDef::static_initializer(vec![Insn::Return])),
        ClassBuilder::class("test/Elem").default_constructor(),
        ClassBuilder::class("test/Cast"),
        main_class(vec![
            Insn::AconstNull,
            Insn::InstanceOf("test/Checked".to_string()),
            Insn::Pop,
            Insn::LdcClass("test/Literal".to_string()),
            Insn::Pop,
            Insn::Iconst0,
            Insn::ANewArray("test/Elem".to_string()),
            Insn::Pop,
            Insn::AconstNull,
            Insn::CheckCast("test/Cast".to_string()),
            Insn::Pop,
            Insn::LdcString("test/NotAClass".to_string()),
            Insn::Pop,
            Insn::Return,
        ]),
    ];

    let outcome = shrink(&program, &keep_main());

    assert_eq!(
        kept_classes(&outcome),
        strings(&["test/Cast", "test/Checked", "test/Elem", "test/Literal", "test/Main"])
    );
    assert_eq!(kept_members(&outcome, "test/Literal"), Some(Vec::new()));
    assert_eq!(kept_members(&outcome, "test/Elem"), Some(Vec::new()));
    assert!(outcome.warnings.is_empty());
}

#[test]
fn test_exception_handlers_and_throws_clauses() {
    let program = vec![
        ClassBuilder::class("test/MyError")
            .extends("java/lang/RuntimeException")
            .default_constructor(),
        ClassBuilder::class("test/Declared")
            .extends("java/lang/Exception")
            .default_constructor(),
        ClassBuilder::class("test/Main").method(
            MethodDef::public_static("main", MAIN, vec![Insn::Return])
                .catches(Some("test/MyError"))
                .catches(None)
                .throws("test/Declared"),
        ),
    ];

    let outcome = shrink(&program, &keep_main());

    assert_eq!(
        kept_classes(&outcome),
        strings(&["test/Declared", "test/Main", "test/MyError"])
    );
    assert_eq!(kept_members(&outcome, "test/MyError"), Some(Vec::new()));
}

#[test]
fn test_try_finally_keeps_called_helper() {
    let program = vec![ClassBuilder::class("test/Main")
        .method(
            MethodDef::public_static(
                "main",
                "()V",
                vec![
                    invoke_static("test/Main", "helper", "()V"),
                    invoke_static("test/Main", "helper", "()V"),
                    Insn::Return,
                ],
            )
            .catches(None),
        )
        .method(MethodDef::public_static("helper", "()V", vec![Insn::Return]))
        .method(MethodDef::public_static("unused", "()V", vec![Insn::Return]))];

    let outcome = shrink(&program, &keep_member("test/Main", "main:()V"));

    assert_eq!(kept_classes(&outcome), strings(&["test/Main"]));
    assert_eq!(
        kept_members(&outcome, "test/Main"),
        Some(strings(&["helper:()V", "main:()V"]))
    );
    assert!(outcome.warnings.is_empty());
}

#[test]
fn test_primitive_types_need_nothing() {
    let program = vec![ClassBuilder::class("test/Main")
        .field(FieldDef::new(access::PRIVATE, "flags", "[I"))
        .method(MethodDef::public_static(
            "compute",
            "(I[J)Z",
            vec![
                Insn::Iconst0,
                Insn::NewArray(10),
                Insn::Arraylength,
                Insn::TableSwitch { low: 0, high: 2 },
                Insn::Iconst0,
                Insn::Ireturn,
            ],
        ))];

    let outcome = shrink(&program, &keep_member("test/Main", "compute:(I[J)Z"));

    assert_eq!(kept_classes(&outcome), strings(&["test/Main"]));
    assert_eq!(
        kept_members(&outcome, "test/Main"),
        Some(strings(&["compute:(I[J)Z"]))
    );
    assert!(outcome.warnings.is_empty());
}

#[test]
fn test_invokedynamic_keeps_lambda_body() {
    let metafactory_descriptor = "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodHandle;Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;";
    let program = vec![ClassBuilder::class("test/Main")
        .method(MethodDef::public_static(
            "main",
            MAIN,
            vec![
                Insn::InvokeDynamic {
                    name: "run".to_string(),
                    descriptor: "()Ljava/lang/Runnable;".to_string(),
                    bootstrap: static_handle(
                        "java/lang/invoke/LambdaMetafactory",
                        "metafactory",
                        metafactory_descriptor,
                    ),
                    arguments: vec![
                        BootstrapArg::MethodType("()V".to_string()),
                        BootstrapArg::Handle(static_handle("test/Main", "lambda$main$0", "()V")),
                        BootstrapArg::MethodType("()V".to_string()),
                    ],
                },
                Insn::Pop,
                Insn::Return,
            ],
        ))
        .method(
            MethodDef::new(access::PRIVATE | access::STATIC, "lambda$main$0", "()V")
                .code(vec![Insn::Return]),
        )
        .method(MethodDef::public_static("unused", "()V", vec![Insn::Return]))];

    let outcome = shrink(&program, &keep_main());

    assert_eq!(
        kept_members(&outcome, "test/Main"),
        Some(strings(&["lambda$main$0:()V", &format!("main:{}", MAIN)]))
    );
    assert!(outcome.warnings.is_empty());
}

#[test]
fn test_method_reference_to_instance_method() {
    let program = vec![
        ClassBuilder::class("test/Target")
            .default_constructor()
            .method(MethodDef::public("act", "()V", vec![Insn::Return])),
        ClassBuilder::class("test/Main").method(MethodDef::public_static(
            "main",
            MAIN,
            vec![
                Insn::InvokeDynamic {
                    name: "run".to_string(),
                    descriptor: "(Ltest/Target;)Ljava/lang/Runnable;".to_string(),
                    bootstrap: static_handle("java/lang/invoke/LambdaMetafactory", "metafactory", "()V"),
                    arguments: vec![BootstrapArg::Handle(virtual_handle("test/Target", "act", "()V"))],
                },
                Insn::Pop,
                Insn::Return,
            ],
        )),
    ];

    let outcome = shrink(&program, &keep_main());

    assert_eq!(kept_members(&outcome, "test/Target"), Some(strings(&["act:()V"])));
}

// ============================================================================
// Missing references
// ============================================================================

#[test]
fn test_missing_class_warns_once_per_origin() {
    let program = vec![main_class(vec![
        invoke_static("missing/Gone", "run", "()V"),
        invoke_static("missing/Gone", "run", "()V"),
        Insn::Return,
    ])];

    let outcome = shrink(&program, &keep_main());

    assert_eq!(outcome.warnings.len(), 1);
    let warning = &outcome.warnings[0];
    assert_eq!(warning.kind, WarningKind::UnresolvedReference);
    assert_eq!(warning.symbol, "missing/Gone");
    assert_eq!(
        warning.origin.as_deref(),
        Some(format!("test/Main.main:{}", MAIN).as_str())
    );
    assert_eq!(kept_classes(&outcome), strings(&["test/Main"]));
}

#[test]
fn test_missing_superclass_keeps_every_virtual_method() {
    let program = vec![ClassBuilder::class("test/Orphan")
        .extends("missing/Parent")
        .method(MethodDef::public("run", "()V", vec![Insn::Return]))
        .method(MethodDef::public("maybeOverride", "()V", vec![Insn::Return]))
        .method(MethodDef::new(access::PRIVATE, "secret", "()V").code(vec![Insn::Return]))];

    let outcome = shrink(
        &program,
        &rules(ExplicitKeepRules::new().keep_class("test/Orphan")),
    );

    assert_eq!(
        kept_members(&outcome, "test/Orphan"),
        Some(strings(&["maybeOverride:()V", "run:()V"]))
    );
    assert!(outcome
        .warnings
        .iter()
        .any(|w| w.symbol == "missing/Parent" && w.origin.as_deref() == Some("test/Orphan")));
}

#[test]
fn test_undeclared_member_of_program_class_warns() {
    let program = vec![
        ClassBuilder::class("test/Util")
            .default_constructor()
            .method(MethodDef::public_static("other", "()V", vec![Insn::Return])),
        main_class(with_return(
            [
                vec![invoke_static("test/Util", "nope", "()V")],
                construct("test/Util"),
                vec![invoke_virtual("test/Util", "gone", "()V")],
            ]
            .concat(),
        )),
    ];

    let outcome = shrink(&program, &keep_main());

    let mut symbols: Vec<&str> = outcome.warnings.iter().map(|w| w.symbol.as_str()).collect();
    symbols.sort_unstable();
    assert_eq!(symbols, vec!["test/Util.gone:()V", "test/Util.nope:()V"]);
    assert!(outcome
        .warnings
        .iter()
        .all(|w| w.kind == WarningKind::UnresolvedReference));
    assert_eq!(
        kept_members(&outcome, "test/Util"),
        Some(strings(&["<init>:()V"]))
    );
}

#[test]
fn test_inherited_library_method_resolves_silently() {
    let program = vec![
        ClassBuilder::class("test/Named").default_constructor(),
        main_class(with_return(
            [
                construct("test/Named"),
                vec![invoke_virtual("test/Named", "hashCode", "()I"), Insn::Pop],
            ]
            .concat(),
        )),
    ];

    let outcome = shrink(&program, &keep_main());

    assert!(outcome.warnings.is_empty());
}

#[test]
fn test_run_without_library_keeps_only_used_methods() {
    let program = vec![
        foo_interface(),
        ClassBuilder::class("test/Impl")
            .implements("test/I")
            .default_constructor()
            .method(MethodDef::public("foo", "()V", vec![Insn::Return])),
        main_class(with_return([construct("test/Impl"), vec![Insn::Pop]].concat())),
    ];
    let inputs: Vec<_> = program.iter().map(ClassBuilder::input).collect();

    let outcome = FullRunShrinker::new(ShrinkerOptions::default().with_threads(2))
        .run(&inputs, &[], &keep_main())
        .expect("shrinker run failed");

    assert_eq!(
        kept_members(&outcome, "test/Impl"),
        Some(strings(&["<init>:()V"]))
    );
    assert_eq!(kept_members(&outcome, "test/I"), None);
    assert!(outcome.warnings.iter().any(|w| w.symbol == "java/lang/Object"));
}

#[test]
fn test_reference_to_absent_platform_class_warns() {
    let program = vec![ClassBuilder::class("test/Main").method(MethodDef::public_static(
        "main",
        "()V",
        vec![
            invoke_static("sun/misc/Unsafe", "getUnsafe", "()Lsun/misc/Unsafe;"),
            Insn::Pop,
            Insn::Return,
        ],
    ))];

    let outcome = shrink(&program, &keep_member("test/Main", "main:()V"));

    assert_eq!(kept_members(&outcome, "test/Main"), Some(strings(&["main:()V"])));
    assert!(outcome.warnings.iter().any(|w| w.symbol == "sun/misc/Unsafe"));
}

#[test]
fn test_absent_library_interface_keeps_implementing_methods() {
    let transform = "(Ljava/lang/ClassLoader;Ljava/lang/String;Ljava/lang/Class;Ljava/security/ProtectionDomain;[B)[B";
    let program = vec![ClassBuilder::class("test/Main")
        .implements("java/lang/instrument/ClassFileTransformer")
        .method(MethodDef::public_static("main", "()V", vec![Insn::Return]))
        .method(MethodDef::public("transform", transform, vec![Insn::AconstNull, Insn::Areturn]))];

    let outcome = shrink(&program, &keep_member("test/Main", "main:()V"));

    let transform_member = format!("transform:{}", transform);
    assert_eq!(
        kept_members(&outcome, "test/Main"),
        Some(strings(&["main:()V", transform_member.as_str()]))
    );
    assert_eq!(
        outcome.retained_interface_names("test/Main", CounterSet::Shrink),
        vec!["java/lang/instrument/ClassFileTransformer".to_string()]
    );
    assert!(!outcome.warnings.is_empty());
}

#[test]
fn test_keep_rule_for_missing_symbol_warns() {
    let program = vec![main_class(vec![Insn::Return])];

    let outcome = shrink(
        &program,
        &rules(ExplicitKeepRules::new().keep_class("test/Nowhere")),
    );

    assert!(kept_classes(&outcome).is_empty());
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].kind, WarningKind::UnresolvedRoot);
}

#[test]
fn test_malformed_input_is_skipped_or_fatal() {
    let mut inputs = vec![main_class(vec![Insn::Return]).input()];
    inputs.push(jvmshrink::graph::ClassInput::new("test/Broken", vec![0xCA, 0xFE]));

    let outcome = FullRunShrinker::new(ShrinkerOptions::default().with_threads(2))
        .run(&inputs, &standard_library(), &keep_main())
        .expect("malformed input should only warn");
    assert_eq!(kept_classes(&outcome), strings(&["test/Main"]));
    assert!(outcome
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::MalformedInput && w.symbol == "test/Broken"));

    let result = FullRunShrinker::new(ShrinkerOptions::default().with_threads(2).fail_fast(true))
        .run(&inputs, &standard_library(), &keep_main());
    match result {
        Err(ShrinkerError::MalformedInput { class, .. }) => assert_eq!(class, "test/Broken"),
        other => panic!("expected a malformed input error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_duplicate_program_class_warns() {
    let main = main_class(vec![Insn::Return]);
    let inputs = vec![main.input(), main.input()];

    let outcome = FullRunShrinker::new(ShrinkerOptions::default())
        .run(&inputs, &standard_library(), &keep_main())
        .expect("shrinker run failed");

    assert!(outcome
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::DuplicateClass && w.symbol == "test/Main"));
}

#[test]
fn test_program_class_shadows_library_class() {
    let shadow = ClassBuilder::class("java/lang/Thread")
        .default_constructor()
        .method(MethodDef::public("start", "()V", vec![Insn::Return]));
    let program = vec![
        shadow,
        main_class(with_return(
            [construct("java/lang/Thread"), vec![invoke_virtual("java/lang/Thread", "start", "()V")]]
                .concat(),
        )),
    ];

    let outcome = shrink(&program, &keep_main());

    assert_eq!(
        kept_members(&outcome, "java/lang/Thread"),
        Some(strings(&["<init>:()V", "start:()V"]))
    );
}

// ============================================================================
// Counter sets
// ============================================================================

#[test]
fn test_counter_sets_walk_independently() {
    let program = vec![
        ClassBuilder::class("test/A").method(MethodDef::public_static("a", "()V", vec![Insn::Return])),
        ClassBuilder::class("test/B").method(MethodDef::public_static("b", "()V", vec![Insn::Return])),
    ];

    let mut map: KeepRulesMap<String> = BTreeMap::new();
    map.insert(
        CounterSet::Shrink,
        Box::new(ExplicitKeepRules::new().keep_member("test/A", "a:()V")),
    );
    map.insert(
        CounterSet::TraceReferences,
        Box::new(|_: &ShrinkerGraph<String>| {
            let mut roots = HashMap::new();
            roots.insert("test/B.b:()V".to_string(), DependencyKind::RequiresMember);
            roots
        }),
    );

    let outcome = shrink(&program, &map);

    assert_eq!(outcome.kept_class_names(CounterSet::Shrink), strings(&["test/A"]));
    assert_eq!(
        outcome.kept_class_names(CounterSet::TraceReferences),
        strings(&["test/B"])
    );
    assert_eq!(outcome.stats.walks.len(), 2);
}
