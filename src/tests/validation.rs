use alloc::{format, string::ToString, vec::Vec};

use crate::{
    build_plans, CollectionOptions, ElementKind, GlobalBindings, IntWidth, Location,
    MemberSchema, Name, PlanBuilder, PolymorphicOptions, SchemaErrorKind, SchemaErrors, SchemaSet,
    Scope, SerializerBinding, TypeSchema, ValueType,
};

const U8: ValueType = ValueType::Int(IntWidth::U8);

fn errors(schemas: &SchemaSet) -> SchemaErrors {
    match build_plans(schemas, &GlobalBindings::new()) {
        Ok(plans) => panic!("expected schema errors, built {}", plans),
        Err(errors) => errors,
    }
}

fn at(ty: &'static str, member: &'static str) -> Location {
    Location::of_member(&Name::from(ty), &Name::from(member))
}

#[test]
fn test_errors_are_accumulated() {
    let schemas = SchemaSet::new()
        .with(TypeSchema::new("Dog"))
        .with(
            TypeSchema::new("Broken")
                .member(MemberSchema::nested("owner", "Person"))
                .member(MemberSchema::collection(
                    "items",
                    U8,
                    CollectionOptions::new(ElementKind::Primitive)
                        .with_fixed_count(2)
                        .with_count_prefix(IntWidth::U8),
                ))
                .member(MemberSchema::polymorphic(
                    "pet",
                    "Animal",
                    PolymorphicOptions::new()
                        .option(1, "Dog")
                        .option(1, "Cat")
                        .with_shared_field("tag"),
                ))
                .member(MemberSchema::primitive("when", ValueType::named("Instant"))),
        );

    let errors = errors(&schemas);
    assert_eq!(errors.len(), 5, "{}", errors);

    assert!(errors.contains(&SchemaErrorKind::MissingSchemaMarker("Person".into())));
    assert!(errors.contains(&SchemaErrorKind::AmbiguousCountStrategy(2)));
    assert!(errors.contains(&SchemaErrorKind::DuplicateDiscriminator(1)));
    assert!(errors.contains(&SchemaErrorKind::InvalidDiscriminatorField {
        field: "tag".into(),
        reason: "does not exist"
    }));
    assert!(errors.contains(&SchemaErrorKind::UnresolvedCodec(ValueType::named("Instant"))));

    let owner = errors
        .iter()
        .find(|error| matches!(error.kind, SchemaErrorKind::MissingSchemaMarker(_)))
        .unwrap();
    assert_eq!(owner.location, at("Broken", "owner"));

    let report = errors.to_string();
    assert!(report.starts_with("5 schema error(s)"));
    assert!(report.contains("Broken.items: 2 count sources configured"));
}

#[test]
fn test_missing_option_schema() {
    let schemas = SchemaSet::new().with(TypeSchema::new("Dog")).with(
        TypeSchema::new("Owner").member(MemberSchema::polymorphic(
            "pet",
            "Animal",
            PolymorphicOptions::new()
                .option(1, "Dog")
                .option(2, "Cat")
                .with_per_element(),
        )),
    );

    let errors = errors(&schemas);
    assert_eq!(errors.len(), 1);
    assert!(errors.contains(&SchemaErrorKind::MissingSchemaMarker("Cat".into())));
}

#[test]
fn test_missing_root() {
    let schemas = SchemaSet::new();
    let globals = GlobalBindings::new();
    let mut builder = PlanBuilder::new(&schemas, &globals);

    assert_eq!(builder.build("Ghost"), None);
    let errors = builder.finish().unwrap_err();
    assert!(errors.contains(&SchemaErrorKind::MissingSchemaMarker("Ghost".into())));
}

#[test]
fn test_implicit_placement_rejected() {
    let schemas = SchemaSet::new().with(TypeSchema::new("Dog")).with(
        TypeSchema::new("Owner").member(MemberSchema::polymorphic(
            "pet",
            "Animal",
            PolymorphicOptions::new().option(1, "Dog"),
        )),
    );

    let errors = errors(&schemas);
    assert!(errors.contains(&SchemaErrorKind::UnsupportedPlacement));
}

#[test]
fn test_unbounded_placement() {
    let unbounded = || {
        MemberSchema::collection(
            "rest",
            U8,
            CollectionOptions::new(ElementKind::Primitive).with_unbounded(),
        )
    };

    let schemas = SchemaSet::new()
        .with(
            TypeSchema::new("Tail")
                .member(MemberSchema::primitive("id", U8))
                .member(unbounded()),
        )
        .with(
            TypeSchema::new("Early")
                .member(unbounded())
                .member(MemberSchema::primitive("id", U8)),
        )
        .with(
            TypeSchema::new("Outer")
                .member(MemberSchema::nested("tail", "Tail"))
                .member(MemberSchema::primitive("id", U8)),
        )
        .with(
            // Referencing from the last member keeps `Wrapper` open ended.
            TypeSchema::new("Wrapper").member(MemberSchema::nested("tail", "Tail")),
        )
        .with(TypeSchema::new("Many").member(MemberSchema::collection(
            "wrappers",
            ValueType::named("Wrapper"),
            CollectionOptions::new(ElementKind::NestedObject),
        )));

    let errors = errors(&schemas);
    assert_eq!(errors.len(), 3, "{}", errors);

    let located = |kind: &SchemaErrorKind| {
        errors
            .iter()
            .find(|error| error.kind == *kind)
            .map(|error| format!("{}", error.location))
    };

    assert_eq!(
        located(&SchemaErrorKind::UnboundedNotLast).as_deref(),
        Some("Early.rest")
    );
    assert_eq!(
        located(&SchemaErrorKind::OpenEndedReference("Tail".into())).as_deref(),
        Some("Outer.tail")
    );
    assert_eq!(
        located(&SchemaErrorKind::OpenEndedReference("Wrapper".into())).as_deref(),
        Some("Many.wrappers")
    );
}

#[test]
fn test_field_serving_two_members() {
    let schemas = SchemaSet::new().with(TypeSchema::new("Dog")).with(
        TypeSchema::new("Pack")
            .member(MemberSchema::primitive("n", U8))
            .member(MemberSchema::collection(
                "dogs",
                ValueType::named("Animal"),
                CollectionOptions::new(ElementKind::PolymorphicElement(
                    PolymorphicOptions::new()
                        .option(1, "Dog")
                        .with_shared_field("n"),
                ))
                .with_count_field("n"),
            )),
    );

    let errors = errors(&schemas);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors.into_vec()[0].kind,
        SchemaErrorKind::InvalidDiscriminatorField {
            field: "n".into(),
            reason: "already serves another member"
        }
    );
}

#[test]
fn test_ignored_members_are_skipped() {
    let schemas = SchemaSet::new().with(
        TypeSchema::new("T")
            .member(MemberSchema::primitive("a", U8))
            .member(MemberSchema::primitive("cache", ValueType::named("Opaque")).ignored()),
    );

    let plans = build_plans(&schemas, &GlobalBindings::new()).unwrap();
    let plan = plans.get("T").unwrap();
    assert_eq!(plan.steps().len(), 1);
    assert_eq!(plan.steps()[0].name, "a");
}

#[test]
fn test_unbounded_zero_width_elements() {
    let unbounded = |name: &'static str, ty: &'static str| {
        MemberSchema::collection(
            name,
            ValueType::named(ty),
            CollectionOptions::new(ElementKind::NestedObject).with_unbounded(),
        )
    };

    let schemas = SchemaSet::new()
        .with(TypeSchema::new("Empty"))
        .with(TypeSchema::new("Hollow").member(MemberSchema::collection(
            "none",
            U8,
            CollectionOptions::new(ElementKind::Primitive).with_fixed_count(0),
        )))
        .with(TypeSchema::new("Byte").member(MemberSchema::primitive("b", U8)))
        .with(TypeSchema::new("A").member(unbounded("items", "Empty")))
        .with(TypeSchema::new("B").member(unbounded("items", "Hollow")))
        .with(TypeSchema::new("C").member(unbounded("items", "Byte")));

    let errors = errors(&schemas);
    assert_eq!(errors.len(), 2, "{}", errors);
    for error in &errors {
        assert_eq!(error.kind, SchemaErrorKind::ZeroWidthElement);
    }
    let locations: Vec<_> = errors.iter().map(|e| e.location.to_string()).collect();
    assert!(locations.contains(&"A.items".to_string()));
    assert!(locations.contains(&"B.items".to_string()));
}

#[test]
fn test_duplicate_member() {
    let schemas = SchemaSet::new().with(
        TypeSchema::new("T")
            .member(MemberSchema::primitive("a", U8))
            .member(MemberSchema::primitive("b", U8))
            .member(MemberSchema::primitive("a", ValueType::Str)),
    );

    let errors = errors(&schemas);
    assert_eq!(errors.len(), 1);
    let error = &errors.into_vec()[0];
    assert_eq!(error.kind, SchemaErrorKind::DuplicateMember("a".into()));
    assert_eq!(error.location, at("T", "a"));
}

#[test]
fn test_misplaced_type_binding() {
    let mut ty = TypeSchema::new("T").member(MemberSchema::primitive("s", ValueType::Str));
    ty.serializers
        .push(SerializerBinding::new(ValueType::Str, "text", Scope::Global));

    let errors = errors(&SchemaSet::new().with(ty));
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors.into_vec()[0].kind,
        SchemaErrorKind::MisplacedBinding("text".into(), "global")
    );
}
