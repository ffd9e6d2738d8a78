use alloc::vec::Vec;

use ahash::RandomState;
use alembic_schema::{ElementKind, MemberKind, MemberSchema, Name, SchemaSet, Scope, TypeSchema};
use hashbrown::HashMap;
use log::{debug, trace};

use crate::{
    error::{Location, SchemaErrorKind, SchemaErrors},
    plan::{CodecPlan, Derived, PlanId, PlanStep, Plans, StepOp},
    resolve::{
        resolve_codec, resolve_count, resolve_polymorphic, CollectionSpec, CountStrategy,
        DiscriminatorPlacement, ElementOp, GlobalBindings, PolymorphicSpec, Resolved,
    },
    validate::Validator,
};

/// Builds codec plans of schema types.
///
/// Plans are built at most once per type. A plan is registered before
/// its steps are built, so recursive references resolve to the plan
/// being built.
///
/// Errors are collected and reported together by [`PlanBuilder::finish`].
pub struct PlanBuilder<'a> {
    schemas: &'a SchemaSet,
    globals: &'a GlobalBindings,
    plans: Vec<CodecPlan>,
    index: HashMap<Name, PlanId, RandomState>,
    validator: Validator,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(schemas: &'a SchemaSet, globals: &'a GlobalBindings) -> Self {
        PlanBuilder {
            schemas,
            globals,
            plans: Vec::new(),
            index: HashMap::default(),
            validator: Validator::new(),
        }
    }

    /// Builds plan of the named type and every type it references.
    ///
    /// Returns `None` if the type has no schema.
    pub fn build(&mut self, ty: &str) -> Option<PlanId> {
        if let Some(&id) = self.index.get(ty) {
            return Some(id);
        }

        let schemas = self.schemas;
        let Some(schema) = schemas.get(ty) else {
            let name = Name::new(ty);
            self.validator.report(
                Location::of_type(&name),
                SchemaErrorKind::MissingSchemaMarker(name.clone()),
            );
            return None;
        };

        debug!("building plan for `{}`", schema.name);

        let id = PlanId(self.plans.len());
        self.plans.push(CodecPlan::placeholder(schema));
        self.index.insert(schema.name.clone(), id);

        let steps = self.build_steps(schema);
        self.plans[id.0].steps = steps;
        Some(id)
    }

    /// Builds plans of every type in the schema set.
    pub fn build_all(&mut self) -> &mut Self {
        let schemas = self.schemas;
        for schema in schemas.iter() {
            self.build(&schema.name);
        }
        self
    }

    /// Validates built plans and freezes them.
    pub fn finish(self) -> Result<Plans, SchemaErrors> {
        let PlanBuilder {
            plans,
            index,
            mut validator,
            ..
        } = self;

        validator.check(&plans);
        validator.finish()?;
        Ok(Plans::new(plans, index))
    }

    fn build_steps(&mut self, schema: &'a TypeSchema) -> Vec<PlanStep> {
        self.check_bindings(schema);

        let mut steps = Vec::with_capacity(schema.members.len());

        for (idx, member) in schema.members.iter().enumerate() {
            let location = Location::of_member(&schema.name, &member.name);

            if schema.members[..idx]
                .iter()
                .any(|earlier| earlier.name == member.name)
            {
                self.validator.report(
                    location,
                    SchemaErrorKind::DuplicateMember(member.name.clone()),
                );
                continue;
            }

            if member.ignored {
                continue;
            }

            if let Some(op) = self.member_op(schema, idx, member, &location) {
                trace!("`{}`: {:?}", location, op);
                steps.push(PlanStep {
                    name: member.name.clone(),
                    optional: member.optional,
                    op,
                });
            }
        }

        self.derive_fields(schema, &mut steps);
        steps
    }

    /// Type bindings must have type scope,
    /// member and global bindings are declared elsewhere.
    fn check_bindings(&mut self, schema: &TypeSchema) {
        for binding in &schema.serializers {
            let scope = match binding.scope {
                Scope::Type => continue,
                Scope::Member => "member",
                Scope::Global => "global",
            };
            self.validator.report(
                Location::of_type(&schema.name),
                SchemaErrorKind::MisplacedBinding(binding.codec.clone(), scope),
            );
        }
    }

    fn member_op(
        &mut self,
        schema: &'a TypeSchema,
        idx: usize,
        member: &'a MemberSchema,
        location: &Location,
    ) -> Option<StepOp> {
        match &member.kind {
            MemberKind::Primitive | MemberKind::NestedObject => {
                match self.resolve_value(schema, member, location)? {
                    ElementOp::Value(codec) => Some(StepOp::Value(codec)),
                    ElementOp::Object(id) => Some(StepOp::Object(id)),
                    ElementOp::Polymorphic(spec) => Some(StepOp::Polymorphic(spec)),
                }
            }
            MemberKind::PolymorphicScalar(options) => {
                let spec = resolve_polymorphic(options, schema, idx, |ty| self.link(ty, location));
                self.report_all(location, spec).map(StepOp::Polymorphic)
            }
            MemberKind::Collection(options) => {
                let count = resolve_count(options, schema, idx)
                    .map_err(|kind| self.validator.report(location.clone(), kind))
                    .ok();

                let element = match &options.element {
                    ElementKind::Primitive | ElementKind::NestedObject => {
                        self.resolve_value(schema, member, location)
                    }
                    ElementKind::PolymorphicElement(options) => {
                        let spec =
                            resolve_polymorphic(options, schema, idx, |ty| self.link(ty, location));
                        self.report_all(location, spec).map(ElementOp::Polymorphic)
                    }
                };

                Some(StepOp::Collection(CollectionSpec {
                    element: element?,
                    count: count?,
                }))
            }
        }
    }

    fn resolve_value(
        &mut self,
        schema: &'a TypeSchema,
        member: &'a MemberSchema,
        location: &Location,
    ) -> Option<ElementOp> {
        match resolve_codec(member, schema, self.schemas, self.globals) {
            Ok(Resolved::Codec { codec, .. }) => Some(ElementOp::Value(codec)),
            Ok(Resolved::Schema(ty)) => self.link(&ty, location).map(ElementOp::Object),
            Err(kind) => {
                self.validator.report(location.clone(), kind);
                None
            }
        }
    }

    /// Returns plan of a referenced type, building it if necessary.
    fn link(&mut self, ty: &Name, location: &Location) -> Option<PlanId> {
        if !self.schemas.contains(ty) {
            self.validator.report(
                location.clone(),
                SchemaErrorKind::MissingSchemaMarker(ty.clone()),
            );
            return None;
        }
        self.build(ty)
    }

    fn report_all<T>(
        &mut self,
        location: &Location,
        result: Result<T, Vec<SchemaErrorKind>>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(kinds) => {
                for kind in kinds {
                    self.validator.report(location.clone(), kind);
                }
                None
            }
        }
    }

    /// Replaces count fields and shared discriminator fields
    /// with steps derived from the member they serve.
    fn derive_fields(&mut self, schema: &TypeSchema, steps: &mut [PlanStep]) {
        for target in 0..steps.len() {
            let mut served = [None, None];

            match &steps[target].op {
                StepOp::Collection(spec) => {
                    if let CountStrategy::CountField { field, width } = &spec.count {
                        served[0] = Some((
                            field.clone(),
                            Derived::Count {
                                target,
                                width: *width,
                            },
                        ));
                    }
                    if let ElementOp::Polymorphic(spec) = &spec.element {
                        served[1] = shared_discriminator(spec, target);
                    }
                }
                StepOp::Polymorphic(spec) => served[0] = shared_discriminator(spec, target),
                _ => {}
            }

            for (field, derived) in served.into_iter().flatten() {
                // Field building may have failed, which is already reported.
                let Some(source) = steps.iter().position(|step| step.name == field) else {
                    continue;
                };

                if let StepOp::Derived(_) = steps[source].op {
                    let reason = "already serves another member";
                    let kind = match derived {
                        Derived::Count { .. } => SchemaErrorKind::InvalidCountField { field, reason },
                        Derived::Discriminator { .. } => {
                            SchemaErrorKind::InvalidDiscriminatorField { field, reason }
                        }
                    };
                    self.validator
                        .report(Location::of_member(&schema.name, &steps[target].name), kind);
                    continue;
                }

                trace!("`{}.{}` is derived: {:?}", schema.name, field, derived);
                steps[source].op = StepOp::Derived(derived);
            }
        }
    }
}

fn shared_discriminator(spec: &PolymorphicSpec, target: usize) -> Option<(Name, Derived)> {
    match &spec.placement {
        DiscriminatorPlacement::SharedField { field } => Some((
            field.clone(),
            Derived::Discriminator {
                target,
                width: spec.discriminator,
            },
        )),
        _ => None,
    }
}
