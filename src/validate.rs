use alloc::{vec, vec::Vec};

use log::debug;

use crate::{
    error::{Location, SchemaError, SchemaErrorKind, SchemaErrors},
    plan::{CodecPlan, PlanId, PlanStep, StepOp},
    resolve::{CollectionSpec, CountStrategy, DiscriminatorPlacement, ElementOp, PolymorphicSpec},
};

/// Collects schema errors and runs structural checks over built plans.
///
/// Errors found while resolving are reported here as well,
/// so that one pass reports every problem.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<SchemaError>,
}

impl Validator {
    pub fn new() -> Self {
        Validator::default()
    }

    pub fn report(&mut self, location: Location, kind: SchemaErrorKind) {
        self.errors.push(SchemaError::new(location, kind));
    }

    /// Errors reported so far.
    pub fn errors(&self) -> &[SchemaError] {
        &self.errors
    }

    /// Checks placement of unbounded collections.
    ///
    /// An unbounded collection consumes all remaining input, so it must be
    /// the last member, and a type ending with one may only be referenced
    /// by the last member of another type and never as a collection element.
    ///
    /// Elements of an unbounded collection must occupy at least one byte.
    pub fn check(&mut self, plans: &[CodecPlan]) {
        let open = open_ended(plans);
        let empty = zero_width(plans);

        for plan in plans {
            let last = plan.steps.len().saturating_sub(1);

            for (idx, step) in plan.steps.iter().enumerate() {
                let location = || Location::of_member(&plan.ty, &step.name);

                if idx != last && step.op.is_unbounded() {
                    self.report(location(), SchemaErrorKind::UnboundedNotLast);
                }

                if let StepOp::Collection(CollectionSpec {
                    element,
                    count: CountStrategy::Unbounded,
                }) = &step.op
                {
                    if element_zero_width(element, &empty) {
                        self.report(location(), SchemaErrorKind::ZeroWidthElement);
                    }
                }

                match &step.op {
                    StepOp::Object(id) if idx != last => {
                        self.check_reference(plans, &open, *id, location)
                    }
                    StepOp::Polymorphic(spec) if idx != last => {
                        for entry in spec.table.entries() {
                            self.check_reference(plans, &open, entry.plan, location);
                        }
                    }
                    StepOp::Collection(CollectionSpec { element, .. }) => match element {
                        ElementOp::Object(id) => self.check_reference(plans, &open, *id, location),
                        ElementOp::Polymorphic(spec) => {
                            for entry in spec.table.entries() {
                                self.check_reference(plans, &open, entry.plan, location);
                            }
                        }
                        ElementOp::Value(_) => {}
                    },
                    _ => {}
                }
            }
        }
    }

    fn check_reference(
        &mut self,
        plans: &[CodecPlan],
        open: &[bool],
        id: PlanId,
        location: impl Fn() -> Location,
    ) {
        if open[id.0] {
            self.report(
                location(),
                SchemaErrorKind::OpenEndedReference(plans[id.0].ty.clone()),
            );
        }
    }

    pub fn finish(self) -> Result<(), SchemaErrors> {
        debug!("validation found {} schema error(s)", self.errors.len());
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaErrors::new(self.errors))
        }
    }
}

/// Marks plans that consume input until it is exhausted,
/// directly or through their last member.
fn open_ended(plans: &[CodecPlan]) -> Vec<bool> {
    let mut open: Vec<bool> = plans.iter().map(CodecPlan::ends_unbounded).collect();

    // Propagates through last members until nothing changes.
    // Flags only go from false to true.
    loop {
        let mut changed = false;
        for (idx, plan) in plans.iter().enumerate() {
            if open[idx] {
                continue;
            }
            let through_last = match plan.steps.last().map(|step| &step.op) {
                Some(StepOp::Object(id)) => open[id.0],
                Some(StepOp::Polymorphic(spec)) => {
                    spec.table.entries().iter().any(|entry| open[entry.plan.0])
                }
                _ => false,
            };
            if through_last {
                open[idx] = true;
                changed = true;
            }
        }
        if !changed {
            return open;
        }
    }
}

/// Marks plans whose values always encode to zero bytes.
fn zero_width(plans: &[CodecPlan]) -> Vec<bool> {
    let mut empty = vec![false; plans.len()];

    loop {
        let mut changed = false;
        for (idx, plan) in plans.iter().enumerate() {
            if empty[idx] {
                continue;
            }
            if plan.steps.iter().all(|step| step_zero_width(step, &empty)) {
                empty[idx] = true;
                changed = true;
            }
        }
        if !changed {
            return empty;
        }
    }
}

fn step_zero_width(step: &PlanStep, empty: &[bool]) -> bool {
    if step.optional {
        return false;
    }
    match &step.op {
        StepOp::Value(_) | StepOp::Derived(_) => false,
        StepOp::Object(id) => empty[id.0],
        StepOp::Polymorphic(spec) => polymorphic_zero_width(spec, empty),
        StepOp::Collection(CollectionSpec { element, count }) => match count {
            CountStrategy::FixedCount(0) => true,
            CountStrategy::PrefixedCount(_) => false,
            _ => element_zero_width(element, empty),
        },
    }
}

fn element_zero_width(element: &ElementOp, empty: &[bool]) -> bool {
    match element {
        ElementOp::Value(_) => false,
        ElementOp::Object(id) => empty[id.0],
        ElementOp::Polymorphic(spec) => polymorphic_zero_width(spec, empty),
    }
}

fn polymorphic_zero_width(spec: &PolymorphicSpec, empty: &[bool]) -> bool {
    match spec.placement {
        DiscriminatorPlacement::PerElementPrefix => false,
        _ => spec.table.entries().iter().all(|entry| empty[entry.plan.0]),
    }
}
