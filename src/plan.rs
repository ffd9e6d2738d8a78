//! Resolved codec plans.
//!
//! A [`CodecPlan`] is an ordered list of [`PlanStep`]s, one per serialized
//! member of a schema type, in declaration order.
//! Every step carries its resolved codec, count strategy or option table,
//! so executing a plan requires no further lookups.
//!
//! Plans refer to each other by [`PlanId`] within one frozen [`Plans`] arena.
//! This is how recursive and mutually recursive types share one plan.

use alloc::vec::Vec;
use core::fmt;

use ahash::RandomState;
use alembic_schema::{GenerationMode, IntWidth, Name, TypeSchema};
use hashbrown::HashMap;

use crate::{
    codec::Codec,
    resolve::{CollectionSpec, CountStrategy, DiscriminatorPlacement, ElementOp, PolymorphicSpec},
};

/// Index of a plan in its [`Plans`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlanId(pub(crate) usize);

impl PlanId {
    #[inline(always)]
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Value of a step computed from the member it serves
/// instead of being taken from the record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Derived {
    /// Number of elements of the collection at step `target`.
    Count { target: usize, width: IntWidth },

    /// Shared discriminator of the polymorphic step `target`.
    Discriminator { target: usize, width: IntWidth },
}

impl Derived {
    pub fn target(&self) -> usize {
        match *self {
            Derived::Count { target, .. } | Derived::Discriminator { target, .. } => target,
        }
    }

    pub fn width(&self) -> IntWidth {
        match *self {
            Derived::Count { width, .. } | Derived::Discriminator { width, .. } => width,
        }
    }
}

/// Operation of one step.
#[derive(Clone, Debug)]
pub enum StepOp {
    /// Value written with a codec.
    Value(Codec),

    /// Nested record written with another plan.
    Object(PlanId),

    Collection(CollectionSpec),

    /// Polymorphic scalar.
    Polymorphic(PolymorphicSpec),

    Derived(Derived),
}

impl StepOp {
    /// Collection with [`CountStrategy::Unbounded`].
    pub fn is_unbounded(&self) -> bool {
        matches!(
            self,
            StepOp::Collection(CollectionSpec {
                count: CountStrategy::Unbounded,
                ..
            })
        )
    }
}

/// One serialized member.
#[derive(Clone, Debug)]
pub struct PlanStep {
    pub name: Name,

    /// Value is preceded by a presence flag.
    pub optional: bool,

    pub op: StepOp,
}

/// Codec plan of one schema type.
#[derive(Clone, Debug)]
pub struct CodecPlan {
    pub(crate) ty: Name,
    pub(crate) mode: GenerationMode,
    pub(crate) steps: Vec<PlanStep>,
}

impl CodecPlan {
    /// Plan without steps, registered before its body is built.
    pub(crate) fn placeholder(schema: &TypeSchema) -> Self {
        CodecPlan {
            ty: schema.name.clone(),
            mode: schema.mode,
            steps: Vec::new(),
        }
    }

    #[inline]
    pub fn ty(&self) -> &Name {
        &self.ty
    }

    /// Generation mode for emitters. Has no effect on the wire.
    #[inline]
    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    #[inline]
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn step(&self, name: &str) -> Option<(usize, &PlanStep)> {
        self.steps.iter().enumerate().find(|(_, step)| step.name == name)
    }

    /// Returns true if the last step consumes input until it is exhausted.
    pub fn ends_unbounded(&self) -> bool {
        self.steps.last().map_or(false, |step| step.op.is_unbounded())
    }
}

/// Frozen set of plans.
///
/// Plans are immutable once frozen and can be shared between threads.
#[derive(Clone, Debug, Default)]
pub struct Plans {
    plans: Vec<CodecPlan>,
    index: HashMap<Name, PlanId, RandomState>,
}

impl Plans {
    pub(crate) fn new(plans: Vec<CodecPlan>, index: HashMap<Name, PlanId, RandomState>) -> Self {
        Plans { plans, index }
    }

    /// Returns plan of the named type.
    pub fn get(&self, ty: &str) -> Option<PlanRef<'_>> {
        self.index.get(ty).map(|&id| self.resolve(id))
    }

    pub fn id(&self, ty: &str) -> Option<PlanId> {
        self.index.get(ty).copied()
    }

    /// Returns plan with the given id.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this arena.
    #[inline]
    pub fn resolve(&self, id: PlanId) -> PlanRef<'_> {
        assert!(id.0 < self.plans.len(), "plan id out of bounds");
        PlanRef { plans: self, id }
    }

    /// Plans in build order.
    pub fn iter(&self) -> impl Iterator<Item = PlanRef<'_>> + '_ {
        (0..self.plans.len()).map(move |idx| PlanRef {
            plans: self,
            id: PlanId(idx),
        })
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

impl fmt::Display for Plans {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, plan) in self.iter().enumerate() {
            if idx > 0 {
                f.write_str("\n")?;
            }
            fmt::Display::fmt(&plan, f)?;
        }
        Ok(())
    }
}

/// Plan together with the arena it belongs to.
#[derive(Clone, Copy)]
pub struct PlanRef<'a> {
    plans: &'a Plans,
    id: PlanId,
}

impl<'a> PlanRef<'a> {
    #[inline]
    pub fn id(&self) -> PlanId {
        self.id
    }

    #[inline]
    pub fn plan(&self) -> &'a CodecPlan {
        &self.plans.plans[self.id.0]
    }

    #[inline]
    pub fn ty(&self) -> &'a Name {
        &self.plan().ty
    }

    #[inline]
    pub fn steps(&self) -> &'a [PlanStep] {
        &self.plan().steps
    }

    /// Returns another plan of the same arena.
    #[inline]
    pub fn resolve(&self, id: PlanId) -> PlanRef<'a> {
        self.plans.resolve(id)
    }

    #[inline]
    pub fn plans(&self) -> &'a Plans {
        self.plans
    }
}

impl fmt::Debug for PlanRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanRef")
            .field("id", &self.id)
            .field("ty", self.ty())
            .finish()
    }
}

impl fmt::Display for PlanRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plan = self.plan();
        let mode = match plan.mode {
            GenerationMode::Monolithic => "monolithic",
            GenerationMode::Separate => "separate",
        };
        writeln!(f, "{} ({}) {{", plan.ty, mode)?;
        for step in &plan.steps {
            let flag = if step.optional { "?" } else { "" };
            write!(f, "    {}{}: ", step.name, flag)?;
            self.fmt_op(&step.op, f)?;
            f.write_str(",\n")?;
        }
        f.write_str("}")
    }
}

impl PlanRef<'_> {
    fn fmt_op(&self, op: &StepOp, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match op {
            StepOp::Value(codec) => write!(f, "{}", codec),
            StepOp::Object(id) => write!(f, "{}", self.resolve(*id).ty()),
            StepOp::Polymorphic(spec) => self.fmt_polymorphic(spec, f),
            StepOp::Collection(spec) => {
                f.write_str("[")?;
                match &spec.element {
                    ElementOp::Value(codec) => write!(f, "{}", codec)?,
                    ElementOp::Object(id) => write!(f, "{}", self.resolve(*id).ty())?,
                    ElementOp::Polymorphic(spec) => self.fmt_polymorphic(spec, f)?,
                }
                match &spec.count {
                    CountStrategy::FixedCount(n) => write!(f, "; {}]", n),
                    CountStrategy::CountField { field, .. } => write!(f, "; count `{}`]", field),
                    CountStrategy::PrefixedCount(width) => write!(f, "; prefix {}]", width),
                    CountStrategy::Unbounded => f.write_str("; ..]"),
                }
            }
            StepOp::Derived(Derived::Count { target, width }) => {
                write!(f, "{} count of `{}`", width, self.steps()[*target].name)
            }
            StepOp::Derived(Derived::Discriminator { target, width }) => {
                write!(f, "{} discriminator of `{}`", width, self.steps()[*target].name)
            }
        }
    }

    fn fmt_polymorphic(&self, spec: &PolymorphicSpec, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &spec.placement {
            DiscriminatorPlacement::SharedField { field } => write!(f, "<`{}`> {{", field)?,
            DiscriminatorPlacement::PerElementPrefix => write!(f, "<{}> {{", spec.discriminator)?,
            DiscriminatorPlacement::ImplicitFromFirstElement => f.write_str("<implicit> {")?,
        }
        for (idx, entry) in spec.table.entries().iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} => {}", entry.discriminator, entry.ty)?;
        }
        f.write_str("}")
    }
}
