use alloc::vec::Vec;

use ahash::RandomState;
use alembic_schema::{IntWidth, MemberKind, Name, PolymorphicOptions, TypeSchema};
use hashbrown::{HashMap, HashSet};

use crate::{error::SchemaErrorKind, plan::PlanId};

/// Where discriminators of a polymorphic member are placed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiscriminatorPlacement {
    /// One discriminator in a preceding sibling member
    /// selects the type of the value or of every element.
    SharedField { field: Name },

    /// Every value is preceded by its own discriminator.
    PerElementPrefix,

    /// Neither a shared field nor per-element discriminators were configured.
    /// Rejected by the resolver.
    ImplicitFromFirstElement,
}

impl DiscriminatorPlacement {
    /// Placement as declared, before any validation.
    pub fn declared(options: &PolymorphicOptions) -> Self {
        match &options.shared_field {
            Some(field) => DiscriminatorPlacement::SharedField {
                field: field.clone(),
            },
            None if options.per_element || options.discriminator.is_some() => {
                DiscriminatorPlacement::PerElementPrefix
            }
            None => DiscriminatorPlacement::ImplicitFromFirstElement,
        }
    }
}

/// Concrete option of a polymorphic member.
#[derive(Clone, Debug)]
pub struct TableEntry {
    pub discriminator: u64,
    pub ty: Name,
    pub plan: PlanId,
}

/// Bidirectional discriminator to type table.
#[derive(Clone, Debug, Default)]
pub struct OptionTable {
    entries: Vec<TableEntry>,
    by_discriminator: HashMap<u64, usize, RandomState>,
    by_type: HashMap<Name, usize, RandomState>,
}

impl OptionTable {
    fn insert(&mut self, entry: TableEntry) {
        let idx = self.entries.len();
        self.by_discriminator.insert(entry.discriminator, idx);
        self.by_type.insert(entry.ty.clone(), idx);
        self.entries.push(entry);
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    pub fn by_discriminator(&self, discriminator: u64) -> Option<&TableEntry> {
        self.by_discriminator
            .get(&discriminator)
            .map(|&idx| &self.entries[idx])
    }

    pub fn by_type(&self, ty: &str) -> Option<&TableEntry> {
        self.by_type.get(ty).map(|&idx| &self.entries[idx])
    }

    pub fn first(&self) -> Option<&TableEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolved polymorphic member or element.
#[derive(Clone, Debug)]
pub struct PolymorphicSpec {
    /// Width of the discriminator on the wire.
    pub discriminator: IntWidth,
    pub placement: DiscriminatorPlacement,
    pub table: OptionTable,
}

/// Builds option table and picks discriminator placement of a polymorphic
/// member declared at `position` among the members of `enclosing`.
///
/// `link` returns the plan of a concrete option type, or `None` if the type
/// has no schema. Such options are left out, reporting them is up to `link`.
///
/// All problems found are returned together.
pub fn resolve_polymorphic(
    options: &PolymorphicOptions,
    enclosing: &TypeSchema,
    position: usize,
    mut link: impl FnMut(&Name) -> Option<PlanId>,
) -> Result<PolymorphicSpec, Vec<SchemaErrorKind>> {
    let mut errors = Vec::new();

    if options.options.is_empty() {
        errors.push(SchemaErrorKind::EmptyOptionTable);
    }

    let mut table = OptionTable::default();
    let mut seen_discriminators = HashSet::<u64, RandomState>::default();
    let mut seen_types = HashSet::<&Name, RandomState>::default();

    for (discriminator, ty) in &options.options {
        if !seen_discriminators.insert(*discriminator) {
            errors.push(SchemaErrorKind::DuplicateDiscriminator(*discriminator));
            continue;
        }
        if !seen_types.insert(ty) {
            errors.push(SchemaErrorKind::DuplicateOptionType(ty.clone()));
            continue;
        }
        if let Some(plan) = link(ty) {
            table.insert(TableEntry {
                discriminator: *discriminator,
                ty: ty.clone(),
                plan,
            });
        }
    }

    let placement = DiscriminatorPlacement::declared(options);

    let width = match &placement {
        DiscriminatorPlacement::SharedField { field } => {
            if options.per_element {
                errors.push(SchemaErrorKind::AmbiguousPlacement);
            }
            shared_field_width(options, field, enclosing, position).map_err(|e| errors.push(e))
        }
        DiscriminatorPlacement::PerElementPrefix => match &options.discriminator {
            Some(ty) => ty
                .integral()
                .ok_or_else(|| errors.push(SchemaErrorKind::InvalidDiscriminatorType(ty.clone()))),
            None => {
                let max = options.options.iter().map(|(d, _)| *d).max().unwrap_or(0);
                Ok(IntWidth::smallest_unsigned(max))
            }
        },
        DiscriminatorPlacement::ImplicitFromFirstElement => {
            errors.push(SchemaErrorKind::UnsupportedPlacement);
            Err(())
        }
    };

    if let Ok(width) = width {
        for (discriminator, _) in &options.options {
            if *discriminator > width.max_unsigned() {
                errors.push(SchemaErrorKind::DiscriminatorOutOfRange {
                    discriminator: *discriminator,
                    width,
                });
            }
        }
    }

    match width {
        Ok(width) if errors.is_empty() => Ok(PolymorphicSpec {
            discriminator: width,
            placement,
            table,
        }),
        _ => Err(errors),
    }
}

fn shared_field_width(
    options: &PolymorphicOptions,
    field: &Name,
    enclosing: &TypeSchema,
    position: usize,
) -> Result<IntWidth, SchemaErrorKind> {
    let invalid = |reason| SchemaErrorKind::InvalidDiscriminatorField {
        field: field.clone(),
        reason,
    };

    let (idx, member) = enclosing
        .find_member(field)
        .ok_or_else(|| invalid("does not exist"))?;

    if idx == position {
        return Err(invalid("refers to the polymorphic member itself"));
    }
    if idx > position {
        return Err(invalid("must precede the polymorphic member"));
    }
    if member.ignored {
        return Err(invalid("is ignored"));
    }
    if member.optional {
        return Err(invalid("is optional"));
    }
    if !matches!(member.kind, MemberKind::Primitive) {
        return Err(invalid("is not a primitive member"));
    }

    let width = member
        .value_type
        .integral()
        .ok_or_else(|| invalid("is not an integer or enum"))?;

    match &options.discriminator {
        Some(ty) if *ty != member.value_type => Err(invalid("differs from the discriminator type")),
        _ => Ok(width),
    }
}

#[cfg(test)]
mod tests {
    use alembic_schema::{
        CollectionOptions, ElementKind, IntWidth, MemberSchema, PolymorphicOptions, TypeSchema,
        ValueType,
    };

    use super::*;

    fn link_all(name: &Name) -> Option<PlanId> {
        Some(PlanId(name.len()))
    }

    fn zoo(options: PolymorphicOptions) -> TypeSchema {
        TypeSchema::new("Zoo")
            .member(MemberSchema::primitive("kind", ValueType::Int(IntWidth::U8)))
            .member(MemberSchema::collection(
                "animals",
                ValueType::named("Animal"),
                CollectionOptions::new(ElementKind::PolymorphicElement(options)),
            ))
    }

    fn resolve(options: PolymorphicOptions) -> Result<PolymorphicSpec, Vec<SchemaErrorKind>> {
        let schema = zoo(options.clone());
        resolve_polymorphic(&options, &schema, 1, link_all)
    }

    fn dog_cat() -> PolymorphicOptions {
        PolymorphicOptions::new().option(1, "Dog").option(2, "Cat")
    }

    #[test]
    fn test_bidirectional_table() {
        let spec = resolve(dog_cat().with_per_element()).unwrap();
        assert_eq!(spec.placement, DiscriminatorPlacement::PerElementPrefix);
        assert_eq!(spec.discriminator, IntWidth::U8);
        assert_eq!(spec.table.by_discriminator(2).unwrap().ty, "Cat");
        assert_eq!(spec.table.by_type("Dog").unwrap().discriminator, 1);
        assert!(spec.table.by_discriminator(3).is_none());
        assert!(spec.table.by_type("Cow").is_none());
    }

    #[test]
    fn test_inferred_width() {
        let spec = resolve(dog_cat().option(300, "Cow").with_per_element()).unwrap();
        assert_eq!(spec.discriminator, IntWidth::U16);
    }

    #[test]
    fn test_explicit_width() {
        let spec = resolve(dog_cat().with_discriminator(ValueType::Int(IntWidth::U32))).unwrap();
        assert_eq!(spec.placement, DiscriminatorPlacement::PerElementPrefix);
        assert_eq!(spec.discriminator, IntWidth::U32);
    }

    #[test]
    fn test_shared_field() {
        let spec = resolve(dog_cat().with_shared_field("kind")).unwrap();
        assert_eq!(
            spec.placement,
            DiscriminatorPlacement::SharedField {
                field: "kind".into()
            }
        );
        assert_eq!(spec.discriminator, IntWidth::U8);
    }

    #[test]
    fn test_duplicates_are_all_reported() {
        let errors = resolve(
            dog_cat()
                .option(1, "Cow")
                .option(3, "Dog")
                .with_per_element(),
        )
        .unwrap_err();

        assert_eq!(
            errors,
            [
                SchemaErrorKind::DuplicateDiscriminator(1),
                SchemaErrorKind::DuplicateOptionType("Dog".into()),
            ]
        );
    }

    #[test]
    fn test_implicit_is_unsupported() {
        assert_eq!(
            DiscriminatorPlacement::declared(&dog_cat()),
            DiscriminatorPlacement::ImplicitFromFirstElement
        );
        assert_eq!(
            resolve(dog_cat()).unwrap_err(),
            [SchemaErrorKind::UnsupportedPlacement]
        );
    }

    #[test]
    fn test_ambiguous_placement() {
        assert_eq!(
            resolve(dog_cat().with_shared_field("kind").with_per_element()).unwrap_err(),
            [SchemaErrorKind::AmbiguousPlacement]
        );
    }

    #[test]
    fn test_invalid_shared_field() {
        assert_eq!(
            resolve(dog_cat().with_shared_field("missing")).unwrap_err(),
            [SchemaErrorKind::InvalidDiscriminatorField {
                field: "missing".into(),
                reason: "does not exist"
            }]
        );
    }

    #[test]
    fn test_out_of_range() {
        let errors = resolve(
            dog_cat()
                .option(256, "Cow")
                .with_discriminator(ValueType::Int(IntWidth::U8)),
        )
        .unwrap_err();
        assert_eq!(
            errors,
            [SchemaErrorKind::DiscriminatorOutOfRange {
                discriminator: 256,
                width: IntWidth::U8
            }]
        );
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(
            resolve(PolymorphicOptions::new().with_per_element()).unwrap_err(),
            [SchemaErrorKind::EmptyOptionTable]
        );
    }
}
