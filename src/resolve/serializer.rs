use alembic_schema::{
    ElementKind, MemberKind, MemberSchema, Name, SchemaSet, Scope, TypeSchema, ValueType,
};

use crate::{codec::Codec, error::SchemaErrorKind, resolve::GlobalBindings};

/// Outcome of serializer resolution for one member.
#[derive(Clone, Debug)]
pub enum Resolved {
    /// Value is written with this codec.
    /// `scope` is `None` for built-in codecs.
    Codec { codec: Codec, scope: Option<Scope> },

    /// Value is written with the plan of the named schema type.
    Schema(Name),
}

impl Resolved {
    pub fn scope(&self) -> Option<Scope> {
        match self {
            Resolved::Codec { scope, .. } => *scope,
            Resolved::Schema(_) => None,
        }
    }
}

/// Picks the codec for a member's value type.
///
/// Bindings are looked up at member scope, then type scope of `enclosing`,
/// then in `globals`. Without any binding, built-in codecs are used for
/// well-known value types and schema types are written with their own plan.
/// For collections this resolves the element codec.
pub fn resolve_codec(
    member: &MemberSchema,
    enclosing: &TypeSchema,
    schemas: &SchemaSet,
    globals: &GlobalBindings,
) -> Result<Resolved, SchemaErrorKind> {
    let value_type = &member.value_type;

    let bound = member
        .serializer
        .as_ref()
        .map(|codec| (codec, Scope::Member))
        .or_else(|| {
            enclosing
                .type_binding(value_type)
                .map(|codec| (codec, Scope::Type))
        })
        .or_else(|| {
            globals
                .default_for(value_type)
                .map(|codec| (codec, Scope::Global))
        });

    if let Some((name, scope)) = bound {
        let codec = globals
            .codec(name)
            .ok_or_else(|| SchemaErrorKind::UnregisteredCodec(name.clone()))?;
        return Ok(Resolved::Codec {
            codec: Codec::custom(name.clone(), codec.clone()),
            scope: Some(scope),
        });
    }

    if let Some(codec) = Codec::builtin(value_type) {
        return Ok(Resolved::Codec { codec, scope: None });
    }

    match value_type {
        // Structural members are linked to plans, missing schemas
        // are reported when linking.
        ValueType::Named(name) if is_structural(&member.kind) || schemas.contains(name) => {
            Ok(Resolved::Schema(name.clone()))
        }
        _ => Err(SchemaErrorKind::UnresolvedCodec(value_type.clone())),
    }
}

fn is_structural(kind: &MemberKind) -> bool {
    match kind {
        MemberKind::Primitive => false,
        MemberKind::NestedObject | MemberKind::PolymorphicScalar(_) => true,
        MemberKind::Collection(options) => !matches!(options.element, ElementKind::Primitive),
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;

    use alembic_schema::{IntWidth, MemberSchema, SchemaSet, Scope, TypeSchema, ValueType};

    use super::*;
    use crate::{buffer::Sink, codec::ValueCodec, error::CodecErrorKind, reader::Reader, value::Value};

    struct Fixed(u8);

    impl ValueCodec for Fixed {
        fn size(&self, _value: &Value) -> Result<usize, CodecErrorKind> {
            Ok(1)
        }

        fn write(&self, _value: &Value, sink: &mut dyn Sink) -> Result<(), CodecErrorKind> {
            sink.write_bytes(&[self.0])
        }

        fn read(&self, reader: &mut Reader<'_>) -> Result<Value, CodecErrorKind> {
            reader.read_byte().map(Value::from)
        }
    }

    fn globals() -> GlobalBindings {
        let mut globals = GlobalBindings::new();
        globals
            .register("member", Arc::new(Fixed(1)))
            .register("type", Arc::new(Fixed(2)))
            .register("global", Arc::new(Fixed(3)))
            .bind(ValueType::Int(IntWidth::I32), "global");
        globals
    }

    fn resolved_name(resolved: Resolved) -> Option<Name> {
        match resolved {
            Resolved::Codec { codec, .. } => codec.custom_name().cloned(),
            Resolved::Schema(_) => None,
        }
    }

    #[test]
    fn test_precedence_chain() {
        let schemas = SchemaSet::new();
        let mut globals = globals();
        let int = ValueType::Int(IntWidth::I32);

        let with_type = TypeSchema::new("T").with_serializer(int.clone(), "type");
        let without_type = TypeSchema::new("T");
        let member = MemberSchema::primitive("x", int.clone()).with_serializer("member");
        let plain = MemberSchema::primitive("x", int.clone());

        let r = resolve_codec(&member, &with_type, &schemas, &globals).unwrap();
        assert_eq!(r.scope(), Some(Scope::Member));
        assert_eq!(resolved_name(r).unwrap(), "member");

        let r = resolve_codec(&plain, &with_type, &schemas, &globals).unwrap();
        assert_eq!(r.scope(), Some(Scope::Type));
        assert_eq!(resolved_name(r).unwrap(), "type");

        let r = resolve_codec(&plain, &without_type, &schemas, &globals).unwrap();
        assert_eq!(r.scope(), Some(Scope::Global));
        assert_eq!(resolved_name(r).unwrap(), "global");

        globals.unbind(&int);
        let r = resolve_codec(&plain, &without_type, &schemas, &globals).unwrap();
        assert_eq!(r.scope(), None);
        assert!(matches!(
            r,
            Resolved::Codec {
                codec: Codec::Int(IntWidth::I32),
                ..
            }
        ));
    }

    #[test]
    fn test_type_binding_only_for_matching_value_type() {
        let schemas = SchemaSet::new();
        let globals = globals();
        let ty = TypeSchema::new("T").with_serializer(ValueType::Str, "type");
        let member = MemberSchema::primitive("x", ValueType::Int(IntWidth::I32));

        let r = resolve_codec(&member, &ty, &schemas, &globals).unwrap();
        assert_eq!(r.scope(), Some(Scope::Global));
    }

    #[test]
    fn test_unregistered_codec() {
        let schemas = SchemaSet::new();
        let globals = GlobalBindings::new();
        let member = MemberSchema::primitive("x", ValueType::Str).with_serializer("nope");

        assert_eq!(
            resolve_codec(&member, &TypeSchema::new("T"), &schemas, &globals).unwrap_err(),
            SchemaErrorKind::UnregisteredCodec("nope".into())
        );
    }

    #[test]
    fn test_unresolved_named_primitive() {
        let schemas = SchemaSet::new();
        let globals = GlobalBindings::new();
        let member = MemberSchema::primitive("when", ValueType::named("DateTime"));

        assert_eq!(
            resolve_codec(&member, &TypeSchema::new("T"), &schemas, &globals).unwrap_err(),
            SchemaErrorKind::UnresolvedCodec(ValueType::named("DateTime"))
        );
    }

    #[test]
    fn test_nested_resolves_to_schema() {
        let schemas = SchemaSet::new().with(TypeSchema::new("Inner"));
        let globals = GlobalBindings::new();
        let member = MemberSchema::nested("inner", "Inner");

        assert!(matches!(
            resolve_codec(&member, &TypeSchema::new("T"), &schemas, &globals).unwrap(),
            Resolved::Schema(name) if name == "Inner"
        ));
    }
}
