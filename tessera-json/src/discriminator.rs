//! Polymorphic decoding: find the discriminator, resolve the concrete type,
//! rewind and decode again as that type.

use tessera_core::{Record, Value};
use tessera_plan::{CodecPlan, DiscriminatorPlan, PlanCache};

use crate::decode::{decode_with_plan, read_slot};
use crate::reader::{Token, TokenReader};
use crate::{CodecOptions, DecodeError, DecodeErrorKind, Result};

pub(crate) fn decode_discriminated<'de, R: TokenReader<'de>>(
    reader: &mut R,
    plan: &CodecPlan,
    disc: &DiscriminatorPlan,
    options: &CodecOptions,
    depth: usize,
) -> Result<Record> {
    let start = reader.checkpoint();
    let value = find_discriminator(reader, plan, disc, options, depth)?;

    let base = plan.decl();
    let concrete = match disc.resolver.resolve(&value) {
        Some(ty) if ty.id() != base.id() && ty.is_subtype_of(base) => ty,
        _ => {
            debug!(
                type_name = plan.type_name(),
                resolver = disc.resolver.name(),
                value = ?value,
                "discriminator: unresolved"
            );
            return Err(DecodeError::new(
                DecodeErrorKind::UnresolvedDiscriminator {
                    type_name: plan.type_name().to_owned(),
                    value: format!("{value:?}"),
                },
                reader.span(),
            )
            .into());
        }
    };
    debug!(
        type_name = plan.type_name(),
        concrete = concrete.name(),
        "discriminator: resolved"
    );

    let concrete_plan = PlanCache::global().get_or_plan(&concrete)?;
    reader.restore(start);
    decode_with_plan(reader, &concrete_plan, options, depth)
}

/// Scan the object's top-level fields for the discriminator and decode it.
fn find_discriminator<'de, R: TokenReader<'de>>(
    reader: &mut R,
    plan: &CodecPlan,
    disc: &DiscriminatorPlan,
    options: &CodecOptions,
    depth: usize,
) -> Result<Value> {
    let token = reader.next_token()?;
    if token != Token::ObjectStart {
        return Err(DecodeError::new(
            DecodeErrorKind::ExpectedObjectStart {
                got: token.kind().describe(),
            },
            reader.span(),
        )
        .into());
    }

    loop {
        match reader.next_token()? {
            Token::FieldName(name) => {
                if disc.matches(&name, options.field_name_case_insensitive) {
                    trace!(type_name = plan.type_name(), field = %name, "discriminator: found");
                    // the discriminator sits one level inside the object
                    return read_slot(reader, &disc.slot, options, depth + 1);
                }
                reader.skip_value()?;
            }
            Token::ObjectEnd | Token::Eof => {
                return Err(DecodeError::new(
                    DecodeErrorKind::MissingDiscriminator {
                        type_name: plan.type_name().to_owned(),
                        field: disc.slot.wire_name.clone(),
                    },
                    reader.span(),
                )
                .into());
            }
            other => {
                return Err(DecodeError::new(
                    DecodeErrorKind::ExpectedFieldName {
                        got: other.kind().describe(),
                    },
                    reader.span(),
                )
                .into());
            }
        }
    }
}
