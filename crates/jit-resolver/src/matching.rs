//! Matching a [`MemberSignatureParts`] against resolved runtime members.

use std::collections::BTreeMap;

use tracing::debug;

use jit_types::{strip_generics, Primitive, TypeDesc};

use crate::errors::ResolveError;
use crate::loader::ClassResolver;
use crate::runtime::{ResolvedClass, RuntimeMember};
use crate::signature::MemberSignatureParts;

const IMPLICIT_PACKAGE: &str = "java.lang.";

/// Resolve a source-level type name to a [`TypeDesc`].
///
/// Order: generics substitution, array suffixes (`[]`, `...`), `[`-encodings,
/// primitive names and letters, qualified names as-is, and finally unqualified
/// names through `resolver` with `java.lang` as the implicit package.
pub fn resolve_type_name(
    name: &str,
    generics: &BTreeMap<String, String>,
    resolver: &dyn ClassResolver,
) -> Result<TypeDesc, ResolveError> {
    let mut base = strip_generics(name);
    let mut dims = 0usize;
    loop {
        if let Some(stripped) = base.strip_suffix("[]") {
            base = stripped.trim_end().to_string();
            dims += 1;
        } else if let Some(stripped) = base.strip_suffix("...") {
            base = stripped.trim_end().to_string();
            dims += 1;
        } else {
            break;
        }
    }
    if base.is_empty() {
        return Err(ResolveError::UnknownType(name.to_string()));
    }

    if let Some(bound) = generics.get(&base) {
        base = bound.clone();
    }

    let resolved = if base.starts_with('[') {
        TypeDesc::from_internal_name(&base).map_err(|_| ResolveError::UnknownType(name.to_string()))?
    } else if let Some(primitive) = Primitive::from_name(&base) {
        TypeDesc::Primitive(primitive)
    } else if let Some(primitive) = single_letter_primitive(&base) {
        TypeDesc::Primitive(primitive)
    } else if base.contains('.') || base.contains('/') {
        TypeDesc::class(base.replace('/', "."))
    } else if resolver.class_exists(&base) {
        TypeDesc::class(base)
    } else {
        let implicit = format!("{}{}", IMPLICIT_PACKAGE, base);
        if resolver.class_exists(&implicit) {
            TypeDesc::class(implicit)
        } else {
            return Err(ResolveError::UnknownType(name.to_string()));
        }
    };

    Ok((0..dims).fold(resolved, |ty, _| TypeDesc::array_of(ty)))
}

fn single_letter_primitive(s: &str) -> Option<Primitive> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) => Primitive::from_descriptor(letter),
        _ => None,
    }
}

/// True when `parts` names `member`.
///
/// Resolution failures fail only this candidate and are logged at debug level.
pub fn member_matches(parts: &MemberSignatureParts, member: &RuntimeMember, resolver: &dyn ClassResolver) -> bool {
    if parts.member_name != member.name {
        return false;
    }
    if member.polymorphic_signature {
        return true;
    }
    match try_match(parts, member, resolver) {
        Ok(matched) => matched,
        Err(e) => {
            debug!(member = %member.name, error = %e, "candidate failed to resolve");
            false
        }
    }
}

fn try_match(parts: &MemberSignatureParts, member: &RuntimeMember, resolver: &dyn ClassResolver) -> Result<bool, ResolveError> {
    if parts.is_constructor() != member.is_constructor() {
        return Ok(false);
    }
    if !member.is_constructor() {
        let return_type = resolve_type_name(&parts.return_type, &parts.generics, resolver)?;
        if return_type != member.return_type {
            return Ok(false);
        }
    }
    let given = parts
        .param_types
        .iter()
        .map(|p| resolve_type_name(p, &parts.generics, resolver))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(params_match(&given, &member.params, member.varargs))
}

/// Positional parameter compatibility, scanned from the last parameter back.
///
/// For a variable-arity member the trailing arguments may be either the
/// literal array type or any number of its component type.
pub fn params_match(given: &[TypeDesc], declared: &[TypeDesc], varargs: bool) -> bool {
    let variable = match declared.last() {
        Some(last @ TypeDesc::Array(component)) if varargs => Some((last, component.as_ref())),
        _ => None,
    };

    let Some((array, component)) = variable else {
        return given.len() == declared.len() && given.iter().rev().eq(declared.iter().rev());
    };

    let fixed = declared.len() - 1;
    if given.len() < fixed {
        return false;
    }
    let tail = &given[fixed..];
    let tail_ok = match tail {
        [single] if single == array => true,
        _ => tail.iter().rev().all(|t| t == component),
    };
    tail_ok && given[..fixed].iter().rev().eq(declared[..fixed].iter().rev())
}

/// First member of `class` matching `parts`.
pub fn find_matching_member<'a>(
    parts: &MemberSignatureParts,
    class: &'a ResolvedClass,
    resolver: &dyn ClassResolver,
) -> Option<&'a RuntimeMember> {
    class
        .members
        .iter()
        .find(|member| member_matches(parts, member, resolver))
}
