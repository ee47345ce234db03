//! GraphQL SDL schema engine.
//!
//! Schemas are parsed with `graphql-parser` and lowered into a small model of
//! named types, their fields, arguments and members. No semantic validation is
//! performed: a document that parses is assumed to have been valid when it was
//! committed. The diff walks both models in name order, so the resulting change
//! list is deterministic.

use crate::core::{Change, ChangeKind, Criticality, SchemaEngine};
use anyhow::{Context, Result};
use graphql_parser::schema::{
    self, Definition, InputValue, Type, TypeDefinition, TypeExtension,
};
use itertools::{EitherOrBoth, Itertools};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// [`SchemaEngine`] for GraphQL SDL documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphQlEngine;

impl SchemaEngine for GraphQlEngine {
    type Schema = GraphQlSchema;

    fn build(&self, source: &str) -> Result<GraphQlSchema> {
        GraphQlSchema::parse(source)
    }

    fn diff(&self, old: &GraphQlSchema, new: &GraphQlSchema) -> Vec<Change> {
        diff_schemas(old, new)
    }
}

/// A parsed schema, reduced to what the structural diff looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphQlSchema {
    types: BTreeMap<String, TypeDef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeKind::Scalar => "scalar",
            TypeKind::Object => "object type",
            TypeKind::Interface => "interface",
            TypeKind::Union => "union",
            TypeKind::Enum => "enum",
            TypeKind::InputObject => "input object type",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TypeDef {
    kind: TypeKind,
    /// Output fields, or input fields of an input object.
    fields: BTreeMap<String, FieldDef>,
    /// Union members, enum values or implemented interfaces.
    members: BTreeSet<String>,
}

impl TypeDef {
    fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            fields: BTreeMap::new(),
            members: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldDef {
    ty: TypeRef,
    has_default: bool,
    arguments: BTreeMap<String, FieldDef>,
}

impl FieldDef {
    fn is_required(&self) -> bool {
        matches!(self.ty, TypeRef::NonNull(_)) && !self.has_default
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => f.write_str(name),
            TypeRef::List(inner) => write!(f, "[{}]", inner),
            TypeRef::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

impl GraphQlSchema {
    /// Parses SDL text. Fails only on syntax errors.
    pub fn parse(source: &str) -> Result<Self> {
        let document = schema::parse_schema::<String>(source)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .context("invalid GraphQL SDL")?;

        let mut types: BTreeMap<String, TypeDef> = BTreeMap::new();
        for definition in &document.definitions {
            match definition {
                Definition::TypeDefinition(def) => {
                    let (name, lowered) = lower_definition(def);
                    types.insert(name, lowered);
                }
                Definition::TypeExtension(ext) => merge_extension(&mut types, ext),
                Definition::SchemaDefinition(_) | Definition::DirectiveDefinition(_) => {}
            }
        }

        Ok(Self { types })
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

fn lower_type(ty: &Type<'_, String>) -> TypeRef {
    match ty {
        Type::NamedType(name) => TypeRef::Named(name.clone()),
        Type::ListType(inner) => TypeRef::List(Box::new(lower_type(inner))),
        Type::NonNullType(inner) => TypeRef::NonNull(Box::new(lower_type(inner))),
    }
}

fn lower_input(value: &InputValue<'_, String>) -> (String, FieldDef) {
    (
        value.name.clone(),
        FieldDef {
            ty: lower_type(&value.value_type),
            has_default: value.default_value.is_some(),
            arguments: BTreeMap::new(),
        },
    )
}

fn lower_field(field: &schema::Field<'_, String>) -> (String, FieldDef) {
    (
        field.name.clone(),
        FieldDef {
            ty: lower_type(&field.field_type),
            has_default: false,
            arguments: field.arguments.iter().map(lower_input).collect(),
        },
    )
}

fn lower_definition(def: &TypeDefinition<'_, String>) -> (String, TypeDef) {
    match def {
        TypeDefinition::Scalar(t) => (t.name.clone(), TypeDef::new(TypeKind::Scalar)),
        TypeDefinition::Object(t) => {
            let mut lowered = TypeDef::new(TypeKind::Object);
            lowered.fields = t.fields.iter().map(lower_field).collect();
            lowered.members = t.implements_interfaces.iter().cloned().collect();
            (t.name.clone(), lowered)
        }
        TypeDefinition::Interface(t) => {
            let mut lowered = TypeDef::new(TypeKind::Interface);
            lowered.fields = t.fields.iter().map(lower_field).collect();
            lowered.members = t.implements_interfaces.iter().cloned().collect();
            (t.name.clone(), lowered)
        }
        TypeDefinition::Union(t) => {
            let mut lowered = TypeDef::new(TypeKind::Union);
            lowered.members = t.types.iter().cloned().collect();
            (t.name.clone(), lowered)
        }
        TypeDefinition::Enum(t) => {
            let mut lowered = TypeDef::new(TypeKind::Enum);
            lowered.members = t.values.iter().map(|v| v.name.clone()).collect();
            (t.name.clone(), lowered)
        }
        TypeDefinition::InputObject(t) => {
            let mut lowered = TypeDef::new(TypeKind::InputObject);
            lowered.fields = t.fields.iter().map(lower_input).collect();
            (t.name.clone(), lowered)
        }
    }
}

fn merge_extension(types: &mut BTreeMap<String, TypeDef>, ext: &TypeExtension<'_, String>) {
    match ext {
        TypeExtension::Scalar(_) => {}
        TypeExtension::Object(t) => {
            let target = types
                .entry(t.name.clone())
                .or_insert_with(|| TypeDef::new(TypeKind::Object));
            target.fields.extend(t.fields.iter().map(lower_field));
            target.members.extend(t.implements_interfaces.iter().cloned());
        }
        TypeExtension::Interface(t) => {
            let target = types
                .entry(t.name.clone())
                .or_insert_with(|| TypeDef::new(TypeKind::Interface));
            target.fields.extend(t.fields.iter().map(lower_field));
            target.members.extend(t.implements_interfaces.iter().cloned());
        }
        TypeExtension::Union(t) => {
            let target = types
                .entry(t.name.clone())
                .or_insert_with(|| TypeDef::new(TypeKind::Union));
            target.members.extend(t.types.iter().cloned());
        }
        TypeExtension::Enum(t) => {
            let target = types
                .entry(t.name.clone())
                .or_insert_with(|| TypeDef::new(TypeKind::Enum));
            target.members.extend(t.values.iter().map(|v| v.name.clone()));
        }
        TypeExtension::InputObject(t) => {
            let target = types
                .entry(t.name.clone())
                .or_insert_with(|| TypeDef::new(TypeKind::InputObject));
            target.fields.extend(t.fields.iter().map(lower_input));
        }
    }
}

// =============================================================================
// Diffing
// =============================================================================

/// Computes the ordered list of structural changes from `old` to `new`.
pub fn diff_schemas(old: &GraphQlSchema, new: &GraphQlSchema) -> Vec<Change> {
    let mut changes = Vec::new();

    for entry in old
        .types
        .iter()
        .merge_join_by(new.types.iter(), |(a, _), (b, _)| a.cmp(b))
    {
        match entry {
            EitherOrBoth::Left((name, _)) => changes.push(Change {
                criticality: Criticality::Breaking,
                kind: ChangeKind::TypeRemoved,
                path: name.clone(),
                message: format!("Type '{}' was removed", name),
            }),
            EitherOrBoth::Right((name, _)) => changes.push(Change {
                criticality: Criticality::NonBreaking,
                kind: ChangeKind::TypeAdded,
                path: name.clone(),
                message: format!("Type '{}' was added", name),
            }),
            EitherOrBoth::Both((name, old_type), (_, new_type)) => {
                diff_type(name, old_type, new_type, &mut changes)
            }
        }
    }

    changes
}

fn diff_type(name: &str, old: &TypeDef, new: &TypeDef, changes: &mut Vec<Change>) {
    if old.kind != new.kind {
        changes.push(Change {
            criticality: Criticality::Breaking,
            kind: ChangeKind::TypeKindChanged,
            path: name.to_string(),
            message: format!(
                "'{}' kind changed from '{}' to '{}'",
                name, old.kind, new.kind
            ),
        });
        return;
    }

    let is_input = old.kind == TypeKind::InputObject;
    for entry in old
        .fields
        .iter()
        .merge_join_by(new.fields.iter(), |(a, _), (b, _)| a.cmp(b))
    {
        match entry {
            EitherOrBoth::Left((field, _)) => changes.push(Change {
                criticality: Criticality::Breaking,
                kind: ChangeKind::FieldRemoved,
                path: format!("{}.{}", name, field),
                message: format!("Field '{}' was removed from {} '{}'", field, old.kind, name),
            }),
            EitherOrBoth::Right((field, def)) => {
                let criticality = if is_input && def.is_required() {
                    Criticality::Breaking
                } else {
                    Criticality::NonBreaking
                };
                changes.push(Change {
                    criticality,
                    kind: ChangeKind::FieldAdded,
                    path: format!("{}.{}", name, field),
                    message: format!("Field '{}' was added to {} '{}'", field, new.kind, name),
                });
            }
            EitherOrBoth::Both((field, old_field), (_, new_field)) => {
                let path = format!("{}.{}", name, field);
                if old_field.ty != new_field.ty {
                    let safe = if is_input {
                        is_safe_input_change(&old_field.ty, &new_field.ty)
                    } else {
                        is_safe_output_change(&old_field.ty, &new_field.ty)
                    };
                    changes.push(Change {
                        criticality: if safe {
                            Criticality::NonBreaking
                        } else {
                            Criticality::Breaking
                        },
                        kind: ChangeKind::FieldTypeChanged,
                        path: path.clone(),
                        message: format!(
                            "Field '{}' changed type from '{}' to '{}'",
                            path, old_field.ty, new_field.ty
                        ),
                    });
                }
                diff_arguments(&path, old_field, new_field, changes);
            }
        }
    }

    diff_members(name, old.kind, &old.members, &new.members, changes);
}

fn diff_arguments(path: &str, old: &FieldDef, new: &FieldDef, changes: &mut Vec<Change>) {
    for entry in old
        .arguments
        .iter()
        .merge_join_by(new.arguments.iter(), |(a, _), (b, _)| a.cmp(b))
    {
        match entry {
            EitherOrBoth::Left((arg, def)) => changes.push(Change {
                criticality: Criticality::Breaking,
                kind: ChangeKind::ArgumentRemoved,
                path: format!("{}.{}", path, arg),
                message: format!(
                    "Argument '{}: {}' was removed from field '{}'",
                    arg, def.ty, path
                ),
            }),
            EitherOrBoth::Right((arg, def)) => changes.push(Change {
                criticality: if def.is_required() {
                    Criticality::Breaking
                } else {
                    Criticality::Dangerous
                },
                kind: ChangeKind::ArgumentAdded,
                path: format!("{}.{}", path, arg),
                message: format!("Argument '{}: {}' added to field '{}'", arg, def.ty, path),
            }),
            EitherOrBoth::Both((arg, old_arg), (_, new_arg)) => {
                if old_arg.ty != new_arg.ty {
                    changes.push(Change {
                        criticality: if is_safe_input_change(&old_arg.ty, &new_arg.ty) {
                            Criticality::NonBreaking
                        } else {
                            Criticality::Breaking
                        },
                        kind: ChangeKind::ArgumentTypeChanged,
                        path: format!("{}.{}", path, arg),
                        message: format!(
                            "Type for argument '{}' on field '{}' changed from '{}' to '{}'",
                            arg, path, old_arg.ty, new_arg.ty
                        ),
                    });
                }
            }
        }
    }
}

fn diff_members(
    name: &str,
    kind: TypeKind,
    old: &BTreeSet<String>,
    new: &BTreeSet<String>,
    changes: &mut Vec<Change>,
) {
    let (added_kind, removed_kind) = match kind {
        TypeKind::Union => (ChangeKind::UnionMemberAdded, ChangeKind::UnionMemberRemoved),
        TypeKind::Enum => (ChangeKind::EnumValueAdded, ChangeKind::EnumValueRemoved),
        TypeKind::Object | TypeKind::Interface => {
            (ChangeKind::InterfaceAdded, ChangeKind::InterfaceRemoved)
        }
        _ => return,
    };

    for entry in old.iter().merge_join_by(new.iter(), |a, b| a.cmp(b)) {
        let (member, added) = match entry {
            EitherOrBoth::Left(member) => (member, false),
            EitherOrBoth::Right(member) => (member, true),
            EitherOrBoth::Both(..) => continue,
        };

        let message = match (kind, added) {
            (TypeKind::Union, true) => format!("Member '{}' was added to union type '{}'", member, name),
            (TypeKind::Union, false) => {
                format!("Member '{}' was removed from union type '{}'", member, name)
            }
            (TypeKind::Enum, true) => format!("Enum value '{}' was added to enum '{}'", member, name),
            (TypeKind::Enum, false) => {
                format!("Enum value '{}' was removed from enum '{}'", member, name)
            }
            (TypeKind::Interface, true) => {
                format!("'{}' interface implements '{}' interface", name, member)
            }
            (TypeKind::Interface, false) => format!(
                "'{}' interface no longer implements '{}' interface",
                name, member
            ),
            (_, true) => format!("'{}' object implements '{}' interface", name, member),
            (_, false) => format!(
                "'{}' object type no longer implements '{}' interface",
                name, member
            ),
        };

        changes.push(Change {
            criticality: if added {
                Criticality::Dangerous
            } else {
                Criticality::Breaking
            },
            kind: if added { added_kind } else { removed_kind },
            path: format!("{}.{}", name, member),
            message,
        });
    }
}

/// Output positions may only get stricter.
fn is_safe_output_change(old: &TypeRef, new: &TypeRef) -> bool {
    match (old, new) {
        (TypeRef::Named(a), TypeRef::Named(b)) => a == b,
        (TypeRef::List(a), TypeRef::List(b)) | (TypeRef::NonNull(a), TypeRef::NonNull(b)) => {
            is_safe_output_change(a, b)
        }
        (_, TypeRef::NonNull(b)) => is_safe_output_change(old, b),
        _ => false,
    }
}

/// Input positions may only get looser.
fn is_safe_input_change(old: &TypeRef, new: &TypeRef) -> bool {
    match (old, new) {
        (TypeRef::Named(a), TypeRef::Named(b)) => a == b,
        (TypeRef::List(a), TypeRef::List(b)) | (TypeRef::NonNull(a), TypeRef::NonNull(b)) => {
            is_safe_input_change(a, b)
        }
        (TypeRef::NonNull(a), _) => is_safe_input_change(a, new),
        _ => false,
    }
}
