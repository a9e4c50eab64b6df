//! Builtin type modules

use super::{Module, TypeEntry};
use crate::types::{
    FloatConstraints, IntConstraints, PathKind, StrConstraints, TypeArg, TypeDescriptor,
};
use typedconf_core::{Document, Mapping};

/// Scalar types: `bool`, `int`, `float`, `str`, `Path`, `Any`.
pub fn builtins_module() -> Module {
    Module::new("builtins")
        .export_type("bool", TypeDescriptor::Bool { strict: false })
        .export_type("int", TypeDescriptor::Int(IntConstraints::default()))
        .export_type("float", TypeDescriptor::Float(FloatConstraints::default()))
        .export_type("str", TypeDescriptor::Str(StrConstraints::default()))
        .export_type("Path", TypeDescriptor::Path(PathKind::Any))
        .export_type("Any", TypeDescriptor::Any)
}

/// Container and composition types, parameterized by a sequence of options.
pub fn typing_module() -> Module {
    Module::new("typing")
        .export_type("Any", TypeDescriptor::Any)
        .export_type(
            "List",
            TypeEntry::generic(|args| match args {
                [] => Ok(TypeDescriptor::List(Box::new(TypeDescriptor::Any))),
                [item] => Ok(TypeDescriptor::List(Box::new(item.as_type()?.clone()))),
                _ => Err(arity("List", "1", args.len())),
            }),
        )
        .export_type(
            "Dict",
            TypeEntry::generic(|args| match args {
                [] => Ok(TypeDescriptor::Dict(
                    Box::new(TypeDescriptor::Str(StrConstraints::default())),
                    Box::new(TypeDescriptor::Any),
                )),
                [key, value] => Ok(TypeDescriptor::Dict(
                    Box::new(key.as_type()?.clone()),
                    Box::new(value.as_type()?.clone()),
                )),
                _ => Err(arity("Dict", "2", args.len())),
            }),
        )
        .export_type(
            "Tuple",
            TypeEntry::generic(|args| {
                if args.is_empty() {
                    return Err(arity("Tuple", "at least 1", 0));
                }
                Ok(TypeDescriptor::Tuple(all_types(args)?))
            }),
        )
        .export_type(
            "Optional",
            TypeEntry::generic(|args| match args {
                [item] => Ok(TypeDescriptor::Optional(Box::new(item.as_type()?.clone()))),
                _ => Err(arity("Optional", "1", args.len())),
            }),
        )
        .export_type(
            "Union",
            TypeEntry::generic(|args| match args {
                [] => Err(arity("Union", "at least 1", 0)),
                [item] => Ok(item.as_type()?.clone()),
                _ => Ok(TypeDescriptor::Union(all_types(args)?)),
            }),
        )
        .export_type(
            "Literal",
            TypeEntry::generic(|args| {
                if args.is_empty() {
                    return Err(arity("Literal", "at least 1", 0));
                }
                args.iter()
                    .map(|arg| match &arg.raw {
                        Document::Sequence(_) | Document::Mapping(_) => {
                            Err("Literal values must be scalars".to_string())
                        }
                        raw => Ok(raw.clone()),
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(TypeDescriptor::Literal)
            }),
        )
}

/// Constrained scalars and their keyword factories.
pub fn constrained_module() -> Module {
    let int = |c: IntConstraints| TypeDescriptor::Int(c);
    let float = |c: FloatConstraints| TypeDescriptor::Float(c);
    Module::new("constrained")
        .export_type("PositiveInt", int(IntConstraints { gt: Some(0), ..Default::default() }))
        .export_type("NegativeInt", int(IntConstraints { lt: Some(0), ..Default::default() }))
        .export_type("NonNegativeInt", int(IntConstraints { ge: Some(0), ..Default::default() }))
        .export_type("NonPositiveInt", int(IntConstraints { le: Some(0), ..Default::default() }))
        .export_type("PositiveFloat", float(FloatConstraints { gt: Some(0.0), ..Default::default() }))
        .export_type("NegativeFloat", float(FloatConstraints { lt: Some(0.0), ..Default::default() }))
        .export_type(
            "NonNegativeFloat",
            float(FloatConstraints { ge: Some(0.0), ..Default::default() }),
        )
        .export_type(
            "NonPositiveFloat",
            float(FloatConstraints { le: Some(0.0), ..Default::default() }),
        )
        .export_type("StrictInt", int(IntConstraints { strict: true, ..Default::default() }))
        .export_type(
            "StrictStr",
            TypeDescriptor::Str(StrConstraints { strict: true, ..Default::default() }),
        )
        .export_type("StrictBool", TypeDescriptor::Bool { strict: true })
        .export_type("FilePath", TypeDescriptor::Path(PathKind::File))
        .export_type("DirectoryPath", TypeDescriptor::Path(PathKind::Dir))
        .export_type(
            "conint",
            TypeEntry::constrained(|opts| IntConstraints::from_opts(opts).map(TypeDescriptor::Int)),
        )
        .export_type(
            "confloat",
            TypeEntry::constrained(|opts| {
                FloatConstraints::from_opts(opts).map(TypeDescriptor::Float)
            }),
        )
        .export_type(
            "constr",
            TypeEntry::constrained(|opts| StrConstraints::from_opts(opts).map(TypeDescriptor::Str)),
        )
}

/// Constrained numbers labelled with a unit: `unitint`, `unitfloat`.
///
/// Both take a required `unit` option; every other option is a numeric
/// constraint.
pub fn units_module() -> Module {
    Module::new("units")
        .export_type(
            "unitint",
            TypeEntry::constrained(|opts| {
                let (unit, rest) = split_unit(opts)?;
                let base = TypeDescriptor::Int(IntConstraints::from_opts(&rest)?);
                Ok(TypeDescriptor::Unit {
                    unit,
                    base: Box::new(base),
                })
            }),
        )
        .export_type(
            "unitfloat",
            TypeEntry::constrained(|opts| {
                let (unit, rest) = split_unit(opts)?;
                let base = TypeDescriptor::Float(FloatConstraints::from_opts(&rest)?);
                Ok(TypeDescriptor::Unit {
                    unit,
                    base: Box::new(base),
                })
            }),
        )
}

fn split_unit(opts: &Mapping) -> Result<(String, Mapping), String> {
    let unit = opts
        .get("unit")
        .ok_or_else(|| "missing required argument 'unit'".to_string())?
        .as_str()
        .ok_or_else(|| "argument 'unit' must be a string".to_string())?
        .to_string();
    let mut rest = opts.clone();
    rest.shift_remove("unit");
    Ok((unit, rest))
}

fn all_types(args: &[TypeArg]) -> Result<Vec<TypeDescriptor>, String> {
    args.iter().map(|arg| arg.as_type().cloned()).collect()
}

fn arity(name: &str, expected: &str, got: usize) -> String {
    format!("{} expects {} type argument(s), got {}", name, expected, got)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use typedconf_test_utils::yaml;

    fn entry(name: &str) -> TypeEntry {
        Registry::new().lookup_type(name).unwrap().unwrap().clone()
    }

    fn arg(raw: &str, ty: Option<TypeDescriptor>) -> TypeArg {
        TypeArg {
            raw: Document::from(raw),
            ty,
        }
    }

    #[test]
    fn test_list_arity() {
        let TypeEntry::Generic(list) = entry("List") else {
            panic!("List is generic");
        };
        let int = TypeDescriptor::Int(IntConstraints::default());
        assert_eq!(
            list(&[arg("int", Some(int.clone()))]).unwrap(),
            TypeDescriptor::List(Box::new(int.clone()))
        );
        assert!(list(&[arg("int", Some(int.clone())), arg("int", Some(int))])
            .unwrap_err()
            .contains("expects 1"));
        assert!(list(&[arg("nope", None)]).unwrap_err().contains("not a registered type"));
    }

    #[test]
    fn test_literal_uses_raw_values() {
        let TypeEntry::Generic(literal) = entry("Literal") else {
            panic!("Literal is generic");
        };
        // a literal value that happens to name a type stays a literal
        let ty = literal(&[arg("int", Some(TypeDescriptor::Any)), arg("abc", None)]).unwrap();
        assert_eq!(
            ty,
            TypeDescriptor::Literal(vec![Document::from("int"), Document::from("abc")])
        );
    }

    #[test]
    fn test_unit_factories() {
        let TypeEntry::Constrained(unitfloat) = entry("unitfloat") else {
            panic!("unitfloat is constrained");
        };
        let opts = yaml("{unit: MW, ge: 0}");
        let ty = unitfloat(opts.as_mapping().unwrap()).unwrap();
        assert_eq!(ty.unit(), Some("MW"));

        let err = unitfloat(&Mapping::new()).unwrap_err();
        assert!(err.contains("'unit'"));
    }

    #[test]
    fn test_plain_constrained_factory_is_unconstrained() {
        assert_eq!(
            entry("conint").plain().unwrap(),
            TypeDescriptor::Int(IntConstraints::default())
        );
    }
}
