//! Type descriptors
//!
//! A [`TypeDescriptor`] is the resolved identity of a field's value type. It
//! is plain data: instantiation interprets it against a document value,
//! coercing leniently where the declared type allows and checking every
//! declared constraint.

use crate::composite::CompositeType;
use crate::value::ConfigValue;
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use typedconf_core::{DocPath, Document, Mapping, PathKey, ValidationError, Violation, ViolationKind};

// ============================================================================
// CONSTRAINTS
// ============================================================================

/// Keyword constraints of an integer type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntConstraints {
    pub gt: Option<i64>,
    pub ge: Option<i64>,
    pub lt: Option<i64>,
    pub le: Option<i64>,
    pub multiple_of: Option<i64>,
    pub strict: bool,
}

impl IntConstraints {
    /// Build constraints from factory keyword options.
    pub fn from_opts(opts: &Mapping) -> Result<Self, String> {
        let mut out = Self::default();
        for (key, value) in opts {
            let key = option_name(key)?;
            match key.as_str() {
                "gt" => out.gt = Some(int_option(&key, value)?),
                "ge" => out.ge = Some(int_option(&key, value)?),
                "lt" => out.lt = Some(int_option(&key, value)?),
                "le" => out.le = Some(int_option(&key, value)?),
                "multiple_of" => {
                    let m = int_option(&key, value)?;
                    if m == 0 {
                        return Err("multiple_of must not be 0".to_string());
                    }
                    out.multiple_of = Some(m);
                }
                "strict" => out.strict = bool_option(&key, value)?,
                _ => return Err(format!("unexpected keyword argument '{}'", key)),
            }
        }
        Ok(out)
    }

    fn is_unconstrained(&self) -> bool {
        self.gt.is_none()
            && self.ge.is_none()
            && self.lt.is_none()
            && self.le.is_none()
            && self.multiple_of.is_none()
    }

    fn check(&self, v: i64) -> Result<(), String> {
        if let Some(gt) = self.gt {
            if v <= gt {
                return Err(format!("ensure this value is greater than {}", gt));
            }
        }
        if let Some(ge) = self.ge {
            if v < ge {
                return Err(format!("ensure this value is greater than or equal to {}", ge));
            }
        }
        if let Some(lt) = self.lt {
            if v >= lt {
                return Err(format!("ensure this value is less than {}", lt));
            }
        }
        if let Some(le) = self.le {
            if v > le {
                return Err(format!("ensure this value is less than or equal to {}", le));
            }
        }
        if let Some(m) = self.multiple_of {
            if v % m != 0 {
                return Err(format!("ensure this value is a multiple of {}", m));
            }
        }
        Ok(())
    }

    fn render(&self) -> Vec<String> {
        let mut parts = Vec::new();
        push_bound(&mut parts, "gt", self.gt);
        push_bound(&mut parts, "ge", self.ge);
        push_bound(&mut parts, "lt", self.lt);
        push_bound(&mut parts, "le", self.le);
        push_bound(&mut parts, "multiple_of", self.multiple_of);
        if self.strict {
            parts.push("strict=True".to_string());
        }
        parts
    }
}

/// Keyword constraints of a float type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloatConstraints {
    pub gt: Option<f64>,
    pub ge: Option<f64>,
    pub lt: Option<f64>,
    pub le: Option<f64>,
    pub multiple_of: Option<f64>,
    pub strict: bool,
}

impl FloatConstraints {
    pub fn from_opts(opts: &Mapping) -> Result<Self, String> {
        let mut out = Self::default();
        for (key, value) in opts {
            let key = option_name(key)?;
            match key.as_str() {
                "gt" => out.gt = Some(float_option(&key, value)?),
                "ge" => out.ge = Some(float_option(&key, value)?),
                "lt" => out.lt = Some(float_option(&key, value)?),
                "le" => out.le = Some(float_option(&key, value)?),
                "multiple_of" => {
                    let m = float_option(&key, value)?;
                    if m == 0.0 {
                        return Err("multiple_of must not be 0".to_string());
                    }
                    out.multiple_of = Some(m);
                }
                "strict" => out.strict = bool_option(&key, value)?,
                _ => return Err(format!("unexpected keyword argument '{}'", key)),
            }
        }
        Ok(out)
    }

    fn is_unconstrained(&self) -> bool {
        self.gt.is_none()
            && self.ge.is_none()
            && self.lt.is_none()
            && self.le.is_none()
            && self.multiple_of.is_none()
    }

    fn check(&self, v: f64) -> Result<(), String> {
        if let Some(gt) = self.gt {
            if v <= gt {
                return Err(format!("ensure this value is greater than {}", gt));
            }
        }
        if let Some(ge) = self.ge {
            if v < ge {
                return Err(format!("ensure this value is greater than or equal to {}", ge));
            }
        }
        if let Some(lt) = self.lt {
            if v >= lt {
                return Err(format!("ensure this value is less than {}", lt));
            }
        }
        if let Some(le) = self.le {
            if v > le {
                return Err(format!("ensure this value is less than or equal to {}", le));
            }
        }
        if let Some(m) = self.multiple_of {
            let rem = (v / m).rem_euclid(1.0);
            if rem > f64::EPSILON * 8.0 && (1.0 - rem) > f64::EPSILON * 8.0 {
                return Err(format!("ensure this value is a multiple of {}", m));
            }
        }
        Ok(())
    }

    fn render(&self) -> Vec<String> {
        let mut parts = Vec::new();
        push_bound(&mut parts, "gt", self.gt);
        push_bound(&mut parts, "ge", self.ge);
        push_bound(&mut parts, "lt", self.lt);
        push_bound(&mut parts, "le", self.le);
        push_bound(&mut parts, "multiple_of", self.multiple_of);
        if self.strict {
            parts.push("strict=True".to_string());
        }
        parts
    }
}

/// Keyword constraints of a string type.
#[derive(Debug, Clone, Default)]
pub struct StrConstraints {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub regex: Option<Regex>,
    pub strip_whitespace: bool,
    pub to_lower: bool,
    pub strict: bool,
}

impl StrConstraints {
    pub fn from_opts(opts: &Mapping) -> Result<Self, String> {
        let mut out = Self::default();
        for (key, value) in opts {
            let key = option_name(key)?;
            match key.as_str() {
                "min_length" => out.min_length = Some(length_option(&key, value)?),
                "max_length" => out.max_length = Some(length_option(&key, value)?),
                "regex" => {
                    let pattern = value
                        .as_str()
                        .ok_or_else(|| "option 'regex' must be a string".to_string())?;
                    let regex = Regex::new(pattern)
                        .map_err(|e| format!("invalid regex '{}': {}", pattern, e))?;
                    out.regex = Some(regex);
                }
                "strip_whitespace" => out.strip_whitespace = bool_option(&key, value)?,
                "to_lower" => out.to_lower = bool_option(&key, value)?,
                "strict" => out.strict = bool_option(&key, value)?,
                _ => return Err(format!("unexpected keyword argument '{}'", key)),
            }
        }
        Ok(out)
    }

    fn is_unconstrained(&self) -> bool {
        self.min_length.is_none()
            && self.max_length.is_none()
            && self.regex.is_none()
            && !self.strip_whitespace
            && !self.to_lower
    }

    fn apply(&self, s: String) -> Result<String, String> {
        let mut s = if self.strip_whitespace {
            s.trim().to_string()
        } else {
            s
        };
        if self.to_lower {
            s = s.to_lowercase();
        }
        let len = s.chars().count();
        if let Some(min) = self.min_length {
            if len < min {
                return Err(format!("ensure this value has at least {} characters", min));
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                return Err(format!("ensure this value has at most {} characters", max));
            }
        }
        if let Some(regex) = &self.regex {
            if !regex.is_match(&s) {
                return Err(format!("string does not match regex \"{}\"", regex.as_str()));
            }
        }
        Ok(s)
    }

    fn render(&self) -> Vec<String> {
        let mut parts = Vec::new();
        push_bound(&mut parts, "min_length", self.min_length);
        push_bound(&mut parts, "max_length", self.max_length);
        if let Some(regex) = &self.regex {
            parts.push(format!("regex='{}'", regex.as_str()));
        }
        if self.strip_whitespace {
            parts.push("strip_whitespace=True".to_string());
        }
        if self.to_lower {
            parts.push("to_lower=True".to_string());
        }
        if self.strict {
            parts.push("strict=True".to_string());
        }
        parts
    }
}

impl PartialEq for StrConstraints {
    fn eq(&self, other: &Self) -> bool {
        self.min_length == other.min_length
            && self.max_length == other.max_length
            && self.regex.as_ref().map(Regex::as_str) == other.regex.as_ref().map(Regex::as_str)
            && self.strip_whitespace == other.strip_whitespace
            && self.to_lower == other.to_lower
            && self.strict == other.strict
    }
}

/// What a path-typed field must point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathKind {
    Any,
    File,
    Dir,
}

fn option_name(key: &Document) -> Result<String, String> {
    key.as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("option names must be strings, got {:?}", key))
}

fn int_option(key: &str, value: &Document) -> Result<i64, String> {
    value
        .as_i64()
        .ok_or_else(|| format!("option '{}' must be an integer", key))
}

fn float_option(key: &str, value: &Document) -> Result<f64, String> {
    value
        .as_f64()
        .ok_or_else(|| format!("option '{}' must be a number", key))
}

fn bool_option(key: &str, value: &Document) -> Result<bool, String> {
    value
        .as_bool()
        .ok_or_else(|| format!("option '{}' must be a boolean", key))
}

fn length_option(key: &str, value: &Document) -> Result<usize, String> {
    value
        .as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| format!("option '{}' must be a non-negative integer", key))
}

fn push_bound<T: fmt::Display>(parts: &mut Vec<String>, name: &str, bound: Option<T>) {
    if let Some(bound) = bound {
        parts.push(format!("{}={}", name, bound));
    }
}

// ============================================================================
// CUSTOM TYPES
// ============================================================================

pub type CoerceFn = Arc<dyn Fn(&Document) -> Result<ConfigValue, String> + Send + Sync>;

/// A caller-registered type with its own coercion function.
#[derive(Clone)]
pub struct CustomType {
    pub name: String,
    pub coerce: CoerceFn,
}

impl CustomType {
    pub fn new<F>(name: impl Into<String>, coerce: F) -> Self
    where
        F: Fn(&Document) -> Result<ConfigValue, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            coerce: Arc::new(coerce),
        }
    }
}

impl fmt::Debug for CustomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomType").field("name", &self.name).finish()
    }
}

// ============================================================================
// DESCRIPTORS
// ============================================================================

/// Resolved type of one field.
#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    Any,
    Bool { strict: bool },
    Int(IntConstraints),
    Float(FloatConstraints),
    Str(StrConstraints),
    Path(PathKind),
    Literal(Vec<Document>),
    List(Box<TypeDescriptor>),
    Dict(Box<TypeDescriptor>, Box<TypeDescriptor>),
    Tuple(Vec<TypeDescriptor>),
    Optional(Box<TypeDescriptor>),
    Union(Vec<TypeDescriptor>),
    /// A constrained number labelled with a physical unit.
    Unit {
        unit: String,
        base: Box<TypeDescriptor>,
    },
    Composite(Arc<CompositeType>),
    Custom(CustomType),
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        use TypeDescriptor::*;
        match (self, other) {
            (Any, Any) => true,
            (Bool { strict: a }, Bool { strict: b }) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (Path(a), Path(b)) => a == b,
            (Literal(a), Literal(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Dict(ak, av), Dict(bk, bv)) => ak == bk && av == bv,
            (Tuple(a), Tuple(b)) => a == b,
            (Optional(a), Optional(b)) => a == b,
            (Union(a), Union(b)) => a == b,
            (Unit { unit: au, base: ab }, Unit { unit: bu, base: bb }) => au == bu && ab == bb,
            (Composite(a), Composite(b)) => Arc::ptr_eq(a, b),
            (Custom(a), Custom(b)) => a.name == b.name,
            _ => false,
        }
    }
}

impl TypeDescriptor {
    /// Human-readable name, used in diagnostics.
    pub fn name(&self) -> String {
        match self {
            TypeDescriptor::Any => "Any".to_string(),
            TypeDescriptor::Bool { strict: false } => "bool".to_string(),
            TypeDescriptor::Bool { strict: true } => "StrictBool".to_string(),
            TypeDescriptor::Int(c) if c.is_unconstrained() => {
                (if c.strict { "StrictInt" } else { "int" }).to_string()
            }
            TypeDescriptor::Int(c) => format!("conint({})", c.render().join(", ")),
            TypeDescriptor::Float(c) if c.is_unconstrained() => {
                (if c.strict { "StrictFloat" } else { "float" }).to_string()
            }
            TypeDescriptor::Float(c) => format!("confloat({})", c.render().join(", ")),
            TypeDescriptor::Str(c) if c.is_unconstrained() => {
                (if c.strict { "StrictStr" } else { "str" }).to_string()
            }
            TypeDescriptor::Str(c) => format!("constr({})", c.render().join(", ")),
            TypeDescriptor::Path(PathKind::Any) => "Path".to_string(),
            TypeDescriptor::Path(PathKind::File) => "FilePath".to_string(),
            TypeDescriptor::Path(PathKind::Dir) => "DirectoryPath".to_string(),
            TypeDescriptor::Literal(values) => format!(
                "Literal[{}]",
                values.iter().map(render_scalar).collect::<Vec<_>>().join(", ")
            ),
            TypeDescriptor::List(inner) => format!("List[{}]", inner.name()),
            TypeDescriptor::Dict(k, v) => format!("Dict[{}, {}]", k.name(), v.name()),
            TypeDescriptor::Tuple(items) => format!("Tuple[{}]", join_names(items)),
            TypeDescriptor::Optional(inner) => format!("Optional[{}]", inner.name()),
            TypeDescriptor::Union(items) => format!("Union[{}]", join_names(items)),
            TypeDescriptor::Unit { unit, base } => format!("{} [{}]", base.name(), unit),
            TypeDescriptor::Composite(ct) => ct.name.clone(),
            TypeDescriptor::Custom(custom) => custom.name.clone(),
        }
    }

    /// The unit label of a unit-carrying type.
    pub fn unit(&self) -> Option<&str> {
        match self {
            TypeDescriptor::Unit { unit, .. } => Some(unit),
            TypeDescriptor::Optional(inner) => inner.unit(),
            _ => None,
        }
    }

    /// True when `null` is an acceptable value.
    pub fn accepts_null(&self) -> bool {
        match self {
            TypeDescriptor::Any | TypeDescriptor::Optional(_) => true,
            TypeDescriptor::Union(items) => items.iter().any(TypeDescriptor::accepts_null),
            _ => false,
        }
    }

    /// The composite type of a record-valued field.
    pub fn as_composite(&self) -> Option<&Arc<CompositeType>> {
        match self {
            TypeDescriptor::Composite(ct) => Some(ct),
            _ => None,
        }
    }

    // ========================================================================
    // COERCION
    // ========================================================================

    /// Interpret `raw` as a value of this type.
    ///
    /// Failures are pushed onto `errors` with their full location and `None`
    /// is returned; nested containers report every failing element.
    pub fn coerce(
        &self,
        raw: &Document,
        path: &DocPath,
        errors: &mut ValidationError,
    ) -> Option<ConfigValue> {
        let raw = match raw {
            Document::Tagged(tagged) => &tagged.value,
            other => other,
        };
        if raw.is_null() && !self.accepts_null() {
            mismatch(errors, path, raw, "none is not an allowed value");
            return None;
        }
        let result = match self {
            TypeDescriptor::Any => Ok(ConfigValue::from_document(raw)),
            TypeDescriptor::Bool { strict } => coerce_bool(raw, *strict).map(ConfigValue::Bool),
            TypeDescriptor::Int(c) => {
                coerce_int(raw, c.strict).and_then(|v| c.check(v).map(|_| ConfigValue::Int(v)))
            }
            TypeDescriptor::Float(c) => coerce_float(raw, c.strict)
                .and_then(|v| c.check(v).map(|_| ConfigValue::Float(v))),
            TypeDescriptor::Str(c) => {
                coerce_str(raw, c.strict).and_then(|s| c.apply(s).map(ConfigValue::Str))
            }
            TypeDescriptor::Path(kind) => coerce_path(raw, *kind).map(ConfigValue::Path),
            TypeDescriptor::Literal(options) => {
                if options.iter().any(|option| literal_matches(option, raw)) {
                    Ok(ConfigValue::from_document(raw))
                } else {
                    Err(format!(
                        "unexpected value; permitted: {}",
                        options.iter().map(render_scalar).collect::<Vec<_>>().join(", ")
                    ))
                }
            }
            TypeDescriptor::List(inner) => {
                return match raw.as_sequence() {
                    Some(items) => collect_all(items.iter().enumerate().map(|(i, item)| {
                        inner.coerce(item, &path.child(i), errors)
                    }))
                    .map(ConfigValue::List),
                    None => {
                        mismatch(errors, path, raw, "value is not a valid list");
                        None
                    }
                };
            }
            TypeDescriptor::Tuple(items) => {
                return match raw.as_sequence() {
                    Some(values) if values.len() == items.len() => {
                        collect_all(items.iter().zip(values).enumerate().map(|(i, (ty, v))| {
                            ty.coerce(v, &path.child(i), errors)
                        }))
                        .map(ConfigValue::List)
                    }
                    Some(values) => {
                        mismatch(
                            errors,
                            path,
                            raw,
                            format!(
                                "wrong tuple length {}, expected {}",
                                values.len(),
                                items.len()
                            ),
                        );
                        None
                    }
                    None => {
                        mismatch(errors, path, raw, "value is not a valid tuple");
                        None
                    }
                };
            }
            TypeDescriptor::Dict(key_t, value_t) => {
                let Some(map) = raw.as_mapping() else {
                    mismatch(errors, path, raw, "value is not a valid dict");
                    return None;
                };
                let mut out = indexmap::IndexMap::new();
                let mut failed = false;
                for (k, v) in map {
                    let key = PathKey::from_mapping_key(k);
                    let item_path = path.child(key.clone());
                    let coerced_key = key_t.coerce(k, &item_path, errors);
                    let coerced_value = value_t.coerce(v, &item_path, errors);
                    match (coerced_key, coerced_value) {
                        (Some(ck), Some(cv)) => {
                            out.insert(ck.render_key(), cv);
                        }
                        _ => failed = true,
                    }
                }
                return (!failed).then_some(ConfigValue::Map(out));
            }
            TypeDescriptor::Optional(inner) => {
                if raw.is_null() {
                    return Some(ConfigValue::Null);
                }
                return inner.coerce(raw, path, errors);
            }
            TypeDescriptor::Union(items) => {
                for item in items {
                    let mut scratch = ValidationError::new(&errors.type_name);
                    if let Some(value) = item.coerce(raw, path, &mut scratch) {
                        return Some(value);
                    }
                }
                Err(format!(
                    "value does not match any of {}",
                    join_names(items)
                ))
            }
            TypeDescriptor::Unit { base, .. } => return base.coerce(raw, path, errors),
            TypeDescriptor::Composite(ct) => {
                return match raw.as_mapping() {
                    Some(_) => ct
                        .instantiate_at(raw, path, errors)
                        .map(ConfigValue::Record),
                    None => {
                        mismatch(errors, path, raw, "value is not a valid dict");
                        None
                    }
                };
            }
            TypeDescriptor::Custom(custom) => (custom.coerce)(raw),
        };
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                mismatch(errors, path, raw, message);
                None
            }
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// An argument of a parametric type: the literal option value and, when it
/// names a registered type, that type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeArg {
    pub raw: Document,
    pub ty: Option<TypeDescriptor>,
}

impl TypeArg {
    /// The argument as a type, failing when it names none.
    pub fn as_type(&self) -> Result<&TypeDescriptor, String> {
        self.ty
            .as_ref()
            .ok_or_else(|| format!("{} is not a registered type", render_scalar(&self.raw)))
    }
}

// ============================================================================
// SCALAR COERCION
// ============================================================================

fn mismatch(errors: &mut ValidationError, path: &DocPath, raw: &Document, message: impl Into<String>) {
    errors.push(Violation::new(
        path.clone(),
        ViolationKind::FieldTypeMismatch,
        Some(raw.clone()),
        message,
    ));
}

/// Run every element through, even after a failure, so all of them report.
fn collect_all<I: Iterator<Item = Option<ConfigValue>>>(items: I) -> Option<Vec<ConfigValue>> {
    let mut out = Vec::new();
    let mut failed = false;
    for item in items {
        match item {
            Some(value) => out.push(value),
            None => failed = true,
        }
    }
    (!failed).then_some(out)
}

fn coerce_bool(raw: &Document, strict: bool) -> Result<bool, String> {
    if let Some(b) = raw.as_bool() {
        return Ok(b);
    }
    if strict {
        return Err("value is not a valid boolean".to_string());
    }
    let parsed = match raw {
        Document::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Document::String(s) => match s.to_ascii_lowercase().as_str() {
            "0" | "off" | "f" | "false" | "n" | "no" => Some(false),
            "1" | "on" | "t" | "true" | "y" | "yes" => Some(true),
            _ => None,
        },
        _ => None,
    };
    parsed.ok_or_else(|| "value could not be parsed to a boolean".to_string())
}

fn coerce_int(raw: &Document, strict: bool) -> Result<i64, String> {
    const MSG: &str = "value is not a valid integer";
    if let Some(v) = raw.as_i64() {
        return Ok(v);
    }
    if strict {
        return Err(MSG.to_string());
    }
    match raw {
        Document::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
            _ => Err(MSG.to_string()),
        },
        Document::String(s) => s.trim().parse::<i64>().map_err(|_| MSG.to_string()),
        _ => Err(MSG.to_string()),
    }
}

fn coerce_float(raw: &Document, strict: bool) -> Result<f64, String> {
    const MSG: &str = "value is not a valid float";
    match raw {
        Document::Number(n) => n.as_f64().ok_or_else(|| MSG.to_string()),
        Document::String(s) if !strict => s.trim().parse::<f64>().map_err(|_| MSG.to_string()),
        _ => Err(MSG.to_string()),
    }
}

fn coerce_str(raw: &Document, strict: bool) -> Result<String, String> {
    match raw {
        Document::String(s) => Ok(s.clone()),
        Document::Number(n) if !strict => Ok(n.to_string()),
        _ => Err("str type expected".to_string()),
    }
}

fn coerce_path(raw: &Document, kind: PathKind) -> Result<PathBuf, String> {
    let Some(s) = raw.as_str() else {
        return Err("value is not a valid path".to_string());
    };
    let path = PathBuf::from(s);
    match kind {
        PathKind::Any => Ok(path),
        PathKind::File | PathKind::Dir if !path.exists() => Err(format!(
            "file or directory at path \"{}\" does not exist",
            path.display()
        )),
        PathKind::File if !path.is_file() => Err(format!(
            "path \"{}\" does not point to a file",
            path.display()
        )),
        PathKind::Dir if !path.is_dir() => Err(format!(
            "path \"{}\" does not point to a directory",
            path.display()
        )),
        _ => Ok(path),
    }
}

fn literal_matches(option: &Document, raw: &Document) -> bool {
    match (option, raw) {
        (Document::Number(a), Document::Number(b)) => a.as_f64() == b.as_f64(),
        _ => option == raw,
    }
}

pub(crate) fn render_scalar(doc: &Document) -> String {
    match doc {
        Document::String(s) => format!("'{}'", s),
        Document::Null => "None".to_string(),
        Document::Bool(b) => (if *b { "True" } else { "False" }).to_string(),
        Document::Number(n) => n.to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

fn join_names(items: &[TypeDescriptor]) -> String {
    items
        .iter()
        .map(TypeDescriptor::name)
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// TESTS
// ============================================================================
