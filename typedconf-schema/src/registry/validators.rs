//! Builtin validators
//!
//! Field validators see the field value plus the fields declared before it;
//! record validators (`root_validator: true`) see every field of the record.

use super::{Module, ValidatorArgs};
use crate::value::ConfigValue;
use typedconf_core::Document;

/// `range_check`, `quadrant`, `threshold`, `mult_of`, `zero_sum`,
/// `sum_by_name`.
pub fn validators_module() -> Module {
    Module::new("validators")
        .export_validator("range_check", range_check)
        .export_validator("quadrant", quadrant)
        .export_validator("threshold", threshold)
        .export_validator("mult_of", mult_of)
        .export_validator("zero_sum", zero_sum)
        .export_validator("sum_by_name", sum_by_name)
}

/// The field is the upper end of a range whose lower end is the sibling
/// named by `min_key`.
fn range_check(args: &ValidatorArgs<'_>) -> Result<(), String> {
    let max = args.field_value()?;
    let min_key = args
        .param("min_key")?
        .as_str()
        .ok_or_else(|| "parameter 'min_key' must be a string".to_string())?;
    if let Some(min) = args.values.get(min_key) {
        if number(min)? > number(max)? {
            return Err(format!("bad range: {} > {}", min, max));
        }
    }
    Ok(())
}

/// Every listed axis is present and has the sign given for it; a zero sign
/// accepts any value.
fn quadrant(args: &ValidatorArgs<'_>) -> Result<(), String> {
    let axes = string_list(args.param("axes")?, "axes")?;
    let signs = number_list(args.param("signs")?, "signs")?;
    let in_quadrant = axes.iter().all(|k| args.values.contains_key(k))
        && axes
            .iter()
            .zip(&signs)
            .filter(|(_, s)| **s != 0.0)
            .map(|(k, s)| number(&args.values[k]).map(|v| v * s > 0.0))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .all(|ok| ok);
    if in_quadrant {
        Ok(())
    } else {
        Err(format!(
            "{} not in quadrant: {}",
            ConfigValue::Map(args.values.clone()),
            ConfigValue::List(signs.into_iter().map(ConfigValue::Float).collect())
        ))
    }
}

fn threshold(args: &ValidatorArgs<'_>) -> Result<(), String> {
    let val = args.field_value()?;
    let limit = args.param("threshold")?;
    let limit_n = param_number(limit, "threshold")?;
    if number(val)? > limit_n {
        return Err(format!(
            "above threshold: {} > {}",
            val,
            ConfigValue::from_document(limit)
        ));
    }
    Ok(())
}

fn mult_of(args: &ValidatorArgs<'_>) -> Result<(), String> {
    let val = args.field_value()?;
    let factor = args.param("factor")?;
    let is_multiple = match (val.as_i64(), factor.as_i64()) {
        (Some(_), Some(0)) => return Err("parameter 'factor' must not be 0".to_string()),
        (Some(v), Some(f)) => v % f == 0,
        _ => {
            let f = param_number(factor, "factor")?;
            number(val)? % f == 0.0
        }
    };
    if is_multiple {
        Ok(())
    } else {
        Err(format!(
            "{} is not a multiple of {}",
            val,
            ConfigValue::from_document(factor)
        ))
    }
}

/// All fields of the record add up to `total`.
fn zero_sum(args: &ValidatorArgs<'_>) -> Result<(), String> {
    let total = args.param("total")?;
    let sum = args
        .values
        .values()
        .map(number)
        .sum::<Result<f64, String>>()?;
    check_total(args, sum, total)
}

/// The fields `first` and `second` add up to `total`.
fn sum_by_name(args: &ValidatorArgs<'_>) -> Result<(), String> {
    let total = args.param("total")?;
    let part = |name: &str| args.values.get(name).map_or(Ok(0.0), number);
    let sum = part("first")? + part("second")?;
    check_total(args, sum, total)
}

fn check_total(args: &ValidatorArgs<'_>, sum: f64, total: &Document) -> Result<(), String> {
    if (sum - param_number(total, "total")?).abs() > 1e-9 {
        return Err(format!(
            "{} do not add up to {}",
            ConfigValue::List(args.values.values().cloned().collect()),
            ConfigValue::from_document(total)
        ));
    }
    Ok(())
}

fn number(value: &ConfigValue) -> Result<f64, String> {
    value
        .as_f64()
        .ok_or_else(|| format!("{} is not a number", value))
}

fn param_number(param: &Document, name: &str) -> Result<f64, String> {
    param
        .as_f64()
        .ok_or_else(|| format!("parameter '{}' must be a number", name))
}

fn string_list(param: &Document, name: &str) -> Result<Vec<String>, String> {
    param
        .as_sequence()
        .and_then(|seq| {
            seq.iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
        })
        .ok_or_else(|| format!("parameter '{}' must be a list of strings", name))
}

fn number_list(param: &Document, name: &str) -> Result<Vec<f64>, String> {
    param
        .as_sequence()
        .and_then(|seq| seq.iter().map(Document::as_f64).collect::<Option<Vec<_>>>())
        .ok_or_else(|| format!("parameter '{}' must be a list of numbers", name))
}

// ============================================================================
// TESTS
// ============================================================================
