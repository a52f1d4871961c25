//Bcause
//Copyright (C) 2022-2023 A. Dubray
//
//This program is free software: you can redistribute it and/or modify
//it under the terms of the GNU Affero General Public License as published by
//the Free Software Foundation, either version 3 of the License, or
//(at your option) any later version.
//
//This program is distributed in the hope that it will be useful,
//but WITHOUT ANY WARRANTY; without even the implied warranty of
//MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//GNU Affero General Public License for more details.
//
//You should have received a copy of the GNU Affero General Public License
//along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Reader for the constraint files. Each line describes one weighted statement
//!
//! <independent> <weight> <v1> <v2> <condition> <intervention>
//!
//! where `independent` is 1 for an independence and 0 for a dependence, and `condition` and
//! `intervention` are bit masks over the variables. The intervention mask may be omitted, in which
//! case no variable is intervened upon. Lines shorter than five characters are ignored.
//!
//! The variables of the file may be numbered from any value: the smallest endpoint of the file
//! becomes variable 0, and the masks are expressed over the renumbered variables.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::core::bitset::{VarSet, MAX_VARIABLES};
use crate::core::constraint::{Constraint, Weight, INFINITE_WEIGHT};
use crate::core::instance::{Instance, InstanceLimits};
use crate::error::LoadError;

struct Record {
    line: usize,
    independent: bool,
    weight: Weight,
    v1: usize,
    v2: usize,
    condition: u64,
    intervention: u64,
}

fn field<T: std::str::FromStr>(token: &str, name: &str, line: usize) -> Result<T, LoadError> {
    token.parse::<T>().map_err(|_| LoadError::Malformed { line, reason: format!("invalid {} '{}'", name, token) })
}

fn parse_line(text: &str, line: usize) -> Result<Record, LoadError> {
    let tokens = text.split_whitespace().collect::<Vec<&str>>();
    if tokens.len() != 5 && tokens.len() != 6 {
        return Err(LoadError::Malformed { line, reason: format!("expected 6 fields, found {}", tokens.len()) });
    }
    let independent = match tokens[0] {
        "0" => false,
        "1" => true,
        other => return Err(LoadError::Malformed { line, reason: format!("invalid polarity '{}'", other) }),
    };
    let intervention = match tokens.get(5) {
        Some(token) => field::<u64>(token, "intervention", line)?,
        None => 0,
    };
    Ok(Record {
        line,
        independent,
        weight: field(tokens[1], "weight", line)?,
        v1: field(tokens[2], "variable", line)?,
        v2: field(tokens[3], "variable", line)?,
        condition: field(tokens[4], "condition", line)?,
        intervention,
    })
}

/// Returns the set encoded by the mask, or the first variable that does not fit in `n` variables
fn mask_to_set(mask: u64, n: usize) -> Result<VarSet, usize> {
    if mask >> n.min(63) != 0 {
        return Err(63 - mask.leading_zeros() as usize);
    }
    Ok(VarSet::from_bits(mask as u32))
}

/// Builds an instance from the content of a constraint file
pub fn parse_instance(text: &str, limits: &InstanceLimits) -> Result<Instance, LoadError> {
    let mut records = vec![];
    for (i, line) in text.lines().enumerate() {
        if line.len() >= 5 {
            records.push(parse_line(line, i + 1)?);
        }
    }
    let offset = match records.iter().map(|r| r.v1.min(r.v2)).min() {
        Some(offset) => offset,
        None => return Err(LoadError::Empty),
    };
    info!("indexing variables from {}", offset);

    let mut admitted = vec![];
    let mut total: Weight = 0;
    for record in records {
        let (v1, v2) = (record.v1 - offset, record.v2 - offset);
        if v1 == v2 {
            return Err(LoadError::Malformed { line: record.line, reason: format!("constraint between {} and itself", record.v1) });
        }
        if v1.max(v2) >= MAX_VARIABLES {
            return Err(LoadError::TooManyVariables { count: v1.max(v2) + 1, max: MAX_VARIABLES });
        }
        let condition = mask_to_set(record.condition, MAX_VARIABLES)
            .map_err(|variable| LoadError::VariableOutOfRange { line: record.line, variable })?;
        if condition.contains(v1) || condition.contains(v2) {
            return Err(LoadError::Malformed { line: record.line, reason: "an endpoint is in the conditioning set".to_string() });
        }
        if limits.admits(v1, v2, condition) {
            total = total.checked_add(record.weight)
                .filter(|w| *w < INFINITE_WEIGHT)
                .ok_or(LoadError::WeightOverflow { line: record.line })?;
            admitted.push((record, v1, v2, condition));
        }
    }

    let n = admitted.iter().map(|(_, v1, v2, _)| v1.max(v2) + 1).max().unwrap_or(0);
    let mut instance = Instance::new(offset);
    for (record, v1, v2, condition) in admitted {
        let out_of_range = |variable| LoadError::VariableOutOfRange { line: record.line, variable };
        let condition = mask_to_set(condition.bits() as u64, n).map_err(out_of_range)?;
        let intervention = mask_to_set(record.intervention, n).map_err(out_of_range)?;
        let constraint = Constraint::new(v1, v2, condition, intervention, record.independent, record.weight);
        instance.add(constraint);
    }
    if instance.number_constraints() == 0 {
        return Err(LoadError::Empty);
    }
    instance.finalize();
    debug!("{} variables, {} constraints ({} merged)", instance.size(), instance.number_constraints(), instance.number_merged());
    Ok(instance)
}

/// Reads the constraint file at `path`
pub fn read_instance(path: &Path, limits: &InstanceLimits) -> Result<Instance, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
    parse_instance(&text, limits)
}

#[cfg(test)]
mod test_constraint_parser {
    use super::*;
    use std::io::Write;

    fn parse(text: &str) -> Result<Instance, LoadError> {
        parse_instance(text, &InstanceLimits::default())
    }

    #[test]
    fn variables_are_renumbered() {
        let instance = parse("1 5 1 2 0 0\n0 3 3 1 2 0\n").unwrap();
        assert_eq!(1, instance.offset());
        assert_eq!(3, instance.size());
        assert_eq!(2, instance.number_constraints());
        assert!(instance.find_independence(0, 1, VarSet::empty(), VarSet::empty()).is_some());
        let dep = instance.find_dependence(0, 2, VarSet::singleton(1), VarSet::empty()).unwrap();
        assert_eq!(3, instance[dep].weight());
    }

    #[test]
    fn intervention_is_optional() {
        let instance = parse("0 4 0 2 0 2\n0 4 0 2 0\n").unwrap();
        assert_eq!(2, instance.number_constraints());
        assert!(instance.find_dependence(0, 2, VarSet::empty(), VarSet::singleton(1)).is_some());
        assert!(instance.find_dependence(0, 2, VarSet::empty(), VarSet::empty()).is_some());
        assert_eq!(2, instance.by_intervention().len());
    }

    #[test]
    fn short_lines_are_ignored() {
        let instance = parse("\n   \n1 5 0 1 0 0\n0\n").unwrap();
        assert_eq!(1, instance.number_constraints());
    }

    #[test]
    fn identical_statements_are_merged() {
        let instance = parse("1 5 0 1 0 0\n0 3 1 0 0 0\n1 1 0 1 0 0\n").unwrap();
        assert_eq!(1, instance.number_constraints());
        assert_eq!(2, instance.number_merged());
        let c = instance.find_independence(0, 1, VarSet::empty(), VarSet::empty()).unwrap();
        assert_eq!(3, instance[c].weight());
    }

    #[test]
    fn limits_filter_the_constraints() {
        let text = "1 5 0 1 0 0\n0 3 0 1 4 0\n0 2 0 3 0 0\n";
        let limits = InstanceLimits { max_vars: Some(3), max_cond: Some(0) };
        let instance = parse_instance(text, &limits).unwrap();
        assert_eq!(1, instance.number_constraints());
        assert_eq!(2, instance.size());
    }

    #[test]
    fn malformed_lines_are_reported() {
        assert!(matches!(parse("1 x 0 1 0 0"), Err(LoadError::Malformed { line: 1, .. })));
        assert!(matches!(parse("1 5 0 1 0 0\n2 5 0 1 0 0"), Err(LoadError::Malformed { line: 2, .. })));
        assert!(matches!(parse("1 5 0 1"), Err(LoadError::Malformed { line: 1, .. })));
        assert!(matches!(parse("1 5 0 0 0 0"), Err(LoadError::Malformed { line: 1, .. })));
        assert!(matches!(parse("1 5 0 1 1 0"), Err(LoadError::Malformed { line: 1, .. })));
    }

    #[test]
    fn variables_out_of_range_are_reported() {
        assert!(matches!(parse("1 5 0 1 8 0"), Err(LoadError::VariableOutOfRange { line: 1, variable: 3 })));
        assert!(matches!(parse("1 5 0 2 0 16"), Err(LoadError::VariableOutOfRange { line: 1, variable: 4 })));
        assert!(matches!(parse("1 5 0 40 0 0"), Err(LoadError::TooManyVariables { count: 41, .. })));
    }

    #[test]
    fn total_weight_must_stay_finite() {
        let heavy = Weight::MAX / 2 + 1;
        let text = format!("1 {} 0 1 0 0\n0 {} 0 2 0 0\n", heavy, heavy);
        assert!(matches!(parse(&text), Err(LoadError::WeightOverflow { line: 2 })));
        let text = format!("1 {} 0 1 0 0\n", Weight::MAX);
        assert!(matches!(parse(&text), Err(LoadError::WeightOverflow { line: 1 })));
        // Filtered constraints do not count
        let text = format!("1 {} 0 1 0 0\n0 {} 0 2 2 0\n", heavy, heavy);
        let limits = InstanceLimits { max_vars: None, max_cond: Some(0) };
        assert_eq!(1, parse_instance(&text, &limits).unwrap().number_constraints());
    }

    #[test]
    fn empty_instances_are_reported() {
        assert!(matches!(parse(""), Err(LoadError::Empty)));
        let limits = InstanceLimits { max_vars: None, max_cond: Some(0) };
        assert!(matches!(parse_instance("1 5 0 1 4 0", &limits), Err(LoadError::Empty)));
    }

    #[test]
    fn read_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1 5 0 1 0 0").unwrap();
        writeln!(file, "0 3 0 2 0 0").unwrap();
        let instance = read_instance(file.path(), &InstanceLimits::default()).unwrap();
        assert_eq!(2, instance.number_constraints());
        let missing = file.path().with_extension("missing");
        assert!(matches!(read_instance(&missing, &InstanceLimits::default()), Err(LoadError::Io { .. })));
    }
}
