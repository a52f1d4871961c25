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

use std::path::PathBuf;

/// Errors raised while loading an instance or the fixed edges
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("can not read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("line {line}: variable {variable} is out of range")]
    VariableOutOfRange { line: usize, variable: usize },

    #[error("{count} variables, at most {max} are supported")]
    TooManyVariables { count: usize, max: usize },

    #[error("line {line}: the total weight of the constraints is too large")]
    WeightOverflow { line: usize },

    #[error("invalid fixed edge '{token}': {reason}")]
    InvalidFixing { token: String, reason: String },

    #[error("the instance has no constraint")]
    Empty,
}
