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

//! Readers for the inputs of the solver: the weighted constraints and the edges fixed by the
//! user. Both report malformed inputs through `LoadError`.

pub mod constraints;
pub mod fixings;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::LoadError;

pub use constraints::{parse_instance, read_instance};
pub use fixings::parse_fixings;

/// Returns the content of the file named by `argument` if such a file exists, the argument
/// itself otherwise
pub fn text_from_argument(argument: &str) -> Result<String, LoadError> {
    let path = Path::new(argument);
    if !path.is_file() {
        return Ok(argument.to_string());
    }
    let mut text = String::new();
    File::open(path)
        .and_then(|mut file| file.read_to_string(&mut text))
        .map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
    Ok(text)
}
