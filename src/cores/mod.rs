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

//! Unsatisfiable cores are sets of constraints that no graph satisfies together. They are
//! gathered once, before the search, by `CoreFinder` and then used in two ways: the `CoreSet`
//! propagates them during the search (when every constraint of a core but one is satisfied, the
//! last one is violated), and the lower-bound oracle packs them.

pub mod coreset;
pub mod finder;

pub use coreset::{CoreIndex, CoreSet};
pub use finder::CoreFinder;
