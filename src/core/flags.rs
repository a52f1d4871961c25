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

//  Inspired from @xgillard rsolve (https://www.github.com/xgillard/rsolve)

/// The six marks that can be decided on a pair x < y. Present and absent marks of the same
/// kind are negations of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    BidirectedPresent = 1,
    ForwardPresent = 2,
    BackwardPresent = 4,
    BidirectedAbsent = 8,
    ForwardAbsent = 16,
    BackwardAbsent = 32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairMarks(u8);

impl PairMarks {

    #[inline]
    pub fn new() -> Self {
        PairMarks(0)
    }

    #[inline]
    pub fn set(&mut self, mark: Mark) {
        self.0 |= mark as u8;
    }

    #[inline]
    pub fn unset(&mut self, mark: Mark) {
        self.0 &= !(mark as u8);
    }

    #[inline]
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    #[inline]
    pub fn is_set(&self, mark: Mark) -> bool {
        self.0 & (mark as u8) != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod test_pair_marks {
    use super::*;

    #[test]
    fn set_and_unset() {
        let mut marks = PairMarks::new();
        assert!(marks.is_empty());
        marks.set(Mark::ForwardPresent);
        marks.set(Mark::BidirectedAbsent);
        assert!(marks.is_set(Mark::ForwardPresent));
        assert!(marks.is_set(Mark::BidirectedAbsent));
        assert!(!marks.is_set(Mark::BackwardPresent));
        marks.unset(Mark::ForwardPresent);
        assert!(!marks.is_set(Mark::ForwardPresent));
        // unsetting twice must not flip the mark back
        marks.unset(Mark::ForwardPresent);
        assert!(!marks.is_set(Mark::ForwardPresent));
        marks.clear();
        assert!(marks.is_empty());
    }
}
