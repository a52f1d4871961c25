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

use std::fmt;
use std::time::Duration;

/// Implements a bunch of statistics that are collected during the search
#[derive(Default)]
pub struct Statistics<const B: bool> {
    visited_branches: usize,
    visited_bottom: usize,
    good_lbs: usize,
    cyclic_solutions: usize,
    symmetries1: usize,
    symmetries2: usize,
    extra_indeps: usize,
    lp_calls: usize,
    init_time: Duration,
    evaluation_time: Duration,
    lp_time: Duration,
    total_time: Duration,
    peak_memory: f32,
}

fn percentage(a: usize, b: usize) -> f64 {
    if a == 0 || b == 0 {
        0.0
    } else {
        a as f64 / b as f64 * 100.0
    }
}

fn time_percentage(a: Duration, b: Duration) -> f64 {
    if b.is_zero() {
        0.0
    } else {
        a.as_secs_f64() / b.as_secs_f64() * 100.0
    }
}

impl<const B: bool> Statistics<B> {
    pub fn branch(&mut self) {
        if B {
            self.visited_branches += 1;
        }
    }

    pub fn bottom(&mut self) {
        if B {
            self.visited_bottom += 1;
        }
    }

    pub fn good_lb(&mut self) {
        if B {
            self.good_lbs += 1;
        }
    }

    pub fn cyclic(&mut self) {
        if B {
            self.cyclic_solutions += 1;
        }
    }

    pub fn symmetry1(&mut self) {
        if B {
            self.symmetries1 += 1;
        }
    }

    pub fn symmetry2(&mut self) {
        if B {
            self.symmetries2 += 1;
        }
    }

    pub fn extra_indep(&mut self) {
        if B {
            self.extra_indeps += 1;
        }
    }

    pub fn initialized(&mut self, time: Duration) {
        if B {
            self.init_time = time;
        }
    }

    /// Records the figures kept by the other components at the end of the search
    pub fn finish(&mut self, lp_calls: usize, evaluation_time: Duration, lp_time: Duration, total_time: Duration, peak_memory: f32) {
        if B {
            self.lp_calls = lp_calls;
            self.evaluation_time = evaluation_time;
            self.lp_time = lp_time;
            self.total_time = total_time;
            self.peak_memory = peak_memory;
        }
    }

    pub fn visited_branches(&self) -> usize {
        self.visited_branches
    }

    pub fn visited_bottom(&self) -> usize {
        self.visited_bottom
    }

    pub fn good_lbs(&self) -> usize {
        self.good_lbs
    }

    pub fn print(&self) {
        if B {
            println!("{}", self);
        }
    }
}

impl<const B: bool> fmt::Display for Statistics<B> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if B {
            let secs = self.total_time.as_secs_f64();
            let rate = if secs > 0.0 { (self.visited_branches as f64 / secs) as usize } else { self.visited_branches };
            writeln!(f, "Time spent: {:.3}s", secs)?;
            writeln!(f, "  To init search: {:.3}s ({:.2} %)", self.init_time.as_secs_f64(), time_percentage(self.init_time, self.total_time))?;
            writeln!(f, "  To evaluate constraints: {:.3}s ({:.2} %)", self.evaluation_time.as_secs_f64(), time_percentage(self.evaluation_time, self.total_time))?;
            writeln!(f, "  In linear relaxation: {:.3}s ({:.2} %)", self.lp_time.as_secs_f64(), time_percentage(self.lp_time, self.total_time))?;
            writeln!(f, "Visited branches: {} ({} branches/s) | at bottom {} ({:.2} %)",
                self.visited_branches, rate, self.visited_bottom, percentage(self.visited_bottom, self.visited_branches))?;
            writeln!(f, "Good LB calculations: {} ({:.2} %) | relaxation calls {} ({:.2} %)",
                self.good_lbs, percentage(self.good_lbs, self.visited_branches),
                self.lp_calls, percentage(self.lp_calls, self.visited_branches))?;
            writeln!(f, "Backtracks: cyclic {} | symmetry #1 {} | symmetry #2 {} | deduced independences {}",
                self.cyclic_solutions, self.symmetries1, self.symmetries2, self.extra_indeps)?;
            write!(f, "Peak memory: {:.3} MB", self.peak_memory)
        } else {
            write!(f, "")
        }
    }
}
