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

use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;

use bcause::args::Args;

fn main() {
    let args = Args::parse();
    let filter = EnvFilter::try_from_env("BCAUSE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose() { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match bcause::search(&args) {
        Ok(solution) => {
            if solution.is_optimal() {
                println!("OPTIMAL SOLUTION FOUND");
            } else {
                println!("Best graph found");
            }
            solution.print();
        },
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        },
    }
}
