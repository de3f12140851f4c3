//! `changeset-compose`: compose a chain of changesets.
//!
//! Usage:
//!   changeset-compose '<cs1>' '<cs2>' ...
//!
//! An attribute pool in JSON may be given on stdin; empty input means an
//! empty pool.

use std::io::{self, Read};

use pad_changeset::cli::{compose_changesets, init_logging};

fn main() {
    init_logging();
    let changesets: Vec<String> = std::env::args().skip(1).collect();
    if changesets.is_empty() {
        eprintln!("Arguments must be one or more changesets.");
        std::process::exit(1);
    }

    let mut pool = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut pool) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    match compose_changesets(&changesets, &pool) {
        Ok(result) => println!("{result}"),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
