//! `changeset-follow`: rebase a changeset over a concurrent one.
//!
//! Usage:
//!   changeset-follow [--reverse] '<cs1>' '<cs2>'
//!
//! Prints `cs2` rewritten to apply after `cs1`. With `--reverse`, `cs2`'s
//! inserts win ties at the same position. An attribute pool in JSON may be
//! given on stdin.

use std::io::{self, Read};

use pad_changeset::cli::{follow_changesets, init_logging};

fn main() {
    init_logging();
    let mut reverse = false;
    let mut changesets = Vec::new();
    for arg in std::env::args().skip(1) {
        if arg == "--reverse" {
            reverse = true;
        } else {
            changesets.push(arg);
        }
    }
    let [cs1, cs2] = changesets.as_slice() else {
        eprintln!("Arguments must be exactly two changesets.");
        std::process::exit(1);
    };

    let mut pool = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut pool) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    match follow_changesets(cs1, cs2, reverse, &pool) {
        Ok(result) => println!("{result}"),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
