//! `changeset-apply`: apply a changeset to a text.
//!
//! Usage:
//!   changeset-apply '<changeset>'
//!
//! The text is read from stdin and the result written to stdout unchanged,
//! without an added newline.

use std::io::{self, Read, Write};

use pad_changeset::cli::{apply_changeset, init_logging};

fn main() {
    init_logging();
    let Some(cs) = std::env::args().nth(1) else {
        eprintln!("First argument must be a changeset.");
        std::process::exit(1);
    };

    let mut text = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut text) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    match apply_changeset(&text, &cs) {
        Ok(result) => {
            if let Err(e) = io::stdout().write_all(result.as_bytes()) {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
