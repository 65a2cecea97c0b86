//! Replay a crashing input: `main_cli path/to/crash` or `main_cli < crash`.
use std::io::Read;

use testcase::run;

fn main() {
    let input = match std::env::args_os().nth(1) {
        Some(path) => std::fs::read(path).unwrap(),
        None => {
            let mut input = Vec::new();
            std::io::stdin().lock().read_to_end(&mut input).unwrap();
            input
        }
    };
    run(&input);
}
