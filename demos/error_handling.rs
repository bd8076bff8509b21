//! Demonstrate error reporting for invalid indentfile input.

use indentfile_rs::{Arity, DirectiveSet, ErrorKind, parse_str};

fn handler() -> DirectiveSet<()> {
    DirectiveSet::new(()).handle("set", Arity::Exactly(2), |_ctx: &mut (), _argv: &[String]| {
        Ok(None)
    })
}

fn main() {
    // Unclosed quotes
    match parse_str("set greeting 'unclosed\n", &mut handler()) {
        Ok(()) => println!("Parsed OK (unexpected)"),
        Err(e) => {
            println!("Syntax error: {e}");
            println!("  Kind: {:?}", e.kind());
            println!(
                "  Location: line {}, column {}",
                e.location().lineno,
                e.location().offset
            );
        }
    }

    println!();

    // Wrong argument count, reported with a filename attached
    match parse_str("set greeting\n", &mut handler()) {
        Ok(()) => println!("Parsed OK (unexpected)"),
        Err(e) => {
            let e = e.in_file("demo.conf");
            println!("Directive error: {e}");
            println!("  Is a directive error: {}", e.is(ErrorKind::Directive));
        }
    }
}
