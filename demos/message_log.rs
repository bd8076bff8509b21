//! Parse an indentfile and echo each directive as it dispatches.

use std::cell::RefCell;
use std::rc::Rc;

use indentfile_rs::{Arity, DirectiveSet, parse_str};

fn main() {
    let input = "\
# A small demo vocabulary.
say hello world

group build
\tsay compiling
\tsay linking

say done
";

    let log = Rc::new(RefCell::new(Vec::new()));

    let say_log = Rc::clone(&log);
    let group_log = Rc::clone(&log);
    let mut handler = DirectiveSet::new(())
        .handle("say", Arity::AtLeast(1), move |_ctx: &mut (), argv: &[String]| {
            say_log.borrow_mut().push(argv.join(" "));
            Ok(None)
        })
        .handle("group", Arity::Exactly(1), move |_ctx: &mut (), argv: &[String]| {
            let prefix = argv[0].clone();
            let inner = Rc::clone(&group_log);
            Ok(Some(Box::new(DirectiveSet::new(()).handle(
                "say",
                Arity::AtLeast(1),
                move |_ctx: &mut (), argv: &[String]| {
                    inner.borrow_mut().push(format!("[{prefix}] {}", argv.join(" ")));
                    Ok(None)
                },
            ))))
        });

    parse_str(input, &mut handler).expect("parse failed");

    for line in log.borrow().iter() {
        println!("{line}");
    }
}
