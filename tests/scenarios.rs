//! End-to-end scenarios from spec.md §8 "Testable properties", run
//! against the in-memory reference host.

use tcl_core::host::memory::MemoryHost;
use tcl_core::{Config, Interpreter};

fn interp() -> Interpreter<MemoryHost> {
    Interpreter::new(MemoryHost::new(), Config::default())
}

#[test]
fn substitution_scenario() {
    let mut ip = interp();
    let result = ip.eval("set x 5; set y [expr $x+2]; puts $y").unwrap();
    assert_eq!(ip.host.get_string(&result), "");
    assert_eq!(ip.host.stdout, "7\n");
}

#[test]
fn proc_with_default_and_variadic_args() {
    let mut ip = interp();
    ip.eval("proc f {a {b 10} args} { return [list $a $b $args] }").unwrap();
    let result = ip.eval("f 1 2 3 4").unwrap();
    assert_eq!(ip.host.get_string(&result), "1 2 {3 4}");
}

#[test]
fn proc_variadic_defaults_apply_when_omitted() {
    let mut ip = interp();
    ip.eval("proc f {a {b 10} args} { return [list $a $b $args] }").unwrap();
    let result = ip.eval("f 1").unwrap();
    assert_eq!(ip.host.get_string(&result), "1 10 {}");
}

#[test]
fn catch_reports_integer_code_and_sets_error_message() {
    let mut ip = interp();
    let code = ip.eval("catch { expr 1/0 } msg").unwrap();
    assert_eq!(ip.host.get_string(&code), "1");
    let msg = ip.read_scalar("msg").unwrap();
    let msg_text = ip.host.get_string(&msg);
    assert!(msg_text.starts_with("divide by zero"));
    assert!(msg_text.contains("in expression \"1/0_@_\""));
}

#[test]
fn catch_absorbs_an_engine_raised_error_instead_of_unwinding() {
    // divide-by-zero is raised as a Rust `Err`, not via the `error`
    // command — `catch` must still convert it to code 1, not propagate.
    let mut ip = interp();
    let code = ip.eval("catch { expr 1/0 }").unwrap();
    assert_eq!(ip.host.get_string(&code), "1");
}

#[test]
fn catch_absorbs_no_such_variable_error() {
    let mut ip = interp();
    let code = ip.eval("catch { set x $nope } msg").unwrap();
    assert_eq!(ip.host.get_string(&code), "1");
    let msg = ip.read_scalar("msg").unwrap();
    assert_eq!(ip.host.get_string(&msg), "can't read \"nope\": no such variable");
}

#[test]
fn catch_absorbs_return_so_the_proc_keeps_running() {
    let mut ip = interp();
    // `catch` must convert the caught script's result-code to Ok, so a
    // `return` inside it does not propagate out and end the proc early.
    ip.eval("proc p {} { catch { return 5 }; return done }").unwrap();
    let result = ip.eval("p").unwrap();
    assert_eq!(ip.host.get_string(&result), "done");
}

#[test]
fn expression_precedence_scenario() {
    let mut ip = interp();
    let a = ip.eval("expr {2 + 3 * 4 ** 2}").unwrap();
    assert_eq!(ip.host.get_string(&a), "50");
    let b = ip.eval("expr {1 < 2 && 3 > 2}").unwrap();
    assert_eq!(ip.host.get_string(&b), "1");
}

#[test]
fn empty_script_is_ok_with_empty_result() {
    let mut ip = interp();
    let result = ip.eval("").unwrap();
    assert_eq!(ip.host.get_string(&result), "");
}

#[test]
fn expression_over_only_whitespace_errors() {
    let mut ip = interp();
    let err = ip.eval("expr {   }").unwrap_err();
    assert!(err.to_string().contains("empty expression"));
}

#[test]
fn while_true_break_returns_ok_empty() {
    let mut ip = interp();
    let result = ip.eval("while 1 {break}").unwrap();
    assert_eq!(ip.host.get_string(&result), "");
}

#[test]
fn subst_is_idempotent_on_plain_text() {
    let mut ip = interp();
    let once = ip.eval("subst {hello world}").unwrap();
    let once_text = ip.host.get_string(&once);
    let again = ip.eval(&format!("subst {{{}}}", once_text)).unwrap();
    assert_eq!(ip.host.get_string(&again), once_text);
}

#[test]
fn list_round_trip_recovers_original_values() {
    let mut ip = interp();
    ip.eval("set l [list a b c]").unwrap();
    let len = ip.eval("llength $l").unwrap();
    assert_eq!(ip.host.get_string(&len), "3");
    for (i, expected) in ["a", "b", "c"].iter().enumerate() {
        let item = ip.eval(&format!("lindex $l {}", i)).unwrap();
        assert_eq!(&ip.host.get_string(&item), expected);
    }
}

#[test]
fn brace_quoted_word_is_literal() {
    let mut ip = interp();
    let result = ip.eval("set x {$not substituted [not run]}").unwrap();
    assert_eq!(ip.host.get_string(&result), "$not substituted [not run]");
}

#[test]
fn integer_division_matches_tcl_floor_semantics() {
    let mut ip = interp();
    assert_eq!(ip.host.get_string(&ip.eval("expr {7 / 2}").unwrap()), "3");
    assert_eq!(ip.host.get_string(&ip.eval("expr {-7 / 2}").unwrap()), "-4");
    assert_eq!(ip.host.get_string(&ip.eval("expr {7 % -2}").unwrap()), "-1");
}

#[test]
fn uncaught_break_outside_a_loop_is_an_error() {
    let mut ip = interp();
    ip.eval("proc p {} { break }").unwrap();
    let err = ip.eval("p").unwrap_err();
    assert!(err.to_string().contains("break") || err.to_string().contains("loop"));
}

#[test]
fn global_links_outer_variable_into_proc_scope() {
    let mut ip = interp();
    ip.eval("set counter 0").unwrap();
    ip.eval("proc bump {} { global counter; incr counter }").unwrap();
    ip.eval("bump").unwrap();
    ip.eval("bump").unwrap();
    let result = ip.eval("set counter").unwrap();
    assert_eq!(ip.host.get_string(&result), "2");
}

#[test]
fn proc_reads_global_variable_without_an_explicit_global_link() {
    let mut ip = interp();
    ip.eval("set counter 0").unwrap();
    ip.eval("proc peek {} { set counter }").unwrap();
    let result = ip.eval("peek").unwrap();
    assert_eq!(ip.host.get_string(&result), "0");
}

#[test]
fn upvar_links_caller_variable_by_name() {
    let mut ip = interp();
    ip.eval("proc setit {varName val} { upvar 1 $varName local; set local $val }").unwrap();
    ip.eval("set target {}").unwrap();
    ip.eval("setit target hello").unwrap();
    let result = ip.eval("set target").unwrap();
    assert_eq!(ip.host.get_string(&result), "hello");
}

#[test]
fn error_sets_message_and_stops_the_script() {
    let mut ip = interp();
    let err = ip.eval("error {boom}").unwrap_err();
    assert!(err.to_string().contains("boom"));
}

#[test]
fn catch_captures_error_message_raised_by_error_command() {
    let mut ip = interp();
    let code = ip.eval("catch { error {boom} } msg").unwrap();
    assert_eq!(ip.host.get_string(&code), "1");
    let msg = ip.read_scalar("msg").unwrap();
    assert_eq!(ip.host.get_string(&msg), "boom");
}

#[test]
fn try_on_error_handler_runs_and_recovers() {
    let mut ip = interp();
    let result = ip.eval("try { error {bad} } on error e { return recovered:$e }").unwrap();
    assert_eq!(ip.host.get_string(&result), "recovered:bad");
}

#[test]
fn try_finally_runs_even_when_body_succeeds() {
    let mut ip = interp();
    ip.eval("set ran 0").unwrap();
    ip.eval("try { return ok } finally { set ran 1 }").unwrap();
    let result = ip.eval("set ran").unwrap();
    assert_eq!(ip.host.get_string(&result), "1");
}

#[test]
fn throw_sets_custom_error_code() {
    let mut ip = interp();
    let code = ip.eval("catch { throw MYERR {custom failure} } msg").unwrap();
    assert_eq!(ip.host.get_string(&code), "1");
    let msg = ip.read_scalar("msg").unwrap();
    assert_eq!(ip.host.get_string(&msg), "custom failure");
    assert_eq!(ip.error_code, "MYERR");
}

#[test]
fn apply_invokes_an_anonymous_lambda() {
    let mut ip = interp();
    let result = ip.eval("apply {{x y} {return [expr {$x + $y}]}} 3 4").unwrap();
    assert_eq!(ip.host.get_string(&result), "7");
}

#[test]
fn yieldto_suspends_with_the_target_commands_result() {
    let mut ip = interp();
    ip.eval("proc produce {} { return 99 }").unwrap();
    let first = ip.eval("coroutine g apply {{} { yieldto produce }}").unwrap();
    assert_eq!(ip.host.get_string(&first), "99");
}
