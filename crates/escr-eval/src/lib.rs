//! escr-eval - the tree-walking evaluator (§3.2, §4.5, §5).
//!
//! Takes a parsed (and, in the normal pipeline, already-prepared) program
//! and runs it: binds names against its own runtime [`scope::Scope`] chain
//! rather than reusing `escr-sem`'s type-only `TypeTable` (that table has no
//! name-to-storage mapping to reuse - see `analysis::TypeTable`'s doc
//! comment), builds `Value`s, and drives the mark-sweep [`escr_gc::Basket`]
//! that backs every heap object a script creates.
//!
//! `escr-sem` is still a real dependency: a caller is expected to run
//! `escr_sem::prepare` first and bail out on any reported error before
//! handing the program here, the same way a compiler's codegen stage trusts
//! its type-checking stage. This crate does not re-check anything itself -
//! running an unprepared program is unsupported and may panic or produce
//! nonsense, exactly like handing a backend unwrapped.

pub mod builtins;
pub mod error;
pub mod eval;
pub mod generator;
pub mod object;
pub mod ops;
pub mod scope;
pub mod value;

pub use error::{EvalError, EvalResult};
pub use eval::{Evaluator, Output};
pub use generator::{DoPhase, ForPhase, Frame, GeneratorState};
pub use object::{FunctionDef, ObjectKind, Slot, VanillaObject};
pub use scope::Scope;
pub use value::{Cell, EscrString, FlowControl, Value};

use escr_par::ast::Program;

/// Run a prepared program to completion, reusing `evaluator`'s basket and
/// output sink (so a caller can run several programs, or re-enter a REPL,
/// against one interpreter). Returns whatever `Evaluator::run` returns:
/// `Value::Void` on a clean finish, or an uncaught `Value::FlowControl`
/// carrying the exception that escaped every `try`/`catch` in the program.
pub fn run(program: &Program, evaluator: &mut Evaluator<'_>) -> Value {
    evaluator.run(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use escr_par::parse_program;
    use escr_util::{FileId, Handler};

    struct RecordingOutput {
        printed: Vec<String>,
    }

    impl RecordingOutput {
        fn new() -> Self {
            Self { printed: Vec::new() }
        }
    }

    impl Output for RecordingOutput {
        fn print(&mut self, text: &str) {
            self.printed.push(text.to_string());
        }
    }

    fn run_source(source: &str) -> (Value, RecordingOutput) {
        let mut parse_handler = Handler::new();
        let program = parse_program(source, FileId::DUMMY, &mut parse_handler).expect("parse ok");
        let mut prepare_handler = Handler::new();
        let (_, _) = escr_sem::prepare(&program, &mut prepare_handler);
        assert!(!prepare_handler.has_errors(), "program failed to prepare");

        let mut output = RecordingOutput::new();
        let result = {
            let mut evaluator = Evaluator::new(&mut output);
            evaluator.run(&program)
        };
        (result, output)
    }

    #[test]
    fn runs_a_print_statement() {
        let (result, output) = run_source(r#"print("hello");"#);
        assert!(matches!(result, Value::Void));
        assert_eq!(output.printed, vec!["hello".to_string()]);
    }

    #[test]
    fn arithmetic_and_variables() {
        let (_, output) = run_source("int x = 2; int y = 3; print(x * y + 1);");
        assert_eq!(output.printed, vec!["7".to_string()]);
    }

    #[test]
    fn while_loop_with_break() {
        let (_, output) = run_source(
            r#"
            int i = 0;
            while (true) {
                if (i == 3) { break; }
                print(i);
                i += 1;
            }
            "#,
        );
        assert_eq!(output.printed, vec!["0", "1", "2"]);
    }

    #[test]
    fn for_each_over_an_array() {
        let (_, output) = run_source(
            r#"
            var items = [1, 2, 3];
            for (var it : items) {
                print(it.value);
            }
            "#,
        );
        assert_eq!(output.printed, vec!["1", "2", "3"]);
    }

    #[test]
    fn functions_return_values() {
        let (_, output) = run_source(
            r#"
            int square(int n) {
                return n * n;
            }
            print(square(5));
            "#,
        );
        assert_eq!(output.printed, vec!["25".to_string()]);
    }

    #[test]
    fn generator_yields_across_resumes() {
        let (_, output) = run_source(
            r#"
            int... naturals() {
                int i = 0;
                while (true) {
                    yield i;
                    i += 1;
                }
            }
            var it = naturals();
            print(it());
            print(it());
            print(it());
            "#,
        );
        assert_eq!(output.printed, vec!["0", "1", "2"]);
    }

    #[test]
    fn uncaught_exception_propagates_as_flow_control() {
        let (result, _) = run_source(r#"throw "boom";"#);
        assert!(matches!(result, Value::FlowControl(fc) if matches!(*fc, FlowControl::Throw(_))));
    }

    #[test]
    fn try_catch_recovers() {
        let (_, output) = run_source(
            r#"
            try {
                throw "boom";
            } catch (Object e) {
                print("caught");
            }
            "#,
        );
        assert_eq!(output.printed, vec!["caught".to_string()]);
    }

    #[test]
    fn assert_failure_reports_operands() {
        let (result, _) = run_source("assert(1 == 2);");
        match result {
            Value::FlowControl(fc) => match *fc {
                FlowControl::Throw(Value::Object(obj)) => {
                    assert_eq!(obj.type_name(), "Exception");
                }
                _ => panic!("expected a thrown exception"),
            },
            _ => panic!("expected flow control"),
        }
    }
}
