//! Preparer edge cases that don't fit naturally alongside the main
//! contract-table tests in `analysis.rs`.

#[cfg(test)]
mod tests {
    use crate::analysis::Preparer;
    use escr_par::parse_program;
    use escr_util::{FileId, Handler};

    fn prepare(src: &str) -> Handler {
        let mut parse_handler = Handler::new();
        let program = parse_program(src, FileId::DUMMY, &mut parse_handler).expect("parse ok");
        let mut handler = Handler::new();
        let mut preparer = Preparer::new(&mut handler);
        preparer.prepare_program(&program);
        handler
    }

    #[test]
    fn null_coalesce_on_never_null_type_warns() {
        let handler = prepare("int x = 1; int y = x ?? 2;");
        assert!(handler.warning_count() > 0);
    }

    #[test]
    fn null_coalesce_on_nullable_type_is_silent() {
        let handler = prepare("string? s = null; string t = s ?? \"default\";");
        assert!(!handler.has_errors());
        assert_eq!(handler.warning_count(), 0);
    }

    #[test]
    fn assert_with_comparison_does_not_require_extra_bool_check() {
        // the comparison is already wrapped as a Predicate by the parser, so
        // assert's special-cased bool check is skipped entirely here.
        let handler = prepare("assert(1 == 1);");
        assert!(!handler.has_errors());
    }

    #[test]
    fn assert_with_non_bool_argument_errors() {
        let handler = prepare("assert(\"not a bool\");");
        assert!(handler.has_errors());
    }

    #[test]
    fn switch_with_two_defaults_errors() {
        let handler = prepare(
            r#"
            switch (1) {
                default: print("a"); break;
                default: print("b"); break;
            }
            "#,
        );
        assert!(handler.has_errors());
    }

    #[test]
    fn foreach_over_int_is_an_error() {
        let handler = prepare("foreach (var x: 5) { print(x); }");
        assert!(handler.has_errors());
    }

    #[test]
    fn foreach_over_array_literal_is_fine() {
        let handler = prepare("foreach (var x: [1, 2, 3]) { print(x); }");
        assert!(!handler.has_errors());
    }

    #[test]
    fn deref_of_non_pointer_errors() {
        let handler = prepare("int x = 1; int y = *x;");
        assert!(handler.has_errors());
    }

    #[test]
    fn address_of_then_deref_round_trips() {
        let handler = prepare("int x = 1; int* p = &x; int y = *p;");
        assert!(!handler.has_errors());
    }

    #[test]
    fn return_type_mismatch_in_function_errors() {
        let handler = prepare("int f() { return \"oops\"; }");
        assert!(handler.has_errors());
    }

    #[test]
    fn return_with_value_in_generator_errors() {
        let handler = prepare("int...gen() { return 1; }");
        assert!(handler.has_errors());
    }

    #[test]
    fn switch_clause_without_default_can_fall_through() {
        let handler = prepare(
            r#"
            void f() {
                switch (1) {
                    case 1: return;
                }
            }
            "#,
        );
        assert!(!handler.has_errors());
    }

    #[test]
    fn dot_access_on_arithmetic_type_errors() {
        let handler = prepare("int x = 1; var y = x.foo;");
        assert!(handler.has_errors());
    }

    #[test]
    fn dot_access_on_object_is_fine() {
        let handler = prepare("var obj = { a: 1 }; var y = obj.a;");
        assert!(!handler.has_errors());
    }
}
