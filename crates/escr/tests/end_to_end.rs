//! End-to-end scenarios (spec §8) run through the public `escr` API only -
//! an integration test can't reach into a crate's private test helpers, so
//! this re-implements the small `RecordingLogger` sink rather than sharing
//! the one in `src/lib.rs`'s unit tests.

use escr::{Engine, EngineContext, Logger, Severity, Source, TextStream};

struct RecordingLogger {
    lines: Vec<String>,
}

impl RecordingLogger {
    fn new() -> Self {
        Self { lines: Vec::new() }
    }

    fn text(&self) -> String {
        self.lines.iter().map(|l| format!("{l}\n")).collect()
    }
}

impl Logger for RecordingLogger {
    fn log(&mut self, _source: Source, _severity: Severity, message: &str) {
        self.lines.push(message.to_string());
    }
}

fn run(resource: &str, source: &str) -> (Severity, String) {
    let stream = TextStream::from_str(resource, source);
    let mut engine = Engine::create_engine_from_text_stream(stream).expect("stream reads fine");
    let mut logger = RecordingLogger::new();
    let mut ctx = EngineContext::new(&mut logger);
    let severity = engine.run(&mut ctx);
    (severity, logger.text())
}

#[test]
fn scenario_1_hello_world() {
    let (severity, output) = run("x.egg", "print(`Hello, World!`);");
    assert_eq!(severity, Severity::Information);
    assert_eq!(output, "Hello, World!\n");
}

#[test]
fn scenario_2_arithmetic_and_loops() {
    let (severity, output) = run(
        "x.egg",
        "var s = 0;\nfor (var i = 1; i <= 10; ++i) { s += i; }\nprint(s);",
    );
    assert_eq!(severity, Severity::Information);
    assert_eq!(output, "55\n");
}

#[test]
fn scenario_3_generator_calls() {
    let (severity, output) = run(
        "x.egg",
        "int... naturals() { for (var i = 0; ; ++i) yield i; }\nvar it = naturals();\nprint(it(), it(), it());",
    );
    assert_eq!(severity, Severity::Information);
    assert_eq!(output, "012\n");
}

#[test]
fn scenario_4_uncaught_exception_reports_location() {
    let (severity, output) = run("x.egg", "throw `boom`;");
    assert_eq!(severity, Severity::Error);
    assert_eq!(output, "x.egg(1,1): boom\n");
}

#[test]
fn scenario_5_type_mismatch_at_prepare_time() {
    let stream = TextStream::from_str("", "int x = \"s\";");
    let mut engine = Engine::create_engine_from_text_stream(stream).expect("stream reads fine");
    let mut logger = RecordingLogger::new();
    let mut ctx = EngineContext::new(&mut logger);
    let severity = engine.prepare(&mut ctx);
    assert_eq!(severity, Severity::Error);
    assert_eq!(logger.text(), "(1,1): Cannot initialize 'x' of type 'int' with a value of type 'string'\n");
}

#[test]
fn scenario_6_shadowing_warning() {
    let (severity, output) = run("x.egg", "var a = 1;\n{ var a = 2; print(a); }\nprint(a);");
    assert_eq!(severity, Severity::Warning);
    assert_eq!(output, "2\n1\n");
}

#[test]
fn prepare_twice_is_an_error() {
    let stream = TextStream::from_str("<input>", "print(1);");
    let mut engine = Engine::create_engine_from_text_stream(stream).expect("stream reads fine");
    let mut logger = RecordingLogger::new();
    let mut ctx = EngineContext::new(&mut logger);
    assert_eq!(engine.prepare(&mut ctx), Severity::None);
    assert_eq!(engine.prepare(&mut ctx), Severity::Error);
    assert_eq!(logger.text(), "Program prepared more than once\n");
}

#[test]
fn execute_before_prepare_is_an_error() {
    let stream = TextStream::from_str("<input>", "print(1);");
    let mut engine = Engine::create_engine_from_text_stream(stream).expect("stream reads fine");
    let mut logger = RecordingLogger::new();
    let mut ctx = EngineContext::new(&mut logger);
    assert_eq!(engine.execute(&mut ctx), Severity::Error);
    assert_eq!(logger.text(), "Program not prepared before execution\n");
}

#[test]
fn create_engine_from_parsed_skips_lexing() {
    let mut handler = escr_util::Handler::new();
    let file = escr_util::FileId::DUMMY;
    let program = escr_par::parse_program("print(1);", file, &mut handler)
        .expect("fixture parses");
    let mut engine = Engine::create_engine_from_parsed("<parsed>", program);
    let mut logger = RecordingLogger::new();
    let mut ctx = EngineContext::new(&mut logger);
    assert_eq!(engine.run(&mut ctx), Severity::Information);
    assert_eq!(logger.text(), "1\n");
}
