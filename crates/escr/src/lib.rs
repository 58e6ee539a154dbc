//! escr - the public engine API (§6).
//!
//! This is the crate a host embeds: a CLI, a test harness, a REPL. It owns
//! nothing about *how* scripts run - that's `escr-par`/`escr-sem`/`escr-eval`
//! - only the orchestration (`Engine`) and the one interface a host must
//! implement itself (`Logger`). A CLI that parses `--emit`/`--opt-level`
//! flags the way the teacher's `faxt` does is explicitly out of scope here;
//! `EngineConfig` covers only the knobs `Engine` itself needs.

pub mod config;
pub mod engine;
pub mod logger;
pub mod stream;

pub use config::EngineConfig;
pub use engine::{Engine, EngineContext};
pub use logger::{Logger, Severity, Source};
pub use stream::TextStream;

#[cfg(test)]
mod tests {
    use super::*;

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
    fn hello_world() {
        let (severity, output) = run("x.egg", "print(`Hello, World!`);");
        assert_eq!(severity, Severity::Information);
        assert_eq!(output, "Hello, World!\n");
    }

    #[test]
    fn arithmetic_and_control_flow() {
        let (severity, output) = run(
            "x.egg",
            "var s = 0;\nfor (var i = 1; i <= 10; ++i) { s += i; }\nprint(s);",
        );
        assert_eq!(severity, Severity::Information);
        assert_eq!(output, "55\n");
    }

    #[test]
    fn generator_output() {
        let (severity, output) = run(
            "x.egg",
            "int... naturals() { for (var i = 0; ; ++i) yield i; }\nvar it = naturals();\nprint(it(), it(), it());",
        );
        assert_eq!(severity, Severity::Information);
        assert_eq!(output, "012\n");
    }

    #[test]
    fn uncaught_exception_reports_location() {
        let (severity, output) = run("x.egg", "throw `boom`;");
        assert_eq!(severity, Severity::Error);
        assert_eq!(output, "x.egg(1,1): boom\n");
    }

    #[test]
    fn type_mismatch_at_prepare_time() {
        let stream = TextStream::from_str("", "int x = \"s\";");
        let mut engine = Engine::create_engine_from_text_stream(stream).expect("stream reads fine");
        let mut logger = RecordingLogger::new();
        let mut ctx = EngineContext::new(&mut logger);
        let severity = engine.prepare(&mut ctx);
        assert_eq!(severity, Severity::Error);
        assert_eq!(logger.text(), "(1,1): Cannot initialize 'x' of type 'int' with a value of type 'string'\n");
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
}
