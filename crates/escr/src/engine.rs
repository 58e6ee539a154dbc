//! `Engine`, the orchestration type a host embeds (§6.1).
//!
//! Wires the pipeline stages together behind one API, the way
//! `faxc-drv::Session::compile` walks lexer -> parser -> semantic analyzer
//! -> codegen: `prepare` runs the parser (if needed) and `escr_sem::prepare`
//! and reports every diagnostic; `execute` hands the prepared AST to a
//! fresh `escr_eval::Evaluator`. `run` is `prepare` then `execute`, skipping
//! execution if preparation already failed - mirrored from the reference
//! implementation's `IEggEngine::run`.

use escr_par::ast::Program;
use escr_util::{Handler, SourceMap, Span};

use crate::config::EngineConfig;
use crate::logger::{Logger, Severity, Source};
use crate::stream::TextStream;

/// Everything a `prepare`/`execute`/`run` call needs besides the engine
/// itself: where diagnostics go, and the construction knobs from §4.6.
pub struct EngineContext<'a> {
    pub logger: &'a mut dyn Logger,
    pub config: EngineConfig,
}

impl<'a> EngineContext<'a> {
    pub fn new(logger: &'a mut dyn Logger) -> Self {
        Self { logger, config: EngineConfig::default() }
    }

    pub fn with_config(logger: &'a mut dyn Logger, config: EngineConfig) -> Self {
        Self { logger, config }
    }
}

enum State {
    /// Built from a stream; not lexed or parsed yet.
    Unparsed(String),
    /// Parsed (either just now, or handed in already-parsed), not prepared.
    Parsed(Program),
    /// `prepare` has run. Kept regardless of whether it found errors - the
    /// reference implementation still stores the program on a failed
    /// prepare, it just means a later `execute` will re-surface the same
    /// failure (via the Error-severity diagnostics already logged).
    Prepared(Program),
}

/// One script's pipeline state, from raw text (or a parsed tree) through
/// preparation to execution.
pub struct Engine {
    resource: String,
    state: State,
}

/// Adapts `escr_eval::Output` (this crate knows nothing about `Logger`) to
/// route `print` through the `User`/`Information` channel (§6.2).
struct LoggerOutput<'a> {
    logger: &'a mut dyn Logger,
}

impl escr_eval::Output for LoggerOutput<'_> {
    fn print(&mut self, text: &str) {
        self.logger.log(Source::User, Severity::Information, text);
    }
}

/// AST node spans cover a whole statement or expression, but every located
/// diagnostic in the reference engine quotes a single `(line,col)` rather
/// than a range - so diagnostics collapse to where the span *starts*. The
/// range form `format_resource_message` also supports stays available for a
/// future diagnostic that genuinely wants to underline a region.
fn point_span(span: Span) -> Span {
    Span::point(span.begin)
}

impl Engine {
    /// §6.1 `create_engine_from_text_stream(stream)`. Lexing and parsing
    /// are deferred to `prepare`, matching the reference engine's
    /// `EggEngineTextStream`, which only reads its stream once asked to.
    pub fn create_engine_from_text_stream<R: std::io::Read>(stream: TextStream<R>) -> std::io::Result<Engine> {
        let (resource, source) = stream.read_to_string()?;
        Ok(Engine { resource, state: State::Unparsed(source) })
    }

    /// §6.1 `create_engine_from_parsed(resource, root_ast)`: skips lexing
    /// and parsing entirely for a caller that already has a tree (a tool
    /// built on top of `escr-par` directly, a cached parse, ...).
    pub fn create_engine_from_parsed(resource: impl Into<String>, root_ast: Program) -> Engine {
        Engine { resource: resource.into(), state: State::Parsed(root_ast) }
    }

    fn resource_name(&self, ctx: &EngineContext<'_>) -> String {
        if ctx.config.resource_name.is_empty() {
            self.resource.clone()
        } else {
            ctx.config.resource_name.clone()
        }
    }

    /// §6.1 `Engine::prepare(ctx) -> Severity`.
    pub fn prepare(&mut self, ctx: &mut EngineContext<'_>) -> Severity {
        if matches!(self.state, State::Prepared(_)) {
            let message = "Program prepared more than once";
            ctx.logger.log(Source::Compiler, Severity::Error, message);
            return Severity::Error;
        }

        let resource = self.resource_name(ctx);
        let placeholder = State::Parsed(Program { statements: Vec::new(), span: escr_util::Span::DUMMY });
        let program = match std::mem::replace(&mut self.state, placeholder) {
            State::Unparsed(source) => {
                let mut source_map = SourceMap::new();
                let file = source_map.add_file(resource.clone(), source.clone());
                let mut parse_handler = Handler::new();
                match escr_par::parse_program(&source, file, &mut parse_handler) {
                    Ok(program) => program,
                    Err(err) => {
                        let message = SourceMap::format_resource_message(&resource, point_span(err.span), &err.message);
                        ctx.logger.log(Source::Compiler, Severity::Error, &message);
                        return Severity::Error;
                    }
                }
            }
            State::Parsed(program) | State::Prepared(program) => program,
        };

        let mut handler = Handler::new();
        let (_types, _scope) = escr_sem::prepare(&program, &mut handler);
        for diag in handler.diagnostics() {
            let message = SourceMap::format_resource_message(&resource, point_span(diag.span), &diag.message);
            ctx.logger.log(Source::Compiler, Severity::from_level(Some(diag.level)), &message);
        }
        let severity = Severity::from_level(handler.max_severity());

        self.state = State::Prepared(program);
        severity
    }

    /// §6.1 `Engine::execute(ctx) -> Severity`.
    pub fn execute(&mut self, ctx: &mut EngineContext<'_>) -> Severity {
        let program = match &self.state {
            State::Prepared(program) => program,
            State::Unparsed(_) | State::Parsed(_) => {
                ctx.logger.log(Source::Runtime, Severity::Error, "Program not prepared before execution");
                return Severity::Error;
            }
        };

        let resource = self.resource_name(ctx);
        let collect_after_statement = ctx.config.collect_after_statement;

        let (result, last_throw_span) = {
            let mut output = LoggerOutput { logger: &mut *ctx.logger };
            let mut evaluator = escr_eval::Evaluator::new(&mut output);
            evaluator.collect_after_statement = collect_after_statement;

            let result = evaluator.run(program);
            evaluator.basket.collect();
            (result, evaluator.last_throw_span())
        };

        match result {
            escr_eval::Value::FlowControl(flow) => match *flow {
                escr_eval::FlowControl::Throw(exc) => {
                    let message = SourceMap::format_resource_message(&resource, point_span(last_throw_span), &exc.display_string());
                    ctx.logger.log(Source::Runtime, Severity::Error, &message);
                    Severity::Error
                }
                // `break`/`continue`/`return`/`yield` escaping module scope is
                // an internal invariant violation (§7.3), not a user-facing
                // runtime error - the preparer should have rejected the
                // program before it ever got here.
                _ => {
                    ctx.logger.log(Source::Runtime, Severity::Error, "Internal error: unhandled control flow escaped module scope");
                    Severity::Error
                }
            },
            _ => Severity::None,
        }
    }

    /// §6.1 `Engine::run(ctx) -> Severity`: `prepare` then `execute`,
    /// skipping execution if preparation already failed.
    pub fn run(&mut self, ctx: &mut EngineContext<'_>) -> Severity {
        let preparation = self.prepare(ctx);
        if preparation == Severity::Error {
            return preparation;
        }
        let execution = self.execute(ctx);
        preparation.max(execution)
    }
}
