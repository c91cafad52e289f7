//! Untrusted JavaScript evaluation.
//!
//! [`UntrustedEvaluator`] is the boundary every piece of user-edited source
//! crosses. [`BoaEvaluator`] backs it with an embedded interpreter and builds
//! a brand-new realm for each call, so one run can never observe the
//! bindings of another run or of the host.
//!
//! Known limitations:
//! - Isolation is scope-level only. The realm still exposes the standard
//!   ECMAScript built-ins, and nothing here is a security boundary.
//! - There is no wall-clock timeout. A script that loops forever blocks the
//!   calling thread unless `loop_iteration_limit` is configured.
//! - `String(fn)` prints `function name() { [native code] }` rather than the
//!   function's source text, so logging a function does not echo its body.
//! - Logged values nested deeper than [`MAX_PRINT_DEPTH`] (or with more than
//!   [`MAX_PRINT_NODES`] reachable objects) fail the run instead of printing.

use boa_engine::object::ObjectInitializer;
use boa_engine::property::{Attribute, PropertyKey};
use boa_engine::{
    Context, JsError, JsNativeError, JsObject, JsResult, JsValue, NativeFunction, Source,
    js_string,
};
use boa_gc::{Gc, GcRefCell};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::io::channel::OutputSink;
use crate::io::config::EvaluatorConfig;

/// Stack for the interpreter thread. The interpreter recurses natively while
/// parsing and printing, so the default thread stack is too small.
const EVALUATOR_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Deepest object nesting a logged value may have.
pub const MAX_PRINT_DEPTH: usize = 1_000;

/// Most objects a single logged value may reach.
pub const MAX_PRINT_NODES: usize = 100_000;

/// Error raised by executed code: a syntax error, a thrown value, or a
/// tripped interpreter limit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Fault {
    pub message: String,
}

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Runs untrusted source and reports printed lines to `sink`.
///
/// Implementations must never panic on bad input; every failure of the
/// executed code is returned as a [`Fault`]. Lines printed before a fault
/// are still delivered to `sink`.
pub trait UntrustedEvaluator: Send + Sync {
    fn evaluate(&self, source: &str, sink: &mut dyn OutputSink) -> Result<(), Fault>;
}

/// JavaScript evaluator backed by the boa interpreter.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoaEvaluator {
    limits: EvaluatorConfig,
}

impl BoaEvaluator {
    pub fn new(limits: EvaluatorConfig) -> Self {
        Self { limits }
    }

    fn fresh_context(&self) -> Context {
        let mut context = Context::default();
        if let Some(limit) = self.limits.loop_iteration_limit {
            context.runtime_limits_mut().set_loop_iteration_limit(limit);
        }
        if let Some(limit) = self.limits.recursion_limit {
            context.runtime_limits_mut().set_recursion_limit(limit);
        }
        context
    }
}

impl UntrustedEvaluator for BoaEvaluator {
    /// Runs on a dedicated thread with [`EVALUATOR_STACK_SIZE`] of stack. A
    /// panic on that thread is re-raised on the caller.
    fn evaluate(&self, source: &str, sink: &mut dyn OutputSink) -> Result<(), Fault> {
        std::thread::scope(|scope| {
            let worker = std::thread::Builder::new()
                .name("js-evaluator".to_string())
                .stack_size(EVALUATOR_STACK_SIZE)
                .spawn_scoped(scope, || self.evaluate_in_place(source, sink))
                .map_err(|err| Fault::new(format!("failed to start evaluator thread: {err}")))?;
            worker
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
        })
    }
}

impl BoaEvaluator {
    fn evaluate_in_place(&self, source: &str, sink: &mut dyn OutputSink) -> Result<(), Fault> {
        let mut context = self.fresh_context();
        let lines = Gc::new(GcRefCell::new(Vec::<String>::new()));

        if let Err(err) = install_console(&mut context, lines.clone()) {
            return Err(fault_from_error(&err, &mut context));
        }

        let wrapped = wrap_source(source);
        let outcome = context.eval(Source::from_bytes(wrapped.as_bytes()));

        for line in lines.borrow().iter() {
            sink.write_line(line);
        }

        match outcome {
            Ok(_) => Ok(()),
            Err(err) => {
                let fault = fault_from_error(&err, &mut context);
                debug!(message = %fault.message, "executed code raised");
                Err(fault)
            }
        }
    }
}

/// Run the source as a function body: top-level declarations stay local to
/// the run and a bare `return` is legal. The first source line shares the
/// wrapper's line so reported line numbers match the editor.
fn wrap_source(source: &str) -> String {
    format!("(function () {{{source}\n}})();")
}

/// Bind `console` in the realm. `log` is captured; the other levels go to
/// the host log and are never part of a run's output.
fn install_console(context: &mut Context, lines: Gc<GcRefCell<Vec<String>>>) -> JsResult<()> {
    let log = NativeFunction::from_copy_closure_with_captures(
        |_this: &JsValue,
         args: &[JsValue],
         lines: &Gc<GcRefCell<Vec<String>>>,
         context: &mut Context| {
            let line = format_line(args, context)?;
            lines.borrow_mut().push(line);
            Ok(JsValue::undefined())
        },
        lines,
    );

    let console = ObjectInitializer::new(context)
        .function(log, js_string!("log"), 0)
        .function(
            NativeFunction::from_fn_ptr(|_this, args, context| {
                let line = format_line(args, context)?;
                info!(target: "playground::console", "{line}");
                Ok(JsValue::undefined())
            }),
            js_string!("info"),
            0,
        )
        .function(
            NativeFunction::from_fn_ptr(|_this, args, context| {
                let line = format_line(args, context)?;
                debug!(target: "playground::console", "{line}");
                Ok(JsValue::undefined())
            }),
            js_string!("debug"),
            0,
        )
        .function(
            NativeFunction::from_fn_ptr(|_this, args, context| {
                let line = format_line(args, context)?;
                warn!(target: "playground::console", "{line}");
                Ok(JsValue::undefined())
            }),
            js_string!("warn"),
            0,
        )
        .function(
            NativeFunction::from_fn_ptr(|_this, args, context| {
                let line = format_line(args, context)?;
                error!(target: "playground::console", "{line}");
                Ok(JsValue::undefined())
            }),
            js_string!("error"),
            0,
        )
        .build();

    context.register_global_property(js_string!("console"), console, Attribute::all())
}

/// Format one print call: arguments rendered individually, joined by a space.
fn format_line(args: &[JsValue], context: &mut Context) -> JsResult<String> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        parts.push(format_arg(arg, context)?);
    }
    Ok(parts.join(" "))
}

/// Values whose `typeof` is `"object"` are pretty-printed as JSON; everything
/// else goes through `String(value)`.
fn format_arg(arg: &JsValue, context: &mut Context) -> JsResult<String> {
    if let Some(symbol) = arg.as_symbol() {
        return Ok(symbol.descriptive_string().to_std_string_escaped());
    }
    let is_plain_object = arg.as_object().is_some_and(|object| !object.is_callable());
    if is_plain_object || arg.is_null() {
        check_printable(arg, context)?;
        return stringify_pretty(arg, context);
    }
    Ok(arg.to_string(context)?.to_std_string_escaped())
}

/// Walk the object graph reachable from `value` and reject it if it nests
/// deeper than [`MAX_PRINT_DEPTH`] or reaches more than [`MAX_PRINT_NODES`]
/// objects. Cycles exceed the depth bound.
fn check_printable(value: &JsValue, context: &mut Context) -> JsResult<()> {
    let mut pending: Vec<(JsObject, usize)> = Vec::new();
    if let Some(object) = value.as_object() {
        pending.push((object.clone(), 1));
    }
    let mut visited = 0usize;
    while let Some((object, depth)) = pending.pop() {
        if depth > MAX_PRINT_DEPTH {
            return Err(JsNativeError::range()
                .with_message("Maximum call stack size exceeded")
                .into());
        }
        visited += 1;
        if visited > MAX_PRINT_NODES {
            return Err(JsNativeError::range()
                .with_message("Object is too large to print")
                .into());
        }
        if object.is_callable() {
            continue;
        }
        for key in object.own_property_keys(context)? {
            if matches!(key, PropertyKey::Symbol(_)) {
                continue;
            }
            if let Some(child) = object.get(key, context)?.as_object() {
                pending.push((child.clone(), depth + 1));
            }
        }
    }
    Ok(())
}

/// `JSON.stringify(value, null, 2)`, looked up in the realm so the result
/// matches what the executed code itself would get.
fn stringify_pretty(value: &JsValue, context: &mut Context) -> JsResult<String> {
    let json = context.global_object().get(js_string!("JSON"), context)?;
    let stringify = match json.as_object() {
        Some(object) => object.get(js_string!("stringify"), context)?,
        None => JsValue::undefined(),
    };
    let Some(stringify) = stringify.as_callable() else {
        return Err(JsNativeError::typ()
            .with_message("JSON.stringify is not callable")
            .into());
    };
    let text = stringify.call(&json, &[value.clone(), JsValue::null(), JsValue::new(2)], context)?;
    // `undefined` joins as an empty string.
    if text.is_undefined() {
        return Ok(String::new());
    }
    Ok(text.to_string(context)?.to_std_string_escaped())
}

/// Extract the user-facing message: the thrown value's `message` property if
/// it has one, else the value converted to a string.
fn fault_from_error(err: &JsError, context: &mut Context) -> Fault {
    if let Some(native) = err.as_native() {
        return Fault::new(native.message());
    }
    let Some(thrown) = err.as_opaque() else {
        return Fault::new(err.to_string());
    };
    if let Some(object) = thrown.as_object()
        && let Ok(message) = object.get(js_string!("message"), context)
        && !message.is_undefined()
        && let Ok(text) = message.to_string(context)
    {
        return Fault::new(text.to_std_string_escaped());
    }
    match thrown.to_string(context) {
        Ok(text) => Fault::new(text.to_std_string_escaped()),
        Err(_) => Fault::new(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Lines(Vec<String>);

    impl OutputSink for Lines {
        fn write_line(&mut self, line: &str) {
            self.0.push(line.to_string());
        }
    }

    fn eval(source: &str) -> (Result<(), Fault>, Vec<String>) {
        let mut sink = Lines::default();
        let outcome = BoaEvaluator::default().evaluate(source, &mut sink);
        (outcome, sink.0)
    }

    #[test]
    fn primitives_join_with_single_space() {
        let (outcome, lines) = eval("console.log('a', 'b', 3, true, undefined);");
        assert!(outcome.is_ok());
        assert_eq!(lines, vec!["a b 3 true undefined".to_string()]);
    }

    #[test]
    fn objects_are_pretty_printed() {
        let (outcome, lines) = eval("console.log({ a: 1, b: [true, null] });");
        assert!(outcome.is_ok());
        assert_eq!(
            lines,
            vec!["{\n  \"a\": 1,\n  \"b\": [\n    true,\n    null\n  ]\n}".to_string()]
        );
    }

    #[test]
    fn null_prints_as_null() {
        let (_, lines) = eval("console.log(null);");
        assert_eq!(lines, vec!["null".to_string()]);
    }

    #[test]
    fn thrown_error_message_is_reported() {
        let (outcome, _) = eval("throw new Error('boom');");
        assert_eq!(outcome, Err(Fault::new("boom")));
    }

    #[test]
    fn thrown_string_falls_back_to_string_value() {
        let (outcome, _) = eval("throw 'plain';");
        assert_eq!(outcome, Err(Fault::new("plain")));
    }

    #[test]
    fn lines_before_fault_are_delivered() {
        let (outcome, lines) = eval("console.log('first'); throw new TypeError('second');");
        assert_eq!(outcome, Err(Fault::new("second")));
        assert_eq!(lines, vec!["first".to_string()]);
    }

    #[test]
    fn syntax_error_is_a_fault() {
        let (outcome, lines) = eval("console.log('never'");
        assert!(outcome.is_err());
        assert!(lines.is_empty());
    }

    #[test]
    fn top_level_return_is_allowed() {
        let (outcome, lines) = eval("console.log('x'); return; console.log('y');");
        assert!(outcome.is_ok());
        assert_eq!(lines, vec!["x".to_string()]);
    }

    #[test]
    fn runs_do_not_share_bindings() {
        let evaluator = BoaEvaluator::default();
        let mut first = Lines::default();
        evaluator
            .evaluate("globalThis.leaked = 42;", &mut first)
            .expect("first run");
        let mut second = Lines::default();
        evaluator
            .evaluate("console.log(typeof leaked);", &mut second)
            .expect("second run");
        assert_eq!(second.0, vec!["undefined".to_string()]);
    }

    #[test]
    fn non_log_levels_are_not_captured() {
        let (outcome, lines) = eval("console.warn('w'); console.error('e'); console.log('l');");
        assert!(outcome.is_ok());
        assert_eq!(lines, vec!["l".to_string()]);
    }

    #[test]
    fn loop_limit_turns_infinite_loop_into_fault() {
        let evaluator = BoaEvaluator::new(EvaluatorConfig {
            loop_iteration_limit: Some(1_000),
            recursion_limit: None,
        });
        let mut sink = Lines::default();
        let outcome = evaluator.evaluate("while (true) {}", &mut sink);
        assert!(outcome.is_err());
    }

    #[test]
    fn deeply_nested_value_faults_instead_of_overflowing() {
        let (outcome, lines) = eval(
            "console.log('before'); let a = []; for (let i = 0; i < 5000; i++) a = [a]; console.log(a);",
        );
        assert_eq!(outcome, Err(Fault::new("Maximum call stack size exceeded")));
        assert_eq!(lines, vec!["before".to_string()]);
    }

    #[test]
    fn moderately_nested_value_still_prints() {
        let (outcome, lines) = eval("let a = 1; for (let i = 0; i < 50; i++) a = [a]; console.log(a);");
        assert!(outcome.is_ok());
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("[\n  [\n"));
    }

    #[test]
    fn syntax_error_reports_editor_line() {
        let (outcome, _) = eval("let x = ;\nconsole.log(x);");
        let fault = outcome.expect_err("syntax error");
        assert!(fault.message.contains("line 1"), "{}", fault.message);
    }

    #[test]
    fn trailing_line_comment_does_not_swallow_wrapper() {
        let (outcome, lines) = eval("console.log('ok'); // done");
        assert!(outcome.is_ok());
        assert_eq!(lines, vec!["ok".to_string()]);
    }

    #[test]
    fn functions_print_through_string_conversion() {
        let (outcome, lines) = eval("console.log(function greet() { return 1; });");
        assert!(outcome.is_ok());
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("function greet("), "{}", lines[0]);
    }

    #[test]
    fn circular_object_faults_inside_log() {
        let (outcome, lines) = eval("const a = {}; a.self = a; console.log(a);");
        assert!(outcome.is_err());
        assert!(lines.is_empty());
    }
}
