//! Sandboxed JavaScript evaluation of node code
//!
//! This module evaluates one node's code string against an optional input value using
//! the boa pure-Rust JavaScript implementation. Every call builds a fresh context, so no
//! globals, closures or compiled code survive between evaluations.
//!
//! # Security & Sandboxing
//!
//! - **No File System Access**: boa_engine doesn't provide file system APIs
//! - **No Network Access**: No socket, fetch, or HTTP APIs are available
//! - **No eval()**: Dynamic code execution via eval() is disabled
//! - **No Function() constructor**: Cannot create functions from strings
//!
//! There is no timeout by default: a script that never terminates blocks the caller.
//! [`EvalLimits::loop_iteration_limit`] can bound loops when that is not acceptable.

use crate::constants::{INPUT_BINDING, MAX_VALUE_DEPTH};
use boa_engine::{
    js_string, property::Attribute, property::PropertyKey, Context, JsObject, JsResult, JsString,
    JsValue, Source,
};
use serde_json::Value;
use std::borrow::Cow;
use thiserror::Error;

/// Outcome of evaluating one node's code.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// The code produced a value
    Value(Value),
    /// The code ran to completion but produced `undefined`
    Void,
    /// The code threw, failed to parse, or produced something that cannot be forwarded
    Failed(String),
}

impl Evaluation {
    /// Returns the produced value, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Evaluation::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Returns true if the code produced a value.
    pub fn is_value(&self) -> bool {
        matches!(self, Evaluation::Value(_))
    }
}

/// Errors raised while preparing or running a script.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The sandbox could not be installed in a fresh context
    #[error("failed to setup sandbox: {0}")]
    Sandbox(String),
    /// The input value could not be converted to JavaScript
    #[error("failed to bind input: {0}")]
    Input(String),
    /// The script threw or did not parse
    #[error("{0}")]
    Execution(String),
    /// The result contains a value with no JSON representation
    #[error("{0} values cannot be passed to child nodes")]
    Unsupported(&'static str),
    /// The result nests deeper than [`MAX_VALUE_DEPTH`], usually a cycle
    #[error("result nests deeper than {0} levels")]
    TooDeep(usize),
    /// Reading a property of the result failed
    #[error("failed to read result: {0}")]
    Conversion(String),
}

/// Runtime limits applied to every evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalLimits {
    /// Maximum iterations of any single loop; `None` means unbounded
    pub loop_iteration_limit: Option<u64>,
}

/// Evaluates node code with a fixed set of limits.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    limits: EvalLimits,
}

impl Evaluator {
    /// Creates an evaluator applying the given limits.
    pub fn new(limits: EvalLimits) -> Self {
        Self { limits }
    }

    /// The limits applied to each evaluation.
    pub fn limits(&self) -> EvalLimits {
        self.limits
    }

    /// Evaluates `code` with `input` bound to `$input` when present and not `null`.
    ///
    /// Errors never escape: they are reported as [`Evaluation::Failed`] with the
    /// error message, which is also logged at debug level.
    pub fn evaluate(&self, code: &str, input: Option<&Value>) -> Evaluation {
        match self.try_evaluate(code, input) {
            Ok(evaluation) => evaluation,
            Err(err) => {
                log::debug!("node evaluation failed: {err}");
                Evaluation::Failed(err.to_string())
            }
        }
    }

    fn try_evaluate(&self, code: &str, input: Option<&Value>) -> Result<Evaluation, ScriptError> {
        let mut engine = JavaScriptEngine::new(&self.limits)?;
        if let Some(input) = input.filter(|input| !input.is_null()) {
            engine.bind_input(input)?;
        }
        let result = engine.execute(&prepare_source(code))?;
        engine.to_evaluation(&result)
    }
}

/// Evaluates `code` against `input` with default limits.
pub fn evaluate(code: &str, input: Option<&Value>) -> Evaluation {
    Evaluator::default().evaluate(code, input)
}

/// Returns true if the code is treated as a function body with its own `return`.
///
/// This is a plain substring test: `return` inside a string literal or an identifier
/// also counts.
pub fn has_explicit_return(code: &str) -> bool {
    code.contains("return")
}

/// Wraps code containing `return` in an immediately invoked function. Other code is
/// evaluated as a script whose last statement supplies the result.
pub fn prepare_source(code: &str) -> Cow<'_, str> {
    if has_explicit_return(code) {
        Cow::Owned(format!("(function () {{\n{code}\n}})()"))
    } else {
        Cow::Borrowed(code)
    }
}

/// A single-use JavaScript context with the sandbox installed.
struct JavaScriptEngine {
    context: Context,
}

impl JavaScriptEngine {
    fn new(limits: &EvalLimits) -> Result<Self, ScriptError> {
        let mut context = Context::default();

        Self::setup_sandbox(&mut context).map_err(|e| ScriptError::Sandbox(e.to_string()))?;

        if let Some(limit) = limits.loop_iteration_limit {
            context.runtime_limits_mut().set_loop_iteration_limit(limit);
        }

        Ok(Self { context })
    }

    /// Setup sandbox by disabling dynamic code execution
    fn setup_sandbox(context: &mut Context) -> JsResult<()> {
        let undefined = JsValue::undefined();
        context.register_global_property(
            js_string!("eval"),
            undefined.clone(),
            Attribute::default(),
        )?;

        let global = context.global_object().clone();
        global.set(js_string!("Function"), undefined, false, context)?;

        Ok(())
    }

    fn bind_input(&mut self, input: &Value) -> Result<(), ScriptError> {
        let js_input = JsValue::from_json(input, &mut self.context)
            .map_err(|e| ScriptError::Input(e.to_string()))?;

        self.context
            .register_global_property(JsString::from(INPUT_BINDING), js_input, Attribute::default())
            .map_err(|e| ScriptError::Input(e.to_string()))
    }

    fn execute(&mut self, script: &str) -> Result<JsValue, ScriptError> {
        self.context
            .eval(Source::from_bytes(script))
            .map_err(|e| ScriptError::Execution(e.to_string()))
    }

    fn to_evaluation(&mut self, result: &JsValue) -> Result<Evaluation, ScriptError> {
        if result.is_undefined() {
            return Ok(Evaluation::Void);
        }
        match self.js_value_to_json(result, 0)? {
            Some(value) => Ok(Evaluation::Value(value)),
            None if result.is_symbol() => Err(ScriptError::Unsupported("symbol")),
            None => Err(ScriptError::Unsupported("function")),
        }
    }

    /// Convert a boa JsValue to JSON. `None` marks values JSON has no spelling for
    /// (undefined, functions, symbols); callers drop or null them like `JSON.stringify`.
    fn js_value_to_json(
        &mut self,
        js_value: &JsValue,
        depth: usize,
    ) -> Result<Option<Value>, ScriptError> {
        if depth > MAX_VALUE_DEPTH {
            return Err(ScriptError::TooDeep(MAX_VALUE_DEPTH));
        }
        match js_value {
            JsValue::Null => Ok(Some(Value::Null)),
            JsValue::Undefined | JsValue::Symbol(_) => Ok(None),
            JsValue::Boolean(b) => Ok(Some(Value::Bool(*b))),
            JsValue::String(s) => Ok(Some(Value::String(s.to_std_string_escaped()))),
            JsValue::Integer(i) => Ok(Some(Value::from(*i))),
            JsValue::Rational(r) => Ok(Some(number_to_json(*r))),
            JsValue::BigInt(_) => Err(ScriptError::Unsupported("BigInt")),
            JsValue::Object(obj) if obj.is_callable() => Ok(None),
            JsValue::Object(obj) if obj.is_array() => self.array_to_json(obj, depth).map(Some),
            JsValue::Object(obj) => self.object_to_json(obj, depth).map(Some),
        }
    }

    fn array_to_json(&mut self, obj: &JsObject, depth: usize) -> Result<Value, ScriptError> {
        let length = obj
            .get(js_string!("length"), &mut self.context)
            .and_then(|len| len.to_u32(&mut self.context))
            .map_err(|e| ScriptError::Conversion(e.to_string()))?;

        let mut array = Vec::with_capacity(length as usize);
        for index in 0..length {
            let element = obj
                .get(index, &mut self.context)
                .map_err(|e| ScriptError::Conversion(e.to_string()))?;
            array.push(self.js_value_to_json(&element, depth + 1)?.unwrap_or(Value::Null));
        }
        Ok(Value::Array(array))
    }

    fn object_to_json(&mut self, obj: &JsObject, depth: usize) -> Result<Value, ScriptError> {
        let keys = obj
            .own_property_keys(&mut self.context)
            .map_err(|e| ScriptError::Conversion(e.to_string()))?;

        let mut map = serde_json::Map::new();
        for key in keys {
            let key_str = match &key {
                PropertyKey::String(s) => s.to_std_string_escaped(),
                PropertyKey::Index(idx) => idx.get().to_string(),
                PropertyKey::Symbol(_) => continue,
            };
            let value = obj
                .get(key, &mut self.context)
                .map_err(|e| ScriptError::Conversion(e.to_string()))?;
            if let Some(json_value) = self.js_value_to_json(&value, depth + 1)? {
                map.insert(key_str, json_value);
            }
        }
        Ok(Value::Object(map))
    }
}

/// Whole doubles become JSON integers; NaN and infinities become null.
fn number_to_json(number: f64) -> Value {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
    if number.is_finite() && number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER {
        Value::from(number as i64)
    } else {
        serde_json::Number::from_f64(number)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_explicit_return_without_input() {
        assert_eq!(evaluate("return 2;", None), Evaluation::Value(json!(2)));
    }

    #[test]
    fn test_input_is_bound() {
        let input = json!(2);
        assert_eq!(
            evaluate("return $input * 2;", Some(&input)),
            Evaluation::Value(json!(4))
        );
    }

    #[test]
    fn test_default_pipeline_squares() {
        let root = evaluate("return [2, 4, 6];", None);
        assert_eq!(root, Evaluation::Value(json!([2, 4, 6])));

        let child = evaluate("return $input.map(n => n * n);", root.value());
        assert_eq!(child, Evaluation::Value(json!([4, 16, 36])));
    }

    #[test]
    fn test_implicit_return_uses_last_expression() {
        let input = json!(10);
        assert_eq!(
            evaluate("const doubled = $input * 2;\ndoubled + 1", Some(&input)),
            Evaluation::Value(json!(21))
        );
    }

    #[test]
    fn test_return_inside_string_disables_implicit_return() {
        // The substring heuristic sees `return` and wraps the code as a function body,
        // which then has no return statement.
        assert!(has_explicit_return("'no return here'"));
        assert_eq!(evaluate("'no return here'", None), Evaluation::Void);
    }

    #[test]
    fn test_missing_input_is_a_failure() {
        let result = evaluate("return $input + 1;", None);
        assert!(matches!(result, Evaluation::Failed(_)));
    }

    #[test]
    fn test_null_input_is_not_bound() {
        let input = json!(null);
        assert!(matches!(
            evaluate("return $input;", Some(&input)),
            Evaluation::Failed(_)
        ));
        assert_eq!(
            evaluate("return typeof $input;", Some(&input)),
            Evaluation::Value(json!("undefined"))
        );
    }

    #[test]
    fn test_thrown_error_is_a_failure() {
        let input = json!(2);
        match evaluate("throw new Error('boom')", Some(&input)) {
            Evaluation::Failed(message) => assert!(message.contains("boom")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_syntax_error_is_a_failure() {
        let result = evaluate("this is not valid javascript {{{", None);
        assert!(matches!(result, Evaluation::Failed(_)));
    }

    #[test]
    fn test_undefined_result_is_void() {
        assert_eq!(evaluate("return;", None), Evaluation::Void);
        assert_eq!(evaluate("let x = 1;", None), Evaluation::Void);
    }

    #[test]
    fn test_null_is_a_value() {
        assert_eq!(evaluate("return null;", None), Evaluation::Value(Value::Null));
    }

    #[test]
    fn test_no_state_survives_between_calls() {
        assert!(evaluate("globalThis.leak = 5; return 1;", None).is_value());
        assert!(matches!(evaluate("return leak;", None), Evaluation::Failed(_)));
    }

    #[test]
    fn test_eval_is_disabled() {
        assert!(matches!(evaluate("return eval('1 + 1');", None), Evaluation::Failed(_)));
    }

    #[test]
    fn test_function_constructor_is_disabled() {
        assert!(matches!(
            evaluate("return new Function('return 1')();", None),
            Evaluation::Failed(_)
        ));
    }

    #[test]
    fn test_object_result_drops_undefined_and_functions() {
        let result = evaluate("return { a: 1, b: undefined, f: () => 1, s: 'x' };", None);
        assert_eq!(result, Evaluation::Value(json!({"a": 1, "s": "x"})));
    }

    #[test]
    fn test_array_result_nulls_unrepresentable_items() {
        let result = evaluate("return [1, undefined, NaN, 'a'];", None);
        assert_eq!(result, Evaluation::Value(json!([1, null, null, "a"])));
    }

    #[test]
    fn test_whole_doubles_become_integers() {
        assert_eq!(evaluate("return 2.5 * 2;", None), Evaluation::Value(json!(5)));
        assert_eq!(evaluate("return 1 / 4;", None), Evaluation::Value(json!(0.25)));
    }

    #[test]
    fn test_top_level_function_is_a_failure() {
        assert!(matches!(evaluate("return () => 1;", None), Evaluation::Failed(_)));
    }

    #[test]
    fn test_cyclic_result_is_a_failure() {
        let result = evaluate("const a = {}; a.self = a; return a;", None);
        assert!(matches!(result, Evaluation::Failed(_)));
    }

    #[test]
    fn test_input_object_is_not_shared() {
        let input = json!({"value": 1});
        let first = evaluate("$input.value = 99; return $input;", Some(&input));
        assert_eq!(first, Evaluation::Value(json!({"value": 99})));
        assert_eq!(input, json!({"value": 1}));
    }

    #[test]
    fn test_loop_limit_stops_runaway_code() {
        let evaluator = Evaluator::new(EvalLimits {
            loop_iteration_limit: Some(1_000),
        });
        assert!(matches!(
            evaluator.evaluate("while (true) {}", None),
            Evaluation::Failed(_)
        ));
    }
}
