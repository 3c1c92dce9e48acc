//! Arithmetic expression calculator

use async_trait::async_trait;
use capability_core::{
    Arguments, HandlerError, HandlerResult, ParameterSpec, ToolContent, ToolDescriptor, ToolUnit,
};
use evalexpr::{
    ContextWithMutableFunctions, ContextWithMutableVariables, EvalexprResult, Function,
    HashMapContext, Value as ExprValue,
};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub const CALCULATOR: &str = "calculator";

const MODES: [&str; 2] = ["basic", "scientific"];

/// Evaluation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcMode {
    /// Operators and the builtin functions (`min`, `max`, `round`, `math::*`)
    Basic,
    /// Basic plus `sin`, `cos`, `sqrt`, `log`, ... and the constants `pi`, `e`
    Scientific,
}

impl FromStr for CalcMode {
    type Err = HandlerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Self::Basic),
            "scientific" => Ok(Self::Scientific),
            other => Err(HandlerError::invalid(format!(
                "Unsupported mode '{}', expected one of: {}",
                other,
                MODES.join(", ")
            ))),
        }
    }
}

impl fmt::Display for CalcMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => f.write_str("basic"),
            Self::Scientific => f.write_str("scientific"),
        }
    }
}

/// Evaluates arithmetic expressions
pub struct CalculatorTool {
    scientific: HashMapContext,
}

impl CalculatorTool {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            scientific: scientific_context()?,
        })
    }

    pub fn evaluate(&self, expression: &str, mode: CalcMode) -> HandlerResult<ExprValue> {
        let result = match mode {
            CalcMode::Basic => evalexpr::eval(expression),
            CalcMode::Scientific => evalexpr::eval_with_context(expression, &self.scientific),
        };
        result.map_err(|e| HandlerError::Failed(format!("Calculation error: {}", e)))
    }

    fn report(&self, expression: &str, mode: CalcMode) -> HandlerResult<String> {
        let result = self.evaluate(expression, mode)?;

        Ok(format!(
            "## Calculation Result\n\nExpression: `{}`\n\nResult: **{}**\n\nMode: {}",
            expression, result, mode
        ))
    }
}

fn unary(apply: fn(f64) -> f64) -> Function {
    Function::new(move |argument| Ok(ExprValue::Float(apply(argument.as_number()?))))
}

fn scientific_context() -> EvalexprResult<HashMapContext> {
    let mut context = HashMapContext::new();

    context.set_value("pi".into(), ExprValue::Float(std::f64::consts::PI))?;
    context.set_value("e".into(), ExprValue::Float(std::f64::consts::E))?;

    let functions: [(&str, fn(f64) -> f64); 8] = [
        ("sin", f64::sin),
        ("cos", f64::cos),
        ("tan", f64::tan),
        ("exp", f64::exp),
        ("log", f64::ln),
        ("log10", f64::log10),
        ("sqrt", f64::sqrt),
        ("abs", f64::abs),
    ];
    for (name, apply) in functions {
        context.set_function(name.into(), unary(apply))?;
    }

    Ok(context)
}

#[async_trait]
impl ToolUnit for CalculatorTool {
    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![ToolDescriptor::new(CALCULATOR, "Evaluate a mathematical expression")
            .required(
                "expression",
                ParameterSpec::string("Expression to evaluate, e.g. '2 + 2' or 'sin(pi / 4)'"),
            )
            .optional(
                "mode",
                ParameterSpec::string("Evaluation mode")
                    .with_enum(MODES)
                    .with_default("basic"),
            )]
    }

    async fn call(&self, name: &str, arguments: Arguments) -> Option<HandlerResult<Vec<ToolContent>>> {
        if name != CALCULATOR {
            return None;
        }

        let Some(expression) = arguments.get("expression").and_then(Value::as_str) else {
            return Some(Err(HandlerError::invalid(
                "Missing required argument 'expression'",
            )));
        };

        let result = arguments
            .get("mode")
            .and_then(Value::as_str)
            .unwrap_or("basic")
            .parse::<CalcMode>()
            .and_then(|mode| self.report(expression, mode));
        Some(result.map(|report| vec![ToolContent::text(report)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool() -> CalculatorTool {
        CalculatorTool::new().unwrap()
    }

    fn number(value: ExprValue) -> f64 {
        value.as_number().unwrap()
    }

    #[test]
    fn test_basic_arithmetic() {
        assert_eq!(tool().evaluate("2 + 3 * 4", CalcMode::Basic).unwrap(), ExprValue::Int(14));
        assert_eq!(number(tool().evaluate("max(1, 7, 3)", CalcMode::Basic).unwrap()), 7.0);
    }

    #[test]
    fn test_scientific_functions() {
        let tool = tool();

        assert_eq!(number(tool.evaluate("sqrt(16)", CalcMode::Scientific).unwrap()), 4.0);
        let sine = number(tool.evaluate("sin(pi / 2)", CalcMode::Scientific).unwrap());
        assert!((sine - 1.0).abs() < 1e-12);

        // Scientific names are not available in basic mode
        assert!(tool.evaluate("sqrt(16)", CalcMode::Basic).is_err());
    }

    #[test]
    fn test_invalid_expression_fails() {
        assert!(matches!(
            tool().evaluate("1 +", CalcMode::Basic),
            Err(HandlerError::Failed(message)) if message.starts_with("Calculation error")
        ));
    }

    #[tokio::test]
    async fn test_call_report() {
        let arguments = json!({ "expression": "6 * 7", "mode": "basic" })
            .as_object()
            .cloned()
            .unwrap();
        let content = tool().call(CALCULATOR, arguments).await.unwrap().unwrap();

        match &content[0] {
            ToolContent::Text { text } => {
                assert!(text.contains("Expression: `6 * 7`"));
                assert!(text.contains("Result: **42**"));
                assert!(text.ends_with("Mode: basic"));
            }
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("scientific".parse::<CalcMode>().unwrap(), CalcMode::Scientific);
        assert!(matches!(
            "symbolic".parse::<CalcMode>(),
            Err(HandlerError::InvalidArguments(_))
        ));
    }
}
