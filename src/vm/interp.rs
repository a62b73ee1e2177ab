//! Tree-walking evaluation of script functions

use super::{Value, Vm};
use crate::engine::{Engine, EngineError, Integer, Number};
use crate::script::ast::{BinaryOp, Expr, Stmt, StmtKind, UnaryOp};
use crate::vm::ScriptFunction;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::rc::Rc;
use tracing::trace;

/// Outcome of a statement
enum Flow {
    Normal,
    Return(Option<Value>),
}

/// Locals of one script invocation
struct Frame<'f> {
    function: &'f ScriptFunction,
    locals: Vec<(String, Value)>,
}

impl<'f> Frame<'f> {
    fn new(function: &'f ScriptFunction) -> Self {
        Self {
            function,
            locals: Vec::with_capacity(function.params.len()),
        }
    }

    fn local(&self, name: &str) -> Option<&Value> {
        self.locals
            .iter()
            .rev()
            .find(|(local, _)| local == name)
            .map(|(_, value)| value)
    }

    fn local_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.locals
            .iter_mut()
            .rev()
            .find(|(local, _)| local == name)
            .map(|(_, value)| value)
    }

    fn error(&self, line: usize, message: impl AsRef<str>) -> EngineError {
        EngineError::runtime(format!("{}:{}: {}", self.function.chunk, line, message.as_ref()))
    }
}

impl Vm {
    /// Run a script function whose arguments occupy slots `1..=nargs`
    pub(super) fn run_script(
        &mut self,
        function: &ScriptFunction,
        nargs: usize,
    ) -> Result<usize, EngineError> {
        trace!(function = %function.name, nargs, "script call");

        let mut frame = Frame::new(function);
        for (index, param) in function.params.iter().enumerate() {
            let value = if index < nargs {
                self.value_at(index + 1)
            } else {
                Value::Nil
            };
            frame.locals.push((param.clone(), value));
        }
        self.set_top(0);

        match self.exec_block(&function.body, &mut frame)? {
            Flow::Return(Some(value)) => {
                self.push_value(value);
                Ok(1)
            }
            Flow::Return(None) | Flow::Normal => Ok(0),
        }
    }

    fn exec_block(&mut self, block: &[Stmt], frame: &mut Frame<'_>) -> Result<Flow, EngineError> {
        let mark = frame.locals.len();
        let mut flow = Flow::Normal;
        for stmt in block {
            flow = self.exec_stmt(stmt, frame)?;
            if let Flow::Return(_) = flow {
                break;
            }
        }
        frame.locals.truncate(mark);
        Ok(flow)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, frame: &mut Frame<'_>) -> Result<Flow, EngineError> {
        let line = stmt.line;
        match &stmt.kind {
            StmtKind::Function { name, params, body } => {
                let function = ScriptFunction {
                    name: name.clone(),
                    chunk: Rc::clone(&frame.function.chunk),
                    params: params.clone(),
                    body: Rc::clone(body),
                };
                self.bind_global(name, Value::Function(Rc::new(function)));
            }
            StmtKind::Local { name, value } => {
                let value = match value {
                    Some(expr) => self.eval(expr, frame, line)?,
                    None => Value::Nil,
                };
                frame.locals.push((name.clone(), value));
            }
            StmtKind::Assign { name, value } => {
                let value = self.eval(value, frame, line)?;
                match frame.local_mut(name) {
                    Some(slot) => *slot = value,
                    None => self.bind_global(name, value),
                }
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => Some(self.eval(expr, frame, line)?),
                    None => None,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::If { cond, then_block, else_block } => {
                if self.eval(cond, frame, line)?.is_truthy() {
                    return self.exec_block(then_block, frame);
                } else if let Some(else_block) = else_block {
                    return self.exec_block(else_block, frame);
                }
            }
            StmtKind::Call(expr) => {
                self.eval(expr, frame, line)?;
            }
        }
        Ok(Flow::Normal)
    }

    fn bind_global(&mut self, name: &str, value: Value) {
        match value {
            Value::Nil => {
                self.globals.remove(name);
            }
            value => {
                self.globals.insert(name.to_string(), value);
            }
        }
    }

    fn eval(&mut self, expr: &Expr, frame: &mut Frame<'_>, line: usize) -> Result<Value, EngineError> {
        match expr {
            Expr::Nil => Ok(Value::Nil),
            Expr::Bool(value) => Ok(Value::Boolean(*value)),
            Expr::Integer(value) => Ok(Value::Integer(*value)),
            Expr::Float(value) => Ok(Value::Float(*value)),
            Expr::Str(text) => Ok(Value::Str(Rc::clone(text))),
            Expr::Name(name) => Ok(match frame.local(name) {
                Some(value) => value.clone(),
                None => self.globals.get(name).cloned().unwrap_or(Value::Nil),
            }),
            Expr::Unary { op, operand } => {
                let operand = self.eval(operand, frame, line)?;
                unary(*op, &operand).map_err(|message| frame.error(line, message))
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs, frame, line)?;
                let rhs = self.eval(rhs, frame, line)?;
                binary(*op, &lhs, &rhs).map_err(|message| frame.error(line, message))
            }
            Expr::Call { callee, args } => self.call_expr(callee, args, frame, line),
        }
    }

    fn call_expr(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        frame: &mut Frame<'_>,
        line: usize,
    ) -> Result<Value, EngineError> {
        let function = self.eval(callee, frame, line)?;
        let mut values: SmallVec<[Value; 8]> = SmallVec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg, frame, line)?);
        }

        let nargs = values.len();
        self.push_value(function);
        for value in values {
            self.push_value(value);
        }

        match self.call(nargs, 1) {
            Ok(()) => Ok(self.pop_value()),
            Err(EngineError::NotCallable { type_name }) => {
                let message = match callee {
                    Expr::Name(name) if frame.local(name).is_some() => {
                        format!("attempt to call a {} value (local '{}')", type_name, name)
                    }
                    Expr::Name(name) => {
                        format!("attempt to call a {} value (global '{}')", type_name, name)
                    }
                    _ => format!("attempt to call a {} value", type_name),
                };
                Err(frame.error(line, message))
            }
            Err(e) => Err(e),
        }
    }
}

fn unary(op: UnaryOp, operand: &Value) -> Result<Value, String> {
    match op {
        UnaryOp::Not => Ok(Value::Boolean(!operand.is_truthy())),
        UnaryOp::Neg => match operand.to_numeric() {
            Some(Value::Integer(value)) => Ok(Value::Integer(value.wrapping_neg())),
            Some(Value::Float(value)) => Ok(Value::Float(-value)),
            _ => Err(arith_error(operand)),
        },
        UnaryOp::Len => match operand {
            Value::Str(text) => Ok(Value::Integer(text.len() as Integer)),
            other => Err(format!("attempt to get length of a {} value", other.type_name())),
        },
    }
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, String> {
    match op {
        BinaryOp::Add => arith(lhs, rhs, Integer::wrapping_add, |a, b| a + b),
        BinaryOp::Sub => arith(lhs, rhs, Integer::wrapping_sub, |a, b| a - b),
        BinaryOp::Mul => arith(lhs, rhs, Integer::wrapping_mul, |a, b| a * b),
        BinaryOp::Div => {
            let (a, b) = numbers(lhs, rhs)?;
            Ok(Value::Float(a / b))
        }
        BinaryOp::Mod => modulo(lhs, rhs),
        BinaryOp::Concat => match (lhs.to_text(), rhs.to_text()) {
            (Some(a), Some(b)) => Ok(Value::string(format!("{}{}", a, b))),
            (None, _) => Err(format!("attempt to concatenate a {} value", lhs.type_name())),
            (_, None) => Err(format!("attempt to concatenate a {} value", rhs.type_name())),
        },
        BinaryOp::Eq => Ok(Value::Boolean(lhs.raw_equals(rhs))),
        BinaryOp::Ne => Ok(Value::Boolean(!lhs.raw_equals(rhs))),
        BinaryOp::Lt => compare(lhs, rhs)
            .map(|o| Value::Boolean(matches!(o, Some(Ordering::Less)))),
        BinaryOp::Le => compare(lhs, rhs)
            .map(|o| Value::Boolean(matches!(o, Some(Ordering::Less | Ordering::Equal)))),
        BinaryOp::Gt => compare(lhs, rhs)
            .map(|o| Value::Boolean(matches!(o, Some(Ordering::Greater)))),
        BinaryOp::Ge => compare(lhs, rhs)
            .map(|o| Value::Boolean(matches!(o, Some(Ordering::Greater | Ordering::Equal)))),
    }
}

fn arith_error(value: &Value) -> String {
    format!("attempt to perform arithmetic on a {} value", value.type_name())
}

fn numerics(lhs: &Value, rhs: &Value) -> Result<(Value, Value), String> {
    let a = lhs.to_numeric().ok_or_else(|| arith_error(lhs))?;
    let b = rhs.to_numeric().ok_or_else(|| arith_error(rhs))?;
    Ok((a, b))
}

fn numbers(lhs: &Value, rhs: &Value) -> Result<(Number, Number), String> {
    let a = lhs.to_number().ok_or_else(|| arith_error(lhs))?;
    let b = rhs.to_number().ok_or_else(|| arith_error(rhs))?;
    Ok((a, b))
}

fn arith(
    lhs: &Value,
    rhs: &Value,
    int_op: fn(Integer, Integer) -> Integer,
    float_op: fn(Number, Number) -> Number,
) -> Result<Value, String> {
    match numerics(lhs, rhs)? {
        (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(int_op(a, b))),
        _ => {
            let (a, b) = numbers(lhs, rhs)?;
            Ok(Value::Float(float_op(a, b)))
        }
    }
}

/// Floored modulo: the result takes the sign of the divisor
fn modulo(lhs: &Value, rhs: &Value) -> Result<Value, String> {
    match numerics(lhs, rhs)? {
        (Value::Integer(_), Value::Integer(0)) => Err("attempt to perform 'n%0'".to_string()),
        (Value::Integer(a), Value::Integer(b)) => {
            let mut r = a.wrapping_rem(b);
            if r != 0 && (r ^ b) < 0 {
                r += b;
            }
            Ok(Value::Integer(r))
        }
        _ => {
            let (a, b) = numbers(lhs, rhs)?;
            let mut r = a % b;
            if r != 0.0 && (r < 0.0) != (b < 0.0) {
                r += b;
            }
            Ok(Value::Float(r))
        }
    }
}

/// `None` when either side is NaN, which makes every ordering test false
fn compare(lhs: &Value, rhs: &Value) -> Result<Option<Ordering>, String> {
    match (lhs, rhs) {
        (Value::Integer(a), Value::Integer(b)) => Ok(Some(a.cmp(b))),
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            let (a, b) = numbers(lhs, rhs)?;
            Ok(a.partial_cmp(&b))
        }
        (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
        _ => Err(format!(
            "attempt to compare {} with {}",
            lhs.type_name(),
            rhs.type_name()
        )),
    }
}
