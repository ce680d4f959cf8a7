//! The evaluator and the per-turn driver.

use crate::builtins;
use crate::error::{Error, Result};
use crate::heap::{Handle, Heap};
use crate::intern::Interner;
use crate::lexer::Tokenizer;
use crate::parser;
use crate::scope;
use crate::value::{self, Value};

/// A persistent interpreter instance: the heap, the symbol interner and
/// the global environment the collector sweeps from. Each instance is
/// fully self-contained, so several can coexist in one process.
pub struct Interpreter {
    pub(crate) heap: Heap,
    pub(crate) interner: Interner,
    global: Handle,
}

impl Interpreter {
    pub fn new() -> Self {
        let mut heap = Heap::new();
        let mut interner = Interner::new();
        let global = scope::create(&mut heap, None);
        builtins::install(&mut heap, &mut interner, global);
        Interpreter {
            heap,
            interner,
            global,
        }
    }

    /// Runs one turn: parse, evaluate, serialize, sweep. The sweep runs
    /// whether or not the turn succeeded, so intermediate graphs built
    /// by a failing expression never outlive it.
    pub fn run(&mut self, input: &str) -> Result<String> {
        let outcome = self.run_turn(input);
        self.heap.collect(self.global);
        outcome
    }

    /// Occupied heap slots. Between turns this equals the count of
    /// values reachable from the global environment.
    pub fn live_objects(&self) -> usize {
        self.heap.live()
    }

    fn run_turn(&mut self, input: &str) -> Result<String> {
        let mut tokens = Tokenizer::new(input)?;
        let expr = parser::read(&mut tokens, &mut self.heap, &mut self.interner)?;
        if !tokens.is_end() {
            let span = tokens.span();
            return Err(Error::syntax(format!(
                "trailing input after expression at {}..{}",
                span.start, span.end
            )));
        }
        if expr.is_none() {
            return Err(Error::runtime("cannot evaluate the empty list"));
        }
        let result = self.eval(expr, self.global)?;
        Ok(value::serialize(&self.heap, &self.interner, result))
    }

    /// Dispatch on value kind: atoms and callables evaluate to
    /// themselves, symbols are looked up, pairs are applications.
    pub(crate) fn eval(&mut self, expr: Option<Handle>, env: Handle) -> Result<Option<Handle>> {
        let Some(handle) = expr else {
            return Ok(None);
        };
        match self.heap.get(handle) {
            Value::Number(_)
            | Value::Boolean(_)
            | Value::Builtin(_)
            | Value::Closure(_)
            | Value::Scope(_) => Ok(Some(handle)),
            Value::Symbol(sym) => {
                let sym = *sym;
                scope::lookup(&self.heap, env, sym).ok_or_else(|| {
                    Error::name(format!("unbound name `{}`", self.interner.resolve(sym)))
                })
            }
            Value::Pair(_) => self.eval_application(handle, env),
        }
    }

    fn eval_application(&mut self, form: Handle, env: Handle) -> Result<Option<Handle>> {
        let items = value::proper_list(&self.heap, Some(form))
            .ok_or_else(|| Error::runtime("call form must be a proper list"))?;
        let callee = self.eval(items[0], env)?;
        let callee = match callee {
            Some(handle) => handle,
            None => return Err(Error::runtime("operator is not callable")),
        };
        match self.heap.get(callee) {
            Value::Builtin(builtin) => {
                let builtin = *builtin;
                self.apply_builtin(builtin, &items[1..], env)
            }
            Value::Closure(closure) => {
                // Closure arguments are evaluated here, in the caller's
                // environment, strictly left to right.
                let closure = closure.clone();
                let mut args = Vec::with_capacity(items.len() - 1);
                for &arg in &items[1..] {
                    args.push(self.eval(arg, env)?);
                }
                self.apply_closure(&closure, &args)
            }
            _ => Err(Error::runtime("operator is not callable")),
        }
    }

    fn apply_closure(
        &mut self,
        closure: &value::Closure,
        args: &[Option<Handle>],
    ) -> Result<Option<Handle>> {
        if closure.params.len() != args.len() {
            return Err(Error::runtime(format!(
                "expected {} arguments, got {}",
                closure.params.len(),
                args.len()
            )));
        }
        let call_env = scope::create(&mut self.heap, Some(closure.env));
        for (&param, &arg) in closure.params.iter().zip(args) {
            let name = self.symbol_param(param)?;
            scope::define(&mut self.heap, call_env, name, arg);
        }
        let mut result = None;
        for &expr in &closure.body {
            result = self.eval(expr, call_env)?;
        }
        Ok(result)
    }

    fn symbol_param(&self, param: Option<Handle>) -> Result<crate::intern::Symbol> {
        match param.map(|h| self.heap.get(h)) {
            Some(Value::Symbol(sym)) => Ok(*sym),
            _ => Err(Error::runtime("parameter is not a symbol")),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_all(inputs: &[&str]) -> Result<String> {
        let mut interp = Interpreter::new();
        let mut last = String::new();
        for input in inputs {
            last = interp.run(input)?;
        }
        Ok(last)
    }

    #[test]
    fn atoms_evaluate_to_themselves() {
        assert_eq!(run_all(&["42"]).unwrap(), "42");
        assert_eq!(run_all(&["#t"]).unwrap(), "#t");
    }

    #[test]
    fn symbols_resolve_through_the_global_environment() {
        assert_eq!(run_all(&["+"]).unwrap(), "[Function]");
        assert!(matches!(run_all(&["ghost"]), Err(Error::Name(_))));
    }

    #[test]
    fn applications_require_a_callable_operator() {
        assert!(matches!(run_all(&["(1 2 3)"]), Err(Error::Runtime(_))));
        assert!(matches!(run_all(&["(())"]), Err(Error::Runtime(_))));
        assert!(matches!(run_all(&["()"]), Err(Error::Runtime(_))));
    }

    #[test]
    fn dotted_call_forms_are_rejected() {
        assert!(matches!(run_all(&["(+ 1 . 2)"]), Err(Error::Runtime(_))));
    }

    #[test]
    fn trailing_tokens_after_one_expression_are_a_syntax_error() {
        assert!(matches!(run_all(&["(+ 1 2) 3"]), Err(Error::Syntax(_))));
    }

    #[test]
    fn closure_arity_is_exact() {
        let result = run_all(&["((lambda (x y) x) 1)"]);
        assert!(matches!(result, Err(Error::Runtime(_))));
    }

    #[test]
    fn closure_bodies_run_in_sequence_and_return_the_last_value() {
        let result = run_all(&["((lambda (x) (define y 2) (+ x y)) 40)"]);
        assert_eq!(result.unwrap(), "42");
    }

    #[test]
    fn lambda_parameters_must_be_symbols_when_bound() {
        assert_eq!(run_all(&["(lambda (1) 1)"]).unwrap(), "[Lambda]");
        assert!(matches!(
            run_all(&["((lambda (1) 1) 2)"]),
            Err(Error::Runtime(_))
        ));
    }

    #[test]
    fn every_turn_sweeps_back_to_the_reachable_set() {
        let mut interp = Interpreter::new();
        let baseline = interp.live_objects();
        interp.run("(+ 1 (* 2 3) (- 4 5))").unwrap();
        assert_eq!(interp.live_objects(), baseline);
    }

    #[test]
    fn failed_turns_sweep_too() {
        let mut interp = Interpreter::new();
        let baseline = interp.live_objects();
        assert!(interp.run("(car (list 1 2 (undefined)))").is_err());
        assert_eq!(interp.live_objects(), baseline);
    }

    #[test]
    fn defined_values_survive_the_sweep() {
        let mut interp = Interpreter::new();
        let baseline = interp.live_objects();
        interp.run("(define xs (list 1 2 3))").unwrap();
        // Three pairs and three numbers now hang off the global scope.
        assert_eq!(interp.live_objects(), baseline + 6);
        interp.run("(define xs 0)").unwrap();
        assert_eq!(interp.live_objects(), baseline + 1);
    }
}
