//! The fixed primitive catalogue.
//!
//! Every builtin receives its arguments unevaluated together with the
//! calling environment; ordinary procedures evaluate eagerly at the
//! top, while the special forms (`quote`, `if`, `define`, `set!`,
//! `lambda`, `and`, `or`) decide per argument. That single contract is
//! what lets them share one dispatch path in the evaluator.

use crate::error::{Error, Result};
use crate::heap::{Handle, Heap};
use crate::intern::{Interner, Symbol};
use crate::interpreter::Interpreter;
use crate::scope;
use crate::value::{self, Closure, Pair, Value};

/// Identity of one primitive operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Add,
    Sub,
    Mul,
    Div,
    Max,
    Min,
    Abs,
    IsNumber,
    IsBoolean,
    IsPair,
    IsNull,
    IsList,
    IsSymbol,
    Not,
    NumEq,
    Gt,
    Lt,
    Ge,
    Le,
    And,
    Or,
    Quote,
    Cons,
    Car,
    Cdr,
    List,
    ListRef,
    ListTail,
    Define,
    SetBang,
    If,
    SetCar,
    SetCdr,
    Lambda,
}

/// Name table bound into the global environment at startup. `'` and
/// `quote` are two names for the same primitive.
pub const TABLE: &[(&str, Builtin)] = &[
    ("+", Builtin::Add),
    ("-", Builtin::Sub),
    ("*", Builtin::Mul),
    ("/", Builtin::Div),
    ("max", Builtin::Max),
    ("min", Builtin::Min),
    ("abs", Builtin::Abs),
    ("number?", Builtin::IsNumber),
    ("boolean?", Builtin::IsBoolean),
    ("pair?", Builtin::IsPair),
    ("null?", Builtin::IsNull),
    ("list?", Builtin::IsList),
    ("symbol?", Builtin::IsSymbol),
    ("not", Builtin::Not),
    ("=", Builtin::NumEq),
    (">", Builtin::Gt),
    ("<", Builtin::Lt),
    (">=", Builtin::Ge),
    ("<=", Builtin::Le),
    ("and", Builtin::And),
    ("or", Builtin::Or),
    ("'", Builtin::Quote),
    ("quote", Builtin::Quote),
    ("cons", Builtin::Cons),
    ("car", Builtin::Car),
    ("cdr", Builtin::Cdr),
    ("list", Builtin::List),
    ("list-ref", Builtin::ListRef),
    ("list-tail", Builtin::ListTail),
    ("define", Builtin::Define),
    ("set!", Builtin::SetBang),
    ("if", Builtin::If),
    ("set-car!", Builtin::SetCar),
    ("set-cdr!", Builtin::SetCdr),
    ("lambda", Builtin::Lambda),
];

/// Binds the whole catalogue into `global`.
pub fn install(heap: &mut Heap, interner: &mut Interner, global: Handle) {
    for &(name, builtin) in TABLE {
        let sym = interner.intern(name);
        let handle = heap.alloc(Value::Builtin(builtin));
        scope::define(heap, global, sym, Some(handle));
    }
}

impl Interpreter {
    pub(crate) fn apply_builtin(
        &mut self,
        builtin: Builtin,
        args: &[Option<Handle>],
        env: Handle,
    ) -> Result<Option<Handle>> {
        match builtin {
            Builtin::Add | Builtin::Sub | Builtin::Mul | Builtin::Div | Builtin::Max
            | Builtin::Min => self.arith_fold(builtin, args, env),
            Builtin::Abs => {
                let [arg] = unary(args)?;
                let n = self.eval_to_number(arg, env)?;
                Ok(Some(self.number(n.wrapping_abs())))
            }
            Builtin::IsNumber | Builtin::IsBoolean | Builtin::IsPair | Builtin::IsNull
            | Builtin::IsList | Builtin::IsSymbol | Builtin::Not => {
                self.type_predicate(builtin, args, env)
            }
            Builtin::NumEq | Builtin::Gt | Builtin::Lt | Builtin::Ge | Builtin::Le => {
                self.compare_chain(builtin, args, env)
            }
            Builtin::And | Builtin::Or => self.short_circuit(builtin, args, env),
            Builtin::Quote => {
                let [quoted] = unary(args)?;
                Ok(quoted)
            }
            Builtin::Cons => {
                let [car_expr, cdr_expr] = binary(args)?;
                let car = self.eval(car_expr, env)?;
                let cdr = self.eval(cdr_expr, env)?;
                Ok(Some(self.heap.alloc(Value::Pair(Pair { car, cdr }))))
            }
            Builtin::Car | Builtin::Cdr => {
                let [arg] = unary(args)?;
                let pair = self.eval_to_pair(arg, env)?;
                Ok(if builtin == Builtin::Car { pair.car } else { pair.cdr })
            }
            Builtin::List => {
                let mut elements = Vec::with_capacity(args.len());
                for &arg in args {
                    elements.push(self.eval(arg, env)?);
                }
                Ok(value::list_from(&mut self.heap, &elements, None))
            }
            Builtin::ListRef | Builtin::ListTail => self.list_index(builtin, args, env),
            Builtin::SetCar | Builtin::SetCdr => {
                let [target_expr, value_expr] = binary(args)?;
                let target = self.eval(target_expr, env)?;
                let target = match target {
                    Some(h) if matches!(self.heap.get(h), Value::Pair(_)) => h,
                    _ => return Err(Error::runtime("expected a pair")),
                };
                let new_value = self.eval(value_expr, env)?;
                if let Value::Pair(pair) = self.heap.get_mut(target) {
                    if builtin == Builtin::SetCar {
                        pair.car = new_value;
                    } else {
                        pair.cdr = new_value;
                    }
                }
                Ok(None)
            }
            Builtin::Define => self.builtin_define(args, env),
            Builtin::SetBang => self.builtin_set(args, env),
            Builtin::If => self.builtin_if(args, env),
            Builtin::Lambda => self.builtin_lambda(args, env),
        }
    }

    fn number(&mut self, n: i64) -> Handle {
        self.heap.alloc(Value::Number(n))
    }

    fn boolean(&mut self, b: bool) -> Handle {
        self.heap.alloc(Value::Boolean(b))
    }

    fn eval_to_number(&mut self, expr: Option<Handle>, env: Handle) -> Result<i64> {
        match self.eval(expr, env)?.map(|h| self.heap.get(h)) {
            Some(Value::Number(n)) => Ok(*n),
            _ => Err(Error::runtime("expected a number")),
        }
    }

    fn eval_to_pair(&mut self, expr: Option<Handle>, env: Handle) -> Result<Pair> {
        match self.eval(expr, env)?.map(|h| self.heap.get(h)) {
            Some(Value::Pair(pair)) => Ok(*pair),
            _ => Err(Error::runtime("expected a pair")),
        }
    }

    fn symbol_of(&self, value: Option<Handle>) -> Result<Symbol> {
        match value.map(|h| self.heap.get(h)) {
            Some(Value::Symbol(sym)) => Ok(*sym),
            _ => Err(Error::runtime("expected a symbol")),
        }
    }

    fn is_false(&self, value: Option<Handle>) -> bool {
        value.map_or(false, |h| self.heap.get(h).is_false())
    }

    fn arith_fold(
        &mut self,
        op: Builtin,
        args: &[Option<Handle>],
        env: Handle,
    ) -> Result<Option<Handle>> {
        if args.is_empty() {
            return match op {
                Builtin::Add => Ok(Some(self.number(0))),
                Builtin::Mul => Ok(Some(self.number(1))),
                _ => Err(Error::runtime("expected at least one argument")),
            };
        }
        let mut acc = self.eval_to_number(args[0], env)?;
        if args.len() == 1 {
            if op == Builtin::Sub {
                acc = acc.wrapping_neg();
            }
            return Ok(Some(self.number(acc)));
        }
        for &arg in &args[1..] {
            let rhs = self.eval_to_number(arg, env)?;
            acc = match op {
                Builtin::Add => acc.wrapping_add(rhs),
                Builtin::Sub => acc.wrapping_sub(rhs),
                Builtin::Mul => acc.wrapping_mul(rhs),
                Builtin::Div => {
                    if rhs == 0 {
                        return Err(Error::runtime("division by zero"));
                    }
                    acc.wrapping_div(rhs)
                }
                Builtin::Max => acc.max(rhs),
                Builtin::Min => acc.min(rhs),
                _ => unreachable!("not an arithmetic fold"),
            };
        }
        Ok(Some(self.number(acc)))
    }

    fn type_predicate(
        &mut self,
        op: Builtin,
        args: &[Option<Handle>],
        env: Handle,
    ) -> Result<Option<Handle>> {
        let [arg] = unary(args)?;
        let value = self.eval(arg, env)?;
        let truth = match op {
            Builtin::IsNull => value.is_none(),
            Builtin::IsNumber => matches!(value.map(|h| self.heap.get(h)), Some(Value::Number(_))),
            Builtin::IsBoolean => {
                matches!(value.map(|h| self.heap.get(h)), Some(Value::Boolean(_)))
            }
            Builtin::IsSymbol => matches!(value.map(|h| self.heap.get(h)), Some(Value::Symbol(_))),
            Builtin::IsPair => matches!(value.map(|h| self.heap.get(h)), Some(Value::Pair(_))),
            Builtin::IsList => value::proper_list(&self.heap, value).is_some(),
            Builtin::Not => self.is_false(value),
            _ => unreachable!("not a predicate"),
        };
        Ok(Some(self.boolean(truth)))
    }

    /// Adjacent-pair comparison chain. Fewer than two operands is
    /// vacuously true, without evaluating anything; evaluation stops at
    /// the first failing pair.
    fn compare_chain(
        &mut self,
        op: Builtin,
        args: &[Option<Handle>],
        env: Handle,
    ) -> Result<Option<Handle>> {
        if args.len() < 2 {
            return Ok(Some(self.boolean(true)));
        }
        let mut prev = self.eval_to_number(args[0], env)?;
        for &arg in &args[1..] {
            let next = self.eval_to_number(arg, env)?;
            let holds = match op {
                Builtin::NumEq => prev == next,
                Builtin::Gt => prev > next,
                Builtin::Lt => prev < next,
                Builtin::Ge => prev >= next,
                Builtin::Le => prev <= next,
                _ => unreachable!("not a comparison"),
            };
            if !holds {
                return Ok(Some(self.boolean(false)));
            }
            prev = next;
        }
        Ok(Some(self.boolean(true)))
    }

    /// `and` returns the first false value or the last one; `or`
    /// returns the first non-false value or the last one. Arguments
    /// after the decisive one are never evaluated.
    fn short_circuit(
        &mut self,
        op: Builtin,
        args: &[Option<Handle>],
        env: Handle,
    ) -> Result<Option<Handle>> {
        if args.is_empty() {
            let empty = self.boolean(op == Builtin::And);
            return Ok(Some(empty));
        }
        let mut value = None;
        for &arg in args {
            value = self.eval(arg, env)?;
            let decisive = match op {
                Builtin::And => self.is_false(value),
                _ => !self.is_false(value),
            };
            if decisive {
                return Ok(value);
            }
        }
        Ok(value)
    }

    fn list_index(
        &mut self,
        op: Builtin,
        args: &[Option<Handle>],
        env: Handle,
    ) -> Result<Option<Handle>> {
        let [list_expr, index_expr] = binary(args)?;
        let list = self.eval(list_expr, env)?;
        let elements = value::proper_list(&self.heap, list)
            .ok_or_else(|| Error::runtime("expected a proper list"))?;
        let index = self.eval_to_number(index_expr, env)?;
        if index < 0 {
            return Err(Error::runtime("index out of range"));
        }
        let index = index as usize;
        match op {
            Builtin::ListRef => {
                if index >= elements.len() {
                    return Err(Error::runtime("index out of range"));
                }
                Ok(elements[index])
            }
            _ => {
                if index > elements.len() {
                    return Err(Error::runtime("index out of range"));
                }
                Ok(value::list_from(&mut self.heap, &elements[index..], None))
            }
        }
    }

    fn builtin_define(&mut self, args: &[Option<Handle>], env: Handle) -> Result<Option<Handle>> {
        if args.len() < 2 {
            return Err(Error::syntax("define takes a name and a value"));
        }
        let is_signature = matches!(
            args[0].map(|h| self.heap.get(h)),
            Some(Value::Pair(_))
        );
        if is_signature {
            // `(define (f p...) body...)` binds `f` to a lambda whose
            // captured environment is the one in effect right here.
            let signature = value::proper_list(&self.heap, args[0])
                .ok_or_else(|| Error::syntax("malformed define signature"))?;
            let name = self.symbol_of(signature[0])?;
            let closure = Closure {
                params: signature[1..].to_vec(),
                body: args[1..].to_vec(),
                env,
            };
            let handle = self.heap.alloc(Value::Closure(closure));
            scope::define(&mut self.heap, env, name, Some(handle));
        } else {
            if args.len() > 2 {
                return Err(Error::syntax("define takes a name and a value"));
            }
            let name = self.symbol_of(args[0])?;
            let new_value = self.eval(args[1], env)?;
            scope::define(&mut self.heap, env, name, new_value);
        }
        Ok(None)
    }

    fn builtin_set(&mut self, args: &[Option<Handle>], env: Handle) -> Result<Option<Handle>> {
        let [name_expr, value_expr] = match args {
            [a, b] => [*a, *b],
            _ => return Err(Error::syntax("set! takes a name and a value")),
        };
        let name = self.symbol_of(name_expr)?;
        let new_value = self.eval(value_expr, env)?;
        if !scope::assign(&mut self.heap, env, name, new_value) {
            return Err(Error::name(format!(
                "unbound name `{}`",
                self.interner.resolve(name)
            )));
        }
        Ok(None)
    }

    fn builtin_if(&mut self, args: &[Option<Handle>], env: Handle) -> Result<Option<Handle>> {
        if args.len() != 2 && args.len() != 3 {
            return Err(Error::syntax("if takes a condition and one or two branches"));
        }
        let condition = self.eval(args[0], env)?;
        if !self.is_false(condition) {
            self.eval(args[1], env)
        } else if args.len() == 3 {
            self.eval(args[2], env)
        } else {
            Ok(None)
        }
    }

    fn builtin_lambda(&mut self, args: &[Option<Handle>], env: Handle) -> Result<Option<Handle>> {
        if args.len() < 2 {
            return Err(Error::syntax("lambda takes parameters and a body"));
        }
        let params = match args[0].map(|h| self.heap.get(h)) {
            None => Vec::new(),
            Some(Value::Pair(_)) => value::proper_list(&self.heap, args[0])
                .ok_or_else(|| Error::syntax("malformed parameter list"))?,
            Some(_) => return Err(Error::runtime("expected a parameter list")),
        };
        let closure = Closure {
            params,
            body: args[1..].to_vec(),
            env,
        };
        Ok(Some(self.heap.alloc(Value::Closure(closure))))
    }
}

fn unary(args: &[Option<Handle>]) -> Result<[Option<Handle>; 1]> {
    match args {
        [a] => Ok([*a]),
        _ => Err(Error::runtime("expected one argument")),
    }
}

fn binary(args: &[Option<Handle>]) -> Result<[Option<Handle>; 2]> {
    match args {
        [a, b] => Ok([*a, *b]),
        _ => Err(Error::runtime("expected two arguments")),
    }
}
