// vesper-parser - Value types for Vesper
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The core value type and its reference-cell companions.
//!
//! Every value is immutable and cheap to clone: scalars are copied,
//! compound values share structure through `Arc` and the persistent
//! collections of the `im` crate. The only mutable cells are [`Atom`],
//! [`Var`] roots and [`MultiFn`] method tables, each guarded by its own
//! lock so values can be shared freely between interpreter threads.
//!
//! Symbols, collections and functions carry optional metadata. Metadata
//! never participates in equality, ordering or hashing.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use im::{OrdMap, OrdSet, Vector};

use crate::decimal::Decimal;
use crate::keyword::Keyword;
use crate::printer;
use crate::symbol::Symbol;

/// Metadata map attached to symbols, collections and functions.
pub type Meta = OrdMap<Value, Value>;

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    /// 64-bit signed integer (`long`)
    Int(i64),
    /// 64-bit float (`double`)
    Float(f64),
    /// Arbitrary precision decimal, written with an `M` suffix
    Decimal(Decimal),
    String(Arc<str>),
    Keyword(Keyword),
    Symbol(Symbol, Option<Arc<Meta>>),
    List(Vector<Value>, Option<Arc<Meta>>),
    Vector(Vector<Value>, Option<Arc<Meta>>),
    Map(OrdMap<Value, Value>, Option<Arc<Meta>>),
    Set(OrdSet<Value>, Option<Arc<Meta>>),
    /// Closure or macro built from source
    Fn(VesperFn),
    /// Function implemented in Rust
    NativeFn(NativeFn),
    /// Multimethod dispatching on a dispatch function's result
    MultiFn(MultiFn),
    Atom(Atom),
    /// First-class reference to a global var
    Var(Var),
    /// Instance of a type created by `deftype`, `deftype-of` or `deftype-or`
    Custom(CustomValue),
}

// ============================================================================
// Functions
// ============================================================================

/// One arity of a source function.
///
/// `params` holds the positional binding patterns; when every pattern is a
/// plain symbol `simple` is set and binding skips destructuring.
#[derive(Clone)]
pub struct FnArity {
    pub params: Vec<Value>,
    pub rest: Option<Value>,
    pub simple: bool,
    /// `{:pre [...]}` conditions
    pub preconditions: Vec<Value>,
    /// `{:post [...]}` conditions, evaluated with `%` bound to the result
    pub postconditions: Vec<Value>,
    pub body: Vector<Value>,
}

impl FnArity {
    pub fn new(params: Vec<Value>, rest: Option<Value>, body: Vector<Value>) -> Self {
        let simple = params.iter().all(|p| matches!(p, Value::Symbol(..)))
            && rest.as_ref().is_none_or(|r| matches!(r, Value::Symbol(..)));
        FnArity {
            params,
            rest,
            simple,
            preconditions: Vec::new(),
            postconditions: Vec::new(),
            body,
        }
    }

    #[must_use]
    pub fn is_variadic(&self) -> bool {
        self.rest.is_some()
    }

    /// Number of required positional arguments.
    #[must_use]
    pub fn required(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn accepts(&self, argc: usize) -> bool {
        if self.is_variadic() {
            argc >= self.params.len()
        } else {
            argc == self.params.len()
        }
    }

    /// Argument-list signature as written, e.g. `[a b & more]`.
    #[must_use]
    pub fn signature(&self) -> String {
        let mut parts: Vec<String> = self.params.iter().map(printer::print).collect();
        if let Some(rest) = &self.rest {
            parts.push("&".to_string());
            parts.push(printer::print(rest));
        }
        format!("[{}]", parts.join(" "))
    }
}

/// Shared definition behind a [`VesperFn`].
pub struct FnDef {
    /// Name used in diagnostics and for self-reference
    pub name: Option<Symbol>,
    pub arities: Vec<FnArity>,
    pub is_macro: bool,
    /// Namespace the function was defined in
    pub namespace: Arc<str>,
    pub meta: Option<Arc<Meta>>,
    /// Captured lexical environment (type-erased; owned by the evaluator)
    pub env: Arc<dyn Any + Send + Sync>,
}

/// A closure or macro created by `fn`, `defn` or `defmacro`.
#[derive(Clone)]
pub struct VesperFn {
    inner: Arc<FnDef>,
}

impl VesperFn {
    pub fn new(def: FnDef) -> Self {
        VesperFn {
            inner: Arc::new(def),
        }
    }

    #[must_use]
    pub fn def(&self) -> &FnDef {
        &self.inner
    }

    #[must_use]
    pub fn name(&self) -> Option<&Symbol> {
        self.inner.name.as_ref()
    }

    /// Display name: the qualified name, or `anonymous`.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.inner.name {
            Some(sym) if sym.is_qualified() => sym.to_string(),
            Some(sym) => format!("{}/{}", self.inner.namespace, sym.name()),
            None => "anonymous".to_string(),
        }
    }

    #[must_use]
    pub fn is_macro(&self) -> bool {
        self.inner.is_macro
    }

    #[must_use]
    pub fn arities(&self) -> &[FnArity] {
        &self.inner.arities
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    #[must_use]
    pub fn env(&self) -> &Arc<dyn Any + Send + Sync> {
        &self.inner.env
    }

    /// The arity accepting `argc` arguments. Fixed arities win over the
    /// variadic one.
    #[must_use]
    pub fn find_arity(&self, argc: usize) -> Option<&FnArity> {
        self.inner
            .arities
            .iter()
            .find(|a| !a.is_variadic() && a.accepts(argc))
            .or_else(|| self.inner.arities.iter().find(|a| a.accepts(argc)))
    }

    #[must_use]
    pub fn signatures(&self) -> Vec<String> {
        self.inner.arities.iter().map(FnArity::signature).collect()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &VesperFn) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn rebuild(&self, name: Option<Symbol>, meta: Option<Arc<Meta>>) -> VesperFn {
        VesperFn::new(FnDef {
            name,
            arities: self.inner.arities.clone(),
            is_macro: self.inner.is_macro,
            namespace: Arc::clone(&self.inner.namespace),
            meta,
            env: Arc::clone(&self.inner.env),
        })
    }

    /// Copy carrying a name, used when `def` binds an anonymous function.
    #[must_use]
    pub fn with_name(&self, name: Symbol) -> VesperFn {
        self.rebuild(Some(name), self.inner.meta.clone())
    }

    #[must_use]
    pub fn with_meta(&self, meta: Option<Arc<Meta>>) -> VesperFn {
        self.rebuild(self.inner.name.clone(), meta)
    }

    /// Copy flagged as a macro.
    #[must_use]
    pub fn into_macro(self) -> VesperFn {
        if self.inner.is_macro {
            return self;
        }
        VesperFn::new(FnDef {
            name: self.inner.name.clone(),
            arities: self.inner.arities.clone(),
            is_macro: true,
            namespace: Arc::clone(&self.inner.namespace),
            meta: self.inner.meta.clone(),
            env: Arc::clone(&self.inner.env),
        })
    }
}

impl fmt::Debug for VesperFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_macro() { "macro" } else { "fn" };
        write!(f, "#<{} {}>", kind, self.display_name())
    }
}

/// A function implemented in Rust. The callable is type-erased so this
/// crate stays independent of the evaluator's error type.
#[derive(Clone)]
pub struct NativeFn {
    name: Arc<str>,
    func: Arc<dyn Any + Send + Sync>,
}

impl NativeFn {
    pub fn new(name: &str, func: Arc<dyn Any + Send + Sync>) -> Self {
        NativeFn {
            name: Arc::from(name),
            func,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn func(&self) -> &Arc<dyn Any + Send + Sync> {
        &self.func
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &NativeFn) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<native-fn {}>", self.name)
    }
}

// ============================================================================
// Multimethods
// ============================================================================

pub struct MultiFnInner {
    pub name: Symbol,
    pub dispatch: Value,
    methods: RwLock<OrdMap<Value, Value>>,
}

/// A multimethod: `dispatch` is applied to the arguments and the result
/// selects an implementation, falling back to the `:default` entry.
#[derive(Clone)]
pub struct MultiFn {
    inner: Arc<MultiFnInner>,
}

impl MultiFn {
    pub fn new(name: Symbol, dispatch: Value) -> Self {
        MultiFn {
            inner: Arc::new(MultiFnInner {
                name,
                dispatch,
                methods: RwLock::new(OrdMap::new()),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &Symbol {
        &self.inner.name
    }

    #[must_use]
    pub fn dispatch(&self) -> &Value {
        &self.inner.dispatch
    }

    pub fn add_method(&self, dispatch_val: Value, method: Value) {
        let mut methods = self
            .inner
            .methods
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        methods.insert(dispatch_val, method);
    }

    pub fn remove_method(&self, dispatch_val: &Value) -> bool {
        let mut methods = self
            .inner
            .methods
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        methods.remove(dispatch_val).is_some()
    }

    /// Implementation for `dispatch_val`, else the `:default` one.
    #[must_use]
    pub fn get_method(&self, dispatch_val: &Value) -> Option<Value> {
        let methods = self
            .inner
            .methods
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        methods
            .get(dispatch_val)
            .or_else(|| methods.get(&Value::keyword("default")))
            .cloned()
    }

    #[must_use]
    pub fn methods(&self) -> OrdMap<Value, Value> {
        self.inner
            .methods
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &MultiFn) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

// ============================================================================
// Atoms
// ============================================================================

struct AtomState {
    value: Value,
    /// Bumped on every successful write
    version: u64,
}

struct AtomInner {
    state: Mutex<AtomState>,
}

/// Mutable reference cell with linearizable updates.
#[derive(Clone)]
pub struct Atom {
    inner: Arc<AtomInner>,
}

impl Atom {
    pub fn new(value: Value) -> Self {
        Atom {
            inner: Arc::new(AtomInner {
                state: Mutex::new(AtomState { value, version: 0 }),
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, AtomState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn deref(&self) -> Value {
        self.state().value.clone()
    }

    /// Current value together with its version, for a later
    /// [`Atom::set_if_version`].
    #[must_use]
    pub fn load(&self) -> (Value, u64) {
        let state = self.state();
        (state.value.clone(), state.version)
    }

    /// Unconditional set; returns the new value.
    pub fn reset(&self, value: Value) -> Value {
        let mut state = self.state();
        state.value = value.clone();
        state.version = state.version.wrapping_add(1);
        value
    }

    /// Set to `new` only if the current value equals `old`.
    pub fn compare_and_set(&self, old: &Value, new: Value) -> bool {
        let mut state = self.state();
        if state.value == *old {
            state.value = new;
            state.version = state.version.wrapping_add(1);
            true
        } else {
            false
        }
    }

    /// Set to `new` only if nothing was written since `version` was
    /// loaded.
    pub fn set_if_version(&self, version: u64, new: Value) -> bool {
        let mut state = self.state();
        if state.version == version {
            state.value = new;
            state.version = state.version.wrapping_add(1);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Atom) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}

// ============================================================================
// Vars
// ============================================================================

struct VarInner {
    name: Symbol,
    root: RwLock<Value>,
    overwritable: bool,
    dynamic: bool,
    meta: Option<Arc<Meta>>,
}

/// A global binding. `name` is always namespace-qualified.
///
/// Dynamic vars keep their root here; per-thread pushed values live in
/// the evaluator's thread context.
#[derive(Clone)]
pub struct Var {
    inner: Arc<VarInner>,
}

impl Var {
    pub fn new(name: Symbol, value: Value, overwritable: bool, meta: Option<Arc<Meta>>) -> Self {
        Var::build(name, value, overwritable, false, meta)
    }

    pub fn dynamic(name: Symbol, value: Value, meta: Option<Arc<Meta>>) -> Self {
        Var::build(name, value, true, true, meta)
    }

    fn build(
        name: Symbol,
        value: Value,
        overwritable: bool,
        dynamic: bool,
        meta: Option<Arc<Meta>>,
    ) -> Self {
        Var {
            inner: Arc::new(VarInner {
                name,
                root: RwLock::new(value),
                overwritable,
                dynamic,
                meta,
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &Symbol {
        &self.inner.name
    }

    #[must_use]
    pub fn root(&self) -> Value {
        self.inner
            .root
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_root(&self, value: Value) {
        *self
            .inner
            .root
            .write()
            .unwrap_or_else(PoisonError::into_inner) = value;
    }

    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.inner.dynamic
    }

    #[must_use]
    pub fn is_overwritable(&self) -> bool {
        self.inner.overwritable
    }

    #[must_use]
    pub fn meta(&self) -> Option<&Arc<Meta>> {
        self.inner.meta.as_ref()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Var) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#'{}", self.inner.name)
    }
}

// ============================================================================
// Custom types
// ============================================================================

/// Shape of a user-defined type.
#[derive(Clone)]
pub enum CustomKind {
    /// `deftype`: named fields
    Record { fields: Vec<Keyword> },
    /// `deftype-of`: wraps a value of a base type
    Wrapper { base: Keyword },
    /// `deftype-or`: one of an enumerated set of values
    Choice { values: OrdSet<Value> },
}

pub struct CustomType {
    /// Qualified type name, e.g. `user/point`
    pub name: Symbol,
    pub kind: CustomKind,
    /// Optional validation function applied on construction
    pub validator: Option<Value>,
}

impl CustomType {
    #[must_use]
    pub fn type_keyword(&self) -> Keyword {
        match self.name.namespace() {
            Some(ns) => Keyword::with_namespace(ns, self.name.name()),
            None => Keyword::new(self.name.name()),
        }
    }
}

struct CustomInner {
    ty: Arc<CustomType>,
    fields: Vec<Value>,
}

/// An instance of a [`CustomType`]. Wrapper and choice instances hold a
/// single field, `:value`.
#[derive(Clone)]
pub struct CustomValue {
    inner: Arc<CustomInner>,
}

impl CustomValue {
    pub fn new(ty: Arc<CustomType>, fields: Vec<Value>) -> Self {
        CustomValue {
            inner: Arc::new(CustomInner { ty, fields }),
        }
    }

    #[must_use]
    pub fn ty(&self) -> &Arc<CustomType> {
        &self.inner.ty
    }

    #[must_use]
    pub fn fields(&self) -> &[Value] {
        &self.inner.fields
    }

    /// Field lookup by keyword name.
    #[must_use]
    pub fn get(&self, key: &Keyword) -> Option<&Value> {
        match &self.inner.ty.kind {
            CustomKind::Record { fields } => fields
                .iter()
                .position(|f| f == key)
                .and_then(|i| self.inner.fields.get(i)),
            CustomKind::Wrapper { .. } | CustomKind::Choice { .. } => {
                if key.is("value") {
                    self.inner.fields.first()
                } else {
                    None
                }
            }
        }
    }

    /// Field names paired with values.
    #[must_use]
    pub fn entries(&self) -> Vec<(Keyword, Value)> {
        match &self.inner.ty.kind {
            CustomKind::Record { fields } => fields
                .iter()
                .cloned()
                .zip(self.inner.fields.iter().cloned())
                .collect(),
            _ => self
                .inner
                .fields
                .first()
                .map(|v| vec![(Keyword::new("value"), v.clone())])
                .unwrap_or_default(),
        }
    }
}

// ============================================================================
// Constructors and accessors
// ============================================================================

impl Value {
    #[inline]
    pub fn nil() -> Self {
        Value::Nil
    }

    #[inline]
    pub fn bool(b: bool) -> Self {
        Value::Bool(b)
    }

    #[inline]
    pub fn int(n: i64) -> Self {
        Value::Int(n)
    }

    #[inline]
    pub fn float(n: f64) -> Self {
        Value::Float(n)
    }

    pub fn decimal(d: Decimal) -> Self {
        Value::Decimal(d)
    }

    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Arc::from(s.as_ref()))
    }

    pub fn keyword(name: &str) -> Self {
        Value::Keyword(Keyword::parse(name))
    }

    pub fn symbol(name: &str) -> Self {
        Value::Symbol(Symbol::parse(name), None)
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(items.into_iter().collect(), None)
    }

    pub fn vector(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Vector(items.into_iter().collect(), None)
    }

    pub fn map(pairs: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Value::Map(pairs.into_iter().collect(), None)
    }

    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Set(items.into_iter().collect(), None)
    }

    pub fn empty_list() -> Self {
        Value::List(Vector::new(), None)
    }

    /// Only `nil` and `false` are falsey.
    #[inline]
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    #[inline]
    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_) | Value::Decimal(_))
    }

    #[must_use]
    pub fn is_fn(&self) -> bool {
        matches!(
            self,
            Value::Fn(_) | Value::NativeFn(_) | Value::MultiFn(_)
        )
    }

    #[must_use]
    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Value::Symbol(sym, _) => Some(sym),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_keyword(&self) -> Option<&Keyword> {
        match self {
            Value::Keyword(kw) => Some(kw),
            _ => None,
        }
    }

    /// Whether this is the unqualified symbol `name`.
    #[must_use]
    pub fn is_symbol_named(&self, name: &str) -> bool {
        matches!(self, Value::Symbol(sym, _) if !sym.is_qualified() && sym.name() == name)
    }

    /// Elements of a list or vector.
    #[must_use]
    pub fn as_sequential(&self) -> Option<&Vector<Value>> {
        match self {
            Value::List(items, _) | Value::Vector(items, _) => Some(items),
            _ => None,
        }
    }

    /// Short type name used in messages: `long`, `vector`, `function`...
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "long",
            Value::Float(_) => "double",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Keyword(_) => "keyword",
            Value::Symbol(..) => "symbol",
            Value::List(..) => "list",
            Value::Vector(..) => "vector",
            Value::Map(..) => "map",
            Value::Set(..) => "set",
            Value::Fn(f) if f.is_macro() => "macro",
            Value::Fn(_) | Value::NativeFn(_) => "function",
            Value::MultiFn(_) => "multi-function",
            Value::Atom(_) => "atom",
            Value::Var(_) => "var",
            Value::Custom(_) => "custom",
        }
    }

    /// Type as a keyword: `:core/long` for built-ins, the qualified type
    /// name for custom types.
    #[must_use]
    pub fn type_keyword(&self) -> Keyword {
        match self {
            Value::Custom(c) => c.ty().type_keyword(),
            other => Keyword::with_namespace("core", other.type_name()),
        }
    }

    #[must_use]
    pub fn meta(&self) -> Option<&Arc<Meta>> {
        match self {
            Value::Symbol(_, m)
            | Value::List(_, m)
            | Value::Vector(_, m)
            | Value::Map(_, m)
            | Value::Set(_, m) => m.as_ref(),
            Value::Fn(f) => f.def().meta.as_ref(),
            Value::Var(v) => v.meta(),
            _ => None,
        }
    }

    /// Same value with `meta` replacing the metadata. Values that cannot
    /// carry metadata are returned unchanged.
    #[must_use]
    pub fn with_meta(&self, meta: Option<Arc<Meta>>) -> Value {
        match self {
            Value::Symbol(s, _) => Value::Symbol(s.clone(), meta),
            Value::List(items, _) => Value::List(items.clone(), meta),
            Value::Vector(items, _) => Value::Vector(items.clone(), meta),
            Value::Map(m, _) => Value::Map(m.clone(), meta),
            Value::Set(s, _) => Value::Set(s.clone(), meta),
            Value::Fn(f) => Value::Fn(f.with_meta(meta)),
            other => other.clone(),
        }
    }

    #[must_use]
    pub fn supports_meta(&self) -> bool {
        matches!(
            self,
            Value::Symbol(..)
                | Value::List(..)
                | Value::Vector(..)
                | Value::Map(..)
                | Value::Set(..)
                | Value::Fn(_)
        )
    }

    /// Look up `key` in this value's metadata.
    #[must_use]
    pub fn meta_get(&self, key: &str) -> Option<&Value> {
        self.meta()
            .and_then(|m| m.get(&Value::Keyword(Keyword::new(key))))
    }

    /// Source line recorded by the reader.
    #[must_use]
    pub fn line(&self) -> Option<i64> {
        match self.meta_get("line") {
            Some(Value::Int(n)) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn column(&self) -> Option<i64> {
        match self.meta_get("column") {
            Some(Value::Int(n)) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&printer::print(self))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&printer::print(self))
    }
}

// ============================================================================
// Equality, ordering and hashing (metadata ignored throughout)
// ============================================================================

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits() || a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Keyword(a), Value::Keyword(b)) => a == b,
            (Value::Symbol(a, _), Value::Symbol(b, _)) => a == b,
            (Value::List(a, _), Value::List(b, _)) => a == b,
            (Value::Vector(a, _), Value::Vector(b, _)) => a == b,
            (Value::Map(a, _), Value::Map(b, _)) => a == b,
            (Value::Set(a, _), Value::Set(b, _)) => a == b,
            (Value::Fn(a), Value::Fn(b)) => a.ptr_eq(b),
            (Value::NativeFn(a), Value::NativeFn(b)) => a.ptr_eq(b),
            (Value::MultiFn(a), Value::MultiFn(b)) => a.ptr_eq(b),
            (Value::Atom(a), Value::Atom(b)) => a.ptr_eq(b),
            (Value::Var(a), Value::Var(b)) => a.ptr_eq(b),
            (Value::Custom(a), Value::Custom(b)) => {
                Arc::ptr_eq(&a.inner.ty, &b.inner.ty) && a.inner.fields == b.inner.fields
            }
            _ => false,
        }
    }
}

impl Eq for Value {}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Nil => 0,
        Value::Bool(_) => 1,
        Value::Int(_) => 2,
        Value::Float(_) => 3,
        Value::Decimal(_) => 4,
        Value::String(_) => 5,
        Value::Keyword(_) => 6,
        Value::Symbol(..) => 7,
        Value::List(..) => 8,
        Value::Vector(..) => 9,
        Value::Map(..) => 10,
        Value::Set(..) => 11,
        Value::Fn(_) => 12,
        Value::NativeFn(_) => 13,
        Value::MultiFn(_) => 14,
        Value::Atom(_) => 15,
        Value::Var(_) => 16,
        Value::Custom(_) => 17,
    }
}

fn addr<T: ?Sized>(arc: &Arc<T>) -> usize {
    Arc::as_ptr(arc) as *const () as usize
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let (ra, rb) = (type_rank(self), type_rank(other));
        if ra != rb {
            return ra.cmp(&rb);
        }
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => {
                if a == b {
                    Ordering::Equal
                } else {
                    a.total_cmp(b)
                }
            }
            (Value::Decimal(a), Value::Decimal(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Keyword(a), Value::Keyword(b)) => a.cmp(b),
            (Value::Symbol(a, _), Value::Symbol(b, _)) => a.cmp(b),
            (Value::List(a, _), Value::List(b, _)) | (Value::Vector(a, _), Value::Vector(b, _)) => {
                a.cmp(b)
            }
            (Value::Map(a, _), Value::Map(b, _)) => a.iter().cmp(b.iter()),
            (Value::Set(a, _), Value::Set(b, _)) => a.iter().cmp(b.iter()),
            (Value::Fn(a), Value::Fn(b)) => addr(&a.inner).cmp(&addr(&b.inner)),
            (Value::NativeFn(a), Value::NativeFn(b)) => addr(&a.func).cmp(&addr(&b.func)),
            (Value::MultiFn(a), Value::MultiFn(b)) => addr(&a.inner).cmp(&addr(&b.inner)),
            (Value::Atom(a), Value::Atom(b)) => a.addr().cmp(&b.addr()),
            (Value::Var(a), Value::Var(b)) => addr(&a.inner).cmp(&addr(&b.inner)),
            (Value::Custom(a), Value::Custom(b)) => addr(&a.inner.ty)
                .cmp(&addr(&b.inner.ty))
                .then_with(|| a.inner.fields.cmp(&b.inner.fields)),
            _ => Ordering::Equal,
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        type_rank(self).hash(state);
        match self {
            Value::Nil => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(n) => n.hash(state),
            Value::Float(n) => {
                // 0.0 and -0.0 compare equal
                let n = if *n == 0.0 { 0.0f64 } else { *n };
                n.to_bits().hash(state)
            }
            Value::Decimal(d) => d.hash(state),
            Value::String(s) => s.hash(state),
            Value::Keyword(k) => k.hash(state),
            Value::Symbol(s, _) => s.hash(state),
            Value::List(items, _) | Value::Vector(items, _) => {
                for item in items {
                    item.hash(state);
                }
            }
            Value::Map(map, _) => {
                for (k, v) in map {
                    k.hash(state);
                    v.hash(state);
                }
            }
            Value::Set(set, _) => {
                for item in set {
                    item.hash(state);
                }
            }
            Value::Fn(f) => addr(&f.inner).hash(state),
            Value::NativeFn(f) => addr(&f.func).hash(state),
            Value::MultiFn(m) => addr(&m.inner).hash(state),
            Value::Atom(a) => a.addr().hash(state),
            Value::Var(v) => addr(&v.inner).hash(state),
            Value::Custom(c) => {
                addr(&c.inner.ty).hash(state);
                c.inner.fields.hash(state);
            }
        }
    }
}
