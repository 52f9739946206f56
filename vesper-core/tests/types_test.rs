// vesper-core - Custom types and multimethods integration tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Tests for: deftype and friends, multimethod dispatch and defaults,
//! type names of built-in values

mod common;

use common::{Keyword, Value, eval_str, int, kw};

// =============================================================================
// deftype
// =============================================================================

#[test]
fn test_deftype_fields_and_predicate() {
    assert_eval!(
        "(deftype :point [x :long y :long]) (let [p (point. 3 4)] [(:x p) (:y p) (point? p)])",
        Value::vector(vec![int(3), int(4), Value::Bool(true)])
    );
}

#[test]
fn test_deftype_destructuring() {
    assert_eval!(
        "(deftype :point [x y]) (let [{:keys [x y]} (point. 1 2)] (+ x y))",
        int(3)
    );
}

#[test]
fn test_deftype_wrong_field_count() {
    assert_eval_err!("(deftype :point [x y]) (point. 1)", "ArityException");
}

#[test]
fn test_deftype_instances_compare_by_value() {
    assert_eval!("(deftype :point [x y]) (= (point. 1 2) (point. 1 2))", Value::Bool(true));
    assert_eval!("(deftype :point [x y]) (= (point. 1 2) {:x 1 :y 2})", Value::Bool(false));
}

#[test]
fn test_deftype_q() {
    assert_eval!("(deftype :point [x y]) (deftype? :point 1)", Value::Bool(false));
}

#[test]
fn test_deftype_or_values() {
    assert_eval!(
        "(deftype-or :level :low :high) (:value (level. :low))",
        kw("low")
    );
}

// =============================================================================
// type
// =============================================================================

#[test]
fn test_type_of_builtins() {
    assert_eval!("(type 1)", Value::Keyword(Keyword::with_namespace("core", "long")));
    assert_eval!("(type \"s\")", Value::Keyword(Keyword::with_namespace("core", "string")));
    assert_eval!("(type nil)", Value::Keyword(Keyword::with_namespace("core", "nil")));
}

// =============================================================================
// Multimethods
// =============================================================================

#[test]
fn test_multimethod_keyword_dispatch() {
    let src = "(defmulti area :shape)
               (defmethod area :square [{:keys [side]}] (* side side))
               (defmethod area :rect [{:keys [w h]}] (* w h))";
    assert_eval!(&format!("{} (area {{:shape :square :side 3}})", src), int(9));
    assert_eval!(&format!("{} (area {{:shape :rect :w 2 :h 5}})", src), int(10));
}

#[test]
fn test_multimethod_default() {
    assert_eval!(
        "(defmulti describe (fn [x] (type x)))
         (defmethod describe :core/long [x] :number)
         (defmethod describe :default [x] :unknown)
         [(describe 1) (describe \"s\")]",
        Value::vector(vec![kw("number"), kw("unknown")])
    );
}

#[test]
fn test_multimethod_no_match() {
    assert_eval_err!(
        "(defmulti pick :kind) (defmethod pick :a [_] 1) (pick {:kind :b})",
        "no method"
    );
}

#[test]
fn test_multimethod_redefine_method() {
    assert_eval!(
        "(defmulti f identity) (defmethod f 1 [_] :first) (defmethod f 1 [_] :second) (f 1)",
        kw("second")
    );
}
