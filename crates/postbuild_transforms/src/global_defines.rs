use std::collections::BTreeMap;

use swc_core::atoms::Atom;
use swc_core::common::Mark;
use swc_core::common::DUMMY_SP;
use swc_core::ecma::ast::ArrayLit;
use swc_core::ecma::ast::Bool;
use swc_core::ecma::ast::Expr;
use swc_core::ecma::ast::ExprOrSpread;
use swc_core::ecma::ast::KeyValueProp;
use swc_core::ecma::ast::Lit;
use swc_core::ecma::ast::MemberExpr;
use swc_core::ecma::ast::MemberProp;
use swc_core::ecma::ast::Null;
use swc_core::ecma::ast::Number;
use swc_core::ecma::ast::ObjectLit;
use swc_core::ecma::ast::Prop;
use swc_core::ecma::ast::PropName;
use swc_core::ecma::ast::PropOrSpread;
use swc_core::ecma::ast::Str;
use swc_core::ecma::ast::UnaryExpr;
use swc_core::ecma::ast::UnaryOp;
use swc_core::ecma::visit::VisitMut;
use swc_core::ecma::visit::VisitMutWith;

/// Replaces references to global identifiers, or member chains rooted at one, with literal
/// values. `{ "ngDevMode": false }` turns `if (ngDevMode) {}` into `if (false) {}` so the
/// minifier can drop the branch.
///
/// Only unresolved references are replaced; a local binding that shadows a defined name is
/// left alone.
pub struct GlobalDefines {
  defines: Vec<(Vec<Atom>, Expr)>,
  unresolved_mark: Mark,
}

impl GlobalDefines {
  pub fn new(defines: &BTreeMap<String, serde_json::Value>, unresolved_mark: Mark) -> Self {
    let defines = defines
      .iter()
      .map(|(key, value)| {
        let path = key.split('.').map(Atom::from).collect::<Vec<_>>();
        (path, json_to_expr(value))
      })
      .collect();

    Self {
      defines,
      unresolved_mark,
    }
  }

  fn replacement(&self, expr: &Expr) -> Option<Expr> {
    let mut path = Vec::new();
    if !self.collect_path(expr, &mut path) {
      return None;
    }

    self
      .defines
      .iter()
      .find(|(define, _)| define.iter().eq(path.iter().copied()))
      .map(|(_, value)| value.clone())
  }

  fn collect_path<'a>(&self, expr: &'a Expr, path: &mut Vec<&'a Atom>) -> bool {
    match expr {
      Expr::Ident(ident) => {
        if ident.ctxt.outer() != self.unresolved_mark {
          return false;
        }
        path.push(&ident.sym);
        true
      }
      Expr::Member(MemberExpr {
        obj,
        prop: MemberProp::Ident(prop),
        ..
      }) => {
        if !self.collect_path(obj, path) {
          return false;
        }
        path.push(&prop.sym);
        true
      }
      _ => false,
    }
  }
}

impl VisitMut for GlobalDefines {
  fn visit_mut_expr(&mut self, expr: &mut Expr) {
    if let Some(replacement) = self.replacement(expr) {
      *expr = replacement;
      return;
    }

    expr.visit_mut_children_with(self);
  }
}

pub fn json_to_expr(value: &serde_json::Value) -> Expr {
  match value {
    serde_json::Value::Null => Lit::Null(Null { span: DUMMY_SP }).into(),
    serde_json::Value::Bool(value) => Lit::Bool(Bool {
      span: DUMMY_SP,
      value: *value,
    })
    .into(),
    serde_json::Value::Number(number) => {
      let value = number.as_f64().unwrap_or_default();
      let literal = Expr::from(Lit::Num(Number {
        span: DUMMY_SP,
        value: value.abs(),
        raw: None,
      }));
      if value.is_sign_negative() {
        UnaryExpr {
          span: DUMMY_SP,
          op: UnaryOp::Minus,
          arg: Box::new(literal),
        }
        .into()
      } else {
        literal
      }
    }
    serde_json::Value::String(value) => Lit::Str(Str::from(value.as_str())).into(),
    serde_json::Value::Array(values) => ArrayLit {
      span: DUMMY_SP,
      elems: values
        .iter()
        .map(|value| {
          Some(ExprOrSpread {
            spread: None,
            expr: Box::new(json_to_expr(value)),
          })
        })
        .collect(),
    }
    .into(),
    serde_json::Value::Object(entries) => ObjectLit {
      span: DUMMY_SP,
      props: entries
        .iter()
        .map(|(key, value)| {
          PropOrSpread::Prop(Box::new(Prop::KeyValue(KeyValueProp {
            key: PropName::Str(Str::from(key.as_str())),
            value: Box::new(json_to_expr(value)),
          })))
        })
        .collect(),
    }
    .into(),
  }
}
