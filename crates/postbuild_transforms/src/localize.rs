use std::iter::Peekable;
use std::str::Chars;
use std::sync::LazyLock;

use postbuild_core::diagnostic::Diagnostic;
use postbuild_core::types::MissingTranslation;
use postbuild_core::types::MissingTranslationFallback;
use postbuild_core::types::Translations;
use postbuild_swc_runner::run_with_transformation;
use postbuild_swc_runner::RunOptions;
use regex::Regex;
use swc_core::atoms::Atom;
use swc_core::common::SyntaxContext;
use swc_core::common::DUMMY_SP;
use swc_core::ecma::ast::ArrayLit;
use swc_core::ecma::ast::BinExpr;
use swc_core::ecma::ast::BinaryOp;
use swc_core::ecma::ast::BindingIdent;
use swc_core::ecma::ast::CallExpr;
use swc_core::ecma::ast::Callee;
use swc_core::ecma::ast::CondExpr;
use swc_core::ecma::ast::Expr;
use swc_core::ecma::ast::ExprOrSpread;
use swc_core::ecma::ast::Ident;
use swc_core::ecma::ast::IdentName;
use swc_core::ecma::ast::KeyValueProp;
use swc_core::ecma::ast::Lit;
use swc_core::ecma::ast::MemberExpr;
use swc_core::ecma::ast::MemberProp;
use swc_core::ecma::ast::ModuleItem;
use swc_core::ecma::ast::Number;
use swc_core::ecma::ast::ObjectLit;
use swc_core::ecma::ast::Pat;
use swc_core::ecma::ast::Program;
use swc_core::ecma::ast::Prop;
use swc_core::ecma::ast::PropName;
use swc_core::ecma::ast::PropOrSpread;
use swc_core::ecma::ast::Stmt;
use swc_core::ecma::ast::Str;
use swc_core::ecma::ast::TaggedTpl;
use swc_core::ecma::ast::Tpl;
use swc_core::ecma::ast::TplElement;
use swc_core::ecma::ast::UnaryExpr;
use swc_core::ecma::ast::UnaryOp;
use swc_core::ecma::ast::VarDecl;
use swc_core::ecma::ast::VarDeclKind;
use swc_core::ecma::ast::VarDeclarator;
use swc_core::ecma::transforms::base::fixer::fixer;
use swc_core::ecma::visit::VisitMut;
use swc_core::ecma::visit::VisitMutWith;

use crate::TransformError;
use crate::TransformOutput;

const LOCALIZE: &str = "$localize";
const BLOCK_MARKER: char = ':';
const MEANING_SEPARATOR: char = '|';
const ID_SEPARATOR: &str = "@@";
const LEGACY_ID_INDICATOR: char = '\u{241F}';

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\$([^}]*)\}").unwrap());

/// A `$localize` message split into its static parts and placeholder names
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedMessage {
  pub id: String,
  pub custom_id: Option<String>,
  pub meaning: Option<String>,
  pub description: Option<String>,

  /// Static text between substitutions, metadata blocks removed
  pub message_parts: Vec<String>,

  /// One name per substitution
  pub placeholder_names: Vec<String>,

  /// Canonical text, placeholders written as `{$NAME}`
  pub text: String,
}

/// Split a leading `:block:` off a message part, returning `(text, block)`.
///
/// The block end is found by walking the raw string, where an escaped `:` (`\:`, `\x3A`,
/// `\u003A`...) does not terminate the block. Positions are mapped back to the cooked string by
/// counting the characters each escape sequence cooks to.
fn split_block(cooked: &str, raw: &str) -> Result<(String, Option<String>), String> {
  if !raw.starts_with(BLOCK_MARKER) {
    return Ok((cooked.to_string(), None));
  }

  let cooked_chars = cooked.chars().collect::<Vec<_>>();
  let mut raw_chars = raw[BLOCK_MARKER.len_utf8()..].chars().peekable();
  let mut cooked_index = 1;
  while let Some(c) = raw_chars.next() {
    match c {
      '\\' => cooked_index += cooked_escape_len(&mut raw_chars),
      BLOCK_MARKER => {
        let (Some(block), Some(text)) = (
          cooked_chars.get(1..cooked_index),
          cooked_chars.get(cooked_index + 1..),
        ) else {
          break;
        };
        return Ok((text.iter().collect(), Some(block.iter().collect())));
      }
      _ => cooked_index += 1,
    }
  }

  Err(format!(
    "Unterminated $localize metadata block in \"{}\".",
    raw
  ))
}

/// Consume an escape sequence following a `\` and return how many characters it cooks to
fn cooked_escape_len(raw: &mut Peekable<Chars<'_>>) -> usize {
  match raw.next() {
    None => 0,
    // Line continuations cook to nothing
    Some('\r') => {
      raw.next_if_eq(&'\n');
      0
    }
    Some('\n' | '\u{2028}' | '\u{2029}') => 0,
    Some('x') => {
      raw.nth(1);
      1
    }
    Some('u') if raw.next_if_eq(&'{').is_some() => {
      raw.find(|c| *c == '}');
      1
    }
    Some('u') => {
      let code = read_hex4(raw);
      // A surrogate pair written as two escapes cooks to a single character
      if (0xD800..0xDC00).contains(&code) {
        let mut ahead = raw.clone();
        if ahead.next() == Some('\\')
          && ahead.next() == Some('u')
          && (0xDC00..0xE000).contains(&read_hex4(&mut ahead))
        {
          *raw = ahead;
        }
      }
      1
    }
    Some(_) => 1,
  }
}

fn read_hex4(raw: &mut Peekable<Chars<'_>>) -> u32 {
  let hex = raw.by_ref().take(4).collect::<String>();
  u32::from_str_radix(&hex, 16).unwrap_or_default()
}

fn compute_placeholder_name(index: usize) -> String {
  if index == 1 {
    String::from("PH")
  } else {
    format!("PH_{}", index - 1)
  }
}

/// Parse the parts of a `$localize` tagged template
///
/// The first part may carry a `:meaning|description@@id:` block, later parts may start with
/// a `:NAME:` block naming the substitution before them.
pub fn parse_message(cooked: &[String], raw: &[String]) -> Result<ParsedMessage, String> {
  let Some(first_cooked) = cooked.first() else {
    return Err(String::from("$localize called without message parts"));
  };
  let first_raw = raw.first().unwrap_or(first_cooked);

  let mut message = ParsedMessage::default();
  let (first_text, metadata) = split_block(first_cooked, first_raw)?;
  if let Some(metadata) = metadata {
    let (meaning_and_description, id) = match metadata.split_once(ID_SEPARATOR) {
      Some((head, id)) => (head.to_string(), Some(id.to_string())),
      None => (metadata, None),
    };
    message.custom_id = id
      .map(|id| {
        id.split(LEGACY_ID_INDICATOR)
          .next()
          .unwrap_or_default()
          .to_string()
      })
      .filter(|id| !id.is_empty());
    match meaning_and_description.split_once(MEANING_SEPARATOR) {
      Some((meaning, description)) => {
        message.meaning = Some(meaning.to_string());
        message.description = Some(description.to_string());
      }
      None if !meaning_and_description.is_empty() => {
        message.description = Some(meaning_and_description);
      }
      None => {}
    }
  }

  message.text = first_text.clone();
  message.message_parts.push(first_text);

  for index in 1..cooked.len() {
    let part_raw = raw.get(index).unwrap_or(&cooked[index]);
    let (text, block) = split_block(&cooked[index], part_raw)?;
    let name = block
      .map(|block| {
        block
          .split_once(ID_SEPARATOR)
          .map(|(name, _)| name.to_string())
          .unwrap_or(block)
      })
      .filter(|name| !name.is_empty())
      .unwrap_or_else(|| compute_placeholder_name(index));

    message.text += &format!("{{${}}}{}", name, text);
    message.placeholder_names.push(name);
    message.message_parts.push(text);
  }

  message.id = message
    .custom_id
    .clone()
    .unwrap_or_else(|| message.text.clone());

  Ok(message)
}

/// Split translated text on `{$NAME}` placeholders into `(parts, names)`
pub fn parse_translation(text: &str) -> (Vec<String>, Vec<String>) {
  let mut parts = vec![];
  let mut names = vec![];
  let mut last = 0;
  for captures in PLACEHOLDER.captures_iter(text) {
    let (Some(found), Some(name)) = (captures.get(0), captures.get(1)) else {
      continue;
    };
    parts.push(text[last..found.start()].to_string());
    names.push(name.as_str().to_string());
    last = found.end();
  }
  parts.push(text[last..].to_string());
  (parts, names)
}

pub struct LocalizeOptions<'a> {
  pub locale: &'a str,
  pub source_locale: &'a str,
  pub translations: &'a Translations,
  pub missing_translation: MissingTranslation,
  pub fallback: &'a MissingTranslationFallback,

  /// Emit string concatenation instead of template literals
  pub downleveled: bool,

  /// Prepend the statement that sets `$localize.locale`
  pub set_locale: bool,

  pub minify: bool,
  pub source_map: bool,
}

#[derive(Debug, Default)]
pub struct LocalizeOutput {
  pub output: TransformOutput,
  pub substitution_count: usize,
  pub diagnostics: Vec<Diagnostic>,
}

/// Replace every `$localize` message in `code` with its translation for `options.locale`
pub fn inline_translations(
  code: &str,
  options: &LocalizeOptions<'_>,
) -> Result<LocalizeOutput, TransformError> {
  let result = run_with_transformation(
    code,
    &RunOptions {
      minify: options.minify,
      source_map: options.source_map,
      ..RunOptions::default()
    },
    |_, program| {
      let mut inliner = TranslationInliner::new(options);
      program.visit_mut_with(&mut inliner);
      if options.set_locale {
        prepend_statement(program, locale_statement(options.locale));
      }
      program.visit_mut_with(&mut fixer(None));
      inliner
    },
  )?;

  Ok(LocalizeOutput {
    output: TransformOutput {
      code: result.output_code,
      source_map: result.source_map,
    },
    substitution_count: result.result.substitution_count,
    diagnostics: result.result.diagnostics,
  })
}

struct TranslationInliner<'a> {
  options: &'a LocalizeOptions<'a>,
  substitution_count: usize,
  diagnostics: Vec<Diagnostic>,
}

impl<'a> TranslationInliner<'a> {
  fn new(options: &'a LocalizeOptions<'a>) -> Self {
    Self {
      options,
      substitution_count: 0,
      diagnostics: vec![],
    }
  }

  fn translate(
    &mut self,
    cooked: &[String],
    raw: &[String],
    substitutions: Vec<Box<Expr>>,
  ) -> Option<Expr> {
    let message = match parse_message(cooked, raw) {
      Ok(message) => message,
      Err(error) => {
        self
          .diagnostics
          .push(Diagnostic::error(error).with_origin("postbuild:i18n"));
        return None;
      }
    };

    let source = (message.message_parts.clone(), substitutions.clone());
    let (parts, expressions) = if self.options.locale == self.options.source_locale {
      source
    } else if let Some(translation) = self.options.translations.get(&message.id) {
      let (parts, names) = parse_translation(translation);
      let mut expressions = vec![];
      for name in &names {
        let substitution = message
          .placeholder_names
          .iter()
          .position(|placeholder| placeholder == name)
          .and_then(|index| substitutions.get(index));
        match substitution {
          Some(substitution) => expressions.push(substitution.clone()),
          None => {
            self.diagnostics.push(
              Diagnostic::error(format!(
                "Unknown placeholder \"{}\" in translation \"{}\" for \"{}\".",
                name, translation, message.id
              ))
              .with_origin("postbuild:i18n"),
            );
            return Some(self.build(source.0, source.1));
          }
        }
      }
      (parts, expressions)
    } else {
      let report = format!(
        "No translation found for \"{}\" (\"{}\").",
        message.id, message.text
      );
      match self.options.missing_translation {
        MissingTranslation::Error => self
          .diagnostics
          .push(Diagnostic::error(report).with_origin("postbuild:i18n")),
        MissingTranslation::Warning => self
          .diagnostics
          .push(Diagnostic::warning(report).with_origin("postbuild:i18n")),
        MissingTranslation::Ignore => {}
      }

      match self.options.fallback {
        MissingTranslationFallback::Source => source,
        MissingTranslationFallback::MessageId => (vec![message.id.clone()], vec![]),
        MissingTranslationFallback::Text(text) => (vec![text.clone()], vec![]),
      }
    };

    Some(self.build(parts, expressions))
  }

  fn build(&mut self, parts: Vec<String>, expressions: Vec<Box<Expr>>) -> Expr {
    self.substitution_count += 1;
    if expressions.is_empty() {
      return string_literal(&parts.concat());
    }

    if self.options.downleveled {
      concatenation(parts, expressions)
    } else {
      template_literal(parts, expressions)
    }
  }
}

impl VisitMut for TranslationInliner<'_> {
  fn visit_mut_expr(&mut self, expr: &mut Expr) {
    expr.visit_mut_children_with(self);

    let replacement = match expr {
      Expr::TaggedTpl(TaggedTpl { tag, tpl, .. }) if is_localize(tag) => {
        let cooked = tpl
          .quasis
          .iter()
          .map(|quasi| {
            quasi
              .cooked
              .as_ref()
              .map(|cooked| cooked.to_string())
              .unwrap_or_else(|| quasi.raw.to_string())
          })
          .collect::<Vec<_>>();
        let raw = tpl
          .quasis
          .iter()
          .map(|quasi| quasi.raw.to_string())
          .collect::<Vec<_>>();
        self.translate(&cooked, &raw, tpl.exprs.clone())
      }
      Expr::Call(CallExpr {
        callee: Callee::Expr(callee),
        args,
        ..
      }) if is_localize(callee) && !args.is_empty() => {
        let Some((cooked, raw)) = template_object_parts(&args[0].expr) else {
          return;
        };
        let substitutions = args[1..].iter().map(|arg| arg.expr.clone()).collect();
        self.translate(&cooked, &raw, substitutions)
      }
      _ => None,
    };

    if let Some(replacement) = replacement {
      *expr = replacement;
    }
  }
}

/// Rewrites `$localize` tagged templates into calls with an explicit template object, so the
/// message survives downleveling in a form the inliner can still read:
/// ``$localize`a${b}` `` becomes `$localize(Object.defineProperty(["a", ""], "raw", { value: ["a", ""] }), b)`.
pub struct LocalizeTemplateObjects;

impl VisitMut for LocalizeTemplateObjects {
  fn visit_mut_expr(&mut self, expr: &mut Expr) {
    expr.visit_mut_children_with(self);

    let Expr::TaggedTpl(TaggedTpl { tag, tpl, span, .. }) = expr else {
      return;
    };
    if !is_localize(tag) {
      return;
    }

    let cooked = tpl
      .quasis
      .iter()
      .map(|quasi| match &quasi.cooked {
        Some(cooked) => string_literal(&cooked.to_string()),
        None => Expr::Ident(Ident::new("undefined".into(), DUMMY_SP, SyntaxContext::empty())),
      })
      .collect::<Vec<_>>();
    let raw = tpl
      .quasis
      .iter()
      .map(|quasi| string_literal(&quasi.raw.to_string()))
      .collect::<Vec<_>>();

    let template_object = call(
      member(ident("Object"), "defineProperty"),
      vec![
        array(cooked),
        string_literal("raw"),
        ObjectLit {
          span: DUMMY_SP,
          props: vec![key_value("value", array(raw))],
        }
        .into(),
      ],
    );

    let mut args = vec![template_object];
    args.extend(tpl.exprs.iter().map(|expr| *expr.clone()));
    let mut localize_call = call(*tag.clone(), args);
    if let Expr::Call(call) = &mut localize_call {
      call.span = *span;
    }
    *expr = localize_call;
  }
}

fn is_localize(expr: &Expr) -> bool {
  matches!(expr, Expr::Ident(ident) if ident.sym == LOCALIZE)
}

fn string_array(expr: &Expr) -> Option<Vec<String>> {
  let Expr::Array(ArrayLit { elems, .. }) = expr else {
    return None;
  };

  elems
    .iter()
    .map(|elem| match elem {
      Some(ExprOrSpread { spread: None, expr }) => match &**expr {
        Expr::Lit(Lit::Str(value)) => Some(value.value.to_string()),
        _ => None,
      },
      _ => None,
    })
    .collect()
}

/// Read the cooked and raw strings of a template object built by a downlevel transform,
/// such as `Object.defineProperty([...], "raw", { value: [...] })`,
/// `__makeTemplateObject([...], [...])` or `_tagged_template_literal([...], [...])`
fn template_object_parts(expr: &Expr) -> Option<(Vec<String>, Vec<String>)> {
  let Expr::Call(CallExpr { args, .. }) = expr else {
    return None;
  };

  let cooked = string_array(&args.first()?.expr)?;
  let raw = match args.get(1).map(|arg| &*arg.expr) {
    Some(Expr::Array(_)) => args.get(1).and_then(|arg| string_array(&arg.expr)),
    Some(Expr::Lit(Lit::Str(key))) if key.value == "raw" => args.get(2).and_then(|arg| {
      let Expr::Object(object) = &*arg.expr else {
        return None;
      };
      object.props.iter().find_map(|prop| match prop {
        PropOrSpread::Prop(prop) => match &**prop {
          Prop::KeyValue(KeyValueProp {
            key: PropName::Ident(key),
            value,
          }) if key.sym == "value" => string_array(value),
          _ => None,
        },
        _ => None,
      })
    }),
    _ => None,
  };

  let raw = raw.unwrap_or_else(|| cooked.clone());
  Some((cooked, raw))
}

fn escape_template_raw(value: &str) -> String {
  value
    .replace('\\', "\\\\")
    .replace('`', "\\`")
    .replace("${", "\\${")
}

fn template_literal(parts: Vec<String>, expressions: Vec<Box<Expr>>) -> Expr {
  let count = parts.len();
  Tpl {
    span: DUMMY_SP,
    exprs: expressions,
    quasis: parts
      .into_iter()
      .enumerate()
      .map(|(index, part)| TplElement {
        span: DUMMY_SP,
        tail: index + 1 == count,
        raw: escape_template_raw(&part).into(),
        cooked: Some(part.into()),
      })
      .collect(),
  }
  .into()
}

/// `"a" + b + "c"`, always starting with a string so the result is a string
fn concatenation(parts: Vec<String>, expressions: Vec<Box<Expr>>) -> Expr {
  let mut parts = parts.into_iter();
  let mut result = string_literal(&parts.next().unwrap_or_default());
  for (expression, part) in expressions.into_iter().zip(parts) {
    result = add(result, *expression);
    if !part.is_empty() {
      result = add(result, string_literal(&part));
    }
  }
  result
}

fn add(left: Expr, right: Expr) -> Expr {
  BinExpr {
    span: DUMMY_SP,
    op: BinaryOp::Add,
    left: Box::new(left),
    right: Box::new(right),
  }
  .into()
}

fn string_literal(value: &str) -> Expr {
  Lit::Str(Str::from(value)).into()
}

fn ident(name: &str) -> Expr {
  Expr::Ident(Ident::new(
    Atom::from(name),
    DUMMY_SP,
    SyntaxContext::empty(),
  ))
}

fn member(object: Expr, property: &str) -> Expr {
  MemberExpr {
    span: DUMMY_SP,
    obj: Box::new(object),
    prop: MemberProp::Ident(IdentName::new(property.into(), DUMMY_SP)),
  }
  .into()
}

fn array(values: Vec<Expr>) -> Expr {
  ArrayLit {
    span: DUMMY_SP,
    elems: values
      .into_iter()
      .map(|value| {
        Some(ExprOrSpread {
          spread: None,
          expr: Box::new(value),
        })
      })
      .collect(),
  }
  .into()
}

fn key_value(key: &str, value: Expr) -> PropOrSpread {
  PropOrSpread::Prop(Box::new(Prop::KeyValue(KeyValueProp {
    key: PropName::Ident(IdentName::new(key.into(), DUMMY_SP)),
    value: Box::new(value),
  })))
}

fn call(callee: Expr, args: Vec<Expr>) -> Expr {
  CallExpr {
    span: DUMMY_SP,
    ctxt: SyntaxContext::empty(),
    callee: Callee::Expr(Box::new(callee)),
    args: args
      .into_iter()
      .map(|arg| ExprOrSpread {
        spread: None,
        expr: Box::new(arg),
      })
      .collect(),
    type_args: None,
  }
  .into()
}

/// `var $localize=Object.assign(void 0===$localize?{}:$localize,{locale:"fr"});`
fn locale_statement(locale: &str) -> Stmt {
  let undefined = UnaryExpr {
    span: DUMMY_SP,
    op: UnaryOp::Void,
    arg: Box::new(
      Lit::Num(Number {
        span: DUMMY_SP,
        value: 0.0,
        raw: None,
      })
      .into(),
    ),
  };
  let existing = CondExpr {
    span: DUMMY_SP,
    test: Box::new(
      BinExpr {
        span: DUMMY_SP,
        op: BinaryOp::EqEqEq,
        left: Box::new(undefined.into()),
        right: Box::new(ident(LOCALIZE)),
      }
      .into(),
    ),
    cons: Box::new(
      ObjectLit {
        span: DUMMY_SP,
        props: vec![],
      }
      .into(),
    ),
    alt: Box::new(ident(LOCALIZE)),
  };
  let init = call(
    member(ident("Object"), "assign"),
    vec![
      existing.into(),
      ObjectLit {
        span: DUMMY_SP,
        props: vec![key_value("locale", string_literal(locale))],
      }
      .into(),
    ],
  );

  Stmt::Decl(
    VarDecl {
      span: DUMMY_SP,
      ctxt: SyntaxContext::empty(),
      kind: VarDeclKind::Var,
      declare: false,
      decls: vec![VarDeclarator {
        span: DUMMY_SP,
        name: Pat::Ident(BindingIdent::from(Ident::new(
          LOCALIZE.into(),
          DUMMY_SP,
          SyntaxContext::empty(),
        ))),
        init: Some(Box::new(init)),
        definite: false,
      }],
    }
    .into(),
  )
}

fn prepend_statement(program: &mut Program, statement: Stmt) {
  match program {
    Program::Module(module) => module.body.insert(0, ModuleItem::Stmt(statement)),
    Program::Script(script) => script.body.insert(0, statement),
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use postbuild_swc_runner::test_utils::run_test_visit;
  use postbuild_swc_runner::test_utils::RunContext;
  use postbuild_swc_runner::test_utils::RunVisitResult;
  use pretty_assertions::assert_eq;

  use super::*;

  fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
  }

  fn options<'a>(
    locale: &'a str,
    translations: &'a Translations,
    fallback: &'a MissingTranslationFallback,
  ) -> LocalizeOptions<'a> {
    LocalizeOptions {
      locale,
      source_locale: "en",
      translations,
      missing_translation: MissingTranslation::Warning,
      fallback,
      downleveled: false,
      set_locale: false,
      minify: false,
      source_map: false,
    }
  }

  #[test]
  fn test_parse_message_with_metadata() {
    let message = parse_message(
      &strings(&[":site header|Greeting@@greeting:Hello ", ":name:!"]),
      &strings(&[":site header|Greeting@@greeting:Hello ", ":name:!"]),
    )
    .unwrap();

    assert_eq!(
      message,
      ParsedMessage {
        id: String::from("greeting"),
        custom_id: Some(String::from("greeting")),
        meaning: Some(String::from("site header")),
        description: Some(String::from("Greeting")),
        message_parts: strings(&["Hello ", "!"]),
        placeholder_names: strings(&["name"]),
        text: String::from("Hello {$name}!"),
      }
    );
  }

  #[test]
  fn test_parse_message_default_placeholder_names() {
    let message = parse_message(
      &strings(&["", " of ", ""]),
      &strings(&["", " of ", ""]),
    )
    .unwrap();

    assert_eq!(message.placeholder_names, strings(&["PH", "PH_1"]));
    assert_eq!(message.id, "{$PH} of {$PH_1}");
  }

  #[test]
  fn test_parse_message_escaped_block_marker() {
    let message = parse_message(&strings(&[":a:b"]), &strings(&["\\:a:b"])).unwrap();

    assert_eq!(message.message_parts, strings(&[":a:b"]));
    assert_eq!(message.custom_id, None);
  }

  #[test]
  fn test_split_block_with_multi_character_escapes() {
    assert_eq!(
      split_block(":: meaning:Hello", r":\u003A meaning:Hello"),
      Ok((String::from("Hello"), Some(String::from(": meaning"))))
    );
    assert_eq!(
      split_block(":a:b:rest", r":a\x3Ab:rest"),
      Ok((String::from("rest"), Some(String::from("a:b"))))
    );
    assert_eq!(
      split_block(":\u{e9}t\u{e9}:summer", r":\u{e9}t\u{E9}:summer"),
      Ok((String::from("summer"), Some(String::from("\u{e9}t\u{e9}"))))
    );
    assert_eq!(
      split_block(":ab:c", ":a\\\nb:c"),
      Ok((String::from("c"), Some(String::from("ab"))))
    );
    assert_eq!(
      split_block(":\u{1F600}:smile", r":\uD83D\uDE00:smile"),
      Ok((String::from("smile"), Some(String::from("\u{1F600}"))))
    );
  }

  #[test]
  fn test_parse_message_escaped_colon_inside_block() {
    let message = parse_message(
      &strings(&[":a:b|desc@@id:Hello"]),
      &strings(&[r":a\x3Ab|desc@@id:Hello"]),
    )
    .unwrap();

    assert_eq!(message.meaning, Some(String::from("a:b")));
    assert_eq!(message.description, Some(String::from("desc")));
    assert_eq!(message.custom_id, Some(String::from("id")));
    assert_eq!(message.message_parts, strings(&["Hello"]));
  }

  #[test]
  fn test_parse_message_unterminated_block() {
    assert!(parse_message(&strings(&[":meaning"]), &strings(&[":meaning"])).is_err());
  }

  #[test]
  fn test_parse_translation() {
    assert_eq!(
      parse_translation("Bonjour {$name}, {$PH_1}!"),
      (strings(&["Bonjour ", ", ", "!"]), strings(&["name", "PH_1"]))
    );
    assert_eq!(parse_translation("Salut"), (strings(&["Salut"]), vec![]));
  }

  #[test]
  fn test_inlines_template_literal_translation() {
    let translations = HashMap::from([(
      String::from("Hello {$name}!"),
      String::from("Bonjour {$name} !"),
    )]);
    let fallback = MissingTranslationFallback::Source;

    let output = inline_translations(
      "const message = $localize`Hello ${user.name}:name:!`;",
      &options("fr", &translations, &fallback),
    )
    .unwrap();

    assert_eq!(output.substitution_count, 1);
    assert_eq!(output.diagnostics, vec![]);
    assert_eq!(
      output.output.code,
      "const message = `Bonjour ${user.name} !`;\n"
    );
  }

  #[test]
  fn test_inlines_downleveled_concatenation() {
    let translations = HashMap::from([(
      String::from("greeting"),
      String::from("{$name}, bonjour"),
    )]);
    let fallback = MissingTranslationFallback::Source;

    let output = inline_translations(
      r#"var message = $localize(Object.defineProperty([":@@greeting:Hello ", ":name:"], "raw", { value: [":@@greeting:Hello ", ":name:"] }), name);"#,
      &LocalizeOptions {
        downleveled: true,
        ..options("fr", &translations, &fallback)
      },
    )
    .unwrap();

    assert_eq!(output.substitution_count, 1);
    assert_eq!(output.output.code, "var message = \"\" + name + \", bonjour\";\n");
  }

  #[test]
  fn test_missing_translation_uses_fallback() {
    let translations = Translations::new();
    let source = MissingTranslationFallback::Source;
    let text = MissingTranslationFallback::Text(String::from("???"));

    let output = inline_translations(
      "const message = $localize`Hello`;",
      &options("fr", &translations, &source),
    )
    .unwrap();
    assert_eq!(output.output.code, "const message = \"Hello\";\n");
    assert_eq!(
      output.diagnostics,
      vec![Diagnostic::warning("No translation found for \"Hello\" (\"Hello\").")
        .with_origin("postbuild:i18n")]
    );

    let output = inline_translations(
      "const message = $localize`Hello`;",
      &options("fr", &translations, &text),
    )
    .unwrap();
    assert_eq!(output.output.code, "const message = \"???\";\n");
  }

  #[test]
  fn test_source_locale_never_reports_missing_translations() {
    let translations = Translations::new();
    let fallback = MissingTranslationFallback::MessageId;

    let output = inline_translations(
      "const message = $localize`:@@greeting:Hello`;",
      &LocalizeOptions {
        missing_translation: MissingTranslation::Error,
        ..options("en", &translations, &fallback)
      },
    )
    .unwrap();

    assert_eq!(output.diagnostics, vec![]);
    assert_eq!(output.output.code, "const message = \"Hello\";\n");
  }

  #[test]
  fn test_unknown_placeholder_is_an_error() {
    let translations = HashMap::from([(String::from("Hi {$PH}"), String::from("Salut {$other}"))]);
    let fallback = MissingTranslationFallback::Source;

    let output = inline_translations(
      "const message = $localize`Hi ${name}`;",
      &options("fr", &translations, &fallback),
    )
    .unwrap();

    assert_eq!(output.diagnostics.len(), 1);
    assert!(output.diagnostics[0].is_error());
    assert_eq!(output.output.code, "const message = `Hi ${name}`;\n");
  }

  #[test]
  fn test_sets_locale_on_main_chunk() {
    let translations = Translations::new();
    let fallback = MissingTranslationFallback::Source;

    let output = inline_translations(
      "console.log(1);",
      &LocalizeOptions {
        set_locale: true,
        minify: true,
        ..options("fr", &translations, &fallback)
      },
    )
    .unwrap();

    assert_eq!(output.substitution_count, 0);
    assert!(output
      .output
      .code
      .starts_with(r#"var $localize=Object.assign(void 0===$localize?{}:$localize,{locale:"fr"});"#));
  }

  #[test]
  fn test_lowers_tagged_templates_to_template_objects() {
    let RunVisitResult { output_code, .. } = run_test_visit(
      "const message = $localize`:@@id:Hello ${name}:name:!`;",
      |_: RunContext| LocalizeTemplateObjects,
    );

    assert!(output_code.starts_with("const message = $localize(Object.defineProperty(["));
    assert!(output_code.contains(r#""raw""#));
    assert!(output_code.contains(r#"":@@id:Hello ""#));
    assert!(output_code.trim_end().ends_with("}), name);"));
  }
}
